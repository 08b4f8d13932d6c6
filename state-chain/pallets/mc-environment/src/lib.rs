#![cfg_attr(not(feature = "std"), no_std)]

//! Protocol-wide configuration: mimir values, the protocol version, the active validator set with
//! its slash points, outbound gas fees and the runtime safe mode.

use frame_support::pallet_prelude::*;
use frame_system::pallet_prelude::*;
use mc_primitives::{
	Address, Asset, AssetAmount, Chain, Coin, MimirKey, ProtocolVersion, CURRENT_PROTOCOL_VERSION,
};
use mc_traits::{GasManager, PoolApi, SafeMode, SlashLabels, Slasher, ValidatorSet};
use sp_std::vec::Vec;

pub use pallet::*;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests;

pub mod weights;
pub use weights::WeightInfo;

pub const PALLET_VERSION: StorageVersion = StorageVersion::new(0);

#[frame_support::pallet]
pub mod pallet {
	use super::*;

	#[pallet::config]
	pub trait Config: frame_system::Config {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		/// Governance origin to secure extrinsics.
		type EnsureGovernance: EnsureOrigin<Self::RuntimeOrigin>;

		/// Used to price gas fees in the asset being sent out.
		type Pools: PoolApi;

		/// The runtime's combined safe mode.
		type RuntimeSafeMode: Member + Parameter + Default + SafeMode;

		type WeightInfo: WeightInfo;
	}

	#[pallet::pallet]
	#[pallet::storage_version(PALLET_VERSION)]
	#[pallet::without_storage_info]
	pub struct Pallet<T>(PhantomData<T>);

	#[pallet::type_value]
	pub fn DefaultProtocolVersion() -> ProtocolVersion {
		CURRENT_PROTOCOL_VERSION
	}

	/// Values set by governance. Unset keys fall back to [MimirKey::default_value].
	#[pallet::storage]
	pub type Mimir<T> = StorageMap<_, Twox64Concat, MimirKey, i64, OptionQuery>;

	#[pallet::storage]
	pub type CurrentProtocolVersion<T> =
		StorageValue<_, ProtocolVersion, ValueQuery, DefaultProtocolVersion>;

	/// Contracts that outbounds may be routed through.
	#[pallet::storage]
	pub type DexAggregators<T> = StorageMap<_, Blake2_128Concat, Address, (), OptionQuery>;

	#[pallet::storage]
	pub type ActiveValidators<T: Config> = StorageValue<_, Vec<T::AccountId>, ValueQuery>;

	/// Net slash points per validator. Observation adds points up front and removes them once the
	/// validator is seen to agree with consensus in time.
	#[pallet::storage]
	pub type SlashPoints<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, i64, ValueQuery>;

	/// The fee for one outbound on each external chain, in units of the chain's gas asset.
	#[pallet::storage]
	pub type OutboundFees<T> = StorageMap<_, Twox64Concat, Chain, AssetAmount, ValueQuery>;

	/// Outbound fees kept back in the vaults, per chain and asset.
	#[pallet::storage]
	pub type WithheldFees<T> =
		StorageDoubleMap<_, Twox64Concat, Chain, Twox64Concat, Asset, AssetAmount, ValueQuery>;

	#[pallet::storage]
	pub type RuntimeSafeMode<T: Config> = StorageValue<_, T::RuntimeSafeMode, ValueQuery>;

	#[pallet::event]
	#[pallet::generate_deposit(pub(super) fn deposit_event)]
	pub enum Event<T: Config> {
		/// A mimir value was set, or cleared if `value` is `None`.
		MimirUpdated { key: MimirKey, value: Option<i64> },
		ProtocolVersionUpdated { version: ProtocolVersion },
		DexAggregatorUpdated { address: Address, registered: bool },
		ActiveValidatorsUpdated { validators: Vec<T::AccountId> },
		OutboundFeeUpdated { chain: Chain, fee: AssetAmount },
		SlashPointsAdjusted { validator: T::AccountId, delta: i64, labels: SlashLabels },
		RuntimeSafeModeUpdated { safe_mode: T::RuntimeSafeMode },
	}

	#[pallet::error]
	pub enum Error<T> {
		/// The protocol version can only move forwards.
		ProtocolVersionDowngrade,
	}

	#[pallet::call]
	impl<T: Config> Pallet<T> {
		/// Sets a mimir value. `None` reverts the key to its default.
		///
		/// ## Events
		///
		/// - [MimirUpdated](Event::MimirUpdated)
		///
		/// ## Errors
		///
		/// - [BadOrigin](frame_support::error::BadOrigin)
		#[pallet::call_index(0)]
		#[pallet::weight(T::WeightInfo::set_mimir())]
		pub fn set_mimir(
			origin: OriginFor<T>,
			key: MimirKey,
			value: Option<i64>,
		) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			Mimir::<T>::set(key, value);
			Self::deposit_event(Event::MimirUpdated { key, value });
			Ok(())
		}

		/// ## Events
		///
		/// - [ProtocolVersionUpdated](Event::ProtocolVersionUpdated)
		///
		/// ## Errors
		///
		/// - [BadOrigin](frame_support::error::BadOrigin)
		/// - [ProtocolVersionDowngrade](Error::ProtocolVersionDowngrade)
		#[pallet::call_index(1)]
		#[pallet::weight(T::WeightInfo::set_protocol_version())]
		pub fn set_protocol_version(
			origin: OriginFor<T>,
			version: ProtocolVersion,
		) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			ensure!(
				version >= CurrentProtocolVersion::<T>::get(),
				Error::<T>::ProtocolVersionDowngrade
			);
			CurrentProtocolVersion::<T>::put(version);
			Self::deposit_event(Event::ProtocolVersionUpdated { version });
			Ok(())
		}

		#[pallet::call_index(2)]
		#[pallet::weight(T::WeightInfo::set_dex_aggregator())]
		pub fn set_dex_aggregator(
			origin: OriginFor<T>,
			address: Address,
			registered: bool,
		) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			if registered {
				DexAggregators::<T>::insert(&address, ());
			} else {
				DexAggregators::<T>::remove(&address);
			}
			Self::deposit_event(Event::DexAggregatorUpdated { address, registered });
			Ok(())
		}

		/// Replaces the set of validators allowed to submit observations.
		#[pallet::call_index(3)]
		#[pallet::weight(T::WeightInfo::set_active_validators(validators.len() as u32))]
		pub fn set_active_validators(
			origin: OriginFor<T>,
			validators: Vec<T::AccountId>,
		) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			ActiveValidators::<T>::put(&validators);
			Self::deposit_event(Event::ActiveValidatorsUpdated { validators });
			Ok(())
		}

		#[pallet::call_index(4)]
		#[pallet::weight(T::WeightInfo::set_outbound_fee())]
		pub fn set_outbound_fee(
			origin: OriginFor<T>,
			chain: Chain,
			fee: AssetAmount,
		) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			OutboundFees::<T>::insert(chain, fee);
			Self::deposit_event(Event::OutboundFeeUpdated { chain, fee });
			Ok(())
		}

		#[pallet::call_index(5)]
		#[pallet::weight(T::WeightInfo::update_safe_mode())]
		pub fn update_safe_mode(
			origin: OriginFor<T>,
			safe_mode: T::RuntimeSafeMode,
		) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			RuntimeSafeMode::<T>::put(&safe_mode);
			Self::deposit_event(Event::RuntimeSafeModeUpdated { safe_mode });
			Ok(())
		}
	}

	#[pallet::genesis_config]
	#[derive(frame_support::DefaultNoBound)]
	pub struct GenesisConfig<T: Config> {
		pub mimir: Vec<(MimirKey, i64)>,
		pub validators: Vec<T::AccountId>,
		pub outbound_fees: Vec<(Chain, AssetAmount)>,
		pub dex_aggregators: Vec<Address>,
	}

	#[pallet::genesis_build]
	impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
		fn build(&self) {
			for (key, value) in &self.mimir {
				Mimir::<T>::insert(key, value);
			}
			ActiveValidators::<T>::put(&self.validators);
			for (chain, fee) in &self.outbound_fees {
				OutboundFees::<T>::insert(chain, fee);
			}
			for address in &self.dex_aggregators {
				DexAggregators::<T>::insert(address, ());
			}
		}
	}
}

impl<T: Config> Pallet<T> {
	fn adjust_slash_points(validator: &T::AccountId, delta: i64, labels: SlashLabels) {
		SlashPoints::<T>::mutate(validator, |points| *points = points.saturating_add(delta));
		Self::deposit_event(Event::SlashPointsAdjusted {
			validator: validator.clone(),
			delta,
			labels,
		});
	}

	pub fn slash_points(validator: &T::AccountId) -> i64 {
		SlashPoints::<T>::get(validator)
	}

	/// The fee currently charged for an outbound of `asset`, before conversion.
	fn base_fee(chain: Chain) -> (Asset, AssetAmount) {
		if chain.is_native() {
			(Asset::cacao(), Self::native_transaction_fee())
		} else {
			(chain.gas_asset(), OutboundFees::<T>::get(chain))
		}
	}
}

impl<T: Config> mc_traits::Mimir for Pallet<T> {
	fn get(key: MimirKey) -> i64 {
		Mimir::<T>::get(key).unwrap_or(key.default_value())
	}

	fn protocol_version() -> ProtocolVersion {
		CurrentProtocolVersion::<T>::get()
	}

	fn is_dex_aggregator(address: &[u8]) -> bool {
		DexAggregators::<T>::contains_key(Address(address.to_vec()))
	}
}

impl<T: Config> ValidatorSet for Pallet<T> {
	type ValidatorId = T::AccountId;

	fn active_validators() -> Vec<T::AccountId> {
		ActiveValidators::<T>::get()
	}

	fn is_active(id: &T::AccountId) -> bool {
		ActiveValidators::<T>::get().contains(id)
	}
}

impl<T: Config> Slasher for Pallet<T> {
	type ValidatorId = T::AccountId;

	fn inc_slash_points(id: &T::AccountId, points: u64, labels: SlashLabels) {
		Self::adjust_slash_points(id, i64::try_from(points).unwrap_or(i64::MAX), labels);
	}

	fn dec_slash_points(id: &T::AccountId, points: u64, labels: SlashLabels) {
		Self::adjust_slash_points(id, -i64::try_from(points).unwrap_or(i64::MAX), labels);
	}
}

impl<T: Config> GasManager for Pallet<T> {
	/// Gas is priced in the chain's gas asset and converted to `asset` at pool spot prices. An
	/// asset without a pool costs nothing to send.
	fn outbound_fee(asset: &Asset) -> AssetAmount {
		let (fee_asset, fee) = Self::base_fee(asset.settlement_chain());
		if fee == 0 || fee_asset == *asset {
			return fee
		}
		let fee_in_cacao = T::Pools::value_in_cacao(&fee_asset, fee);
		let converted = T::Pools::value_in_asset(fee_in_cacao, asset);
		if converted == 0 {
			log::debug!(target: "mc-environment", "No price for {asset}, outbound fee is zero.");
		}
		converted
	}

	fn native_transaction_fee() -> AssetAmount {
		<Self as mc_traits::Mimir>::get_amount(MimirKey::NativeTransactionFee)
	}

	fn record_withheld_fee(coin: &Coin) {
		WithheldFees::<T>::mutate(coin.asset.settlement_chain(), &coin.asset, |withheld| {
			*withheld = withheld.saturating_add(coin.amount)
		});
	}
}
