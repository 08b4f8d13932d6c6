#![cfg_attr(not(feature = "std"), no_std)]

//! CACAO-paired liquidity pools.
//!
//! Each pool pairs CACAO with one layer-1 asset. Synths and trade assets of that asset are priced
//! against the same pool: trade assets move the asset depth like the layer-1 asset, while synths
//! are minted and burned in the native ledger and leave the asset depth untouched.

use codec::DecodeWithMemTracking;
use frame_support::{
	pallet_prelude::*,
	sp_runtime::SaturatedConversion,
	storage::{with_transaction, TransactionOutcome},
};
use frame_system::pallet_prelude::*;
use mc_amm::{
	bps_share, calculate_liquidity_units, calculate_withdrawal, AmmError, PoolDepths,
	SwapDirection,
};
use mc_memo::outbound_memo;
use mc_primitives::{
	Address, Asset, AssetAmount, Coin, LedgerAccount, MimirKey, ModuleName, TxId, MAX_BASIS_POINTS,
};
use mc_traits::{
	AddLiquidityRequest, AddressConverter, Ledger, LiquidityApi, Mimir, PoolApi, SwapResult,
	TxOutItem, TxOutStore, WithdrawLiquidityRequest,
};
use serde::{Deserialize, Serialize};
use sp_std::vec::Vec;

pub use pallet::*;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests;

pub mod weights;
pub use weights::WeightInfo;

pub const PALLET_VERSION: StorageVersion = StorageVersion::new(0);

#[derive(
	Copy,
	Clone,
	RuntimeDebug,
	PartialEq,
	Eq,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	Serialize,
	Deserialize,
)]
pub enum PoolStatus {
	Available,
	/// Accepts liquidity but does not swap.
	Staged,
	/// Neither swaps nor accepts liquidity.
	Suspended,
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct Pool {
	pub asset: Asset,
	pub depths: PoolDepths,
	pub pool_units: AssetAmount,
	pub status: PoolStatus,
}

impl Pool {
	fn new(asset: Asset) -> Self {
		Pool { asset, depths: PoolDepths::default(), pool_units: 0, status: PoolStatus::Available }
	}
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct LiquidityProvider {
	pub cacao_address: Option<Address>,
	pub asset_address: Option<Address>,
	pub units: AssetAmount,
	pub cacao_deposit_value: AssetAmount,
	pub asset_deposit_value: AssetAmount,
	pub last_add_height: u64,
	pub last_withdraw_height: u64,
}

#[frame_support::pallet]
pub mod pallet {
	use super::*;

	#[pallet::config]
	#[pallet::disable_frame_system_supertrait_check]
	pub trait Config: mc_traits::Mayachain {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		/// Holds the pooled CACAO and the synth supply.
		type Ledger: Ledger<AccountId = Self::AccountId>;

		type TxOutStore: TxOutStore;

		type AddressConverter: AddressConverter<AccountId = Self::AccountId>;

		type WeightInfo: WeightInfo;
	}

	#[pallet::pallet]
	#[pallet::storage_version(PALLET_VERSION)]
	#[pallet::without_storage_info]
	pub struct Pallet<T>(PhantomData<T>);

	/// Pools keyed by their layer-1 asset.
	#[pallet::storage]
	pub type Pools<T> = StorageMap<_, Twox64Concat, Asset, Pool, OptionQuery>;

	/// Positions keyed by pool and by the address the position was opened with.
	#[pallet::storage]
	pub type LiquidityProviders<T> = StorageDoubleMap<
		_,
		Twox64Concat,
		Asset,
		Blake2_128Concat,
		Address,
		LiquidityProvider,
		OptionQuery,
	>;

	#[pallet::event]
	#[pallet::generate_deposit(pub(super) fn deposit_event)]
	pub enum Event<T: Config> {
		PoolStatusUpdated { pool: Asset, status: PoolStatus },
		LiquidityAdded {
			tx_id: TxId,
			pool: Asset,
			owner: Address,
			cacao_amount: AssetAmount,
			asset_amount: AssetAmount,
			units: AssetAmount,
		},
		LiquidityWithdrawn {
			tx_id: TxId,
			pool: Asset,
			owner: Address,
			units: AssetAmount,
			cacao_amount: AssetAmount,
			asset_amount: AssetAmount,
		},
		Donated { pool: Asset, cacao_amount: AssetAmount, asset_amount: AssetAmount },
		Swapped {
			pool: Asset,
			direction: SwapDirection,
			input: AssetAmount,
			emitted: AssetAmount,
			liquidity_fee: AssetAmount,
			slip_bps: u16,
		},
	}

	#[pallet::error]
	pub enum Error<T> {
		PoolDoesNotExist,
		PoolNotAvailable,
		/// Only layer-1 assets other than CACAO have pools.
		InvalidPoolAsset,
		/// The pool has no depth on one side.
		PoolEmpty,
		ZeroAmount,
		FirstDepositMustBeBothSides,
		/// The deposit is too small to mint any units.
		ZeroUnits,
		MathOverflow,
		/// Total pooled CACAO would exceed `MaximumLiquidityCacao`.
		LiquidityCapReached,
		/// Twice the pooled CACAO would exceed the total effective bond.
		LiquidityExceedsBond,
		/// A position needs an address on at least one side.
		MissingAddress,
		InvalidBasisPoints,
		NoLiquidityPosition,
		NothingToWithdraw,
		/// Withdrawals can only be paid out in CACAO or the pool asset.
		InvalidWithdrawalAsset,
		/// The address cannot hold native balances.
		InvalidCacaoAddress,
	}

	impl<T> From<AmmError> for Error<T> {
		fn from(error: AmmError) -> Self {
			match error {
				AmmError::EmptyPool => Error::PoolEmpty,
				AmmError::ZeroInput => Error::ZeroAmount,
				AmmError::FirstDepositMustBeBothSides => Error::FirstDepositMustBeBothSides,
				AmmError::ZeroUnits => Error::ZeroUnits,
				AmmError::Overflow => Error::MathOverflow,
			}
		}
	}

	#[pallet::call]
	impl<T: Config> Pallet<T> {
		/// Requires Governance.
		///
		/// ## Events
		///
		/// - [PoolStatusUpdated](Event::PoolStatusUpdated)
		///
		/// ## Errors
		///
		/// - [BadOrigin](frame_system::BadOrigin)
		/// - [PoolDoesNotExist](Error::PoolDoesNotExist)
		#[pallet::call_index(0)]
		#[pallet::weight(T::WeightInfo::set_pool_status())]
		pub fn set_pool_status(
			origin: OriginFor<T>,
			pool: Asset,
			status: PoolStatus,
		) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			Pools::<T>::try_mutate(&pool, |maybe_pool| {
				if let Some(pool) = maybe_pool.as_mut() {
					pool.status = status;
					Ok(())
				} else {
					Err(Error::<T>::PoolDoesNotExist)
				}
			})?;
			Self::deposit_event(Event::PoolStatusUpdated { pool, status });
			Ok(())
		}
	}

	#[pallet::genesis_config]
	#[derive(frame_support::DefaultNoBound)]
	pub struct GenesisConfig<T: Config> {
		/// `(asset, cacao depth, asset depth)`. Genesis units equal the CACAO depth.
		pub pools: Vec<(Asset, AssetAmount, AssetAmount)>,
		pub _phantom: PhantomData<T>,
	}

	#[pallet::genesis_build]
	impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
		fn build(&self) {
			for (asset, cacao, asset_depth) in &self.pools {
				Pools::<T>::insert(asset, Pool {
					depths: PoolDepths { cacao: *cacao, asset: *asset_depth },
					pool_units: *cacao,
					..Pool::new(asset.clone())
				});
			}
		}
	}
}

impl<T: Config> Pallet<T> {
	fn current_height() -> u64 {
		frame_system::Pallet::<T>::block_number().saturated_into()
	}

	pub fn pool(asset: &Asset) -> Option<Pool> {
		Pools::<T>::get(asset.get_layer1_asset())
	}

	pub fn pools() -> Vec<Pool> {
		Pools::<T>::iter_values().collect()
	}

	pub fn liquidity_provider(pool: &Asset, owner: &Address) -> Option<LiquidityProvider> {
		LiquidityProviders::<T>::get(pool, owner)
	}

	pub fn liquidity_providers(pool: &Asset) -> Vec<(Address, LiquidityProvider)> {
		LiquidityProviders::<T>::iter_prefix(pool).collect()
	}

	/// Swaps `amount` through one pool. Synth legs mint or burn in Asgard instead of moving the
	/// asset depth. Returns `(emitted, liquidity fee in CACAO, slip)`.
	fn swap_leg(
		asset: &Asset,
		direction: SwapDirection,
		amount: AssetAmount,
	) -> Result<(AssetAmount, AssetAmount, u16), DispatchError> {
		let pool_asset = asset.get_layer1_asset();
		let output = Pools::<T>::try_mutate(&pool_asset, |maybe_pool| {
			let pool = maybe_pool.as_mut().ok_or(Error::<T>::PoolDoesNotExist)?;
			ensure!(pool.status == PoolStatus::Available, Error::<T>::PoolNotAvailable);
			let output = pool.depths.quote(direction, amount).map_err(Error::<T>::from)?;
			let moves_asset_depth = !asset.is_synth();
			match direction {
				SwapDirection::CacaoToAsset => {
					pool.depths.cacao =
						pool.depths.cacao.checked_add(amount).ok_or(Error::<T>::MathOverflow)?;
					if moves_asset_depth {
						pool.depths.asset = pool.depths.asset.saturating_sub(output.emitted);
					}
				},
				SwapDirection::AssetToCacao => {
					if moves_asset_depth {
						pool.depths.asset =
							pool.depths.asset.checked_add(amount).ok_or(Error::<T>::MathOverflow)?;
					}
					pool.depths.cacao = pool.depths.cacao.saturating_sub(output.emitted);
				},
			}
			let fee_in_cacao = match direction {
				SwapDirection::CacaoToAsset => pool.depths.asset_to_cacao(output.liquidity_fee),
				SwapDirection::AssetToCacao => output.liquidity_fee,
			};
			Ok::<_, Error<T>>((output, fee_in_cacao))
		});
		let (output, fee_in_cacao) = output?;

		if asset.is_synth() {
			let asgard = LedgerAccount::Module(ModuleName::Asgard);
			match direction {
				SwapDirection::CacaoToAsset => T::Ledger::mint(&asgard, asset, output.emitted)?,
				SwapDirection::AssetToCacao => T::Ledger::burn(&asgard, asset, amount)?,
			}
		}

		Self::deposit_event(Event::Swapped {
			pool: pool_asset,
			direction,
			input: amount,
			emitted: output.emitted,
			liquidity_fee: output.liquidity_fee,
			slip_bps: output.slip_bps,
		});
		Ok((output.emitted, fee_in_cacao, output.slip_bps))
	}

	fn execute_swap(
		from: &Asset,
		to: &Asset,
		amount: AssetAmount,
	) -> Result<SwapResult, DispatchError> {
		ensure!(amount > 0, Error::<T>::ZeroAmount);
		let mut result = SwapResult::default();
		let mut amount = amount;
		let legs = [(from, SwapDirection::AssetToCacao), (to, SwapDirection::CacaoToAsset)];
		for (asset, direction) in legs {
			if asset.is_cacao() {
				continue
			}
			let (emitted, fee_in_cacao, slip_bps) = Self::swap_leg(asset, direction, amount)?;
			result.legs.push((asset.get_layer1_asset(), fee_in_cacao));
			result.liquidity_fee_in_cacao =
				result.liquidity_fee_in_cacao.saturating_add(fee_in_cacao);
			result.slip_bps = result.slip_bps.saturating_add(slip_bps);
			amount = emitted;
		}
		result.emitted = amount;
		Ok(result)
	}

	fn ensure_liquidity_caps(added_cacao: AssetAmount) -> DispatchResult {
		let total_cacao = Self::total_pooled_cacao().saturating_add(added_cacao);

		let max_cacao = T::Mimir::get_amount(MimirKey::MaximumLiquidityCacao);
		ensure!(max_cacao == 0 || total_cacao <= max_cacao, Error::<T>::LiquidityCapReached);

		if T::Mimir::is_enabled(MimirKey::EnsureLiquidityNoLargerThanBond) {
			ensure!(
				total_cacao.saturating_mul(2) <= T::Mimir::get_amount(MimirKey::TotalEffectiveBond),
				Error::<T>::LiquidityExceedsBond
			);
		}
		Ok(())
	}

	fn pay_cacao(address: &Address, amount: AssetAmount) -> DispatchResult {
		let recipient =
			T::AddressConverter::to_ledger_account(address).ok_or(Error::<T>::InvalidCacaoAddress)?;
		T::Ledger::transfer(
			&LedgerAccount::Module(ModuleName::Asgard),
			&recipient,
			&Asset::cacao(),
			amount,
		)
	}
}

impl<T: Config> LiquidityApi for Pallet<T> {
	/// ## Events
	///
	/// - [LiquidityAdded](Event::LiquidityAdded)
	///
	/// ## Errors
	///
	/// - [InvalidPoolAsset](Error::InvalidPoolAsset)
	/// - [MissingAddress](Error::MissingAddress)
	/// - [PoolNotAvailable](Error::PoolNotAvailable)
	/// - [LiquidityCapReached](Error::LiquidityCapReached)
	/// - [LiquidityExceedsBond](Error::LiquidityExceedsBond)
	/// - [FirstDepositMustBeBothSides](Error::FirstDepositMustBeBothSides)
	/// - [ZeroUnits](Error::ZeroUnits)
	fn add_liquidity(request: AddLiquidityRequest) -> Result<AssetAmount, DispatchError> {
		let AddLiquidityRequest {
			tx_id,
			pool: pool_asset,
			cacao_amount,
			asset_amount,
			cacao_address,
			asset_address,
		} = request;
		ensure!(
			pool_asset.is_layer1() && !pool_asset.is_cacao(),
			Error::<T>::InvalidPoolAsset
		);
		let owner = cacao_address
			.clone()
			.or_else(|| asset_address.clone())
			.ok_or(Error::<T>::MissingAddress)?;

		let mut pool =
			Pools::<T>::get(&pool_asset).unwrap_or_else(|| Pool::new(pool_asset.clone()));
		ensure!(pool.status != PoolStatus::Suspended, Error::<T>::PoolNotAvailable);

		let added_value = cacao_amount.saturating_add(pool.depths.asset_to_cacao(asset_amount));
		Self::ensure_liquidity_caps(added_value)?;

		let units =
			calculate_liquidity_units(pool.pool_units, pool.depths, cacao_amount, asset_amount)
				.map_err(Error::<T>::from)?;
		pool.depths.cacao =
			pool.depths.cacao.checked_add(cacao_amount).ok_or(Error::<T>::MathOverflow)?;
		pool.depths.asset =
			pool.depths.asset.checked_add(asset_amount).ok_or(Error::<T>::MathOverflow)?;
		pool.pool_units = pool.pool_units.checked_add(units).ok_or(Error::<T>::MathOverflow)?;
		Pools::<T>::insert(&pool_asset, pool);

		LiquidityProviders::<T>::mutate(&pool_asset, &owner, |maybe_lp| {
			let lp = maybe_lp.get_or_insert_with(|| LiquidityProvider {
				cacao_address: None,
				asset_address: None,
				units: 0,
				cacao_deposit_value: 0,
				asset_deposit_value: 0,
				last_add_height: 0,
				last_withdraw_height: 0,
			});
			if cacao_address.is_some() {
				lp.cacao_address = cacao_address;
			}
			if asset_address.is_some() {
				lp.asset_address = asset_address;
			}
			lp.units = lp.units.saturating_add(units);
			lp.cacao_deposit_value = lp.cacao_deposit_value.saturating_add(cacao_amount);
			lp.asset_deposit_value = lp.asset_deposit_value.saturating_add(asset_amount);
			lp.last_add_height = Self::current_height();
		});

		Self::deposit_event(Event::LiquidityAdded {
			tx_id,
			pool: pool_asset,
			owner,
			cacao_amount,
			asset_amount,
			units,
		});
		Ok(units)
	}

	/// Pays out `basis_points` of the position. The CACAO side goes to the position's native
	/// address and the asset side is scheduled as an outbound. A withdrawal asset, or a position
	/// with only one address, swaps the other side within the pool first.
	///
	/// ## Events
	///
	/// - [LiquidityWithdrawn](Event::LiquidityWithdrawn)
	///
	/// ## Errors
	///
	/// - [InvalidBasisPoints](Error::InvalidBasisPoints)
	/// - [NoLiquidityPosition](Error::NoLiquidityPosition)
	/// - [NothingToWithdraw](Error::NothingToWithdraw)
	/// - [InvalidWithdrawalAsset](Error::InvalidWithdrawalAsset)
	fn withdraw_liquidity(request: WithdrawLiquidityRequest) -> DispatchResult {
		let WithdrawLiquidityRequest {
			tx_id,
			pool: pool_asset,
			owner,
			basis_points,
			withdrawal_asset,
		} = request;
		ensure!(
			basis_points > 0 && basis_points <= MAX_BASIS_POINTS,
			Error::<T>::InvalidBasisPoints
		);
		let mut pool = Pools::<T>::get(&pool_asset).ok_or(Error::<T>::PoolDoesNotExist)?;
		ensure!(pool.status != PoolStatus::Suspended, Error::<T>::PoolNotAvailable);
		let mut lp = LiquidityProviders::<T>::get(&pool_asset, &owner)
			.ok_or(Error::<T>::NoLiquidityPosition)?;

		let units = bps_share(basis_points, lp.units);
		ensure!(units > 0, Error::<T>::NothingToWithdraw);

		let (mut cacao_out, mut asset_out) =
			calculate_withdrawal(units, pool.pool_units, pool.depths);
		pool.depths.cacao = pool.depths.cacao.saturating_sub(cacao_out);
		pool.depths.asset = pool.depths.asset.saturating_sub(asset_out);
		pool.pool_units = pool.pool_units.saturating_sub(units);

		let swap_side = match (&withdrawal_asset, &lp.cacao_address, &lp.asset_address) {
			(Some(asset), _, _) if asset.is_cacao() => Some(SwapDirection::AssetToCacao),
			(Some(asset), _, _) if *asset == pool_asset => Some(SwapDirection::CacaoToAsset),
			(Some(_), _, _) => return Err(Error::<T>::InvalidWithdrawalAsset.into()),
			(None, Some(_), None) => Some(SwapDirection::AssetToCacao),
			(None, None, Some(_)) => Some(SwapDirection::CacaoToAsset),
			(None, _, _) => None,
		};
		match swap_side {
			Some(SwapDirection::AssetToCacao) if asset_out > 0 && !pool.depths.is_empty() => {
				let output = pool
					.depths
					.swap(SwapDirection::AssetToCacao, asset_out)
					.map_err(Error::<T>::from)?;
				cacao_out = cacao_out.saturating_add(output.emitted);
				asset_out = 0;
			},
			Some(SwapDirection::CacaoToAsset) if cacao_out > 0 && !pool.depths.is_empty() => {
				let output = pool
					.depths
					.swap(SwapDirection::CacaoToAsset, cacao_out)
					.map_err(Error::<T>::from)?;
				asset_out = asset_out.saturating_add(output.emitted);
				cacao_out = 0;
			},
			_ => {},
		}
		Pools::<T>::insert(&pool_asset, pool);

		let remaining_share = |value: AssetAmount| {
			value.saturating_sub(bps_share(basis_points, value))
		};
		lp.cacao_deposit_value = remaining_share(lp.cacao_deposit_value);
		lp.asset_deposit_value = remaining_share(lp.asset_deposit_value);
		lp.units = lp.units.saturating_sub(units);
		lp.last_withdraw_height = Self::current_height();

		if cacao_out > 0 {
			let address = lp.cacao_address.as_ref().unwrap_or(&owner);
			Self::pay_cacao(address, cacao_out)?;
		}
		if asset_out > 0 {
			let address = lp.asset_address.clone().unwrap_or_else(|| owner.clone());
			T::TxOutStore::try_add_tx_out_item(TxOutItem::new(
				tx_id,
				address,
				Coin::new(pool_asset.clone(), asset_out),
				outbound_memo(&tx_id),
			))?;
		}

		if lp.units == 0 {
			LiquidityProviders::<T>::remove(&pool_asset, &owner);
		} else {
			LiquidityProviders::<T>::insert(&pool_asset, &owner, lp);
		}

		Self::deposit_event(Event::LiquidityWithdrawn {
			tx_id,
			pool: pool_asset,
			owner,
			units,
			cacao_amount: cacao_out,
			asset_amount: asset_out,
		});
		Ok(())
	}

	fn donate(pool: &Asset, cacao: AssetAmount, asset: AssetAmount) -> DispatchResult {
		Pools::<T>::try_mutate(pool, |maybe_pool| {
			let pool = maybe_pool.as_mut().ok_or(Error::<T>::PoolDoesNotExist)?;
			pool.depths.cacao =
				pool.depths.cacao.checked_add(cacao).ok_or(Error::<T>::MathOverflow)?;
			pool.depths.asset =
				pool.depths.asset.checked_add(asset).ok_or(Error::<T>::MathOverflow)?;
			Ok::<_, Error<T>>(())
		})?;
		Self::deposit_event(Event::Donated {
			pool: pool.clone(),
			cacao_amount: cacao,
			asset_amount: asset,
		});
		Ok(())
	}
}

impl<T: Config> PoolApi for Pallet<T> {
	fn pool_depths(asset: &Asset) -> Option<PoolDepths> {
		Self::pool(asset).map(|pool| pool.depths)
	}

	fn is_pool_available(asset: &Asset) -> bool {
		Self::pool(asset)
			.is_some_and(|pool| pool.status == PoolStatus::Available && !pool.depths.is_empty())
	}

	fn synth_supply(asset: &Asset) -> AssetAmount {
		T::Ledger::total_supply(&asset.get_synth_asset())
	}

	fn swap(from: &Asset, to: &Asset, amount: AssetAmount) -> Result<SwapResult, DispatchError> {
		with_transaction(|| match Self::execute_swap(from, to, amount) {
			Ok(result) => TransactionOutcome::Commit(Ok(result)),
			Err(error) => {
				log::debug!(
					target: "mc-pools",
					"Swap of {amount} {from} to {to} rejected: {error:?}",
				);
				TransactionOutcome::Rollback(Err(error))
			},
		})
	}

	/// Runs the swap and rolls it back, so a double swap prices its second leg off the first.
	fn quote_swap(
		from: &Asset,
		to: &Asset,
		amount: AssetAmount,
	) -> Result<SwapResult, DispatchError> {
		with_transaction(|| TransactionOutcome::Rollback(Self::execute_swap(from, to, amount)))
	}

	fn take_cacao_from_depth(
		pool_asset: &Asset,
		amount: AssetAmount,
	) -> Result<AssetAmount, DispatchError> {
		Ok(Pools::<T>::try_mutate(pool_asset.get_layer1_asset(), |maybe_pool| {
			let pool = maybe_pool.as_mut().ok_or(Error::<T>::PoolDoesNotExist)?;
			let taken = amount.min(pool.depths.cacao);
			pool.depths.cacao -= taken;
			Ok::<_, Error<T>>(taken)
		})?)
	}

	fn lp_value_in_cacao(owner: &Address) -> AssetAmount {
		LiquidityProviders::<T>::iter()
			.filter(|(_, address, _)| address == owner)
			.filter_map(|(pool_asset, _, lp)| {
				let pool = Pools::<T>::get(pool_asset)?;
				let (cacao, asset) = calculate_withdrawal(lp.units, pool.pool_units, pool.depths);
				Some(cacao.saturating_add(pool.depths.asset_to_cacao(asset)))
			})
			.fold(0, AssetAmount::saturating_add)
	}

	fn total_pooled_cacao() -> AssetAmount {
		Pools::<T>::iter_values().map(|pool| pool.depths.cacao).fold(0, AssetAmount::saturating_add)
	}
}
