#![cfg_attr(not(feature = "std"), no_std)]

//! The CACAO Pool.
//!
//! Providers deposit CACAO and receive units at the current value per unit. The pool value is the
//! CACAO held by the CacaoPool module plus the CACAO value of its liquidity positions. It grows
//! with the share of swap fees routed here, so a provider's units are worth more over time while
//! deposits and withdrawals themselves never move the price of a unit.
//!
//! The Reserve can hold units too. Governance moves CACAO from the Reserve into the pool up to a
//! configured ceiling on the value of the Reserve's position.

use frame_support::{
	pallet_prelude::*, sp_runtime::SaturatedConversion, storage::with_storage_layer,
};
use frame_system::pallet_prelude::*;
use mc_amm::{bps_share, get_safe_share};
use mc_memo::Affiliate;
use mc_primitives::{
	Asset, AssetAmount, BasisPoints, LedgerAccount, MimirKey, ModuleName, TxId, MAX_BASIS_POINTS,
};
use mc_traits::{
	impl_pallet_safe_mode, AddressConverter, AffiliateFeeApi, CacaoPoolApi, Ledger, Mimir,
	PoolApi,
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

impl_pallet_safe_mode!(PalletSafeMode; deposits_enabled, withdrawals_enabled);

#[derive(
	Clone, Default, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize,
)]
pub struct CacaoPool {
	pub reserve_units: AssetAmount,
	pub pool_units: AssetAmount,
	pub cacao_deposited: AssetAmount,
	pub cacao_withdrawn: AssetAmount,
}

impl CacaoPool {
	pub fn total_units(&self) -> AssetAmount {
		self.reserve_units.saturating_add(self.pool_units)
	}

	/// Units minted for `amount` CACAO added to a pool worth `value`.
	fn units_for(&self, amount: AssetAmount, value: AssetAmount) -> AssetAmount {
		match self.total_units() {
			0 => amount,
			total_units => get_safe_share(amount, value, total_units),
		}
	}

	fn value_of(&self, units: AssetAmount, value: AssetAmount) -> AssetAmount {
		get_safe_share(units, self.total_units(), value)
	}
}

#[derive(
	Clone, Default, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize,
)]
pub struct CacaoProvider {
	pub deposit_amount: AssetAmount,
	pub withdraw_amount: AssetAmount,
	pub units: AssetAmount,
	pub last_deposit_height: u64,
	pub last_withdraw_height: u64,
}

impl CacaoProvider {
	/// What is still invested: deposits less withdrawals.
	pub fn current_deposit(&self) -> AssetAmount {
		self.deposit_amount.saturating_sub(self.withdraw_amount)
	}
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSummary {
	pub units: AssetAmount,
	pub value: AssetAmount,
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersSummary {
	pub units: AssetAmount,
	pub value: AssetAmount,
	pub current_deposit: AssetAmount,
	pub pnl: i128,
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacaoPoolSummary {
	/// CACAO value of the liquidity positions held by the pool.
	pub pol: AssetAmount,
	pub reserve: PositionSummary,
	pub providers: ProvidersSummary,
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacaoProviderSummary {
	pub deposit_amount: AssetAmount,
	pub withdraw_amount: AssetAmount,
	pub units: AssetAmount,
	pub value: AssetAmount,
	pub pnl: i128,
	pub last_deposit_height: u64,
	pub last_withdraw_height: u64,
}

fn pnl(value: AssetAmount, invested: AssetAmount) -> i128 {
	i128::try_from(value)
		.unwrap_or(i128::MAX)
		.saturating_sub(i128::try_from(invested).unwrap_or(i128::MAX))
}

#[frame_support::pallet]
pub mod pallet {
	use super::*;

	#[pallet::config]
	#[pallet::disable_frame_system_supertrait_check]
	pub trait Config: mc_traits::Mayachain {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		type Ledger: Ledger<AccountId = Self::AccountId>;

		type PoolApi: PoolApi;

		type AddressConverter: AddressConverter<AccountId = Self::AccountId>;

		/// Pays the affiliate share of withdrawn yield.
		type AffiliateFeeApi: AffiliateFeeApi;

		type SafeMode: Get<PalletSafeMode>;

		type WeightInfo: WeightInfo;
	}

	#[pallet::pallet]
	#[pallet::storage_version(PALLET_VERSION)]
	#[pallet::without_storage_info]
	pub struct Pallet<T>(PhantomData<T>);

	#[pallet::storage]
	pub type CacaoPoolState<T> = StorageValue<_, CacaoPool, ValueQuery>;

	#[pallet::storage]
	pub type CacaoProviders<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, CacaoProvider, OptionQuery>;

	#[pallet::event]
	#[pallet::generate_deposit(pub(super) fn deposit_event)]
	pub enum Event<T: Config> {
		CacaoPoolDeposited {
			owner: T::AccountId,
			tx_id: TxId,
			amount: AssetAmount,
			units: AssetAmount,
		},
		CacaoPoolWithdrawn {
			owner: T::AccountId,
			tx_id: TxId,
			basis_points: BasisPoints,
			units: AssetAmount,
			amount: AssetAmount,
			affiliate_amount: AssetAmount,
		},
		SwapFeeAccrued { pool: Asset, amount: AssetAmount },
		ReserveEntered { amount: AssetAmount, units: AssetAmount },
		ReserveExited { amount: AssetAmount, units: AssetAmount },
	}

	#[pallet::error]
	pub enum Error<T> {
		/// `CACAOPoolEnabled` is not set.
		CacaoPoolDisabled,
		DepositsDisabled,
		WithdrawalsDisabled,
		ZeroAmount,
		/// The deposit is too small to mint a unit.
		ZeroUnits,
		/// Basis points must be between 1 and 10000.
		InvalidBasisPoints,
		NoCacaoProvider,
		/// The last deposit has not reached `CACAOPoolDepositMaturityBlocks`.
		DepositNotMature,
		NothingToWithdraw,
		/// The pool's liquid CACAO does not cover the withdrawal.
		InsufficientPoolBalance,
		/// The Reserve's position would be worth more than `CACAOPoolMaxReserveBackstop`.
		ReserveBackstopExceeded,
	}

	#[pallet::call]
	impl<T: Config> Pallet<T> {
		/// Moves `amount` CACAO from the Reserve into the pool. Requires Governance.
		///
		/// ## Events
		///
		/// - [ReserveEntered](Event::ReserveEntered)
		///
		/// ## Errors
		///
		/// - [BadOrigin](frame_system::BadOrigin)
		/// - [ZeroAmount](Error::ZeroAmount)
		/// - [ZeroUnits](Error::ZeroUnits)
		/// - [ReserveBackstopExceeded](Error::ReserveBackstopExceeded)
		#[pallet::call_index(0)]
		#[pallet::weight(T::WeightInfo::reserve_enter())]
		pub fn reserve_enter(origin: OriginFor<T>, amount: AssetAmount) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			ensure!(amount > 0, Error::<T>::ZeroAmount);

			let value = Self::pool_value();
			let mut pool = CacaoPoolState::<T>::get();
			let units = pool.units_for(amount, value);
			ensure!(units > 0, Error::<T>::ZeroUnits);
			pool.reserve_units = pool.reserve_units.saturating_add(units);
			ensure!(
				pool.value_of(pool.reserve_units, value.saturating_add(amount)) <=
					T::Mimir::get_amount(MimirKey::CacaoPoolMaxReserveBackstop),
				Error::<T>::ReserveBackstopExceeded
			);

			T::Ledger::transfer(
				&LedgerAccount::Module(ModuleName::Reserve),
				&LedgerAccount::Module(ModuleName::CacaoPool),
				&Asset::cacao(),
				amount,
			)?;
			CacaoPoolState::<T>::put(pool);
			Self::deposit_event(Event::ReserveEntered { amount, units });
			Ok(())
		}

		/// Redeems `basis_points` of the Reserve's units back to the Reserve. Requires
		/// Governance.
		///
		/// ## Events
		///
		/// - [ReserveExited](Event::ReserveExited)
		///
		/// ## Errors
		///
		/// - [BadOrigin](frame_system::BadOrigin)
		/// - [InvalidBasisPoints](Error::InvalidBasisPoints)
		/// - [NothingToWithdraw](Error::NothingToWithdraw)
		/// - [InsufficientPoolBalance](Error::InsufficientPoolBalance)
		#[pallet::call_index(1)]
		#[pallet::weight(T::WeightInfo::reserve_exit())]
		pub fn reserve_exit(origin: OriginFor<T>, basis_points: BasisPoints) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			ensure!(
				(1..=MAX_BASIS_POINTS).contains(&basis_points),
				Error::<T>::InvalidBasisPoints
			);

			let value = Self::pool_value();
			let mut pool = CacaoPoolState::<T>::get();
			let units = bps_share(basis_points, pool.reserve_units);
			let amount = pool.value_of(units, value);
			ensure!(amount > 0, Error::<T>::NothingToWithdraw);
			ensure!(amount <= Self::liquid_balance(), Error::<T>::InsufficientPoolBalance);

			pool.reserve_units = pool.reserve_units.saturating_sub(units);
			T::Ledger::transfer(
				&LedgerAccount::Module(ModuleName::CacaoPool),
				&LedgerAccount::Module(ModuleName::Reserve),
				&Asset::cacao(),
				amount,
			)?;
			CacaoPoolState::<T>::put(pool);
			Self::deposit_event(Event::ReserveExited { amount, units });
			Ok(())
		}
	}
}

impl<T: Config> Pallet<T> {
	fn current_height() -> u64 {
		frame_system::Pallet::<T>::block_number().saturated_into()
	}

	fn liquid_balance() -> AssetAmount {
		T::Ledger::module_balance(ModuleName::CacaoPool, &Asset::cacao())
	}

	pub fn pol() -> AssetAmount {
		T::PoolApi::lp_value_in_cacao(&T::AddressConverter::module_address(ModuleName::CacaoPool))
	}

	/// Everything the units are a claim on.
	pub fn pool_value() -> AssetAmount {
		Self::liquid_balance().saturating_add(Self::pol())
	}

	pub fn cacao_pool_summary() -> CacaoPoolSummary {
		let pool = CacaoPoolState::<T>::get();
		let value = Self::pool_value();
		let providers_value = pool.value_of(pool.pool_units, value);
		let current_deposit = pool.cacao_deposited.saturating_sub(pool.cacao_withdrawn);
		CacaoPoolSummary {
			pol: Self::pol(),
			reserve: PositionSummary {
				units: pool.reserve_units,
				value: pool.value_of(pool.reserve_units, value),
			},
			providers: ProvidersSummary {
				units: pool.pool_units,
				value: providers_value,
				current_deposit,
				pnl: pnl(providers_value, current_deposit),
			},
		}
	}

	pub fn cacao_provider(owner: &T::AccountId) -> Option<CacaoProviderSummary> {
		let provider = CacaoProviders::<T>::get(owner)?;
		Some(Self::summarise(&CacaoPoolState::<T>::get(), Self::pool_value(), provider))
	}

	pub fn cacao_providers() -> Vec<(T::AccountId, CacaoProviderSummary)> {
		let pool = CacaoPoolState::<T>::get();
		let value = Self::pool_value();
		CacaoProviders::<T>::iter()
			.map(|(owner, provider)| (owner, Self::summarise(&pool, value, provider)))
			.collect()
	}

	fn summarise(
		pool: &CacaoPool,
		value: AssetAmount,
		provider: CacaoProvider,
	) -> CacaoProviderSummary {
		let provider_value = pool.value_of(provider.units, value);
		CacaoProviderSummary {
			pnl: pnl(provider_value, provider.current_deposit()),
			deposit_amount: provider.deposit_amount,
			withdraw_amount: provider.withdraw_amount,
			units: provider.units,
			value: provider_value,
			last_deposit_height: provider.last_deposit_height,
			last_withdraw_height: provider.last_withdraw_height,
		}
	}

	fn ensure_enabled() -> DispatchResult {
		ensure!(T::Mimir::is_enabled(MimirKey::CacaoPoolEnabled), Error::<T>::CacaoPoolDisabled);
		Ok(())
	}

	/// Pays the affiliates their share of `yield_amount` from the pool. Returns what was paid.
	fn pay_yield_affiliates(
		affiliates: &[Affiliate],
		yield_amount: AssetAmount,
		tx_id: TxId,
	) -> Result<AssetAmount, DispatchError> {
		if affiliates.is_empty() || yield_amount == 0 {
			return Ok(0)
		}
		let shares =
			T::AffiliateFeeApi::affiliate_shares(affiliates, yield_amount, MAX_BASIS_POINTS);
		let paid = T::AffiliateFeeApi::pay_affiliates(ModuleName::CacaoPool, tx_id, shares)?;
		Ok(paid.min(yield_amount))
	}
}

impl<T: Config> CacaoPoolApi for Pallet<T> {
	type AccountId = T::AccountId;

	/// ## Events
	///
	/// - [CacaoPoolDeposited](Event::CacaoPoolDeposited)
	///
	/// ## Errors
	///
	/// - [DepositsDisabled](Error::DepositsDisabled)
	/// - [CacaoPoolDisabled](Error::CacaoPoolDisabled)
	/// - [ZeroAmount](Error::ZeroAmount)
	/// - [ZeroUnits](Error::ZeroUnits)
	fn deposit(owner: &T::AccountId, amount: AssetAmount, tx_id: TxId) -> DispatchResult {
		ensure!(T::SafeMode::get().deposits_enabled, Error::<T>::DepositsDisabled);
		Self::ensure_enabled()?;
		ensure!(amount > 0, Error::<T>::ZeroAmount);

		let value = Self::pool_value();
		let mut pool = CacaoPoolState::<T>::get();
		let units = pool.units_for(amount, value);
		ensure!(units > 0, Error::<T>::ZeroUnits);

		T::Ledger::transfer(
			&LedgerAccount::Module(ModuleName::Asgard),
			&LedgerAccount::Module(ModuleName::CacaoPool),
			&Asset::cacao(),
			amount,
		)?;

		CacaoProviders::<T>::mutate(owner, |maybe_provider| {
			let provider = maybe_provider.get_or_insert_with(Default::default);
			provider.units = provider.units.saturating_add(units);
			provider.deposit_amount = provider.deposit_amount.saturating_add(amount);
			provider.last_deposit_height = Self::current_height();
		});
		pool.pool_units = pool.pool_units.saturating_add(units);
		pool.cacao_deposited = pool.cacao_deposited.saturating_add(amount);
		CacaoPoolState::<T>::put(pool);

		log::info!(target: "mc-cacao-pool", "Deposit of {amount} for {units} units.");
		Self::deposit_event(Event::CacaoPoolDeposited {
			owner: owner.clone(),
			tx_id,
			amount,
			units,
		});
		Ok(())
	}

	/// Affiliates only share in the yield of the withdrawn fraction, never in the principal.
	///
	/// ## Events
	///
	/// - [CacaoPoolWithdrawn](Event::CacaoPoolWithdrawn)
	///
	/// ## Errors
	///
	/// - [WithdrawalsDisabled](Error::WithdrawalsDisabled)
	/// - [CacaoPoolDisabled](Error::CacaoPoolDisabled)
	/// - [InvalidBasisPoints](Error::InvalidBasisPoints)
	/// - [NoCacaoProvider](Error::NoCacaoProvider)
	/// - [DepositNotMature](Error::DepositNotMature)
	/// - [NothingToWithdraw](Error::NothingToWithdraw)
	/// - [InsufficientPoolBalance](Error::InsufficientPoolBalance)
	fn withdraw(
		owner: &T::AccountId,
		basis_points: BasisPoints,
		affiliates: &[Affiliate],
		tx_id: TxId,
	) -> DispatchResult {
		ensure!(T::SafeMode::get().withdrawals_enabled, Error::<T>::WithdrawalsDisabled);
		Self::ensure_enabled()?;
		ensure!(
			(1..=MAX_BASIS_POINTS).contains(&basis_points),
			Error::<T>::InvalidBasisPoints
		);

		let mut provider = CacaoProviders::<T>::get(owner).ok_or(Error::<T>::NoCacaoProvider)?;
		let now = Self::current_height();
		ensure!(
			now.saturating_sub(provider.last_deposit_height) >=
				T::Mimir::get_u64(MimirKey::CacaoPoolDepositMaturityBlocks),
			Error::<T>::DepositNotMature
		);

		let value = Self::pool_value();
		let mut pool = CacaoPoolState::<T>::get();
		let units = bps_share(basis_points, provider.units);
		let amount = pool.value_of(units, value);
		ensure!(amount > 0, Error::<T>::NothingToWithdraw);
		ensure!(amount <= Self::liquid_balance(), Error::<T>::InsufficientPoolBalance);

		let affiliates = if T::Mimir::behaviour().cacao_pool_withdraw_affiliates {
			affiliates
		} else {
			&[]
		};
		let yield_amount = bps_share(
			basis_points,
			pool.value_of(provider.units, value).saturating_sub(provider.current_deposit()),
		);

		provider.units = provider.units.saturating_sub(units);
		provider.withdraw_amount = provider.withdraw_amount.saturating_add(amount);
		provider.last_withdraw_height = now;
		CacaoProviders::<T>::insert(owner, provider);
		pool.pool_units = pool.pool_units.saturating_sub(units);
		pool.cacao_withdrawn = pool.cacao_withdrawn.saturating_add(amount);
		CacaoPoolState::<T>::put(pool);

		let affiliate_amount = Self::pay_yield_affiliates(affiliates, yield_amount, tx_id)?;
		let user_amount = amount.saturating_sub(affiliate_amount);
		T::Ledger::transfer(
			&LedgerAccount::Module(ModuleName::CacaoPool),
			&LedgerAccount::Account(owner.clone()),
			&Asset::cacao(),
			user_amount,
		)?;

		log::info!(
			target: "mc-cacao-pool",
			"Withdrew {units} units: {user_amount} to the owner, {affiliate_amount} to affiliates.",
		);
		Self::deposit_event(Event::CacaoPoolWithdrawn {
			owner: owner.clone(),
			tx_id,
			basis_points,
			units,
			amount,
			affiliate_amount,
		});
		Ok(())
	}

	fn accrue_swap_fee(pool_asset: &Asset, liquidity_fee_in_cacao: AssetAmount) -> AssetAmount {
		if !T::Mimir::is_enabled(MimirKey::CacaoPoolRewardsEnabled) {
			return 0
		}
		let share =
			bps_share(T::Mimir::get_bps(MimirKey::CacaoPoolRewardsBps), liquidity_fee_in_cacao);
		if share == 0 {
			return 0
		}
		with_storage_layer(|| {
			let taken = T::PoolApi::take_cacao_from_depth(pool_asset, share)?;
			T::Ledger::transfer(
				&LedgerAccount::Module(ModuleName::Asgard),
				&LedgerAccount::Module(ModuleName::CacaoPool),
				&Asset::cacao(),
				taken,
			)?;
			Ok::<_, DispatchError>(taken)
		})
		.map(|taken| {
			Self::deposit_event(Event::SwapFeeAccrued { pool: pool_asset.clone(), amount: taken });
			taken
		})
		.unwrap_or_else(|error| {
			log::error!(
				target: "mc-cacao-pool",
				"Swap fee share from the {pool_asset} pool not taken: {error:?}",
			);
			0
		})
	}
}
