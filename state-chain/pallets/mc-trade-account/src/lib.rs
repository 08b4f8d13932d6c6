#![cfg_attr(not(feature = "std"), no_std)]

//! Trade accounts.
//!
//! A trade account holds a claim on layer-1 collateral that stays in the protocol's vaults. Claims
//! move between accounts and pools natively and leave the protocol only through a withdrawal,
//! which schedules an outbound of the layer-1 asset.
//!
//! Each trade asset has a [TradeUnit] aggregate. Its depth is the collateral backing every
//! account's balance, and must never exceed what the vaults hold of the layer-1 asset.

use frame_support::{
	pallet_prelude::*, sp_runtime::SaturatedConversion, storage::with_storage_layer,
};
use frame_system::pallet_prelude::*;
use mc_amm::get_safe_share;
use mc_primitives::{Address, Asset, AssetAmount, Coin, MimirKey, TxId};
use mc_traits::{
	impl_pallet_safe_mode, Mimir, TradeAccountApi, TxOutItem, TxOutStore, VaultLedger,
};
use serde::{Deserialize, Serialize};
use sp_std::vec::Vec;

pub use pallet::*;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests;

pub const PALLET_VERSION: StorageVersion = StorageVersion::new(0);

impl_pallet_safe_mode!(PalletSafeMode; deposits_enabled, withdrawals_enabled);

#[derive(
	Clone, Default, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize,
)]
pub struct TradeAccount {
	pub units: AssetAmount,
	pub last_add_height: u64,
	pub last_withdraw_height: u64,
}

/// The aggregate of every account holding `asset`.
#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct TradeUnit {
	pub asset: Asset,
	pub units: AssetAmount,
	pub depth: AssetAmount,
}

impl TradeUnit {
	fn empty(asset: Asset) -> Self {
		TradeUnit { asset, units: 0, depth: 0 }
	}

	fn units_for(&self, amount: AssetAmount) -> AssetAmount {
		match self.units {
			0 => amount,
			units => get_safe_share(amount, self.depth, units),
		}
	}

	fn value_of(&self, units: AssetAmount) -> AssetAmount {
		get_safe_share(units, self.units, self.depth)
	}
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeAccountSummary<AccountId> {
	pub asset: Asset,
	pub owner: AccountId,
	pub units: AssetAmount,
	pub balance: AssetAmount,
	pub last_add_height: u64,
	pub last_withdraw_height: u64,
}

/// Trade depth measured against the vault collateral of the layer-1 asset.
#[derive(Clone, RuntimeDebug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solvency {
	pub asset: Asset,
	pub depth: AssetAmount,
	pub collateral: AssetAmount,
}

impl Solvency {
	pub fn is_solvent(&self) -> bool {
		self.depth <= self.collateral
	}
}

#[frame_support::pallet]
pub mod pallet {
	use super::*;

	#[pallet::config]
	#[pallet::disable_frame_system_supertrait_check]
	pub trait Config: mc_traits::Mayachain {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		/// Withdrawals leave through here.
		type TxOutStore: TxOutStore;

		/// Collateral backing the trade assets.
		type VaultLedger: VaultLedger;

		type SafeMode: Get<PalletSafeMode>;
	}

	#[pallet::pallet]
	#[pallet::storage_version(PALLET_VERSION)]
	#[pallet::without_storage_info]
	pub struct Pallet<T>(PhantomData<T>);

	/// Keyed by trade asset.
	#[pallet::storage]
	pub type TradeAccounts<T: Config> = StorageDoubleMap<
		_,
		Twox64Concat,
		Asset,
		Blake2_128Concat,
		T::AccountId,
		TradeAccount,
		OptionQuery,
	>;

	#[pallet::storage]
	pub type TradeUnits<T> = StorageMap<_, Twox64Concat, Asset, TradeUnit, OptionQuery>;

	#[pallet::event]
	#[pallet::generate_deposit(pub(super) fn deposit_event)]
	pub enum Event<T: Config> {
		TradeAccountDeposited {
			owner: T::AccountId,
			asset: Asset,
			amount: AssetAmount,
			tx_id: TxId,
		},
		TradeAccountWithdrawn {
			owner: T::AccountId,
			asset: Asset,
			amount: AssetAmount,
			destination: Address,
			tx_id: TxId,
		},
		/// Spent inside the protocol, e.g. as a swap input.
		TradeAccountDebited { owner: T::AccountId, asset: Asset, amount: AssetAmount },
	}

	#[pallet::error]
	pub enum Error<T> {
		/// `TradeAccountsEnabled` is not set.
		TradeAccountsDisabled,
		DepositsDisabled,
		WithdrawalsDisabled,
		/// Only external layer-1 assets and their trade assets can be held.
		InvalidTradeAsset,
		ZeroAmount,
		NothingToWithdraw,
		InsufficientTradeBalance,
	}
}

impl<T: Config> Pallet<T> {
	fn current_height() -> u64 {
		frame_system::Pallet::<T>::block_number().saturated_into()
	}

	/// Normalises `asset` to its trade asset.
	fn trade_asset(asset: &Asset) -> Result<Asset, Error<T>> {
		ensure!(!asset.chain.is_native() && !asset.is_synth(), Error::<T>::InvalidTradeAsset);
		Ok(asset.get_trade_asset())
	}

	pub fn trade_unit(asset: &Asset) -> TradeUnit {
		let asset = asset.get_trade_asset();
		TradeUnits::<T>::get(&asset).unwrap_or_else(|| TradeUnit::empty(asset))
	}

	pub fn trade_account(
		asset: &Asset,
		owner: &T::AccountId,
	) -> Option<TradeAccountSummary<T::AccountId>> {
		let asset = asset.get_trade_asset();
		let account = TradeAccounts::<T>::get(&asset, owner)?;
		Some(Self::summarise(&Self::trade_unit(&asset), owner.clone(), account))
	}

	/// Every trade asset held by `owner`.
	pub fn trade_accounts(owner: &T::AccountId) -> Vec<TradeAccountSummary<T::AccountId>> {
		TradeUnits::<T>::iter_values()
			.filter_map(|unit| {
				TradeAccounts::<T>::get(&unit.asset, owner)
					.map(|account| Self::summarise(&unit, owner.clone(), account))
			})
			.collect()
	}

	/// Every holder of `asset`.
	pub fn trade_asset_holders(asset: &Asset) -> Vec<TradeAccountSummary<T::AccountId>> {
		let unit = Self::trade_unit(asset);
		TradeAccounts::<T>::iter_prefix(&unit.asset)
			.map(|(owner, account)| Self::summarise(&unit, owner, account))
			.collect()
	}

	fn summarise(
		unit: &TradeUnit,
		owner: T::AccountId,
		account: TradeAccount,
	) -> TradeAccountSummary<T::AccountId> {
		TradeAccountSummary {
			asset: unit.asset.clone(),
			owner,
			units: account.units,
			balance: unit.value_of(account.units),
			last_add_height: account.last_add_height,
			last_withdraw_height: account.last_withdraw_height,
		}
	}

	pub fn check_solvency(asset: &Asset) -> Solvency {
		let unit = Self::trade_unit(asset);
		Solvency {
			collateral: T::VaultLedger::vault_balance(&unit.asset.get_layer1_asset()),
			asset: unit.asset,
			depth: unit.depth,
		}
	}

	/// Trade assets whose depth is not covered by vault collateral.
	pub fn insolvent_assets() -> Vec<Solvency> {
		TradeUnits::<T>::iter_values()
			.map(|unit| Self::check_solvency(&unit.asset))
			.filter(|solvency| !solvency.is_solvent())
			.collect()
	}

	fn ensure_enabled(flag: MimirKey, error: Error<T>) -> DispatchResult {
		ensure!(
			T::Mimir::is_enabled(MimirKey::TradeAccountsEnabled),
			Error::<T>::TradeAccountsDisabled
		);
		ensure!(T::Mimir::is_enabled(flag), error);
		Ok(())
	}

	/// Burns the units backing `amount` of `owner`'s balance.
	fn debit_units(asset: &Asset, amount: AssetAmount, owner: &T::AccountId) -> DispatchResult {
		let mut unit = Self::trade_unit(asset);
		TradeAccounts::<T>::try_mutate_exists(&unit.asset.clone(), owner, |maybe_account| {
			let account = maybe_account.as_mut().ok_or(Error::<T>::InsufficientTradeBalance)?;
			ensure!(
				amount <= unit.value_of(account.units),
				Error::<T>::InsufficientTradeBalance
			);
			let units = unit.units_for(amount).min(account.units);
			account.units -= units;
			account.last_withdraw_height = Self::current_height();
			if account.units == 0 {
				*maybe_account = None;
			}
			unit.units = unit.units.saturating_sub(units);
			unit.depth = unit.depth.saturating_sub(amount);
			Ok::<_, DispatchError>(())
		})?;
		TradeUnits::<T>::insert(unit.asset.clone(), unit);
		Ok(())
	}
}

impl<T: Config> TradeAccountApi for Pallet<T> {
	type AccountId = T::AccountId;

	/// The layer-1 coin must already be in a vault.
	///
	/// ## Events
	///
	/// - [TradeAccountDeposited](Event::TradeAccountDeposited)
	///
	/// ## Errors
	///
	/// - [DepositsDisabled](Error::DepositsDisabled)
	/// - [TradeAccountsDisabled](Error::TradeAccountsDisabled)
	/// - [InvalidTradeAsset](Error::InvalidTradeAsset)
	/// - [ZeroAmount](Error::ZeroAmount)
	fn deposit(
		asset: &Asset,
		amount: AssetAmount,
		owner: &T::AccountId,
		tx_id: TxId,
	) -> Result<AssetAmount, DispatchError> {
		ensure!(T::SafeMode::get().deposits_enabled, Error::<T>::DepositsDisabled);
		Self::ensure_enabled(MimirKey::TradeAccountsDepositEnabled, Error::<T>::DepositsDisabled)?;
		let asset = Self::trade_asset(asset)?;
		ensure!(amount > 0, Error::<T>::ZeroAmount);

		let mut unit = Self::trade_unit(&asset);
		let units = unit.units_for(amount);
		TradeAccounts::<T>::mutate(&asset, owner, |maybe_account| {
			let account = maybe_account.get_or_insert_with(Default::default);
			account.units = account.units.saturating_add(units);
			account.last_add_height = Self::current_height();
		});
		unit.units = unit.units.saturating_add(units);
		unit.depth = unit.depth.saturating_add(amount);
		TradeUnits::<T>::insert(&asset, unit);

		log::debug!(target: "mc-trade-account", "Deposited {amount} {asset} for {units} units.");
		Self::deposit_event(Event::TradeAccountDeposited {
			owner: owner.clone(),
			asset,
			amount,
			tx_id,
		});
		Ok(amount)
	}

	/// Withdraws up to `amount`. The outbound carries the layer-1 asset, so the destination
	/// receives the withdrawn amount less the outbound fee.
	///
	/// ## Events
	///
	/// - [TradeAccountWithdrawn](Event::TradeAccountWithdrawn)
	///
	/// ## Errors
	///
	/// - [WithdrawalsDisabled](Error::WithdrawalsDisabled)
	/// - [TradeAccountsDisabled](Error::TradeAccountsDisabled)
	/// - [InvalidTradeAsset](Error::InvalidTradeAsset)
	/// - [NothingToWithdraw](Error::NothingToWithdraw)
	fn withdrawal(
		asset: &Asset,
		amount: AssetAmount,
		owner: &T::AccountId,
		destination: &Address,
		tx_id: TxId,
	) -> Result<AssetAmount, DispatchError> {
		ensure!(T::SafeMode::get().withdrawals_enabled, Error::<T>::WithdrawalsDisabled);
		Self::ensure_enabled(
			MimirKey::TradeAccountsWithdrawEnabled,
			Error::<T>::WithdrawalsDisabled,
		)?;
		let asset = Self::trade_asset(asset)?;
		let amount = amount.min(Self::balance_of(&asset, owner));
		ensure!(amount > 0, Error::<T>::NothingToWithdraw);

		with_storage_layer(|| {
			Self::debit_units(&asset, amount, owner)?;
			T::TxOutStore::try_add_tx_out_item(TxOutItem::new(
				tx_id,
				destination.clone(),
				Coin::new(asset.get_layer1_asset(), amount),
				Vec::new(),
			))
			.map_err(|error| {
				log::warn!(
					target: "mc-trade-account",
					"Outbound of {amount} {asset} to {destination} failed: {error:?}",
				);
				error
			})
		})?;

		Self::deposit_event(Event::TradeAccountWithdrawn {
			owner: owner.clone(),
			asset,
			amount,
			destination: destination.clone(),
			tx_id,
		});
		Ok(amount)
	}

	fn debit(asset: &Asset, amount: AssetAmount, owner: &T::AccountId) -> DispatchResult {
		let asset = Self::trade_asset(asset)?;
		ensure!(amount > 0, Error::<T>::ZeroAmount);
		Self::debit_units(&asset, amount, owner)?;
		Self::deposit_event(Event::TradeAccountDebited { owner: owner.clone(), asset, amount });
		Ok(())
	}

	fn balance_of(asset: &Asset, owner: &T::AccountId) -> AssetAmount {
		let unit = Self::trade_unit(asset);
		TradeAccounts::<T>::get(&unit.asset, owner)
			.map(|account| unit.value_of(account.units))
			.unwrap_or_default()
	}
}
