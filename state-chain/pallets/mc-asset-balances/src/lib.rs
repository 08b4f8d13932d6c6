#![cfg_attr(not(feature = "std"), no_std)]

//! The native ledger. Holds CACAO and synth balances for protocol modules and user accounts.

use frame_support::pallet_prelude::*;
use frame_system::pallet_prelude::*;
use mc_primitives::{Asset, AssetAmount, Coin, LedgerAccount, ModuleName};
use mc_traits::Ledger;
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

		type WeightInfo: WeightInfo;
	}

	#[pallet::pallet]
	#[pallet::storage_version(PALLET_VERSION)]
	#[pallet::without_storage_info]
	pub struct Pallet<T>(PhantomData<T>);

	#[pallet::storage]
	pub type Balances<T: Config> = StorageDoubleMap<
		_,
		Blake2_128Concat,
		LedgerAccount<T::AccountId>,
		Twox64Concat,
		Asset,
		AssetAmount,
		ValueQuery,
	>;

	#[pallet::storage]
	pub type TotalSupply<T> = StorageMap<_, Twox64Concat, Asset, AssetAmount, ValueQuery>;

	#[pallet::event]
	#[pallet::generate_deposit(pub(super) fn deposit_event)]
	pub enum Event<T: Config> {
		Minted { to: LedgerAccount<T::AccountId>, asset: Asset, amount: AssetAmount },
		Burned { from: LedgerAccount<T::AccountId>, asset: Asset, amount: AssetAmount },
		Transferred {
			from: LedgerAccount<T::AccountId>,
			to: LedgerAccount<T::AccountId>,
			asset: Asset,
			amount: AssetAmount,
		},
	}

	#[pallet::error]
	pub enum Error<T> {
		InsufficientBalance,
		BalanceOverflow,
		/// Only CACAO and synths can be sent between accounts.
		AssetNotTransferable,
	}

	#[pallet::call]
	impl<T: Config> Pallet<T> {
		/// Sends `coin` from the caller to `dest`.
		///
		/// ## Events
		///
		/// - [Transferred](Event::Transferred)
		///
		/// ## Errors
		///
		/// - [AssetNotTransferable](Error::AssetNotTransferable)
		/// - [InsufficientBalance](Error::InsufficientBalance)
		#[pallet::call_index(0)]
		#[pallet::weight(T::WeightInfo::transfer())]
		pub fn transfer(origin: OriginFor<T>, dest: T::AccountId, coin: Coin) -> DispatchResult {
			let from = ensure_signed(origin)?;
			ensure!(
				coin.asset.is_cacao() || coin.asset.is_synth(),
				Error::<T>::AssetNotTransferable
			);
			<Self as Ledger>::transfer(
				&LedgerAccount::Account(from),
				&LedgerAccount::Account(dest),
				&coin.asset,
				coin.amount,
			)
		}
	}

	#[pallet::genesis_config]
	#[derive(frame_support::DefaultNoBound)]
	pub struct GenesisConfig<T: Config> {
		pub balances: Vec<(LedgerAccount<T::AccountId>, Asset, AssetAmount)>,
	}

	#[pallet::genesis_build]
	impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
		fn build(&self) {
			for (who, asset, amount) in &self.balances {
				Balances::<T>::mutate(who, asset, |balance| *balance += amount);
				TotalSupply::<T>::mutate(asset, |supply| *supply += amount);
			}
		}
	}
}

impl<T: Config> Pallet<T> {
	/// Every non-zero balance held by `who`.
	pub fn balances_of(who: &LedgerAccount<T::AccountId>) -> Vec<(Asset, AssetAmount)> {
		Balances::<T>::iter_prefix(who).filter(|(_, amount)| *amount > 0).collect()
	}

	fn credit(
		who: &LedgerAccount<T::AccountId>,
		asset: &Asset,
		amount: AssetAmount,
	) -> DispatchResult {
		Balances::<T>::try_mutate(who, asset, |balance| {
			*balance = balance.checked_add(amount).ok_or(Error::<T>::BalanceOverflow)?;
			Ok(())
		})
	}

	fn debit(
		who: &LedgerAccount<T::AccountId>,
		asset: &Asset,
		amount: AssetAmount,
	) -> DispatchResult {
		Balances::<T>::try_mutate_exists(who, asset, |maybe_balance| {
			let balance = maybe_balance.unwrap_or_default();
			let remaining = balance.checked_sub(amount).ok_or_else(|| {
				log::warn!(
					target: "mc-asset-balances",
					"Debit of {amount} {asset} from {who:?} exceeds its balance of {balance}.",
				);
				Error::<T>::InsufficientBalance
			})?;
			*maybe_balance = (remaining > 0).then_some(remaining);
			Ok(())
		})
	}
}

impl<T: Config> Ledger for Pallet<T> {
	type AccountId = T::AccountId;

	fn balance(who: &LedgerAccount<T::AccountId>, asset: &Asset) -> AssetAmount {
		Balances::<T>::get(who, asset)
	}

	fn total_supply(asset: &Asset) -> AssetAmount {
		TotalSupply::<T>::get(asset)
	}

	fn mint(
		to: &LedgerAccount<T::AccountId>,
		asset: &Asset,
		amount: AssetAmount,
	) -> DispatchResult {
		if amount == 0 {
			return Ok(())
		}
		TotalSupply::<T>::try_mutate(asset, |supply| {
			*supply = supply.checked_add(amount).ok_or(Error::<T>::BalanceOverflow)?;
			Ok::<_, DispatchError>(())
		})?;
		Self::credit(to, asset, amount)?;
		Self::deposit_event(Event::Minted { to: to.clone(), asset: asset.clone(), amount });
		Ok(())
	}

	fn burn(
		from: &LedgerAccount<T::AccountId>,
		asset: &Asset,
		amount: AssetAmount,
	) -> DispatchResult {
		if amount == 0 {
			return Ok(())
		}
		Self::debit(from, asset, amount)?;
		TotalSupply::<T>::mutate(asset, |supply| *supply = supply.saturating_sub(amount));
		Self::deposit_event(Event::Burned { from: from.clone(), asset: asset.clone(), amount });
		Ok(())
	}

	fn transfer(
		from: &LedgerAccount<T::AccountId>,
		to: &LedgerAccount<T::AccountId>,
		asset: &Asset,
		amount: AssetAmount,
	) -> DispatchResult {
		if amount == 0 || from == to {
			return Ok(())
		}
		Self::debit(from, asset, amount)?;
		Self::credit(to, asset, amount)?;
		Self::deposit_event(Event::Transferred {
			from: from.clone(),
			to: to.clone(),
			asset: asset.clone(),
			amount,
		});
		Ok(())
	}

	fn module_balance(module: ModuleName, asset: &Asset) -> AssetAmount {
		Balances::<T>::get(LedgerAccount::Module(module), asset)
	}
}
