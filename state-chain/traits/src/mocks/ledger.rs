use super::{MockPallet, MockPalletStorage};
use crate::Ledger;
use frame_support::pallet_prelude::{DispatchError, DispatchResult};
use mc_primitives::{Asset, AssetAmount, LedgerAccount};

pub struct MockLedger;

impl MockPallet for MockLedger {
	const PREFIX: &'static [u8] = b"MockLedger";
}

const BALANCES: &[u8] = b"BALANCES";
const SUPPLY: &[u8] = b"SUPPLY";

impl MockLedger {
	pub fn set_balance(who: LedgerAccount<u64>, asset: Asset, amount: AssetAmount) {
		let previous = Self::balance(&who, &asset);
		Self::mutate_storage::<_, AssetAmount, _>(SUPPLY, &asset, |supply| {
			*supply = Some(supply.unwrap_or_default() - previous + amount);
		});
		Self::put_storage(BALANCES, (who, asset), amount);
	}

	fn credit(who: &LedgerAccount<u64>, asset: &Asset, amount: AssetAmount) {
		Self::mutate_storage::<_, AssetAmount, _>(BALANCES, &(who, asset), |balance| {
			*balance = Some(balance.unwrap_or_default() + amount);
		});
	}

	fn debit(who: &LedgerAccount<u64>, asset: &Asset, amount: AssetAmount) -> DispatchResult {
		Self::mutate_storage::<_, AssetAmount, _>(BALANCES, &(who, asset), |balance| {
			let remaining = balance
				.unwrap_or_default()
				.checked_sub(amount)
				.ok_or::<DispatchError>("Insufficient balance".into())?;
			*balance = Some(remaining);
			Ok(())
		})
	}
}

impl Ledger for MockLedger {
	type AccountId = u64;

	fn balance(who: &LedgerAccount<u64>, asset: &Asset) -> AssetAmount {
		Self::get_storage(BALANCES, (who, asset)).unwrap_or_default()
	}

	fn total_supply(asset: &Asset) -> AssetAmount {
		Self::get_storage(SUPPLY, asset).unwrap_or_default()
	}

	fn mint(to: &LedgerAccount<u64>, asset: &Asset, amount: AssetAmount) -> DispatchResult {
		Self::credit(to, asset, amount);
		Self::mutate_storage::<_, AssetAmount, _>(SUPPLY, asset, |supply| {
			*supply = Some(supply.unwrap_or_default() + amount);
		});
		Ok(())
	}

	fn burn(from: &LedgerAccount<u64>, asset: &Asset, amount: AssetAmount) -> DispatchResult {
		Self::debit(from, asset, amount)?;
		Self::mutate_storage::<_, AssetAmount, _>(SUPPLY, asset, |supply| {
			*supply = Some(supply.unwrap_or_default().saturating_sub(amount));
		});
		Ok(())
	}

	fn transfer(
		from: &LedgerAccount<u64>,
		to: &LedgerAccount<u64>,
		asset: &Asset,
		amount: AssetAmount,
	) -> DispatchResult {
		Self::debit(from, asset, amount)?;
		Self::credit(to, asset, amount);
		Ok(())
	}
}
