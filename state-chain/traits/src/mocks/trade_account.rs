use super::{MockPallet, MockPalletStorage};
use crate::TradeAccountApi;
use frame_support::pallet_prelude::{DispatchError, DispatchResult};
use mc_primitives::{Address, Asset, AssetAmount, TxId};

pub struct MockTradeAccountApi;

impl MockPallet for MockTradeAccountApi {
	const PREFIX: &'static [u8] = b"MockTradeAccountApi";
}

const BALANCES: &[u8] = b"BALANCES";
const WITHDRAWALS: &[u8] = b"WITHDRAWALS";

impl MockTradeAccountApi {
	/// `(asset, amount, owner, destination)` for every withdrawal.
	pub fn withdrawals() -> Vec<(Asset, AssetAmount, u64, Address)> {
		Self::get_value(WITHDRAWALS).unwrap_or_default()
	}
}

impl TradeAccountApi for MockTradeAccountApi {
	type AccountId = u64;

	fn deposit(
		asset: &Asset,
		amount: AssetAmount,
		owner: &u64,
		_tx_id: TxId,
	) -> Result<AssetAmount, DispatchError> {
		Self::mutate_storage::<_, AssetAmount, _>(
			BALANCES,
			&(asset.get_trade_asset(), owner),
			|balance| *balance = Some(balance.unwrap_or_default() + amount),
		);
		Ok(amount)
	}

	fn withdrawal(
		asset: &Asset,
		amount: AssetAmount,
		owner: &u64,
		destination: &Address,
		_tx_id: TxId,
	) -> Result<AssetAmount, DispatchError> {
		let amount = amount.min(Self::balance_of(asset, owner));
		if amount == 0 {
			return Err("Nothing to withdraw".into())
		}
		Self::debit(asset, amount, owner)?;
		super::push_value::<Self, _>(
			WITHDRAWALS,
			(asset.get_trade_asset(), amount, *owner, destination.clone()),
		);
		Ok(amount)
	}

	fn debit(asset: &Asset, amount: AssetAmount, owner: &u64) -> DispatchResult {
		Self::mutate_storage::<_, AssetAmount, _>(
			BALANCES,
			&(asset.get_trade_asset(), owner),
			|balance| {
				let remaining = balance
					.unwrap_or_default()
					.checked_sub(amount)
					.ok_or::<DispatchError>("Insufficient trade balance".into())?;
				*balance = Some(remaining);
				Ok(())
			},
		)
	}

	fn balance_of(asset: &Asset, owner: &u64) -> AssetAmount {
		Self::get_storage(BALANCES, (asset.get_trade_asset(), owner)).unwrap_or_default()
	}
}
