use super::{MockPallet, MockPalletStorage};
use crate::{GasManager, TxOutItem, TxOutStore};
use frame_support::pallet_prelude::DispatchError;
use mc_primitives::AssetAmount;

use super::gas_manager::MockGasManager;

/// Records scheduled items, charging [MockGasManager]'s outbound fee.
pub struct MockTxOutStore;

impl MockPallet for MockTxOutStore {
	const PREFIX: &'static [u8] = b"MockTxOutStore";
}

const ITEMS: &[u8] = b"ITEMS";
const SHOULD_FAIL: &[u8] = b"SHOULD_FAIL";

impl MockTxOutStore {
	/// Items scheduled so far, with the amount net of fees.
	pub fn scheduled() -> Vec<TxOutItem> {
		Self::get_value(ITEMS).unwrap_or_default()
	}

	pub fn set_should_fail(should_fail: bool) {
		Self::put_value(SHOULD_FAIL, should_fail);
	}
}

impl TxOutStore for MockTxOutStore {
	fn try_add_tx_out_item(mut item: TxOutItem) -> Result<AssetAmount, DispatchError> {
		if Self::get_value(SHOULD_FAIL).unwrap_or(false) {
			return Err("Outbound failed".into())
		}
		let net = item.coin.amount.saturating_sub(MockGasManager::outbound_fee(&item.coin.asset));
		if net == 0 {
			return Err("Outbound amount too low".into())
		}
		item.coin.amount = net;
		if Self::scheduled().iter().any(|existing| existing.fingerprint() == item.fingerprint()) {
			return Err("Duplicate outbound".into())
		}
		super::push_value::<Self, _>(ITEMS, item);
		Ok(net)
	}
}
