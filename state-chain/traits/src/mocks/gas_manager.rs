use super::{MockPallet, MockPalletStorage};
use crate::GasManager;
use mc_primitives::{Asset, AssetAmount, Coin, MimirKey};

pub struct MockGasManager;

impl MockPallet for MockGasManager {
	const PREFIX: &'static [u8] = b"MockGasManager";
}

const FEES: &[u8] = b"FEES";
const WITHHELD: &[u8] = b"WITHHELD";

impl MockGasManager {
	pub fn set_outbound_fee(asset: Asset, fee: AssetAmount) {
		Self::put_storage(FEES, asset, fee);
	}

	pub fn withheld(asset: &Asset) -> AssetAmount {
		Self::get_storage(WITHHELD, asset).unwrap_or_default()
	}
}

impl GasManager for MockGasManager {
	fn outbound_fee(asset: &Asset) -> AssetAmount {
		Self::get_storage(FEES, asset).unwrap_or_default()
	}

	fn native_transaction_fee() -> AssetAmount {
		MimirKey::NativeTransactionFee.default_value() as AssetAmount
	}

	fn record_withheld_fee(coin: &Coin) {
		Self::mutate_storage::<_, AssetAmount, _>(WITHHELD, &coin.asset, |withheld| {
			*withheld = Some(withheld.unwrap_or_default() + coin.amount);
		});
	}
}
