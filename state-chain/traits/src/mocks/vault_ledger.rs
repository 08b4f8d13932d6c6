use super::{MockPallet, MockPalletStorage};
use crate::VaultLedger;
use mc_primitives::{Asset, AssetAmount};

pub struct MockVaultLedger;

impl MockPallet for MockVaultLedger {
	const PREFIX: &'static [u8] = b"MockVaultLedger";
}

const BALANCES: &[u8] = b"BALANCES";

impl MockVaultLedger {
	pub fn set_vault_balance(asset: Asset, amount: AssetAmount) {
		Self::put_storage(BALANCES, asset, amount);
	}
}

impl VaultLedger for MockVaultLedger {
	fn vault_balance(asset: &Asset) -> AssetAmount {
		Self::get_storage(BALANCES, asset.get_layer1_asset()).unwrap_or_default()
	}
}
