use crate::{self as pallet_mc_trade_account, PalletSafeMode};
use frame_support::derive_impl;
use mc_primitives::{Address, Asset, Chain, MimirKey};
use mc_traits::{
	impl_mock_mayachain, impl_mock_runtime_safe_mode,
	mocks::{mimir::MockMimir, tx_out_store::MockTxOutStore, vault_ledger::MockVaultLedger},
};

type Block = frame_system::mocking::MockBlock<Test>;

frame_support::construct_runtime!(
	pub enum Test {
		System: frame_system,
		TradeAccountPallet: pallet_mc_trade_account,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig as frame_system::DefaultConfig)]
impl frame_system::Config for Test {
	type Block = Block;
}

impl_mock_mayachain!(Test);

impl_mock_runtime_safe_mode!(trade_account: PalletSafeMode);

impl pallet_mc_trade_account::Config for Test {
	type RuntimeEvent = RuntimeEvent;
	type TxOutStore = MockTxOutStore;
	type VaultLedger = MockVaultLedger;
	type SafeMode = MockRuntimeSafeMode;
}

pub const FOX: u64 = 1;
pub const CAT: u64 = 2;

pub fn btc() -> Asset {
	Chain::Btc.gas_asset()
}

pub fn eth() -> Asset {
	Chain::Eth.gas_asset()
}

pub fn fox_btc_address() -> Address {
	Address::from("bc1qfox")
}

mc_test_utilities::impl_test_helpers!(Test);

pub fn new_test_ext_enabled() -> sp_io::TestExternalities {
	let mut ext = new_test_ext();
	ext.execute_with(|| MockMimir::enable(MimirKey::TradeAccountsEnabled));
	ext
}
