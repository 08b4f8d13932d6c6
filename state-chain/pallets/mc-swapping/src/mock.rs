use crate::{self as pallet_mc_swapping, PalletSafeMode};
use frame_support::derive_impl;
use mc_primitives::{Asset, AssetAmount, Chain, LedgerAccount, ModuleName};
use mc_traits::{
	impl_mock_mayachain, impl_mock_runtime_safe_mode,
	mocks::{
		address_converter::MockAddressConverter,
		cacao_pool::MockCacaoPoolApi,
		gas_manager::MockGasManager,
		ledger::MockLedger,
		names::MockNameRegistry,
		pools::{MockLiquidityApi, MockPoolApi},
		trade_account::MockTradeAccountApi,
		tx_out_store::MockTxOutStore,
	},
};

type Block = frame_system::mocking::MockBlock<Test>;

frame_support::construct_runtime!(
	pub enum Test {
		System: frame_system,
		Swapping: pallet_mc_swapping,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig as frame_system::DefaultConfig)]
impl frame_system::Config for Test {
	type Block = Block;
}

impl_mock_mayachain!(Test);

impl_mock_runtime_safe_mode!(swapping: PalletSafeMode);

impl pallet_mc_swapping::Config for Test {
	type RuntimeEvent = RuntimeEvent;
	type Ledger = MockLedger;
	type PoolApi = MockPoolApi;
	type LiquidityApi = MockLiquidityApi;
	type TxOutStore = MockTxOutStore;
	type NameRegistry = MockNameRegistry;
	type AddressConverter = MockAddressConverter;
	type GasManager = MockGasManager;
	type CacaoPoolApi = MockCacaoPoolApi;
	type TradeAccountApi = MockTradeAccountApi;
	type SafeMode = MockRuntimeSafeMode;
}

pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const CHARLIE: u64 = 3;

pub const BTC_POOL_CACAO: AssetAmount = 1_000_000_000_000;
pub const BTC_POOL_ASSET: AssetAmount = 100_000_000;
pub const ETH_POOL_CACAO: AssetAmount = 2_000_000_000_000;
pub const ETH_POOL_ASSET: AssetAmount = 4_000_000_000;
/// CACAO held by Asgard: the pooled CACAO plus spare for native deposits.
pub const ASGARD_CACAO: AssetAmount = BTC_POOL_CACAO + ETH_POOL_CACAO + 1_000_000_000_000;

pub fn btc() -> Asset {
	Chain::Btc.gas_asset()
}

pub fn eth() -> Asset {
	Chain::Eth.gas_asset()
}

pub fn cacao() -> Asset {
	Asset::cacao()
}

mc_test_utilities::impl_test_helpers!(Test);

/// Test externalities with a BTC and an ETH pool, and Asgard holding the pooled CACAO.
pub fn new_test_ext_with_pools() -> sp_io::TestExternalities {
	let mut ext = new_test_ext();
	ext.execute_with(|| {
		MockPoolApi::set_pool(btc(), BTC_POOL_CACAO, BTC_POOL_ASSET);
		MockPoolApi::set_pool(eth(), ETH_POOL_CACAO, ETH_POOL_ASSET);
		MockLedger::set_balance(LedgerAccount::Module(ModuleName::Asgard), cacao(), ASGARD_CACAO);
	});
	ext
}
