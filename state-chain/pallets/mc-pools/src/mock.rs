use crate::{self as pallet_mc_pools};
use frame_support::derive_impl;
use mc_primitives::{Asset, AssetAmount, Chain};
use mc_traits::{
	impl_mock_mayachain,
	mocks::{
		address_converter::MockAddressConverter, ledger::MockLedger,
		tx_out_store::MockTxOutStore,
	},
};

type Block = frame_system::mocking::MockBlock<Test>;

frame_support::construct_runtime!(
	pub enum Test {
		System: frame_system,
		LiquidityPools: pallet_mc_pools,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig as frame_system::DefaultConfig)]
impl frame_system::Config for Test {
	type Block = Block;
}

impl_mock_mayachain!(Test);

impl pallet_mc_pools::Config for Test {
	type RuntimeEvent = RuntimeEvent;
	type Ledger = MockLedger;
	type TxOutStore = MockTxOutStore;
	type AddressConverter = MockAddressConverter;
	type WeightInfo = ();
}

pub const ALICE: u64 = 5;
pub const BTC_POOL_CACAO: AssetAmount = 1_000_000;
pub const BTC_POOL_ASSET: AssetAmount = 100_000;
pub const ETH_POOL_CACAO: AssetAmount = 2_000_000;
pub const ETH_POOL_ASSET: AssetAmount = 4_000_000;

pub fn btc() -> Asset {
	Chain::Btc.gas_asset()
}

pub fn eth() -> Asset {
	Chain::Eth.gas_asset()
}

mc_test_utilities::impl_test_helpers! {
	Test,
	RuntimeGenesisConfig {
		system: Default::default(),
		liquidity_pools: LiquidityPoolsConfig {
			pools: vec![
				(btc(), BTC_POOL_CACAO, BTC_POOL_ASSET),
				(eth(), ETH_POOL_CACAO, ETH_POOL_ASSET),
			],
			_phantom: Default::default(),
		},
	}
}
