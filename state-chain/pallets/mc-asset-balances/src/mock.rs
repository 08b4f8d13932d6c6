use crate::{self as pallet_mc_asset_balances};
use frame_support::derive_impl;
use mc_primitives::{Asset, LedgerAccount, ModuleName};

type Block = frame_system::mocking::MockBlock<Test>;

frame_support::construct_runtime!(
	pub enum Test {
		System: frame_system,
		AssetBalances: pallet_mc_asset_balances,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig as frame_system::DefaultConfig)]
impl frame_system::Config for Test {
	type Block = Block;
}

impl pallet_mc_asset_balances::Config for Test {
	type RuntimeEvent = RuntimeEvent;
	type WeightInfo = ();
}

pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const INITIAL_BALANCE: u128 = 1_000;

mc_test_utilities::impl_test_helpers! {
	Test,
	RuntimeGenesisConfig {
		system: Default::default(),
		asset_balances: AssetBalancesConfig {
			balances: vec![
				(LedgerAccount::Account(ALICE), Asset::cacao(), INITIAL_BALANCE),
				(LedgerAccount::Module(ModuleName::Asgard), Asset::cacao(), INITIAL_BALANCE),
			],
		},
	}
}
