use crate::{self as pallet_mc_environment};
use frame_support::derive_impl;
use mc_primitives::{Chain, MimirKey};
use mc_traits::{impl_pallet_safe_mode, impl_runtime_safe_mode, mocks::pools::MockPoolApi};

type Block = frame_system::mocking::MockBlock<Test>;

frame_support::construct_runtime!(
	pub enum Test {
		System: frame_system,
		Environment: pallet_mc_environment,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig as frame_system::DefaultConfig)]
impl frame_system::Config for Test {
	type Block = Block;
}

impl_pallet_safe_mode!(MockPalletSafeMode; feature_enabled);

impl_runtime_safe_mode! {
	MockRuntimeSafeMode,
	pallet_mc_environment::RuntimeSafeMode<Test>,
	mock_pallet: MockPalletSafeMode,
}

impl pallet_mc_environment::Config for Test {
	type RuntimeEvent = RuntimeEvent;
	type EnsureGovernance = frame_system::EnsureRoot<u64>;
	type Pools = MockPoolApi;
	type RuntimeSafeMode = MockRuntimeSafeMode;
	type WeightInfo = ();
}

pub const VALIDATORS: [u64; 3] = [1, 2, 3];
pub const BTC_FEE: u128 = 1_000;

mc_test_utilities::impl_test_helpers! {
	Test,
	RuntimeGenesisConfig {
		system: Default::default(),
		environment: EnvironmentConfig {
			mimir: vec![(MimirKey::MaxAffiliateFeeBasisPoints, 500)],
			validators: VALIDATORS.to_vec(),
			outbound_fees: vec![(Chain::Btc, BTC_FEE)],
			dex_aggregators: vec!["0xaggregator".into()],
		},
	}
}
