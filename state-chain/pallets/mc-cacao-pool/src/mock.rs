use crate::{self as pallet_mc_cacao_pool, PalletSafeMode};
use frame_support::derive_impl;
use mc_primitives::{Asset, AssetAmount, Chain, LedgerAccount, MimirKey, ModuleName};
use mc_traits::{
	impl_mock_mayachain, impl_mock_runtime_safe_mode,
	mocks::{
		address_converter::MockAddressConverter, affiliate_fees::MockAffiliateFeeApi,
		ledger::MockLedger, mimir::MockMimir, pools::MockPoolApi,
	},
};

type Block = frame_system::mocking::MockBlock<Test>;

frame_support::construct_runtime!(
	pub enum Test {
		System: frame_system,
		CacaoPoolPallet: pallet_mc_cacao_pool,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig as frame_system::DefaultConfig)]
impl frame_system::Config for Test {
	type Block = Block;
}

impl_mock_mayachain!(Test);

impl_mock_runtime_safe_mode!(cacao_pool: PalletSafeMode);

impl pallet_mc_cacao_pool::Config for Test {
	type RuntimeEvent = RuntimeEvent;
	type Ledger = MockLedger;
	type PoolApi = MockPoolApi;
	type AddressConverter = MockAddressConverter;
	type AffiliateFeeApi = MockAffiliateFeeApi;
	type SafeMode = MockRuntimeSafeMode;
	type WeightInfo = ();
}

pub const FOX: u64 = 1;
pub const CAT: u64 = 2;

pub const ASGARD_CACAO: AssetAmount = 1_000_000_000;
pub const RESERVE_CACAO: AssetAmount = 1_000_000_000;

pub fn btc() -> Asset {
	Chain::Btc.gas_asset()
}

mc_test_utilities::impl_test_helpers!(Test);

/// The pool is enabled and Asgard holds CACAO for deposits.
pub fn new_test_ext_enabled() -> sp_io::TestExternalities {
	let mut ext = new_test_ext();
	ext.execute_with(|| {
		MockMimir::enable(MimirKey::CacaoPoolEnabled);
		MockLedger::set_balance(
			LedgerAccount::Module(ModuleName::Asgard),
			Asset::cacao(),
			ASGARD_CACAO,
		);
		MockLedger::set_balance(
			LedgerAccount::Module(ModuleName::Reserve),
			Asset::cacao(),
			RESERVE_CACAO,
		);
	});
	ext
}
