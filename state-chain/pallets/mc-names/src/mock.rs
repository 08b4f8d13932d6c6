use crate::{self as pallet_mc_names};
use frame_support::{derive_impl, parameter_types};
use mc_traits::{impl_mock_mayachain, mocks::address_converter::MockAddressConverter};

type Block = frame_system::mocking::MockBlock<Test>;

frame_support::construct_runtime!(
	pub enum Test {
		System: frame_system,
		Names: pallet_mc_names,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig as frame_system::DefaultConfig)]
impl frame_system::Config for Test {
	type Block = Block;
}

impl_mock_mayachain!(Test);

parameter_types! {
	pub const BlocksPerYear: u64 = 100;
}

impl pallet_mc_names::Config for Test {
	type RuntimeEvent = RuntimeEvent;
	type AddressConverter = MockAddressConverter;
	type BlocksPerYear = BlocksPerYear;
}

pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;

mc_test_utilities::impl_test_helpers!(Test);
