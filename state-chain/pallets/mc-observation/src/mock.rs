use crate::{self as pallet_mc_observation, ObservedTx, PalletSafeMode, VaultStatus};
use frame_support::derive_impl;
use mc_primitives::{Address, Asset, AssetAmount, Chain, Coin, Tx, TxId, VaultPubKey};
use mc_traits::{
	impl_mock_mayachain, impl_mock_runtime_safe_mode,
	mocks::{
		address_converter::MockAddressConverter,
		bond_handler::MockBondHandler,
		cacao_pool::MockCacaoPoolApi,
		gas_manager::MockGasManager,
		ledger::MockLedger,
		names::MockNameRegistry,
		pools::MockLiquidityApi,
		swap_api::MockSwapApi,
		trade_account::MockTradeAccountApi,
		validators::{MockSlasher, MockValidatorSet},
	},
};

type Block = frame_system::mocking::MockBlock<Test>;

frame_support::construct_runtime!(
	pub enum Test {
		System: frame_system,
		ObservationPallet: pallet_mc_observation,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig as frame_system::DefaultConfig)]
impl frame_system::Config for Test {
	type Block = Block;
}

impl_mock_mayachain!(Test);

impl_mock_runtime_safe_mode!(observation: PalletSafeMode);

impl pallet_mc_observation::Config for Test {
	type RuntimeEvent = RuntimeEvent;
	type ValidatorSet = MockValidatorSet;
	type Slasher = MockSlasher;
	type GasManager = MockGasManager;
	type Ledger = MockLedger;
	type AddressConverter = MockAddressConverter;
	type SwapApi = MockSwapApi;
	type LiquidityApi = MockLiquidityApi;
	type CacaoPoolApi = MockCacaoPoolApi;
	type TradeAccountApi = MockTradeAccountApi;
	type BondHandler = MockBondHandler;
	type NameRegistry = MockNameRegistry;
	type SafeMode = MockRuntimeSafeMode;
	type WeightInfo = ();
}

pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const CHARLIE: u64 = 3;
pub const DAVE: u64 = 4;
pub const VALIDATORS: [u64; 4] = [ALICE, BOB, CHARLIE, DAVE];

/// A native account that is not a validator.
pub const FOX: u64 = 10;

pub fn asgard() -> VaultPubKey {
	VaultPubKey(b"asgard".to_vec())
}

pub fn retired_vault() -> VaultPubKey {
	VaultPubKey(b"retired".to_vec())
}

pub fn btc() -> Asset {
	Chain::Btc.gas_asset()
}

pub fn sender() -> Address {
	Address::from("bc1qsender")
}

pub fn vault_address() -> Address {
	Address::from("bc1qasgard")
}

pub fn tx_id(n: u8) -> TxId {
	TxId::repeat_byte(n)
}

/// A BTC transfer of `amount` to the vault carrying `memo`.
pub fn btc_inbound(id: TxId, amount: AssetAmount, memo: &str) -> Tx {
	Tx {
		id,
		chain: Chain::Btc,
		from_address: sender(),
		to_address: vault_address(),
		coins: vec![Coin::new(btc(), amount)],
		gas: vec![Coin::new(btc(), 10)],
		memo: memo.as_bytes().to_vec(),
	}
}

pub fn observed(tx: Tx, finalised: bool) -> ObservedTx {
	ObservedTx { tx, block_height: 800_000, vault_pub_key: asgard(), finalised }
}

mc_test_utilities::impl_test_helpers!(
	Test,
	RuntimeGenesisConfig {
		observation_pallet: ObservationPalletConfig {
			vaults: vec![(asgard(), VaultStatus::Active), (retired_vault(), VaultStatus::Inactive)],
			..Default::default()
		},
		..Default::default()
	}
);

/// Four active validators, so three make a majority.
pub fn new_test_ext_with_validators() -> sp_io::TestExternalities {
	let mut ext = new_test_ext();
	ext.execute_with(|| MockValidatorSet::set_validators(VALIDATORS.to_vec()));
	ext
}
