use frame_support::{assert_ok, derive_impl, parameter_types};
use mc_primitives::{
	Address, Asset, AssetAmount, Chain, Coin, LedgerAccount, MimirKey, ModuleName, Tx, TxId,
	VaultPubKey,
};
use mc_traits::{
	impl_runtime_safe_mode,
	mocks::{address_converter::MockAddressConverter, bond_handler::MockBondHandler},
	Ledger,
};
use pallet_mc_observation::{ObservedTx, VaultStatus};
use sp_runtime::BuildStorage;

pub type AccountId = u64;

type Block = frame_system::mocking::MockBlock<Runtime>;

frame_support::construct_runtime!(
	pub enum Runtime {
		System: frame_system,
		Environment: pallet_mc_environment,
		AssetBalances: pallet_mc_asset_balances,
		LiquidityPools: pallet_mc_pools,
		Swapping: pallet_mc_swapping,
		CacaoPool: pallet_mc_cacao_pool,
		TradeAccount: pallet_mc_trade_account,
		Names: pallet_mc_names,
		Observation: pallet_mc_observation,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig as frame_system::DefaultConfig)]
impl frame_system::Config for Runtime {
	type Block = Block;
}

impl mc_traits::Mayachain for Runtime {
	type EnsureGovernance = frame_system::EnsureRoot<AccountId>;
	type Mimir = Environment;
}

impl_runtime_safe_mode! {
	RuntimeSafeMode,
	pallet_mc_environment::RuntimeSafeMode<Runtime>,
	swapping: pallet_mc_swapping::PalletSafeMode,
	cacao_pool: pallet_mc_cacao_pool::PalletSafeMode,
	trade_account: pallet_mc_trade_account::PalletSafeMode,
	observation: pallet_mc_observation::PalletSafeMode,
}

impl pallet_mc_environment::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type EnsureGovernance = frame_system::EnsureRoot<AccountId>;
	type Pools = LiquidityPools;
	type RuntimeSafeMode = RuntimeSafeMode;
	type WeightInfo = ();
}

impl pallet_mc_asset_balances::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type WeightInfo = ();
}

impl pallet_mc_pools::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type Ledger = AssetBalances;
	type TxOutStore = Observation;
	type AddressConverter = MockAddressConverter;
	type WeightInfo = ();
}

impl pallet_mc_swapping::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type Ledger = AssetBalances;
	type PoolApi = LiquidityPools;
	type LiquidityApi = LiquidityPools;
	type TxOutStore = Observation;
	type NameRegistry = Names;
	type AddressConverter = MockAddressConverter;
	type GasManager = Environment;
	type CacaoPoolApi = CacaoPool;
	type TradeAccountApi = TradeAccount;
	type SafeMode = RuntimeSafeMode;
}

impl pallet_mc_cacao_pool::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type Ledger = AssetBalances;
	type PoolApi = LiquidityPools;
	type AddressConverter = MockAddressConverter;
	type AffiliateFeeApi = Swapping;
	type SafeMode = RuntimeSafeMode;
	type WeightInfo = ();
}

impl pallet_mc_trade_account::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type TxOutStore = Observation;
	type VaultLedger = Observation;
	type SafeMode = RuntimeSafeMode;
}

parameter_types! {
	pub const BlocksPerYear: u64 = 5_256_000;
}

impl pallet_mc_names::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type AddressConverter = MockAddressConverter;
	type BlocksPerYear = BlocksPerYear;
}

impl pallet_mc_observation::Config for Runtime {
	type RuntimeEvent = RuntimeEvent;
	type ValidatorSet = Environment;
	type Slasher = Environment;
	type GasManager = Environment;
	type Ledger = AssetBalances;
	type AddressConverter = MockAddressConverter;
	type SwapApi = Swapping;
	type LiquidityApi = LiquidityPools;
	type CacaoPoolApi = CacaoPool;
	type TradeAccountApi = TradeAccount;
	type BondHandler = MockBondHandler;
	type NameRegistry = Names;
	type SafeMode = RuntimeSafeMode;
	type WeightInfo = ();
}

pub const ALICE: AccountId = 1;
pub const BOB: AccountId = 2;
pub const CHARLIE: AccountId = 3;
pub const DAVE: AccountId = 4;
pub const VALIDATORS: [AccountId; 4] = [ALICE, BOB, CHARLIE, DAVE];

pub const FOX: AccountId = 10;
pub const CAT: AccountId = 11;

pub const NATIVE_FEE: AssetAmount = 10;
pub const BTC_OUTBOUND_FEE: AssetAmount = 1_000;
pub const BTC_GAS: AssetAmount = 10;
pub const OBSERVED_AT: u64 = 800_000;

pub const BTC_POOL_CACAO: AssetAmount = 100_000_000_000;
pub const BTC_POOL_DEPTH: AssetAmount = 100_000_000;
pub const ETH_POOL_CACAO: AssetAmount = 50_000_000_000;
pub const ETH_POOL_DEPTH: AssetAmount = 1_000_000_000;

/// CACAO every funded account starts with.
pub const INITIAL_CACAO: AssetAmount = 1_000_000;

pub fn btc() -> Asset {
	Chain::Btc.gas_asset()
}

pub fn eth() -> Asset {
	Chain::Eth.gas_asset()
}

pub fn asgard() -> VaultPubKey {
	VaultPubKey(b"asgard".to_vec())
}

pub fn vault_address() -> Address {
	Address::from("bc1qasgard")
}

pub fn sender() -> Address {
	Address::from("bc1qsender")
}

pub fn tx_id(n: u8) -> TxId {
	TxId::repeat_byte(n)
}

pub fn signed(who: AccountId) -> RuntimeOrigin {
	RuntimeOrigin::signed(who)
}

pub struct ExtBuilder {
	mimir: Vec<(MimirKey, i64)>,
	funded: Vec<AccountId>,
}

impl Default for ExtBuilder {
	fn default() -> Self {
		ExtBuilder {
			mimir: vec![
				(MimirKey::NativeTransactionFee, NATIVE_FEE as i64),
				(MimirKey::CacaoPoolEnabled, 1),
				(MimirKey::TradeAccountsEnabled, 1),
			],
			funded: vec![FOX, CAT],
		}
	}
}

impl ExtBuilder {
	pub fn mimir(mut self, key: MimirKey, value: i64) -> Self {
		self.mimir.retain(|(existing, _)| *existing != key);
		self.mimir.push((key, value));
		self
	}

	/// Gives `accounts` [INITIAL_CACAO] each, on top of FOX and CAT.
	pub fn funded(mut self, accounts: &[AccountId]) -> Self {
		self.funded.extend_from_slice(accounts);
		self
	}

	pub fn build(self) -> sp_io::TestExternalities {
		let mut balances = vec![(
			LedgerAccount::Module(ModuleName::Asgard),
			Asset::cacao(),
			BTC_POOL_CACAO + ETH_POOL_CACAO,
		)];
		balances.extend(
			self.funded
				.iter()
				.map(|who| (LedgerAccount::Account(*who), Asset::cacao(), INITIAL_CACAO)),
		);

		let mut ext: sp_io::TestExternalities = RuntimeGenesisConfig {
			system: Default::default(),
			environment: EnvironmentConfig {
				mimir: self.mimir,
				validators: VALIDATORS.to_vec(),
				outbound_fees: vec![(Chain::Btc, BTC_OUTBOUND_FEE)],
				dex_aggregators: Vec::new(),
			},
			asset_balances: AssetBalancesConfig { balances },
			liquidity_pools: LiquidityPoolsConfig {
				pools: vec![
					(btc(), BTC_POOL_CACAO, BTC_POOL_DEPTH),
					(eth(), ETH_POOL_CACAO, ETH_POOL_DEPTH),
				],
				..Default::default()
			},
			observation: ObservationConfig {
				vaults: vec![(asgard(), VaultStatus::Active)],
				..Default::default()
			},
		}
		.build_storage()
		.expect("genesis is valid")
		.into();

		ext.execute_with(|| System::set_block_number(1));
		ext
	}
}

/// Finalises the current block and advances to `target`, running all hooks.
pub fn run_to_block(target: u64) {
	mc_test_utilities::run_to_block::<Runtime, AllPalletsWithSystem>(target)
}

/// As [run_to_block], checking after every block that the vaults cover every trade account.
pub fn run_to_block_checking_solvency(target: u64) {
	while System::block_number() < target {
		run_to_block(System::block_number() + 1);
		assert_eq!(TradeAccount::insolvent_assets(), vec![]);
	}
}

/// A BTC transfer of `amount` into Asgard carrying `memo`.
pub fn btc_inbound(id: TxId, amount: AssetAmount, memo: &str) -> Tx {
	Tx {
		id,
		chain: Chain::Btc,
		from_address: sender(),
		to_address: vault_address(),
		coins: vec![Coin::new(btc(), amount)],
		gas: vec![Coin::new(btc(), BTC_GAS)],
		memo: memo.as_bytes().to_vec(),
	}
}

pub fn eth_inbound(id: TxId, amount: AssetAmount, memo: &str) -> Tx {
	Tx {
		id,
		chain: Chain::Eth,
		from_address: Address::from("0xsender"),
		to_address: Address::from("0xasgard"),
		coins: vec![Coin::new(eth(), amount)],
		gas: Vec::new(),
		memo: memo.as_bytes().to_vec(),
	}
}

pub fn observed(tx: &Tx) -> ObservedTx {
	ObservedTx {
		tx: tx.clone(),
		block_height: OBSERVED_AT,
		vault_pub_key: asgard(),
		finalised: true,
	}
}

/// Each of `validators` reports `tx` as a final inbound.
pub fn witness_inbound(tx: &Tx, validators: &[AccountId]) {
	for validator in validators {
		assert_ok!(Observation::observe_inbound(signed(*validator), vec![observed(tx)]));
	}
}

/// Each of `validators` reports `tx` as a final outbound.
pub fn witness_outbound(tx: &Tx, validators: &[AccountId]) {
	for validator in validators {
		assert_ok!(Observation::observe_outbound(signed(*validator), vec![observed(tx)]));
	}
}

/// `who` submits a native transaction moving `coin` with `memo`.
pub fn native_deposit(who: AccountId, coin: Coin, memo: &str) {
	assert_ok!(Observation::deposit(signed(who), vec![coin], memo.as_bytes().to_vec()));
}

pub fn vault_balance(asset: &Asset) -> AssetAmount {
	Observation::vault(&asgard()).map(|vault| vault.balance_of(asset)).unwrap_or_default()
}

pub fn cacao_of(who: AccountId) -> AssetAmount {
	<AssetBalances as Ledger>::balance(&LedgerAccount::Account(who), &Asset::cacao())
}
