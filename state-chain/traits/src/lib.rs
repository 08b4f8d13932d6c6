#![cfg_attr(not(feature = "std"), no_std)]

//! Narrow capability traits through which the MAYAChain pallets reach each other.
//!
//! Each pallet depends only on the traits it needs and the runtime decides which pallet provides
//! each one. Storage-backed test doubles live in [mocks].

extern crate alloc;

pub mod affiliates;
pub mod mocks;
mod safe_mode;

pub use affiliates::*;
pub use safe_mode::*;

use alloc::vec::Vec;
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use frame_support::{
	pallet_prelude::{DispatchError, DispatchResult, RuntimeDebug},
	traits::EnsureOrigin,
};
use mc_amm::PoolDepths;
use mc_memo::{
	AddLiquidityMemo, Affiliate, BondMemo, DexAggregation, ManageNameMemo, SwapMemo, UnbondMemo,
};
use mc_primitives::{
	behaviour_for, Address, Asset, AssetAmount, BasisPoints, Behaviour, Chain, Coin, LedgerAccount,
	MimirKey, ModuleName, ProtocolVersion, TxId, VaultPubKey, MAX_BASIS_POINTS,
};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

/// Common base config for MAYAChain pallets.
pub trait Mayachain: frame_system::Config {
	/// Origin allowed to change protocol configuration.
	type EnsureGovernance: EnsureOrigin<Self::RuntimeOrigin>;
	/// Dynamic protocol constants.
	type Mimir: Mimir;
}

/// Read access to the governance-controlled protocol constants.
pub trait Mimir {
	/// The stored value, or the key's default if governance never set it.
	fn get(key: MimirKey) -> i64;

	fn protocol_version() -> ProtocolVersion;

	/// Whether `address` is a DEX aggregator that outbounds may be routed through.
	fn is_dex_aggregator(address: &[u8]) -> bool;

	fn is_enabled(key: MimirKey) -> bool {
		Self::get(key) > 0
	}

	fn get_amount(key: MimirKey) -> AssetAmount {
		Self::get(key).max(0) as AssetAmount
	}

	fn get_u64(key: MimirKey) -> u64 {
		Self::get(key).max(0) as u64
	}

	fn get_bps(key: MimirKey) -> BasisPoints {
		Self::get(key).clamp(0, MAX_BASIS_POINTS as i64) as BasisPoints
	}

	fn behaviour() -> Behaviour {
		behaviour_for(Self::protocol_version())
	}

	/// Trading is halted globally, for `chain`, or because the protocol is winding down.
	fn is_trading_halted(chain: Chain) -> bool {
		Self::is_enabled(MimirKey::HaltTrading) ||
			Self::is_enabled(MimirKey::HaltChainTrading(chain)) ||
			Self::is_enabled(MimirKey::Ragnarok)
	}
}

pub trait ValidatorSet {
	type ValidatorId;

	fn active_validators() -> Vec<Self::ValidatorId>;

	fn is_active(id: &Self::ValidatorId) -> bool;

	fn active_count() -> u32 {
		Self::active_validators().len() as u32
	}
}

#[derive(
	Copy,
	Clone,
	RuntimeDebug,
	PartialEq,
	Eq,
	Encode,
	Decode,
	DecodeWithMemTracking,
	MaxEncodedLen,
	TypeInfo,
	Serialize,
	Deserialize,
)]
pub enum SlashReason {
	FailedObserveInbound,
	FailedObserveOutbound,
}

/// Structured labels attached to every slash point adjustment.
#[derive(
	Copy,
	Clone,
	RuntimeDebug,
	PartialEq,
	Eq,
	Encode,
	Decode,
	DecodeWithMemTracking,
	MaxEncodedLen,
	TypeInfo,
	Serialize,
	Deserialize,
)]
pub struct SlashLabels {
	pub reason: SlashReason,
	pub chain: Chain,
}

pub trait Slasher {
	type ValidatorId;

	fn inc_slash_points(id: &Self::ValidatorId, points: u64, labels: SlashLabels);

	fn dec_slash_points(id: &Self::ValidatorId, points: u64, labels: SlashLabels);
}

/// Fees charged for moving funds out of the protocol.
pub trait GasManager {
	/// The fee for an outbound of `asset`, denominated in `asset`.
	fn outbound_fee(asset: &Asset) -> AssetAmount;

	/// The flat fee for a native-chain transaction, in CACAO.
	fn native_transaction_fee() -> AssetAmount;

	/// Records a fee that was withheld from an outbound and left in the vault.
	fn record_withheld_fee(coin: &Coin);
}

/// Balances held in the native ledger: CACAO, synths and anything else settled natively.
pub trait Ledger {
	type AccountId;

	fn balance(who: &LedgerAccount<Self::AccountId>, asset: &Asset) -> AssetAmount;

	fn total_supply(asset: &Asset) -> AssetAmount;

	fn mint(to: &LedgerAccount<Self::AccountId>, asset: &Asset, amount: AssetAmount)
		-> DispatchResult;

	fn burn(
		from: &LedgerAccount<Self::AccountId>,
		asset: &Asset,
		amount: AssetAmount,
	) -> DispatchResult;

	fn transfer(
		from: &LedgerAccount<Self::AccountId>,
		to: &LedgerAccount<Self::AccountId>,
		asset: &Asset,
		amount: AssetAmount,
	) -> DispatchResult;

	fn module_balance(module: ModuleName, asset: &Asset) -> AssetAmount {
		Self::balance(&LedgerAccount::Module(module), asset)
	}
}

/// Maps native-chain addresses to accounts.
pub trait AddressConverter {
	type AccountId;

	fn to_account_id(address: &Address) -> Option<Self::AccountId>;

	fn to_address(account_id: &Self::AccountId) -> Address;

	fn module_address(module: ModuleName) -> Address;

	fn to_module(address: &Address) -> Option<ModuleName> {
		[
			ModuleName::Asgard,
			ModuleName::Bond,
			ModuleName::Reserve,
			ModuleName::CacaoPool,
			ModuleName::AffiliateCollector,
		]
		.into_iter()
		.find(|module| Self::module_address(*module) == *address)
	}

	/// Resolves a native address to a ledger holder: a module or an account.
	fn to_ledger_account(address: &Address) -> Option<LedgerAccount<Self::AccountId>> {
		Self::to_module(address)
			.map(LedgerAccount::Module)
			.or_else(|| Self::to_account_id(address).map(LedgerAccount::Account))
	}
}

/// An outbound scheduled on behalf of an inbound transaction.
#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct TxOutItem {
	pub chain: Chain,
	pub to_address: Address,
	/// Chosen by the signer when the item is picked up.
	pub vault_pub_key: Option<VaultPubKey>,
	pub coin: Coin,
	pub memo: Vec<u8>,
	pub in_hash: TxId,
	pub dex_aggregation: Option<DexAggregation>,
}

impl TxOutItem {
	pub fn new(in_hash: TxId, to_address: Address, coin: Coin, memo: Vec<u8>) -> Self {
		TxOutItem {
			chain: coin.asset.settlement_chain(),
			to_address,
			vault_pub_key: None,
			coin,
			memo,
			in_hash,
			dex_aggregation: None,
		}
	}

	/// Identifies an item for deduplication. Gas and vault selection are not part of it.
	pub fn fingerprint(&self) -> [u8; 32] {
		sp_io::hashing::blake2_256(
			&(&self.in_hash, &self.to_address, &self.coin, &self.memo).encode(),
		)
	}
}

pub trait TxOutStore {
	/// Schedules `item`, net of the outbound fee. Returns the net amount that will be delivered.
	///
	/// Fails if nothing would be left after the fee, or if an identical item was already
	/// scheduled.
	fn try_add_tx_out_item(item: TxOutItem) -> Result<AssetAmount, DispatchError>;
}

/// Layer-1 collateral held in the protocol's vaults.
pub trait VaultLedger {
	fn vault_balance(asset: &Asset) -> AssetAmount;
}

/// The outcome of a swap through one or two pools.
#[derive(
	Clone, RuntimeDebug, Default, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize,
)]
pub struct SwapResult {
	pub emitted: AssetAmount,
	/// Liquidity fee valued in CACAO, summed across legs.
	pub liquidity_fee_in_cacao: AssetAmount,
	/// Slip summed across legs.
	pub slip_bps: BasisPoints,
	/// `(pool, liquidity fee in CACAO)` for each leg.
	pub legs: Vec<(Asset, AssetAmount)>,
}

/// Pool state and raw swap execution.
pub trait PoolApi {
	/// Depths of the pool backing `asset`, whatever its kind.
	fn pool_depths(asset: &Asset) -> Option<PoolDepths>;

	fn is_pool_available(asset: &Asset) -> bool;

	fn synth_supply(asset: &Asset) -> AssetAmount;

	/// Executes a swap of `amount` from `from` to `to`, routing through CACAO when neither side
	/// is CACAO.
	fn swap(from: &Asset, to: &Asset, amount: AssetAmount) -> Result<SwapResult, DispatchError>;

	/// As [PoolApi::swap], without touching state.
	fn quote_swap(
		from: &Asset,
		to: &Asset,
		amount: AssetAmount,
	) -> Result<SwapResult, DispatchError>;

	/// Removes CACAO from a pool's depth without burning units. Returns the amount removed.
	fn take_cacao_from_depth(
		pool_asset: &Asset,
		amount: AssetAmount,
	) -> Result<AssetAmount, DispatchError>;

	/// The CACAO value of all liquidity positions owned by `owner`.
	fn lp_value_in_cacao(owner: &Address) -> AssetAmount;

	/// CACAO held across every pool.
	fn total_pooled_cacao() -> AssetAmount;

	/// The CACAO value of `amount` of `asset` at the pool's spot price.
	fn value_in_cacao(asset: &Asset, amount: AssetAmount) -> AssetAmount {
		if asset.is_cacao() {
			return amount
		}
		Self::pool_depths(asset).map(|depths| depths.asset_to_cacao(amount)).unwrap_or_default()
	}

	/// The value of `cacao` CACAO in units of `asset` at the pool's spot price.
	fn value_in_asset(cacao: AssetAmount, asset: &Asset) -> AssetAmount {
		if asset.is_cacao() {
			return cacao
		}
		Self::pool_depths(asset).map(|depths| depths.cacao_to_asset(cacao)).unwrap_or_default()
	}
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct AddLiquidityRequest {
	pub tx_id: TxId,
	pub pool: Asset,
	pub cacao_amount: AssetAmount,
	pub asset_amount: AssetAmount,
	pub cacao_address: Option<Address>,
	pub asset_address: Option<Address>,
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct WithdrawLiquidityRequest {
	pub tx_id: TxId,
	pub pool: Asset,
	/// The address the position is keyed by.
	pub owner: Address,
	pub basis_points: BasisPoints,
	pub withdrawal_asset: Option<Asset>,
}

pub trait LiquidityApi {
	/// Adds liquidity and returns the pool units minted.
	fn add_liquidity(request: AddLiquidityRequest) -> Result<AssetAmount, DispatchError>;

	fn withdraw_liquidity(request: WithdrawLiquidityRequest) -> DispatchResult;

	/// Adds to a pool's depths without minting units.
	fn donate(pool: &Asset, cacao: AssetAmount, asset: AssetAmount) -> DispatchResult;
}

#[derive(
	Copy, Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize,
)]
pub enum SwapOrigin {
	/// An observed external-chain inbound.
	External,
	/// A native `deposit`.
	Native,
	/// A preferred-asset payout from the Affiliate Collector.
	AffiliateCollector,
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct SwapRequest {
	pub tx_id: TxId,
	pub source: Coin,
	pub memo: SwapMemo,
	/// The sender on the source chain. Refunds go here unless the memo names a refund address.
	pub from_address: Address,
	pub origin: SwapOrigin,
	/// Liquidity to add with the emitted coin once the swap completes, instead of paying it out.
	pub add_liquidity: Option<AddLiquidityMemo>,
}

impl SwapRequest {
	pub fn refund_address(&self) -> &Address {
		self.memo.refund_address.as_ref().unwrap_or(&self.from_address)
	}
}

pub trait SwapApi {
	/// Validates and queues a swap. A rejected request moves no funds.
	fn schedule_swap(request: SwapRequest) -> DispatchResult;
}

/// A single payee of an affiliate fee, with the amount owed.
#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct AffiliateShare {
	pub name: Vec<u8>,
	pub amount: AssetAmount,
}

pub trait AffiliateFeeApi {
	/// Splits `amount` among `affiliates`, including any registered sub-affiliates. The top-level
	/// fees add up to at most `max_total_bps`, or to the protocol maximum when it is zero.
	fn affiliate_shares(
		affiliates: &[Affiliate],
		amount: AssetAmount,
		max_total_bps: BasisPoints,
	) -> Vec<AffiliateShare>;

	/// Pays each share in CACAO out of `source`. Returns the total paid.
	fn pay_affiliates(
		source: ModuleName,
		tx_id: TxId,
		shares: Vec<AffiliateShare>,
	) -> Result<AssetAmount, DispatchError>;
}

/// A registered name, resolved at the current block.
#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct ResolvedName<AccountId> {
	pub name: Vec<u8>,
	pub owner: AccountId,
	pub preferred_asset: Option<Asset>,
	pub affiliate_bps: BasisPoints,
	pub subaffiliates: Vec<(Vec<u8>, BasisPoints)>,
}

pub trait NameRegistry {
	type AccountId;

	/// `None` for unknown and expired names.
	fn resolve(name: &[u8]) -> Option<ResolvedName<Self::AccountId>>;

	fn alias(name: &[u8], chain: Chain) -> Option<Address>;

	/// Registers or updates a name. `signer` is the account that sent the request.
	fn manage_name(signer: &Self::AccountId, memo: &ManageNameMemo) -> DispatchResult;
}

pub trait TradeAccountApi {
	type AccountId;

	/// Credits `owner`, backed by layer-1 collateral that is already vaulted.
	fn deposit(
		asset: &Asset,
		amount: AssetAmount,
		owner: &Self::AccountId,
		tx_id: TxId,
	) -> Result<AssetAmount, DispatchError>;

	/// Debits `owner` and schedules an outbound of the layer-1 asset to `destination`.
	fn withdrawal(
		asset: &Asset,
		amount: AssetAmount,
		owner: &Self::AccountId,
		destination: &Address,
		tx_id: TxId,
	) -> Result<AssetAmount, DispatchError>;

	/// Debits `owner` without an outbound, for coins spent inside the protocol.
	fn debit(asset: &Asset, amount: AssetAmount, owner: &Self::AccountId) -> DispatchResult;

	fn balance_of(asset: &Asset, owner: &Self::AccountId) -> AssetAmount;
}

pub trait CacaoPoolApi {
	type AccountId;

	/// Moves `amount` CACAO from Asgard into the pool on behalf of `owner`.
	fn deposit(owner: &Self::AccountId, amount: AssetAmount, tx_id: TxId) -> DispatchResult;

	fn withdraw(
		owner: &Self::AccountId,
		basis_points: BasisPoints,
		affiliates: &[Affiliate],
		tx_id: TxId,
	) -> DispatchResult;

	/// Takes the pool's share of a swap's liquidity fee from `pool_asset`'s CACAO depth. Returns
	/// the amount taken.
	fn accrue_swap_fee(pool_asset: &Asset, liquidity_fee_in_cacao: AssetAmount) -> AssetAmount;
}

/// Node bonding is handled elsewhere; the observer only forwards the requests.
pub trait BondHandler {
	fn bond(memo: &BondMemo, coin: &Coin, from: &Address) -> DispatchResult;

	fn unbond(memo: &UnbondMemo, from: &Address) -> DispatchResult;

	fn leave(node: &Address, from: &Address) -> DispatchResult;
}
