#![cfg_attr(not(feature = "std"), no_std)]

//! Intent memos.
//!
//! Every inbound transaction carries a short text memo that states what the sender wants done
//! with the funds, for example `=:BTC.BTC:bc1q...:1e6/3/0:aff:10`. The first `:`-separated field
//! names the transaction type; the remaining fields are positional.

extern crate alloc;

use alloc::{
	string::{String, ToString},
	vec::Vec,
};
use codec::{Decode, Encode};
use core::{fmt, str::FromStr};
use itertools::Itertools;
use mc_primitives::{
	behaviour_for, Address, Asset, AssetAmount, BasisPoints, Behaviour, Chain,
	ExternalBlockHeight, TxId, CURRENT_PROTOCOL_VERSION, MAX_BASIS_POINTS,
};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

mod fields;
pub use fields::{parse_amount, FieldFailure};
use fields::*;

#[cfg(test)]
mod tests;

pub const MAX_NAME_LENGTH: usize = 30;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub enum TxType {
	Swap,
	AddLiquidity,
	WithdrawLiquidity,
	CacaoPoolDeposit,
	CacaoPoolWithdraw,
	TradeAccountDeposit,
	TradeAccountWithdrawal,
	Bond,
	Unbond,
	Leave,
	Donate,
	Reserve,
	Outbound,
	Refund,
	Migrate,
	Ragnarok,
	NoOp,
	ManageName,
}

impl TxType {
	pub fn from_keyword(keyword: &str) -> Option<Self> {
		Some(match keyword.to_ascii_uppercase().as_str() {
			"SWAP" | "S" | "=" => TxType::Swap,
			"ADD" | "A" | "+" => TxType::AddLiquidity,
			"WITHDRAW" | "WD" | "-" => TxType::WithdrawLiquidity,
			"POOL+" => TxType::CacaoPoolDeposit,
			"POOL-" => TxType::CacaoPoolWithdraw,
			"TRADE+" => TxType::TradeAccountDeposit,
			"TRADE-" => TxType::TradeAccountWithdrawal,
			"BOND" => TxType::Bond,
			"UNBOND" => TxType::Unbond,
			"LEAVE" => TxType::Leave,
			"DONATE" | "D" => TxType::Donate,
			"RESERVE" => TxType::Reserve,
			"OUT" => TxType::Outbound,
			"REFUND" => TxType::Refund,
			"MIGRATE" => TxType::Migrate,
			"RAGNAROK" => TxType::Ragnarok,
			"NOOP" => TxType::NoOp,
			"NAME" | "N" | "~" => TxType::ManageName,
			_ => return None,
		})
	}

	/// The canonical keyword used when rendering a memo.
	pub const fn keyword(&self) -> &'static str {
		match self {
			TxType::Swap => "=",
			TxType::AddLiquidity => "+",
			TxType::WithdrawLiquidity => "-",
			TxType::CacaoPoolDeposit => "POOL+",
			TxType::CacaoPoolWithdraw => "POOL-",
			TxType::TradeAccountDeposit => "TRADE+",
			TxType::TradeAccountWithdrawal => "TRADE-",
			TxType::Bond => "BOND",
			TxType::Unbond => "UNBOND",
			TxType::Leave => "LEAVE",
			TxType::Donate => "DONATE",
			TxType::Reserve => "RESERVE",
			TxType::Outbound => "OUT",
			TxType::Refund => "REFUND",
			TxType::Migrate => "MIGRATE",
			TxType::Ragnarok => "RAGNAROK",
			TxType::NoOp => "NOOP",
			TxType::ManageName => "~",
		}
	}

	/// Memos written by the protocol itself on outbound transactions. They are never processed as
	/// user intents.
	pub const fn is_internal(&self) -> bool {
		matches!(self, TxType::Outbound | TxType::Refund | TxType::Migrate | TxType::Ragnarok)
	}

	/// Whether successful processing may schedule an outbound transaction.
	pub const fn has_outbound(&self) -> bool {
		matches!(
			self,
			TxType::Swap | TxType::WithdrawLiquidity | TxType::TradeAccountWithdrawal
		)
	}
}

/// An affiliate entry: a registered name or a native address, with an optional explicit fee.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct Affiliate {
	#[serde(with = "mc_utilities::with_serde::bytes_as_string")]
	pub name: Vec<u8>,
	/// `None` defers to the name's registered default.
	pub bps: Option<BasisPoints>,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct DexAggregation {
	#[serde(with = "mc_utilities::with_serde::bytes_as_string")]
	pub aggregator: Vec<u8>,
	pub target_address: Address,
	pub target_limit: Option<AssetAmount>,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct SwapMemo {
	pub target: Asset,
	/// Empty when the sender did not name one.
	pub destination: Address,
	pub refund_address: Option<Address>,
	/// Minimum total output. Zero means no limit.
	pub trade_target: AssetAmount,
	pub stream_interval: u64,
	/// Zero lets the protocol choose the number of sub-swaps.
	pub stream_quantity: u64,
	pub affiliates: Vec<Affiliate>,
	pub dex_aggregation: Option<DexAggregation>,
}

impl SwapMemo {
	pub fn new(target: Asset, destination: Address) -> Self {
		SwapMemo {
			target,
			destination,
			refund_address: None,
			trade_target: 0,
			stream_interval: 0,
			stream_quantity: 0,
			affiliates: Vec::new(),
			dex_aggregation: None,
		}
	}

	pub fn is_streaming(&self) -> bool {
		self.stream_interval > 0
	}
}

/// Renders the canonical, shortest form of the memo: trailing empty fields are dropped.
impl fmt::Display for SwapMemo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut destination = self.destination.to_string();
		if let Some(refund) = &self.refund_address {
			destination = alloc::format!("{destination}/{refund}");
		}

		let streaming = self.stream_interval > 0 || self.stream_quantity > 1;
		let limit = if streaming {
			alloc::format!(
				"{}/{}/{}",
				self.trade_target, self.stream_interval, self.stream_quantity
			)
		} else if self.trade_target > 0 {
			self.trade_target.to_string()
		} else {
			String::new()
		};

		let affiliates =
			self.affiliates.iter().map(|a| String::from_utf8_lossy(&a.name)).join("/");
		let affiliate_bps = if self.affiliates.iter().all(|a| a.bps.is_none()) {
			String::new()
		} else {
			self.affiliates.iter().map(|a| a.bps.unwrap_or_default()).join("/")
		};

		let (aggregator, aggregator_target, aggregator_limit) = match &self.dex_aggregation {
			Some(dex) => (
				String::from_utf8_lossy(&dex.aggregator).to_string(),
				dex.target_address.to_string(),
				dex.target_limit.filter(|l| *l > 0).map(|l| l.to_string()).unwrap_or_default(),
			),
			None => Default::default(),
		};

		let args = [
			TxType::Swap.keyword().to_string(),
			self.target.to_string(),
			destination,
			limit,
			affiliates,
			affiliate_bps,
			aggregator,
			aggregator_target,
			aggregator_limit,
		];
		let last = args.iter().rposition(|arg| !arg.is_empty()).unwrap_or(0).max(2);
		f.write_str(&args[..=last].join(":"))
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct AddLiquidityMemo {
	pub asset: Asset,
	/// The counterpart address for a two-sided add, on the other side's chain.
	pub pair_address: Option<Address>,
	pub affiliate: Option<Affiliate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct WithdrawLiquidityMemo {
	pub asset: Asset,
	pub basis_points: BasisPoints,
	/// Pay out entirely in this asset (CACAO or the pool asset) instead of both sides.
	pub withdrawal_asset: Option<Asset>,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct CacaoPoolWithdrawMemo {
	pub basis_points: BasisPoints,
	pub affiliates: Vec<Affiliate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct BondMemo {
	pub node: Address,
	pub provider: Option<Address>,
	pub operator_fee: Option<BasisPoints>,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct UnbondMemo {
	pub node: Address,
	pub amount: AssetAmount,
	pub provider: Option<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct SubAffiliate {
	#[serde(with = "mc_utilities::with_serde::bytes_as_string")]
	pub name: Vec<u8>,
	pub bps: BasisPoints,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct ManageNameMemo {
	#[serde(with = "mc_utilities::with_serde::bytes_as_string")]
	pub name: Vec<u8>,
	/// An alias to register, if any.
	pub alias: Option<(Chain, Address)>,
	pub owner: Option<Address>,
	pub preferred_asset: Option<Asset>,
	pub expire_block_height: Option<u64>,
	pub affiliate_bps: Option<BasisPoints>,
	pub subaffiliates: Vec<SubAffiliate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub enum Memo {
	Swap(SwapMemo),
	AddLiquidity(AddLiquidityMemo),
	WithdrawLiquidity(WithdrawLiquidityMemo),
	CacaoPoolDeposit,
	CacaoPoolWithdraw(CacaoPoolWithdrawMemo),
	TradeAccountDeposit { owner: Address },
	TradeAccountWithdrawal { address: Address },
	Bond(BondMemo),
	Unbond(UnbondMemo),
	Leave { node: Address },
	Donate { asset: Asset },
	Reserve,
	Outbound { in_hash: TxId },
	Refund { in_hash: TxId },
	Migrate { height: ExternalBlockHeight },
	Ragnarok { height: ExternalBlockHeight },
	NoOp,
	ManageName(ManageNameMemo),
}

impl Memo {
	pub fn tx_type(&self) -> TxType {
		match self {
			Memo::Swap(_) => TxType::Swap,
			Memo::AddLiquidity(_) => TxType::AddLiquidity,
			Memo::WithdrawLiquidity(_) => TxType::WithdrawLiquidity,
			Memo::CacaoPoolDeposit => TxType::CacaoPoolDeposit,
			Memo::CacaoPoolWithdraw(_) => TxType::CacaoPoolWithdraw,
			Memo::TradeAccountDeposit { .. } => TxType::TradeAccountDeposit,
			Memo::TradeAccountWithdrawal { .. } => TxType::TradeAccountWithdrawal,
			Memo::Bond(_) => TxType::Bond,
			Memo::Unbond(_) => TxType::Unbond,
			Memo::Leave { .. } => TxType::Leave,
			Memo::Donate { .. } => TxType::Donate,
			Memo::Reserve => TxType::Reserve,
			Memo::Outbound { .. } => TxType::Outbound,
			Memo::Refund { .. } => TxType::Refund,
			Memo::Migrate { .. } => TxType::Migrate,
			Memo::Ragnarok { .. } => TxType::Ragnarok,
			Memo::NoOp => TxType::NoOp,
			Memo::ManageName(_) => TxType::ManageName,
		}
	}

	pub fn has_outbound(&self) -> bool {
		self.tx_type().has_outbound()
	}

	pub fn is_internal(&self) -> bool {
		self.tx_type().is_internal()
	}
}

/// The memo attached to the outbound that settles the inbound `in_hash`.
pub fn outbound_memo(in_hash: &TxId) -> Vec<u8> {
	alloc::format!("{}:{in_hash:x}", TxType::Outbound.keyword()).into_bytes()
}

/// The memo attached to the outbound that returns the funds of the inbound `in_hash`.
pub fn refund_memo(in_hash: &TxId) -> Vec<u8> {
	alloc::format!("{}:{in_hash:x}", TxType::Refund.keyword()).into_bytes()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoError {
	Empty,
	UnknownTxType(String),
	ParseFailures { memo: String, failures: Vec<FieldFailure> },
}

impl fmt::Display for MemoError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MemoError::Empty => f.write_str("memo can't be empty"),
			MemoError::UnknownTxType(tx_type) => write!(f, "TxType not supported: {tx_type}"),
			MemoError::ParseFailures { memo, failures } => {
				write!(f, "MEMO: {memo}\nPARSE FAILURE(S): {}", failures.iter().join("-"))
			},
		}
	}
}

#[cfg(feature = "std")]
impl std::error::Error for MemoError {}

impl FromStr for Memo {
	type Err = MemoError;

	fn from_str(memo: &str) -> Result<Self, Self::Err> {
		parse_memo(memo, &behaviour_for(CURRENT_PROTOCOL_VERSION))
	}
}

/// Parses `memo` according to the grammar active under `behaviour`.
pub fn parse_memo(memo: &str, behaviour: &Behaviour) -> Result<Memo, MemoError> {
	let memo = if behaviour.strip_memo_suffix {
		memo.split('|').next().unwrap_or_default()
	} else {
		memo
	};
	let memo = memo.trim();
	if memo.is_empty() {
		return Err(MemoError::Empty)
	}

	let parts = memo.split(':').collect::<Vec<_>>();
	let keyword = parts[0].trim();
	let tx_type =
		TxType::from_keyword(keyword).ok_or_else(|| MemoError::UnknownTxType(keyword.to_string()))?;

	let mut fields = Fields::new(parts);
	let parsed = match tx_type {
		TxType::Swap => parse_swap(&mut fields, behaviour),
		TxType::AddLiquidity => parse_add_liquidity(&mut fields),
		TxType::WithdrawLiquidity => parse_withdraw_liquidity(&mut fields),
		TxType::CacaoPoolDeposit => Some(Memo::CacaoPoolDeposit),
		TxType::CacaoPoolWithdraw => parse_cacao_pool_withdraw(&mut fields),
		TxType::TradeAccountDeposit => fields
			.required(1, "owner", parse_address)
			.map(|owner| Memo::TradeAccountDeposit { owner }),
		TxType::TradeAccountWithdrawal => fields
			.required(1, "address", parse_address)
			.map(|address| Memo::TradeAccountWithdrawal { address }),
		TxType::Bond => parse_bond(&mut fields),
		TxType::Unbond => parse_unbond(&mut fields),
		TxType::Leave =>
			fields.required(1, "node address", parse_address).map(|node| Memo::Leave { node }),
		TxType::Donate =>
			fields.required(1, "asset", parse_asset).map(|asset| Memo::Donate { asset }),
		TxType::Reserve => Some(Memo::Reserve),
		TxType::Outbound =>
			fields.required(1, "tx id", parse_tx_id).map(|in_hash| Memo::Outbound { in_hash }),
		TxType::Refund =>
			fields.required(1, "tx id", parse_tx_id).map(|in_hash| Memo::Refund { in_hash }),
		TxType::Migrate =>
			fields.required(1, "block height", parse_u64).map(|height| Memo::Migrate { height }),
		TxType::Ragnarok =>
			fields.required(1, "block height", parse_u64).map(|height| Memo::Ragnarok { height }),
		TxType::NoOp => Some(Memo::NoOp),
		TxType::ManageName => parse_manage_name(&mut fields),
	};

	fields.finish(memo, parsed)
}

fn parse_swap(fields: &mut Fields, behaviour: &Behaviour) -> Option<Memo> {
	let target = fields.required(1, "asset", parse_asset);

	let (destination, refund_address) = match fields.get(2).split_once('/') {
		Some((destination, refund)) => (destination, Some(refund)),
		None => (fields.get(2), None),
	};
	let destination = if destination.is_empty() {
		Some(Address::default())
	} else {
		fields.parse("destination", destination, parse_address)
	};
	let refund_address = refund_address
		.filter(|refund| !refund.is_empty())
		.and_then(|refund| fields.parse("refund address", refund, parse_address));

	let scientific = behaviour.scientific_notation_limits;
	let limit_field = fields.get(3);
	let (trade_target, stream_interval, stream_quantity) = if limit_field.contains('/') {
		let mut parts = limit_field.splitn(3, '/').map(|part| match part.trim() {
			"" => "0",
			part => part,
		});
		let limit = parts.next().unwrap_or("0");
		let interval = parts.next().unwrap_or("0");
		let quantity = parts.next().unwrap_or("0");
		(
			fields.parse("swap limit", limit, |s| parse_amount(s, scientific)),
			fields.parse("stream interval", interval, parse_u64),
			fields.parse("stream quantity", quantity, parse_u64),
		)
	} else {
		(
			fields.optional(3, "swap limit", |s| parse_amount(s, scientific)).or(Some(0)),
			Some(0),
			Some(0),
		)
	};

	let affiliates = fields.affiliates(4, 5);

	let aggregator = fields.get(6);
	let dex_aggregation = if aggregator.is_empty() {
		None
	} else {
		let target_address = fields.required(7, "aggregator target address", parse_address);
		let target_limit = fields.optional(8, "aggregator target limit", |s| parse_amount(s, true));
		target_address.map(|target_address| DexAggregation {
			aggregator: aggregator.as_bytes().to_vec(),
			target_address,
			target_limit,
		})
	};

	Some(Memo::Swap(SwapMemo {
		target: target?,
		destination: destination?,
		refund_address,
		trade_target: trade_target?,
		stream_interval: stream_interval?,
		stream_quantity: stream_quantity?,
		affiliates,
		dex_aggregation,
	}))
}

fn parse_add_liquidity(fields: &mut Fields) -> Option<Memo> {
	let asset = fields.required(1, "asset", parse_asset);
	let pair_address = fields.optional(2, "pair address", parse_address);
	let affiliate = fields.affiliates(3, 4).into_iter().next();

	Some(Memo::AddLiquidity(AddLiquidityMemo { asset: asset?, pair_address, affiliate }))
}

fn parse_withdraw_liquidity(fields: &mut Fields) -> Option<Memo> {
	let asset = fields.required(1, "asset", parse_asset);
	let basis_points =
		fields.optional(2, "basis points", parse_nonzero_bps).unwrap_or(MAX_BASIS_POINTS);
	let withdrawal_asset = fields.optional(3, "withdrawal asset", parse_asset);

	Some(Memo::WithdrawLiquidity(WithdrawLiquidityMemo {
		asset: asset?,
		basis_points,
		withdrawal_asset,
	}))
}

fn parse_cacao_pool_withdraw(fields: &mut Fields) -> Option<Memo> {
	let basis_points = fields.required(1, "basis points", parse_nonzero_bps);
	let affiliates = fields.affiliates(2, 3);

	let total_bps = affiliates.iter().filter_map(|a| a.bps).map(u32::from).sum::<u32>();
	if total_bps > u32::from(MAX_BASIS_POINTS) {
		fields.fail(FieldFailure::Constraint("total affiliate basis points exceed 10000"));
	}

	Some(Memo::CacaoPoolWithdraw(CacaoPoolWithdrawMemo { basis_points: basis_points?, affiliates }))
}

fn parse_bond(fields: &mut Fields) -> Option<Memo> {
	let node = fields.required(1, "node address", parse_address);
	let provider = fields.optional(2, "provider address", parse_address);
	let operator_fee = fields.optional(3, "operator fee", parse_bps);

	Some(Memo::Bond(BondMemo { node: node?, provider, operator_fee }))
}

fn parse_unbond(fields: &mut Fields) -> Option<Memo> {
	let node = fields.required(1, "node address", parse_address);
	let amount = fields.required(2, "amount", |s| parse_amount(s, false));
	let provider = fields.optional(3, "provider address", parse_address);

	Some(Memo::Unbond(UnbondMemo { node: node?, amount: amount?, provider }))
}

fn parse_manage_name(fields: &mut Fields) -> Option<Memo> {
	let name = fields.required(1, "name", parse_name);
	let alias = match (fields.get(2).is_empty(), fields.get(3).is_empty()) {
		(true, true) => None,
		(false, false) => {
			let chain = fields.optional(2, "chain", parse_chain);
			let address = fields.optional(3, "address", parse_address);
			chain.zip(address)
		},
		_ => {
			fields.fail(FieldFailure::Constraint("chain and address must be set together"));
			None
		},
	};
	let owner = fields.optional(4, "owner", parse_address);
	let preferred_asset = fields.optional(5, "preferred asset", parse_asset);
	let expire_block_height = fields.optional(6, "expiry", parse_u64);
	let affiliate_bps = fields.optional(7, "affiliate basis points", parse_bps);

	let subaffiliates = fields
		.affiliates(8, 9)
		.into_iter()
		.map(|Affiliate { name, bps }| SubAffiliate { name, bps: bps.unwrap_or_default() })
		.collect::<Vec<_>>();
	if subaffiliates.iter().map(|s| u32::from(s.bps)).sum::<u32>() > u32::from(MAX_BASIS_POINTS) {
		fields.fail(FieldFailure::Constraint("total sub-affiliate basis points exceed 10000"));
	}

	Some(Memo::ManageName(ManageNameMemo {
		name: name?,
		alias,
		owner,
		preferred_asset,
		expire_block_height,
		affiliate_bps,
		subaffiliates,
	}))
}
