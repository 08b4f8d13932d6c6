#![cfg_attr(not(feature = "std"), no_std)]

//! MAYAChain Primitives
//!
//! Primitive types to be used across the state-chain crates.

extern crate alloc;

use alloc::string::String;
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use core::fmt;
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};
use sp_std::vec::Vec;

pub mod asset;
pub use asset::*;

pub mod chains;
pub use chains::*;

pub mod mimir;
pub use mimir::*;

pub mod version;
pub use version::*;


pub type AssetAmount = u128;

pub type BasisPoints = u16;

pub const MAX_BASIS_POINTS: BasisPoints = 10_000;

/// 1 CACAO in base units.
pub const ONE_CACAO: AssetAmount = 10_000_000_000;

/// The hash of an external or native transaction.
pub type TxId = sp_core::H256;

/// A block height on an observed chain.
pub type ExternalBlockHeight = u64;

/// Destination that swallows any outbound.
pub const NOOP_ADDRESS: &[u8] = b"NOOP";

/// An address on any chain, in its canonical textual encoding.
#[derive(
	Clone,
	Default,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Hash,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	Serialize,
	Deserialize,
)]
#[serde(transparent)]
pub struct Address(#[serde(with = "mc_utilities::with_serde::bytes_as_string")] pub Vec<u8>);

impl Address {
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn is_noop(&self) -> bool {
		self.0.eq_ignore_ascii_case(NOOP_ADDRESS)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl From<&str> for Address {
	fn from(s: &str) -> Self {
		Address(s.as_bytes().to_vec())
	}
}

impl From<String> for Address {
	fn from(s: String) -> Self {
		Address(s.into_bytes())
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&String::from_utf8_lossy(&self.0))
	}
}

impl fmt::Debug for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Address({self})")
	}
}

#[derive(
	Clone,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Hash,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	Serialize,
	Deserialize,
)]
pub struct Coin {
	pub asset: Asset,
	pub amount: AssetAmount,
}

impl Coin {
	pub fn new(asset: Asset, amount: AssetAmount) -> Self {
		Coin { asset, amount }
	}

	pub fn cacao(amount: AssetAmount) -> Self {
		Coin { asset: Asset::cacao(), amount }
	}

	pub fn is_empty(&self) -> bool {
		self.amount == 0
	}
}

impl fmt::Display for Coin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.amount, self.asset)
	}
}

impl fmt::Debug for Coin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

/// Protocol-owned balances held in the native ledger.
#[derive(
	Copy,
	Clone,
	Debug,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	MaxEncodedLen,
	Serialize,
	Deserialize,
)]
pub enum ModuleName {
	/// Holds pooled CACAO and every native-settled coin deposited for processing.
	Asgard,
	Bond,
	Reserve,
	CacaoPool,
	AffiliateCollector,
}

/// A holder of native-ledger balances.
#[derive(
	Clone,
	Debug,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	Serialize,
	Deserialize,
)]
pub enum LedgerAccount<AccountId> {
	Module(ModuleName),
	Account(AccountId),
}

/// The public key controlling a vault.
#[derive(
	Clone,
	Default,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	Serialize,
	Deserialize,
)]
pub struct VaultPubKey(pub Vec<u8>);

impl fmt::Debug for VaultPubKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "VaultPubKey(0x{})", hex::encode(&self.0))
	}
}

/// A transaction as seen on its source chain.
#[derive(
	Clone,
	Debug,
	PartialEq,
	Eq,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	Serialize,
	Deserialize,
)]
pub struct Tx {
	pub id: TxId,
	pub chain: Chain,
	pub from_address: Address,
	pub to_address: Address,
	pub coins: Vec<Coin>,
	pub gas: Vec<Coin>,
	#[serde(with = "mc_utilities::with_serde::bytes_as_string")]
	pub memo: Vec<u8>,
}

impl Tx {
	pub fn memo_str(&self) -> Option<&str> {
		core::str::from_utf8(&self.memo).ok()
	}
}

/// Why inbound funds were returned to their sender. The numeric code is stable and is surfaced in
/// refund events.
#[derive(
	Copy,
	Clone,
	Debug,
	PartialEq,
	Eq,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	MaxEncodedLen,
	Serialize,
	Deserialize,
)]
pub enum RefundReason {
	InvalidVault,
	InvalidMemo,
	TradingHalted,
	SwapFailed,
	SwapLimitNotMet,
	LiquidityFailed,
	TradeAccountFailed,
	CacaoPoolFailed,
	TxFailed,
}

impl RefundReason {
	pub const fn code(&self) -> u32 {
		match self {
			RefundReason::TxFailed => 99,
			RefundReason::InvalidVault => 104,
			RefundReason::InvalidMemo => 105,
			RefundReason::TradingHalted => 106,
			RefundReason::SwapFailed => 108,
			RefundReason::SwapLimitNotMet => 109,
			RefundReason::LiquidityFailed => 110,
			RefundReason::TradeAccountFailed => 111,
			RefundReason::CacaoPoolFailed => 112,
		}
	}
}
