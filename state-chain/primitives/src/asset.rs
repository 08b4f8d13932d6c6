//! Asset identifiers.
//!
//! An asset is identified by the chain it lives on, its symbol and its kind. Layer-1 assets are
//! held in chain vaults. Synths and trade assets are claims on a layer-1 asset that live entirely
//! on the native chain:
//!
//! ```
//! use mc_primitives::{Asset, AssetKind, Chain};
//! let btc: Asset = "btc.btc".parse().unwrap();
//! assert_eq!(btc.get_synth_asset().to_string(), "BTC/BTC");
//! assert_eq!(btc.get_trade_asset().kind, AssetKind::Trade);
//! ```
use super::*;
use core::{fmt, str::FromStr};

#[derive(
	Copy,
	Clone,
	Debug,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Hash,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	MaxEncodedLen,
	Serialize,
	Deserialize,
)]
pub enum AssetKind {
	/// Held on its own chain, in a vault.
	Layer1,
	/// Minted against pool depth and freely transferable on the native chain.
	Synth,
	/// A one-for-one claim on a vault-held layer-1 asset, tracked in a trade account.
	Trade,
}

impl AssetKind {
	pub const fn separator(&self) -> char {
		match self {
			AssetKind::Layer1 => '.',
			AssetKind::Synth => '/',
			AssetKind::Trade => '~',
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetError {
	Empty,
	UnknownChain,
	InvalidSymbol,
	/// The native asset has no synth or trade representation.
	NativeDerivative,
}

impl fmt::Display for AssetError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			AssetError::Empty => "asset cannot be empty",
			AssetError::UnknownChain => "unknown chain",
			AssetError::InvalidSymbol => "invalid asset symbol",
			AssetError::NativeDerivative => "native asset cannot be a synth or trade asset",
		})
	}
}

#[derive(
	Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, DecodeWithMemTracking, TypeInfo,
)]
pub struct Asset {
	pub chain: Chain,
	/// Upper-case ASCII symbol, eg. `BTC` or `USDT-0XDAC17F958D2EE523A2206206994597C13D831EC7`.
	pub symbol: Vec<u8>,
	pub kind: AssetKind,
}

impl Asset {
	/// A layer-1 asset on `chain`. The symbol is normalised to upper case.
	pub fn new(chain: Chain, symbol: &str) -> Self {
		Asset { chain, symbol: symbol.to_ascii_uppercase().into_bytes(), kind: AssetKind::Layer1 }
	}

	/// The protocol's native asset.
	pub fn cacao() -> Self {
		Chain::NATIVE.gas_asset()
	}

	pub fn is_cacao(&self) -> bool {
		self.kind == AssetKind::Layer1 && self.chain.is_native() && self.symbol == b"CACAO"
	}

	pub fn is_gas_asset(&self) -> bool {
		self.kind == AssetKind::Layer1 && *self == self.chain.gas_asset()
	}

	pub fn is_layer1(&self) -> bool {
		self.kind == AssetKind::Layer1
	}

	pub fn is_synth(&self) -> bool {
		self.kind == AssetKind::Synth
	}

	pub fn is_trade(&self) -> bool {
		self.kind == AssetKind::Trade
	}

	/// Assets whose balances live in the native ledger rather than in an external vault.
	pub fn is_native_settled(&self) -> bool {
		self.chain.is_native() || self.kind != AssetKind::Layer1
	}

	/// The chain on which a coin of this asset is delivered.
	pub fn settlement_chain(&self) -> Chain {
		if self.is_native_settled() {
			Chain::NATIVE
		} else {
			self.chain
		}
	}

	fn with_kind(&self, kind: AssetKind) -> Self {
		Asset { chain: self.chain, symbol: self.symbol.clone(), kind }
	}

	pub fn get_layer1_asset(&self) -> Self {
		self.with_kind(AssetKind::Layer1)
	}

	pub fn get_synth_asset(&self) -> Self {
		self.with_kind(AssetKind::Synth)
	}

	pub fn get_trade_asset(&self) -> Self {
		self.with_kind(AssetKind::Trade)
	}

	/// The part of the symbol before any contract suffix.
	pub fn ticker(&self) -> &[u8] {
		self.symbol.split(|b| *b == b'-').next().unwrap_or(&self.symbol)
	}
}

impl fmt::Display for Asset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}{}{}",
			self.chain,
			self.kind.separator(),
			core::str::from_utf8(&self.symbol).map_err(|_| fmt::Error)?
		)
	}
}

impl fmt::Debug for Asset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl FromStr for Asset {
	type Err = AssetError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(AssetError::Empty)
		}
		if s.eq_ignore_ascii_case("CACAO") {
			return Ok(Asset::cacao())
		}

		let (index, kind) = s
			.char_indices()
			.find_map(|(i, c)| match c {
				'.' => Some((i, AssetKind::Layer1)),
				'/' => Some((i, AssetKind::Synth)),
				'~' => Some((i, AssetKind::Trade)),
				_ => None,
			})
			.ok_or(AssetError::InvalidSymbol)?;

		let chain = Chain::from_str(&s[..index]).map_err(|_| AssetError::UnknownChain)?;
		let symbol = &s[index + 1..];
		if symbol.is_empty() ||
			!symbol.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
		{
			return Err(AssetError::InvalidSymbol)
		}

		let asset = Asset { kind, ..Asset::new(chain, symbol) };
		if chain.is_native() && kind != AssetKind::Layer1 {
			return Err(AssetError::NativeDerivative)
		}
		Ok(asset)
	}
}

impl Serialize for Asset {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Asset {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}
