use super::*;
use strum_macros::{Display, EnumIter, EnumString};

/// The chains the protocol observes and settles on.
///
/// The textual form is the upper-case ticker used in memos and asset identifiers, and parsing is
/// case-insensitive.
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
	Display,
	EnumString,
	EnumIter,
)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Chain {
	Maya,
	Btc,
	Eth,
	Arb,
	Dash,
	Kuji,
	Thor,
	Xrd,
	Zec,
}

impl Chain {
	/// The native chain, on which CACAO, synths and trade assets settle.
	pub const NATIVE: Chain = Chain::Maya;

	pub fn is_native(&self) -> bool {
		*self == Self::NATIVE
	}

	/// Whether this chain's accounts are account-based rather than UTXO-based.
	pub fn is_evm(&self) -> bool {
		matches!(self, Chain::Eth | Chain::Arb)
	}

	/// The asset used to pay for transactions on this chain.
	pub fn gas_asset(&self) -> Asset {
		let symbol = match self {
			Chain::Maya => "CACAO",
			Chain::Btc => "BTC",
			Chain::Eth | Chain::Arb => "ETH",
			Chain::Dash => "DASH",
			Chain::Kuji => "KUJI",
			Chain::Thor => "RUNE",
			Chain::Xrd => "XRD",
			Chain::Zec => "ZEC",
		};
		Asset::new(*self, symbol)
	}
}
