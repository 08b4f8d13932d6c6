//! Field-level parsing helpers. Failures are collected rather than returned early so that a
//! rejected memo reports every problem at once.
use super::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldFailure {
	MissingField(&'static str),
	InvalidField { field: &'static str, value: String },
	/// A cross-field rule was violated.
	Constraint(&'static str),
}

impl fmt::Display for FieldFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldFailure::MissingField(field) => write!(f, "missing {field}"),
			FieldFailure::InvalidField { field, value } => write!(f, "invalid {field}: {value}"),
			FieldFailure::Constraint(rule) => f.write_str(rule),
		}
	}
}

pub(crate) struct Fields<'a> {
	parts: Vec<&'a str>,
	failures: Vec<FieldFailure>,
}

impl<'a> Fields<'a> {
	pub fn new(parts: Vec<&'a str>) -> Self {
		Fields { parts, failures: Vec::new() }
	}

	/// The trimmed field at `index`, or the empty string if the memo is shorter.
	pub fn get(&self, index: usize) -> &'a str {
		self.parts.get(index).map(|s| s.trim()).unwrap_or_default()
	}

	pub fn fail(&mut self, failure: FieldFailure) {
		self.failures.push(failure);
	}

	pub fn required<T>(
		&mut self,
		index: usize,
		field: &'static str,
		parse: impl FnOnce(&str) -> Option<T>,
	) -> Option<T> {
		let value = self.get(index);
		if value.is_empty() {
			self.fail(FieldFailure::MissingField(field));
			return None
		}
		self.parse(field, value, parse)
	}

	pub fn optional<T>(
		&mut self,
		index: usize,
		field: &'static str,
		parse: impl FnOnce(&str) -> Option<T>,
	) -> Option<T> {
		let value = self.get(index);
		if value.is_empty() {
			return None
		}
		self.parse(field, value, parse)
	}

	pub fn parse<T>(
		&mut self,
		field: &'static str,
		value: &str,
		parse: impl FnOnce(&str) -> Option<T>,
	) -> Option<T> {
		let parsed = parse(value);
		if parsed.is_none() {
			self.fail(FieldFailure::InvalidField { field, value: value.to_string() });
		}
		parsed
	}

	/// Parses a `/`-separated list of affiliates and their fees.
	///
	/// A single fee applies to every affiliate. Without any fee, each affiliate's fee is resolved
	/// later from the name registry.
	pub fn affiliates(&mut self, names_index: usize, bps_index: usize) -> Vec<Affiliate> {
		let names = split_list(self.get(names_index));
		let bps = split_list(self.get(bps_index))
			.into_iter()
			.filter_map(|value| self.parse("affiliate basis points", value, parse_bps))
			.collect::<Vec<_>>();

		if names.is_empty() {
			if !bps.is_empty() {
				self.fail(FieldFailure::Constraint("affiliate basis points without affiliate"));
			}
			return Vec::new()
		}

		let names = names
			.into_iter()
			.filter_map(|name| self.parse("affiliate", name, parse_affiliate))
			.collect::<Vec<_>>();

		match bps.len() {
			0 => names.into_iter().map(|name| Affiliate { name, bps: None }).collect(),
			1 => names.into_iter().map(|name| Affiliate { name, bps: Some(bps[0]) }).collect(),
			n if n == names.len() => names
				.into_iter()
				.zip(bps)
				.map(|(name, bps)| Affiliate { name, bps: Some(bps) })
				.collect(),
			_ => {
				self.fail(FieldFailure::Constraint(
					"affiliate and affiliate basis points count mismatch",
				));
				Vec::new()
			},
		}
	}

	pub fn finish(self, memo: &str, parsed: Option<Memo>) -> Result<Memo, MemoError> {
		match parsed {
			Some(memo) if self.failures.is_empty() => Ok(memo),
			_ => Err(MemoError::ParseFailures { memo: memo.to_string(), failures: self.failures }),
		}
	}
}

fn split_list(value: &str) -> Vec<&str> {
	value.split('/').map(str::trim).filter(|s| !s.is_empty()).collect()
}

pub fn parse_asset(value: &str) -> Option<Asset> {
	Asset::from_str(value).ok()
}

pub fn parse_chain(value: &str) -> Option<Chain> {
	Chain::from_str(value).ok()
}

pub fn parse_address(value: &str) -> Option<Address> {
	(!value.is_empty() && value.chars().all(|c| c.is_ascii_graphic() && c != '/'))
		.then(|| Address::from(value))
}

pub fn parse_u64(value: &str) -> Option<u64> {
	value.parse().ok()
}

pub fn parse_bps(value: &str) -> Option<BasisPoints> {
	value.parse().ok().filter(|bps| *bps <= MAX_BASIS_POINTS)
}

pub fn parse_nonzero_bps(value: &str) -> Option<BasisPoints> {
	parse_bps(value).filter(|bps| *bps > 0)
}

pub fn parse_tx_id(value: &str) -> Option<TxId> {
	mc_utilities::clean_hex_hash(value).ok().map(TxId::from)
}

/// Names are 1 to 30 characters of ASCII letters, digits, `-`, `_` and `+`.
pub fn parse_name(value: &str) -> Option<Vec<u8>> {
	(!value.is_empty() &&
		value.len() <= MAX_NAME_LENGTH &&
		value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+')))
	.then(|| value.to_ascii_lowercase().into_bytes())
}

/// An affiliate is either a registered name or a native address.
fn parse_affiliate(value: &str) -> Option<Vec<u8>> {
	parse_name(value).or_else(|| parse_address(value).map(|address| address.0))
}

/// Parses a non-negative integer amount. With `scientific` set, decimal fractions and an
/// exponent are accepted, eg. `1.5e8`. Digits that remain after the decimal point once the
/// exponent is applied are truncated.
pub fn parse_amount(value: &str, scientific: bool) -> Option<AssetAmount> {
	let (mantissa, exponent) = match value.find(['e', 'E']) {
		Some(index) if scientific => (&value[..index], value[index + 1..].parse::<u32>().ok()?),
		Some(_) => return None,
		None => (value, 0),
	};
	let (integer, fraction) = match mantissa.split_once('.') {
		Some(_) if !scientific => return None,
		Some(split) => split,
		None => (mantissa, ""),
	};
	if (integer.is_empty() && fraction.is_empty()) ||
		!integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit())
	{
		return None
	}

	let shifted = fraction.len().min(exponent as usize);
	let digits = [integer, &fraction[..shifted]].concat();
	let significant = digits.trim_start_matches('0');
	if significant.is_empty() {
		return Some(0)
	}
	let value: AssetAmount = significant.parse().ok()?;
	value.checked_mul(10u128.checked_pow(exponent - shifted as u32)?)
}
