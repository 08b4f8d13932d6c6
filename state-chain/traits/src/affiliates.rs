use crate::AffiliateShare;
use alloc::vec::Vec;
use mc_amm::bps_share;
use mc_primitives::{AssetAmount, BasisPoints, MAX_BASIS_POINTS};

/// An affiliate with its fee and the sub-affiliates it passes part of that fee on to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AffiliateEntry {
	pub name: Vec<u8>,
	pub bps: BasisPoints,
	/// Shares of this affiliate's own fee, in basis points of that fee.
	pub subaffiliates: Vec<AffiliateEntry>,
}

impl AffiliateEntry {
	pub fn new(name: impl Into<Vec<u8>>, bps: BasisPoints) -> Self {
		AffiliateEntry { name: name.into(), bps, subaffiliates: Vec::new() }
	}

	pub fn with_subaffiliates(mut self, subaffiliates: Vec<AffiliateEntry>) -> Self {
		self.subaffiliates = subaffiliates;
		self
	}
}

/// Splits `input` among `affiliates`.
///
/// Each top-level entry takes `bps / 10_000` of `input`, up to `max_total_bps` in total. An entry
/// with sub-affiliates passes their share of its fee down and keeps the rest. Iteration stops at
/// the first entry that no longer fits in the remaining budget. Payouts to the same name are
/// merged, in order of first appearance.
pub fn calculate_nested_affiliate_shares(
	input: AssetAmount,
	affiliates: &[AffiliateEntry],
	max_total_bps: BasisPoints,
) -> Vec<AffiliateShare> {
	let mut shares = Vec::new();
	let mut remaining_bps = max_total_bps.min(MAX_BASIS_POINTS);

	for affiliate in affiliates {
		if affiliate.bps > remaining_bps {
			break
		}
		remaining_bps -= affiliate.bps;
		split_share(affiliate, bps_share(affiliate.bps, input), &mut shares);
	}

	shares
}

fn split_share(affiliate: &AffiliateEntry, amount: AssetAmount, shares: &mut Vec<AffiliateShare>) {
	if amount == 0 {
		return
	}

	let mut passed_down: AssetAmount = 0;
	let mut remaining_bps = MAX_BASIS_POINTS;
	for sub in &affiliate.subaffiliates {
		if sub.bps > remaining_bps {
			break
		}
		remaining_bps -= sub.bps;
		let sub_amount = bps_share(sub.bps, amount);
		passed_down += sub_amount;
		split_share(sub, sub_amount, shares);
	}

	add_share(shares, &affiliate.name, amount.saturating_sub(passed_down));
}

fn add_share(shares: &mut Vec<AffiliateShare>, name: &[u8], amount: AssetAmount) {
	if amount == 0 {
		return
	}
	match shares.iter_mut().find(|share| share.name == name) {
		Some(share) => share.amount = share.amount.saturating_add(amount),
		None => shares.push(AffiliateShare { name: name.to_vec(), amount }),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn amount_of(shares: &[AffiliateShare], name: &str) -> AssetAmount {
		shares
			.iter()
			.find(|share| share.name == name.as_bytes())
			.map(|share| share.amount)
			.unwrap_or_default()
	}

	#[test]
	fn nested_shares_follow_sub_affiliate_split() {
		let affiliates = [
			AffiliateEntry::new("a", 3_000),
			AffiliateEntry::new("b", 4_000)
				.with_subaffiliates(vec![AffiliateEntry::new("c", 4_000)]),
		];

		let shares = calculate_nested_affiliate_shares(248_000, &affiliates, MAX_BASIS_POINTS);

		assert_eq!(amount_of(&shares, "a"), 74_400);
		assert_eq!(amount_of(&shares, "b"), 59_520);
		assert_eq!(amount_of(&shares, "c"), 39_680);
	}

	#[test]
	fn stops_when_budget_is_exhausted() {
		let affiliates = [
			AffiliateEntry::new("a", 600),
			AffiliateEntry::new("b", 500),
			AffiliateEntry::new("c", 100),
		];

		let shares = calculate_nested_affiliate_shares(10_000, &affiliates, 1_000);

		assert_eq!(shares, vec![AffiliateShare { name: b"a".to_vec(), amount: 600 }]);
	}

	#[test]
	fn sub_affiliates_beyond_full_share_are_ignored() {
		let affiliates = [AffiliateEntry::new("a", 10_000).with_subaffiliates(vec![
			AffiliateEntry::new("b", 7_000),
			AffiliateEntry::new("c", 4_000),
		])];

		let shares = calculate_nested_affiliate_shares(1_000, &affiliates, MAX_BASIS_POINTS);

		assert_eq!(amount_of(&shares, "a"), 300);
		assert_eq!(amount_of(&shares, "b"), 700);
		assert_eq!(amount_of(&shares, "c"), 0);
	}

	#[test]
	fn deeper_nesting_and_merged_names() {
		let affiliates = [
			AffiliateEntry::new("a", 1_000).with_subaffiliates(vec![AffiliateEntry::new("b", 5_000)
				.with_subaffiliates(vec![AffiliateEntry::new("a", 5_000)])]),
		];

		let shares = calculate_nested_affiliate_shares(100_000, &affiliates, MAX_BASIS_POINTS);

		// a: 10_000, passes 5_000 to b, which passes 2_500 back to a.
		assert_eq!(amount_of(&shares, "b"), 2_500);
		assert_eq!(amount_of(&shares, "a"), 7_500);
	}

	#[test]
	fn total_never_exceeds_cap() {
		let affiliates = [AffiliateEntry::new("a", 333), AffiliateEntry::new("b", 333)];
		let shares = calculate_nested_affiliate_shares(999_999, &affiliates, 700);
		let total: AssetAmount = shares.iter().map(|share| share.amount).sum();
		assert!(total <= bps_share(700, 999_999));
	}
}
