use super::{ledger::MockLedger, MockPallet, MockPalletStorage};
use crate::{
	calculate_nested_affiliate_shares, AffiliateEntry, AffiliateFeeApi, AffiliateShare, Ledger,
};
use frame_support::pallet_prelude::DispatchError;
use mc_memo::Affiliate;
use mc_primitives::{
	Asset, AssetAmount, BasisPoints, LedgerAccount, ModuleName, TxId, MAX_BASIS_POINTS,
};

/// Pays affiliates by burning from the source module in [MockLedger] and recording the payout.
/// Affiliates without an explicit fee get nothing.
pub struct MockAffiliateFeeApi;

impl MockPallet for MockAffiliateFeeApi {
	const PREFIX: &'static [u8] = b"MockAffiliateFeeApi";
}

const PAYOUTS: &[u8] = b"PAYOUTS";

impl MockAffiliateFeeApi {
	pub fn payouts() -> Vec<(TxId, AffiliateShare)> {
		Self::get_value(PAYOUTS).unwrap_or_default()
	}
}

impl AffiliateFeeApi for MockAffiliateFeeApi {
	fn affiliate_shares(
		affiliates: &[Affiliate],
		amount: AssetAmount,
		max_total_bps: BasisPoints,
	) -> Vec<AffiliateShare> {
		let entries = affiliates
			.iter()
			.map(|affiliate| {
				AffiliateEntry::new(affiliate.name.clone(), affiliate.bps.unwrap_or(0))
			})
			.collect::<Vec<_>>();
		let max_total_bps = if max_total_bps == 0 { MAX_BASIS_POINTS } else { max_total_bps };
		calculate_nested_affiliate_shares(amount, &entries, max_total_bps)
	}

	fn pay_affiliates(
		source: ModuleName,
		tx_id: TxId,
		shares: Vec<AffiliateShare>,
	) -> Result<AssetAmount, DispatchError> {
		let total = shares.iter().map(|share| share.amount).sum();
		MockLedger::burn(&LedgerAccount::Module(source), &Asset::cacao(), total)?;
		for share in shares {
			super::push_value::<Self, _>(PAYOUTS, (tx_id, share));
		}
		Ok(total)
	}
}
