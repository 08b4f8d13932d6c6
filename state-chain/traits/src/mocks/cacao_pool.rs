use super::{MockPallet, MockPalletStorage};
use crate::CacaoPoolApi;
use frame_support::pallet_prelude::DispatchResult;
use mc_memo::Affiliate;
use mc_primitives::{Asset, AssetAmount, BasisPoints, TxId};

pub struct MockCacaoPoolApi;

impl MockPallet for MockCacaoPoolApi {
	const PREFIX: &'static [u8] = b"MockCacaoPoolApi";
}

const DEPOSITS: &[u8] = b"DEPOSITS";
const WITHDRAWALS: &[u8] = b"WITHDRAWALS";
const ACCRUED: &[u8] = b"ACCRUED";

impl MockCacaoPoolApi {
	pub fn deposits() -> Vec<(u64, AssetAmount)> {
		Self::get_value(DEPOSITS).unwrap_or_default()
	}

	pub fn withdrawals() -> Vec<(u64, BasisPoints, Vec<Affiliate>)> {
		Self::get_value(WITHDRAWALS).unwrap_or_default()
	}

	/// Liquidity fees reported by swaps, per pool.
	pub fn accrued() -> Vec<(Asset, AssetAmount)> {
		Self::get_value(ACCRUED).unwrap_or_default()
	}
}

impl CacaoPoolApi for MockCacaoPoolApi {
	type AccountId = u64;

	fn deposit(owner: &u64, amount: AssetAmount, _tx_id: TxId) -> DispatchResult {
		super::push_value::<Self, _>(DEPOSITS, (*owner, amount));
		Ok(())
	}

	fn withdraw(
		owner: &u64,
		basis_points: BasisPoints,
		affiliates: &[Affiliate],
		_tx_id: TxId,
	) -> DispatchResult {
		super::push_value::<Self, _>(WITHDRAWALS, (*owner, basis_points, affiliates.to_vec()));
		Ok(())
	}

	fn accrue_swap_fee(pool_asset: &Asset, liquidity_fee_in_cacao: AssetAmount) -> AssetAmount {
		super::push_value::<Self, _>(ACCRUED, (pool_asset.clone(), liquidity_fee_in_cacao));
		0
	}
}
