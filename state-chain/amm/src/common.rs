use mc_primitives::{AssetAmount, BasisPoints, MAX_BASIS_POINTS};
use sp_core::U512;

/// `a * b / c`, rounded down. Returns `None` on division by zero or if the result exceeds
/// `u128`.
pub fn mul_div_floor(a: AssetAmount, b: AssetAmount, c: AssetAmount) -> Option<AssetAmount> {
	if c == 0 {
		return None
	}
	(U512::from(a) * U512::from(b) / U512::from(c)).try_into().ok()
}

/// The `part / total` share of `amount`, rounded down. Zero if `total` is zero. Saturates at
/// `u128::MAX`, which is only reachable when `part > total`.
pub fn get_safe_share(part: AssetAmount, total: AssetAmount, amount: AssetAmount) -> AssetAmount {
	if total == 0 {
		return 0
	}
	mul_div_floor(part, amount, total).unwrap_or(AssetAmount::MAX)
}

/// `bps / 10_000` of `amount`.
pub fn bps_share(bps: BasisPoints, amount: AssetAmount) -> AssetAmount {
	get_safe_share(bps.into(), MAX_BASIS_POINTS.into(), amount)
}

pub(crate) fn to_amount(value: U512) -> Option<AssetAmount> {
	value.try_into().ok()
}
