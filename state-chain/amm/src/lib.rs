#![cfg_attr(not(feature = "std"), no_std)]

//! Continuous liquidity pool maths.
//!
//! Every pool pairs CACAO with one other asset. Swaps use a slip-based fee: the output for an
//! input `x` against input-side depth `X` and output-side depth `Y` is `x*X*Y / (x+X)^2`, and
//! the liquidity fee retained by the pool is `x^2*Y / (x+X)^2`. Together they equal the
//! constant-product output `x*Y / (x+X)`.

#[cfg(test)]
mod tests;

pub mod common;

use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use common::to_amount;
pub use common::{bps_share, get_safe_share, mul_div_floor};
use mc_primitives::{AssetAmount, BasisPoints, MAX_BASIS_POINTS};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};
use sp_core::U512;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AmmError {
	/// One side of the pool has no depth.
	EmptyPool,
	ZeroInput,
	/// The first deposit into a pool must provide both sides.
	FirstDepositMustBeBothSides,
	/// The deposit is too small to be worth any pool units.
	ZeroUnits,
	Overflow,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Encode, Decode, DecodeWithMemTracking, TypeInfo, Serialize, Deserialize)]
pub enum SwapDirection {
	CacaoToAsset,
	AssetToCacao,
}

#[derive(
	Copy, Clone, Debug, Default, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize,
)]
pub struct SwapOutput {
	pub emitted: AssetAmount,
	/// Retained by the pool, denominated in the output asset.
	pub liquidity_fee: AssetAmount,
	/// The price slip caused by the swap, ie. `x / (x + X)`.
	pub slip_bps: BasisPoints,
}

/// The swap result for input `x` against input depth `input_depth` and output depth
/// `output_depth`.
pub fn calculate_swap(
	x: AssetAmount,
	input_depth: AssetAmount,
	output_depth: AssetAmount,
) -> Result<SwapOutput, AmmError> {
	if x == 0 {
		return Err(AmmError::ZeroInput)
	}
	if input_depth == 0 || output_depth == 0 {
		return Err(AmmError::EmptyPool)
	}

	let (x, big_x, big_y) = (U512::from(x), U512::from(input_depth), U512::from(output_depth));
	let denominator = (x + big_x) * (x + big_x);

	let emitted = to_amount(x * big_x * big_y / denominator).ok_or(AmmError::Overflow)?;
	let liquidity_fee = to_amount(x * x * big_y / denominator).ok_or(AmmError::Overflow)?;
	let slip_bps = (x * U512::from(MAX_BASIS_POINTS) / (x + big_x)).low_u32() as BasisPoints;

	Ok(SwapOutput { emitted, liquidity_fee, slip_bps })
}

#[derive(
	Copy,
	Clone,
	Debug,
	Default,
	PartialEq,
	Eq,
	Encode,
	Decode,
	TypeInfo,
	MaxEncodedLen,
	Serialize,
	Deserialize,
)]
pub struct PoolDepths {
	pub cacao: AssetAmount,
	pub asset: AssetAmount,
}

impl PoolDepths {
	pub fn is_empty(&self) -> bool {
		self.cacao == 0 || self.asset == 0
	}

	/// Simulates a swap without changing the depths.
	pub fn quote(
		&self,
		direction: SwapDirection,
		amount: AssetAmount,
	) -> Result<SwapOutput, AmmError> {
		match direction {
			SwapDirection::CacaoToAsset => calculate_swap(amount, self.cacao, self.asset),
			SwapDirection::AssetToCacao => calculate_swap(amount, self.asset, self.cacao),
		}
	}

	/// Executes a swap: the input is added to its side and the emitted amount removed from the
	/// other. The fee stays in the pool.
	pub fn swap(
		&mut self,
		direction: SwapDirection,
		amount: AssetAmount,
	) -> Result<SwapOutput, AmmError> {
		let output = self.quote(direction, amount)?;
		let (input_side, output_side) = match direction {
			SwapDirection::CacaoToAsset => (&mut self.cacao, &mut self.asset),
			SwapDirection::AssetToCacao => (&mut self.asset, &mut self.cacao),
		};
		*input_side = input_side.checked_add(amount).ok_or(AmmError::Overflow)?;
		*output_side = output_side.saturating_sub(output.emitted);
		Ok(output)
	}

	/// The CACAO value of `amount` of the pool asset at the pool's spot price.
	pub fn asset_to_cacao(&self, amount: AssetAmount) -> AssetAmount {
		get_safe_share(amount, self.asset, self.cacao)
	}

	/// The pool-asset value of `amount` CACAO at the pool's spot price.
	pub fn cacao_to_asset(&self, amount: AssetAmount) -> AssetAmount {
		get_safe_share(amount, self.cacao, self.asset)
	}
}

/// Units minted for adding `cacao` and `asset` to a pool with `pool_units` outstanding and the
/// given depths.
///
/// Uses `P * (R*a + r*A) / (2*R*A)`, reduced by the slip of the asymmetric part
/// `|R*a - r*A| / ((2r + R) * (a + A))`. A symmetric add gets exactly its share of the pool.
pub fn calculate_liquidity_units(
	pool_units: AssetAmount,
	depths: PoolDepths,
	cacao: AssetAmount,
	asset: AssetAmount,
) -> Result<AssetAmount, AmmError> {
	if cacao == 0 && asset == 0 {
		return Err(AmmError::ZeroInput)
	}
	if pool_units == 0 || depths.is_empty() {
		if cacao == 0 || asset == 0 {
			return Err(AmmError::FirstDepositMustBeBothSides)
		}
		return Ok(cacao)
	}

	let (p, big_r, big_a) =
		(U512::from(pool_units), U512::from(depths.cacao), U512::from(depths.asset));
	let (r, a) = (U512::from(cacao), U512::from(asset));

	let cacao_weighted = big_r * a;
	let asset_weighted = r * big_a;
	let raw_units = p * (cacao_weighted + asset_weighted) / (U512::from(2u8) * big_r * big_a);

	let imbalance = if cacao_weighted > asset_weighted {
		cacao_weighted - asset_weighted
	} else {
		asset_weighted - cacao_weighted
	};
	let slip_denominator = (U512::from(2u8) * r + big_r) * (a + big_a);
	let units = raw_units * (slip_denominator - imbalance) / slip_denominator;

	match to_amount(units).ok_or(AmmError::Overflow)? {
		0 => Err(AmmError::ZeroUnits),
		units => Ok(units),
	}
}

/// The `(cacao, asset)` amounts redeemed by burning `units` out of `pool_units`.
pub fn calculate_withdrawal(
	units: AssetAmount,
	pool_units: AssetAmount,
	depths: PoolDepths,
) -> (AssetAmount, AssetAmount) {
	(
		get_safe_share(units, pool_units, depths.cacao),
		get_safe_share(units, pool_units, depths.asset),
	)
}

/// Whether a synth supply of `synth_supply` exceeds `max_bps` of twice the pool's asset depth.
pub fn synth_supply_exceeds_cap(
	synth_supply: AssetAmount,
	asset_depth: AssetAmount,
	max_bps: BasisPoints,
) -> bool {
	if asset_depth == 0 {
		return synth_supply > 0
	}
	let coverage = U512::from(synth_supply) * U512::from(MAX_BASIS_POINTS) /
		(U512::from(asset_depth) * U512::from(2u8));
	coverage > U512::from(max_bps)
}

/// The largest number of slices a streaming swap of `deposit` into a pool side of `input_depth`
/// may be split into, such that each slice still pays at least `min_slip_bps` of slip.
///
/// With `price_impact` set, the count is the whole swap's slip divided by `min_slip_bps`.
/// Otherwise it is the deposit divided by the minimum slice size `input_depth * min_slip_bps`.
/// Always at least one.
pub fn max_streaming_quantity(
	deposit: AssetAmount,
	input_depth: AssetAmount,
	min_slip_bps: BasisPoints,
	price_impact: bool,
) -> u64 {
	if deposit == 0 || input_depth == 0 || min_slip_bps == 0 {
		return 1
	}
	let quantity = if price_impact {
		let slip_bps =
			mul_div_floor(deposit, MAX_BASIS_POINTS.into(), deposit.saturating_add(input_depth))
				.unwrap_or_default();
		slip_bps / AssetAmount::from(min_slip_bps)
	} else {
		match bps_share(min_slip_bps, input_depth) {
			0 => deposit,
			min_size => deposit / min_size,
		}
	};
	u64::try_from(quantity).unwrap_or(u64::MAX).max(1)
}
