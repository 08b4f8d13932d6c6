use super::{MockPallet, MockPalletStorage};
use crate::{
	AddLiquidityRequest, LiquidityApi, PoolApi, SwapResult, WithdrawLiquidityRequest,
};
use frame_support::pallet_prelude::{DispatchError, DispatchResult};
use mc_amm::{PoolDepths, SwapDirection};
use mc_primitives::{Address, Asset, AssetAmount};

/// Pools priced with the real swap maths over depths set by the test.
pub struct MockPoolApi;

impl MockPallet for MockPoolApi {
	const PREFIX: &'static [u8] = b"MockPoolApi";
}

const DEPTHS: &[u8] = b"DEPTHS";
const LP_VALUES: &[u8] = b"LP_VALUES";
const SWAPS: &[u8] = b"SWAPS";
const SHOULD_FAIL: &[u8] = b"SHOULD_FAIL";
const TOTAL_POOLED: &[u8] = b"TOTAL_POOLED";

impl MockPoolApi {
	pub fn set_pool(asset: Asset, cacao: AssetAmount, asset_depth: AssetAmount) {
		let depths = PoolDepths { cacao, asset: asset_depth };
		Self::put_storage(DEPTHS, asset.get_layer1_asset(), depths);
	}

	pub fn set_lp_value(owner: Address, value: AssetAmount) {
		Self::put_storage(LP_VALUES, owner, value);
	}

	/// Overrides the total used by liquidity caps. Pools set with [Self::set_pool] don't count.
	pub fn set_total_pooled_cacao(total: AssetAmount) {
		Self::put_value(TOTAL_POOLED, total);
	}

	pub fn set_swaps_should_fail(should_fail: bool) {
		Self::put_value(SHOULD_FAIL, should_fail);
	}

	/// `(from, to, amount)` of every executed swap.
	pub fn swaps() -> Vec<(Asset, Asset, AssetAmount)> {
		Self::get_value(SWAPS).unwrap_or_default()
	}

	fn leg(
		depths: &mut PoolDepths,
		direction: SwapDirection,
		amount: AssetAmount,
	) -> Result<(AssetAmount, AssetAmount), DispatchError> {
		let output = depths.swap(direction, amount).map_err(|_| "Swap failed")?;
		let fee_in_cacao = match direction {
			SwapDirection::CacaoToAsset => depths.asset_to_cacao(output.liquidity_fee),
			SwapDirection::AssetToCacao => output.liquidity_fee,
		};
		Ok((output.emitted, fee_in_cacao))
	}

	fn execute(
		from: &Asset,
		to: &Asset,
		amount: AssetAmount,
		commit: bool,
	) -> Result<SwapResult, DispatchError> {
		if Self::get_value(SHOULD_FAIL).unwrap_or(false) {
			return Err("Swap failed".into())
		}
		let mut result = SwapResult::default();
		let mut amount = amount;
		if !from.is_cacao() {
			let pool = from.get_layer1_asset();
			let mut depths = Self::pool_depths(&pool).ok_or("No pool")?;
			let (emitted, fee) = Self::leg(&mut depths, SwapDirection::AssetToCacao, amount)?;
			if commit {
				Self::put_storage(DEPTHS, &pool, depths);
			}
			result.legs.push((pool, fee));
			result.liquidity_fee_in_cacao += fee;
			amount = emitted;
		}
		if !to.is_cacao() {
			let pool = to.get_layer1_asset();
			let mut depths = Self::pool_depths(&pool).ok_or("No pool")?;
			let (emitted, fee) = Self::leg(&mut depths, SwapDirection::CacaoToAsset, amount)?;
			if commit {
				Self::put_storage(DEPTHS, &pool, depths);
			}
			result.legs.push((pool, fee));
			result.liquidity_fee_in_cacao += fee;
			amount = emitted;
		}
		result.emitted = amount;
		Ok(result)
	}
}

impl PoolApi for MockPoolApi {
	fn pool_depths(asset: &Asset) -> Option<PoolDepths> {
		Self::get_storage(DEPTHS, asset.get_layer1_asset())
	}

	fn is_pool_available(asset: &Asset) -> bool {
		Self::pool_depths(asset).is_some_and(|depths| !depths.is_empty())
	}

	fn synth_supply(_asset: &Asset) -> AssetAmount {
		0
	}

	fn swap(from: &Asset, to: &Asset, amount: AssetAmount) -> Result<SwapResult, DispatchError> {
		let result = Self::execute(from, to, amount, true)?;
		super::push_value::<Self, _>(SWAPS, (from.clone(), to.clone(), amount));
		Ok(result)
	}

	fn quote_swap(
		from: &Asset,
		to: &Asset,
		amount: AssetAmount,
	) -> Result<SwapResult, DispatchError> {
		Self::execute(from, to, amount, false)
	}

	fn take_cacao_from_depth(
		pool_asset: &Asset,
		amount: AssetAmount,
	) -> Result<AssetAmount, DispatchError> {
		Self::mutate_storage::<_, PoolDepths, _>(DEPTHS, &pool_asset.get_layer1_asset(), |depths| {
			let depths = depths.as_mut().ok_or("No pool")?;
			let taken = amount.min(depths.cacao);
			depths.cacao -= taken;
			Ok(taken)
		})
	}

	fn lp_value_in_cacao(owner: &Address) -> AssetAmount {
		Self::get_storage(LP_VALUES, owner).unwrap_or_default()
	}

	fn total_pooled_cacao() -> AssetAmount {
		Self::get_value(TOTAL_POOLED).unwrap_or_default()
	}
}

/// Records liquidity requests and reports a fixed number of units.
pub struct MockLiquidityApi;

impl MockPallet for MockLiquidityApi {
	const PREFIX: &'static [u8] = b"MockLiquidityApi";
}

const ADDS: &[u8] = b"ADDS";
const WITHDRAWALS: &[u8] = b"WITHDRAWALS";
const DONATIONS: &[u8] = b"DONATIONS";
const LIQUIDITY_SHOULD_FAIL: &[u8] = b"SHOULD_FAIL";

impl MockLiquidityApi {
	pub fn set_should_fail(should_fail: bool) {
		Self::put_value(LIQUIDITY_SHOULD_FAIL, should_fail);
	}

	pub fn adds() -> Vec<AddLiquidityRequest> {
		Self::get_value(ADDS).unwrap_or_default()
	}

	pub fn withdrawals() -> Vec<WithdrawLiquidityRequest> {
		Self::get_value(WITHDRAWALS).unwrap_or_default()
	}

	pub fn donations() -> Vec<(Asset, AssetAmount, AssetAmount)> {
		Self::get_value(DONATIONS).unwrap_or_default()
	}

	fn check() -> DispatchResult {
		if Self::get_value(LIQUIDITY_SHOULD_FAIL).unwrap_or(false) {
			return Err("Liquidity operation failed".into())
		}
		Ok(())
	}
}

impl LiquidityApi for MockLiquidityApi {
	fn add_liquidity(request: AddLiquidityRequest) -> Result<AssetAmount, DispatchError> {
		Self::check()?;
		let units = request.cacao_amount + request.asset_amount;
		super::push_value::<Self, _>(ADDS, request);
		Ok(units)
	}

	fn withdraw_liquidity(request: WithdrawLiquidityRequest) -> DispatchResult {
		Self::check()?;
		super::push_value::<Self, _>(WITHDRAWALS, request);
		Ok(())
	}

	fn donate(pool: &Asset, cacao: AssetAmount, asset: AssetAmount) -> DispatchResult {
		Self::check()?;
		super::push_value::<Self, _>(DONATIONS, (pool.clone(), cacao, asset));
		Ok(())
	}
}
