use super::*;
use proptest::prelude::*;

#[test]
fn swap_output_and_fee() {
	let output = calculate_swap(100, 1_000, 1_000).unwrap();
	// 100 * 1000 * 1000 / 1100^2
	assert_eq!(output.emitted, 82);
	// 100^2 * 1000 / 1100^2
	assert_eq!(output.liquidity_fee, 8);
	assert_eq!(output.slip_bps, 909);
}

#[test]
fn swap_rejects_empty_pool_and_zero_input() {
	assert_eq!(calculate_swap(0, 1_000, 1_000), Err(AmmError::ZeroInput));
	assert_eq!(calculate_swap(10, 0, 1_000), Err(AmmError::EmptyPool));
	assert_eq!(calculate_swap(10, 1_000, 0), Err(AmmError::EmptyPool));
}

#[test]
fn swap_moves_depths() {
	let mut depths = PoolDepths { cacao: 1_000_000, asset: 2_000_000 };
	let quote = depths.quote(SwapDirection::CacaoToAsset, 10_000).unwrap();
	let output = depths.swap(SwapDirection::CacaoToAsset, 10_000).unwrap();
	assert_eq!(quote, output);
	assert_eq!(depths.cacao, 1_010_000);
	assert_eq!(depths.asset, 2_000_000 - output.emitted);

	let back = depths.swap(SwapDirection::AssetToCacao, output.emitted).unwrap();
	assert!(back.emitted < 10_000);
}

#[test]
fn spot_value_conversion() {
	let depths = PoolDepths { cacao: 3_000, asset: 1_000 };
	assert_eq!(depths.asset_to_cacao(10), 30);
	assert_eq!(depths.cacao_to_asset(30), 10);
	assert_eq!(PoolDepths::default().asset_to_cacao(10), 0);
}

#[test]
fn first_deposit_needs_both_sides() {
	assert_eq!(
		calculate_liquidity_units(0, PoolDepths::default(), 100, 0),
		Err(AmmError::FirstDepositMustBeBothSides)
	);
	assert_eq!(calculate_liquidity_units(0, PoolDepths::default(), 100, 50), Ok(100));
}

#[test]
fn symmetric_deposit_gets_proportional_units() {
	let depths = PoolDepths { cacao: 1_000, asset: 500 };
	assert_eq!(calculate_liquidity_units(1_000, depths, 100, 50), Ok(100));
}

#[test]
fn asymmetric_deposit_is_penalised() {
	let depths = PoolDepths { cacao: 1_000, asset: 1_000 };
	let units = calculate_liquidity_units(1_000, depths, 200, 0).unwrap();
	// Without slip this would be 100 units.
	assert!(units < 100);
	assert!(units > 0);
}

#[test]
fn dust_deposit_gets_no_units() {
	let depths = PoolDepths { cacao: 1_000_000_000, asset: 1_000_000_000 };
	assert_eq!(calculate_liquidity_units(1, depths, 1, 0), Err(AmmError::ZeroUnits));
}

#[test]
fn withdrawal_is_proportional() {
	let depths = PoolDepths { cacao: 1_000, asset: 400 };
	assert_eq!(calculate_withdrawal(250, 1_000, depths), (250, 100));
	assert_eq!(calculate_withdrawal(1_000, 1_000, depths), (1_000, 400));
	assert_eq!(calculate_withdrawal(10, 0, depths), (0, 0));
}

#[test]
fn synth_cap() {
	// 1500 bps of 2 * 1000 is 300.
	assert!(!synth_supply_exceeds_cap(300, 1_000, 1_500));
	assert!(synth_supply_exceeds_cap(302, 1_000, 1_500));
	assert!(synth_supply_exceeds_cap(1, 0, 1_500));
	assert!(!synth_supply_exceeds_cap(0, 0, 1_500));
}

#[test]
fn safe_share() {
	assert_eq!(get_safe_share(1, 3, 100), 33);
	assert_eq!(get_safe_share(1, 0, 100), 0);
	assert_eq!(bps_share(500, 1_000), 50);
	assert_eq!(mul_div_floor(u128::MAX, 2, 2), Some(u128::MAX));
	assert_eq!(mul_div_floor(u128::MAX, 2, 1), None);
}

#[test]
fn streaming_quantity() {
	// Slice size floor of 5 bps of 1_000_000 is 500.
	assert_eq!(max_streaming_quantity(10_000, 1_000_000, 5, false), 20);
	// The whole swap slips 99 bps, so 19 slices of at least 5 bps.
	assert_eq!(max_streaming_quantity(10_000, 1_000_000, 5, true), 19);
	assert_eq!(max_streaming_quantity(1, 1_000_000, 5, true), 1);
	assert_eq!(max_streaming_quantity(10_000, 0, 5, false), 1);
}

proptest! {
	#[test]
	fn swap_never_drains_pool(
		x in 1u128..u64::MAX as u128,
		input_depth in 1u128..u64::MAX as u128,
		output_depth in 1u128..u64::MAX as u128,
	) {
		let output = calculate_swap(x, input_depth, output_depth).unwrap();
		prop_assert!(output.emitted < output_depth);
		prop_assert!(output.emitted + output.liquidity_fee <= output_depth);
		prop_assert!(output.slip_bps <= MAX_BASIS_POINTS);
	}
}
