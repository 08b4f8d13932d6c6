use crate::{mock::*, *};
use frame_support::{assert_noop, assert_ok};
use mc_amm::calculate_swap;
use mc_primitives::Chain;
use mc_test_utilities::assert_has_event;
use mc_traits::mocks::{
	address_converter::MockAddressConverter, ledger::MockLedger, mimir::MockMimir,
	tx_out_store::MockTxOutStore,
};
use sp_core::H256;
use sp_runtime::DispatchError;

const TX_ID: H256 = H256::repeat_byte(0x11);
const DASH_CACAO: AssetAmount = 1_000_000;
const DASH_ASSET: AssetAmount = 500_000;

fn dash() -> Asset {
	Chain::Dash.gas_asset()
}

fn alice() -> Address {
	MockAddressConverter::address_of(ALICE)
}

fn dash_address() -> Address {
	"Xalice".into()
}

fn add_request(cacao_amount: AssetAmount, asset_amount: AssetAmount) -> AddLiquidityRequest {
	AddLiquidityRequest {
		tx_id: TX_ID,
		pool: dash(),
		cacao_amount,
		asset_amount,
		cacao_address: Some(alice()),
		asset_address: Some(dash_address()),
	}
}

fn withdraw_request(
	basis_points: u16,
	withdrawal_asset: Option<Asset>,
) -> WithdrawLiquidityRequest {
	WithdrawLiquidityRequest {
		tx_id: TX_ID,
		pool: dash(),
		owner: alice(),
		basis_points,
		withdrawal_asset,
	}
}

fn seed_dash_pool() {
	assert_eq!(LiquidityPools::add_liquidity(add_request(DASH_CACAO, DASH_ASSET)), Ok(DASH_CACAO));
	MockLedger::set_balance(
		LedgerAccount::Module(ModuleName::Asgard),
		Asset::cacao(),
		DASH_CACAO + BTC_POOL_CACAO + ETH_POOL_CACAO,
	);
}

#[test]
fn first_deposit_creates_pool() {
	new_test_ext().execute_with(|| {
		assert!(LiquidityPools::pool(&dash()).is_none());
		seed_dash_pool();

		let pool = LiquidityPools::pool(&dash()).unwrap();
		assert_eq!(pool.depths, PoolDepths { cacao: DASH_CACAO, asset: DASH_ASSET });
		assert_eq!(pool.pool_units, DASH_CACAO);
		assert_eq!(pool.status, PoolStatus::Available);

		let lp = LiquidityPools::liquidity_provider(&dash(), &alice()).unwrap();
		assert_eq!(lp.units, DASH_CACAO);
		assert_eq!(lp.asset_address, Some(dash_address()));
		assert_eq!(lp.last_add_height, 1);
		assert_has_event::<Test>(RuntimeEvent::LiquidityPools(Event::LiquidityAdded {
			tx_id: TX_ID,
			pool: dash(),
			owner: alice(),
			cacao_amount: DASH_CACAO,
			asset_amount: DASH_ASSET,
			units: DASH_CACAO,
		}));
	});
}

#[test]
fn symmetric_add_gets_proportional_units() {
	new_test_ext().execute_with(|| {
		seed_dash_pool();
		assert_eq!(
			LiquidityPools::add_liquidity(AddLiquidityRequest {
				cacao_address: Some(MockAddressConverter::address_of(6)),
				asset_address: None,
				..add_request(DASH_CACAO / 2, DASH_ASSET / 2)
			}),
			Ok(DASH_CACAO / 2)
		);
		assert_eq!(LiquidityPools::pool(&dash()).unwrap().pool_units, DASH_CACAO * 3 / 2);
	});
}

#[test]
fn asymmetric_add_is_penalised_by_slip() {
	new_test_ext().execute_with(|| {
		seed_dash_pool();
		let units = LiquidityPools::add_liquidity(AddLiquidityRequest {
			asset_address: None,
			..add_request(DASH_CACAO, 0)
		})
		.unwrap();
		assert!(units > 0 && units < DASH_CACAO / 2);
	});
}

#[test]
fn invalid_adds_are_rejected() {
	new_test_ext().execute_with(|| {
		assert_noop!(
			LiquidityPools::add_liquidity(add_request(DASH_CACAO, 0)),
			Error::<Test>::FirstDepositMustBeBothSides
		);
		assert_noop!(
			LiquidityPools::add_liquidity(AddLiquidityRequest {
				pool: dash().get_synth_asset(),
				..add_request(1, 1)
			}),
			Error::<Test>::InvalidPoolAsset
		);
		assert_noop!(
			LiquidityPools::add_liquidity(AddLiquidityRequest {
				pool: Asset::cacao(),
				..add_request(1, 1)
			}),
			Error::<Test>::InvalidPoolAsset
		);
		assert_noop!(
			LiquidityPools::add_liquidity(AddLiquidityRequest {
				cacao_address: None,
				asset_address: None,
				..add_request(1, 1)
			}),
			Error::<Test>::MissingAddress
		);

		assert_ok!(LiquidityPools::set_pool_status(
			RuntimeOrigin::root(),
			btc(),
			PoolStatus::Suspended
		));
		assert_noop!(
			LiquidityPools::add_liquidity(AddLiquidityRequest {
				pool: btc(),
				..add_request(10, 1)
			}),
			Error::<Test>::PoolNotAvailable
		);
	});
}

#[test]
fn liquidity_caps() {
	new_test_ext().execute_with(|| {
		let pooled = BTC_POOL_CACAO + ETH_POOL_CACAO;
		assert_eq!(LiquidityPools::total_pooled_cacao(), pooled);

		MockMimir::set(MimirKey::MaximumLiquidityCacao, (pooled + DASH_CACAO) as i64);
		assert_noop!(
			LiquidityPools::add_liquidity(add_request(DASH_CACAO + 1, DASH_ASSET)),
			Error::<Test>::LiquidityCapReached
		);

		MockMimir::enable(MimirKey::EnsureLiquidityNoLargerThanBond);
		MockMimir::set(MimirKey::TotalEffectiveBond, (2 * pooled + DASH_CACAO) as i64);
		assert_noop!(
			LiquidityPools::add_liquidity(add_request(DASH_CACAO, DASH_ASSET)),
			Error::<Test>::LiquidityExceedsBond
		);
		assert_ok!(LiquidityPools::add_liquidity(add_request(DASH_CACAO / 2, DASH_ASSET)));
	});
}

#[test]
fn partial_withdrawal_pays_both_sides() {
	new_test_ext().execute_with(|| {
		seed_dash_pool();
		System::set_block_number(5);

		assert_ok!(LiquidityPools::withdraw_liquidity(withdraw_request(5_000, None)));

		assert_eq!(
			MockLedger::balance(&LedgerAccount::Account(ALICE), &Asset::cacao()),
			DASH_CACAO / 2
		);
		let scheduled = MockTxOutStore::scheduled();
		assert_eq!(scheduled.len(), 1);
		assert_eq!(scheduled[0].to_address, dash_address());
		assert_eq!(scheduled[0].coin, Coin::new(dash(), DASH_ASSET / 2));
		assert_eq!(scheduled[0].memo, outbound_memo(&TX_ID));

		let lp = LiquidityPools::liquidity_provider(&dash(), &alice()).unwrap();
		assert_eq!(lp.units, DASH_CACAO / 2);
		assert_eq!(lp.cacao_deposit_value, DASH_CACAO / 2);
		assert_eq!(lp.last_withdraw_height, 5);

		let pool = LiquidityPools::pool(&dash()).unwrap();
		assert_eq!(pool.depths, PoolDepths { cacao: DASH_CACAO / 2, asset: DASH_ASSET / 2 });
		assert_eq!(pool.pool_units, DASH_CACAO / 2);
	});
}

#[test]
fn full_withdrawal_removes_position() {
	new_test_ext().execute_with(|| {
		seed_dash_pool();
		assert_ok!(LiquidityPools::withdraw_liquidity(withdraw_request(MAX_BASIS_POINTS, None)));
		assert!(LiquidityPools::liquidity_provider(&dash(), &alice()).is_none());
		assert_eq!(LiquidityPools::pool(&dash()).unwrap().pool_units, 0);
		assert_noop!(
			LiquidityPools::withdraw_liquidity(withdraw_request(MAX_BASIS_POINTS, None)),
			Error::<Test>::NoLiquidityPosition
		);
	});
}

#[test]
fn withdrawal_asset_swaps_other_side() {
	new_test_ext().execute_with(|| {
		seed_dash_pool();
		assert_ok!(LiquidityPools::withdraw_liquidity(withdraw_request(
			5_000,
			Some(Asset::cacao())
		)));

		assert!(MockTxOutStore::scheduled().is_empty());
		let remaining = PoolDepths { cacao: DASH_CACAO / 2, asset: DASH_ASSET / 2 };
		let swapped = calculate_swap(DASH_ASSET / 2, remaining.asset, remaining.cacao).unwrap();
		assert_eq!(
			MockLedger::balance(&LedgerAccount::Account(ALICE), &Asset::cacao()),
			DASH_CACAO / 2 + swapped.emitted
		);
		assert_eq!(LiquidityPools::pool(&dash()).unwrap().depths.asset, DASH_ASSET);

		assert_noop!(
			LiquidityPools::withdraw_liquidity(withdraw_request(5_000, Some(btc()))),
			Error::<Test>::InvalidWithdrawalAsset
		);
	});
}

#[test]
fn invalid_withdrawals_are_rejected() {
	new_test_ext().execute_with(|| {
		seed_dash_pool();
		for bps in [0, MAX_BASIS_POINTS + 1] {
			assert_noop!(
				LiquidityPools::withdraw_liquidity(withdraw_request(bps, None)),
				Error::<Test>::InvalidBasisPoints
			);
		}
		assert_noop!(
			LiquidityPools::withdraw_liquidity(WithdrawLiquidityRequest {
				owner: MockAddressConverter::address_of(99),
				..withdraw_request(MAX_BASIS_POINTS, None)
			}),
			Error::<Test>::NoLiquidityPosition
		);
	});
}

#[test]
fn single_and_double_swaps() {
	new_test_ext().execute_with(|| {
		let first = calculate_swap(10_000, BTC_POOL_CACAO, BTC_POOL_ASSET).unwrap();
		let result = LiquidityPools::swap(&Asset::cacao(), &btc(), 10_000).unwrap();
		assert_eq!(result.emitted, first.emitted);
		assert_eq!(result.legs.len(), 1);
		assert_eq!(
			LiquidityPools::pool_depths(&btc()),
			Some(PoolDepths {
				cacao: BTC_POOL_CACAO + 10_000,
				asset: BTC_POOL_ASSET - first.emitted
			})
		);

		let btc_depths = LiquidityPools::pool_depths(&btc()).unwrap();
		let to_cacao = calculate_swap(1_000, btc_depths.asset, btc_depths.cacao).unwrap();
		let to_eth = calculate_swap(to_cacao.emitted, ETH_POOL_CACAO, ETH_POOL_ASSET).unwrap();
		let result = LiquidityPools::swap(&btc(), &eth(), 1_000).unwrap();
		assert_eq!(result.emitted, to_eth.emitted);
		assert_eq!(result.legs.iter().map(|(pool, _)| pool.clone()).collect::<Vec<_>>(), vec![
			btc(),
			eth()
		]);
		assert_eq!(result.slip_bps, to_cacao.slip_bps + to_eth.slip_bps);
		assert!(result.liquidity_fee_in_cacao > 0);
	});
}

#[test]
fn quotes_do_not_change_state() {
	new_test_ext().execute_with(|| {
		let quote = LiquidityPools::quote_swap(&btc(), &eth(), 5_000).unwrap();
		assert_eq!(LiquidityPools::pool_depths(&btc()).unwrap().asset, BTC_POOL_ASSET);
		assert_eq!(LiquidityPools::pool_depths(&eth()).unwrap().cacao, ETH_POOL_CACAO);
		assert_eq!(LiquidityPools::swap(&btc(), &eth(), 5_000), Ok(quote));
	});
}

#[test]
fn synth_swaps_mint_and_burn() {
	new_test_ext().execute_with(|| {
		let synth = btc().get_synth_asset();
		let asgard = LedgerAccount::Module(ModuleName::Asgard);

		let minted = LiquidityPools::swap(&Asset::cacao(), &synth, 10_000).unwrap().emitted;
		assert_eq!(MockLedger::balance(&asgard, &synth), minted);
		assert_eq!(LiquidityPools::synth_supply(&btc()), minted);
		assert_eq!(
			LiquidityPools::pool_depths(&btc()),
			Some(PoolDepths { cacao: BTC_POOL_CACAO + 10_000, asset: BTC_POOL_ASSET })
		);

		let cacao_out = LiquidityPools::swap(&synth, &Asset::cacao(), minted).unwrap().emitted;
		assert_eq!(MockLedger::balance(&asgard, &synth), 0);
		assert_eq!(LiquidityPools::synth_supply(&btc()), 0);
		assert_eq!(
			LiquidityPools::pool_depths(&btc()),
			Some(PoolDepths { cacao: BTC_POOL_CACAO + 10_000 - cacao_out, asset: BTC_POOL_ASSET })
		);
	});
}

#[test]
fn failed_double_swap_leaves_no_trace() {
	new_test_ext().execute_with(|| {
		let result = LiquidityPools::swap(&btc(), &dash(), 1_000);
		assert_eq!(result, Err(DispatchError::from(Error::<Test>::PoolDoesNotExist)));
		assert_eq!(LiquidityPools::pool_depths(&btc()).unwrap().asset, BTC_POOL_ASSET);
	});
}

#[test]
fn only_available_pools_swap() {
	new_test_ext().execute_with(|| {
		assert!(LiquidityPools::is_pool_available(&btc()));
		assert_ok!(LiquidityPools::set_pool_status(
			RuntimeOrigin::root(),
			btc(),
			PoolStatus::Staged
		));
		assert!(!LiquidityPools::is_pool_available(&btc()));
		assert!(!LiquidityPools::is_pool_available(&btc().get_trade_asset()));
		assert_noop!(
			LiquidityPools::swap(&Asset::cacao(), &btc(), 1_000),
			Error::<Test>::PoolNotAvailable
		);
		assert_has_event::<Test>(RuntimeEvent::LiquidityPools(Event::PoolStatusUpdated {
			pool: btc(),
			status: PoolStatus::Staged,
		}));
	});
}

#[test]
fn pool_status_requires_governance() {
	new_test_ext().execute_with(|| {
		assert_noop!(
			LiquidityPools::set_pool_status(
				RuntimeOrigin::signed(ALICE),
				btc(),
				PoolStatus::Staged
			),
			sp_runtime::traits::BadOrigin
		);
		assert_noop!(
			LiquidityPools::set_pool_status(RuntimeOrigin::root(), dash(), PoolStatus::Staged),
			Error::<Test>::PoolDoesNotExist
		);
	});
}

#[test]
fn cacao_can_be_taken_from_depth() {
	new_test_ext().execute_with(|| {
		assert_eq!(LiquidityPools::take_cacao_from_depth(&btc(), 1_000), Ok(1_000));
		assert_eq!(
			LiquidityPools::take_cacao_from_depth(&btc().get_synth_asset(), BTC_POOL_CACAO),
			Ok(BTC_POOL_CACAO - 1_000)
		);
		assert_eq!(LiquidityPools::pool_depths(&btc()).unwrap().cacao, 0);
		assert_eq!(LiquidityPools::pool(&btc()).unwrap().pool_units, BTC_POOL_CACAO);
	});
}

#[test]
fn lp_value_and_donations() {
	new_test_ext().execute_with(|| {
		seed_dash_pool();
		// Symmetric position at a price of 2 CACAO per DASH.
		assert_eq!(LiquidityPools::lp_value_in_cacao(&alice()), 2 * DASH_CACAO);
		assert_eq!(LiquidityPools::lp_value_in_cacao(&dash_address()), 0);

		assert_ok!(LiquidityPools::donate(&dash(), DASH_CACAO, DASH_ASSET));
		assert_eq!(LiquidityPools::pool(&dash()).unwrap().pool_units, DASH_CACAO);
		assert_eq!(LiquidityPools::lp_value_in_cacao(&alice()), 4 * DASH_CACAO);
		assert_noop!(
			LiquidityPools::donate(&Chain::Zec.gas_asset(), 1, 1),
			Error::<Test>::PoolDoesNotExist
		);
	});
}
