use crate::{mock::*, *};
use frame_support::{assert_noop, assert_ok};
use mc_primitives::{Chain, ProtocolVersion};
use mc_test_utilities::assert_has_event;
use mc_traits::{
	mocks::{
		address_converter::MockAddressConverter, affiliate_fees::MockAffiliateFeeApi,
		ledger::MockLedger, mimir::MockMimir, pools::MockPoolApi,
	},
	AddressConverter, Ledger, PoolApi, SetSafeMode,
};
use sp_core::H256;
use sp_runtime::DispatchError;

const TX_ID: H256 = H256::repeat_byte(0x22);

fn cacao_of(owner: u64) -> AssetAmount {
	MockLedger::balance(&LedgerAccount::Account(owner), &Asset::cacao())
}

fn pool_balance() -> AssetAmount {
	MockLedger::module_balance(ModuleName::CacaoPool, &Asset::cacao())
}

/// Simulates swap-fee yield landing in the pool module.
fn add_yield(amount: AssetAmount) {
	MockLedger::set_balance(
		LedgerAccount::Module(ModuleName::CacaoPool),
		Asset::cacao(),
		pool_balance() + amount,
	);
}

fn provider(owner: u64) -> CacaoProviderSummary {
	CacaoPoolPallet::cacao_provider(&owner).expect("provider exists")
}

fn affiliate(name: &str, bps: BasisPoints) -> Affiliate {
	Affiliate { name: name.as_bytes().to_vec(), bps: Some(bps) }
}

#[test]
fn deposits_and_withdrawals_do_not_move_unit_price() {
	new_test_ext_enabled().execute_with(|| {
		assert_ok!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID));
		let fox = provider(FOX);
		assert_eq!((fox.units, fox.value, fox.deposit_amount), (1000, 1000, 1000));
		assert_eq!(pool_balance(), 1000);
		assert_has_event::<Test>(RuntimeEvent::CacaoPoolPallet(Event::CacaoPoolDeposited {
			owner: FOX,
			tx_id: TX_ID,
			amount: 1000,
			units: 1000,
		}));

		assert_ok!(CacaoPoolPallet::withdraw(&FOX, 5_000, &[], TX_ID));
		let fox = provider(FOX);
		assert_eq!((fox.units, fox.value, fox.withdraw_amount, fox.pnl), (500, 500, 500, 0));
		assert_eq!(cacao_of(FOX), 500);

		assert_ok!(CacaoPoolPallet::withdraw(&FOX, 10_000, &[], TX_ID));
		let fox = provider(FOX);
		assert_eq!((fox.units, fox.value, fox.withdraw_amount), (0, 0, 1000));
		assert_eq!(cacao_of(FOX), 1000);
		assert_eq!(CacaoPoolState::<Test>::get(), CacaoPool {
			reserve_units: 0,
			pool_units: 0,
			cacao_deposited: 1000,
			cacao_withdrawn: 1000,
		});
	});
}

#[test]
fn later_deposits_buy_units_at_the_current_price() {
	new_test_ext_enabled().execute_with(|| {
		assert_ok!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID));
		add_yield(1000);
		assert_ok!(CacaoPoolPallet::deposit(&CAT, 1000, TX_ID));

		assert_eq!(provider(CAT).units, 500);
		assert_eq!(provider(CAT).value, 1000);
		assert_eq!(provider(FOX).value, 2000);
		assert_eq!(provider(FOX).pnl, 1000);
	});
}

#[test]
fn yield_is_split_by_units_held_at_accrual() {
	new_test_ext_enabled().execute_with(|| {
		assert_ok!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID));
		assert_ok!(CacaoPoolPallet::deposit(&CAT, 1000, TX_ID));
		add_yield(495_000);

		assert_eq!(provider(FOX).value, 248_500);
		assert_eq!(provider(CAT).value, 248_500);
		let summary = CacaoPoolPallet::cacao_pool_summary();
		assert_eq!(summary.providers.value, 497_000);
		assert_eq!(summary.providers.current_deposit, 2000);
		assert_eq!(summary.providers.pnl, 495_000);
		assert_eq!(CacaoPoolPallet::cacao_providers().len(), 2);
	});
}

#[test]
fn affiliates_share_only_in_yield() {
	new_test_ext_enabled().execute_with(|| {
		let affiliates = [affiliate("a", 3_000), affiliate("b", 4_000)];

		assert_ok!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID));
		assert_ok!(CacaoPoolPallet::withdraw(&FOX, 5_000, &affiliates, TX_ID));
		assert!(MockAffiliateFeeApi::payouts().is_empty());
		assert_eq!(cacao_of(FOX), 500);

		add_yield(500);
		assert_ok!(CacaoPoolPallet::withdraw(&FOX, 10_000, &affiliates, TX_ID));
		assert_eq!(
			MockAffiliateFeeApi::payouts()
				.into_iter()
				.map(|(_, share)| share.amount)
				.collect::<Vec<_>>(),
			vec![150, 200]
		);
		assert_eq!(cacao_of(FOX), 500 + 1000 - 350);
		assert_eq!(pool_balance(), 0);
		assert_has_event::<Test>(RuntimeEvent::CacaoPoolPallet(Event::CacaoPoolWithdrawn {
			owner: FOX,
			tx_id: TX_ID,
			basis_points: 10_000,
			units: 500,
			amount: 1000,
			affiliate_amount: 350,
		}));
	});
}

#[test]
fn affiliates_are_ignored_before_they_were_supported() {
	new_test_ext_enabled().execute_with(|| {
		MockMimir::set_protocol_version(ProtocolVersion::new(1, 118, 0));
		assert_ok!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID));
		add_yield(1000);
		assert_ok!(CacaoPoolPallet::withdraw(&FOX, 10_000, &[affiliate("a", 5_000)], TX_ID));
		assert!(MockAffiliateFeeApi::payouts().is_empty());
		assert_eq!(cacao_of(FOX), 2000);
	});
}

#[test]
fn withdrawals_wait_for_maturity() {
	new_test_ext_enabled().execute_with(|| {
		MockMimir::set(MimirKey::CacaoPoolDepositMaturityBlocks, 10);
		assert_ok!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID));
		assert_noop!(
			CacaoPoolPallet::withdraw(&FOX, 10_000, &[], TX_ID),
			Error::<Test>::DepositNotMature
		);
		run_to_block(11);
		assert_ok!(CacaoPoolPallet::withdraw(&FOX, 10_000, &[], TX_ID));
		assert_eq!(provider(FOX).last_withdraw_height, 11);
	});
}

#[test]
fn invalid_requests_are_rejected() {
	new_test_ext_enabled().execute_with(|| {
		assert_noop!(CacaoPoolPallet::deposit(&FOX, 0, TX_ID), Error::<Test>::ZeroAmount);
		assert_noop!(
			CacaoPoolPallet::withdraw(&FOX, 10_000, &[], TX_ID),
			Error::<Test>::NoCacaoProvider
		);
		assert_ok!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID));
		for bps in [0, 10_001] {
			assert_noop!(
				CacaoPoolPallet::withdraw(&FOX, bps, &[], TX_ID),
				Error::<Test>::InvalidBasisPoints
			);
		}
		assert_noop!(
			CacaoPoolPallet::deposit(&CAT, ASGARD_CACAO, TX_ID),
			DispatchError::Other("Insufficient balance")
		);

		MockMimir::disable(MimirKey::CacaoPoolEnabled);
		assert_noop!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID), Error::<Test>::CacaoPoolDisabled);
		assert_noop!(
			CacaoPoolPallet::withdraw(&FOX, 10_000, &[], TX_ID),
			Error::<Test>::CacaoPoolDisabled
		);
	});
}

#[test]
fn safe_mode_blocks_deposits_and_withdrawals() {
	new_test_ext_enabled().execute_with(|| {
		assert_ok!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID));
		<MockRuntimeSafeMode as SetSafeMode<PalletSafeMode>>::set_safe_mode(PalletSafeMode {
			deposits_enabled: false,
			withdrawals_enabled: true,
		});
		assert_noop!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID), Error::<Test>::DepositsDisabled);
		assert_ok!(CacaoPoolPallet::withdraw(&FOX, 5_000, &[], TX_ID));

		<MockRuntimeSafeMode as SetSafeMode<PalletSafeMode>>::set_code_red();
		assert_noop!(
			CacaoPoolPallet::withdraw(&FOX, 5_000, &[], TX_ID),
			Error::<Test>::WithdrawalsDisabled
		);
	});
}

#[test]
fn liquidity_positions_count_towards_value_but_cannot_be_withdrawn() {
	new_test_ext_enabled().execute_with(|| {
		assert_ok!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID));
		let pool_address = MockAddressConverter::module_address(ModuleName::CacaoPool);
		MockPoolApi::set_lp_value(pool_address, 1000);

		assert_eq!(CacaoPoolPallet::cacao_pool_summary().pol, 1000);
		assert_eq!(provider(FOX).value, 2000);
		assert_noop!(
			CacaoPoolPallet::withdraw(&FOX, 10_000, &[], TX_ID),
			Error::<Test>::InsufficientPoolBalance
		);
		assert_ok!(CacaoPoolPallet::withdraw(&FOX, 5_000, &[], TX_ID));
		assert_eq!(cacao_of(FOX), 1000);
	});
}

#[test]
fn swap_fee_share_moves_from_pool_depth() {
	new_test_ext_enabled().execute_with(|| {
		MockPoolApi::set_pool(btc(), 1_000_000, 1_000);
		assert_eq!(CacaoPoolPallet::accrue_swap_fee(&btc(), 10_000), 0);

		MockMimir::enable(MimirKey::CacaoPoolRewardsEnabled);
		assert_eq!(CacaoPoolPallet::accrue_swap_fee(&btc(), 10_000), 500);
		assert_eq!(MockPoolApi::pool_depths(&btc()).unwrap().cacao, 999_500);
		assert_eq!(pool_balance(), 500);
		assert_eq!(
			MockLedger::module_balance(ModuleName::Asgard, &Asset::cacao()),
			ASGARD_CACAO - 500
		);
		assert_has_event::<Test>(RuntimeEvent::CacaoPoolPallet(Event::SwapFeeAccrued {
			pool: btc(),
			amount: 500,
		}));

		// Without a pool nothing is taken and nothing moves.
		let eth = Chain::Eth.gas_asset();
		assert_eq!(CacaoPoolPallet::accrue_swap_fee(&eth, 10_000), 0);
		assert_eq!(pool_balance(), 500);
	});
}

#[test]
fn reserve_enters_up_to_the_backstop() {
	new_test_ext_enabled().execute_with(|| {
		assert_ok!(CacaoPoolPallet::deposit(&FOX, 1000, TX_ID));
		assert_noop!(
			CacaoPoolPallet::reserve_enter(RuntimeOrigin::signed(FOX), 1000),
			DispatchError::BadOrigin
		);
		assert_noop!(
			CacaoPoolPallet::reserve_enter(RuntimeOrigin::root(), 1000),
			Error::<Test>::ReserveBackstopExceeded
		);

		MockMimir::set(MimirKey::CacaoPoolMaxReserveBackstop, 1000);
		assert_ok!(CacaoPoolPallet::reserve_enter(RuntimeOrigin::root(), 1000));
		assert_eq!(
			MockLedger::module_balance(ModuleName::Reserve, &Asset::cacao()),
			RESERVE_CACAO - 1000
		);
		assert_noop!(
			CacaoPoolPallet::reserve_enter(RuntimeOrigin::root(), 1),
			Error::<Test>::ReserveBackstopExceeded
		);

		let summary = CacaoPoolPallet::cacao_pool_summary();
		assert_eq!(summary.reserve, PositionSummary { units: 1000, value: 1000 });
		assert_eq!(summary.providers.value, 1000);

		assert_ok!(CacaoPoolPallet::reserve_exit(RuntimeOrigin::root(), 5_000));
		assert_has_event::<Test>(RuntimeEvent::CacaoPoolPallet(Event::ReserveExited {
			amount: 500,
			units: 500,
		}));
		assert_eq!(
			CacaoPoolPallet::cacao_pool_summary().reserve,
			PositionSummary { units: 500, value: 500 }
		);
		assert_eq!(provider(FOX).value, 1000);
	});
}
