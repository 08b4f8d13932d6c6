use crate::{mock::*, *};
use frame_support::{assert_noop, assert_ok};
use mc_primitives::Chain;
use mc_test_utilities::assert_has_event;
use mc_traits::{
	mocks::{
		gas_manager::MockGasManager, mimir::MockMimir, tx_out_store::MockTxOutStore,
		vault_ledger::MockVaultLedger,
	},
	SetSafeMode,
};
use sp_core::H256;

const TX_ID: H256 = H256::repeat_byte(0x33);

fn deposit(asset: Asset, amount: AssetAmount, owner: u64) {
	assert_ok!(TradeAccountPallet::deposit(&asset, amount, &owner, TX_ID));
}

#[test]
fn deposits_credit_the_trade_asset() {
	new_test_ext_enabled().execute_with(|| {
		deposit(btc(), 350, FOX);

		assert_eq!(TradeAccountPallet::balance_of(&btc(), &FOX), 350);
		assert_eq!(TradeAccountPallet::balance_of(&btc().get_trade_asset(), &FOX), 350);
		assert_eq!(
			TradeAccountPallet::trade_unit(&btc()),
			TradeUnit { asset: btc().get_trade_asset(), units: 350, depth: 350 }
		);
		assert_has_event::<Test>(RuntimeEvent::TradeAccountPallet(
			Event::TradeAccountDeposited {
				owner: FOX,
				asset: btc().get_trade_asset(),
				amount: 350,
				tx_id: TX_ID,
			},
		));

		// Swap outputs arrive as the trade asset.
		deposit(btc().get_trade_asset(), 150, FOX);
		assert_eq!(TradeAccountPallet::balance_of(&btc(), &FOX), 500);
		assert_eq!(TradeAccountPallet::trade_unit(&btc()).depth, 500);
	});
}

#[test]
fn withdrawals_schedule_the_layer1_asset() {
	new_test_ext_enabled().execute_with(|| {
		deposit(btc(), 500, FOX);
		assert_eq!(
			TradeAccountPallet::withdrawal(
				&btc().get_trade_asset(),
				350,
				&FOX,
				&fox_btc_address(),
				TX_ID
			),
			Ok(350)
		);

		assert_eq!(TradeAccountPallet::balance_of(&btc(), &FOX), 150);
		let scheduled = MockTxOutStore::scheduled();
		assert_eq!(scheduled.len(), 1);
		assert_eq!(scheduled[0].coin, Coin::new(btc(), 350));
		assert_eq!(scheduled[0].chain, Chain::Btc);
		assert_eq!(scheduled[0].to_address, fox_btc_address());
		assert_has_event::<Test>(RuntimeEvent::TradeAccountPallet(
			Event::TradeAccountWithdrawn {
				owner: FOX,
				asset: btc().get_trade_asset(),
				amount: 350,
				destination: fox_btc_address(),
				tx_id: TX_ID,
			},
		));
	});
}

#[test]
fn full_round_trip_delivers_the_deposit_less_the_outbound_fee() {
	new_test_ext_enabled().execute_with(|| {
		MockGasManager::set_outbound_fee(btc(), 10);
		deposit(btc(), 1_000, FOX);

		assert_eq!(
			TradeAccountPallet::withdrawal(
				&btc(),
				AssetAmount::MAX,
				&FOX,
				&fox_btc_address(),
				TX_ID
			),
			Ok(1_000)
		);
		assert_eq!(MockTxOutStore::scheduled()[0].coin.amount, 990);
		assert_eq!(TradeAccountPallet::balance_of(&btc(), &FOX), 0);
		assert!(TradeAccountPallet::trade_account(&btc(), &FOX).is_none());
		assert_eq!(TradeAccountPallet::trade_unit(&btc()).depth, 0);
	});
}

#[test]
fn failed_outbound_leaves_the_balance() {
	new_test_ext_enabled().execute_with(|| {
		deposit(btc(), 1_000, FOX);
		MockTxOutStore::set_should_fail(true);
		assert_noop!(
			TradeAccountPallet::withdrawal(&btc(), 1_000, &FOX, &fox_btc_address(), TX_ID),
			DispatchError::Other("Outbound failed")
		);
	});
}

#[test]
fn nothing_to_withdraw() {
	new_test_ext_enabled().execute_with(|| {
		assert_noop!(
			TradeAccountPallet::withdrawal(&btc(), 1_000, &FOX, &fox_btc_address(), TX_ID),
			Error::<Test>::NothingToWithdraw
		);
		deposit(btc(), 1_000, CAT);
		assert_noop!(
			TradeAccountPallet::withdrawal(&btc(), 1_000, &FOX, &fox_btc_address(), TX_ID),
			Error::<Test>::NothingToWithdraw
		);
	});
}

#[test]
fn configuration_flags_gate_deposits_and_withdrawals() {
	new_test_ext().execute_with(|| {
		assert_noop!(
			TradeAccountPallet::deposit(&btc(), 100, &FOX, TX_ID),
			Error::<Test>::TradeAccountsDisabled
		);

		MockMimir::enable(MimirKey::TradeAccountsEnabled);
		MockMimir::disable(MimirKey::TradeAccountsDepositEnabled);
		assert_noop!(
			TradeAccountPallet::deposit(&btc(), 100, &FOX, TX_ID),
			Error::<Test>::DepositsDisabled
		);

		MockMimir::enable(MimirKey::TradeAccountsDepositEnabled);
		deposit(btc(), 100, FOX);
		MockMimir::disable(MimirKey::TradeAccountsWithdrawEnabled);
		assert_noop!(
			TradeAccountPallet::withdrawal(&btc(), 100, &FOX, &fox_btc_address(), TX_ID),
			Error::<Test>::WithdrawalsDisabled
		);
	});
}

#[test]
fn safe_mode_gates_deposits_and_withdrawals() {
	new_test_ext_enabled().execute_with(|| {
		deposit(btc(), 100, FOX);
		<MockRuntimeSafeMode as SetSafeMode<PalletSafeMode>>::set_code_red();
		assert_noop!(
			TradeAccountPallet::deposit(&btc(), 100, &FOX, TX_ID),
			Error::<Test>::DepositsDisabled
		);
		assert_noop!(
			TradeAccountPallet::withdrawal(&btc(), 100, &FOX, &fox_btc_address(), TX_ID),
			Error::<Test>::WithdrawalsDisabled
		);
	});
}

#[test]
fn only_external_layer1_assets_can_be_held() {
	new_test_ext_enabled().execute_with(|| {
		for asset in [Asset::cacao(), btc().get_synth_asset()] {
			assert_noop!(
				TradeAccountPallet::deposit(&asset, 100, &FOX, TX_ID),
				Error::<Test>::InvalidTradeAsset
			);
		}
		assert_noop!(
			TradeAccountPallet::deposit(&btc(), 0, &FOX, TX_ID),
			Error::<Test>::ZeroAmount
		);
	});
}

#[test]
fn debits_spend_the_balance_without_an_outbound() {
	new_test_ext_enabled().execute_with(|| {
		deposit(eth(), 300, FOX);
		assert_ok!(TradeAccountPallet::debit(&eth().get_trade_asset(), 100, &FOX));
		assert_eq!(TradeAccountPallet::balance_of(&eth(), &FOX), 200);
		assert_eq!(TradeAccountPallet::trade_unit(&eth()).depth, 200);
		assert!(MockTxOutStore::scheduled().is_empty());

		assert_noop!(
			TradeAccountPallet::debit(&eth(), 201, &FOX),
			Error::<Test>::InsufficientTradeBalance
		);
		assert_noop!(
			TradeAccountPallet::debit(&eth(), 1, &CAT),
			Error::<Test>::InsufficientTradeBalance
		);
	});
}

#[test]
fn queries_list_accounts_by_owner_and_by_asset() {
	new_test_ext_enabled().execute_with(|| {
		deposit(btc(), 100, FOX);
		deposit(eth(), 200, FOX);
		deposit(btc(), 300, CAT);

		let mut fox_assets = TradeAccountPallet::trade_accounts(&FOX)
			.into_iter()
			.map(|account| (account.asset, account.balance))
			.collect::<Vec<_>>();
		fox_assets.sort();
		let mut expected =
			vec![(btc().get_trade_asset(), 100), (eth().get_trade_asset(), 200)];
		expected.sort();
		assert_eq!(fox_assets, expected);

		let mut btc_holders = TradeAccountPallet::trade_asset_holders(&btc())
			.into_iter()
			.map(|account| (account.owner, account.units))
			.collect::<Vec<_>>();
		btc_holders.sort();
		assert_eq!(btc_holders, vec![(FOX, 100), (CAT, 300)]);

		run_to_block(5);
		deposit(btc(), 1, FOX);
		let fox_btc = TradeAccountPallet::trade_account(&btc(), &FOX).expect("account exists");
		assert_eq!((fox_btc.balance, fox_btc.last_add_height), (101, 5));
	});
}

#[test]
fn solvency_compares_depth_with_vault_collateral() {
	new_test_ext_enabled().execute_with(|| {
		MockVaultLedger::set_vault_balance(btc(), 1_000);
		deposit(btc(), 1_000, FOX);
		assert!(TradeAccountPallet::check_solvency(&btc()).is_solvent());
		assert!(TradeAccountPallet::insolvent_assets().is_empty());

		deposit(btc(), 1, CAT);
		assert_eq!(
			TradeAccountPallet::insolvent_assets(),
			vec![Solvency { asset: btc().get_trade_asset(), depth: 1_001, collateral: 1_000 }]
		);
	});
}
