use crate::mock_runtime::*;
use mc_primitives::{Address, Chain, Coin, Tx};
use mc_test_utilities::assert_events_match;
use mc_traits::TradeAccountApi;
use pallet_mc_observation::VoterStatus;

const DEPOSIT: u128 = 10_000_000;

#[test]
fn trade_account_round_trip_stays_solvent() {
	ExtBuilder::default().build().execute_with(|| {
		let btc_trade = btc().get_trade_asset();
		let inbound = btc_inbound(tx_id(1), DEPOSIT, "TRADE+:maya10");
		witness_inbound(&inbound, &[ALICE, BOB, CHARLIE]);

		assert_eq!(<TradeAccount as TradeAccountApi>::balance_of(&btc_trade, &FOX), DEPOSIT);
		assert_eq!(TradeAccount::trade_unit(&btc_trade).depth, DEPOSIT);
		assert_eq!(TradeAccount::check_solvency(&btc_trade).collateral, DEPOSIT);
		run_to_block_checking_solvency(3);

		native_deposit(FOX, Coin::new(btc_trade.clone(), DEPOSIT), "TRADE-:bc1qfox");
		let withdrawal_id = assert_events_match!(
			Runtime,
			RuntimeEvent::Observation(pallet_mc_observation::Event::NativeDeposit {
				tx_id,
				..
			}) => tx_id
		);
		assert_eq!(<TradeAccount as TradeAccountApi>::balance_of(&btc_trade, &FOX), 0);
		assert_eq!(cacao_of(FOX), INITIAL_CACAO - NATIVE_FEE);

		let pending = Observation::pending_outbounds();
		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].in_hash, withdrawal_id);
		assert_eq!(pending[0].to_address, Address::from("bc1qfox"));
		assert_eq!(pending[0].coin, Coin::new(btc(), DEPOSIT - BTC_OUTBOUND_FEE));
		run_to_block_checking_solvency(5);

		let outbound = Tx {
			id: tx_id(2),
			chain: Chain::Btc,
			from_address: vault_address(),
			to_address: pending[0].to_address.clone(),
			coins: vec![pending[0].coin.clone()],
			gas: vec![Coin::new(btc(), BTC_GAS)],
			memo: pending[0].memo.clone(),
		};
		witness_outbound(&outbound, &[ALICE, BOB, CHARLIE]);

		assert!(Observation::pending_outbounds().is_empty());
		assert_eq!(Observation::voter(withdrawal_id).unwrap().status, VoterStatus::Done);
		assert_eq!(vault_balance(&btc()), BTC_OUTBOUND_FEE - BTC_GAS);
		run_to_block_checking_solvency(7);
	});
}

#[test]
fn trade_assets_can_only_be_withdrawn_once() {
	ExtBuilder::default().build().execute_with(|| {
		let btc_trade = btc().get_trade_asset();
		witness_inbound(&btc_inbound(tx_id(1), DEPOSIT, "TRADE+:maya10"), &[ALICE, BOB, CHARLIE]);

		native_deposit(FOX, Coin::new(btc_trade.clone(), DEPOSIT), "TRADE-:bc1qfox");
		assert!(Observation::deposit(
			signed(FOX),
			vec![Coin::new(btc_trade, DEPOSIT)],
			b"TRADE-:bc1qfox".to_vec()
		)
		.is_err());

		assert_eq!(Observation::pending_outbounds().len(), 1);
		assert!(TradeAccount::insolvent_assets().is_empty());
	});
}
