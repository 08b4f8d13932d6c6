use crate::mock_runtime::*;
use frame_support::assert_ok;
use mc_primitives::{Chain, Coin, RefundReason, Tx};
use mc_test_utilities::assert_has_matching_event;
use mc_traits::GasManager;
use pallet_mc_observation::VoterStatus;

#[test]
fn inbound_swap_runs_once_a_majority_agrees() {
	ExtBuilder::default().build().execute_with(|| {
		let tx = btc_inbound(tx_id(1), 10_000_000, "=:MAYA.CACAO:maya10");

		witness_inbound(&tx, &[ALICE, BOB]);
		assert!(!Observation::voter(tx.id).unwrap().has_consensus());
		assert_eq!(vault_balance(&btc()), 0);
		assert!(Swapping::queued_swaps().is_empty());

		witness_inbound(&tx, &[CHARLIE]);
		let voter = Observation::voter(tx.id).unwrap();
		assert!(voter.has_consensus() && voter.is_finalised());
		assert_eq!(vault_balance(&btc()), 10_000_000);
		assert_eq!(Swapping::queued_swaps().len(), 1);
		assert_has_matching_event!(
			Runtime,
			RuntimeEvent::Observation(pallet_mc_observation::Event::ObservationFinalised {
				chain: Chain::Btc,
				..
			})
		);

		let before = cacao_of(FOX);
		run_to_block(2);
		assert!(Swapping::queued_swaps().is_empty());
		assert!(cacao_of(FOX) > before);
	});
}

#[test]
fn late_and_repeated_observations_credit_the_vault_once() {
	ExtBuilder::default().build().execute_with(|| {
		let tx = btc_inbound(tx_id(2), 10_000_000, "NOOP");

		witness_inbound(&tx, &[ALICE, BOB, CHARLIE]);
		assert_eq!(vault_balance(&btc()), 10_000_000);

		witness_inbound(&tx, &[DAVE]);
		assert_ok!(Observation::observe_inbound(signed(ALICE), vec![observed(&tx)]));
		assert_eq!(vault_balance(&btc()), 10_000_000);
		assert_eq!(Observation::voter(tx.id).unwrap().status, VoterStatus::Done);

		// Every observation agreed with the outcome, within the grace period.
		for validator in VALIDATORS {
			assert_eq!(Environment::slash_points(&validator), 0);
		}
	});
}

#[test]
fn an_even_split_never_reaches_consensus() {
	ExtBuilder::default().build().execute_with(|| {
		let tx = btc_inbound(tx_id(3), 10_000_000, "NOOP");
		let altered = Tx { coins: vec![Coin::new(btc(), 20_000_000)], ..tx.clone() };

		witness_inbound(&tx, &[ALICE, BOB]);
		witness_inbound(&altered, &[CHARLIE, DAVE]);

		let voter = Observation::voter(tx.id).unwrap();
		assert!(!voter.has_consensus());
		assert_eq!(voter.ballots.len(), 2);
		assert_eq!(vault_balance(&btc()), 0);
		for validator in VALIDATORS {
			assert_eq!(Environment::slash_points(&validator), 1);
		}

		// A signer can't switch sides to break the tie.
		assert_ok!(Observation::observe_inbound(signed(CHARLIE), vec![observed(&tx)]));
		assert!(!Observation::voter(tx.id).unwrap().has_consensus());
	});
}

#[test]
fn self_transfers_leave_the_vault_untouched() {
	ExtBuilder::default().build().execute_with(|| {
		let tx = Tx { from_address: vault_address(), ..btc_inbound(tx_id(4), 5_000_000, "NOOP") };

		witness_inbound(&tx, &[ALICE, BOB, CHARLIE]);

		let voter = Observation::voter(tx.id).unwrap();
		assert!(voter.updated_vault);
		assert_eq!(vault_balance(&btc()), 0);
	});
}

#[test]
fn a_bad_memo_is_refunded_less_the_outbound_fee() {
	ExtBuilder::default().build().execute_with(|| {
		let tx = btc_inbound(tx_id(5), 10_000_000, "=:NOT.A.CHAIN");

		witness_inbound(&tx, &[ALICE, BOB, CHARLIE]);

		assert_has_matching_event!(
			Runtime,
			RuntimeEvent::Observation(pallet_mc_observation::Event::Refunded {
				reason: RefundReason::InvalidMemo,
				..
			})
		);
		let pending = Observation::pending_outbounds();
		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].to_address, sender());
		assert_eq!(pending[0].coin, Coin::new(btc(), 10_000_000 - BTC_OUTBOUND_FEE));
		assert_eq!(Environment::outbound_fee(&btc()), BTC_OUTBOUND_FEE);
		assert_eq!(
			pallet_mc_environment::WithheldFees::<Runtime>::get(Chain::Btc, btc()),
			BTC_OUTBOUND_FEE
		);

		// The refund leaves the vault and the inbound is settled.
		let refund = Tx {
			id: tx_id(6),
			chain: Chain::Btc,
			from_address: vault_address(),
			to_address: sender(),
			coins: vec![pending[0].coin.clone()],
			gas: vec![Coin::new(btc(), BTC_GAS)],
			memo: pending[0].memo.clone(),
		};
		witness_outbound(&refund, &[ALICE, BOB, CHARLIE]);

		assert!(Observation::pending_outbounds().is_empty());
		assert_eq!(Observation::voter(tx.id).unwrap().status, VoterStatus::Done);
		assert_eq!(vault_balance(&btc()), BTC_OUTBOUND_FEE - BTC_GAS);
	});
}
