use crate::mock_runtime::*;
use frame_support::assert_noop;
use mc_primitives::Address;
use mc_test_utilities::assert_has_matching_event;
use mc_traits::SwapApi;

#[test]
fn streaming_swap_runs_one_slice_per_interval() {
	ExtBuilder::default().build().execute_with(|| {
		const DEPOSIT: u128 = 10_000_000;
		let tx = btc_inbound(tx_id(1), DEPOSIT, "=:MAYA.CACAO:maya10:0/1/3");
		witness_inbound(&tx, &[ALICE, BOB, CHARLIE]);
		let request = Swapping::queued_swaps()[0].2.request.clone();
		let before = cacao_of(FOX);

		run_to_block(2);
		let stream = Swapping::streaming_swap(tx.id).unwrap();
		assert_eq!((stream.quantity, stream.count), (3, 1));
		assert_eq!(stream.interval, 1);
		assert_eq!(cacao_of(FOX), before);

		run_to_block(4);
		let stream = Swapping::streaming_swap(tx.id).unwrap();
		assert_eq!(stream.count, 3);
		assert_eq!(stream.in_amount, DEPOSIT);
		assert!(Swapping::queued_swaps().is_empty());
		assert_eq!(cacao_of(FOX), before + stream.out_amount);
		assert_has_matching_event!(
			Runtime,
			RuntimeEvent::Swapping(pallet_mc_swapping::Event::StreamingSwapCompleted {
				in_amount: DEPOSIT,
				..
			})
		);

		// The same inbound can't stream twice.
		assert_noop!(
			<Swapping as SwapApi>::schedule_swap(request),
			pallet_mc_swapping::Error::<Runtime>::StreamingSwapCompleted
		);
	});
}

#[test]
fn a_non_pool_asset_is_swapped_then_added() {
	ExtBuilder::default().build().execute_with(|| {
		let pool_cacao = LiquidityPools::pool(&btc()).unwrap().depths.cacao;
		let tx = eth_inbound(tx_id(2), 10_000_000, "+:BTC.BTC");
		witness_inbound(&tx, &[ALICE, BOB, CHARLIE]);
		run_to_block(2);

		let lp = LiquidityPools::liquidity_provider(&btc(), &Address::from("0xsender")).unwrap();
		assert!(lp.units > 0);
		assert!(lp.cacao_deposit_value > 0);
		assert_eq!(
			LiquidityPools::pool(&btc()).unwrap().depths.cacao,
			pool_cacao + lp.cacao_deposit_value
		);
		assert_eq!(vault_balance(&eth()), 10_000_000);
	});
}
