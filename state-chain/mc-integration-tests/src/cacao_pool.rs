use crate::mock_runtime::*;
use mc_primitives::{Asset, AssetAmount, Coin, LedgerAccount, MimirKey, ModuleName};
use mc_test_utilities::assert_events_match;
use mc_traits::Ledger;

const A_OWNER: AccountId = 20;
const B_OWNER: AccountId = 21;
const C_OWNER: AccountId = 22;

fn units_of(who: AccountId) -> AssetAmount {
	CacaoPool::cacao_provider(&who).map_or(0, |provider| provider.units)
}

/// Pool income that is not from deposits, e.g. swap fees.
fn add_yield(amount: AssetAmount) {
	frame_support::assert_ok!(<AssetBalances as Ledger>::mint(
		&LedgerAccount::Module(ModuleName::CacaoPool),
		&Asset::cacao(),
		amount,
	));
}

#[test]
fn deposit_and_withdraw_in_steps() {
	ExtBuilder::default().build().execute_with(|| {
		native_deposit(FOX, Coin::cacao(1_000), "POOL+");
		assert_eq!(units_of(FOX), 1_000);
		assert_eq!(cacao_of(FOX), INITIAL_CACAO - 1_000 - NATIVE_FEE);

		native_deposit(FOX, Coin::cacao(0), "POOL-:5000");
		assert_eq!(units_of(FOX), 500);

		native_deposit(FOX, Coin::cacao(0), "POOL-:10000");
		assert_eq!(units_of(FOX), 0);
		assert_eq!(cacao_of(FOX), INITIAL_CACAO - 3 * NATIVE_FEE);
		let reserve = LedgerAccount::Module(ModuleName::Reserve);
		assert_eq!(<AssetBalances as Ledger>::balance(&reserve, &Asset::cacao()), 3 * NATIVE_FEE);
	});
}

#[test]
fn providers_share_yield_by_units() {
	ExtBuilder::default().build().execute_with(|| {
		native_deposit(FOX, Coin::cacao(1_000), "POOL+");
		native_deposit(CAT, Coin::cacao(1_000), "POOL+");
		add_yield(495_000);

		for who in [FOX, CAT] {
			let provider = CacaoPool::cacao_provider(&who).unwrap();
			assert_eq!(provider.units, 1_000);
			assert_eq!(provider.value, 248_500);
			assert_eq!(provider.pnl, 247_500);
		}

		native_deposit(CAT, Coin::cacao(0), "POOL-:10000");
		assert_eq!(cacao_of(CAT), INITIAL_CACAO - 2 * NATIVE_FEE + 247_500);
		assert_eq!(CacaoPool::cacao_provider(&FOX).unwrap().value, 248_500);
	});
}

#[test]
fn withdrawal_pays_nested_affiliates_out_of_the_yield() {
	ExtBuilder::default()
		.funded(&[A_OWNER, B_OWNER, C_OWNER])
		.build()
		.execute_with(|| {
			native_deposit(C_OWNER, Coin::cacao(0), "~:c");
			native_deposit(B_OWNER, Coin::cacao(0), "~:b:::::::c:4000");
			native_deposit(A_OWNER, Coin::cacao(0), "~:a");
			let before = [A_OWNER, B_OWNER, C_OWNER].map(cacao_of);

			native_deposit(FOX, Coin::cacao(1_000), "POOL+");
			add_yield(248_000);
			let fox_before = cacao_of(FOX);

			native_deposit(FOX, Coin::cacao(0), "POOL-:10000:a/b:3000/4000");

			// 30% of the yield to `a`, 40% to `b`, of which `b` passes 40% on to `c`.
			let after = [A_OWNER, B_OWNER, C_OWNER].map(cacao_of);
			assert_eq!(after[0] - before[0], 74_400);
			assert_eq!(after[1] - before[1], 59_520);
			assert_eq!(after[2] - before[2], 39_680);
			assert_eq!(cacao_of(FOX), fox_before - NATIVE_FEE + 75_400);

			let withdrawn = assert_events_match!(
				Runtime,
				RuntimeEvent::CacaoPool(pallet_mc_cacao_pool::Event::CacaoPoolWithdrawn {
					amount,
					affiliate_amount,
					..
				}) => (amount, affiliate_amount)
			);
			assert_eq!(withdrawn, (249_000, 173_600));
		});
}

#[test]
fn swap_fees_accrue_to_providers() {
	ExtBuilder::default()
		.mimir(MimirKey::CacaoPoolRewardsEnabled, 1)
		.build()
		.execute_with(|| {
			native_deposit(FOX, Coin::cacao(1_000), "POOL+");
			let pool_cacao = LiquidityPools::pool(&btc()).unwrap().depths.cacao;

			let tx = btc_inbound(tx_id(1), 10_000_000, "=:MAYA.CACAO:maya11");
			witness_inbound(&tx, &[ALICE, BOB, CHARLIE]);
			run_to_block(2);

			let accrued = assert_events_match!(
				Runtime,
				RuntimeEvent::CacaoPool(pallet_mc_cacao_pool::Event::SwapFeeAccrued {
					amount,
					..
				}) => amount
			);
			assert!(accrued > 0);
			assert_eq!(CacaoPool::cacao_provider(&FOX).unwrap().value, 1_000 + accrued);

			let emitted = assert_events_match!(
				Runtime,
				RuntimeEvent::Swapping(pallet_mc_swapping::Event::SwapExecuted {
					emitted,
					..
				}) => emitted
			);
			assert_eq!(
				LiquidityPools::pool(&btc()).unwrap().depths.cacao,
				pool_cacao - emitted - accrued
			);
		});
}
