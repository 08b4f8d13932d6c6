use crate::{mock::*, *};
use frame_support::{assert_noop, assert_ok};
use mc_primitives::Chain;
use mc_test_utilities::assert_has_event;

const ASGARD: LedgerAccount<u64> = LedgerAccount::Module(ModuleName::Asgard);

fn synth() -> Asset {
	Chain::Btc.gas_asset().get_synth_asset()
}

#[test]
fn genesis_balances() {
	new_test_ext().execute_with(|| {
		assert_eq!(AssetBalances::balance(&LedgerAccount::Account(ALICE), &Asset::cacao()), 1_000);
		assert_eq!(AssetBalances::module_balance(ModuleName::Asgard, &Asset::cacao()), 1_000);
		assert_eq!(AssetBalances::total_supply(&Asset::cacao()), 2_000);
	});
}

#[test]
fn mint_and_burn_track_supply() {
	new_test_ext().execute_with(|| {
		assert_ok!(AssetBalances::mint(&ASGARD, &synth(), 500));
		assert_eq!(AssetBalances::total_supply(&synth()), 500);
		assert_has_event::<Test>(RuntimeEvent::AssetBalances(Event::Minted {
			to: ASGARD,
			asset: synth(),
			amount: 500,
		}));

		assert_ok!(AssetBalances::burn(&ASGARD, &synth(), 200));
		assert_eq!(AssetBalances::balance(&ASGARD, &synth()), 300);
		assert_eq!(AssetBalances::total_supply(&synth()), 300);

		assert_noop!(
			AssetBalances::burn(&ASGARD, &synth(), 301),
			Error::<Test>::InsufficientBalance
		);
	});
}

#[test]
fn internal_transfers_move_balances() {
	new_test_ext().execute_with(|| {
		let alice = LedgerAccount::Account(ALICE);
		assert_ok!(<AssetBalances as Ledger>::transfer(&alice, &ASGARD, &Asset::cacao(), 400));
		assert_eq!(AssetBalances::balance(&alice, &Asset::cacao()), 600);
		assert_eq!(AssetBalances::balance(&ASGARD, &Asset::cacao()), 1_400);
		assert_eq!(AssetBalances::total_supply(&Asset::cacao()), 2_000);

		assert_noop!(
			<AssetBalances as Ledger>::transfer(&alice, &ASGARD, &Asset::cacao(), 601),
			Error::<Test>::InsufficientBalance
		);
	});
}

#[test]
fn emptied_balances_are_removed() {
	new_test_ext().execute_with(|| {
		let alice = LedgerAccount::Account(ALICE);
		assert_ok!(<AssetBalances as Ledger>::transfer(
			&alice,
			&LedgerAccount::Account(BOB),
			&Asset::cacao(),
			INITIAL_BALANCE
		));
		assert!(!Balances::<Test>::contains_key(&alice, Asset::cacao()));
		assert_eq!(AssetBalances::balances_of(&LedgerAccount::Account(BOB)), vec![(
			Asset::cacao(),
			INITIAL_BALANCE
		)]);
	});
}

#[test]
fn signed_transfer() {
	new_test_ext().execute_with(|| {
		assert_ok!(AssetBalances::transfer(
			RuntimeOrigin::signed(ALICE),
			BOB,
			Coin::cacao(250)
		));
		assert_eq!(AssetBalances::balance(&LedgerAccount::Account(BOB), &Asset::cacao()), 250);
		assert_has_event::<Test>(RuntimeEvent::AssetBalances(Event::Transferred {
			from: LedgerAccount::Account(ALICE),
			to: LedgerAccount::Account(BOB),
			asset: Asset::cacao(),
			amount: 250,
		}));

		assert_noop!(
			AssetBalances::transfer(
				RuntimeOrigin::signed(ALICE),
				BOB,
				Coin::new(Chain::Btc.gas_asset().get_trade_asset(), 1)
			),
			Error::<Test>::AssetNotTransferable
		);
		assert_noop!(
			AssetBalances::transfer(RuntimeOrigin::signed(BOB), ALICE, Coin::cacao(251)),
			Error::<Test>::InsufficientBalance
		);
	});
}
