use crate::{mock::*, *};
use frame_support::{assert_noop, assert_ok, traits::Get};
use mc_primitives::ONE_CACAO;
use mc_test_utilities::assert_has_event;
use mc_traits::{mocks::pools::MockPoolApi, Mimir as _, SlashReason, SetSafeMode};
use sp_runtime::DispatchError;

fn btc() -> Asset {
	Chain::Btc.gas_asset()
}

fn eth() -> Asset {
	Chain::Eth.gas_asset()
}

#[test]
fn genesis_config() {
	new_test_ext().execute_with(|| {
		assert_eq!(Environment::get(MimirKey::MaxAffiliateFeeBasisPoints), 500);
		assert_eq!(Environment::active_validators(), VALIDATORS.to_vec());
		assert_eq!(OutboundFees::<Test>::get(Chain::Btc), BTC_FEE);
		assert!(Environment::is_dex_aggregator(b"0xaggregator"));
		assert!(!Environment::is_dex_aggregator(b"0xother"));
		assert_eq!(Environment::protocol_version(), CURRENT_PROTOCOL_VERSION);
	});
}

#[test]
fn mimir_falls_back_to_defaults() {
	new_test_ext().execute_with(|| {
		assert_eq!(
			Environment::get(MimirKey::StreamingSwapMaxFailures),
			MimirKey::StreamingSwapMaxFailures.default_value()
		);
		assert!(!Environment::is_trading_halted(Chain::Btc));

		assert_ok!(Environment::set_mimir(
			RuntimeOrigin::root(),
			MimirKey::HaltChainTrading(Chain::Btc),
			Some(1)
		));
		assert!(Environment::is_trading_halted(Chain::Btc));
		assert!(!Environment::is_trading_halted(Chain::Eth));
		assert_has_event::<Test>(RuntimeEvent::Environment(Event::MimirUpdated {
			key: MimirKey::HaltChainTrading(Chain::Btc),
			value: Some(1),
		}));

		assert_ok!(Environment::set_mimir(
			RuntimeOrigin::root(),
			MimirKey::HaltChainTrading(Chain::Btc),
			None
		));
		assert!(!Environment::is_trading_halted(Chain::Btc));
	});
}

#[test]
fn governance_calls_require_governance() {
	new_test_ext().execute_with(|| {
		assert_noop!(
			Environment::set_mimir(RuntimeOrigin::signed(1), MimirKey::HaltTrading, Some(1)),
			DispatchError::BadOrigin
		);
		assert_noop!(
			Environment::set_outbound_fee(RuntimeOrigin::signed(1), Chain::Btc, 1),
			DispatchError::BadOrigin
		);
		assert_noop!(
			Environment::set_active_validators(RuntimeOrigin::signed(1), vec![]),
			DispatchError::BadOrigin
		);
	});
}

#[test]
fn protocol_version_only_moves_forward() {
	new_test_ext().execute_with(|| {
		let next = ProtocolVersion::new(1, 122, 0);
		assert_ok!(Environment::set_protocol_version(RuntimeOrigin::root(), next));
		assert_eq!(Environment::protocol_version(), next);
		assert_noop!(
			Environment::set_protocol_version(RuntimeOrigin::root(), CURRENT_PROTOCOL_VERSION),
			Error::<Test>::ProtocolVersionDowngrade
		);
	});
}

#[test]
fn behaviour_follows_protocol_version() {
	new_test_ext().execute_with(|| {
		assert!(Environment::behaviour().cacao_pool_withdraw_affiliates);
		CurrentProtocolVersion::<Test>::put(ProtocolVersion::new(1, 118, 3));
		let behaviour = Environment::behaviour();
		assert!(behaviour.affiliate_collector);
		assert!(!behaviour.cacao_pool_withdraw_affiliates);
	});
}

#[test]
fn dex_aggregators_can_be_removed() {
	new_test_ext().execute_with(|| {
		assert_ok!(Environment::set_dex_aggregator(
			RuntimeOrigin::root(),
			"0xaggregator".into(),
			false
		));
		assert!(!Environment::is_dex_aggregator(b"0xaggregator"));
	});
}

#[test]
fn slash_points_are_labelled() {
	new_test_ext().execute_with(|| {
		let labels = SlashLabels { reason: SlashReason::FailedObserveInbound, chain: Chain::Btc };
		Environment::inc_slash_points(&1, 2, labels);
		Environment::dec_slash_points(&1, 1, labels);
		Environment::dec_slash_points(&2, 1, labels);

		assert_eq!(Environment::slash_points(&1), 1);
		assert_eq!(Environment::slash_points(&2), -1);
		assert_has_event::<Test>(RuntimeEvent::Environment(Event::SlashPointsAdjusted {
			validator: 1,
			delta: 2,
			labels,
		}));
	});
}

#[test]
fn outbound_fee_in_gas_asset() {
	new_test_ext().execute_with(|| {
		assert_eq!(Environment::outbound_fee(&btc()), BTC_FEE);
		// No fee configured for ETH.
		assert_eq!(Environment::outbound_fee(&eth()), 0);
	});
}

#[test]
fn outbound_fee_is_converted_through_pools() {
	new_test_ext().execute_with(|| {
		// 1 BTC = 20 CACAO, 1 ETH = 2 CACAO, so 1_000 BTC units of gas cost 10_000 ETH units.
		MockPoolApi::set_pool(btc(), 20 * ONE_CACAO, ONE_CACAO);
		MockPoolApi::set_pool(Asset::new(Chain::Btc, "USDT"), 2 * ONE_CACAO, ONE_CACAO);
		let usdt = Asset::new(Chain::Btc, "USDT");
		assert_eq!(Environment::outbound_fee(&usdt), 10_000);

		// Native outbounds pay the native fee, priced in the asset for synths.
		let fee = Environment::native_transaction_fee();
		assert_eq!(Environment::outbound_fee(&Asset::cacao()), fee);
		assert_eq!(Environment::outbound_fee(&btc().get_synth_asset()), fee / 20);
	});
}

#[test]
fn withheld_fees_are_tracked_per_chain() {
	new_test_ext().execute_with(|| {
		Environment::record_withheld_fee(&Coin::new(btc(), 100));
		Environment::record_withheld_fee(&Coin::new(btc(), 50));
		Environment::record_withheld_fee(&Coin::new(btc().get_trade_asset(), 7));

		assert_eq!(WithheldFees::<Test>::get(Chain::Btc, btc()), 150);
		assert_eq!(WithheldFees::<Test>::get(Chain::Maya, btc().get_trade_asset()), 7);
	});
}

#[test]
fn safe_mode_is_stored_by_the_pallet() {
	new_test_ext().execute_with(|| {
		assert!(<MockRuntimeSafeMode as Get<MockPalletSafeMode>>::get().feature_enabled);

		assert_ok!(Environment::update_safe_mode(
			RuntimeOrigin::root(),
			MockRuntimeSafeMode::CODE_RED
		));
		assert!(!<MockRuntimeSafeMode as Get<MockPalletSafeMode>>::get().feature_enabled);

		<MockRuntimeSafeMode as SetSafeMode<MockPalletSafeMode>>::set_code_green();
		assert_eq!(RuntimeSafeMode::<Test>::get(), MockRuntimeSafeMode::CODE_GREEN);
	});
}
