use super::*;
use mc_primitives::ProtocolVersion;
use proptest::prelude::*;

fn parse(memo: &str) -> Result<Memo, MemoError> {
	memo.parse()
}

fn btc() -> Asset {
	Asset::new(Chain::Btc, "BTC")
}

#[test]
fn tx_type_keywords_and_aliases() {
	for (keyword, tx_type) in [
		("SWAP", TxType::Swap),
		("s", TxType::Swap),
		("=", TxType::Swap),
		("add", TxType::AddLiquidity),
		("+", TxType::AddLiquidity),
		("wd", TxType::WithdrawLiquidity),
		("-", TxType::WithdrawLiquidity),
		("pool+", TxType::CacaoPoolDeposit),
		("POOL-", TxType::CacaoPoolWithdraw),
		("trade+", TxType::TradeAccountDeposit),
		("TRADE-", TxType::TradeAccountWithdrawal),
		("d", TxType::Donate),
		("n", TxType::ManageName),
		("~", TxType::ManageName),
	] {
		assert_eq!(TxType::from_keyword(keyword), Some(tx_type), "{keyword}");
	}
	assert_eq!(TxType::from_keyword("YOLO"), None);
}

#[test]
fn empty_and_unknown_memos_are_rejected() {
	assert_eq!(parse(""), Err(MemoError::Empty));
	assert_eq!(parse("   "), Err(MemoError::Empty));
	assert_eq!(parse("|hello"), Err(MemoError::Empty));
	assert_eq!(parse("YOLO:BTC.BTC"), Err(MemoError::UnknownTxType("YOLO".into())));
}

#[test]
fn parses_simple_swap() {
	let Memo::Swap(swap) = parse("=:BTC.BTC:bc1qdest").unwrap() else { panic!("not a swap") };
	assert_eq!(swap, SwapMemo::new(btc(), Address::from("bc1qdest")));
	assert!(!swap.is_streaming());
}

#[test]
fn parses_streaming_swap_with_refund_and_affiliates() {
	let memo = "SWAP:ETH.ETH:0xdest/0xrefund:1e6/3/0:aff1/aff2:10/20|ignored";
	let Memo::Swap(swap) = parse(memo).unwrap() else { panic!("not a swap") };

	assert_eq!(swap.target, Asset::new(Chain::Eth, "ETH"));
	assert_eq!(swap.destination, Address::from("0xdest"));
	assert_eq!(swap.refund_address, Some(Address::from("0xrefund")));
	assert_eq!(swap.trade_target, 1_000_000);
	assert_eq!(swap.stream_interval, 3);
	assert_eq!(swap.stream_quantity, 0);
	assert!(swap.is_streaming());
	assert_eq!(
		swap.affiliates,
		vec![
			Affiliate { name: b"aff1".to_vec(), bps: Some(10) },
			Affiliate { name: b"aff2".to_vec(), bps: Some(20) },
		]
	);
}

#[test]
fn empty_streaming_slots_default_to_zero() {
	let Memo::Swap(swap) = parse("=:BTC.BTC:dest://5").unwrap() else { panic!("not a swap") };
	assert_eq!((swap.trade_target, swap.stream_interval, swap.stream_quantity), (0, 0, 5));
	assert!(!swap.is_streaming());
}

#[test]
fn single_affiliate_fee_applies_to_all() {
	let Memo::Swap(swap) = parse("=:BTC.BTC:dest::a/b/c:15").unwrap() else { panic!() };
	assert!(swap.affiliates.iter().all(|a| a.bps == Some(15)));
	assert_eq!(swap.affiliates.len(), 3);

	let Memo::Swap(swap) = parse("=:BTC.BTC:dest::a/b").unwrap() else { panic!() };
	assert!(swap.affiliates.iter().all(|a| a.bps.is_none()));
}

#[test]
fn affiliate_fee_count_mismatch_fails() {
	let err = parse("=:BTC.BTC:dest::a/b/c:10/20").unwrap_err();
	assert!(matches!(
		err,
		MemoError::ParseFailures { ref failures, .. }
			if failures == &[FieldFailure::Constraint(
				"affiliate and affiliate basis points count mismatch"
			)]
	));
}

#[test]
fn parse_failures_are_aggregated() {
	let err = parse("=:DOGE.DOGE:dest:abc").unwrap_err();
	let MemoError::ParseFailures { failures, .. } = &err else { panic!("unexpected error") };
	assert_eq!(failures.len(), 2);
	assert_eq!(
		err.to_string(),
		"MEMO: =:DOGE.DOGE:dest:abc\nPARSE FAILURE(S): \
		 invalid asset: DOGE.DOGE-invalid swap limit: abc"
	);
}

#[test]
fn scientific_notation_depends_on_behaviour() {
	assert_eq!(parse_amount("1e6", true), Some(1_000_000));
	assert_eq!(parse_amount("1.5e3", true), Some(1_500));
	assert_eq!(parse_amount("1.2345e2", true), Some(123));
	assert_eq!(parse_amount("1.9", true), Some(1));
	assert_eq!(parse_amount("0e99999", true), Some(0));
	assert_eq!(parse_amount("1e39", true), None);
	assert_eq!(parse_amount("1e6", false), None);
	assert_eq!(parse_amount("1.5", false), None);
	assert_eq!(parse_amount("-5", true), None);
	assert_eq!(parse_amount("42", false), Some(42));

	let legacy = behaviour_for(ProtocolVersion::new(1, 110, 0));
	assert!(parse_memo("=:BTC.BTC:dest:1e6", &legacy).is_err());
	assert!(parse_memo("=:BTC.BTC:dest:1000000", &legacy).is_ok());
}

#[test]
fn memo_suffix_handling_depends_on_behaviour() {
	let ancient = behaviour_for(ProtocolVersion::new(1, 0, 0));
	assert!(parse_memo("=:BTC.BTC|extra:dest", &ancient).is_err());
	let Memo::Swap(swap) = parse("=:BTC.BTC|extra:dest").unwrap() else { panic!() };
	assert!(swap.destination.is_empty());
}

#[test]
fn parses_dex_aggregation() {
	let Memo::Swap(swap) = parse("=:ETH.ETH:0xdest:0:::agg1:0xtarget:5e2").unwrap() else {
		panic!()
	};
	assert_eq!(
		swap.dex_aggregation,
		Some(DexAggregation {
			aggregator: b"agg1".to_vec(),
			target_address: Address::from("0xtarget"),
			target_limit: Some(500),
		})
	);

	assert!(parse("=:ETH.ETH:0xdest:0:::agg1").is_err());
}

#[test]
fn canonical_swap_memo_truncates_trailing_fields() {
	let mut swap = SwapMemo::new(btc(), Address::from("dest"));
	assert_eq!(swap.to_string(), "=:BTC.BTC:dest");

	swap.trade_target = 100;
	assert_eq!(swap.to_string(), "=:BTC.BTC:dest:100");

	swap.stream_interval = 1;
	swap.stream_quantity = 10;
	swap.affiliates = vec![Affiliate { name: b"aff".to_vec(), bps: Some(25) }];
	assert_eq!(swap.to_string(), "=:BTC.BTC:dest:100/1/10:aff:25");

	swap.refund_address = Some(Address::from("refund"));
	assert_eq!(parse(&swap.to_string()).unwrap(), Memo::Swap(swap));
}

#[test]
fn parses_liquidity_memos() {
	assert_eq!(
		parse("+:BTC.BTC:mayapair").unwrap(),
		Memo::AddLiquidity(AddLiquidityMemo {
			asset: btc(),
			pair_address: Some(Address::from("mayapair")),
			affiliate: None,
		})
	);
	assert_eq!(
		parse("-:BTC.BTC").unwrap(),
		Memo::WithdrawLiquidity(WithdrawLiquidityMemo {
			asset: btc(),
			basis_points: MAX_BASIS_POINTS,
			withdrawal_asset: None,
		})
	);
	assert_eq!(
		parse("wd:BTC.BTC:2500:MAYA.CACAO").unwrap(),
		Memo::WithdrawLiquidity(WithdrawLiquidityMemo {
			asset: btc(),
			basis_points: 2_500,
			withdrawal_asset: Some(Asset::cacao()),
		})
	);
	assert!(parse("-:BTC.BTC:10001").is_err());
	assert!(parse("-:BTC.BTC:0").is_err());
}

#[test]
fn parses_cacao_pool_memos() {
	assert_eq!(parse("pool+").unwrap(), Memo::CacaoPoolDeposit);
	assert_eq!(
		parse("POOL-:5000:a/b:3000/4000").unwrap(),
		Memo::CacaoPoolWithdraw(CacaoPoolWithdrawMemo {
			basis_points: 5_000,
			affiliates: vec![
				Affiliate { name: b"a".to_vec(), bps: Some(3_000) },
				Affiliate { name: b"b".to_vec(), bps: Some(4_000) },
			],
		})
	);
	assert!(parse("pool-").is_err());
	assert!(parse("pool-:5000:a/b:6000/5000").is_err());
}

#[test]
fn parses_trade_account_memos() {
	assert_eq!(
		parse("trade+:maya1owner").unwrap(),
		Memo::TradeAccountDeposit { owner: Address::from("maya1owner") }
	);
	assert_eq!(
		parse("TRADE-:bc1qdest").unwrap(),
		Memo::TradeAccountWithdrawal { address: Address::from("bc1qdest") }
	);
	assert!(parse("trade+").is_err());
	assert!(parse("trade-:").is_err());
}

#[test]
fn parses_internal_memos() {
	let hash = "B29AB9EBDB421CE48B70699758A6E9A3DBD609C5B29AB9EBDB421CE48B706997";
	let in_hash = TxId::from(mc_utilities::clean_hex_hash(hash).unwrap());

	let out = parse(&alloc::format!("OUT:{hash}")).unwrap();
	assert_eq!(out, Memo::Outbound { in_hash });
	assert!(out.is_internal());
	assert!(!out.has_outbound());

	assert_eq!(parse(&alloc::format!("refund:0x{hash}")).unwrap(), Memo::Refund { in_hash });
	assert_eq!(parse("MIGRATE:100").unwrap(), Memo::Migrate { height: 100 });
	assert_eq!(parse("ragnarok:7").unwrap(), Memo::Ragnarok { height: 7 });
	assert!(parse("OUT:nothex").is_err());
}

#[test]
fn parses_node_memos() {
	assert_eq!(
		parse("BOND:maya1node:maya1provider:200").unwrap(),
		Memo::Bond(BondMemo {
			node: Address::from("maya1node"),
			provider: Some(Address::from("maya1provider")),
			operator_fee: Some(200),
		})
	);
	assert_eq!(
		parse("UNBOND:maya1node:1000").unwrap(),
		Memo::Unbond(UnbondMemo { node: Address::from("maya1node"), amount: 1_000, provider: None })
	);
	assert_eq!(parse("leave:maya1node").unwrap(), Memo::Leave { node: Address::from("maya1node") });
	assert!(parse("UNBOND:maya1node").is_err());
}

#[test]
fn parses_misc_memos() {
	assert_eq!(parse("DONATE:BTC.BTC").unwrap(), Memo::Donate { asset: btc() });
	assert_eq!(parse("reserve").unwrap(), Memo::Reserve);
	assert_eq!(parse("noop").unwrap(), Memo::NoOp);
}

#[test]
fn parses_name_memos() {
	let memo = "~:Alice:BTC:bc1qalice:maya1alice:BTC.BTC:1000:50:bob/carol:4000/3000";
	assert_eq!(
		parse(memo).unwrap(),
		Memo::ManageName(ManageNameMemo {
			name: b"alice".to_vec(),
			alias: Some((Chain::Btc, Address::from("bc1qalice"))),
			owner: Some(Address::from("maya1alice")),
			preferred_asset: Some(btc()),
			expire_block_height: Some(1_000),
			affiliate_bps: Some(50),
			subaffiliates: vec![
				SubAffiliate { name: b"bob".to_vec(), bps: 4_000 },
				SubAffiliate { name: b"carol".to_vec(), bps: 3_000 },
			],
		})
	);

	// chain without address
	assert!(parse("~:alice:BTC").is_err());
	// sub-affiliates over 100%
	assert!(parse("~:alice:::::::bob/carol:6000/5000").is_err());
	// name too long
	assert!(parse("~:abcdefghijklmnopqrstuvwxyz12345").is_err());
}

#[test]
fn internal_memos_parse_back() {
	let in_hash = TxId::repeat_byte(0xab);
	let out = String::from_utf8(outbound_memo(&in_hash)).unwrap();
	assert!(out.starts_with("OUT:abab"));
	assert_eq!(parse(&out), Ok(Memo::Outbound { in_hash }));
	let refund = String::from_utf8(refund_memo(&in_hash)).unwrap();
	assert_eq!(parse(&refund), Ok(Memo::Refund { in_hash }));
}

proptest! {
	#[test]
	fn parser_never_panics(memo in "\\PC{0,80}") {
		let _ = parse(&memo);
	}

	#[test]
	fn parser_never_panics_on_structured_input(
		keyword in prop::sample::select(vec!["=", "+", "-", "pool-", "trade+", "~", "OUT", "BOND"]),
		fields in prop::collection::vec("[A-Za-z0-9./~+-]{0,12}", 0..10),
	) {
		let memo = alloc::format!("{keyword}:{}", fields.join(":"));
		let _ = parse(&memo);
	}
}
