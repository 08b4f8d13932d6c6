use super::{MockPallet, MockPalletStorage};
use crate::BondHandler;
use frame_support::pallet_prelude::DispatchResult;
use mc_memo::{BondMemo, UnbondMemo};
use mc_primitives::{Address, Coin};

#[derive(Clone, Debug, PartialEq, Eq, codec::Encode, codec::Decode)]
pub enum BondRequest {
	Bond(BondMemo, Coin),
	Unbond(UnbondMemo),
	Leave(Address),
}

pub struct MockBondHandler;

impl MockPallet for MockBondHandler {
	const PREFIX: &'static [u8] = b"MockBondHandler";
}

const REQUESTS: &[u8] = b"REQUESTS";

impl MockBondHandler {
	pub fn requests() -> Vec<BondRequest> {
		Self::get_value(REQUESTS).unwrap_or_default()
	}
}

impl BondHandler for MockBondHandler {
	fn bond(memo: &BondMemo, coin: &Coin, _from: &Address) -> DispatchResult {
		super::push_value::<Self, _>(REQUESTS, BondRequest::Bond(memo.clone(), coin.clone()));
		Ok(())
	}

	fn unbond(memo: &UnbondMemo, _from: &Address) -> DispatchResult {
		super::push_value::<Self, _>(REQUESTS, BondRequest::Unbond(memo.clone()));
		Ok(())
	}

	fn leave(node: &Address, _from: &Address) -> DispatchResult {
		super::push_value::<Self, _>(REQUESTS, BondRequest::Leave(node.clone()));
		Ok(())
	}
}
