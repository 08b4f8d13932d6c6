use super::{MockPallet, MockPalletStorage};
use crate::{SwapApi, SwapRequest};
use frame_support::pallet_prelude::DispatchResult;

pub struct MockSwapApi;

impl MockPallet for MockSwapApi {
	const PREFIX: &'static [u8] = b"MockSwapApi";
}

const REQUESTS: &[u8] = b"REQUESTS";
const SHOULD_FAIL: &[u8] = b"SHOULD_FAIL";

impl MockSwapApi {
	pub fn requests() -> Vec<SwapRequest> {
		Self::get_value(REQUESTS).unwrap_or_default()
	}

	pub fn set_should_fail(should_fail: bool) {
		Self::put_value(SHOULD_FAIL, should_fail);
	}
}

impl SwapApi for MockSwapApi {
	fn schedule_swap(request: SwapRequest) -> DispatchResult {
		if Self::get_value(SHOULD_FAIL).unwrap_or(false) {
			return Err("Swap rejected".into())
		}
		super::push_value::<Self, _>(REQUESTS, request);
		Ok(())
	}
}
