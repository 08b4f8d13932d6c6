use super::{MockPallet, MockPalletStorage};
use crate::{NameRegistry, ResolvedName};
use frame_support::pallet_prelude::DispatchResult;
use mc_memo::ManageNameMemo;
use mc_primitives::{Address, Chain};

pub struct MockNameRegistry;

impl MockPallet for MockNameRegistry {
	const PREFIX: &'static [u8] = b"MockNameRegistry";
}

const NAMES: &[u8] = b"NAMES";
const ALIASES: &[u8] = b"ALIASES";
const MANAGED: &[u8] = b"MANAGED";

impl MockNameRegistry {
	pub fn register(name: ResolvedName<u64>) {
		Self::put_storage(NAMES, name.name.clone(), name);
	}

	pub fn set_alias(name: &[u8], chain: Chain, address: Address) {
		Self::put_storage(ALIASES, (name, chain), address);
	}

	/// `(signer, memo)` for every management request.
	pub fn managed() -> Vec<(u64, ManageNameMemo)> {
		Self::get_value(MANAGED).unwrap_or_default()
	}
}

impl NameRegistry for MockNameRegistry {
	type AccountId = u64;

	fn resolve(name: &[u8]) -> Option<ResolvedName<u64>> {
		Self::get_storage(NAMES, name)
	}

	fn alias(name: &[u8], chain: Chain) -> Option<Address> {
		Self::get_storage(ALIASES, (name, chain))
	}

	fn manage_name(signer: &u64, memo: &ManageNameMemo) -> DispatchResult {
		super::push_value::<Self, _>(MANAGED, (*signer, memo.clone()));
		Ok(())
	}
}
