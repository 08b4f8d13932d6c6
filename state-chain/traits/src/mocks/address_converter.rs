use crate::AddressConverter;
use mc_primitives::{Address, ModuleName};

/// Account `n` has the address `mayan`. Module addresses are `maya-<module>`.
pub struct MockAddressConverter;

impl MockAddressConverter {
	pub fn address_of(id: u64) -> Address {
		Address::from(format!("maya{id}"))
	}
}

impl AddressConverter for MockAddressConverter {
	type AccountId = u64;

	fn to_account_id(address: &Address) -> Option<u64> {
		core::str::from_utf8(address.as_bytes()).ok()?.strip_prefix("maya")?.parse().ok()
	}

	fn to_address(account_id: &u64) -> Address {
		Self::address_of(*account_id)
	}

	fn module_address(module: ModuleName) -> Address {
		Address::from(format!("maya-{module:?}").to_ascii_lowercase())
	}
}
