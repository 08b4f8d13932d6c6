use super::{MockPallet, MockPalletStorage};
use crate::Mimir;
use mc_primitives::{MimirKey, ProtocolVersion, CURRENT_PROTOCOL_VERSION};

pub struct MockMimir;

impl MockPallet for MockMimir {
	const PREFIX: &'static [u8] = b"MockMimir";
}

const VALUES: &[u8] = b"VALUES";
const VERSION: &[u8] = b"VERSION";
const AGGREGATORS: &[u8] = b"AGGREGATORS";

impl MockMimir {
	pub fn set(key: MimirKey, value: i64) {
		Self::put_storage(VALUES, key, value);
	}

	pub fn enable(key: MimirKey) {
		Self::set(key, 1);
	}

	pub fn disable(key: MimirKey) {
		Self::set(key, 0);
	}

	pub fn set_protocol_version(version: ProtocolVersion) {
		Self::put_value(VERSION, version);
	}

	pub fn add_dex_aggregator(address: &[u8]) {
		Self::put_storage(AGGREGATORS, address, ());
	}
}

impl Mimir for MockMimir {
	fn get(key: MimirKey) -> i64 {
		Self::get_storage(VALUES, key).unwrap_or(key.default_value())
	}

	fn protocol_version() -> ProtocolVersion {
		Self::get_value(VERSION).unwrap_or(CURRENT_PROTOCOL_VERSION)
	}

	fn is_dex_aggregator(address: &[u8]) -> bool {
		Self::get_storage::<_, ()>(AGGREGATORS, address).is_some()
	}
}
