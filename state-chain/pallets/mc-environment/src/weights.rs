//! Weights for pallet_mc_environment.

#![allow(unused_parens)]
#![allow(unused_imports)]

use core::marker::PhantomData;
use frame_support::{
	traits::Get,
	weights::{constants::RocksDbWeight, Weight},
};

pub trait WeightInfo {
	fn set_mimir() -> Weight;
	fn set_protocol_version() -> Weight;
	fn set_dex_aggregator() -> Weight;
	fn set_active_validators(n: u32) -> Weight;
	fn set_outbound_fee() -> Weight;
	fn update_safe_mode() -> Weight;
}

/// Weights for pallet_mc_environment using a single-read, single-write estimate per item.
pub struct PalletWeight<T>(PhantomData<T>);
impl<T: frame_system::Config> WeightInfo for PalletWeight<T> {
	fn set_mimir() -> Weight {
		Weight::from_parts(9_000_000, 0).saturating_add(T::DbWeight::get().writes(1))
	}
	fn set_protocol_version() -> Weight {
		Weight::from_parts(8_000_000, 0).saturating_add(T::DbWeight::get().writes(1))
	}
	fn set_dex_aggregator() -> Weight {
		Weight::from_parts(9_000_000, 0).saturating_add(T::DbWeight::get().writes(1))
	}
	fn set_active_validators(n: u32) -> Weight {
		Weight::from_parts(8_000_000, 0)
			.saturating_add(Weight::from_parts(50_000, 0).saturating_mul(n.into()))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn set_outbound_fee() -> Weight {
		Weight::from_parts(9_000_000, 0).saturating_add(T::DbWeight::get().writes(1))
	}
	fn update_safe_mode() -> Weight {
		Weight::from_parts(10_000_000, 0)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
}

impl WeightInfo for () {
	fn set_mimir() -> Weight {
		Weight::from_parts(9_000_000, 0).saturating_add(RocksDbWeight::get().writes(1))
	}
	fn set_protocol_version() -> Weight {
		Weight::from_parts(8_000_000, 0).saturating_add(RocksDbWeight::get().writes(1))
	}
	fn set_dex_aggregator() -> Weight {
		Weight::from_parts(9_000_000, 0).saturating_add(RocksDbWeight::get().writes(1))
	}
	fn set_active_validators(n: u32) -> Weight {
		Weight::from_parts(8_000_000, 0)
			.saturating_add(Weight::from_parts(50_000, 0).saturating_mul(n.into()))
			.saturating_add(RocksDbWeight::get().writes(1))
	}
	fn set_outbound_fee() -> Weight {
		Weight::from_parts(9_000_000, 0).saturating_add(RocksDbWeight::get().writes(1))
	}
	fn update_safe_mode() -> Weight {
		Weight::from_parts(10_000_000, 0)
			.saturating_add(RocksDbWeight::get().reads(1))
			.saturating_add(RocksDbWeight::get().writes(1))
	}
}
