#![cfg(feature = "std")]

//! Test doubles for the capability traits. State lives in test-externalities storage so it is
//! reset between tests and rolled back with storage layers like real pallet state.

use codec::{Decode, Encode};
use frame_support::{storage, StorageHasher, Twox64Concat};

pub mod address_converter;
pub mod affiliate_fees;
pub mod bond_handler;
pub mod cacao_pool;
pub mod gas_manager;
pub mod ledger;
pub mod mimir;
pub mod names;
pub mod pools;
pub mod safe_mode;
pub mod swap_api;
pub mod trade_account;
pub mod tx_out_store;
pub mod validators;
pub mod vault_ledger;

/// Implements [crate::Mayachain] for a mock runtime, with root as governance and [mimir::MockMimir]
/// for protocol constants.
#[macro_export]
macro_rules! impl_mock_mayachain {
	($runtime:ty) => {
		impl $crate::Mayachain for $runtime {
			type EnsureGovernance =
				frame_system::EnsureRoot<<$runtime as frame_system::Config>::AccountId>;
			type Mimir = $crate::mocks::mimir::MockMimir;
		}
	};
}

trait MockPallet {
	const PREFIX: &'static [u8];
}

trait MockPalletStorage {
	fn put_storage<K: Encode, V: Encode>(store: &[u8], k: K, v: V);
	fn get_storage<K: Encode, V: Decode>(store: &[u8], k: K) -> Option<V>;
	fn take_storage<K: Encode, V: Decode>(store: &[u8], k: K) -> Option<V>;

	fn put_value<V: Encode>(store: &[u8], v: V) {
		Self::put_storage(store, (), v)
	}

	fn get_value<V: Decode>(store: &[u8]) -> Option<V> {
		Self::get_storage(store, ())
	}

	/// Entries set to `None` by `f` are removed.
	fn mutate_storage<K: Encode, V: Encode + Decode, R>(
		store: &[u8],
		k: &K,
		f: impl FnOnce(&mut Option<V>) -> R,
	) -> R {
		let mut value = Self::get_storage(store, k);
		let result = f(&mut value);
		match value {
			Some(v) => Self::put_storage(store, k, v),
			None => {
				Self::take_storage::<_, V>(store, k);
			},
		}
		result
	}

	fn mutate_value<V: Encode + Decode + Default, R>(
		store: &[u8],
		f: impl FnOnce(&mut V) -> R,
	) -> R {
		let mut value = Self::get_value(store).unwrap_or_default();
		let result = f(&mut value);
		Self::put_value(store, value);
		result
	}
}

fn storage_key<K: Encode>(prefix: &[u8], store: &[u8], k: K) -> Vec<u8> {
	[prefix, store, &k.encode()].concat()
}

impl<T: MockPallet> MockPalletStorage for T {
	fn put_storage<K: Encode, V: Encode>(store: &[u8], k: K, v: V) {
		storage::hashed::put(
			&<Twox64Concat as StorageHasher>::hash,
			&storage_key(Self::PREFIX, store, k),
			&v,
		)
	}

	fn get_storage<K: Encode, V: Decode>(store: &[u8], k: K) -> Option<V> {
		storage::hashed::get(
			&<Twox64Concat as StorageHasher>::hash,
			&storage_key(Self::PREFIX, store, k),
		)
	}

	fn take_storage<K: Encode, V: Decode>(store: &[u8], k: K) -> Option<V> {
		storage::hashed::take(
			&<Twox64Concat as StorageHasher>::hash,
			&storage_key(Self::PREFIX, store, k),
		)
	}
}

/// Appends to a list kept under `store`.
fn push_value<T: MockPallet, V: Encode + Decode>(store: &[u8], item: V) {
	T::mutate_value::<Vec<V>, _>(store, |items| items.push(item));
}
