#![cfg_attr(not(feature = "std"), no_std)]

//! Names that affiliates register to receive fees.
//!
//! A name maps to an owner, per-chain aliases, an optional preferred payout asset, a default
//! affiliate fee and a list of sub-affiliates that receive part of that fee. Names are managed
//! through name memos sent to the native chain; there are no extrinsics.

use frame_support::{pallet_prelude::*, sp_runtime::SaturatedConversion};
use mc_memo::ManageNameMemo;
use mc_primitives::{Address, Asset, BasisPoints, Chain, MimirKey, MAX_BASIS_POINTS};
use mc_traits::{AddressConverter, Mimir, NameRegistry, ResolvedName};
use serde::{Deserialize, Serialize};
use sp_std::vec::Vec;

pub use pallet::*;

#[cfg(test)]
mod mock;

pub const PALLET_VERSION: StorageVersion = StorageVersion::new(0);

pub const MAX_NAME_LENGTH: usize = 30;

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct NameRecord<AccountId> {
	#[serde(with = "mc_utilities::with_serde::bytes_as_string")]
	pub name: Vec<u8>,
	pub owner: AccountId,
	pub aliases: Vec<(Chain, Address)>,
	pub preferred_asset: Option<Asset>,
	pub expire_block_height: u64,
	pub affiliate_bps: BasisPoints,
	pub subaffiliates: Vec<(Vec<u8>, BasisPoints)>,
}

impl<AccountId> NameRecord<AccountId> {
	pub fn alias(&self, chain: Chain) -> Option<&Address> {
		self.aliases.iter().find(|(c, _)| *c == chain).map(|(_, address)| address)
	}

	fn set_alias(&mut self, chain: Chain, address: Address) {
		self.aliases.retain(|(c, _)| *c != chain);
		if !address.is_empty() {
			self.aliases.push((chain, address));
		}
	}
}

fn is_valid_name(name: &[u8]) -> bool {
	!name.is_empty() &&
		name.len() <= MAX_NAME_LENGTH &&
		name.iter().all(|c| c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b'+'))
}

#[frame_support::pallet]
pub mod pallet {
	use super::*;

	#[pallet::config]
	#[pallet::disable_frame_system_supertrait_check]
	pub trait Config: mc_traits::Mayachain {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		type AddressConverter: AddressConverter<AccountId = Self::AccountId>;

		/// Lifetime of a newly registered name, in native blocks.
		#[pallet::constant]
		type BlocksPerYear: Get<u64>;
	}

	#[pallet::pallet]
	#[pallet::storage_version(PALLET_VERSION)]
	#[pallet::without_storage_info]
	pub struct Pallet<T>(PhantomData<T>);

	#[pallet::storage]
	pub type NameRecords<T: Config> =
		StorageMap<_, Blake2_128Concat, Vec<u8>, NameRecord<T::AccountId>, OptionQuery>;

	#[pallet::event]
	#[pallet::generate_deposit(pub(super) fn deposit_event)]
	pub enum Event<T: Config> {
		NameRegistered { name: Vec<u8>, owner: T::AccountId, expire_block_height: u64 },
		NameUpdated { name: Vec<u8>, owner: T::AccountId, expire_block_height: u64 },
	}

	#[pallet::error]
	pub enum Error<T> {
		/// Names are 1 to 30 characters of `[a-zA-Z0-9+_-]`.
		InvalidName,
		/// The name is registered to someone else and has not expired.
		NotOwner,
		/// The owner address does not belong to a native account.
		InvalidOwner,
		AffiliateFeeTooHigh,
		/// A sub-affiliate must be a registered name other than the one being updated.
		UnknownSubaffiliate,
		/// Sub-affiliate shares add up to more than the whole fee.
		SubaffiliateBpsTooHigh,
	}
}

impl<T: Config> Pallet<T> {
	fn current_height() -> u64 {
		frame_system::Pallet::<T>::block_number().saturated_into()
	}

	/// The record for `name`, if registered and not expired.
	pub fn name(name: &[u8]) -> Option<NameRecord<T::AccountId>> {
		NameRecords::<T>::get(name)
			.filter(|record| record.expire_block_height > Self::current_height())
	}

	/// Every unexpired name owned by `owner`.
	pub fn names_owned_by(owner: &T::AccountId) -> Vec<NameRecord<T::AccountId>> {
		let now = Self::current_height();
		NameRecords::<T>::iter_values()
			.filter(|record| record.owner == *owner && record.expire_block_height > now)
			.collect()
	}

	fn update_subaffiliates(
		record: &mut NameRecord<T::AccountId>,
		memo: &ManageNameMemo,
	) -> DispatchResult {
		for sub in &memo.subaffiliates {
			record.subaffiliates.retain(|(name, _)| *name != sub.name);
			if sub.bps == 0 {
				continue
			}
			ensure!(
				sub.name != memo.name && Self::name(&sub.name).is_some(),
				Error::<T>::UnknownSubaffiliate
			);
			record.subaffiliates.push((sub.name.clone(), sub.bps));
		}
		let total: u32 = record.subaffiliates.iter().map(|(_, bps)| u32::from(*bps)).sum();
		ensure!(total <= u32::from(MAX_BASIS_POINTS), Error::<T>::SubaffiliateBpsTooHigh);
		Ok(())
	}
}

impl<T: Config> NameRegistry for Pallet<T> {
	type AccountId = T::AccountId;

	fn resolve(name: &[u8]) -> Option<ResolvedName<T::AccountId>> {
		Self::name(name).map(|record| ResolvedName {
			name: record.name,
			owner: record.owner,
			preferred_asset: record.preferred_asset,
			affiliate_bps: record.affiliate_bps,
			subaffiliates: record.subaffiliates,
		})
	}

	/// Falls back to the owner's account on the native chain.
	fn alias(name: &[u8], chain: Chain) -> Option<Address> {
		let record = Self::name(name)?;
		record.alias(chain).cloned().or_else(|| {
			chain.is_native().then(|| T::AddressConverter::to_address(&record.owner))
		})
	}

	/// ## Events
	///
	/// - [NameRegistered](Event::NameRegistered)
	/// - [NameUpdated](Event::NameUpdated)
	///
	/// ## Errors
	///
	/// - [InvalidName](Error::InvalidName)
	/// - [NotOwner](Error::NotOwner)
	/// - [InvalidOwner](Error::InvalidOwner)
	/// - [AffiliateFeeTooHigh](Error::AffiliateFeeTooHigh)
	/// - [UnknownSubaffiliate](Error::UnknownSubaffiliate)
	/// - [SubaffiliateBpsTooHigh](Error::SubaffiliateBpsTooHigh)
	fn manage_name(signer: &T::AccountId, memo: &ManageNameMemo) -> DispatchResult {
		ensure!(is_valid_name(&memo.name), Error::<T>::InvalidName);

		let now = Self::current_height();
		let existing = Self::name(&memo.name);
		if let Some(record) = &existing {
			ensure!(record.owner == *signer, Error::<T>::NotOwner);
		}
		let is_new = existing.is_none();

		let owner = match &memo.owner {
			Some(address) if !address.is_empty() =>
				T::AddressConverter::to_account_id(address).ok_or(Error::<T>::InvalidOwner)?,
			_ => signer.clone(),
		};

		let mut record = existing.unwrap_or_else(|| NameRecord {
			name: memo.name.clone(),
			owner: owner.clone(),
			aliases: Vec::new(),
			preferred_asset: None,
			expire_block_height: now.saturating_add(T::BlocksPerYear::get()),
			affiliate_bps: 0,
			subaffiliates: Vec::new(),
		});
		record.owner = owner;

		if let Some((chain, address)) = &memo.alias {
			record.set_alias(*chain, address.clone());
		}
		if let Some(asset) = &memo.preferred_asset {
			record.preferred_asset = Some(asset.clone());
		}
		if let Some(expiry) = memo.expire_block_height {
			record.expire_block_height = expiry;
		}
		if let Some(bps) = memo.affiliate_bps {
			ensure!(
				bps <= T::Mimir::get_bps(MimirKey::MaxAffiliateFeeBasisPoints),
				Error::<T>::AffiliateFeeTooHigh
			);
			record.affiliate_bps = bps;
		}
		Self::update_subaffiliates(&mut record, memo)?;

		let (name, owner, expire_block_height) =
			(record.name.clone(), record.owner.clone(), record.expire_block_height);
		NameRecords::<T>::insert(&name, record);

		log::debug!(
			target: "mc-names",
			"Name {} {} until {expire_block_height}.",
			core::str::from_utf8(&name).unwrap_or_default(),
			if is_new { "registered" } else { "updated" },
		);
		Self::deposit_event(if is_new {
			Event::NameRegistered { name, owner, expire_block_height }
		} else {
			Event::NameUpdated { name, owner, expire_block_height }
		});
		Ok(())
	}
}
