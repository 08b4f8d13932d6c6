#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

use frame_support::{
	pallet_prelude::*, sp_runtime::SaturatedConversion, storage::with_storage_layer,
};
use frame_system::pallet_prelude::*;
use mc_memo::{parse_memo, Memo};
use mc_primitives::{
	Address, Asset, AssetAmount, Chain, Coin, ExternalBlockHeight, LedgerAccount, MimirKey,
	ModuleName, RefundReason, Tx, TxId, VaultPubKey,
};
use mc_traits::{
	impl_pallet_safe_mode, AddressConverter, BondHandler, CacaoPoolApi, GasManager, Ledger,
	LiquidityApi, Mimir, NameRegistry, SlashLabels, SlashReason, Slasher, SwapApi, SwapOrigin,
	TradeAccountApi, TxOutItem, ValidatorSet, VaultLedger,
};
use serde::{Deserialize, Serialize};
use sp_std::{vec, vec::Vec};

pub use pallet::*;

mod dispatch;
mod tx_out;
mod voting;

pub use dispatch::Inbound;
pub use voting::{Ballot, ObservedTxVoter, Progress, VoterStatus};

#[cfg(test)]
mod mock;

pub mod weights;
pub use weights::WeightInfo;

pub const PALLET_VERSION: StorageVersion = StorageVersion::new(0);

impl_pallet_safe_mode!(PalletSafeMode; observations_enabled, deposits_enabled);

/// One validator's account of an external transaction.
#[derive(
	Clone,
	RuntimeDebug,
	PartialEq,
	Eq,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	Serialize,
	Deserialize,
)]
pub struct ObservedTx {
	pub tx: Tx,
	/// Height of the source-chain block that included the transaction.
	pub block_height: ExternalBlockHeight,
	/// The vault that received or sent the transaction.
	pub vault_pub_key: VaultPubKey,
	/// The transaction is final on its source chain.
	pub finalised: bool,
}

impl ObservedTx {
	/// Whether both describe the same transaction. Finality is not part of the comparison.
	pub fn same_body(&self, other: &ObservedTx) -> bool {
		self.tx == other.tx &&
			self.block_height == other.block_height &&
			self.vault_pub_key == other.vault_pub_key
	}

	pub fn is_self_transfer(&self) -> bool {
		self.tx.from_address == self.tx.to_address
	}
}

#[derive(
	Copy,
	Clone,
	RuntimeDebug,
	PartialEq,
	Eq,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	MaxEncodedLen,
	Serialize,
	Deserialize,
)]
pub enum VaultStatus {
	Active,
	/// Being migrated away from. Still receives and sends.
	Retiring,
	/// Inbounds are refunded.
	Inactive,
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct Vault {
	pub pub_key: VaultPubKey,
	pub status: VaultStatus,
	pub coins: Vec<Coin>,
}

impl Vault {
	pub fn new(pub_key: VaultPubKey, status: VaultStatus) -> Self {
		Vault { pub_key, status, coins: Vec::new() }
	}

	pub fn balance_of(&self, asset: &Asset) -> AssetAmount {
		self.coins
			.iter()
			.find(|coin| coin.asset == *asset)
			.map(|coin| coin.amount)
			.unwrap_or_default()
	}

	pub fn add_funds(&mut self, coins: &[Coin]) {
		for coin in coins.iter().filter(|coin| !coin.is_empty()) {
			match self.coins.iter_mut().find(|held| held.asset == coin.asset) {
				Some(held) => held.amount = held.amount.saturating_add(coin.amount),
				None => self.coins.push(coin.clone()),
			}
		}
	}

	/// Balances never go below zero. An overdraft is logged and clamped.
	pub fn sub_funds(&mut self, coins: &[Coin]) {
		for coin in coins {
			if let Some(held) = self.coins.iter_mut().find(|held| held.asset == coin.asset) {
				if held.amount < coin.amount {
					log::error!(
						target: "mc-observation",
						"Vault {:?} overdrawn: holds {held}, sent {coin}.",
						self.pub_key,
					);
				}
				held.amount = held.amount.saturating_sub(coin.amount);
			}
		}
		self.coins.retain(|coin| !coin.is_empty());
	}
}

#[frame_support::pallet]
pub mod pallet {
	use super::*;

	#[pallet::config]
	#[pallet::disable_frame_system_supertrait_check]
	pub trait Config: mc_traits::Mayachain {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		/// Validators allowed to observe, and the size of the majority.
		type ValidatorSet: ValidatorSet<ValidatorId = Self::AccountId>;

		type Slasher: Slasher<ValidatorId = Self::AccountId>;

		type GasManager: GasManager;

		type Ledger: Ledger<AccountId = Self::AccountId>;

		type AddressConverter: AddressConverter<AccountId = Self::AccountId>;

		type SwapApi: SwapApi;

		type LiquidityApi: LiquidityApi;

		type CacaoPoolApi: CacaoPoolApi<AccountId = Self::AccountId>;

		type TradeAccountApi: TradeAccountApi<AccountId = Self::AccountId>;

		type BondHandler: BondHandler;

		type NameRegistry: NameRegistry<AccountId = Self::AccountId>;

		type SafeMode: Get<PalletSafeMode>;

		type WeightInfo: WeightInfo;
	}

	#[pallet::pallet]
	#[pallet::storage_version(PALLET_VERSION)]
	#[pallet::without_storage_info]
	pub struct Pallet<T>(PhantomData<T>);

	/// Votes on inbound transactions, and the outbounds scheduled on their behalf.
	#[pallet::storage]
	pub type ObservedTxVoters<T: Config> =
		StorageMap<_, Twox64Concat, TxId, ObservedTxVoter<T::AccountId>, OptionQuery>;

	/// Votes on transactions sent by the vaults, keyed by the outbound's own hash.
	#[pallet::storage]
	pub type OutboundVoters<T: Config> =
		StorageMap<_, Twox64Concat, TxId, ObservedTxVoter<T::AccountId>, OptionQuery>;

	#[pallet::storage]
	pub type Vaults<T> = StorageMap<_, Blake2_128Concat, VaultPubKey, Vault, OptionQuery>;

	/// Scheduled outbounds waiting to be signed, keyed by [TxOutItem::fingerprint].
	#[pallet::storage]
	pub type PendingOutbounds<T> = StorageMap<_, Identity, [u8; 32], TxOutItem, OptionQuery>;

	/// The last source-chain height each validator reported per chain.
	#[pallet::storage]
	pub type LastObserveHeight<T: Config> = StorageDoubleMap<
		_,
		Blake2_128Concat,
		T::AccountId,
		Twox64Concat,
		Chain,
		ExternalBlockHeight,
		ValueQuery,
	>;

	/// The highest source-chain height at which a transaction reached consensus.
	#[pallet::storage]
	pub type LastChainHeight<T> =
		StorageMap<_, Twox64Concat, Chain, ExternalBlockHeight, ValueQuery>;

	#[pallet::storage]
	pub type NativeTxNonce<T> = StorageValue<_, u64, ValueQuery>;

	#[pallet::event]
	#[pallet::generate_deposit(pub(super) fn deposit_event)]
	pub enum Event<T: Config> {
		ObservationConsensus { tx_id: TxId, chain: Chain },
		ObservationFinalised { tx_id: TxId, chain: Chain },
		/// A finalised inbound was handled according to its memo.
		InboundProcessed { tx_id: TxId },
		/// Inbound funds were returned to the sender.
		Refunded { tx_id: TxId, reason: RefundReason, code: u32, coins: Vec<Coin> },
		NativeDeposit { tx_id: TxId, depositor: T::AccountId, coin: Coin, memo: Vec<u8> },
		OutboundScheduled { in_hash: TxId, to_address: Address, coin: Coin },
		OutboundObserved { tx_id: TxId, in_hash: Option<TxId> },
		/// Every outbound of the inbound was observed.
		VoterDone { tx_id: TxId },
		VaultUpdated { pub_key: VaultPubKey, status: VaultStatus },
		VoterReverted { tx_id: TxId },
		VoterReset { tx_id: TxId },
		DanglingActionsRequeued { tx_id: TxId, count: u32 },
	}

	#[pallet::error]
	pub enum Error<T> {
		/// Only active validators may observe.
		NotActiveValidator,
		ObservationsDisabled,
		DepositsDisabled,
		/// Exactly one coin must be sent.
		InvalidCoins,
		/// Only native-chain assets can be deposited.
		InvalidDepositAsset,
		InvalidMemo,
		/// The memo requires a different coin than the one sent.
		InvalidCoinForMemo,
		TradingHalted,
		/// The sender has no native account.
		UnknownSender,
		/// The named owner has no native account.
		InvalidOwner,
		InvalidDestination,
		UnknownVoter,
		/// Only reverted voters can be reset.
		VoterNotReverted,
		NoDanglingActions,
		/// Nothing would be left of the outbound after fees.
		OutboundAmountTooLow,
		DuplicateOutbound,
	}

	#[pallet::genesis_config]
	#[derive(frame_support::DefaultNoBound)]
	pub struct GenesisConfig<T: Config> {
		pub vaults: Vec<(VaultPubKey, VaultStatus)>,
		#[serde(skip)]
		pub _config: PhantomData<T>,
	}

	#[pallet::genesis_build]
	impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
		fn build(&self) {
			for (pub_key, status) in &self.vaults {
				Vaults::<T>::insert(pub_key, Vault::new(pub_key.clone(), *status));
			}
		}
	}

	#[pallet::call]
	impl<T: Config> Pallet<T> {
		/// Submits the caller's observations of transactions received by the vaults.
		///
		/// Each accepted observation costs the caller `ObserveSlashPoints`, returned once the
		/// transaction reaches consensus or finality in time. Finalised inbounds are credited to
		/// their vault and processed according to their memo.
		///
		/// ## Events
		///
		/// - [ObservationConsensus](Event::ObservationConsensus)
		/// - [ObservationFinalised](Event::ObservationFinalised)
		/// - [InboundProcessed](Event::InboundProcessed)
		/// - [Refunded](Event::Refunded)
		///
		/// ## Errors
		///
		/// - [NotActiveValidator](Error::NotActiveValidator)
		/// - [ObservationsDisabled](Error::ObservationsDisabled)
		#[pallet::call_index(0)]
		#[pallet::weight(T::WeightInfo::observe_inbound(txs.len() as u32))]
		pub fn observe_inbound(origin: OriginFor<T>, txs: Vec<ObservedTx>) -> DispatchResult {
			let signer = Self::ensure_observer(origin)?;
			let share_count = T::ValidatorSet::active_count();
			for observed in txs {
				Self::observe_inbound_tx(&signer, observed, share_count);
			}
			Ok(())
		}

		/// Submits the caller's observations of transactions sent by the vaults.
		///
		/// ## Events
		///
		/// - [OutboundObserved](Event::OutboundObserved)
		/// - [VoterDone](Event::VoterDone)
		///
		/// ## Errors
		///
		/// - [NotActiveValidator](Error::NotActiveValidator)
		/// - [ObservationsDisabled](Error::ObservationsDisabled)
		#[pallet::call_index(1)]
		#[pallet::weight(T::WeightInfo::observe_outbound(txs.len() as u32))]
		pub fn observe_outbound(origin: OriginFor<T>, txs: Vec<ObservedTx>) -> DispatchResult {
			let signer = Self::ensure_observer(origin)?;
			let share_count = T::ValidatorSet::active_count();
			for observed in txs {
				Self::observe_outbound_tx(&signer, observed, share_count);
			}
			Ok(())
		}

		/// Sends a native coin to the protocol with a memo. The transaction fee goes to the
		/// Reserve and the coin to Asgard, then the memo is processed as a finalised inbound.
		///
		/// Trade assets are debited from the caller's trade account instead.
		///
		/// ## Events
		///
		/// - [NativeDeposit](Event::NativeDeposit)
		///
		/// ## Errors
		///
		/// - [DepositsDisabled](Error::DepositsDisabled)
		/// - [InvalidCoins](Error::InvalidCoins)
		/// - [InvalidDepositAsset](Error::InvalidDepositAsset)
		/// - [InvalidMemo](Error::InvalidMemo)
		/// - Any error of the memo's handler.
		#[pallet::call_index(2)]
		#[pallet::weight(T::WeightInfo::deposit())]
		pub fn deposit(origin: OriginFor<T>, coins: Vec<Coin>, memo: Vec<u8>) -> DispatchResult {
			let depositor = ensure_signed(origin)?;
			ensure!(T::SafeMode::get().deposits_enabled, Error::<T>::DepositsDisabled);
			let [coin] = <[Coin; 1]>::try_from(coins).map_err(|_| Error::<T>::InvalidCoins)?;
			ensure!(coin.asset.is_native_settled(), Error::<T>::InvalidDepositAsset);

			let parsed = core::str::from_utf8(&memo)
				.ok()
				.and_then(|memo| parse_memo(memo, &T::Mimir::behaviour()).ok())
				.filter(|parsed| !parsed.is_internal())
				.ok_or(Error::<T>::InvalidMemo)?;

			let tx_id = Self::next_native_tx_id(&depositor);
			let account = LedgerAccount::Account(depositor.clone());
			let fee = T::GasManager::native_transaction_fee();
			if fee > 0 {
				T::Ledger::transfer(
					&account,
					&LedgerAccount::Module(ModuleName::Reserve),
					&Asset::cacao(),
					fee,
				)?;
			}
			if !coin.is_empty() {
				if coin.asset.is_trade() {
					// Withdrawals debit the trade account themselves.
					if !matches!(parsed, Memo::TradeAccountWithdrawal { .. }) {
						T::TradeAccountApi::debit(&coin.asset, coin.amount, &depositor)?;
					}
				} else {
					T::Ledger::transfer(
						&account,
						&LedgerAccount::Module(ModuleName::Asgard),
						&coin.asset,
						coin.amount,
					)?;
				}
			}

			let now = Self::current_height();
			let tx = Tx {
				id: tx_id,
				chain: Chain::NATIVE,
				from_address: T::AddressConverter::to_address(&depositor),
				to_address: T::AddressConverter::module_address(ModuleName::Asgard),
				coins: vec![coin.clone()],
				gas: vec![Coin::cacao(fee)],
				memo: memo.clone(),
			};
			ObservedTxVoters::<T>::insert(tx_id, ObservedTxVoter::native(tx.clone(), now));

			Self::dispatch(&Inbound {
				tx_id,
				chain: Chain::NATIVE,
				from_address: tx.from_address,
				coins: tx.coins,
				memo: parsed.clone(),
				origin: SwapOrigin::Native,
				sender: Some(depositor.clone()),
			})?;
			if !parsed.has_outbound() {
				Self::mark_done(tx_id);
			}

			Self::deposit_event(Event::NativeDeposit { tx_id, depositor, coin, memo });
			Ok(())
		}

		/// Registers a vault or changes its status. Requires Governance.
		///
		/// ## Events
		///
		/// - [VaultUpdated](Event::VaultUpdated)
		#[pallet::call_index(3)]
		#[pallet::weight(T::WeightInfo::set_vault())]
		pub fn set_vault(
			origin: OriginFor<T>,
			pub_key: VaultPubKey,
			status: VaultStatus,
		) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			Vaults::<T>::mutate(&pub_key, |vault| {
				vault.get_or_insert_with(|| Vault::new(pub_key.clone(), status)).status = status;
			});
			Self::deposit_event(Event::VaultUpdated { pub_key, status });
			Ok(())
		}

		/// Voids an inbound voter so that further observations are not processed. Requires
		/// Governance.
		///
		/// ## Errors
		///
		/// - [UnknownVoter](Error::UnknownVoter)
		#[pallet::call_index(4)]
		#[pallet::weight(T::WeightInfo::revert_voter())]
		pub fn revert_voter(origin: OriginFor<T>, tx_id: TxId) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			ObservedTxVoters::<T>::try_mutate(tx_id, |voter| {
				voter.as_mut().ok_or(Error::<T>::UnknownVoter)?.reverted = true;
				Ok::<_, Error<T>>(())
			})?;
			Self::deposit_event(Event::VoterReverted { tx_id });
			Ok(())
		}

		/// Clears a reverted voter so the transaction can be observed and processed afresh.
		/// Requires Governance.
		///
		/// ## Errors
		///
		/// - [UnknownVoter](Error::UnknownVoter)
		/// - [VoterNotReverted](Error::VoterNotReverted)
		#[pallet::call_index(5)]
		#[pallet::weight(T::WeightInfo::reset_voter())]
		pub fn reset_voter(origin: OriginFor<T>, tx_id: TxId) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			let voter = ObservedTxVoters::<T>::get(tx_id).ok_or(Error::<T>::UnknownVoter)?;
			ensure!(voter.reverted, Error::<T>::VoterNotReverted);
			ObservedTxVoters::<T>::remove(tx_id);
			Self::deposit_event(Event::VoterReset { tx_id });
			Ok(())
		}

		/// Queues again every outbound of `tx_id` that was scheduled but never observed.
		/// Requires Governance.
		///
		/// ## Errors
		///
		/// - [UnknownVoter](Error::UnknownVoter)
		/// - [NoDanglingActions](Error::NoDanglingActions)
		#[pallet::call_index(6)]
		#[pallet::weight(T::WeightInfo::requeue_dangling_actions())]
		pub fn requeue_dangling_actions(origin: OriginFor<T>, tx_id: TxId) -> DispatchResult {
			T::EnsureGovernance::ensure_origin(origin)?;
			ensure!(ObservedTxVoters::<T>::contains_key(tx_id), Error::<T>::UnknownVoter);
			let dangling = Self::dangling_actions(tx_id);
			ensure!(!dangling.is_empty(), Error::<T>::NoDanglingActions);
			for item in &dangling {
				PendingOutbounds::<T>::insert(item.fingerprint(), item);
			}
			Self::deposit_event(Event::DanglingActionsRequeued {
				tx_id,
				count: dangling.len() as u32,
			});
			Ok(())
		}
	}
}

impl<T: Config> Pallet<T> {
	fn ensure_observer(origin: OriginFor<T>) -> Result<T::AccountId, DispatchError> {
		let signer = ensure_signed(origin)?;
		ensure!(T::ValidatorSet::is_active(&signer), Error::<T>::NotActiveValidator);
		ensure!(T::SafeMode::get().observations_enabled, Error::<T>::ObservationsDisabled);
		Ok(signer)
	}

	pub(crate) fn current_height() -> u64 {
		frame_system::Pallet::<T>::block_number().saturated_into()
	}

	fn next_native_tx_id(depositor: &T::AccountId) -> TxId {
		let nonce = NativeTxNonce::<T>::mutate(|nonce| {
			*nonce = nonce.wrapping_add(1);
			*nonce
		});
		TxId::from(sp_io::hashing::blake2_256(
			&(
				depositor,
				Self::current_height(),
				frame_system::Pallet::<T>::extrinsic_index().unwrap_or_default(),
				nonce,
			)
				.encode(),
		))
	}

	fn observe_inbound_tx(signer: &T::AccountId, observed: ObservedTx, share_count: u32) {
		let tx_id = observed.tx.id;
		let chain = observed.tx.chain;
		let Some(mut vault) = Vaults::<T>::get(&observed.vault_pub_key) else {
			log::info!(
				target: "mc-observation",
				"Inbound {tx_id:?} names unknown vault {:?}, skipped.",
				observed.vault_pub_key,
			);
			return
		};
		LastObserveHeight::<T>::insert(signer, chain, observed.block_height);

		let mut voter =
			ObservedTxVoters::<T>::get(tx_id).unwrap_or_else(|| ObservedTxVoter::new(tx_id));
		let labels = SlashLabels { reason: SlashReason::FailedObserveInbound, chain };
		let progress = Self::vote(&mut voter, signer, &observed, labels, share_count);
		if !progress.any() {
			ObservedTxVoters::<T>::insert(tx_id, &voter);
			return
		}
		if voter.reverted {
			ObservedTxVoters::<T>::insert(tx_id, &voter);
			log::info!(target: "mc-observation", "Inbound {tx_id:?} was reverted, skipped.");
			return
		}

		let Some(winner) = voter.tx.clone() else {
			log::error!(target: "mc-observation", "Voter {tx_id:?} progressed without a body.");
			return
		};
		let memo = winner
			.tx
			.memo_str()
			.ok_or(mc_memo::MemoError::Empty)
			.and_then(|memo| parse_memo(memo, &T::Mimir::behaviour()));
		let is_migration = matches!(memo, Ok(Memo::Migrate { .. }));

		if (progress.finalised || is_migration) && !voter.updated_vault {
			if !winner.is_self_transfer() {
				vault.add_funds(&winner.tx.coins);
				Vaults::<T>::insert(&vault.pub_key, &vault);
			}
			voter.updated_vault = true;
		}
		ObservedTxVoters::<T>::insert(tx_id, &voter);
		LastChainHeight::<T>::mutate(chain, |height| {
			*height = (*height).max(winner.block_height);
		});

		if progress.consensus {
			log::info!(target: "mc-observation", "Inbound {tx_id:?} on {chain} reached consensus.");
			Self::deposit_event(Event::ObservationConsensus { tx_id, chain });
		}
		if progress.finalised {
			log::info!(target: "mc-observation", "Inbound {tx_id:?} on {chain} is final.");
			Self::deposit_event(Event::ObservationFinalised { tx_id, chain });
		}

		if matches!(&memo, Ok(memo) if memo.is_internal()) || !progress.finalised {
			return
		}

		let refund = |reason: RefundReason| {
			Self::refund(tx_id, &winner.tx.from_address, &winner.tx.coins, reason)
		};
		if vault.status == VaultStatus::Inactive {
			log::warn!(target: "mc-observation", "Inbound {tx_id:?} sent to an inactive vault.");
			return refund(RefundReason::InvalidVault)
		}
		let memo = match memo {
			Ok(memo) => memo,
			Err(error) => {
				log::warn!(target: "mc-observation", "Inbound {tx_id:?} has a bad memo: {error}");
				return refund(RefundReason::InvalidMemo)
			},
		};

		let inbound = Inbound {
			tx_id,
			chain,
			from_address: winner.tx.from_address.clone(),
			coins: winner.tx.coins.clone(),
			memo: memo.clone(),
			origin: SwapOrigin::External,
			sender: None,
		};
		match with_storage_layer(|| Self::dispatch(&inbound)) {
			Ok(()) => {
				Self::deposit_event(Event::InboundProcessed { tx_id });
				if !memo.has_outbound() {
					Self::mark_done(tx_id);
				}
			},
			Err(error) => {
				log::warn!(
					target: "mc-observation",
					"Processing inbound {tx_id:?} failed: {error:?}",
				);
				refund(Self::refund_reason(&memo, error));
			},
		}
	}

	pub(crate) fn mark_done(tx_id: TxId) {
		ObservedTxVoters::<T>::mutate(tx_id, |voter| {
			if let Some(voter) = voter {
				voter.status = VoterStatus::Done;
			}
		});
		Self::deposit_event(Event::VoterDone { tx_id });
	}

	pub fn voter(tx_id: TxId) -> Option<ObservedTxVoter<T::AccountId>> {
		ObservedTxVoters::<T>::get(tx_id)
	}

	pub fn vault(pub_key: &VaultPubKey) -> Option<Vault> {
		Vaults::<T>::get(pub_key)
	}

	pub fn pending_outbounds() -> Vec<TxOutItem> {
		PendingOutbounds::<T>::iter_values().collect()
	}
}

/// Layer-1 collateral summed across every vault.
impl<T: Config> VaultLedger for Pallet<T> {
	fn vault_balance(asset: &Asset) -> AssetAmount {
		let asset = asset.get_layer1_asset();
		Vaults::<T>::iter_values()
			.map(|vault| vault.balance_of(&asset))
			.fold(0, AssetAmount::saturating_add)
	}
}
