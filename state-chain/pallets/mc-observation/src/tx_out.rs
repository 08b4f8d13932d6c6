//! The outbound queue, and matching of observed outbounds to the items that caused them.

use super::*;
use mc_memo::outbound_memo;
use mc_traits::TxOutStore;

/// Whether `out_tx` is the transaction that fulfils `item`.
fn fulfils(out_tx: &Tx, item: &TxOutItem) -> bool {
	out_tx.chain == item.chain &&
		out_tx.to_address == item.to_address &&
		out_tx.memo.eq_ignore_ascii_case(&item.memo) &&
		out_tx.coins.contains(&item.coin)
}

/// The items that no outbound accounts for. Each outbound accounts for at most one item.
fn unmatched(actions: &[TxOutItem], out_txs: &[Tx]) -> Vec<TxOutItem> {
	let mut remaining = out_txs.to_vec();
	actions
		.iter()
		.filter(|item| match remaining.iter().position(|out_tx| fulfils(out_tx, item)) {
			Some(index) => {
				remaining.swap_remove(index);
				false
			},
			None => true,
		})
		.cloned()
		.collect()
}

impl<T: Config> Pallet<T> {
	/// Charges the outbound fee, then queues `item` for signing. Native-chain items settle
	/// immediately instead.
	///
	/// The item is recorded against the voter of the inbound that caused it, and an item
	/// identical to one already recorded or queued is refused.
	pub(crate) fn schedule_outbound(mut item: TxOutItem) -> Result<AssetAmount, DispatchError> {
		if item.memo.is_empty() {
			item.memo = outbound_memo(&item.in_hash);
		}
		let fee = T::GasManager::outbound_fee(&item.coin.asset).min(item.coin.amount);
		let net = item.coin.amount - fee;
		ensure!(net > 0, Error::<T>::OutboundAmountTooLow);
		item.coin.amount = net;

		let fingerprint = item.fingerprint();
		let voter = ObservedTxVoters::<T>::get(item.in_hash);
		ensure!(
			!PendingOutbounds::<T>::contains_key(fingerprint) &&
				!voter.as_ref().is_some_and(|voter| {
					voter.actions.iter().any(|action| action.fingerprint() == fingerprint)
				}),
			Error::<T>::DuplicateOutbound
		);

		if fee > 0 {
			T::GasManager::record_withheld_fee(&Coin::new(item.coin.asset.clone(), fee));
		}
		let settled = if item.coin.asset.is_native_settled() {
			Some(Self::settle_natively(&item)?)
		} else {
			PendingOutbounds::<T>::insert(fingerprint, &item);
			None
		};

		let mut done = false;
		if let Some(mut voter) = voter {
			if voter.actions_generated_at == 0 {
				voter.actions_generated_at = Self::current_height();
			}
			voter.actions.push(item.clone());
			match settled {
				Some(out_tx) => {
					voter.out_txs.push(out_tx);
					done = unmatched(&voter.actions, &voter.out_txs).is_empty();
				},
				None if voter.status == VoterStatus::Done => voter.status = VoterStatus::Finalised,
				None => {},
			}
			ObservedTxVoters::<T>::insert(item.in_hash, voter);
		}

		let in_hash = item.in_hash;
		Self::deposit_event(Event::OutboundScheduled {
			in_hash,
			to_address: item.to_address,
			coin: item.coin,
		});
		if done {
			Self::mark_done(in_hash);
		}
		Ok(net)
	}

	/// Pays a native-chain item out of Asgard. Returns the resulting transaction.
	fn settle_natively(item: &TxOutItem) -> Result<Tx, DispatchError> {
		let recipient = T::AddressConverter::to_ledger_account(&item.to_address)
			.ok_or(Error::<T>::InvalidDestination)?;
		T::Ledger::transfer(
			&LedgerAccount::Module(ModuleName::Asgard),
			&recipient,
			&item.coin.asset,
			item.coin.amount,
		)?;
		Ok(Tx {
			id: TxId::zero(),
			chain: Chain::NATIVE,
			from_address: T::AddressConverter::module_address(ModuleName::Asgard),
			to_address: item.to_address.clone(),
			coins: vec![item.coin.clone()],
			gas: Vec::new(),
			memo: item.memo.clone(),
		})
	}

	pub(crate) fn observe_outbound_tx(
		signer: &T::AccountId,
		observed: ObservedTx,
		share_count: u32,
	) {
		let tx_id = observed.tx.id;
		let chain = observed.tx.chain;
		let Some(mut vault) = Vaults::<T>::get(&observed.vault_pub_key) else {
			log::info!(
				target: "mc-observation",
				"Outbound {tx_id:?} names unknown vault {:?}, skipped.",
				observed.vault_pub_key,
			);
			return
		};
		LastObserveHeight::<T>::insert(signer, chain, observed.block_height);

		let mut voter =
			OutboundVoters::<T>::get(tx_id).unwrap_or_else(|| ObservedTxVoter::new(tx_id));
		let labels = SlashLabels { reason: SlashReason::FailedObserveOutbound, chain };
		let progress = Self::vote(&mut voter, signer, &observed, labels, share_count);
		let first_agreement = progress.consensus && !voter.updated_vault;
		if first_agreement {
			voter.updated_vault = true;
		}
		OutboundVoters::<T>::insert(tx_id, &voter);
		if !first_agreement {
			return
		}
		let Some(winner) = voter.tx else { return };

		if !winner.is_self_transfer() {
			vault.sub_funds(&winner.tx.coins);
			vault.sub_funds(&winner.tx.gas);
			Vaults::<T>::insert(&vault.pub_key, &vault);
		}

		let memo = winner.tx.memo_str().map(|memo| parse_memo(memo, &T::Mimir::behaviour()));
		let in_hash = match memo {
			Some(Ok(Memo::Outbound { in_hash } | Memo::Refund { in_hash })) => Some(in_hash),
			Some(Ok(Memo::Migrate { .. } | Memo::Ragnarok { .. })) => None,
			_ => {
				log::error!(
					target: "mc-observation",
					"Outbound {tx_id:?} does not reference an inbound.",
				);
				None
			},
		};
		if let Some(in_hash) = in_hash {
			Self::record_out_tx(in_hash, winner.tx);
		}
		Self::deposit_event(Event::OutboundObserved { tx_id, in_hash });
	}

	/// Attaches an observed outbound to the inbound that caused it and releases the queued item.
	fn record_out_tx(in_hash: TxId, out_tx: Tx) {
		let Some(mut voter) = ObservedTxVoters::<T>::get(in_hash) else {
			log::error!(target: "mc-observation", "Outbound for unknown inbound {in_hash:?}.");
			return
		};
		match unmatched(&voter.actions, &voter.out_txs)
			.into_iter()
			.find(|item| fulfils(&out_tx, item))
		{
			Some(item) => {
				PendingOutbounds::<T>::remove(item.fingerprint());
			},
			None => log::warn!(
				target: "mc-observation",
				"Outbound {:?} matches no action of {in_hash:?}.",
				out_tx.id,
			),
		}
		voter.out_txs.push(out_tx);
		let done =
			!voter.actions.is_empty() && unmatched(&voter.actions, &voter.out_txs).is_empty();
		ObservedTxVoters::<T>::insert(in_hash, voter);
		if done {
			Self::mark_done(in_hash);
		}
	}

	/// Outbounds scheduled for `tx_id` that were never observed leaving a vault.
	pub fn dangling_actions(tx_id: TxId) -> Vec<TxOutItem> {
		ObservedTxVoters::<T>::get(tx_id)
			.map(|voter| unmatched(&voter.actions, &voter.out_txs))
			.unwrap_or_default()
	}
}

impl<T: Config> TxOutStore for Pallet<T> {
	fn try_add_tx_out_item(item: TxOutItem) -> Result<AssetAmount, DispatchError> {
		Self::schedule_outbound(item)
	}
}
