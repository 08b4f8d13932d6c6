//! Tallies observations until a majority of active validators agree on one transaction body.

use super::*;
use mc_utilities::has_consensus;

#[derive(
	Copy, Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize,
)]
pub enum VoterStatus {
	Observing,
	/// A majority agrees on the transaction but it is not yet final on its source chain.
	Consensus,
	Finalised,
	/// Every outbound scheduled on behalf of the transaction was observed.
	Done,
}

/// The signers backing one version of a transaction.
#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct Ballot<AccountId> {
	pub tx: Tx,
	pub block_height: ExternalBlockHeight,
	pub vault_pub_key: VaultPubKey,
	/// Signers that saw the transaction before it was final.
	pub signers: Vec<AccountId>,
	/// Signers that saw the transaction as final.
	pub final_signers: Vec<AccountId>,
}

impl<AccountId: PartialEq + Clone> Ballot<AccountId> {
	fn new(observed: &ObservedTx) -> Self {
		Ballot {
			tx: observed.tx.clone(),
			block_height: observed.block_height,
			vault_pub_key: observed.vault_pub_key.clone(),
			signers: Vec::new(),
			final_signers: Vec::new(),
		}
	}

	fn matches(&self, observed: &ObservedTx) -> bool {
		self.tx == observed.tx &&
			self.block_height == observed.block_height &&
			self.vault_pub_key == observed.vault_pub_key
	}

	pub fn has_signed(&self, who: &AccountId) -> bool {
		self.signers.contains(who) || self.final_signers.contains(who)
	}

	/// Distinct signers, final or not.
	pub fn vote_count(&self) -> u32 {
		let early = self.signers.iter().filter(|who| !self.final_signers.contains(who)).count();
		(early + self.final_signers.len()) as u32
	}

	fn observed(&self, finalised: bool) -> ObservedTx {
		ObservedTx {
			tx: self.tx.clone(),
			block_height: self.block_height,
			vault_pub_key: self.vault_pub_key.clone(),
			finalised,
		}
	}
}

/// Everything known about one transaction: the votes on it and, for inbounds, the outbounds
/// scheduled and sent on its behalf.
#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct ObservedTxVoter<AccountId> {
	pub tx_id: TxId,
	pub ballots: Vec<Ballot<AccountId>>,
	/// The body a majority agreed on.
	pub tx: Option<ObservedTx>,
	/// Block at which consensus was reached.
	pub height: u64,
	/// Block at which the transaction was accepted as final.
	pub finalised_height: u64,
	/// The vault was credited. Set at most once.
	pub updated_vault: bool,
	pub reverted: bool,
	pub status: VoterStatus,
	/// Outbounds scheduled on behalf of this transaction.
	pub actions: Vec<TxOutItem>,
	/// Block at which the first action was scheduled.
	pub actions_generated_at: u64,
	/// Outbounds observed leaving the vaults.
	pub out_txs: Vec<Tx>,
}

/// What a single observation changed.
#[derive(Copy, Clone, Default, RuntimeDebug, PartialEq, Eq)]
pub struct Progress {
	pub consensus: bool,
	pub finalised: bool,
}

impl Progress {
	pub fn any(&self) -> bool {
		self.consensus || self.finalised
	}
}

impl<AccountId: PartialEq + Clone> ObservedTxVoter<AccountId> {
	pub fn new(tx_id: TxId) -> Self {
		ObservedTxVoter {
			tx_id,
			ballots: Vec::new(),
			tx: None,
			height: 0,
			finalised_height: 0,
			updated_vault: false,
			reverted: false,
			status: VoterStatus::Observing,
			actions: Vec::new(),
			actions_generated_at: 0,
			out_txs: Vec::new(),
		}
	}

	/// A native transaction needs no votes: it is final as soon as it is included.
	pub fn native(tx: Tx, height: u64) -> Self {
		let tx_id = tx.id;
		ObservedTxVoter {
			tx: Some(ObservedTx {
				tx,
				block_height: height,
				vault_pub_key: Default::default(),
				finalised: true,
			}),
			height,
			finalised_height: height,
			updated_vault: true,
			status: VoterStatus::Finalised,
			..Self::new(tx_id)
		}
	}

	/// Records a submission. Returns `false` if the signer already submitted the same thing, or
	/// has backed a different version of the transaction.
	pub fn add(&mut self, observed: &ObservedTx, signer: &AccountId) -> bool {
		if self.ballots.iter().any(|ballot| !ballot.matches(observed) && ballot.has_signed(signer))
		{
			log::warn!(
				target: "mc-observation",
				"Conflicting observation of {:?} ignored.",
				self.tx_id,
			);
			return false
		}
		let index = match self.ballots.iter().position(|ballot| ballot.matches(observed)) {
			Some(index) => index,
			None => {
				self.ballots.push(Ballot::new(observed));
				self.ballots.len() - 1
			},
		};
		let ballot = &mut self.ballots[index];
		let signers =
			if observed.finalised { &mut ballot.final_signers } else { &mut ballot.signers };
		if signers.contains(signer) {
			return false
		}
		signers.push(signer.clone());
		true
	}

	/// The ballot backed by a majority of `share_count` validators, if any.
	pub fn consensus_ballot(&self, share_count: u32) -> Option<&Ballot<AccountId>> {
		self.ballots.iter().find(|ballot| has_consensus(ballot.vote_count(), share_count))
	}

	/// The ballot that a majority of `share_count` validators saw as final, if any.
	pub fn finalised_ballot(&self, share_count: u32) -> Option<&Ballot<AccountId>> {
		self.ballots
			.iter()
			.find(|ballot| has_consensus(ballot.final_signers.len() as u32, share_count))
	}

	pub fn is_winner(&self, observed: &ObservedTx) -> bool {
		self.tx.as_ref().is_some_and(|winner| winner.same_body(observed))
	}

	pub fn has_consensus(&self) -> bool {
		self.height > 0
	}

	pub fn is_finalised(&self) -> bool {
		self.finalised_height > 0
	}
}

impl<T: Config> Pallet<T> {
	/// Adds `signer`'s observation to `voter` and settles the signer's slash points.
	///
	/// Every accepted observation costs `ObserveSlashPoints`. The cost is returned to everyone who
	/// backed the winning body when it first reaches consensus (for early observations) or
	/// finality (for final ones), and to stragglers who observe the winning body within
	/// `ObservationDelayFlexibility` blocks of that point.
	pub(crate) fn vote(
		voter: &mut ObservedTxVoter<T::AccountId>,
		signer: &T::AccountId,
		observed: &ObservedTx,
		labels: SlashLabels,
		share_count: u32,
	) -> Progress {
		let mut progress = Progress::default();
		if !voter.add(observed, signer) {
			return progress
		}
		let points = T::Mimir::get_u64(MimirKey::ObserveSlashPoints);
		let flexibility = T::Mimir::get_u64(MimirKey::ObservationDelayFlexibility);
		let now = Self::current_height();
		let relieve = |signers: &[T::AccountId]| {
			for who in signers {
				T::Slasher::dec_slash_points(who, points, labels);
			}
		};
		T::Slasher::inc_slash_points(signer, points, labels);

		if !voter.is_finalised() {
			if let Some(ballot) = voter.finalised_ballot(share_count).cloned() {
				if !voter.has_consensus() {
					voter.height = now;
					relieve(&ballot.signers);
					progress.consensus = true;
				}
				voter.finalised_height = now;
				voter.tx = Some(ballot.observed(true));
				voter.status = VoterStatus::Finalised;
				relieve(&ballot.final_signers);
				progress.finalised = true;
				return progress
			}
		}

		if !voter.has_consensus() {
			if let Some(ballot) = voter.consensus_ballot(share_count).cloned() {
				voter.height = now;
				voter.tx = Some(ballot.observed(false));
				voter.status = VoterStatus::Consensus;
				relieve(&ballot.signers);
				progress.consensus = true;
				return progress
			}
			return progress
		}

		if voter.is_winner(observed) {
			let (since, late) = if observed.finalised {
				(voter.finalised_height, voter.is_finalised())
			} else {
				(voter.height, true)
			};
			if late && now <= since.saturating_add(flexibility) {
				relieve(core::slice::from_ref(signer));
			}

			let delay = T::Mimir::get_u64(MimirKey::ConfirmationDelayBlocks);
			if !voter.is_finalised() && delay > 0 && now >= voter.height.saturating_add(delay) {
				voter.finalised_height = now;
				voter.status = VoterStatus::Finalised;
				if let Some(winner) = voter.tx.as_mut() {
					winner.finalised = true;
				}
				progress.finalised = true;
			}
		}
		progress
	}
}
