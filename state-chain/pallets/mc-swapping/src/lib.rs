#![cfg_attr(not(feature = "std"), no_std)]

//! Swap queue, streaming swaps and affiliate fees.
//!
//! Swaps requested through [SwapApi] are validated up front and queued. The queue is drained at
//! the end of every block in `(tx_id, index)` order, and each swap runs in its own storage layer
//! so that a failure rolls back cleanly and turns into a refund.
//!
//! A streaming swap is split into slices that run every `interval` blocks until the deposit is
//! used up. Its progress is kept in [StreamingSwaps] after completion, so replaying the same
//! inbound is rejected.
//!
//! Affiliate fees are skimmed from the input before the first slice and paid in CACAO. Names with
//! a non-CACAO preferred asset accrue their fees in the Affiliate Collector until the balance is
//! worth an outbound, at which point it is swapped to the preferred asset.

extern crate alloc;

use alloc::string::{String, ToString};
use frame_support::{
	pallet_prelude::*, sp_runtime::SaturatedConversion, storage::with_storage_layer, Hashable,
};
use frame_system::pallet_prelude::BlockNumberFor;
use mc_amm::{bps_share, get_safe_share, synth_supply_exceeds_cap};
use mc_memo::{outbound_memo, refund_memo, AddLiquidityMemo, Affiliate, DexAggregation, SwapMemo};
use mc_primitives::{
	Address, Asset, AssetAmount, BasisPoints, Behaviour, Chain, Coin, LedgerAccount, MimirKey,
	ModuleName, RefundReason, TxId, MAX_BASIS_POINTS,
};
use mc_traits::{
	AddLiquidityRequest, AddressConverter, AffiliateEntry, AffiliateFeeApi, AffiliateShare,
	CacaoPoolApi, GasManager, Ledger, LiquidityApi, Mimir, NameRegistry, PoolApi, ResolvedName,
	SwapApi, SwapOrigin, SwapRequest, SwapResult, TradeAccountApi, TxOutItem, TxOutStore,
};
use serde::{Deserialize, Serialize};
use sp_std::{vec, vec::Vec};

pub use pallet::*;

#[cfg(test)]
mod mock;

pub const PALLET_VERSION: StorageVersion = StorageVersion::new(0);

/// How many levels of sub-affiliates are followed when splitting a fee.
pub const MAX_AFFILIATE_DEPTH: usize = 3;

const AFFILIATE_COLLECTOR_PAYOUT: &[u8] = b"affiliate-collector";

mc_traits::impl_pallet_safe_mode!(PalletSafeMode; swapping_enabled);

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct QueuedSwap {
	pub request: SwapRequest,
	/// The native block at the end of which the swap, or its next slice, runs.
	pub execute_at: u64,
	/// The affiliate fee has been taken from `request.source`.
	pub affiliates_paid: bool,
}

/// Progress of a swap that is split into slices.
#[derive(Clone, RuntimeDebug, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
pub struct StreamingSwap {
	pub interval: u64,
	pub quantity: u64,
	/// Slices that succeeded.
	pub count: u64,
	pub trade_target: AssetAmount,
	pub deposit: AssetAmount,
	pub in_amount: AssetAmount,
	pub out_amount: AssetAmount,
	pub failed_swaps: u64,
}

impl StreamingSwap {
	pub fn is_done(&self) -> bool {
		self.count >= self.quantity || self.in_amount >= self.deposit
	}

	/// Size and minimum output of the next slice. The last slice takes whatever is left.
	pub fn next_slice(&self) -> (AssetAmount, AssetAmount) {
		let remaining_in = self.deposit.saturating_sub(self.in_amount);
		let remaining_slices = self.quantity.saturating_sub(self.count).max(1);
		let size = if remaining_slices == 1 {
			remaining_in
		} else {
			(self.deposit / AssetAmount::from(self.quantity.max(1))).min(remaining_in)
		};
		let limit = self.trade_target.saturating_sub(self.out_amount) /
			AssetAmount::from(remaining_slices);
		(size, limit)
	}
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
	pub from: Asset,
	pub to: Asset,
	pub amount: AssetAmount,
	pub destination: Option<Address>,
	pub streaming_interval: u64,
	pub streaming_quantity: u64,
	pub affiliate: Option<Vec<u8>>,
	pub affiliate_bps: Option<BasisPoints>,
}

/// Fees of a quoted swap, all in units of the target asset.
#[derive(Clone, RuntimeDebug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteFees {
	pub asset: Asset,
	pub affiliate: AssetAmount,
	pub liquidity: AssetAmount,
	pub outbound: AssetAmount,
	pub total: AssetAmount,
	pub total_bps: BasisPoints,
}

#[derive(Clone, RuntimeDebug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResponse {
	pub expected_amount_out: AssetAmount,
	pub fees: QuoteFees,
	pub slippage_bps: BasisPoints,
	pub streaming_swap_blocks: u64,
	pub max_streaming_quantity: u64,
	/// The memo to send, when a destination was given.
	pub memo: Option<String>,
}

#[frame_support::pallet]
pub mod pallet {
	use super::*;

	#[pallet::config]
	#[pallet::disable_frame_system_supertrait_check]
	pub trait Config: mc_traits::Mayachain {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		type Ledger: Ledger<AccountId = Self::AccountId>;

		type PoolApi: PoolApi;

		type LiquidityApi: LiquidityApi;

		type TxOutStore: TxOutStore;

		type NameRegistry: NameRegistry<AccountId = Self::AccountId>;

		type AddressConverter: AddressConverter<AccountId = Self::AccountId>;

		type GasManager: GasManager;

		/// Receives its share of every swap's liquidity fee.
		type CacaoPoolApi: CacaoPoolApi<AccountId = Self::AccountId>;

		/// Credited with trade-asset outputs.
		type TradeAccountApi: TradeAccountApi<AccountId = Self::AccountId>;

		type SafeMode: Get<PalletSafeMode>;
	}

	#[pallet::pallet]
	#[pallet::storage_version(PALLET_VERSION)]
	#[pallet::without_storage_info]
	pub struct Pallet<T>(PhantomData<T>);

	/// Swaps waiting to run, keyed by inbound tx and sub-index.
	#[pallet::storage]
	pub type SwapQueue<T: Config> =
		StorageDoubleMap<_, Twox64Concat, TxId, Twox64Concat, u8, QueuedSwap, OptionQuery>;

	#[pallet::storage]
	pub type StreamingSwaps<T: Config> =
		StorageMap<_, Twox64Concat, TxId, StreamingSwap, OptionQuery>;

	/// CACAO held in the Affiliate Collector on behalf of each owner.
	#[pallet::storage]
	pub type AffiliateCollectors<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, AssetAmount, ValueQuery>;

	#[pallet::event]
	#[pallet::generate_deposit(pub(super) fn deposit_event)]
	pub enum Event<T: Config> {
		SwapScheduled { tx_id: TxId, index: u8, source: Coin, target: Asset, execute_at: u64 },
		SwapExecuted {
			tx_id: TxId,
			source: Coin,
			target: Asset,
			emitted: AssetAmount,
			liquidity_fee_in_cacao: AssetAmount,
			slip_bps: BasisPoints,
		},
		StreamingSwapSlice {
			tx_id: TxId,
			count: u64,
			quantity: u64,
			input: AssetAmount,
			output: AssetAmount,
		},
		StreamingSwapSliceFailed { tx_id: TxId, failed_swaps: u64, error: DispatchError },
		StreamingSwapCompleted {
			tx_id: TxId,
			in_amount: AssetAmount,
			out_amount: AssetAmount,
			deposit: AssetAmount,
		},
		SwapRefunded { tx_id: TxId, coin: Coin, reason: RefundReason },
		AffiliateFeePaid { tx_id: TxId, name: Vec<u8>, amount: AssetAmount },
		AffiliateFeeAccrued {
			tx_id: TxId,
			name: Vec<u8>,
			owner: T::AccountId,
			amount: AssetAmount,
			total: AssetAmount,
		},
		AffiliateCollectorPayoutScheduled {
			owner: T::AccountId,
			tx_id: TxId,
			amount: AssetAmount,
			preferred_asset: Asset,
		},
		/// The swap leg stands. The emitted coin was returned to the sender.
		SwapThenAddFailed { tx_id: TxId, error: DispatchError },
		/// Neither delivery nor refund was possible. The coin remains in Asgard.
		SwapFundsHeld { tx_id: TxId, coin: Coin, error: DispatchError },
	}

	#[pallet::error]
	pub enum Error<T> {
		SwappingDisabled,
		ZeroAmount,
		TradingHalted,
		LiquidityAuctionActive,
		TooManyAffiliates,
		AffiliateFeeTooHigh,
		/// An affiliate is neither a registered name nor a native address.
		UnknownAffiliate,
		/// Protocol modules cannot be the destination of a swap.
		DisallowedDestination,
		SynthSwapsDisabled,
		DexAggregationDisabled,
		DexAggregationTargetNotGasAsset,
		UnknownDexAggregator,
		InvalidTargetAsset,
		PoolNotAvailable,
		StreamingSwapsPaused,
		/// A streaming swap for this inbound has already run.
		StreamingSwapCompleted,
		DuplicateSwap,
		SynthSupplyCapExceeded,
		LiquidityCapReached,
		LiquidityExceedsBond,
		SwapLimitNotMet,
		InvalidDestination,
		/// Every sub-index of the inbound is taken.
		QueueFull,
		/// Fees would consume the whole output.
		QuoteOutputTooLow,
		/// The name has no address on the chain of its preferred asset.
		MissingPreferredAssetAlias,
	}

	#[pallet::hooks]
	impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
		fn on_finalize(_block_number: BlockNumberFor<T>) {
			if !T::SafeMode::get().swapping_enabled {
				log::info!(target: "mc-swapping", "Swapping is disabled. Queued swaps are held.");
				return
			}
			for (tx_id, index, queued) in SwapQueueCursor::<T>::new(Self::current_height()) {
				SwapQueue::<T>::remove(tx_id, index);
				Self::process_queued_swap(index, queued);
			}
		}
	}
}

/// Walks the swaps due at `now` in key order.
///
/// Keys are collected up front so the queue can be changed while iterating. Entries removed in the
/// meantime are skipped, entries added are left for the next cursor.
pub struct SwapQueueCursor<T: Config> {
	keys: vec::IntoIter<(TxId, u8)>,
	now: u64,
	_phantom: PhantomData<T>,
}

impl<T: Config> SwapQueueCursor<T> {
	pub fn new(now: u64) -> Self {
		let mut keys = SwapQueue::<T>::iter_keys().collect::<Vec<_>>();
		keys.sort();
		SwapQueueCursor { keys: keys.into_iter(), now, _phantom: PhantomData }
	}
}

impl<T: Config> Iterator for SwapQueueCursor<T> {
	type Item = (TxId, u8, QueuedSwap);

	fn next(&mut self) -> Option<Self::Item> {
		let now = self.now;
		self.keys.by_ref().find_map(|(tx_id, index)| {
			SwapQueue::<T>::get(tx_id, index)
				.filter(|queued| queued.execute_at <= now)
				.map(|queued| (tx_id, index, queued))
		})
	}
}

impl<T: Config> Pallet<T> {
	fn current_height() -> u64 {
		frame_system::Pallet::<T>::block_number().saturated_into()
	}

	pub fn streaming_swap(tx_id: TxId) -> Option<StreamingSwap> {
		StreamingSwaps::<T>::get(tx_id)
	}

	/// CACAO accrued for `owner` and not yet swapped to their preferred asset.
	pub fn affiliate_collector(owner: &T::AccountId) -> AssetAmount {
		AffiliateCollectors::<T>::get(owner)
	}

	/// Every queued swap in execution order, due or not.
	pub fn queued_swaps() -> Vec<(TxId, u8, QueuedSwap)> {
		SwapQueueCursor::<T>::new(u64::MAX).collect()
	}

	/// Puts `request` in the first free slot for its tx id.
	pub fn queue_swap(request: SwapRequest, execute_at: u64) -> DispatchResult {
		let tx_id = request.tx_id;
		let index = (0..=u8::MAX)
			.find(|index| !SwapQueue::<T>::contains_key(tx_id, index))
			.ok_or(Error::<T>::QueueFull)?;
		let (source, target) = (request.source.clone(), request.memo.target.clone());
		SwapQueue::<T>::insert(
			tx_id,
			index,
			QueuedSwap { request, execute_at, affiliates_paid: false },
		);
		Self::deposit_event(Event::SwapScheduled { tx_id, index, source, target, execute_at });
		Ok(())
	}

	/// Simulates a swap, including the affiliate skim and streaming, without changing state.
	pub fn quote_swap(request: QuoteRequest) -> Result<QuoteResponse, DispatchError> {
		let QuoteRequest { from, to, amount, .. } = &request;
		ensure!(*amount > 0, Error::<T>::ZeroAmount);
		for asset in [from, to] {
			ensure!(
				asset.is_cacao() || T::PoolApi::is_pool_available(asset),
				Error::<T>::PoolNotAvailable
			);
		}

		let affiliate_bps = match &request.affiliate {
			Some(name) => request
				.affiliate_bps
				.or_else(|| T::NameRegistry::resolve(name).map(|resolved| resolved.affiliate_bps))
				.unwrap_or_default(),
			None => 0,
		};
		ensure!(
			affiliate_bps <= T::Mimir::get_bps(MimirKey::MaxAffiliateFeeBasisPoints),
			Error::<T>::AffiliateFeeTooHigh
		);
		let affiliate_amount = bps_share(affiliate_bps, *amount);
		let swap_amount = amount.saturating_sub(affiliate_amount);

		let is_streaming = request.streaming_interval > 0;
		let max_streaming_quantity = Self::max_streaming_quantity(from, to, swap_amount);
		let quantity = match request.streaming_quantity {
			_ if !is_streaming => 1,
			0 => max_streaming_quantity,
			quantity => quantity.min(max_streaming_quantity),
		};

		let slice = T::PoolApi::quote_swap(from, to, swap_amount / AssetAmount::from(quantity))?;
		let emitted = slice.emitted.saturating_mul(quantity.into());
		let liquidity = T::PoolApi::value_in_asset(slice.liquidity_fee_in_cacao, to)
			.saturating_mul(quantity.into());
		let affiliate =
			T::PoolApi::value_in_asset(T::PoolApi::value_in_cacao(from, affiliate_amount), to);
		let outbound = if to.is_native_settled() { 0 } else { T::GasManager::outbound_fee(to) };
		let expected_amount_out = emitted.saturating_sub(outbound);
		ensure!(expected_amount_out > 0, Error::<T>::QuoteOutputTooLow);

		let total = affiliate.saturating_add(liquidity).saturating_add(outbound);
		let memo = request.destination.as_ref().filter(|dest| !dest.is_empty()).map(|dest| {
			let mut memo = SwapMemo::new(to.clone(), dest.clone());
			if is_streaming {
				memo.stream_interval = request.streaming_interval;
				memo.stream_quantity = request.streaming_quantity;
			}
			memo.affiliates = request
				.affiliate
				.iter()
				.map(|name| Affiliate { name: name.clone(), bps: request.affiliate_bps })
				.collect();
			memo.to_string()
		});

		Ok(QuoteResponse {
			expected_amount_out,
			fees: QuoteFees {
				asset: to.clone(),
				affiliate,
				liquidity,
				outbound,
				total,
				total_bps: bps_of(total, emitted.saturating_add(total)),
			},
			slippage_bps: bps_of(liquidity, emitted.saturating_add(liquidity)),
			streaming_swap_blocks: if is_streaming {
				request.streaming_interval.saturating_mul(quantity.saturating_sub(1))
			} else {
				0
			},
			max_streaming_quantity,
			memo,
		})
	}

	fn destination(request: &SwapRequest) -> &Address {
		if request.memo.destination.is_empty() {
			&request.from_address
		} else {
			&request.memo.destination
		}
	}

	fn ensure_trading(source: &Asset, target: &Asset) -> DispatchResult {
		for asset in [source, target] {
			ensure!(!T::Mimir::is_trading_halted(asset.chain), Error::<T>::TradingHalted);
		}
		Ok(())
	}

	fn validate(request: &SwapRequest) -> DispatchResult {
		ensure!(T::SafeMode::get().swapping_enabled, Error::<T>::SwappingDisabled);
		let source = &request.source.asset;
		let memo = &request.memo;
		let target = &memo.target;

		ensure!(request.source.amount > 0, Error::<T>::ZeroAmount);
		Self::ensure_trading(source, target)?;
		ensure!(
			!T::Mimir::is_enabled(MimirKey::LiquidityAuction),
			Error::<T>::LiquidityAuctionActive
		);
		Self::validate_affiliates(&memo.affiliates)?;

		if request.origin != SwapOrigin::AffiliateCollector {
			ensure!(
				T::AddressConverter::to_module(&memo.destination).is_none(),
				Error::<T>::DisallowedDestination
			);
			ensure!(
				!(target.is_synth() && T::Mimir::is_enabled(MimirKey::ManualSwapsToSynthDisabled)),
				Error::<T>::SynthSwapsDisabled
			);
		}
		if let Some(dex_aggregation) = &memo.dex_aggregation {
			Self::validate_dex_aggregation(target, dex_aggregation)?;
		}
		if let Some(add_liquidity) = &request.add_liquidity {
			Self::validate_add_liquidity_target(target, add_liquidity)?;
		}

		ensure!(
			target != source && !(target.chain.is_native() && !target.is_layer1()),
			Error::<T>::InvalidTargetAsset
		);
		for asset in [source, target] {
			ensure!(
				asset.is_cacao() || T::PoolApi::is_pool_available(asset),
				Error::<T>::PoolNotAvailable
			);
		}
		Self::validate_destination(request)?;

		ensure!(
			SwapQueue::<T>::iter_key_prefix(request.tx_id).next().is_none(),
			Error::<T>::DuplicateSwap
		);
		if memo.is_streaming() {
			ensure!(
				!T::Mimir::is_enabled(MimirKey::StreamingSwapPause),
				Error::<T>::StreamingSwapsPaused
			);
			ensure!(
				!StreamingSwaps::<T>::contains_key(request.tx_id),
				Error::<T>::StreamingSwapCompleted
			);
		}
		if target.is_synth() {
			Self::validate_synth_mint(request)?;
		}
		Ok(())
	}

	fn validate_affiliates(affiliates: &[Affiliate]) -> DispatchResult {
		ensure!(
			affiliates.len() as u64 <= T::Mimir::get_u64(MimirKey::MultipleAffiliatesMaxCount),
			Error::<T>::TooManyAffiliates
		);
		let mut total_bps: u32 = 0;
		for affiliate in affiliates {
			let bps = match T::NameRegistry::resolve(&affiliate.name) {
				Some(resolved) => affiliate.bps.unwrap_or(resolved.affiliate_bps),
				None => {
					ensure!(
						T::AddressConverter::to_ledger_account(&Address(affiliate.name.clone()))
							.is_some(),
						Error::<T>::UnknownAffiliate
					);
					affiliate.bps.unwrap_or_default()
				},
			};
			total_bps = total_bps.saturating_add(u32::from(bps));
		}
		ensure!(
			total_bps <= u32::from(T::Mimir::get_bps(MimirKey::MaxAffiliateFeeBasisPoints)),
			Error::<T>::AffiliateFeeTooHigh
		);
		Ok(())
	}

	fn validate_dex_aggregation(
		target: &Asset,
		dex_aggregation: &DexAggregation,
	) -> DispatchResult {
		ensure!(
			!T::Mimir::is_enabled(MimirKey::SwapOutDexAggregationDisabled),
			Error::<T>::DexAggregationDisabled
		);
		ensure!(
			target.is_gas_asset() && !target.is_native_settled(),
			Error::<T>::DexAggregationTargetNotGasAsset
		);
		ensure!(
			T::Mimir::is_dex_aggregator(&dex_aggregation.aggregator),
			Error::<T>::UnknownDexAggregator
		);
		Ok(())
	}

	fn validate_add_liquidity_target(
		target: &Asset,
		add_liquidity: &AddLiquidityMemo,
	) -> DispatchResult {
		ensure!(
			target.is_cacao() ||
				(target.is_layer1() && *target == add_liquidity.asset.get_layer1_asset()),
			Error::<T>::InvalidTargetAsset
		);
		Ok(())
	}

	fn validate_destination(request: &SwapRequest) -> DispatchResult {
		let target = &request.memo.target;
		let destination = Self::destination(request);
		if request.add_liquidity.is_some() || destination.is_noop() {
			return Ok(())
		}
		let is_valid = if target.is_trade() {
			T::AddressConverter::to_account_id(destination).is_some()
		} else if target.is_native_settled() {
			T::AddressConverter::to_ledger_account(destination).is_some()
		} else {
			!request.memo.destination.is_empty() ||
				request.source.asset.settlement_chain() == target.chain
		};
		ensure!(is_valid, Error::<T>::InvalidDestination);
		Ok(())
	}

	/// Caps on minting a synth: total pooled liquidity, bond coverage and synth supply.
	fn validate_synth_mint(request: &SwapRequest) -> DispatchResult {
		let source = &request.source;
		let target = &request.memo.target;

		let total_pooled = T::PoolApi::total_pooled_cacao()
			.saturating_add(T::PoolApi::value_in_cacao(&source.asset, source.amount));
		let max_liquidity = T::Mimir::get_amount(MimirKey::MaximumLiquidityCacao);
		ensure!(
			max_liquidity == 0 || total_pooled <= max_liquidity,
			Error::<T>::LiquidityCapReached
		);
		if T::Mimir::is_enabled(MimirKey::EnsureLiquidityNoLargerThanBond) {
			ensure!(
				total_pooled.saturating_mul(2) <=
					T::Mimir::get_amount(MimirKey::TotalEffectiveBond),
				Error::<T>::LiquidityExceedsBond
			);
		}

		let simulated = T::PoolApi::quote_swap(&source.asset, target, source.amount)
			.map(|result| result.emitted)
			.unwrap_or_default();
		Self::ensure_synth_cap(target, simulated)
	}

	fn ensure_synth_cap(synth: &Asset, additional: AssetAmount) -> DispatchResult {
		let depths = T::PoolApi::pool_depths(synth).ok_or(Error::<T>::PoolNotAvailable)?;
		ensure!(
			!synth_supply_exceeds_cap(
				T::PoolApi::synth_supply(synth).saturating_add(additional),
				depths.asset,
				T::Mimir::get_bps(MimirKey::MaxSynthPerPoolDepth),
			),
			Error::<T>::SynthSupplyCapExceeded
		);
		Ok(())
	}

	fn max_streaming_quantity(source: &Asset, target: &Asset, deposit: AssetAmount) -> u64 {
		let input_depth = if source.is_cacao() {
			T::PoolApi::pool_depths(target).map(|depths| depths.cacao)
		} else {
			T::PoolApi::pool_depths(source).map(|depths| depths.asset)
		}
		.unwrap_or_default();
		mc_amm::max_streaming_quantity(
			deposit,
			input_depth,
			T::Mimir::get_bps(MimirKey::StreamingSwapMinBPFee),
			T::Mimir::behaviour().price_impact_streaming_quantity,
		)
	}

	fn new_streaming_swap(request: &SwapRequest) -> StreamingSwap {
		let source = &request.source.asset;
		let target = &request.memo.target;
		let deposit = request.source.amount;

		let max_length = if source.is_native_settled() && target.is_native_settled() {
			MimirKey::StreamingSwapMaxLengthNative
		} else {
			MimirKey::StreamingSwapMaxLength
		};
		let interval = request.memo.stream_interval.min(T::Mimir::get_u64(max_length));
		let max_quantity = Self::max_streaming_quantity(source, target, deposit);
		let quantity = match request.memo.stream_quantity {
			0 => max_quantity,
			quantity => quantity.min(max_quantity),
		}
		.min(deposit.saturated_into())
		.max(1);

		StreamingSwap {
			interval,
			quantity,
			count: 0,
			trade_target: request.memo.trade_target,
			deposit,
			in_amount: 0,
			out_amount: 0,
			failed_swaps: 0,
		}
	}

	fn process_queued_swap(index: u8, mut queued: QueuedSwap) {
		if !queued.affiliates_paid {
			let skimmed = Self::skim_affiliate_fees(&queued.request);
			queued.request.source.amount = queued.request.source.amount.saturating_sub(skimmed);
			queued.affiliates_paid = true;
		}

		if queued.request.memo.is_streaming() {
			return Self::process_streaming_slice(index, queued)
		}

		let request = &queued.request;
		let result = with_storage_layer(|| {
			let result =
				Self::execute_swap(request, request.source.amount, request.memo.trade_target)?;
			if request.add_liquidity.is_none() {
				Self::pay_output(request, result.emitted)?;
			}
			Ok::<_, DispatchError>(result)
		});
		match result {
			Ok(result) =>
				if request.add_liquidity.is_some() {
					Self::complete_swap(request, result.emitted);
				},
			Err(error) => {
				log::debug!(
					target: "mc-swapping",
					"Swap {:?} failed: {error:?}. Refunding.",
					request.tx_id,
				);
				Self::refund(request, request.source.clone(), Self::refund_reason(&error));
			},
		}
	}

	fn refund_reason(error: &DispatchError) -> RefundReason {
		if *error == Error::<T>::SwapLimitNotMet.into() {
			RefundReason::SwapLimitNotMet
		} else if *error == Error::<T>::TradingHalted.into() {
			RefundReason::TradingHalted
		} else {
			RefundReason::SwapFailed
		}
	}

	fn execute_swap(
		request: &SwapRequest,
		amount: AssetAmount,
		limit: AssetAmount,
	) -> Result<SwapResult, DispatchError> {
		let source = &request.source.asset;
		let target = &request.memo.target;
		Self::ensure_trading(source, target)?;

		let result = T::PoolApi::swap(source, target, amount)?;
		ensure!(result.emitted >= limit, Error::<T>::SwapLimitNotMet);
		for (pool, liquidity_fee_in_cacao) in &result.legs {
			T::CacaoPoolApi::accrue_swap_fee(pool, *liquidity_fee_in_cacao);
		}
		if target.is_synth() {
			Self::ensure_synth_cap(target, 0)?;
		}

		Self::deposit_event(Event::SwapExecuted {
			tx_id: request.tx_id,
			source: Coin::new(source.clone(), amount),
			target: target.clone(),
			emitted: result.emitted,
			liquidity_fee_in_cacao: result.liquidity_fee_in_cacao,
			slip_bps: result.slip_bps,
		});
		Ok(result)
	}

	fn process_streaming_slice(index: u8, queued: QueuedSwap) {
		let tx_id = queued.request.tx_id;
		let now = Self::current_height();
		if T::Mimir::is_enabled(MimirKey::StreamingSwapPause) {
			SwapQueue::<T>::insert(tx_id, index, QueuedSwap { execute_at: now + 1, ..queued });
			return
		}

		let request = &queued.request;
		let mut stream =
			StreamingSwaps::<T>::get(tx_id).unwrap_or_else(|| Self::new_streaming_swap(request));
		let (size, limit) = stream.next_slice();
		match with_storage_layer(|| Self::execute_swap(request, size, limit)) {
			Ok(result) => {
				stream.count += 1;
				stream.in_amount = stream.in_amount.saturating_add(size);
				stream.out_amount = stream.out_amount.saturating_add(result.emitted);
				Self::deposit_event(Event::StreamingSwapSlice {
					tx_id,
					count: stream.count,
					quantity: stream.quantity,
					input: size,
					output: result.emitted,
				});
			},
			Err(error) => {
				stream.failed_swaps += 1;
				Self::deposit_event(Event::StreamingSwapSliceFailed {
					tx_id,
					failed_swaps: stream.failed_swaps,
					error,
				});
			},
		}
		StreamingSwaps::<T>::insert(tx_id, &stream);

		if stream.is_done() ||
			stream.failed_swaps >= T::Mimir::get_u64(MimirKey::StreamingSwapMaxFailures)
		{
			Self::settle_streaming_swap(request, &stream);
		} else {
			let execute_at = now.saturating_add(stream.interval.max(1));
			SwapQueue::<T>::insert(tx_id, index, QueuedSwap { execute_at, ..queued });
		}
	}

	fn settle_streaming_swap(request: &SwapRequest, stream: &StreamingSwap) {
		Self::deposit_event(Event::StreamingSwapCompleted {
			tx_id: request.tx_id,
			in_amount: stream.in_amount,
			out_amount: stream.out_amount,
			deposit: stream.deposit,
		});
		let remainder = stream.deposit.saturating_sub(stream.in_amount);
		Self::refund(
			request,
			Coin::new(request.source.asset.clone(), remainder),
			RefundReason::SwapFailed,
		);
		if stream.out_amount > 0 {
			Self::complete_swap(request, stream.out_amount);
		}
	}

	/// Delivers the output of a finished swap, or adds it to a pool.
	fn complete_swap(request: &SwapRequest, emitted: AssetAmount) {
		match &request.add_liquidity {
			Some(add_liquidity) => {
				if let Err(error) = with_storage_layer(|| {
					Self::add_swapped_liquidity(request, add_liquidity, emitted)
				}) {
					Self::deposit_event(Event::SwapThenAddFailed { tx_id: request.tx_id, error });
					let recipients = core::iter::once(Self::destination(request))
						.chain(add_liquidity.pair_address.as_ref())
						.collect::<Vec<_>>();
					Self::return_output(
						request,
						Coin::new(request.memo.target.clone(), emitted),
						&recipients,
						RefundReason::LiquidityFailed,
					);
				}
			},
			None =>
				if let Err(error) = with_storage_layer(|| Self::pay_output(request, emitted)) {
					log::warn!(
						target: "mc-swapping",
						"Failed to pay out swap {:?}: {error:?}. Refunding.",
						request.tx_id,
					);
					Self::return_output(
						request,
						Coin::new(request.memo.target.clone(), emitted),
						&[],
						RefundReason::SwapFailed,
					);
				},
		}
	}

	/// Hands back the output of a swap that could not be delivered as requested.
	///
	/// The coin goes to the first of `recipients` able to receive it. Failing that, it is swapped
	/// back to the source asset and refunded. If even that fails, the coin stays in Asgard and
	/// [Event::SwapFundsHeld] is emitted.
	fn return_output(
		request: &SwapRequest,
		coin: Coin,
		recipients: &[&Address],
		reason: RefundReason,
	) {
		if coin.is_empty() {
			return
		}
		let tx_id = request.tx_id;
		for to in recipients {
			if with_storage_layer(|| {
				Self::send_coin(tx_id, to, coin.clone(), refund_memo(&tx_id), None)
			})
			.is_ok()
			{
				return Self::deposit_event(Event::SwapRefunded { tx_id, coin, reason })
			}
		}
		match with_storage_layer(|| Self::swap_back_and_refund(request, &coin)) {
			Ok(refunded) =>
				Self::deposit_event(Event::SwapRefunded { tx_id, coin: refunded, reason }),
			Err(error) => Self::hold(tx_id, coin, error),
		}
	}

	fn swap_back_and_refund(request: &SwapRequest, coin: &Coin) -> Result<Coin, DispatchError> {
		let source = &request.source.asset;
		Self::ensure_trading(&coin.asset, source)?;
		let emitted = T::PoolApi::swap(&coin.asset, source, coin.amount)?.emitted;
		let refund = Coin::new(source.clone(), emitted);
		Self::send_coin(
			request.tx_id,
			request.refund_address(),
			refund.clone(),
			refund_memo(&request.tx_id),
			None,
		)?;
		Ok(refund)
	}

	fn hold(tx_id: TxId, coin: Coin, error: DispatchError) {
		log::error!(
			target: "mc-swapping",
			"Holding {coin} of {tx_id:?} in Asgard: {error:?}",
		);
		Self::deposit_event(Event::SwapFundsHeld { tx_id, coin, error });
	}

	fn add_swapped_liquidity(
		request: &SwapRequest,
		add_liquidity: &AddLiquidityMemo,
		emitted: AssetAmount,
	) -> DispatchResult {
		let address = Some(Self::destination(request).clone());
		let pair_address = add_liquidity.pair_address.clone();
		let (cacao_amount, asset_amount, cacao_address, asset_address) =
			if request.memo.target.is_cacao() {
				(emitted, 0, address, pair_address)
			} else {
				(0, emitted, pair_address, address)
			};
		T::LiquidityApi::add_liquidity(AddLiquidityRequest {
			tx_id: request.tx_id,
			pool: add_liquidity.asset.get_layer1_asset(),
			cacao_amount,
			asset_amount,
			cacao_address,
			asset_address,
		})?;
		Ok(())
	}

	fn pay_output(request: &SwapRequest, emitted: AssetAmount) -> DispatchResult {
		let destination = Self::destination(request);
		if destination.is_noop() {
			return Ok(())
		}
		Self::send_coin(
			request.tx_id,
			destination,
			Coin::new(request.memo.target.clone(), emitted),
			outbound_memo(&request.tx_id),
			request.memo.dex_aggregation.clone(),
		)
	}

	fn refund(request: &SwapRequest, coin: Coin, reason: RefundReason) {
		Self::return_coin(request, request.refund_address().clone(), coin, reason)
	}

	fn return_coin(request: &SwapRequest, to: Address, coin: Coin, reason: RefundReason) {
		if coin.is_empty() {
			return
		}
		let tx_id = request.tx_id;
		match with_storage_layer(|| {
			Self::send_coin(tx_id, &to, coin.clone(), refund_memo(&tx_id), None)
		}) {
			Ok(()) => Self::deposit_event(Event::SwapRefunded { tx_id, coin, reason }),
			Err(error) => Self::hold(tx_id, coin, error),
		}
	}

	/// Trade assets credit a trade account, other native-settled coins move in the ledger, and
	/// everything else leaves through an outbound.
	fn send_coin(
		tx_id: TxId,
		to: &Address,
		coin: Coin,
		memo: Vec<u8>,
		dex_aggregation: Option<DexAggregation>,
	) -> DispatchResult {
		if coin.asset.is_trade() {
			let owner =
				T::AddressConverter::to_account_id(to).ok_or(Error::<T>::InvalidDestination)?;
			T::TradeAccountApi::deposit(&coin.asset, coin.amount, &owner, tx_id)?;
		} else if coin.asset.is_native_settled() {
			let recipient =
				T::AddressConverter::to_ledger_account(to).ok_or(Error::<T>::InvalidDestination)?;
			T::Ledger::transfer(
				&LedgerAccount::Module(ModuleName::Asgard),
				&recipient,
				&coin.asset,
				coin.amount,
			)?;
		} else {
			T::TxOutStore::try_add_tx_out_item(TxOutItem {
				dex_aggregation,
				..TxOutItem::new(tx_id, to.clone(), coin, memo)
			})?;
		}
		Ok(())
	}

	/// Takes the affiliate fee from the input and pays it. Returns the amount taken.
	fn skim_affiliate_fees(request: &SwapRequest) -> AssetAmount {
		if request.origin == SwapOrigin::AffiliateCollector || request.memo.affiliates.is_empty() {
			return 0
		}
		with_storage_layer(|| Self::pay_affiliate_skim(request)).unwrap_or_else(|error| {
			log::warn!(
				target: "mc-swapping",
				"Affiliate fee of {:?} not taken: {error:?}",
				request.tx_id,
			);
			0
		})
	}

	fn pay_affiliate_skim(request: &SwapRequest) -> Result<AssetAmount, DispatchError> {
		let source = &request.source;
		let shares = Self::affiliate_shares(&request.memo.affiliates, source.amount, 0);
		let skimmed = shares.iter().fold(0, |total: AssetAmount, share| total + share.amount);
		if skimmed == 0 {
			return Ok(0)
		}
		if source.asset.is_cacao() {
			return Self::pay_affiliates(ModuleName::Asgard, request.tx_id, shares)
		}

		let cacao = Asset::cacao();
		Self::ensure_trading(&source.asset, &cacao)?;
		let skimmed_cacao = T::PoolApi::swap(&source.asset, &cacao, skimmed)?.emitted;
		let shares = shares
			.into_iter()
			.map(|share| AffiliateShare {
				amount: get_safe_share(share.amount, skimmed, skimmed_cacao),
				..share
			})
			.collect();
		let paid = Self::pay_affiliates(ModuleName::Asgard, request.tx_id, shares)?;
		let unpaid = skimmed_cacao.saturating_sub(paid);
		if unpaid > 0 {
			T::LiquidityApi::donate(&source.asset.get_layer1_asset(), unpaid, 0)?;
		}
		Ok(skimmed)
	}

	fn affiliate_entry(name: &[u8], bps: BasisPoints, depth: usize) -> AffiliateEntry {
		let subaffiliates = match T::NameRegistry::resolve(name) {
			Some(resolved) if depth < MAX_AFFILIATE_DEPTH => resolved
				.subaffiliates
				.iter()
				.map(|(sub, sub_bps)| Self::affiliate_entry(sub, *sub_bps, depth + 1))
				.collect(),
			_ => Vec::new(),
		};
		AffiliateEntry::new(name.to_vec(), bps).with_subaffiliates(subaffiliates)
	}

	fn pay_affiliate_share(
		source: ModuleName,
		tx_id: TxId,
		share: &AffiliateShare,
		behaviour: &Behaviour,
	) -> DispatchResult {
		let from = LedgerAccount::Module(source);
		let cacao = Asset::cacao();
		match T::NameRegistry::resolve(&share.name) {
			Some(resolved)
				if behaviour.affiliate_collector &&
					resolved.preferred_asset.as_ref().is_some_and(|asset| !asset.is_cacao()) =>
			{
				T::Ledger::transfer(
					&from,
					&LedgerAccount::Module(ModuleName::AffiliateCollector),
					&cacao,
					share.amount,
				)?;
				let total = AffiliateCollectors::<T>::mutate(&resolved.owner, |accrued| {
					*accrued = accrued.saturating_add(share.amount);
					*accrued
				});
				Self::deposit_event(Event::AffiliateFeeAccrued {
					tx_id,
					name: share.name.clone(),
					owner: resolved.owner.clone(),
					amount: share.amount,
					total,
				});
				Self::try_collector_payout(&resolved, total);
			},
			resolved => {
				let address = match resolved {
					Some(resolved) => T::NameRegistry::alias(&resolved.name, Chain::NATIVE)
						.unwrap_or_else(|| T::AddressConverter::to_address(&resolved.owner)),
					None => Address(share.name.clone()),
				};
				let recipient = T::AddressConverter::to_ledger_account(&address)
					.ok_or(Error::<T>::UnknownAffiliate)?;
				T::Ledger::transfer(&from, &recipient, &cacao, share.amount)?;
				Self::deposit_event(Event::AffiliateFeePaid {
					tx_id,
					name: share.name.clone(),
					amount: share.amount,
				});
			},
		}
		Ok(())
	}

	/// Swaps an owner's accrual to their preferred asset once it is worth more than
	/// `PreferredAssetOutboundFeeMultiplier` outbound fees.
	fn try_collector_payout(resolved: &ResolvedName<T::AccountId>, accrued: AssetAmount) {
		let Some(preferred_asset) = resolved.preferred_asset.clone() else { return };
		let outbound_fee = T::PoolApi::value_in_cacao(
			&preferred_asset,
			T::GasManager::outbound_fee(&preferred_asset),
		);
		let threshold = outbound_fee
			.saturating_mul(T::Mimir::get_amount(MimirKey::PreferredAssetOutboundFeeMultiplier));
		if accrued <= threshold {
			return
		}
		if let Err(error) = with_storage_layer(|| {
			Self::schedule_collector_payout(resolved, preferred_asset.clone(), accrued)
		}) {
			log::warn!(
				target: "mc-swapping",
				"Affiliate collector payout to {preferred_asset} deferred: {error:?}",
			);
		}
	}

	fn schedule_collector_payout(
		resolved: &ResolvedName<T::AccountId>,
		preferred_asset: Asset,
		amount: AssetAmount,
	) -> DispatchResult {
		let destination =
			T::NameRegistry::alias(&resolved.name, preferred_asset.settlement_chain())
				.ok_or(Error::<T>::MissingPreferredAssetAlias)?;
		let now = Self::current_height();
		let owner = &resolved.owner;
		let tx_id = TxId::from(
			(AFFILIATE_COLLECTOR_PAYOUT.to_vec(), owner.clone(), now, amount).blake2_256(),
		);

		T::Ledger::transfer(
			&LedgerAccount::Module(ModuleName::AffiliateCollector),
			&LedgerAccount::Module(ModuleName::Asgard),
			&Asset::cacao(),
			amount,
		)?;
		AffiliateCollectors::<T>::remove(owner);

		let request = SwapRequest {
			tx_id,
			source: Coin::cacao(amount),
			memo: SwapMemo::new(preferred_asset.clone(), destination),
			from_address: T::AddressConverter::to_address(owner),
			origin: SwapOrigin::AffiliateCollector,
			add_liquidity: None,
		};
		Self::validate(&request)?;
		Self::queue_swap(request, now.saturating_add(1))?;
		Self::deposit_event(Event::AffiliateCollectorPayoutScheduled {
			owner: owner.clone(),
			tx_id,
			amount,
			preferred_asset,
		});
		Ok(())
	}
}

fn bps_of(part: AssetAmount, whole: AssetAmount) -> BasisPoints {
	get_safe_share(part, whole, MAX_BASIS_POINTS.into()).saturated_into()
}

impl<T: Config> SwapApi for Pallet<T> {
	/// Runs at the end of the current block.
	///
	/// ## Events
	///
	/// - [SwapScheduled](Event::SwapScheduled)
	fn schedule_swap(request: SwapRequest) -> DispatchResult {
		Self::validate(&request)?;
		Self::queue_swap(request, Self::current_height())
	}
}

impl<T: Config> AffiliateFeeApi for Pallet<T> {
	fn affiliate_shares(
		affiliates: &[Affiliate],
		amount: AssetAmount,
		max_total_bps: BasisPoints,
	) -> Vec<AffiliateShare> {
		let entries = affiliates
			.iter()
			.map(|affiliate| {
				let bps = affiliate
					.bps
					.or_else(|| {
						T::NameRegistry::resolve(&affiliate.name).map(|name| name.affiliate_bps)
					})
					.unwrap_or_default();
				Self::affiliate_entry(&affiliate.name, bps, 0)
			})
			.collect::<Vec<_>>();
		let max_total_bps = match max_total_bps {
			0 => T::Mimir::get_bps(MimirKey::MaxAffiliateFeeBasisPoints),
			max => max,
		};
		mc_traits::calculate_nested_affiliate_shares(amount, &entries, max_total_bps)
	}

	/// A share that cannot be paid stays with `source` and is not counted.
	fn pay_affiliates(
		source: ModuleName,
		tx_id: TxId,
		shares: Vec<AffiliateShare>,
	) -> Result<AssetAmount, DispatchError> {
		let behaviour = T::Mimir::behaviour();
		let mut paid: AssetAmount = 0;
		for share in shares.iter().filter(|share| share.amount > 0) {
			match with_storage_layer(|| {
				Self::pay_affiliate_share(source, tx_id, share, &behaviour)
			}) {
				Ok(()) => paid = paid.saturating_add(share.amount),
				Err(error) => log::error!(
					target: "mc-swapping",
					"Affiliate fee of {} to {} not paid: {error:?}",
					share.amount,
					String::from_utf8_lossy(&share.name),
				),
			}
		}
		Ok(paid)
	}
}
