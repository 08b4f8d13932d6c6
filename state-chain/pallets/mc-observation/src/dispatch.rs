//! Routes a finalised inbound to the pallet that handles its memo, and refunds it on failure.

use super::*;
use mc_memo::{refund_memo, SwapMemo};
use mc_traits::{AddLiquidityRequest, SwapRequest, WithdrawLiquidityRequest};

/// A finalised inbound, ready to be handled.
#[derive(Clone, RuntimeDebug, PartialEq, Eq)]
pub struct Inbound<AccountId> {
	pub tx_id: TxId,
	pub chain: Chain,
	pub from_address: Address,
	pub coins: Vec<Coin>,
	pub memo: Memo,
	pub origin: SwapOrigin,
	/// The native account that sent a native deposit.
	pub sender: Option<AccountId>,
}

impl<AccountId> Inbound<AccountId> {
	fn single_coin<T: Config>(&self) -> Result<&Coin, Error<T>> {
		match self.coins.as_slice() {
			[coin] => Ok(coin),
			_ => Err(Error::<T>::InvalidCoins),
		}
	}
}

impl<T: Config> Pallet<T> {
	pub(crate) fn dispatch(inbound: &Inbound<T::AccountId>) -> DispatchResult {
		let tx_id = inbound.tx_id;
		match &inbound.memo {
			Memo::Swap(memo) => {
				let coin = inbound.single_coin::<T>()?;
				Self::ensure_trading(coin)?;
				T::SwapApi::schedule_swap(SwapRequest {
					tx_id,
					source: coin.clone(),
					memo: memo.clone(),
					from_address: inbound.from_address.clone(),
					origin: inbound.origin,
					add_liquidity: None,
				})
			},
			Memo::AddLiquidity(memo) => {
				let coin = inbound.single_coin::<T>()?;
				Self::ensure_trading(coin)?;
				let pool = memo.asset.get_layer1_asset();
				let from = Some(inbound.from_address.clone());
				let request = |cacao_amount, asset_amount, cacao_address, asset_address| {
					AddLiquidityRequest {
						tx_id,
						pool: pool.clone(),
						cacao_amount,
						asset_amount,
						cacao_address,
						asset_address,
					}
				};
				if coin.asset.is_cacao() {
					T::LiquidityApi::add_liquidity(request(
						coin.amount,
						0,
						from,
						memo.pair_address.clone(),
					))?;
				} else if coin.asset == pool {
					T::LiquidityApi::add_liquidity(request(
						0,
						coin.amount,
						memo.pair_address.clone(),
						from,
					))?;
				} else {
					// Any other coin is swapped to CACAO first and added once the swap completes.
					T::SwapApi::schedule_swap(SwapRequest {
						tx_id,
						source: coin.clone(),
						memo: SwapMemo::new(Asset::cacao(), Address::default()),
						from_address: inbound.from_address.clone(),
						origin: inbound.origin,
						add_liquidity: Some(memo.clone()),
					})?;
				}
				Ok(())
			},
			Memo::WithdrawLiquidity(memo) =>
				T::LiquidityApi::withdraw_liquidity(WithdrawLiquidityRequest {
					tx_id,
					pool: memo.asset.get_layer1_asset(),
					owner: inbound.from_address.clone(),
					basis_points: memo.basis_points,
					withdrawal_asset: memo.withdrawal_asset.clone(),
				}),
			Memo::CacaoPoolDeposit => {
				let coin = inbound.single_coin::<T>()?;
				ensure!(coin.asset.is_cacao(), Error::<T>::InvalidCoinForMemo);
				T::CacaoPoolApi::deposit(&Self::sender(inbound)?, coin.amount, tx_id)
			},
			Memo::CacaoPoolWithdraw(memo) => T::CacaoPoolApi::withdraw(
				&Self::sender(inbound)?,
				memo.basis_points,
				&memo.affiliates,
				tx_id,
			),
			Memo::TradeAccountDeposit { owner } => {
				let coin = inbound.single_coin::<T>()?;
				ensure!(
					coin.asset.is_layer1() && !coin.asset.is_native_settled(),
					Error::<T>::InvalidCoinForMemo
				);
				let owner =
					T::AddressConverter::to_account_id(owner).ok_or(Error::<T>::InvalidOwner)?;
				T::TradeAccountApi::deposit(&coin.asset, coin.amount, &owner, tx_id).map(|_| ())
			},
			Memo::TradeAccountWithdrawal { address } => {
				let coin = inbound.single_coin::<T>()?;
				ensure!(coin.asset.is_trade(), Error::<T>::InvalidCoinForMemo);
				T::TradeAccountApi::withdrawal(
					&coin.asset,
					coin.amount,
					&Self::sender(inbound)?,
					address,
					tx_id,
				)
				.map(|_| ())
			},
			Memo::Bond(memo) =>
				T::BondHandler::bond(memo, inbound.single_coin::<T>()?, &inbound.from_address),
			Memo::Unbond(memo) => T::BondHandler::unbond(memo, &inbound.from_address),
			Memo::Leave { node } => T::BondHandler::leave(node, &inbound.from_address),
			Memo::Donate { asset } => {
				let coin = inbound.single_coin::<T>()?;
				let pool = asset.get_layer1_asset();
				if coin.asset.is_cacao() {
					T::LiquidityApi::donate(&pool, coin.amount, 0)
				} else if coin.asset == pool {
					T::LiquidityApi::donate(&pool, 0, coin.amount)
				} else {
					Err(Error::<T>::InvalidCoinForMemo.into())
				}
			},
			Memo::Reserve => {
				let coin = inbound.single_coin::<T>()?;
				ensure!(coin.asset.is_cacao(), Error::<T>::InvalidCoinForMemo);
				T::Ledger::transfer(
					&LedgerAccount::Module(ModuleName::Asgard),
					&LedgerAccount::Module(ModuleName::Reserve),
					&coin.asset,
					coin.amount,
				)
			},
			Memo::NoOp => Ok(()),
			Memo::ManageName(memo) => {
				let signer = match &inbound.sender {
					Some(sender) => sender.clone(),
					None => memo
						.owner
						.as_ref()
						.and_then(T::AddressConverter::to_account_id)
						.ok_or(Error::<T>::InvalidOwner)?,
				};
				T::NameRegistry::manage_name(&signer, memo)
			},
			Memo::Outbound { .. } |
			Memo::Refund { .. } |
			Memo::Migrate { .. } |
			Memo::Ragnarok { .. } => Err(Error::<T>::InvalidMemo.into()),
		}
	}

	fn ensure_trading(coin: &Coin) -> DispatchResult {
		ensure!(!T::Mimir::is_trading_halted(coin.asset.chain), Error::<T>::TradingHalted);
		Ok(())
	}

	/// The native account behind the inbound's sender.
	fn sender(inbound: &Inbound<T::AccountId>) -> Result<T::AccountId, Error<T>> {
		inbound
			.sender
			.clone()
			.or_else(|| T::AddressConverter::to_account_id(&inbound.from_address))
			.ok_or(Error::<T>::UnknownSender)
	}

	pub(crate) fn refund_reason(memo: &Memo, error: DispatchError) -> RefundReason {
		if error == Error::<T>::TradingHalted.into() {
			return RefundReason::TradingHalted
		}
		match memo {
			Memo::Swap(_) => RefundReason::SwapFailed,
			Memo::AddLiquidity(_) | Memo::WithdrawLiquidity(_) | Memo::Donate { .. } =>
				RefundReason::LiquidityFailed,
			Memo::TradeAccountDeposit { .. } | Memo::TradeAccountWithdrawal { .. } =>
				RefundReason::TradeAccountFailed,
			Memo::CacaoPoolDeposit | Memo::CacaoPoolWithdraw(_) => RefundReason::CacaoPoolFailed,
			_ => RefundReason::TxFailed,
		}
	}

	/// Returns each coin to `to`. A coin that can't be returned stays where it is. Nothing is
	/// reported when no coin was returned.
	pub(crate) fn refund(tx_id: TxId, to: &Address, coins: &[Coin], reason: RefundReason) {
		let mut refunded = Vec::new();
		for coin in coins.iter().filter(|coin| !coin.is_empty()) {
			match with_storage_layer(|| Self::return_coin(tx_id, to, coin)) {
				Ok(()) => refunded.push(coin.clone()),
				Err(error) => log::error!(
					target: "mc-observation",
					"Failed to refund {coin} to {to} for {tx_id:?}: {error:?}",
				),
			}
		}
		if refunded.is_empty() {
			return
		}
		log::warn!(target: "mc-observation", "Refunded {tx_id:?} to {to}: {reason:?}.");
		Self::deposit_event(Event::Refunded {
			tx_id,
			reason,
			code: reason.code(),
			coins: refunded,
		});
	}

	fn return_coin(tx_id: TxId, to: &Address, coin: &Coin) -> DispatchResult {
		if coin.asset.is_trade() {
			let owner = T::AddressConverter::to_account_id(to).ok_or(Error::<T>::UnknownSender)?;
			T::TradeAccountApi::deposit(&coin.asset, coin.amount, &owner, tx_id)?;
		} else if coin.asset.is_native_settled() {
			let recipient =
				T::AddressConverter::to_ledger_account(to).ok_or(Error::<T>::UnknownSender)?;
			T::Ledger::transfer(
				&LedgerAccount::Module(ModuleName::Asgard),
				&recipient,
				&coin.asset,
				coin.amount,
			)?;
		} else {
			Self::schedule_outbound(TxOutItem::new(
				tx_id,
				to.clone(),
				coin.clone(),
				refund_memo(&tx_id),
			))?;
		}
		Ok(())
	}
}
