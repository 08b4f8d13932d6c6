//! Keys for dynamic, governance-controlled protocol constants ("mimir").
use super::*;

#[derive(
	Copy,
	Clone,
	Debug,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Encode,
	Decode,
	DecodeWithMemTracking,
	TypeInfo,
	MaxEncodedLen,
	Serialize,
	Deserialize,
)]
pub enum MimirKey {
	HaltTrading,
	HaltChainTrading(Chain),
	LiquidityAuction,
	Ragnarok,
	MaxAffiliateFeeBasisPoints,
	MultipleAffiliatesMaxCount,
	ManualSwapsToSynthDisabled,
	SwapOutDexAggregationDisabled,
	/// Maximum synth supply as basis points of twice the pool's asset depth.
	MaxSynthPerPoolDepth,
	/// Cap on total pooled CACAO. Zero disables the cap.
	MaximumLiquidityCacao,
	EnsureLiquidityNoLargerThanBond,
	TotalEffectiveBond,
	StreamingSwapPause,
	StreamingSwapMinBPFee,
	StreamingSwapMaxLength,
	StreamingSwapMaxLengthNative,
	StreamingSwapMaxFailures,
	ObserveSlashPoints,
	ObservationDelayFlexibility,
	/// Blocks after consensus at which an observation is treated as final. Zero disables the
	/// policy and only observer-declared finality applies.
	ConfirmationDelayBlocks,
	NativeTransactionFee,
	PreferredAssetOutboundFeeMultiplier,
	CacaoPoolEnabled,
	CacaoPoolRewardsEnabled,
	CacaoPoolRewardsBps,
	CacaoPoolDepositMaturityBlocks,
	CacaoPoolMaxReserveBackstop,
	TradeAccountsEnabled,
	TradeAccountsDepositEnabled,
	TradeAccountsWithdrawEnabled,
}

impl MimirKey {
	/// The value used when governance has not set the key.
	pub const fn default_value(&self) -> i64 {
		match self {
			MimirKey::HaltTrading |
			MimirKey::HaltChainTrading(_) |
			MimirKey::LiquidityAuction |
			MimirKey::Ragnarok |
			MimirKey::ManualSwapsToSynthDisabled |
			MimirKey::SwapOutDexAggregationDisabled |
			MimirKey::MaximumLiquidityCacao |
			MimirKey::EnsureLiquidityNoLargerThanBond |
			MimirKey::TotalEffectiveBond |
			MimirKey::StreamingSwapPause |
			MimirKey::ConfirmationDelayBlocks |
			MimirKey::CacaoPoolEnabled |
			MimirKey::CacaoPoolRewardsEnabled |
			MimirKey::CacaoPoolDepositMaturityBlocks |
			MimirKey::CacaoPoolMaxReserveBackstop |
			MimirKey::TradeAccountsEnabled => 0,
			MimirKey::TradeAccountsDepositEnabled | MimirKey::TradeAccountsWithdrawEnabled => 1,
			MimirKey::MaxAffiliateFeeBasisPoints => 1_000,
			MimirKey::MultipleAffiliatesMaxCount => 5,
			MimirKey::MaxSynthPerPoolDepth => 1_500,
			MimirKey::StreamingSwapMinBPFee => 5,
			MimirKey::StreamingSwapMaxLength => 14_400,
			MimirKey::StreamingSwapMaxLengthNative => 5_256_000,
			MimirKey::StreamingSwapMaxFailures => 10,
			MimirKey::ObserveSlashPoints => 1,
			MimirKey::ObservationDelayFlexibility => 10,
			MimirKey::NativeTransactionFee => 5_000_000_000,
			MimirKey::PreferredAssetOutboundFeeMultiplier => 100,
			MimirKey::CacaoPoolRewardsBps => 500,
		}
	}
}
