//! Coarse kill switches, one struct per pallet, combined into a single runtime value.

/// A set of flags with an all-off and an all-on setting.
pub trait SafeMode {
	const CODE_RED: Self;
	const CODE_GREEN: Self;
}

pub trait SetSafeMode<SafeModeType: SafeMode> {
	fn set_safe_mode(mode: SafeModeType);

	fn set_code_red() {
		Self::set_safe_mode(SafeModeType::CODE_RED);
	}

	fn set_code_green() {
		Self::set_safe_mode(SafeModeType::CODE_GREEN);
	}
}

/// Declares the runtime's safe mode struct, stored in `$root_storage`, with one field per
/// pallet safe mode. The struct implements `Get` for itself and for each field type, so a pallet
/// can take `type SafeMode: Get<PalletSafeMode>` and be handed the runtime struct.
///
/// ```ignore
/// impl_runtime_safe_mode! {
///     RuntimeSafeMode,
///     pallet_mc_environment::RuntimeSafeMode<Runtime>,
///     swapping: pallet_mc_swapping::PalletSafeMode,
///     cacao_pool: pallet_mc_cacao_pool::PalletSafeMode,
/// }
/// ```
#[macro_export]
macro_rules! impl_runtime_safe_mode {
	(
		$runtime_safe_mode:ident,
		$root_storage:ty,
		$( $name:ident: $pallet_safe_mode:ty ),* $(,)?
	) => {
		pub use __safe_mode_inner::$runtime_safe_mode;

		mod __safe_mode_inner {
			use super::*;
			use $crate::{SafeMode, SetSafeMode};
			use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
			use frame_support::{pallet_prelude::RuntimeDebug, storage::StorageValue, traits::Get};
			use scale_info::TypeInfo;

			#[derive(
				Encode,
				Decode,
				DecodeWithMemTracking,
				TypeInfo,
				MaxEncodedLen,
				Clone,
				PartialEq,
				Eq,
				RuntimeDebug,
			)]
			pub struct $runtime_safe_mode {
				$( pub $name: $pallet_safe_mode ),*
			}

			impl Default for $runtime_safe_mode {
				fn default() -> Self {
					<Self as SafeMode>::CODE_GREEN
				}
			}

			impl SafeMode for $runtime_safe_mode {
				const CODE_RED: Self =
					Self { $( $name: <$pallet_safe_mode as SafeMode>::CODE_RED ),* };
				const CODE_GREEN: Self =
					Self { $( $name: <$pallet_safe_mode as SafeMode>::CODE_GREEN ),* };
			}

			impl Get<Self> for $runtime_safe_mode {
				fn get() -> Self {
					<$root_storage as StorageValue<_>>::get()
				}
			}

			impl SetSafeMode<Self> for $runtime_safe_mode {
				fn set_safe_mode(mode: Self) {
					<$root_storage as StorageValue<_>>::put(mode);
				}
			}

			$(
				impl Get<$pallet_safe_mode> for $runtime_safe_mode {
					fn get() -> $pallet_safe_mode {
						<Self as Get<Self>>::get().$name
					}
				}

				impl SetSafeMode<$pallet_safe_mode> for $runtime_safe_mode {
					fn set_safe_mode(mode: $pallet_safe_mode) {
						<$root_storage as StorageValue<_>>::mutate(|current| current.$name = mode);
					}
				}
			)*
		}
	};
}

/// Declares a pallet safe mode made of boolean flags. Code red clears every flag and code green
/// sets every flag.
///
/// ```ignore
/// impl_pallet_safe_mode!(PalletSafeMode; deposits_enabled, withdrawals_enabled);
/// ```
#[macro_export]
macro_rules! impl_pallet_safe_mode {
	( $pallet_safe_mode:ident; $( $flag:ident ),+ $(,)? ) => {
		#[derive(
			codec::Encode,
			codec::Decode,
			codec::DecodeWithMemTracking,
			codec::MaxEncodedLen,
			scale_info::TypeInfo,
			Copy,
			Clone,
			PartialEq,
			Eq,
			frame_support::pallet_prelude::RuntimeDebug,
		)]
		pub struct $pallet_safe_mode {
			$( pub $flag: bool, )+
		}

		impl Default for $pallet_safe_mode {
			fn default() -> Self {
				<Self as $crate::SafeMode>::CODE_GREEN
			}
		}

		impl $crate::SafeMode for $pallet_safe_mode {
			const CODE_RED: Self = Self { $( $flag: false ),+ };
			const CODE_GREEN: Self = Self { $( $flag: true ),+ };
		}
	};
}
