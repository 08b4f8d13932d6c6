/// Declares `MockRuntimeSafeMode` backed by test storage, for mock runtimes.
#[macro_export]
macro_rules! impl_mock_runtime_safe_mode {
	( $( $name:ident: $pallet_safe_mode:ty ),* $(,)? ) => {
		#[frame_support::storage_alias]
		pub type MockSafeModeStorage = StorageValue<
			Mock,
			MockRuntimeSafeMode,
			frame_support::pallet_prelude::ValueQuery
		>;

		$crate::impl_runtime_safe_mode! {
			MockRuntimeSafeMode,
			MockSafeModeStorage,
			$( $name: $pallet_safe_mode, )*
		}
	};
}
