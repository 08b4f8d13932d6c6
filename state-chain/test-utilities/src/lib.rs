use frame_support::traits::{OnFinalize, OnInitialize};
use frame_system::{pallet_prelude::BlockNumberFor, Config};

pub fn last_event<T: Config>() -> <T as Config>::RuntimeEvent {
	maybe_last_event::<T>().expect("Event expected")
}

pub fn maybe_last_event<T: Config>() -> Option<<T as Config>::RuntimeEvent> {
	frame_system::Pallet::<T>::events().pop().map(|e| e.event)
}

/// Can be used to check that fixed-sized types have the correct implementation of MaxEncodedLen
pub fn ensure_max_encoded_len_is_exact<T: Default + codec::Encode + codec::MaxEncodedLen>() {
	assert_eq!(T::default().encode().len(), T::max_encoded_len());
}

#[track_caller]
pub fn assert_has_event<T: frame_system::Config>(event: <T as frame_system::Config>::RuntimeEvent) {
	let events = frame_system::Pallet::<T>::events()
		.into_iter()
		.map(|e| e.event)
		.collect::<Vec<_>>();
	assert!(events.iter().any(|e| e == &event), "Event {event:#?} not found in {events:#?}",);
}

#[track_caller]
pub fn assert_no_event<T: frame_system::Config>(event: <T as frame_system::Config>::RuntimeEvent) {
	let events = frame_system::Pallet::<T>::events()
		.into_iter()
		.map(|e| e.event)
		.collect::<Vec<_>>();
	assert!(!events.iter().any(|e| e == &event), "Unexpected event {event:#?} in {events:#?}",);
}

#[macro_export]
macro_rules! assert_has_matching_event {
	( $runtime:ty, $event:pat $(if $guard:expr)? ) => {
		let events = frame_system::Pallet::<$runtime>::events()
			.into_iter()
			.map(|e| e.event)
			.collect::<Vec<_>>();
		assert!(
			events.iter().any(|e| matches!(e, $event $(if $guard)?)),
			"No event matching {} found in {events:#?}",
			stringify!($event),
		);
	};
}

/// Checks the deposited events in the order they occur
#[macro_export]
macro_rules! assert_event_sequence {
	($runtime:ty, $($evt:expr),* $(,)?) => {
		let mut events = frame_system::Pallet::<$runtime>::events()
		.into_iter()
		// We want to be able to input the events into this macro in the order they occurred.
		.rev()
		.map(|e| e.event)
			.collect::<Vec<_>>();

		$(
			let actual = events.pop().unwrap_or_else(|| panic!("No more events. Expected: {:?}", $evt));
			assert_eq!(actual, $evt);
		)*
	};
}

#[macro_export]
macro_rules! assert_events_match {
	($runtime:ty, $($pattern:pat $(if $guard:expr )? => $bind:expr),+ ) => {{
		let mut events = frame_system::Pallet::<$runtime>::events();

		(
			$({
				let (index, bind) = events
					.iter()
					.enumerate()
					.find_map(|(index, record)| match record.event.clone() {
						$pattern $(if $guard)? => Some((index, $bind)),
						_ => None
					})
					.unwrap_or_else(|| panic!("No event that matches {}. Available events: {:#?}", stringify!($pattern), events));
				events.remove(index);
				bind
			}),+
		)
	}};
}

/// Runs the block hooks of `AllPallets` for every block up to and including `target`.
///
/// The current block is finalised first, so calling this with the current block number plus one
/// closes out the block in progress and opens the next one.
pub fn run_to_block<T, AllPallets>(target: BlockNumberFor<T>)
where
	T: Config,
	AllPallets: OnInitialize<BlockNumberFor<T>> + OnFinalize<BlockNumberFor<T>>,
{
	while frame_system::Pallet::<T>::block_number() < target {
		let current = frame_system::Pallet::<T>::block_number();
		AllPallets::on_finalize(current);
		let next = current + 1u32.into();
		frame_system::Pallet::<T>::set_block_number(next);
		AllPallets::on_initialize(next);
	}
}

#[macro_export]
macro_rules! impl_test_helpers {
	( $runtime:ty ) => {
		$crate::impl_test_helpers!($runtime, RuntimeGenesisConfig::default());
	};
	( $runtime:ty, $genesis:expr ) => {
		/// Create new test externalities with the default genesis config, starting at block 1.
		pub fn new_test_ext() -> sp_io::TestExternalities {
			use sp_runtime::BuildStorage;
			let mut ext: sp_io::TestExternalities =
				$genesis.build_storage().expect("genesis is valid").into();
			ext.execute_with(|| frame_system::Pallet::<$runtime>::set_block_number(1));
			ext
		}

		/// Finalises the current block and advances to `target`, running all hooks.
		pub fn run_to_block(target: frame_system::pallet_prelude::BlockNumberFor<$runtime>) {
			$crate::run_to_block::<$runtime, AllPalletsWithSystem>(target)
		}
	};
}
