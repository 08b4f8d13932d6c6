use super::{MockPallet, MockPalletStorage};
use crate::{SlashLabels, Slasher, ValidatorSet};

pub struct MockValidatorSet;

impl MockPallet for MockValidatorSet {
	const PREFIX: &'static [u8] = b"MockValidatorSet";
}

const VALIDATORS: &[u8] = b"VALIDATORS";

impl MockValidatorSet {
	pub fn set_validators(validators: Vec<u64>) {
		Self::put_value(VALIDATORS, validators);
	}
}

impl ValidatorSet for MockValidatorSet {
	type ValidatorId = u64;

	fn active_validators() -> Vec<u64> {
		Self::get_value(VALIDATORS).unwrap_or_default()
	}

	fn is_active(id: &u64) -> bool {
		Self::active_validators().contains(id)
	}
}

/// Keeps a signed running total per validator so tests can check net adjustments.
pub struct MockSlasher;

impl MockPallet for MockSlasher {
	const PREFIX: &'static [u8] = b"MockSlasher";
}

const POINTS: &[u8] = b"POINTS";
const LABELS: &[u8] = b"LABELS";

impl MockSlasher {
	pub fn slash_points(id: &u64) -> i64 {
		Self::get_storage(POINTS, id).unwrap_or_default()
	}

	/// Every label seen, in order.
	pub fn labels() -> Vec<SlashLabels> {
		Self::get_value(LABELS).unwrap_or_default()
	}

	fn adjust(id: &u64, delta: i64, labels: SlashLabels) {
		Self::mutate_storage::<_, i64, _>(POINTS, id, |points| {
			*points = Some(points.unwrap_or_default() + delta);
		});
		super::push_value::<Self, _>(LABELS, labels);
	}
}

impl Slasher for MockSlasher {
	type ValidatorId = u64;

	fn inc_slash_points(id: &u64, points: u64, labels: SlashLabels) {
		Self::adjust(id, points as i64, labels);
	}

	fn dec_slash_points(id: &u64, points: u64, labels: SlashLabels) {
		Self::adjust(id, -(points as i64), labels);
	}
}
