#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod with_serde;

/// Returns the number of identical votes required for a strict majority of `share_count`
/// voters.
///
/// An empty set can never reach consensus, so the threshold is `1` in that case.
pub fn consensus_threshold_from_share_count(share_count: u32) -> u32 {
	(share_count / 2).saturating_add(1)
}

/// Whether `votes` out of `share_count` constitute a strict majority.
pub fn has_consensus(votes: u32, share_count: u32) -> bool {
	share_count > 0 && votes >= consensus_threshold_from_share_count(share_count)
}

/// Decodes a 32-byte hex hash, with or without a `0x` prefix. Upper and lower case are accepted.
pub fn clean_hex_hash(dirty_hash: &str) -> Result<[u8; 32], &'static str> {
	let hash_str = dirty_hash.strip_prefix("0x").unwrap_or(dirty_hash);

	hex::decode(hash_str)
		.map_err(|_| "Invalid hex")?
		.try_into()
		.map_err(|_| "Could not create a [u8; 32]")
}

#[test]
fn check_threshold_calculation() {
	assert_eq!(consensus_threshold_from_share_count(150), 76);
	assert_eq!(consensus_threshold_from_share_count(100), 51);
	assert_eq!(consensus_threshold_from_share_count(4), 3);
	assert_eq!(consensus_threshold_from_share_count(3), 2);
	assert_eq!(consensus_threshold_from_share_count(1), 1);
	assert_eq!(consensus_threshold_from_share_count(0), 1);

	assert!(has_consensus(3, 4));
	assert!(!has_consensus(2, 4));
	assert!(has_consensus(2, 3));
	assert!(!has_consensus(0, 0));
}

#[test]
fn cleans_hex_hash() {
	let hash = "0xB29AB9EBDB421CE48B70699758A6E9A3DBD609C5B29AB9EBDB421CE48B706997";
	assert!(clean_hex_hash(hash).is_ok());
	assert_eq!(clean_hex_hash(hash), clean_hex_hash(&hash.to_lowercase()[2..]));

	// too short
	assert!(clean_hex_hash("0x323232").is_err());
	// invalid chars
	assert!(clean_hex_hash("Z29AB9EBDB421CE48B70699758A6E9A3DBD609C5B29AB9EBDB421CE48B706997").is_err());
}
