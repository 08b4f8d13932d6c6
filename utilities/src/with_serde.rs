//! Serde helpers for byte strings that are human-readable text, such as addresses and memos.

use alloc::{string::String, vec::Vec};
use core::fmt;

/// (De)serializes a `Vec<u8>` as a UTF-8 string. Non-UTF-8 bytes are serialized lossily.
pub mod bytes_as_string {
	use super::*;

	pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&String::from_utf8_lossy(bytes))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		struct BytesVisitor;

		impl serde::de::Visitor<'_> for BytesVisitor {
			type Value = Vec<u8>;

			fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
				formatter.write_str("A UTF-8 string")
			}

			fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
			where
				E: serde::de::Error,
			{
				Ok(v.as_bytes().to_vec())
			}
		}

		deserializer.deserialize_str(BytesVisitor)
	}
}

#[cfg(test)]
mod tests {
	use serde::{Deserialize, Serialize};

	#[derive(Serialize, Deserialize, PartialEq, Debug)]
	struct Named {
		#[serde(with = "super::bytes_as_string")]
		name: Vec<u8>,
	}

	#[test]
	fn bytes_serialize_as_text() {
		let named = Named { name: b"maya1xyz".to_vec() };
		let json = serde_json::to_string(&named).unwrap();
		assert_eq!(json, r#"{"name":"maya1xyz"}"#);
		assert_eq!(serde_json::from_str::<Named>(&json).unwrap(), named);
	}
}
