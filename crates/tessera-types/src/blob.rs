use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Length of a hyphenated UUID string (`8-4-4-4-12`).
const UUID_STR_LEN: usize = 36;

/// Caller-supplied identifier of one stored object.
///
/// A `BlobId` is always a syntactically valid, hyphenated UUID. The original
/// spelling (including letter case) is preserved because it becomes part of
/// on-disk file names.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobId(String);

impl BlobId {
    /// Returns `true` iff `s` is a hyphenated UUID.
    ///
    /// Only the 36-character `8-4-4-4-12` form is accepted; the simple,
    /// braced and URN spellings are rejected since they would shard
    /// differently on disk.
    pub fn is_valid(s: &str) -> bool {
        s.len() == UUID_STR_LEN && uuid::Uuid::try_parse(s).is_ok()
    }

    /// Parse and validate an identifier.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(TypeError::InvalidBlobId(s.to_string()))
        }
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two 2-character shard segments (`id[0:2]`, `id[2:4]`).
    pub fn shards(&self) -> (&str, &str) {
        (&self.0[0..2], &self.0[2..4])
    }
}

impl FromStr for BlobId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BlobId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&s) {
            Ok(Self(s))
        } else {
            Err(TypeError::InvalidBlobId(s))
        }
    }
}

impl From<BlobId> for String {
    fn from(id: BlobId) -> Self {
        id.0
    }
}

impl AsRef<str> for BlobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self.0)
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_hyphenated_uuid() {
        assert!(BlobId::is_valid("0f8fad5b-d9cb-469f-a165-70867728950e"));
        assert!(BlobId::is_valid("0F8FAD5B-D9CB-469F-A165-70867728950E"));
    }

    #[test]
    fn rejects_other_spellings() {
        assert!(!BlobId::is_valid(""));
        assert!(!BlobId::is_valid("0f8fad5bd9cb469fa16570867728950e"));
        assert!(!BlobId::is_valid("{0f8fad5b-d9cb-469f-a165-70867728950e}"));
        assert!(!BlobId::is_valid("urn:uuid:0f8fad5b-d9cb-469f-a165-70867728950e"));
        assert!(!BlobId::is_valid("../../etc/passwd-aaaa-bbbb-cccc-dddddddd"));
        assert!(!BlobId::is_valid("zf8fad5b-d9cb-469f-a165-70867728950e"));
    }

    #[test]
    fn parse_preserves_spelling() {
        let id = BlobId::parse("0F8FAD5B-d9cb-469f-a165-70867728950e").unwrap();
        assert_eq!(id.as_str(), "0F8FAD5B-d9cb-469f-a165-70867728950e");
        assert_eq!(id.shards(), ("0F", "8F"));
    }

    #[test]
    fn parse_rejects_invalid() {
        let err = BlobId::parse("not-a-uuid").unwrap_err();
        assert_eq!(err, TypeError::InvalidBlobId("not-a-uuid".into()));
    }

    #[test]
    fn generated_ids_are_valid_and_unique() {
        let a = BlobId::generate();
        let b = BlobId::generate();
        assert!(BlobId::is_valid(a.as_str()));
        assert_ne!(a, b);
    }

    #[test]
    fn serde_rejects_invalid_ids() {
        let ok: BlobId =
            serde_json::from_str("\"0f8fad5b-d9cb-469f-a165-70867728950e\"").unwrap();
        assert_eq!(ok.to_string(), "0f8fad5b-d9cb-469f-a165-70867728950e");
        assert!(serde_json::from_str::<BlobId>("\"nope\"").is_err());
    }

    proptest! {
        #[test]
        fn any_v4_uuid_is_valid(bytes in any::<[u8; 16]>()) {
            let s = uuid::Builder::from_random_bytes(bytes).into_uuid().to_string();
            prop_assert!(BlobId::is_valid(&s));
        }

        #[test]
        fn short_strings_are_invalid(s in "[0-9a-f-]{0,35}") {
            prop_assert!(!BlobId::is_valid(&s));
        }
    }
}
