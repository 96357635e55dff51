use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Kind of attachment a pending deletion refers to.
///
/// The numeric codes are persisted in the deletion queue and must stay stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    /// The primary stored object (e.g. the DICOM instance itself).
    Primary,
    /// Metadata derived from a primary object (e.g. its JSON summary).
    DerivedMetadata,
    /// A partial object (e.g. the instance truncated before pixel data).
    Partial,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [Self::Primary, Self::DerivedMetadata, Self::Partial];

    /// Stable code used in persistent storage.
    pub fn code(self) -> i64 {
        match self {
            Self::Primary => 1,
            Self::DerivedMetadata => 2,
            Self::Partial => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, TypeError> {
        match code {
            1 => Ok(Self::Primary),
            2 => Ok(Self::DerivedMetadata),
            3 => Ok(Self::Partial),
            other => Err(TypeError::UnknownContentKind(other)),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primary => "primary",
            Self::DerivedMetadata => "derived-metadata",
            Self::Partial => "partial",
        };
        f.write_str(name)
    }
}
