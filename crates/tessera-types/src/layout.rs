use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Governs how much extracted metadata shapes the mount-address hierarchy.
///
/// Parsing is case-insensitive; the canonical spelling is upper case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LayoutPolicy {
    /// Date hierarchy refined with study and series identifiers.
    #[default]
    Full,
    /// Date hierarchy followed by id shards.
    Simple,
}

impl LayoutPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Simple => "SIMPLE",
        }
    }

    pub fn is_full(self) -> bool {
        matches!(self, Self::Full)
    }
}

impl FromStr for LayoutPolicy {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FULL" => Ok(Self::Full),
            "SIMPLE" => Ok(Self::Simple),
            _ => Err(TypeError::UnknownLayoutPolicy(s.to_string())),
        }
    }
}

impl TryFrom<String> for LayoutPolicy {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LayoutPolicy> for String {
    fn from(policy: LayoutPolicy) -> Self {
        policy.as_str().to_string()
    }
}

impl fmt::Display for LayoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
