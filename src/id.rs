//! Opaque entity identifiers.
//!
//! An `ID` names a single entity or a group. Its internal structure belongs to
//! whoever issues it; the protocol only compares IDs for equality.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque identifier for a user, station, bot or group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ID(String);

impl ID {
    /// Wraps an identifier string without validation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ID {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::Format("ID cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ID {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(Error::Format("ID cannot be empty".to_string()));
        }
        Ok(Self(s))
    }
}

impl From<ID> for String {
    fn from(id: ID) -> Self {
        id.0
    }
}

impl From<&str> for ID {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_empty() {
        assert!("".parse::<ID>().is_err());
        let id: ID = "moki@4WDfe3zZ4T7opFSi3iDAKiuTnUHjxmXekk".parse().unwrap();
        assert_eq!(id.as_str(), "moki@4WDfe3zZ4T7opFSi3iDAKiuTnUHjxmXekk");
    }

    #[test]
    fn serde_as_plain_string() {
        let id = ID::new("hulk@4YeVEN3aUnvC1DNUufCq1bs9zoBSJTzVEj");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"hulk@4YeVEN3aUnvC1DNUufCq1bs9zoBSJTzVEj\"");
        let back: ID = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ID>("\"\"").is_err());
    }
}
