use derive_more::{Constructor, Deref, Display};
use serde::{Deserialize, Serialize};

use crate::domain::errors::SyncError;

/// Value Object - Ticker symbol, stored upper-case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
#[serde(try_from = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl AsRef<str>) -> Result<Self, SyncError> {
        let trimmed = symbol.as_ref().trim();
        if trimmed.is_empty() {
            return Err(SyncError::ValidationError("Symbol cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// Case-insensitive match against a symbol carried by a wire message.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl TryFrom<&str> for Symbol {
    type Error = SyncError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Value Object - one sample of a line series, time in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
pub struct TimePoint {
    pub time: i64,
    pub value: f64,
}

impl TimePoint {
    pub fn is_finite(&self) -> bool {
        self.value.is_finite()
    }
}
