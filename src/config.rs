use std::time::Duration;

use serde::Deserialize;

use crate::domain::errors::SyncError;
use crate::domain::market_data::Symbol;

/// Runtime settings for the sync layer.
///
/// Every field has a default, so a partial JSON object (or none at all) is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Prefix for REST calls; empty means same origin.
    pub api_base: String,
    pub realtime_path: String,
    pub history_limit: usize,
    pub poll_interval_ms: u64,
    pub desk_refresh_ms: u64,
    pub default_symbol: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            realtime_path: "/ws/realtime".to_string(),
            history_limit: 300,
            poll_interval_ms: 2_000,
            desk_refresh_ms: 8_000,
            default_symbol: "AAPL".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SyncError::ValidationError(format!("invalid config: {e}")))?;
        config.validated()
    }

    pub fn validated(self) -> Result<Self, SyncError> {
        if self.history_limit == 0 {
            return Err(SyncError::ValidationError("history_limit must be positive".to_string()));
        }
        if self.poll_interval_ms == 0 || self.desk_refresh_ms == 0 {
            return Err(SyncError::ValidationError("refresh intervals must be positive".to_string()));
        }
        if !self.realtime_path.starts_with('/') {
            return Err(SyncError::ValidationError(format!(
                "realtime_path must be absolute, got {:?}",
                self.realtime_path
            )));
        }
        Symbol::new(&self.default_symbol)?;
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn desk_refresh(&self) -> Duration {
        Duration::from_millis(self.desk_refresh_ms)
    }

    pub fn default_symbol(&self) -> Result<Symbol, SyncError> {
        Symbol::new(&self.default_symbol)
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}
