use serde::Deserialize;

use crate::domain::errors::SyncError;
use crate::domain::market_data::TimePoint;
use crate::time_utils::{RawTime, normalize};

/// DTO for a realtime tick pushed by the backend: `{symbol, time, close}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RealtimeMessage {
    pub symbol: String,
    pub time: RawTime,
    pub close: f64,
}

impl RealtimeMessage {
    /// Converts to the internal point type; a bad timestamp surfaces as
    /// `InvalidTimeFormat` so the caller can drop just this message.
    pub fn to_point(&self) -> Result<TimePoint, SyncError> {
        let time = normalize(&self.time)?;
        Ok(TimePoint::new(time, self.close))
    }
}

/// Validate a raw text frame against the message schema.
pub fn parse_realtime_message(data: &str) -> Result<RealtimeMessage, SyncError> {
    let message: RealtimeMessage = serde_json::from_str(data)
        .map_err(|e| SyncError::MalformedMessage(format!("{e}: {}", preview(data))))?;
    if message.symbol.trim().is_empty() {
        return Err(SyncError::MalformedMessage("empty symbol".to_string()));
    }
    if !message.close.is_finite() {
        return Err(SyncError::MalformedMessage(format!("non-finite close for {}", message.symbol)));
    }
    Ok(message)
}

fn preview(data: &str) -> String {
    data.chars().take(64).collect()
}
