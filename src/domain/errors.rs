use derive_more::Display;

/// Failures of the chart synchronization layer.
///
/// Per-point and per-message variants are absorbed where they occur; only
/// `ResourceAcquisition` is meant to end a chart's lifecycle.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum SyncError {
    #[display(fmt = "Invalid time format: {}", _0)]
    InvalidTimeFormat(String),
    #[display(fmt = "Invalid series input: {}", _0)]
    InvalidSeriesInput(String),
    #[display(fmt = "History unavailable: {}", _0)]
    HistoryUnavailable(ApiError),
    #[display(fmt = "Transport error: {}", _0)]
    TransportError(String),
    #[display(fmt = "Malformed message: {}", _0)]
    MalformedMessage(String),
    #[display(fmt = "Resource acquisition failed: {}", _0)]
    ResourceAcquisition(String),
    #[display(fmt = "Acknowledge failed: {}", _0)]
    AcknowledgeFailed(ApiError),
    #[display(fmt = "Validation Error: {}", _0)]
    ValidationError(String),
}

impl std::error::Error for SyncError {}

/// Transport-level failure of a backend HTTP call.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum ApiError {
    #[display(fmt = "request failed: {}", _0)]
    Request(String),
    #[display(fmt = "HTTP error: {}", _0)]
    Status(u16),
    #[display(fmt = "failed to decode response: {}", _0)]
    Decode(String),
}

impl std::error::Error for ApiError {}

pub type SyncResult<T> = Result<T, SyncError>;
pub type ApiResult<T> = Result<T, ApiError>;
