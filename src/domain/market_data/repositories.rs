use futures::future::LocalBoxFuture;

use super::entities::PriceRecord;
use super::value_objects::Symbol;
use crate::domain::errors::ApiResult;
use crate::domain::signals::{Outcome, SignalReport, SignalStats};

/// Port to the dashboard backend.
///
/// Futures own everything they need so they can be spawned and outlive the
/// caller's borrow; dropping one abandons the request.
pub trait MarketApi {
    /// Bounded history window, oldest first.
    fn fetch_history(&self, symbol: &Symbol, limit: usize) -> LocalBoxFuture<'static, ApiResult<Vec<PriceRecord>>>;

    /// Latest price, used by the polling fallback.
    fn fetch_latest(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<PriceRecord>>;

    fn fetch_signals(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<SignalReport>>;

    fn fetch_narrative(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<Vec<String>>>;

    fn fetch_stats(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<SignalStats>>;

    fn acknowledge(&self, event_id: u64, outcome: Outcome) -> LocalBoxFuture<'static, ApiResult<()>>;
}
