use std::rc::Rc;

use crate::domain::{
    errors::{SyncError, SyncResult},
    logging::{LogComponent, get_logger},
    market_data::{HistoryWindow, MarketApi, Symbol},
};

/// Use Case - fetch one bounded history window for a symbol
///
/// Exactly one request per call; retries are driven by explicit refresh
/// events, never by the loader itself.
#[derive(Clone)]
pub struct HistoryLoader {
    api: Rc<dyn MarketApi>,
}

impl HistoryLoader {
    pub fn new(api: Rc<dyn MarketApi>) -> Self {
        Self { api }
    }

    pub async fn load(&self, symbol: &Symbol, limit: usize) -> SyncResult<HistoryWindow> {
        get_logger().info(
            LogComponent::Application("HistoryLoader"),
            &format!("📡 Loading {limit} points for {symbol}"),
        );

        let records = self.api.fetch_history(symbol, limit).await.map_err(|e| {
            get_logger().warn(
                LogComponent::Application("HistoryLoader"),
                &format!("❌ History for {symbol} unavailable: {e}"),
            );
            SyncError::HistoryUnavailable(e)
        })?;

        let window = HistoryWindow::from_records(symbol.clone(), &records, limit);
        if window.dropped() > 0 {
            get_logger().warn(
                LogComponent::Application("HistoryLoader"),
                &format!("Dropped {} unusable records for {symbol}", window.dropped()),
            );
        }

        get_logger().info(
            LogComponent::Application("HistoryLoader"),
            &format!("✅ Loaded {} points for {symbol}", window.len()),
        );
        Ok(window)
    }
}
