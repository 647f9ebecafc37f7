mod common;

use chart_sync_wasm::application::HistoryLoader;
use chart_sync_wasm::domain::errors::{ApiError, SyncError};
use chart_sync_wasm::domain::market_data::{PriceRecord, Symbol, TimePoint};
use common::{Harness, record};

#[test]
fn loads_a_sorted_bounded_window() {
    let mut harness = Harness::new();
    harness.api.history.reply(
        "AAPL",
        Ok(vec![
            record(300, 3.0),
            record(100, 1.0),
            PriceRecord::new("2025-13-45", 9.0),
            record(200, 2.0),
            PriceRecord::new(400_000.0, f64::NAN),
        ]),
    );
    let loader = HistoryLoader::new(harness.api.clone());

    let window = harness.run(loader.load(&Symbol::new("AAPL").unwrap(), 2)).unwrap();

    assert_eq!(window.points(), &[TimePoint::new(200, 2.0), TimePoint::new(300, 3.0)]);
    assert_eq!(window.dropped(), 2);
    assert_eq!(window.symbol(), &Symbol::new("AAPL").unwrap());
    assert_eq!(harness.api.last_limit.get(), 2);
}

#[test]
fn backend_failure_is_history_unavailable() {
    let mut harness = Harness::new();
    harness.api.history.reply("AAPL", Err(ApiError::Status(503)));
    let loader = HistoryLoader::new(harness.api.clone());

    let err = harness.run(loader.load(&Symbol::new("AAPL").unwrap(), 300)).unwrap_err();

    assert_eq!(err, SyncError::HistoryUnavailable(ApiError::Status(503)));
    assert_eq!(harness.api.history.call_count(), 1);
}

#[test]
fn iso_and_epoch_records_share_one_time_axis() {
    let mut harness = Harness::new();
    harness.api.history.reply(
        "AAPL",
        Ok(vec![PriceRecord::new("2025-09-19T12:34:00Z", 153.0), PriceRecord::new(1_758_285_240_000.0, 153.2)]),
    );
    let loader = HistoryLoader::new(harness.api.clone());

    let window = harness.run(loader.load(&Symbol::new("AAPL").unwrap(), 300)).unwrap();

    assert_eq!(window.points(), &[TimePoint::new(1_758_285_240, 153.2)]);
}
