mod common;

use std::cell::RefCell;
use std::rc::Rc;

use chart_sync_wasm::application::{ChartSyncCoordinator, FeedState, FeedTransport};
use chart_sync_wasm::config::SyncConfig;
use chart_sync_wasm::domain::chart::{ChartId, ChartMode, Dimensions, MarkerShape, OverlayMarker, SeriesStyle};
use chart_sync_wasm::domain::errors::{ApiError, SyncError};
use chart_sync_wasm::domain::events::Broadcast;
use chart_sync_wasm::domain::market_data::{Symbol, TimePoint};
use chart_sync_wasm::domain::realtime::PushEvent;
use chart_sync_wasm::domain::signals::SignalReport;
use common::{FakePushChannel, Harness, ManualScheduler, RecordingSink, SinkCall, record, recording_sink, tick_json};

fn long_signal() -> SignalReport {
    serde_json::from_str(
        r#"{"candidates":[{"id":1,"side":"long","entry":152.0,"stop":150.0,"target":156.0,"rr":2.0}]}"#,
    )
    .unwrap()
}

fn chart(harness: &Harness, mode: ChartMode) -> (Rc<RefCell<RecordingSink>>, ChartSyncCoordinator) {
    let (sink, shared) = recording_sink(mode);
    let chart =
        ChartSyncCoordinator::new(ChartId::new("c1"), Symbol::new("AAPL").unwrap(), mode, shared, harness.deps.clone());
    (sink, chart)
}

#[test]
fn mount_sets_data_before_any_update() {
    let mut harness = Harness::new();
    harness.api.history.reply("AAPL", Ok(vec![record(1_758_285_180, 152.9), record(1_758_285_120, 152.7)]));
    harness.api.signals.reply("AAPL", Ok(long_signal()));
    let (sink, chart) = chart(&harness, ChartMode::Ict);

    harness.run(chart.mount()).unwrap();
    harness.push.send_text(&tick_json("AAPL", "2025-09-19T12:34:00Z", 153.2));

    let calls = sink.borrow().calls.clone();
    assert_eq!(
        calls,
        vec![
            SinkCall::ApplyStyle(SeriesStyle::for_mode(ChartMode::Ict, 1.0)),
            SinkCall::SetMarkers(vec![]),
            SinkCall::SetData(vec![TimePoint::new(1_758_285_120, 152.7), TimePoint::new(1_758_285_180, 152.9)]),
            SinkCall::SetMarkers(vec![OverlayMarker::above(1_758_285_180, MarkerShape::ArrowUp, "LONG RR 2.00")]),
            SinkCall::Update(TimePoint::new(1_758_285_240, 153.2)),
        ]
    );
    assert_eq!(harness.api.last_limit.get(), 300);
    assert_eq!(chart.feed_state(), FeedState::Streaming(FeedTransport::Push));
}

#[test]
fn failed_history_starts_empty_and_still_streams() {
    let mut harness = Harness::new();
    harness.api.history.reply("AAPL", Err(ApiError::Status(500)));
    let (sink, chart) = chart(&harness, ChartMode::Gann);

    harness.run(chart.mount()).unwrap();

    assert_eq!(sink.borrow().data_calls(), vec![Vec::<TimePoint>::new()]);
    assert_eq!(harness.push.live_count(), 1);
    assert_eq!(chart.feed_state(), FeedState::Connecting);
}

#[test]
fn modes_without_overlays_never_fetch_signals() {
    let mut harness = Harness::new();
    let (_sink, chart) = chart(&harness, ChartMode::Momentum);

    harness.run(chart.mount()).unwrap();
    harness.deps.bus.publish(Broadcast::RefreshAll);
    harness.settle();

    assert_eq!(harness.api.signals.call_count(), 0);
}

#[test]
fn refresh_keeps_last_good_data_when_history_fails() {
    let mut harness = Harness::new();
    harness.api.history.reply("AAPL", Ok(vec![record(60, 1.0), record(120, 2.0)]));
    let (sink, chart) = chart(&harness, ChartMode::Ict);
    harness.run(chart.mount()).unwrap();

    harness.api.history.reply("AAPL", Err(ApiError::Request("offline".into())));
    harness.deps.bus.publish(Broadcast::RefreshAll);
    harness.settle();

    assert_eq!(sink.borrow().data_calls().len(), 1);
    assert_eq!(sink.borrow().series.count(), 2);
    assert_eq!(harness.push.open_count(), 1);
    assert_eq!(harness.push.live_count(), 1);
    assert_eq!(harness.api.signals.call_count(), 2);

    harness.api.history.reply("AAPL", Ok(vec![record(60, 1.0), record(120, 2.0), record(180, 3.0)]));
    harness.deps.bus.publish(Broadcast::RefreshAll);
    harness.settle();
    assert_eq!(sink.borrow().data_calls().len(), 2);
    assert_eq!(sink.borrow().series.count(), 3);
}

#[test]
fn reset_view_only_fits() {
    let mut harness = Harness::new();
    let (sink, chart) = chart(&harness, ChartMode::Math);
    harness.run(chart.mount()).unwrap();
    let before = sink.borrow().calls.len();

    harness.deps.bus.publish(Broadcast::ResetView);

    assert_eq!(sink.borrow().calls[before..], [SinkCall::FitView]);
    assert_eq!(sink.borrow().series.fit_count(), 1);
}

#[test]
fn scale_change_restyles_without_restarting_the_feed() {
    let mut harness = Harness::new();
    let (sink, chart) = chart(&harness, ChartMode::Gann);
    harness.run(chart.mount()).unwrap();

    harness.deps.bus.publish(Broadcast::ScaleChanged(1.5));

    let style = sink.borrow().series.style().clone();
    assert_eq!(style.color, "#ffa14b");
    assert_eq!(style.line_width, 3.0);
    assert_eq!(harness.push.open_count(), 1);
    assert_eq!(sink.borrow().data_calls().len(), 1);
}

#[test]
fn toggling_off_clears_markers_without_fetching() {
    let mut harness = Harness::new();
    harness.api.history.reply("AAPL", Ok(vec![record(60, 1.0)]));
    harness.api.signals.reply("AAPL", Ok(long_signal()));
    let (sink, chart) = chart(&harness, ChartMode::Ict);
    harness.run(chart.mount()).unwrap();
    assert_eq!(sink.borrow().series.markers().len(), 1);

    harness.deps.bus.publish(Broadcast::ToggleSignals(ChartId::new("c1")));
    harness.settle();
    assert!(!chart.signals_visible());
    assert_eq!(sink.borrow().last_markers(), Some(vec![]));
    assert_eq!(harness.api.signals.call_count(), 1);

    harness.deps.bus.publish(Broadcast::ToggleSignals(ChartId::new("c1")));
    harness.settle();
    assert!(chart.signals_visible());
    assert_eq!(harness.api.signals.call_count(), 2);
    assert_eq!(sink.borrow().series.markers().len(), 1);
}

#[test]
fn toggles_for_other_charts_are_ignored() {
    let mut harness = Harness::new();
    let (_sink, chart) = chart(&harness, ChartMode::Ict);
    harness.run(chart.mount()).unwrap();

    harness.deps.bus.publish(Broadcast::ToggleSignals(ChartId::new("c3")));

    assert!(chart.signals_visible());
}

#[test]
fn overlay_failure_clears_markers() {
    let mut harness = Harness::new();
    harness.api.history.reply("AAPL", Ok(vec![record(60, 1.0)]));
    harness.api.signals.reply("AAPL", Ok(long_signal()));
    let (sink, chart) = chart(&harness, ChartMode::Ict);
    harness.run(chart.mount()).unwrap();

    harness.api.signals.reply("AAPL", Err(ApiError::Status(502)));
    harness.deps.bus.publish(Broadcast::RefreshAll);
    harness.settle();

    assert_eq!(sink.borrow().last_markers(), Some(vec![]));
}

#[test]
fn live_toggle_only_touches_the_feed() {
    let mut harness = Harness::new();
    let (sink, chart) = chart(&harness, ChartMode::Ict);
    harness.run(chart.mount()).unwrap();

    chart.set_live(false).unwrap();
    assert_eq!(harness.push.live_count(), 0);
    assert_eq!(chart.feed_state(), FeedState::Closed);

    chart.set_live(true).unwrap();
    assert_eq!(harness.push.open_count(), 2);
    assert_eq!(chart.feed_state(), FeedState::Connecting);
    assert_eq!(sink.borrow().data_calls().len(), 1);
}

#[test]
fn resize_is_forwarded() {
    let harness = Harness::new();
    let (sink, chart) = chart(&harness, ChartMode::Ict);

    chart.resize(Dimensions::new(640, 300));

    assert_eq!(sink.borrow().series.dimensions(), Dimensions::new(640, 300));
}

#[test]
fn unmount_is_idempotent_and_releases_everything() {
    let mut harness = Harness::new();
    let (sink, chart) = chart(&harness, ChartMode::Ict);
    harness.run(chart.mount()).unwrap();
    assert_eq!(harness.deps.bus.subscriber_count(), 1);

    chart.unmount();
    chart.unmount();

    assert!(!chart.is_mounted());
    assert_eq!(harness.deps.bus.subscriber_count(), 0);
    assert_eq!(harness.push.live_count(), 0);

    let before = sink.borrow().calls.len();
    harness.push.emit_to(0, PushEvent::Text(tick_json("AAPL", "2025-09-19T12:34:00Z", 1.0)));
    assert_eq!(sink.borrow().calls.len(), before);
}

#[test]
fn mount_fails_when_no_transport_can_be_acquired() {
    let mut harness = Harness::with(FakePushChannel::failing(), ManualScheduler::failing(), SyncConfig::default());
    let (sink, chart) = chart(&harness, ChartMode::Ict);

    let err = harness.run(chart.mount()).unwrap_err();

    assert!(matches!(err, SyncError::ResourceAcquisition(_)));
    assert_eq!(sink.borrow().data_calls().len(), 1);
}

#[test]
fn feed_observer_follows_new_feeds() {
    let mut harness = Harness::new();
    let (_sink, chart) = chart(&harness, ChartMode::Ict);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    chart.on_feed_state(Rc::new(move |state| log.borrow_mut().push(state)));

    harness.run(chart.mount()).unwrap();
    harness.run(chart.set_target(Symbol::new("MSFT").unwrap(), ChartMode::Ict)).unwrap();

    assert_eq!(*seen.borrow(), vec![FeedState::Connecting, FeedState::Closed, FeedState::Connecting]);
}
