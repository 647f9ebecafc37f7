#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use chart_sync_wasm::application::SyncDeps;
use chart_sync_wasm::config::SyncConfig;
use chart_sync_wasm::domain::{
    chart::{ChartMode, Dimensions, LineSeries, OverlayMarker, SeriesSink, SeriesStyle, SharedSink},
    errors::{ApiError, ApiResult, SyncError, SyncResult},
    market_data::{MarketApi, PriceRecord, Symbol, TimePoint},
    realtime::{IntervalScheduler, PushChannel, PushEvent, PushListener, TransportHandle},
    signals::{Outcome, SignalReport, SignalStats},
};
use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::{self, FutureExt, LocalBoxFuture};

/// One scripted backend endpoint. Replies are keyed by symbol; `hold` parks
/// every later request until `release` is called.
pub struct Endpoint<T> {
    replies: RefCell<HashMap<String, ApiResult<T>>>,
    fallback: RefCell<ApiResult<T>>,
    hold: Cell<bool>,
    parked: RefCell<Vec<(oneshot::Sender<ApiResult<T>>, ApiResult<T>)>>,
    calls: RefCell<Vec<String>>,
}

impl<T: Clone + 'static> Endpoint<T> {
    fn new(fallback: ApiResult<T>) -> Self {
        Self {
            replies: RefCell::new(HashMap::new()),
            fallback: RefCell::new(fallback),
            hold: Cell::new(false),
            parked: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn reply(&self, symbol: &str, result: ApiResult<T>) {
        self.replies.borrow_mut().insert(symbol.to_string(), result);
    }

    pub fn reply_any(&self, result: ApiResult<T>) {
        *self.fallback.borrow_mut() = result;
    }

    pub fn hold(&self) {
        self.hold.set(true);
    }

    /// Resolve every parked request; returns how many there were.
    pub fn release(&self) -> usize {
        self.hold.set(false);
        let parked: Vec<_> = self.parked.borrow_mut().drain(..).collect();
        let count = parked.len();
        for (sender, result) in parked {
            let _ = sender.send(result);
        }
        count
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn respond(&self, symbol: &str) -> LocalBoxFuture<'static, ApiResult<T>> {
        self.calls.borrow_mut().push(symbol.to_string());
        let result = self
            .replies
            .borrow()
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| self.fallback.borrow().clone());
        if self.hold.get() {
            let (sender, receiver) = oneshot::channel();
            self.parked.borrow_mut().push((sender, result));
            receiver.map(|r| r.unwrap_or_else(|_| Err(ApiError::Request("abandoned".into())))).boxed_local()
        } else {
            future::ready(result).boxed_local()
        }
    }
}

pub struct FakeApi {
    pub history: Endpoint<Vec<PriceRecord>>,
    pub latest: Endpoint<PriceRecord>,
    pub signals: Endpoint<SignalReport>,
    pub narrative: Endpoint<Vec<String>>,
    pub stats: Endpoint<SignalStats>,
    pub ack: Endpoint<()>,
    pub acknowledged: RefCell<Vec<(u64, Outcome)>>,
    pub last_limit: Cell<usize>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            history: Endpoint::new(Ok(Vec::new())),
            latest: Endpoint::new(Err(ApiError::Status(404))),
            signals: Endpoint::new(Ok(SignalReport::default())),
            narrative: Endpoint::new(Ok(Vec::new())),
            stats: Endpoint::new(Ok(SignalStats::default())),
            ack: Endpoint::new(Ok(())),
            acknowledged: RefCell::new(Vec::new()),
            last_limit: Cell::new(0),
        }
    }
}

impl MarketApi for FakeApi {
    fn fetch_history(&self, symbol: &Symbol, limit: usize) -> LocalBoxFuture<'static, ApiResult<Vec<PriceRecord>>> {
        self.last_limit.set(limit);
        self.history.respond(symbol.value())
    }

    fn fetch_latest(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<PriceRecord>> {
        self.latest.respond(symbol.value())
    }

    fn fetch_signals(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<SignalReport>> {
        self.signals.respond(symbol.value())
    }

    fn fetch_narrative(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<Vec<String>>> {
        self.narrative.respond(symbol.value())
    }

    fn fetch_stats(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<SignalStats>> {
        self.stats.respond(symbol.value())
    }

    fn acknowledge(&self, event_id: u64, outcome: Outcome) -> LocalBoxFuture<'static, ApiResult<()>> {
        self.acknowledged.borrow_mut().push((event_id, outcome));
        self.ack.respond(&event_id.to_string())
    }
}

struct FakeHandle {
    closed: Rc<Cell<bool>>,
}

impl TransportHandle for FakeHandle {
    fn close(&mut self) {
        self.closed.set(true);
    }
}

struct FakeSocket {
    path: String,
    listener: PushListener,
    closed: Rc<Cell<bool>>,
}

/// Push channel whose sockets are driven by the test.
#[derive(Default)]
pub struct FakePushChannel {
    fail_open: Cell<bool>,
    sockets: RefCell<Vec<FakeSocket>>,
}

impl FakePushChannel {
    pub fn failing() -> Self {
        let channel = Self::default();
        channel.fail_open.set(true);
        channel
    }

    pub fn open_count(&self) -> usize {
        self.sockets.borrow().len()
    }

    /// Sockets opened and not yet closed.
    pub fn live_count(&self) -> usize {
        self.sockets.borrow().iter().filter(|s| !s.closed.get()).count()
    }

    pub fn is_closed(&self, index: usize) -> bool {
        self.sockets.borrow()[index].closed.get()
    }

    pub fn path(&self, index: usize) -> String {
        self.sockets.borrow()[index].path.clone()
    }

    /// Deliver to socket `index`, closed or not; a closed socket models a
    /// message already queued when the handle was released.
    pub fn emit_to(&self, index: usize, event: PushEvent) {
        let listener = Rc::clone(&self.sockets.borrow()[index].listener);
        listener(event);
    }

    pub fn emit(&self, event: PushEvent) {
        let last = self.open_count() - 1;
        self.emit_to(last, event);
    }

    pub fn send_text(&self, json: &str) {
        self.emit(PushEvent::Text(json.to_string()));
    }
}

impl PushChannel for FakePushChannel {
    fn open(&self, path: &str, listener: PushListener) -> SyncResult<Box<dyn TransportHandle>> {
        if self.fail_open.get() {
            return Err(SyncError::TransportError("connection refused".into()));
        }
        let closed = Rc::new(Cell::new(false));
        self.sockets.borrow_mut().push(FakeSocket {
            path: path.to_string(),
            listener,
            closed: Rc::clone(&closed),
        });
        Ok(Box::new(FakeHandle { closed }))
    }
}

struct Timer {
    period: Duration,
    tick: Rc<dyn Fn()>,
    cancelled: Rc<Cell<bool>>,
}

/// Interval scheduler that only fires when the test says so.
#[derive(Default)]
pub struct ManualScheduler {
    fail: Cell<bool>,
    timers: RefCell<Vec<Timer>>,
}

impl ManualScheduler {
    pub fn failing() -> Self {
        let scheduler = Self::default();
        scheduler.fail.set(true);
        scheduler
    }

    pub fn active_count(&self) -> usize {
        self.timers.borrow().iter().filter(|t| !t.cancelled.get()).count()
    }

    pub fn created_count(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn active_periods(&self) -> Vec<Duration> {
        self.timers.borrow().iter().filter(|t| !t.cancelled.get()).map(|t| t.period).collect()
    }

    /// Fire every active timer once.
    pub fn tick(&self) {
        let ticks: Vec<Rc<dyn Fn()>> = self
            .timers
            .borrow()
            .iter()
            .filter(|t| !t.cancelled.get())
            .map(|t| Rc::clone(&t.tick))
            .collect();
        for tick in ticks {
            tick();
        }
    }
}

impl IntervalScheduler for ManualScheduler {
    fn every(&self, period: Duration, tick: Rc<dyn Fn()>) -> SyncResult<Box<dyn TransportHandle>> {
        if self.fail.get() {
            return Err(SyncError::ResourceAcquisition("timers unavailable".into()));
        }
        let cancelled = Rc::new(Cell::new(false));
        self.timers.borrow_mut().push(Timer { period, tick, cancelled: Rc::clone(&cancelled) });
        Ok(Box::new(FakeHandle { closed: cancelled }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    SetData(Vec<TimePoint>),
    Update(TimePoint),
    SetMarkers(Vec<OverlayMarker>),
    Resize(Dimensions),
    FitView,
    ApplyStyle(SeriesStyle),
}

/// `LineSeries` that also logs every accepted call in order.
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
    pub series: LineSeries,
}

impl RecordingSink {
    pub fn new(mode: ChartMode) -> Self {
        Self { calls: Vec::new(), series: LineSeries::new(mode, 1_000) }
    }

    pub fn updates(&self) -> Vec<TimePoint> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::Update(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn data_calls(&self) -> Vec<Vec<TimePoint>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::SetData(points) => Some(points.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_markers(&self) -> Option<Vec<OverlayMarker>> {
        self.calls.iter().rev().find_map(|c| match c {
            SinkCall::SetMarkers(markers) => Some(markers.clone()),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&SinkCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl SeriesSink for RecordingSink {
    fn set_data(&mut self, points: &[TimePoint]) -> SyncResult<()> {
        self.series.set_data(points)?;
        self.calls.push(SinkCall::SetData(points.to_vec()));
        Ok(())
    }

    fn update(&mut self, point: TimePoint) -> SyncResult<()> {
        self.series.update(point)?;
        self.calls.push(SinkCall::Update(point));
        Ok(())
    }

    fn set_markers(&mut self, markers: &[OverlayMarker]) -> SyncResult<()> {
        self.series.set_markers(markers)?;
        self.calls.push(SinkCall::SetMarkers(markers.to_vec()));
        Ok(())
    }

    fn resize(&mut self, dimensions: Dimensions) {
        self.series.resize(dimensions);
        self.calls.push(SinkCall::Resize(dimensions));
    }

    fn fit_view(&mut self) {
        self.series.fit_view();
        self.calls.push(SinkCall::FitView);
    }

    fn apply_style(&mut self, style: &SeriesStyle) {
        self.series.apply_style(style);
        self.calls.push(SinkCall::ApplyStyle(style.clone()));
    }
}

pub fn recording_sink(mode: ChartMode) -> (Rc<RefCell<RecordingSink>>, SharedSink) {
    let sink = Rc::new(RefCell::new(RecordingSink::new(mode)));
    let shared: SharedSink = sink.clone();
    (sink, shared)
}

/// History record at `secs` seconds, sent as epoch milliseconds.
pub fn record(secs: i64, close: f64) -> PriceRecord {
    PriceRecord::new((secs * 1_000) as f64, close)
}

pub fn tick_json(symbol: &str, time: &str, close: f64) -> String {
    format!(r#"{{"symbol":"{symbol}","time":"{time}","close":{close}}}"#)
}

/// Fakes plus a single-threaded executor.
pub struct Harness {
    pub pool: LocalPool,
    pub api: Rc<FakeApi>,
    pub push: Rc<FakePushChannel>,
    pub scheduler: Rc<ManualScheduler>,
    pub deps: SyncDeps,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakePushChannel::default(), ManualScheduler::default(), SyncConfig::default())
    }

    pub fn with(push: FakePushChannel, scheduler: ManualScheduler, config: SyncConfig) -> Self {
        let pool = LocalPool::new();
        let api = Rc::new(FakeApi::default());
        let push = Rc::new(push);
        let scheduler = Rc::new(scheduler);
        let deps = SyncDeps::new(
            api.clone(),
            push.clone(),
            scheduler.clone(),
            Rc::new(pool.spawner()),
            config,
        );
        Self { pool, api, push, scheduler, deps }
    }

    pub fn run<F: std::future::Future>(&mut self, future: F) -> F::Output {
        self.pool.run_until(future)
    }

    /// Drive spawned tasks until none can make progress.
    pub fn settle(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Fire the timers, then let the spawned requests finish.
    pub fn tick(&mut self) {
        self.scheduler.tick();
        self.settle();
    }
}
