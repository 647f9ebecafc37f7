//! Browser implementations of the domain's runtime services.

use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};
use gloo_timers::callback::Interval;

use crate::domain::{
    errors::{SyncError, SyncResult},
    logging::{LogEntry, LogLevel, Logger, TimeProvider},
    realtime::{IntervalScheduler, TransportHandle},
};

/// Logger writing to the devtools console, filtered by level.
pub struct ConsoleLogger {
    min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    pub fn new_development() -> Self {
        Self::new(LogLevel::Debug)
    }

    pub fn new_production() -> Self {
        Self::new(LogLevel::Warn)
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }
        let line = entry.render();
        match entry.level {
            LogLevel::Debug => gloo::console::debug!(line),
            LogLevel::Info => gloo::console::info!(line),
            LogLevel::Warn => gloo::console::warn!(line),
            LogLevel::Error => gloo::console::error!(line),
        }
    }
}

/// Wall clock from `Date.now()`, formatted as UTC `HH:MM:SS.mmm`.
pub struct BrowserTimeProvider;

impl BrowserTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BrowserTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for BrowserTimeProvider {
    fn current_timestamp(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    fn format_timestamp(&self, timestamp: u64) -> String {
        let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(timestamp as f64));
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            date.get_utc_hours(),
            date.get_utc_minutes(),
            date.get_utc_seconds(),
            date.get_utc_milliseconds()
        )
    }
}

/// Runs futures on the page's microtask queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

/// `setInterval`-backed scheduler; closing the handle clears the interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserIntervalScheduler;

struct IntervalHandle(Option<Interval>);

impl TransportHandle for IntervalHandle {
    fn close(&mut self) {
        // dropping the Interval clears it
        self.0.take();
    }
}

impl IntervalScheduler for BrowserIntervalScheduler {
    fn every(&self, period: Duration, tick: Rc<dyn Fn()>) -> SyncResult<Box<dyn TransportHandle>> {
        let millis = u32::try_from(period.as_millis())
            .map_err(|_| SyncError::ResourceAcquisition(format!("interval {period:?} too long")))?;
        if web_sys::window().is_none() {
            return Err(SyncError::ResourceAcquisition("no window to schedule timers on".to_string()));
        }
        let interval = Interval::new(millis, move || tick());
        Ok(Box::new(IntervalHandle(Some(interval))))
    }
}
