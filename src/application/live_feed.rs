//! Live feed for one chart: push channel first, interval polling as fallback.
//!
//! Every `start` begins a new session. Callbacks from transports and
//! resolved fetches carry the session they were created for and are dropped
//! once it is no longer current, which is what makes `stop` final.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use derive_more::Display;
use futures::task::LocalSpawnExt;

use super::context::SyncDeps;
use crate::domain::{
    chart::SeriesWriter,
    errors::{ApiResult, SyncError, SyncResult},
    logging::{LogComponent, get_logger},
    market_data::{PriceRecord, Symbol, TimePoint},
    realtime::{PushEvent, PushListener, TransportHandle},
};
use crate::infrastructure::websocket::parse_realtime_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FeedTransport {
    #[display(fmt = "push")]
    Push,
    #[display(fmt = "poll")]
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FeedState {
    #[display(fmt = "closed")]
    Closed,
    #[display(fmt = "connecting")]
    Connecting,
    #[display(fmt = "streaming ({})", _0)]
    Streaming(FeedTransport),
    /// Push failed, polling scheduled but nothing delivered yet.
    #[display(fmt = "degraded")]
    Degraded,
}

impl FeedState {
    pub fn is_live(&self) -> bool {
        !matches!(self, FeedState::Closed)
    }
}

/// Counters since the controller was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub delivered: u64,
    /// Malformed or unusable messages.
    pub dropped: u64,
    /// Well-formed data that arrived for another symbol or a dead session.
    pub discarded: u64,
}

pub type FeedObserver = Rc<dyn Fn(FeedState)>;

struct FeedInner {
    state: FeedState,
    session: u64,
    symbol: Option<Symbol>,
    push_disabled: bool,
    transport: Option<Box<dyn TransportHandle>>,
    poll_in_flight: bool,
    observer: Option<FeedObserver>,
    stats: FeedStats,
}

struct FeedShared {
    inner: RefCell<FeedInner>,
    writer: SeriesWriter,
    deps: SyncDeps,
}

/// State machine driving incremental updates into one sink.
///
/// No `RefCell` borrow is held while calling into transports, the scheduler
/// or the observer, so any of them may call back synchronously.
pub struct LiveFeedController {
    shared: Rc<FeedShared>,
}

impl LiveFeedController {
    pub fn new(deps: SyncDeps, writer: SeriesWriter) -> Self {
        Self {
            shared: Rc::new(FeedShared {
                inner: RefCell::new(FeedInner {
                    state: FeedState::Closed,
                    session: 0,
                    symbol: None,
                    push_disabled: false,
                    transport: None,
                    poll_in_flight: false,
                    observer: None,
                    stats: FeedStats::default(),
                }),
                writer,
                deps,
            }),
        }
    }

    /// Begin streaming `symbol`, replacing any running session.
    ///
    /// Fails only when the push channel cannot be used and polling cannot be
    /// scheduled either.
    pub fn start(&self, symbol: Symbol) -> SyncResult<()> {
        self.stop();
        let (session, push_disabled) = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.symbol = Some(symbol.clone());
            (inner.session, inner.push_disabled)
        };

        if push_disabled {
            get_logger().info(
                LogComponent::Application("LiveFeed"),
                &format!("🔁 Push disabled for this feed, polling {symbol}"),
            );
            self.shared.transition(session, FeedState::Degraded);
            return self.shared.begin_polling(session);
        }

        get_logger().info(
            LogComponent::Application("LiveFeed"),
            &format!("🔴 Starting live feed for {symbol}"),
        );
        self.shared.transition(session, FeedState::Connecting);

        let listener = FeedShared::listener(&self.shared, session);
        let path = self.shared.deps.config.realtime_path.clone();
        match self.shared.deps.push.open(&path, listener) {
            Ok(handle) => {
                self.shared.adopt_push(session, handle);
                Ok(())
            }
            Err(e) => self.shared.fall_back(session, e),
        }
    }

    /// Release the transport and end the session. Nothing reaches the sink
    /// after this returns.
    pub fn stop(&self) {
        let (handle, observer, previous) = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.session += 1;
            inner.poll_in_flight = false;
            let previous = inner.state;
            inner.state = FeedState::Closed;
            (inner.transport.take(), inner.observer.clone(), previous)
        };
        if let Some(mut handle) = handle {
            handle.close();
        }
        if previous != FeedState::Closed {
            get_logger().info(LogComponent::Application("LiveFeed"), "⏹️ Live feed stopped");
            if let Some(observer) = observer {
                observer(FeedState::Closed);
            }
        }
    }

    pub fn state(&self) -> FeedState {
        self.shared.inner.borrow().state
    }

    pub fn stats(&self) -> FeedStats {
        self.shared.inner.borrow().stats
    }

    pub fn symbol(&self) -> Option<Symbol> {
        self.shared.inner.borrow().symbol.clone()
    }

    /// True once this controller has given up on the push channel.
    pub fn push_disabled(&self) -> bool {
        self.shared.inner.borrow().push_disabled
    }

    pub fn has_transport(&self) -> bool {
        self.shared.inner.borrow().transport.is_some()
    }

    pub fn set_observer(&self, observer: FeedObserver) {
        self.shared.inner.borrow_mut().observer = Some(observer);
    }
}

impl FeedShared {
    fn listener(this: &Rc<Self>, session: u64) -> PushListener {
        let weak: Weak<Self> = Rc::downgrade(this);
        Rc::new(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.on_push_event(session, event);
            }
        })
    }

    fn is_current(&self, session: u64) -> bool {
        self.inner.borrow().session == session
    }

    fn count(&self, update: impl FnOnce(&mut FeedStats)) {
        update(&mut self.inner.borrow_mut().stats);
    }

    fn transition(&self, session: u64, next: FeedState) {
        let observer = {
            let mut inner = self.inner.borrow_mut();
            if inner.session != session || inner.state == next {
                return;
            }
            inner.state = next;
            inner.observer.clone()
        };
        get_logger().info(LogComponent::Application("LiveFeed"), &format!("Feed is now {next}"));
        if let Some(observer) = observer {
            observer(next);
        }
    }

    fn adopt_push(&self, session: u64, mut handle: Box<dyn TransportHandle>) {
        // the listener may already have fired during open and moved us on
        let usable = {
            let inner = self.inner.borrow();
            inner.session == session
                && !inner.push_disabled
                && matches!(inner.state, FeedState::Connecting | FeedState::Streaming(FeedTransport::Push))
        };
        if usable {
            self.inner.borrow_mut().transport = Some(handle);
        } else {
            handle.close();
        }
    }

    /// Switch to polling. Runs at most once per controller.
    fn fall_back(self: &Rc<Self>, session: u64, cause: SyncError) -> SyncResult<()> {
        let old = {
            let mut inner = self.inner.borrow_mut();
            if inner.session != session || inner.push_disabled {
                return Ok(());
            }
            inner.push_disabled = true;
            inner.transport.take()
        };
        get_logger().warn(
            LogComponent::Application("LiveFeed"),
            &format!("⚠️ Push channel unusable ({cause}), falling back to polling"),
        );
        if let Some(mut old) = old {
            old.close();
        }
        self.transition(session, FeedState::Degraded);
        self.begin_polling(session)
    }

    fn begin_polling(self: &Rc<Self>, session: u64) -> SyncResult<()> {
        let period = self.deps.config.poll_interval();
        let weak = Rc::downgrade(self);
        let tick: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.poll_once(session);
            }
        });

        match self.deps.scheduler.every(period, tick) {
            Ok(handle) => {
                let rejected = {
                    let mut inner = self.inner.borrow_mut();
                    if inner.session == session {
                        inner.transport = Some(handle);
                        None
                    } else {
                        Some(handle)
                    }
                };
                if let Some(mut stale) = rejected {
                    stale.close();
                } else {
                    get_logger().info(
                        LogComponent::Application("LiveFeed"),
                        &format!("🔁 Polling every {} ms", period.as_millis()),
                    );
                }
                Ok(())
            }
            Err(e) => {
                get_logger().error(
                    LogComponent::Application("LiveFeed"),
                    &format!("❌ Polling could not be scheduled: {e}"),
                );
                self.transition(session, FeedState::Closed);
                Err(SyncError::ResourceAcquisition(format!(
                    "no push channel and no polling timer: {e}"
                )))
            }
        }
    }

    fn poll_once(self: &Rc<Self>, session: u64) {
        let symbol = {
            let mut inner = self.inner.borrow_mut();
            if inner.session != session || inner.poll_in_flight {
                return;
            }
            let Some(symbol) = inner.symbol.clone() else {
                return;
            };
            inner.poll_in_flight = true;
            symbol
        };

        let request = self.deps.api.fetch_latest(&symbol);
        let weak = Rc::downgrade(self);
        let spawned = self.deps.spawner.spawn_local(async move {
            let result = request.await;
            if let Some(shared) = weak.upgrade() {
                shared.on_poll_result(session, result);
            }
        });
        if let Err(e) = spawned {
            get_logger().error(
                LogComponent::Application("LiveFeed"),
                &format!("Failed to spawn poll request: {e:?}"),
            );
            self.inner.borrow_mut().poll_in_flight = false;
        }
    }

    fn on_poll_result(&self, session: u64, result: ApiResult<PriceRecord>) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.session != session {
                inner.stats.discarded += 1;
                return;
            }
            inner.poll_in_flight = false;
        }
        match result {
            Ok(record) => match record.to_point() {
                Ok(point) => self.deliver(session, point, FeedTransport::Poll),
                Err(e) => {
                    self.count(|s| s.dropped += 1);
                    get_logger().warn(
                        LogComponent::Application("LiveFeed"),
                        &format!("Dropping poll result: {e}"),
                    );
                }
            },
            Err(e) => get_logger().warn(
                LogComponent::Application("LiveFeed"),
                &format!("Poll request failed: {e}"),
            ),
        }
    }

    fn on_push_event(self: &Rc<Self>, session: u64, event: PushEvent) {
        let active = {
            let inner = self.inner.borrow();
            inner.session == session && !inner.push_disabled
        };
        if !active {
            self.count(|s| s.discarded += 1);
            return;
        }

        let outcome = match event {
            PushEvent::Opened => {
                get_logger().debug(LogComponent::Application("LiveFeed"), "Push channel open");
                Ok(())
            }
            PushEvent::Text(data) => {
                self.on_push_text(session, &data);
                Ok(())
            }
            PushEvent::Binary(len) => {
                self.count(|s| s.dropped += 1);
                get_logger().warn(
                    LogComponent::Application("LiveFeed"),
                    &format!("{}", SyncError::MalformedMessage(format!("binary frame of {len} bytes"))),
                );
                Ok(())
            }
            PushEvent::Error(reason) => self.fall_back(session, SyncError::TransportError(reason)),
            PushEvent::Closed { code, reason } => self.fall_back(
                session,
                SyncError::TransportError(format!("closed with code {code}: {reason}")),
            ),
        };

        if let Err(e) = outcome {
            get_logger().error(LogComponent::Application("LiveFeed"), &format!("❌ Live feed halted: {e}"));
        }
    }

    fn on_push_text(&self, session: u64, data: &str) {
        let message = match parse_realtime_message(data) {
            Ok(message) => message,
            Err(e) => {
                self.count(|s| s.dropped += 1);
                get_logger().warn(LogComponent::Application("LiveFeed"), &format!("{e}"));
                return;
            }
        };

        let wanted = self.inner.borrow().symbol.as_ref().is_some_and(|s| s.matches(&message.symbol));
        if !wanted {
            self.count(|s| s.discarded += 1);
            return;
        }

        match message.to_point() {
            Ok(point) => self.deliver(session, point, FeedTransport::Push),
            Err(e) => {
                self.count(|s| s.dropped += 1);
                get_logger().warn(
                    LogComponent::Application("LiveFeed"),
                    &format!("Dropping {} tick: {e}", message.symbol),
                );
            }
        }
    }

    fn deliver(&self, session: u64, point: TimePoint, via: FeedTransport) {
        if !self.is_current(session) {
            self.count(|s| s.discarded += 1);
            return;
        }
        if let Err(e) = self.writer.push(point) {
            self.count(|s| s.dropped += 1);
            get_logger().warn(LogComponent::Application("LiveFeed"), &format!("Sink rejected update: {e}"));
            return;
        }

        let next = {
            let mut inner = self.inner.borrow_mut();
            inner.stats.delivered += 1;
            match (inner.state, via) {
                (FeedState::Connecting, FeedTransport::Push) => Some(FeedState::Streaming(FeedTransport::Push)),
                (FeedState::Degraded, FeedTransport::Poll) => Some(FeedState::Streaming(FeedTransport::Poll)),
                _ => None,
            }
        };
        if let Some(next) = next {
            self.transition(session, next);
        }
    }
}
