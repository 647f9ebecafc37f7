use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;

use super::context::SyncDeps;
use super::live_feed::{FeedObserver, FeedState, LiveFeedController};
use super::use_cases::{HistoryLoader, OverlayProjector};
use crate::domain::{
    chart::{ChartId, ChartMode, Dimensions, SeriesStyle, SeriesWriter, SharedSink},
    errors::SyncResult,
    events::{Broadcast, Subscription},
    logging::{LogComponent, get_logger},
    market_data::Symbol,
};

struct ChartState {
    symbol: Symbol,
    mode: ChartMode,
    scale: f64,
    signals_visible: bool,
    live: bool,
    mounted: bool,
    /// History of the current cycle has reached the sink.
    primed: bool,
    /// Bumped on every teardown; async work from older cycles is dropped.
    cycle: u64,
    feed: Option<Rc<LiveFeedController>>,
    subscription: Option<Subscription>,
    feed_observer: Option<FeedObserver>,
}

struct CoordinatorShared {
    id: ChartId,
    deps: SyncDeps,
    writer: SeriesWriter,
    history: HistoryLoader,
    projector: OverlayProjector,
    state: RefCell<ChartState>,
}

/// Owns the data lifecycle of one chart: history, live feed, overlays and
/// the chart's reaction to dashboard broadcasts.
///
/// `mount` and `set_target` perform their teardown synchronously and return
/// a future for the rebuild, which the caller drives (or spawns).
pub struct ChartSyncCoordinator {
    shared: Rc<CoordinatorShared>,
}

impl ChartSyncCoordinator {
    pub fn new(id: ChartId, symbol: Symbol, mode: ChartMode, sink: SharedSink, deps: SyncDeps) -> Self {
        let writer = SeriesWriter::new(sink);
        Self {
            shared: Rc::new(CoordinatorShared {
                id,
                history: HistoryLoader::new(Rc::clone(&deps.api)),
                projector: OverlayProjector::new(Rc::clone(&deps.api)),
                writer,
                deps,
                state: RefCell::new(ChartState {
                    symbol,
                    mode,
                    scale: 1.0,
                    signals_visible: true,
                    live: true,
                    mounted: false,
                    primed: false,
                    cycle: 0,
                    feed: None,
                    subscription: None,
                    feed_observer: None,
                }),
            }),
        }
    }

    /// History, then `set_data`, then the live feed, then overlays.
    pub fn mount(&self) -> LocalBoxFuture<'static, SyncResult<()>> {
        let needs_subscription = {
            let mut state = self.shared.state.borrow_mut();
            state.mounted = true;
            state.subscription.is_none()
        };
        if needs_subscription {
            let subscription = CoordinatorShared::subscribe(&self.shared);
            self.shared.state.borrow_mut().subscription = Some(subscription);
        }
        get_logger().info(
            LogComponent::Application("ChartSync"),
            &format!("🚀 Mounting chart {}", self.shared.id),
        );
        self.shared.apply_current_style();
        CoordinatorShared::rebuild(&self.shared)
    }

    /// Switch symbol and mode. The running feed is stopped before anything
    /// else happens.
    pub fn set_target(&self, symbol: Symbol, mode: ChartMode) -> LocalBoxFuture<'static, SyncResult<()>> {
        let mounted = {
            let mut state = self.shared.state.borrow_mut();
            state.symbol = symbol;
            state.mode = mode;
            state.mounted
        };
        if !mounted {
            return future::ready(Ok(())).boxed_local();
        }
        self.shared.apply_current_style();
        CoordinatorShared::rebuild(&self.shared)
    }

    /// Start or stop only the live feed.
    pub fn set_live(&self, live: bool) -> SyncResult<()> {
        let (ready, cycle, symbol, feed) = {
            let mut state = self.shared.state.borrow_mut();
            state.live = live;
            (state.mounted && state.primed, state.cycle, state.symbol.clone(), state.feed.clone())
        };
        // a pending rebuild picks up the flag once history is in
        if !ready {
            return Ok(());
        }
        match (live, feed) {
            (true, Some(feed)) if feed.state().is_live() => Ok(()),
            (true, Some(feed)) => feed.start(symbol),
            (true, None) => self.shared.start_feed(cycle, symbol),
            (false, Some(feed)) => {
                feed.stop();
                Ok(())
            }
            (false, None) => Ok(()),
        }
    }

    pub fn resize(&self, dimensions: Dimensions) {
        self.shared.writer.resize(dimensions);
    }

    /// Stop the feed and drop the bus subscription. Safe to call repeatedly.
    pub fn unmount(&self) {
        let (feed, subscription) = {
            let mut state = self.shared.state.borrow_mut();
            if !state.mounted {
                return;
            }
            state.mounted = false;
            state.cycle += 1;
            (state.feed.take(), state.subscription.take())
        };
        if let Some(feed) = feed {
            feed.stop();
        }
        drop(subscription);
        get_logger().info(
            LogComponent::Application("ChartSync"),
            &format!("Chart {} unmounted", self.shared.id),
        );
    }

    pub fn id(&self) -> &ChartId {
        &self.shared.id
    }

    pub fn symbol(&self) -> Symbol {
        self.shared.state.borrow().symbol.clone()
    }

    pub fn mode(&self) -> ChartMode {
        self.shared.state.borrow().mode
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.state.borrow().mounted
    }

    pub fn signals_visible(&self) -> bool {
        self.shared.state.borrow().signals_visible
    }

    pub fn feed_state(&self) -> FeedState {
        self.shared.state.borrow().feed.as_ref().map_or(FeedState::Closed, |feed| feed.state())
    }

    /// Report feed state changes, including those of feeds created later.
    pub fn on_feed_state(&self, observer: FeedObserver) {
        let feed = {
            let mut state = self.shared.state.borrow_mut();
            state.feed_observer = Some(Rc::clone(&observer));
            state.feed.clone()
        };
        if let Some(feed) = feed {
            feed.set_observer(observer);
        }
    }
}

impl CoordinatorShared {
    fn subscribe(this: &Rc<Self>) -> Subscription {
        let weak: Weak<Self> = Rc::downgrade(this);
        this.deps.bus.subscribe(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.on_broadcast(event);
            }
        })
    }

    fn is_current(&self, cycle: u64) -> bool {
        let state = self.state.borrow();
        state.mounted && state.cycle == cycle
    }

    fn apply_current_style(&self) {
        let style = {
            let state = self.state.borrow();
            SeriesStyle::for_mode(state.mode, state.scale)
        };
        self.writer.apply_style(&style);
    }

    /// Tear down the current cycle and return the rebuild of the next one.
    fn rebuild(this: &Rc<Self>) -> LocalBoxFuture<'static, SyncResult<()>> {
        let (cycle, symbol, old_feed) = {
            let mut state = this.state.borrow_mut();
            state.cycle += 1;
            state.primed = false;
            (state.cycle, state.symbol.clone(), state.feed.take())
        };
        if let Some(feed) = old_feed {
            feed.stop();
        }
        if let Err(e) = this.writer.clear_markers() {
            get_logger().warn(LogComponent::Application("ChartSync"), &format!("Failed to clear markers: {e}"));
        }

        let shared = Rc::clone(this);
        async move {
            let limit = shared.deps.config.history_limit;
            let loaded = shared.history.load(&symbol, limit).await;
            if !shared.is_current(cycle) {
                return Ok(());
            }
            let points = match loaded {
                Ok(window) => window.into_points(),
                Err(e) => {
                    // never leave the previous symbol's data on screen
                    get_logger().warn(
                        LogComponent::Application("ChartSync"),
                        &format!("{} starts empty: {e}", shared.id),
                    );
                    Vec::new()
                }
            };
            if let Err(e) = shared.writer.replace(&points) {
                get_logger().error(LogComponent::Application("ChartSync"), &format!("set_data rejected: {e}"));
            }
            let live = {
                let mut state = shared.state.borrow_mut();
                state.primed = true;
                state.live
            };

            if live {
                shared.start_feed(cycle, symbol)?;
            }
            shared.refresh_overlays(cycle).await;
            Ok(())
        }
        .boxed_local()
    }

    fn start_feed(&self, cycle: u64, symbol: Symbol) -> SyncResult<()> {
        let feed = Rc::new(LiveFeedController::new(self.deps.clone(), self.writer.clone()));
        let replaced = {
            let mut state = self.state.borrow_mut();
            if !(state.mounted && state.cycle == cycle) {
                return Ok(());
            }
            if let Some(observer) = &state.feed_observer {
                feed.set_observer(Rc::clone(observer));
            }
            state.feed.replace(Rc::clone(&feed))
        };
        if let Some(old) = replaced {
            old.stop();
        }
        feed.start(symbol).inspect_err(|e| {
            get_logger().error(
                LogComponent::Application("ChartSync"),
                &format!("❌ Live feed for {} failed to start: {e}", self.id),
            );
        })
    }

    async fn refresh_overlays(&self, cycle: u64) {
        let (symbol, wanted) = {
            let state = self.state.borrow();
            (state.symbol.clone(), state.mode.carries_overlays() && state.signals_visible)
        };
        if !wanted {
            return;
        }
        let markers = self.projector.project(&symbol, self.writer.last_time()).await;
        let still_wanted = self.is_current(cycle) && self.state.borrow().signals_visible;
        if !still_wanted {
            return;
        }
        if let Err(e) = self.writer.markers(&markers) {
            get_logger().warn(LogComponent::Application("ChartSync"), &format!("Markers rejected: {e}"));
        }
    }

    /// History and overlays again; the feed keeps running and a failed fetch
    /// keeps the data already shown.
    async fn refresh(self: Rc<Self>, cycle: u64) {
        let symbol = self.state.borrow().symbol.clone();
        let loaded = self.history.load(&symbol, self.deps.config.history_limit).await;
        if !self.is_current(cycle) {
            return;
        }
        match loaded {
            Ok(window) => {
                if let Err(e) = self.writer.replace(window.points()) {
                    get_logger().error(LogComponent::Application("ChartSync"), &format!("set_data rejected: {e}"));
                }
            }
            Err(e) => get_logger().warn(
                LogComponent::Application("ChartSync"),
                &format!("Refresh of {} kept previous data: {e}", self.id),
            ),
        }
        self.refresh_overlays(cycle).await;
    }

    fn spawn(&self, task: impl std::future::Future<Output = ()> + 'static) {
        if let Err(e) = self.deps.spawner.spawn_local(task) {
            get_logger().error(LogComponent::Application("ChartSync"), &format!("Failed to spawn task: {e:?}"));
        }
    }

    fn on_broadcast(self: &Rc<Self>, event: &Broadcast) {
        let cycle = {
            let state = self.state.borrow();
            if !state.mounted {
                return;
            }
            state.cycle
        };
        get_logger().debug(
            LogComponent::Application("ChartSync"),
            &format!("{} received {}", self.id, event.event_type()),
        );

        match event {
            Broadcast::RefreshAll => self.spawn(Rc::clone(self).refresh(cycle)),
            Broadcast::ResetView => self.writer.fit_view(),
            Broadcast::ScaleChanged(scale) => {
                self.state.borrow_mut().scale = *scale;
                self.apply_current_style();
            }
            Broadcast::ToggleSignals(id) if *id == self.id => {
                let visible = {
                    let mut state = self.state.borrow_mut();
                    state.signals_visible = !state.signals_visible;
                    state.signals_visible
                };
                if visible {
                    let shared = Rc::clone(self);
                    self.spawn(async move { shared.refresh_overlays(cycle).await });
                } else if let Err(e) = self.writer.clear_markers() {
                    get_logger().warn(LogComponent::Application("ChartSync"), &format!("Failed to clear markers: {e}"));
                }
            }
            Broadcast::ToggleSignals(_) => {}
        }
    }
}
