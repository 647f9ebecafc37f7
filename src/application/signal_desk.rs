use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;

use super::context::SyncDeps;
use crate::domain::{
    errors::{ApiResult, SyncError, SyncResult},
    logging::LogComponent,
    market_data::Symbol,
    realtime::TransportHandle,
    signals::{Outcome, SignalReport, SignalStats},
};
use crate::{log_debug, log_error, log_warn};

/// Last fetched view of the signal panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeskSnapshot {
    pub report: SignalReport,
    pub narrative: Vec<String>,
    pub stats: SignalStats,
}

pub type DeskListener = Rc<dyn Fn(&DeskSnapshot)>;

struct DeskState {
    symbol: Symbol,
    /// Bumped by `stop` and `set_symbol`; older responses are ignored.
    epoch: u64,
    snapshot: DeskSnapshot,
    timer: Option<Box<dyn TransportHandle>>,
    listener: Option<DeskListener>,
}

struct DeskShared {
    deps: SyncDeps,
    state: RefCell<DeskState>,
}

/// Candidate list, narrative and outcome stats for one symbol, with
/// periodic refresh and outcome acknowledgement.
pub struct SignalDesk {
    shared: Rc<DeskShared>,
}

impl SignalDesk {
    pub fn new(deps: SyncDeps, symbol: Symbol) -> Self {
        Self {
            shared: Rc::new(DeskShared {
                deps,
                state: RefCell::new(DeskState {
                    symbol,
                    epoch: 0,
                    snapshot: DeskSnapshot::default(),
                    timer: None,
                    listener: None,
                }),
            }),
        }
    }

    /// Fetch all three parts once. Each part that fails is reset to empty.
    pub fn refresh(&self) -> LocalBoxFuture<'static, ()> {
        DeskShared::refresh(&self.shared)
    }

    /// Refresh now and then on every tick of the configured period.
    pub fn start_auto_refresh(&self) -> SyncResult<()> {
        self.stop();
        let weak: Weak<DeskShared> = Rc::downgrade(&self.shared);
        let tick: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.spawn_refresh();
            }
        });

        let period = self.shared.deps.config.desk_refresh();
        let handle = self
            .shared
            .deps
            .scheduler
            .every(period, tick)
            .map_err(|e| SyncError::ResourceAcquisition(format!("signal refresh timer: {e}")))?;
        self.shared.state.borrow_mut().timer = Some(handle);
        self.shared.spawn_refresh();
        Ok(())
    }

    pub fn stop(&self) {
        let timer = {
            let mut state = self.shared.state.borrow_mut();
            state.epoch += 1;
            state.timer.take()
        };
        if let Some(mut timer) = timer {
            timer.close();
        }
    }

    /// Switch symbol; the old symbol's snapshot is cleared immediately.
    pub fn set_symbol(&self, symbol: Symbol) {
        let listener = {
            let mut state = self.shared.state.borrow_mut();
            state.epoch += 1;
            state.symbol = symbol;
            state.snapshot = DeskSnapshot::default();
            state.listener.clone()
        };
        if let Some(listener) = listener {
            listener(&DeskSnapshot::default());
        }
    }

    /// Post a win/loss outcome and refetch. The snapshot only changes through
    /// the refetch, never optimistically.
    pub fn acknowledge(&self, event_id: u64, outcome: Outcome) -> LocalBoxFuture<'static, SyncResult<()>> {
        let shared = Rc::clone(&self.shared);
        let epoch = shared.state.borrow().epoch;
        async move {
            if outcome == Outcome::Unresolved {
                return Err(SyncError::ValidationError("only win or loss can be acknowledged".to_string()));
            }
            shared.deps.api.acknowledge(event_id, outcome).await.map_err(|e| {
                log_warn!(LogComponent::Application("SignalDesk"), "❌ Acknowledge of {event_id} failed: {e}");
                SyncError::AcknowledgeFailed(e)
            })?;
            // stopped or switched symbol while the post was in flight
            if shared.state.borrow().epoch != epoch {
                return Ok(());
            }
            DeskShared::refresh(&shared).await;
            Ok(())
        }
        .boxed_local()
    }

    pub fn snapshot(&self) -> DeskSnapshot {
        self.shared.state.borrow().snapshot.clone()
    }

    pub fn symbol(&self) -> Symbol {
        self.shared.state.borrow().symbol.clone()
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.shared.state.borrow().timer.is_some()
    }

    pub fn on_change(&self, listener: DeskListener) {
        self.shared.state.borrow_mut().listener = Some(listener);
    }
}

impl DeskShared {
    fn refresh(this: &Rc<Self>) -> LocalBoxFuture<'static, ()> {
        let (symbol, epoch) = {
            let state = this.state.borrow();
            (state.symbol.clone(), state.epoch)
        };
        let api = Rc::clone(&this.deps.api);
        let signals = api.fetch_signals(&symbol);
        let narrative = api.fetch_narrative(&symbol);
        let stats = api.fetch_stats(&symbol);
        let shared = Rc::clone(this);

        async move {
            let (signals, narrative, stats) = futures::join!(signals, narrative, stats);
            let snapshot = DeskSnapshot {
                report: or_empty("signals", signals),
                narrative: or_empty("narrative", narrative),
                stats: or_empty("stats", stats),
            };

            let listener = {
                let mut state = shared.state.borrow_mut();
                if state.epoch != epoch {
                    return;
                }
                state.snapshot = snapshot.clone();
                state.listener.clone()
            };
            log_debug!(
                LogComponent::Application("SignalDesk"),
                "{symbol}: {} candidates, {} narrative lines",
                snapshot.report.candidates.len(),
                snapshot.narrative.len()
            );
            if let Some(listener) = listener {
                listener(&snapshot);
            }
        }
        .boxed_local()
    }

    fn spawn_refresh(self: &Rc<Self>) {
        if let Err(e) = self.deps.spawner.spawn_local(Self::refresh(self)) {
            log_error!(LogComponent::Application("SignalDesk"), "Failed to spawn refresh: {e:?}");
        }
    }
}

fn or_empty<T: Default>(part: &str, result: ApiResult<T>) -> T {
    result.unwrap_or_else(|e| {
        log_warn!(LogComponent::Application("SignalDesk"), "{part} unavailable: {e}");
        T::default()
    })
}
