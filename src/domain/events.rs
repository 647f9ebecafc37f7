//! Broadcast events fired by the surrounding UI and the bus that carries them.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::chart::ChartId;

/// Fire-and-forget notifications consumed by chart coordinators.
#[derive(Debug, Clone, PartialEq)]
pub enum Broadcast {
    /// Re-run history and overlays for every chart.
    RefreshAll,
    ResetView,
    /// Flip signal visibility for one chart.
    ToggleSignals(ChartId),
    ScaleChanged(f64),
}

impl Broadcast {
    pub fn event_type(&self) -> &'static str {
        match self {
            Broadcast::RefreshAll => "RefreshAll",
            Broadcast::ResetView => "ResetView",
            Broadcast::ToggleSignals(_) => "ToggleSignals",
            Broadcast::ScaleChanged(_) => "ScaleChanged",
        }
    }
}

type Handler = Rc<dyn Fn(&Broadcast)>;

struct Registry {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(u64, Handler)>>,
}

/// In-memory publish/subscribe bus.
///
/// Handlers are snapshotted before dispatch, so a handler may subscribe or
/// unsubscribe while an event is being delivered.
#[derive(Clone)]
pub struct BroadcastBus {
    registry: Rc<Registry>,
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastBus {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(Registry { next_id: Cell::new(0), handlers: RefCell::new(Vec::new()) }),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Broadcast) + 'static,
    {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        self.registry.handlers.borrow_mut().push((id, Rc::new(handler)));
        Subscription { registry: Rc::downgrade(&self.registry), id: Some(id) }
    }

    /// Returns how many handlers saw the event.
    pub fn publish(&self, event: Broadcast) -> usize {
        let snapshot: Vec<Handler> =
            self.registry.handlers.borrow().iter().map(|(_, h)| Rc::clone(h)).collect();
        for handler in &snapshot {
            handler(&event);
        }
        snapshot.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handlers.borrow().len()
    }
}

/// Owned registration on a [`BroadcastBus`]; unsubscribes when dropped.
pub struct Subscription {
    registry: Weak<Registry>,
    id: Option<u64>,
}

impl Subscription {
    pub fn cancel(&mut self) {
        if let (Some(id), Some(registry)) = (self.id.take(), self.registry.upgrade()) {
            registry.handlers.borrow_mut().retain(|(handler_id, _)| *handler_id != id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.registry.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
