use std::rc::Rc;

use futures::task::LocalSpawn;

use crate::config::SyncConfig;
use crate::domain::{
    events::BroadcastBus,
    market_data::MarketApi,
    realtime::{IntervalScheduler, PushChannel},
};

/// Everything a chart session needs from the outside world.
///
/// Cloning shares the same API client, bus and runtime; each controller
/// still opens its own transports.
#[derive(Clone)]
pub struct SyncDeps {
    pub api: Rc<dyn MarketApi>,
    pub push: Rc<dyn PushChannel>,
    pub scheduler: Rc<dyn IntervalScheduler>,
    pub spawner: Rc<dyn LocalSpawn>,
    pub bus: BroadcastBus,
    pub config: Rc<SyncConfig>,
}

impl SyncDeps {
    pub fn new(
        api: Rc<dyn MarketApi>,
        push: Rc<dyn PushChannel>,
        scheduler: Rc<dyn IntervalScheduler>,
        spawner: Rc<dyn LocalSpawn>,
        config: SyncConfig,
    ) -> Self {
        Self { api, push, scheduler, spawner, bus: BroadcastBus::new(), config: Rc::new(config) }
    }

    pub fn with_bus(mut self, bus: BroadcastBus) -> Self {
        self.bus = bus;
        self
    }
}
