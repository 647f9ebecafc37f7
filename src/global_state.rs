//! Page-wide state shared by the JS bindings.
//!
//! The core never reads these; dashboards created from JS are wired to the
//! page bus here, so free functions such as `refreshAll()` reach all of them.

use std::cell::RefCell;

use crate::config::SyncConfig;
use crate::domain::events::{Broadcast, BroadcastBus};

thread_local! {
    static PAGE_BUS: BroadcastBus = BroadcastBus::new();
    static PAGE_CONFIG: RefCell<SyncConfig> = RefCell::new(SyncConfig::default());
}

pub fn page_bus() -> BroadcastBus {
    PAGE_BUS.with(BroadcastBus::clone)
}

pub fn publish(event: Broadcast) -> usize {
    PAGE_BUS.with(|bus| bus.publish(event))
}

pub fn page_config() -> SyncConfig {
    PAGE_CONFIG.with(|config| config.borrow().clone())
}

pub fn set_page_config(config: SyncConfig) {
    PAGE_CONFIG.with(|current| *current.borrow_mut() = config);
}
