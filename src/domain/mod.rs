//! Domain layer: value objects, entities and the ports the sync layer talks to.

pub mod chart;
pub mod errors;
pub mod events;
pub mod logging;
pub mod market_data;
pub mod realtime;
pub mod signals;
