//! Realtime push channel for the browser and the wire DTO it carries.

pub mod browser_channel;
pub mod dto;

pub use browser_channel::*;
pub use dto::*;
