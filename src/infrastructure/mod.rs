//! Browser adapters for the domain ports.

pub mod http;
pub mod services;
pub mod websocket;

pub use http::HttpMarketApi;
pub use services::{BrowserIntervalScheduler, BrowserSpawner, BrowserTimeProvider, ConsoleLogger};
pub use websocket::BrowserPushChannel;
