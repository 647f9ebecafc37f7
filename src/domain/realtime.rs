//! Ports for the live feed: a push channel and an interval timer.
//!
//! Both hand back a [`TransportHandle`] whose `close` releases the resource
//! synchronously. Handles also release on drop.

use std::rc::Rc;
use std::time::Duration;

use crate::domain::errors::SyncResult;

/// Notification from an open push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Opened,
    Text(String),
    /// Binary frames are not part of the protocol.
    Binary(usize),
    Error(String),
    Closed { code: u16, reason: String },
}

pub type PushListener = Rc<dyn Fn(PushEvent)>;

pub trait TransportHandle {
    fn close(&mut self);
}

pub trait PushChannel {
    /// Open a channel at `path`; events arrive through `listener` until the
    /// returned handle is closed.
    fn open(&self, path: &str, listener: PushListener) -> SyncResult<Box<dyn TransportHandle>>;
}

pub trait IntervalScheduler {
    /// Invoke `tick` every `period` until the handle is closed.
    fn every(&self, period: Duration, tick: Rc<dyn Fn()>) -> SyncResult<Box<dyn TransportHandle>>;
}
