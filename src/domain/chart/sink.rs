use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::value_objects::{Dimensions, OverlayMarker, SeriesStyle};
use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::market_data::TimePoint;

/// Capability surface a chart widget has to offer.
///
/// Batch operations are all-or-nothing: an implementation must validate the
/// whole input before touching its state.
pub trait SeriesSink {
    /// Full replace; also resets transient view state such as scroll offset.
    fn set_data(&mut self, points: &[TimePoint]) -> SyncResult<()>;
    /// Append, or replace the last point when `point.time` is not newer.
    fn update(&mut self, point: TimePoint) -> SyncResult<()>;
    fn set_markers(&mut self, markers: &[OverlayMarker]) -> SyncResult<()>;
    fn resize(&mut self, dimensions: Dimensions);
    fn fit_view(&mut self);
    fn apply_style(&mut self, style: &SeriesStyle);
}

pub type SharedSink = Rc<RefCell<dyn SeriesSink>>;

pub fn validate_points(points: &[TimePoint]) -> SyncResult<()> {
    if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
        return Err(SyncError::InvalidSeriesInput(format!("non-finite value at {}", bad.time)));
    }
    if let Some(pair) = points.windows(2).find(|pair| pair[1].time <= pair[0].time) {
        return Err(SyncError::InvalidSeriesInput(format!(
            "time not strictly increasing: {} after {}",
            pair[1].time, pair[0].time
        )));
    }
    Ok(())
}

pub fn validate_markers(markers: &[OverlayMarker]) -> SyncResult<()> {
    markers.iter().try_for_each(OverlayMarker::validate)
}

/// The only write path from the sync layer into a sink.
///
/// Tracks the last delivered time so that late or repeated updates are
/// folded into the last point instead of being appended out of order.
#[derive(Clone)]
pub struct SeriesWriter {
    sink: SharedSink,
    last_time: Rc<Cell<Option<i64>>>,
}

impl SeriesWriter {
    pub fn new(sink: SharedSink) -> Self {
        Self { sink, last_time: Rc::new(Cell::new(None)) }
    }

    pub fn replace(&self, points: &[TimePoint]) -> SyncResult<()> {
        validate_points(points)?;
        self.sink.borrow_mut().set_data(points)?;
        self.last_time.set(points.last().map(|p| p.time));
        Ok(())
    }

    /// Deliver one incremental point; returns the point as the sink saw it.
    pub fn push(&self, point: TimePoint) -> SyncResult<TimePoint> {
        if !point.is_finite() {
            return Err(SyncError::InvalidSeriesInput(format!("non-finite value at {}", point.time)));
        }
        let delivered = match self.last_time.get() {
            Some(last) if point.time <= last => TimePoint::new(last, point.value),
            _ => point,
        };
        self.sink.borrow_mut().update(delivered)?;
        self.last_time.set(Some(delivered.time));
        Ok(delivered)
    }

    pub fn markers(&self, markers: &[OverlayMarker]) -> SyncResult<()> {
        validate_markers(markers)?;
        self.sink.borrow_mut().set_markers(markers)
    }

    pub fn clear_markers(&self) -> SyncResult<()> {
        self.sink.borrow_mut().set_markers(&[])
    }

    pub fn fit_view(&self) {
        self.sink.borrow_mut().fit_view();
    }

    pub fn resize(&self, dimensions: Dimensions) {
        self.sink.borrow_mut().resize(dimensions);
    }

    pub fn apply_style(&self, style: &SeriesStyle) {
        self.sink.borrow_mut().apply_style(style);
    }

    pub fn last_time(&self) -> Option<i64> {
        self.last_time.get()
    }
}
