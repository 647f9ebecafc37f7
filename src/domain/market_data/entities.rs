use serde::Deserialize;

use super::value_objects::{Symbol, TimePoint};
use crate::domain::errors::SyncError;
use crate::time_utils::{RawTime, normalize};

/// Wire record shared by the history and realtime-poll endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceRecord {
    pub time: RawTime,
    pub close: f64,
}

impl PriceRecord {
    pub fn new(time: impl Into<RawTime>, close: f64) -> Self {
        Self { time: time.into(), close }
    }

    pub fn to_point(&self) -> Result<TimePoint, SyncError> {
        let time = normalize(&self.time)?;
        if !self.close.is_finite() {
            return Err(SyncError::InvalidSeriesInput(format!("non-finite close at {time}")));
        }
        Ok(TimePoint::new(time, self.close))
    }
}

/// Domain entity - bounded, ordered history for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    symbol: Symbol,
    points: Vec<TimePoint>,
    dropped: usize,
}

impl HistoryWindow {
    /// Build a sink-ready window: unusable records are skipped, points are
    /// sorted, equal timestamps collapse to the later record, and only the
    /// newest `limit` points survive.
    pub fn from_records(symbol: Symbol, records: &[PriceRecord], limit: usize) -> Self {
        let mut dropped = 0;
        let mut points: Vec<TimePoint> = records
            .iter()
            .filter_map(|record| match record.to_point() {
                Ok(point) => Some(point),
                Err(_) => {
                    dropped += 1;
                    None
                }
            })
            .collect();

        points.sort_by_key(|p| p.time);

        let mut merged: Vec<TimePoint> = Vec::with_capacity(points.len());
        for point in points {
            match merged.last_mut() {
                Some(last) if last.time == point.time => *last = point,
                _ => merged.push(point),
            }
        }

        if merged.len() > limit {
            merged.drain(..merged.len() - limit);
        }

        Self { symbol, points: merged, dropped }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<TimePoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Records discarded because of bad timestamps or values.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn latest_time(&self) -> Option<i64> {
        self.points.last().map(|p| p.time)
    }
}
