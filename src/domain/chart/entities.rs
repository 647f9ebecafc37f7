use std::collections::VecDeque;

use super::sink::{SeriesSink, validate_markers, validate_points};
use super::value_objects::{ChartMode, Dimensions, OverlayMarker, SeriesStyle};
use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::market_data::TimePoint;

/// Domain entity - in-memory line series
///
/// Reference implementation of [`SeriesSink`]; keeps exactly what a widget
/// would render so the sync layer can run headless.
#[derive(Debug, Clone)]
pub struct LineSeries {
    points: VecDeque<TimePoint>,
    markers: Vec<OverlayMarker>,
    style: SeriesStyle,
    dimensions: Dimensions,
    max_size: usize,
    scroll_offset: f64,
    fit_count: usize,
}

impl LineSeries {
    pub fn new(mode: ChartMode, max_size: usize) -> Self {
        Self {
            points: VecDeque::new(),
            markers: Vec::new(),
            style: SeriesStyle::for_mode(mode, 1.0),
            dimensions: Dimensions::new(800, 400),
            max_size,
            scroll_offset: 0.0,
            fit_count: 0,
        }
    }

    pub fn points(&self) -> Vec<TimePoint> {
        self.points.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<&TimePoint> {
        self.points.back()
    }

    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn markers(&self) -> &[OverlayMarker] {
        &self.markers
    }

    pub fn style(&self) -> &SeriesStyle {
        &self.style
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn fit_count(&self) -> usize {
        self.fit_count
    }

    /// Horizontal pan in bars from the right edge.
    pub fn scroll_by(&mut self, bars: f64) {
        self.scroll_offset += bars;
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Lowest and highest value currently held.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let first = self.points.front()?.value;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| (lo.min(p.value), hi.max(p.value))))
    }
}

impl SeriesSink for LineSeries {
    fn set_data(&mut self, points: &[TimePoint]) -> SyncResult<()> {
        validate_points(points)?;
        let skip = points.len().saturating_sub(self.max_size);
        self.points = points[skip..].iter().copied().collect();
        self.scroll_offset = 0.0;
        Ok(())
    }

    fn update(&mut self, point: TimePoint) -> SyncResult<()> {
        if !point.is_finite() {
            return Err(SyncError::InvalidSeriesInput(format!("non-finite value at {}", point.time)));
        }
        if let Some(last) = self.points.back_mut() {
            if point.time <= last.time {
                last.value = point.value;
                return Ok(());
            }
        }
        self.points.push_back(point);
        if self.points.len() > self.max_size {
            self.points.pop_front();
        }
        Ok(())
    }

    fn set_markers(&mut self, markers: &[OverlayMarker]) -> SyncResult<()> {
        validate_markers(markers)?;
        self.markers = markers.to_vec();
        Ok(())
    }

    fn resize(&mut self, dimensions: Dimensions) {
        self.dimensions = dimensions;
    }

    fn fit_view(&mut self) {
        self.scroll_offset = 0.0;
        self.fit_count += 1;
    }

    fn apply_style(&mut self, style: &SeriesStyle) {
        self.style = style.clone();
    }
}
