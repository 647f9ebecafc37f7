use std::rc::Rc;

use crate::domain::{
    chart::{MarkerShape, OverlayMarker},
    logging::{LogComponent, get_logger},
    market_data::{MarketApi, Symbol},
    signals::{Side, SignalReport},
};
use crate::time_utils::{RawTime, normalize};

/// Use Case - turn the backend's signal report into chart markers
#[derive(Clone)]
pub struct OverlayProjector {
    api: Rc<dyn MarketApi>,
}

impl OverlayProjector {
    pub fn new(api: Rc<dyn MarketApi>) -> Self {
        Self { api }
    }

    /// Fetch and project. A failed fetch yields no markers, so the caller
    /// clears whatever was drawn before.
    pub async fn project(&self, symbol: &Symbol, anchor: Option<i64>) -> Vec<OverlayMarker> {
        match self.api.fetch_signals(symbol).await {
            Ok(report) => {
                let markers = project_report(&report, anchor);
                get_logger().debug(
                    LogComponent::Application("OverlayProjector"),
                    &format!("{} markers for {symbol}", markers.len()),
                );
                markers
            }
            Err(e) => {
                get_logger().warn(
                    LogComponent::Application("OverlayProjector"),
                    &format!("Signals for {symbol} unavailable, clearing markers: {e}"),
                );
                Vec::new()
            }
        }
    }
}

/// Pure projection. Events are placed at their own timestamp; events without
/// one sit on `anchor`, the newest time the series knows. Events with neither
/// are left out.
pub fn project_report(report: &SignalReport, anchor: Option<i64>) -> Vec<OverlayMarker> {
    let candidates = report.candidates.iter().filter_map(|event| {
        let time = event_time(event.timestamp.as_ref(), anchor)?;
        let shape = match event.side {
            Side::Long => MarkerShape::ArrowUp,
            Side::Short => MarkerShape::ArrowDown,
        };
        let text = format!("{} RR {:.2}", event.side.as_ref().to_uppercase(), event.risk_reward);
        Some(OverlayMarker::above(time, shape, text))
    });

    let hints = report.overlays.msb.iter().filter_map(|hint| {
        let time = event_time(hint.time.as_ref(), anchor)?;
        let shape = if hint.is_bearish() { MarkerShape::ArrowDown } else { MarkerShape::ArrowUp };
        Some(OverlayMarker::above(time, shape, hint.kind.clone()))
    });

    let mut markers: Vec<OverlayMarker> = candidates.chain(hints).collect();
    markers.sort_by_key(|m| m.time);
    markers
}

fn event_time(own: Option<&RawTime>, anchor: Option<i64>) -> Option<i64> {
    match own.map(normalize) {
        Some(Ok(time)) => Some(time),
        Some(Err(e)) => {
            get_logger().debug(
                LogComponent::Application("OverlayProjector"),
                &format!("Event time unusable, anchoring instead: {e}"),
            );
            anchor
        }
        None => anchor,
    }
}
