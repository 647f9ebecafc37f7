use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

use crate::domain::errors::SyncError;

/// Value Object - Analysis mode of a chart panel
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    #[display(fmt = "ict")]
    #[strum(serialize = "ict")]
    Ict,
    #[display(fmt = "gann")]
    #[strum(serialize = "gann")]
    Gann,
    #[display(fmt = "math")]
    #[strum(serialize = "math")]
    Math,
    #[display(fmt = "momentum")]
    #[strum(serialize = "momentum")]
    Momentum,
}

impl ChartMode {
    /// Only ICT panels draw signal markers.
    pub fn carries_overlays(&self) -> bool {
        matches!(self, Self::Ict)
    }

    pub fn line_color(&self) -> &'static str {
        match self {
            Self::Gann => "#ffa14b",
            _ => "#5fd3c9",
        }
    }
}

/// Value Object - Dashboard slot identifier (`c1`..`c4`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{}", _0)]
pub struct ChartId(String);

impl ChartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Value Object - Line appearance derived from mode and UI scale
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStyle {
    pub color: String,
    pub line_width: f64,
}

impl SeriesStyle {
    pub const BASE_LINE_WIDTH: f64 = 2.0;

    pub fn for_mode(mode: ChartMode, scale: f64) -> Self {
        Self { color: mode.line_color().to_string(), line_width: Self::BASE_LINE_WIDTH * scale }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerPosition {
    #[serde(rename = "aboveBar")]
    AboveBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerShape {
    #[serde(rename = "arrowUp")]
    ArrowUp,
    #[serde(rename = "arrowDown")]
    ArrowDown,
}

/// Value Object - Annotation pinned to the series time axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayMarker {
    pub time: i64,
    pub position: MarkerPosition,
    pub color: String,
    pub shape: MarkerShape,
    pub text: String,
}

impl OverlayMarker {
    pub const SIGNAL_COLOR: &'static str = "#ffde59";

    pub fn above(time: i64, shape: MarkerShape, text: impl Into<String>) -> Self {
        Self {
            time,
            position: MarkerPosition::AboveBar,
            color: Self::SIGNAL_COLOR.to_string(),
            shape,
            text: text.into(),
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.time < 0 {
            return Err(SyncError::InvalidSeriesInput(format!("marker time {} < 0", self.time)));
        }
        if self.text.trim().is_empty() {
            return Err(SyncError::InvalidSeriesInput("marker without text".to_string()));
        }
        if self.color.trim().is_empty() {
            return Err(SyncError::InvalidSeriesInput("marker without color".to_string()));
        }
        Ok(())
    }
}
