//! Trading-signal data as served by the backend's ICT endpoints.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumString};

use crate::time_utils::RawTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString, AsRefStr, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, StrumDisplay, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    #[default]
    Unresolved,
    Win,
    Loss,
}

/// A trade candidate. The server owns `outcome`; the client only observes it
/// by refetching.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignalEvent {
    #[serde(default)]
    pub id: u64,
    pub side: Side,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    #[serde(rename = "rr", alias = "risk_reward", default)]
    pub risk_reward: f64,
    #[serde(default, alias = "ts", alias = "time")]
    pub timestamp: Option<RawTime>,
    #[serde(default, deserialize_with = "outcome_or_unresolved")]
    pub outcome: Outcome,
}

/// Auxiliary overlay entry, e.g. a market-structure break.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverlayHint {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, alias = "ts")]
    pub time: Option<RawTime>,
}

impl OverlayHint {
    pub fn is_bearish(&self) -> bool {
        let kind = self.kind.to_ascii_lowercase();
        kind.ends_with("bear") || kind.ends_with("down")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OverlaySet {
    #[serde(default)]
    pub msb: Vec<OverlayHint>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SignalReport {
    #[serde(default)]
    pub candidates: Vec<SignalEvent>,
    #[serde(default)]
    pub overlays: OverlaySet,
}

/// Trailing 24h outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStats {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub unresolved: u32,
}

fn outcome_or_unresolved<'de, D>(deserializer: D) -> Result<Outcome, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.parse().ok()).unwrap_or_default())
}
