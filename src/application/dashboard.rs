use futures::future::{self, FutureExt, LocalBoxFuture};

use super::context::SyncDeps;
use super::coordinator::ChartSyncCoordinator;
use super::signal_desk::SignalDesk;
use crate::domain::{
    chart::{ChartId, ChartMode, SharedSink},
    errors::{SyncError, SyncResult},
    events::Broadcast,
    logging::LogComponent,
    market_data::Symbol,
};
use crate::log_info;

/// Fixed panel layout of the dashboard.
pub const LAYOUT: [(&str, ChartMode); 4] = [
    ("c1", ChartMode::Ict),
    ("c2", ChartMode::Gann),
    ("c3", ChartMode::Math),
    ("c4", ChartMode::Momentum),
];

/// Four chart panels on one symbol plus the signal desk.
///
/// The panels share the API client and the broadcast bus; every panel owns
/// its feed and transports.
pub struct Dashboard {
    deps: SyncDeps,
    charts: Vec<ChartSyncCoordinator>,
    desk: SignalDesk,
}

impl Dashboard {
    /// One sink per panel of [`LAYOUT`], in order.
    pub fn new(deps: SyncDeps, sinks: Vec<SharedSink>) -> SyncResult<Self> {
        if sinks.len() != LAYOUT.len() {
            return Err(SyncError::ValidationError(format!(
                "expected {} sinks, got {}",
                LAYOUT.len(),
                sinks.len()
            )));
        }
        let symbol = deps.config.default_symbol()?;
        let charts = LAYOUT
            .iter()
            .zip(sinks)
            .map(|((id, mode), sink)| {
                ChartSyncCoordinator::new(ChartId::new(*id), symbol.clone(), *mode, sink, deps.clone())
            })
            .collect();
        let desk = SignalDesk::new(deps.clone(), symbol);
        Ok(Self { deps, charts, desk })
    }

    /// Mount every panel and start the desk's auto refresh.
    pub fn mount_all(&self) -> LocalBoxFuture<'static, SyncResult<()>> {
        let mounts: Vec<_> = self.charts.iter().map(ChartSyncCoordinator::mount).collect();
        let desk = self.desk.start_auto_refresh();
        async move {
            let results = future::join_all(mounts).await;
            desk?;
            results.into_iter().collect::<SyncResult<Vec<()>>>().map(|_| ())
        }
        .boxed_local()
    }

    pub fn set_symbol(&self, symbol: Symbol) -> LocalBoxFuture<'static, SyncResult<()>> {
        log_info!(LogComponent::Application("Dashboard"), "🔄 Switching dashboard to {symbol}");
        let rebuilds: Vec<_> = self
            .charts
            .iter()
            .map(|chart| chart.set_target(symbol.clone(), chart.mode()))
            .collect();
        self.desk.set_symbol(symbol);
        let desk = self.desk.refresh();
        async move {
            let (results, ()) = future::join(future::join_all(rebuilds), desk).await;
            results.into_iter().collect::<SyncResult<Vec<()>>>().map(|_| ())
        }
        .boxed_local()
    }

    pub fn set_scale(&self, scale: f64) -> SyncResult<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(SyncError::ValidationError(format!("scale must be positive, got {scale}")));
        }
        self.deps.bus.publish(Broadcast::ScaleChanged(scale));
        Ok(())
    }

    pub fn refresh_all(&self) {
        self.deps.bus.publish(Broadcast::RefreshAll);
    }

    pub fn reset_view(&self) {
        self.deps.bus.publish(Broadcast::ResetView);
    }

    /// Toggle signal markers of the panel at `index` (0-based).
    pub fn toggle_signals(&self, index: usize) -> SyncResult<()> {
        let chart = self
            .charts
            .get(index)
            .ok_or_else(|| SyncError::ValidationError(format!("no chart at index {index}")))?;
        self.deps.bus.publish(Broadcast::ToggleSignals(chart.id().clone()));
        Ok(())
    }

    /// Start/Stop Live for every panel. All panels are switched even if one
    /// fails; the first failure is returned.
    pub fn set_live(&self, live: bool) -> SyncResult<()> {
        self.charts
            .iter()
            .map(|chart| chart.set_live(live))
            .fold(Ok(()), |first, result| first.and(result))
    }

    pub fn unmount_all(&self) {
        for chart in &self.charts {
            chart.unmount();
        }
        self.desk.stop();
    }

    pub fn chart(&self, index: usize) -> Option<&ChartSyncCoordinator> {
        self.charts.get(index)
    }

    pub fn charts(&self) -> &[ChartSyncCoordinator] {
        &self.charts
    }

    pub fn desk(&self) -> &SignalDesk {
        &self.desk
    }
}
