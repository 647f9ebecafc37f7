//! JavaScript surface: a series sink over lightweight-charts objects, the
//! dashboard handle and the page-wide broadcast functions.

use std::cell::RefCell;
use std::rc::Rc;

use gloo::utils::format::JsValueSerdeExt;
use js_sys::{Array, Function, Promise, Reflect};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::application::{Dashboard, DeskSnapshot, FeedState, SyncDeps};
use crate::config::SyncConfig;
use crate::domain::{
    chart::{ChartId, Dimensions, OverlayMarker, SeriesSink, SeriesStyle, SharedSink, validate_markers, validate_points},
    errors::{SyncError, SyncResult},
    events::Broadcast,
    logging::{LogComponent, get_logger},
    market_data::{Symbol, TimePoint},
    signals::{Outcome, SignalStats},
};
use crate::global_state;
use crate::infrastructure::{BrowserIntervalScheduler, BrowserPushChannel, BrowserSpawner, HttpMarketApi};

#[wasm_bindgen]
extern "C" {
    /// lightweight-charts `IChartApi`
    pub type JsChart;

    #[wasm_bindgen(method, catch)]
    fn resize(this: &JsChart, width: u32, height: u32) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = timeScale)]
    fn time_scale(this: &JsChart) -> JsTimeScale;

    pub type JsTimeScale;

    #[wasm_bindgen(method, catch, js_name = fitContent)]
    fn fit_content(this: &JsTimeScale) -> Result<(), JsValue>;

    /// lightweight-charts line series
    pub type JsLineSeries;

    #[wasm_bindgen(method, catch, js_name = setData)]
    fn set_data(this: &JsLineSeries, data: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn update(this: &JsLineSeries, point: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setMarkers)]
    fn set_markers(this: &JsLineSeries, markers: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = applyOptions)]
    fn apply_options(this: &JsLineSeries, options: &JsValue) -> Result<(), JsValue>;
}

/// [`SeriesSink`] over a chart/series pair created on the JS side.
pub struct JsSeriesSink {
    chart: JsChart,
    series: JsLineSeries,
}

impl JsSeriesSink {
    pub fn new(chart: JsChart, series: JsLineSeries) -> Self {
        Self { chart, series }
    }

    /// Read `{chart, series}` from a panel descriptor.
    pub fn from_panel(panel: &JsValue) -> Result<Self, JsValue> {
        let chart = Reflect::get(panel, &JsValue::from_str("chart"))?;
        let series = Reflect::get(panel, &JsValue::from_str("series"))?;
        if chart.is_undefined() || series.is_undefined() {
            return Err(JsValue::from_str("panel needs both `chart` and `series`"));
        }
        Ok(Self::new(chart.unchecked_into(), series.unchecked_into()))
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> SyncResult<JsValue> {
    JsValue::from_serde(value).map_err(|e| SyncError::InvalidSeriesInput(e.to_string()))
}

fn rejected(e: JsValue) -> SyncError {
    SyncError::InvalidSeriesInput(format!("{e:?}"))
}

fn warn_on_js_error(action: &str, result: Result<(), JsValue>) {
    if let Err(e) = result {
        get_logger().warn(LogComponent::Presentation("JsSeriesSink"), &format!("{action} failed: {e:?}"));
    }
}

impl SeriesSink for JsSeriesSink {
    fn set_data(&mut self, points: &[TimePoint]) -> SyncResult<()> {
        validate_points(points)?;
        self.series.set_data(&to_js(points)?).map_err(rejected)
    }

    fn update(&mut self, point: TimePoint) -> SyncResult<()> {
        self.series.update(&to_js(&point)?).map_err(rejected)
    }

    fn set_markers(&mut self, markers: &[OverlayMarker]) -> SyncResult<()> {
        validate_markers(markers)?;
        self.series.set_markers(&to_js(markers)?).map_err(rejected)
    }

    fn resize(&mut self, dimensions: Dimensions) {
        warn_on_js_error("resize", self.chart.resize(dimensions.width, dimensions.height));
    }

    fn fit_view(&mut self) {
        warn_on_js_error("fitContent", self.chart.time_scale().fit_content());
    }

    fn apply_style(&mut self, style: &SeriesStyle) {
        match to_js(style) {
            Ok(options) => warn_on_js_error("applyOptions", self.series.apply_options(&options)),
            Err(e) => get_logger().warn(LogComponent::Presentation("JsSeriesSink"), &e.to_string()),
        }
    }
}

fn js_error(e: SyncError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn settle(future: futures::future::LocalBoxFuture<'static, SyncResult<()>>) -> Promise {
    future_to_promise(async move { future.await.map(|()| JsValue::UNDEFINED).map_err(js_error) })
}

#[derive(Serialize)]
struct CandidateView {
    id: u64,
    side: String,
    entry: f64,
    stop: f64,
    target: f64,
    rr: f64,
    outcome: String,
}

/// What the signal panel renders.
#[derive(Serialize)]
struct DeskView {
    candidates: Vec<CandidateView>,
    narrative: Vec<String>,
    stats: SignalStats,
}

impl From<&DeskSnapshot> for DeskView {
    fn from(snapshot: &DeskSnapshot) -> Self {
        Self {
            candidates: snapshot
                .report
                .candidates
                .iter()
                .map(|c| CandidateView {
                    id: c.id,
                    side: c.side.to_string(),
                    entry: c.entry,
                    stop: c.stop,
                    target: c.target,
                    rr: c.risk_reward,
                    outcome: c.outcome.to_string(),
                })
                .collect(),
            narrative: snapshot.narrative.clone(),
            stats: snapshot.stats,
        }
    }
}

/// Four synced panels plus the signal desk, driven from JavaScript.
#[wasm_bindgen]
pub struct ChartDashboard {
    dashboard: Dashboard,
}

#[wasm_bindgen]
impl ChartDashboard {
    /// `panels` holds one `{chart, series}` object per panel, in `c1..c4`
    /// order.
    #[wasm_bindgen(constructor)]
    pub fn new(panels: Array) -> Result<ChartDashboard, JsValue> {
        let config = global_state::page_config();
        let sinks = panels
            .iter()
            .map(|panel| {
                let sink: SharedSink = Rc::new(RefCell::new(JsSeriesSink::from_panel(&panel)?));
                Ok(sink)
            })
            .collect::<Result<Vec<_>, JsValue>>()?;

        let deps = SyncDeps::new(
            Rc::new(HttpMarketApi::new(config.api_base.clone())),
            Rc::new(BrowserPushChannel::for_api_base(&config.api_base)),
            Rc::new(BrowserIntervalScheduler),
            Rc::new(BrowserSpawner),
            config,
        )
        .with_bus(global_state::page_bus());

        let dashboard = Dashboard::new(deps, sinks).map_err(js_error)?;
        get_logger().info(LogComponent::Presentation("ChartDashboard"), "🚀 Dashboard created");
        Ok(Self { dashboard })
    }

    pub fn mount(&self) -> Promise {
        settle(self.dashboard.mount_all())
    }

    #[wasm_bindgen(js_name = setSymbol)]
    pub fn set_symbol(&self, symbol: String) -> Result<Promise, JsValue> {
        let symbol = Symbol::new(symbol).map_err(js_error)?;
        Ok(settle(self.dashboard.set_symbol(symbol)))
    }

    #[wasm_bindgen(js_name = setScale)]
    pub fn set_scale(&self, scale: f64) -> Result<(), JsValue> {
        self.dashboard.set_scale(scale).map_err(js_error)
    }

    #[wasm_bindgen(js_name = setLive)]
    pub fn set_live(&self, live: bool) -> Result<(), JsValue> {
        self.dashboard.set_live(live).map_err(js_error)
    }

    #[wasm_bindgen(js_name = refreshAll)]
    pub fn refresh_all(&self) {
        self.dashboard.refresh_all();
    }

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&self) {
        self.dashboard.reset_view();
    }

    #[wasm_bindgen(js_name = toggleSignals)]
    pub fn toggle_signals(&self, index: usize) -> Result<(), JsValue> {
        self.dashboard.toggle_signals(index).map_err(js_error)
    }

    pub fn resize(&self, index: usize, width: u32, height: u32) -> Result<(), JsValue> {
        let chart = self
            .dashboard
            .chart(index)
            .ok_or_else(|| JsValue::from_str(&format!("no chart at index {index}")))?;
        chart.resize(Dimensions::new(width, height));
        Ok(())
    }

    /// Feed state of one panel, e.g. `"streaming (push)"`.
    #[wasm_bindgen(js_name = feedState)]
    pub fn feed_state(&self, index: usize) -> Option<String> {
        self.dashboard.chart(index).map(|chart| chart.feed_state().to_string())
    }

    #[wasm_bindgen(js_name = onFeedState)]
    pub fn on_feed_state(&self, index: usize, callback: Function) -> Result<(), JsValue> {
        let chart = self
            .dashboard
            .chart(index)
            .ok_or_else(|| JsValue::from_str(&format!("no chart at index {index}")))?;
        let id = chart.id().value().to_string();
        chart.on_feed_state(Rc::new(move |state: FeedState| {
            let _ = callback.call2(&JsValue::NULL, &JsValue::from_str(&id), &JsValue::from_str(&state.to_string()));
        }));
        Ok(())
    }

    #[wasm_bindgen(js_name = onDeskChange)]
    pub fn on_desk_change(&self, callback: Function) {
        let listener = move |snapshot: &DeskSnapshot| match JsValue::from_serde(&DeskView::from(snapshot)) {
            Ok(view) => {
                let _ = callback.call1(&JsValue::NULL, &view);
            }
            Err(e) => get_logger().warn(LogComponent::Presentation("ChartDashboard"), &format!("desk view: {e}")),
        };
        self.dashboard.desk().on_change(Rc::new(listener));
    }

    /// `outcome` is `"win"` or `"loss"`.
    pub fn acknowledge(&self, event_id: u32, outcome: String) -> Result<Promise, JsValue> {
        let outcome: Outcome = outcome
            .parse()
            .map_err(|_| JsValue::from_str(&format!("unknown outcome {outcome:?}")))?;
        Ok(settle(self.dashboard.desk().acknowledge(u64::from(event_id), outcome)))
    }

    pub fn unmount(&self) {
        self.dashboard.unmount_all();
    }
}

/// Replace the page configuration used by dashboards created afterwards.
#[wasm_bindgen]
pub fn configure(config: JsValue) -> Result<(), JsValue> {
    let config: SyncConfig = config
        .into_serde()
        .map_err(|e| JsValue::from_str(&format!("invalid config: {e}")))?;
    global_state::set_page_config(config.validated().map_err(js_error)?);
    Ok(())
}

/// Refresh history and overlays on every dashboard of the page.
#[wasm_bindgen(js_name = refreshAll)]
pub fn refresh_all() -> usize {
    global_state::publish(Broadcast::RefreshAll)
}

#[wasm_bindgen(js_name = resetView)]
pub fn reset_view() -> usize {
    global_state::publish(Broadcast::ResetView)
}

#[wasm_bindgen(js_name = toggleSignals)]
pub fn toggle_signals(chart_id: String) -> usize {
    global_state::publish(Broadcast::ToggleSignals(ChartId::new(chart_id)))
}

#[wasm_bindgen(js_name = setScale)]
pub fn set_scale(scale: f64) -> Result<usize, JsValue> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(JsValue::from_str(&format!("scale must be positive, got {scale}")));
    }
    Ok(global_state::publish(Broadcast::ScaleChanged(scale)))
}
