use futures::future::{FutureExt, LocalBoxFuture};
use gloo_net::http::{Request, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::domain::{
    errors::{ApiError, ApiResult},
    logging::{LogComponent, get_logger},
    market_data::{MarketApi, PriceRecord, Symbol},
    signals::{Outcome, SignalReport, SignalStats},
};

/// `MarketApi` over the dashboard backend's JSON endpoints, built on gloo-net.
#[derive(Debug, Clone, Default)]
pub struct HttpMarketApi {
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SignalsEnvelope {
    #[serde(default)]
    result: SignalReport,
}

#[derive(Debug, Deserialize)]
struct NarrativeEnvelope {
    #[serde(default)]
    narrative: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AckBody {
    event_id: u64,
    outcome: Outcome,
}

impl HttpMarketApi {
    /// Empty `base_url` addresses the page's own origin.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json<T>(&self, path: &'static str, query: Vec<(&'static str, String)>) -> LocalBoxFuture<'static, ApiResult<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let url = self.url(path);
        async move {
            get_logger().debug(LogComponent::Infrastructure("HttpMarketApi"), &format!("🌐 GET {url}"));
            let response = Request::get(&url)
                .query(query.iter().map(|(k, v)| (*k, v.as_str())))
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| ApiError::Request(format!("{e:?}")))?;
            decode(response).await
        }
        .boxed_local()
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    if !response.ok() {
        get_logger().warn(
            LogComponent::Infrastructure("HttpMarketApi"),
            &format!("HTTP error: {} - {}", response.status(), response.status_text()),
        );
        return Err(ApiError::Status(response.status()));
    }
    response.json::<T>().await.map_err(|e| ApiError::Decode(format!("{e:?}")))
}

impl MarketApi for HttpMarketApi {
    fn fetch_history(&self, symbol: &Symbol, limit: usize) -> LocalBoxFuture<'static, ApiResult<Vec<PriceRecord>>> {
        self.get_json(
            "/api/history",
            vec![("symbol", symbol.value().to_string()), ("limit", limit.to_string())],
        )
    }

    fn fetch_latest(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<PriceRecord>> {
        self.get_json("/api/realtime", vec![("symbol", symbol.value().to_string())])
    }

    fn fetch_signals(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<SignalReport>> {
        let envelope = self.get_json::<SignalsEnvelope>(
            "/api/ict/signals",
            vec![("symbol", symbol.value().to_string())],
        );
        envelope.map(|r| r.map(|e| e.result)).boxed_local()
    }

    fn fetch_narrative(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<Vec<String>>> {
        let envelope = self.get_json::<NarrativeEnvelope>(
            "/api/ict/narrative",
            vec![("symbol", symbol.value().to_string())],
        );
        envelope.map(|r| r.map(|e| e.narrative)).boxed_local()
    }

    fn fetch_stats(&self, symbol: &Symbol) -> LocalBoxFuture<'static, ApiResult<SignalStats>> {
        self.get_json("/api/ict/stats", vec![("symbol", symbol.value().to_string())])
    }

    fn acknowledge(&self, event_id: u64, outcome: Outcome) -> LocalBoxFuture<'static, ApiResult<()>> {
        let url = self.url("/api/ict/ack");
        async move {
            get_logger().info(
                LogComponent::Infrastructure("HttpMarketApi"),
                &format!("📝 Acknowledging event {event_id} as {outcome}"),
            );
            let response = Request::post(&url)
                .json(&AckBody { event_id, outcome })
                .map_err(|e| ApiError::Request(format!("{e:?}")))?
                .send()
                .await
                .map_err(|e| ApiError::Request(format!("{e:?}")))?;
            if !response.ok() {
                return Err(ApiError::Status(response.status()));
            }
            Ok(())
        }
        .boxed_local()
    }
}
