use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{BinaryType, CloseEvent, Event, MessageEvent, WebSocket};

use crate::domain::{
    errors::{SyncError, SyncResult},
    logging::{LogComponent, get_logger},
    realtime::{PushChannel, PushEvent, PushListener, TransportHandle},
};

/// Push channel backed by the browser `WebSocket` API.
///
/// Without an explicit base URL the socket targets the page's own host,
/// switching to `wss:` on HTTPS pages.
#[derive(Debug, Clone, Default)]
pub struct BrowserPushChannel {
    base_url: Option<String>,
}

impl BrowserPushChannel {
    pub fn new() -> Self {
        Self { base_url: None }
    }

    pub fn with_base(base_url: impl Into<String>) -> Self {
        Self { base_url: Some(base_url.into().trim_end_matches('/').to_string()) }
    }

    /// Push channel on the same server as the REST API. An empty base means
    /// the page's own host; `http(s)://` bases become `ws(s)://`.
    pub fn for_api_base(api_base: &str) -> Self {
        match api_base.strip_prefix("http") {
            _ if api_base.is_empty() => Self::new(),
            Some(rest) => Self::with_base(format!("ws{rest}")),
            None => Self::with_base(api_base),
        }
    }

    fn endpoint(&self, path: &str) -> SyncResult<String> {
        if let Some(base) = &self.base_url {
            return Ok(format!("{base}{path}"));
        }
        let window =
            web_sys::window().ok_or_else(|| SyncError::TransportError("window not available".into()))?;
        let location = window.location();
        let protocol = location.protocol().map_err(|e| SyncError::TransportError(format!("{e:?}")))?;
        let host = location.host().map_err(|e| SyncError::TransportError(format!("{e:?}")))?;
        Ok(websocket_url(&protocol, &host, path))
    }
}

/// `ws://host/path`, or `wss://` when the page itself is served over HTTPS.
pub fn websocket_url(page_protocol: &str, host: &str, path: &str) -> String {
    let scheme = if page_protocol == "https:" { "wss:" } else { "ws:" };
    format!("{scheme}//{host}{path}")
}

struct BrowserSocket {
    socket: WebSocket,
    closed: bool,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl TransportHandle for BrowserSocket {
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Detach first so no callback can run after the closures are freed.
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onerror(None);
        self.socket.set_onclose(None);
        if let Err(e) = self.socket.close() {
            get_logger().warn(
                LogComponent::Infrastructure("BrowserPush"),
                &format!("close failed: {e:?}"),
            );
        }
    }
}

impl Drop for BrowserSocket {
    fn drop(&mut self) {
        self.close();
    }
}

impl PushChannel for BrowserPushChannel {
    fn open(&self, path: &str, listener: PushListener) -> SyncResult<Box<dyn TransportHandle>> {
        let url = self.endpoint(path)?;
        get_logger().info(LogComponent::Infrastructure("BrowserPush"), &format!("🔌 Connecting to {url}"));

        let socket = WebSocket::new(&url)
            .map_err(|e| SyncError::TransportError(format!("failed to open {url}: {e:?}")))?;
        socket.set_binary_type(BinaryType::Arraybuffer);

        let l = listener.clone();
        let on_open = Closure::wrap(Box::new(move |_: Event| l(PushEvent::Opened)) as Box<dyn FnMut(Event)>);

        let l = listener.clone();
        let on_message = Closure::wrap(Box::new(move |event: MessageEvent| {
            let data = event.data();
            match data.as_string() {
                Some(text) => l(PushEvent::Text(text)),
                None => {
                    let len = data
                        .dyn_ref::<js_sys::ArrayBuffer>()
                        .map(|buffer| buffer.byte_length() as usize)
                        .unwrap_or(0);
                    l(PushEvent::Binary(len));
                }
            }
        }) as Box<dyn FnMut(MessageEvent)>);

        let l = listener.clone();
        let on_error = Closure::wrap(
            Box::new(move |_: Event| l(PushEvent::Error("websocket error".to_string()))) as Box<dyn FnMut(Event)>,
        );

        let l = listener;
        let on_close = Closure::wrap(Box::new(move |event: CloseEvent| {
            l(PushEvent::Closed { code: event.code(), reason: event.reason() })
        }) as Box<dyn FnMut(CloseEvent)>);

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(Box::new(BrowserSocket {
            socket,
            closed: false,
            _on_open: on_open,
            _on_message: on_message,
            _on_error: on_error,
            _on_close: on_close,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{BrowserPushChannel, websocket_url};

    #[test]
    fn scheme_follows_page_protocol() {
        assert_eq!(websocket_url("https:", "dash.example", "/ws/realtime"), "wss://dash.example/ws/realtime");
        assert_eq!(websocket_url("http:", "localhost:5173", "/ws/realtime"), "ws://localhost:5173/ws/realtime");
    }

    #[test]
    fn api_base_maps_to_socket_base() {
        assert_eq!(BrowserPushChannel::for_api_base("").base_url, None);
        assert_eq!(
            BrowserPushChannel::for_api_base("https://api.example/").base_url.as_deref(),
            Some("wss://api.example")
        );
        assert_eq!(
            BrowserPushChannel::for_api_base("http://localhost:8000").base_url.as_deref(),
            Some("ws://localhost:8000")
        );
    }
}
