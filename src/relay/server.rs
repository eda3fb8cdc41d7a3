use crate::domain::model::RelayRequest;
use crate::relay::error::RelayError;
use crate::utils::error::{EtlError, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// 所有請求共用同一個 HTTP client，client 本身可安全地被並行使用
#[derive(Debug, Clone)]
pub struct RelayState {
    client: Client,
}

impl RelayState {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Routes:
/// - `POST /proxy` - perform the described GET upstream and return its body
pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/proxy", post(proxy))
        .with_state(state)
}

async fn proxy(State(state): State<RelayState>, body: Bytes) -> std::result::Result<Response, RelayError> {
    let request: RelayRequest =
        serde_json::from_slice(&body).map_err(|e| RelayError::BadRequest(e.to_string()))?;
    let headers = build_header_map(&request.headers)?;

    tracing::debug!(url = %request.url, headers = headers.len(), "📡 Relaying request");

    // payload 只為了與呼叫端格式對稱，轉送的 GET 不帶 body
    let response = state.client.get(&request.url).headers(headers).send().await?;
    let status = response.status();

    if !status.is_success() {
        tracing::warn!(url = %request.url, status = status.as_u16(), "⚠️ Upstream rejected relayed request");
        return Err(RelayError::UpstreamStatus {
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await?;
    tracing::debug!(url = %request.url, bytes = body.len(), "📡 Upstream responded");

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

fn build_header_map(headers: &BTreeMap<String, String>) -> std::result::Result<HeaderMap, RelayError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RelayError::BadRequest(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RelayError::BadRequest(format!("invalid value for header '{}': {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// 在指定的 listener 上提供 relay 服務，直到 shutdown 完成
pub async fn serve_relay<F>(listener: TcpListener, state: RelayState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    tracing::info!(address = %address, "🚀 Relay listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(EtlError::IoError)?;

    tracing::info!("Relay stopped");
    Ok(())
}

/// 綁定位址並執行 relay，收到 Ctrl-C 後結束
pub async fn start_relay_server(bind_address: SocketAddr) -> Result<()> {
    let client = Client::builder().build()?;
    let listener = TcpListener::bind(bind_address).await?;
    serve_relay(listener, RelayState::new(client), shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("⚠️ Cannot listen for Ctrl-C, relay will run until killed: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
