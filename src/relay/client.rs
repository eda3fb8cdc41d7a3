use crate::domain::model::RelayRequest;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::time::Duration;

/// 呼叫端：把 RelayRequest 以 JSON POST 給 relay，取回上游原始內容
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl RelayClient {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub async fn send(&self, request: &RelayRequest) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(request)?;

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status != reqwest::StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(EtlError::RelayError {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
