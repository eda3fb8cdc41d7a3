use crate::domain::model::{ApiProfile, DataSet, PageOutcome, PageTask, Record, RelayRequest};
use crate::relay::RelayClient;
use crate::utils::error::{EtlError, Result};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// 遠端 API 的回應外殼：{data: {data: [...]}}
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    #[serde(default)]
    data: Option<Vec<serde_json::Map<String, serde_json::Value>>>,
}

/// 抓取單一 (資料集, offset) 頁面，任何失敗都只記錄並回傳 Failed
#[derive(Debug, Clone)]
pub struct PageFetcher {
    relay: RelayClient,
    profile: Arc<ApiProfile>,
}

impl PageFetcher {
    pub fn new(relay: RelayClient, profile: ApiProfile) -> Self {
        Self {
            relay,
            profile: Arc::new(profile),
        }
    }

    pub fn build_request(&self, dataset: &DataSet, offset: u64) -> Result<RelayRequest> {
        let profile = &self.profile;
        let filter = query_value(&profile.filter_value);

        let url = Url::parse_with_params(
            &profile.base_url,
            &[
                (profile.id_param.as_str(), dataset.id.clone()),
                (profile.filter_param.as_str(), filter),
                (profile.offset_param.as_str(), offset.to_string()),
            ],
        )
        .map_err(|e| EtlError::InvalidConfigValueError {
            field: "api.base_url".to_string(),
            value: profile.base_url.clone(),
            reason: e.to_string(),
        })?;

        let mut payload = serde_json::Map::new();
        payload.insert(
            profile.id_param.clone(),
            serde_json::Value::String(dataset.id.clone()),
        );
        payload.insert(profile.filter_param.clone(), profile.filter_value.clone());
        payload.insert(profile.offset_param.clone(), serde_json::Value::from(offset));

        Ok(RelayRequest {
            url: url.to_string(),
            payload: serde_json::Value::Object(payload),
            headers: profile.headers.clone(),
        })
    }

    pub async fn fetch_page(&self, page: &PageTask) -> PageOutcome {
        let dataset = &page.dataset;
        match self.try_fetch_page(dataset, page.offset).await {
            Ok(records) => {
                tracing::debug!(
                    "📡 {} (ID: {}) offset {}: {} records",
                    dataset.label,
                    dataset.id,
                    page.offset,
                    records.len()
                );
                PageOutcome::Fetched(records)
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ {} (ID: {}) offset {} failed: {}",
                    dataset.label,
                    dataset.id,
                    page.offset,
                    e
                );
                PageOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_fetch_page(&self, dataset: &DataSet, offset: u64) -> Result<Vec<Record>> {
        let request = self.build_request(dataset, offset)?;
        let body = self.relay.send(&request).await?;
        let items = decode_envelope(&body)?;

        let label = serde_json::Value::String(dataset.label.clone());
        Ok(items
            .into_iter()
            .map(|item| {
                let mut record = Record::from(item);
                record
                    .data
                    .insert(self.profile.label_field.clone(), label.clone());
                record
            })
            .collect())
    }
}

/// 內層 data 缺少或為 null 視為空頁，外層結構錯誤才算解碼失敗
fn decode_envelope(body: &[u8]) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
    let envelope: ApiEnvelope =
        serde_json::from_slice(body).map_err(|e| EtlError::DecodeError {
            message: e.to_string(),
        })?;
    Ok(envelope.data.data.unwrap_or_default())
}

fn query_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
