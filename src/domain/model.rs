use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 目錄中的一個分頁資料來源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    pub id: String,
    #[serde(alias = "programStudi")]
    pub label: String,
    #[serde(alias = "jumlahData", default, deserialize_with = "null_as_zero")]
    pub expected_count: u64,
}

fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

impl DataSet {
    pub fn new(id: impl Into<String>, label: impl Into<String>, expected_count: u64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            expected_count,
        }
    }

    /// 每頁一個 offset：0, page_size, 2*page_size ... 直到 expected_count 之前，逐一產生
    pub fn page_offsets(&self, page_size: u64) -> impl Iterator<Item = u64> {
        let end = if page_size == 0 { 0 } else { self.expected_count };
        (0..end).step_by(page_size.max(1) as usize)
    }

    pub fn page_count(&self, page_size: u64) -> u64 {
        if page_size == 0 {
            return 0;
        }
        self.expected_count.div_ceil(page_size)
    }
}

/// 交給 relay 代為執行的 HTTP 呼叫描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayRequest {
    pub url: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(obj: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            data: obj.into_iter().collect(),
        }
    }
}

/// 遠端 API 的查詢參數與瀏覽器身分標頭
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiProfile {
    pub base_url: String,
    pub id_param: String,
    pub filter_param: String,
    pub filter_value: serde_json::Value,
    pub offset_param: String,
    pub label_field: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct PageTask {
    pub dataset: Arc<DataSet>,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Fetched(Vec<Record>),
    Failed { reason: String },
}

impl PageOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, PageOutcome::Failed { .. })
    }

    /// 失敗的頁面不貢獻任何記錄
    pub fn into_records(self) -> Vec<Record> {
        match self {
            PageOutcome::Fetched(records) => records,
            PageOutcome::Failed { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarvestReport {
    pub datasets: usize,
    pub datasets_skipped: usize,
    pub pages_planned: u64,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub empty_pages: usize,
    pub records: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Harvest {
    pub records: Vec<Record>,
    pub report: HarvestReport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub table: ExportTable,
    pub report: HarvestReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Tsv,
    Zip,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Zip => "zip",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offsets_cover_partial_last_page() {
        let dataset = DataSet::new("A1", "Biology", 15);
        assert_eq!(dataset.page_offsets(10).collect::<Vec<_>>(), vec![0, 10]);
        assert_eq!(dataset.page_count(10), 2);
    }

    #[test]
    fn test_page_offsets_exact_multiple() {
        let dataset = DataSet::new("A1", "Biology", 30);
        assert_eq!(dataset.page_offsets(10).collect::<Vec<_>>(), vec![0, 10, 20]);
        assert_eq!(dataset.page_count(10), 3);
    }

    #[test]
    fn test_page_offsets_empty_dataset() {
        let dataset = DataSet::new("A2", "Physics", 0);
        assert_eq!(dataset.page_offsets(10).next(), None);
        assert_eq!(dataset.page_count(10), 0);
    }

    #[test]
    fn test_page_offsets_are_lazy_for_huge_counts() {
        let dataset = DataSet::new("X1", "Huge", 100_000_000_000);
        assert_eq!(dataset.page_count(10), 10_000_000_000);
        assert_eq!(
            dataset.page_offsets(10).take(3).collect::<Vec<_>>(),
            vec![0, 10, 20]
        );
    }

    #[test]
    fn test_dataset_accepts_catalog_field_names() {
        let json = r#"{"id": "5101087", "programStudi": "S-1 BIOLOGI", "jumlahData": 42, "jenjangPendidikan": "S-1"}"#;
        let dataset: DataSet = serde_json::from_str(json).unwrap();
        assert_eq!(dataset, DataSet::new("5101087", "S-1 BIOLOGI", 42));
    }

    #[test]
    fn test_dataset_null_count_is_zero() {
        let json = r#"{"id": "X", "label": "Empty", "expectedCount": null}"#;
        let dataset: DataSet = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.expected_count, 0);
    }

    #[test]
    fn test_relay_request_wire_shape() {
        let mut headers = BTreeMap::new();
        headers.insert("H".to_string(), "v".to_string());
        let request = RelayRequest {
            url: "http://x/y".to_string(),
            payload: serde_json::json!({"offset": 0}),
            headers,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["url"], "http://x/y");
        assert_eq!(value["payload"]["offset"], 0);
        assert_eq!(value["headers"]["H"], "v");
    }

    #[test]
    fn test_failed_outcome_yields_no_records() {
        let outcome = PageOutcome::Failed {
            reason: "status 500".to_string(),
        };
        assert!(outcome.is_failed());
        assert!(outcome.into_records().is_empty());
    }
}
