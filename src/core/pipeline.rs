use crate::config::catalog::Catalog;
use crate::core::exporter::TabularExporter;
use crate::core::fetcher::PageFetcher;
use crate::core::orchestrator::{FetchOrchestrator, OrchestratorSettings};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{ExportTable, Harvest, TransformResult};
use crate::relay::RelayClient;
use crate::utils::error::Result;
use std::path::Path;
use std::sync::Arc;

/// 目錄 → 分頁抓取 → 欄位聯集表格 → 輸出檔
pub struct HarvestPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    catalog: Option<Catalog>,
    fetcher: Arc<PageFetcher>,
}

impl<S: Storage, C: ConfigProvider> HarvestPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let relay = RelayClient::new(config.relay_endpoint(), config.page_timeout());
        let fetcher = Arc::new(PageFetcher::new(relay, config.api_profile().clone()));
        Self {
            storage,
            config,
            catalog: None,
            fetcher,
        }
    }

    /// 直接指定目錄，不從 catalog_path 讀取
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog {
            Some(catalog) => Ok(catalog.clone()),
            None => {
                tracing::info!("📁 Loading catalog from: {}", self.config.catalog_path());
                Catalog::from_file(self.config.catalog_path())
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for HarvestPipeline<S, C> {
    async fn extract(&self) -> Result<Harvest> {
        // 目錄載入失敗時不會發出任何請求
        let catalog = self.load_catalog()?;
        if catalog.is_empty() {
            tracing::warn!("⚠️ Catalog is empty, nothing to fetch");
        } else {
            tracing::info!("📋 Catalog contains {} data sets", catalog.len());
        }

        let orchestrator = FetchOrchestrator::new(
            Arc::clone(&self.fetcher),
            OrchestratorSettings {
                page_size: self.config.page_size(),
                max_concurrent_pages: self.config.max_concurrent_pages(),
                channel_capacity: self.config.channel_capacity(),
            },
        );
        orchestrator.run(&catalog.datasets).await
    }

    async fn transform(&self, harvest: Harvest) -> Result<TransformResult> {
        let table = ExportTable::from_records(harvest.records);
        tracing::debug!(
            "Table has {} columns: {:?}",
            table.columns.len(),
            table.columns
        );
        Ok(TransformResult {
            table,
            report: harvest.report,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let filename = self.config.output_file();
        let exporter = TabularExporter::new(self.config.output_format());

        exporter
            .export(&self.storage, &filename, &result.table, &result.report)
            .await?;

        let output_path = Path::new(self.config.output_path())
            .join(&filename)
            .display()
            .to_string();
        tracing::info!(
            "💾 Saved {} records ({} columns) to {}",
            result.table.rows.len(),
            result.table.columns.len(),
            output_path
        );
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ApiProfile, DataSet, HarvestReport, OutputFormat, Record};
    use crate::utils::error::EtlError;
    use httpmock::prelude::*;
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        catalog_path: String,
        relay_endpoint: String,
        api_profile: ApiProfile,
        output_format: OutputFormat,
    }

    impl MockConfig {
        fn new(relay_endpoint: String) -> Self {
            Self {
                catalog_path: "collectedData.json".to_string(),
                relay_endpoint,
                api_profile: ApiProfile {
                    base_url: "https://api.example/spf".to_string(),
                    headers: BTreeMap::new(),
                    ..ApiProfile::default()
                },
                output_format: OutputFormat::Csv,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn catalog_path(&self) -> &str {
            &self.catalog_path
        }

        fn relay_endpoint(&self) -> &str {
            &self.relay_endpoint
        }

        fn api_profile(&self) -> &ApiProfile {
            &self.api_profile
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn output_file(&self) -> String {
            format!("harvest.{}", self.output_format.extension())
        }

        fn output_format(&self) -> OutputFormat {
            self.output_format
        }

        fn page_size(&self) -> usize {
            10
        }

        fn max_concurrent_pages(&self) -> usize {
            4
        }

        fn page_timeout(&self) -> Option<Duration> {
            Some(Duration::from_secs(5))
        }

        fn channel_capacity(&self) -> usize {
            16
        }
    }

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(obj) => Record::from(obj),
            _ => panic!("record must be an object"),
        }
    }

    #[tokio::test]
    async fn test_extract_uses_given_catalog() {
        let server = MockServer::start();
        let relay = server.mock(|when, then| {
            when.method(POST).path("/proxy");
            then.status(200)
                .json_body(serde_json::json!({"data": {"data": [{"formasi_id": "f1"}]}}));
        });

        let pipeline = HarvestPipeline::new(MockStorage::new(), MockConfig::new(server.url("/proxy")))
            .with_catalog(Catalog::new(vec![
                DataSet::new("A1", "Biology", 15),
                DataSet::new("A2", "Physics", 0),
            ]));

        let harvest = pipeline.extract().await.unwrap();

        relay.assert_hits(2);
        assert_eq!(harvest.records.len(), 2);
        assert_eq!(harvest.report.datasets_skipped, 1);
    }

    #[tokio::test]
    async fn test_missing_catalog_fails_before_fetching() {
        let server = MockServer::start();
        let relay = server.mock(|when, then| {
            when.method(POST).path("/proxy");
            then.status(200);
        });

        let mut config = MockConfig::new(server.url("/proxy"));
        config.catalog_path = "/nonexistent/collectedData.json".to_string();
        let pipeline = HarvestPipeline::new(MockStorage::new(), config);

        let err = pipeline.extract().await.unwrap_err();

        relay.assert_hits(0);
        assert!(matches!(err, EtlError::CatalogError { .. }));
    }

    #[tokio::test]
    async fn test_transform_builds_union_table() {
        let pipeline = HarvestPipeline::new(
            MockStorage::new(),
            MockConfig::new("http://127.0.0.1:1/proxy".to_string()),
        );
        let harvest = Harvest {
            records: vec![
                record(serde_json::json!({"a": 1, "program_studi": "Biology"})),
                record(serde_json::json!({"b": 2, "program_studi": "Biology"})),
            ],
            report: HarvestReport::default(),
        };

        let result = pipeline.transform(harvest).await.unwrap();

        assert_eq!(result.table.columns, vec!["a", "b", "program_studi"]);
        assert_eq!(result.table.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_load_writes_configured_file() {
        let storage = MockStorage::new();
        let pipeline = HarvestPipeline::new(
            storage.clone(),
            MockConfig::new("http://127.0.0.1:1/proxy".to_string()),
        );
        let result = TransformResult {
            table: ExportTable::from_records(vec![record(serde_json::json!({"a": "x"}))]),
            report: HarvestReport::default(),
        };

        let output_path = pipeline.load(result).await.unwrap();

        assert_eq!(
            output_path,
            Path::new("test_output").join("harvest.csv").display().to_string()
        );
        let data = storage.get_file("harvest.csv").await.unwrap();
        assert_eq!(String::from_utf8(data).unwrap(), "a\nx\n");
    }
}
