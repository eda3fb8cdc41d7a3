use crate::core::fetcher::PageFetcher;
use crate::domain::model::{DataSet, Harvest, HarvestReport, PageOutcome, PageTask, Record};
use crate::utils::error::{EtlError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub page_size: usize,
    pub max_concurrent_pages: usize,
    pub channel_capacity: usize,
}

/// 展開所有 (資料集, offset) 頁面，用有上限的並行度抓取並彙整結果
pub struct FetchOrchestrator {
    fetcher: Arc<PageFetcher>,
    settings: OrchestratorSettings,
}

/// 只記錄要抓的資料集與總頁數；頁面任務在排程時才逐一產生
#[derive(Debug, Clone)]
pub struct PagePlan {
    datasets: Vec<Arc<DataSet>>,
    page_size: u64,
    pub pages_planned: u64,
    pub skipped: usize,
}

impl PagePlan {
    pub fn datasets_planned(&self) -> usize {
        self.datasets.len()
    }

    pub fn into_pages(self) -> impl Iterator<Item = PageTask> + Send + 'static {
        let page_size = self.page_size;
        self.datasets.into_iter().flat_map(move |dataset| {
            let offsets = dataset.page_offsets(page_size);
            offsets.map(move |offset| PageTask {
                dataset: Arc::clone(&dataset),
                offset,
            })
        })
    }
}

/// expected_count 為 0 的資料集不產生任何頁面
pub fn plan_pages(datasets: &[DataSet], page_size: usize) -> PagePlan {
    let page_size = page_size as u64;
    let mut planned = Vec::new();
    let mut pages_planned = 0u64;
    let mut skipped = 0;

    for dataset in datasets {
        if dataset.expected_count == 0 {
            tracing::info!(
                "⏭️ Skipping {} (ID: {}) - No data available",
                dataset.label,
                dataset.id
            );
            skipped += 1;
            continue;
        }

        tracing::info!(
            "📂 Processing {} (ID: {}, Total Data: {})",
            dataset.label,
            dataset.id,
            dataset.expected_count
        );

        pages_planned = pages_planned.saturating_add(dataset.page_count(page_size));
        planned.push(Arc::new(dataset.clone()));
    }

    PagePlan {
        datasets: planned,
        page_size,
        pages_planned,
        skipped,
    }
}

impl FetchOrchestrator {
    pub fn new(fetcher: Arc<PageFetcher>, settings: OrchestratorSettings) -> Self {
        Self { fetcher, settings }
    }

    pub async fn run(&self, datasets: &[DataSet]) -> Result<Harvest> {
        let started_at = chrono::Utc::now();
        let plan = plan_pages(datasets, self.settings.page_size);
        let pages_planned = plan.pages_planned;
        let skipped = plan.skipped;

        tracing::info!(
            "🚀 Fetching {} pages across {} data sets (max {} in flight)",
            pages_planned,
            plan.datasets_planned(),
            self.settings.max_concurrent_pages
        );

        let (tx, mut rx) = mpsc::channel::<PageOutcome>(self.settings.channel_capacity.max(1));
        let coordinator = tokio::spawn(coordinate(
            plan.into_pages(),
            Arc::clone(&self.fetcher),
            Arc::new(Semaphore::new(self.settings.max_concurrent_pages.max(1))),
            tx,
        ));

        let mut records: Vec<Record> = Vec::new();
        let mut report = HarvestReport {
            datasets: datasets.len(),
            datasets_skipped: skipped,
            pages_planned,
            started_at,
            ..HarvestReport::default()
        };

        // 持續讀取直到 channel 關閉，不依賴預期筆數
        while let Some(outcome) = rx.recv().await {
            match outcome {
                PageOutcome::Fetched(batch) => {
                    report.pages_fetched += 1;
                    if batch.is_empty() {
                        report.empty_pages += 1;
                    }
                    records.extend(batch);
                    tracing::info!("Current total records: {}", records.len());
                }
                PageOutcome::Failed { .. } => report.pages_failed += 1,
            }
        }

        coordinator.await.map_err(|e| EtlError::ProcessingError {
            message: format!("fetch coordinator failed: {}", e),
        })?;

        report.records = records.len();
        report.finished_at = chrono::Utc::now();

        if report.pages_failed > 0 {
            tracing::warn!(
                "⚠️ {} of {} pages failed and contributed no records",
                report.pages_failed,
                report.pages_planned
            );
        }
        tracing::info!(
            "✅ Fetch complete: {} records from {} pages ({} empty, {} failed)",
            report.records,
            report.pages_fetched,
            report.empty_pages,
            report.pages_failed
        );

        Ok(Harvest { records, report })
    }
}

/// 依序取得 permit 後才產生並啟動下一頁，全部任務結束後丟棄 sender 以關閉 channel
async fn coordinate<I>(
    pages: I,
    fetcher: Arc<PageFetcher>,
    limit: Arc<Semaphore>,
    tx: mpsc::Sender<PageOutcome>,
) where
    I: Iterator<Item = PageTask> + Send + 'static,
{
    let mut workers = JoinSet::new();

    for page in pages {
        let permit = match Arc::clone(&limit).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::error!("❌ Concurrency limiter closed, remaining pages not scheduled");
                break;
            }
        };

        let fetcher = Arc::clone(&fetcher);
        let tx = tx.clone();
        workers.spawn(async move {
            let outcome = fetcher.fetch_page(&page).await;
            drop(permit);
            if tx.send(outcome).await.is_err() {
                tracing::warn!(
                    "⚠️ Result channel closed before {} offset {} was delivered",
                    page.dataset.id,
                    page.offset
                );
            }
        });

        // 回收已完成的任務，避免 JoinSet 累積
        while let Some(joined) = workers.try_join_next() {
            log_join_error(joined);
        }
    }

    while let Some(joined) = workers.join_next().await {
        log_join_error(joined);
    }

    drop(tx);
}

fn log_join_error(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!("❌ Page task aborted: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ApiProfile;
    use crate::relay::RelayClient;
    use axum::{extract::State, routing::post, Json, Router};
    use httpmock::prelude::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn settings(max_concurrent_pages: usize) -> OrchestratorSettings {
        OrchestratorSettings {
            page_size: 10,
            max_concurrent_pages,
            channel_capacity: 4,
        }
    }

    fn fetcher_for(relay_url: String) -> Arc<PageFetcher> {
        let profile = ApiProfile {
            base_url: "https://api.example/spf".to_string(),
            headers: BTreeMap::new(),
            ..ApiProfile::default()
        };
        Arc::new(PageFetcher::new(RelayClient::new(relay_url, None), profile))
    }

    fn page_body(prefix: &str, count: usize) -> serde_json::Value {
        let items: Vec<serde_json::Value> = (0..count)
            .map(|i| serde_json::json!({"formasi_id": format!("{}-{}", prefix, i)}))
            .collect();
        serde_json::json!({"data": {"data": items}})
    }

    #[test]
    fn test_plan_pages_skips_empty_datasets() {
        let catalog = vec![
            DataSet::new("A1", "Biology", 15),
            DataSet::new("A2", "Physics", 0),
        ];

        let plan = plan_pages(&catalog, 10);

        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.pages_planned, 2);
        let offsets: Vec<(String, u64)> = plan
            .into_pages()
            .map(|p| (p.dataset.id.clone(), p.offset))
            .collect();
        assert_eq!(
            offsets,
            vec![("A1".to_string(), 0), ("A1".to_string(), 10)]
        );
    }

    #[test]
    fn test_plan_pages_counts_ceil_per_dataset() {
        let catalog = vec![
            DataSet::new("A", "a", 1),
            DataSet::new("B", "b", 10),
            DataSet::new("C", "c", 11),
            DataSet::new("D", "d", 100),
        ];

        let plan = plan_pages(&catalog, 10);

        assert_eq!(plan.skipped, 0);
        assert_eq!(plan.pages_planned, 1 + 1 + 2 + 10);
        let pages: Vec<PageTask> = plan.into_pages().collect();
        assert_eq!(pages.len(), 1 + 1 + 2 + 10);
        let last_d = pages.iter().filter(|p| p.dataset.id == "D").last().unwrap();
        assert_eq!(last_d.offset, 90);
    }

    #[test]
    fn test_plan_for_huge_dataset_is_lazy() {
        let catalog = vec![DataSet::new("X1", "Huge", 100_000_000_000)];

        let plan = plan_pages(&catalog, 10);

        assert_eq!(plan.pages_planned, 10_000_000_000);
        let first: Vec<u64> = plan.into_pages().take(3).map(|p| p.offset).collect();
        assert_eq!(first, vec![0, 10, 20]);
    }

    #[tokio::test]
    async fn test_run_collects_every_page() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(POST)
                .path("/proxy")
                .json_body_partial(r#"{"payload": {"kode_ref_pend": "A1", "offset": 0}}"#);
            then.status(200).json_body(page_body("a", 10));
        });
        let second = server.mock(|when, then| {
            when.method(POST)
                .path("/proxy")
                .json_body_partial(r#"{"payload": {"kode_ref_pend": "A1", "offset": 10}}"#);
            then.status(200).json_body(page_body("b", 5));
        });

        let orchestrator = FetchOrchestrator::new(fetcher_for(server.url("/proxy")), settings(4));
        let catalog = vec![
            DataSet::new("A1", "Biology", 15),
            DataSet::new("A2", "Physics", 0),
        ];

        let harvest = orchestrator.run(&catalog).await.unwrap();

        first.assert();
        second.assert();
        assert_eq!(harvest.records.len(), 15);
        assert!(harvest
            .records
            .iter()
            .all(|r| r.data.get("program_studi").unwrap() == "Biology"));
        assert_eq!(harvest.report.pages_planned, 2);
        assert_eq!(harvest.report.pages_fetched, 2);
        assert_eq!(harvest.report.datasets_skipped, 1);
        assert_eq!(harvest.report.pages_failed, 0);
    }

    #[tokio::test]
    async fn test_failed_page_is_absorbed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/proxy")
                .json_body_partial(r#"{"payload": {"offset": 0}}"#);
            then.status(200).json_body(page_body("ok", 10));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/proxy")
                .json_body_partial(r#"{"payload": {"offset": 10}}"#);
            then.status(500).body("upstream responded with status 503");
        });

        let orchestrator = FetchOrchestrator::new(fetcher_for(server.url("/proxy")), settings(2));
        let harvest = orchestrator
            .run(&[DataSet::new("A1", "Biology", 20)])
            .await
            .unwrap();

        assert_eq!(harvest.records.len(), 10);
        assert_eq!(harvest.report.pages_failed, 1);
        assert_eq!(harvest.report.pages_fetched, 1);
        assert_eq!(harvest.report.records, 10);
    }

    #[tokio::test]
    async fn test_many_pages_with_small_limit_and_channel() {
        let server = MockServer::start();
        let relay = server.mock(|when, then| {
            when.method(POST).path("/proxy");
            then.status(200).json_body(page_body("x", 3));
        });

        let orchestrator = FetchOrchestrator::new(fetcher_for(server.url("/proxy")), settings(1));
        let catalog = vec![
            DataSet::new("A", "Alpha", 95),
            DataSet::new("B", "Beta", 40),
        ];

        let harvest = orchestrator.run(&catalog).await.unwrap();

        relay.assert_hits(14);
        assert_eq!(harvest.records.len(), 14 * 3);
        let alpha = harvest
            .records
            .iter()
            .filter(|r| r.data.get("program_studi").unwrap() == "Alpha")
            .count();
        assert_eq!(alpha, 10 * 3);
    }

    #[derive(Default)]
    struct InFlight {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    async fn slow_relay(State(gauge): State<Arc<InFlight>>) -> Json<serde_json::Value> {
        let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        gauge.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        gauge.current.fetch_sub(1, Ordering::SeqCst);
        Json(page_body("slow", 1))
    }

    #[tokio::test]
    async fn test_in_flight_pages_never_exceed_limit() {
        let gauge = Arc::new(InFlight::default());
        let router = Router::new()
            .route("/proxy", post(slow_relay))
            .with_state(Arc::clone(&gauge));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let orchestrator = FetchOrchestrator::new(
            fetcher_for(format!("http://{}/proxy", address)),
            OrchestratorSettings {
                page_size: 10,
                max_concurrent_pages: 3,
                channel_capacity: 1,
            },
        );
        let harvest = orchestrator
            .run(&[DataSet::new("A1", "Biology", 200)])
            .await
            .unwrap();

        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak >= 1, "relay was never called");
        assert!(peak <= 3, "{} pages were in flight at once", peak);
        assert_eq!(harvest.records.len(), 20);
        assert_eq!(harvest.report.pages_fetched, 20);
        assert_eq!(gauge.current.load(Ordering::SeqCst), 0);

        server.abort();
    }

    #[tokio::test]
    async fn test_empty_catalog_finishes() {
        let orchestrator = FetchOrchestrator::new(
            fetcher_for("http://127.0.0.1:1/proxy".to_string()),
            settings(4),
        );

        let harvest = orchestrator.run(&[]).await.unwrap();

        assert!(harvest.records.is_empty());
        assert_eq!(harvest.report.pages_planned, 0);
    }
}
