use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// 所有抓取任務結束後才進入轉換與輸出
    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting harvest");
        self.monitor.log_stats("Start");

        tracing::info!("📡 Extracting records...");
        let harvest = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", harvest.records.len());
        self.monitor.log_stats("Extract");

        tracing::info!("🔄 Building export table...");
        let transformed = self.pipeline.transform(harvest).await?;
        tracing::info!(
            "Table ready: {} rows x {} columns",
            transformed.table.rows.len(),
            transformed.table.columns.len()
        );
        self.monitor.log_stats("Transform");

        tracing::info!("💾 Writing export...");
        let output_path = self.pipeline.load(transformed).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
