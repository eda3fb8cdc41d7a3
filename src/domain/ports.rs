use crate::domain::model::{ApiProfile, Harvest, OutputFormat, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn catalog_path(&self) -> &str;
    fn relay_endpoint(&self) -> &str;
    fn api_profile(&self) -> &ApiProfile;
    fn output_path(&self) -> &str;
    fn output_file(&self) -> String;
    fn output_format(&self) -> OutputFormat;
    fn page_size(&self) -> usize;
    fn max_concurrent_pages(&self) -> usize;
    fn page_timeout(&self) -> Option<Duration>;
    fn channel_capacity(&self) -> usize;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Harvest>;
    async fn transform(&self, harvest: Harvest) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
