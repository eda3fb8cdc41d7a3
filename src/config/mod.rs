pub mod catalog;
pub mod cli;
pub mod defaults;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_url,
};
use std::time::Duration;

#[cfg(feature = "cli")]
use crate::domain::model::{ApiProfile, OutputFormat};
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use defaults::*;

/// 兩種配置來源共用的檢查
pub fn validate_settings<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    validate_path("catalog", config.catalog_path())?;
    validate_url("relay_endpoint", config.relay_endpoint())?;

    let profile = config.api_profile();
    validate_url("api.base_url", &profile.base_url)?;
    validate_non_empty_string("api.id_param", &profile.id_param)?;
    validate_non_empty_string("api.offset_param", &profile.offset_param)?;
    validate_non_empty_string("api.label_field", &profile.label_field)?;

    validate_path("output_path", config.output_path())?;
    let format = config.output_format();
    validate_file_extension("output_file", &config.output_file(), &[format.extension()])?;

    validate_range("page_size", config.page_size(), 1, 1000)?;
    validate_range("max_concurrent_pages", config.max_concurrent_pages(), 1, 4096)?;
    validate_positive_number("channel_capacity", config.channel_capacity(), 1)?;

    Ok(())
}

/// 0 秒代表不設逾時
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "relay-etl")]
#[command(about = "Collect paginated records through the relay and export them as one table")]
pub struct CliConfig {
    /// Catalog of data sets (JSON array)
    #[arg(long, default_value = DEFAULT_CATALOG_PATH)]
    pub catalog: String,

    #[arg(long, default_value = DEFAULT_RELAY_ENDPOINT)]
    pub relay_endpoint: String,

    #[arg(long, default_value = ".")]
    pub output_path: String,

    /// Defaults to output_all_programs.<format>
    #[arg(long)]
    pub output_file: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_PAGES)]
    pub max_concurrent_pages: usize,

    /// Per-page deadline in seconds, 0 disables it
    #[arg(long, default_value_t = DEFAULT_PAGE_TIMEOUT_SECS)]
    pub page_timeout_secs: u64,

    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(skip)]
    pub api_profile: ApiProfile,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn catalog_path(&self) -> &str {
        &self.catalog
    }

    fn relay_endpoint(&self) -> &str {
        &self.relay_endpoint
    }

    fn api_profile(&self) -> &ApiProfile {
        &self.api_profile
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_file(&self) -> String {
        self.output_file
            .clone()
            .unwrap_or_else(|| format!("{}.{}", DEFAULT_OUTPUT_STEM, self.format.extension()))
    }

    fn output_format(&self) -> OutputFormat {
        self.format
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn max_concurrent_pages(&self) -> usize {
        self.max_concurrent_pages
    }

    fn page_timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.page_timeout_secs)
    }

    fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_settings(self)
    }
}
