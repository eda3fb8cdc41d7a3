pub mod config;
pub mod core;
pub mod domain;
pub mod relay;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{catalog::Catalog, cli::LocalStorage, toml_config::TomlConfig};
pub use core::{
    etl::EtlEngine, exporter::TabularExporter, fetcher::PageFetcher,
    orchestrator::FetchOrchestrator, pipeline::HarvestPipeline,
};
pub use domain::model::{ApiProfile, DataSet, OutputFormat, Record, RelayRequest};
pub use relay::{RelayClient, RelayError};
pub use utils::error::{EtlError, Result};
