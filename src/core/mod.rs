pub mod etl;
pub mod exporter;
pub mod fetcher;
pub mod orchestrator;
pub mod pipeline;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
