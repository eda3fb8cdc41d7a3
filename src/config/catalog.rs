use crate::domain::model::DataSet;
use crate::utils::error::{EtlError, Result};
use std::path::Path;

/// 由目錄爬蟲產生的資料集清單，載入後唯讀
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub datasets: Vec<DataSet>,
}

impl Catalog {
    pub fn new(datasets: Vec<DataSet>) -> Self {
        Self { datasets }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().display().to_string();
        let content = std::fs::read_to_string(&path).map_err(|e| EtlError::CatalogError {
            path: path_str.clone(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&content).map_err(|e| match e {
            EtlError::CatalogError { message, .. } => EtlError::CatalogError {
                path: path_str,
                message,
            },
            other => other,
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let datasets: Vec<DataSet> =
            serde_json::from_str(content).map_err(|e| EtlError::CatalogError {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { datasets })
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// 整份目錄需要的頁數
    pub fn total_pages(&self, page_size: usize) -> u64 {
        self.datasets
            .iter()
            .map(|d| d.page_count(page_size as u64))
            .sum()
    }
}
