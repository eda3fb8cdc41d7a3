use crate::config::defaults::*;
use crate::config::{timeout_from_secs, validate_settings};
use crate::domain::model::{ApiProfile, OutputFormat};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: Option<PipelineConfig>,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
    /// 由 [api] 區段解析出的完整設定
    #[serde(skip)]
    pub api_profile: ApiProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_CATALOG_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub endpoint: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RELAY_ENDPOINT.to_string(),
        }
    }
}

/// 每個欄位都可省略，省略時沿用內建的 API 設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub id_param: Option<String>,
    pub filter_param: Option<String>,
    pub filter_value: Option<serde_json::Value>,
    pub offset_param: Option<String>,
    pub label_field: Option<String>,
    /// true 時以 headers 取代內建標頭，否則合併
    pub replace_headers: Option<bool>,
    pub headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    pub page_size: Option<usize>,
    pub max_concurrent_pages: Option<usize>,
    pub page_timeout_seconds: Option<u64>,
    pub channel_capacity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub filename: Option<String>,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: ".".to_string(),
            filename: None,
            format: OutputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: TomlConfig =
            toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        config.api_profile = config.api.resolve();
        Ok(config)
    }

    /// 替換環境變數 (例如 ${API_HOST})，未定義的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn pipeline_name(&self) -> &str {
        self.pipeline
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("relay-etl")
    }
}

impl ApiConfig {
    fn resolve(&self) -> ApiProfile {
        let mut profile = ApiProfile::default();

        if let Some(base_url) = &self.base_url {
            profile.base_url = base_url.clone();
        }
        if let Some(id_param) = &self.id_param {
            profile.id_param = id_param.clone();
        }
        if let Some(filter_param) = &self.filter_param {
            profile.filter_param = filter_param.clone();
        }
        if let Some(filter_value) = &self.filter_value {
            profile.filter_value = filter_value.clone();
        }
        if let Some(offset_param) = &self.offset_param {
            profile.offset_param = offset_param.clone();
        }
        if let Some(label_field) = &self.label_field {
            profile.label_field = label_field.clone();
        }
        if let Some(headers) = &self.headers {
            if self.replace_headers.unwrap_or(false) {
                profile.headers = headers.clone();
            } else {
                profile.headers.extend(headers.clone());
            }
        }

        profile
    }
}

impl ConfigProvider for TomlConfig {
    fn catalog_path(&self) -> &str {
        &self.catalog.path
    }

    fn relay_endpoint(&self) -> &str {
        &self.relay.endpoint
    }

    fn api_profile(&self) -> &ApiProfile {
        &self.api_profile
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_file(&self) -> String {
        self.load.filename.clone().unwrap_or_else(|| {
            format!("{}.{}", DEFAULT_OUTPUT_STEM, self.load.format.extension())
        })
    }

    fn output_format(&self) -> OutputFormat {
        self.load.format
    }

    fn page_size(&self) -> usize {
        self.fetch.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    fn max_concurrent_pages(&self) -> usize {
        self.fetch
            .max_concurrent_pages
            .unwrap_or(DEFAULT_MAX_CONCURRENT_PAGES)
    }

    fn page_timeout(&self) -> Option<Duration> {
        timeout_from_secs(
            self.fetch
                .page_timeout_seconds
                .unwrap_or(DEFAULT_PAGE_TIMEOUT_SECS),
        )
    }

    fn channel_capacity(&self) -> usize {
        self.fetch.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_settings(self)
    }
}
