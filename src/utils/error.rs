use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load catalog '{path}': {message}")]
    CatalogError { path: String, message: String },

    #[error("Relay returned status {status}: {message}")]
    RelayError { status: u16, message: String },

    #[error("Unexpected response envelope: {message}")]
    DecodeError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Failed to write export '{path}': {message}")]
    ExportError { path: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::RelayError { .. } => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::DecodeError { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::CatalogError { .. } => ErrorCategory::Configuration,
            EtlError::ZipError(_) | EtlError::ExportError { .. } => ErrorCategory::Storage,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單頁失敗會在抓取邊界被吸收，只有直接呼叫時才會浮出
            EtlError::ApiError(_) | EtlError::RelayError { .. } => ErrorSeverity::Medium,
            EtlError::DecodeError { .. } | EtlError::SerializationError(_) => {
                ErrorSeverity::Medium
            }
            EtlError::CsvError(_) | EtlError::ProcessingError { .. } => ErrorSeverity::High,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::CatalogError { .. } => ErrorSeverity::High,
            EtlError::ZipError(_) | EtlError::ExportError { .. } | EtlError::IoError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check that the relay is running and reachable at the configured endpoint"
            }
            ErrorCategory::Data => "Inspect the upstream response; the API envelope may have changed",
            ErrorCategory::Configuration => match self {
                EtlError::CatalogError { .. } => {
                    "Make sure the catalog file exists and is a JSON array of data sets"
                }
                _ => "Review the command line flags or the TOML configuration file",
            },
            ErrorCategory::Storage => {
                "Make sure the output directory exists and is writable"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::CatalogError { path, .. } => {
                format!("Could not read the catalog file '{}'", path)
            }
            EtlError::ExportError { path, .. } => {
                format!("Could not write the export file '{}'", path)
            }
            EtlError::RelayError { status, .. } => {
                format!("The relay rejected the request (status {})", status)
            }
            EtlError::ApiError(e) if e.is_connect() => {
                "Could not connect to the relay".to_string()
            }
            EtlError::ApiError(e) if e.is_timeout() => "The relay call timed out".to_string(),
            other => other.to_string(),
        }
    }

    /// 依嚴重程度決定程序結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
