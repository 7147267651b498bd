use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Catalog returned HTTP {status}: {message}")]
    CatalogError { status: u16, message: String },

    #[error("Download of {url} failed: {message}")]
    DownloadError { url: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration field '{field}' is invalid: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Catalog,
    Storage,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ProbeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProbeError::ApiError(_) | ProbeError::DownloadError { .. } => ErrorCategory::Network,
            ProbeError::CatalogError { .. } => ErrorCategory::Catalog,
            ProbeError::IoError(_) | ProbeError::CsvError(_) => ErrorCategory::Storage,
            ProbeError::ConfigError { .. }
            | ProbeError::ConfigValidationError { .. }
            | ProbeError::InvalidConfigValueError { .. }
            | ProbeError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ProbeError::SerializationError(_)
            | ProbeError::ProcessingError { .. }
            | ProbeError::ValidationError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路問題通常重試即可
            ProbeError::ApiError(_) | ProbeError::DownloadError { .. } => ErrorSeverity::Medium,
            ProbeError::CatalogError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            ProbeError::CatalogError { .. } => ErrorSeverity::High,
            ProbeError::IoError(_) => ErrorSeverity::Critical,
            ProbeError::ConfigError { .. }
            | ProbeError::ConfigValidationError { .. }
            | ProbeError::InvalidConfigValueError { .. }
            | ProbeError::MissingConfigError { .. } => ErrorSeverity::High,
            ProbeError::CsvError(_)
            | ProbeError::SerializationError(_)
            | ProbeError::ProcessingError { .. }
            | ProbeError::ValidationError { .. } => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and the Earthdata token, then retry",
            ErrorCategory::Catalog => "Verify the CMR search endpoint and the query parameters",
            ErrorCategory::Storage => "Check that the download and report directories are writable",
            ErrorCategory::Configuration => "Fix the configuration file or command line arguments",
            ErrorCategory::Data => "The catalog returned unexpected data; rerun with --verbose for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ProbeError::CatalogError { status, .. } => {
                format!("The metadata catalog rejected the request (HTTP {})", status)
            }
            ProbeError::MissingConfigError { field } => {
                format!("Configuration is missing '{}'", field)
            }
            ProbeError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration value for '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
