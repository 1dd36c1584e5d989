use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssociationError {
    #[error("Failed to retrieve data for worksheet {worksheet_id}: {message}")]
    DataRetrievalError {
        worksheet_id: String,
        message: String,
    },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned status {status} for {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

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

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    DataSource,
    Network,
    Storage,
    Configuration,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AssociationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DataRetrievalError { .. } => ErrorCategory::DataSource,
            Self::ApiError(_) | Self::HttpStatusError { .. } => ErrorCategory::Network,
            Self::IoError(_) | Self::CsvError(_) | Self::ImageError(_) => ErrorCategory::Storage,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::SerializationError(_)
            | Self::ProcessingError { .. }
            | Self::ValidationError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 上游服務暫時失敗，可重試
            ErrorCategory::DataSource | ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatusError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::DataRetrievalError { worksheet_id, .. } => format!(
                "Could not load ducts and dampers for worksheet {}",
                worksheet_id
            ),
            Self::ApiError(_) | Self::HttpStatusError { .. } => {
                "The design-data service could not be reached".to_string()
            }
            Self::IoError(_) | Self::CsvError(_) => "Failed to write output files".to_string(),
            Self::ImageError(_) => "Failed to decode or encode the worksheet image".to_string(),
            Self::ConfigError { message } => format!("Configuration problem: {}", message),
            Self::ConfigValidationError { field, .. }
            | Self::InvalidConfigValueError { field, .. } => {
                format!("Configuration value '{}' needs attention", field)
            }
            Self::SerializationError(_) => "Received data in an unexpected format".to_string(),
            Self::ProcessingError { message } | Self::ValidationError { message } => {
                message.clone()
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::DataSource => {
                "Check the worksheet id and that the design-data service is available"
            }
            ErrorCategory::Network => "Check the endpoint URL and network connectivity, then retry",
            ErrorCategory::Storage => "Check that the output path exists and is writable",
            ErrorCategory::Configuration => "Review the configuration file or command-line flags",
            ErrorCategory::Processing => "Inspect the input records for malformed geometry",
        }
    }
}

pub type Result<T> = std::result::Result<T, AssociationError>;
