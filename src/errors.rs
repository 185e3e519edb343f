use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// The remote registry answered with HTTP 429.
    RateLimited(String),
    /// Resource not found error.
    NotFound(String),
    /// Error interacting with an external API.
    ExternalApiError(String),
    /// Network-level failure or 5xx that may succeed on retry.
    TransientError(String),
    /// Missing or invalid configuration.
    ConfigError(String),
    /// Local filesystem failure while saving results.
    IoError(std::io::Error),
    /// Internal error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Returns true for failures worth retrying: connection problems,
    /// timeouts and 5xx answers.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::TransientError(_) => true,
            AppError::WithContext { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Returns true when the remote side signalled HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            AppError::RateLimited(_) => true,
            AppError::WithContext { source, .. } => source.is_rate_limited(),
            _ => false,
        }
    }

    /// Maps a non-success HTTP status into the matching error variant.
    pub fn from_status(service: &str, status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            AppError::RateLimited(format!("{} rate limit (429)", service))
        } else if status.is_server_error() {
            AppError::TransientError(format!("{} returned status {}: {}", service, status, body))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            AppError::NotFound(format!("{} returned 404", service))
        } else {
            AppError::ExternalApiError(format!("{} returned status {}: {}", service, status, body))
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::TransientError(msg) => write!(f, "Transient error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::IoError(e) => write!(f, "I/O error: {}", e),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    ///
    /// Timeouts and connection failures are transient; everything else is terminal.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            AppError::TransientError(err.to_string())
        } else if let Some(status) = err.status() {
            AppError::from_status("remote service", status, &err.to_string())
        } else {
            AppError::ExternalApiError(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON error: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for io::Error to add context
impl<T> ResultExt<T> for Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::IoError(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::IoError(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert!(AppError::from_status("CH", StatusCode::TOO_MANY_REQUESTS, "").is_rate_limited());
        assert!(AppError::from_status("CH", StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(matches!(
            AppError::from_status("CH", StatusCode::NOT_FOUND, ""),
            AppError::NotFound(_)
        ));
        let err = AppError::from_status("CH", StatusCode::UNAUTHORIZED, "bad key");
        assert!(!err.is_transient());
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_context_preserves_predicates() {
        let result: Result<(), AppError> = Err(AppError::RateLimited("CH".to_string()));
        let err = result.context("searching companies").unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(
            err.to_string(),
            "searching companies: Rate limited: CH"
        );
    }
}
