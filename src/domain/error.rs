//! Domain error types.

/// Top-level error type for stuntman.
#[derive(Debug, thiserror::Error)]
pub enum StuntmanError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    Data { reason: String },

    #[error("no usable candles for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("state store error: {reason}")]
    Persistence { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StuntmanError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        StuntmanError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&StuntmanError> for std::process::ExitCode {
    fn from(err: &StuntmanError) -> Self {
        let code: u8 = match err {
            StuntmanError::Io(_) => 1,
            StuntmanError::ConfigParse { .. }
            | StuntmanError::ConfigMissing { .. }
            | StuntmanError::ConfigInvalid { .. } => 2,
            StuntmanError::Data { .. } => 3,
            StuntmanError::Persistence { .. }
            | StuntmanError::Report { .. }
            | StuntmanError::Json(_) => 4,
            StuntmanError::NoData { .. } | StuntmanError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
