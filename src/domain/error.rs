//! Domain error types.

/// Top-level error type for riskboard.
#[derive(Debug, thiserror::Error)]
pub enum RiskboardError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("insufficient data for {symbol}: have {points} points, need {minimum}")]
    InsufficientData {
        symbol: String,
        points: usize,
        minimum: usize,
    },

    #[error("failed to fetch {symbol}: {reason}")]
    FetchFailure { symbol: String, reason: String },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RiskboardError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        RiskboardError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl From<&RiskboardError> for std::process::ExitCode {
    fn from(err: &RiskboardError) -> Self {
        let code: u8 = match err {
            RiskboardError::Io(_) => 1,
            RiskboardError::ConfigParse { .. }
            | RiskboardError::ConfigMissing { .. }
            | RiskboardError::ConfigInvalid { .. } => 2,
            RiskboardError::FetchFailure { .. } => 3,
            RiskboardError::InvalidArgument { .. } => 4,
            RiskboardError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
