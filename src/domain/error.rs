//! Domain error types.

/// Top-level error type for pulsetrader.
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
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

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("invalid price for {symbol}: {value}")]
    InvalidPrice { symbol: String, value: f64 },

    #[error("price feed error for {symbol}: {reason}")]
    Feed { symbol: String, reason: String },

    #[error("state storage error: {reason}")]
    Storage { reason: String },

    #[error("invariant violation: {reason}")]
    InvariantViolation { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PulseError> for std::process::ExitCode {
    fn from(err: &PulseError) -> Self {
        let code: u8 = match err {
            PulseError::Io(_) => 1,
            PulseError::ConfigParse { .. }
            | PulseError::ConfigMissing { .. }
            | PulseError::ConfigInvalid { .. } => 2,
            PulseError::Feed { .. } | PulseError::Storage { .. } => 3,
            PulseError::InsufficientData { .. } | PulseError::InvalidPrice { .. } => 5,
            PulseError::InvariantViolation { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
