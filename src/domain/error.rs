//! Domain error types.

/// Top-level error type for rebalancer.
#[derive(Debug, thiserror::Error)]
pub enum RebalancerError {
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

    #[error("universe has no instruments")]
    EmptyUniverse,

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {instrument}")]
    NoData { instrument: String },

    #[error("order for {instrument} rejected: {reason}")]
    OrderRejected { instrument: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RebalancerError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        RebalancerError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        RebalancerError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&RebalancerError> for std::process::ExitCode {
    fn from(err: &RebalancerError) -> Self {
        let code: u8 = match err {
            RebalancerError::Io(_) => 1,
            RebalancerError::ConfigParse { .. }
            | RebalancerError::ConfigMissing { .. }
            | RebalancerError::ConfigInvalid { .. }
            | RebalancerError::EmptyUniverse => 2,
            RebalancerError::Data { .. } | RebalancerError::NoData { .. } => 3,
            RebalancerError::OrderRejected { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
