use crate::domain::hero::HeroId;
use thiserror::Error;

/// Failures a counter lookup or a ranking request can surface to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    /// The referenced hero is not part of the reference data.
    #[error("hero {0} not found")]
    NotFound(HeroId),

    /// The backing store (remote sheet, database) could not answer.
    #[error("counter source {source_name} unavailable: {detail}")]
    UpstreamUnavailable {
        source_name: &'static str,
        detail: String,
    },

    /// The caller sent a roster that violates the request contract.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CounterError {
    pub fn upstream(source_name: &'static str, err: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable {
            source_name,
            detail: format!("{err:#}"),
        }
    }

    /// Stable machine-readable tag used in API error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_keeps_anyhow_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("sheets request failed");
        let e = CounterError::upstream("sheets", err);
        assert_eq!(
            e.to_string(),
            "counter source sheets unavailable: sheets request failed: connection refused"
        );
        assert_eq!(e.kind(), "upstream_unavailable");
    }
}
