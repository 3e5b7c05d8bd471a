use thiserror::Error;

/// Fatal conditions of one run. Each maps to a non-zero exit.
#[derive(Debug, Error)]
pub enum RcaError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to resolve Komodor cluster: {0:#}")]
    Resolution(#[source] anyhow::Error),

    #[error(
        "no matching Komodor cluster found for '{local}'. Available clusters: {available}\n\n\
         💡 To fix this, add a manual mapping to {mapping_path}:\n\
         mapping:\n  \"{local}\": \"your-komodor-cluster-name\""
    )]
    NoMatch {
        local: String,
        available: String,
        mapping_path: String,
    },

    #[error("RCA trigger failed: {0}")]
    Trigger(String),

    #[error("no session ID received from Komodor API")]
    EmptySession,

    #[error("polling gave up after {attempts} consecutive failures: {source}")]
    PollExhausted {
        attempts: u32,
        #[source]
        source: PollError,
    },
}

/// A failure inside one poll iteration. Always retried until the budget runs out.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("failed to create poll request: {0}")]
    Request(String),

    #[error("failed to poll session: {0}")]
    Transport(String),

    #[error("polling failed (HTTP {code}): {body}")]
    Status { code: u16, body: String },

    #[error("failed to parse {stage} response: {message}")]
    Decode { stage: DecodeStage, message: String },
}

/// Where decoding of a poll body broke down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// Body is not JSON at all.
    Raw,
    /// Body is JSON but does not fit the snapshot shape.
    Structured,
}

impl std::fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeStage::Raw => write!(f, "raw"),
            DecodeStage::Structured => write!(f, "structured"),
        }
    }
}

impl PollError {
    pub fn from_decode(err: serde_json::Error) -> Self {
        let stage = match err.classify() {
            serde_json::error::Category::Data => DecodeStage::Structured,
            _ => DecodeStage::Raw,
        };
        PollError::Decode {
            stage,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_are_raw_stage() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        match PollError::from_decode(err) {
            PollError::Decode { stage, .. } => assert_eq!(stage, DecodeStage::Raw),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn shape_errors_are_structured_stage() {
        let err = serde_json::from_str::<bool>("\"yes\"").unwrap_err();
        match PollError::from_decode(err) {
            PollError::Decode { stage, .. } => assert_eq!(stage, DecodeStage::Structured),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn no_match_lists_clusters_and_remediation() {
        let err = RcaError::NoMatch {
            local: "kind-dev".to_string(),
            available: "prod, staging".to_string(),
            mapping_path: "~/.k9s-komodor-rca/clusters.yaml".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("Available clusters: prod, staging"));
        assert!(text.contains("\"kind-dev\": \"your-komodor-cluster-name\""));
    }

    #[test]
    fn exhausted_keeps_last_error() {
        let err = RcaError::PollExhausted {
            attempts: 72,
            source: PollError::Status {
                code: 503,
                body: "upstream down".to_string(),
            },
        };
        assert!(err.to_string().contains("HTTP 503"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
