use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("invalid InChIKey: {0}")]
    InvalidInchiKey(String),

    #[error("implausible SMILES: {0}")]
    InvalidSmiles(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {service}")]
    Status { service: String, status: u16 },

    #[error("parse error from {0}: {1}")]
    Parse(String, String),

    #[error("cache error at {0}: {1}")]
    Cache(String, String),

    #[error("taxonomy lookup failed: {0}")]
    Taxonomy(String),

    #[error("extraction output could not be parsed: {0}")]
    ExtractionParse(String),

    #[error("not implemented: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Core(#[from] phytominer_core::CoreError),
}

impl ScienceError {
    /// Failures worth retrying on a later call: transport errors, unexpected
    /// HTTP statuses and garbled responses. A transient failure is never
    /// memoized.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScienceError::Http(_) | ScienceError::Status { .. } | ScienceError::Parse(..)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScienceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let status = ScienceError::Status {
            service: "PubChem".into(),
            status: 503,
        };
        assert!(status.is_transient());
        assert!(ScienceError::Parse("CACTUS".into(), "bad".into()).is_transient());
        assert!(!ScienceError::InvalidInchiKey("abc".into()).is_transient());
        assert!(!ScienceError::Unsupported("x".into()).is_transient());
    }
}
