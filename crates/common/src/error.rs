//! Error types for specretry

use thiserror::Error;

/// Result type alias using specretry Error
pub type Result<T> = std::result::Result<T, Error>;

/// specretry error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Shared store error: {0}")]
    Store(String),

    #[error("Job service returned {status}: {body}")]
    JobService { status: u16, body: String },

    #[error("Resource not found: {kind} with id {id}")]
    NotFound { kind: String, id: String },

    #[error("Concurrent update on key {key} not applied after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the error came from the remote job service rather than the store
    pub fn is_job_service(&self) -> bool {
        matches!(self, Error::JobService { .. } | Error::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_service_errors() {
        let rejected = Error::JobService {
            status: 401,
            body: "Not authorized".into(),
        };
        assert!(rejected.is_job_service());
        assert_eq!(rejected.to_string(), "Job service returned 401: Not authorized");

        let conflict = Error::Conflict {
            key: "retriedSpecs".into(),
            attempts: 16,
        };
        assert!(!conflict.is_job_service());
        assert!(!Error::InvalidConfig("x".into()).is_job_service());
    }
}
