//! Errores de los adaptadores HTTP y de filesystem.

use conf_core::WorkflowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("no endpoint configured for environment '{0}'")]
    MissingEndpoint(String),
    #[error("configuration: {0}")]
    Config(String),
}

impl From<AdapterError> for WorkflowError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::MissingEndpoint(env) => WorkflowError::InvalidEnvironment(env),
            other => WorkflowError::ExternalCall(other.to_string()),
        }
    }
}
