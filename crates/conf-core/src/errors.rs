//! Errores del workflow de promoción.
//!
//! Los rechazos esperables de una entrada (`MalformedEntry`,
//! `SchemaRejected`) se reportan al operador como parte de la transición; el
//! resto de variantes son fatales y cortan el intento en curso.

use conf_domain::DomainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum WorkflowError {
    #[error("malformed entry: {0}")] MalformedEntry(String),
    #[error("provided input data failed validation")] SchemaRejected,
    #[error("invalid environment: {0}")] InvalidEnvironment(String),
    #[error("config store: {0}")] Store(String),
    #[error("refusing to append an empty config version")] EmptyVersion,
    #[error("external call failed: {0}")] ExternalCall(String),
    #[error("audit upload failed: {0}")] Audit(String),
    #[error("action not allowed: {0}")] InvalidTransition(String),
    #[error("internal: {0}")] Internal(String),
}

impl From<DomainError> for WorkflowError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidEnvironment(m) => WorkflowError::InvalidEnvironment(m),
            DomainError::MalformedEntry(m) => WorkflowError::MalformedEntry(m),
        }
    }
}
