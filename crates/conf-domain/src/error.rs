use thiserror::Error;

/// Errores del dominio de configuración.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Entorno desconocido o no aplicable a la operación pedida.
    #[error("invalid environment: {0}")]
    InvalidEnvironment(String),

    /// Entrada de texto libre que no pudo convertirse en un `ConfigMap`.
    #[error("malformed entry: {0}")]
    MalformedEntry(String),
}
