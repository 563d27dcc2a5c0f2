use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ConfigMap, Environment, ProbeResult};

/// Registro de auditoría de un intento de cambio. Se escribe una sola vez
/// como blob `{uid}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub uid: Uuid,
    #[serde(rename = "environment_selection")]
    pub environment: Environment,
    #[serde(rename = "config_values")]
    pub entries: ConfigMap,
    #[serde(rename = "schema_validation")]
    pub schema_valid: bool,
    /// `None` cuando el probe no llegó a ejecutarse.
    #[serde(rename = "error_validation")]
    pub probe_result: Option<ProbeResult>,
    /// Error fatal que cortó el intento, si lo hubo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn blob_key(&self) -> String {
        format!("{}.json", self.uid)
    }
}
