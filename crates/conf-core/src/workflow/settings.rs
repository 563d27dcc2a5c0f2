use conf_domain::Environment;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_AUDIT_BUCKET, DEFAULT_REFRESH_TIMES, DEFAULT_SCHEMA_NAME};

/// Parámetros del workflow que no dependen de la sesión.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Schema SQL de las tablas de configuración.
    pub schema_name: String,
    pub audit_bucket: String,
    /// Destino del refresh tras escribir staging (`stage` o `local`).
    pub stage_refresh_target: Environment,
    /// Destino del refresh tras promover a prod (`prod` o `local`).
    pub prod_refresh_target: Environment,
    /// Golpes al endpoint de refresh por notificación.
    pub refresh_times: u32,
    /// Auditar también los envíos rechazados por parseo o schema. Apagado
    /// por defecto: un rechazo no deja registro.
    pub audit_rejections: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self { schema_name: DEFAULT_SCHEMA_NAME.to_string(),
               audit_bucket: DEFAULT_AUDIT_BUCKET.to_string(),
               stage_refresh_target: Environment::Stage,
               prod_refresh_target: Environment::Prod,
               refresh_times: DEFAULT_REFRESH_TIMES,
               audit_rejections: false }
    }
}

impl WorkflowSettings {
    /// Envía ambos refresh al servidor local (desarrollo).
    pub fn with_local_targets(mut self) -> Self {
        self.stage_refresh_target = Environment::Local;
        self.prod_refresh_target = Environment::Local;
        self
    }
}
