//! Tipos de evento del workflow de promoción y estructura `PromotionEvent`.
//!
//! Rol en el flujo:
//! - Cada acción del operador que avanza el workflow deja uno o más eventos
//!   en un `EventStore` append-only, correlacionados por el id de sesión.
//! - Los eventos describen efectos ya ocurridos; el estado vivo de la sesión
//!   está en `WorkflowSession`, los eventos sirven para trazabilidad y
//!   render.
use chrono::{DateTime, Utc};
use conf_domain::{ConfigTable, Environment};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::WorkflowError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PromotionEventKind {
    /// El operador envió el borrador.
    Submitted { entry: String },
    /// El borrador no parseó o no pasó el schema. El workflow se detiene.
    EntryRejected { error: WorkflowError },
    /// Borrador válido, a la espera de la confirmación explícita.
    Validated { fingerprint: String, environment: Environment },
    /// Segunda confirmación recibida; desde aquí no hay cancelación.
    Confirmed { environment: Environment },
    /// Nueva versión escrita en una tabla de configuración.
    Staged { table: ConfigTable, version_id: Uuid, fingerprint: String },
    /// Se pidió a las instancias de `environment` recargar configuración.
    RefreshRequested { environment: Environment, times: u32 },
    Probed { all_passed: bool, messages: Vec<String> },
    Promoted { version_id: Uuid },
    /// Probe correcto pero el destino era `stage`.
    PromotionSkipped { environment: Environment },
    ProbeFailed { messages: Vec<String> },
    /// Un colaborador externo falló después de la confirmación.
    StepFailed { step: String, error: WorkflowError },
    /// Registro de auditoría archivado. Estado terminal.
    Logged { audit_id: Uuid },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionEvent {
    pub seq: u64, // asignado por el store (orden append)
    pub session_id: Uuid,
    pub kind: PromotionEventKind,
    pub ts: DateTime<Utc>,
}
