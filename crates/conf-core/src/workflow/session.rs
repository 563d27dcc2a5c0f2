//! Estado explícito de una sesión de operador.
//!
//! La capa de interacción recalcula toda su vista en cada evento, así que el
//! progreso no puede vivir en el call stack: vive aquí y viaja de entrada y
//! salida por `PromotionWorkflow::handle`. Los latches (`submitted`,
//! `validated`, `confirmed`) sólo pasan de `false` a `true`; la única forma
//! de reiniciarlos es abrir una sesión nueva.

use conf_domain::{ConfigMap, Environment, ProbeResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Disposition, PromotionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// Estados del workflow. Las transiciones válidas son:
/// - `Editing` -> `Submitted` -> `Validated(_)`
/// - `Validated(Accepted)` -> `Confirmed` -> `Staged` -> `Probed`
/// - `Probed` -> `Promoted` | `ProbeFailed` | `StagedOnly` -> `Logged`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    Editing,
    Submitted,
    Validated(Verdict),
    Confirmed,
    Staged,
    Probed,
    Promoted,
    ProbeFailed,
    /// Probe correcto con destino `stage`: no hay promoción.
    StagedOnly,
    Logged,
}

/// Resultado de un intento ya aplicado cuya subida de auditoría falló. Un
/// `Confirm` posterior sólo reintenta la subida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAudit {
    pub disposition: Disposition,
    pub staged_version: Uuid,
    pub promoted_version: Option<Uuid>,
    pub probe: ProbeResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSession {
    pub id: Uuid,
    pub draft_entry: String,
    pub environment: Environment,
    submitted: bool,
    validated: bool,
    confirmed: bool,
    entries: Option<ConfigMap>,
    state: WorkflowState,
    outcome: Option<PromotionOutcome>,
    pending_audit: Option<PendingAudit>,
}

impl WorkflowSession {
    /// Sesión nueva con un borrador inicial (normalmente la config de prod
    /// vigente) y `stage` como destino.
    pub fn new(draft_entry: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(),
               draft_entry: draft_entry.into(),
               environment: Environment::Stage,
               submitted: false,
               validated: false,
               confirmed: false,
               entries: None,
               state: WorkflowState::Editing,
               outcome: None,
               pending_audit: None }
    }

    pub fn is_submitted(&self) -> bool { self.submitted }
    pub fn is_validated(&self) -> bool { self.validated }
    pub fn is_confirmed(&self) -> bool { self.confirmed }
    pub fn state(&self) -> WorkflowState { self.state }

    /// Entradas validadas (congeladas al validar).
    pub fn entries(&self) -> Option<&ConfigMap> { self.entries.as_ref() }

    pub fn outcome(&self) -> Option<&PromotionOutcome> { self.outcome.as_ref() }

    /// `true` si el cambio está aplicado pero falta el registro de auditoría.
    pub fn is_audit_pending(&self) -> bool { self.pending_audit.is_some() }

    pub(crate) fn set_state(&mut self, state: WorkflowState) {
        self.state = state;
    }

    pub(crate) fn latch_submitted(&mut self) {
        self.submitted = true;
        self.state = WorkflowState::Submitted;
    }

    pub(crate) fn accept(&mut self, entries: ConfigMap) {
        self.validated = true;
        self.entries = Some(entries);
        self.state = WorkflowState::Validated(Verdict::Accepted);
    }

    pub(crate) fn latch_confirmed(&mut self) {
        self.confirmed = true;
    }

    pub(crate) fn park_audit(&mut self, pending: PendingAudit) {
        self.pending_audit = Some(pending);
    }

    pub(crate) fn take_pending_audit(&mut self) -> Option<PendingAudit> {
        self.pending_audit.take()
    }

    pub(crate) fn finish(&mut self, outcome: PromotionOutcome) {
        self.outcome = Some(outcome);
        self.state = WorkflowState::Logged;
    }
}
