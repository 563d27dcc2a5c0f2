//! Workflow de promoción: validate → stage → verify → promote → audit.
//!
//! `PromotionWorkflow` no guarda estado de sesión; recibe una
//! `WorkflowSession` y una `OperatorAction`, ejecuta los efectos que
//! correspondan y devuelve la sesión actualizada junto con un reporte.

pub mod builder;
pub mod engine;
pub mod session;
pub mod settings;

pub use builder::WorkflowBuilder;
pub use engine::PromotionWorkflow;
pub use session::{PendingAudit, Verdict, WorkflowSession, WorkflowState};
pub use settings::WorkflowSettings;

use conf_domain::{ConfigMap, Environment, ProbeResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::WorkflowError;

/// Eventos de la capa de interacción.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorAction {
    /// Reemplaza el borrador de texto libre.
    Edit(String),
    SelectEnvironment(Environment),
    /// Primer botón: parsear y validar.
    Submit,
    /// Segundo botón: aplicar el cambio.
    Confirm,
}

/// Cómo terminó un intento confirmado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    Promoted,
    ProbeFailed,
    StagedOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionOutcome {
    pub disposition: Disposition,
    pub environment: Environment,
    pub staged_version: Uuid,
    pub promoted_version: Option<Uuid>,
    pub probe: ProbeResult,
    pub audit_id: Uuid,
}

/// Lo que la vista debe mostrar tras una acción.
#[derive(Debug, Clone, PartialEq)]
pub enum StepReport {
    DraftUpdated,
    EnvironmentSelected(Environment),
    /// Entrada rechazada (`MalformedEntry` o `SchemaRejected`); el workflow
    /// se detiene.
    Rejected(WorkflowError),
    /// Entrada válida; se espera la confirmación explícita.
    AwaitingConfirmation { entries: ConfigMap, environment: Environment },
    Completed(PromotionOutcome),
    /// Acción repetida sobre un paso ya latcheado: sin efectos.
    Ignored(String),
}

/// Resultado de `handle`: la sesión siempre vuelve al llamador, haya o no
/// error.
#[derive(Debug)]
pub struct Transition {
    pub session: WorkflowSession,
    pub result: Result<StepReport, WorkflowError>,
}

impl Transition {
    pub fn into_parts(self) -> (WorkflowSession, Result<StepReport, WorkflowError>) {
        (self.session, self.result)
    }
}
