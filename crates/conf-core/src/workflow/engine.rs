//! Implementación de `PromotionWorkflow`.

use conf_domain::{parse_entry, render_entry, validate, ConfigMap, ConfigTable, ConfigValidator, Environment, ProbeResult};
use uuid::Uuid;

use super::{Disposition, OperatorAction, PendingAudit, PromotionOutcome, StepReport, Transition, Verdict,
            WorkflowBuilder, WorkflowSession, WorkflowSettings, WorkflowState};
use crate::audit::AuditLogger;
use crate::errors::WorkflowError;
use crate::event::{EventStore, PromotionEvent, PromotionEventKind};
use crate::hashing::config_fingerprint;
use crate::notify::RefreshNotifier;
use crate::probe::PredictionProbe;
use crate::store::ConfigStore;

/// Orquestador del cambio de configuración.
///
/// Garantías:
/// - Los efectos no idempotentes (escrituras, refresh, probe) sólo corren en
///   `Confirm` y a lo sumo una vez por sesión. Una subida de auditoría fallida
///   tras aplicar el cambio se reintenta con otro `Confirm`.
/// - Todo intento confirmado deja exactamente un registro de auditoría,
///   incluso si un colaborador externo falla a mitad de camino.
pub struct PromotionWorkflow<S, E>
    where S: ConfigStore,
          E: EventStore
{
    pub(crate) store: S,
    pub(crate) event_store: E,
    pub(crate) validator: Box<dyn ConfigValidator>,
    pub(crate) notifier: Box<dyn RefreshNotifier>,
    pub(crate) probe: PredictionProbe,
    pub(crate) audit: AuditLogger,
    pub(crate) settings: WorkflowSettings,
}

/// Progreso de un intento confirmado, para auditar lo que haya ocurrido si
/// un paso falla.
#[derive(Default)]
struct Progress {
    staged: Option<Uuid>,
    promoted: Option<Uuid>,
    probe: Option<ProbeResult>,
}

impl<S, E> PromotionWorkflow<S, E>
    where S: ConfigStore,
          E: EventStore
{
    /// Crea un builder con el store de configuración y el de eventos.
    #[inline]
    pub fn builder(store: S, event_store: E) -> WorkflowBuilder<S, E> {
        WorkflowBuilder::new(store, event_store)
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    /// Configuración vigente de un entorno (`stage` o `prod`).
    pub fn current_config(&self, environment: Environment) -> Result<ConfigMap, WorkflowError> {
        self.store.latest(&self.settings.schema_name, environment)
    }

    /// Sesión nueva cuyo borrador es la config de prod vigente.
    pub fn open_session(&self) -> Result<WorkflowSession, WorkflowError> {
        let prod = self.current_config(Environment::Prod)?;
        Ok(WorkflowSession::new(render_entry(&prod)))
    }

    pub fn events_for(&self, session_id: Uuid) -> Vec<PromotionEvent> {
        self.event_store.list(session_id)
    }

    /// Aplica una acción del operador sobre la sesión.
    pub fn handle(&mut self, mut session: WorkflowSession, action: OperatorAction) -> Transition {
        let result = match action {
            OperatorAction::Edit(text) => Self::on_edit(&mut session, text),
            OperatorAction::SelectEnvironment(environment) => Self::on_select(&mut session, environment),
            OperatorAction::Submit => self.on_submit(&mut session),
            OperatorAction::Confirm => self.on_confirm(&mut session),
        };
        if let Err(e) = &result {
            log::warn!("handle:error session={} state={:?} err={e}", session.id, session.state());
        }
        Transition { session, result }
    }

    fn on_edit(session: &mut WorkflowSession, text: String) -> Result<StepReport, WorkflowError> {
        if session.is_validated() {
            return Err(WorkflowError::InvalidTransition("entry already validated; open a new session to change it".into()));
        }
        session.draft_entry = text;
        session.set_state(WorkflowState::Editing);
        Ok(StepReport::DraftUpdated)
    }

    fn on_select(session: &mut WorkflowSession, environment: Environment) -> Result<StepReport, WorkflowError> {
        let environment = environment.ensure_selectable()?;
        if session.is_confirmed() {
            return Err(WorkflowError::InvalidTransition("change already confirmed".into()));
        }
        session.environment = environment;
        Ok(StepReport::EnvironmentSelected(environment))
    }

    fn on_submit(&mut self, session: &mut WorkflowSession) -> Result<StepReport, WorkflowError> {
        if session.is_validated() {
            return Ok(StepReport::Ignored("entry already validated".into()));
        }
        session.latch_submitted();
        self.event_store
            .append_kind(session.id, PromotionEventKind::Submitted { entry: session.draft_entry.clone() });

        let entries = match parse_entry(&session.draft_entry) {
            Ok(entries) => entries,
            Err(e) => {
                let err = WorkflowError::from(e);
                return self.reject(session, &ConfigMap::new(), err);
            }
        };
        if !validate(&entries, self.validator.as_ref()) {
            session.set_state(WorkflowState::Validated(Verdict::Rejected));
            return self.reject(session, &entries, WorkflowError::SchemaRejected);
        }

        let environment = session.environment;
        self.event_store.append_kind(session.id,
                                     PromotionEventKind::Validated { fingerprint: config_fingerprint(&entries),
                                                                     environment });
        log::info!("submit:validated session={} environment={environment}", session.id);
        session.accept(entries.clone());
        Ok(StepReport::AwaitingConfirmation { entries, environment })
    }

    fn reject(&mut self,
              session: &WorkflowSession,
              entries: &ConfigMap,
              error: WorkflowError)
              -> Result<StepReport, WorkflowError> {
        log::info!("submit:rejected session={} reason={error}", session.id);
        self.event_store
            .append_kind(session.id, PromotionEventKind::EntryRejected { error: error.clone() });
        if self.settings.audit_rejections {
            let record = self.audit.record(session.environment, entries, false, None)?;
            self.event_store
                .append_kind(session.id, PromotionEventKind::Logged { audit_id: record.uid });
        }
        Ok(StepReport::Rejected(error))
    }

    fn on_confirm(&mut self, session: &mut WorkflowSession) -> Result<StepReport, WorkflowError> {
        if session.is_confirmed() {
            return match session.take_pending_audit() {
                Some(pending) => {
                    let entries = session.entries()
                                         .cloned()
                                         .ok_or_else(|| WorkflowError::Internal("confirmed session without entries".into()))?;
                    let environment = session.environment;
                    log::info!("confirm:retrying audit session={}", session.id);
                    self.finish_audit(session, environment, &entries, pending)
                }
                None => Ok(StepReport::Ignored("change already applied; open a new session".into())),
            };
        }
        if !session.is_validated() {
            return Err(WorkflowError::InvalidTransition("entry must be validated before confirming".into()));
        }
        let environment = session.environment.ensure_selectable()?;
        let entries = session.entries()
                             .cloned()
                             .ok_or_else(|| WorkflowError::Internal("validated session without entries".into()))?;
        self.check_refresh_targets(environment)?;

        session.set_state(WorkflowState::Confirmed);
        self.event_store
            .append_kind(session.id, PromotionEventKind::Confirmed { environment });
        log::info!("confirm:start session={} environment={environment}", session.id);

        let mut progress = Progress::default();
        let disposition = match self.run_promotion(session, environment, &entries, &mut progress) {
            Ok(d) => d,
            Err(e) => return Err(self.audit_failure(session, environment, &entries, &progress, e)),
        };
        let probe = progress.probe
                            .clone()
                            .ok_or_else(|| WorkflowError::Internal("probe result missing".into()))?;
        let staged_version = progress.staged
                                     .ok_or_else(|| WorkflowError::Internal("staged version missing".into()))?;

        let pending = PendingAudit { disposition,
                                     staged_version,
                                     promoted_version: progress.promoted,
                                     probe };
        self.finish_audit(session, environment, &entries, pending)
    }

    /// Sube el registro de un intento aplicado. Si falla, la sesión queda con
    /// la auditoría pendiente y el siguiente `Confirm` la reintenta.
    fn finish_audit(&mut self,
                    session: &mut WorkflowSession,
                    environment: Environment,
                    entries: &ConfigMap,
                    pending: PendingAudit)
                    -> Result<StepReport, WorkflowError> {
        let record = match self.audit.record(environment, entries, true, Some(&pending.probe)) {
            Ok(r) => r,
            Err(e) => {
                log::error!("confirm:audit failed session={} err={e}", session.id);
                self.event_store.append_kind(session.id,
                                             PromotionEventKind::StepFailed { step: "audit".into(),
                                                                              error: e.clone() });
                session.park_audit(pending);
                return Err(e);
            }
        };
        self.event_store
            .append_kind(session.id, PromotionEventKind::Logged { audit_id: record.uid });

        let outcome = PromotionOutcome { disposition: pending.disposition,
                                         environment,
                                         staged_version: pending.staged_version,
                                         promoted_version: pending.promoted_version,
                                         probe: pending.probe,
                                         audit_id: record.uid };
        session.finish(outcome.clone());
        log::info!("confirm:done session={} disposition={:?}", session.id, outcome.disposition);
        Ok(StepReport::Completed(outcome))
    }

    /// stage → refresh → probe → (promote → refresh)?
    fn run_promotion(&mut self,
                     session: &mut WorkflowSession,
                     environment: Environment,
                     entries: &ConfigMap,
                     progress: &mut Progress)
                     -> Result<Disposition, WorkflowError> {
        let schema = self.settings.schema_name.clone();
        let staged = self.store.append_version(entries, &schema, ConfigTable::StageConfig)?;
        // Primer efecto no idempotente confirmado: desde aquí no se repite.
        session.latch_confirmed();
        session.set_state(WorkflowState::Staged);
        progress.staged = Some(staged.version_id);
        self.event_store.append_kind(session.id,
                                     PromotionEventKind::Staged { table: ConfigTable::StageConfig,
                                                                  version_id: staged.version_id,
                                                                  fingerprint: config_fingerprint(entries) });

        self.refresh(session.id, self.settings.stage_refresh_target)?;

        let result = self.probe.check(entries)?;
        progress.probe = Some(result.clone());
        session.set_state(WorkflowState::Probed);
        self.event_store.append_kind(session.id,
                                     PromotionEventKind::Probed { all_passed: result.all_passed,
                                                                  messages: result.messages.clone() });

        if !result.all_passed {
            session.set_state(WorkflowState::ProbeFailed);
            self.event_store
                .append_kind(session.id, PromotionEventKind::ProbeFailed { messages: result.messages });
            return Ok(Disposition::ProbeFailed);
        }
        if environment != Environment::Prod {
            session.set_state(WorkflowState::StagedOnly);
            self.event_store
                .append_kind(session.id, PromotionEventKind::PromotionSkipped { environment });
            return Ok(Disposition::StagedOnly);
        }

        let promoted = self.store.append_version(entries, &schema, ConfigTable::ProdConfig)?;
        progress.promoted = Some(promoted.version_id);
        self.event_store.append_kind(session.id,
                                     PromotionEventKind::Promoted { version_id: promoted.version_id });
        self.refresh(session.id, self.settings.prod_refresh_target)?;
        session.set_state(WorkflowState::Promoted);
        Ok(Disposition::Promoted)
    }

    /// Un destino de refresh faltante se detecta antes de escribir staging,
    /// no después de haber cambiado prod.
    fn check_refresh_targets(&self, environment: Environment) -> Result<(), WorkflowError> {
        self.notifier.check_target(self.settings.stage_refresh_target)?;
        if environment == Environment::Prod {
            self.notifier.check_target(self.settings.prod_refresh_target)?;
        }
        Ok(())
    }

    fn refresh(&mut self, session_id: Uuid, target: Environment) -> Result<(), WorkflowError> {
        let times = self.settings.refresh_times;
        self.notifier.notify(target, times)?;
        self.event_store
            .append_kind(session_id, PromotionEventKind::RefreshRequested { environment: target, times });
        Ok(())
    }

    /// Audita un intento cortado por un error y devuelve el error original.
    fn audit_failure(&mut self,
                     session: &mut WorkflowSession,
                     environment: Environment,
                     entries: &ConfigMap,
                     progress: &Progress,
                     error: WorkflowError)
                     -> WorkflowError {
        log::error!("confirm:failed session={} state={:?} err={error}", session.id, session.state());
        self.event_store.append_kind(session.id,
                                     PromotionEventKind::StepFailed { step: format!("{:?}", session.state()),
                                                                      error: error.clone() });
        match self.audit.record_failure(environment, entries, true, progress.probe.as_ref(), &error) {
            Ok(record) => {
                self.event_store
                    .append_kind(session.id, PromotionEventKind::Logged { audit_id: record.uid });
                if session.is_confirmed() {
                    session.set_state(WorkflowState::Logged);
                }
            }
            Err(audit_err) => {
                log::error!("confirm:audit of failed attempt also failed session={} err={audit_err}", session.id);
            }
        }
        error
    }

    /// Variante compacta de eventos de una sesión (para logs y tests).
    pub fn event_variants(&self, session_id: Uuid) -> Vec<&'static str> {
        self.event_store
            .list(session_id)
            .iter()
            .map(|e| match e.kind {
                PromotionEventKind::Submitted { .. } => "U",
                PromotionEventKind::EntryRejected { .. } => "X",
                PromotionEventKind::Validated { .. } => "V",
                PromotionEventKind::Confirmed { .. } => "C",
                PromotionEventKind::Staged { .. } => "S",
                PromotionEventKind::RefreshRequested { .. } => "R",
                PromotionEventKind::Probed { .. } => "P",
                PromotionEventKind::Promoted { .. } => "M",
                PromotionEventKind::PromotionSkipped { .. } => "K",
                PromotionEventKind::ProbeFailed { .. } => "F",
                PromotionEventKind::StepFailed { .. } => "E",
                PromotionEventKind::Logged { .. } => "L",
            })
            .collect()
    }
}
