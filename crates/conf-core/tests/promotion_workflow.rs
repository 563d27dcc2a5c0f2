use conf_core::{BlobStore, ConfigStore, Disposition, InMemoryBlobStore, InMemoryConfigStore, InMemoryEventStore, OperatorAction,
                PromotionWorkflow, RecordingNotifier, StepReport, WorkflowError, WorkflowSession, WorkflowSettings,
                WorkflowState};
use conf_domain::{ConfigMap, ConfigTable, ConfigVersion, Environment};
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

const SCHEMA: &str = "churn_model";
const BUCKET: &str = "churn-model-data-science-logs";

/// Servicio simulado que ya recargó un cutoff de 0.5: marca `yes` cuando
/// `activity_score` supera ese umbral y lo devuelve como predicción.
fn model_at_half(payload: &Value) -> Result<Value, WorkflowError> {
    let score = payload["activity_score"].as_f64().unwrap_or(0.0);
    let flag = if score >= 0.5 { "yes" } else { "no" };
    Ok(json!({"prediction": score, "high_risk": flag}))
}

fn seeded_store() -> InMemoryConfigStore {
    let prod = ConfigMap::from([("proba_cutoff".to_string(), json!(0.45))]);
    InMemoryConfigStore::new().with_version(SCHEMA, ConfigTable::StageConfig, prod.clone())
                              .with_version(SCHEMA, ConfigTable::ProdConfig, prod)
}

struct Harness<S: ConfigStore> {
    wf: PromotionWorkflow<S, InMemoryEventStore>,
    notifier: RecordingNotifier,
    blobs: InMemoryBlobStore,
}

fn harness_with<S: ConfigStore>(store: S, settings: WorkflowSettings) -> Harness<S> {
    let notifier = RecordingNotifier::new();
    let blobs = InMemoryBlobStore::new();
    let wf = PromotionWorkflow::builder(store, InMemoryEventStore::default()).notifier(notifier.clone())
                                                                           .prediction_client(model_at_half)
                                                                           .blob_store(blobs.clone())
                                                                           .settings(settings)
                                                                           .build()
                                                                           .expect("workflow");
    Harness { wf, notifier, blobs }
}

fn harness() -> Harness<InMemoryConfigStore> {
    harness_with(seeded_store(), WorkflowSettings::default())
}

/// Edit + select + submit; devuelve la sesión validada.
fn submit<S: ConfigStore>(h: &mut Harness<S>, entry: &str, env: Environment) -> (WorkflowSession, StepReport) {
    let session = h.wf.open_session().expect("session");
    let (session, r) = h.wf.handle(session, OperatorAction::Edit(entry.into())).into_parts();
    r.unwrap();
    let (session, r) = h.wf.handle(session, OperatorAction::SelectEnvironment(env)).into_parts();
    r.unwrap();
    let (session, r) = h.wf.handle(session, OperatorAction::Submit).into_parts();
    (session, r.expect("submit"))
}

#[test]
fn prod_promotion_writes_both_tables_and_audits_once() {
    let mut h = harness();
    let (session, report) = submit(&mut h, "{'proba_cutoff': 0.5}", Environment::Prod);
    assert!(matches!(report, StepReport::AwaitingConfirmation { environment: Environment::Prod, .. }));
    assert_eq!(h.wf.store().version_count(SCHEMA, ConfigTable::StageConfig), 1, "submit must not write");

    let (session, r) = h.wf.handle(session, OperatorAction::Confirm).into_parts();
    let StepReport::Completed(outcome) = r.unwrap() else { panic!("expected completion") };
    assert_eq!(outcome.disposition, Disposition::Promoted);
    assert!(outcome.probe.all_passed);
    assert!(outcome.probe.messages.is_empty());
    assert!(outcome.promoted_version.is_some());
    assert_eq!(session.state(), WorkflowState::Logged);

    assert_eq!(h.wf.current_config(Environment::Prod).unwrap()["proba_cutoff"], json!(0.5));
    assert_eq!(h.wf.current_config(Environment::Stage).unwrap()["proba_cutoff"], json!(0.5));
    assert_eq!(h.notifier.calls(), vec![(Environment::Stage, 1), (Environment::Prod, 1)]);

    let records = h.blobs.audit_records(BUCKET);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].uid, outcome.audit_id);
    assert_eq!(records[0].environment, Environment::Prod);
    assert!(records[0].schema_valid);
    assert_eq!(records[0].probe_result.as_ref(), Some(&outcome.probe));

    assert_eq!(h.wf.event_variants(session.id), vec!["U", "V", "C", "S", "R", "P", "M", "R", "L"]);
}

#[test]
fn failed_probe_never_touches_prod() {
    let mut h = harness();
    // Con cutoff 0.2 el payload de 0.2745 debería marcarse `yes`, pero el
    // servicio (umbral 0.5) lo marca `no`.
    let (session, _) = submit(&mut h, "{'proba_cutoff': 0.2}", Environment::Prod);
    let (session, r) = h.wf.handle(session, OperatorAction::Confirm).into_parts();
    let StepReport::Completed(outcome) = r.unwrap() else { panic!("expected completion") };

    assert_eq!(outcome.disposition, Disposition::ProbeFailed);
    assert!(!outcome.probe.all_passed);
    assert_eq!(outcome.probe.messages.len(), 4);
    assert!(outcome.probe
                   .messages
                   .contains(&"payload should be flagged as high_risk but is not".to_string()));
    assert_eq!(outcome.promoted_version, None);
    assert_eq!(h.wf.store().version_count(SCHEMA, ConfigTable::ProdConfig), 1);
    assert_eq!(h.wf.current_config(Environment::Prod).unwrap()["proba_cutoff"], json!(0.45));
    assert_eq!(h.wf.current_config(Environment::Stage).unwrap()["proba_cutoff"], json!(0.2));
    assert_eq!(h.notifier.calls(), vec![(Environment::Stage, 1)]);

    let records = h.blobs.audit_records(BUCKET);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].probe_result.as_ref().map(|p| p.all_passed), Some(false));
    assert_eq!(h.wf.event_variants(session.id), vec!["U", "V", "C", "S", "R", "P", "F", "L"]);
}

#[test]
fn stage_target_stops_after_verification() {
    let mut h = harness();
    let (session, _) = submit(&mut h, "{'proba_cutoff': 0.5}", Environment::Stage);
    let (session, r) = h.wf.handle(session, OperatorAction::Confirm).into_parts();
    let StepReport::Completed(outcome) = r.unwrap() else { panic!("expected completion") };

    assert_eq!(outcome.disposition, Disposition::StagedOnly);
    assert!(outcome.probe.all_passed);
    assert_eq!(h.wf.store().version_count(SCHEMA, ConfigTable::StageConfig), 2);
    assert_eq!(h.wf.store().version_count(SCHEMA, ConfigTable::ProdConfig), 1);
    assert_eq!(h.notifier.calls(), vec![(Environment::Stage, 1)]);
    assert_eq!(h.blobs.audit_records(BUCKET)[0].environment, Environment::Stage);
    assert_eq!(h.wf.event_variants(session.id), vec!["U", "V", "C", "S", "R", "P", "K", "L"]);
}

#[test]
fn rejected_entries_have_no_side_effects() {
    let mut h = harness();
    for entry in ["{'proba_cutoff': 1.5}", "{'proba_cutoff': 'half'}", "{}", "not json at all"] {
        let (session, report) = submit(&mut h, entry, Environment::Prod);
        assert!(matches!(report, StepReport::Rejected(_)), "{entry} should be rejected");
        assert!(!session.is_validated());
        let (_, r) = h.wf.handle(session, OperatorAction::Confirm).into_parts();
        assert!(matches!(r, Err(WorkflowError::InvalidTransition(_))));
    }
    assert_eq!(h.wf.store().version_count(SCHEMA, ConfigTable::StageConfig), 1);
    assert_eq!(h.wf.store().version_count(SCHEMA, ConfigTable::ProdConfig), 1);
    assert!(h.notifier.calls().is_empty());
    assert!(h.blobs.keys(BUCKET).is_empty());
}

#[test]
fn malformed_and_schema_rejections_are_distinguished() {
    let mut h = harness();
    let (_, report) = submit(&mut h, "{'proba_cutoff': 0.5", Environment::Stage);
    assert!(matches!(report, StepReport::Rejected(WorkflowError::MalformedEntry(_))));
    let (session, report) = submit(&mut h, "{'proba_cutoff': 0.05}", Environment::Stage);
    assert_eq!(report, StepReport::Rejected(WorkflowError::SchemaRejected));
    assert_eq!(session.state(), WorkflowState::Validated(conf_core::Verdict::Rejected));
}

#[test]
fn rejection_audit_is_opt_in() {
    let settings = WorkflowSettings { audit_rejections: true,
                                      ..WorkflowSettings::default() };
    let mut h = harness_with(seeded_store(), settings);
    let (_, report) = submit(&mut h, "{'proba_cutoff': 0.995}", Environment::Prod);
    assert_eq!(report, StepReport::Rejected(WorkflowError::SchemaRejected));
    let records = h.blobs.audit_records(BUCKET);
    assert_eq!(records.len(), 1);
    assert!(!records[0].schema_valid);
    assert_eq!(records[0].probe_result, None);
    assert_eq!(records[0].entries["proba_cutoff"], json!(0.995));
}

#[test]
fn repeated_confirm_is_ignored() {
    let mut h = harness();
    let (session, _) = submit(&mut h, "{'proba_cutoff': 0.5}", Environment::Prod);
    let (session, r) = h.wf.handle(session, OperatorAction::Confirm).into_parts();
    assert!(matches!(r, Ok(StepReport::Completed(_))));
    let (session, r) = h.wf.handle(session, OperatorAction::Confirm).into_parts();
    assert!(matches!(r, Ok(StepReport::Ignored(_))));
    let (_, r) = h.wf.handle(session, OperatorAction::Submit).into_parts();
    assert!(matches!(r, Ok(StepReport::Ignored(_))));

    assert_eq!(h.wf.store().version_count(SCHEMA, ConfigTable::StageConfig), 2);
    assert_eq!(h.wf.store().version_count(SCHEMA, ConfigTable::ProdConfig), 2);
    assert_eq!(h.notifier.calls().len(), 2);
    assert_eq!(h.blobs.keys(BUCKET).len(), 1);
}

#[test]
fn latched_session_refuses_edits_and_env_changes() {
    let mut h = harness();
    let (session, _) = submit(&mut h, "{'proba_cutoff': 0.5}", Environment::Stage);
    let (session, r) = h.wf.handle(session, OperatorAction::Edit("{'proba_cutoff': 0.9}".into())).into_parts();
    assert!(matches!(r, Err(WorkflowError::InvalidTransition(_))));
    assert_eq!(session.entries().unwrap()["proba_cutoff"], json!(0.5));

    let (session, r) = h.wf.handle(session, OperatorAction::SelectEnvironment(Environment::Local)).into_parts();
    assert!(matches!(r, Err(WorkflowError::InvalidEnvironment(_))));
    // antes de confirmar todavía se puede cambiar el destino
    let (session, r) = h.wf.handle(session, OperatorAction::SelectEnvironment(Environment::Prod)).into_parts();
    assert_eq!(r.unwrap(), StepReport::EnvironmentSelected(Environment::Prod));

    let (session, _) = h.wf.handle(session, OperatorAction::Confirm).into_parts();
    assert!(session.is_confirmed());
    let (_, r) = h.wf.handle(session, OperatorAction::SelectEnvironment(Environment::Stage)).into_parts();
    assert!(matches!(r, Err(WorkflowError::InvalidTransition(_))));
}

#[test]
fn transport_failure_after_staging_is_still_audited() {
    let notifier = RecordingNotifier::new();
    let blobs = InMemoryBlobStore::new();
    let broken = |_: &Value| -> Result<Value, WorkflowError> { Err(WorkflowError::ExternalCall("connection refused".into())) };
    let mut wf = PromotionWorkflow::builder(seeded_store(), InMemoryEventStore::default()).notifier(notifier.clone())
                                                                                        .prediction_client(broken)
                                                                                        .blob_store(blobs.clone())
                                                                                        .build()
                                                                                        .unwrap();
    let session = wf.open_session().unwrap();
    let (session, _) = wf.handle(session, OperatorAction::SelectEnvironment(Environment::Prod)).into_parts();
    let (session, r) = wf.handle(session, OperatorAction::Submit).into_parts();
    assert!(matches!(r, Ok(StepReport::AwaitingConfirmation { .. })));

    let (session, r) = wf.handle(session, OperatorAction::Confirm).into_parts();
    assert_eq!(r, Err(WorkflowError::ExternalCall("connection refused".into())));
    assert!(session.is_confirmed());
    assert_eq!(session.state(), WorkflowState::Logged);
    assert_eq!(wf.store().version_count(SCHEMA, ConfigTable::ProdConfig), 1);

    let records = blobs.audit_records(BUCKET);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].probe_result, None);
    assert_eq!(records[0].failure.as_deref(), Some("external call failed: connection refused"));
    assert_eq!(wf.event_variants(session.id), vec!["U", "V", "C", "S", "R", "E", "L"]);
}

/// Store que puede fallar en escritura a demanda.
struct FlakyStore {
    inner: InMemoryConfigStore,
    fail_writes: Rc<Cell<bool>>,
}

impl ConfigStore for FlakyStore {
    fn latest(&self, schema: &str, environment: Environment) -> Result<ConfigMap, WorkflowError> {
        self.inner.latest(schema, environment)
    }

    fn append_version(&mut self, entries: &ConfigMap, schema: &str, table: ConfigTable) -> Result<ConfigVersion, WorkflowError> {
        if self.fail_writes.get() {
            return Err(WorkflowError::Store("deadlock detected".into()));
        }
        self.inner.append_version(entries, schema, table)
    }

    fn history(&self, schema: &str, environment: Environment, limit: usize) -> Result<Vec<ConfigVersion>, WorkflowError> {
        self.inner.history(schema, environment, limit)
    }
}

#[test]
fn staging_write_failure_leaves_confirm_retryable() {
    let fail_writes = Rc::new(Cell::new(true));
    let store = FlakyStore { inner: seeded_store(),
                             fail_writes: fail_writes.clone() };
    let mut h = harness_with(store, WorkflowSettings::default());
    let (session, _) = submit(&mut h, "{'proba_cutoff': 0.5}", Environment::Prod);

    let (session, r) = h.wf.handle(session, OperatorAction::Confirm).into_parts();
    assert!(matches!(r, Err(WorkflowError::Store(_))));
    assert!(!session.is_confirmed());
    assert!(h.notifier.calls().is_empty());
    assert_eq!(h.blobs.keys(BUCKET).len(), 1, "failed attempt is audited");

    fail_writes.set(false);
    let (session, r) = h.wf.handle(session, OperatorAction::Confirm).into_parts();
    assert!(matches!(r, Ok(StepReport::Completed(_))));
    assert!(session.is_confirmed());
    assert_eq!(h.blobs.keys(BUCKET).len(), 2);
    assert_eq!(h.wf.current_config(Environment::Prod).unwrap()["proba_cutoff"], json!(0.5));
}

#[test]
fn local_targets_redirect_refresh() {
    let mut h = harness_with(seeded_store(), WorkflowSettings::default().with_local_targets());
    let (session, _) = submit(&mut h, "{'proba_cutoff': 0.5}", Environment::Prod);
    let (_, r) = h.wf.handle(session, OperatorAction::Confirm).into_parts();
    assert!(r.is_ok());
    assert_eq!(h.notifier.calls(), vec![(Environment::Local, 1), (Environment::Local, 1)]);
}

#[test]
fn missing_prod_refresh_target_fails_before_any_write() {
    let notifier = RecordingNotifier::new().without_target(Environment::Prod);
    let blobs = InMemoryBlobStore::new();
    let mut wf = PromotionWorkflow::builder(seeded_store(), InMemoryEventStore::default()).notifier(notifier.clone())
                                                                                        .prediction_client(model_at_half)
                                                                                        .blob_store(blobs.clone())
                                                                                        .build()
                                                                                        .unwrap();
    let session = wf.open_session().unwrap();
    let (session, _) = wf.handle(session, OperatorAction::Edit("{'proba_cutoff': 0.5}".into())).into_parts();
    let (session, _) = wf.handle(session, OperatorAction::SelectEnvironment(Environment::Prod)).into_parts();
    let (session, r) = wf.handle(session, OperatorAction::Submit).into_parts();
    assert!(matches!(r, Ok(StepReport::AwaitingConfirmation { .. })));

    let (session, r) = wf.handle(session, OperatorAction::Confirm).into_parts();
    assert_eq!(r, Err(WorkflowError::InvalidEnvironment("prod".into())));
    assert!(!session.is_confirmed());
    assert_eq!(wf.current_config(Environment::Prod).unwrap()["proba_cutoff"], json!(0.45));
    assert_eq!(wf.store().version_count(SCHEMA, ConfigTable::StageConfig), 1);
    assert!(notifier.calls().is_empty());
    assert!(blobs.keys(BUCKET).is_empty());
    assert_eq!(wf.event_variants(session.id), vec!["U", "V"]);
}

#[test]
fn stage_target_only_needs_the_stage_refresh_endpoint() {
    let notifier = RecordingNotifier::new().without_target(Environment::Prod);
    let mut wf = PromotionWorkflow::builder(seeded_store(), InMemoryEventStore::default()).notifier(notifier.clone())
                                                                                        .prediction_client(model_at_half)
                                                                                        .blob_store(InMemoryBlobStore::new())
                                                                                        .build()
                                                                                        .unwrap();
    let session = wf.open_session().unwrap();
    let (session, _) = wf.handle(session, OperatorAction::Edit("{'proba_cutoff': 0.5}".into())).into_parts();
    let (session, _) = wf.handle(session, OperatorAction::Submit).into_parts();
    let (_, r) = wf.handle(session, OperatorAction::Confirm).into_parts();
    assert!(matches!(r, Ok(StepReport::Completed(o)) if o.disposition == Disposition::StagedOnly));
    assert_eq!(notifier.calls(), vec![(Environment::Stage, 1)]);
}

/// Blob store que rechaza subidas mientras `down` esté activo.
struct FlakyBlobs {
    inner: InMemoryBlobStore,
    down: Rc<Cell<bool>>,
}

impl BlobStore for FlakyBlobs {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), WorkflowError> {
        if self.down.get() {
            return Err(WorkflowError::Audit("bucket unavailable".into()));
        }
        self.inner.put(bucket, key, body)
    }
}

#[test]
fn failed_audit_upload_is_retried_by_the_next_confirm() {
    let down = Rc::new(Cell::new(true));
    let blobs = InMemoryBlobStore::new();
    let notifier = RecordingNotifier::new();
    let mut wf = PromotionWorkflow::builder(seeded_store(), InMemoryEventStore::default()).notifier(notifier.clone())
                                                                                        .prediction_client(model_at_half)
                                                                                        .blob_store(FlakyBlobs { inner: blobs.clone(),
                                                                                                                 down: down.clone() })
                                                                                        .build()
                                                                                        .unwrap();
    let session = wf.open_session().unwrap();
    let (session, _) = wf.handle(session, OperatorAction::Edit("{'proba_cutoff': 0.5}".into())).into_parts();
    let (session, _) = wf.handle(session, OperatorAction::SelectEnvironment(Environment::Prod)).into_parts();
    let (session, _) = wf.handle(session, OperatorAction::Submit).into_parts();

    let (session, r) = wf.handle(session, OperatorAction::Confirm).into_parts();
    assert_eq!(r, Err(WorkflowError::Audit("bucket unavailable".into())));
    assert!(session.is_confirmed());
    assert!(session.is_audit_pending());
    assert!(blobs.keys(BUCKET).is_empty());
    assert_eq!(wf.store().version_count(SCHEMA, ConfigTable::ProdConfig), 2);

    down.set(false);
    let (session, r) = wf.handle(session, OperatorAction::Confirm).into_parts();
    let StepReport::Completed(outcome) = r.unwrap() else { panic!("expected completion") };
    assert_eq!(outcome.disposition, Disposition::Promoted);
    assert!(!session.is_audit_pending());
    assert_eq!(session.state(), WorkflowState::Logged);
    // el reintento sólo sube el registro: ni escrituras ni refresh nuevos
    assert_eq!(wf.store().version_count(SCHEMA, ConfigTable::ProdConfig), 2);
    assert_eq!(notifier.calls().len(), 2);
    let records = blobs.audit_records(BUCKET);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].uid, outcome.audit_id);

    let (_, r) = wf.handle(session, OperatorAction::Confirm).into_parts();
    assert!(matches!(r, Ok(StepReport::Ignored(_))));
    assert_eq!(blobs.keys(BUCKET).len(), 1);
}
