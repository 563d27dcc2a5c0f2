//! Builder para `PromotionWorkflow`.
//!
//! Los stores se fijan al crear el builder; los colaboradores externos
//! (notifier, cliente de predicción, blob store) se inyectan después. El
//! validador por defecto es el schema productivo de churn.

use conf_domain::{churn_schema, ConfigValidator};

use super::{PromotionWorkflow, WorkflowSettings};
use crate::audit::{AuditLogger, BlobStore};
use crate::errors::WorkflowError;
use crate::event::EventStore;
use crate::notify::RefreshNotifier;
use crate::probe::{PredictionClient, PredictionProbe};
use crate::store::ConfigStore;

pub struct WorkflowBuilder<S: ConfigStore, E: EventStore> {
    store: S,
    event_store: E,
    validator: Option<Box<dyn ConfigValidator>>,
    notifier: Option<Box<dyn RefreshNotifier>>,
    probe: Option<PredictionProbe>,
    client: Option<Box<dyn PredictionClient>>,
    blob_store: Option<Box<dyn BlobStore>>,
    settings: WorkflowSettings,
}

impl<S: ConfigStore, E: EventStore> WorkflowBuilder<S, E> {
    pub fn new(store: S, event_store: E) -> Self {
        Self { store,
               event_store,
               validator: None,
               notifier: None,
               probe: None,
               client: None,
               blob_store: None,
               settings: WorkflowSettings::default() }
    }

    pub fn validator(mut self, validator: impl ConfigValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn notifier(mut self, notifier: impl RefreshNotifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Cliente de `/predict`; se combina con los payloads empaquetados.
    pub fn prediction_client(mut self, client: impl PredictionClient + 'static) -> Self {
        self.client = Some(Box::new(client));
        self
    }

    /// Probe ya armado (casos propios). Tiene prioridad sobre
    /// `prediction_client`.
    pub fn probe(mut self, probe: PredictionProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn blob_store(mut self, blob_store: impl BlobStore + 'static) -> Self {
        self.blob_store = Some(Box::new(blob_store));
        self
    }

    pub fn settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Construye el workflow. Falla con `Internal` si falta algún
    /// colaborador externo.
    pub fn build(self) -> Result<PromotionWorkflow<S, E>, WorkflowError> {
        let missing = |what: &str| WorkflowError::Internal(format!("workflow builder: missing {what}"));
        let notifier = self.notifier.ok_or_else(|| missing("refresh notifier"))?;
        let blob_store = self.blob_store.ok_or_else(|| missing("blob store"))?;
        let probe = match (self.probe, self.client) {
            (Some(p), _) => p,
            (None, Some(client)) => PredictionProbe::new(client)?,
            (None, None) => return Err(missing("prediction client")),
        };
        let validator = self.validator.unwrap_or_else(|| Box::new(churn_schema()));
        let audit = AuditLogger::new(blob_store, &self.settings.audit_bucket);

        Ok(PromotionWorkflow { store: self.store,
                               event_store: self.event_store,
                               validator,
                               notifier,
                               probe,
                               audit,
                               settings: self.settings })
    }
}
