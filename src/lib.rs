//! churnconf: consola de promoción de configuración del modelo de churn.
//!
//! Este crate agrupa los crates del workspace:
//! - `domain`: `ConfigMap`, entornos, schema de validación y registros.
//! - `workflow`: el workflow validate → stage → verify → promote → audit.
//! - `persistence`: `ConfigStore` sobre Postgres.
//! - `adapters`: refresh, predicción y blob stores sobre HTTP/filesystem.

pub use conf_adapters as adapters;
pub use conf_core as workflow;
pub use conf_domain as domain;
pub use conf_persistence as persistence;

pub mod prelude {
    pub use conf_core::{AuditLogger, BlobStore, ConfigStore, Disposition, EventStore, InMemoryBlobStore,
                        InMemoryConfigStore, InMemoryEventStore, OperatorAction, PredictionClient, PromotionWorkflow,
                        RecordingNotifier, RefreshNotifier, StepReport, WorkflowError, WorkflowSession,
                        WorkflowSettings, WorkflowState};
    pub use conf_domain::{churn_schema, parse_entry, render_entry, validate, AuditRecord, ConfigMap, ConfigTable,
                          Environment, ProbeResult};
}
