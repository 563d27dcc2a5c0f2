//! conf-core: workflow de promoción de configuración (validate → stage →
//! verify → promote → audit) y contratos de sus colaboradores.
pub mod audit;
pub mod constants;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod notify;
pub mod probe;
pub mod store;
pub mod workflow;

pub use audit::{AuditLogger, BlobStore, InMemoryBlobStore};
pub use errors::WorkflowError;
pub use event::{EventStore, InMemoryEventStore, PromotionEvent, PromotionEventKind};
pub use notify::{RecordingNotifier, RefreshNotifier};
pub use probe::{PredictionClient, PredictionProbe, ProbeCase};
pub use store::{ConfigStore, InMemoryConfigStore};
pub use workflow::{Disposition, OperatorAction, PromotionOutcome, PromotionWorkflow, StepReport, Transition, Verdict,
                   WorkflowBuilder, WorkflowSession, WorkflowSettings, WorkflowState};
