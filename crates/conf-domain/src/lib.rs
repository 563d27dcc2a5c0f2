// conf-domain library entry point
pub mod audit;
pub mod config_map;
pub mod environment;
pub mod error;
pub mod probe;
pub mod validation;
pub mod version;

pub use audit::AuditRecord;
pub use config_map::{coerce_f64, coerce_fields_to_float, parse_entry, render_entry, ConfigMap};
pub use environment::{ConfigTable, Environment};
pub use error::DomainError;
pub use probe::ProbeResult;
pub use validation::{churn_schema, validate, ConfigSchema, ConfigValidator, FieldRule, PROBA_CUTOFF_KEY};
pub use version::ConfigVersion;
