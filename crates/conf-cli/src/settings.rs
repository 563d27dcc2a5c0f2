//! Settings del workflow y del archivo de auditoría leídos del entorno.

use anyhow::{bail, Context, Result};
use conf_core::constants::{DEFAULT_AUDIT_BUCKET, DEFAULT_REFRESH_TIMES};
use conf_core::WorkflowSettings;
use std::path::PathBuf;

/// Dónde se archivan los registros de auditoría.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditTarget {
    Dir(PathBuf),
    Endpoint(String),
}

#[derive(Debug, Clone)]
pub struct CliSettings {
    pub workflow: WorkflowSettings,
    pub use_local_targets: bool,
    pub audit_target: AuditTarget,
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key}='{other}' is not a boolean"),
    }
}

impl CliSettings {
    /// `schema_name` llega aparte porque lo resuelve `DbConfig`.
    pub fn from_env(schema_name: &str) -> Result<Self> {
        let use_local_targets = var("CONF_USE_LOCAL_TARGETS").map(|v| parse_bool("CONF_USE_LOCAL_TARGETS", &v))
                                                             .transpose()?
                                                             .unwrap_or(false);
        let audit_rejections = var("CONF_AUDIT_REJECTIONS").map(|v| parse_bool("CONF_AUDIT_REJECTIONS", &v))
                                                           .transpose()?
                                                           .unwrap_or(false);
        let refresh_times = match var("CONF_REFRESH_TIMES") {
            Some(raw) => raw.trim()
                            .parse::<u32>()
                            .with_context(|| format!("CONF_REFRESH_TIMES='{raw}' is not a positive integer"))?,
            None => DEFAULT_REFRESH_TIMES,
        };
        let audit_target = match (var("CONF_AUDIT_ENDPOINT"), var("CONF_AUDIT_DIR")) {
            (Some(endpoint), _) => AuditTarget::Endpoint(endpoint),
            (None, Some(dir)) => AuditTarget::Dir(PathBuf::from(dir)),
            (None, None) => AuditTarget::Dir(PathBuf::from("audit")),
        };

        let mut workflow = WorkflowSettings { schema_name: schema_name.to_string(),
                                              audit_bucket: var("CONF_AUDIT_BUCKET").unwrap_or_else(|| {
                                                                                        DEFAULT_AUDIT_BUCKET.to_string()
                                                                                    }),
                                              refresh_times,
                                              audit_rejections,
                                              ..WorkflowSettings::default() };
        if use_local_targets {
            workflow = workflow.with_local_targets();
        }
        Ok(Self { workflow,
                  use_local_targets,
                  audit_target })
    }
}
