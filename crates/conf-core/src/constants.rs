//! Constantes del workflow de promoción.

/// Schema SQL donde viven las tablas `stage_config` / `prod_config`.
pub const DEFAULT_SCHEMA_NAME: &str = "churn_model";

/// Bucket donde se archivan los registros de auditoría.
pub const DEFAULT_AUDIT_BUCKET: &str = "churn-model-data-science-logs";

/// Veces que se golpea el endpoint de refresh por defecto. Más de una cubre
/// varias instancias detrás de un balanceador.
pub const DEFAULT_REFRESH_TIMES: u32 = 1;
