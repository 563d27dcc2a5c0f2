//! Validación declarativa de un `ConfigMap`.
//!
//! Un `ConfigSchema` es una lista de reglas por clave. Cada regla coerciona el
//! valor a float y aplica un predicado de rango cerrado. Las claves
//! desconocidas se permiten sin validar; las claves del schema son
//! obligatorias. La validación nunca falla con error: devuelve `false`.

use crate::config_map::{coerce_f64, ConfigMap};

/// Clave de la probabilidad de corte del modelo de churn.
pub const PROBA_CUTOFF_KEY: &str = "proba_cutoff";

/// Regla aplicada a una clave del schema.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    /// Debe coercionar a float dentro de `[min, max]` (ambos inclusive).
    FloatInRange { min: f64, max: f64 },
}

impl FieldRule {
    pub fn float_in(min: f64, max: f64) -> Self {
        FieldRule::FloatInRange { min, max }
    }

    fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            FieldRule::FloatInRange { min, max } => {
                coerce_f64(value).map(|n| *min <= n && n <= *max).unwrap_or(false)
            }
        }
    }
}

/// Motor de schema que valida listas de registros.
pub trait ConfigValidator {
    fn is_valid(&self, records: &[ConfigMap]) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct ConfigSchema {
    fields: Vec<(String, FieldRule)>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, key: &str, rule: FieldRule) -> Self {
        self.fields.push((key.to_string(), rule));
        self
    }

    fn record_is_valid(&self, record: &ConfigMap) -> bool {
        self.fields
            .iter()
            .all(|(key, rule)| record.get(key).map(|v| rule.accepts(v)).unwrap_or(false))
    }
}

impl ConfigValidator for ConfigSchema {
    fn is_valid(&self, records: &[ConfigMap]) -> bool {
        records.iter().all(|r| self.record_is_valid(r))
    }
}

/// Schema productivo: `proba_cutoff` float en [0.09, 0.99].
pub fn churn_schema() -> ConfigSchema {
    ConfigSchema::new().field(PROBA_CUTOFF_KEY, FieldRule::float_in(0.09, 0.99))
}

/// Valida un único registro envolviéndolo en una lista de un elemento.
pub fn validate(entries: &ConfigMap, schema: &dyn ConfigValidator) -> bool {
    schema.is_valid(std::slice::from_ref(entries))
}
