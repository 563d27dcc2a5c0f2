//! `ConfigMap`: snapshot clave → escalar de la configuración.
//!
//! El operador escribe la configuración como un objeto "estilo dict" con
//! comillas simples (`{'proba_cutoff': 0.5}`). `parse_entry` normaliza las
//! comillas y parsea JSON; `render_entry` hace el camino inverso para mostrar
//! la configuración vigente como borrador por defecto.
//!
//! Limitación conocida: un valor string que contenga una comilla simple no
//! sobrevive la normalización.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use crate::DomainError;

/// Mapa clave → escalar (string, número o booleano). El orden no tiene
/// semántica; `BTreeMap` sólo hace determinista el render.
pub type ConfigMap = BTreeMap<String, Value>;

/// Convierte la entrada libre del operador en un `ConfigMap`.
pub fn parse_entry(text: &str) -> Result<ConfigMap, DomainError> {
    let normalized = text.replace('\'', "\"");
    let value: Value = serde_json::from_str(&normalized).map_err(|e| DomainError::MalformedEntry(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(DomainError::MalformedEntry("entry must be a key/value object".into()));
    };
    let mut entries = ConfigMap::new();
    for (key, v) in object {
        match v {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                entries.insert(key, v);
            }
            other => {
                return Err(DomainError::MalformedEntry(format!("value for '{key}' is not a scalar: {other}")));
            }
        }
    }
    Ok(entries)
}

/// String JSON escapado (barras, saltos de línea, controles) con comillas
/// simples por fuera.
fn quote(s: &str) -> String {
    let json = Value::String(s.to_string()).to_string();
    format!("'{}'", &json[1..json.len() - 1])
}

/// Render en el mismo formato que acepta `parse_entry`.
pub fn render_entry(entries: &ConfigMap) -> String {
    let items: Vec<String> = entries.iter()
                                    .map(|(k, v)| {
                                        let rendered = match v {
                                            Value::String(s) => quote(s),
                                            other => other.to_string(),
                                        };
                                        format!("{}: {rendered}", quote(k))
                                    })
                                    .collect();
    format!("{{{}}}", items.join(", "))
}

/// Coerción best-effort de un escalar a `f64`: números, strings numéricos y
/// booleanos convierten; cualquier otra cosa devuelve `None`. Nunca falla.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Intenta convertir cada campo a float; los que no convierten (o cuyo valor
/// no es representable en JSON, p.ej. NaN) quedan intactos.
pub fn coerce_fields_to_float(fields: Map<String, Value>) -> Map<String, Value> {
    fields.into_iter()
          .map(|(k, v)| {
              let coerced = coerce_f64(&v).and_then(Number::from_f64).map(Value::Number);
              (k, coerced.unwrap_or(v))
          })
          .collect()
}
