//! Aserciones sobre una respuesta del endpoint de predicción.
//!
//! Cada aserción devuelve `(passed, message)` y nunca corta la ejecución de
//! las demás.

use conf_domain::{coerce_f64, ConfigMap, PROBA_CUTOFF_KEY};
use serde_json::Value;

/// Centinela usado cuando la configuración no trae `proba_cutoff`.
const MISSING_CUTOFF: f64 = -1.0;

/// `high_risk` debe ser exactamente `"yes"` o `"no"`.
pub fn check_high_risk_category(response: &Value) -> (bool, String) {
    let high_risk = response.get("high_risk").and_then(Value::as_str).unwrap_or("none");
    if matches!(high_risk, "yes" | "no") {
        (true, "high_risk is acceptable".to_string())
    } else {
        (false, "high_risk is not either yes or no".to_string())
    }
}

/// La marca `high_risk` debe ser coherente con `prediction` frente al
/// `proba_cutoff` propuesto.
pub fn check_high_risk_cutoff(response: &Value, proposed: &ConfigMap) -> (bool, String) {
    let cutoff = proposed.get(PROBA_CUTOFF_KEY).and_then(coerce_f64).unwrap_or(MISSING_CUTOFF);
    if cutoff == MISSING_CUTOFF {
        return (false, "proba_cutoff is not in the config".to_string());
    }
    let Some(prediction) = response.get("prediction").and_then(coerce_f64) else {
        return (false, "prediction is missing or not numeric".to_string());
    };
    let flagged = response.get("high_risk").and_then(Value::as_str);
    if prediction >= cutoff {
        if flagged == Some("yes") {
            (true, "payload should be high risk and is flagged correctly".to_string())
        } else {
            (false, "payload should be flagged as high_risk but is not".to_string())
        }
    } else if prediction < cutoff {
        if flagged == Some("no") {
            (true, "payload should not be high risk and is flagged correctly".to_string())
        } else {
            (false, "payload should not be flagged as high_risk but is".to_string())
        }
    } else {
        // NaN
        (false, "prediction is not comparable with proba_cutoff".to_string())
    }
}
