//! Verificación de una configuración propuesta contra el servicio de
//! predicción en vivo.
//!
//! El probe envía los payloads fijos (coercionados a float campo a campo),
//! corre dos aserciones por respuesta y agrega las cuatro en un
//! `ProbeResult` sin cortocircuito.

mod assertions;
mod fixtures;

pub use assertions::{check_high_risk_category, check_high_risk_cutoff};
pub use fixtures::ProbeCase;

use conf_domain::{coerce_fields_to_float, ConfigMap, ProbeResult};
use serde_json::Value;

use crate::errors::WorkflowError;

/// Cliente del endpoint `/predict`. La implementación decide el destino
/// (servidor local o staging).
pub trait PredictionClient {
    fn predict(&self, payload: &Value) -> Result<Value, WorkflowError>;
}

impl<F> PredictionClient for F where F: Fn(&Value) -> Result<Value, WorkflowError>
{
    fn predict(&self, payload: &Value) -> Result<Value, WorkflowError> {
        self(payload)
    }
}

pub struct PredictionProbe {
    client: Box<dyn PredictionClient>,
    cases: Vec<ProbeCase>,
}

impl PredictionProbe {
    /// Probe con los dos payloads empaquetados.
    pub fn new(client: Box<dyn PredictionClient>) -> Result<Self, WorkflowError> {
        Ok(Self::with_cases(client, ProbeCase::fixtures()?))
    }

    pub fn with_cases(client: Box<dyn PredictionClient>, cases: Vec<ProbeCase>) -> Self {
        Self { client, cases }
    }

    /// Corre categoría + cutoff sobre la respuesta de cada caso.
    ///
    /// Un fallo de transporte es fatal (`ExternalCall`); un fallo de
    /// aserción no lo es y queda reflejado en el resultado.
    pub fn check(&self, proposed: &ConfigMap) -> Result<ProbeResult, WorkflowError> {
        let mut results: Vec<(bool, String)> = Vec::with_capacity(self.cases.len() * 2);
        for case in &self.cases {
            let payload = Value::Object(coerce_fields_to_float(case.payload.clone()));
            let response = self.client.predict(&payload)?;
            log::debug!("probe:{} response={response}", case.name);
            results.push(check_high_risk_category(&response));
            results.push(check_high_risk_cutoff(&response, proposed));
        }
        let outcome = ProbeResult::from_assertions(&results);
        log::info!("probe:done all_passed={} assertions={}", outcome.all_passed, results.len());
        Ok(outcome)
    }
}
