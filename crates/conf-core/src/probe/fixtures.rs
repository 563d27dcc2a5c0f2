//! Payloads fijos con los que se sondea el endpoint de predicción.

use serde_json::{Map, Value};

use crate::errors::WorkflowError;

const PAYLOAD_1: &str = include_str!("../../payloads/payload_1.json");
const PAYLOAD_2: &str = include_str!("../../payloads/payload_2.json");

/// Caso de probe: sólo el payload; las expectativas se derivan al chequear
/// contra la configuración propuesta.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeCase {
    pub name: String,
    pub payload: Map<String, Value>,
}

impl ProbeCase {
    pub fn new(name: &str, payload: Map<String, Value>) -> Self {
        Self { name: name.to_string(), payload }
    }

    /// Los dos casos empaquetados con el crate.
    pub fn fixtures() -> Result<Vec<ProbeCase>, WorkflowError> {
        [("payload_1", PAYLOAD_1), ("payload_2", PAYLOAD_2)].into_iter()
                                                            .map(|(name, raw)| parse_case(name, raw))
                                                            .collect()
    }
}

fn parse_case(name: &str, raw: &str) -> Result<ProbeCase, WorkflowError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(payload)) => Ok(ProbeCase::new(name, payload)),
        Ok(_) => Err(WorkflowError::Internal(format!("fixture {name} is not a JSON object"))),
        Err(e) => Err(WorkflowError::Internal(format!("fixture {name}: {e}"))),
    }
}
