use conf_core::{PredictionClient, WorkflowError};
use conf_domain::Environment;
use serde_json::Value;

use crate::config::EndpointConfig;
use crate::error::AdapterError;

/// Cliente de `POST {base}/predict` contra un entorno fijo.
pub struct HttpPredictionClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpPredictionClient {
    /// `environment` es el destino del probe: `local` o `stage`.
    pub fn new(endpoints: &EndpointConfig, environment: Environment) -> Result<Self, AdapterError> {
        Ok(Self { client: endpoints.http_client()?,
                  url: format!("{}/predict", endpoints.base_url(environment)?) })
    }

    fn post(&self, payload: &Value) -> Result<Value, AdapterError> {
        let response = self.client.post(&self.url).json(payload).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status { status: status.as_u16(),
                                              url: self.url.clone() });
        }
        Ok(response.json::<Value>()?)
    }
}

impl PredictionClient for HttpPredictionClient {
    fn predict(&self, payload: &Value) -> Result<Value, WorkflowError> {
        log::debug!("predict:start url={}", self.url);
        Ok(self.post(payload)?)
    }
}
