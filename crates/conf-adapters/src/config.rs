//! Mapa explícito entorno → URL base de las instancias del modelo.
//!
//! Variables: `LOCAL_URL` (por defecto `http://127.0.0.1:5000`), `STAGE_URL`,
//! `PROD_URL` y `CONF_HTTP_TIMEOUT_SECS` (30).

use conf_domain::Environment;
use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

use crate::error::AdapterError;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv();
});

pub const DEFAULT_LOCAL_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub local: Option<String>,
    pub stage: Option<String>,
    pub prod: Option<String>,
    pub timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self { local: Some(DEFAULT_LOCAL_URL.to_string()),
               stage: None,
               prod: None,
               timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS) }
    }
}

impl EndpointConfig {
    pub fn from_env() -> Result<Self, AdapterError> {
        Lazy::force(&DOTENV_LOADED);
        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        let timeout = match non_empty("CONF_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim()
                            .parse::<u64>()
                            .map_err(|_| AdapterError::Config(format!("CONF_HTTP_TIMEOUT_SECS='{raw}' is not an integer")))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self { local: Some(non_empty("LOCAL_URL").unwrap_or_else(|| DEFAULT_LOCAL_URL.to_string())),
                  stage: non_empty("STAGE_URL"),
                  prod: non_empty("PROD_URL"),
                  timeout: Duration::from_secs(timeout) })
    }

    pub fn with_url(mut self, environment: Environment, url: &str) -> Self {
        let slot = match environment {
            Environment::Local => &mut self.local,
            Environment::Stage => &mut self.stage,
            Environment::Prod => &mut self.prod,
        };
        *slot = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// URL base sin `/` final; `MissingEndpoint` si el entorno no tiene destino.
    pub fn base_url(&self, environment: Environment) -> Result<&str, AdapterError> {
        let url = match environment {
            Environment::Local => self.local.as_deref(),
            Environment::Stage => self.stage.as_deref(),
            Environment::Prod => self.prod.as_deref(),
        };
        url.map(|u| u.trim_end_matches('/'))
           .ok_or_else(|| AdapterError::MissingEndpoint(environment.to_string()))
    }

    /// Cliente blocking con el timeout configurado.
    pub fn http_client(&self) -> Result<reqwest::blocking::Client, AdapterError> {
        Ok(reqwest::blocking::Client::builder().timeout(self.timeout).build()?)
    }
}
