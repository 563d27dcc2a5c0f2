use conf_core::{RefreshNotifier, WorkflowError};
use conf_domain::Environment;
use log::{debug, info, warn};

use crate::config::EndpointConfig;
use crate::error::AdapterError;

/// `RefreshNotifier` sobre `GET {base}/config-refresh`.
///
/// Cada golpe puede caer en una instancia distinta detrás del balanceador,
/// por eso se repite `repeat` veces. Los fallos individuales sólo se loguean.
pub struct HttpRefreshNotifier {
    client: reqwest::blocking::Client,
    endpoints: EndpointConfig,
}

impl HttpRefreshNotifier {
    pub fn new(endpoints: EndpointConfig) -> Result<Self, AdapterError> {
        Ok(Self { client: endpoints.http_client()?,
                  endpoints })
    }

    fn hit(&self, url: &str) -> Result<(), AdapterError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AdapterError::Status { status: status.as_u16(),
                                       url: url.to_string() })
        }
    }
}

impl RefreshNotifier for HttpRefreshNotifier {
    fn notify(&self, environment: Environment, repeat: u32) -> Result<(), WorkflowError> {
        let url = format!("{}/config-refresh", self.endpoints.base_url(environment)?);
        let mut failures = 0u32;
        for attempt in 1..=repeat {
            match self.hit(&url) {
                Ok(()) => debug!("refresh:ok env={environment} attempt={attempt}/{repeat}"),
                Err(e) => {
                    failures += 1;
                    warn!("refresh:failed env={environment} attempt={attempt}/{repeat} err={e}");
                }
            }
        }
        info!("refresh:done env={environment} hits={repeat} failures={failures}");
        Ok(())
    }

    fn check_target(&self, environment: Environment) -> Result<(), WorkflowError> {
        self.endpoints.base_url(environment)?;
        Ok(())
    }
}
