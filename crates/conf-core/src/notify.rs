//! Notificación de refresh de configuración a instancias en ejecución.

use conf_domain::Environment;
use std::sync::{Arc, Mutex};

use crate::errors::WorkflowError;

/// Pide a las instancias de un entorno que recarguen su configuración.
///
/// Contrato: se hacen exactamente `repeat` intentos secuenciales aunque
/// alguno falle, y no se informa cuáles tuvieron éxito. Sólo un entorno sin
/// destino configurado devuelve error (`InvalidEnvironment`).
pub trait RefreshNotifier {
    fn notify(&self, environment: Environment, repeat: u32) -> Result<(), WorkflowError>;

    /// Comprueba sin efectos que `environment` tiene destino. El workflow la
    /// llama antes de escribir nada.
    fn check_target(&self, _environment: Environment) -> Result<(), WorkflowError> {
        Ok(())
    }
}

/// Notifier en memoria que sólo registra las llamadas recibidas.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<(Environment, u32)>>>,
    unreachable: Vec<Environment>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simula un entorno sin destino configurado.
    pub fn without_target(mut self, environment: Environment) -> Self {
        self.unreachable.push(environment);
        self
    }

    pub fn calls(&self) -> Vec<(Environment, u32)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl RefreshNotifier for RecordingNotifier {
    fn notify(&self, environment: Environment, repeat: u32) -> Result<(), WorkflowError> {
        self.check_target(environment)?;
        let mut calls = self.calls
                            .lock()
                            .map_err(|_| WorkflowError::Internal("recording notifier poisoned".into()))?;
        calls.push((environment, repeat));
        Ok(())
    }

    fn check_target(&self, environment: Environment) -> Result<(), WorkflowError> {
        if self.unreachable.contains(&environment) {
            return Err(WorkflowError::InvalidEnvironment(environment.to_string()));
        }
        Ok(())
    }
}
