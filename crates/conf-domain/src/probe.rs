use serde::{Deserialize, Serialize};

/// Resultado agregado de las aserciones de un probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub all_passed: bool,
    pub messages: Vec<String>,
}

impl ProbeResult {
    /// Construye el resultado a partir de los pares `(passed, message)` en el
    /// orden de ejecución.
    ///
    /// Si alguna aserción falla se devuelven los mensajes crudos de todas.
    /// Si todas pasan, se filtran a los índices cuyo flag es `false`, lo que
    /// deja la lista vacía.
    pub fn from_assertions(results: &[(bool, String)]) -> Self {
        let failed: Vec<bool> = results.iter().map(|(passed, _)| !passed).collect();
        let all_passed = !failed.iter().any(|f| *f);
        let messages = if all_passed {
            results.iter()
                   .filter(|(passed, _)| !passed)
                   .map(|(_, m)| m.clone())
                   .collect()
        } else {
            results.iter().map(|(_, m)| m.clone()).collect()
        };
        Self { all_passed, messages }
    }
}
