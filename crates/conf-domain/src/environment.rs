//! Entornos del servicio y tablas de configuración asociadas.
//!
//! `Local` es un destino legítimo (no productivo) para refresh y probe, pero
//! no tiene tabla de configuración: sólo `Stage` y `Prod` se persisten y sólo
//! ellos pueden elegirse como destino de una promoción.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Stage,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Stage => "stage",
            Environment::Prod => "prod",
        }
    }

    /// Verdadero para los entornos que el operador puede seleccionar.
    pub fn is_selectable(&self) -> bool {
        matches!(self, Environment::Stage | Environment::Prod)
    }

    /// Falla con `InvalidEnvironment` si el entorno no es `stage` ni `prod`.
    pub fn ensure_selectable(self) -> Result<Self, DomainError> {
        if self.is_selectable() {
            Ok(self)
        } else {
            Err(DomainError::InvalidEnvironment(format!("environment must either be stage or prod, got {}", self)))
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Environment::Local),
            "stage" => Ok(Environment::Stage),
            "prod" => Ok(Environment::Prod),
            other => Err(DomainError::InvalidEnvironment(other.to_string())),
        }
    }
}

/// Tabla append-only donde vive la configuración de un entorno.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigTable {
    StageConfig,
    ProdConfig,
}

impl ConfigTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigTable::StageConfig => "stage_config",
            ConfigTable::ProdConfig => "prod_config",
        }
    }

    pub fn for_environment(environment: Environment) -> Result<Self, DomainError> {
        match environment {
            Environment::Stage => Ok(ConfigTable::StageConfig),
            Environment::Prod => Ok(ConfigTable::ProdConfig),
            Environment::Local => Err(DomainError::InvalidEnvironment("environment must either be stage or prod".into())),
        }
    }

    pub fn environment(&self) -> Environment {
        match self {
            ConfigTable::StageConfig => Environment::Stage,
            ConfigTable::ProdConfig => Environment::Prod,
        }
    }
}

impl fmt::Display for ConfigTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_environments() {
        assert_eq!("stage".parse::<Environment>().unwrap(), Environment::Stage);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!("local".parse::<Environment>().unwrap(), Environment::Local);
    }

    #[test]
    fn rejects_unknown_environment() {
        let err = "production".parse::<Environment>().unwrap_err();
        assert_eq!(err, DomainError::InvalidEnvironment("production".into()));
    }

    #[test]
    fn local_has_no_config_table() {
        assert!(ConfigTable::for_environment(Environment::Local).is_err());
        assert_eq!(ConfigTable::for_environment(Environment::Prod).unwrap().as_str(), "prod_config");
        assert!(Environment::Local.ensure_selectable().is_err());
    }
}
