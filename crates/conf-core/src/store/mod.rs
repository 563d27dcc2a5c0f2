//! Contrato del store de configuración y backend en memoria.
//!
//! El store es append-only: nunca se actualizan ni borran filas. "Actualizar"
//! un entorno es agregar una `ConfigVersion` completa; la vigente es la de
//! mayor `inserted_at`. Las implementaciones deben escribir todas las claves
//! de una versión de forma atómica (un lector ve la versión nueva completa o
//! la anterior, nunca una mezcla).

use chrono::Utc;
use conf_domain::{ConfigMap, ConfigTable, ConfigVersion, Environment};
use std::collections::HashMap;

use crate::errors::WorkflowError;

pub trait ConfigStore {
    /// Configuración vigente de `(schema, environment)`. `environment` debe
    /// ser `stage` o `prod`; una tabla vacía devuelve un mapa vacío.
    fn latest(&self, schema: &str, environment: Environment) -> Result<ConfigMap, WorkflowError>;

    /// Agrega una versión nueva con el mapa completo deseado. Un mapa vacío
    /// devuelve `EmptyVersion` sin escribir nada.
    fn append_version(&mut self, entries: &ConfigMap, schema: &str, table: ConfigTable) -> Result<ConfigVersion, WorkflowError>;

    /// Últimas `limit` versiones, de la más nueva a la más vieja.
    fn history(&self, schema: &str, environment: Environment, limit: usize) -> Result<Vec<ConfigVersion>, WorkflowError>;
}

/// Backend en memoria con la misma semántica que el de Postgres.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConfigStore {
    versions: HashMap<(String, ConfigTable), Vec<ConfigVersion>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Siembra una versión inicial (útil en tests y demos).
    pub fn with_version(mut self, schema: &str, table: ConfigTable, entries: ConfigMap) -> Self {
        let version = ConfigVersion::new(schema, table, entries, Utc::now());
        self.versions.entry((schema.to_string(), table)).or_default().push(version);
        self
    }

    /// Total de versiones escritas en una tabla.
    pub fn version_count(&self, schema: &str, table: ConfigTable) -> usize {
        self.versions.get(&(schema.to_string(), table)).map(Vec::len).unwrap_or(0)
    }

    fn versions_for(&self, schema: &str, environment: Environment) -> Result<&[ConfigVersion], WorkflowError> {
        let table = ConfigTable::for_environment(environment)?;
        Ok(self.versions
               .get(&(schema.to_string(), table))
               .map(Vec::as_slice)
               .unwrap_or(&[]))
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn latest(&self, schema: &str, environment: Environment) -> Result<ConfigMap, WorkflowError> {
        let versions = self.versions_for(schema, environment)?;
        // max_by_key devuelve el último en empate: la escritura más reciente gana.
        Ok(versions.iter()
                   .max_by_key(|v| v.inserted_at)
                   .map(|v| v.entries.clone())
                   .unwrap_or_default())
    }

    fn append_version(&mut self, entries: &ConfigMap, schema: &str, table: ConfigTable) -> Result<ConfigVersion, WorkflowError> {
        if entries.is_empty() {
            return Err(WorkflowError::EmptyVersion);
        }
        let version = ConfigVersion::new(schema, table, entries.clone(), Utc::now());
        self.versions
            .entry((schema.to_string(), table))
            .or_default()
            .push(version.clone());
        log::debug!("append_version:done schema={schema} table={table} keys={}", entries.len());
        Ok(version)
    }

    fn history(&self, schema: &str, environment: Environment, limit: usize) -> Result<Vec<ConfigVersion>, WorkflowError> {
        let versions = self.versions_for(schema, environment)?;
        Ok(versions.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, serde_json::Value)]) -> ConfigMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn append_then_latest_roundtrips_full_map() {
        let mut store = InMemoryConfigStore::new();
        let m = map(&[("proba_cutoff", json!(0.42)), ("model", json!("xgb")), ("enabled", json!(true))]);
        store.append_version(&m, "churn_model", ConfigTable::StageConfig).unwrap();
        assert_eq!(store.latest("churn_model", Environment::Stage).unwrap(), m);
        assert!(store.latest("churn_model", Environment::Prod).unwrap().is_empty());
    }

    #[test]
    fn newer_version_replaces_whole_map() {
        let mut store = InMemoryConfigStore::new().with_version("s", ConfigTable::ProdConfig, map(&[("a", json!(1)), ("b", json!(2))]));
        store.append_version(&map(&[("a", json!(3))]), "s", ConfigTable::ProdConfig).unwrap();
        assert_eq!(store.latest("s", Environment::Prod).unwrap(), map(&[("a", json!(3))]));
        let history = store.history("s", Environment::Prod, 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].entries, map(&[("a", json!(3))]));
    }

    #[test]
    fn empty_map_is_not_a_version() {
        let mut store = InMemoryConfigStore::new().with_version("s", ConfigTable::StageConfig, map(&[("a", json!(1))]));
        assert_eq!(store.append_version(&ConfigMap::new(), "s", ConfigTable::StageConfig),
                   Err(WorkflowError::EmptyVersion));
        assert_eq!(store.version_count("s", ConfigTable::StageConfig), 1);
        assert_eq!(store.latest("s", Environment::Stage).unwrap(), map(&[("a", json!(1))]));
    }

    #[test]
    fn local_environment_is_rejected() {
        let store = InMemoryConfigStore::new();
        assert!(matches!(store.latest("s", Environment::Local), Err(WorkflowError::InvalidEnvironment(_))));
    }
}
