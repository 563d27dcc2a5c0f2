use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ConfigMap, ConfigTable, Environment};

/// Snapshot inmutable y completo de la configuración de un entorno.
///
/// Todas las filas de una versión comparten `version_id` e `inserted_at`.
/// La versión vigente de `(schema, table)` es la de mayor `inserted_at`;
/// `version_id` desempata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigVersion {
    pub version_id: Uuid,
    pub schema: String,
    pub table: ConfigTable,
    pub entries: ConfigMap,
    pub inserted_at: DateTime<Utc>,
}

impl ConfigVersion {
    pub fn new(schema: &str, table: ConfigTable, entries: ConfigMap, inserted_at: DateTime<Utc>) -> Self {
        Self { version_id: Uuid::new_v4(),
               schema: schema.to_string(),
               table,
               entries,
               inserted_at }
    }

    pub fn environment(&self) -> Environment {
        self.table.environment()
    }
}
