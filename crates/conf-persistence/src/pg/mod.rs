//! Implementación Postgres (Diesel) de `ConfigStore`.
//!
//! Objetivo general del módulo:
//! - Proveer una capa de persistencia durable con paridad 1:1 respecto al
//!   backend en memoria de `conf-core`.
//! - Tablas append-only: nunca se hace UPDATE ni DELETE. Una versión son todas
//!   las filas con el mismo `version_id` y `meta__inserted_at`, escritas en una
//!   sola transacción.
//! - La versión vigente es la de la fila más nueva (`meta__inserted_at DESC,
//!   id DESC`); se leen todas las filas de ese `version_id`.
//!
//! El schema es configurable (`CONF_SCHEMA_NAME`), así que las consultas se
//! arman con `sql_query` sobre identificadores validados en vez de tablas
//! `table!` estáticas.

use chrono::{DateTime, SubsecRound, Utc};
use conf_core::{ConfigStore, WorkflowError};
use conf_domain::{ConfigMap, ConfigTable, ConfigVersion, Environment};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::sql_types::{BigInt, Jsonb, Text, Timestamptz};
use log::{debug, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
///
/// Notas operativas:
/// - El pool se construye con `min_idle` (mínimo de conexiones inactivas) y
///   `max_size` (límite superior total).
/// - Al construirlo, se corre automáticamente el set de migraciones pendientes
///   (una sola vez).
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Contrato:
/// - Debe devolver una conexión válida o `PersistenceError::TransientIo` en
///   caso de error.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Fila de `stage_config` / `prod_config`.
#[derive(QueryableByName, Debug)]
pub struct ConfigRow {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub version_id: Uuid,
    #[diesel(sql_type = Text)]
    pub config_key: String,
    #[diesel(sql_type = Jsonb)]
    pub config_value: Value,
    #[diesel(sql_type = Timestamptz)]
    #[diesel(column_name = meta__inserted_at)]
    pub inserted_at: DateTime<Utc>,
}

/// Determina si un error es transitorio (recomendado reintentar con backoff).
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        // Algunos mensajes llegan como Unknown con texto; best-effort sin SQLSTATE.
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access due to concurrent update")
            || m.contains("terminating connection due to administrator command")
            || m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Retry simple con backoff lineal muy pequeño (hasta 3 reintentos: 15ms,
/// 30ms, 45ms). Repite la unidad de trabajo completa; en escrituras eso es
/// la transacción entera.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Acepta sólo `[A-Za-z_][A-Za-z0-9_]*`; el identificador se interpola en SQL.
pub fn validate_identifier(name: &str) -> Result<&str, PersistenceError> {
    let mut chars = name.chars();
    let head_ok = chars.next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false);
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && name.len() <= 63 {
        Ok(name)
    } else {
        Err(PersistenceError::InvalidIdentifier(name.to_string()))
    }
}

fn qualified(schema: &str, table: ConfigTable) -> Result<String, PersistenceError> {
    Ok(format!("{}.{}", validate_identifier(schema)?, table.as_str()))
}

/// Agrupa filas (ya ordenadas por versión) en `ConfigVersion`s conservando el
/// orden de aparición.
fn group_versions(rows: Vec<ConfigRow>, schema: &str, table: ConfigTable) -> Vec<ConfigVersion> {
    let mut out: Vec<ConfigVersion> = Vec::new();
    for row in rows {
        match out.last_mut() {
            Some(v) if v.version_id == row.version_id => {
                v.entries.insert(row.config_key, row.config_value);
            }
            _ => out.push(ConfigVersion { version_id: row.version_id,
                                          schema: schema.to_string(),
                                          table,
                                          entries: ConfigMap::from([(row.config_key, row.config_value)]),
                                          inserted_at: row.inserted_at }),
        }
    }
    out
}

/// Implementación Postgres de `ConfigStore` (append-only).
pub struct PgConfigStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgConfigStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Crea schema y tablas si faltan. Las migraciones ya cubren
    /// `churn_model`; esto sirve para schemas alternativos.
    pub fn ensure_schema(&self, schema: &str) -> Result<(), PersistenceError> {
        let schema = validate_identifier(schema)?;
        let mut sql = format!("CREATE SCHEMA IF NOT EXISTS {schema};");
        for table in [ConfigTable::StageConfig, ConfigTable::ProdConfig] {
            sql.push_str(&format!("CREATE TABLE IF NOT EXISTS {schema}.{t} (
                                       id BIGSERIAL PRIMARY KEY,
                                       version_id UUID NOT NULL,
                                       config_key TEXT NOT NULL,
                                       config_value JSONB NOT NULL,
                                       meta__inserted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                                       UNIQUE (version_id, config_key));",
                                  t = table.as_str()));
        }
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.batch_execute(&sql).map_err(PersistenceError::from)
        })
    }

    fn latest_version(&self, schema: &str, table: ConfigTable) -> Result<Option<ConfigVersion>, PersistenceError> {
        let target = qualified(schema, table)?;
        let sql = format!("SELECT id, version_id, config_key, config_value, meta__inserted_at FROM {target} \
                           WHERE version_id = (SELECT version_id FROM {target} \
                                               ORDER BY meta__inserted_at DESC, id DESC LIMIT 1) \
                           ORDER BY id ASC");
        let rows: Vec<ConfigRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::sql_query(&sql).load(&mut conn).map_err(PersistenceError::from)
        })?;
        Ok(group_versions(rows, schema, table).into_iter().next())
    }

    fn insert_version(&self, entries: &ConfigMap, schema: &str, table: ConfigTable) -> Result<ConfigVersion, PersistenceError> {
        let target = qualified(schema, table)?;
        // Una versión sin filas no existiría en la tabla.
        if entries.is_empty() {
            return Err(PersistenceError::EmptyVersion);
        }
        let sql = format!("INSERT INTO {target} (version_id, config_key, config_value, meta__inserted_at) \
                           VALUES ($1, $2, $3, $4)");
        // Postgres guarda microsegundos: truncar para que lo leído coincida.
        let version = ConfigVersion::new(schema, table, entries.clone(), Utc::now().trunc_subsecs(6));
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx_conn| {
                    for (key, value) in entries {
                        diesel::sql_query(&sql).bind::<diesel::sql_types::Uuid, _>(version.version_id)
                                               .bind::<Text, _>(key.as_str())
                                               .bind::<Jsonb, _>(value)
                                               .bind::<Timestamptz, _>(version.inserted_at)
                                               .execute(tx_conn)?;
                    }
                    Ok::<(), diesel::result::Error>(())
                })
                .map_err(PersistenceError::from)
        })?;
        Ok(version)
    }

    fn list_versions(&self, schema: &str, table: ConfigTable, limit: usize) -> Result<Vec<ConfigVersion>, PersistenceError> {
        let target = qualified(schema, table)?;
        let sql = format!("WITH recent AS ( \
                               SELECT version_id, MAX(meta__inserted_at) AS ts, MAX(id) AS last_id FROM {target} \
                               GROUP BY version_id ORDER BY ts DESC, last_id DESC LIMIT $1) \
                           SELECT c.id, c.version_id, c.config_key, c.config_value, c.meta__inserted_at \
                           FROM {target} c JOIN recent r ON r.version_id = c.version_id \
                           ORDER BY r.ts DESC, r.last_id DESC, c.id ASC");
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<ConfigRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::sql_query(&sql).bind::<BigInt, _>(limit)
                                   .load(&mut conn)
                                   .map_err(PersistenceError::from)
        })?;
        Ok(group_versions(rows, schema, table))
    }
}

impl<P: ConnectionProvider> ConfigStore for PgConfigStore<P> {
    fn latest(&self, schema: &str, environment: Environment) -> Result<ConfigMap, WorkflowError> {
        let table = ConfigTable::for_environment(environment)?;
        debug!("latest:start schema={schema} table={table}");
        let version = self.latest_version(schema, table)?;
        debug!("latest:done schema={schema} table={table} found={}", version.is_some());
        Ok(version.map(|v| v.entries).unwrap_or_default())
    }

    fn append_version(&mut self, entries: &ConfigMap, schema: &str, table: ConfigTable) -> Result<ConfigVersion, WorkflowError> {
        debug!("append_version:start schema={schema} table={table} keys={}", entries.len());
        let version = self.insert_version(entries, schema, table)?;
        debug!("append_version:done schema={schema} table={table} version_id={}", version.version_id);
        Ok(version)
    }

    fn history(&self, schema: &str, environment: Environment, limit: usize) -> Result<Vec<ConfigVersion>, WorkflowError> {
        let table = ConfigTable::for_environment(environment)?;
        Ok(self.list_versions(schema, table, limit)?)
    }
}

/// Construye un pool r2d2 y corre las migraciones pendientes.
///
/// - Valida y ajusta tamaños (si `min_size > max_size`, usa `min_size =
///   max_size`).
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = if min_size == 0 { 1 } else { min_size };
    let validated_max = if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración (DATABASE_URL,
/// tamaños) y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
