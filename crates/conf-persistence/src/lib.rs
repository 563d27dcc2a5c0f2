//! conf-persistence
//!
//! Backend Postgres (Diesel) del `ConfigStore` de `conf-core`, con pool r2d2,
//! migraciones embebidas y carga de configuración desde `.env`.
//!
//! Módulos:
//! - `pg`: `PgConfigStore` sobre tablas append-only `stage_config` / `prod_config`.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgConfigStore, PgPool, PoolProvider};
