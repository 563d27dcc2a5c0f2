//! Wrapper para correr migraciones embebidas.
//!
//! Las migraciones de `migrations/` crean el schema `churn_model` con las
//! tablas `stage_config` y `prod_config`. Al inicializar el pool se ejecutan
//! una vez.

use crate::error::PersistenceError;
use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub fn run_pending_migrations(conn: &mut PgConnection) -> Result<(), PersistenceError> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|versions| log::debug!("migrations:applied count={}", versions.len()))
        .map_err(|e| PersistenceError::Unknown(format!("migration error: {e}")))
}
