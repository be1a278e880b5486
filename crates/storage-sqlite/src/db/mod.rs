//! Connection pool, migrations and the single writer actor.

pub mod write_actor;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

use adpulse_core::Result;

use crate::errors::StorageError;

pub use write_actor::{spawn_writer, WriteHandle};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const DB_FILE_NAME: &str = "adpulse.db";
const POOL_SIZE: u32 = 8;

#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA busy_timeout = 5000; \
             PRAGMA foreign_keys = ON;",
        )
        .map_err(r2d2::Error::QueryError)
    }
}

/// Ensures `data_dir` exists and returns the database file path inside it.
/// A path ending in `.db` is used as the database file directly.
pub fn init(data_dir: &str) -> Result<String> {
    let path = Path::new(data_dir);
    if path.extension().is_some_and(|ext| ext == "db") {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StorageError::from)?;
        }
        return Ok(data_dir.to_string());
    }
    fs::create_dir_all(path).map_err(StorageError::from)?;
    Ok(path.join(DB_FILE_NAME).to_string_lossy().to_string())
}

pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = Pool::builder()
        .max_size(POOL_SIZE)
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)
        .map_err(StorageError::from)?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    Ok(pool.get().map_err(StorageError::from)?)
}

pub fn run_migrations(db_path: &str) -> Result<()> {
    let mut conn = SqliteConnection::establish(db_path).map_err(StorageError::from)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    if !applied.is_empty() {
        info!("Applied {} database migration(s)", applied.len());
    }
    Ok(())
}

/// Fresh migrated database in a temporary directory.
#[cfg(test)]
pub(crate) fn setup_test_db() -> (Arc<DbPool>, WriteHandle) {
    let data_dir = tempfile::tempdir()
        .expect("tempdir")
        .keep()
        .to_string_lossy()
        .to_string();
    let db_path = init(&data_dir).expect("init db");
    run_migrations(&db_path).expect("migrate db");
    let pool = create_pool(&db_path).expect("create pool");
    let writer = spawn_writer(pool.as_ref().clone());
    (pool, writer)
}
