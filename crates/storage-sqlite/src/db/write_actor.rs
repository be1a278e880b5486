//! Single writer actor. Every mutation runs on one connection owned by a
//! dedicated thread, each job inside its own transaction.

use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use log::{debug, error};
use tokio::sync::{mpsc, oneshot};

use adpulse_core::errors::{DatabaseError, Error, Result};

use super::DbPool;
use crate::errors::StorageError;

type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<Job>,
}

enum TxError {
    Job(Error),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Diesel(err)
    }
}

impl WriteHandle {
    /// Runs `job` on the writer connection inside a transaction. The transaction
    /// is rolled back when `job` returns an error.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel::<Result<T>>();
        let wrapped: Job = Box::new(move |conn: &mut SqliteConnection| {
            let result = conn
                .transaction::<T, TxError, _>(|tx_conn| job(tx_conn).map_err(TxError::Job))
                .map_err(|err| match err {
                    TxError::Job(e) => e,
                    TxError::Diesel(e) => Error::from(StorageError::from(e)),
                });
            if reply_tx.send(result).is_err() {
                debug!("Write job finished after its caller went away");
            }
        });

        self.tx.send(wrapped).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Database writer is not running".to_string(),
            ))
        })?;
        reply_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Database writer dropped the job".to_string(),
            ))
        })?
    }
}

/// Starts the writer thread. It owns one pooled connection for its lifetime
/// and stops once every `WriteHandle` is dropped.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
    let spawned = std::thread::Builder::new()
        .name("adpulse-db-writer".to_string())
        .spawn(move || {
            let mut conn = match pool.get() {
                Ok(conn) => conn,
                Err(err) => {
                    error!("Database writer could not acquire a connection: {}", err);
                    return;
                }
            };
            while let Some(job) = rx.blocking_recv() {
                job(&mut *conn);
            }
            debug!("Database writer stopped");
        });
    if let Err(err) = spawned {
        error!("Failed to start database writer thread: {}", err);
    }
    WriteHandle { tx }
}
