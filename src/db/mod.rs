use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    SqlErr, Statement, TransactionTrait,
};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::domain::AccountId;

pub mod migrator;
pub mod repositories;

pub use crate::entities::activity_logs::Model as ActivityLog;
pub use repositories::account::Account;
pub use repositories::activity::{ActivityFilter, NewActivity};

/// True when SQLite rejected a write on a UNIQUE index.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Serializes writers inside this process.
///
/// SQLite cannot upgrade a deferred transaction that has already read once
/// another connection commits, and fails with `SQLITE_BUSY` instead of
/// waiting. Every write path holds this gate, so a read-then-write
/// transaction never races another writer from the same pool.
pub type WriteGate = Arc<Mutex<()>>;

/// A transaction that holds the [`WriteGate`] until it is committed or dropped.
pub struct WriteTransaction {
    // Declared first so the rollback on drop is queued before the gate opens.
    txn: DatabaseTransaction,
    _gate: OwnedMutexGuard<()>,
}

impl WriteTransaction {
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }
}

impl Deref for WriteTransaction {
    type Target = DatabaseTransaction;

    fn deref(&self) -> &Self::Target {
        &self.txn
    }
}

/// Process-wide storage handle. Cheap to clone; every clone shares the pool
/// and the write gate.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    writes: WriteGate,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        if !db_url.contains(":memory:") {
            // Persistent per database file; lets readers proceed during writes.
            conn.execute_unprepared("PRAGMA journal_mode = WAL").await?;
        }

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self {
            conn,
            writes: Arc::new(Mutex::new(())),
        })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Waits for the write gate, then opens a transaction under it.
    pub async fn begin_write(&self) -> Result<WriteTransaction, DbErr> {
        let gate = self.writes.clone().lock_owned().await;
        let txn = self.conn.begin().await?;
        Ok(WriteTransaction { txn, _gate: gate })
    }

    /// Holds the write gate for a single autocommit statement.
    pub async fn lock_writes(&self) -> OwnedMutexGuard<()> {
        self.writes.clone().lock_owned().await
    }

    #[must_use]
    pub fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone(), self.writes.clone())
    }

    #[must_use]
    pub const fn inventory_repo(
        &self,
    ) -> repositories::inventory::InventoryRepository<'_, DatabaseConnection> {
        repositories::inventory::InventoryRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn activity_repo(
        &self,
    ) -> repositories::activity::ActivityRepository<'_, DatabaseConnection> {
        repositories::activity::ActivityRepository::new(&self.conn)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        self.account_repo().get_by_id(id.value()).await
    }

    /// Inserts an entry stamped with `created_at` instead of the current time,
    /// outside any inventory mutation.
    pub async fn add_activity_at(&self, entry: NewActivity, created_at: i64) -> Result<ActivityLog> {
        let _gate = self.lock_writes().await;
        Ok(self.activity_repo().insert(entry, created_at).await?)
    }

    pub async fn get_activity_page(
        &self,
        account: AccountId,
        filter: ActivityFilter,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<ActivityLog>, u64)> {
        Ok(self
            .activity_repo()
            .page(account, filter, limit, offset)
            .await?)
    }

    pub async fn prune_activity_before(&self, cutoff: i64) -> Result<u64> {
        let _gate = self.lock_writes().await;
        Ok(self.activity_repo().delete_before(cutoff).await?)
    }
}
