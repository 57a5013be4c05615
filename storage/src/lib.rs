use derive_more::{Display, Error};
use model::{error::UnsupportedFieldType, reconcile::ReconcileError};
use tokio_postgres::error::SqlState;

mod cache;
pub mod catalog;
pub mod field;
pub mod social;
pub mod submission;
pub mod template;
pub mod user;

pub use cache::ContractCache;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Display, Error)]
pub enum StorageError {
    #[display("Deadpool: {}", _0)]
    Pool(deadpool_postgres::PoolError),
    #[display("Postgres: {}", _0)]
    Database(tokio_postgres::Error),
    /// A unique constraint rejected the write.
    #[display("Conflict: {}", _0)]
    Conflict(tokio_postgres::Error),
    /// A foreign key pointed at a row that does not exist.
    #[display("Missing reference: {}", _0)]
    MissingReference(tokio_postgres::Error),
    #[display("{}", _0)]
    UnsupportedFieldType(UnsupportedFieldType),
    #[display("{}", _0)]
    Reconcile(ReconcileError),
    #[display("Entity not found")]
    NotFound,
}

impl From<deadpool_postgres::PoolError> for StorageError {
    fn from(value: deadpool_postgres::PoolError) -> Self {
        Self::Pool(value)
    }
}

impl From<tokio_postgres::Error> for StorageError {
    fn from(value: tokio_postgres::Error) -> Self {
        match value.code() {
            Some(code) if code == &SqlState::UNIQUE_VIOLATION => Self::Conflict(value),
            Some(code) if code == &SqlState::FOREIGN_KEY_VIOLATION => {
                Self::MissingReference(value)
            }
            _ => Self::Database(value),
        }
    }
}

impl From<UnsupportedFieldType> for StorageError {
    fn from(value: UnsupportedFieldType) -> Self {
        Self::UnsupportedFieldType(value)
    }
}

impl From<ReconcileError> for StorageError {
    fn from(value: ReconcileError) -> Self {
        Self::Reconcile(value)
    }
}

#[macro_export]
macro_rules! include_sql {
    ($path:literal) => {
        include_str!(concat!("sql/", $path, ".sql"))
    };
}
