//! Record store primitives: the storage seam every CRM adapter talks to.

mod http;
mod memory;
mod settings;

use async_trait::async_trait;
use entity::{ID_KEY, Record, RecordId};
use thiserror::Error;

pub use http::HttpRecordStore;
pub use memory::MemoryRecordStore;
pub use settings::{StoreBackend, StoreSettings, connect};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{table} record {id} not found")]
    NotFound { table: String, id: RecordId },
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected store response: {0}")]
    Protocol(String),
    #[error("store url missing")]
    MissingUrl,
    #[error("invalid store configuration: {0}")]
    Config(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Table-oriented CRUD against a record store.
///
/// `update` replaces every client field of the record. The store owns the
/// `Id`, `createdAt` and `updatedAt` keys.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, table: &str) -> StoreResult<Vec<Record>>;

    async fn get(&self, table: &str, id: RecordId) -> StoreResult<Record>;

    async fn create(&self, table: &str, fields: Record) -> StoreResult<Record>;

    async fn update(&self, table: &str, id: RecordId, fields: Record) -> StoreResult<Record>;

    async fn delete(&self, table: &str, id: RecordId) -> StoreResult<()>;
}

/// Identifier carried by a raw record, if any.
pub fn record_id(record: &Record) -> Option<RecordId> {
    record.get(ID_KEY).and_then(serde_json::Value::as_i64)
}
