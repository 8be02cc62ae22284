//! In-crate test doubles.

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use entity::{Record, RecordId};
use platform_store::{MemoryRecordStore, RecordStore, StoreError, StoreResult};
use serde_json::{Value, json};

/// In-memory store that counts calls and fails on demand.
#[derive(Default)]
pub struct TestStore {
    inner: MemoryRecordStore,
    calls: AtomicUsize,
    fail_writes: AtomicBool,
    corrupt_updates: AtomicBool,
    failing_tables: Mutex<HashSet<String>>,
}

impl TestStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert(&self, table: &str, record: Record) -> RecordId {
        self.inner.insert_raw(table, record).await
    }

    pub fn fail_table(&self, table: &str) {
        self.failing_tables.lock().unwrap().insert(table.to_string());
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Updates still persist, but the echoed record comes back without its title.
    pub fn corrupt_updates(&self) {
        self.corrupt_updates.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, table: &str, write: bool) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let table_down = self.failing_tables.lock().unwrap().contains(table);
        if table_down || (write && self.fail_writes.load(Ordering::SeqCst)) {
            return Err(StoreError::Rejected {
                status: 503,
                message: format!("{table} unavailable"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for TestStore {
    async fn list(&self, table: &str) -> StoreResult<Vec<Record>> {
        self.check(table, false)?;
        self.inner.list(table).await
    }

    async fn get(&self, table: &str, id: RecordId) -> StoreResult<Record> {
        self.check(table, false)?;
        self.inner.get(table, id).await
    }

    async fn create(&self, table: &str, fields: Record) -> StoreResult<Record> {
        self.check(table, true)?;
        self.inner.create(table, fields).await
    }

    async fn update(&self, table: &str, id: RecordId, fields: Record) -> StoreResult<Record> {
        self.check(table, true)?;
        let mut row = self.inner.update(table, id, fields).await?;
        if self.corrupt_updates.load(Ordering::SeqCst) {
            row.remove("title");
        }
        Ok(row)
    }

    async fn delete(&self, table: &str, id: RecordId) -> StoreResult<()> {
        self.check(table, true)?;
        self.inner.delete(table, id).await
    }
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {other}"),
    }
}

pub fn deal_record(id: RecordId, title: &str, stage: &str, value: i64) -> Record {
    record(json!({
        "Id": id,
        "title": title,
        "value": value,
        "stage": stage,
        "probability": 50,
        "contactId": 1,
    }))
}
