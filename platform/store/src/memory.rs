use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use entity::{ID_KEY, Record, RecordId};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{RecordStore, StoreError, StoreResult, record_id};

const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

/// Process-local store. Backs demos and tests; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, Table>>,
}

/// Ids are never reused, even after the highest one is deleted.
#[derive(Debug, Default)]
struct Table {
    rows: Vec<Record>,
    last_id: RecordId,
}

impl Table {
    fn claim(&mut self, id: RecordId) {
        self.last_id = self.last_id.max(id);
    }

    fn next_id(&mut self) -> RecordId {
        self.last_id += 1;
        self.last_id
    }

    fn find_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.rows.iter_mut().find(|row| record_id(row) == Some(id))
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record verbatim, keeping its `Id` when present.
    ///
    /// Fixtures use this to load data that would fail typed decoding.
    pub async fn insert_raw(&self, table: &str, mut record: Record) -> RecordId {
        let mut tables = self.tables.write().await;
        let table = tables.entry(table.to_string()).or_default();
        let id = match record_id(&record) {
            Some(id) => {
                table.claim(id);
                id
            }
            None => {
                let id = table.next_id();
                record.insert(ID_KEY.into(), Value::from(id));
                id
            }
        };
        table.rows.push(record);
        id
    }

    pub async fn count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|table| table.rows.len())
            .unwrap_or(0)
    }
}

fn now_stamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}
fn strip_owned_keys(fields: &mut Record) {
    fields.remove(ID_KEY);
    fields.remove(CREATED_AT);
    fields.remove(UPDATED_AT);
}

fn not_found(table: &str, id: RecordId) -> StoreError {
    StoreError::NotFound {
        table: table.to_string(),
        id,
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self, table: &str) -> StoreResult<Vec<Record>> {
        Ok(self
            .tables
            .read()
            .await
            .get(table)
            .map(|table| table.rows.clone())
            .unwrap_or_default())
    }

    async fn get(&self, table: &str, id: RecordId) -> StoreResult<Record> {
        self.tables
            .read()
            .await
            .get(table)
            .and_then(|table| table.rows.iter().find(|row| record_id(row) == Some(id)))
            .cloned()
            .ok_or_else(|| not_found(table, id))
    }

    async fn create(&self, table: &str, mut fields: Record) -> StoreResult<Record> {
        strip_owned_keys(&mut fields);
        let mut tables = self.tables.write().await;
        let table = tables.entry(table.to_string()).or_default();
        let stamp = now_stamp();
        fields.insert(ID_KEY.into(), Value::from(table.next_id()));
        fields.insert(CREATED_AT.into(), stamp.clone());
        fields.insert(UPDATED_AT.into(), stamp);
        table.rows.push(fields.clone());
        Ok(fields)
    }

    async fn update(&self, table: &str, id: RecordId, mut fields: Record) -> StoreResult<Record> {
        strip_owned_keys(&mut fields);
        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(table)
            .and_then(|entries| entries.find_mut(id))
            .ok_or_else(|| not_found(table, id))?;
        let created_at = row.get(CREATED_AT).cloned();
        fields.insert(ID_KEY.into(), Value::from(id));
        if let Some(created_at) = created_at {
            fields.insert(CREATED_AT.into(), created_at);
        }
        fields.insert(UPDATED_AT.into(), now_stamp());
        *row = fields.clone();
        Ok(fields)
    }

    async fn delete(&self, table: &str, id: RecordId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let rows = &mut tables
            .get_mut(table)
            .ok_or_else(|| not_found(table, id))?
            .rows;
        let index = rows
            .iter()
            .position(|row| record_id(row) == Some(id))
            .ok_or_else(|| not_found(table, id))?;
        rows.remove(index);
        Ok(())
    }
}
