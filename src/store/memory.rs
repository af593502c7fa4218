use super::{Attributes, Record, Store};
use crate::errors::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process record store. Ids are assigned sequentially per store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(String, String), Attributes>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a stored record by model name and id.
    pub fn find(&self, model: &str, id: &str) -> Option<Record> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records
            .get(&(model.to_string(), id.to_string()))
            .map(|attrs| Record::loaded(model, id, attrs.clone()))
    }

    /// All stored records of a model, ordered by id.
    pub fn all(&self, model: &str) -> Vec<Record> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let mut found: Vec<Record> = records
            .iter()
            .filter(|((m, _), _)| m == model)
            .map(|((m, id), attrs)| Record::loaded(m.as_str(), id.as_str(), attrs.clone()))
            .collect();
        found.sort_by_key(|r| r.id().and_then(|id| id.parse::<u64>().ok()));
        found
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save(&self, mut record: Record) -> Result<Record, StoreError> {
        if record.is_new() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            record.set_id(id.to_string());
        }
        let id = record
            .id()
            .map(str::to_string)
            .ok_or_else(|| StoreError::MissingId {
                model: record.model().to_string(),
            })?;

        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(
            (record.model().to_string(), id),
            record.attributes().clone(),
        );
        record.commit();
        Ok(record)
    }

    async fn destroy(&self, record: &Record) -> Result<(), StoreError> {
        let id = record.id().ok_or_else(|| StoreError::MissingId {
            model: record.model().to_string(),
        })?;
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records
            .remove(&(record.model().to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                model: record.model().to_string(),
                id: id.to_string(),
            })
    }
}
