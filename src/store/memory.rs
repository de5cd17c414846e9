//! In-process document store with the same contract as the Postgres backend.
//!
//! A transaction holds the store lock for its whole lifetime and keeps a
//! snapshot to restore on abort or drop, so transactions are serializable
//! and plain operations wait for an open transaction to finish.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Collection, DocumentSession, DocumentStore, ReplaceResult, StoreError};
use crate::filter::{Filter, FilterData};
use crate::models::Document;

#[derive(Debug, Clone, Default)]
struct State {
    collections: HashMap<Collection, Vec<Document>>,
}

impl State {
    fn docs(&self, collection: Collection) -> &[Document] {
        self.collections.get(&collection).map(Vec::as_slice).unwrap_or(&[])
    }

    fn docs_mut(&mut self, collection: Collection) -> &mut Vec<Document> {
        self.collections.entry(collection).or_default()
    }

    fn find(&self, collection: Collection, query: FilterData) -> Result<Vec<Document>, StoreError> {
        let mut filter = Filter::new(collection.name())?;
        filter.assign(query)?;
        Ok(filter.apply(self.docs(collection))?)
    }

    fn matching_indexes(&self, collection: Collection, filter: Value) -> Result<Vec<usize>, StoreError> {
        let mut f = Filter::new(collection.name())?;
        f.where_clause(filter)?;
        let matcher = f.matcher()?;
        Ok(self
            .docs(collection)
            .iter()
            .enumerate()
            .filter(|(_, d)| matcher.matches(d))
            .map(|(i, _)| i)
            .collect())
    }

    fn insert_one(&mut self, collection: Collection, doc: Document) {
        self.docs_mut(collection).push(doc);
    }

    fn replace_one(&mut self, collection: Collection, filter: Value, doc: Document, upsert: bool) -> Result<ReplaceResult, StoreError> {
        match self.matching_indexes(collection, filter)?.first() {
            Some(&index) => {
                self.docs_mut(collection)[index] = doc;
                Ok(ReplaceResult { matched: 1, upserted: false })
            }
            None if upsert => {
                self.insert_one(collection, doc);
                Ok(ReplaceResult { matched: 0, upserted: true })
            }
            None => Ok(ReplaceResult::default()),
        }
    }

    fn update_many(&mut self, collection: Collection, filter: Value, set: Document) -> Result<u64, StoreError> {
        let indexes = self.matching_indexes(collection, filter)?;
        let docs = self.docs_mut(collection);
        for &index in &indexes {
            for (key, value) in &set {
                docs[index].insert(key.clone(), value.clone());
            }
        }
        Ok(indexes.len() as u64)
    }

    fn delete_many(&mut self, collection: Collection, filter: Value) -> Result<u64, StoreError> {
        let indexes: HashSet<usize> = self.matching_indexes(collection, filter)?.into_iter().collect();
        let docs = self.docs_mut(collection);
        let mut index = 0;
        docs.retain(|_| {
            let keep = !indexes.contains(&index);
            index += 1;
            keep
        });
        Ok(indexes.len() as u64)
    }

    fn distinct(&self, collection: Collection, field: &str, filter: Value) -> Result<Vec<Value>, StoreError> {
        crate::filter::filter_where::validate_field(field)?;
        let mut out: Vec<Value> = vec![];
        for index in self.matching_indexes(collection, filter)? {
            if let Some(value) = self.docs(collection)[index].get(field) {
                if !out.contains(value) {
                    out.push(value.clone());
                }
            }
        }
        Ok(out)
    }
}

/// Collections whose writes are rejected; lets tests break a transaction midway
type RejectedWrites = Arc<StdMutex<HashSet<Collection>>>;

fn check_writable(rejected: &RejectedWrites, collection: Collection) -> Result<(), StoreError> {
    let rejected = rejected.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if rejected.contains(&collection) {
        return Err(StoreError::WriteRejected(collection));
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<State>>,
    rejected: RejectedWrites,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent write to `collection` with `StoreError::WriteRejected`
    pub fn reject_writes(&self, collection: Collection) {
        self.rejected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(collection);
    }

    pub fn accept_writes(&self, collection: Collection) {
        self.rejected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&collection);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, collection: Collection, query: FilterData) -> Result<Vec<Document>, StoreError> {
        self.state.lock().await.find(collection, query)
    }

    async fn insert_one(&self, collection: Collection, doc: Document) -> Result<(), StoreError> {
        check_writable(&self.rejected, collection)?;
        self.state.lock().await.insert_one(collection, doc);
        Ok(())
    }

    async fn replace_one(&self, collection: Collection, filter: Value, doc: Document, upsert: bool) -> Result<ReplaceResult, StoreError> {
        check_writable(&self.rejected, collection)?;
        self.state.lock().await.replace_one(collection, filter, doc, upsert)
    }

    async fn update_many(&self, collection: Collection, filter: Value, set: Document) -> Result<u64, StoreError> {
        check_writable(&self.rejected, collection)?;
        self.state.lock().await.update_many(collection, filter, set)
    }

    async fn delete_many(&self, collection: Collection, filter: Value) -> Result<u64, StoreError> {
        check_writable(&self.rejected, collection)?;
        self.state.lock().await.delete_many(collection, filter)
    }

    async fn distinct(&self, collection: Collection, field: &str, filter: Value) -> Result<Vec<Value>, StoreError> {
        self.state.lock().await.distinct(collection, field, filter)
    }

    async fn begin(&self) -> Result<Box<dyn DocumentSession>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = State::clone(&guard);
        Ok(Box::new(MemorySession {
            guard,
            snapshot: Some(snapshot),
            rejected: self.rejected.clone(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct MemorySession {
    guard: OwnedMutexGuard<State>,
    /// `None` once committed
    snapshot: Option<State>,
    rejected: RejectedWrites,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl DocumentSession for MemorySession {
    async fn find(&mut self, collection: Collection, query: FilterData) -> Result<Vec<Document>, StoreError> {
        self.guard.find(collection, query)
    }

    async fn insert_one(&mut self, collection: Collection, doc: Document) -> Result<(), StoreError> {
        check_writable(&self.rejected, collection)?;
        self.guard.insert_one(collection, doc);
        Ok(())
    }

    async fn replace_one(&mut self, collection: Collection, filter: Value, doc: Document, upsert: bool) -> Result<ReplaceResult, StoreError> {
        check_writable(&self.rejected, collection)?;
        self.guard.replace_one(collection, filter, doc, upsert)
    }

    async fn update_many(&mut self, collection: Collection, filter: Value, set: Document) -> Result<u64, StoreError> {
        check_writable(&self.rejected, collection)?;
        self.guard.update_many(collection, filter, set)
    }

    async fn delete_many(&mut self, collection: Collection, filter: Value) -> Result<u64, StoreError> {
        check_writable(&self.rejected, collection)?;
        self.guard.delete_many(collection, filter)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut session = self;
        session.snapshot = None;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        // Drop restores the snapshot
        Ok(())
    }
}
