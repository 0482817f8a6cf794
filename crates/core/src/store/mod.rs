//! # Document Store
//!
//! An in-process store of JSON documents grouped into collections, with the two atomic
//! primitives the rest of the core is built on:
//!
//! - [`DocumentStore::run_transaction`]: optimistic multi-document transactions. The body reads
//!   through a [`Transaction`], stages writes, and the commit validates under the store's write
//!   lock that nothing it read has changed. A stale commit is discarded and the body is re-run
//!   against fresh state, up to the configured attempt budget and deadline.
//! - [`DocumentStore::append_to_array`]: a single-document array append performed entirely
//!   under the write lock, so concurrent appends never lose each other.
//!
//! Every document carries a version that increases on each committed write, and every
//! collection carries a generation that increases whenever any of its documents change.
//! Collection scans inside a transaction are validated against the generation.
//!
//! When the configuration names a data directory, committed documents are also written to
//! `<data_dir>/<collection>/<s1>/<s2>/<id>.json` and loaded back at startup.

mod persistence;
mod transaction;

pub use transaction::Transaction;

use crate::config::CoreConfig;
use crate::constants::{CHANGE_FEED_CAPACITY, PATIENTS_DIR_NAME, WARDS_DIR_NAME};
use crate::error::{CoreError, CoreResult, RecordKind};
use crate::models::{Patient, Ward};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use persistence::FilePersistence;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use ward_uuid::RecordId;

/// A named group of documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Wards,
    Patients,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Wards, Collection::Patients];

    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Wards => WARDS_DIR_NAME,
            Collection::Patients => PATIENTS_DIR_NAME,
        }
    }

    pub(crate) const fn record_kind(self) -> RecordKind {
        match self {
            Collection::Wards => RecordKind::Ward,
            Collection::Patients => RecordKind::Patient,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed view over documents in one collection.
pub trait Document: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn id(&self) -> &RecordId;
}

impl Document for Ward {
    const COLLECTION: Collection = Collection::Wards;

    fn id(&self) -> &RecordId {
        &self.id
    }
}

impl Document for Patient {
    const COLLECTION: Collection = Collection::Patients;

    fn id(&self) -> &RecordId {
        &self.id
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StoredDocument {
    pub(crate) version: u64,
    pub(crate) body: Value,
}

#[derive(Debug, Default)]
pub(crate) struct CollectionState {
    pub(crate) documents: BTreeMap<RecordId, StoredDocument>,
    pub(crate) generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    wards: CollectionState,
    patients: CollectionState,
}

impl StoreState {
    pub(crate) fn collection(&self, collection: Collection) -> &CollectionState {
        match collection {
            Collection::Wards => &self.wards,
            Collection::Patients => &self.patients,
        }
    }

    pub(crate) fn collection_mut(&mut self, collection: Collection) -> &mut CollectionState {
        match collection {
            Collection::Wards => &mut self.wards,
            Collection::Patients => &mut self.patients,
        }
    }
}

/// A staged change to one document.
#[derive(Clone, Debug)]
pub(crate) enum PendingWrite {
    Put(Value),
    Delete,
}

pub(crate) type WriteSet = BTreeMap<(Collection, RecordId), PendingWrite>;

/// Decode a stored body. The store key is authoritative for the document id.
pub(crate) fn decode<T: Document>(id: &RecordId, body: &Value) -> CoreResult<T> {
    let mut body = body.clone();
    if let Value::Object(map) = &mut body {
        map.insert("id".to_string(), Value::String(id.to_string()));
    }
    serde_json::from_value(body).map_err(CoreError::Deserialization)
}

fn malformed(message: String) -> CoreError {
    CoreError::Deserialization(<serde_json::Error as serde::de::Error>::custom(message))
}

/// Every ward and patient, read under a single lock so the two sets are mutually consistent.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub wards: Vec<Ward>,
    pub patients: Vec<Patient>,
}

/// The shared document store. Cheap to share behind an `Arc`.
pub struct DocumentStore {
    cfg: Arc<CoreConfig>,
    state: RwLock<StoreState>,
    persistence: Option<FilePersistence>,
    changes: broadcast::Sender<Collection>,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("data_dir", &self.cfg.data_dir())
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    /// A store that keeps documents in memory only, regardless of the configured data directory.
    pub fn in_memory(cfg: Arc<CoreConfig>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            cfg,
            state: RwLock::new(StoreState::default()),
            persistence: None,
            changes,
        }
    }

    /// Open the store described by `cfg`, loading any documents already on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or read. Individual documents
    /// that cannot be parsed are skipped with a warning.
    pub fn open(cfg: Arc<CoreConfig>) -> CoreResult<Self> {
        let Some(data_dir) = cfg.data_dir().map(|dir| dir.to_path_buf()) else {
            return Ok(Self::in_memory(cfg));
        };

        let persistence = FilePersistence::open(&data_dir)?;
        let state = persistence.load()?;
        tracing::info!(
            data_dir = %data_dir.display(),
            wards = state.wards.documents.len(),
            patients = state.patients.documents.len(),
            "document store opened"
        );

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self {
            cfg,
            state: RwLock::new(state),
            persistence: Some(persistence),
            changes,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Fetch one document by id.
    pub fn get<T: Document>(&self, id: &RecordId) -> CoreResult<Option<T>> {
        let state = self.state.read();
        state
            .collection(T::COLLECTION)
            .documents
            .get(id)
            .map(|doc| decode::<T>(id, &doc.body))
            .transpose()
    }

    /// All decodable documents in a collection. Undecodable documents are skipped with a warning.
    pub fn list<T: Document>(&self) -> Vec<T> {
        let state = self.state.read();
        decode_all(&state.collection(T::COLLECTION).documents, T::COLLECTION)
    }

    /// A consistent view of both collections.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            wards: decode_all(&state.wards.documents, Collection::Wards),
            patients: decode_all(&state.patients.documents, Collection::Patients),
        }
    }

    /// Subscribe to change notifications. Each message names a collection that changed.
    pub fn subscribe(&self) -> broadcast::Receiver<Collection> {
        self.changes.subscribe()
    }

    fn notify<'a>(&self, collections: impl IntoIterator<Item = &'a Collection>) {
        for collection in collections {
            // No receivers is not an error.
            let _ = self.changes.send(*collection);
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.cfg.retry_backoff().as_micros() as u64;
        let ceiling = base.saturating_mul(u64::from(attempt.min(8)));
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::thread_rng().gen_range(base / 2..=ceiling))
    }

    /// Run `body` as an optimistic transaction.
    ///
    /// `body` may run several times and must derive everything it writes from what it reads
    /// through the [`Transaction`]. If `body` returns an error while its reads are still
    /// current, that error is returned unchanged and nothing is written. If its reads were
    /// stale, the error is discarded and the body re-runs on fresh state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conflict`] when the attempt budget or the deadline is exhausted, any
    /// error returned by `body` on a current snapshot, or a storage error from the commit.
    pub async fn run_transaction<T, F>(&self, operation: &'static str, mut body: F) -> CoreResult<T>
    where
        F: FnMut(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let attempts = self.cfg.max_transaction_attempts();
        let deadline = self.cfg.transaction_timeout();

        let run = async {
            for attempt in 1..=attempts {
                {
                    let mut tx = Transaction::new(self);
                    match body(&mut tx) {
                        Ok(value) => {
                            if let Some(touched) = tx.commit()? {
                                self.notify(&touched);
                                return Ok(value);
                            }
                        }
                        Err(err) => {
                            if tx.is_current() {
                                return Err(err);
                            }
                            tracing::debug!(operation, error = %err, "discarding error from stale read");
                        }
                    }
                }
                tracing::debug!(operation, attempt, "transaction conflicted, retrying");
                tokio::time::sleep(self.backoff(attempt)).await;
            }

            tracing::warn!(operation, attempts, "transaction retry budget exhausted");
            Err(CoreError::Conflict(format!(
                "{} could not be committed after {} attempts due to concurrent updates",
                operation, attempts
            )))
        };

        match tokio::time::timeout(deadline, run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, timeout_ms = deadline.as_millis() as u64, "transaction timed out");
                Err(CoreError::Conflict(format!(
                    "{} timed out after {} ms",
                    operation,
                    deadline.as_millis()
                )))
            }
        }
    }

    /// Append `item` to the array field `field` of one document and stamp `updatedAt`.
    ///
    /// The read-modify-write happens under the store's write lock, so concurrent appends to the
    /// same document are all retained. A missing or `null` field is treated as an empty array.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the document does not exist, or a storage error if the
    /// document is malformed or cannot be persisted.
    pub fn append_to_array(
        &self,
        collection: Collection,
        id: &RecordId,
        field: &str,
        item: Value,
        touched_at: DateTime<Utc>,
    ) -> CoreResult<()> {
        {
            let mut state = self.state.write();
            let documents = &mut state.collection_mut(collection).documents;
            let Some(current) = documents.get(id) else {
                return Err(CoreError::not_found(collection.record_kind(), id));
            };

            let version = current.version + 1;
            let mut body = current.body.clone();
            let Value::Object(map) = &mut body else {
                return Err(malformed(format!("{} document {} is not an object", collection, id)));
            };

            let entry = map
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if entry.is_null() {
                *entry = Value::Array(Vec::new());
            }
            match entry {
                Value::Array(items) => items.push(item),
                _ => {
                    return Err(malformed(format!(
                        "{} document {} has a non-array '{}' field",
                        collection, id, field
                    )))
                }
            }
            map.insert(
                "updatedAt".to_string(),
                Value::String(crate::temporal::encode(&touched_at)),
            );

            if let Some(persistence) = &self.persistence {
                persistence.write_document(collection, id, &body)?;
            }

            documents.insert(id.clone(), StoredDocument { version, body });
            state.collection_mut(collection).generation += 1;
        }

        tracing::debug!(%collection, %id, field, "array append committed");
        self.notify(&[collection]);
        Ok(())
    }
}

pub(crate) fn decode_all<T: Document>(
    documents: &BTreeMap<RecordId, StoredDocument>,
    collection: Collection,
) -> Vec<T> {
    documents
        .iter()
        .filter_map(|(id, doc)| match decode::<T>(id, &doc.body) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(%collection, %id, error = %err, "skipping undecodable document");
                None
            }
        })
        .collect()
}

pub(crate) fn touched_collections(writes: &WriteSet) -> BTreeSet<Collection> {
    writes.keys().map(|(collection, _)| *collection).collect()
}
