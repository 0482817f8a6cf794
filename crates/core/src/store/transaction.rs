use super::{
    decode, decode_all, touched_collections, Collection, Document, DocumentStore, PendingWrite,
    StoreState, StoredDocument, WriteSet,
};
use crate::constants::ID_ALLOCATION_ATTEMPTS;
use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeMap, BTreeSet};
use ward_uuid::RecordId;

/// One attempt of an optimistic transaction.
///
/// Reads record the version they observed (`None` for "absent"); scans record the collection
/// generation. Writes are staged locally and become visible to later reads in the same
/// transaction. Nothing reaches the store until the commit validates the read set.
pub struct Transaction<'s> {
    store: &'s DocumentStore,
    reads: BTreeMap<(Collection, RecordId), Option<u64>>,
    scans: BTreeMap<Collection, u64>,
    writes: WriteSet,
}

impl<'s> Transaction<'s> {
    pub(crate) fn new(store: &'s DocumentStore) -> Self {
        Self {
            store,
            reads: BTreeMap::new(),
            scans: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    /// Read one document, recording its version.
    pub fn get<T: Document>(&mut self, id: &RecordId) -> CoreResult<Option<T>> {
        let key = (T::COLLECTION, id.clone());
        if let Some(write) = self.writes.get(&key) {
            return match write {
                PendingWrite::Put(body) => decode::<T>(id, body).map(Some),
                PendingWrite::Delete => Ok(None),
            };
        }

        let state = self.store.state.read();
        let stored = state.collection(T::COLLECTION).documents.get(id);
        self.reads
            .entry(key)
            .or_insert_with(|| stored.map(|doc| doc.version));
        stored.map(|doc| decode::<T>(id, &doc.body)).transpose()
    }

    /// Read every decodable document in `T`'s collection, with this transaction's staged
    /// writes applied. Any concurrent change to the collection invalidates the scan.
    pub fn scan<T: Document>(&mut self) -> Vec<T> {
        let state = self.store.state.read();
        let committed = state.collection(T::COLLECTION);
        self.scans
            .entry(T::COLLECTION)
            .or_insert(committed.generation);

        let mut documents = committed.documents.clone();
        for ((collection, id), write) in &self.writes {
            if *collection != T::COLLECTION {
                continue;
            }
            match write {
                PendingWrite::Put(body) => {
                    let version = documents.get(id).map_or(0, |doc| doc.version);
                    documents.insert(
                        id.clone(),
                        StoredDocument {
                            version,
                            body: body.clone(),
                        },
                    );
                }
                PendingWrite::Delete => {
                    documents.remove(id);
                }
            }
        }
        decode_all(&documents, T::COLLECTION)
    }

    /// Allocate a fresh id in `collection`, retrying on the (unlikely) event of a collision.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conflict`] if no unused id is found.
    pub fn allocate_id(&mut self, collection: Collection) -> CoreResult<RecordId> {
        let state = self.store.state.read();
        let documents = &state.collection(collection).documents;
        for _ in 0..ID_ALLOCATION_ATTEMPTS {
            let id = RecordId::new();
            let key = (collection, id.clone());
            if documents.contains_key(&id) || self.writes.contains_key(&key) {
                continue;
            }
            self.reads.insert(key, None);
            return Ok(id);
        }
        Err(CoreError::Conflict(format!(
            "failed to allocate a unique {} id after {} attempts",
            collection.record_kind(),
            ID_ALLOCATION_ATTEMPTS
        )))
    }

    /// Stage a full replacement (or insertion) of `doc`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if `doc` cannot be encoded.
    pub fn put<T: Document>(&mut self, doc: &T) -> CoreResult<()> {
        let body = serde_json::to_value(doc).map_err(CoreError::Serialization)?;
        self.writes
            .insert((T::COLLECTION, doc.id().clone()), PendingWrite::Put(body));
        Ok(())
    }

    /// Stage removal of a document.
    pub fn delete<T: Document>(&mut self, id: &RecordId) {
        self.writes
            .insert((T::COLLECTION, id.clone()), PendingWrite::Delete);
    }

    fn validate(&self, state: &StoreState) -> bool {
        let reads_current = self.reads.iter().all(|((collection, id), seen)| {
            let now = state
                .collection(*collection)
                .documents
                .get(id)
                .map(|doc| doc.version);
            now == *seen
        });
        reads_current
            && self
                .scans
                .iter()
                .all(|(collection, seen)| state.collection(*collection).generation == *seen)
    }

    /// Whether everything this transaction read is still current.
    pub(crate) fn is_current(&self) -> bool {
        self.validate(&self.store.state.read())
    }

    /// Validate and apply. Returns the touched collections, or `None` if the reads were stale
    /// and nothing was written.
    pub(crate) fn commit(self) -> CoreResult<Option<BTreeSet<Collection>>> {
        let mut state = self.store.state.write();
        if !self.validate(&state) {
            return Ok(None);
        }
        if self.writes.is_empty() {
            return Ok(Some(BTreeSet::new()));
        }

        if let Some(persistence) = &self.store.persistence {
            persistence.apply(&state, &self.writes)?;
        }

        let touched = touched_collections(&self.writes);
        for ((collection, id), write) in self.writes {
            let target = state.collection_mut(collection);
            match write {
                PendingWrite::Put(body) => {
                    let version = target.documents.get(&id).map_or(1, |doc| doc.version + 1);
                    target.documents.insert(id, StoredDocument { version, body });
                }
                PendingWrite::Delete => {
                    target.documents.remove(&id);
                }
            }
        }
        for collection in &touched {
            state.collection_mut(*collection).generation += 1;
        }
        Ok(Some(touched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::models::{Ward, WardType};
    use chrono::Utc;
    use std::sync::Arc;

    fn ward(name: &str) -> Ward {
        Ward {
            id: RecordId::new(),
            name: name.into(),
            department: "Surgery".into(),
            ward_type: WardType::Surgery,
            total_beds: 2,
            occupied_beds: 0,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn staged_writes_are_visible_to_later_reads() {
        let store = DocumentStore::in_memory(Arc::new(CoreConfig::in_memory()));
        let mut tx = Transaction::new(&store);
        let w = ward("Oak");
        tx.put(&w).unwrap();

        let read: Option<Ward> = tx.get(&w.id).unwrap();
        assert_eq!(read, Some(w.clone()));
        assert_eq!(tx.scan::<Ward>().len(), 1);

        tx.delete::<Ward>(&w.id);
        assert!(tx.get::<Ward>(&w.id).unwrap().is_none());
        assert!(tx.scan::<Ward>().is_empty());
    }

    #[test]
    fn scan_is_invalidated_by_any_collection_change() {
        let store = DocumentStore::in_memory(Arc::new(CoreConfig::in_memory()));
        let mut tx = Transaction::new(&store);
        assert!(tx.scan::<Ward>().is_empty());

        let mut other = Transaction::new(&store);
        other.put(&ward("Elm")).unwrap();
        assert!(other.commit().unwrap().is_some());

        assert!(!tx.is_current());
        tx.put(&ward("Ash")).unwrap();
        assert!(tx.commit().unwrap().is_none());
        assert_eq!(store.list::<Ward>().len(), 1);
    }

    #[test]
    fn allocated_ids_must_still_be_absent_at_commit() {
        let store = DocumentStore::in_memory(Arc::new(CoreConfig::in_memory()));
        let mut tx = Transaction::new(&store);
        let id = tx.allocate_id(Collection::Wards).unwrap();

        let mut racing = Transaction::new(&store);
        let mut w = ward("Birch");
        w.id = id.clone();
        racing.put(&w).unwrap();
        racing.commit().unwrap();

        let mut mine = ward("Cedar");
        mine.id = id;
        tx.put(&mine).unwrap();
        assert!(tx.commit().unwrap().is_none());
    }
}
