use super::{Collection, CollectionState, PendingWrite, StoreState, StoredDocument, WriteSet};
use crate::constants::DOCUMENT_EXTENSION;
use crate::error::{CoreError, CoreResult};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use ward_uuid::RecordId;

/// Mirrors committed documents onto disk as one pretty-printed JSON file per document.
#[derive(Debug)]
pub(crate) struct FilePersistence {
    root: PathBuf,
}

impl FilePersistence {
    pub(crate) fn open(root: &Path) -> CoreResult<Self> {
        for collection in Collection::ALL {
            fs::create_dir_all(root.join(collection.as_str()))
                .map_err(CoreError::StorageDirCreation)?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.as_str())
    }

    fn document_path(&self, collection: Collection, id: &RecordId) -> PathBuf {
        id.sharded_file(&self.collection_dir(collection), DOCUMENT_EXTENSION)
    }

    /// Load every collection from disk.
    pub(crate) fn load(&self) -> CoreResult<StoreState> {
        let mut state = StoreState::default();
        for collection in Collection::ALL {
            self.load_collection(collection, state.collection_mut(collection))?;
        }
        Ok(state)
    }

    // Traverse <collection>/<s1>/<s2>/<id>.json. Anything unexpected is skipped.
    fn load_collection(&self, collection: Collection, target: &mut CollectionState) -> CoreResult<()> {
        let dir = self.collection_dir(collection);
        let s1_entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CoreError::FileRead(e)),
        };

        for s1 in s1_entries.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }
            let Ok(s2_entries) = fs::read_dir(&s1_path) else {
                continue;
            };
            for s2 in s2_entries.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }
                let Ok(files) = fs::read_dir(&s2_path) else {
                    continue;
                };
                for file in files.flatten() {
                    let path = file.path();
                    if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                        continue;
                    }
                    if let Some((id, body)) = read_document(&path) {
                        target.documents.insert(id, StoredDocument { version: 1, body });
                    }
                }
            }
        }
        Ok(())
    }

    /// Write one document atomically (temp file then rename).
    pub(crate) fn write_document(
        &self,
        collection: Collection,
        id: &RecordId,
        body: &Value,
    ) -> CoreResult<()> {
        let path = self.document_path(collection, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(CoreError::StorageDirCreation)?;
        }
        let encoded = serde_json::to_vec_pretty(body).map_err(CoreError::Serialization)?;
        let tmp = path.with_extension(format!("{}.tmp", DOCUMENT_EXTENSION));
        fs::write(&tmp, encoded).map_err(CoreError::FileWrite)?;
        fs::rename(&tmp, &path).map_err(CoreError::FileWrite)
    }

    pub(crate) fn remove_document(&self, collection: Collection, id: &RecordId) -> CoreResult<()> {
        match fs::remove_file(self.document_path(collection, id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::FileRemove(e)),
        }
    }

    /// Apply a write set to disk. `state` is the pre-commit state; if any file operation fails,
    /// files already touched are restored from it before the error is returned.
    pub(crate) fn apply(&self, state: &StoreState, writes: &WriteSet) -> CoreResult<()> {
        let mut applied: Vec<(Collection, &RecordId)> = Vec::with_capacity(writes.len());
        for ((collection, id), write) in writes {
            let result = match write {
                PendingWrite::Put(body) => self.write_document(*collection, id, body),
                PendingWrite::Delete => self.remove_document(*collection, id),
            };
            if let Err(err) = result {
                self.rollback(state, &applied);
                return Err(err);
            }
            applied.push((*collection, id));
        }
        Ok(())
    }

    fn rollback(&self, state: &StoreState, applied: &[(Collection, &RecordId)]) {
        for (collection, id) in applied.iter().rev() {
            let restored = match state.collection(*collection).documents.get(*id) {
                Some(previous) => self.write_document(*collection, id, &previous.body),
                None => self.remove_document(*collection, id),
            };
            if let Err(e) = restored {
                tracing::error!(%collection, %id, error = %e, "failed to restore document during rollback");
            }
        }
    }
}

fn read_document(path: &Path) -> Option<(RecordId, Value)> {
    let stem = path.file_stem().and_then(|s| s.to_str())?;
    let id = match RecordId::parse(stem) {
        Ok(id) => id,
        Err(_) => {
            tracing::warn!("skipping document with invalid id: {}", path.display());
            return None;
        }
    };
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!("failed to read document {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str::<Value>(&contents) {
        Ok(body @ Value::Object(_)) => Some((id, body)),
        Ok(_) => {
            tracing::warn!("skipping non-object document: {}", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("failed to parse document {}: {}", path.display(), e);
            None
        }
    }
}
