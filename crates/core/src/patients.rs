//! # Patient Store
//!
//! Read access and the live feed for patient records. Writes are deliberately absent: every
//! create, update and delete goes through [`crate::occupancy::OccupancyManager`] so that ward
//! occupancy moves in the same transaction as the patient.

use crate::error::CoreResult;
use crate::models::Patient;
use crate::store::{Collection, DocumentStore};
use crate::subscription::{spawn_feed, Subscription};
use std::sync::Arc;
use ward_uuid::RecordId;

pub(crate) fn newest_first(patients: &mut [Patient]) {
    patients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[derive(Clone, Debug)]
pub struct PatientStore {
    store: Arc<DocumentStore>,
}

impl PatientStore {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get_patient(&self, id: &RecordId) -> CoreResult<Option<Patient>> {
        self.store.get::<Patient>(id)
    }

    /// All decodable patients, newest first. Documents that fail to decode are logged and
    /// skipped.
    pub async fn list_patients(&self) -> Vec<Patient> {
        let mut patients = self.store.list::<Patient>();
        newest_first(&mut patients);
        patients
    }

    /// Receive the full patient list (newest first) now and after every patient change.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_patients<C>(&self, callback: C) -> Subscription
    where
        C: FnMut(Vec<Patient>) + Send + 'static,
    {
        spawn_feed(
            self.store.clone(),
            Collection::Patients,
            |store: &DocumentStore| {
                let mut patients = store.list::<Patient>();
                newest_first(&mut patients);
                Ok(patients)
            },
            callback,
        )
    }
}
