//! # Ward Store
//!
//! Record-level operations on wards. Occupancy is never written here: `occupiedBeds` only
//! changes as a side effect of patient operations in [`crate::occupancy`]. Direct edits go
//! through a transaction so they cannot overwrite a concurrent occupancy change.

use crate::error::{CoreError, CoreResult, RecordKind};
use crate::models::{Patient, Ward, WardDraft, WardUpdate};
use crate::store::{Collection, DocumentStore};
use crate::subscription::{spawn_feed, Subscription};
use crate::validation::{validate_ward_draft, validate_ward_update};
use chrono::Utc;
use std::sync::Arc;
use ward_uuid::RecordId;

pub(crate) fn newest_first(wards: &mut [Ward]) {
    wards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[derive(Clone, Debug)]
pub struct WardStore {
    store: Arc<DocumentStore>,
}

impl WardStore {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Create a ward with zero occupancy and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for a blank name or department or an out-of-range bed
    /// count.
    pub async fn create_ward(&self, draft: WardDraft) -> CoreResult<RecordId> {
        validate_ward_draft(&draft)?;
        let created_at = Utc::now();

        let id = self
            .store
            .run_transaction("create_ward", |tx| {
                let id = tx.allocate_id(Collection::Wards)?;
                let ward = Ward {
                    id: id.clone(),
                    name: draft.name.trim().to_string(),
                    department: draft.department.trim().to_string(),
                    ward_type: draft.ward_type,
                    total_beds: draft.total_beds,
                    occupied_beds: 0,
                    created_at,
                    updated_at: None,
                };
                tx.put(&ward)?;
                Ok(id)
            })
            .await?;

        tracing::info!(ward_id = %id, total_beds = draft.total_beds, "ward created");
        Ok(id)
    }

    /// All wards, newest first.
    pub async fn list_wards(&self) -> Vec<Ward> {
        let mut wards = self.store.list::<Ward>();
        newest_first(&mut wards);
        wards
    }

    pub async fn get_ward(&self, id: &RecordId) -> CoreResult<Option<Ward>> {
        self.store.get::<Ward>(id)
    }

    /// Apply direct edits to name, department or ward type.
    pub async fn update_ward(&self, id: &RecordId, update: WardUpdate) -> CoreResult<()> {
        validate_ward_update(&update)?;
        if update.is_empty() {
            return match self.store.get::<Ward>(id)? {
                Some(_) => Ok(()),
                None => Err(CoreError::not_found(RecordKind::Ward, id)),
            };
        }

        self.store
            .run_transaction("update_ward", |tx| {
                let mut ward: Ward = tx
                    .get(id)?
                    .ok_or_else(|| CoreError::not_found(RecordKind::Ward, id))?;
                if let Some(name) = &update.name {
                    ward.name = name.trim().to_string();
                }
                if let Some(department) = &update.department {
                    ward.department = department.trim().to_string();
                }
                if let Some(ward_type) = update.ward_type {
                    ward.ward_type = ward_type;
                }
                ward.updated_at = Some(Utc::now());
                tx.put(&ward)
            })
            .await?;

        tracing::info!(ward_id = %id, "ward updated");
        Ok(())
    }

    /// Delete a ward that has no admitted patients.
    ///
    /// The patient scan is part of the transaction, so an admission committed concurrently
    /// forces a retry and is then seen by the guard.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the ward does not exist and [`CoreError::Conflict`]
    /// if any admitted patient is assigned to it.
    pub async fn delete_ward(&self, id: &RecordId) -> CoreResult<()> {
        self.store
            .run_transaction("delete_ward", |tx| {
                let ward: Ward = tx
                    .get(id)?
                    .ok_or_else(|| CoreError::not_found(RecordKind::Ward, id))?;
                let admitted = tx
                    .scan::<Patient>()
                    .iter()
                    .filter(|p| p.occupied_ward() == Some(id))
                    .count();
                if admitted > 0 {
                    return Err(CoreError::Conflict(format!(
                        "{} still has {} admitted patient(s)",
                        ward.name, admitted
                    )));
                }
                tx.delete::<Ward>(id);
                Ok(())
            })
            .await?;

        tracing::info!(ward_id = %id, "ward deleted");
        Ok(())
    }

    /// Receive the full ward list (newest first) now and after every ward change.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_wards<C>(&self, callback: C) -> Subscription
    where
        C: FnMut(Vec<Ward>) + Send + 'static,
    {
        spawn_feed(
            self.store.clone(),
            Collection::Wards,
            |store: &DocumentStore| {
                let mut wards = store.list::<Ward>();
                newest_first(&mut wards);
                Ok(wards)
            },
            callback,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::models::{Gender, PatientStatus, WardType};
    use tokio::sync::mpsc;

    fn wards() -> (Arc<DocumentStore>, WardStore) {
        let store = Arc::new(DocumentStore::in_memory(Arc::new(CoreConfig::in_memory())));
        (store.clone(), WardStore::new(store))
    }

    fn draft(name: &str, total_beds: u32) -> WardDraft {
        WardDraft {
            name: name.into(),
            department: "Medicine".into(),
            ward_type: WardType::General,
            total_beds,
        }
    }

    fn patient_in(ward_id: &RecordId, status: PatientStatus) -> Patient {
        let now = Utc::now();
        Patient {
            id: RecordId::new(),
            name: "Grace".into(),
            age: 70,
            gender: Gender::Female,
            phone: "0700".into(),
            email: None,
            address: "2 Road".into(),
            emergency_contact: None,
            status,
            ward_id: Some(ward_id.clone()),
            bed_number: None,
            diagnosis: "Fracture".into(),
            procedure: None,
            procedure_status: None,
            procedure_date: None,
            consultant_id: None,
            consultant_name: None,
            doctor_id: None,
            doctor_name: None,
            admission_date: now,
            discharge_date: None,
            notes: vec![],
            appointments: vec![],
            biopsy_results: vec![],
            reviews: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_starts_with_zero_occupancy() {
        let (_, wards) = wards();
        let id = wards.create_ward(draft(" Rowan ", 6)).await.unwrap();
        let ward = wards.get_ward(&id).await.unwrap().unwrap();
        assert_eq!(ward.name, "Rowan");
        assert_eq!(ward.occupied_beds, 0);
        assert_eq!(ward.total_beds, 6);
    }

    #[tokio::test]
    async fn create_rejects_blank_department() {
        let (_, wards) = wards();
        let mut d = draft("Rowan", 6);
        d.department = "".into();
        assert!(matches!(
            wards.create_ward(d).await,
            Err(CoreError::Validation(_))
        ));
        assert!(wards.list_wards().await.is_empty());
    }

    #[tokio::test]
    async fn update_changes_only_descriptive_fields() {
        let (_, wards) = wards();
        let id = wards.create_ward(draft("Rowan", 6)).await.unwrap();
        wards
            .update_ward(
                &id,
                WardUpdate {
                    name: Some("Rowan East".into()),
                    ward_type: Some(WardType::Icu),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ward = wards.get_ward(&id).await.unwrap().unwrap();
        assert_eq!(ward.name, "Rowan East");
        assert_eq!(ward.ward_type, WardType::Icu);
        assert_eq!(ward.department, "Medicine");
        assert!(ward.updated_at.is_some());
    }

    #[tokio::test]
    async fn update_missing_ward_is_not_found() {
        let (_, wards) = wards();
        let err = wards
            .update_ward(&RecordId::new(), WardUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_is_blocked_by_admitted_patients() {
        let (store, wards) = wards();
        let id = wards.create_ward(draft("Rowan", 6)).await.unwrap();
        let admitted = patient_in(&id, PatientStatus::Admitted);
        store
            .run_transaction("seed", |tx| tx.put(&admitted))
            .await
            .unwrap();

        let err = wards.delete_ward(&id).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert!(wards.get_ward(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_ignores_discharged_patients() {
        let (store, wards) = wards();
        let id = wards.create_ward(draft("Rowan", 6)).await.unwrap();
        let discharged = patient_in(&id, PatientStatus::Discharged);
        store
            .run_transaction("seed", |tx| tx.put(&discharged))
            .await
            .unwrap();

        wards.delete_ward(&id).await.unwrap();
        assert!(wards.get_ward(&id).await.unwrap().is_none());

        let err = wards.delete_ward(&id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn subscription_orders_newest_first() {
        let (_, wards) = wards();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = wards.subscribe_wards(move |list| {
            let _ = tx.send(list.into_iter().map(|w| w.name).collect::<Vec<_>>());
        });
        assert!(rx.recv().await.unwrap().is_empty());

        wards.create_ward(draft("First", 2)).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), vec!["First"]);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        wards.create_ward(draft("Second", 2)).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), vec!["Second", "First"]);
    }
}
