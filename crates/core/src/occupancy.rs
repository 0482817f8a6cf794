//! # Occupancy-Consistent Transaction Manager
//!
//! Every patient create, update and delete runs as one optimistic transaction covering the
//! patient document and up to two ward documents. The invariant maintained here is:
//!
//! > for every ward `W`, `W.occupiedBeds` equals the number of patients with
//! > `wardId == W.id` and `status == admitted`.
//!
//! The capacity check and the increment are evaluated against the versions read inside the
//! transaction. If another operation commits a change to the same ward first, the commit is
//! rejected and the whole operation re-runs, so two admissions can never both take the last
//! bed. A failed capacity check on a transfer aborts the release from the old ward too.
//!
//! Decrements are floored at zero. A ward that is already at zero when a patient leaves it
//! indicates drift from outside this module; it is logged and left as is.

use crate::author::Actor;
use crate::error::{CoreError, CoreResult, RecordKind};
use crate::models::{
    EmergencyContact, Patient, PatientDraft, PatientStatus, PatientUpdate, ProcedureStatus, Ward,
};
use crate::store::{Collection, DocumentStore, Transaction};
use crate::validation::{
    normalise_optional, validate_patient_draft, validate_patient_update, validate_placement,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use ward_uuid::RecordId;

/// Take one bed in `ward`.
///
/// # Errors
///
/// Returns [`CoreError::Capacity`] if the ward has no free bed.
pub(crate) fn admit_into(ward: &mut Ward) -> CoreResult<()> {
    match ward.occupied_beds.checked_add(1) {
        Some(next) if next <= ward.total_beds => {
            ward.occupied_beds = next;
            Ok(())
        }
        _ => Err(CoreError::Capacity(format!(
            "{} is at full capacity ({}/{} beds occupied)",
            ward.name, ward.total_beds, ward.total_beds
        ))),
    }
}

/// Free one bed in `ward`, never going below zero.
pub(crate) fn release_from(ward: &mut Ward) {
    if ward.occupied_beds == 0 {
        tracing::warn!(
            ward_id = %ward.id,
            ward = %ward.name,
            "occupiedBeds already zero on release, clamping"
        );
        return;
    }
    ward.occupied_beds -= 1;
}

fn load_ward(tx: &mut Transaction<'_>, id: &RecordId) -> CoreResult<Ward> {
    tx.get::<Ward>(id)?
        .ok_or_else(|| CoreError::not_found(RecordKind::Ward, id))
}

/// Move the patient's bed from `from` to `to` (either may be `None`).
fn move_occupancy(
    tx: &mut Transaction<'_>,
    from: Option<&RecordId>,
    to: Option<&RecordId>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if from == to {
        return Ok(());
    }

    if let Some(old_id) = from {
        match tx.get::<Ward>(old_id)? {
            Some(mut old_ward) => {
                release_from(&mut old_ward);
                old_ward.updated_at = Some(now);
                tx.put(&old_ward)?;
            }
            None => {
                tracing::warn!(ward_id = %old_id, "previous ward no longer exists, nothing to release");
            }
        }
    }

    if let Some(new_id) = to {
        let mut new_ward = load_ward(tx, new_id)?;
        admit_into(&mut new_ward)?;
        new_ward.updated_at = Some(now);
        tx.put(&new_ward)?;
    }

    tracing::debug!(
        from = ?from.map(|id| id.to_string()),
        to = ?to.map(|id| id.to_string()),
        "occupancy moved"
    );
    Ok(())
}

/// Merge `update` into `patient` and apply the derived-field rules.
fn apply_update(
    patient: &mut Patient,
    update: &PatientUpdate,
    emergency_contact: Option<Option<EmergencyContact>>,
    actor: &Actor,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    let previous_status = patient.status;
    let had_procedure = patient.procedure.is_some();
    let previous_procedure_status = patient.procedure_status;

    if let Some(name) = &update.name {
        patient.name = name.trim().to_string();
    }
    if let Some(age) = update.age {
        patient.age = age;
    }
    if let Some(gender) = update.gender {
        patient.gender = gender;
    }
    if let Some(phone) = &update.phone {
        patient.phone = phone.trim().to_string();
    }
    if let Some(email) = &update.email {
        patient.email = normalise_optional(email.clone());
    }
    if let Some(address) = &update.address {
        patient.address = address.trim().to_string();
    }
    if let Some(contact) = emergency_contact {
        patient.emergency_contact = contact;
    }
    if let Some(status) = update.status {
        patient.status = status;
    }
    if let Some(ward_id) = &update.ward_id {
        patient.ward_id = ward_id.clone();
    }
    if let Some(bed_number) = &update.bed_number {
        patient.bed_number = normalise_optional(bed_number.clone());
    }
    if let Some(diagnosis) = &update.diagnosis {
        patient.diagnosis = diagnosis.trim().to_string();
    }
    if let Some(procedure) = &update.procedure {
        patient.procedure = normalise_optional(procedure.clone());
    }
    if let Some(procedure_status) = update.procedure_status {
        patient.procedure_status = Some(procedure_status);
    }
    if let Some(doctor_id) = &update.doctor_id {
        patient.doctor_id = normalise_optional(Some(doctor_id.clone()));
    }
    if let Some(doctor_name) = &update.doctor_name {
        patient.doctor_name = normalise_optional(Some(doctor_name.clone()));
    }
    if let Some(admission_date) = update.admission_date {
        patient.admission_date = admission_date;
    }

    validate_placement(patient.ward_id.as_ref(), patient.bed_number.as_deref())?;

    match (had_procedure, patient.procedure.is_some()) {
        (false, true) if update.procedure_status.is_none() => {
            patient.procedure_status = Some(ProcedureStatus::Pending);
        }
        (true, false) => {
            patient.procedure_status = None;
            patient.procedure_date = None;
        }
        _ => {}
    }

    if patient.procedure_status == Some(ProcedureStatus::Completed)
        && previous_procedure_status != Some(ProcedureStatus::Completed)
    {
        patient.procedure_date = Some(now);
    }

    if patient.status != previous_status {
        if patient.status == PatientStatus::Discharged {
            patient.discharge_date = Some(now);
        } else if previous_status == PatientStatus::Discharged {
            patient.discharge_date = None;
        }

        if patient.status == PatientStatus::Done && actor.role.is_clinician_of_record() {
            patient.consultant_id = Some(actor.id().to_string());
            patient.consultant_name = Some(actor.name().to_string());
        }
    }

    patient.updated_at = now;
    Ok(())
}

/// Coordinates patient writes with ward occupancy.
#[derive(Clone, Debug)]
pub struct OccupancyManager {
    store: Arc<DocumentStore>,
}

impl OccupancyManager {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Register a patient, taking a bed if they are admitted to a ward.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Validation`] for invalid input, before any store access.
    /// - [`CoreError::NotFound`] if the patient is admitted to a ward that does not exist.
    /// - [`CoreError::Capacity`] if an admission would exceed the ward's beds.
    /// - [`CoreError::Conflict`] if the transaction could not commit in time.
    pub async fn create_patient(&self, actor: &Actor, draft: PatientDraft) -> CoreResult<RecordId> {
        let emergency_contact = validate_patient_draft(&draft)?;

        let mut doctor_id = normalise_optional(draft.doctor_id.clone());
        let mut doctor_name = normalise_optional(draft.doctor_name.clone());
        if doctor_id.is_none() && actor.role.is_clinician_of_record() {
            doctor_id = Some(actor.id().to_string());
            doctor_name = Some(actor.name().to_string());
        }
        let procedure = normalise_optional(draft.procedure.clone());
        let procedure_status = procedure.as_ref().map(|_| ProcedureStatus::Pending);

        let id = self
            .store
            .run_transaction("create_patient", |tx| {
                let now = Utc::now();

                if let Some(ward_id) = draft.ward_id.as_ref().filter(|_| draft.status.occupies_bed()) {
                    let mut ward = load_ward(tx, ward_id)?;
                    admit_into(&mut ward)?;
                    ward.updated_at = Some(now);
                    tx.put(&ward)?;
                }

                let id = tx.allocate_id(Collection::Patients)?;
                let patient = Patient {
                    id: id.clone(),
                    name: draft.name.trim().to_string(),
                    age: draft.age,
                    gender: draft.gender,
                    phone: draft.phone.trim().to_string(),
                    email: normalise_optional(draft.email.clone()),
                    address: draft.address.trim().to_string(),
                    emergency_contact: emergency_contact.clone(),
                    status: draft.status,
                    ward_id: draft.ward_id.clone(),
                    bed_number: normalise_optional(draft.bed_number.clone()),
                    diagnosis: draft.diagnosis.trim().to_string(),
                    procedure: procedure.clone(),
                    procedure_status,
                    procedure_date: None,
                    consultant_id: None,
                    consultant_name: None,
                    doctor_id: doctor_id.clone(),
                    doctor_name: doctor_name.clone(),
                    admission_date: draft.admission_date.unwrap_or(now),
                    discharge_date: (draft.status == PatientStatus::Discharged).then_some(now),
                    notes: Vec::new(),
                    appointments: Vec::new(),
                    biopsy_results: Vec::new(),
                    reviews: Vec::new(),
                    created_at: now,
                    updated_at: now,
                };
                tx.put(&patient)?;
                Ok(id)
            })
            .await?;

        tracing::info!(
            patient_id = %id,
            status = %draft.status,
            ward_id = ?draft.ward_id.as_ref().map(|w| w.to_string()),
            actor = actor.id(),
            "patient created"
        );
        Ok(id)
    }

    /// Apply a partial update, moving occupancy when the ward or status changes.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Validation`] for invalid input.
    /// - [`CoreError::NotFound`] if the patient, or the ward they are now admitted to, does not
    ///   exist.
    /// - [`CoreError::Capacity`] if the new ward is full. Nothing is written, including the
    ///   release from the old ward.
    /// - [`CoreError::Conflict`] if the transaction could not commit in time.
    pub async fn update_patient(
        &self,
        actor: &Actor,
        id: &RecordId,
        update: PatientUpdate,
    ) -> CoreResult<()> {
        let emergency_contact = validate_patient_update(&update)?;

        self.store
            .run_transaction("update_patient", |tx| {
                let now = Utc::now();
                let current: Patient = tx
                    .get(id)?
                    .ok_or_else(|| CoreError::not_found(RecordKind::Patient, id))?;

                let mut next = current.clone();
                apply_update(&mut next, &update, emergency_contact.clone(), actor, now)?;

                let from = current.occupied_ward();
                let to = next.occupied_ward();
                if from != to {
                    move_occupancy(tx, from, to, now)?;
                }

                tx.put(&next)
            })
            .await?;

        tracing::info!(
            patient_id = %id,
            occupancy_touched = update.touches_occupancy(),
            actor = actor.id(),
            "patient updated"
        );
        Ok(())
    }

    /// Delete a patient, releasing their bed if they were admitted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the patient does not exist.
    pub async fn delete_patient(&self, actor: &Actor, id: &RecordId) -> CoreResult<()> {
        self.store
            .run_transaction("delete_patient", |tx| {
                let patient: Patient = tx
                    .get(id)?
                    .ok_or_else(|| CoreError::not_found(RecordKind::Patient, id))?;
                move_occupancy(tx, patient.occupied_ward(), None, Utc::now())?;
                tx.delete::<Patient>(id);
                Ok(())
            })
            .await?;

        tracing::info!(patient_id = %id, actor = actor.id(), "patient deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::author::ActorRole;
    use crate::config::CoreConfig;
    use crate::models::{Gender, WardDraft, WardType};
    use crate::wards::WardStore;
    use std::collections::HashMap;
    use std::time::Duration;

    struct Harness {
        store: Arc<DocumentStore>,
        wards: WardStore,
        occupancy: OccupancyManager,
        doctor: Actor,
        nurse: Actor,
    }

    fn harness() -> Harness {
        let cfg = CoreConfig::new(None, 200, Duration::from_secs(20))
            .unwrap()
            .with_retry_backoff(Duration::from_millis(1));
        let store = Arc::new(DocumentStore::in_memory(Arc::new(cfg)));
        Harness {
            wards: WardStore::new(store.clone()),
            occupancy: OccupancyManager::new(store.clone()),
            store,
            doctor: Actor::new("doc-1", "Dr Quinn", ActorRole::Doctor).unwrap(),
            nurse: Actor::new("nurse-1", "Sam Nurse", ActorRole::Nurse).unwrap(),
        }
    }

    impl Harness {
        async fn ward(&self, name: &str, total_beds: u32) -> RecordId {
            self.wards
                .create_ward(WardDraft {
                    name: name.into(),
                    department: "Medicine".into(),
                    ward_type: WardType::General,
                    total_beds,
                })
                .await
                .unwrap()
        }

        async fn occupied(&self, ward_id: &RecordId) -> u32 {
            self.wards
                .get_ward(ward_id)
                .await
                .unwrap()
                .unwrap()
                .occupied_beds
        }

        fn patient(&self, id: &RecordId) -> Patient {
            self.store.get::<Patient>(id).unwrap().unwrap()
        }

        fn assert_invariant(&self) {
            let snapshot = self.store.snapshot();
            let mut actual: HashMap<RecordId, u32> = HashMap::new();
            for patient in &snapshot.patients {
                if let Some(ward_id) = patient.occupied_ward() {
                    *actual.entry(ward_id.clone()).or_default() += 1;
                }
            }
            for ward in &snapshot.wards {
                let expected = actual.get(&ward.id).copied().unwrap_or(0);
                assert_eq!(
                    ward.occupied_beds, expected,
                    "ward {} records {} but has {} admitted",
                    ward.name, ward.occupied_beds, expected
                );
                assert!(ward.occupied_beds <= ward.total_beds);
            }
        }
    }

    fn draft(status: PatientStatus, ward_id: Option<&RecordId>) -> PatientDraft {
        PatientDraft {
            name: "Ada Lovelace".into(),
            age: 36,
            gender: Gender::Female,
            phone: "0700 000000".into(),
            email: None,
            address: "1 Lane".into(),
            emergency_contact: None,
            status,
            ward_id: ward_id.cloned(),
            bed_number: None,
            diagnosis: "Pneumonia".into(),
            procedure: None,
            doctor_id: None,
            doctor_name: None,
            admission_date: None,
        }
    }

    fn status(status: PatientStatus) -> PatientUpdate {
        PatientUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn single_bed_ward_admit_reject_discharge_readmit() {
        let h = harness();
        let a = h.ward("A", 1).await;

        let p1 = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&a)))
            .await
            .unwrap();
        assert_eq!(h.occupied(&a).await, 1);

        let p2 = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Stable, Some(&a)))
            .await
            .unwrap();
        let err = h
            .occupancy
            .update_patient(&h.nurse, &p2, status(PatientStatus::Admitted))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "A is at full capacity (1/1 beds occupied)");
        assert_eq!(h.occupied(&a).await, 1);

        h.occupancy
            .update_patient(&h.nurse, &p1, status(PatientStatus::Discharged))
            .await
            .unwrap();
        assert_eq!(h.occupied(&a).await, 0);
        assert!(h.patient(&p1).discharge_date.is_some());

        h.occupancy
            .update_patient(&h.nurse, &p2, status(PatientStatus::Admitted))
            .await
            .unwrap();
        assert_eq!(h.occupied(&a).await, 1);
        h.assert_invariant();
    }

    #[tokio::test]
    async fn create_in_full_ward_is_rejected_without_writes() {
        let h = harness();
        let ward = h.ward("Oak", 2).await;
        for _ in 0..2 {
            h.occupancy
                .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&ward)))
                .await
                .unwrap();
        }

        let err = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&ward)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Capacity(_)));
        assert_eq!(h.occupied(&ward).await, 2);
        assert_eq!(h.store.list::<Patient>().len(), 2);
    }

    #[tokio::test]
    async fn transfer_into_full_ward_leaves_both_wards_untouched() {
        let h = harness();
        let a = h.ward("A", 3).await;
        let b = h.ward("B", 1).await;
        let mover = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&a)))
            .await
            .unwrap();
        h.occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&b)))
            .await
            .unwrap();

        let err = h
            .occupancy
            .update_patient(
                &h.nurse,
                &mover,
                PatientUpdate {
                    ward_id: Some(Some(b.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Capacity(_)));
        assert_eq!(h.occupied(&a).await, 1);
        assert_eq!(h.occupied(&b).await, 1);
        assert_eq!(h.patient(&mover).ward_id, Some(a));
    }

    #[tokio::test]
    async fn transfer_moves_one_bed() {
        let h = harness();
        let a = h.ward("A", 3).await;
        let b = h.ward("B", 3).await;
        let p = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&a)))
            .await
            .unwrap();

        h.occupancy
            .update_patient(
                &h.nurse,
                &p,
                PatientUpdate {
                    ward_id: Some(Some(b.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(h.occupied(&a).await, 0);
        assert_eq!(h.occupied(&b).await, 1);
        h.assert_invariant();
    }

    #[tokio::test]
    async fn unrelated_field_updates_do_not_touch_occupancy() {
        let h = harness();
        let a = h.ward("A", 3).await;
        let p = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&a)))
            .await
            .unwrap();
        let before = h.wards.get_ward(&a).await.unwrap().unwrap();

        h.occupancy
            .update_patient(
                &h.nurse,
                &p,
                PatientUpdate {
                    diagnosis: Some("Recovering".into()),
                    phone: Some("0711".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let after = h.wards.get_ward(&a).await.unwrap().unwrap();
        assert_eq!(before, after);
        assert_eq!(h.patient(&p).diagnosis, "Recovering");
    }

    #[tokio::test]
    async fn procedure_status_follows_procedure_lifecycle() {
        let h = harness();
        let mut d = draft(PatientStatus::Stable, None);
        d.procedure = Some("Colonoscopy".into());
        let p = h.occupancy.create_patient(&h.nurse, d).await.unwrap();
        assert_eq!(h.patient(&p).procedure_status, Some(ProcedureStatus::Pending));

        let completed = PatientUpdate {
            procedure_status: Some(ProcedureStatus::Completed),
            ..Default::default()
        };
        h.occupancy
            .update_patient(&h.nurse, &p, completed.clone())
            .await
            .unwrap();
        let first = h.patient(&p).procedure_date.expect("procedure date set");

        tokio::time::sleep(Duration::from_millis(5)).await;
        h.occupancy
            .update_patient(&h.nurse, &p, completed)
            .await
            .unwrap();
        assert_eq!(h.patient(&p).procedure_date, Some(first));

        h.occupancy
            .update_patient(
                &h.nurse,
                &p,
                PatientUpdate {
                    procedure: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let cleared = h.patient(&p);
        assert_eq!(cleared.procedure, None);
        assert_eq!(cleared.procedure_status, None);
        assert_eq!(cleared.procedure_date, None);
    }

    #[tokio::test]
    async fn setting_a_procedure_later_marks_it_pending() {
        let h = harness();
        let p = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Stable, None))
            .await
            .unwrap();
        assert_eq!(h.patient(&p).procedure_status, None);

        h.occupancy
            .update_patient(
                &h.nurse,
                &p,
                PatientUpdate {
                    procedure: Some(Some("Biopsy".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(h.patient(&p).procedure_status, Some(ProcedureStatus::Pending));
    }

    #[tokio::test]
    async fn deleting_admitted_patient_frees_a_bed() {
        let h = harness();
        let w = h.ward("W", 5).await;
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(
                h.occupancy
                    .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&w)))
                    .await
                    .unwrap(),
            );
        }
        let discharged = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Discharged, Some(&w)))
            .await
            .unwrap();
        assert_eq!(h.occupied(&w).await, 3);
        assert!(h.patient(&discharged).discharge_date.is_some());

        h.occupancy.delete_patient(&h.nurse, &ids[0]).await.unwrap();
        assert_eq!(h.occupied(&w).await, 2);

        h.occupancy
            .delete_patient(&h.nurse, &discharged)
            .await
            .unwrap();
        assert_eq!(h.occupied(&w).await, 2);

        let err = h
            .occupancy
            .delete_patient(&h.nurse, &ids[0])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                kind: RecordKind::Patient,
                ..
            }
        ));
        h.assert_invariant();
    }

    #[tokio::test]
    async fn release_is_floored_at_zero_on_drifted_wards() {
        let h = harness();
        let w = h.ward("Drift", 2).await;
        let p = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&w)))
            .await
            .unwrap();

        // Simulate an external writer zeroing the counter.
        h.store
            .run_transaction("drift", |tx| {
                let mut ward: Ward = tx.get(&w)?.unwrap();
                ward.occupied_beds = 0;
                tx.put(&ward)
            })
            .await
            .unwrap();

        h.occupancy.delete_patient(&h.nurse, &p).await.unwrap();
        assert_eq!(h.occupied(&w).await, 0);
    }

    #[tokio::test]
    async fn missing_ward_only_matters_for_admissions() {
        let h = harness();
        let ghost = RecordId::new();
        let err = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&ghost)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                kind: RecordKind::Ward,
                ..
            }
        ));
        assert!(h.store.list::<Patient>().is_empty());

        for s in [PatientStatus::Stable, PatientStatus::Discharged] {
            let id = h
                .occupancy
                .create_patient(&h.nurse, draft(s, Some(&ghost)))
                .await
                .unwrap();
            assert_eq!(h.patient(&id).ward_id, Some(ghost.clone()));
        }

        let stable = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Stable, None))
            .await
            .unwrap();
        let other_ghost = RecordId::new();
        h.occupancy
            .update_patient(
                &h.nurse,
                &stable,
                PatientUpdate {
                    ward_id: Some(Some(other_ghost.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(h.patient(&stable).ward_id, Some(other_ghost));

        let err = h
            .occupancy
            .update_patient(&h.nurse, &stable, status(PatientStatus::Admitted))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                kind: RecordKind::Ward,
                ..
            }
        ));
        assert_eq!(h.patient(&stable).status, PatientStatus::Stable);
    }

    #[tokio::test]
    async fn zero_bed_ward_rejects_every_admission() {
        let h = harness();
        let w = h.ward("Closed", 0).await;
        let err = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&w)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Capacity(_)));
        assert_eq!(
            err.to_string(),
            "Closed is at full capacity (0/0 beds occupied)"
        );
        assert_eq!(h.occupied(&w).await, 0);
        assert!(h.store.list::<Patient>().is_empty());
        h.assert_invariant();
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_before_any_write() {
        let h = harness();
        let mut d = draft(PatientStatus::Stable, None);
        d.bed_number = Some("12".into());
        let err = h.occupancy.create_patient(&h.nurse, d).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(h.store.list::<Patient>().is_empty());
    }

    #[tokio::test]
    async fn clinicians_become_doctor_and_consultant_of_record() {
        let h = harness();
        let p = h
            .occupancy
            .create_patient(&h.doctor, draft(PatientStatus::Stable, None))
            .await
            .unwrap();
        let created = h.patient(&p);
        assert_eq!(created.doctor_id.as_deref(), Some("doc-1"));
        assert_eq!(created.doctor_name.as_deref(), Some("Dr Quinn"));

        let by_nurse = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Stable, None))
            .await
            .unwrap();
        assert_eq!(h.patient(&by_nurse).doctor_id, None);

        h.occupancy
            .update_patient(&h.nurse, &by_nurse, status(PatientStatus::Done))
            .await
            .unwrap();
        assert_eq!(h.patient(&by_nurse).consultant_id, None);

        h.occupancy
            .update_patient(&h.doctor, &p, status(PatientStatus::Done))
            .await
            .unwrap();
        assert_eq!(h.patient(&p).consultant_id.as_deref(), Some("doc-1"));
    }

    #[tokio::test]
    async fn leaving_discharged_clears_discharge_date() {
        let h = harness();
        let w = h.ward("W", 2).await;
        let p = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Discharged, Some(&w)))
            .await
            .unwrap();
        assert_eq!(h.occupied(&w).await, 0);

        h.occupancy
            .update_patient(&h.nurse, &p, status(PatientStatus::Admitted))
            .await
            .unwrap();
        let readmitted = h.patient(&p);
        assert_eq!(readmitted.discharge_date, None);
        assert_eq!(h.occupied(&w).await, 1);
    }

    #[tokio::test]
    async fn discharged_patient_readmitted_to_another_ward() {
        let h = harness();
        let a = h.ward("A", 2).await;
        let b = h.ward("B", 2).await;
        let p = h
            .occupancy
            .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&a)))
            .await
            .unwrap();
        h.occupancy
            .update_patient(&h.nurse, &p, status(PatientStatus::Discharged))
            .await
            .unwrap();
        assert!(h.patient(&p).discharge_date.is_some());
        assert_eq!(h.occupied(&a).await, 0);

        h.occupancy
            .update_patient(
                &h.nurse,
                &p,
                PatientUpdate {
                    status: Some(PatientStatus::Admitted),
                    ward_id: Some(Some(b.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let readmitted = h.patient(&p);
        assert_eq!(readmitted.ward_id, Some(b.clone()));
        assert_eq!(readmitted.status, PatientStatus::Admitted);
        assert_eq!(readmitted.discharge_date, None);
        assert_eq!(h.occupied(&a).await, 0);
        assert_eq!(h.occupied(&b).await, 1);
        h.assert_invariant();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_admissions_never_overfill_a_ward() {
        let h = Arc::new(harness());
        let ward = h.ward("Contended", 5).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let h = h.clone();
            let ward = ward.clone();
            handles.push(tokio::spawn(async move {
                h.occupancy
                    .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(&ward)))
                    .await
            }));
        }

        let mut admitted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(CoreError::Capacity(_)) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(admitted, 5);
        assert_eq!(rejected, 15);
        assert_eq!(h.occupied(&ward).await, 5);
        h.assert_invariant();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transfers_and_discharges_preserve_invariant() {
        let h = Arc::new(harness());
        let a = h.ward("A", 10).await;
        let b = h.ward("B", 10).await;

        let mut patients = Vec::new();
        for i in 0..8 {
            let target = if i % 2 == 0 { &a } else { &b };
            patients.push(
                h.occupancy
                    .create_patient(&h.nurse, draft(PatientStatus::Admitted, Some(target)))
                    .await
                    .unwrap(),
            );
        }

        let mut handles = Vec::new();
        for (i, patient) in patients.into_iter().enumerate() {
            let h = h.clone();
            let (a, b) = (a.clone(), b.clone());
            handles.push(tokio::spawn(async move {
                let update = match i % 4 {
                    0 => PatientUpdate {
                        ward_id: Some(Some(b)),
                        ..Default::default()
                    },
                    1 => PatientUpdate {
                        ward_id: Some(Some(a)),
                        ..Default::default()
                    },
                    2 => status(PatientStatus::Discharged),
                    _ => PatientUpdate {
                        diagnosis: Some("Reviewed".into()),
                        ..Default::default()
                    },
                };
                h.occupancy.update_patient(&h.nurse, &patient, update).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        h.assert_invariant();
        assert_eq!(h.occupied(&a).await + h.occupied(&b).await, 6);
    }
}
