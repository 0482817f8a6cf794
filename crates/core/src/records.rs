//! # Patient Sub-Record Appenders
//!
//! Notes, appointments, biopsy results and reviews are embedded arrays inside the patient
//! document. Appends go through [`DocumentStore::append_to_array`], which performs the
//! read-modify-write under the store lock, so two clinicians adding notes at the same moment
//! both keep theirs. Appointment status changes and deletions rewrite the array and therefore
//! run as optimistic transactions: a concurrent append bumps the patient version and forces
//! a retry instead of being overwritten.

use crate::author::Actor;
use crate::error::{CoreError, CoreResult, RecordKind};
use crate::models::{
    Appointment, AppointmentDraft, AppointmentStatus, BiopsyResult, BiopsyResultDraft,
    NoteDraft, Patient, PatientNote, PatientReview, ReviewDraft,
};
use crate::store::{Collection, DocumentStore, Transaction};
use crate::validation::{
    normalise_optional, validate_appointment, validate_biopsy_result, validate_note,
    validate_review,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use ward_uuid::{RecordId, TimestampUuid};

const NOTES_FIELD: &str = "notes";
const APPOINTMENTS_FIELD: &str = "appointments";
const BIOPSY_RESULTS_FIELD: &str = "biopsyResults";
const REVIEWS_FIELD: &str = "reviews";

#[derive(Clone, Debug)]
pub struct SubRecordAppender {
    store: Arc<DocumentStore>,
}

impl SubRecordAppender {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    fn append<T: Serialize>(
        &self,
        patient_id: &RecordId,
        field: &str,
        item: &T,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let value = serde_json::to_value(item).map_err(CoreError::Serialization)?;
        self.store
            .append_to_array(Collection::Patients, patient_id, field, value, now)
    }

    /// A fresh id, later than the last entry `last` picks from the patient's current document.
    fn next_id(
        &self,
        patient_id: &RecordId,
        last: impl Fn(&Patient) -> Option<&TimestampUuid>,
    ) -> CoreResult<TimestampUuid> {
        let patient: Patient = self
            .store
            .get(patient_id)?
            .ok_or_else(|| CoreError::not_found(RecordKind::Patient, patient_id))?;
        Ok(TimestampUuid::generate(last(&patient)))
    }

    pub async fn add_note(
        &self,
        actor: &Actor,
        patient_id: &RecordId,
        draft: NoteDraft,
    ) -> CoreResult<TimestampUuid> {
        validate_note(&draft)?;
        let id = self.next_id(patient_id, |p| p.notes.last().map(|n| &n.id))?;
        let now = Utc::now();
        let note = PatientNote {
            id,
            content: draft.content.trim().to_string(),
            note_type: draft.note_type,
            created_by: actor.id().to_string(),
            created_by_name: actor.name().to_string(),
            created_at: now,
        };
        self.append(patient_id, NOTES_FIELD, &note, now)?;
        tracing::info!(patient_id = %patient_id, note_id = %note.id, actor = actor.id(), "note added");
        Ok(note.id)
    }

    /// Schedule an appointment. The doctor defaults to the acting user.
    pub async fn schedule_appointment(
        &self,
        actor: &Actor,
        patient_id: &RecordId,
        draft: AppointmentDraft,
    ) -> CoreResult<TimestampUuid> {
        validate_appointment(&draft)?;
        let id = self.next_id(patient_id, |p| p.appointments.last().map(|a| &a.id))?;
        let now = Utc::now();
        let (doctor_id, doctor_name) = match normalise_optional(draft.doctor_id) {
            Some(id) => {
                let name = normalise_optional(draft.doctor_name).unwrap_or_else(|| id.clone());
                (id, name)
            }
            None => (actor.id().to_string(), actor.name().to_string()),
        };
        let appointment = Appointment {
            id,
            patient_id: patient_id.clone(),
            doctor_id,
            doctor_name,
            title: draft.title.trim().to_string(),
            description: normalise_optional(draft.description),
            scheduled_date: draft.scheduled_date,
            duration: draft.duration,
            status: AppointmentStatus::Scheduled,
            appointment_type: draft.appointment_type,
            created_by: actor.id().to_string(),
            created_at: now,
        };
        self.append(patient_id, APPOINTMENTS_FIELD, &appointment, now)?;
        tracing::info!(
            patient_id = %patient_id,
            appointment_id = %appointment.id,
            actor = actor.id(),
            "appointment scheduled"
        );
        Ok(appointment.id)
    }

    pub async fn add_biopsy_result(
        &self,
        actor: &Actor,
        patient_id: &RecordId,
        draft: BiopsyResultDraft,
    ) -> CoreResult<TimestampUuid> {
        validate_biopsy_result(&draft)?;
        let id = self.next_id(patient_id, |p| p.biopsy_results.last().map(|r| &r.id))?;
        let now = Utc::now();
        let result = BiopsyResult {
            id,
            title: draft.title.trim().to_string(),
            description: normalise_optional(draft.description),
            result: draft.result.trim().to_string(),
            performed_by: actor.id().to_string(),
            performed_by_name: actor.name().to_string(),
            performed_date: draft.performed_date.unwrap_or(now),
            created_at: now,
        };
        self.append(patient_id, BIOPSY_RESULTS_FIELD, &result, now)?;
        tracing::info!(patient_id = %patient_id, result_id = %result.id, actor = actor.id(), "biopsy result added");
        Ok(result.id)
    }

    pub async fn add_review(
        &self,
        actor: &Actor,
        patient_id: &RecordId,
        draft: ReviewDraft,
    ) -> CoreResult<TimestampUuid> {
        validate_review(&draft)?;
        let id = self.next_id(patient_id, |p| p.reviews.last().map(|r| &r.id))?;
        let now = Utc::now();
        let review = PatientReview {
            id,
            content: draft.content.trim().to_string(),
            reviewed_by: actor.id().to_string(),
            reviewed_by_name: actor.name().to_string(),
            reviewed_by_role: actor.role,
            created_at: now,
        };
        self.append(patient_id, REVIEWS_FIELD, &review, now)?;
        tracing::info!(patient_id = %patient_id, review_id = %review.id, actor = actor.id(), "review added");
        Ok(review.id)
    }

    pub async fn update_appointment_status(
        &self,
        actor: &Actor,
        patient_id: &RecordId,
        appointment_id: &TimestampUuid,
        status: AppointmentStatus,
    ) -> CoreResult<()> {
        self.store
            .run_transaction("update_appointment_status", |tx| {
                let mut patient = load_patient(tx, patient_id)?;
                let appointment = patient
                    .appointments
                    .iter_mut()
                    .find(|a| &a.id == appointment_id)
                    .ok_or_else(|| CoreError::not_found(RecordKind::Appointment, appointment_id))?;
                appointment.status = status;
                patient.updated_at = Utc::now();
                tx.put(&patient)
            })
            .await?;

        tracing::info!(
            patient_id = %patient_id,
            appointment_id = %appointment_id,
            status = ?status,
            actor = actor.id(),
            "appointment status updated"
        );
        Ok(())
    }

    pub async fn delete_appointment(
        &self,
        actor: &Actor,
        patient_id: &RecordId,
        appointment_id: &TimestampUuid,
    ) -> CoreResult<()> {
        self.store
            .run_transaction("delete_appointment", |tx| {
                let mut patient = load_patient(tx, patient_id)?;
                let before = patient.appointments.len();
                patient.appointments.retain(|a| &a.id != appointment_id);
                if patient.appointments.len() == before {
                    return Err(CoreError::not_found(RecordKind::Appointment, appointment_id));
                }
                patient.updated_at = Utc::now();
                tx.put(&patient)
            })
            .await?;

        tracing::info!(
            patient_id = %patient_id,
            appointment_id = %appointment_id,
            actor = actor.id(),
            "appointment deleted"
        );
        Ok(())
    }
}

fn load_patient(tx: &mut Transaction<'_>, id: &RecordId) -> CoreResult<Patient> {
    tx.get::<Patient>(id)?
        .ok_or_else(|| CoreError::not_found(RecordKind::Patient, id))
}
