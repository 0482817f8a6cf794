//! Input validation utilities.
//!
//! Every mutating operation validates its input here before touching the store, so invalid
//! requests never start a transaction.

use crate::constants::{MAX_PATIENT_AGE, MAX_WARD_BEDS};
use crate::models::{
    AppointmentDraft, BiopsyResultDraft, EmergencyContact, EmergencyContactDraft, NoteDraft,
    PatientDraft, PatientUpdate, ReviewDraft, WardDraft, WardUpdate,
};
use crate::{CoreError, CoreResult};
use ward_uuid::RecordId;

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::Validation(message.into())
}

fn require_text(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// Trim an optional form value, treating blank as absent.
pub(crate) fn normalise_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_email(email: Option<&str>) -> CoreResult<()> {
    match email.map(str::trim) {
        Some(e) if !e.is_empty() && !e.contains('@') => {
            Err(invalid(format!("'{}' is not a valid email address", e)))
        }
        _ => Ok(()),
    }
}

fn validate_age(age: u32) -> CoreResult<()> {
    if age > MAX_PATIENT_AGE {
        return Err(invalid(format!(
            "age must be between 0 and {}",
            MAX_PATIENT_AGE
        )));
    }
    Ok(())
}

pub fn validate_ward_draft(draft: &WardDraft) -> CoreResult<()> {
    require_text("ward name", &draft.name)?;
    require_text("department", &draft.department)?;
    if draft.total_beds > MAX_WARD_BEDS {
        return Err(invalid(format!(
            "totalBeds must be between 0 and {}",
            MAX_WARD_BEDS
        )));
    }
    Ok(())
}

pub fn validate_ward_update(update: &WardUpdate) -> CoreResult<()> {
    if let Some(name) = &update.name {
        require_text("ward name", name)?;
    }
    if let Some(department) = &update.department {
        require_text("department", department)?;
    }
    Ok(())
}

/// Resolve an emergency contact entered on a form.
///
/// All fields blank yields `None`; all fields filled yields the contact.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] when only some of the fields are filled.
pub fn resolve_emergency_contact(
    draft: Option<&EmergencyContactDraft>,
) -> CoreResult<Option<EmergencyContact>> {
    let Some(draft) = draft else {
        return Ok(None);
    };
    let name = normalise_optional(draft.name.clone());
    let phone = normalise_optional(draft.phone.clone());
    let relationship = normalise_optional(draft.relationship.clone());

    match (name, phone, relationship) {
        (None, None, None) => Ok(None),
        (Some(name), Some(phone), Some(relationship)) => Ok(Some(EmergencyContact {
            name,
            phone,
            relationship,
        })),
        _ => Err(invalid(
            "emergency contact requires name, phone and relationship together",
        )),
    }
}

/// A bed number only makes sense within a ward.
pub fn validate_placement(ward_id: Option<&RecordId>, bed_number: Option<&str>) -> CoreResult<()> {
    if ward_id.is_none() && bed_number.is_some_and(|b| !b.trim().is_empty()) {
        return Err(invalid("bedNumber requires a wardId"));
    }
    Ok(())
}

/// Validate a new patient, returning the resolved emergency contact.
pub fn validate_patient_draft(draft: &PatientDraft) -> CoreResult<Option<EmergencyContact>> {
    require_text("patient name", &draft.name)?;
    require_text("phone", &draft.phone)?;
    validate_age(draft.age)?;
    validate_email(draft.email.as_deref())?;
    validate_placement(draft.ward_id.as_ref(), draft.bed_number.as_deref())?;
    resolve_emergency_contact(draft.emergency_contact.as_ref())
}

/// Validate the fields present in a partial update, returning the resolved emergency contact
/// change (outer `None` when untouched).
///
/// Rules that depend on the merged record, such as bed placement, are checked again after
/// the update is applied.
pub fn validate_patient_update(
    update: &PatientUpdate,
) -> CoreResult<Option<Option<EmergencyContact>>> {
    if let Some(name) = &update.name {
        require_text("patient name", name)?;
    }
    if let Some(phone) = &update.phone {
        require_text("phone", phone)?;
    }
    if let Some(age) = update.age {
        validate_age(age)?;
    }
    if let Some(email) = &update.email {
        validate_email(email.as_deref())?;
    }
    if let (Some(None), Some(Some(bed))) = (&update.ward_id, &update.bed_number) {
        validate_placement(None, Some(bed))?;
    }
    update
        .emergency_contact
        .as_ref()
        .map(|contact| resolve_emergency_contact(contact.as_ref()))
        .transpose()
}

pub fn validate_note(draft: &NoteDraft) -> CoreResult<()> {
    require_text("note content", &draft.content)
}

pub fn validate_appointment(draft: &AppointmentDraft) -> CoreResult<()> {
    require_text("appointment title", &draft.title)?;
    if draft.duration == 0 {
        return Err(invalid("appointment duration must be greater than zero"));
    }
    Ok(())
}

pub fn validate_biopsy_result(draft: &BiopsyResultDraft) -> CoreResult<()> {
    require_text("biopsy title", &draft.title)?;
    require_text("biopsy result", &draft.result)
}

pub fn validate_review(draft: &ReviewDraft) -> CoreResult<()> {
    require_text("review content", &draft.content)
}
