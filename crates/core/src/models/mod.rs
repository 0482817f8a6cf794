//! Document shapes for wards, patients and their embedded sub-records.
//!
//! Documents serialise as camelCase JSON. Temporal fields go through [`crate::temporal`].

pub mod patient;
pub mod records;
pub mod ward;

pub use patient::{
    EmergencyContact, EmergencyContactDraft, Gender, Patient, PatientDraft, PatientStatus,
    PatientUpdate, ProcedureStatus,
};
pub use records::{
    Appointment, AppointmentDraft, AppointmentStatus, AppointmentType, BiopsyResult,
    BiopsyResultDraft, NoteDraft, NoteType, PatientNote, PatientReview, ReviewDraft,
};
pub use ward::{Ward, WardDraft, WardType, WardUpdate};

use serde::{Deserialize, Deserializer};

/// Distinguishes an explicit `null` from an absent field in partial updates.
///
/// Used with `#[serde(default, deserialize_with = "deserialize_present")]` on
/// `Option<Option<T>>`: absent leaves the outer `None`, `null` yields `Some(None)`.
pub(crate) fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
