use crate::author::ActorRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ward_uuid::{RecordId, TimestampUuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    General,
    Medical,
    Nursing,
    Administrative,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientNote {
    #[schema(value_type = String)]
    pub id: TimestampUuid,
    pub content: String,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    pub created_by: String,
    pub created_by_name: String,
    #[serde(with = "crate::temporal")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub content: String,
    #[serde(rename = "type", default = "default_note_type")]
    pub note_type: NoteType,
}

fn default_note_type() -> NoteType {
    NoteType::General
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentType {
    Consultation,
    Procedure,
    FollowUp,
    Surgery,
    Therapy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[schema(value_type = String)]
    pub id: TimestampUuid,
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    pub doctor_id: String,
    pub doctor_name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "crate::temporal")]
    pub scheduled_date: DateTime<Utc>,
    /// Minutes.
    pub duration: u32,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub created_by: String,
    #[serde(with = "crate::temporal")]
    pub created_at: DateTime<Utc>,
}

/// Appointment request. The doctor defaults to the acting user when not given.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDraft {
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "crate::temporal")]
    pub scheduled_date: DateTime<Utc>,
    pub duration: u32,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BiopsyResult {
    #[schema(value_type = String)]
    pub id: TimestampUuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub result: String,
    pub performed_by: String,
    pub performed_by_name: String,
    #[serde(with = "crate::temporal")]
    pub performed_date: DateTime<Utc>,
    #[serde(with = "crate::temporal")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BiopsyResultDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub result: String,
    /// Defaults to the time the result is recorded.
    #[serde(default, with = "crate::temporal::option")]
    pub performed_date: Option<DateTime<Utc>>,
}

/// A clinical review of a patient. Text only; reviews carry no attachments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientReview {
    #[schema(value_type = String)]
    pub id: TimestampUuid,
    pub content: String,
    pub reviewed_by: String,
    pub reviewed_by_name: String,
    pub reviewed_by_role: ActorRole,
    #[serde(with = "crate::temporal")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    pub content: String,
}
