use super::deserialize_present;
use super::records::{Appointment, BiopsyResult, PatientNote, PatientReview};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ward_uuid::RecordId;

/// Patient status. Only [`PatientStatus::Admitted`] occupies a ward bed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PatientStatus {
    Admitted,
    Discharged,
    InTreatment,
    Critical,
    Stable,
    Review,
    Procedure,
    Done,
}

impl PatientStatus {
    pub const ALL: [PatientStatus; 8] = [
        PatientStatus::Admitted,
        PatientStatus::Discharged,
        PatientStatus::InTreatment,
        PatientStatus::Critical,
        PatientStatus::Stable,
        PatientStatus::Review,
        PatientStatus::Procedure,
        PatientStatus::Done,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PatientStatus::Admitted => "admitted",
            PatientStatus::Discharged => "discharged",
            PatientStatus::InTreatment => "in-treatment",
            PatientStatus::Critical => "critical",
            PatientStatus::Stable => "stable",
            PatientStatus::Review => "review",
            PatientStatus::Procedure => "procedure",
            PatientStatus::Done => "done",
        }
    }

    pub const fn occupies_bed(self) -> bool {
        matches!(self, PatientStatus::Admitted)
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatientStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admitted" => Ok(PatientStatus::Admitted),
            "discharged" => Ok(PatientStatus::Discharged),
            "in-treatment" => Ok(PatientStatus::InTreatment),
            "critical" => Ok(PatientStatus::Critical),
            "stable" => Ok(PatientStatus::Stable),
            "review" => Ok(PatientStatus::Review),
            "procedure" => Ok(PatientStatus::Procedure),
            "done" => Ok(PatientStatus::Done),
            other => Err(CoreError::Validation(format!(
                "unknown patient status '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureStatus {
    Pending,
    Reviewed,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(CoreError::Validation(format!("unknown gender '{}'", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relationship: String,
}

/// Emergency contact as entered on a form: all three fields or none of them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContactDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[schema(value_type = String)]
    pub id: RecordId,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,

    pub status: PatientStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub ward_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed_number: Option<String>,

    pub diagnosis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_status: Option<ProcedureStatus>,
    #[serde(
        default,
        with = "crate::temporal::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub procedure_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,

    #[serde(with = "crate::temporal")]
    pub admission_date: DateTime<Utc>,
    #[serde(
        default,
        with = "crate::temporal::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub discharge_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub notes: Vec<PatientNote>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub biopsy_results: Vec<BiopsyResult>,
    #[serde(default)]
    pub reviews: Vec<PatientReview>,

    #[serde(with = "crate::temporal")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::temporal")]
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// The ward whose `occupiedBeds` counts this patient, if any.
    pub fn occupied_ward(&self) -> Option<&RecordId> {
        if self.status.occupies_bed() {
            self.ward_id.as_ref()
        } else {
            None
        }
    }
}

/// Fields supplied when registering a patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientDraft {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContactDraft>,
    pub status: PatientStatus,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub ward_id: Option<RecordId>,
    #[serde(default)]
    pub bed_number: Option<String>,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub procedure: Option<String>,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    /// Defaults to the time of creation.
    #[serde(default, with = "crate::temporal::option")]
    pub admission_date: Option<DateTime<Utc>>,
}

/// A partial patient update.
///
/// Outer `None` means "leave untouched". For clearable fields, `Some(None)` (an explicit JSON
/// `null`) clears the value.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<EmergencyContactDraft>)]
    pub emergency_contact: Option<Option<EmergencyContactDraft>>,

    #[serde(default)]
    pub status: Option<PatientStatus>,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<String>)]
    pub ward_id: Option<Option<RecordId>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<String>)]
    pub bed_number: Option<Option<String>>,

    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<String>)]
    pub procedure: Option<Option<String>>,
    #[serde(default)]
    pub procedure_status: Option<ProcedureStatus>,

    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default, with = "crate::temporal::option")]
    pub admission_date: Option<DateTime<Utc>>,
}

impl PatientUpdate {
    /// True when the update could change which ward (if any) counts this patient.
    pub fn touches_occupancy(&self) -> bool {
        self.status.is_some() || self.ward_id.is_some()
    }
}
