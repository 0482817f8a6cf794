use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ward_uuid::RecordId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WardType {
    General,
    Icu,
    Emergency,
    Surgery,
    Maternity,
    Pediatric,
}

impl WardType {
    pub const fn as_str(self) -> &'static str {
        match self {
            WardType::General => "general",
            WardType::Icu => "icu",
            WardType::Emergency => "emergency",
            WardType::Surgery => "surgery",
            WardType::Maternity => "maternity",
            WardType::Pediatric => "pediatric",
        }
    }
}

impl fmt::Display for WardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WardType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(WardType::General),
            "icu" => Ok(WardType::Icu),
            "emergency" => Ok(WardType::Emergency),
            "surgery" => Ok(WardType::Surgery),
            "maternity" => Ok(WardType::Maternity),
            "pediatric" => Ok(WardType::Pediatric),
            other => Err(CoreError::Validation(format!("unknown ward type '{}'", other))),
        }
    }
}

/// A hospital ward with a fixed bed capacity.
///
/// `occupied_beds` is owned by the occupancy manager: it always equals the number of admitted
/// patients assigned to this ward and is never settable through [`WardUpdate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ward {
    #[schema(value_type = String)]
    pub id: RecordId,
    pub name: String,
    pub department: String,
    pub ward_type: WardType,
    pub total_beds: u32,
    #[serde(default)]
    pub occupied_beds: u32,
    #[serde(with = "crate::temporal")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "crate::temporal::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ward {
    pub fn available_beds(&self) -> u32 {
        self.total_beds.saturating_sub(self.occupied_beds)
    }
}

/// Fields supplied when creating a ward. Occupancy always starts at zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WardDraft {
    pub name: String,
    pub department: String,
    pub ward_type: WardType,
    pub total_beds: u32,
}

/// Direct edits to a ward. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WardUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward_type: Option<WardType>,
}

impl WardUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.department.is_none() && self.ward_type.is_none()
    }
}
