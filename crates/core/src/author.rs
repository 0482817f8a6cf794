//! Acting-user identity.
//!
//! The core never looks up "the current user". Callers pass an [`Actor`] into every mutating
//! operation; the core trusts it as given and copies it into `createdBy`, `doctorId`,
//! `consultantId` and similar fields.

use crate::error::{CoreError, CoreResult};
use crate::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The professional role of an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Doctor,
    Consultant,
    Nurse,
    Staff,
}

impl ActorRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Doctor => "doctor",
            ActorRole::Consultant => "consultant",
            ActorRole::Nurse => "nurse",
            ActorRole::Staff => "staff",
        }
    }

    /// Whether this role can own a patient or sign a patient off as `done`.
    pub const fn is_clinician_of_record(self) -> bool {
        matches!(self, ActorRole::Doctor | ActorRole::Consultant)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(ActorRole::Admin),
            "doctor" => Ok(ActorRole::Doctor),
            "consultant" => Ok(ActorRole::Consultant),
            "nurse" => Ok(ActorRole::Nurse),
            "staff" => Ok(ActorRole::Staff),
            other => Err(CoreError::Validation(format!("unknown actor role '{}'", other))),
        }
    }
}

/// An authenticated user performing an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    /// Identifier issued by the authentication collaborator.
    pub id: NonEmptyText,

    /// Display name, copied into `createdByName` style fields.
    pub name: NonEmptyText,

    pub role: ActorRole,
}

impl Actor {
    /// Build an actor from raw strings.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Text`] if `id` or `name` is blank.
    pub fn new(id: impl AsRef<str>, name: impl AsRef<str>, role: ActorRole) -> CoreResult<Self> {
        Ok(Self {
            id: NonEmptyText::new(id)?,
            name: NonEmptyText::new(name)?,
            role,
        })
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}
