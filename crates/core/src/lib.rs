//! # Ward Core
//!
//! Core business logic for hospital ward occupancy and the patient lifecycle.
//!
//! This crate keeps every ward's `occupiedBeds` equal to the number of admitted patients
//! assigned to it, across patient creation, transfer, discharge and deletion, under
//! concurrent edits:
//! - [`store`]: versioned JSON documents with optimistic multi-document transactions and
//!   optional sharded on-disk persistence
//! - [`wards`] and [`patients`]: record stores and live subscription feeds
//! - [`occupancy`]: the transactional patient operations that move beds
//! - [`records`]: atomic appends of notes, appointments, biopsy results and reviews
//! - [`projections`]: dashboard statistics, procedure analytics, export data and occupancy audit
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and `cli`.

pub mod author;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod occupancy;
pub mod patients;
pub mod projections;
pub mod records;
pub mod service;
pub mod store;
pub mod subscription;
pub mod temporal;
pub mod validation;
pub mod wards;

pub use author::{Actor, ActorRole};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult, RecordKind};
pub use models::{
    Appointment, AppointmentDraft, AppointmentStatus, AppointmentType, BiopsyResult,
    BiopsyResultDraft, EmergencyContact, EmergencyContactDraft, Gender, NoteDraft, NoteType,
    Patient, PatientDraft, PatientNote, PatientReview, PatientStatus, PatientUpdate,
    ProcedureStatus, ReviewDraft, Ward, WardDraft, WardType, WardUpdate,
};
pub use occupancy::OccupancyManager;
pub use patients::PatientStore;
pub use projections::{
    DashboardStats, ExportData, ExportRange, OccupancyAudit, ProcedureAnalytics, ProcedureCount,
    Projections, WardAudit, WardOccupancy,
};
pub use records::SubRecordAppender;
pub use service::WardService;
pub use store::{Collection, DocumentStore, Snapshot};
pub use subscription::Subscription;
pub use wards::WardStore;

pub use ward_types::{NonEmptyText, TextError};
pub use ward_uuid::{RecordId, TimestampUuid};
