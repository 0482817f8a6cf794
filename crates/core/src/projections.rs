//! # Read Projections
//!
//! Aggregate views over wards and patients. The computations are pure functions over slices so
//! they can be tested without a store; [`Projections`] feeds them a consistent snapshot.
//! Empty collections produce zeros, never errors.

use crate::error::{CoreError, CoreResult};
use crate::models::{Patient, PatientStatus, ProcedureStatus, Ward};
use crate::store::DocumentStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use ward_uuid::RecordId;

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn count(patients: &[Patient], predicate: impl Fn(&Patient) -> bool) -> u64 {
    patients.iter().filter(|p| predicate(p)).count() as u64
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_patients: u64,
    pub admitted_patients: u64,
    pub discharged_patients: u64,
    pub critical_patients: u64,
    pub in_treatment_patients: u64,
    pub pending_procedures: u64,
    pub admissions_today: u64,
    pub total_wards: u64,
    pub total_beds: u64,
    pub occupied_beds: u64,
    pub available_beds: u64,
    /// Percentage of all beds that are occupied; 0 when there are no beds.
    pub occupancy_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureCount {
    pub name: String,
    pub total: u64,
    pub completed: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WardOccupancy {
    #[schema(value_type = String)]
    pub ward_id: RecordId,
    pub name: String,
    pub total_beds: u32,
    pub occupied_beds: u32,
    pub occupancy_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureAnalytics {
    pub total_procedures: u64,
    pub pending: u64,
    pub reviewed: u64,
    pub completed: u64,
    /// Percentage of procedures completed; 0 when there are none.
    pub completion_rate: f64,
    /// Sorted by total descending, then name.
    pub by_procedure: Vec<ProcedureCount>,
    /// Patient count per status. Every status is present.
    pub status_breakdown: BTreeMap<String, u64>,
    pub ward_occupancy: Vec<WardOccupancy>,
}

/// An inclusive range of admission dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ExportRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ExportRange {
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> CoreResult<Self> {
        if from > to {
            return Err(CoreError::Validation(format!(
                "export range starts ({}) after it ends ({})",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        let day = instant.date_naive();
        self.from <= day && day <= self.to
    }
}

/// Input for the export collaborator. No formatting is applied here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub range: ExportRange,
    #[serde(with = "crate::temporal")]
    pub generated_at: DateTime<Utc>,
    pub patients: Vec<Patient>,
    pub wards: Vec<Ward>,
    pub stats: DashboardStats,
    pub analytics: ProcedureAnalytics,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WardAudit {
    #[schema(value_type = String)]
    pub ward_id: RecordId,
    pub name: String,
    pub total_beds: u32,
    pub recorded_occupied: u32,
    pub actual_admitted: u32,
    pub drifted: bool,
}

/// Recorded occupancy compared with the admitted patients actually assigned to each ward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyAudit {
    pub wards: Vec<WardAudit>,
    /// Admitted patients whose ward no longer exists.
    pub orphaned_admissions: u64,
    pub consistent: bool,
}

pub fn dashboard_stats(patients: &[Patient], wards: &[Ward], today: NaiveDate) -> DashboardStats {
    let total_beds: u64 = wards.iter().map(|w| u64::from(w.total_beds)).sum();
    let occupied_beds: u64 = wards.iter().map(|w| u64::from(w.occupied_beds)).sum();

    DashboardStats {
        total_patients: patients.len() as u64,
        admitted_patients: count(patients, |p| p.status == PatientStatus::Admitted),
        discharged_patients: count(patients, |p| p.status == PatientStatus::Discharged),
        critical_patients: count(patients, |p| p.status == PatientStatus::Critical),
        in_treatment_patients: count(patients, |p| p.status == PatientStatus::InTreatment),
        pending_procedures: count(patients, |p| {
            p.procedure_status == Some(ProcedureStatus::Pending)
        }),
        admissions_today: count(patients, |p| p.admission_date.date_naive() == today),
        total_wards: wards.len() as u64,
        total_beds,
        occupied_beds,
        available_beds: total_beds.saturating_sub(occupied_beds),
        occupancy_rate: percentage(occupied_beds, total_beds),
    }
}

pub fn procedure_analytics(patients: &[Patient], wards: &[Ward]) -> ProcedureAnalytics {
    let with_procedure: Vec<&Patient> = patients.iter().filter(|p| p.procedure.is_some()).collect();
    let with_status =
        |status: ProcedureStatus| with_procedure.iter().filter(|p| p.procedure_status == Some(status)).count() as u64;

    let total_procedures = with_procedure.len() as u64;
    let completed = with_status(ProcedureStatus::Completed);

    let mut grouped: HashMap<&str, ProcedureCount> = HashMap::new();
    for patient in &with_procedure {
        let Some(name) = patient.procedure.as_deref() else {
            continue;
        };
        let entry = grouped.entry(name).or_insert_with(|| ProcedureCount {
            name: name.to_string(),
            total: 0,
            completed: 0,
        });
        entry.total += 1;
        if patient.procedure_status == Some(ProcedureStatus::Completed) {
            entry.completed += 1;
        }
    }
    let mut by_procedure: Vec<ProcedureCount> = grouped.into_values().collect();
    by_procedure.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

    let status_breakdown = PatientStatus::ALL
        .iter()
        .map(|status| {
            (
                status.as_str().to_string(),
                count(patients, |p| p.status == *status),
            )
        })
        .collect();

    let mut ward_occupancy: Vec<WardOccupancy> = wards
        .iter()
        .map(|w| WardOccupancy {
            ward_id: w.id.clone(),
            name: w.name.clone(),
            total_beds: w.total_beds,
            occupied_beds: w.occupied_beds,
            occupancy_rate: percentage(u64::from(w.occupied_beds), u64::from(w.total_beds)),
        })
        .collect();
    ward_occupancy.sort_by(|a, b| a.name.cmp(&b.name));

    ProcedureAnalytics {
        total_procedures,
        pending: with_status(ProcedureStatus::Pending),
        reviewed: with_status(ProcedureStatus::Reviewed),
        completed,
        completion_rate: percentage(completed, total_procedures),
        by_procedure,
        status_breakdown,
        ward_occupancy,
    }
}

pub fn export_data(
    patients: &[Patient],
    wards: &[Ward],
    range: ExportRange,
    now: DateTime<Utc>,
) -> ExportData {
    let mut selected: Vec<Patient> = patients
        .iter()
        .filter(|p| range.contains(&p.admission_date))
        .cloned()
        .collect();
    selected.sort_by(|a, b| a.admission_date.cmp(&b.admission_date));

    ExportData {
        range,
        generated_at: now,
        stats: dashboard_stats(&selected, wards, now.date_naive()),
        analytics: procedure_analytics(&selected, wards),
        wards: wards.to_vec(),
        patients: selected,
    }
}

pub fn occupancy_audit(patients: &[Patient], wards: &[Ward]) -> OccupancyAudit {
    let mut actual: HashMap<&RecordId, u32> = HashMap::new();
    for ward_id in patients.iter().filter_map(Patient::occupied_ward) {
        *actual.entry(ward_id).or_default() += 1;
    }

    let mut audits: Vec<WardAudit> = wards
        .iter()
        .map(|w| {
            let actual_admitted = actual.remove(&w.id).unwrap_or(0);
            WardAudit {
                ward_id: w.id.clone(),
                name: w.name.clone(),
                total_beds: w.total_beds,
                recorded_occupied: w.occupied_beds,
                actual_admitted,
                drifted: actual_admitted != w.occupied_beds,
            }
        })
        .collect();
    audits.sort_by(|a, b| a.name.cmp(&b.name));

    let orphaned_admissions = actual.values().map(|n| u64::from(*n)).sum();
    OccupancyAudit {
        consistent: orphaned_admissions == 0 && audits.iter().all(|a| !a.drifted),
        wards: audits,
        orphaned_admissions,
    }
}

/// Projections computed from a consistent snapshot of the store.
#[derive(Clone, Debug)]
pub struct Projections {
    store: Arc<DocumentStore>,
}

impl Projections {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn dashboard_stats(&self) -> DashboardStats {
        let snapshot = self.store.snapshot();
        dashboard_stats(&snapshot.patients, &snapshot.wards, Utc::now().date_naive())
    }

    pub async fn procedure_analytics(&self) -> ProcedureAnalytics {
        let snapshot = self.store.snapshot();
        procedure_analytics(&snapshot.patients, &snapshot.wards)
    }

    pub async fn export_data(&self, range: ExportRange) -> ExportData {
        let snapshot = self.store.snapshot();
        export_data(&snapshot.patients, &snapshot.wards, range, Utc::now())
    }

    /// Compare recorded and actual occupancy. Never repairs anything.
    pub async fn occupancy_audit(&self) -> OccupancyAudit {
        let snapshot = self.store.snapshot();
        let audit = occupancy_audit(&snapshot.patients, &snapshot.wards);
        if !audit.consistent {
            tracing::warn!(
                drifted = audit.wards.iter().filter(|w| w.drifted).count(),
                orphaned = audit.orphaned_admissions,
                "occupancy drift detected"
            );
        }
        audit
    }
}
