//! # API REST
//!
//! REST API for the ward occupancy core.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, actor headers, error mapping)
//!
//! Every handler is a thin call into [`ward_core::WardService`].

#![warn(rust_2018_idioms)]

pub mod actor;
pub mod error;

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use ward_core::{
    ActorRole, Appointment, AppointmentDraft, AppointmentStatus, AppointmentType, BiopsyResult,
    BiopsyResultDraft, CoreError, DashboardStats, EmergencyContact, EmergencyContactDraft,
    ExportData, ExportRange, Gender, NoteDraft, NoteType, OccupancyAudit, Patient, PatientDraft,
    PatientNote, PatientReview, PatientStatus, PatientUpdate, ProcedureAnalytics, ProcedureCount,
    ProcedureStatus, RecordId, RecordKind, ReviewDraft, TimestampUuid, Ward, WardAudit, WardDraft,
    WardOccupancy, WardService, WardType, WardUpdate,
};

pub use actor::RequestActor;
pub use error::{ApiError, ErrorRes};

/// Application state for the REST API server
///
/// Holds the shared [`WardService`]; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    service: WardService,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreatedRes {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SuccessRes {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AppointmentStatusReq {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// First admission date included (YYYY-MM-DD).
    pub from: NaiveDate,
    /// Last admission date included (YYYY-MM-DD).
    pub to: NaiveDate,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_wards,
        create_ward,
        get_ward,
        update_ward,
        delete_ward,
        list_patients,
        create_patient,
        get_patient,
        update_patient,
        delete_patient,
        add_note,
        schedule_appointment,
        update_appointment_status,
        delete_appointment,
        add_biopsy_result,
        add_review,
        dashboard_stats,
        procedure_analytics,
        occupancy_audit,
        export_data,
    ),
    components(schemas(
        HealthRes,
        CreatedRes,
        SuccessRes,
        ErrorRes,
        AppointmentStatusReq,
        Ward,
        WardDraft,
        WardUpdate,
        WardType,
        Patient,
        PatientDraft,
        PatientUpdate,
        PatientStatus,
        ProcedureStatus,
        Gender,
        EmergencyContact,
        EmergencyContactDraft,
        PatientNote,
        NoteDraft,
        NoteType,
        Appointment,
        AppointmentDraft,
        AppointmentStatus,
        AppointmentType,
        BiopsyResult,
        BiopsyResultDraft,
        PatientReview,
        ReviewDraft,
        ActorRole,
        DashboardStats,
        ProcedureAnalytics,
        ProcedureCount,
        WardOccupancy,
        OccupancyAudit,
        WardAudit,
        ExportData,
        ExportRange,
    ))
)]
pub struct ApiDoc;

/// Build the REST router over `service`, including Swagger UI.
pub fn router(service: WardService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/wards", get(list_wards).post(create_ward))
        .route(
            "/wards/:id",
            get(get_ward).put(update_ward).delete(delete_ward),
        )
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route("/patients/:id/notes", post(add_note))
        .route("/patients/:id/appointments", post(schedule_appointment))
        .route(
            "/patients/:id/appointments/:appointment_id",
            put(update_appointment_status).delete(delete_appointment),
        )
        .route("/patients/:id/biopsy-results", post(add_biopsy_result))
        .route("/patients/:id/reviews", post(add_review))
        .route("/stats/dashboard", get(dashboard_stats))
        .route("/stats/procedures", get(procedure_analytics))
        .route("/stats/audit", get(occupancy_audit))
        .route("/export", get(export_data))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}

/// Bind `addr` and serve the REST API until the server stops.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, service: WardService) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("++ Ward REST API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(service)).await?;
    Ok(())
}

fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(raw).map_err(|e| ApiError::from(CoreError::from(e)))
}

fn parse_sub_id(raw: &str) -> Result<TimestampUuid, ApiError> {
    raw.parse::<TimestampUuid>()
        .map_err(|e| ApiError::from(CoreError::from(e)))
}

fn created(id: impl ToString) -> (StatusCode, Json<CreatedRes>) {
    (
        StatusCode::CREATED,
        Json(CreatedRes { id: id.to_string() }),
    )
}

fn success() -> Json<SuccessRes> {
    Json(SuccessRes { success: true })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Ward REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/wards",
    responses(
        (status = 200, description = "All wards, newest first", body = [Ward])
    )
)]
#[axum::debug_handler]
async fn list_wards(State(state): State<AppState>) -> Json<Vec<Ward>> {
    Json(state.service.wards().list_wards().await)
}

#[utoipa::path(
    post,
    path = "/wards",
    request_body = WardDraft,
    responses(
        (status = 201, description = "Ward created", body = CreatedRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Create a ward. Occupancy starts at zero.
#[axum::debug_handler]
async fn create_ward(
    State(state): State<AppState>,
    Json(req): Json<WardDraft>,
) -> Result<(StatusCode, Json<CreatedRes>), ApiError> {
    let id = state.service.wards().create_ward(req).await?;
    Ok(created(id))
}

#[utoipa::path(
    get,
    path = "/wards/{id}",
    params(("id" = String, Path, description = "Ward id")),
    responses(
        (status = 200, description = "Ward", body = Ward),
        (status = 404, description = "Ward not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_ward(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Ward>, ApiError> {
    let id = parse_id(&id)?;
    state
        .service
        .wards()
        .get_ward(&id)
        .await?
        .map(Json)
        .ok_or_else(|| CoreError::NotFound {
            kind: RecordKind::Ward,
            id: id.to_string(),
        }
        .into())
}

#[utoipa::path(
    put,
    path = "/wards/{id}",
    params(("id" = String, Path, description = "Ward id")),
    request_body = WardUpdate,
    responses(
        (status = 200, description = "Ward updated", body = SuccessRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "Ward not found", body = ErrorRes),
        (status = 409, description = "Concurrent update could not be applied", body = ErrorRes)
    )
)]
/// Edit a ward's name, department or type. Occupancy cannot be edited.
#[axum::debug_handler]
async fn update_ward(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<WardUpdate>,
) -> Result<Json<SuccessRes>, ApiError> {
    let id = parse_id(&id)?;
    state.service.wards().update_ward(&id, req).await?;
    Ok(success())
}

#[utoipa::path(
    delete,
    path = "/wards/{id}",
    params(("id" = String, Path, description = "Ward id")),
    responses(
        (status = 200, description = "Ward deleted", body = SuccessRes),
        (status = 404, description = "Ward not found", body = ErrorRes),
        (status = 409, description = "Ward still has admitted patients", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn delete_ward(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<SuccessRes>, ApiError> {
    let id = parse_id(&id)?;
    state.service.wards().delete_ward(&id).await?;
    Ok(success())
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "All patients, newest first", body = [Patient])
    )
)]
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> Json<Vec<Patient>> {
    Json(state.service.patients().list_patients().await)
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientDraft,
    responses(
        (status = 201, description = "Patient created", body = CreatedRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "Ward not found", body = ErrorRes),
        (status = 409, description = "Ward is at full capacity", body = ErrorRes)
    )
)]
/// Register a patient, taking a bed when they are admitted to a ward.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<PatientDraft>,
) -> Result<(StatusCode, Json<CreatedRes>), ApiError> {
    let id = state.service.occupancy().create_patient(&actor, req).await?;
    Ok(created(id))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id)?;
    state
        .service
        .patients()
        .get_patient(&id)
        .await?
        .map(Json)
        .ok_or_else(|| CoreError::NotFound {
            kind: RecordKind::Patient,
            id: id.to_string(),
        }
        .into())
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = PatientUpdate,
    responses(
        (status = 200, description = "Patient updated", body = SuccessRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "Patient or ward not found", body = ErrorRes),
        (status = 409, description = "Ward is at full capacity", body = ErrorRes)
    )
)]
/// Partially update a patient. Absent fields are untouched; `null` clears clearable fields.
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<PatientUpdate>,
) -> Result<Json<SuccessRes>, ApiError> {
    let id = parse_id(&id)?;
    state
        .service
        .occupancy()
        .update_patient(&actor, &id, req)
        .await?;
    Ok(success())
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient deleted", body = SuccessRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn delete_patient(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<SuccessRes>, ApiError> {
    let id = parse_id(&id)?;
    state.service.occupancy().delete_patient(&actor, &id).await?;
    Ok(success())
}

#[utoipa::path(
    post,
    path = "/patients/{id}/notes",
    params(("id" = String, Path, description = "Patient id")),
    request_body = NoteDraft,
    responses(
        (status = 201, description = "Note added", body = CreatedRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn add_note(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<NoteDraft>,
) -> Result<(StatusCode, Json<CreatedRes>), ApiError> {
    let id = parse_id(&id)?;
    let note_id = state.service.records().add_note(&actor, &id, req).await?;
    Ok(created(note_id))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/appointments",
    params(("id" = String, Path, description = "Patient id")),
    request_body = AppointmentDraft,
    responses(
        (status = 201, description = "Appointment scheduled", body = CreatedRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn schedule_appointment(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<AppointmentDraft>,
) -> Result<(StatusCode, Json<CreatedRes>), ApiError> {
    let id = parse_id(&id)?;
    let appointment_id = state
        .service
        .records()
        .schedule_appointment(&actor, &id, req)
        .await?;
    Ok(created(appointment_id))
}

#[utoipa::path(
    put,
    path = "/patients/{id}/appointments/{appointment_id}",
    params(
        ("id" = String, Path, description = "Patient id"),
        ("appointment_id" = String, Path, description = "Appointment id")
    ),
    request_body = AppointmentStatusReq,
    responses(
        (status = 200, description = "Appointment status updated", body = SuccessRes),
        (status = 404, description = "Patient or appointment not found", body = ErrorRes),
        (status = 409, description = "Concurrent update could not be applied", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn update_appointment_status(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath((id, appointment_id)): AxumPath<(String, String)>,
    Json(req): Json<AppointmentStatusReq>,
) -> Result<Json<SuccessRes>, ApiError> {
    let id = parse_id(&id)?;
    let appointment_id = parse_sub_id(&appointment_id)?;
    state
        .service
        .records()
        .update_appointment_status(&actor, &id, &appointment_id, req.status)
        .await?;
    Ok(success())
}

#[utoipa::path(
    delete,
    path = "/patients/{id}/appointments/{appointment_id}",
    params(
        ("id" = String, Path, description = "Patient id"),
        ("appointment_id" = String, Path, description = "Appointment id")
    ),
    responses(
        (status = 200, description = "Appointment deleted", body = SuccessRes),
        (status = 404, description = "Patient or appointment not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn delete_appointment(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath((id, appointment_id)): AxumPath<(String, String)>,
) -> Result<Json<SuccessRes>, ApiError> {
    let id = parse_id(&id)?;
    let appointment_id = parse_sub_id(&appointment_id)?;
    state
        .service
        .records()
        .delete_appointment(&actor, &id, &appointment_id)
        .await?;
    Ok(success())
}

#[utoipa::path(
    post,
    path = "/patients/{id}/biopsy-results",
    params(("id" = String, Path, description = "Patient id")),
    request_body = BiopsyResultDraft,
    responses(
        (status = 201, description = "Biopsy result added", body = CreatedRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn add_biopsy_result(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<BiopsyResultDraft>,
) -> Result<(StatusCode, Json<CreatedRes>), ApiError> {
    let id = parse_id(&id)?;
    let result_id = state
        .service
        .records()
        .add_biopsy_result(&actor, &id, req)
        .await?;
    Ok(created(result_id))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/reviews",
    params(("id" = String, Path, description = "Patient id")),
    request_body = ReviewDraft,
    responses(
        (status = 201, description = "Review added", body = CreatedRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn add_review(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<ReviewDraft>,
) -> Result<(StatusCode, Json<CreatedRes>), ApiError> {
    let id = parse_id(&id)?;
    let review_id = state.service.records().add_review(&actor, &id, req).await?;
    Ok(created(review_id))
}

#[utoipa::path(
    get,
    path = "/stats/dashboard",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats)
    )
)]
#[axum::debug_handler]
async fn dashboard_stats(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(state.service.projections().dashboard_stats().await)
}

#[utoipa::path(
    get,
    path = "/stats/procedures",
    responses(
        (status = 200, description = "Procedure analytics", body = ProcedureAnalytics)
    )
)]
#[axum::debug_handler]
async fn procedure_analytics(State(state): State<AppState>) -> Json<ProcedureAnalytics> {
    Json(state.service.projections().procedure_analytics().await)
}

#[utoipa::path(
    get,
    path = "/stats/audit",
    responses(
        (status = 200, description = "Recorded versus actual ward occupancy", body = OccupancyAudit)
    )
)]
#[axum::debug_handler]
async fn occupancy_audit(State(state): State<AppState>) -> Json<OccupancyAudit> {
    Json(state.service.projections().occupancy_audit().await)
}

#[utoipa::path(
    get,
    path = "/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "Patients admitted in range with wards and statistics", body = ExportData),
        (status = 400, description = "Bad request", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn export_data(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<ExportData>, ApiError> {
    let range = ExportRange::new(query.from, query.to)?;
    Ok(Json(state.service.projections().export_data(range).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use ward_core::CoreConfig;

    fn app() -> Router {
        router(WardService::in_memory(Arc::new(CoreConfig::in_memory())))
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(actor::ACTOR_ID_HEADER, "doc-1")
            .header(actor::ACTOR_NAME_HEADER, "Dr Quinn")
            .header(actor::ACTOR_ROLE_HEADER, "doctor");
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn create_ward(app: &Router, name: &str, beds: u32) -> String {
        let (status, body) = send(
            app,
            request(
                Method::POST,
                "/wards",
                Some(json!({
                    "name": name,
                    "department": "Medicine",
                    "wardType": "general",
                    "totalBeds": beds
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    fn admitted_to(ward_id: &str) -> Value {
        json!({
            "name": "Ada",
            "age": 36,
            "gender": "female",
            "phone": "0700",
            "address": "1 Lane",
            "status": "admitted",
            "wardId": ward_id,
            "diagnosis": "Pneumonia"
        })
    }

    #[tokio::test]
    async fn health_is_alive() {
        let (status, body) = send(&app(), request(Method::GET, "/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn full_ward_rejects_admission_with_conflict() {
        let app = app();
        let ward = create_ward(&app, "ICU", 1).await;

        let (status, _) = send(
            &app,
            request(Method::POST, "/patients", Some(admitted_to(&ward))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            request(Method::POST, "/patients", Some(admitted_to(&ward))),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "capacity");
        assert_eq!(body["message"], "ICU is at full capacity (1/1 beds occupied)");

        let (_, ward_body) = send(&app, request(Method::GET, &format!("/wards/{ward}"), None)).await;
        assert_eq!(ward_body["occupiedBeds"], 1);
    }

    #[tokio::test]
    async fn missing_actor_headers_are_rejected() {
        let app = app();
        let ward = create_ward(&app, "Oak", 2).await;
        let req = Request::builder()
            .method(Method::POST)
            .uri("/patients")
            .header("content-type", "application/json")
            .body(Body::from(admitted_to(&ward).to_string()))
            .unwrap();

        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");
    }

    #[tokio::test]
    async fn unknown_records_are_not_found() {
        let app = app();
        let missing = RecordId::new();
        let (status, body) =
            send(&app, request(Method::GET, &format!("/patients/{missing}"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (status, _) = send(&app, request(Method::GET, "/wards/not-an-id", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn discharge_then_delete_ward() {
        let app = app();
        let ward = create_ward(&app, "Elm", 3).await;
        let (_, created) = send(
            &app,
            request(Method::POST, "/patients", Some(admitted_to(&ward))),
        )
        .await;
        let patient = created["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, request(Method::DELETE, &format!("/wards/{ward}"), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");

        let (status, _) = send(
            &app,
            request(
                Method::PUT,
                &format!("/patients/{patient}"),
                Some(json!({ "status": "discharged" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, fetched) = send(&app, request(Method::GET, &format!("/patients/{patient}"), None)).await;
        assert!(fetched["dischargeDate"].is_string());

        let (status, _) = send(&app, request(Method::DELETE, &format!("/wards/{ward}"), None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn appointments_can_be_scheduled_and_completed() {
        let app = app();
        let (_, created) = send(
            &app,
            request(
                Method::POST,
                "/patients",
                Some(json!({
                    "name": "Lin",
                    "age": 40,
                    "gender": "other",
                    "phone": "0700",
                    "address": "2 Road",
                    "status": "stable"
                })),
            ),
        )
        .await;
        let patient = created["id"].as_str().unwrap().to_string();

        let (status, scheduled) = send(
            &app,
            request(
                Method::POST,
                &format!("/patients/{patient}/appointments"),
                Some(json!({
                    "title": "Consult",
                    "scheduledDate": "2030-01-01T09:00:00Z",
                    "duration": 30,
                    "type": "consultation"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let appointment = scheduled["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            request(
                Method::PUT,
                &format!("/patients/{patient}/appointments/{appointment}"),
                Some(json!({ "status": "completed" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, fetched) = send(&app, request(Method::GET, &format!("/patients/{patient}"), None)).await;
        assert_eq!(fetched["appointments"][0]["status"], "completed");
        assert_eq!(fetched["appointments"][0]["doctorId"], "doc-1");
    }

    #[tokio::test]
    async fn stats_and_export_reflect_admissions() {
        let app = app();
        let ward = create_ward(&app, "Birch", 4).await;
        send(
            &app,
            request(Method::POST, "/patients", Some(admitted_to(&ward))),
        )
        .await;

        let (status, stats) = send(&app, request(Method::GET, "/stats/dashboard", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["admittedPatients"], 1);
        assert_eq!(stats["occupancyRate"], 25.0);

        let (_, audit) = send(&app, request(Method::GET, "/stats/audit", None)).await;
        assert_eq!(audit["consistent"], true);

        let today = chrono::Utc::now().date_naive();
        let (status, export) = send(
            &app,
            request(Method::GET, &format!("/export?from={today}&to={today}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(export["patients"].as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            request(Method::GET, "/export?from=2024-02-01&to=2024-01-01", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
