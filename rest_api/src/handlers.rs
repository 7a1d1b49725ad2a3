// rest_api/src/handlers.rs

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use models::{
    AppointmentFilter, AppointmentUpdate, ClinicalNoteUpdate, EntityId, Login, NewAppointment,
    NewClinicalNote, NewPatient, NewStaff, PatientFilter, PatientUpdate, StaffUpdate,
};
use security::LoginResponse;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentStaff, ACCESS_TOKEN_COOKIE};
use crate::{success, ApiResult, AppState};

/// Expected revision for deletes, e.g. `DELETE /appointments/4?revision=2`.
#[derive(Debug, Deserialize)]
pub struct RevisionQuery {
    pub revision: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// Handler for the /api/v1/health endpoint
pub async fn health_check_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

// Handler for the /api/v1/version endpoint
pub async fn version_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "version": env!("CARGO_PKG_VERSION"), "api_level": 1 })),
    )
}

pub async fn not_found_handler() -> Response {
    let body = json!({ "status": "error", "message": "route not found" });
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

// --- auth ---

fn with_session_cookie(mut response: Response, login: &LoginResponse) -> Response {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ACCESS_TOKEN_COOKIE, login.tokens.access_token, login.tokens.expires_in
    );
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

pub async fn login_handler(State(state): State<AppState>, ApiJson(login): ApiJson<Login>) -> ApiResult {
    let response = state.credentials.login(login).await?;
    let http = success(StatusCode::OK, "login successful", &response);
    Ok(with_session_cookie(http, &response))
}

pub async fn refresh_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> ApiResult {
    let response = state.credentials.refresh(&request.refresh_token).await?;
    let http = success(StatusCode::OK, "token refreshed", &response);
    Ok(with_session_cookie(http, &response))
}

// --- staff ---

pub async fn create_staff(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiJson(input): ApiJson<NewStaff>,
) -> ApiResult {
    let profile = state.services.staff.create(&actor, input).await?;
    Ok(success(StatusCode::CREATED, "staff created", profile))
}

pub async fn list_staff(State(state): State<AppState>, CurrentStaff(actor): CurrentStaff) -> ApiResult {
    let staff = state.services.staff.get_all(&actor).await?;
    Ok(success(StatusCode::OK, "staff retrieved", staff))
}

pub async fn get_staff(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult {
    let profile = state.services.staff.get_by_id(&actor, id).await?;
    Ok(success(StatusCode::OK, "staff retrieved", profile))
}

pub async fn update_staff(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(update): ApiJson<StaffUpdate>,
) -> ApiResult {
    let profile = state.services.staff.update(&actor, id, update).await?;
    Ok(success(StatusCode::OK, "staff updated", profile))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult {
    state.services.staff.delete(&actor, id).await?;
    Ok(success(StatusCode::OK, "staff deleted", json!({ "id": id })))
}

// --- patients ---

pub async fn create_patient(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiJson(input): ApiJson<NewPatient>,
) -> ApiResult {
    let patient = state.services.patients.create(&actor, input).await?;
    tracing::info!("Patient {} registered via API", patient.registration_number);
    Ok(success(StatusCode::CREATED, "patient registered", patient))
}

pub async fn list_patients(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiQuery(filter): ApiQuery<PatientFilter>,
) -> ApiResult {
    let patients = state.services.patients.get_all(&actor, &filter).await?;
    Ok(success(StatusCode::OK, "patients retrieved", patients))
}

pub async fn get_patient(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult {
    let patient = state.services.patients.get_by_id(&actor, id).await?;
    Ok(success(StatusCode::OK, "patient retrieved", patient))
}

pub async fn get_patient_by_registration_number(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(registration_number): ApiPath<String>,
) -> ApiResult {
    let patient = state
        .services
        .patients
        .get_by_registration_number(&actor, &registration_number)
        .await?;
    Ok(success(StatusCode::OK, "patient retrieved", patient))
}

pub async fn update_patient(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(update): ApiJson<PatientUpdate>,
) -> ApiResult {
    let patient = state.services.patients.update(&actor, id, update).await?;
    Ok(success(StatusCode::OK, "patient updated", patient))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult {
    state.services.patients.delete(&actor, id).await?;
    Ok(success(StatusCode::OK, "patient deleted", json!({ "id": id })))
}

// --- appointments ---

pub async fn create_appointment(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiJson(input): ApiJson<NewAppointment>,
) -> ApiResult {
    let appointment = state.services.appointments.create(&actor, input).await?;
    Ok(success(StatusCode::CREATED, "appointment created", appointment))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
) -> ApiResult {
    let appointments = state.services.appointments.get_all(&actor, &filter).await?;
    Ok(success(StatusCode::OK, "appointments retrieved", appointments))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult {
    let appointment = state.services.appointments.get_by_id(&actor, id).await?;
    Ok(success(StatusCode::OK, "appointment retrieved", appointment))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(update): ApiJson<AppointmentUpdate>,
) -> ApiResult {
    let appointment = state.services.appointments.update(&actor, id, update).await?;
    Ok(success(StatusCode::OK, "appointment updated", appointment))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
    ApiQuery(query): ApiQuery<RevisionQuery>,
) -> ApiResult {
    state
        .services
        .appointments
        .delete(&actor, id, query.revision)
        .await?;
    Ok(success(StatusCode::OK, "appointment deleted", json!({ "id": id })))
}

// --- clinical notes ---

pub async fn create_clinical_note(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiJson(input): ApiJson<NewClinicalNote>,
) -> ApiResult {
    let note = state.services.clinical_notes.create(&actor, input).await?;
    Ok(success(StatusCode::CREATED, "clinical note created", note))
}

pub async fn get_clinical_note(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult {
    let note = state.services.clinical_notes.get_by_id(&actor, id).await?;
    Ok(success(StatusCode::OK, "clinical note retrieved", note))
}

pub async fn get_clinical_note_by_appointment(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(appointment_id): ApiPath<EntityId>,
) -> ApiResult {
    let note = state
        .services
        .clinical_notes
        .get_by_appointment_id(&actor, appointment_id)
        .await?;
    Ok(success(StatusCode::OK, "clinical note retrieved", note))
}

pub async fn get_clinical_notes_by_patient(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(patient_id): ApiPath<EntityId>,
) -> ApiResult {
    let notes = state
        .services
        .clinical_notes
        .get_by_patient_id(&actor, patient_id)
        .await?;
    Ok(success(StatusCode::OK, "clinical notes retrieved", notes))
}

pub async fn update_clinical_note(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(update): ApiJson<ClinicalNoteUpdate>,
) -> ApiResult {
    let note = state.services.clinical_notes.update(&actor, id, update).await?;
    Ok(success(StatusCode::OK, "clinical note updated", note))
}

pub async fn delete_clinical_note(
    State(state): State<AppState>,
    CurrentStaff(actor): CurrentStaff,
    ApiPath(id): ApiPath<EntityId>,
    ApiQuery(query): ApiQuery<RevisionQuery>,
) -> ApiResult {
    state
        .services
        .clinical_notes
        .delete(&actor, id, query.revision)
        .await?;
    Ok(success(StatusCode::OK, "clinical note deleted", json!({ "id": id })))
}
