use crate::AppState;
use crate::api_error::ApiError;
use crate::auth_information::CurrentUser;
use crate::constants::PATIENT_TAG;
use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use common::clinic_dto::{MappingView, PatientPayload, PatientView, WriteMode};
use slog::info;

#[utoipa::path(
    get,
    responses(
        (status = 200, description = "Patients created by the caller", body = Vec<PatientView>),
        (status = 401, description = "Not authenticated")
    ),
    tag = PATIENT_TAG,
    description = "List the caller's patients"
)]
#[get("/api/patients")]
pub async fn list_patients(
    app_state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    let patients = app_state.service.list_patients(&user).await?;
    Ok(HttpResponse::Ok().json(patients))
}

#[utoipa::path(
    post,
    request_body = PatientPayload,
    responses(
        (status = 201, description = "Patient created", body = PatientView),
        (status = 400, description = "Invalid patient data")
    ),
    tag = PATIENT_TAG,
    description = "Create a patient owned by the caller"
)]
#[post("/api/patients")]
pub async fn create_patient(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    payload: web::Json<PatientPayload>,
) -> Result<HttpResponse, ApiError> {
    let patient = app_state
        .service
        .create_patient(&user, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(patient))
}

#[utoipa::path(
    get,
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient detail", body = PatientView),
        (status = 404, description = "Patient not found")
    ),
    tag = PATIENT_TAG,
    description = "Retrieve one of the caller's patients"
)]
#[get("/api/patients/{id}")]
pub async fn get_patient(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let patient = app_state.service.get_patient(&user, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(patient))
}

#[utoipa::path(
    put,
    params(("id" = i64, Path, description = "Patient id")),
    request_body = PatientPayload,
    responses(
        (status = 200, description = "Patient updated", body = PatientView),
        (status = 400, description = "Invalid patient data"),
        (status = 403, description = "Patient belongs to another user"),
        (status = 404, description = "Patient not found")
    ),
    tag = PATIENT_TAG,
    description = "Replace a patient record"
)]
#[put("/api/patients/{id}")]
pub async fn replace_patient(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
    payload: web::Json<PatientPayload>,
) -> Result<HttpResponse, ApiError> {
    let patient = app_state
        .service
        .update_patient(&user, id.into_inner(), payload.into_inner(), WriteMode::Replace)
        .await?;
    Ok(HttpResponse::Ok().json(patient))
}

#[utoipa::path(
    patch,
    params(("id" = i64, Path, description = "Patient id")),
    request_body = PatientPayload,
    responses(
        (status = 200, description = "Patient updated", body = PatientView),
        (status = 400, description = "Invalid patient data"),
        (status = 403, description = "Patient belongs to another user"),
        (status = 404, description = "Patient not found")
    ),
    tag = PATIENT_TAG,
    description = "Partially update a patient record"
)]
#[patch("/api/patients/{id}")]
pub async fn patch_patient(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
    payload: web::Json<PatientPayload>,
) -> Result<HttpResponse, ApiError> {
    let patient = app_state
        .service
        .update_patient(&user, id.into_inner(), payload.into_inner(), WriteMode::Patch)
        .await?;
    Ok(HttpResponse::Ok().json(patient))
}

#[utoipa::path(
    delete,
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 403, description = "Patient belongs to another user"),
        (status = 404, description = "Patient not found")
    ),
    tag = PATIENT_TAG,
    description = "Delete a patient with its assignments and appointments"
)]
#[delete("/api/patients/{id}")]
pub async fn delete_patient(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let patient_id = id.into_inner();
    app_state.service.delete_patient(&user, patient_id).await?;
    info!(app_state.log, "delete_patient: {} by {}", patient_id, user.username);
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Active doctor assignments", body = Vec<MappingView>),
        (status = 404, description = "Patient not found")
    ),
    tag = PATIENT_TAG,
    description = "List the doctors currently assigned to a patient"
)]
#[get("/api/patients/{id}/doctors")]
pub async fn patient_doctors(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let doctors = app_state
        .service
        .patient_doctors(&user, id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(doctors))
}
