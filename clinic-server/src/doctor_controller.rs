use crate::AppState;
use crate::api_error::ApiError;
use crate::auth_information::CurrentUser;
use crate::constants::DOCTOR_TAG;
use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use common::clinic_dto::{DoctorPayload, DoctorView, PatientView, WriteMode};
use slog::info;

#[utoipa::path(
    get,
    responses(
        (status = 200, description = "All doctors", body = Vec<DoctorView>),
        (status = 401, description = "Not authenticated")
    ),
    tag = DOCTOR_TAG,
    description = "List all doctors"
)]
#[get("/api/doctors")]
pub async fn list_doctors(
    app_state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    let doctors = app_state.service.list_doctors(&user).await?;
    Ok(HttpResponse::Ok().json(doctors))
}

#[utoipa::path(
    post,
    request_body = DoctorPayload,
    responses(
        (status = 201, description = "Doctor created", body = DoctorView),
        (status = 400, description = "Invalid doctor data or license number taken")
    ),
    tag = DOCTOR_TAG,
    description = "Create a doctor owned by the caller"
)]
#[post("/api/doctors")]
pub async fn create_doctor(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    payload: web::Json<DoctorPayload>,
) -> Result<HttpResponse, ApiError> {
    let doctor = app_state
        .service
        .create_doctor(&user, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(doctor))
}

#[utoipa::path(
    get,
    params(("id" = i64, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Doctor detail", body = DoctorView),
        (status = 404, description = "Doctor not found")
    ),
    tag = DOCTOR_TAG,
    description = "Retrieve a doctor"
)]
#[get("/api/doctors/{id}")]
pub async fn get_doctor(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let doctor = app_state.service.get_doctor(&user, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(doctor))
}

#[utoipa::path(
    put,
    params(("id" = i64, Path, description = "Doctor id")),
    request_body = DoctorPayload,
    responses(
        (status = 200, description = "Doctor updated", body = DoctorView),
        (status = 400, description = "Invalid doctor data"),
        (status = 403, description = "Doctor belongs to another user"),
        (status = 404, description = "Doctor not found")
    ),
    tag = DOCTOR_TAG,
    description = "Replace a doctor record"
)]
#[put("/api/doctors/{id}")]
pub async fn replace_doctor(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
    payload: web::Json<DoctorPayload>,
) -> Result<HttpResponse, ApiError> {
    let doctor = app_state
        .service
        .update_doctor(&user, id.into_inner(), payload.into_inner(), WriteMode::Replace)
        .await?;
    Ok(HttpResponse::Ok().json(doctor))
}

#[utoipa::path(
    patch,
    params(("id" = i64, Path, description = "Doctor id")),
    request_body = DoctorPayload,
    responses(
        (status = 200, description = "Doctor updated", body = DoctorView),
        (status = 400, description = "Invalid doctor data"),
        (status = 403, description = "Doctor belongs to another user"),
        (status = 404, description = "Doctor not found")
    ),
    tag = DOCTOR_TAG,
    description = "Partially update a doctor record"
)]
#[patch("/api/doctors/{id}")]
pub async fn patch_doctor(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
    payload: web::Json<DoctorPayload>,
) -> Result<HttpResponse, ApiError> {
    let doctor = app_state
        .service
        .update_doctor(&user, id.into_inner(), payload.into_inner(), WriteMode::Patch)
        .await?;
    Ok(HttpResponse::Ok().json(doctor))
}

#[utoipa::path(
    delete,
    params(("id" = i64, Path, description = "Doctor id")),
    responses(
        (status = 204, description = "Doctor deleted"),
        (status = 403, description = "Doctor belongs to another user"),
        (status = 404, description = "Doctor not found")
    ),
    tag = DOCTOR_TAG,
    description = "Delete a doctor with its assignments and appointments"
)]
#[delete("/api/doctors/{id}")]
pub async fn delete_doctor(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let doctor_id = id.into_inner();
    app_state.service.delete_doctor(&user, doctor_id).await?;
    info!(app_state.log, "delete_doctor: {} by {}", doctor_id, user.username);
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    params(("id" = i64, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Patients currently assigned", body = Vec<PatientView>),
        (status = 403, description = "Doctor belongs to another user"),
        (status = 404, description = "Doctor not found")
    ),
    tag = DOCTOR_TAG,
    description = "List the patients currently assigned to a doctor"
)]
#[get("/api/doctors/{id}/patients")]
pub async fn doctor_patients(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let patients = app_state
        .service
        .doctor_patients(&user, id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(patients))
}
