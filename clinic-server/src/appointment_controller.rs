use crate::AppState;
use crate::api_error::ApiError;
use crate::auth_information::CurrentUser;
use crate::constants::APPOINTMENT_TAG;
use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use common::clinic_dto::{AppointmentPayload, AppointmentQuery, AppointmentView, WriteMode};
use slog::info;

#[utoipa::path(
    get,
    params(AppointmentQuery),
    responses(
        (status = 200, description = "Appointments visible to the caller", body = Vec<AppointmentView>),
        (status = 400, description = "Invalid filter")
    ),
    tag = APPOINTMENT_TAG,
    description = "List appointments, optionally filtered by doctor, patient and status"
)]
#[get("/api/appointments")]
pub async fn list_appointments(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<AppointmentQuery>,
) -> Result<HttpResponse, ApiError> {
    let appointments = app_state
        .service
        .list_appointments(&user, query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(appointments))
}

#[utoipa::path(
    post,
    request_body = AppointmentPayload,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentView),
        (status = 400, description = "Invalid data or doctor already booked at this time"),
        (status = 404, description = "Patient or doctor not found")
    ),
    tag = APPOINTMENT_TAG,
    description = "Book an appointment for one of the caller's patients"
)]
#[post("/api/appointments")]
pub async fn create_appointment(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    payload: web::Json<AppointmentPayload>,
) -> Result<HttpResponse, ApiError> {
    let appointment = app_state
        .service
        .create_appointment(&user, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(appointment))
}

#[utoipa::path(
    get,
    params(("id" = i64, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment detail", body = AppointmentView),
        (status = 404, description = "Appointment not found")
    ),
    tag = APPOINTMENT_TAG,
    description = "Retrieve an appointment"
)]
#[get("/api/appointments/{id}")]
pub async fn get_appointment(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let appointment = app_state
        .service
        .get_appointment(&user, id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(appointment))
}

#[utoipa::path(
    put,
    params(("id" = i64, Path, description = "Appointment id")),
    request_body = AppointmentPayload,
    responses(
        (status = 200, description = "Appointment updated", body = AppointmentView),
        (status = 400, description = "Invalid data or doctor already booked at this time"),
        (status = 403, description = "Appointment belongs to another user"),
        (status = 404, description = "Appointment not found")
    ),
    tag = APPOINTMENT_TAG,
    description = "Replace an appointment"
)]
#[put("/api/appointments/{id}")]
pub async fn replace_appointment(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
    payload: web::Json<AppointmentPayload>,
) -> Result<HttpResponse, ApiError> {
    let appointment = app_state
        .service
        .update_appointment(&user, id.into_inner(), payload.into_inner(), WriteMode::Replace)
        .await?;
    Ok(HttpResponse::Ok().json(appointment))
}

#[utoipa::path(
    patch,
    params(("id" = i64, Path, description = "Appointment id")),
    request_body = AppointmentPayload,
    responses(
        (status = 200, description = "Appointment updated", body = AppointmentView),
        (status = 400, description = "Invalid data or doctor already booked at this time"),
        (status = 403, description = "Appointment belongs to another user"),
        (status = 404, description = "Appointment not found")
    ),
    tag = APPOINTMENT_TAG,
    description = "Partially update an appointment, e.g. cancel it"
)]
#[patch("/api/appointments/{id}")]
pub async fn patch_appointment(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
    payload: web::Json<AppointmentPayload>,
) -> Result<HttpResponse, ApiError> {
    let appointment = app_state
        .service
        .update_appointment(&user, id.into_inner(), payload.into_inner(), WriteMode::Patch)
        .await?;
    Ok(HttpResponse::Ok().json(appointment))
}

#[utoipa::path(
    delete,
    params(("id" = i64, Path, description = "Appointment id")),
    responses(
        (status = 204, description = "Appointment deleted"),
        (status = 403, description = "Appointment belongs to another user"),
        (status = 404, description = "Appointment not found")
    ),
    tag = APPOINTMENT_TAG,
    description = "Delete an appointment"
)]
#[delete("/api/appointments/{id}")]
pub async fn delete_appointment(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let appointment_id = id.into_inner();
    app_state
        .service
        .delete_appointment(&user, appointment_id)
        .await?;
    info!(app_state.log, "delete_appointment: {} by {}", appointment_id, user.username);
    Ok(HttpResponse::NoContent().finish())
}
