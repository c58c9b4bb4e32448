use crate::AppState;
use crate::api_error::ApiError;
use crate::auth_information::CurrentUser;
use crate::constants::MAPPING_TAG;
use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use common::clinic_dto::{MappingPayload, MappingView, WriteMode};
use slog::info;

#[utoipa::path(
    get,
    responses(
        (status = 200, description = "Assignments visible to the caller", body = Vec<MappingView>)
    ),
    tag = MAPPING_TAG,
    description = "List assignments whose patient or doctor belongs to the caller"
)]
#[get("/api/mappings")]
pub async fn list_mappings(
    app_state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    let mappings = app_state.service.list_mappings(&user).await?;
    Ok(HttpResponse::Ok().json(mappings))
}

#[utoipa::path(
    post,
    request_body = MappingPayload,
    responses(
        (status = 201, description = "Doctor assigned", body = MappingView),
        (status = 400, description = "Invalid data or doctor already assigned"),
        (status = 403, description = "Patient belongs to another user")
    ),
    tag = MAPPING_TAG,
    description = "Assign a doctor to one of the caller's patients"
)]
#[post("/api/mappings")]
pub async fn create_mapping(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    payload: web::Json<MappingPayload>,
) -> Result<HttpResponse, ApiError> {
    let mapping = app_state
        .service
        .create_mapping(&user, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(mapping))
}

#[utoipa::path(
    get,
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Active doctor assignments", body = Vec<MappingView>),
        (status = 403, description = "Patient belongs to another user"),
        (status = 404, description = "Patient not found")
    ),
    tag = MAPPING_TAG,
    description = "List the doctors currently assigned to a patient"
)]
#[get("/api/mappings/patient/{id}")]
pub async fn mappings_for_patient(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let mappings = app_state
        .service
        .mappings_for_patient(&user, id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(mappings))
}

#[utoipa::path(
    get,
    params(("id" = i64, Path, description = "Mapping id")),
    responses(
        (status = 200, description = "Assignment detail", body = MappingView),
        (status = 404, description = "Assignment not found")
    ),
    tag = MAPPING_TAG,
    description = "Retrieve an assignment"
)]
#[get("/api/mappings/{id}")]
pub async fn get_mapping(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let mapping = app_state.service.get_mapping(&user, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(mapping))
}

#[utoipa::path(
    put,
    params(("id" = i64, Path, description = "Mapping id")),
    request_body = MappingPayload,
    responses(
        (status = 200, description = "Assignment updated", body = MappingView),
        (status = 400, description = "Invalid data"),
        (status = 403, description = "Patient belongs to another user"),
        (status = 404, description = "Assignment not found")
    ),
    tag = MAPPING_TAG,
    description = "Replace an assignment"
)]
#[put("/api/mappings/{id}")]
pub async fn replace_mapping(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
    payload: web::Json<MappingPayload>,
) -> Result<HttpResponse, ApiError> {
    let mapping = app_state
        .service
        .update_mapping(&user, id.into_inner(), payload.into_inner(), WriteMode::Replace)
        .await?;
    Ok(HttpResponse::Ok().json(mapping))
}

#[utoipa::path(
    patch,
    params(("id" = i64, Path, description = "Mapping id")),
    request_body = MappingPayload,
    responses(
        (status = 200, description = "Assignment updated", body = MappingView),
        (status = 400, description = "Invalid data"),
        (status = 403, description = "Patient belongs to another user"),
        (status = 404, description = "Assignment not found")
    ),
    tag = MAPPING_TAG,
    description = "Partially update an assignment"
)]
#[patch("/api/mappings/{id}")]
pub async fn patch_mapping(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
    payload: web::Json<MappingPayload>,
) -> Result<HttpResponse, ApiError> {
    let mapping = app_state
        .service
        .update_mapping(&user, id.into_inner(), payload.into_inner(), WriteMode::Patch)
        .await?;
    Ok(HttpResponse::Ok().json(mapping))
}

#[utoipa::path(
    delete,
    params(("id" = i64, Path, description = "Mapping id")),
    responses(
        (status = 204, description = "Assignment removed"),
        (status = 403, description = "Patient belongs to another user"),
        (status = 404, description = "Assignment not found")
    ),
    tag = MAPPING_TAG,
    description = "Remove an assignment"
)]
#[delete("/api/mappings/{id}")]
pub async fn delete_mapping(
    app_state: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let mapping_id = id.into_inner();
    app_state.service.delete_mapping(&user, mapping_id).await?;
    info!(app_state.log, "delete_mapping: {} by {}", mapping_id, user.username);
    Ok(HttpResponse::NoContent().finish())
}
