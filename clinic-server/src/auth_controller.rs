use crate::AppState;
use crate::api_error::ApiError;
use crate::constants::AUTH_TAG;
use actix_web::{HttpResponse, post, web};
use common::clinic_dto::{AccessToken, LoginPayload, RefreshPayload, RegisterPayload, RegisterResponse};
use common::jwt_helper::TokenPair;
use slog::info;

#[utoipa::path(
    post,
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Invalid registration data")
    ),
    tag = AUTH_TAG,
    description = "Register a new account and receive a token pair"
)]
#[post("/api/auth/register")]
pub async fn register(
    app_state: web::Data<AppState>,
    payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, ApiError> {
    let response = app_state.service.register(payload.into_inner()).await?;
    info!(app_state.log, "register: {}", response.user.username);
    Ok(HttpResponse::Created().json(response))
}

#[utoipa::path(
    post,
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Login success", body = TokenPair),
        (status = 401, description = "Invalid credentials")
    ),
    tag = AUTH_TAG,
    description = "Exchange username and password for a token pair"
)]
#[post("/api/auth/login")]
pub async fn login(
    app_state: web::Data<AppState>,
    payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, ApiError> {
    let tokens = app_state.service.login(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Login success", body = TokenPair),
        (status = 401, description = "Invalid credentials")
    ),
    tag = AUTH_TAG,
    description = "Alias of /api/auth/login"
)]
#[post("/api/token")]
pub async fn obtain_token(
    app_state: web::Data<AppState>,
    payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, ApiError> {
    let tokens = app_state.service.login(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    request_body = RefreshPayload,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 401, description = "Refresh token is invalid or expired")
    ),
    tag = AUTH_TAG,
    description = "Issue a new access token from a refresh token"
)]
#[post("/api/token/refresh")]
pub async fn refresh_token(
    app_state: web::Data<AppState>,
    payload: web::Json<RefreshPayload>,
) -> Result<HttpResponse, ApiError> {
    let access = app_state.service.refresh(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(access))
}
