use crate::constants::WEBAPI_TAG;
use actix_web::{HttpResponse, Responder, get};

/// 存活检查, 无需登录
#[utoipa::path(
    get,
    responses(
        (status = 200, description = "Echo Success"),
    ),
    tag = WEBAPI_TAG,
    description = "Echo endpoint"
)]
#[get("/echo")]
pub async fn echo() -> impl Responder {
    HttpResponse::Ok().body("Success")
}
