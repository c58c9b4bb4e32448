use crate::api_error::ApiError;
use crate::constants::NOT_PROVIDED;
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use common::jwt_helper::Identity;
use common::service_error::ServiceError;
use std::future::{Ready, ready};
use std::ops::Deref;

/// 当前请求的登录用户, 由认证中间件写入请求扩展.
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser(pub(crate) Identity);

impl Deref for CurrentUser {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = req.extensions().get::<Identity>().cloned();
        ready(match identity {
            Some(identity) => Ok(CurrentUser(identity)),
            None => Err(ApiError(ServiceError::Authentication(NOT_PROVIDED.to_string()))),
        })
    }
}
