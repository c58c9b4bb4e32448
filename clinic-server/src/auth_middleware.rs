// auth_middleware.rs
use crate::api_error::ApiError;
use crate::constants::{NOT_PROVIDED, PUBLIC_PATHS};
use actix_web::body::{EitherBody, MessageBody};
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, ResponseError,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
};
use common::clinic_service::ClinicService;
use common::service_error::ServiceError;
use futures_util::future::LocalBoxFuture;
use slog::{Logger, info};
use std::future::{Ready, ready};
use std::rc::Rc;

pub struct AuthMiddleware {
    pub(crate) logger: Logger,
    pub(crate) service: ClinicService,
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            clinic: self.service.clone(),
            log: self.logger.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    clinic: ClinicService,
    log: Logger,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let clinic = self.clinic.clone();
        let log = self.log.clone();

        // 公开接口与 CORS 预检请求不做认证
        if req.method() == Method::OPTIONS || PUBLIC_PATHS.contains(&req.path()) {
            return Box::pin(async move {
                let res = service.call(req).await?;
                Ok(res.map_into_left_body())
            });
        }

        Box::pin(async move {
            let token = match bearer_token(&req) {
                Some(token) => token,
                None => {
                    info!(log, "Authentication failed: no bearer token"; "path" => req.path());
                    let response =
                        ApiError(ServiceError::Authentication(NOT_PROVIDED.to_string()))
                            .error_response();
                    return Ok(req.into_response(response.map_into_right_body()));
                }
            };

            match clinic.authenticate_bearer(&token).await {
                Ok(identity) => {
                    // 写入请求扩展, 供 CurrentUser 提取
                    req.extensions_mut().insert(identity);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    info!(log, "Authentication failed: {}", e; "path" => req.path());
                    let response = ApiError(e).error_response();
                    Ok(req.into_response(response.map_into_right_body()))
                }
            }
        })
    }
}
