// src/apilog_middleware.rs
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
};
use common::jwt_helper::Identity;
use futures_util::future::LocalBoxFuture;
use slog::{Logger, info};
use std::future::{Ready, ready};
use std::rc::Rc;
use std::time::Instant;

pub struct ApiLoggerMiddleware {
    pub logger: Logger,
}

impl<S, B> Transform<S, ServiceRequest> for ApiLoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ApiLoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiLoggerMiddlewareService {
            service: Rc::new(service),
            logger: self.logger.clone(),
        }))
    }
}

pub struct ApiLoggerMiddlewareService<S> {
    service: Rc<S>,
    logger: Logger,
}

impl<S, B> Service<ServiceRequest> for ApiLoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let logger = self.logger.clone();
        let method = req.method().clone();
        let path = req.path().to_string();
        let peer_addr = req
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        let request_id = generate_request_id();

        // 不记录 Authorization 等敏感头
        info!(logger, "API Request Started";
              "method" => method.as_str(),
              "path" => &path,
              "query_params" => req.query_string(),
              "peer_addr" => &peer_addr,
              "request_id" => &request_id);

        let fut = self.service.call(req);

        Box::pin(async move {
            let start_time = Instant::now();
            let res = fut.await?;
            let duration = start_time.elapsed().as_millis() as u64;
            // 认证中间件处理后才有用户信息
            let (user_id, username) = res
                .request()
                .extensions()
                .get::<Identity>()
                .map(|identity| (identity.user_id.to_string(), identity.username.clone()))
                .unwrap_or_default();

            info!(logger, "API Request Completed";
                  "method" => method.as_str(),
                  "path" => &path,
                  "status" => res.response().status().as_u16(),
                  "duration_ms" => duration,
                  "user" => &username,
                  "user_id" => &user_id,
                  "request_id" => &request_id);

            Ok(res)
        })
    }
}

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{:x}", now)
}
