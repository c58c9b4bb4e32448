mod api_error;
mod apilog_middleware;
mod appointment_controller;
mod auth_controller;
mod auth_information;
mod auth_middleware;
mod common_controller;
mod constants;
mod doctor_controller;
mod mapping_controller;
mod patient_controller;

use crate::api_error::{json_error_handler, path_error_handler, query_error_handler};
use crate::apilog_middleware::ApiLoggerMiddleware;
use crate::auth_middleware::AuthMiddleware;
use crate::constants::OPENAPI_PATH;
use actix_cors::Cors;
use actix_web::middleware::NormalizePath;
use actix_web::{App, HttpResponse, HttpServer, http, web};
use common::clinic_dto::{
    AccessToken, AppointmentPayload, AppointmentView, DoctorDetail, DoctorPayload, DoctorSummary,
    DoctorView, LoginPayload, MappingPayload, MappingView, PatientDetail, PatientPayload,
    PatientSummary, PatientView, RefreshPayload, RegisterPayload, RegisterResponse, UserView,
};
use common::clinic_service::ClinicService;
use common::jwt_helper::{TokenPair, TokenService};
use common::utils::setup_logging;
use common::{database_factory, server_config};
use database::clinic_dbtype::{AppointmentStatus, Gender, Specialization};
use slog::{Logger, error, info};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        auth_controller::register,
        auth_controller::login,
        auth_controller::obtain_token,
        auth_controller::refresh_token,
        patient_controller::list_patients,
        patient_controller::create_patient,
        patient_controller::get_patient,
        patient_controller::replace_patient,
        patient_controller::patch_patient,
        patient_controller::delete_patient,
        patient_controller::patient_doctors,
        doctor_controller::list_doctors,
        doctor_controller::create_doctor,
        doctor_controller::get_doctor,
        doctor_controller::replace_doctor,
        doctor_controller::patch_doctor,
        doctor_controller::delete_doctor,
        doctor_controller::doctor_patients,
        mapping_controller::list_mappings,
        mapping_controller::create_mapping,
        mapping_controller::mappings_for_patient,
        mapping_controller::get_mapping,
        mapping_controller::replace_mapping,
        mapping_controller::patch_mapping,
        mapping_controller::delete_mapping,
        appointment_controller::list_appointments,
        appointment_controller::create_appointment,
        appointment_controller::get_appointment,
        appointment_controller::replace_appointment,
        appointment_controller::patch_appointment,
        appointment_controller::delete_appointment,
        common_controller::echo,
    ),
    components(schemas(
        RegisterPayload, RegisterResponse, UserView, LoginPayload, RefreshPayload, TokenPair,
        AccessToken, PatientPayload, PatientSummary, PatientDetail, PatientView, DoctorPayload,
        DoctorSummary, DoctorDetail, DoctorView, MappingPayload, MappingView, AppointmentPayload,
        AppointmentView, Gender, Specialization, AppointmentStatus
    )),
    tags(
        (name = "AUTH", description = "Registration and JWT tokens"),
        (name = "PATIENTS", description = "Patients owned by the caller"),
        (name = "DOCTORS", description = "Doctor directory"),
        (name = "MAPPINGS", description = "Patient to doctor assignments"),
        (name = "APPOINTMENTS", description = "Appointment booking"),
        (name = "WEBAPI", description = "Service health")
    )
)]
struct ApiDoc;

// 定义应用状态
#[derive(Clone)]
pub(crate) struct AppState {
    log: Logger,
    service: ClinicService,
}

async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

// 路由与请求解析错误处理, main 与测试共用
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .service(auth_controller::register)
        .service(auth_controller::login)
        .service(auth_controller::obtain_token)
        .service(auth_controller::refresh_token)
        .service(patient_controller::list_patients)
        .service(patient_controller::create_patient)
        .service(patient_controller::patient_doctors)
        .service(patient_controller::get_patient)
        .service(patient_controller::replace_patient)
        .service(patient_controller::patch_patient)
        .service(patient_controller::delete_patient)
        .service(doctor_controller::list_doctors)
        .service(doctor_controller::create_doctor)
        .service(doctor_controller::doctor_patients)
        .service(doctor_controller::get_doctor)
        .service(doctor_controller::replace_doctor)
        .service(doctor_controller::patch_doctor)
        .service(doctor_controller::delete_doctor)
        .service(mapping_controller::list_mappings)
        .service(mapping_controller::create_mapping)
        .service(mapping_controller::mappings_for_patient)
        .service(mapping_controller::get_mapping)
        .service(mapping_controller::replace_mapping)
        .service(mapping_controller::patch_mapping)
        .service(mapping_controller::delete_mapping)
        .service(appointment_controller::list_appointments)
        .service(appointment_controller::create_appointment)
        .service(appointment_controller::get_appointment)
        .service(appointment_controller::replace_appointment)
        .service(appointment_controller::patch_appointment)
        .service(appointment_controller::delete_appointment)
        .service(common_controller::echo)
        .route(OPENAPI_PATH, web::get().to(openapi_json));
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = server_config::load_config();
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            let log = setup_logging("clinic-server");
            error!(log, "Error loading config: {:?}", e);
            return Err(std::io::Error::other(e));
        }
    };

    let log_name = config
        .log
        .as_ref()
        .map(|l| l.name.clone())
        .unwrap_or_else(|| "clinic-server".to_string());
    let log = setup_logging(&log_name);

    let server_config = config.server.clone();
    info!(
        log,
        "Starting the server at {}:{}", server_config.host, server_config.port
    );
    info!(log, "Database type: {}", config.database.dbtype);

    let db = match database_factory::create_db_instance(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!(log, "Failed to create database instance: {}", e);
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    let tokens = TokenService::new(&config.jwt);
    let app_state = AppState {
        log: log.clone(),
        service: ClinicService::new(db, tokens, log.clone()),
    };

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![http::header::AUTHORIZATION, http::header::ACCEPT])
            .allowed_header(http::header::CONTENT_TYPE)
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(AuthMiddleware {
                logger: app_state.log.clone(),
                service: app_state.service.clone(),
            })
            .wrap(ApiLoggerMiddleware {
                logger: app_state.log.clone(),
            })
            .wrap(cors)
            .wrap(NormalizePath::trim())
            .configure(configure_routes)
    })
    .bind((server_config.host, server_config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NOT_PROVIDED;
    use actix_web::body::MessageBody;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use common::clinic_service::APPOINTMENT_CONFLICT;
    use common::server_config::JwtConfig;
    use database::clinic_mem::MemDbProvider;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn test_state() -> AppState {
        let log = Logger::root(slog::Discard, slog::o!());
        let tokens = TokenService::new(&JwtConfig {
            secret: "http-test-secret".to_string(),
            access_token_minutes: 5,
            refresh_token_days: 1,
        });
        AppState {
            log: log.clone(),
            service: ClinicService::new(Arc::new(MemDbProvider::new()), tokens, log),
        }
    }

    macro_rules! clinic_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .wrap(AuthMiddleware {
                        logger: $state.log.clone(),
                        service: $state.service.clone(),
                    })
                    .wrap(ApiLoggerMiddleware {
                        logger: $state.log.clone(),
                    })
                    .wrap(NormalizePath::trim())
                    .configure(configure_routes),
            )
            .await
        };
    }

    async fn send<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
    where
        S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let resp = test::call_service(app, req).await;
        let status = resp.status();
        let bytes = test::read_body(resp).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn register_body(username: &str) -> Value {
        json!({
            "username": username,
            "password": "Tr1cky-Harbor-42",
            "password2": "Tr1cky-Harbor-42",
            "email": format!("{}@example.com", username),
            "first_name": "Test",
            "last_name": "User"
        })
    }

    fn bearer(token: &str) -> (http::header::HeaderName, String) {
        (http::header::AUTHORIZATION, format!("Bearer {}", token))
    }

    fn patient_body(first_name: &str) -> Value {
        json!({
            "first_name": first_name,
            "last_name": "Doe",
            "date_of_birth": "1990-05-17",
            "gender": "F",
            "contact_number": "5550100"
        })
    }

    fn doctor_body(license: &str) -> Value {
        json!({
            "first_name": "John",
            "last_name": "Smith",
            "specialization": "SUR",
            "contact_number": "5550199",
            "license_number": license,
            "hospital": "General"
        })
    }

    #[actix_web::test]
    async fn test_protected_routes_require_token() {
        let state = test_state();
        let app = clinic_app!(state);

        let (status, body) = send(&app, TestRequest::get().uri("/api/patients").to_request()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": NOT_PROVIDED }));

        let req = TestRequest::get()
            .uri("/api/patients")
            .insert_header(bearer("not-a-jwt"))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let resp = test::call_service(&app, TestRequest::get().uri("/echo").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let (status, body) = send(&app, TestRequest::get().uri(OPENAPI_PATH).to_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/appointments"].is_object());
    }

    #[actix_web::test]
    async fn test_register_login_refresh_over_http() {
        let state = test_state();
        let app = clinic_app!(state);

        let req = TestRequest::post()
            .uri("/api/auth/register/")
            .set_json(register_body("alice"))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["access"].is_string());

        // 重复注册
        let req = TestRequest::post()
            .uri("/api/auth/register")
            .set_json(register_body("alice"))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["username"].is_array());

        let req = TestRequest::post()
            .uri("/api/token")
            .set_json(json!({ "username": "alice", "password": "Tr1cky-Harbor-42" }))
            .to_request();
        let (status, tokens) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);

        let req = TestRequest::post()
            .uri("/api/token/refresh")
            .set_json(json!({ "refresh": tokens["refresh"] }))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        let access = body["access"].as_str().unwrap().to_string();

        let req = TestRequest::get()
            .uri("/api/patients")
            .insert_header(bearer(&access))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let req = TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": "alice", "password": "wrong-password" }))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    async fn access_token<S, R, B>(app: &S, req: R) -> String
    where
        S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        body["access"].as_str().unwrap().to_string()
    }

    #[actix_web::test]
    async fn test_only_owner_can_modify_patient() {
        let state = test_state();
        let app = clinic_app!(state);
        let owner = access_token(
            &app,
            TestRequest::post()
                .uri("/api/auth/register")
                .set_json(register_body("alice"))
                .to_request(),
        )
        .await;
        let other = access_token(
            &app,
            TestRequest::post()
                .uri("/api/auth/register")
                .set_json(register_body("bruno"))
                .to_request(),
        )
        .await;

        let req = TestRequest::post()
            .uri("/api/patients")
            .insert_header(bearer(&owner))
            .set_json(patient_body("Alice"))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["age"].is_number());
        assert!(body["medical_history"].is_string());
        let id = body["id"].as_i64().unwrap();

        let req = TestRequest::put()
            .uri(&format!("/api/patients/{}", id))
            .insert_header(bearer(&other))
            .set_json(patient_body("Mallory"))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].is_string());

        let req = TestRequest::delete()
            .uri(&format!("/api/patients/{}", id))
            .insert_header(bearer(&other))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // 非本人患者不可见
        let req = TestRequest::get()
            .uri(&format!("/api/patients/{}", id))
            .insert_header(bearer(&other))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let req = TestRequest::patch()
            .uri(&format!("/api/patients/{}/", id))
            .insert_header(bearer(&owner))
            .set_json(json!({ "address": "12 Harbor Rd" }))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], "12 Harbor Rd");
        assert_eq!(body["first_name"], "Alice");

        let req = TestRequest::delete()
            .uri(&format!("/api/patients/{}", id))
            .insert_header(bearer(&owner))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let req = TestRequest::get()
            .uri("/api/patients/not-a-number")
            .insert_header(bearer(&owner))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_double_booking_and_duplicate_assignment() {
        let state = test_state();
        let app = clinic_app!(state);
        let token = access_token(
            &app,
            TestRequest::post()
                .uri("/api/auth/register")
                .set_json(register_body("alice"))
                .to_request(),
        )
        .await;

        let req = TestRequest::post()
            .uri("/api/doctors")
            .insert_header(bearer(&token))
            .set_json(doctor_body("LIC-001"))
            .to_request();
        let (status, doctor) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        let doctor_id = doctor["id"].as_i64().unwrap();

        let mut patient_ids = Vec::new();
        for name in ["Alice", "Bob"] {
            let req = TestRequest::post()
                .uri("/api/patients")
                .insert_header(bearer(&token))
                .set_json(patient_body(name))
                .to_request();
            let (status, patient) = send(&app, req).await;
            assert_eq!(status, StatusCode::CREATED);
            patient_ids.push(patient["id"].as_i64().unwrap());
        }

        let req = TestRequest::post()
            .uri("/api/appointments")
            .insert_header(bearer(&token))
            .set_json(json!({
                "doctor": doctor_id,
                "patient": patient_ids[0],
                "appointment_datetime": "2025-01-10T10:00:00Z",
                "reason": "Checkup"
            }))
            .to_request();
        let (status, booked) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(booked["status"], "SCHEDULED");

        let req = TestRequest::post()
            .uri("/api/appointments")
            .insert_header(bearer(&token))
            .set_json(json!({
                "doctor": doctor_id,
                "patient": patient_ids[1],
                "appointment_datetime": "2025-01-10T10:00:00Z"
            }))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "non_field_errors": [APPOINTMENT_CONFLICT] }));

        let req = TestRequest::get()
            .uri(&format!("/api/appointments?doctor={}&status=SCHEDULED", doctor_id))
            .insert_header(bearer(&token))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));

        let mapping = json!({ "patient": patient_ids[0], "doctor": doctor_id });
        let req = TestRequest::post()
            .uri("/api/mappings")
            .insert_header(bearer(&token))
            .set_json(&mapping)
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["doctor_name"], "Dr. John Smith");

        let req = TestRequest::post()
            .uri("/api/mappings")
            .insert_header(bearer(&token))
            .set_json(&mapping)
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = TestRequest::get()
            .uri(&format!("/api/doctors/{}/patients", doctor_id))
            .insert_header(bearer(&token))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"].as_i64(), Some(patient_ids[0]));
    }

    #[actix_web::test]
    async fn test_malformed_body_is_validation_error() {
        let state = test_state();
        let app = clinic_app!(state);
        let req = TestRequest::post()
            .uri("/api/auth/register")
            .insert_header((http::header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["non_field_errors"].is_array());
    }
}
