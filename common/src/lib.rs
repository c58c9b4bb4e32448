pub mod clinic_dto;
pub mod clinic_service;
pub mod database_factory;
pub mod jwt_helper;
pub mod password_helper;
pub mod server_config;
pub mod service_error;
pub mod utils;
