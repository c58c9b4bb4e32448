pub(crate) const AUTH_TAG: &str = "AUTH";
pub(crate) const PATIENT_TAG: &str = "PATIENTS";
pub(crate) const DOCTOR_TAG: &str = "DOCTORS";
pub(crate) const MAPPING_TAG: &str = "MAPPINGS";
pub(crate) const APPOINTMENT_TAG: &str = "APPOINTMENTS";
pub(crate) const WEBAPI_TAG: &str = "WEBAPI";

pub(crate) const OPENAPI_PATH: &str = "/api-docs/openapi.json";

// 无需登录即可访问的路径
pub(crate) const PUBLIC_PATHS: &[&str] = &[
    "/api/auth/register",
    "/api/auth/login",
    "/api/token",
    "/api/token/refresh",
    "/echo",
    OPENAPI_PATH,
];

pub(crate) const NOT_PROVIDED: &str = "Authentication credentials were not provided.";
