use crate::jwt_helper::TokenPair;
use crate::password_helper::{UserAttributes, validate_password};
use crate::service_error::{ErrorCollector, ServiceError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use database::clinic_dbtype::{
    AppointmentStatus, CONTACT_MAX_LEN, EMAIL_MAX_LEN, Gender, HOSPITAL_MAX_LEN, LICENSE_MAX_LEN,
    NAME_MAX_LEN, Specialization, USERNAME_MAX_LEN, UnknownCode,
};
use database::clinic_meta::{
    AppointmentEntity, AppointmentFilter, AppointmentRecord, DoctorEntity, DoctorRecord,
    MappingChanges, MappingEntity, MappingRow, NewMapping, PatientEntity, PatientRecord,
    UserEntity,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const INVALID_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
const INVALID_DATETIME: &str = "Datetime has wrong format. Use one of these formats instead: \
     YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";
const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, \
     numbers, and @/./+/-/_ characters.";
pub const PASSWORD_MISMATCH: &str = "Password fields didn't match.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9._%+\-']+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .unwrap();
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[\w.@+\-]+$").unwrap();
}

/// 写操作模式: 创建, 整体替换(PUT), 部分更新(PATCH).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Replace,
    Patch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Create,
    Retrieve,
    Update,
    PartialUpdate,
}

/// 输出形状, 列表用精简形状, 其余用完整形状.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewShape {
    Summary,
    Detail,
}

impl ViewShape {
    pub fn for_action(action: Action) -> Self {
        match action {
            Action::List => ViewShape::Summary,
            Action::Create | Action::Retrieve | Action::Update | Action::PartialUpdate => {
                ViewShape::Detail
            }
        }
    }
}

// 按写模式取字段值并记录错误
struct FieldReader<'a> {
    errors: &'a mut ErrorCollector,
    mode: WriteMode,
}

impl FieldReader<'_> {
    fn resolve<T: Clone>(
        &mut self,
        field: &str,
        incoming: Option<T>,
        existing: Option<&T>,
        required: bool,
    ) -> Option<T> {
        match incoming {
            Some(value) => Some(value),
            None if self.mode == WriteMode::Patch => existing.cloned(),
            None if required => {
                self.errors.add(field, REQUIRED);
                None
            }
            None => existing.cloned(),
        }
    }

    fn text(
        &mut self,
        field: &str,
        incoming: Option<String>,
        existing: Option<&String>,
        required: bool,
        max_len: Option<usize>,
    ) -> Option<String> {
        let incoming = incoming.map(|s| s.trim().to_string());
        let value = self.resolve(field, incoming, existing, required)?;
        if required && value.is_empty() {
            self.errors.add(field, BLANK);
            return None;
        }
        if let Some(max_len) = max_len {
            if value.chars().count() > max_len {
                self.errors.add(
                    field,
                    format!("Ensure this field has no more than {} characters.", max_len),
                );
                return None;
            }
        }
        Some(value)
    }

    fn email(
        &mut self,
        field: &str,
        incoming: Option<String>,
        existing: Option<&String>,
        required: bool,
    ) -> Option<String> {
        let value = self.text(field, incoming, existing, required, Some(EMAIL_MAX_LEN))?;
        if !value.is_empty() && !EMAIL_REGEX.is_match(&value) {
            self.errors.add(field, INVALID_EMAIL);
            return None;
        }
        Some(value)
    }

    fn choice<T>(
        &mut self,
        field: &str,
        incoming: Option<String>,
        existing: Option<T>,
        default: Option<T>,
    ) -> Option<T>
    where
        T: FromStr<Err = UnknownCode> + Copy,
    {
        match incoming {
            Some(code) => match T::from_str(code.trim()) {
                Ok(value) => Some(value),
                Err(e) => {
                    self.errors.add(field, e.to_string());
                    None
                }
            },
            None if self.mode == WriteMode::Patch => existing,
            None => match default {
                Some(default) => existing.or(Some(default)),
                None => {
                    self.errors.add(field, REQUIRED);
                    None
                }
            },
        }
    }

    fn date(
        &mut self,
        field: &str,
        incoming: Option<String>,
        existing: Option<NaiveDate>,
    ) -> Option<NaiveDate> {
        let raw = match incoming {
            Some(raw) => raw,
            None => return self.resolve(field, None, existing.as_ref(), true),
        };
        match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.errors.add(field, INVALID_DATE);
                None
            }
        }
    }

    fn datetime(
        &mut self,
        field: &str,
        incoming: Option<String>,
        existing: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        let raw = match incoming {
            Some(raw) => raw,
            None => return self.resolve(field, None, existing.as_ref(), true),
        };
        match parse_datetime(raw.trim()) {
            Some(value) => Some(value),
            None => {
                self.errors.add(field, INVALID_DATETIME);
                None
            }
        }
    }

    fn id(&mut self, field: &str, incoming: Option<i64>, existing: Option<i64>) -> Option<i64> {
        self.resolve(field, incoming, existing.as_ref(), true)
    }
}

/// RFC 3339, 不带时区时按 UTC 处理.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PatientPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// YYYY-MM-DD
    pub date_of_birth: Option<String>,
    /// M | F | O
    pub gender: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
}

impl PatientPayload {
    pub fn into_record(
        self,
        mode: WriteMode,
        existing: Option<&PatientRecord>,
    ) -> Result<PatientRecord, ServiceError> {
        let mut errors = ErrorCollector::new();
        let mut r = FieldReader {
            errors: &mut errors,
            mode,
        };
        let first_name = r.text(
            "first_name",
            self.first_name,
            existing.map(|e| &e.first_name),
            true,
            Some(NAME_MAX_LEN),
        );
        let last_name = r.text(
            "last_name",
            self.last_name,
            existing.map(|e| &e.last_name),
            true,
            Some(NAME_MAX_LEN),
        );
        let date_of_birth = r.date(
            "date_of_birth",
            self.date_of_birth,
            existing.map(|e| e.date_of_birth),
        );
        let gender = r.choice::<Gender>("gender", self.gender, existing.map(|e| e.gender), None);
        let contact_number = r.text(
            "contact_number",
            self.contact_number,
            existing.map(|e| &e.contact_number),
            true,
            Some(CONTACT_MAX_LEN),
        );
        let email = r.email("email", self.email, existing.map(|e| &e.email), false);
        let address = r.text("address", self.address, existing.map(|e| &e.address), false, None);
        let medical_history = r.text(
            "medical_history",
            self.medical_history,
            existing.map(|e| &e.medical_history),
            false,
            None,
        );
        match (first_name, last_name, date_of_birth, gender, contact_number) {
            (Some(first_name), Some(last_name), Some(date_of_birth), Some(gender), Some(contact_number))
                if errors.is_empty() =>
            {
                Ok(PatientRecord {
                    first_name,
                    last_name,
                    date_of_birth,
                    gender,
                    contact_number,
                    email: email.unwrap_or_default(),
                    address: address.unwrap_or_default(),
                    medical_history: medical_history.unwrap_or_default(),
                })
            }
            _ => errors.finish().and(Err(ServiceError::non_field("Invalid input."))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DoctorPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// GP | CAR | NEU | PED | ORTH | DERM | PSY | RAD | SUR | OTH
    pub specialization: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub license_number: Option<String>,
    pub hospital: Option<String>,
    pub address: Option<String>,
    pub experience_years: Option<i64>,
}

impl DoctorPayload {
    pub fn into_record(
        self,
        mode: WriteMode,
        existing: Option<&DoctorRecord>,
    ) -> Result<DoctorRecord, ServiceError> {
        let mut errors = ErrorCollector::new();
        let mut r = FieldReader {
            errors: &mut errors,
            mode,
        };
        let first_name = r.text(
            "first_name",
            self.first_name,
            existing.map(|e| &e.first_name),
            true,
            Some(NAME_MAX_LEN),
        );
        let last_name = r.text(
            "last_name",
            self.last_name,
            existing.map(|e| &e.last_name),
            true,
            Some(NAME_MAX_LEN),
        );
        let specialization = r.choice::<Specialization>(
            "specialization",
            self.specialization,
            existing.map(|e| e.specialization),
            None,
        );
        let contact_number = r.text(
            "contact_number",
            self.contact_number,
            existing.map(|e| &e.contact_number),
            true,
            Some(CONTACT_MAX_LEN),
        );
        let email = r.email("email", self.email, existing.map(|e| &e.email), false);
        let license_number = r.text(
            "license_number",
            self.license_number,
            existing.map(|e| &e.license_number),
            true,
            Some(LICENSE_MAX_LEN),
        );
        let hospital = r.text(
            "hospital",
            self.hospital,
            existing.map(|e| &e.hospital),
            true,
            Some(HOSPITAL_MAX_LEN),
        );
        let address = r.text("address", self.address, existing.map(|e| &e.address), false, None);
        let experience_years = match self.experience_years {
            Some(years) if years < 0 => {
                errors.add(
                    "experience_years",
                    "Ensure this value is greater than or equal to 0.",
                );
                None
            }
            Some(years) => match i32::try_from(years) {
                Ok(years) => Some(years),
                Err(_) => {
                    errors.add(
                        "experience_years",
                        format!("Ensure this value is less than or equal to {}.", i32::MAX),
                    );
                    None
                }
            },
            None => Some(existing.map(|e| e.experience_years).unwrap_or(0)),
        };
        match (
            first_name,
            last_name,
            specialization,
            contact_number,
            license_number,
            hospital,
            experience_years,
        ) {
            (
                Some(first_name),
                Some(last_name),
                Some(specialization),
                Some(contact_number),
                Some(license_number),
                Some(hospital),
                Some(experience_years),
            ) if errors.is_empty() => Ok(DoctorRecord {
                first_name,
                last_name,
                specialization,
                contact_number,
                email: email.unwrap_or_default(),
                license_number,
                hospital,
                address: address.unwrap_or_default(),
                experience_years,
            }),
            _ => errors.finish().and(Err(ServiceError::non_field("Invalid input."))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MappingPayload {
    pub patient: Option<i64>,
    pub doctor: Option<i64>,
    pub reason_for_assignment: Option<String>,
    pub is_active: Option<bool>,
}

impl MappingPayload {
    /// 只做字段校验, 归属与重复检查由业务层完成.
    pub fn into_new(self, assigned_by: i64, today: NaiveDate) -> Result<NewMapping, ServiceError> {
        let mut errors = ErrorCollector::new();
        let mut r = FieldReader {
            errors: &mut errors,
            mode: WriteMode::Create,
        };
        let patient_id = r.id("patient", self.patient, None);
        let doctor_id = r.id("doctor", self.doctor, None);
        let reason = r.text("reason_for_assignment", self.reason_for_assignment, None, false, None);
        match (patient_id, doctor_id) {
            (Some(patient_id), Some(doctor_id)) if errors.is_empty() => Ok(NewMapping {
                patient_id,
                doctor_id,
                assigned_by,
                assigned_date: today,
                reason_for_assignment: reason.unwrap_or_default(),
                is_active: self.is_active.unwrap_or(true),
            }),
            _ => errors.finish().and(Err(ServiceError::non_field("Invalid input."))),
        }
    }

    /// 已存在的分配关系不允许更换患者或医生.
    pub fn into_changes(
        self,
        mode: WriteMode,
        existing: &MappingEntity,
    ) -> Result<MappingChanges, ServiceError> {
        let mut errors = ErrorCollector::new();
        let mut r = FieldReader {
            errors: &mut errors,
            mode,
        };
        let patient_id = r.id("patient", self.patient, Some(existing.patient_id));
        let doctor_id = r.id("doctor", self.doctor, Some(existing.doctor_id));
        let reason = r.text(
            "reason_for_assignment",
            self.reason_for_assignment,
            Some(&existing.reason_for_assignment),
            false,
            None,
        );
        if patient_id.is_some_and(|id| id != existing.patient_id) {
            errors.add("patient", "The patient of an existing assignment cannot be changed.");
        }
        if doctor_id.is_some_and(|id| id != existing.doctor_id) {
            errors.add("doctor", "The doctor of an existing assignment cannot be changed.");
        }
        errors.finish()?;
        Ok(MappingChanges {
            reason_for_assignment: reason.unwrap_or_default(),
            is_active: self.is_active.unwrap_or(existing.is_active),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AppointmentPayload {
    pub doctor: Option<i64>,
    pub patient: Option<i64>,
    /// RFC 3339, 如 2025-01-01T10:00:00Z
    pub appointment_datetime: Option<String>,
    pub reason: Option<String>,
    /// SCHEDULED | COMPLETED | CANCELLED
    pub status: Option<String>,
}

impl AppointmentPayload {
    pub fn into_record(
        self,
        mode: WriteMode,
        existing: Option<&AppointmentRecord>,
    ) -> Result<AppointmentRecord, ServiceError> {
        let mut errors = ErrorCollector::new();
        let mut r = FieldReader {
            errors: &mut errors,
            mode,
        };
        let doctor_id = r.id("doctor", self.doctor, existing.map(|e| e.doctor_id));
        let patient_id = r.id("patient", self.patient, existing.map(|e| e.patient_id));
        let appointment_datetime = r.datetime(
            "appointment_datetime",
            self.appointment_datetime,
            existing.map(|e| e.appointment_datetime),
        );
        let reason = r.text("reason", self.reason, existing.map(|e| &e.reason), false, None);
        let status = r.choice::<AppointmentStatus>(
            "status",
            self.status,
            existing.map(|e| e.status),
            Some(AppointmentStatus::default()),
        );
        match (doctor_id, patient_id, appointment_datetime, status) {
            (Some(doctor_id), Some(patient_id), Some(appointment_datetime), Some(status))
                if errors.is_empty() =>
            {
                Ok(AppointmentRecord {
                    doctor_id,
                    patient_id,
                    appointment_datetime,
                    reason: reason.unwrap_or_default(),
                    status,
                })
            }
            _ => errors.finish().and(Err(ServiceError::non_field("Invalid input."))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppointmentQuery {
    pub doctor: Option<i64>,
    pub patient: Option<i64>,
    pub status: Option<String>,
}

impl AppointmentQuery {
    pub fn into_filter(self) -> Result<AppointmentFilter, ServiceError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(code) => Some(
                AppointmentStatus::from_str(code)
                    .map_err(|e| ServiceError::field("status", e.to_string()))?,
            ),
        };
        Ok(AppointmentFilter {
            doctor_id: self.doctor,
            patient_id: self.patient,
            status,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegisterPayload {
    pub username: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// 通过校验的注册信息, 密码仍为明文.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterPayload {
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().map(str::trim)
    }

    /// username_taken 由调用方预先查询.
    pub fn into_registration(self, username_taken: bool) -> Result<Registration, ServiceError> {
        let mut errors = ErrorCollector::new();
        let mut r = FieldReader {
            errors: &mut errors,
            mode: WriteMode::Create,
        };
        let username = r.text("username", self.username, None, true, Some(USERNAME_MAX_LEN));
        let email = r.email("email", self.email, None, true);
        let first_name = r.text(
            "first_name",
            self.first_name,
            None,
            true,
            Some(USERNAME_MAX_LEN),
        );
        let last_name = r.text("last_name", self.last_name, None, true, Some(USERNAME_MAX_LEN));
        // 密码不去除首尾空白
        let password = r.resolve("password", self.password, None, true);
        let password2 = r.resolve("password2", self.password2, None, true);

        if let Some(name) = username.as_deref() {
            if !USERNAME_REGEX.is_match(name) {
                errors.add("username", INVALID_USERNAME);
            } else if username_taken {
                errors.add("username", USERNAME_TAKEN);
            }
        }
        if let Some(pw) = password.as_deref() {
            if pw.is_empty() {
                errors.add("password", BLANK);
            } else {
                let attrs = UserAttributes {
                    username: username.as_deref().unwrap_or_default(),
                    email: email.as_deref().unwrap_or_default(),
                    first_name: first_name.as_deref().unwrap_or_default(),
                    last_name: last_name.as_deref().unwrap_or_default(),
                };
                for reason in validate_password(pw, &attrs) {
                    errors.add("password", reason);
                }
            }
        }
        // 字段级校验通过后才比较两次密码
        if errors.is_empty() && password != password2 {
            errors.add("password", PASSWORD_MISMATCH);
        }
        match (username, password, email, first_name, last_name) {
            (Some(username), Some(password), Some(email), Some(first_name), Some(last_name))
                if errors.is_empty() =>
            {
                Ok(Registration {
                    username,
                    password,
                    email,
                    first_name,
                    last_name,
                })
            }
            _ => errors.finish().and(Err(ServiceError::non_field("Invalid input."))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RefreshPayload {
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AccessToken {
    pub access: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserView {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&UserEntity> for UserView {
    fn from(user: &UserEntity) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserView,
    pub refresh: String,
    pub access: String,
}

impl RegisterResponse {
    pub fn new(user: &UserEntity, tokens: TokenPair) -> Self {
        Self {
            user: user.into(),
            refresh: tokens.refresh,
            access: tokens.access,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PatientSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub contact_number: String,
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PatientDetail {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub contact_number: String,
    pub email: String,
    pub address: String,
    pub medical_history: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum PatientView {
    Summary(PatientSummary),
    Detail(PatientDetail),
}

impl PatientView {
    pub fn render(patient: &PatientEntity, shape: ViewShape, today: NaiveDate) -> Self {
        let age = patient.age_on(today);
        match shape {
            ViewShape::Summary => PatientView::Summary(PatientSummary {
                id: patient.id,
                first_name: patient.first_name.clone(),
                last_name: patient.last_name.clone(),
                date_of_birth: patient.date_of_birth,
                gender: patient.gender,
                contact_number: patient.contact_number.clone(),
                email: patient.email.clone(),
                age,
                created_at: patient.created_at,
            }),
            ViewShape::Detail => PatientView::Detail(PatientDetail {
                id: patient.id,
                first_name: patient.first_name.clone(),
                last_name: patient.last_name.clone(),
                date_of_birth: patient.date_of_birth,
                gender: patient.gender,
                contact_number: patient.contact_number.clone(),
                email: patient.email.clone(),
                address: patient.address.clone(),
                medical_history: patient.medical_history.clone(),
                age,
                created_at: patient.created_at,
                updated_at: patient.updated_at,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DoctorSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub specialization: Specialization,
    pub contact_number: String,
    pub email: String,
    pub license_number: String,
    pub hospital: String,
    pub experience_years: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DoctorDetail {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub specialization: Specialization,
    pub contact_number: String,
    pub email: String,
    pub license_number: String,
    pub hospital: String,
    pub address: String,
    pub experience_years: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum DoctorView {
    Summary(DoctorSummary),
    Detail(DoctorDetail),
}

impl DoctorView {
    pub fn render(doctor: &DoctorEntity, shape: ViewShape) -> Self {
        match shape {
            ViewShape::Summary => DoctorView::Summary(DoctorSummary {
                id: doctor.id,
                first_name: doctor.first_name.clone(),
                last_name: doctor.last_name.clone(),
                specialization: doctor.specialization,
                contact_number: doctor.contact_number.clone(),
                email: doctor.email.clone(),
                license_number: doctor.license_number.clone(),
                hospital: doctor.hospital.clone(),
                experience_years: doctor.experience_years,
                created_at: doctor.created_at,
            }),
            ViewShape::Detail => DoctorView::Detail(DoctorDetail {
                id: doctor.id,
                first_name: doctor.first_name.clone(),
                last_name: doctor.last_name.clone(),
                specialization: doctor.specialization,
                contact_number: doctor.contact_number.clone(),
                email: doctor.email.clone(),
                license_number: doctor.license_number.clone(),
                hospital: doctor.hospital.clone(),
                address: doctor.address.clone(),
                experience_years: doctor.experience_years,
                created_at: doctor.created_at,
                updated_at: doctor.updated_at,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MappingView {
    pub id: i64,
    pub patient: i64,
    pub doctor: i64,
    pub assigned_by: Option<i64>,
    pub assigned_date: NaiveDate,
    pub reason_for_assignment: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub patient_name: String,
    pub doctor_name: String,
    pub assigned_by_username: Option<String>,
}

impl From<&MappingRow> for MappingView {
    fn from(row: &MappingRow) -> Self {
        let m = &row.mapping;
        Self {
            id: m.id,
            patient: m.patient_id,
            doctor: m.doctor_id,
            assigned_by: m.assigned_by,
            assigned_date: m.assigned_date,
            reason_for_assignment: m.reason_for_assignment.clone(),
            is_active: m.is_active,
            created_at: m.created_at,
            patient_name: row.patient_name.clone(),
            doctor_name: row.doctor_name.clone(),
            assigned_by_username: row.assigned_by_username.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AppointmentView {
    pub id: i64,
    pub doctor: i64,
    pub patient: i64,
    pub appointment_datetime: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<&AppointmentEntity> for AppointmentView {
    fn from(a: &AppointmentEntity) -> Self {
        Self {
            id: a.id,
            doctor: a.doctor_id,
            patient: a.patient_id,
            appointment_datetime: a.appointment_datetime,
            reason: a.reason.clone(),
            status: a.status,
            created_by: a.created_by,
            created_at: a.created_at,
        }
    }
}
