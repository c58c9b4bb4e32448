use crate::clinic_dto::{
    AccessToken, Action, AppointmentPayload, AppointmentQuery, AppointmentView, DoctorPayload,
    DoctorView, LoginPayload, MappingPayload, MappingView, PatientPayload, PatientView,
    RefreshPayload, RegisterPayload, RegisterResponse, USERNAME_TAKEN, ViewShape, WriteMode,
};
use crate::jwt_helper::{Identity, TokenError, TokenPair, TokenService, TokenType};
use crate::password_helper;
use crate::service_error::ServiceError;
use chrono::{NaiveDate, Utc};
use database::clinic_dbprovider::{
    DbError, DbProvider, UQ_APPOINTMENT_SCHEDULED_SLOT, UQ_DOCTOR_LICENSE, UQ_MAPPING_PAIR,
    UQ_USER_USERNAME,
};
use database::clinic_dbtype::AppointmentStatus;
use database::clinic_meta::{
    AppointmentRow, DoctorEntity, MappingRow, NewUser, PatientEntity, UserEntity,
};
use slog::{Logger, info, warn};
use std::sync::Arc;

pub const APPOINTMENT_CONFLICT: &str = "Doctor already has an appointment at this time.";
pub const ALREADY_ASSIGNED: &str = "This doctor is already assigned to the patient";
pub const LICENSE_TAKEN: &str = "doctor with this license number already exists.";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_TOKEN: &str = "Token is invalid or expired";

const PATIENT_UPDATE_DENIED: &str = "You do not have permission to update this patient.";
const PATIENT_DELETE_DENIED: &str = "You do not have permission to delete this patient.";
const DOCTOR_UPDATE_DENIED: &str = "You can only update doctors you created.";
const DOCTOR_DELETE_DENIED: &str = "You can only delete doctors you created.";
const DOCTOR_PATIENTS_DENIED: &str = "You can only view patients for doctors you created.";
const ASSIGN_DENIED: &str = "You can only assign doctors to your own patients";
const MAPPING_VIEW_DENIED: &str = "You can only view doctors for your own patients";
const MAPPING_MODIFY_DENIED: &str = "You can only modify assignments for your own patients";
const APPOINTMENT_MODIFY_DENIED: &str =
    "You can only modify appointments for your own patients or that you created.";

/// 约束冲突翻译为与应用层预检查相同的校验错误.
fn map_db_error(e: DbError) -> ServiceError {
    match &e {
        DbError::UniqueViolation(c) if c == UQ_USER_USERNAME => {
            ServiceError::field("username", USERNAME_TAKEN)
        }
        DbError::UniqueViolation(c) if c == UQ_DOCTOR_LICENSE => {
            ServiceError::field("license_number", LICENSE_TAKEN)
        }
        DbError::UniqueViolation(c) if c == UQ_MAPPING_PAIR => {
            ServiceError::non_field(ALREADY_ASSIGNED)
        }
        DbError::UniqueViolation(c) if c == UQ_APPOINTMENT_SCHEDULED_SLOT => {
            ServiceError::non_field(APPOINTMENT_CONFLICT)
        }
        // 关联记录在检查之后被删除
        DbError::ForeignKeyViolation(_) => ServiceError::NotFound("related record"),
        _ => ServiceError::Storage(e),
    }
}

fn token_failure(e: TokenError) -> ServiceError {
    match e {
        TokenError::Signing(msg) => ServiceError::Internal(msg),
        TokenError::Invalid | TokenError::WrongType => {
            ServiceError::Authentication(INVALID_TOKEN.to_string())
        }
    }
}

fn identity_of(user: &UserEntity) -> Identity {
    Identity {
        user_id: user.id,
        username: user.username.clone(),
    }
}

fn mapping_visible(row: &MappingRow, actor: &Identity) -> bool {
    row.patient_owner_id == actor.user_id || row.doctor_owner_id == actor.user_id
}

fn appointment_visible(row: &AppointmentRow, actor: &Identity) -> bool {
    row.patient_owner_id == actor.user_id
        || row.doctor_owner_id == actor.user_id
        || row.appointment.created_by == Some(actor.user_id)
}

fn appointment_mutable(row: &AppointmentRow, actor: &Identity) -> bool {
    row.patient_owner_id == actor.user_id || row.appointment.created_by == Some(actor.user_id)
}

/// 校验与授权层. 请求方身份由调用方显式传入.
#[derive(Clone)]
pub struct ClinicService {
    db: Arc<dyn DbProvider>,
    tokens: TokenService,
    log: Logger,
}

impl ClinicService {
    pub fn new(db: Arc<dyn DbProvider>, tokens: TokenService, log: Logger) -> Self {
        Self { db, tokens, log }
    }

    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    // ---------------- 账号与令牌 ----------------

    pub async fn register(
        &self,
        payload: RegisterPayload,
    ) -> Result<RegisterResponse, ServiceError> {
        let taken = match payload.username() {
            Some(username) if !username.is_empty() => {
                self.db.get_user_by_username(username).await?.is_some()
            }
            _ => false,
        };
        let registration = payload.into_registration(taken)?;
        let password_hash = password_helper::hash_password(&registration.password)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let user = self
            .db
            .create_user(&NewUser {
                username: registration.username,
                password_hash,
                email: registration.email,
                first_name: registration.first_name,
                last_name: registration.last_name,
            })
            .await
            .map_err(map_db_error)?;
        info!(self.log, "user registered"; "user_id" => user.id, "username" => &user.username);
        let tokens = self
            .tokens
            .issue_pair(&identity_of(&user))
            .map_err(token_failure)?;
        Ok(RegisterResponse::new(&user, tokens))
    }

    pub async fn login(&self, payload: LoginPayload) -> Result<TokenPair, ServiceError> {
        let username = payload.username.unwrap_or_default();
        let password = payload.password.unwrap_or_default();
        let user = if username.is_empty() {
            None
        } else {
            self.db.get_user_by_username(&username).await?
        };
        let user = match user {
            Some(user) if password_helper::verify_password(&password, &user.password_hash) => user,
            Some(_) => {
                warn!(self.log, "login failed"; "username" => &username);
                return Err(ServiceError::Authentication(INVALID_CREDENTIALS.to_string()));
            }
            None => {
                password_helper::dummy_verify(&password);
                warn!(self.log, "login failed"; "username" => &username);
                return Err(ServiceError::Authentication(INVALID_CREDENTIALS.to_string()));
            }
        };
        info!(self.log, "user logged in"; "user_id" => user.id);
        self.tokens
            .issue_pair(&identity_of(&user))
            .map_err(token_failure)
    }

    pub async fn refresh(&self, payload: RefreshPayload) -> Result<AccessToken, ServiceError> {
        let refresh = match payload.refresh {
            Some(token) if !token.is_empty() => token,
            Some(_) => return Err(ServiceError::field("refresh", "This field may not be blank.")),
            None => return Err(ServiceError::field("refresh", "This field is required.")),
        };
        let identity = self
            .tokens
            .validate(&refresh, TokenType::Refresh)
            .map_err(token_failure)?;
        let user = self
            .db
            .get_user(identity.user_id)
            .await?
            .ok_or_else(|| ServiceError::Authentication(INVALID_TOKEN.to_string()))?;
        let access = self
            .tokens
            .issue_access(&identity_of(&user))
            .map_err(token_failure)?;
        Ok(AccessToken { access })
    }

    /// 校验访问令牌, 并确认用户仍然存在.
    pub async fn authenticate_bearer(&self, token: &str) -> Result<Identity, ServiceError> {
        let identity = self
            .tokens
            .validate(token, TokenType::Access)
            .map_err(token_failure)?;
        match self.db.get_user(identity.user_id).await? {
            Some(user) => Ok(identity_of(&user)),
            None => Err(ServiceError::Authentication("User not found".to_string())),
        }
    }

    // ---------------- 患者 ----------------

    // 只能看到自己创建的患者
    async fn owned_patient(
        &self,
        actor: &Identity,
        patient_id: i64,
    ) -> Result<PatientEntity, ServiceError> {
        match self.db.get_patient(patient_id).await? {
            Some(patient) if patient.user_id == actor.user_id => Ok(patient),
            _ => Err(ServiceError::NotFound("patient")),
        }
    }

    pub async fn list_patients(&self, actor: &Identity) -> Result<Vec<PatientView>, ServiceError> {
        let today = Self::today();
        let shape = ViewShape::for_action(Action::List);
        Ok(self
            .db
            .list_patients(actor.user_id)
            .await?
            .iter()
            .map(|p| PatientView::render(p, shape, today))
            .collect())
    }

    pub async fn create_patient(
        &self,
        actor: &Identity,
        payload: PatientPayload,
    ) -> Result<PatientView, ServiceError> {
        let record = payload.into_record(WriteMode::Create, None)?;
        let patient = self
            .db
            .create_patient(actor.user_id, &record)
            .await
            .map_err(map_db_error)?;
        info!(self.log, "patient created"; "patient_id" => patient.id, "user_id" => actor.user_id);
        Ok(PatientView::render(
            &patient,
            ViewShape::for_action(Action::Create),
            Self::today(),
        ))
    }

    pub async fn get_patient(
        &self,
        actor: &Identity,
        patient_id: i64,
    ) -> Result<PatientView, ServiceError> {
        let patient = self.owned_patient(actor, patient_id).await?;
        Ok(PatientView::render(
            &patient,
            ViewShape::for_action(Action::Retrieve),
            Self::today(),
        ))
    }

    pub async fn update_patient(
        &self,
        actor: &Identity,
        patient_id: i64,
        payload: PatientPayload,
        mode: WriteMode,
    ) -> Result<PatientView, ServiceError> {
        let existing = self
            .db
            .get_patient(patient_id)
            .await?
            .ok_or(ServiceError::NotFound("patient"))?;
        if existing.user_id != actor.user_id {
            warn!(self.log, "patient update denied"; "patient_id" => patient_id, "user_id" => actor.user_id);
            return Err(ServiceError::permission(PATIENT_UPDATE_DENIED));
        }
        let record = payload.into_record(mode, Some(&existing.record()))?;
        let patient = self
            .db
            .update_patient(patient_id, &record)
            .await
            .map_err(map_db_error)?
            .ok_or(ServiceError::NotFound("patient"))?;
        let action = if mode == WriteMode::Patch {
            Action::PartialUpdate
        } else {
            Action::Update
        };
        Ok(PatientView::render(
            &patient,
            ViewShape::for_action(action),
            Self::today(),
        ))
    }

    pub async fn delete_patient(&self, actor: &Identity, patient_id: i64) -> Result<(), ServiceError> {
        let existing = self
            .db
            .get_patient(patient_id)
            .await?
            .ok_or(ServiceError::NotFound("patient"))?;
        if existing.user_id != actor.user_id {
            warn!(self.log, "patient delete denied"; "patient_id" => patient_id, "user_id" => actor.user_id);
            return Err(ServiceError::permission(PATIENT_DELETE_DENIED));
        }
        if !self.db.delete_patient(patient_id).await? {
            return Err(ServiceError::NotFound("patient"));
        }
        info!(self.log, "patient deleted"; "patient_id" => patient_id, "user_id" => actor.user_id);
        Ok(())
    }

    /// 患者当前有效的医生分配, 非本人患者按不存在处理.
    pub async fn patient_doctors(
        &self,
        actor: &Identity,
        patient_id: i64,
    ) -> Result<Vec<MappingView>, ServiceError> {
        let patient = self.owned_patient(actor, patient_id).await?;
        let rows = self.db.list_active_mappings_for_patient(patient.id).await?;
        Ok(rows.iter().map(MappingView::from).collect())
    }

    // ---------------- 医生 ----------------

    async fn existing_doctor(&self, doctor_id: i64) -> Result<DoctorEntity, ServiceError> {
        self.db
            .get_doctor(doctor_id)
            .await?
            .ok_or(ServiceError::NotFound("doctor"))
    }

    pub async fn list_doctors(&self, _actor: &Identity) -> Result<Vec<DoctorView>, ServiceError> {
        let shape = ViewShape::for_action(Action::List);
        Ok(self
            .db
            .list_doctors()
            .await?
            .iter()
            .map(|d| DoctorView::render(d, shape))
            .collect())
    }

    pub async fn create_doctor(
        &self,
        actor: &Identity,
        payload: DoctorPayload,
    ) -> Result<DoctorView, ServiceError> {
        let record = payload.into_record(WriteMode::Create, None)?;
        if self
            .db
            .license_number_taken(&record.license_number, None)
            .await?
        {
            return Err(ServiceError::field("license_number", LICENSE_TAKEN));
        }
        let doctor = self
            .db
            .create_doctor(actor.user_id, &record)
            .await
            .map_err(map_db_error)?;
        info!(self.log, "doctor created"; "doctor_id" => doctor.id, "user_id" => actor.user_id);
        Ok(DoctorView::render(
            &doctor,
            ViewShape::for_action(Action::Create),
        ))
    }

    pub async fn get_doctor(
        &self,
        _actor: &Identity,
        doctor_id: i64,
    ) -> Result<DoctorView, ServiceError> {
        let doctor = self.existing_doctor(doctor_id).await?;
        Ok(DoctorView::render(
            &doctor,
            ViewShape::for_action(Action::Retrieve),
        ))
    }

    pub async fn update_doctor(
        &self,
        actor: &Identity,
        doctor_id: i64,
        payload: DoctorPayload,
        mode: WriteMode,
    ) -> Result<DoctorView, ServiceError> {
        let existing = self.existing_doctor(doctor_id).await?;
        if existing.user_id != actor.user_id {
            warn!(self.log, "doctor update denied"; "doctor_id" => doctor_id, "user_id" => actor.user_id);
            return Err(ServiceError::permission(DOCTOR_UPDATE_DENIED));
        }
        let record = payload.into_record(mode, Some(&existing.record()))?;
        if record.license_number != existing.license_number
            && self
                .db
                .license_number_taken(&record.license_number, Some(doctor_id))
                .await?
        {
            return Err(ServiceError::field("license_number", LICENSE_TAKEN));
        }
        let doctor = self
            .db
            .update_doctor(doctor_id, &record)
            .await
            .map_err(map_db_error)?
            .ok_or(ServiceError::NotFound("doctor"))?;
        Ok(DoctorView::render(&doctor, ViewShape::Detail))
    }

    pub async fn delete_doctor(&self, actor: &Identity, doctor_id: i64) -> Result<(), ServiceError> {
        let existing = self.existing_doctor(doctor_id).await?;
        if existing.user_id != actor.user_id {
            warn!(self.log, "doctor delete denied"; "doctor_id" => doctor_id, "user_id" => actor.user_id);
            return Err(ServiceError::permission(DOCTOR_DELETE_DENIED));
        }
        if !self.db.delete_doctor(doctor_id).await? {
            return Err(ServiceError::NotFound("doctor"));
        }
        info!(self.log, "doctor deleted"; "doctor_id" => doctor_id, "user_id" => actor.user_id);
        Ok(())
    }

    /// 医生当前有效分配的患者, 仅医生的创建者可查看.
    pub async fn doctor_patients(
        &self,
        actor: &Identity,
        doctor_id: i64,
    ) -> Result<Vec<PatientView>, ServiceError> {
        let doctor = self.existing_doctor(doctor_id).await?;
        if doctor.user_id != actor.user_id {
            return Err(ServiceError::permission(DOCTOR_PATIENTS_DENIED));
        }
        let today = Self::today();
        let shape = ViewShape::for_action(Action::List);
        Ok(self
            .db
            .list_active_patients_for_doctor(doctor_id)
            .await?
            .iter()
            .map(|p| PatientView::render(p, shape, today))
            .collect())
    }

    // ---------------- 分配关系 ----------------

    async fn visible_mapping(
        &self,
        actor: &Identity,
        mapping_id: i64,
    ) -> Result<MappingRow, ServiceError> {
        match self.db.get_mapping(mapping_id).await? {
            Some(row) if mapping_visible(&row, actor) => Ok(row),
            _ => Err(ServiceError::NotFound("mapping")),
        }
    }

    pub async fn list_mappings(&self, actor: &Identity) -> Result<Vec<MappingView>, ServiceError> {
        let rows = self.db.list_visible_mappings(actor.user_id).await?;
        Ok(rows.iter().map(MappingView::from).collect())
    }

    pub async fn create_mapping(
        &self,
        actor: &Identity,
        payload: MappingPayload,
    ) -> Result<MappingView, ServiceError> {
        let new_mapping = payload.into_new(actor.user_id, Self::today())?;
        let patient = self
            .db
            .get_patient(new_mapping.patient_id)
            .await?
            .ok_or(ServiceError::NotFound("patient"))?;
        if patient.user_id != actor.user_id {
            warn!(self.log, "assignment denied"; "patient_id" => patient.id, "user_id" => actor.user_id);
            return Err(ServiceError::permission(ASSIGN_DENIED));
        }
        self.existing_doctor(new_mapping.doctor_id).await?;
        if self
            .db
            .find_mapping(new_mapping.patient_id, new_mapping.doctor_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::non_field(ALREADY_ASSIGNED));
        }
        let row = self
            .db
            .create_mapping(&new_mapping)
            .await
            .map_err(map_db_error)?;
        info!(self.log, "doctor assigned";
            "mapping_id" => row.mapping.id,
            "patient_id" => row.mapping.patient_id,
            "doctor_id" => row.mapping.doctor_id);
        Ok(MappingView::from(&row))
    }

    pub async fn get_mapping(
        &self,
        actor: &Identity,
        mapping_id: i64,
    ) -> Result<MappingView, ServiceError> {
        let row = self.visible_mapping(actor, mapping_id).await?;
        Ok(MappingView::from(&row))
    }

    pub async fn update_mapping(
        &self,
        actor: &Identity,
        mapping_id: i64,
        payload: MappingPayload,
        mode: WriteMode,
    ) -> Result<MappingView, ServiceError> {
        let row = self.visible_mapping(actor, mapping_id).await?;
        if row.patient_owner_id != actor.user_id {
            return Err(ServiceError::permission(MAPPING_MODIFY_DENIED));
        }
        let changes = payload.into_changes(mode, &row.mapping)?;
        let updated = self
            .db
            .update_mapping(mapping_id, &changes)
            .await
            .map_err(map_db_error)?
            .ok_or(ServiceError::NotFound("mapping"))?;
        Ok(MappingView::from(&updated))
    }

    pub async fn delete_mapping(&self, actor: &Identity, mapping_id: i64) -> Result<(), ServiceError> {
        let row = self.visible_mapping(actor, mapping_id).await?;
        if row.patient_owner_id != actor.user_id {
            return Err(ServiceError::permission(MAPPING_MODIFY_DENIED));
        }
        if !self.db.delete_mapping(mapping_id).await? {
            return Err(ServiceError::NotFound("mapping"));
        }
        info!(self.log, "assignment removed"; "mapping_id" => mapping_id, "user_id" => actor.user_id);
        Ok(())
    }

    /// 与 patient_doctors 相同的数据, 但患者属于他人时返回权限错误.
    pub async fn mappings_for_patient(
        &self,
        actor: &Identity,
        patient_id: i64,
    ) -> Result<Vec<MappingView>, ServiceError> {
        let patient = self
            .db
            .get_patient(patient_id)
            .await?
            .ok_or(ServiceError::NotFound("patient"))?;
        if patient.user_id != actor.user_id {
            return Err(ServiceError::permission(MAPPING_VIEW_DENIED));
        }
        let rows = self.db.list_active_mappings_for_patient(patient_id).await?;
        Ok(rows.iter().map(MappingView::from).collect())
    }

    // ---------------- 预约 ----------------

    async fn visible_appointment(
        &self,
        actor: &Identity,
        appointment_id: i64,
    ) -> Result<AppointmentRow, ServiceError> {
        match self.db.get_appointment(appointment_id).await? {
            Some(row) if appointment_visible(&row, actor) => Ok(row),
            _ => Err(ServiceError::NotFound("appointment")),
        }
    }

    pub async fn list_appointments(
        &self,
        actor: &Identity,
        query: AppointmentQuery,
    ) -> Result<Vec<AppointmentView>, ServiceError> {
        let filter = query.into_filter()?;
        let rows = self.db.list_appointments(actor.user_id, &filter).await?;
        Ok(rows
            .iter()
            .map(|r| AppointmentView::from(&r.appointment))
            .collect())
    }

    pub async fn create_appointment(
        &self,
        actor: &Identity,
        payload: AppointmentPayload,
    ) -> Result<AppointmentView, ServiceError> {
        let record = payload.into_record(WriteMode::Create, None)?;
        self.owned_patient(actor, record.patient_id).await?;
        self.existing_doctor(record.doctor_id).await?;
        if self
            .db
            .has_scheduled_conflict(record.doctor_id, record.appointment_datetime, None)
            .await?
        {
            warn!(self.log, "appointment conflict";
                "doctor_id" => record.doctor_id,
                "appointment_datetime" => %record.appointment_datetime);
            return Err(ServiceError::non_field(APPOINTMENT_CONFLICT));
        }
        let row = self
            .db
            .create_appointment(actor.user_id, &record)
            .await
            .map_err(map_db_error)?;
        info!(self.log, "appointment created";
            "appointment_id" => row.appointment.id,
            "doctor_id" => record.doctor_id,
            "user_id" => actor.user_id);
        Ok(AppointmentView::from(&row.appointment))
    }

    pub async fn get_appointment(
        &self,
        actor: &Identity,
        appointment_id: i64,
    ) -> Result<AppointmentView, ServiceError> {
        let row = self.visible_appointment(actor, appointment_id).await?;
        Ok(AppointmentView::from(&row.appointment))
    }

    pub async fn update_appointment(
        &self,
        actor: &Identity,
        appointment_id: i64,
        payload: AppointmentPayload,
        mode: WriteMode,
    ) -> Result<AppointmentView, ServiceError> {
        let row = self.visible_appointment(actor, appointment_id).await?;
        if !appointment_mutable(&row, actor) {
            return Err(ServiceError::permission(APPOINTMENT_MODIFY_DENIED));
        }
        let existing = row.appointment.record();
        let record = payload.into_record(mode, Some(&existing))?;
        if record.patient_id != existing.patient_id {
            self.owned_patient(actor, record.patient_id).await?;
        }
        if record.doctor_id != existing.doctor_id {
            self.existing_doctor(record.doctor_id).await?;
        }
        let slot_changed = record.doctor_id != existing.doctor_id
            || record.appointment_datetime != existing.appointment_datetime
            || record.status != existing.status;
        if record.status == AppointmentStatus::Scheduled
            && slot_changed
            && self
                .db
                .has_scheduled_conflict(
                    record.doctor_id,
                    record.appointment_datetime,
                    Some(appointment_id),
                )
                .await?
        {
            return Err(ServiceError::non_field(APPOINTMENT_CONFLICT));
        }
        let updated = self
            .db
            .update_appointment(appointment_id, &record)
            .await
            .map_err(map_db_error)?
            .ok_or(ServiceError::NotFound("appointment"))?;
        Ok(AppointmentView::from(&updated.appointment))
    }

    pub async fn delete_appointment(
        &self,
        actor: &Identity,
        appointment_id: i64,
    ) -> Result<(), ServiceError> {
        let row = self.visible_appointment(actor, appointment_id).await?;
        if !appointment_mutable(&row, actor) {
            return Err(ServiceError::permission(APPOINTMENT_MODIFY_DENIED));
        }
        if !self.db.delete_appointment(appointment_id).await? {
            return Err(ServiceError::NotFound("appointment"));
        }
        info!(self.log, "appointment deleted"; "appointment_id" => appointment_id, "user_id" => actor.user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinic_dto::{PatientDetail, PatientSummary};
    use crate::server_config::JwtConfig;
    use crate::service_error::NON_FIELD_ERRORS;
    use database::clinic_mem::MemDbProvider;

    fn service() -> ClinicService {
        let tokens = TokenService::new(&JwtConfig {
            secret: "test-secret".to_string(),
            access_token_minutes: 5,
            refresh_token_days: 1,
        });
        let log = Logger::root(slog::Discard, slog::o!());
        ClinicService::new(Arc::new(MemDbProvider::new()), tokens, log)
    }

    fn register_payload(username: &str) -> RegisterPayload {
        RegisterPayload {
            username: Some(username.to_string()),
            password: Some("Tr1cky-Harbor-42".to_string()),
            password2: Some("Tr1cky-Harbor-42".to_string()),
            email: Some(format!("{}@example.com", username)),
            first_name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
        }
    }

    async fn user(svc: &ClinicService, username: &str) -> Identity {
        let response = svc.register(register_payload(username)).await.unwrap();
        svc.authenticate_bearer(&response.access).await.unwrap()
    }

    fn alice() -> PatientPayload {
        PatientPayload {
            first_name: Some("Alice".into()),
            last_name: Some("Doe".into()),
            date_of_birth: Some("1990-05-17".into()),
            gender: Some("F".into()),
            contact_number: Some("5550100".into()),
            ..Default::default()
        }
    }

    fn bob() -> PatientPayload {
        PatientPayload {
            first_name: Some("Bob".into()),
            gender: Some("M".into()),
            ..alice()
        }
    }

    fn smith(license: &str) -> DoctorPayload {
        DoctorPayload {
            first_name: Some("John".into()),
            last_name: Some("Smith".into()),
            specialization: Some("SUR".into()),
            contact_number: Some("5550199".into()),
            license_number: Some(license.into()),
            hospital: Some("General".into()),
            ..Default::default()
        }
    }

    fn patient_id(view: &PatientView) -> i64 {
        match view {
            PatientView::Summary(PatientSummary { id, .. }) => *id,
            PatientView::Detail(PatientDetail { id, .. }) => *id,
        }
    }

    fn doctor_id(view: &DoctorView) -> i64 {
        match view {
            DoctorView::Summary(d) => d.id,
            DoctorView::Detail(d) => d.id,
        }
    }

    fn non_field(err: ServiceError) -> Vec<String> {
        match err {
            ServiceError::Validation(map) => map.get(NON_FIELD_ERRORS).cloned().unwrap_or_default(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    fn appointment(doctor: i64, patient: i64, at: &str) -> AppointmentPayload {
        AppointmentPayload {
            doctor: Some(doctor),
            patient: Some(patient),
            appointment_datetime: Some(at.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_login_refresh() {
        let svc = service();
        let response = svc.register(register_payload("alice")).await.unwrap();
        assert_eq!(response.user.username, "alice");

        let pair = svc
            .login(LoginPayload {
                username: Some("alice".into()),
                password: Some("Tr1cky-Harbor-42".into()),
            })
            .await
            .unwrap();
        let identity = svc.authenticate_bearer(&pair.access).await.unwrap();
        assert_eq!(identity.username, "alice");

        let access = svc
            .refresh(RefreshPayload {
                refresh: Some(pair.refresh.clone()),
            })
            .await
            .unwrap();
        assert!(svc.authenticate_bearer(&access.access).await.is_ok());
        // 刷新令牌不能当访问令牌用
        assert!(matches!(
            svc.authenticate_bearer(&pair.refresh).await,
            Err(ServiceError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_login_failures_do_not_reveal_which_part() {
        let svc = service();
        svc.register(register_payload("alice")).await.unwrap();
        let wrong_password = svc
            .login(LoginPayload {
                username: Some("alice".into()),
                password: Some("nope".into()),
            })
            .await
            .unwrap_err();
        let unknown_user = svc
            .login(LoginPayload {
                username: Some("mallory".into()),
                password: Some("Tr1cky-Harbor-42".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(wrong_password, unknown_user);
        assert_eq!(
            wrong_password,
            ServiceError::Authentication(INVALID_CREDENTIALS.to_string())
        );
    }

    #[tokio::test]
    async fn test_register_mismatch_creates_no_user() {
        let svc = service();
        let payload = RegisterPayload {
            password2: Some("Different-Harbor-42".into()),
            ..register_payload("alice")
        };
        match svc.register(payload).await.unwrap_err() {
            ServiceError::Validation(map) => {
                assert_eq!(map["password"], vec!["Password fields didn't match.".to_string()])
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(svc.db.get_user_by_username("alice").await.unwrap().is_none());

        svc.register(register_payload("alice")).await.unwrap();
        match svc.register(register_payload("alice")).await.unwrap_err() {
            ServiceError::Validation(map) => {
                assert_eq!(map["username"], vec![USERNAME_TAKEN.to_string()])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_patient_owner_scenario() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let b = user(&svc, "userb").await;
        let created = svc.create_patient(&a, alice()).await.unwrap();
        let id = patient_id(&created);

        assert_eq!(
            svc.delete_patient(&b, id).await,
            Err(ServiceError::permission(PATIENT_DELETE_DENIED))
        );
        assert!(svc.get_patient(&a, id).await.is_ok());
        // 他人的患者不可见
        assert_eq!(
            svc.get_patient(&b, id).await,
            Err(ServiceError::NotFound("patient"))
        );
        assert!(svc.list_patients(&b).await.unwrap().is_empty());

        svc.delete_patient(&a, id).await.unwrap();
        assert_eq!(
            svc.get_patient(&a, id).await,
            Err(ServiceError::NotFound("patient"))
        );
    }

    #[tokio::test]
    async fn test_non_owner_update_leaves_patient_unchanged() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let b = user(&svc, "userb").await;
        let id = patient_id(&svc.create_patient(&a, alice()).await.unwrap());
        let patch = PatientPayload {
            first_name: Some("Mallory".into()),
            ..Default::default()
        };
        assert_eq!(
            svc.update_patient(&b, id, patch.clone(), WriteMode::Patch).await,
            Err(ServiceError::permission(PATIENT_UPDATE_DENIED))
        );
        match svc.get_patient(&a, id).await.unwrap() {
            PatientView::Detail(detail) => assert_eq!(detail.first_name, "Alice"),
            other => panic!("unexpected {:?}", other),
        }
        match svc.update_patient(&a, id, patch, WriteMode::Patch).await.unwrap() {
            PatientView::Detail(detail) => {
                assert_eq!(detail.first_name, "Mallory");
                assert_eq!(detail.last_name, "Doe");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_uses_summary_shape() {
        let svc = service();
        let a = user(&svc, "usera").await;
        svc.create_patient(&a, alice()).await.unwrap();
        let list = svc.list_patients(&a).await.unwrap();
        assert!(matches!(list[0], PatientView::Summary(_)));
        let doctors = {
            svc.create_doctor(&a, smith("LIC-1")).await.unwrap();
            svc.list_doctors(&a).await.unwrap()
        };
        assert!(matches!(doctors[0], DoctorView::Summary(_)));
    }

    #[tokio::test]
    async fn test_doctor_license_unique_and_owner_guard() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let b = user(&svc, "userb").await;
        let first = doctor_id(&svc.create_doctor(&a, smith("LIC-1")).await.unwrap());
        match svc.create_doctor(&b, smith("LIC-1")).await.unwrap_err() {
            ServiceError::Validation(map) => {
                assert_eq!(map["license_number"], vec![LICENSE_TAKEN.to_string()])
            }
            other => panic!("unexpected {:?}", other),
        }
        let second = doctor_id(&svc.create_doctor(&b, smith("LIC-2")).await.unwrap());
        // 更新为他人的执照号同样被拒绝
        let patch = DoctorPayload {
            license_number: Some("LIC-1".into()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_doctor(&b, second, patch, WriteMode::Patch).await,
            Err(ServiceError::Validation(_))
        ));

        // 任何已登录用户都能查看医生, 但只有创建者能修改
        assert!(svc.get_doctor(&b, first).await.is_ok());
        assert_eq!(
            svc.delete_doctor(&b, first).await,
            Err(ServiceError::permission(DOCTOR_DELETE_DENIED))
        );
        assert_eq!(
            svc.update_doctor(&b, first, DoctorPayload::default(), WriteMode::Patch)
                .await,
            Err(ServiceError::permission(DOCTOR_UPDATE_DENIED))
        );
        svc.delete_doctor(&a, first).await.unwrap();
    }

    #[tokio::test]
    async fn test_mapping_duplicate_rejected_regardless_of_active() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let p = patient_id(&svc.create_patient(&a, alice()).await.unwrap());
        let d = doctor_id(&svc.create_doctor(&a, smith("LIC-1")).await.unwrap());
        let created = svc
            .create_mapping(
                &a,
                MappingPayload {
                    patient: Some(p),
                    doctor: Some(d),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.assigned_by, Some(a.user_id));
        assert_eq!(created.doctor_name, "Dr. John Smith");
        assert_eq!(created.assigned_date, ClinicService::today());

        let err = svc
            .create_mapping(
                &a,
                MappingPayload {
                    patient: Some(p),
                    doctor: Some(d),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(non_field(err), vec![ALREADY_ASSIGNED.to_string()]);
    }

    #[tokio::test]
    async fn test_mapping_guards_and_visibility() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let b = user(&svc, "userb").await;
        let c = user(&svc, "userc").await;
        let p = patient_id(&svc.create_patient(&a, alice()).await.unwrap());
        let d = doctor_id(&svc.create_doctor(&b, smith("LIC-1")).await.unwrap());

        // 只能给自己的患者分配医生
        assert_eq!(
            svc.create_mapping(
                &b,
                MappingPayload {
                    patient: Some(p),
                    doctor: Some(d),
                    ..Default::default()
                }
            )
            .await,
            Err(ServiceError::permission(ASSIGN_DENIED))
        );
        assert_eq!(
            svc.create_mapping(
                &a,
                MappingPayload {
                    patient: Some(p),
                    doctor: Some(9999),
                    ..Default::default()
                }
            )
            .await,
            Err(ServiceError::NotFound("doctor"))
        );
        let m = svc
            .create_mapping(
                &a,
                MappingPayload {
                    patient: Some(p),
                    doctor: Some(d),
                    reason_for_assignment: Some("cardiac review".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // 患者方和医生方的创建者都可见, 第三方不可见
        assert_eq!(svc.list_mappings(&a).await.unwrap().len(), 1);
        assert_eq!(svc.list_mappings(&b).await.unwrap().len(), 1);
        assert!(svc.list_mappings(&c).await.unwrap().is_empty());
        assert_eq!(
            svc.get_mapping(&c, m.id).await,
            Err(ServiceError::NotFound("mapping"))
        );

        // 医生方只读
        let deactivate = MappingPayload {
            is_active: Some(false),
            ..Default::default()
        };
        assert_eq!(
            svc.update_mapping(&b, m.id, deactivate.clone(), WriteMode::Patch)
                .await,
            Err(ServiceError::permission(MAPPING_MODIFY_DENIED))
        );
        let updated = svc
            .update_mapping(&a, m.id, deactivate, WriteMode::Patch)
            .await
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.reason_for_assignment, "cardiac review");
        assert_eq!(updated.assigned_date, m.assigned_date);

        // 只列出有效分配
        assert!(svc.patient_doctors(&a, p).await.unwrap().is_empty());
        assert_eq!(
            svc.mappings_for_patient(&b, p).await,
            Err(ServiceError::permission(MAPPING_VIEW_DENIED))
        );
        assert_eq!(
            svc.patient_doctors(&b, p).await,
            Err(ServiceError::NotFound("patient"))
        );

        svc.delete_mapping(&a, m.id).await.unwrap();
        assert!(svc.list_mappings(&a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_doctor_patients_only_for_doctor_owner() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let b = user(&svc, "userb").await;
        let p = patient_id(&svc.create_patient(&a, alice()).await.unwrap());
        let d = doctor_id(&svc.create_doctor(&a, smith("LIC-1")).await.unwrap());
        svc.create_mapping(
            &a,
            MappingPayload {
                patient: Some(p),
                doctor: Some(d),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let patients = svc.doctor_patients(&a, d).await.unwrap();
        assert_eq!(patients.len(), 1);
        assert!(matches!(patients[0], PatientView::Summary(_)));
        assert_eq!(
            svc.doctor_patients(&b, d).await,
            Err(ServiceError::permission(DOCTOR_PATIENTS_DENIED))
        );
    }

    #[tokio::test]
    async fn test_double_booking_scenario() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let alice_id = patient_id(&svc.create_patient(&a, alice()).await.unwrap());
        let bob_id = patient_id(&svc.create_patient(&a, bob()).await.unwrap());
        let d = doctor_id(&svc.create_doctor(&a, smith("LIC-1")).await.unwrap());

        let first = svc
            .create_appointment(&a, appointment(d, alice_id, "2025-01-01T10:00:00Z"))
            .await
            .unwrap();
        assert_eq!(first.status, AppointmentStatus::Scheduled);
        assert_eq!(first.created_by, Some(a.user_id));

        let err = svc
            .create_appointment(&a, appointment(d, bob_id, "2025-01-01T10:00:00Z"))
            .await
            .unwrap_err();
        assert_eq!(non_field(err), vec![APPOINTMENT_CONFLICT.to_string()]);

        let other = svc
            .create_appointment(&a, appointment(d, bob_id, "2025-01-01T11:00:00Z"))
            .await
            .unwrap();
        assert_eq!(other.status, AppointmentStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_create_checks_slot_whatever_status() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let alice_id = patient_id(&svc.create_patient(&a, alice()).await.unwrap());
        let bob_id = patient_id(&svc.create_patient(&a, bob()).await.unwrap());
        let d = doctor_id(&svc.create_doctor(&a, smith("LIC-1")).await.unwrap());
        svc.create_appointment(&a, appointment(d, alice_id, "2025-01-01T10:00:00Z"))
            .await
            .unwrap();

        // 新建时无论状态都检查时段
        let cancelled = AppointmentPayload {
            status: Some("CANCELLED".into()),
            ..appointment(d, bob_id, "2025-01-01T10:00:00Z")
        };
        let err = svc.create_appointment(&a, cancelled).await.unwrap_err();
        assert_eq!(non_field(err), vec![APPOINTMENT_CONFLICT.to_string()]);
        let all = svc
            .list_appointments(&a, AppointmentQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        // 时段空闲时可以直接建已取消的记录
        let free = AppointmentPayload {
            status: Some("CANCELLED".into()),
            ..appointment(d, bob_id, "2025-01-01T12:00:00Z")
        };
        let created = svc.create_appointment(&a, free).await.unwrap();
        assert_eq!(created.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_update_into_booked_slot_rejected() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let p = patient_id(&svc.create_patient(&a, alice()).await.unwrap());
        let d = doctor_id(&svc.create_doctor(&a, smith("LIC-1")).await.unwrap());
        svc.create_appointment(&a, appointment(d, p, "2025-01-01T10:00:00Z"))
            .await
            .unwrap();
        let second = svc
            .create_appointment(&a, appointment(d, p, "2025-01-01T11:00:00Z"))
            .await
            .unwrap();

        let move_to_ten = AppointmentPayload {
            appointment_datetime: Some("2025-01-01T10:00:00Z".into()),
            ..Default::default()
        };
        let err = svc
            .update_appointment(&a, second.id, move_to_ten.clone(), WriteMode::Patch)
            .await
            .unwrap_err();
        assert_eq!(non_field(err), vec![APPOINTMENT_CONFLICT.to_string()]);

        // 取消后的预约可以占用同一时刻
        let cancelled = AppointmentPayload {
            status: Some("CANCELLED".into()),
            ..move_to_ten
        };
        let updated = svc
            .update_appointment(&a, second.id, cancelled, WriteMode::Patch)
            .await
            .unwrap();
        assert_eq!(updated.status, AppointmentStatus::Cancelled);

        // 只改说明时不与自身冲突
        let first_id = svc.list_appointments(&a, AppointmentQuery::default()).await.unwrap()
            .iter()
            .find(|v| v.status == AppointmentStatus::Scheduled)
            .map(|v| v.id)
            .unwrap();
        let reason = AppointmentPayload {
            reason: Some("follow-up".into()),
            ..Default::default()
        };
        assert!(
            svc.update_appointment(&a, first_id, reason, WriteMode::Patch)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_appointment_access_and_filters() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let b = user(&svc, "userb").await;
        let c = user(&svc, "userc").await;
        let p = patient_id(&svc.create_patient(&a, alice()).await.unwrap());
        let d1 = doctor_id(&svc.create_doctor(&b, smith("LIC-1")).await.unwrap());
        let d2 = doctor_id(&svc.create_doctor(&b, smith("LIC-2")).await.unwrap());

        // 患者必须属于自己
        assert_eq!(
            svc.create_appointment(&b, appointment(d1, p, "2025-01-01T10:00:00Z"))
                .await,
            Err(ServiceError::NotFound("patient"))
        );
        let first = svc
            .create_appointment(&a, appointment(d1, p, "2025-01-01T10:00:00Z"))
            .await
            .unwrap();
        svc.create_appointment(&a, appointment(d2, p, "2025-01-02T10:00:00Z"))
            .await
            .unwrap();

        let by_doctor = svc
            .list_appointments(
                &a,
                AppointmentQuery {
                    doctor: Some(d2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_doctor.len(), 1);
        assert_eq!(by_doctor[0].doctor, d2);

        // 医生方可见但不可修改, 第三方不可见
        assert_eq!(svc.list_appointments(&b, AppointmentQuery::default()).await.unwrap().len(), 2);
        assert!(svc.list_appointments(&c, AppointmentQuery::default()).await.unwrap().is_empty());
        assert_eq!(
            svc.delete_appointment(&b, first.id).await,
            Err(ServiceError::permission(APPOINTMENT_MODIFY_DENIED))
        );
        assert_eq!(
            svc.get_appointment(&c, first.id).await,
            Err(ServiceError::NotFound("appointment"))
        );
        svc.delete_appointment(&a, first.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_patient_delete_cascades() {
        let svc = service();
        let a = user(&svc, "usera").await;
        let p = patient_id(&svc.create_patient(&a, alice()).await.unwrap());
        let d = doctor_id(&svc.create_doctor(&a, smith("LIC-1")).await.unwrap());
        svc.create_mapping(
            &a,
            MappingPayload {
                patient: Some(p),
                doctor: Some(d),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        svc.create_appointment(&a, appointment(d, p, "2025-01-01T10:00:00Z"))
            .await
            .unwrap();

        svc.delete_patient(&a, p).await.unwrap();
        assert!(svc.list_mappings(&a).await.unwrap().is_empty());
        assert!(svc.list_appointments(&a, AppointmentQuery::default()).await.unwrap().is_empty());
        assert!(svc.doctor_patients(&a, d).await.unwrap().is_empty());
    }
}
