use crate::clinic_meta::{
    AppointmentFilter, AppointmentRecord, AppointmentRow, DoctorEntity, DoctorRecord,
    MappingChanges, MappingEntity, MappingRow, NewMapping, NewUser, PatientEntity, PatientRecord,
    UserEntity,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// 约束名称, PostgreSQL 与内存实现共用, 上层据此把约束冲突翻译为校验错误.
pub const UQ_USER_USERNAME: &str = "uq_user_username";
pub const UQ_DOCTOR_LICENSE: &str = "uq_doctor_license";
pub const UQ_MAPPING_PAIR: &str = "uq_mapping_pair";
pub const UQ_APPOINTMENT_SCHEDULED_SLOT: &str = "uq_appointment_scheduled_slot";
pub const FK_PATIENT: &str = "fk_patient";
pub const FK_DOCTOR: &str = "fk_doctor";
pub const FK_USER: &str = "fk_user";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

pub fn current_time() -> DateTime<Utc> {
    Utc::now()
}

/// 诊所数据存储. 所有唯一性约束必须由存储层自身保证,
/// 上层的预检查只用于给出友好的错误信息.
#[async_trait]
pub trait DbProvider: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> Result<UserEntity, DbError>;

    async fn get_user(&self, user_id: i64) -> Result<Option<UserEntity>, DbError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserEntity>, DbError>;

    async fn create_patient(
        &self,
        owner_id: i64,
        record: &PatientRecord,
    ) -> Result<PatientEntity, DbError>;

    async fn get_patient(&self, patient_id: i64) -> Result<Option<PatientEntity>, DbError>;

    /// 仅返回 owner_id 创建的患者, 按创建时间倒序.
    async fn list_patients(&self, owner_id: i64) -> Result<Vec<PatientEntity>, DbError>;

    async fn update_patient(
        &self,
        patient_id: i64,
        record: &PatientRecord,
    ) -> Result<Option<PatientEntity>, DbError>;

    /// 级联删除该患者的分配关系和预约. 返回是否删除了记录.
    async fn delete_patient(&self, patient_id: i64) -> Result<bool, DbError>;

    async fn create_doctor(
        &self,
        owner_id: i64,
        record: &DoctorRecord,
    ) -> Result<DoctorEntity, DbError>;

    async fn get_doctor(&self, doctor_id: i64) -> Result<Option<DoctorEntity>, DbError>;

    async fn list_doctors(&self) -> Result<Vec<DoctorEntity>, DbError>;

    /// exclude_id 用于更新时排除自身.
    async fn license_number_taken(
        &self,
        license_number: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbError>;

    async fn update_doctor(
        &self,
        doctor_id: i64,
        record: &DoctorRecord,
    ) -> Result<Option<DoctorEntity>, DbError>;

    async fn delete_doctor(&self, doctor_id: i64) -> Result<bool, DbError>;

    async fn create_mapping(&self, mapping: &NewMapping) -> Result<MappingRow, DbError>;

    async fn get_mapping(&self, mapping_id: i64) -> Result<Option<MappingRow>, DbError>;

    /// 不区分 is_active.
    async fn find_mapping(
        &self,
        patient_id: i64,
        doctor_id: i64,
    ) -> Result<Option<MappingEntity>, DbError>;

    /// 用户拥有患者一方 或 医生一方 的分配关系(并集).
    async fn list_visible_mappings(&self, user_id: i64) -> Result<Vec<MappingRow>, DbError>;

    async fn list_active_mappings_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<MappingRow>, DbError>;

    async fn list_active_patients_for_doctor(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<PatientEntity>, DbError>;

    async fn update_mapping(
        &self,
        mapping_id: i64,
        changes: &MappingChanges,
    ) -> Result<Option<MappingRow>, DbError>;

    async fn delete_mapping(&self, mapping_id: i64) -> Result<bool, DbError>;

    async fn create_appointment(
        &self,
        created_by: i64,
        record: &AppointmentRecord,
    ) -> Result<AppointmentRow, DbError>;

    async fn get_appointment(&self, appointment_id: i64)
    -> Result<Option<AppointmentRow>, DbError>;

    /// 用户拥有患者或医生一方, 或者由该用户创建的预约.
    async fn list_appointments(
        &self,
        user_id: i64,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentRow>, DbError>;

    /// 同一医生同一时刻是否已有 SCHEDULED 状态的预约.
    async fn has_scheduled_conflict(
        &self,
        doctor_id: i64,
        appointment_datetime: DateTime<Utc>,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbError>;

    async fn update_appointment(
        &self,
        appointment_id: i64,
        record: &AppointmentRecord,
    ) -> Result<Option<AppointmentRow>, DbError>;

    async fn delete_appointment(&self, appointment_id: i64) -> Result<bool, DbError>;
}
