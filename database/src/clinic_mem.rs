use crate::clinic_dbprovider::{
    DbError, DbProvider, FK_DOCTOR, FK_PATIENT, FK_USER, UQ_APPOINTMENT_SCHEDULED_SLOT,
    UQ_DOCTOR_LICENSE, UQ_MAPPING_PAIR, UQ_USER_USERNAME, current_time,
};
use crate::clinic_dbtype::AppointmentStatus;
use crate::clinic_meta::{
    AppointmentEntity, AppointmentFilter, AppointmentRecord, AppointmentRow, DoctorEntity,
    DoctorRecord, MappingChanges, MappingEntity, MappingRow, NewMapping, NewUser, PatientEntity,
    PatientRecord, UserEntity,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemTables {
    next_id: i64,
    users: BTreeMap<i64, UserEntity>,
    patients: BTreeMap<i64, PatientEntity>,
    doctors: BTreeMap<i64, DoctorEntity>,
    mappings: BTreeMap<i64, MappingEntity>,
    appointments: BTreeMap<i64, AppointmentEntity>,
}

impl MemTables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn mapping_row(&self, mapping: &MappingEntity) -> Result<MappingRow, DbError> {
        let patient = self
            .patients
            .get(&mapping.patient_id)
            .ok_or_else(|| DbError::ForeignKeyViolation(FK_PATIENT.to_string()))?;
        let doctor = self
            .doctors
            .get(&mapping.doctor_id)
            .ok_or_else(|| DbError::ForeignKeyViolation(FK_DOCTOR.to_string()))?;
        let assigned_by_username = mapping
            .assigned_by
            .and_then(|id| self.users.get(&id))
            .map(|user| user.username.clone());
        Ok(MappingRow {
            mapping: mapping.clone(),
            patient_owner_id: patient.user_id,
            doctor_owner_id: doctor.user_id,
            patient_name: patient.full_name(),
            doctor_name: doctor.display_name(),
            assigned_by_username,
        })
    }

    fn appointment_row(&self, appointment: &AppointmentEntity) -> Result<AppointmentRow, DbError> {
        let patient = self
            .patients
            .get(&appointment.patient_id)
            .ok_or_else(|| DbError::ForeignKeyViolation(FK_PATIENT.to_string()))?;
        let doctor = self
            .doctors
            .get(&appointment.doctor_id)
            .ok_or_else(|| DbError::ForeignKeyViolation(FK_DOCTOR.to_string()))?;
        Ok(AppointmentRow {
            appointment: appointment.clone(),
            patient_owner_id: patient.user_id,
            doctor_owner_id: doctor.user_id,
        })
    }

    fn scheduled_slot_taken(
        &self,
        doctor_id: i64,
        at: DateTime<Utc>,
        exclude_id: Option<i64>,
    ) -> bool {
        self.appointments.values().any(|a| {
            a.doctor_id == doctor_id
                && a.appointment_datetime == at
                && a.status == AppointmentStatus::Scheduled
                && Some(a.id) != exclude_id
        })
    }

    fn check_appointment(
        &self,
        record: &AppointmentRecord,
        exclude_id: Option<i64>,
    ) -> Result<(), DbError> {
        if !self.patients.contains_key(&record.patient_id) {
            return Err(DbError::ForeignKeyViolation(FK_PATIENT.to_string()));
        }
        if !self.doctors.contains_key(&record.doctor_id) {
            return Err(DbError::ForeignKeyViolation(FK_DOCTOR.to_string()));
        }
        if record.status == AppointmentStatus::Scheduled
            && self.scheduled_slot_taken(record.doctor_id, record.appointment_datetime, exclude_id)
        {
            return Err(DbError::UniqueViolation(
                UQ_APPOINTMENT_SCHEDULED_SLOT.to_string(),
            ));
        }
        Ok(())
    }

    fn license_taken(&self, license_number: &str, exclude_id: Option<i64>) -> bool {
        self.doctors
            .values()
            .any(|d| d.license_number == license_number && Some(d.id) != exclude_id)
    }
}

// 创建时间倒序, 同一时刻按 id 倒序
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// 进程内存储, 用于测试和本地运行. 每个操作都在同一把锁内完成检查和写入,
/// 约束与级联规则与 clinic_schema.sql 一致.
#[derive(Debug, Default)]
pub struct MemDbProvider {
    tables: Mutex<MemTables>,
}

impl MemDbProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemTables>, DbError> {
        self.tables
            .lock()
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

#[async_trait]
impl DbProvider for MemDbProvider {
    async fn create_user(&self, user: &NewUser) -> Result<UserEntity, DbError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(DbError::UniqueViolation(UQ_USER_USERNAME.to_string()));
        }
        let id = tables.allocate_id();
        let entity = UserEntity {
            id,
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            date_joined: current_time(),
        };
        tables.users.insert(id, entity.clone());
        Ok(entity)
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<UserEntity>, DbError> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserEntity>, DbError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_patient(
        &self,
        owner_id: i64,
        record: &PatientRecord,
    ) -> Result<PatientEntity, DbError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&owner_id) {
            return Err(DbError::ForeignKeyViolation(FK_USER.to_string()));
        }
        let id = tables.allocate_id();
        let now = current_time();
        let entity = PatientEntity {
            id,
            user_id: owner_id,
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            date_of_birth: record.date_of_birth,
            gender: record.gender,
            contact_number: record.contact_number.clone(),
            email: record.email.clone(),
            address: record.address.clone(),
            medical_history: record.medical_history.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.patients.insert(id, entity.clone());
        Ok(entity)
    }

    async fn get_patient(&self, patient_id: i64) -> Result<Option<PatientEntity>, DbError> {
        Ok(self.lock()?.patients.get(&patient_id).cloned())
    }

    async fn list_patients(&self, owner_id: i64) -> Result<Vec<PatientEntity>, DbError> {
        let tables = self.lock()?;
        let mut patients: Vec<PatientEntity> = tables
            .patients
            .values()
            .filter(|p| p.user_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut patients, |p| (p.created_at, p.id));
        Ok(patients)
    }

    async fn update_patient(
        &self,
        patient_id: i64,
        record: &PatientRecord,
    ) -> Result<Option<PatientEntity>, DbError> {
        let mut tables = self.lock()?;
        let Some(patient) = tables.patients.get_mut(&patient_id) else {
            return Ok(None);
        };
        patient.first_name = record.first_name.clone();
        patient.last_name = record.last_name.clone();
        patient.date_of_birth = record.date_of_birth;
        patient.gender = record.gender;
        patient.contact_number = record.contact_number.clone();
        patient.email = record.email.clone();
        patient.address = record.address.clone();
        patient.medical_history = record.medical_history.clone();
        patient.updated_at = current_time();
        Ok(Some(patient.clone()))
    }

    async fn delete_patient(&self, patient_id: i64) -> Result<bool, DbError> {
        let mut tables = self.lock()?;
        if tables.patients.remove(&patient_id).is_none() {
            return Ok(false);
        }
        tables.mappings.retain(|_, m| m.patient_id != patient_id);
        tables.appointments.retain(|_, a| a.patient_id != patient_id);
        Ok(true)
    }

    async fn create_doctor(
        &self,
        owner_id: i64,
        record: &DoctorRecord,
    ) -> Result<DoctorEntity, DbError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&owner_id) {
            return Err(DbError::ForeignKeyViolation(FK_USER.to_string()));
        }
        if tables.license_taken(&record.license_number, None) {
            return Err(DbError::UniqueViolation(UQ_DOCTOR_LICENSE.to_string()));
        }
        let id = tables.allocate_id();
        let now = current_time();
        let entity = DoctorEntity {
            id,
            user_id: owner_id,
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            specialization: record.specialization,
            contact_number: record.contact_number.clone(),
            email: record.email.clone(),
            license_number: record.license_number.clone(),
            hospital: record.hospital.clone(),
            address: record.address.clone(),
            experience_years: record.experience_years,
            created_at: now,
            updated_at: now,
        };
        tables.doctors.insert(id, entity.clone());
        Ok(entity)
    }

    async fn get_doctor(&self, doctor_id: i64) -> Result<Option<DoctorEntity>, DbError> {
        Ok(self.lock()?.doctors.get(&doctor_id).cloned())
    }

    async fn list_doctors(&self) -> Result<Vec<DoctorEntity>, DbError> {
        let tables = self.lock()?;
        let mut doctors: Vec<DoctorEntity> = tables.doctors.values().cloned().collect();
        newest_first(&mut doctors, |d| (d.created_at, d.id));
        Ok(doctors)
    }

    async fn license_number_taken(
        &self,
        license_number: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbError> {
        Ok(self.lock()?.license_taken(license_number, exclude_id))
    }

    async fn update_doctor(
        &self,
        doctor_id: i64,
        record: &DoctorRecord,
    ) -> Result<Option<DoctorEntity>, DbError> {
        let mut tables = self.lock()?;
        if !tables.doctors.contains_key(&doctor_id) {
            return Ok(None);
        }
        if tables.license_taken(&record.license_number, Some(doctor_id)) {
            return Err(DbError::UniqueViolation(UQ_DOCTOR_LICENSE.to_string()));
        }
        let Some(doctor) = tables.doctors.get_mut(&doctor_id) else {
            return Ok(None);
        };
        doctor.first_name = record.first_name.clone();
        doctor.last_name = record.last_name.clone();
        doctor.specialization = record.specialization;
        doctor.contact_number = record.contact_number.clone();
        doctor.email = record.email.clone();
        doctor.license_number = record.license_number.clone();
        doctor.hospital = record.hospital.clone();
        doctor.address = record.address.clone();
        doctor.experience_years = record.experience_years;
        doctor.updated_at = current_time();
        Ok(Some(doctor.clone()))
    }

    async fn delete_doctor(&self, doctor_id: i64) -> Result<bool, DbError> {
        let mut tables = self.lock()?;
        if tables.doctors.remove(&doctor_id).is_none() {
            return Ok(false);
        }
        tables.mappings.retain(|_, m| m.doctor_id != doctor_id);
        tables.appointments.retain(|_, a| a.doctor_id != doctor_id);
        Ok(true)
    }

    async fn create_mapping(&self, mapping: &NewMapping) -> Result<MappingRow, DbError> {
        let mut tables = self.lock()?;
        if !tables.patients.contains_key(&mapping.patient_id) {
            return Err(DbError::ForeignKeyViolation(FK_PATIENT.to_string()));
        }
        if !tables.doctors.contains_key(&mapping.doctor_id) {
            return Err(DbError::ForeignKeyViolation(FK_DOCTOR.to_string()));
        }
        if !tables.users.contains_key(&mapping.assigned_by) {
            return Err(DbError::ForeignKeyViolation(FK_USER.to_string()));
        }
        if tables
            .mappings
            .values()
            .any(|m| m.patient_id == mapping.patient_id && m.doctor_id == mapping.doctor_id)
        {
            return Err(DbError::UniqueViolation(UQ_MAPPING_PAIR.to_string()));
        }
        let id = tables.allocate_id();
        let entity = MappingEntity {
            id,
            patient_id: mapping.patient_id,
            doctor_id: mapping.doctor_id,
            assigned_by: Some(mapping.assigned_by),
            assigned_date: mapping.assigned_date,
            reason_for_assignment: mapping.reason_for_assignment.clone(),
            is_active: mapping.is_active,
            created_at: current_time(),
        };
        tables.mappings.insert(id, entity.clone());
        tables.mapping_row(&entity)
    }

    async fn get_mapping(&self, mapping_id: i64) -> Result<Option<MappingRow>, DbError> {
        let tables = self.lock()?;
        tables
            .mappings
            .get(&mapping_id)
            .map(|m| tables.mapping_row(m))
            .transpose()
    }

    async fn find_mapping(
        &self,
        patient_id: i64,
        doctor_id: i64,
    ) -> Result<Option<MappingEntity>, DbError> {
        Ok(self
            .lock()?
            .mappings
            .values()
            .find(|m| m.patient_id == patient_id && m.doctor_id == doctor_id)
            .cloned())
    }

    async fn list_visible_mappings(&self, user_id: i64) -> Result<Vec<MappingRow>, DbError> {
        let tables = self.lock()?;
        let mut rows = Vec::new();
        for mapping in tables.mappings.values() {
            let row = tables.mapping_row(mapping)?;
            if row.patient_owner_id == user_id || row.doctor_owner_id == user_id {
                rows.push(row);
            }
        }
        newest_first(&mut rows, |r| (r.mapping.created_at, r.mapping.id));
        Ok(rows)
    }

    async fn list_active_mappings_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<MappingRow>, DbError> {
        let tables = self.lock()?;
        let mut rows = tables
            .mappings
            .values()
            .filter(|m| m.patient_id == patient_id && m.is_active)
            .map(|m| tables.mapping_row(m))
            .collect::<Result<Vec<_>, _>>()?;
        newest_first(&mut rows, |r| (r.mapping.created_at, r.mapping.id));
        Ok(rows)
    }

    async fn list_active_patients_for_doctor(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<PatientEntity>, DbError> {
        let tables = self.lock()?;
        let mut mappings: Vec<&MappingEntity> = tables
            .mappings
            .values()
            .filter(|m| m.doctor_id == doctor_id && m.is_active)
            .collect();
        newest_first(&mut mappings, |m| (m.created_at, m.id));
        Ok(mappings
            .into_iter()
            .filter_map(|m| tables.patients.get(&m.patient_id).cloned())
            .collect())
    }

    async fn update_mapping(
        &self,
        mapping_id: i64,
        changes: &MappingChanges,
    ) -> Result<Option<MappingRow>, DbError> {
        let mut tables = self.lock()?;
        let Some(mapping) = tables.mappings.get_mut(&mapping_id) else {
            return Ok(None);
        };
        mapping.reason_for_assignment = changes.reason_for_assignment.clone();
        mapping.is_active = changes.is_active;
        let mapping = mapping.clone();
        tables.mapping_row(&mapping).map(Some)
    }

    async fn delete_mapping(&self, mapping_id: i64) -> Result<bool, DbError> {
        Ok(self.lock()?.mappings.remove(&mapping_id).is_some())
    }

    async fn create_appointment(
        &self,
        created_by: i64,
        record: &AppointmentRecord,
    ) -> Result<AppointmentRow, DbError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&created_by) {
            return Err(DbError::ForeignKeyViolation(FK_USER.to_string()));
        }
        tables.check_appointment(record, None)?;
        let id = tables.allocate_id();
        let entity = AppointmentEntity {
            id,
            doctor_id: record.doctor_id,
            patient_id: record.patient_id,
            appointment_datetime: record.appointment_datetime,
            reason: record.reason.clone(),
            status: record.status,
            created_by: Some(created_by),
            created_at: current_time(),
        };
        tables.appointments.insert(id, entity.clone());
        tables.appointment_row(&entity)
    }

    async fn get_appointment(
        &self,
        appointment_id: i64,
    ) -> Result<Option<AppointmentRow>, DbError> {
        let tables = self.lock()?;
        tables
            .appointments
            .get(&appointment_id)
            .map(|a| tables.appointment_row(a))
            .transpose()
    }

    async fn list_appointments(
        &self,
        user_id: i64,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentRow>, DbError> {
        let tables = self.lock()?;
        let mut rows = Vec::new();
        for appointment in tables.appointments.values().filter(|a| filter.matches(a)) {
            let row = tables.appointment_row(appointment)?;
            if row.patient_owner_id == user_id
                || row.doctor_owner_id == user_id
                || appointment.created_by == Some(user_id)
            {
                rows.push(row);
            }
        }
        newest_first(&mut rows, |r| (r.appointment.created_at, r.appointment.id));
        Ok(rows)
    }

    async fn has_scheduled_conflict(
        &self,
        doctor_id: i64,
        appointment_datetime: DateTime<Utc>,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbError> {
        Ok(self
            .lock()?
            .scheduled_slot_taken(doctor_id, appointment_datetime, exclude_id))
    }

    async fn update_appointment(
        &self,
        appointment_id: i64,
        record: &AppointmentRecord,
    ) -> Result<Option<AppointmentRow>, DbError> {
        let mut tables = self.lock()?;
        if !tables.appointments.contains_key(&appointment_id) {
            return Ok(None);
        }
        tables.check_appointment(record, Some(appointment_id))?;
        let Some(appointment) = tables.appointments.get_mut(&appointment_id) else {
            return Ok(None);
        };
        appointment.doctor_id = record.doctor_id;
        appointment.patient_id = record.patient_id;
        appointment.appointment_datetime = record.appointment_datetime;
        appointment.reason = record.reason.clone();
        appointment.status = record.status;
        let appointment = appointment.clone();
        tables.appointment_row(&appointment).map(Some)
    }

    async fn delete_appointment(&self, appointment_id: i64) -> Result<bool, DbError> {
        Ok(self.lock()?.appointments.remove(&appointment_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinic_dbtype::{Gender, Specialization};
    use chrono::{NaiveDate, TimeZone};

    async fn seed_user(db: &MemDbProvider, username: &str) -> UserEntity {
        db.create_user(&NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            email: format!("{}@clinic.test", username),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
        })
        .await
        .unwrap()
    }

    fn patient_record(first_name: &str) -> PatientRecord {
        PatientRecord {
            first_name: first_name.to_string(),
            last_name: "Doe".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
            gender: Gender::Female,
            contact_number: "5550100".to_string(),
            email: String::new(),
            address: String::new(),
            medical_history: String::new(),
        }
    }

    fn doctor_record(license: &str) -> DoctorRecord {
        DoctorRecord {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            specialization: Specialization::Cardiologist,
            contact_number: "5550199".to_string(),
            email: String::new(),
            license_number: license.to_string(),
            hospital: "General".to_string(),
            address: String::new(),
            experience_years: 12,
        }
    }

    #[tokio::test]
    async fn test_username_is_unique() {
        let db = MemDbProvider::new();
        seed_user(&db, "alice").await;
        let err = db
            .create_user(&NewUser {
                username: "alice".to_string(),
                password_hash: "x".to_string(),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, DbError::UniqueViolation(UQ_USER_USERNAME.to_string()));
    }

    #[tokio::test]
    async fn test_license_unique_on_create_and_update() {
        let db = MemDbProvider::new();
        let owner = seed_user(&db, "owner").await;
        let first = db.create_doctor(owner.id, &doctor_record("LIC-1")).await.unwrap();
        let second = db.create_doctor(owner.id, &doctor_record("LIC-2")).await.unwrap();

        let dup = db.create_doctor(owner.id, &doctor_record("LIC-1")).await;
        assert_eq!(
            dup.unwrap_err(),
            DbError::UniqueViolation(UQ_DOCTOR_LICENSE.to_string())
        );

        let clash = db.update_doctor(second.id, &doctor_record("LIC-1")).await;
        assert!(clash.is_err());
        // 保留自身的执照号不算冲突
        let same = db.update_doctor(first.id, &doctor_record("LIC-1")).await.unwrap();
        assert!(same.is_some());
    }

    #[tokio::test]
    async fn test_mapping_pair_unique_regardless_of_active_flag() {
        let db = MemDbProvider::new();
        let owner = seed_user(&db, "owner").await;
        let patient = db.create_patient(owner.id, &patient_record("Alice")).await.unwrap();
        let doctor = db.create_doctor(owner.id, &doctor_record("LIC-1")).await.unwrap();
        let mut mapping = NewMapping {
            patient_id: patient.id,
            doctor_id: doctor.id,
            assigned_by: owner.id,
            assigned_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            reason_for_assignment: String::new(),
            is_active: false,
        };
        let row = db.create_mapping(&mapping).await.unwrap();
        assert_eq!(row.doctor_name, "Dr. John Smith");
        assert_eq!(row.patient_name, "Alice Doe");
        assert_eq!(row.assigned_by_username.as_deref(), Some("owner"));

        mapping.is_active = true;
        let err = db.create_mapping(&mapping).await.unwrap_err();
        assert_eq!(err, DbError::UniqueViolation(UQ_MAPPING_PAIR.to_string()));
    }

    #[tokio::test]
    async fn test_scheduled_slot_is_partial_unique() {
        let db = MemDbProvider::new();
        let owner = seed_user(&db, "owner").await;
        let patient = db.create_patient(owner.id, &patient_record("Alice")).await.unwrap();
        let doctor = db.create_doctor(owner.id, &doctor_record("LIC-1")).await.unwrap();
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let mut record = AppointmentRecord {
            doctor_id: doctor.id,
            patient_id: patient.id,
            appointment_datetime: at,
            reason: String::new(),
            status: AppointmentStatus::Cancelled,
        };
        db.create_appointment(owner.id, &record).await.unwrap();
        record.status = AppointmentStatus::Scheduled;
        let scheduled = db.create_appointment(owner.id, &record).await.unwrap();
        let err = db.create_appointment(owner.id, &record).await.unwrap_err();
        assert_eq!(
            err,
            DbError::UniqueViolation(UQ_APPOINTMENT_SCHEDULED_SLOT.to_string())
        );
        assert!(db.has_scheduled_conflict(doctor.id, at, None).await.unwrap());
        assert!(
            !db.has_scheduled_conflict(doctor.id, at, Some(scheduled.appointment.id))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_delete_patient_cascades() {
        let db = MemDbProvider::new();
        let owner = seed_user(&db, "owner").await;
        let patient = db.create_patient(owner.id, &patient_record("Alice")).await.unwrap();
        let doctor = db.create_doctor(owner.id, &doctor_record("LIC-1")).await.unwrap();
        db.create_mapping(&NewMapping {
            patient_id: patient.id,
            doctor_id: doctor.id,
            assigned_by: owner.id,
            assigned_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            reason_for_assignment: String::new(),
            is_active: true,
        })
        .await
        .unwrap();
        db.create_appointment(
            owner.id,
            &AppointmentRecord {
                doctor_id: doctor.id,
                patient_id: patient.id,
                appointment_datetime: Utc::now(),
                reason: String::new(),
                status: AppointmentStatus::Scheduled,
            },
        )
        .await
        .unwrap();

        assert!(db.delete_patient(patient.id).await.unwrap());
        assert!(db.find_mapping(patient.id, doctor.id).await.unwrap().is_none());
        let left = db
            .list_appointments(owner.id, &AppointmentFilter::default())
            .await
            .unwrap();
        assert!(left.is_empty());
        assert!(!db.delete_patient(patient.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_visible_mappings_is_union_of_both_sides() {
        let db = MemDbProvider::new();
        let patient_owner = seed_user(&db, "patient_owner").await;
        let doctor_owner = seed_user(&db, "doctor_owner").await;
        let stranger = seed_user(&db, "stranger").await;
        let patient = db
            .create_patient(patient_owner.id, &patient_record("Alice"))
            .await
            .unwrap();
        let doctor = db
            .create_doctor(doctor_owner.id, &doctor_record("LIC-1"))
            .await
            .unwrap();
        db.create_mapping(&NewMapping {
            patient_id: patient.id,
            doctor_id: doctor.id,
            assigned_by: patient_owner.id,
            assigned_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            reason_for_assignment: String::new(),
            is_active: true,
        })
        .await
        .unwrap();

        assert_eq!(db.list_visible_mappings(patient_owner.id).await.unwrap().len(), 1);
        assert_eq!(db.list_visible_mappings(doctor_owner.id).await.unwrap().len(), 1);
        assert!(db.list_visible_mappings(stranger.id).await.unwrap().is_empty());
    }
}
