use crate::clinic_dbtype::{AppointmentStatus, Gender, Specialization};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 系统账号. password_hash 为 Argon2 PHC 字符串, 不参与序列化.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// 患者记录, user_id 为创建者(所有者).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientEntity {
    pub id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub contact_number: String,
    pub email: String,
    pub address: String,
    pub medical_history: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientEntity {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age_on(&self, today: NaiveDate) -> i32 {
        age_on(self.date_of_birth, today)
    }

    pub fn record(&self) -> PatientRecord {
        PatientRecord {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            contact_number: self.contact_number.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            medical_history: self.medical_history.clone(),
        }
    }
}

/// 周岁: 今年的生日还没到则减一.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let before_birthday =
        (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day());
    today.year() - date_of_birth.year() - i32::from(before_birthday)
}

/// 患者的可写字段.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRecord {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub contact_number: String,
    pub email: String,
    pub address: String,
    pub medical_history: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoctorEntity {
    pub id: i64,
    pub user_id: i64,
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

impl DoctorEntity {
    pub fn display_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }

    pub fn record(&self) -> DoctorRecord {
        DoctorRecord {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            specialization: self.specialization,
            contact_number: self.contact_number.clone(),
            email: self.email.clone(),
            license_number: self.license_number.clone(),
            hospital: self.hospital.clone(),
            address: self.address.clone(),
            experience_years: self.experience_years,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorRecord {
    pub first_name: String,
    pub last_name: String,
    pub specialization: Specialization,
    pub contact_number: String,
    pub email: String,
    pub license_number: String,
    pub hospital: String,
    pub address: String,
    pub experience_years: i32,
}

/// 患者-医生分配关系. (patient_id, doctor_id) 全局唯一, 与 is_active 无关.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingEntity {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub assigned_by: Option<i64>,
    pub assigned_date: NaiveDate,
    pub reason_for_assignment: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// 分配关系及其关联方信息, 一次查询取回, 供可见性判断和输出使用.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRow {
    pub mapping: MappingEntity,
    pub patient_owner_id: i64,
    pub doctor_owner_id: i64,
    pub patient_name: String,
    pub doctor_name: String,
    pub assigned_by_username: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMapping {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub assigned_by: i64,
    pub assigned_date: NaiveDate,
    pub reason_for_assignment: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingChanges {
    pub reason_for_assignment: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentEntity {
    pub id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub appointment_datetime: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl AppointmentEntity {
    pub fn record(&self) -> AppointmentRecord {
        AppointmentRecord {
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
            appointment_datetime: self.appointment_datetime,
            reason: self.reason.clone(),
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRow {
    pub appointment: AppointmentEntity,
    pub patient_owner_id: i64,
    pub doctor_owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRecord {
    pub doctor_id: i64,
    pub patient_id: i64,
    pub appointment_datetime: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
}

/// 预约列表过滤条件, 全部为 None 时返回用户可见的全部预约.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &AppointmentEntity) -> bool {
        self.doctor_id.is_none_or(|id| id == appointment.doctor_id)
            && self.patient_id.is_none_or(|id| id == appointment.patient_id)
            && self.status.is_none_or(|status| status == appointment.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_on_birthday_counts_full_year() {
        assert_eq!(age_on(date(1990, 6, 15), date(2025, 6, 15)), 35);
        assert_eq!(age_on(date(1990, 6, 15), date(2025, 12, 1)), 35);
    }

    #[test]
    fn test_age_before_birthday_is_one_less() {
        assert_eq!(age_on(date(1990, 6, 15), date(2025, 6, 14)), 34);
        assert_eq!(age_on(date(1990, 6, 15), date(2025, 1, 1)), 34);
    }

    #[test]
    fn test_age_for_leap_day_birth() {
        // 平年 2 月 28 日仍未到 2 月 29 日
        assert_eq!(age_on(date(2000, 2, 29), date(2025, 2, 28)), 24);
        assert_eq!(age_on(date(2000, 2, 29), date(2025, 3, 1)), 25);
    }

    #[test]
    fn test_filter_matches_each_field() {
        let now = Utc::now();
        let appointment = AppointmentEntity {
            id: 1,
            doctor_id: 7,
            patient_id: 9,
            appointment_datetime: now,
            reason: String::new(),
            status: AppointmentStatus::Completed,
            created_by: None,
            created_at: now,
        };
        assert!(AppointmentFilter::default().matches(&appointment));
        let by_doctor = AppointmentFilter {
            doctor_id: Some(7),
            ..Default::default()
        };
        assert!(by_doctor.matches(&appointment));
        let by_status = AppointmentFilter {
            status: Some(AppointmentStatus::Scheduled),
            ..Default::default()
        };
        assert!(!by_status.matches(&appointment));
        let by_patient = AppointmentFilter {
            patient_id: Some(10),
            ..Default::default()
        };
        assert!(!by_patient.matches(&appointment));
    }
}
