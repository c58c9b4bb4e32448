use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// 字段长度上限, 与 clinic_schema.sql 中的 VARCHAR 定义保持一致.
pub const USERNAME_MAX_LEN: usize = 150;
pub const NAME_MAX_LEN: usize = 100;
pub const CONTACT_MAX_LEN: usize = 15;
pub const EMAIL_MAX_LEN: usize = 254;
pub const LICENSE_MAX_LEN: usize = 50;
pub const HOSPITAL_MAX_LEN: usize = 200;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("\"{code}\" is not a valid choice.")]
pub struct UnknownCode {
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            "O" => Ok(Gender::Other),
            _ => Err(UnknownCode { code: s.to_string() }),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 医生专科, 存储为固定编码.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Specialization {
    #[serde(rename = "GP")]
    GeneralPractitioner,
    #[serde(rename = "CAR")]
    Cardiologist,
    #[serde(rename = "NEU")]
    Neurologist,
    #[serde(rename = "PED")]
    Pediatrician,
    #[serde(rename = "ORTH")]
    Orthopedist,
    #[serde(rename = "DERM")]
    Dermatologist,
    #[serde(rename = "PSY")]
    Psychiatrist,
    #[serde(rename = "RAD")]
    Radiologist,
    #[serde(rename = "SUR")]
    Surgeon,
    #[serde(rename = "OTH")]
    Other,
}

impl Specialization {
    pub const ALL: [Specialization; 10] = [
        Specialization::GeneralPractitioner,
        Specialization::Cardiologist,
        Specialization::Neurologist,
        Specialization::Pediatrician,
        Specialization::Orthopedist,
        Specialization::Dermatologist,
        Specialization::Psychiatrist,
        Specialization::Radiologist,
        Specialization::Surgeon,
        Specialization::Other,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Specialization::GeneralPractitioner => "GP",
            Specialization::Cardiologist => "CAR",
            Specialization::Neurologist => "NEU",
            Specialization::Pediatrician => "PED",
            Specialization::Orthopedist => "ORTH",
            Specialization::Dermatologist => "DERM",
            Specialization::Psychiatrist => "PSY",
            Specialization::Radiologist => "RAD",
            Specialization::Surgeon => "SUR",
            Specialization::Other => "OTH",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Specialization::GeneralPractitioner => "General Practitioner",
            Specialization::Cardiologist => "Cardiologist",
            Specialization::Neurologist => "Neurologist",
            Specialization::Pediatrician => "Pediatrician",
            Specialization::Orthopedist => "Orthopedist",
            Specialization::Dermatologist => "Dermatologist",
            Specialization::Psychiatrist => "Psychiatrist",
            Specialization::Radiologist => "Radiologist",
            Specialization::Surgeon => "Surgeon",
            Specialization::Other => "Other",
        }
    }
}

impl FromStr for Specialization {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Specialization::ALL
            .iter()
            .find(|spec| spec.code() == s)
            .copied()
            .ok_or_else(|| UnknownCode { code: s.to_string() })
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn code(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(AppointmentStatus::Scheduled),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            "CANCELLED" => Ok(AppointmentStatus::Cancelled),
            _ => Err(UnknownCode { code: s.to_string() }),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
