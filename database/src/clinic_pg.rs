use crate::clinic_dbprovider::{DbError, DbProvider};
use crate::clinic_dbtype::AppointmentStatus;
use crate::clinic_meta::{
    AppointmentEntity, AppointmentFilter, AppointmentRecord, AppointmentRow, DoctorEntity,
    DoctorRecord, MappingChanges, MappingEntity, MappingRow, NewMapping, NewUser, PatientEntity,
    PatientRecord, UserEntity,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row};

static SCHEMA_SQL: &str = include_str!("clinic_schema.sql");

const USER_COLUMNS: &str =
    "id, username, password_hash, email, first_name, last_name, date_joined";

const PATIENT_COLUMNS: &str = "id, user_id, first_name, last_name, date_of_birth, gender, \
     contact_number, email, address, medical_history, created_at, updated_at";

const DOCTOR_COLUMNS: &str = "id, user_id, first_name, last_name, specialization, \
     contact_number, email, license_number, hospital, address, experience_years, \
     created_at, updated_at";

const MAPPING_SELECT: &str = r#"
    SELECT m.id, m.patient_id, m.doctor_id, m.assigned_by, m.assigned_date,
           m.reason_for_assignment, m.is_active, m.created_at,
           p.user_id AS patient_owner_id, d.user_id AS doctor_owner_id,
           p.first_name AS patient_first_name, p.last_name AS patient_last_name,
           d.first_name AS doctor_first_name, d.last_name AS doctor_last_name,
           u.username AS assigned_by_username
    FROM clinic_mapping m
    JOIN clinic_patient p ON p.id = m.patient_id
    JOIN clinic_doctor d ON d.id = m.doctor_id
    LEFT JOIN clinic_user u ON u.id = m.assigned_by
"#;

const APPOINTMENT_SELECT: &str = r#"
    SELECT a.id, a.doctor_id, a.patient_id, a.appointment_datetime, a.reason,
           a.status, a.created_by, a.created_at,
           p.user_id AS patient_owner_id, d.user_id AS doctor_owner_id
    FROM clinic_appointment a
    JOIN clinic_patient p ON p.id = a.patient_id
    JOIN clinic_doctor d ON d.id = a.doctor_id
"#;

// 把 PostgreSQL 的约束冲突映射为带约束名的 DbError
fn map_pg_error(e: tokio_postgres::Error) -> DbError {
    if let Some(db_err) = e.as_db_error() {
        let constraint = db_err.constraint().unwrap_or_default().to_string();
        if *db_err.code() == SqlState::UNIQUE_VIOLATION {
            return DbError::UniqueViolation(constraint);
        }
        if *db_err.code() == SqlState::FOREIGN_KEY_VIOLATION {
            return DbError::ForeignKeyViolation(constraint);
        }
    }
    DbError::DatabaseError(e.to_string())
}

fn parse_code<T: FromStr>(row: &Row, column: &str) -> Result<T, DbError>
where
    T::Err: std::fmt::Display,
{
    let code: String = row.try_get(column).map_err(map_pg_error)?;
    T::from_str(&code).map_err(|e| DbError::DatabaseError(format!("{}: {}", column, e)))
}

fn user_from_row(row: &Row) -> Result<UserEntity, DbError> {
    Ok(UserEntity {
        id: row.try_get("id").map_err(map_pg_error)?,
        username: row.try_get("username").map_err(map_pg_error)?,
        password_hash: row.try_get("password_hash").map_err(map_pg_error)?,
        email: row.try_get("email").map_err(map_pg_error)?,
        first_name: row.try_get("first_name").map_err(map_pg_error)?,
        last_name: row.try_get("last_name").map_err(map_pg_error)?,
        date_joined: row.try_get("date_joined").map_err(map_pg_error)?,
    })
}

fn patient_from_row(row: &Row) -> Result<PatientEntity, DbError> {
    Ok(PatientEntity {
        id: row.try_get("id").map_err(map_pg_error)?,
        user_id: row.try_get("user_id").map_err(map_pg_error)?,
        first_name: row.try_get("first_name").map_err(map_pg_error)?,
        last_name: row.try_get("last_name").map_err(map_pg_error)?,
        date_of_birth: row.try_get("date_of_birth").map_err(map_pg_error)?,
        gender: parse_code(row, "gender")?,
        contact_number: row.try_get("contact_number").map_err(map_pg_error)?,
        email: row.try_get("email").map_err(map_pg_error)?,
        address: row.try_get("address").map_err(map_pg_error)?,
        medical_history: row.try_get("medical_history").map_err(map_pg_error)?,
        created_at: row.try_get("created_at").map_err(map_pg_error)?,
        updated_at: row.try_get("updated_at").map_err(map_pg_error)?,
    })
}

fn doctor_from_row(row: &Row) -> Result<DoctorEntity, DbError> {
    Ok(DoctorEntity {
        id: row.try_get("id").map_err(map_pg_error)?,
        user_id: row.try_get("user_id").map_err(map_pg_error)?,
        first_name: row.try_get("first_name").map_err(map_pg_error)?,
        last_name: row.try_get("last_name").map_err(map_pg_error)?,
        specialization: parse_code(row, "specialization")?,
        contact_number: row.try_get("contact_number").map_err(map_pg_error)?,
        email: row.try_get("email").map_err(map_pg_error)?,
        license_number: row.try_get("license_number").map_err(map_pg_error)?,
        hospital: row.try_get("hospital").map_err(map_pg_error)?,
        address: row.try_get("address").map_err(map_pg_error)?,
        experience_years: row.try_get("experience_years").map_err(map_pg_error)?,
        created_at: row.try_get("created_at").map_err(map_pg_error)?,
        updated_at: row.try_get("updated_at").map_err(map_pg_error)?,
    })
}

fn mapping_from_row(row: &Row) -> Result<MappingRow, DbError> {
    let patient_first: String = row.try_get("patient_first_name").map_err(map_pg_error)?;
    let patient_last: String = row.try_get("patient_last_name").map_err(map_pg_error)?;
    let doctor_first: String = row.try_get("doctor_first_name").map_err(map_pg_error)?;
    let doctor_last: String = row.try_get("doctor_last_name").map_err(map_pg_error)?;
    Ok(MappingRow {
        mapping: MappingEntity {
            id: row.try_get("id").map_err(map_pg_error)?,
            patient_id: row.try_get("patient_id").map_err(map_pg_error)?,
            doctor_id: row.try_get("doctor_id").map_err(map_pg_error)?,
            assigned_by: row.try_get("assigned_by").map_err(map_pg_error)?,
            assigned_date: row.try_get("assigned_date").map_err(map_pg_error)?,
            reason_for_assignment: row.try_get("reason_for_assignment").map_err(map_pg_error)?,
            is_active: row.try_get("is_active").map_err(map_pg_error)?,
            created_at: row.try_get("created_at").map_err(map_pg_error)?,
        },
        patient_owner_id: row.try_get("patient_owner_id").map_err(map_pg_error)?,
        doctor_owner_id: row.try_get("doctor_owner_id").map_err(map_pg_error)?,
        patient_name: format!("{} {}", patient_first, patient_last),
        doctor_name: format!("Dr. {} {}", doctor_first, doctor_last),
        assigned_by_username: row.try_get("assigned_by_username").map_err(map_pg_error)?,
    })
}

fn appointment_from_row(row: &Row) -> Result<AppointmentRow, DbError> {
    Ok(AppointmentRow {
        appointment: AppointmentEntity {
            id: row.try_get("id").map_err(map_pg_error)?,
            doctor_id: row.try_get("doctor_id").map_err(map_pg_error)?,
            patient_id: row.try_get("patient_id").map_err(map_pg_error)?,
            appointment_datetime: row.try_get("appointment_datetime").map_err(map_pg_error)?,
            reason: row.try_get("reason").map_err(map_pg_error)?,
            status: parse_code::<AppointmentStatus>(row, "status")?,
            created_by: row.try_get("created_by").map_err(map_pg_error)?,
            created_at: row.try_get("created_at").map_err(map_pg_error)?,
        },
        patient_owner_id: row.try_get("patient_owner_id").map_err(map_pg_error)?,
        doctor_owner_id: row.try_get("doctor_owner_id").map_err(map_pg_error)?,
    })
}

fn collect<T>(rows: &[Row], f: fn(&Row) -> Result<T, DbError>) -> Result<Vec<T>, DbError> {
    rows.iter().map(f).collect()
}

#[derive(Debug, Clone)]
pub struct PgDbProvider {
    db_connection_string: String,
}

impl PgDbProvider {
    pub fn new(database_url: String) -> Self {
        Self {
            db_connection_string: database_url,
        }
    }

    async fn make_client(&self) -> Result<Client, DbError> {
        let (client, connection) =
            tokio_postgres::connect(self.db_connection_string.as_str(), NoTls)
                .await
                .map_err(|e| DbError::DatabaseError(e.to_string()))?;
        // 连接处理任务, 客户端释放后自动结束
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("Database connection error: {}", e);
            }
        });
        Ok(client)
    }

    /// 建表, 建约束. 可重复执行.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        let client = self.make_client().await?;
        client.batch_execute(SCHEMA_SQL).await.map_err(map_pg_error)
    }

    async fn fetch_mapping(client: &impl tokio_postgres::GenericClient, mapping_id: i64)
    -> Result<Option<MappingRow>, DbError> {
        let sql = format!("{} WHERE m.id = $1", MAPPING_SELECT);
        let row = client.query_opt(&sql, &[&mapping_id]).await.map_err(map_pg_error)?;
        row.as_ref().map(mapping_from_row).transpose()
    }

    async fn fetch_appointment(
        client: &impl tokio_postgres::GenericClient,
        appointment_id: i64,
    ) -> Result<Option<AppointmentRow>, DbError> {
        let sql = format!("{} WHERE a.id = $1", APPOINTMENT_SELECT);
        let row = client
            .query_opt(&sql, &[&appointment_id])
            .await
            .map_err(map_pg_error)?;
        row.as_ref().map(appointment_from_row).transpose()
    }
}

#[async_trait]
impl DbProvider for PgDbProvider {
    async fn create_user(&self, user: &NewUser) -> Result<UserEntity, DbError> {
        let client = self.make_client().await?;
        let sql = format!(
            "INSERT INTO clinic_user (username, password_hash, email, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        let row = client
            .query_one(
                &sql,
                &[
                    &user.username,
                    &user.password_hash,
                    &user.email,
                    &user.first_name,
                    &user.last_name,
                ],
            )
            .await
            .map_err(map_pg_error)?;
        user_from_row(&row)
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<UserEntity>, DbError> {
        let client = self.make_client().await?;
        let sql = format!("SELECT {} FROM clinic_user WHERE id = $1", USER_COLUMNS);
        let row = client.query_opt(&sql, &[&user_id]).await.map_err(map_pg_error)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserEntity>, DbError> {
        let client = self.make_client().await?;
        let sql = format!("SELECT {} FROM clinic_user WHERE username = $1", USER_COLUMNS);
        let row = client.query_opt(&sql, &[&username]).await.map_err(map_pg_error)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_patient(
        &self,
        owner_id: i64,
        record: &PatientRecord,
    ) -> Result<PatientEntity, DbError> {
        let client = self.make_client().await?;
        let sql = format!(
            "INSERT INTO clinic_patient (user_id, first_name, last_name, date_of_birth, gender, \
             contact_number, email, address, medical_history) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            PATIENT_COLUMNS
        );
        let row = client
            .query_one(
                &sql,
                &[
                    &owner_id,
                    &record.first_name,
                    &record.last_name,
                    &record.date_of_birth,
                    &record.gender.code(),
                    &record.contact_number,
                    &record.email,
                    &record.address,
                    &record.medical_history,
                ],
            )
            .await
            .map_err(map_pg_error)?;
        patient_from_row(&row)
    }

    async fn get_patient(&self, patient_id: i64) -> Result<Option<PatientEntity>, DbError> {
        let client = self.make_client().await?;
        let sql = format!("SELECT {} FROM clinic_patient WHERE id = $1", PATIENT_COLUMNS);
        let row = client.query_opt(&sql, &[&patient_id]).await.map_err(map_pg_error)?;
        row.as_ref().map(patient_from_row).transpose()
    }

    async fn list_patients(&self, owner_id: i64) -> Result<Vec<PatientEntity>, DbError> {
        let client = self.make_client().await?;
        let sql = format!(
            "SELECT {} FROM clinic_patient WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            PATIENT_COLUMNS
        );
        let rows = client.query(&sql, &[&owner_id]).await.map_err(map_pg_error)?;
        collect(&rows, patient_from_row)
    }

    async fn update_patient(
        &self,
        patient_id: i64,
        record: &PatientRecord,
    ) -> Result<Option<PatientEntity>, DbError> {
        let client = self.make_client().await?;
        let sql = format!(
            "UPDATE clinic_patient SET first_name = $2, last_name = $3, date_of_birth = $4, \
             gender = $5, contact_number = $6, email = $7, address = $8, medical_history = $9, \
             updated_at = now() WHERE id = $1 RETURNING {}",
            PATIENT_COLUMNS
        );
        let row = client
            .query_opt(
                &sql,
                &[
                    &patient_id,
                    &record.first_name,
                    &record.last_name,
                    &record.date_of_birth,
                    &record.gender.code(),
                    &record.contact_number,
                    &record.email,
                    &record.address,
                    &record.medical_history,
                ],
            )
            .await
            .map_err(map_pg_error)?;
        row.as_ref().map(patient_from_row).transpose()
    }

    async fn delete_patient(&self, patient_id: i64) -> Result<bool, DbError> {
        let client = self.make_client().await?;
        let affected = client
            .execute("DELETE FROM clinic_patient WHERE id = $1", &[&patient_id])
            .await
            .map_err(map_pg_error)?;
        Ok(affected > 0)
    }

    async fn create_doctor(
        &self,
        owner_id: i64,
        record: &DoctorRecord,
    ) -> Result<DoctorEntity, DbError> {
        let client = self.make_client().await?;
        let sql = format!(
            "INSERT INTO clinic_doctor (user_id, first_name, last_name, specialization, \
             contact_number, email, license_number, hospital, address, experience_years) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            DOCTOR_COLUMNS
        );
        let row = client
            .query_one(
                &sql,
                &[
                    &owner_id,
                    &record.first_name,
                    &record.last_name,
                    &record.specialization.code(),
                    &record.contact_number,
                    &record.email,
                    &record.license_number,
                    &record.hospital,
                    &record.address,
                    &record.experience_years,
                ],
            )
            .await
            .map_err(map_pg_error)?;
        doctor_from_row(&row)
    }

    async fn get_doctor(&self, doctor_id: i64) -> Result<Option<DoctorEntity>, DbError> {
        let client = self.make_client().await?;
        let sql = format!("SELECT {} FROM clinic_doctor WHERE id = $1", DOCTOR_COLUMNS);
        let row = client.query_opt(&sql, &[&doctor_id]).await.map_err(map_pg_error)?;
        row.as_ref().map(doctor_from_row).transpose()
    }

    async fn list_doctors(&self) -> Result<Vec<DoctorEntity>, DbError> {
        let client = self.make_client().await?;
        let sql = format!(
            "SELECT {} FROM clinic_doctor ORDER BY created_at DESC, id DESC",
            DOCTOR_COLUMNS
        );
        let rows = client.query(&sql, &[]).await.map_err(map_pg_error)?;
        collect(&rows, doctor_from_row)
    }

    async fn license_number_taken(
        &self,
        license_number: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbError> {
        let client = self.make_client().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM clinic_doctor WHERE license_number = $1 \
                 AND ($2::BIGINT IS NULL OR id <> $2))",
                &[&license_number, &exclude_id],
            )
            .await
            .map_err(map_pg_error)?;
        row.try_get(0).map_err(map_pg_error)
    }

    async fn update_doctor(
        &self,
        doctor_id: i64,
        record: &DoctorRecord,
    ) -> Result<Option<DoctorEntity>, DbError> {
        let client = self.make_client().await?;
        let sql = format!(
            "UPDATE clinic_doctor SET first_name = $2, last_name = $3, specialization = $4, \
             contact_number = $5, email = $6, license_number = $7, hospital = $8, address = $9, \
             experience_years = $10, updated_at = now() WHERE id = $1 RETURNING {}",
            DOCTOR_COLUMNS
        );
        let row = client
            .query_opt(
                &sql,
                &[
                    &doctor_id,
                    &record.first_name,
                    &record.last_name,
                    &record.specialization.code(),
                    &record.contact_number,
                    &record.email,
                    &record.license_number,
                    &record.hospital,
                    &record.address,
                    &record.experience_years,
                ],
            )
            .await
            .map_err(map_pg_error)?;
        row.as_ref().map(doctor_from_row).transpose()
    }

    async fn delete_doctor(&self, doctor_id: i64) -> Result<bool, DbError> {
        let client = self.make_client().await?;
        let affected = client
            .execute("DELETE FROM clinic_doctor WHERE id = $1", &[&doctor_id])
            .await
            .map_err(map_pg_error)?;
        Ok(affected > 0)
    }

    async fn create_mapping(&self, mapping: &NewMapping) -> Result<MappingRow, DbError> {
        let mut client = self.make_client().await?;
        let transaction = client
            .transaction()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        let row = transaction
            .query_one(
                "INSERT INTO clinic_mapping (patient_id, doctor_id, assigned_by, assigned_date, \
                 reason_for_assignment, is_active) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
                &[
                    &mapping.patient_id,
                    &mapping.doctor_id,
                    &mapping.assigned_by,
                    &mapping.assigned_date,
                    &mapping.reason_for_assignment,
                    &mapping.is_active,
                ],
            )
            .await
            .map_err(map_pg_error)?;
        let mapping_id: i64 = row.try_get("id").map_err(map_pg_error)?;
        let created = Self::fetch_mapping(&transaction, mapping_id)
            .await?
            .ok_or_else(|| DbError::TransactionFailed("inserted mapping not found".to_string()))?;
        transaction.commit().await.map_err(map_pg_error)?;
        Ok(created)
    }

    async fn get_mapping(&self, mapping_id: i64) -> Result<Option<MappingRow>, DbError> {
        let client = self.make_client().await?;
        Self::fetch_mapping(&client, mapping_id).await
    }

    async fn find_mapping(
        &self,
        patient_id: i64,
        doctor_id: i64,
    ) -> Result<Option<MappingEntity>, DbError> {
        let client = self.make_client().await?;
        let sql = format!("{} WHERE m.patient_id = $1 AND m.doctor_id = $2", MAPPING_SELECT);
        let row = client
            .query_opt(&sql, &[&patient_id, &doctor_id])
            .await
            .map_err(map_pg_error)?;
        Ok(row.as_ref().map(mapping_from_row).transpose()?.map(|r| r.mapping))
    }

    async fn list_visible_mappings(&self, user_id: i64) -> Result<Vec<MappingRow>, DbError> {
        let client = self.make_client().await?;
        let sql = format!(
            "{} WHERE p.user_id = $1 OR d.user_id = $1 ORDER BY m.created_at DESC, m.id DESC",
            MAPPING_SELECT
        );
        let rows = client.query(&sql, &[&user_id]).await.map_err(map_pg_error)?;
        collect(&rows, mapping_from_row)
    }

    async fn list_active_mappings_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<MappingRow>, DbError> {
        let client = self.make_client().await?;
        let sql = format!(
            "{} WHERE m.patient_id = $1 AND m.is_active ORDER BY m.created_at DESC, m.id DESC",
            MAPPING_SELECT
        );
        let rows = client.query(&sql, &[&patient_id]).await.map_err(map_pg_error)?;
        collect(&rows, mapping_from_row)
    }

    async fn list_active_patients_for_doctor(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<PatientEntity>, DbError> {
        let client = self.make_client().await?;
        let columns = PATIENT_COLUMNS
            .split(", ")
            .map(|c| format!("p.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM clinic_mapping m JOIN clinic_patient p ON p.id = m.patient_id \
             WHERE m.doctor_id = $1 AND m.is_active ORDER BY m.created_at DESC, m.id DESC",
            columns
        );
        let rows = client.query(&sql, &[&doctor_id]).await.map_err(map_pg_error)?;
        collect(&rows, patient_from_row)
    }

    async fn update_mapping(
        &self,
        mapping_id: i64,
        changes: &MappingChanges,
    ) -> Result<Option<MappingRow>, DbError> {
        let mut client = self.make_client().await?;
        let transaction = client
            .transaction()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        let affected = transaction
            .execute(
                "UPDATE clinic_mapping SET reason_for_assignment = $2, is_active = $3 WHERE id = $1",
                &[&mapping_id, &changes.reason_for_assignment, &changes.is_active],
            )
            .await
            .map_err(map_pg_error)?;
        if affected == 0 {
            return Ok(None);
        }
        let updated = Self::fetch_mapping(&transaction, mapping_id).await?;
        transaction.commit().await.map_err(map_pg_error)?;
        Ok(updated)
    }

    async fn delete_mapping(&self, mapping_id: i64) -> Result<bool, DbError> {
        let client = self.make_client().await?;
        let affected = client
            .execute("DELETE FROM clinic_mapping WHERE id = $1", &[&mapping_id])
            .await
            .map_err(map_pg_error)?;
        Ok(affected > 0)
    }

    async fn create_appointment(
        &self,
        created_by: i64,
        record: &AppointmentRecord,
    ) -> Result<AppointmentRow, DbError> {
        let mut client = self.make_client().await?;
        let transaction = client
            .transaction()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        let row = transaction
            .query_one(
                "INSERT INTO clinic_appointment (doctor_id, patient_id, appointment_datetime, \
                 reason, status, created_by) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
                &[
                    &record.doctor_id,
                    &record.patient_id,
                    &record.appointment_datetime,
                    &record.reason,
                    &record.status.code(),
                    &created_by,
                ],
            )
            .await
            .map_err(map_pg_error)?;
        let appointment_id: i64 = row.try_get("id").map_err(map_pg_error)?;
        let created = Self::fetch_appointment(&transaction, appointment_id)
            .await?
            .ok_or_else(|| {
                DbError::TransactionFailed("inserted appointment not found".to_string())
            })?;
        transaction.commit().await.map_err(map_pg_error)?;
        Ok(created)
    }

    async fn get_appointment(
        &self,
        appointment_id: i64,
    ) -> Result<Option<AppointmentRow>, DbError> {
        let client = self.make_client().await?;
        Self::fetch_appointment(&client, appointment_id).await
    }

    async fn list_appointments(
        &self,
        user_id: i64,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentRow>, DbError> {
        let client = self.make_client().await?;
        let sql = format!(
            "{} WHERE (p.user_id = $1 OR d.user_id = $1 OR a.created_by = $1) \
             AND ($2::BIGINT IS NULL OR a.doctor_id = $2) \
             AND ($3::BIGINT IS NULL OR a.patient_id = $3) \
             AND ($4::TEXT IS NULL OR a.status = $4) \
             ORDER BY a.created_at DESC, a.id DESC",
            APPOINTMENT_SELECT
        );
        let status = filter.status.map(|s| s.code().to_string());
        let rows = client
            .query(
                &sql,
                &[&user_id, &filter.doctor_id, &filter.patient_id, &status],
            )
            .await
            .map_err(map_pg_error)?;
        collect(&rows, appointment_from_row)
    }

    async fn has_scheduled_conflict(
        &self,
        doctor_id: i64,
        appointment_datetime: DateTime<Utc>,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbError> {
        let client = self.make_client().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM clinic_appointment WHERE doctor_id = $1 \
                 AND appointment_datetime = $2 AND status = 'SCHEDULED' \
                 AND ($3::BIGINT IS NULL OR id <> $3))",
                &[&doctor_id, &appointment_datetime, &exclude_id],
            )
            .await
            .map_err(map_pg_error)?;
        row.try_get(0).map_err(map_pg_error)
    }

    async fn update_appointment(
        &self,
        appointment_id: i64,
        record: &AppointmentRecord,
    ) -> Result<Option<AppointmentRow>, DbError> {
        let mut client = self.make_client().await?;
        let transaction = client
            .transaction()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        let affected = transaction
            .execute(
                "UPDATE clinic_appointment SET doctor_id = $2, patient_id = $3, \
                 appointment_datetime = $4, reason = $5, status = $6 WHERE id = $1",
                &[
                    &appointment_id,
                    &record.doctor_id,
                    &record.patient_id,
                    &record.appointment_datetime,
                    &record.reason,
                    &record.status.code(),
                ],
            )
            .await
            .map_err(map_pg_error)?;
        if affected == 0 {
            return Ok(None);
        }
        let updated = Self::fetch_appointment(&transaction, appointment_id).await?;
        transaction.commit().await.map_err(map_pg_error)?;
        Ok(updated)
    }

    async fn delete_appointment(&self, appointment_id: i64) -> Result<bool, DbError> {
        let client = self.make_client().await?;
        let affected = client
            .execute(
                "DELETE FROM clinic_appointment WHERE id = $1",
                &[&appointment_id],
            )
            .await
            .map_err(map_pg_error)?;
        Ok(affected > 0)
    }
}
