use database::clinic_dbprovider::DbError;
use std::collections::BTreeMap;
use thiserror::Error;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// 字段名 -> 错误信息列表, 序列化为 {"field": ["msg", ...]}.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ServiceError::Validation(errors)
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        ServiceError::PermissionDenied(message.into())
    }
}

/// 逐字段收集校验错误, 最后一次性返回.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: FieldErrors,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ServiceError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_groups_messages_by_field() {
        let mut errors = ErrorCollector::new();
        assert!(errors.is_empty());
        errors.add("email", "Enter a valid email address.");
        errors.add("email", "Ensure this field has no more than 254 characters.");
        errors.add(NON_FIELD_ERRORS, "Doctor already has an appointment at this time.");
        assert!(!errors.is_empty());
        match errors.finish() {
            Err(ServiceError::Validation(map)) => {
                assert_eq!(map["email"].len(), 2);
                assert_eq!(map[NON_FIELD_ERRORS].len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_collector_passes() {
        assert_eq!(ErrorCollector::new().finish(), Ok(()));
    }
}
