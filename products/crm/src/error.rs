use platform_api::ApiError;
use sea_orm::DbErr;
use thiserror::Error;

pub type LeadResult<T> = Result<T, LeadError>;

#[derive(Debug, Error)]
pub enum LeadError {
    /// Missing or malformed input. Never retried.
    #[error("{0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },
    #[error("{0}")]
    Conflict(String),
    #[error("persistence error: {0}")]
    Persistence(#[from] DbErr),
}

impl LeadError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }

    pub(crate) fn integrity(message: impl Into<String>) -> Self {
        Self::Persistence(DbErr::Custom(message.into()))
    }
}

impl From<LeadError> for ApiError {
    fn from(value: LeadError) -> Self {
        match value {
            LeadError::Validation(message) => ApiError::Validation(message),
            err @ LeadError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            LeadError::Conflict(message) => ApiError::Conflict(message),
            LeadError::Persistence(err) => ApiError::internal(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_entity() {
        let api: ApiError = LeadError::not_found("client", 42).into();
        assert_eq!(api.code(), "NOT_FOUND");
        assert_eq!(api.to_string(), "client 42 not found");
    }

    #[test]
    fn persistence_errors_are_masked() {
        let api: ApiError = LeadError::Persistence(DbErr::Custom("disk full".into())).into();
        assert_eq!(api.code(), "INTERNAL");
        assert_eq!(api.to_string(), "internal server error");
    }
}
