use crate::types::DbId;

/// Domain error taxonomy shared by the engine and the HTTP layer.
///
/// Validation and state errors never partially apply; `ServiceUnavailable`
/// is transient and safe to retry.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        Self::NotFound { entity, id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = CoreError::not_found("Campaign", 7);
        assert_eq!(err.to_string(), "Entity not found: Campaign with id 7");
    }

    #[test]
    fn invalid_state_message() {
        let err = CoreError::InvalidState("task is completed".into());
        assert_eq!(err.to_string(), "Invalid state: task is completed");
    }
}
