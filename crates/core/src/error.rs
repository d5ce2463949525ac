use validator::ValidationErrors;

use crate::types::DbId;

/// Domain errors that are not specific to authentication.
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

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for CoreError {
    /// Flatten field errors into `"field: message; field: message"`, sorted
    /// by field name so the output is stable.
    fn from(errors: ValidationErrors) -> Self {
        let mut parts: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{field}: {detail}")
            })
            .collect();
        parts.sort();
        CoreError::Validation(parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn validation_errors_are_flattened_and_sorted() {
        let probe = Probe {
            name: "ab".into(),
            email: "nope".into(),
        };
        let err = CoreError::from(probe.validate().unwrap_err());
        match err {
            CoreError::Validation(msg) => {
                assert_eq!(msg, "email: email; name: too short");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
