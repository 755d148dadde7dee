use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl DatabaseError {
    /// Map a non-success PostgREST status to an error kind. A 409 is split on
    /// the SQLSTATE `code` carried in the body.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => DatabaseError::Auth(message),
            404 => DatabaseError::NotFound(message),
            409 => match sqlstate(&message).as_deref() {
                Some(UNIQUE_VIOLATION) => DatabaseError::Conflict(message),
                Some(FOREIGN_KEY_VIOLATION) => DatabaseError::ForeignKeyViolation(message),
                _ => DatabaseError::Api { status, message },
            },
            _ => DatabaseError::Api { status, message },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DatabaseError::Conflict(_))
    }
}

fn sqlstate(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("code")?.as_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_status_split_by_sqlstate() {
        let unique = DatabaseError::from_status(409, r#"{"code":"23505","message":"duplicate key"}"#.into());
        assert!(unique.is_conflict());

        let foreign = DatabaseError::from_status(
            409,
            r#"{"code":"23503","details":"Key (patient_id)=(1) is not present in table \"patients\"."}"#.into(),
        );
        assert!(matches!(foreign, DatabaseError::ForeignKeyViolation(_)));

        let opaque = DatabaseError::from_status(409, "conflict".into());
        assert!(matches!(opaque, DatabaseError::Api { status: 409, .. }));
    }
}
