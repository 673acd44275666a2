use anyhow::anyhow;
use serde::Deserialize;

use crate::error::FirebaseError;

/// Error response body of the identity-toolkit REST API.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthApiError {
    error: AuthApiErrorInfo,
}

#[derive(Debug, Deserialize)]
struct AuthApiErrorInfo {
    message: String,
    code: u16,
}

impl From<AuthApiError> for FirebaseError {
    fn from(err: AuthApiError) -> Self {
        // The message is a code like "EMAIL_EXISTS", sometimes followed by a
        // colon and a human-readable elaboration.
        match &err.error.message {
            m if m.starts_with("EMAIL_EXISTS") => FirebaseError::EmailAlreadyExists,
            m if m.starts_with("USER_NOT_FOUND") => FirebaseError::UserNotFound,
            _ => anyhow!(
                "Firebase Auth API error {}: {}",
                err.error.code,
                err.error.message
            )
            .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: serde_json::Value) -> FirebaseError {
        serde_json::from_value::<AuthApiError>(body).unwrap().into()
    }

    #[test]
    fn maps_known_error_codes() {
        let err = parse(serde_json::json!({
            "error": { "code": 400, "message": "EMAIL_EXISTS", "errors": [] }
        }));
        assert!(matches!(err, FirebaseError::EmailAlreadyExists));

        let err = parse(serde_json::json!({
            "error": { "code": 400, "message": "USER_NOT_FOUND" }
        }));
        assert!(matches!(err, FirebaseError::UserNotFound));
    }

    #[test]
    fn surfaces_unknown_error_codes() {
        let err = parse(serde_json::json!({
            "error": { "code": 403, "message": "INSUFFICIENT_PERMISSION" }
        }));

        assert!(matches!(err, FirebaseError::Other(_)));
        assert!(err.to_string().contains("INSUFFICIENT_PERMISSION"));
    }
}
