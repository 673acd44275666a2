use std::collections::HashMap;

use serde::Deserialize;

/// Attributes for a user account to be created with
/// [`create_user`](super::FirebaseAuthClient::create_user).
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// A user account as stored by Firebase Auth.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "localId")]
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub disabled: bool,
}

/// The claims of a verified ID token.
///
/// `user_id` identifies the user the token was issued to. All remaining
/// claims (standard JWT fields as well as anything the token was minted
/// with) are available in `other`.
#[derive(Debug, Deserialize)]
pub struct IdTokenClaims {
    pub user_id: String,
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_user_from_lookup_response() {
        let json = serde_json::json!({
            "localId": "abc123",
            "email": "caesar@rome.it",
            "displayName": "Julius Caesar",
            "emailVerified": true,
            "createdAt": "1669914600000",
        });

        let user: User = serde_json::from_value(json).unwrap();

        assert_eq!(user.uid, "abc123");
        assert_eq!(user.email.as_deref(), Some("caesar@rome.it"));
        assert_eq!(user.display_name.as_deref(), Some("Julius Caesar"));
        assert!(user.email_verified);
        assert!(!user.disabled);
    }
}
