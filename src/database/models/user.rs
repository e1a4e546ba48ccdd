use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored identity.
///
/// Not `Serialize`. The only way out to a client is through
/// [`UserView`], which has no field for the credential hash, the session
/// tokens, or the avatar bytes.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: i32,
    pub avatar: Option<Vec<u8>>,
    pub tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, age: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            age,
            avatar: None,
            tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_session(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn view(&self) -> UserView {
        UserView::from(self)
    }
}

/// External representation of an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            age: user.age,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_never_carries_credentials_sessions_or_avatar() {
        let mut user = User::new(
            "Ali".to_string(),
            "ali@example.com".to_string(),
            "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".to_string(),
            20,
        );
        user.tokens.push("token-one".to_string());
        user.avatar = Some(vec![0x89, b'P', b'N', b'G']);

        let json = serde_json::to_value(user.view()).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();

        for forbidden in ["password", "passwordHash", "password_hash", "tokens", "activeSessions", "avatar"] {
            assert!(!keys.iter().any(|k| k.as_str() == forbidden), "{} leaked: {}", forbidden, json);
        }
        assert!(!json.to_string().contains("argon2"));
        assert!(!json.to_string().contains("token-one"));
        assert_eq!(json["email"], "ali@example.com");
        assert!(json.get("createdAt").is_some());
    }
}
