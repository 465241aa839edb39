use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role. A closed set; nothing outside it can be stored or granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// User record in the database. Credential material and reset state never
/// serialize.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub role: Role,
    pub password_changed_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub password_reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<OffsetDateTime>,
    pub active: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Whether the password changed after a token issued at `iat`. Compared
    /// at whole-second resolution; a change in the same second as issue
    /// leaves the token honored.
    pub fn password_changed_after(&self, iat: usize) -> bool {
        match self.password_changed_at {
            Some(changed) => changed.unix_timestamp() > iat as i64,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(password_changed_at: Option<i64>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test User".into(),
            email: "test@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            role: Role::default(),
            password_changed_at: password_changed_at
                .map(|ts| OffsetDateTime::from_unix_timestamp(ts).expect("valid timestamp")),
            password_reset_token_hash: Some("deadbeef".into()),
            password_reset_expires: Some(OffsetDateTime::now_utc()),
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn role_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Role::LeadGuide).expect("serialize"),
            "\"lead-guide\""
        );
        assert_eq!(
            serde_json::from_str::<Role>("\"guide\"").expect("deserialize"),
            Role::Guide
        );
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn serialized_user_carries_no_credential_material() {
        let value = serde_json::to_value(sample_user(Some(1_700_000_000))).expect("serialize");
        let map = value.as_object().expect("object");
        assert!(map.contains_key("email"));
        assert!(!map.contains_key("password_hash"));
        assert!(!map.contains_key("password_reset_token_hash"));
        assert!(!map.contains_key("password_reset_expires"));
    }

    #[test]
    fn never_changed_password_honors_any_token() {
        let user = sample_user(None);
        assert!(!user.password_changed_after(0));
        assert!(!user.password_changed_after(1_700_000_000));
    }

    #[test]
    fn change_before_issue_keeps_token() {
        let user = sample_user(Some(1_700_000_000));
        assert!(!user.password_changed_after(1_700_000_100));
    }

    #[test]
    fn change_in_same_second_keeps_token() {
        let user = sample_user(Some(1_700_000_000));
        assert!(!user.password_changed_after(1_700_000_000));
    }

    #[test]
    fn change_after_issue_revokes_token() {
        let user = sample_user(Some(1_700_000_001));
        assert!(user.password_changed_after(1_700_000_000));
    }
}
