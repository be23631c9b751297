use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Brand,
    Partner,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::Brand => "brand",
            UserRole::Partner => "partner",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brand" => Ok(UserRole::Brand),
            "partner" => Ok(UserRole::Partner),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// DB row struct — role is kept as TEXT and parsed where needed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Request/Response DTOs. Fields are optional so that an absent key surfaces
// as the not-enough-data error rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Public view of a user, serialized as the `userData` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
}

impl From<&User> for UserData {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
            role: u.role.parse().unwrap_or(UserRole::Brand),
            is_active: u.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_display() {
        for role in [UserRole::Brand, UserRole::Partner] {
            let parsed: UserRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn user_data_uses_camel_case_keys() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@a.com".into(),
            password_hash: "x".into(),
            name: "n".into(),
            role: "brand".into(),
            is_active: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(UserData::from(&user)).unwrap();
        assert_eq!(value["isActive"], serde_json::json!(false));
        assert_eq!(value["role"], serde_json::json!("brand"));
        assert!(value.get("password_hash").is_none());
    }
}
