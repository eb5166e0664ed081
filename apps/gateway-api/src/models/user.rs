use serde::{Deserialize, Serialize};

/// Platform role attached to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Student,
    Alumni,
    Admin,
    CommunityAdmin,
    BatchAdmin,
}

/// A user record as the directory holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::CommunityAdmin).unwrap(),
            "\"community_admin\""
        );
        assert_eq!(serde_json::to_string(&Role::Student).unwrap(), "\"student\"");
    }

    #[test]
    fn profile_defaults_missing_fields() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id":"usr_1","name":"Priya"}"#).unwrap();
        assert_eq!(profile.role, Role::Student);
        assert!(profile.avatar.is_empty());
    }
}
