use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(ascii_case_insensitive)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    /// Tokens carry the role in lowercase ("admin", "teacher", "student").
    pub fn token_name(&self) -> String {
        self.to_string().to_lowercase()
    }

    pub fn from_token(role: &str) -> Option<Self> {
        role.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roles_parse_case_insensitively() {
        assert_eq!(Role::from_token("teacher"), Some(Role::Teacher));
        assert_eq!(Role::from_token("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_token("Student"), Some(Role::Student));
        assert_eq!(Role::from_token("parent"), None);
        assert_eq!(Role::Teacher.token_name(), "teacher");
    }
}
