use std::fmt;

use serde::{Deserialize, Serialize};

/// Role represents a privilege a user holds inside a group.
/// Ordering follows privilege: admin outranks editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Editor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Editor, Role::Admin];

    /// Returns true if this role carries at least the privileges of `required`.
    /// admin implies editor.
    #[must_use]
    pub fn has(self, required: Role) -> bool {
        self >= required
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }

    /// Converts a role string to its value.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "editor" => Some(Self::Editor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_implies_editor() {
        assert!(Role::Admin.has(Role::Editor));
        assert!(Role::Admin.has(Role::Admin));
        assert!(Role::Editor.has(Role::Editor));
        assert!(!Role::Editor.has(Role::Admin));
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(Role::parse("editor"), Some(Role::Editor));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let parsed: Role = serde_json::from_str("\"editor\"").unwrap();
        assert_eq!(parsed, Role::Editor);
    }
}
