use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
    Hod,
    Dean,
    Parent,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "faculty" => Some(Self::Faculty),
            "hod" => Some(Self::Hod),
            "dean" => Some(Self::Dean),
            "parent" => Some(Self::Parent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Faculty => "faculty",
            Self::Hod => "hod",
            Self::Dean => "dean",
            Self::Parent => "parent",
        }
    }

    /// The dean account is the portal's administrator.
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Dean)
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
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("Dean"), Some(Role::Dean));
        assert_eq!(Role::parse(" HOD "), Some(Role::Hod));
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn only_dean_is_admin() {
        for r in [Role::Student, Role::Faculty, Role::Hod, Role::Parent] {
            assert!(!r.is_admin(), "{} should not be admin", r);
        }
        assert!(Role::Dean.is_admin());
    }
}
