use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role a member holds within one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberRole {
    Admin,
    Moderator,
    Student,
}

impl MemberRole {
    pub const ALL: [MemberRole; 3] = [MemberRole::Admin, MemberRole::Moderator, MemberRole::Student];

    pub fn as_str(self) -> &'static str {
        match self {
            MemberRole::Admin => "Admin",
            MemberRole::Moderator => "Moderator",
            MemberRole::Student => "Student",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MemberRole::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| {
                format!("Unknown role '{s}' (expected one of: Admin, Moderator, Student)")
            })
    }
}
