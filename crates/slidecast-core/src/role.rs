//! Connection roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The role a connection plays in a session.
///
/// Wire names follow the classroom consoles (`teacher`, `student`,
/// `getSessions`); the descriptive names are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Drives the session: creates, starts, changes slides, draws.
    #[serde(rename = "teacher", alias = "presenter")]
    Presenter,
    /// Follows the session and may chat.
    #[serde(rename = "student", alias = "viewer")]
    Viewer,
    /// Short-lived connection that only fetches the session list.
    #[serde(rename = "getSessions", alias = "directory")]
    Directory,
}

impl Role {
    /// Wire name of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Presenter => "teacher",
            Self::Viewer => "student",
            Self::Directory => "getSessions",
        }
    }

    /// Parse a wire name or alias.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "teacher" | "presenter" => Some(Self::Presenter),
            "student" | "viewer" => Some(Self::Viewer),
            "getSessions" | "directory" => Some(Self::Directory),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownRole(s.to_owned()))
    }
}
