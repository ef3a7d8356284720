//! Engine error taxonomy.
//!
//! Every failure inside connection admission and message handling falls into
//! one of four classes, and each class has a fixed user-visible outcome:
//!
//! | Variant | Outcome |
//! |---------|---------|
//! | `Validation` | message dropped and logged, connection stays open |
//! | `PolicyViolation` | connection closed with the reason |
//! | `NotFound` | silent no-op |
//! | `TransientIo` | logged, operation abandoned |

/// WebSocket close code for policy violations (RFC 6455 §7.4.1).
pub const CLOSE_POLICY: u16 = 1008;

/// WebSocket close code for unexpected server conditions.
pub const CLOSE_INTERNAL: u16 = 1011;

/// Failure raised while admitting a connection or handling a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Malformed or unusable message content.
    #[error("invalid message: {0}")]
    Validation(String),

    /// Join preconditions unmet.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// The referenced session does not exist.
    #[error("session not found: {0}")]
    NotFound(String),

    /// The session store could not be reached.
    #[error("store unavailable: {0}")]
    TransientIo(String),
}

impl SyncError {
    /// Close code to use when this error ends a connection.
    pub fn close_code(&self) -> u16 {
        match self {
            Self::PolicyViolation(_) => CLOSE_POLICY,
            _ => CLOSE_INTERNAL,
        }
    }

    /// Human-readable close reason. Internal details stay in the logs.
    pub fn close_reason(&self) -> String {
        match self {
            Self::PolicyViolation(reason) => reason.clone(),
            _ => "internal error".into(),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::PolicyViolation(_) => "policy_violation",
            Self::NotFound(_) => "not_found",
            Self::TransientIo(_) => "transient_io",
        }
    }
}

/// Convenience alias.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
