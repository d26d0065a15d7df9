//! Session configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SessionError;

// ---------------------------------------------------------------------------
// HistoryPolicy
// ---------------------------------------------------------------------------

/// What happens to a room's local history when the user joins or leaves it.
///
/// The server replays a room's history on every join, so keeping the local
/// copy would show each replayed message twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPolicy {
    /// Empty the room's messages on join and on leave.
    #[default]
    Clear,
    /// Keep whatever the room already holds.
    Preserve,
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear => write!(f, "clear"),
            Self::Preserve => write!(f, "preserve"),
        }
    }
}

impl FromStr for HistoryPolicy {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Ok(Self::Clear),
            "preserve" => Ok(Self::Preserve),
            _ => Err(SessionError::UnknownHistoryPolicy(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`SessionController`](crate::SessionController).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Applied to the target room on join and to the left room on leave.
    ///
    /// Default: [`HistoryPolicy::Clear`].
    pub history_policy: HistoryPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_policy_default_is_clear() {
        assert_eq!(HistoryPolicy::default(), HistoryPolicy::Clear);
        assert_eq!(SessionConfig::default().history_policy, HistoryPolicy::Clear);
    }

    #[test]
    fn test_history_policy_from_str_accepts_any_case() {
        assert_eq!("clear".parse(), Ok(HistoryPolicy::Clear));
        assert_eq!("Preserve".parse(), Ok(HistoryPolicy::Preserve));
        assert_eq!(" PRESERVE ".parse(), Ok(HistoryPolicy::Preserve));
    }

    #[test]
    fn test_history_policy_from_str_unknown_is_error() {
        assert_eq!(
            "keep".parse::<HistoryPolicy>(),
            Err(SessionError::UnknownHistoryPolicy("keep".into()))
        );
    }

    #[test]
    fn test_history_policy_display_round_trips() {
        for policy in [HistoryPolicy::Clear, HistoryPolicy::Preserve] {
            assert_eq!(policy.to_string().parse(), Ok(policy));
        }
    }

    #[test]
    fn test_history_policy_serializes_lowercase() {
        let json = serde_json::to_string(&HistoryPolicy::Preserve).unwrap();
        assert_eq!(json, "\"preserve\"");
    }
}
