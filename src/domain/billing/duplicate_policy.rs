//! What to do when several directory records share one email.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Policy applied when an email lookup returns more than one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateEmailPolicy {
    /// Update the first record the directory returns.
    #[default]
    FirstMatch,
    /// Refuse to update anything.
    Reject,
}

impl fmt::Display for DuplicateEmailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstMatch => write!(f, "first_match"),
            Self::Reject => write!(f, "reject"),
        }
    }
}
