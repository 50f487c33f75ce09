//! State - task status set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::BloqueoError;

/// TaskStatus is the fixed status set of a task.
///
/// # Transitions
/// - pending -> executed
/// - pending -> failed
///
/// `executed` and `failed` are terminal. Nothing transitions out of them;
/// the store performs a blind overwrite, so callers must not attempt it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Executed,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Pending, Self::Executed, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executed => "executed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = BloqueoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                BloqueoError::Validation(
                    "status must be 'pending', 'executed' or 'failed'".to_string(),
                )
            })
    }
}
