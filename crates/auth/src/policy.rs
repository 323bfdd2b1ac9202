use serde::{Deserialize, Serialize};

/// What to do when a lookup that feeds an authorization decision fails.
///
/// `FailOpen` keeps the UI usable through transient lookup failures by
/// treating the failure as "no data". `FailClosed` surfaces the error.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    FailOpen,
    FailClosed,
}

impl FailurePolicy {
    pub fn is_fail_open(&self) -> bool {
        matches!(self, Self::FailOpen)
    }
}
