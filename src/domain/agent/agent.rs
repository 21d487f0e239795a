use serde::{Deserialize, Serialize};

/// A support agent who can receive files for fulfillment
///
/// Only active agents are eligible for new assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_active: bool,
}

impl Agent {
    /// Creates an active agent
    pub fn active(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            is_active: true,
        }
    }

    /// Creates an inactive agent
    pub fn inactive(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            is_active: false,
            ..Self::active(id, display_name)
        }
    }
}
