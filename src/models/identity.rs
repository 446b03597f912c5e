//! Authenticated platform identity.

use serde::{Deserialize, Serialize};

/// The user the platform reports as logged in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Identity {
    /// Numeric platform user identifier.
    pub user_id: i64,
    /// Account username.
    pub username: String,
    /// Display name, when the platform sends one.
    #[serde(default)]
    pub full_name: Option<String>,
}
