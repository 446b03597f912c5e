//! Opaque persisted session blob.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serialized platform session state.
///
/// The contents (device identity, auth material) are meaningful only to
/// the platform client that produced them; everything else treats the
/// blob as opaque.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Session(Value);

impl Session {
    /// Wrap raw session state.
    #[must_use]
    pub fn new(state: Value) -> Self {
        Self(state)
    }

    /// Borrow the raw session state.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}
