//! Checkpoint and challenge wire models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A platform-imposed hold on a login requiring extra verification.
///
/// Extracted from the body of a failed login call and carried through
/// challenge resolution until the challenge reaches a closed or retry
/// outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Checkpoint {
    /// Browser-facing challenge URL.
    pub url: String,
    /// API path for the challenge sub-protocol, when the platform sent one.
    pub api_path: Option<String>,
    /// Whether the platform locked the login pending manual review.
    pub locked: bool,
    /// Raw checkpoint payload as returned by the platform.
    pub raw: Value,
}

impl Checkpoint {
    /// Extract a checkpoint from a login error body.
    ///
    /// Missing challenge details are tolerated here; the caller decides
    /// whether an absent API path is fatal.
    #[must_use]
    pub fn from_payload(body: Value) -> Self {
        let challenge = body.get("challenge");
        let url = challenge
            .and_then(|c| c.get("url"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let api_path = challenge
            .and_then(|c| c.get("api_path"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        let locked = challenge
            .and_then(|c| c.get("lock"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Self {
            url,
            api_path,
            locked,
            raw: body,
        }
    }

    /// Challenge URL for operator-facing messages, or `"unknown"`.
    #[must_use]
    pub fn describe_url(&self) -> &str {
        if self.url.is_empty() {
            "unknown"
        } else {
            &self.url
        }
    }
}

/// One way of receiving or confirming identity (e.g., a code delivery
/// channel), as a `(value, label)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct VerifyMethod {
    /// Value submitted back to the platform.
    pub value: String,
    /// Human-readable label shown to the operator.
    pub label: String,
}

/// Closed set of challenge steps the resolver dispatches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeStep {
    /// The platform offers one or more verification methods to choose from.
    SelectVerifyMethod {
        /// Ordered method choices.
        methods: Vec<VerifyMethod>,
        /// Platform-suggested default method value.
        default_choice: Option<String>,
    },
    /// Login review step; always auto-approved.
    DeltaLoginReview,
    /// A security code was dispatched and must be submitted.
    VerifyCode,
    /// Any step this automation does not know how to drive.
    Other(String),
}

/// State of an in-flight challenge as reported by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ChallengeState {
    /// Current step identifier.
    #[serde(default)]
    pub step_name: Option<String>,
    /// Step-specific payload.
    #[serde(default)]
    pub step_data: Value,
    /// Challenge-level action, e.g. `"close"`.
    #[serde(default)]
    pub action: Option<String>,
}

impl ChallengeState {
    /// Parse the step name and data into the closed [`ChallengeStep`] set.
    #[must_use]
    pub fn step(&self) -> ChallengeStep {
        match self.step_name.as_deref() {
            Some("select_verify_method") => ChallengeStep::SelectVerifyMethod {
                methods: verify_methods(&self.step_data),
                default_choice: self
                    .step_data
                    .get("default_choice")
                    .filter(|v| !v.is_null())
                    .map(scalar_to_string),
            },
            Some("delta_login_review") => ChallengeStep::DeltaLoginReview,
            Some("verify_code") => ChallengeStep::VerifyCode,
            Some(other) => ChallengeStep::Other(other.to_owned()),
            None => ChallengeStep::Other(String::new()),
        }
    }

    /// Whether the platform closed the challenge.
    #[must_use]
    pub fn is_close(&self) -> bool {
        self.action.as_deref() == Some("close")
    }

    /// Step name for diagnostics, tolerating its absence.
    #[must_use]
    pub fn describe_step(&self) -> &str {
        self.step_name.as_deref().unwrap_or("<missing>")
    }
}

/// Response to a submitted security code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ChallengeResponse {
    /// Platform status string, `"ok"` on success.
    #[serde(default)]
    pub status: Option<String>,
    /// Challenge-level action, e.g. `"close"`.
    #[serde(default)]
    pub action: Option<String>,
    /// Authenticated user payload when the code completed the login.
    #[serde(default)]
    pub logged_in_user: Option<Value>,
}

/// Build the ordered verification method list from step data.
///
/// The platform either sends an explicit `choices` list of
/// `[value, label]` pairs, or a single `choice` (with optional
/// `choice_label`) that is synthesized into a one-element list.
#[must_use]
pub fn verify_methods(step_data: &Value) -> Vec<VerifyMethod> {
    if let Some(pairs) = step_data.get("choices").and_then(Value::as_array) {
        let methods: Vec<VerifyMethod> = pairs
            .iter()
            .filter_map(|pair| {
                let pair = pair.as_array()?;
                let value = scalar_to_string(pair.first()?);
                let label = pair
                    .get(1)
                    .filter(|v| !v.is_null())
                    .map_or_else(|| value.clone(), scalar_to_string);
                Some(VerifyMethod { value, label })
            })
            .collect();
        if !methods.is_empty() {
            return methods;
        }
    }

    if let Some(choice) = step_data.get("choice").filter(|v| !v.is_null()) {
        let value = scalar_to_string(choice);
        let label = step_data
            .get("choice_label")
            .and_then(Value::as_str)
            .map_or_else(|| format!("Option {value}"), str::to_owned);
        return vec![VerifyMethod { value, label }];
    }

    Vec::new()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
