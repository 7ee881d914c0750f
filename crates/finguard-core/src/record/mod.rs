//! Audit record model and append-time validation.
//!
//! An [`AuditRecord`] is one immutable entry in a subject's hash chain. The
//! ledger assigns `id`, `sequence_number`, `timestamp`, `content_hash`, and
//! `previous_hash` on append; everything else arrives from the caller in an
//! [`AppendRequest`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by append-time validation, before any write happens.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValidationError {
    /// `subject_id` was empty.
    #[error("subject_id must not be empty")]
    EmptySubjectId,

    /// `action_type` was empty.
    #[error("action_type must not be empty")]
    EmptyActionType,

    /// `confidence` was outside the closed interval [0, 1].
    #[error("confidence {value} is outside [0, 1]")]
    ConfidenceOutOfRange {
        /// The rejected confidence value.
        value: f64,
    },
}

/// Origin of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredBy {
    /// An automated decision source (rebalancer / AI agent).
    AiAgent,
    /// A direct user action.
    User,
    /// An internal system action.
    System,
    /// A scheduled job.
    Scheduled,
}

impl TriggeredBy {
    /// Stable wire identifier, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AiAgent => "ai_agent",
            Self::User => "user",
            Self::System => "system",
            Self::Scheduled => "scheduled",
        }
    }
}

impl std::fmt::Display for TriggeredBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trigger-origin string that matches none of the known variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown trigger origin: {0}")]
pub struct UnknownTrigger(pub String);

impl std::str::FromStr for TriggeredBy {
    type Err = UnknownTrigger;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai_agent" => Ok(Self::AiAgent),
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(UnknownTrigger(other.to_string())),
        }
    }
}

/// One immutable, hash-committed entry in a subject's audit chain.
///
/// Records are created exactly once, by
/// [`AuditLedger::append`](crate::ledger::AuditLedger::append). There are no
/// update or delete operations; corrections are new records that reference
/// the old one through `extra_context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Globally unique identifier, assigned at creation. Never reused.
    pub id: String,

    /// The user/account this record belongs to. Chains are independent per
    /// subject.
    pub subject_id: String,

    /// Strictly increasing position in the subject's chain, starting at 1.
    pub sequence_number: u64,

    /// Creation time (UTC, microsecond precision).
    pub timestamp: DateTime<Utc>,

    /// Categorical tag: "rebalance", "trade", "alert", "config_change", ...
    pub action_type: String,

    /// Free-text summary of the action.
    pub description: String,

    /// Asset symbols touched by this action, order preserved as given.
    pub affected_assets: Vec<String>,

    /// Origin of the action.
    pub triggered_by: TriggeredBy,

    /// Decision confidence in [0, 1], for automated origins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Free-text explanation of the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Open-ended metadata. Not part of the hashed field set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_context: Option<Map<String, Value>>,

    /// Lowercase hex SHA-256 over the canonical encoding of this record's
    /// own fields plus `previous_hash`.
    pub content_hash: String,

    /// `content_hash` of the preceding record in the same chain, or the
    /// genesis sentinel for the first record.
    pub previous_hash: String,
}

/// Caller-supplied fields of an append operation.
#[derive(Debug, Clone)]
pub struct AppendRequest {
    /// The subject whose chain receives the record.
    pub subject_id: String,

    /// Categorical action tag. Must not be empty.
    pub action_type: String,

    /// Free-text summary.
    pub description: String,

    /// Asset symbols touched, order preserved.
    pub affected_assets: Vec<String>,

    /// Origin of the action.
    pub triggered_by: TriggeredBy,

    /// Decision confidence in [0, 1].
    pub confidence: Option<f64>,

    /// Free-text explanation.
    pub reasoning: Option<String>,

    /// Open-ended metadata.
    pub extra_context: Option<Map<String, Value>>,
}

impl AppendRequest {
    /// Creates a request with the required fields; optional fields start
    /// empty and are filled with the `with_*` builders.
    #[must_use]
    pub fn new(
        subject_id: impl Into<String>,
        action_type: impl Into<String>,
        description: impl Into<String>,
        triggered_by: TriggeredBy,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            action_type: action_type.into(),
            description: description.into(),
            affected_assets: Vec::new(),
            triggered_by,
            confidence: None,
            reasoning: None,
            extra_context: None,
        }
    }

    /// Sets the affected asset symbols (builder pattern).
    #[must_use]
    pub fn with_assets(mut self, assets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.affected_assets = assets.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the confidence score (builder pattern).
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Sets the reasoning text (builder pattern).
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Sets the extra metadata mapping (builder pattern).
    #[must_use]
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.extra_context = Some(context);
        self
    }

    /// Validates the request against the append constraints.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `subject_id` or `action_type` is
    /// empty, or if `confidence` is present and outside [0, 1]. NaN is
    /// rejected as out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subject_id.is_empty() {
            return Err(ValidationError::EmptySubjectId);
        }
        if self.action_type.is_empty() {
            return Err(ValidationError::EmptyActionType);
        }
        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(ValidationError::ConfidenceOutOfRange { value: confidence });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn request() -> AppendRequest {
        AppendRequest::new("user-1", "rebalance", "quarterly drift", TriggeredBy::AiAgent)
    }

    #[test]
    fn test_validate_accepts_minimal_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_subject() {
        let mut req = request();
        req.subject_id.clear();
        assert_eq!(req.validate(), Err(ValidationError::EmptySubjectId));
    }

    #[test]
    fn test_validate_rejects_empty_action_type() {
        let mut req = request();
        req.action_type.clear();
        assert_eq!(req.validate(), Err(ValidationError::EmptyActionType));
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let req = request().with_confidence(1.2);
        assert!(matches!(
            req.validate(),
            Err(ValidationError::ConfidenceOutOfRange { .. })
        ));

        let req = request().with_confidence(-0.1);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nan_confidence() {
        let req = request().with_confidence(f64::NAN);
        assert!(matches!(
            req.validate(),
            Err(ValidationError::ConfidenceOutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_boundary_confidence() {
        assert!(request().with_confidence(0.0).validate().is_ok());
        assert!(request().with_confidence(1.0).validate().is_ok());
    }

    #[test]
    fn test_triggered_by_wire_form() {
        assert_eq!(TriggeredBy::AiAgent.as_str(), "ai_agent");
        let json = serde_json::to_string(&TriggeredBy::Scheduled).unwrap();
        assert_eq!(json, "\"scheduled\"");
    }

    #[test]
    fn test_builder_preserves_asset_order() {
        let req = request().with_assets(["BTC", "ETH", "BTC"]);
        assert_eq!(req.affected_assets, vec!["BTC", "ETH", "BTC"]);
    }
}
