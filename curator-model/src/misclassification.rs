use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ids::ItemId;
use crate::item::ItemType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Fixed multiplier used when folding confidences into a score.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Low => 0.3,
            Severity::Medium => 0.6,
            Severity::High => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(ModelError::UnknownVariant {
                kind: "severity",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonType {
    NamingPattern,
    PathStructure,
    MetadataConsistency,
    DurationAnomaly,
    MissingSeasons,
}

impl ReasonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonType::NamingPattern => "naming_pattern",
            ReasonType::PathStructure => "path_structure",
            ReasonType::MetadataConsistency => "metadata_consistency",
            ReasonType::DurationAnomaly => "duration_anomaly",
            ReasonType::MissingSeasons => "missing_seasons",
        }
    }
}

impl Display for ReasonType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One heuristic finding. Recomputed wholesale on every analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reason {
    #[serde(rename = "type")]
    pub reason_type: ReasonType,
    pub description: String,
    pub severity: Severity,
    pub confidence: f64,
}

impl Reason {
    pub fn new(
        reason_type: ReasonType,
        description: impl Into<String>,
        severity: Severity,
        confidence: f64,
    ) -> Self {
        Self {
            reason_type,
            description: description.into(),
            severity,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn weighted(&self) -> f64 {
        self.confidence * self.severity.weight()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MisclassificationAnalysis {
    pub item_id: ItemId,
    pub current_type: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_type: Option<ItemType>,
    pub score: f64,
    pub reasons: Vec<Reason>,
    pub needs_review: bool,
}

impl MisclassificationAnalysis {
    pub fn max_severity(&self) -> Option<Severity> {
        self.reasons.iter().map(|reason| reason.severity).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_low_to_high() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
    }

    #[test]
    fn reason_serializes_with_snake_case_type() {
        let reason = Reason::new(
            ReasonType::NamingPattern,
            "episode marker in name",
            Severity::High,
            0.9,
        );
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["type"], "naming_pattern");
        assert_eq!(json["severity"], "high");
        assert!((reason.weighted() - 0.9).abs() < 1e-9);
    }
}
