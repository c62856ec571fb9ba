//! Heuristic misclassification scoring.

pub mod detectors;
pub mod patterns;

use curator_model::{MisclassificationAnalysis, Reason, Severity};

pub use self::detectors::{DETECTORS, DetectorSpec, Finding, ItemContext};

/// `needsReview` fires strictly above this score.
pub const REVIEW_THRESHOLD: f64 = 0.6;
/// Flags are persisted strictly above this score (or whenever review is
/// needed). Lower than [`REVIEW_THRESHOLD`].
pub const PERSIST_THRESHOLD: f64 = 0.5;

/// Folds a fixed list of detectors into one normalized score.
#[derive(Debug, Clone)]
pub struct MisclassificationAnalyzer {
    detectors: Vec<DetectorSpec>,
}

impl Default for MisclassificationAnalyzer {
    fn default() -> Self {
        Self {
            detectors: DETECTORS.to_vec(),
        }
    }
}

impl MisclassificationAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom detector list, in suggestion-priority order.
    pub fn with_detectors(detectors: Vec<DetectorSpec>) -> Self {
        Self { detectors }
    }

    pub fn analyze(&self, ctx: &ItemContext<'_>) -> MisclassificationAnalysis {
        let mut total = 0.0;
        let mut max_score = 0.0;
        let mut reasons: Vec<Reason> = Vec::new();
        let mut suggested_type = None;

        for detector in &self.detectors {
            let Some(finding) = (detector.run)(ctx) else {
                continue;
            };
            total += finding.reason.weighted();
            max_score += detector.ceiling.weight();
            if suggested_type.is_none() {
                suggested_type = finding.suggested_type;
            }
            reasons.push(finding.reason);
        }

        let score = if max_score > 0.0 {
            (total / max_score).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let needs_review = score > REVIEW_THRESHOLD
            || reasons
                .iter()
                .any(|reason| reason.severity == Severity::High);

        MisclassificationAnalysis {
            item_id: ctx.item.id,
            current_type: ctx.item.item_type,
            suggested_type: suggested_type.filter(|suggested| *suggested != ctx.item.item_type),
            score,
            reasons,
            needs_review,
        }
    }
}

/// Whether an analysis result should be stored as a flag on the item.
pub fn should_flag(analysis: &MisclassificationAnalysis) -> bool {
    analysis.score > PERSIST_THRESHOLD || analysis.needs_review
}
