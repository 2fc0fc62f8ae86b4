//! Face labels and classifier verdicts.

use serde::{Deserialize, Serialize};

/// Topological role of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceLabel {
    /// Exterior skin of the part.
    Outer,
    /// Wall of a cavity or pocket.
    Inner,
    /// Wall of a penetrating bore.
    Through,
    /// Flat exterior face.
    Planar,
}

impl FaceLabel {
    /// Every label, in propagation priority order (highest first).
    pub const BY_PRIORITY: [FaceLabel; 4] = [
        FaceLabel::Inner,
        FaceLabel::Through,
        FaceLabel::Outer,
        FaceLabel::Planar,
    ];

    /// Propagation priority: inner > through > outer > planar.
    pub fn priority(self) -> u8 {
        match self {
            FaceLabel::Inner => 3,
            FaceLabel::Through => 2,
            FaceLabel::Outer => 1,
            FaceLabel::Planar => 0,
        }
    }

    /// `outer` or `planar`.
    pub fn is_exterior(self) -> bool {
        matches!(self, FaceLabel::Outer | FaceLabel::Planar)
    }

    /// Lower-case name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            FaceLabel::Outer => "outer",
            FaceLabel::Inner => "inner",
            FaceLabel::Through => "through",
            FaceLabel::Planar => "planar",
        }
    }

    /// Dense index, stable across releases: outer 0, inner 1, through 2,
    /// planar 3.
    pub fn index(self) -> usize {
        match self {
            FaceLabel::Outer => 0,
            FaceLabel::Inner => 1,
            FaceLabel::Through => 2,
            FaceLabel::Planar => 3,
        }
    }
}

/// How much a verdict should be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Heuristic or ambiguous evidence.
    Low,
    /// Unambiguous evidence. Anchors propagation.
    High,
}

/// Output of a face classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Assigned label.
    pub label: FaceLabel,
    /// Trust in the label.
    pub confidence: Confidence,
}

impl Verdict {
    /// A high-confidence verdict.
    pub fn high(label: FaceLabel) -> Self {
        Self {
            label,
            confidence: Confidence::High,
        }
    }

    /// A low-confidence verdict.
    pub fn low(label: FaceLabel) -> Self {
        Self {
            label,
            confidence: Confidence::Low,
        }
    }

    /// The fallback for faces that could not be classified.
    pub fn fallback() -> Self {
        Self::low(FaceLabel::Outer)
    }

    /// True for high-confidence verdicts.
    pub fn is_high(&self) -> bool {
        self.confidence == Confidence::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let p: Vec<u8> = FaceLabel::BY_PRIORITY
            .iter()
            .map(|l| l.priority())
            .collect();
        assert_eq!(p, vec![3, 2, 1, 0]);
        assert!(FaceLabel::Inner.priority() > FaceLabel::Through.priority());
    }

    #[test]
    fn test_exterior() {
        assert!(FaceLabel::Outer.is_exterior());
        assert!(FaceLabel::Planar.is_exterior());
        assert!(!FaceLabel::Inner.is_exterior());
        assert!(!FaceLabel::Through.is_exterior());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FaceLabel::Through).unwrap();
        assert_eq!(json, "\"through\"");
        for label in FaceLabel::BY_PRIORITY {
            assert_eq!(
                serde_json::to_string(&label).unwrap(),
                format!("\"{}\"", label.as_str())
            );
        }
    }

    #[test]
    fn test_fallback_is_low_outer() {
        let v = Verdict::fallback();
        assert_eq!(v.label, FaceLabel::Outer);
        assert!(!v.is_high());
    }
}
