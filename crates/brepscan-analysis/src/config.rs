//! Analysis configuration.
//!
//! Every section carries `#[serde(default)]`, so a TOML file only needs the
//! keys it changes:
//!
//! ```toml
//! [features]
//! small_hole_ratio = 0.12
//!
//! [edges]
//! sharp_angle_deg = 30.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Cylindrical feature recognition.
    pub features: FeatureSettings,
    /// Per-face topology classification.
    pub topology: TopologySettings,
    /// Label propagation.
    pub propagation: PropagationSettings,
    /// Feature-edge filtering and sampling.
    pub edges: EdgeSettings,
    /// Display mesh assembly.
    pub mesh: MeshSettings,
    /// Enumeration and time limits.
    pub budget: BudgetSettings,
}

/// Thresholds for cylindrical feature recognition.
///
/// Ratios are relative to the bounding-box diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    /// Internal groups below this diameter ratio are holes.
    pub small_hole_ratio: f64,
    /// Internal groups below this diameter ratio (and not holes) are bores.
    pub bore_ratio: f64,
    /// External groups below this diameter ratio are bosses.
    pub boss_ratio: f64,
    /// A group whose max radius exceeds min radius by this factor is a groove.
    pub groove_radius_factor: f64,
    /// Axes are parallel when `|dot| > 1 - coaxial_angle_eps`.
    pub coaxial_angle_eps: f64,
    /// Axis-line distance tolerance in mm.
    pub coaxial_distance_tol: f64,
    /// Axis-line distance tolerance as a fraction of the larger radius.
    pub coaxial_radius_fraction: f64,
    /// Tangent-bounded groups below this radius ratio are fillets.
    pub fillet_max_ratio: f64,
    /// Faces smaller than this (mm²) are treated as degenerate.
    pub min_face_area: f64,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            small_hole_ratio: 0.15,
            bore_ratio: 0.5,
            boss_ratio: 0.3,
            groove_radius_factor: 1.05,
            coaxial_angle_eps: 0.1,
            coaxial_distance_tol: 0.5,
            coaxial_radius_fraction: 0.05,
            fillet_max_ratio: 0.05,
            min_face_area: 1e-9,
        }
    }
}

/// Which face classifier to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierStrategy {
    /// Membership tests plus ray casting.
    #[default]
    RayCast,
    /// Bounding-box center heuristic.
    CenterDistance,
    /// Ray casting, corroborated by the center heuristic.
    Hybrid,
}

/// Per-face topology classification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologySettings {
    /// Classifier implementation.
    pub strategy: ClassifierStrategy,
    /// Sample offset as a fraction of the bounding-box diagonal.
    pub sample_offset_ratio: f64,
    /// Tilt of the side rays away from the normal, in degrees.
    pub ray_tilt_deg: f64,
    /// Side rays, spread evenly around the normal.
    pub side_rays: usize,
    /// Label exterior planar faces `planar` instead of `outer`.
    pub planar_exterior: bool,
}

impl Default for TopologySettings {
    fn default() -> Self {
        Self {
            strategy: ClassifierStrategy::RayCast,
            sample_offset_ratio: 0.001,
            ray_tilt_deg: 45.0,
            side_rays: 4,
            planar_exterior: true,
        }
    }
}

/// Label propagation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationSettings {
    /// Upper bound on relaxation rounds.
    pub max_iterations: usize,
}

impl Default for PropagationSettings {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

/// Feature-edge filter and polyline sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeSettings {
    /// Dihedral angle above which an edge is sharp, in degrees.
    pub sharp_angle_deg: f64,
    /// Keep smooth circular edges as well.
    pub keep_circular_edges: bool,
    /// Polyline segments per full circle.
    pub circle_segments_per_turn: usize,
    /// Minimum segments for any circular arc.
    pub min_circle_points: usize,
    /// Minimum points for free-form curves.
    pub spline_min_points: usize,
    /// Maximum points for free-form curves.
    pub spline_max_points: usize,
    /// Target chord length as a fraction of the diagonal.
    pub spline_chord_ratio: f64,
    /// Maximum turning per segment for free-form curves, in degrees.
    pub spline_max_turn_deg: f64,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            sharp_angle_deg: 20.0,
            keep_circular_edges: false,
            circle_segments_per_turn: 32,
            min_circle_points: 8,
            spline_min_points: 12,
            spline_max_points: 128,
            spline_chord_ratio: 0.01,
            spline_max_turn_deg: 10.0,
        }
    }
}

/// Mesh quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshQuality {
    /// Coarse preview, 0.5 % of the diagonal.
    Fast,
    /// Default, 0.1 % of the diagonal.
    #[default]
    Balanced,
    /// Fine, 0.02 % of the diagonal.
    Ultra,
}

impl MeshQuality {
    /// Linear deflection as a fraction of the bounding-box diagonal.
    pub fn deflection_ratio(self) -> f64 {
        match self {
            MeshQuality::Fast => 0.005,
            MeshQuality::Balanced => 0.001,
            MeshQuality::Ultra => 0.0002,
        }
    }
}

/// Display mesh settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// Quality preset.
    pub quality: MeshQuality,
    /// Absolute linear deflection in mm, overriding the preset.
    pub linear_deflection: Option<f64>,
    /// Angular deflection in radians.
    pub angular_deflection: f64,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            quality: MeshQuality::Balanced,
            linear_deflection: None,
            angular_deflection: 0.2,
        }
    }
}

/// Limits on enumeration work. `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSettings {
    /// Maximum faces to analyze.
    pub max_faces: Option<usize>,
    /// Maximum edges to analyze.
    pub max_edges: Option<usize>,
    /// Maximum features to report.
    pub max_features: Option<usize>,
    /// Wall-clock budget in milliseconds.
    pub time_budget_ms: Option<u64>,
}

impl AnalysisConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(s: &str) -> AnalysisResult<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| AnalysisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> AnalysisResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AnalysisError::Config(e.to_string()))
    }

    /// Reject non-finite or inconsistent settings.
    pub fn validate(&self) -> AnalysisResult<()> {
        let f = &self.features;
        let positive = [
            ("features.small_hole_ratio", f.small_hole_ratio),
            ("features.bore_ratio", f.bore_ratio),
            ("features.boss_ratio", f.boss_ratio),
            ("features.coaxial_angle_eps", f.coaxial_angle_eps),
            ("features.coaxial_distance_tol", f.coaxial_distance_tol),
            ("topology.sample_offset_ratio", self.topology.sample_offset_ratio),
            ("edges.sharp_angle_deg", self.edges.sharp_angle_deg),
            ("edges.spline_chord_ratio", self.edges.spline_chord_ratio),
            ("edges.spline_max_turn_deg", self.edges.spline_max_turn_deg),
            ("mesh.angular_deflection", self.mesh.angular_deflection),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AnalysisError::Config(format!("{name} must be positive")));
            }
        }
        let non_negative = [
            ("features.coaxial_radius_fraction", f.coaxial_radius_fraction),
            ("features.fillet_max_ratio", f.fillet_max_ratio),
            ("features.min_face_area", f.min_face_area),
            ("topology.ray_tilt_deg", self.topology.ray_tilt_deg),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                let msg = format!("{name} must not be negative");
                return Err(AnalysisError::Config(msg));
            }
        }
        if f.small_hole_ratio >= f.bore_ratio {
            return Err(AnalysisError::Config(
                "features.small_hole_ratio must be below features.bore_ratio".into(),
            ));
        }
        if !(f.groove_radius_factor.is_finite() && f.groove_radius_factor >= 1.0) {
            return Err(AnalysisError::Config(
                "features.groove_radius_factor must be at least 1".into(),
            ));
        }
        if self.topology.ray_tilt_deg >= 90.0 {
            return Err(AnalysisError::Config(
                "topology.ray_tilt_deg must be below 90".into(),
            ));
        }
        if self.topology.side_rays == 0 {
            return Err(AnalysisError::Config(
                "topology.side_rays must be at least 1".into(),
            ));
        }
        if self.propagation.max_iterations == 0 {
            return Err(AnalysisError::Config(
                "propagation.max_iterations must be at least 1".into(),
            ));
        }
        let e = &self.edges;
        if e.circle_segments_per_turn == 0 || e.min_circle_points == 0 {
            return Err(AnalysisError::Config(
                "edges circle sampling counts must be positive".into(),
            ));
        }
        if e.spline_min_points < 2 || e.spline_min_points > e.spline_max_points {
            return Err(AnalysisError::Config(
                "edges.spline_min_points must be in 2..=spline_max_points".into(),
            ));
        }
        if let Some(d) = self.mesh.linear_deflection {
            if !(d.is_finite() && d > 0.0) {
                return Err(AnalysisError::Config(
                    "mesh.linear_deflection must be positive".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.propagation.max_iterations, 10);
        assert!((config.features.small_hole_ratio - 0.15).abs() < 1e-12);
        assert_eq!(config.topology.strategy, ClassifierStrategy::RayCast);
    }

    #[test]
    fn test_partial_toml() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [features]
            small_hole_ratio = 0.1

            [topology]
            strategy = "hybrid"

            [mesh]
            quality = "ultra"
            "#,
        )
        .unwrap();
        assert!((config.features.small_hole_ratio - 0.1).abs() < 1e-12);
        // Untouched keys keep their defaults
        assert!((config.features.bore_ratio - 0.5).abs() < 1e-12);
        assert_eq!(config.topology.strategy, ClassifierStrategy::Hybrid);
        assert_eq!(config.mesh.quality, MeshQuality::Ultra);
        assert_eq!(config.edges, EdgeSettings::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let err = AnalysisConfig::from_toml_str(
            r#"
            [features]
            small_hole_ratio = 0.6
            "#,
        );
        assert!(matches!(err, Err(AnalysisError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let mut config = AnalysisConfig::default();
        config.propagation.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        let err = AnalysisConfig::from_toml_str(
            r#"
            [topology]
            strategy = "magic"
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AnalysisConfig::default();
        config.budget.max_edges = Some(100);
        config.mesh.linear_deflection = Some(0.05);
        let text = config.to_toml_string().unwrap();
        let back = AnalysisConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_quality_presets_ordered() {
        let fast = MeshQuality::Fast.deflection_ratio();
        let balanced = MeshQuality::Balanced.deflection_ratio();
        let ultra = MeshQuality::Ultra.deflection_ratio();
        assert!(fast > balanced);
        assert!(balanced > ultra);
    }
}
