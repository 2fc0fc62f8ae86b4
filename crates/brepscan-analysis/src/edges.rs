//! Dihedral feature-edge filter and polyline sampling.

use std::f64::consts::TAU;

use brepscan_kernel::{CadKernel, CurveKind, EdgeId, KernelError, KernelResult};
use brepscan_math::{angle_between, Point3, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::budget::Deadline;
use crate::config::EdgeSettings;
use crate::model::{EdgeRecord, ModelGraph};

/// Number of segments in the rough polyline for free-form curves.
const ROUGH_SEGMENTS: usize = 16;

/// A circle closes after one turn; longer ranges get no extra points.
const MAX_CIRCLE_TURNS: f64 = 1.0;

/// How an edge sits between its faces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeClass {
    /// Only one incident face.
    Boundary,
    /// Both sides belong to the same face.
    Seam,
    /// Dihedral angle above the threshold.
    Sharp {
        /// Angle between the face normals, in degrees.
        angle_deg: f64,
    },
    /// Tangent or near-tangent transition.
    Smooth {
        /// Angle between the face normals, in degrees.
        angle_deg: f64,
    },
    /// The angle could not be measured.
    Unknown,
}

impl EdgeClass {
    /// Classify from two face normals.
    pub fn from_normals(n1: &Vec3, n2: &Vec3, sharp_angle_deg: f64) -> Self {
        match angle_between(n1, n2) {
            Some(angle) => {
                let angle_deg = angle.to_degrees();
                if angle_deg > sharp_angle_deg {
                    EdgeClass::Sharp { angle_deg }
                } else {
                    EdgeClass::Smooth { angle_deg }
                }
            }
            None => EdgeClass::Unknown,
        }
    }

    /// Whether the edge belongs in the display wireframe.
    ///
    /// Unmeasurable edges are kept.
    pub fn is_significant(&self, curve: Option<CurveKind>, settings: &EdgeSettings) -> bool {
        match self {
            EdgeClass::Boundary | EdgeClass::Sharp { .. } | EdgeClass::Unknown => true,
            EdgeClass::Seam => false,
            EdgeClass::Smooth { .. } => {
                settings.keep_circular_edges && curve == Some(CurveKind::Circle)
            }
        }
    }

    /// True for tangent transitions (seams included).
    pub fn is_smooth(&self) -> bool {
        matches!(self, EdgeClass::Smooth { .. } | EdgeClass::Seam)
    }
}

/// Per-edge result of the dihedral pass.
#[derive(Debug, Clone, Copy)]
pub struct EdgeAnalysis {
    /// Classification.
    pub class: EdgeClass,
    /// Curve point at the mid parameter, if it could be evaluated.
    pub midpoint: Option<Point3>,
}

/// A significant edge resampled for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEdge {
    /// Kernel handle.
    pub edge: EdgeId,
    /// Curve type, if known.
    pub curve: Option<CurveKind>,
    /// Why the edge was kept.
    pub class: EdgeClass,
    /// Polyline in mm.
    pub points: Vec<[f64; 3]>,
}

/// Classify every edge in parallel, in arena order.
pub fn classify_edges(
    kernel: &dyn CadKernel,
    graph: &ModelGraph,
    settings: &EdgeSettings,
) -> Vec<EdgeAnalysis> {
    graph
        .edges
        .par_iter()
        .map(|edge| analyze_edge(kernel, graph, edge, settings))
        .collect()
}

fn analyze_edge(
    kernel: &dyn CadKernel,
    graph: &ModelGraph,
    edge: &EdgeRecord,
    settings: &EdgeSettings,
) -> EdgeAnalysis {
    let midpoint = edge.range.and_then(|(t0, t1)| {
        match kernel.curve_point(edge.id, 0.5 * (t0 + t1)) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(edge = %edge.id, error = %e, "curve evaluation failed");
                None
            }
        }
    });

    let class = if edge.is_boundary() {
        EdgeClass::Boundary
    } else if edge.is_seam() {
        EdgeClass::Seam
    } else {
        match midpoint {
            Some(p) => dihedral(kernel, graph, edge, &p, settings.sharp_angle_deg),
            None => EdgeClass::Unknown,
        }
    };
    EdgeAnalysis { class, midpoint }
}

fn dihedral(
    kernel: &dyn CadKernel,
    graph: &ModelGraph,
    edge: &EdgeRecord,
    p: &Point3,
    sharp_angle_deg: f64,
) -> EdgeClass {
    let normal_at = |face: usize| -> KernelResult<Vec3> {
        let id = graph.faces[face].id;
        let uv = kernel.project_point(id, p)?;
        kernel.surface_normal(id, uv)
    };
    let &[a, b] = edge.faces.as_slice() else {
        return EdgeClass::Unknown;
    };
    match (normal_at(a), normal_at(b)) {
        (Ok(n1), Ok(n2)) => EdgeClass::from_normals(&n1, &n2, sharp_angle_deg),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(edge = %edge.id, error = %e, "dihedral angle unavailable, keeping edge");
            EdgeClass::Unknown
        }
    }
}

/// Number of polyline points for an edge.
fn sample_count(
    kernel: &dyn CadKernel,
    edge: &EdgeRecord,
    (t0, t1): (f64, f64),
    settings: &EdgeSettings,
    diagonal: f64,
) -> KernelResult<usize> {
    match edge.curve {
        Some(CurveKind::Line) => Ok(2),
        Some(CurveKind::Circle) => {
            let turns = ((t1 - t0).abs() / TAU).min(MAX_CIRCLE_TURNS);
            let segments = (turns * settings.circle_segments_per_turn as f64).ceil() as usize;
            Ok(segments.max(settings.min_circle_points).saturating_add(1))
        }
        _ => {
            let at = |i| lerp(t0, t1, i, ROUGH_SEGMENTS);
            let rough = (0..=ROUGH_SEGMENTS)
                .map(|i| kernel.curve_point(edge.id, at(i)))
                .collect::<KernelResult<Vec<_>>>()?;
            let segments: Vec<Vec3> = rough.windows(2).map(|w| w[1] - w[0]).collect();
            let length: f64 = segments.iter().map(|d| d.norm()).sum();
            let turning: f64 = segments
                .windows(2)
                .filter_map(|w| angle_between(&w[0], &w[1]))
                .map(f64::to_degrees)
                .sum();
            let chord = settings.spline_chord_ratio * diagonal;
            let by_length = if chord > 0.0 { length / chord } else { 0.0 };
            let by_turning = if settings.spline_max_turn_deg > 0.0 {
                turning / settings.spline_max_turn_deg
            } else {
                0.0
            };
            let n = by_length.max(by_turning).ceil() as usize + 1;
            let (lo, hi) = (settings.spline_min_points, settings.spline_max_points);
            Ok(n.clamp(lo, hi))
        }
    }
}

fn lerp(t0: f64, t1: f64, i: usize, n: usize) -> f64 {
    t0 + (t1 - t0) * i as f64 / n as f64
}

/// Resample one edge into a polyline.
pub fn sample_edge(
    kernel: &dyn CadKernel,
    edge: &EdgeRecord,
    settings: &EdgeSettings,
    diagonal: f64,
) -> KernelResult<Vec<[f64; 3]>> {
    let range = edge
        .range
        .ok_or_else(|| KernelError::Query(format!("edge {} has no parameter range", edge.id)))?;
    if !(range.0.is_finite() && range.1.is_finite()) {
        return Err(KernelError::Query(format!(
            "edge {} has a non-finite parameter range",
            edge.id
        )));
    }
    let n = sample_count(kernel, edge, range, settings, diagonal)?;
    (0..n)
        .map(|i| {
            kernel
                .curve_point(edge.id, lerp(range.0, range.1, i, n - 1))
                .map(|p| [p.x, p.y, p.z])
        })
        .collect()
}

/// Polylines for every significant edge.
#[derive(Debug, Clone, Default)]
pub struct EdgeExtraction {
    /// Kept edges, in arena order.
    pub edges: Vec<FeatureEdge>,
    /// Significant edges in total, sampled or not.
    pub significant: usize,
    /// Significant edges whose sampling failed.
    pub failed: usize,
    /// Stopped early on the time budget.
    pub truncated: bool,
}

/// Resample the significant edges.
pub(crate) fn extract_feature_edges(
    kernel: &dyn CadKernel,
    graph: &ModelGraph,
    analysis: &[EdgeAnalysis],
    settings: &EdgeSettings,
    diagonal: f64,
    deadline: &Deadline,
) -> EdgeExtraction {
    let mut out = EdgeExtraction::default();
    for (edge, info) in graph.edges.iter().zip(analysis) {
        if !info.class.is_significant(edge.curve, settings) {
            continue;
        }
        out.significant += 1;
        if out.truncated {
            continue;
        }
        if deadline.expired() {
            tracing::warn!(
                kept = out.edges.len(),
                "time budget exhausted during edge sampling"
            );
            out.truncated = true;
            continue;
        }
        match sample_edge(kernel, edge, settings, diagonal) {
            Ok(points) if points.len() >= 2 => out.edges.push(FeatureEdge {
                edge: edge.id,
                curve: edge.curve,
                class: info.class,
                points,
            }),
            Ok(_) => out.failed += 1,
            Err(e) => {
                tracing::warn!(edge = %edge.id, error = %e, "edge sampling failed");
                out.failed += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BudgetSettings;
    use brepscan_kernel_analytic::{AnalyticKernel, PartSpec, StockFace};

    fn plate() -> (AnalyticKernel, ModelGraph) {
        let part = PartSpec::block([100.0, 100.0, 20.0]).through_hole(
            StockFace::Top,
            [50.0, 50.0],
            10.0,
        );
        let kernel = AnalyticKernel::new(part).unwrap();
        let budget = BudgetSettings::default();
        let (graph, _) = ModelGraph::extract(&kernel, &budget, &Deadline::unlimited()).unwrap();
        (kernel, graph)
    }

    #[test]
    fn test_right_angle_is_sharp() {
        let c = EdgeClass::from_normals(&Vec3::z(), &Vec3::x(), 20.0);
        match c {
            EdgeClass::Sharp { angle_deg } => assert!((angle_deg - 90.0).abs() < 1e-9),
            other => panic!("expected sharp, got {other:?}"),
        }
        let settings = EdgeSettings::default();
        assert!(c.is_significant(Some(CurveKind::Line), &settings));
    }

    #[test]
    fn test_tangent_edge_is_dropped() {
        let tilt = 4.0f64.to_radians();
        let n2 = Vec3::new(tilt.sin(), 0.0, tilt.cos());
        let c = EdgeClass::from_normals(&Vec3::z(), &n2, 20.0);
        assert!(matches!(c, EdgeClass::Smooth { .. }));
        let settings = EdgeSettings::default();
        assert!(!c.is_significant(Some(CurveKind::Circle), &settings));
        let keep = EdgeSettings {
            keep_circular_edges: true,
            ..settings
        };
        assert!(c.is_significant(Some(CurveKind::Circle), &keep));
        assert!(!c.is_significant(Some(CurveKind::Line), &keep));
    }

    #[test]
    fn test_unknown_and_boundary_are_kept() {
        let settings = EdgeSettings::default();
        assert_eq!(
            EdgeClass::from_normals(&Vec3::zeros(), &Vec3::x(), 20.0),
            EdgeClass::Unknown
        );
        assert!(EdgeClass::Unknown.is_significant(None, &settings));
        assert!(EdgeClass::Boundary.is_significant(None, &settings));
        let seam = EdgeClass::Seam.is_significant(Some(CurveKind::Line), &settings);
        assert!(!seam);
    }

    #[test]
    fn test_plate_edges() {
        let (kernel, graph) = plate();
        let settings = EdgeSettings::default();
        let info = classify_edges(&kernel, &graph, &settings);
        assert_eq!(info.len(), 15);
        // Stock corners and both rims are right angles
        for e in &info[..14] {
            assert!(matches!(e.class, EdgeClass::Sharp { .. }), "{:?}", e.class);
        }
        assert_eq!(info[14].class, EdgeClass::Seam);
        let rim = info[12].midpoint.unwrap();
        assert!((rim.z - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_sampling_density() {
        let (kernel, graph) = plate();
        let settings = EdgeSettings::default();
        let line = sample_edge(&kernel, &graph.edges[0], &settings, 142.0).unwrap();
        assert_eq!(line.len(), 2);
        let circle = sample_edge(&kernel, &graph.edges[12], &settings, 142.0).unwrap();
        assert_eq!(circle.len(), 33);
        // Closed circle: first and last points coincide
        let (a, b) = (circle[0], circle[32]);
        assert!((a[0] - b[0]).abs() < 1e-9 && (a[1] - b[1]).abs() < 1e-9);
        for p in &circle {
            assert!(((p[0] - 50.0).hypot(p[1] - 50.0) - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_oversized_circle_range_is_bounded() {
        let (kernel, graph) = plate();
        let settings = EdgeSettings::default();
        let mut rim = graph.edges[12].clone();
        rim.range = Some((0.0, 1e300));
        let n = sample_count(&kernel, &rim, (0.0, 1e300), &settings, 142.0).unwrap();
        assert_eq!(n, 33);

        rim.range = Some((0.0, f64::INFINITY));
        assert!(sample_edge(&kernel, &rim, &settings, 142.0).is_err());
    }

    #[test]
    fn test_extraction_drops_seam() {
        let (kernel, graph) = plate();
        let settings = EdgeSettings::default();
        let info = classify_edges(&kernel, &graph, &settings);
        let deadline = Deadline::unlimited();
        let out = extract_feature_edges(&kernel, &graph, &info, &settings, 142.0, &deadline);
        assert_eq!(out.significant, 14);
        assert_eq!(out.edges.len(), 14);
        assert_eq!(out.failed, 0);
        assert!(!out.truncated);
        assert!(out.edges.iter().all(|e| e.edge != EdgeId(14)));
    }

    #[test]
    fn test_expired_deadline_truncates() {
        let (kernel, graph) = plate();
        let settings = EdgeSettings::default();
        let info = classify_edges(&kernel, &graph, &settings);
        let deadline = Deadline::new(Some(0));
        let out = extract_feature_edges(&kernel, &graph, &info, &settings, 142.0, &deadline);
        assert!(out.truncated);
        assert!(out.edges.is_empty());
        assert_eq!(out.significant, 14);
    }
}
