//! Per-face inner / outer / through classification.
//!
//! Three interchangeable strategies sit behind [`FaceClassifier`]. The
//! default casts rays from just above each face; a cheaper
//! bounding-box heuristic and a hybrid of the two are kept for comparison.

use brepscan_kernel::{CadKernel, PointState, SurfaceKind};
use brepscan_math::{line_line_distance, perpendicular, Point3, Vec3};
use rayon::prelude::*;

use crate::bbox::BoundingVolume;
use crate::budget::Deadline;
use crate::config::{ClassifierStrategy, TopologySettings};
use crate::labels::{FaceLabel, Verdict};
use crate::model::ModelGraph;

/// Everything a classifier may look at.
pub struct ClassifyContext<'a> {
    /// Kernel to query.
    pub kernel: &'a dyn CadKernel,
    /// Arena of faces and edges.
    pub graph: &'a ModelGraph,
    /// Size reference.
    pub bounds: &'a BoundingVolume,
    /// Classifier settings.
    pub settings: &'a TopologySettings,
}

/// A face classification strategy.
pub trait FaceClassifier: Send + Sync {
    /// Strategy name for diagnostics.
    fn name(&self) -> &'static str;

    /// Classify the face at arena index `face`. Never fails: problems fall
    /// back to [`Verdict::fallback`].
    fn classify(&self, ctx: &ClassifyContext<'_>, face: usize) -> Verdict;
}

/// Construct the classifier for a configured strategy.
pub fn classifier_for(strategy: ClassifierStrategy) -> Box<dyn FaceClassifier> {
    match strategy {
        ClassifierStrategy::RayCast => Box::new(RayCastClassifier),
        ClassifierStrategy::CenterDistance => Box::new(CenterDistanceClassifier),
        ClassifierStrategy::Hybrid => Box::new(HybridClassifier),
    }
}

/// Classify every face in parallel. Faces not reached before the deadline
/// get the fallback verdict; the count of those is returned alongside.
pub(crate) fn classify_faces(
    ctx: &ClassifyContext<'_>,
    classifier: &dyn FaceClassifier,
    deadline: &Deadline,
) -> (Vec<Verdict>, usize) {
    let results: Vec<Option<Verdict>> = (0..ctx.graph.face_count())
        .into_par_iter()
        .map(|i| {
            if deadline.expired() {
                return None;
            }
            let mut verdict = classifier.classify(ctx, i);
            if ctx.settings.planar_exterior
                && ctx.graph.faces[i].kind == SurfaceKind::Plane
                && verdict.label == FaceLabel::Outer
            {
                verdict.label = FaceLabel::Planar;
            }
            Some(verdict)
        })
        .collect();

    let skipped = results.iter().filter(|v| v.is_none()).count();
    if skipped > 0 {
        tracing::warn!(skipped, "time budget exhausted during face classification");
    }
    let verdicts = results
        .into_iter()
        .map(|v| v.unwrap_or_else(Verdict::fallback))
        .collect();
    (verdicts, skipped)
}

// =============================================================================
// Ray casting
// =============================================================================

/// Membership tests on both sides of the face, then a fan of rays.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayCastClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RayOutcome {
    Escaped,
    HitOther,
    HitSelf,
}

impl FaceClassifier for RayCastClassifier {
    fn name(&self) -> &'static str {
        "ray_cast"
    }

    fn classify(&self, ctx: &ClassifyContext<'_>, face: usize) -> Verdict {
        let record = &ctx.graph.faces[face];
        let Some(sample) = record.sample else {
            tracing::warn!(face = %record.id, "no sample point, defaulting to outer");
            return Verdict::fallback();
        };
        let Some(mut n) = unit(&sample.normal) else {
            tracing::warn!(face = %record.id, "degenerate normal, defaulting to outer");
            return Verdict::fallback();
        };

        let eps = (ctx.settings.sample_offset_ratio * ctx.bounds.diagonal).max(1e-6);
        let tol = 0.1 * eps;
        let c = sample.point;
        let above = ctx.kernel.point_in_solid(&(c + eps * n), tol);
        let below = ctx.kernel.point_in_solid(&(c - eps * n), tol);
        match (above, below) {
            // Normal points into the material
            (Ok(PointState::In), Ok(PointState::Out)) => n = -n,
            (Ok(PointState::In), Ok(PointState::In)) => return Verdict::high(FaceLabel::Inner),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(face = %record.id, error = %e, "membership test failed");
            }
            _ => {}
        }

        let origin = c + eps * n;
        let mut outcomes = Vec::with_capacity(1 + ctx.settings.side_rays);
        for dir in ray_directions(&n, ctx.settings) {
            match cast(ctx, face, &origin, &dir) {
                Some(outcome) => outcomes.push(outcome),
                None => return Verdict::fallback(),
            }
        }

        if outcomes.contains(&RayOutcome::HitSelf) {
            return Verdict::high(FaceLabel::Through);
        }
        let escaped = outcomes
            .iter()
            .filter(|o| **o == RayOutcome::Escaped)
            .count();
        if escaped == outcomes.len() {
            Verdict::high(FaceLabel::Outer)
        } else if escaped > 0 {
            // Back wall of a cavity: some way out, some into material
            Verdict::low(FaceLabel::Inner)
        } else {
            Verdict::high(FaceLabel::Inner)
        }
    }
}

/// The normal itself, then a ring of rays tilted away from it.
fn ray_directions(n: &Vec3, settings: &TopologySettings) -> Vec<Vec3> {
    let tilt = settings.ray_tilt_deg.to_radians();
    let u = perpendicular(n);
    let v = n.cross(&u);
    let count = settings.side_rays;
    let mut dirs = vec![*n];
    for k in 0..count {
        let phi = std::f64::consts::TAU * k as f64 / count as f64;
        let side = u * phi.cos() + v * phi.sin();
        dirs.push(n * tilt.cos() + side * tilt.sin());
    }
    dirs
}

fn unit(v: &Vec3) -> Option<Vec3> {
    let len = v.norm();
    if !len.is_finite() || len < 1e-12 {
        return None;
    }
    Some(v / len)
}

/// Cast one ray; `None` if the kernel query failed.
fn cast(ctx: &ClassifyContext<'_>, face: usize, origin: &Point3, dir: &Vec3) -> Option<RayOutcome> {
    let hits = match ctx.kernel.ray_intersect(origin, dir, (0.0, f64::INFINITY)) {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!(face = %ctx.graph.faces[face].id, error = %e, "ray query failed");
            return None;
        }
    };
    let Some(first) = hits.first() else {
        return Some(RayOutcome::Escaped);
    };
    let diagonal = ctx.bounds.diagonal;
    let same = first.face == ctx.graph.faces[face].id
        || ctx
            .graph
            .index_of(first.face)
            .is_some_and(|other| same_cylinder(ctx.graph, face, other, diagonal));
    Some(if same {
        RayOutcome::HitSelf
    } else {
        RayOutcome::HitOther
    })
}

/// Two faces lying on one cylindrical surface (same axis line and radius).
pub(crate) fn same_cylinder(graph: &ModelGraph, a: usize, b: usize, scale: f64) -> bool {
    let (Some(ca), Some(cb)) = (graph.faces[a].cylinder, graph.faces[b].cylinder) else {
        return false;
    };
    let tol = 1e-6 * scale.max(1.0);
    ca.axis.dot(&*cb.axis).abs() > 1.0 - 1e-9
        && (ca.radius - cb.radius).abs() < tol
        && line_line_distance(&ca.origin, &ca.axis, &cb.origin, &cb.axis) < tol
}

// =============================================================================
// Bounding-box center heuristic
// =============================================================================

/// Faces whose normal points at the bounding-box center are inner.
/// Small cylinders are always inner. Verdicts are always low confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct CenterDistanceClassifier;

impl FaceClassifier for CenterDistanceClassifier {
    fn name(&self) -> &'static str {
        "center_distance"
    }

    fn classify(&self, ctx: &ClassifyContext<'_>, face: usize) -> Verdict {
        let record = &ctx.graph.faces[face];
        let Some(sample) = record.sample else {
            return Verdict::fallback();
        };
        let Some(n) = unit(&sample.normal) else {
            tracing::warn!(face = %record.id, "degenerate normal, defaulting to outer");
            return Verdict::fallback();
        };
        let at = record.centroid.unwrap_or(sample.point);
        let to_center = ctx.bounds.center() - at;
        let dot = n.dot(&to_center) / (to_center.norm() + 1e-9);

        let inner = match record.kind {
            SurfaceKind::Cylinder => {
                let small = record
                    .cylinder
                    .is_some_and(|c| c.radius < 0.4 * ctx.bounds.max_half_extent());
                small || dot > 0.0
            }
            SurfaceKind::Plane => dot > 0.5,
            _ => dot > 0.3,
        };
        Verdict::low(if inner {
            FaceLabel::Inner
        } else {
            FaceLabel::Outer
        })
    }
}

// =============================================================================
// Hybrid
// =============================================================================

/// Ray casting first; a low-confidence ray verdict the center heuristic
/// agrees with is promoted to high confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridClassifier;

impl FaceClassifier for HybridClassifier {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn classify(&self, ctx: &ClassifyContext<'_>, face: usize) -> Verdict {
        let ray = RayCastClassifier.classify(ctx, face);
        if ray.is_high() {
            return ray;
        }
        let center = CenterDistanceClassifier.classify(ctx, face);
        if center.label == ray.label {
            Verdict::high(ray.label)
        } else {
            ray
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BudgetSettings;
    use crate::labels::Confidence;
    use brepscan_kernel::FaceId;
    use brepscan_kernel_analytic::{AnalyticKernel, PartSpec, StockFace};

    fn run(part: PartSpec, strategy: ClassifierStrategy) -> (ModelGraph, Vec<Verdict>) {
        let kernel = AnalyticKernel::new(part).unwrap();
        let deadline = Deadline::unlimited();
        let (graph, _) =
            ModelGraph::extract(&kernel, &BudgetSettings::default(), &deadline).unwrap();
        let bounds = BoundingVolume::from_kernel(&kernel).unwrap();
        let settings = TopologySettings::default();
        let ctx = ClassifyContext {
            kernel: &kernel,
            graph: &graph,
            bounds: &bounds,
            settings: &settings,
        };
        let classifier = classifier_for(strategy);
        let (verdicts, skipped) = classify_faces(&ctx, classifier.as_ref(), &deadline);
        assert_eq!(skipped, 0);
        (graph, verdicts)
    }

    fn plate() -> PartSpec {
        PartSpec::block([100.0, 100.0, 20.0]).through_hole(StockFace::Top, [50.0, 50.0], 10.0)
    }

    #[test]
    fn test_plate_ray_cast() {
        let (graph, verdicts) = run(plate(), ClassifierStrategy::RayCast);
        for v in &verdicts[..6] {
            assert_eq!(v.label, FaceLabel::Planar);
            assert_eq!(v.confidence, Confidence::High);
        }
        let bore = graph.index_of(FaceId(6)).unwrap();
        assert_eq!(verdicts[bore], Verdict::high(FaceLabel::Through));
    }

    #[test]
    fn test_blind_floor_is_inner() {
        let part = PartSpec::block([60.0, 60.0, 20.0]).blind_hole(
            StockFace::Top,
            [30.0, 30.0],
            12.0,
            8.0,
        );
        let (_, verdicts) = run(part, ClassifierStrategy::RayCast);
        // Floor of the pocket: straight up escapes, the tilted rays hit the wall.
        assert_eq!(verdicts[7], Verdict::low(FaceLabel::Inner));
        // Wall wraps around onto itself
        assert_eq!(verdicts[6].label, FaceLabel::Through);
    }

    #[test]
    fn test_counterbore_shoulder_is_inner() {
        // The annular ledge sits off-axis; only some tilted rays reach the
        // counterbore wall before clearing the top face.
        let part = PartSpec::block([100.0, 100.0, 20.0]).counterbore(
            StockFace::Top,
            [50.0, 50.0],
            10.0,
            18.0,
            5.0,
        );
        let (graph, verdicts) = run(part, ClassifierStrategy::RayCast);
        let ledge = graph.index_of(FaceId(7)).unwrap();
        assert_eq!(graph.faces[ledge].kind, SurfaceKind::Plane);
        assert_eq!(verdicts[ledge], Verdict::low(FaceLabel::Inner));
    }

    #[test]
    fn test_ray_directions_ring() {
        let settings = TopologySettings::default();
        let n = Vec3::new(0.0, 0.6, 0.8);
        let dirs = ray_directions(&n, &settings);
        assert_eq!(dirs.len(), 1 + settings.side_rays);
        assert_eq!(dirs[0], n);
        let tilt = settings.ray_tilt_deg.to_radians();
        let mut sum = Vec3::zeros();
        for d in &dirs[1..] {
            assert!((d.norm() - 1.0).abs() < 1e-12);
            assert!((d.dot(&n) - tilt.cos()).abs() < 1e-12);
            sum += d - n * tilt.cos();
        }
        // Evenly spread: the sideways components cancel.
        assert!(sum.norm() < 1e-12);
    }

    #[test]
    fn test_center_distance_is_low_confidence() {
        let (_, verdicts) = run(plate(), ClassifierStrategy::CenterDistance);
        assert!(verdicts.iter().all(|v| !v.is_high()));
        // Small bore is inner; the top face points away from the center.
        assert_eq!(verdicts[6].label, FaceLabel::Inner);
        assert_eq!(verdicts[0].label, FaceLabel::Planar);
    }

    #[test]
    fn test_hybrid_promotes_agreement() {
        let part = PartSpec::block([60.0, 60.0, 20.0]).blind_hole(
            StockFace::Top,
            [30.0, 30.0],
            12.0,
            8.0,
        );
        let (_, verdicts) = run(part, ClassifierStrategy::Hybrid);
        // The floor sits above the box center, so the heuristic calls it
        // outer and the ray verdict stays low.
        assert_eq!(verdicts[7], Verdict::low(FaceLabel::Inner));
        assert_eq!(verdicts[6], Verdict::high(FaceLabel::Through));
    }

    #[test]
    fn test_flipped_normal_is_corrected() {
        // Simulate a kernel that reports a reversed normal for the top face.
        let kernel = AnalyticKernel::new(plate()).unwrap();
        let deadline = Deadline::unlimited();
        let (mut graph, _) =
            ModelGraph::extract(&kernel, &BudgetSettings::default(), &deadline).unwrap();
        if let Some(s) = graph.faces[0].sample.as_mut() {
            s.normal = -s.normal;
        }
        let bounds = BoundingVolume::from_kernel(&kernel).unwrap();
        let settings = TopologySettings::default();
        let ctx = ClassifyContext {
            kernel: &kernel,
            graph: &graph,
            bounds: &bounds,
            settings: &settings,
        };
        let v = RayCastClassifier.classify(&ctx, 0);
        assert_eq!(v, Verdict::high(FaceLabel::Outer));
    }

    #[test]
    fn test_degenerate_normal_falls_back() {
        let kernel = AnalyticKernel::new(plate()).unwrap();
        let deadline = Deadline::unlimited();
        let (mut graph, _) =
            ModelGraph::extract(&kernel, &BudgetSettings::default(), &deadline).unwrap();
        if let Some(s) = graph.faces[3].sample.as_mut() {
            s.normal = Vec3::zeros();
        }
        let bounds = BoundingVolume::from_kernel(&kernel).unwrap();
        let settings = TopologySettings::default();
        let ctx = ClassifyContext {
            kernel: &kernel,
            graph: &graph,
            bounds: &bounds,
            settings: &settings,
        };
        assert_eq!(RayCastClassifier.classify(&ctx, 3), Verdict::fallback());
    }
}
