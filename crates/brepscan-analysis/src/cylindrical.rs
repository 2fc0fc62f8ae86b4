//! Coaxial cylinder grouping and hole / bore / boss / groove recognition.

use std::f64::consts::TAU;

use brepscan_kernel::{CylinderParams, SurfaceKind};
use brepscan_math::{line_line_distance, point_line_distance, Point3, Vec3};

use crate::bbox::BoundingVolume;
use crate::config::FeatureSettings;
use crate::edges::{EdgeAnalysis, EdgeClass};
use crate::features::{
    point_array, to_array, BossFeature, BoreFeature, FilletFeature, GrooveFeature, HoleFeature,
    ManufacturingFeature, Orientation,
};
use crate::labels::{FaceLabel, Verdict};
use crate::model::{FaceRecord, ModelGraph};

/// Coaxial cylindrical faces.
#[derive(Debug, Clone)]
pub struct CylinderGroup {
    /// Member face indices, ascending.
    pub members: Vec<usize>,
    /// Parameters of the first member.
    pub axis: CylinderParams,
    /// Smallest member radius.
    pub min_radius: f64,
    /// Largest member radius.
    pub max_radius: f64,
}

impl CylinderGroup {
    /// Mean member diameter.
    pub fn avg_diameter(&self, graph: &ModelGraph) -> f64 {
        let sum: f64 = self
            .members
            .iter()
            .filter_map(|&i| graph.faces[i].cylinder)
            .map(|c| 2.0 * c.radius)
            .sum();
        sum / self.members.len().max(1) as f64
    }
}

/// Result of the cylindrical pass.
#[derive(Debug, Clone, Default)]
pub struct CylindricalOutcome {
    /// Recognized features, in group order.
    pub features: Vec<ManufacturingFeature>,
    /// Label lock per face index.
    pub locks: Vec<Option<FaceLabel>>,
    /// Groups found, including main-body and unclassified ones.
    pub groups: usize,
    /// Cylindrical faces skipped as degenerate.
    pub skipped_faces: usize,
}

/// Everything the recognizer reads.
pub struct CylinderInput<'a> {
    /// Face and edge arena.
    pub graph: &'a ModelGraph,
    /// Per-face topology verdicts.
    pub verdicts: &'a [Verdict],
    /// Per-edge dihedral results.
    pub edges: &'a [EdgeAnalysis],
    /// Size reference.
    pub bounds: &'a BoundingVolume,
    /// Thresholds.
    pub settings: &'a FeatureSettings,
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn coaxial(a: &CylinderParams, b: &CylinderParams, settings: &FeatureSettings) -> bool {
    if a.axis.dot(&*b.axis).abs() <= 1.0 - settings.coaxial_angle_eps {
        return false;
    }
    let tol = settings
        .coaxial_distance_tol
        .max(settings.coaxial_radius_fraction * a.radius.max(b.radius));
    line_line_distance(&a.origin, &a.axis, &b.origin, &b.axis) < tol
}

/// A cylindrical face waiting to be grouped.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    face: usize,
    params: CylinderParams,
    /// Axial end points of the face, on its own axis line.
    span: Option<(Point3, Point3)>,
}

/// Axial interval covered by a face: its edge midpoints (rims sit at the
/// ends) together with `centroid ± area / 4πr`.
fn axial_span(
    face: &FaceRecord,
    params: &CylinderParams,
    edges: &[EdgeAnalysis],
) -> Option<(Point3, Point3)> {
    let axis = params.axis.into_inner();
    let level = |p: &Point3| (p - params.origin).dot(&axis);
    let mut levels: Vec<f64> = face
        .edges
        .iter()
        .filter_map(|&e| edges.get(e).and_then(|a| a.midpoint))
        .map(|p| level(&p))
        .collect();
    if let Some(c) = face.centroid {
        let half = 0.5 * face.area / (TAU * params.radius);
        if half.is_finite() {
            let mid = level(&c);
            levels.extend([mid - half, mid + half]);
        }
    }
    levels.retain(|s| s.is_finite());
    let lo = levels.iter().copied().min_by(f64::total_cmp)?;
    let hi = levels.iter().copied().fold(lo, f64::max);
    Some((params.origin + axis * lo, params.origin + axis * hi))
}

/// Axial intervals overlap or touch. Unknown spans count as touching.
fn spans_touch(a: &Candidate, b: &Candidate, tol: f64) -> bool {
    let (Some((a0, a1)), Some((b0, b1))) = (a.span, b.span) else {
        return true;
    };
    let axis = a.params.axis.into_inner();
    let level = |p: Point3| (p - a.params.origin).dot(&axis);
    let (alo, ahi) = (level(a0), level(a1));
    let (p, q) = (level(b0), level(b1));
    let (blo, bhi) = (p.min(q), p.max(q));
    alo <= bhi + tol && blo <= ahi + tol
}

/// Union-find over usable cylindrical faces. Two faces join when their
/// axes coincide and their axial extents overlap or touch. Groups are
/// ordered by their smallest member. Returns the groups and the number of
/// skipped faces.
pub fn group_cylinders(
    graph: &ModelGraph,
    edges: &[EdgeAnalysis],
    settings: &FeatureSettings,
) -> (Vec<CylinderGroup>, usize) {
    let mut skipped = 0;
    let mut candidates: Vec<Candidate> = Vec::new();
    for (i, face) in graph.faces.iter().enumerate() {
        if face.kind != SurfaceKind::Cylinder {
            continue;
        }
        match face.cylinder {
            Some(params) if !face.is_degenerate(settings.min_face_area) => {
                candidates.push(Candidate {
                    face: i,
                    params,
                    span: axial_span(face, &params, edges),
                })
            }
            _ => {
                tracing::warn!(
                    face = %face.id,
                    area = face.area,
                    "skipping degenerate cylindrical face"
                );
                skipped += 1;
            }
        }
    }

    let n = candidates.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (&candidates[i], &candidates[j]);
            if coaxial(&a.params, &b.params, settings)
                && spans_touch(a, b, settings.coaxial_distance_tol)
            {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    // Roots are the smallest candidate of each set, so walking candidates in
    // order yields groups ordered by smallest member.
    let mut slot: Vec<Option<usize>> = vec![None; n];
    let mut groups: Vec<CylinderGroup> = Vec::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        let Candidate { face, params, .. } = candidates[i];
        match slot[root] {
            Some(g) => {
                let group = &mut groups[g];
                group.members.push(face);
                group.min_radius = group.min_radius.min(params.radius);
                group.max_radius = group.max_radius.max(params.radius);
            }
            None => {
                slot[root] = Some(groups.len());
                groups.push(CylinderGroup {
                    members: vec![face],
                    axis: params,
                    min_radius: params.radius,
                    max_radius: params.radius,
                });
            }
        }
    }
    (groups, skipped)
}

/// Member-majority vote: does the group cut into the part?
fn is_internal(group: &CylinderGroup, input: &CylinderInput<'_>) -> bool {
    let mut internal = 0usize;
    let mut external = 0usize;
    for &i in &group.members {
        let face = &input.graph.faces[i];
        let verdict = input
            .verdicts
            .get(i)
            .copied()
            .unwrap_or_else(Verdict::fallback);
        let vote = if verdict.is_high() {
            Some(!verdict.label.is_exterior())
        } else {
            let sample = face.sample.map(|s| (s.point, s.normal));
            geometric_vote(sample, face.centroid, face.cylinder, input.bounds)
        };
        match vote {
            Some(true) => internal += 1,
            Some(false) => external += 1,
            None => {}
        }
    }
    internal >= external
}

fn geometric_vote(
    sample: Option<(Point3, Vec3)>,
    centroid: Option<Point3>,
    cylinder: Option<CylinderParams>,
    bounds: &BoundingVolume,
) -> Option<bool> {
    let c = cylinder?;
    if let Some((p, n)) = sample {
        let axis = c.axis.into_inner();
        let rel = p - c.origin;
        let radial = rel - axis * rel.dot(&axis);
        let d = n.dot(&radial);
        if d.is_finite() && d != 0.0 {
            // Concave wall: the normal points at the axis
            return Some(d < 0.0);
        }
    }
    let centroid = centroid?;
    let face_to_axis = point_line_distance(&centroid, &c.origin, &c.axis);
    let center_to_axis = point_line_distance(&bounds.center(), &c.origin, &c.axis);
    Some(face_to_axis < center_to_axis)
}

/// Open ends of a group, as `(low, high)` along the group axis.
fn open_ends(group: &CylinderGroup, input: &CylinderInput<'_>) -> (bool, bool) {
    let graph = input.graph;
    let axis = group.axis.axis.into_inner();
    let origin = group.axis.origin;
    let tol = 1e-4 * input.bounds.diagonal.max(1.0);

    // Edges on the group's outline, with their axial coordinate.
    let mut rim: Vec<(usize, f64)> = Vec::new();
    for &m in &group.members {
        for &e in &graph.faces[m].edges {
            let edge = &graph.edges[e];
            if edge.is_seam() || edge.faces.iter().all(|f| group.members.contains(f)) {
                continue;
            }
            if let Some(p) = input.edges.get(e).and_then(|a| a.midpoint) {
                rim.push((e, (p - origin).dot(&axis)));
            }
        }
    }
    let Some(lo) = rim.iter().map(|r| r.1).min_by(f64::total_cmp) else {
        return (false, false);
    };
    let hi = rim.iter().map(|r| r.1).fold(lo, f64::max);

    let end_is_open = |level: f64, inward: Vec3| {
        rim.iter()
            .filter(|(_, s)| (s - level).abs() <= tol)
            .any(|&(e, _)| {
                let edge = &graph.edges[e];
                if edge.is_boundary() {
                    return true;
                }
                edge.faces
                    .iter()
                    .copied()
                    .filter(|f| !group.members.contains(f))
                    .any(|f| {
                        let exterior = input
                            .verdicts
                            .get(f)
                            .is_some_and(|v| v.label.is_exterior());
                        let facing_away = graph.faces[f]
                            .sample
                            .map_or(true, |s| s.normal.dot(&inward) <= 0.5);
                        exterior && facing_away
                    })
            })
    };
    (end_is_open(lo, axis), end_is_open(hi, -axis))
}

/// Length along the axis: `area / 2πr` for one face, else the largest
/// distance between member centroids.
fn group_depth(group: &CylinderGroup, graph: &ModelGraph) -> f64 {
    if let [only] = group.members.as_slice() {
        let face = &graph.faces[*only];
        let r = face.cylinder.map_or(0.0, |c| c.radius);
        return if r > 0.0 { face.area / (TAU * r) } else { 0.0 };
    }
    let centroids: Vec<Point3> = group
        .members
        .iter()
        .filter_map(|&i| graph.faces[i].centroid)
        .collect();
    let mut depth = 0.0f64;
    for (i, a) in centroids.iter().enumerate() {
        for b in &centroids[i + 1..] {
            depth = depth.max((b - a).norm());
        }
    }
    depth
}

fn group_position(group: &CylinderGroup, graph: &ModelGraph) -> Point3 {
    let pts: Vec<Point3> = group
        .members
        .iter()
        .filter_map(|&i| graph.faces[i].centroid)
        .collect();
    if pts.is_empty() {
        return group.axis.origin;
    }
    let sum = pts.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / pts.len() as f64)
}

fn fillet_group(group: &CylinderGroup, input: &CylinderInput<'_>) -> bool {
    let Some(ratio) = input.bounds.ratio(group.max_radius) else {
        return false;
    };
    if ratio >= input.settings.fillet_max_ratio {
        return false;
    }
    let mut bounded = false;
    for &m in &group.members {
        for &e in &input.graph.faces[m].edges {
            let class = input.edges.get(e).map_or(EdgeClass::Unknown, |a| a.class);
            if class == EdgeClass::Seam {
                continue;
            }
            if !class.is_smooth() {
                return false;
            }
            bounded = true;
        }
    }
    bounded
}

/// Classify every cylinder group and compute label locks.
pub fn recognize(input: &CylinderInput<'_>) -> CylindricalOutcome {
    let graph = input.graph;
    let settings = input.settings;
    let (groups, skipped_faces) = group_cylinders(graph, input.edges, settings);
    let mut out = CylindricalOutcome {
        features: Vec::new(),
        locks: vec![None; graph.face_count()],
        groups: groups.len(),
        skipped_faces,
    };

    for group in &groups {
        let faces: Vec<_> = group.members.iter().map(|&i| graph.faces[i].id).collect();
        let area: f64 = group.members.iter().map(|&i| graph.faces[i].area).sum();
        let axis = group.axis.axis.into_inner();
        let position = point_array(&group_position(group, graph));
        let orientation = Orientation::of_axis(&axis);

        if fillet_group(group, input) {
            for &m in &group.members {
                let face = &graph.faces[m];
                out.locks[m] = Some(FaceLabel::Outer);
                out.features.push(ManufacturingFeature::Fillet(FilletFeature {
                    radius_mm: Some(face.cylinder.map_or(group.min_radius, |c| c.radius)),
                    surface: SurfaceKind::Cylinder,
                    position: face.centroid.map_or(position, |c| point_array(&c)),
                    area_mm2: face.area,
                    faces: vec![face.id],
                }));
            }
            continue;
        }

        let internal = is_internal(group, input);
        let (feature, lock) = if group.members.len() >= 2
            && group.max_radius > group.min_radius * settings.groove_radius_factor
        {
            (
                ManufacturingFeature::Groove(GrooveFeature {
                    inner_diameter_mm: 2.0 * group.min_radius,
                    outer_diameter_mm: 2.0 * group.max_radius,
                    depth_mm: group.max_radius - group.min_radius,
                    internal,
                    axis: to_array(&axis),
                    position,
                    area_mm2: area,
                    orientation,
                    faces,
                }),
                if internal {
                    FaceLabel::Inner
                } else {
                    FaceLabel::Outer
                },
            )
        } else {
            let diameter = group.avg_diameter(graph);
            let Some(ratio) = input.bounds.ratio(diameter) else {
                tracing::debug!(
                    members = group.members.len(),
                    "degenerate bounds, group unclassified"
                );
                continue;
            };
            let depth = group_depth(group, graph);
            if internal && ratio < settings.small_hole_ratio {
                let (lo, hi) = open_ends(group, input);
                let hole = HoleFeature {
                    diameter_mm: diameter,
                    depth_mm: depth,
                    axis: to_array(&axis),
                    position,
                    area_mm2: area,
                    orientation,
                    faces,
                };
                if lo && hi {
                    (ManufacturingFeature::ThroughHole(hole), FaceLabel::Through)
                } else {
                    (ManufacturingFeature::BlindHole(hole), FaceLabel::Inner)
                }
            } else if internal && ratio < settings.bore_ratio {
                let (lo, hi) = open_ends(group, input);
                let through = lo && hi;
                (
                    ManufacturingFeature::Bore(BoreFeature {
                        diameter_mm: diameter,
                        depth_mm: depth,
                        through,
                        axis: to_array(&axis),
                        position,
                        area_mm2: area,
                        orientation,
                        faces,
                    }),
                    if through {
                        FaceLabel::Through
                    } else {
                        FaceLabel::Inner
                    },
                )
            } else if !internal && ratio < settings.boss_ratio {
                (
                    ManufacturingFeature::Boss(BossFeature {
                        diameter_mm: diameter,
                        height_mm: depth,
                        axis: to_array(&axis),
                        position,
                        area_mm2: area,
                        orientation,
                        faces,
                    }),
                    FaceLabel::Outer,
                )
            } else {
                tracing::debug!(ratio, internal, "cylinder group is main body");
                continue;
            }
        };
        for &m in &group.members {
            let own = input
                .verdicts
                .get(m)
                .copied()
                .unwrap_or_else(Verdict::fallback);
            if !lock.is_exterior() && own.is_high() && own.label.is_exterior() {
                tracing::debug!(
                    face = %graph.faces[m].id,
                    ?lock,
                    "keeping exterior verdict over group lock"
                );
                continue;
            }
            out.locks[m] = Some(lock);
        }
        out.features.push(feature);
    }
    out
}
