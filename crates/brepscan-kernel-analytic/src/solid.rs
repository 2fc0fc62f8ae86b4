//! Boundary representation of a [`PartSpec`]: faces, edges and exact
//! membership.

use std::f64::consts::{PI, TAU};

use brepscan_kernel::{FaceId, KernelResult};
use brepscan_math::{Aabb3, Point2, Point3, Vec3};

use crate::part::{AxisFrame, FeatureSpec, Footprint, PartSpec, Section, StockFace};
use crate::ray::{intersect_axis_cylinder, intersect_axis_plane, Ray};

/// Slack for trimming tests on ray hits, in mm.
const TRIM_EPS: f64 = 1e-6;

/// Trimmed region of a planar face, in frame `(a, b)` coordinates.
#[derive(Debug, Clone)]
pub(crate) enum Region {
    /// Rectangle `[a_min, a_max, b_min, b_max]` minus circular holes.
    Rect {
        bounds: [f64; 4],
        holes: Vec<Footprint>,
    },
    /// Full disk.
    Disk { center: [f64; 2], radius: f64 },
    /// Ring between two concentric circles.
    Annulus {
        center: [f64; 2],
        inner: f64,
        outer: f64,
    },
}

impl Region {
    pub fn contains(&self, a: f64, b: f64, eps: f64) -> bool {
        match self {
            Region::Rect { bounds, holes } => {
                a >= bounds[0] - eps
                    && a <= bounds[1] + eps
                    && b >= bounds[2] - eps
                    && b <= bounds[3] + eps
                    && holes.iter().all(|h| {
                        (a - h.center[0]).hypot(b - h.center[1]) >= h.radius - eps
                    })
            }
            Region::Disk { center, radius } => {
                (a - center[0]).hypot(b - center[1]) <= radius + eps
            }
            Region::Annulus {
                center,
                inner,
                outer,
            } => {
                let d = (a - center[0]).hypot(b - center[1]);
                d >= inner - eps && d <= outer + eps
            }
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            Region::Rect { bounds, holes } => {
                let rect = (bounds[1] - bounds[0]) * (bounds[3] - bounds[2]);
                rect - holes.iter().map(|h| PI * h.radius * h.radius).sum::<f64>()
            }
            Region::Disk { radius, .. } => PI * radius * radius,
            Region::Annulus { inner, outer, .. } => PI * (outer * outer - inner * inner),
        }
    }

    pub fn centroid(&self) -> [f64; 2] {
        match self {
            Region::Rect { bounds, holes } => {
                let rect_area = (bounds[1] - bounds[0]) * (bounds[3] - bounds[2]);
                let mut sa = rect_area * 0.5 * (bounds[0] + bounds[1]);
                let mut sb = rect_area * 0.5 * (bounds[2] + bounds[3]);
                let mut area = rect_area;
                for h in holes {
                    let ha = PI * h.radius * h.radius;
                    sa -= ha * h.center[0];
                    sb -= ha * h.center[1];
                    area -= ha;
                }
                if area <= 0.0 {
                    return [0.5 * (bounds[0] + bounds[1]), 0.5 * (bounds[2] + bounds[3])];
                }
                [sa / area, sb / area]
            }
            Region::Disk { center, .. } | Region::Annulus { center, .. } => *center,
        }
    }

    pub fn uv_bounds(&self) -> (Point2, Point2) {
        match self {
            Region::Rect { bounds, .. } => (
                Point2::new(bounds[0], bounds[2]),
                Point2::new(bounds[1], bounds[3]),
            ),
            Region::Disk { center, radius } => disk_bounds(center, *radius),
            Region::Annulus { center, outer, .. } => disk_bounds(center, *outer),
        }
    }

    /// An interior point far from the region's boundary.
    pub fn sample(&self) -> [f64; 2] {
        match self {
            Region::Rect { bounds, holes } => {
                // Candidate grid: keep the point with the most clearance from
                // both the outline and every hole.
                const N: usize = 9;
                let clearance = |a: f64, b: f64| {
                    let mut c = (a - bounds[0])
                        .min(bounds[1] - a)
                        .min(b - bounds[2])
                        .min(bounds[3] - b);
                    for h in holes {
                        c = c.min((a - h.center[0]).hypot(b - h.center[1]) - h.radius);
                    }
                    c
                };
                let mut best = [0.5 * (bounds[0] + bounds[1]), 0.5 * (bounds[2] + bounds[3])];
                let mut best_clearance = clearance(best[0], best[1]);
                for i in 0..N {
                    for j in 0..N {
                        let a = bounds[0] + (bounds[1] - bounds[0]) * (i as f64 + 0.5) / N as f64;
                        let b = bounds[2] + (bounds[3] - bounds[2]) * (j as f64 + 0.5) / N as f64;
                        let c = clearance(a, b);
                        if c > best_clearance {
                            best = [a, b];
                            best_clearance = c;
                        }
                    }
                }
                best
            }
            Region::Disk { center, .. } => *center,
            Region::Annulus {
                center,
                inner,
                outer,
            } => [center[0] + 0.5 * (inner + outer), center[1]],
        }
    }
}

fn disk_bounds(center: &[f64; 2], r: f64) -> (Point2, Point2) {
    (
        Point2::new(center[0] - r, center[1] - r),
        Point2::new(center[0] + r, center[1] + r),
    )
}

/// Geometry of one face.
#[derive(Debug, Clone)]
pub(crate) enum FaceGeom {
    /// Axis-aligned plane `p[k] == level` with outward normal `sign · e_k`.
    Planar {
        frame: AxisFrame,
        level: f64,
        sign: f64,
        region: Region,
    },
    /// Axis-aligned cylinder wall. `inward` normals point at the axis.
    Cylinder { section: Section, inward: bool },
}

impl FaceGeom {
    pub fn point(&self, uv: Point2) -> Point3 {
        match self {
            FaceGeom::Planar { frame, level, .. } => frame.point(uv.x, uv.y, *level),
            FaceGeom::Cylinder { section: s, .. } => s.frame.point(
                s.center[0] + s.radius * uv.x.cos(),
                s.center[1] + s.radius * uv.x.sin(),
                uv.y,
            ),
        }
    }

    pub fn normal(&self, uv: Point2) -> Vec3 {
        match self {
            FaceGeom::Planar { frame, sign, .. } => frame.vector(0.0, 0.0, *sign),
            FaceGeom::Cylinder { section, inward } => {
                let s = if *inward { -1.0 } else { 1.0 };
                section
                    .frame
                    .vector(s * uv.x.cos(), s * uv.x.sin(), 0.0)
            }
        }
    }

    pub fn project(&self, p: &Point3) -> Point2 {
        match self {
            FaceGeom::Planar { frame, .. } => {
                let (a, b, _) = frame.coords(p);
                Point2::new(a, b)
            }
            FaceGeom::Cylinder { section: s, .. } => {
                let (a, b, k) = s.frame.coords(p);
                let mut u = (b - s.center[1]).atan2(a - s.center[0]);
                if u < 0.0 {
                    u += TAU;
                }
                Point2::new(u, k)
            }
        }
    }

    pub fn uv_bounds(&self) -> (Point2, Point2) {
        match self {
            FaceGeom::Planar { region, .. } => region.uv_bounds(),
            FaceGeom::Cylinder { section, .. } => (
                Point2::new(0.0, section.lo),
                Point2::new(TAU, section.hi),
            ),
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            FaceGeom::Planar { region, .. } => region.area(),
            FaceGeom::Cylinder { section, .. } => {
                TAU * section.radius * (section.hi - section.lo)
            }
        }
    }

    pub fn centroid(&self) -> Point3 {
        match self {
            FaceGeom::Planar {
                frame,
                level,
                region,
                ..
            } => {
                let [a, b] = region.centroid();
                frame.point(a, b, *level)
            }
            FaceGeom::Cylinder { section: s, .. } => {
                s.frame
                    .point(s.center[0], s.center[1], 0.5 * (s.lo + s.hi))
            }
        }
    }

    /// Parameters of a representative interior point.
    pub fn sample_uv(&self) -> Point2 {
        match self {
            FaceGeom::Planar { region, .. } => {
                let [a, b] = region.sample();
                Point2::new(a, b)
            }
            FaceGeom::Cylinder { section, .. } => {
                Point2::new(PI, 0.5 * (section.lo + section.hi))
            }
        }
    }

    /// Ray parameters where the ray crosses this trimmed face.
    pub fn ray_hits(&self, ray: &Ray) -> Vec<f64> {
        match self {
            FaceGeom::Planar {
                frame,
                level,
                region,
                ..
            } => intersect_axis_plane(ray, frame, *level)
                .filter(|&t| {
                    let (a, b, _) = frame.coords(&ray.at(t));
                    region.contains(a, b, TRIM_EPS)
                })
                .into_iter()
                .collect(),
            FaceGeom::Cylinder { section: s, .. } => {
                intersect_axis_cylinder(ray, &s.frame, s.center, s.radius)
                    .into_iter()
                    .filter(|&t| {
                        let k = ray.at(t)[s.frame.k];
                        k >= s.lo - TRIM_EPS && k <= s.hi + TRIM_EPS
                    })
                    .collect()
            }
        }
    }
}

/// Geometry of one edge.
#[derive(Debug, Clone)]
pub(crate) enum EdgeGeom {
    /// Straight segment, parametrized by arc length.
    Line { start: Point3, end: Point3 },
    /// Full circle in the plane `p[k] == level`, parametrized by angle from `e_a`.
    Circle {
        frame: AxisFrame,
        center: [f64; 2],
        radius: f64,
        level: f64,
    },
}

impl EdgeGeom {
    pub fn range(&self) -> (f64, f64) {
        match self {
            EdgeGeom::Line { start, end } => (0.0, (end - start).norm()),
            EdgeGeom::Circle { .. } => (0.0, TAU),
        }
    }

    pub fn point(&self, t: f64) -> Point3 {
        match self {
            EdgeGeom::Line { start, end } => {
                let len = (end - start).norm();
                if len < 1e-300 {
                    return *start;
                }
                start + (end - start) * (t / len)
            }
            EdgeGeom::Circle {
                frame,
                center,
                radius,
                level,
            } => frame.point(
                center[0] + radius * t.cos(),
                center[1] + radius * t.sin(),
                *level,
            ),
        }
    }
}

/// An edge and the faces on either side of it.
#[derive(Debug, Clone)]
pub(crate) struct EdgeEntry {
    pub geom: EdgeGeom,
    pub faces: Vec<FaceId>,
}

/// The assembled boundary representation.
#[derive(Debug, Clone)]
pub(crate) struct Solid {
    pub faces: Vec<FaceGeom>,
    pub edges: Vec<EdgeEntry>,
    pub stock_min: Point3,
    pub stock_max: Point3,
    /// Removed material, extended past open ends.
    pub cavities: Vec<Section>,
    /// Added material, embedded slightly into the stock.
    pub bosses: Vec<Section>,
    pub bounds: Aabb3,
    pub volume: f64,
}

fn stock_face_for(axis: usize, sign: f64) -> StockFace {
    StockFace::ALL
        .into_iter()
        .find(|f| f.axis() == axis && f.sign() == sign)
        .unwrap_or(StockFace::Top)
}

fn face_id(index: usize) -> FaceId {
    FaceId(index as u32)
}

/// Move the end of `s` nearest `end_level` outward by `by`.
fn extend_end(mut s: Section, end_level: f64, by: f64) -> Section {
    if (end_level - s.hi).abs() <= (end_level - s.lo).abs() {
        s.hi += by;
    } else {
        s.lo -= by;
    }
    s
}

struct Builder {
    faces: Vec<FaceGeom>,
    edges: Vec<EdgeEntry>,
}

impl Builder {
    fn face(&mut self, geom: FaceGeom) -> FaceId {
        self.faces.push(geom);
        face_id(self.faces.len() - 1)
    }

    fn rim(&mut self, s: &Section, radius: f64, level: f64, faces: [FaceId; 2]) {
        self.edges.push(EdgeEntry {
            geom: EdgeGeom::Circle {
                frame: s.frame,
                center: s.center,
                radius,
                level,
            },
            faces: faces.to_vec(),
        });
    }

    fn seam(&mut self, s: &Section, cyl: FaceId) {
        let start = s.frame.point(s.center[0] + s.radius, s.center[1], s.lo);
        let end = s.frame.point(s.center[0] + s.radius, s.center[1], s.hi);
        self.edges.push(EdgeEntry {
            geom: EdgeGeom::Line { start, end },
            faces: vec![cyl, cyl],
        });
    }

    fn disk(&mut self, s: &Section, level: f64, sign: f64) -> FaceId {
        self.face(FaceGeom::Planar {
            frame: s.frame,
            level,
            sign,
            region: Region::Disk {
                center: s.center,
                radius: s.radius,
            },
        })
    }
}

/// Build the boundary representation of a validated part.
pub(crate) fn build(part: &PartSpec) -> KernelResult<Solid> {
    part.validate()?;

    let stock_min = part.min_corner();
    let stock_max = part.max_corner();
    let max_size = part.stock.size.iter().copied().fold(0.0f64, f64::max);
    let overshoot = 1.0 + 0.01 * max_size;

    let mut b = Builder {
        faces: Vec::new(),
        edges: Vec::new(),
    };

    for face in StockFace::ALL {
        b.face(FaceGeom::Planar {
            frame: face.frame(),
            level: part.face_level(face),
            sign: face.sign(),
            region: Region::Rect {
                bounds: part.face_rect(face),
                holes: Vec::new(),
            },
        });
    }

    // Twelve stock edges, grouped by direction.
    for dir in 0..3 {
        let frame = AxisFrame::new(dir);
        for (sa, sb) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let pick = |axis: usize, sign: f64| {
                if sign > 0.0 {
                    stock_max[axis]
                } else {
                    stock_min[axis]
                }
            };
            let (a, bb) = (pick(frame.a, sa), pick(frame.b, sb));
            let fa = stock_face_for(frame.a, sa);
            let fb = stock_face_for(frame.b, sb);
            b.edges.push(EdgeEntry {
                geom: EdgeGeom::Line {
                    start: frame.point(a, bb, stock_min[dir]),
                    end: frame.point(a, bb, stock_max[dir]),
                },
                faces: vec![face_id(fa.index()), face_id(fb.index())],
            });
        }
    }

    let mut holes: Vec<Vec<Footprint>> = vec![Vec::new(); 6];
    let mut cavities = Vec::new();
    let mut bosses = Vec::new();
    let mut volume = part.stock.size.iter().product::<f64>();
    let mut bounds = Aabb3::new(stock_min, stock_max);

    for feature in &part.features {
        let face = feature.face();
        let s = face.sign();
        let level = part.face_level(face);
        let entry = face_id(face.index());
        let exit = face_id(face.opposite().index());
        // Far end of a section drilled from `level`
        let far = |sec: &Section| if s > 0.0 { sec.lo } else { sec.hi };

        for (f, fp) in part.footprints(feature) {
            holes[f.index()].push(fp);
        }
        let sections = part.cavity_sections(feature);
        for sec in &sections {
            volume -= PI * sec.radius * sec.radius * (sec.hi - sec.lo);
        }

        match *feature {
            FeatureSpec::Hole { depth, .. } => {
                let Some(&sec) = sections.first() else {
                    continue;
                };
                let cyl = b.face(FaceGeom::Cylinder {
                    section: sec,
                    inward: true,
                });
                b.rim(&sec, sec.radius, level, [cyl, entry]);
                let bottom = far(&sec);
                let mut cavity = extend_end(sec, level, overshoot);
                if depth.is_some() {
                    let floor = b.disk(&sec, bottom, s);
                    b.rim(&sec, sec.radius, bottom, [cyl, floor]);
                } else {
                    b.rim(&sec, sec.radius, bottom, [cyl, exit]);
                    cavity = extend_end(cavity, bottom, overshoot);
                }
                b.seam(&sec, cyl);
                cavities.push(cavity);
            }
            FeatureSpec::Counterbore { depth, .. } => {
                let &[cb, inner] = sections.as_slice() else {
                    continue;
                };
                let step = far(&cb);
                let cb_face = b.face(FaceGeom::Cylinder {
                    section: cb,
                    inward: true,
                });
                let ledge = b.face(FaceGeom::Planar {
                    frame: cb.frame,
                    level: step,
                    sign: s,
                    region: Region::Annulus {
                        center: cb.center,
                        inner: inner.radius,
                        outer: cb.radius,
                    },
                });
                let inner_face = b.face(FaceGeom::Cylinder {
                    section: inner,
                    inward: true,
                });
                b.rim(&cb, cb.radius, level, [cb_face, entry]);
                b.rim(&cb, cb.radius, step, [cb_face, ledge]);
                b.rim(&inner, inner.radius, step, [inner_face, ledge]);
                let bottom = far(&inner);
                let mut inner_cavity = extend_end(inner, step, overshoot);
                if depth.is_some() {
                    let floor = b.disk(&inner, bottom, s);
                    b.rim(&inner, inner.radius, bottom, [inner_face, floor]);
                } else {
                    b.rim(&inner, inner.radius, bottom, [inner_face, exit]);
                    inner_cavity = extend_end(inner_cavity, bottom, overshoot);
                }
                b.seam(&cb, cb_face);
                b.seam(&inner, inner_face);
                cavities.push(extend_end(cb, level, overshoot));
                cavities.push(inner_cavity);
            }
            FeatureSpec::Boss {
                diameter, height, ..
            } => {
                let top = level + s * height;
                let sec = Section {
                    frame: face.frame(),
                    center: part.absolute_center(face, feature.center()),
                    radius: 0.5 * diameter,
                    lo: level.min(top),
                    hi: level.max(top),
                };
                let cyl = b.face(FaceGeom::Cylinder {
                    section: sec,
                    inward: false,
                });
                let cap = b.disk(&sec, top, s);
                b.rim(&sec, sec.radius, level, [cyl, entry]);
                b.rim(&sec, sec.radius, top, [cyl, cap]);
                b.seam(&sec, cyl);

                volume += PI * sec.radius * sec.radius * height;
                let r = sec.radius;
                let [cx, cy] = sec.center;
                bounds.include_point(&sec.frame.point(cx - r, cy - r, sec.lo));
                bounds.include_point(&sec.frame.point(cx + r, cy + r, sec.hi));
                let embed = 1e-4 * part.stock.size[face.axis()];
                bosses.push(extend_end(sec, level, embed));
            }
        }
    }

    for (face, cutouts) in StockFace::ALL.iter().zip(holes) {
        if let FaceGeom::Planar {
            region: Region::Rect { holes, .. },
            ..
        } = &mut b.faces[face.index()]
        {
            *holes = cutouts;
        }
    }

    Ok(Solid {
        faces: b.faces,
        edges: b.edges,
        stock_min,
        stock_max,
        cavities,
        bosses,
        bounds,
        volume,
    })
}

fn sd_box(p: &Point3, min: &Point3, max: &Point3) -> f64 {
    let q = Vec3::new(
        (min.x - p.x).max(p.x - max.x),
        (min.y - p.y).max(p.y - max.y),
        (min.z - p.z).max(p.z - max.z),
    );
    let outside = Vec3::new(q.x.max(0.0), q.y.max(0.0), q.z.max(0.0)).norm();
    let inside = q.x.max(q.y).max(q.z).min(0.0);
    outside + inside
}

fn sd_section(p: &Point3, s: &Section) -> f64 {
    let (a, b, k) = s.frame.coords(p);
    let radial = (a - s.center[0]).hypot(b - s.center[1]) - s.radius;
    let axial = (s.lo - k).max(k - s.hi);
    if radial <= 0.0 && axial <= 0.0 {
        radial.max(axial)
    } else {
        radial.max(0.0).hypot(axial.max(0.0))
    }
}

impl Solid {
    /// Signed distance to the boundary: negative inside the material.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        let mut d = sd_box(p, &self.stock_min, &self.stock_max);
        for c in &self.cavities {
            d = d.max(-sd_section(p, c));
        }
        for b in &self.bosses {
            d = d.min(sd_section(p, b));
        }
        d
    }

    pub fn surface_area(&self) -> f64 {
        self.faces.iter().map(FaceGeom::area).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plate() -> Solid {
        let part = PartSpec::block([100.0, 100.0, 20.0]).through_hole(
            StockFace::Top,
            [50.0, 50.0],
            10.0,
        );
        build(&part).unwrap()
    }

    #[test]
    fn test_plate_topology_counts() {
        let s = plate();
        // six stock planes + one bore
        assert_eq!(s.faces.len(), 7);
        // 12 stock lines + 2 rims + 1 seam
        assert_eq!(s.edges.len(), 15);
        let seam = &s.edges[14];
        assert_eq!(seam.faces[0], seam.faces[1]);
    }

    #[test]
    fn test_plate_volume_and_area() {
        let s = plate();
        let expected = 100.0 * 100.0 * 20.0 - PI * 25.0 * 20.0;
        assert!((s.volume - expected).abs() < 1e-6);
        let area = 2.0 * (100.0 * 100.0 - PI * 25.0) + 4.0 * 100.0 * 20.0 + TAU * 5.0 * 20.0;
        assert!((s.surface_area() - area).abs() < 1e-6);
    }

    #[test]
    fn test_membership() {
        let s = plate();
        assert!(s.signed_distance(&Point3::new(10.0, 10.0, 10.0)) < 0.0);
        // Inside the bore
        assert!(s.signed_distance(&Point3::new(50.0, 50.0, 10.0)) > 0.0);
        // Just outside the top face
        assert!(s.signed_distance(&Point3::new(10.0, 10.0, 20.5)) > 0.0);
        // On the bore wall
        let d = s.signed_distance(&Point3::new(55.0, 50.0, 10.0));
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_top_sample_avoids_hole() {
        let s = plate();
        let uv = s.faces[0].sample_uv();
        let d = (uv.x - 50.0).hypot(uv.y - 50.0);
        assert!(d > 10.0);
    }

    #[test]
    fn test_edge_faces_of_stock_lines() {
        let s = plate();
        for e in &s.edges[..12] {
            assert_eq!(e.faces.len(), 2);
            assert_ne!(e.faces[0], e.faces[1]);
            let p = e.geom.point(0.0);
            // Every stock edge lies on both its faces' planes
            for f in &e.faces {
                if let FaceGeom::Planar { frame, level, .. } = &s.faces[f.0 as usize] {
                    assert!((p[frame.k] - level).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_boss_grows_bounds_and_volume() {
        let part =
            PartSpec::block([40.0, 40.0, 10.0]).boss(StockFace::Top, [20.0, 20.0], 10.0, 15.0);
        let s = build(&part).unwrap();
        assert!((s.bounds.max.z - 25.0).abs() < 1e-12);
        let expected = 40.0 * 40.0 * 10.0 + PI * 25.0 * 15.0;
        assert!((s.volume - expected).abs() < 1e-6);
        assert!(s.signed_distance(&Point3::new(20.0, 20.0, 20.0)) < 0.0);
        assert!(s.signed_distance(&Point3::new(5.0, 5.0, 20.0)) > 0.0);
    }

    #[test]
    fn test_cylinder_project_round_trip() {
        let s = plate();
        let cyl = &s.faces[6];
        let uv = Point2::new(1.0, 7.0);
        let p = cyl.point(uv);
        let back = cyl.project(&p);
        assert!((back.x - 1.0).abs() < 1e-12);
        assert!((back.y - 7.0).abs() < 1e-12);
        // Bore normal points at the axis
        let n = cyl.normal(uv);
        let to_axis = Point3::new(50.0, 50.0, 7.0) - p;
        assert!(n.dot(&to_axis) > 0.0);
    }
}
