//! Face triangulation.
//!
//! Disks are fans, annuli and cylinder walls are quad strips, and stock
//! faces with circular cut-outs are triangulated by bridging each hole into
//! the outline and ear-clipping the merged polygon.

use std::f64::consts::TAU;

use brepscan_kernel::{FaceMesh, TessellationParams};
use brepscan_math::{Point3, Vec3};

use crate::part::{AxisFrame, Footprint};
use crate::solid::{FaceGeom, Region};

/// Subdivisions per stock outline side when the face has holes.
const OUTLINE_SPLITS: usize = 4;

/// Triangulate one face. Winding follows the outward normal.
pub(crate) fn triangulate_face(geom: &FaceGeom, params: &TessellationParams) -> FaceMesh {
    match geom {
        FaceGeom::Planar {
            frame,
            level,
            sign,
            region,
        } => {
            let normal = frame.vector(0.0, 0.0, *sign);
            let flip = *sign < 0.0;
            let lift = |a: f64, b: f64| frame.point(a, b, *level);
            match region {
                Region::Rect { bounds, holes } => {
                    tessellate_rect(bounds, holes, params, &lift, &normal, flip)
                }
                Region::Disk { center, radius } => {
                    let n = params.circle_segments(*radius) as usize;
                    tessellate_disk(frame, *level, center, *radius, n, &normal, flip)
                }
                Region::Annulus {
                    center,
                    inner,
                    outer,
                } => {
                    let n = params.circle_segments(*outer) as usize;
                    tessellate_annulus(&lift, center, *inner, *outer, n, &normal, flip)
                }
            }
        }
        FaceGeom::Cylinder { section: s, inward } => {
            let n = params.circle_segments(s.radius) as usize;
            let mut mesh = FaceMesh::default();
            let sign = if *inward { -1.0 } else { 1.0 };
            for i in 0..=n {
                let u = TAU * (i as f64 / n as f64);
                let (c, sn) = (u.cos(), u.sin());
                let normal = s.frame.vector(sign * c, sign * sn, 0.0);
                let a = s.center[0] + s.radius * c;
                let b = s.center[1] + s.radius * sn;
                mesh.push_vertex(&s.frame.point(a, b, s.lo), &normal);
                mesh.push_vertex(&s.frame.point(a, b, s.hi), &normal);
            }
            for i in 0..n as u32 {
                let (b0, t0, b1, t1) = (2 * i, 2 * i + 1, 2 * i + 2, 2 * i + 3);
                if *inward {
                    mesh.push_triangle(b0, t1, b1);
                    mesh.push_triangle(b0, t0, t1);
                } else {
                    mesh.push_triangle(b0, b1, t1);
                    mesh.push_triangle(b0, t1, t0);
                }
            }
            mesh
        }
    }
}

fn push_oriented(mesh: &mut FaceMesh, tri: [u32; 3], flip: bool) {
    if flip {
        mesh.push_triangle(tri[0], tri[2], tri[1]);
    } else {
        mesh.push_triangle(tri[0], tri[1], tri[2]);
    }
}

fn tessellate_disk(
    frame: &AxisFrame,
    level: f64,
    center: &[f64; 2],
    radius: f64,
    n: usize,
    normal: &Vec3,
    flip: bool,
) -> FaceMesh {
    let mut mesh = FaceMesh::default();
    let hub = mesh.push_vertex(&frame.point(center[0], center[1], level), normal);
    for i in 0..=n {
        let u = TAU * (i as f64 / n as f64);
        let p = frame.point(
            center[0] + radius * u.cos(),
            center[1] + radius * u.sin(),
            level,
        );
        mesh.push_vertex(&p, normal);
    }
    for i in 0..n as u32 {
        push_oriented(&mut mesh, [hub, i + 1, i + 2], flip);
    }
    mesh
}

fn tessellate_annulus<F>(
    lift: &F,
    center: &[f64; 2],
    inner: f64,
    outer: f64,
    n: usize,
    normal: &Vec3,
    flip: bool,
) -> FaceMesh
where
    F: Fn(f64, f64) -> Point3,
{
    let mut mesh = FaceMesh::default();
    for i in 0..=n {
        let u = TAU * (i as f64 / n as f64);
        let (c, s) = (u.cos(), u.sin());
        mesh.push_vertex(&lift(center[0] + inner * c, center[1] + inner * s), normal);
        mesh.push_vertex(&lift(center[0] + outer * c, center[1] + outer * s), normal);
    }
    for i in 0..n as u32 {
        let (i0, o0, i1, o1) = (2 * i, 2 * i + 1, 2 * i + 2, 2 * i + 3);
        push_oriented(&mut mesh, [i0, o0, o1], flip);
        push_oriented(&mut mesh, [i0, o1, i1], flip);
    }
    mesh
}

fn tessellate_rect<F>(
    bounds: &[f64; 4],
    holes: &[Footprint],
    params: &TessellationParams,
    lift: &F,
    normal: &Vec3,
    flip: bool,
) -> FaceMesh
where
    F: Fn(f64, f64) -> Point3,
{
    let mut mesh = FaceMesh::default();
    let [a0, a1, b0, b1] = *bounds;

    if holes.is_empty() {
        let v0 = mesh.push_vertex(&lift(a0, b0), normal);
        let v1 = mesh.push_vertex(&lift(a1, b0), normal);
        let v2 = mesh.push_vertex(&lift(a1, b1), normal);
        let v3 = mesh.push_vertex(&lift(a0, b1), normal);
        push_oriented(&mut mesh, [v0, v1, v2], flip);
        push_oriented(&mut mesh, [v0, v2, v3], flip);
        return mesh;
    }

    // Outline, counter-clockwise, with extra points on each side so bridges
    // stay short.
    let corners = [(a0, b0), (a1, b0), (a1, b1), (a0, b1)];
    let mut verts: Vec<(f64, f64)> = Vec::new();
    for i in 0..4 {
        let (p, q) = (corners[i], corners[(i + 1) % 4]);
        for j in 0..OUTLINE_SPLITS {
            let t = j as f64 / OUTLINE_SPLITS as f64;
            verts.push((p.0 + (q.0 - p.0) * t, p.1 + (q.1 - p.1) * t));
        }
    }
    let mut poly: Vec<usize> = (0..verts.len()).collect();

    // Bridge holes nearest the outline first.
    let mut order: Vec<&Footprint> = holes.iter().collect();
    let clearance = |h: &Footprint| {
        (h.center[0] - a0)
            .min(a1 - h.center[0])
            .min(h.center[1] - b0)
            .min(b1 - h.center[1])
    };
    order.sort_by(|x, y| clearance(x).total_cmp(&clearance(y)));

    for hole in order {
        let n = params.circle_segments(hole.radius) as usize;
        let start = verts.len();
        // Clockwise loop
        for i in 0..n {
            let u = -TAU * (i as f64 / n as f64);
            verts.push((
                hole.center[0] + hole.radius * u.cos(),
                hole.center[1] + hole.radius * u.sin(),
            ));
        }

        // Closest (hole vertex, polygon vertex) pair
        let mut best = (f64::INFINITY, 0usize, 0usize);
        for i in 0..n {
            let hp = verts[start + i];
            for (j, &pi) in poly.iter().enumerate() {
                let pp = verts[pi];
                let d = (pp.0 - hp.0).powi(2) + (pp.1 - hp.1).powi(2);
                if d < best.0 {
                    best = (d, i, j);
                }
            }
        }
        let (_, hole_start, poly_pos) = best;
        let hole_loop: Vec<usize> = (0..n).map(|i| start + (hole_start + i) % n).collect();
        let bridge_outer = poly[poly_pos];

        let mut merged = Vec::with_capacity(poly.len() + n + 2);
        merged.extend_from_slice(&poly[..=poly_pos]);
        merged.extend_from_slice(&hole_loop);
        merged.push(hole_loop[0]);
        merged.push(bridge_outer);
        merged.extend_from_slice(&poly[poly_pos + 1..]);
        poly = merged;
    }

    for &(a, b) in &verts {
        mesh.push_vertex(&lift(a, b), normal);
    }
    let mut tris = Vec::new();
    ear_clip(&verts, &poly, &mut tris);
    for t in tris.chunks_exact(3) {
        push_oriented(&mut mesh, [t[0], t[1], t[2]], flip);
    }
    mesh
}

/// Ear-clipping triangulation of a counter-clockwise polygon given as
/// indices into `verts`. Emits counter-clockwise triangles.
fn ear_clip(verts: &[(f64, f64)], polygon: &[usize], out: &mut Vec<u32>) {
    let mut remaining = polygon.to_vec();

    while remaining.len() > 3 {
        let n = remaining.len();
        let mut found_ear = false;

        for i in 0..n {
            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;
            let a = verts[remaining[prev]];
            let b = verts[remaining[i]];
            let c = verts[remaining[next]];

            let cross = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
            if cross <= 0.0 {
                continue;
            }

            let blocked = (0..n).any(|j| {
                j != prev
                    && j != i
                    && j != next
                    && point_in_triangle(verts[remaining[j]], a, b, c)
            });
            if blocked {
                continue;
            }

            out.extend_from_slice(&[
                remaining[prev] as u32,
                remaining[i] as u32,
                remaining[next] as u32,
            ]);
            remaining.remove(i);
            found_ear = true;
            break;
        }

        if !found_ear {
            // Degenerate remainder; leave it open rather than emit folds.
            return;
        }
    }

    if remaining.len() == 3 {
        out.extend_from_slice(&[
            remaining[0] as u32,
            remaining[1] as u32,
            remaining[2] as u32,
        ]);
    }
}

fn point_in_triangle(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let v0 = (c.0 - a.0, c.1 - a.1);
    let v1 = (b.0 - a.0, b.1 - a.1);
    let v2 = (p.0 - a.0, p.1 - a.1);

    let dot00 = v0.0 * v0.0 + v0.1 * v0.1;
    let dot01 = v0.0 * v1.0 + v0.1 * v1.1;
    let dot02 = v0.0 * v2.0 + v0.1 * v2.1;
    let dot11 = v1.0 * v1.0 + v1.1 * v1.1;
    let dot12 = v1.0 * v2.0 + v1.1 * v2.1;

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < 1e-300 {
        return false;
    }
    let u = (dot11 * dot02 - dot01 * dot12) / denom;
    let v = (dot00 * dot12 - dot01 * dot02) / denom;

    let eps = 1e-10;
    u > eps && v > eps && (u + v) < 1.0 - eps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::Section;
    use std::f64::consts::PI;

    fn params() -> TessellationParams {
        TessellationParams {
            linear_deflection: 0.05,
            angular_deflection: 0.3,
        }
    }

    fn mesh_area(mesh: &FaceMesh) -> (f64, Vec3) {
        let v = |i: u32| {
            let i = i as usize * 3;
            Vec3::new(
                mesh.vertices[i] as f64,
                mesh.vertices[i + 1] as f64,
                mesh.vertices[i + 2] as f64,
            )
        };
        let mut area = 0.0;
        let mut dir = Vec3::zeros();
        for t in mesh.indices.chunks_exact(3) {
            let n = (v(t[1]) - v(t[0])).cross(&(v(t[2]) - v(t[0])));
            area += 0.5 * n.norm();
            dir += n;
        }
        (area, dir)
    }

    #[test]
    fn test_square_with_hole_area_and_winding() {
        let face = FaceGeom::Planar {
            frame: AxisFrame::new(2),
            level: 20.0,
            sign: 1.0,
            region: Region::Rect {
                bounds: [0.0, 100.0, 0.0, 100.0],
                holes: vec![Footprint {
                    center: [50.0, 50.0],
                    radius: 5.0,
                }],
            },
        };
        let mesh = triangulate_face(&face, &params());
        let (area, dir) = mesh_area(&mesh);
        // Polygonal hole is slightly smaller than the true circle
        let exact = 100.0 * 100.0 - PI * 25.0;
        assert!((area - exact).abs() / exact < 1e-3);
        assert!(dir.z > 0.0);
        assert_eq!(mesh.normals.len(), mesh.vertices.len());
    }

    #[test]
    fn test_bottom_face_winds_downward() {
        let face = FaceGeom::Planar {
            frame: AxisFrame::new(2),
            level: 0.0,
            sign: -1.0,
            region: Region::Rect {
                bounds: [0.0, 10.0, 0.0, 10.0],
                holes: Vec::new(),
            },
        };
        let mesh = triangulate_face(&face, &params());
        assert_eq!(mesh.num_triangles(), 2);
        let (area, dir) = mesh_area(&mesh);
        assert!((area - 100.0).abs() < 1e-4);
        assert!(dir.z < 0.0);
    }

    #[test]
    fn test_two_holes() {
        let face = FaceGeom::Planar {
            frame: AxisFrame::new(0),
            level: 0.0,
            sign: -1.0,
            region: Region::Rect {
                bounds: [0.0, 60.0, 0.0, 30.0],
                holes: vec![
                    Footprint {
                        center: [15.0, 15.0],
                        radius: 4.0,
                    },
                    Footprint {
                        center: [45.0, 15.0],
                        radius: 6.0,
                    },
                ],
            },
        };
        let mesh = triangulate_face(&face, &params());
        let (area, dir) = mesh_area(&mesh);
        let exact = 60.0 * 30.0 - PI * (16.0 + 36.0);
        assert!((area - exact).abs() / exact < 2e-3);
        assert!(dir.x < 0.0);
    }

    #[test]
    fn test_inward_cylinder_faces_axis() {
        let face = FaceGeom::Cylinder {
            section: Section {
                frame: AxisFrame::new(2),
                center: [0.0, 0.0],
                radius: 5.0,
                lo: 0.0,
                hi: 10.0,
            },
            inward: true,
        };
        let mesh = triangulate_face(&face, &params());
        let (area, _) = mesh_area(&mesh);
        assert!((area - TAU * 5.0 * 10.0).abs() / (TAU * 50.0) < 1e-2);
        // First triangle's geometric normal points toward the axis
        let v = |i: u32| {
            let i = i as usize * 3;
            Vec3::new(
                mesh.vertices[i] as f64,
                mesh.vertices[i + 1] as f64,
                mesh.vertices[i + 2] as f64,
            )
        };
        let t = &mesh.indices[0..3];
        let n = (v(t[1]) - v(t[0])).cross(&(v(t[2]) - v(t[0])));
        let centre = (v(t[0]) + v(t[1]) + v(t[2])) / 3.0;
        let radial = Vec3::new(centre.x, centre.y, 0.0);
        assert!(n.dot(&radial) < 0.0);
    }

    #[test]
    fn test_annulus_area() {
        let face = FaceGeom::Planar {
            frame: AxisFrame::new(2),
            level: 5.0,
            sign: 1.0,
            region: Region::Annulus {
                center: [0.0, 0.0],
                inner: 3.0,
                outer: 6.0,
            },
        };
        let mesh = triangulate_face(&face, &params());
        let (area, dir) = mesh_area(&mesh);
        let exact = PI * (36.0 - 9.0);
        assert!((area - exact).abs() / exact < 2e-2);
        assert!(dir.z > 0.0);
    }
}
