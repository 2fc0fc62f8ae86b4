//! Value types exchanged across the kernel boundary.

use std::fmt;

use brepscan_math::{Dir3, Point2, Point3, Vec3};
use serde::{Deserialize, Serialize};

/// Opaque handle of a face, stable for the lifetime of one solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceId(pub u32);

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// Opaque handle of an edge, stable for the lifetime of one solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u32);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Classification of a face's underlying surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Planar surface.
    Plane,
    /// Cylindrical surface.
    Cylinder,
    /// Conical surface.
    Cone,
    /// Spherical surface.
    Sphere,
    /// Toroidal surface.
    Torus,
    /// B-spline, offset, extrusion, revolution or anything else.
    Freeform,
}

/// Classification of an edge's underlying curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    /// Straight line segment.
    Line,
    /// Circle or circular arc.
    Circle,
    /// Ellipse or elliptical arc.
    Ellipse,
    /// B-spline or Bezier curve.
    BSpline,
    /// Any other curve type.
    Other,
}

/// Result of a point-membership query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointState {
    /// Strictly inside the material.
    In,
    /// Strictly outside the material.
    Out,
    /// On the boundary within tolerance.
    On,
}

/// Axis line and radius of a cylindrical face.
#[derive(Debug, Clone, Copy)]
pub struct CylinderParams {
    /// A point on the axis.
    pub origin: Point3,
    /// Axis direction.
    pub axis: Dir3,
    /// Radius in mm.
    pub radius: f64,
}

/// Supporting plane of a planar face.
#[derive(Debug, Clone, Copy)]
pub struct PlaneParams {
    /// A point on the plane.
    pub origin: Point3,
    /// Normal pointing away from the material.
    pub normal: Dir3,
}

/// Parameter-space rectangle of a face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvBounds {
    /// Minimum (u, v).
    pub min: Point2,
    /// Maximum (u, v).
    pub max: Point2,
}

impl UvBounds {
    /// Midpoint of the parameter rectangle.
    pub fn mid(&self) -> Point2 {
        Point2::new(
            0.5 * (self.min.x + self.max.x),
            0.5 * (self.min.y + self.max.y),
        )
    }
}

/// A point on a face together with its outward normal there.
#[derive(Debug, Clone, Copy)]
pub struct FaceSample {
    /// Point on the face.
    pub point: Point3,
    /// Outward normal at `point`. May be unnormalized or degenerate.
    pub normal: Vec3,
}

/// One ray/face crossing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Face that was crossed.
    pub face: FaceId,
    /// Ray parameter of the crossing.
    pub t: f64,
}

/// Triangulation of a single face.
///
/// Layout matches a flat render buffer: xyz triples for `vertices` and
/// `normals`, index triples for `indices`. `normals` may be empty when the
/// kernel does not provide them.
#[derive(Debug, Clone, Default)]
pub struct FaceMesh {
    /// Flat vertex positions `[x0, y0, z0, x1, ...]`.
    pub vertices: Vec<f32>,
    /// Flat vertex normals, same length as `vertices` or empty.
    pub normals: Vec<f32>,
    /// Triangle indices into this mesh's own vertices.
    pub indices: Vec<u32>,
}

impl FaceMesh {
    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Push a vertex with its normal, returning its index.
    pub fn push_vertex(&mut self, p: &Point3, n: &Vec3) -> u32 {
        let idx = self.num_vertices() as u32;
        self.vertices
            .extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
        self.normals
            .extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
        idx
    }

    /// Push a triangle.
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }
}

/// Whole-solid integral properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    /// Enclosed volume in mm³.
    pub volume: f64,
    /// Total boundary area in mm².
    pub surface_area: f64,
}

/// Tessellation parameters.
#[derive(Debug, Clone, Copy)]
pub struct TessellationParams {
    /// Maximum chordal deviation in mm.
    pub linear_deflection: f64,
    /// Maximum angle between adjacent facets in radians.
    pub angular_deflection: f64,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            linear_deflection: 0.1,
            angular_deflection: 0.5,
        }
    }
}

impl TessellationParams {
    /// Number of segments needed to approximate a full circle of `radius`.
    pub fn circle_segments(&self, radius: f64) -> u32 {
        let mut segments = 8u32;
        if self.angular_deflection > 1e-6 {
            let by_angle = (std::f64::consts::TAU / self.angular_deflection).ceil();
            segments = segments.max(by_angle.min(512.0) as u32);
        }
        if self.linear_deflection > 1e-9 && radius > self.linear_deflection {
            let half = (1.0 - self.linear_deflection / radius).clamp(-1.0, 1.0).acos();
            if half > 1e-9 {
                let by_chord = (std::f64::consts::PI / half).ceil();
                segments = segments.max(by_chord.min(512.0) as u32);
            }
        }
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_mesh_push() {
        let mut m = FaceMesh::default();
        let a = m.push_vertex(&Point3::origin(), &Vec3::z());
        let b = m.push_vertex(&Point3::new(1.0, 0.0, 0.0), &Vec3::z());
        let c = m.push_vertex(&Point3::new(0.0, 1.0, 0.0), &Vec3::z());
        m.push_triangle(a, b, c);
        assert_eq!(m.num_vertices(), 3);
        assert_eq!(m.num_triangles(), 1);
        assert_eq!(m.normals.len(), m.vertices.len());
    }

    #[test]
    fn test_circle_segments_monotone_in_deflection() {
        let coarse = TessellationParams {
            linear_deflection: 0.5,
            angular_deflection: 1.0,
        };
        let fine = TessellationParams {
            linear_deflection: 0.01,
            angular_deflection: 1.0,
        };
        assert!(fine.circle_segments(5.0) > coarse.circle_segments(5.0));
        assert!(coarse.circle_segments(5.0) >= 8);
        // Tiny radius never drops below the floor
        assert_eq!(coarse.circle_segments(0.1), 8);
    }

    #[test]
    fn test_ids_display_and_order() {
        assert_eq!(FaceId(3).to_string(), "F3");
        assert_eq!(EdgeId(7).to_string(), "E7");
        assert!(FaceId(1) < FaceId(2));
    }

    #[test]
    fn test_uv_mid() {
        let b = UvBounds {
            min: Point2::new(0.0, -2.0),
            max: Point2::new(4.0, 2.0),
        };
        let m = b.mid();
        assert!((m.x - 2.0).abs() < 1e-12);
        assert!(m.y.abs() < 1e-12);
    }
}
