#![warn(missing_docs)]

//! Math types for the brepscan analysis engine.
//!
//! Thin wrappers around nalgebra providing the domain types shared by the
//! kernel contract and the analysis passes: points, vectors, directions
//! and axis-aligned boxes, plus the few line and angle helpers the passes
//! share.

use nalgebra::{Unit, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// True if no point has been included yet (min > max on some axis).
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Extent along each axis. Zero for an empty box.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::zeros();
        }
        self.max - self.min
    }

    /// Length of the box diagonal: `sqrt(dx² + dy² + dz²)`.
    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }

    /// Center point of the box.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }
}

/// An arbitrary unit vector perpendicular to `v`.
///
/// Picks the world axis least aligned with `v` as the reference, so the
/// result is stable for a given input.
pub fn perpendicular(v: &Vec3) -> Vec3 {
    let arbitrary = if v.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    let p = arbitrary.cross(v);
    let len = p.norm();
    if len < 1e-300 {
        return Vec3::z();
    }
    p / len
}

/// Angle in radians between two vectors, `acos(clamp(â·b̂, -1, 1))`.
///
/// Returns `None` if either vector has (near) zero length or is not finite.
pub fn angle_between(a: &Vec3, b: &Vec3) -> Option<f64> {
    let la = a.norm();
    let lb = b.norm();
    if !(la.is_finite() && lb.is_finite()) || la < 1e-12 || lb < 1e-12 {
        return None;
    }
    let cos = (a.dot(b) / (la * lb)).clamp(-1.0, 1.0);
    Some(cos.acos())
}

/// Perpendicular distance from point `p` to the infinite line through
/// `origin` with unit direction `dir`.
pub fn point_line_distance(p: &Point3, origin: &Point3, dir: &Dir3) -> f64 {
    let d = p - origin;
    (d - d.dot(dir.as_ref()) * dir.as_ref()).norm()
}

/// Shortest distance between two infinite lines.
///
/// Nearly parallel lines fall back to the point-to-line distance, which is
/// what coaxiality tests want.
pub fn line_line_distance(o1: &Point3, d1: &Dir3, o2: &Point3, d2: &Dir3) -> f64 {
    let n = d1.as_ref().cross(d2.as_ref());
    let n_len = n.norm();
    if n_len < 1e-9 {
        return point_line_distance(o2, o1, d1);
    }
    ((o2 - o1).dot(&n) / n_len).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_aabb_diagonal_and_center() {
        let mut bb = Aabb3::empty();
        assert!(bb.is_empty());
        assert_eq!(bb.diagonal(), 0.0);
        bb.include_point(&Point3::new(0.0, 0.0, 0.0));
        bb.include_point(&Point3::new(100.0, 100.0, 20.0));
        let expected = (100.0f64 * 100.0 + 100.0 * 100.0 + 20.0 * 20.0).sqrt();
        assert!((bb.diagonal() - expected).abs() < 1e-9);
        let c = bb.center();
        assert!((c.x - 50.0).abs() < 1e-12);
        assert!((c.z - 10.0).abs() < 1e-12);
        assert_eq!(bb.size(), Vec3::new(100.0, 100.0, 20.0));
    }

    #[test]
    fn test_perpendicular_is_unit_and_orthogonal() {
        for v in [Vec3::x(), Vec3::y(), Vec3::z(), Vec3::new(1.0, 2.0, -3.0)] {
            let p = perpendicular(&v);
            assert!((p.norm() - 1.0).abs() < 1e-12);
            assert!(p.dot(&v).abs() < 1e-12);
        }
    }

    #[test]
    fn test_angle_between() {
        let a = angle_between(&Vec3::x(), &Vec3::y()).unwrap();
        assert!((a - PI / 2.0).abs() < 1e-12);
        let b = angle_between(&Vec3::x(), &(-Vec3::x())).unwrap();
        assert!((b - PI).abs() < 1e-12);
        // Slightly-over-unit dot products must not produce NaN
        let c = angle_between(&Vec3::new(1.0, 1e-17, 0.0), &Vec3::x()).unwrap();
        assert!(c.abs() < 1e-8);
        assert!(angle_between(&Vec3::zeros(), &Vec3::x()).is_none());
    }

    #[test]
    fn test_line_distances() {
        let z = Dir3::new_normalize(Vec3::z());
        let d = line_line_distance(&Point3::origin(), &z, &Point3::new(3.0, 4.0, 7.0), &z);
        assert!((d - 5.0).abs() < 1e-12);

        let x = Dir3::new_normalize(Vec3::x());
        // Skew lines: Z axis and an X-parallel line at z=2, y=1
        let d = line_line_distance(&Point3::origin(), &z, &Point3::new(0.0, 1.0, 2.0), &x);
        assert!((d - 1.0).abs() < 1e-12);

        let p = point_line_distance(&Point3::new(0.0, 2.0, 9.0), &Point3::origin(), &z);
        assert!((p - 2.0).abs() < 1e-12);
    }
}
