//! Bounding volume: the single size reference for every relative-size test.

use brepscan_kernel::CadKernel;
use brepscan_math::{Aabb3, Point3};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Diagonals below this are treated as zero.
const MIN_DIAGONAL: f64 = 1e-9;

/// Bounding box of the solid plus its diagonal.
#[derive(Debug, Clone, Copy)]
pub struct BoundingVolume {
    /// Axis-aligned bounds.
    pub aabb: Aabb3,
    /// `sqrt(dx² + dy² + dz²)`.
    pub diagonal: f64,
}

impl BoundingVolume {
    /// Wrap a box. Fails if it is empty or not finite.
    pub fn from_aabb(aabb: Aabb3) -> AnalysisResult<Self> {
        let finite = [aabb.min, aabb.max]
            .iter()
            .all(|p| p.iter().all(|c| c.is_finite()));
        if aabb.is_empty() || !finite {
            return Err(AnalysisError::DegenerateBounds);
        }
        Ok(Self {
            aabb,
            diagonal: aabb.diagonal(),
        })
    }

    /// Ask the kernel for the solid's bounds.
    pub fn from_kernel<K: CadKernel + ?Sized>(kernel: &K) -> AnalysisResult<Self> {
        Self::from_aabb(kernel.bounding_box()?)
    }

    /// `length / diagonal`, or `None` for a degenerate (zero-size) solid.
    pub fn ratio(&self, length: f64) -> Option<f64> {
        if self.is_degenerate() || !length.is_finite() {
            return None;
        }
        Some(length / self.diagonal)
    }

    /// True when ratio-based classification must be skipped.
    pub fn is_degenerate(&self) -> bool {
        self.diagonal < MIN_DIAGONAL
    }

    /// Box center.
    pub fn center(&self) -> Point3 {
        self.aabb.center()
    }

    /// Largest half-extent along any axis.
    pub fn max_half_extent(&self) -> f64 {
        let s = self.aabb.size();
        0.5 * s.x.max(s.y).max(s.z)
    }

    /// Serializable summary.
    pub fn to_output(&self) -> BoundingBox {
        let s = self.aabb.size();
        let c = self.center();
        BoundingBox {
            min: [self.aabb.min.x, self.aabb.min.y, self.aabb.min.z],
            max: [self.aabb.max.x, self.aabb.max.y, self.aabb.max.z],
            size: [s.x, s.y, s.z],
            diagonal: self.diagonal,
            center: [c.x, c.y, c.z],
        }
    }
}

/// Bounding box as reported to callers (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
    /// Extent per axis.
    pub size: [f64; 3],
    /// Length of the diagonal.
    pub diagonal: f64,
    /// Center point.
    pub center: [f64; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plate_diagonal() {
        let bv = BoundingVolume::from_aabb(Aabb3::new(
            Point3::origin(),
            Point3::new(100.0, 100.0, 20.0),
        ))
        .unwrap();
        let expected = (20_000.0f64 + 400.0).sqrt();
        assert!((bv.diagonal - expected).abs() < 1e-9);
        let r = bv.ratio(10.0).unwrap();
        assert!((r - 10.0 / expected).abs() < 1e-12);
        assert!((bv.max_half_extent() - 50.0).abs() < 1e-12);
        let out = bv.to_output();
        assert_eq!(out.size, [100.0, 100.0, 20.0]);
        assert_eq!(out.center, [50.0, 50.0, 10.0]);
    }

    #[test]
    fn test_zero_diagonal_short_circuits() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let bv = BoundingVolume::from_aabb(Aabb3::new(p, p)).unwrap();
        assert!(bv.is_degenerate());
        assert_eq!(bv.ratio(5.0), None);
    }

    #[test]
    fn test_empty_box_is_fatal() {
        assert!(matches!(
            BoundingVolume::from_aabb(Aabb3::empty()),
            Err(AnalysisError::DegenerateBounds)
        ));
    }
}
