//! Part summary and feature tree.

use brepscan_kernel::SurfaceKind;
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingVolume;
use crate::features::{ManufacturingFeature, Orientation};
use crate::model::ModelGraph;

/// Face counts per surface type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceCounts {
    /// All faces.
    pub total: usize,
    /// Planes.
    pub planar: usize,
    /// Cylinders.
    pub cylindrical: usize,
    /// Cones.
    pub conical: usize,
    /// Spheres.
    pub spherical: usize,
    /// Tori.
    pub toroidal: usize,
    /// Everything else.
    pub freeform: usize,
}

impl FaceCounts {
    /// Tally the arena.
    pub fn from_graph(graph: &ModelGraph) -> Self {
        let mut c = FaceCounts {
            total: graph.face_count(),
            ..Default::default()
        };
        for face in &graph.faces {
            match face.kind {
                SurfaceKind::Plane => c.planar += 1,
                SurfaceKind::Cylinder => c.cylindrical += 1,
                SurfaceKind::Cone => c.conical += 1,
                SurfaceKind::Sphere => c.spherical += 1,
                SurfaceKind::Torus => c.toroidal += 1,
                SurfaceKind::Freeform => c.freeform += 1,
            }
        }
        c
    }
}

/// Overall part dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrincipalDimensions {
    /// Turned part.
    Cylindrical {
        /// Larger of the X and Y extents.
        major_diameter_mm: f64,
        /// Z extent.
        length_mm: f64,
    },
    /// Milled part.
    Prismatic {
        /// X extent.
        width_mm: f64,
        /// Y extent.
        height_mm: f64,
        /// Z extent.
        depth_mm: f64,
    },
}

impl PrincipalDimensions {
    fn new(bounds: &BoundingVolume, cylindrical: bool) -> Self {
        let s = bounds.aabb.size();
        if cylindrical {
            PrincipalDimensions::Cylindrical {
                major_diameter_mm: s.x.max(s.y),
                length_mm: s.z,
            }
        } else {
            PrincipalDimensions::Prismatic {
                width_mm: s.x,
                height_mm: s.y,
                depth_mm: s.z,
            }
        }
    }
}

/// Whole-part statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSummary {
    /// Faces per surface type.
    pub face_counts: FaceCounts,
    /// More than 40 % of the faces are cylinders.
    pub is_cylindrical: bool,
    /// More than two planar faces.
    pub has_flat_surfaces: bool,
    /// `clamp(faces / 10 + 3, 1, 10)`.
    pub complexity_score: u32,
    /// Through and blind holes.
    pub holes_count: usize,
    /// Grooves.
    pub grooves_count: usize,
    /// Overall dimensions.
    pub dimensions: PrincipalDimensions,
}

impl PartSummary {
    /// Summarize a part.
    pub fn new(
        graph: &ModelGraph,
        bounds: &BoundingVolume,
        features: &[ManufacturingFeature],
    ) -> Self {
        let face_counts = FaceCounts::from_graph(graph);
        let total = face_counts.total;
        let is_cylindrical = total > 0 && face_counts.cylindrical as f64 > 0.4 * total as f64;
        let complexity_score = (total / 10 + 3).clamp(1, 10) as u32;
        let holes_count = features
            .iter()
            .filter(|f| {
                matches!(
                    f,
                    ManufacturingFeature::ThroughHole(_) | ManufacturingFeature::BlindHole(_)
                )
            })
            .count();
        let grooves_count = features
            .iter()
            .filter(|f| matches!(f, ManufacturingFeature::Groove(_)))
            .count();
        Self {
            face_counts,
            is_cylindrical,
            has_flat_surfaces: face_counts.planar > 2,
            complexity_score,
            holes_count,
            grooves_count,
            dimensions: PrincipalDimensions::new(bounds, is_cylindrical),
        }
    }
}

/// Features grouped under one orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientedSection {
    /// Section key.
    pub orientation: Orientation,
    /// Indices into the result's feature list.
    pub features: Vec<usize>,
}

/// Features arranged for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTree {
    /// Overall dimensions.
    pub common_dimensions: PrincipalDimensions,
    /// One section per orientation, in first-seen order.
    pub oriented_sections: Vec<OrientedSection>,
}

impl FeatureTree {
    /// Group oriented features. Features without an orientation are left out.
    pub fn new(summary: &PartSummary, features: &[ManufacturingFeature]) -> Self {
        let mut sections: Vec<OrientedSection> = Vec::new();
        for (i, feature) in features.iter().enumerate() {
            let Some(orientation) = feature.orientation() else {
                continue;
            };
            match sections.iter_mut().find(|s| s.orientation == orientation) {
                Some(section) => section.features.push(i),
                None => sections.push(OrientedSection {
                    orientation,
                    features: vec![i],
                }),
            }
        }
        Self {
            common_dimensions: summary.dimensions,
            oriented_sections: sections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ComplexFeature, PlanarFeature};
    use crate::model::FaceRecord;
    use brepscan_kernel::FaceId;
    use brepscan_math::{Aabb3, Point3};

    fn graph(kinds: &[SurfaceKind]) -> ModelGraph {
        let faces = kinds
            .iter()
            .enumerate()
            .map(|(i, &k)| FaceRecord::new(FaceId(i as u32), k))
            .collect();
        ModelGraph::new(faces, Vec::new())
    }

    fn bounds() -> BoundingVolume {
        let aabb = Aabb3::new(Point3::origin(), Point3::new(40.0, 30.0, 100.0));
        BoundingVolume::from_aabb(aabb).unwrap()
    }

    fn planar(orientation: Orientation) -> ManufacturingFeature {
        ManufacturingFeature::PlanarFace(PlanarFeature {
            normal: [0.0, 0.0, 1.0],
            position: [0.0; 3],
            area_mm2: 1.0,
            orientation,
            faces: vec![FaceId(0)],
        })
    }

    #[test]
    fn test_cylindrical_part() {
        use SurfaceKind::*;
        let g = graph(&[Cylinder, Cylinder, Cylinder, Plane, Plane]);
        let s = PartSummary::new(&g, &bounds(), &[]);
        assert!(s.is_cylindrical);
        assert!(!s.has_flat_surfaces);
        assert_eq!(s.complexity_score, 3);
        assert_eq!(
            s.dimensions,
            PrincipalDimensions::Cylindrical {
                major_diameter_mm: 40.0,
                length_mm: 100.0
            }
        );
    }

    #[test]
    fn test_forty_percent_is_not_cylindrical() {
        use SurfaceKind::*;
        let g = graph(&[Cylinder, Cylinder, Plane, Plane, Plane]);
        let s = PartSummary::new(&g, &bounds(), &[]);
        assert!(!s.is_cylindrical);
        assert!(s.has_flat_surfaces);
        assert!(matches!(
            s.dimensions,
            PrincipalDimensions::Prismatic { .. }
        ));
    }

    #[test]
    fn test_complexity_clamped() {
        let g = graph(&vec![SurfaceKind::Plane; 250]);
        let s = PartSummary::new(&g, &bounds(), &[]);
        assert_eq!(s.complexity_score, 10);
        assert_eq!(s.face_counts.planar, 250);
    }

    #[test]
    fn test_sections_in_first_seen_order() {
        let features = vec![
            planar(Orientation::Bottom),
            planar(Orientation::Top),
            ManufacturingFeature::ComplexSurface(ComplexFeature {
                surface: SurfaceKind::Sphere,
                position: [0.0; 3],
                area_mm2: 1.0,
                faces: vec![FaceId(2)],
            }),
            planar(Orientation::Bottom),
        ];
        let g = graph(&[SurfaceKind::Plane]);
        let summary = PartSummary::new(&g, &bounds(), &features);
        let tree = FeatureTree::new(&summary, &features);
        assert_eq!(tree.oriented_sections.len(), 2);
        assert_eq!(tree.oriented_sections[0].orientation, Orientation::Bottom);
        assert_eq!(tree.oriented_sections[0].features, vec![0, 3]);
        assert_eq!(tree.oriented_sections[1].features, vec![1]);
    }
}
