//! Per-face features for non-cylindrical surfaces.

use brepscan_kernel::SurfaceKind;

use crate::config::FeatureSettings;
use crate::edges::{EdgeAnalysis, EdgeClass};
use crate::features::{
    point_array, to_array, ComplexFeature, FilletFeature, ManufacturingFeature, Orientation,
    PlanarFeature,
};
use crate::model::{FaceRecord, ModelGraph};

/// Planar, fillet and complex-surface features, in face order.
///
/// Returns the features and the number of degenerate faces skipped.
pub fn surface_features(
    graph: &ModelGraph,
    edges: &[EdgeAnalysis],
    settings: &FeatureSettings,
) -> (Vec<ManufacturingFeature>, usize) {
    let mut features = Vec::new();
    let mut skipped = 0;
    for face in &graph.faces {
        if face.kind == SurfaceKind::Cylinder {
            continue;
        }
        if face.is_degenerate(settings.min_face_area) {
            tracing::warn!(face = %face.id, area = face.area, "skipping degenerate face");
            skipped += 1;
            continue;
        }
        let position = face
            .centroid
            .or(face.sample.map(|s| s.point))
            .map(|p| point_array(&p))
            .unwrap_or_default();

        let feature = match face.kind {
            SurfaceKind::Plane => {
                let normal = face
                    .plane
                    .map(|p| p.normal.into_inner())
                    .or(face.sample.map(|s| s.normal))
                    .filter(|n| n.norm() > 1e-12);
                let Some(normal) = normal else {
                    tracing::warn!(face = %face.id, "planar face without a normal");
                    skipped += 1;
                    continue;
                };
                let normal = normal.normalize();
                ManufacturingFeature::PlanarFace(PlanarFeature {
                    normal: to_array(&normal),
                    position,
                    area_mm2: face.area,
                    orientation: Orientation::of_plane(&normal),
                    faces: vec![face.id],
                })
            }
            SurfaceKind::Torus if tangent_bounded(face, graph, edges) => {
                ManufacturingFeature::Fillet(FilletFeature {
                    radius_mm: None,
                    surface: SurfaceKind::Torus,
                    position,
                    area_mm2: face.area,
                    faces: vec![face.id],
                })
            }
            kind => ManufacturingFeature::ComplexSurface(ComplexFeature {
                surface: kind,
                position,
                area_mm2: face.area,
                faces: vec![face.id],
            }),
        };
        features.push(feature);
    }
    (features, skipped)
}

/// Every non-seam edge of the face is a smooth transition.
fn tangent_bounded(face: &FaceRecord, graph: &ModelGraph, edges: &[EdgeAnalysis]) -> bool {
    let mut any = false;
    for &e in &face.edges {
        if graph.edges[e].is_seam() {
            continue;
        }
        match edges.get(e).map(|a| a.class) {
            Some(EdgeClass::Smooth { .. }) => any = true,
            _ => return false,
        }
    }
    any
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EdgeRecord;
    use brepscan_kernel::{CurveKind, EdgeId, FaceId, FaceSample, PlaneParams};
    use brepscan_math::{Dir3, Point3, Vec3};

    fn face(id: u32, kind: SurfaceKind) -> FaceRecord {
        let mut f = FaceRecord::new(FaceId(id), kind);
        f.area = 10.0;
        f.centroid = Some(Point3::new(1.0, 2.0, 3.0));
        f
    }

    fn smooth() -> EdgeAnalysis {
        EdgeAnalysis {
            class: EdgeClass::Smooth { angle_deg: 1.0 },
            midpoint: None,
        }
    }

    #[test]
    fn test_planar_orientation_from_params() {
        let mut top = face(0, SurfaceKind::Plane);
        top.plane = Some(PlaneParams {
            origin: Point3::origin(),
            normal: Dir3::new_normalize(Vec3::z()),
        });
        let mut side = face(1, SurfaceKind::Plane);
        side.sample = Some(FaceSample {
            point: Point3::origin(),
            normal: Vec3::new(0.0, -2.0, 0.0),
        });
        let graph = ModelGraph::new(vec![top, side], Vec::new());
        let (features, skipped) = surface_features(&graph, &[], &FeatureSettings::default());
        assert_eq!(skipped, 0);
        match (&features[0], &features[1]) {
            (ManufacturingFeature::PlanarFace(a), ManufacturingFeature::PlanarFace(b)) => {
                assert_eq!(a.orientation, Orientation::Top);
                assert_eq!(b.orientation, Orientation::SideY);
                assert!((b.normal[1] + 1.0).abs() < 1e-12);
                assert_eq!(a.position, [1.0, 2.0, 3.0]);
            }
            other => panic!("unexpected features {other:?}"),
        }
    }

    #[test]
    fn test_torus_fillet_and_complex() {
        let torus = face(0, SurfaceKind::Torus);
        let plane = face(1, SurfaceKind::Plane);
        let cone = face(2, SurfaceKind::Cone);
        let edge = |id, faces| EdgeRecord {
            id: EdgeId(id),
            curve: Some(CurveKind::Circle),
            faces,
            range: Some((0.0, 1.0)),
        };
        let graph = ModelGraph::new(
            vec![torus, plane, cone],
            vec![edge(0, vec![0, 1]), edge(1, vec![0, 2])],
        );
        let edges = vec![smooth(), smooth()];
        let (features, skipped) = surface_features(&graph, &edges, &FeatureSettings::default());
        // The plane has no normal at all and is skipped.
        assert_eq!(skipped, 1);
        assert_eq!(features.len(), 2);
        assert!(matches!(features[0], ManufacturingFeature::Fillet(_)));
        match &features[1] {
            ManufacturingFeature::ComplexSurface(c) => assert_eq!(c.surface, SurfaceKind::Cone),
            other => panic!("expected complex surface, got {other:?}"),
        }

        // One sharp edge turns the torus into a complex surface.
        let sharp = EdgeAnalysis {
            class: EdgeClass::Sharp { angle_deg: 90.0 },
            midpoint: None,
        };
        let (features, _) =
            surface_features(&graph, &[smooth(), sharp], &FeatureSettings::default());
        assert!(matches!(
            features[0],
            ManufacturingFeature::ComplexSurface(_)
        ));
    }

    #[test]
    fn test_degenerate_faces_skipped() {
        let mut sphere = face(0, SurfaceKind::Sphere);
        sphere.area = 0.0;
        let graph = ModelGraph::new(vec![sphere], Vec::new());
        let (features, skipped) = surface_features(&graph, &[], &FeatureSettings::default());
        assert!(features.is_empty());
        assert_eq!(skipped, 1);
    }
}
