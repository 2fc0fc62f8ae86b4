#![warn(missing_docs)]

//! Exact reference kernel for the brepscan engine.
//!
//! Models rectangular stock with axis-aligned drilled holes, counterbores
//! and bosses. Every query is answered in closed form, which makes the
//! kernel suitable for tests, benchmarks and the command-line tool.
//!
//! ```
//! use brepscan_kernel::CadKernel;
//! use brepscan_kernel_analytic::{AnalyticKernel, PartSpec, StockFace};
//!
//! let part = PartSpec::block([100.0, 100.0, 20.0])
//!     .through_hole(StockFace::Top, [50.0, 50.0], 10.0);
//! let kernel = AnalyticKernel::new(part).unwrap();
//! assert_eq!(kernel.faces().unwrap().len(), 7);
//! ```

mod part;
mod ray;
mod solid;
mod tessellate;

pub use part::{AxisFrame, FeatureSpec, PartSpec, Stock, StockFace};
pub use ray::Ray;

use brepscan_kernel::{
    CadKernel, CurveKind, CylinderParams, EdgeId, FaceId, FaceMesh, FaceSample, KernelError,
    KernelResult, MassProperties, PlaneParams, PointState, RayHit, SurfaceKind,
    TessellationParams, UvBounds,
};
use brepscan_math::{Aabb3, Dir3, Point2, Point3, Vec3};
use tracing::debug;

use solid::{EdgeEntry, EdgeGeom, FaceGeom, Solid};

/// A [`CadKernel`] over one [`PartSpec`].
#[derive(Debug, Clone)]
pub struct AnalyticKernel {
    part: PartSpec,
    solid: Solid,
}

impl AnalyticKernel {
    /// Validate and build the part.
    pub fn new(part: PartSpec) -> KernelResult<Self> {
        let solid = solid::build(&part)?;
        debug!(
            faces = solid.faces.len(),
            edges = solid.edges.len(),
            volume = solid.volume,
            "built analytic solid"
        );
        Ok(Self { part, solid })
    }

    /// Parse a JSON part description and build it.
    pub fn from_json(json: &str) -> KernelResult<Self> {
        Self::new(PartSpec::from_json(json)?)
    }

    /// The part this kernel was built from.
    pub fn part(&self) -> &PartSpec {
        &self.part
    }

    fn face(&self, id: FaceId) -> KernelResult<&FaceGeom> {
        self.solid
            .faces
            .get(id.0 as usize)
            .ok_or(KernelError::UnknownFace(id))
    }

    fn edge(&self, id: EdgeId) -> KernelResult<&EdgeEntry> {
        self.solid
            .edges
            .get(id.0 as usize)
            .ok_or(KernelError::UnknownEdge(id))
    }
}

impl CadKernel for AnalyticKernel {
    fn name(&self) -> &str {
        "analytic"
    }

    fn faces(&self) -> KernelResult<Vec<FaceId>> {
        Ok((0..self.solid.faces.len() as u32).map(FaceId).collect())
    }

    fn edges(&self) -> KernelResult<Vec<EdgeId>> {
        Ok((0..self.solid.edges.len() as u32).map(EdgeId).collect())
    }

    fn edge_faces(&self, edge: EdgeId) -> KernelResult<Vec<FaceId>> {
        Ok(self.edge(edge)?.faces.clone())
    }

    fn surface_kind(&self, face: FaceId) -> KernelResult<SurfaceKind> {
        Ok(match self.face(face)? {
            FaceGeom::Planar { .. } => SurfaceKind::Plane,
            FaceGeom::Cylinder { .. } => SurfaceKind::Cylinder,
        })
    }

    fn cylinder_params(&self, face: FaceId) -> KernelResult<Option<CylinderParams>> {
        Ok(match self.face(face)? {
            FaceGeom::Cylinder { section: s, .. } => Some(CylinderParams {
                origin: s.frame.point(s.center[0], s.center[1], s.lo),
                axis: Dir3::new_normalize(s.frame.vector(0.0, 0.0, 1.0)),
                radius: s.radius,
            }),
            FaceGeom::Planar { .. } => None,
        })
    }

    fn plane_params(&self, face: FaceId) -> KernelResult<Option<PlaneParams>> {
        let geom = self.face(face)?;
        Ok(match geom {
            FaceGeom::Planar { frame, sign, .. } => Some(PlaneParams {
                origin: geom.centroid(),
                normal: Dir3::new_normalize(frame.vector(0.0, 0.0, *sign)),
            }),
            FaceGeom::Cylinder { .. } => None,
        })
    }

    fn face_area(&self, face: FaceId) -> KernelResult<f64> {
        Ok(self.face(face)?.area())
    }

    fn face_centroid(&self, face: FaceId) -> KernelResult<Point3> {
        Ok(self.face(face)?.centroid())
    }

    fn face_uv_bounds(&self, face: FaceId) -> KernelResult<UvBounds> {
        let (min, max) = self.face(face)?.uv_bounds();
        Ok(UvBounds { min, max })
    }

    fn surface_point(&self, face: FaceId, uv: Point2) -> KernelResult<Point3> {
        Ok(self.face(face)?.point(uv))
    }

    fn surface_normal(&self, face: FaceId, uv: Point2) -> KernelResult<Vec3> {
        Ok(self.face(face)?.normal(uv))
    }

    fn project_point(&self, face: FaceId, p: &Point3) -> KernelResult<Point2> {
        Ok(self.face(face)?.project(p))
    }

    fn face_sample(&self, face: FaceId) -> KernelResult<FaceSample> {
        let geom = self.face(face)?;
        let uv = geom.sample_uv();
        Ok(FaceSample {
            point: geom.point(uv),
            normal: geom.normal(uv),
        })
    }

    fn point_in_solid(&self, p: &Point3, tol: f64) -> KernelResult<PointState> {
        let d = self.solid.signed_distance(p);
        if !d.is_finite() {
            return Err(KernelError::Query(format!("non-finite distance at {p}")));
        }
        Ok(if d < -tol {
            PointState::In
        } else if d > tol {
            PointState::Out
        } else {
            PointState::On
        })
    }

    fn ray_intersect(
        &self,
        origin: &Point3,
        dir: &Vec3,
        range: (f64, f64),
    ) -> KernelResult<Vec<RayHit>> {
        if dir.norm() < 1e-12 || !dir.iter().all(|c| c.is_finite()) {
            return Err(KernelError::Query("degenerate ray direction".into()));
        }
        let ray = Ray::new(*origin, *dir);
        let mut hits: Vec<RayHit> = self
            .solid
            .faces
            .iter()
            .enumerate()
            .flat_map(|(i, geom)| {
                geom.ray_hits(&ray).into_iter().map(move |t| RayHit {
                    face: FaceId(i as u32),
                    t,
                })
            })
            .filter(|h| h.t >= range.0 && h.t <= range.1)
            .collect();
        hits.sort_by(|a, b| a.t.total_cmp(&b.t).then(a.face.cmp(&b.face)));
        Ok(hits)
    }

    fn curve_kind(&self, edge: EdgeId) -> KernelResult<CurveKind> {
        Ok(match self.edge(edge)?.geom {
            EdgeGeom::Line { .. } => CurveKind::Line,
            EdgeGeom::Circle { .. } => CurveKind::Circle,
        })
    }

    fn curve_range(&self, edge: EdgeId) -> KernelResult<(f64, f64)> {
        Ok(self.edge(edge)?.geom.range())
    }

    fn curve_point(&self, edge: EdgeId, t: f64) -> KernelResult<Point3> {
        Ok(self.edge(edge)?.geom.point(t))
    }

    fn triangulate(&self, face: FaceId, params: &TessellationParams) -> KernelResult<FaceMesh> {
        Ok(tessellate::triangulate_face(self.face(face)?, params))
    }

    fn bounding_box(&self) -> KernelResult<Aabb3> {
        Ok(self.solid.bounds)
    }

    fn mass_properties(&self) -> KernelResult<MassProperties> {
        Ok(MassProperties {
            volume: self.solid.volume,
            surface_area: self.solid.surface_area(),
        })
    }
}
