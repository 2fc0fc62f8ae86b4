//! Mutual-exclusion wrapper for kernels that are not reentrant.

use brepscan_math::{Aabb3, Point2, Point3, Vec3};
use parking_lot::Mutex;

use crate::{
    CadKernel, CurveKind, CylinderParams, EdgeId, FaceId, FaceMesh, FaceSample, KernelResult,
    MassProperties, PlaneParams, PointState, RayHit, SurfaceKind, TessellationParams, UvBounds,
};

/// Forwards every query to the inner kernel while holding one lock.
///
/// Parallel passes in the engine still work, they just queue on the lock.
pub struct SerializedKernel<K> {
    inner: Mutex<K>,
    name: String,
}

impl<K: CadKernel> SerializedKernel<K> {
    /// Wrap a kernel.
    pub fn new(kernel: K) -> Self {
        let name = format!("serialized({})", kernel.name());
        Self {
            inner: Mutex::new(kernel),
            name,
        }
    }

    /// Unwrap the inner kernel.
    pub fn into_inner(self) -> K {
        self.inner.into_inner()
    }
}

impl<K: CadKernel> CadKernel for SerializedKernel<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn faces(&self) -> KernelResult<Vec<FaceId>> {
        self.inner.lock().faces()
    }

    fn edges(&self) -> KernelResult<Vec<EdgeId>> {
        self.inner.lock().edges()
    }

    fn edge_faces(&self, edge: EdgeId) -> KernelResult<Vec<FaceId>> {
        self.inner.lock().edge_faces(edge)
    }

    fn surface_kind(&self, face: FaceId) -> KernelResult<SurfaceKind> {
        self.inner.lock().surface_kind(face)
    }

    fn cylinder_params(&self, face: FaceId) -> KernelResult<Option<CylinderParams>> {
        self.inner.lock().cylinder_params(face)
    }

    fn plane_params(&self, face: FaceId) -> KernelResult<Option<PlaneParams>> {
        self.inner.lock().plane_params(face)
    }

    fn face_area(&self, face: FaceId) -> KernelResult<f64> {
        self.inner.lock().face_area(face)
    }

    fn face_centroid(&self, face: FaceId) -> KernelResult<Point3> {
        self.inner.lock().face_centroid(face)
    }

    fn face_uv_bounds(&self, face: FaceId) -> KernelResult<UvBounds> {
        self.inner.lock().face_uv_bounds(face)
    }

    fn surface_point(&self, face: FaceId, uv: Point2) -> KernelResult<Point3> {
        self.inner.lock().surface_point(face, uv)
    }

    fn surface_normal(&self, face: FaceId, uv: Point2) -> KernelResult<Vec3> {
        self.inner.lock().surface_normal(face, uv)
    }

    fn project_point(&self, face: FaceId, p: &Point3) -> KernelResult<Point2> {
        self.inner.lock().project_point(face, p)
    }

    fn face_sample(&self, face: FaceId) -> KernelResult<FaceSample> {
        self.inner.lock().face_sample(face)
    }

    fn point_in_solid(&self, p: &Point3, tol: f64) -> KernelResult<PointState> {
        self.inner.lock().point_in_solid(p, tol)
    }

    fn ray_intersect(
        &self,
        origin: &Point3,
        dir: &Vec3,
        range: (f64, f64),
    ) -> KernelResult<Vec<RayHit>> {
        self.inner.lock().ray_intersect(origin, dir, range)
    }

    fn curve_kind(&self, edge: EdgeId) -> KernelResult<CurveKind> {
        self.inner.lock().curve_kind(edge)
    }

    fn curve_range(&self, edge: EdgeId) -> KernelResult<(f64, f64)> {
        self.inner.lock().curve_range(edge)
    }

    fn curve_point(&self, edge: EdgeId, t: f64) -> KernelResult<Point3> {
        self.inner.lock().curve_point(edge, t)
    }

    fn triangulate(&self, face: FaceId, params: &TessellationParams) -> KernelResult<FaceMesh> {
        self.inner.lock().triangulate(face, params)
    }

    fn bounding_box(&self) -> KernelResult<Aabb3> {
        self.inner.lock().bounding_box()
    }

    fn mass_properties(&self) -> KernelResult<MassProperties> {
        self.inner.lock().mass_properties()
    }
}
