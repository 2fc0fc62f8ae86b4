//! The kernel trait the analysis engine is written against.

use brepscan_math::{Aabb3, Point2, Point3, Vec3};

use crate::{
    CurveKind, CylinderParams, EdgeId, FaceId, FaceMesh, FaceSample, KernelResult,
    MassProperties, PlaneParams, PointState, RayHit, SurfaceKind, TessellationParams, UvBounds,
};

/// Read-only queries against one loaded solid.
///
/// Implementations must be safe to query from several threads at once.
/// A kernel that is not reentrant should be wrapped in
/// [`SerializedKernel`](crate::SerializedKernel).
///
/// Normals returned by [`surface_normal`](CadKernel::surface_normal) are
/// expected to point out of the material. The engine tolerates kernels
/// that get this wrong and re-orients them with membership tests.
pub trait CadKernel: Send + Sync {
    /// Short name of the kernel for diagnostics.
    fn name(&self) -> &str;

    // =========================================================================
    // Topology
    // =========================================================================

    /// All faces of the solid, in a stable order.
    fn faces(&self) -> KernelResult<Vec<FaceId>>;

    /// All edges of the solid, in a stable order.
    fn edges(&self) -> KernelResult<Vec<EdgeId>>;

    /// Faces incident to an edge: one for a free boundary, two otherwise.
    /// A seam edge lists the same face twice.
    fn edge_faces(&self, edge: EdgeId) -> KernelResult<Vec<FaceId>>;

    // =========================================================================
    // Face geometry
    // =========================================================================

    /// Surface type of a face.
    fn surface_kind(&self, face: FaceId) -> KernelResult<SurfaceKind>;

    /// Axis and radius, or `None` if the face is not cylindrical.
    fn cylinder_params(&self, face: FaceId) -> KernelResult<Option<CylinderParams>>;

    /// Supporting plane, or `None` if the face is not planar.
    fn plane_params(&self, face: FaceId) -> KernelResult<Option<PlaneParams>>;

    /// Face area in mm².
    fn face_area(&self, face: FaceId) -> KernelResult<f64>;

    /// Area centroid of the face.
    fn face_centroid(&self, face: FaceId) -> KernelResult<Point3>;

    /// Parameter rectangle of the face.
    fn face_uv_bounds(&self, face: FaceId) -> KernelResult<UvBounds>;

    /// Evaluate the surface at `uv`.
    fn surface_point(&self, face: FaceId, uv: Point2) -> KernelResult<Point3>;

    /// Outward surface normal at `uv`.
    fn surface_normal(&self, face: FaceId, uv: Point2) -> KernelResult<Vec3>;

    /// Parameters of the surface point closest to `p`.
    fn project_point(&self, face: FaceId, p: &Point3) -> KernelResult<Point2>;

    /// A representative point on the face and its normal.
    ///
    /// Defaults to the parameter-space midpoint. Kernels whose midpoint can
    /// fall outside the trimmed face (a plate with a centered hole) should
    /// override this.
    fn face_sample(&self, face: FaceId) -> KernelResult<FaceSample> {
        let uv = self.face_uv_bounds(face)?.mid();
        Ok(FaceSample {
            point: self.surface_point(face, uv)?,
            normal: self.surface_normal(face, uv)?,
        })
    }

    // =========================================================================
    // Spatial queries
    // =========================================================================

    /// Classify a point against the solid.
    fn point_in_solid(&self, p: &Point3, tol: f64) -> KernelResult<PointState>;

    /// All face crossings of the ray `origin + t·dir` for `t` in `range`,
    /// sorted by increasing `t`.
    fn ray_intersect(
        &self,
        origin: &Point3,
        dir: &Vec3,
        range: (f64, f64),
    ) -> KernelResult<Vec<RayHit>>;

    // =========================================================================
    // Edge geometry
    // =========================================================================

    /// Curve type of an edge.
    fn curve_kind(&self, edge: EdgeId) -> KernelResult<CurveKind>;

    /// Parameter range `(t0, t1)` of the edge's curve.
    fn curve_range(&self, edge: EdgeId) -> KernelResult<(f64, f64)>;

    /// Evaluate the edge's curve at `t`.
    fn curve_point(&self, edge: EdgeId, t: f64) -> KernelResult<Point3>;

    // =========================================================================
    // Whole solid
    // =========================================================================

    /// Triangulate one face.
    fn triangulate(&self, face: FaceId, params: &TessellationParams) -> KernelResult<FaceMesh>;

    /// Axis-aligned bounds of the solid.
    fn bounding_box(&self) -> KernelResult<Aabb3>;

    /// Volume and surface area of the solid.
    fn mass_properties(&self) -> KernelResult<MassProperties>;
}
