#![warn(missing_docs)]

//! CAD kernel contract for the brepscan analysis engine.
//!
//! The engine never parses files, integrates volumes or triangulates
//! surfaces itself. It asks a [`CadKernel`] for topology, geometry
//! parameters and spatial queries, all addressed by the opaque
//! [`FaceId`] / [`EdgeId`] handles defined here.
//!
//! Kernels that are not reentrant can be wrapped in a
//! [`SerializedKernel`], which funnels every call through one lock.

mod error;
mod serialized;
mod traits;
mod types;

pub use error::{KernelError, KernelResult};
pub use serialized::SerializedKernel;
pub use traits::CadKernel;
pub use types::{
    CurveKind, CylinderParams, EdgeId, FaceId, FaceMesh, FaceSample, MassProperties,
    PlaneParams, PointState, RayHit, SurfaceKind, TessellationParams, UvBounds,
};
