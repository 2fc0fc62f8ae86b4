//! Display mesh assembly.
//!
//! Per-face triangulations are appended into one flat buffer. Vertices are
//! never shared between faces, so every vertex carries exactly one face's
//! label and colors do not bleed across face boundaries.

use brepscan_kernel::{CadKernel, FaceId, FaceMesh, KernelError, TessellationParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::budget::Deadline;
use crate::config::MeshSettings;
use crate::labels::FaceLabel;
use crate::model::ModelGraph;

/// Why one face was left out of the display mesh.
#[derive(Debug, Clone, Error)]
pub enum MeshError {
    /// The kernel could not triangulate the face.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// A triangle refers past the end of the face's vertex list.
    #[error("index {index} out of range for {vertices} vertices")]
    IndexOutOfRange {
        /// Offending index.
        index: u32,
        /// Vertices the face has.
        vertices: u32,
    },
}

/// Triangle mesh with per-vertex labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayMesh {
    /// Flat positions `[x0, y0, z0, x1, ...]` in mm.
    pub vertices: Vec<f32>,
    /// Flat unit normals, same length as `vertices`.
    pub normals: Vec<f32>,
    /// Triangle indices.
    pub indices: Vec<u32>,
    /// Label of each vertex.
    pub vertex_labels: Vec<FaceLabel>,
    /// Owning face of each vertex.
    pub vertex_faces: Vec<FaceId>,
    /// `indices.len() / 3`.
    pub triangle_count: usize,
}

impl DisplayMesh {
    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Append one face's triangulation, painted with `label`.
    ///
    /// Trailing partial triangles are dropped. Fails on out-of-range
    /// indices without modifying the mesh.
    pub fn append_face(
        &mut self,
        face: FaceId,
        label: FaceLabel,
        mesh: &FaceMesh,
    ) -> Result<(), MeshError> {
        let count = mesh.num_vertices() as u32;
        let indices = &mesh.indices[..mesh.indices.len() - mesh.indices.len() % 3];
        if let Some(&index) = indices.iter().find(|&&i| i >= count) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertices: count,
            });
        }
        let offset = self.num_vertices() as u32;
        let vertices = &mesh.vertices[..3 * count as usize];
        self.vertices.extend_from_slice(vertices);
        if mesh.normals.len() == vertices.len() && mesh.normals.iter().all(|c| c.is_finite()) {
            self.normals.extend_from_slice(&mesh.normals);
        } else {
            self.normals.extend(recompute_normals(vertices, indices));
        }
        self.indices.extend(indices.iter().map(|&i| i + offset));
        self.vertex_labels
            .extend(std::iter::repeat(label).take(count as usize));
        self.vertex_faces
            .extend(std::iter::repeat(face).take(count as usize));
        self.triangle_count = self.indices.len() / 3;
        Ok(())
    }
}

/// Area-weighted vertex normals from the face's own triangles.
fn recompute_normals(vertices: &[f32], indices: &[u32]) -> Vec<f32> {
    let at = |i: u32| {
        let i = 3 * i as usize;
        [vertices[i] as f64, vertices[i + 1] as f64, vertices[i + 2] as f64]
    };
    let mut acc = vec![[0.0f64; 3]; vertices.len() / 3];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (at(tri[0]), at(tri[1]), at(tri[2]));
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        for &v in tri {
            for k in 0..3 {
                acc[v as usize][k] += n[k];
            }
        }
    }
    acc.iter()
        .flat_map(|n| {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            if len > 1e-20 {
                [(n[0] / len) as f32, (n[1] / len) as f32, (n[2] / len) as f32]
            } else {
                [0.0, 0.0, 1.0]
            }
        })
        .collect()
}

/// Tessellation parameters for a solid with the given diagonal.
pub fn tessellation_params(settings: &MeshSettings, diagonal: f64) -> TessellationParams {
    let linear = settings
        .linear_deflection
        .unwrap_or(settings.quality.deflection_ratio() * diagonal);
    TessellationParams {
        linear_deflection: linear,
        angular_deflection: settings.angular_deflection,
    }
}

/// Mesh assembly result.
#[derive(Debug, Clone, Default)]
pub struct MeshAssembly {
    /// The merged mesh.
    pub mesh: DisplayMesh,
    /// Faces whose triangulation failed.
    pub failed_faces: usize,
    /// Stopped early on the time budget.
    pub truncated: bool,
}

/// Triangulate every face in arena order and paint it with its label.
pub(crate) fn assemble(
    kernel: &dyn CadKernel,
    graph: &ModelGraph,
    labels: &[FaceLabel],
    params: &TessellationParams,
    deadline: &Deadline,
) -> MeshAssembly {
    let mut out = MeshAssembly::default();
    for (i, face) in graph.faces.iter().enumerate() {
        if deadline.expired() {
            tracing::warn!(faces = i, "time budget exhausted during meshing");
            out.truncated = true;
            break;
        }
        let label = labels.get(i).copied().unwrap_or(FaceLabel::Outer);
        let result = kernel
            .triangulate(face.id, params)
            .map_err(MeshError::from)
            .and_then(|m| out.mesh.append_face(face.id, label, &m));
        if let Err(e) = result {
            tracing::warn!(face = %face.id, error = %e, "skipping face in display mesh");
            out.failed_faces += 1;
        }
    }
    tracing::debug!(
        vertices = out.mesh.num_vertices(),
        triangles = out.mesh.triangle_count,
        "assembled display mesh"
    );
    out
}
