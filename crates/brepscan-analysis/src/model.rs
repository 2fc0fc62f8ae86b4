//! Arena view of a solid's faces and edges.
//!
//! Everything downstream addresses faces and edges by dense `usize` index
//! into [`ModelGraph::faces`] / [`ModelGraph::edges`]. Kernel handles only
//! appear at the boundaries (extraction and output).

use std::collections::HashMap;

use brepscan_kernel::{
    CadKernel, CurveKind, CylinderParams, EdgeId, FaceId, FaceSample, PlaneParams, SurfaceKind,
};
use brepscan_math::Point3;

use crate::budget::Deadline;
use crate::config::BudgetSettings;

/// One face and its cached geometry.
#[derive(Debug, Clone)]
pub struct FaceRecord {
    /// Kernel handle.
    pub id: FaceId,
    /// Surface type.
    pub kind: SurfaceKind,
    /// Axis and radius for cylinders whose parameters could be read.
    pub cylinder: Option<CylinderParams>,
    /// Supporting plane for planes whose parameters could be read.
    pub plane: Option<PlaneParams>,
    /// Area in mm², `0.0` if unavailable.
    pub area: f64,
    /// Area centroid.
    pub centroid: Option<Point3>,
    /// Representative point and outward normal.
    pub sample: Option<FaceSample>,
    /// Indices of incident edges.
    pub edges: Vec<usize>,
}

impl FaceRecord {
    /// Minimal record with no cached geometry.
    pub fn new(id: FaceId, kind: SurfaceKind) -> Self {
        Self {
            id,
            kind,
            cylinder: None,
            plane: None,
            area: 0.0,
            centroid: None,
            sample: None,
            edges: Vec::new(),
        }
    }

    /// True when the face is too small or its area is unknown.
    pub fn is_degenerate(&self, min_area: f64) -> bool {
        !(self.area.is_finite() && self.area > min_area)
    }
}

/// One edge and the faces on either side.
#[derive(Debug, Clone)]
pub struct EdgeRecord {
    /// Kernel handle.
    pub id: EdgeId,
    /// Curve type, if the kernel reported one.
    pub curve: Option<CurveKind>,
    /// Incident face indices: one for a free boundary, two otherwise.
    /// A seam lists the same face twice.
    pub faces: Vec<usize>,
    /// Curve parameter range.
    pub range: Option<(f64, f64)>,
}

impl EdgeRecord {
    /// Edge on a free boundary.
    pub fn is_boundary(&self) -> bool {
        self.faces.len() == 1
    }

    /// Edge whose two sides belong to the same face.
    pub fn is_seam(&self) -> bool {
        self.faces.len() == 2 && self.faces[0] == self.faces[1]
    }
}

/// Faces, edges and the face-adjacency graph.
#[derive(Debug, Clone, Default)]
pub struct ModelGraph {
    /// Face arena.
    pub faces: Vec<FaceRecord>,
    /// Edge arena.
    pub edges: Vec<EdgeRecord>,
    adjacency: Vec<Vec<usize>>,
    face_index: HashMap<FaceId, usize>,
}

/// What [`ModelGraph::extract`] could not read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractStats {
    /// Faces with at least one failed geometry query.
    pub faces_with_errors: usize,
    /// Edges dropped because their incident faces were unknown.
    pub skipped_edges: usize,
    /// Enumeration stopped early on a count or time budget.
    pub truncated: bool,
}

impl ModelGraph {
    /// Build the graph from records. Each record's `edges` list and the
    /// adjacency lists are recomputed from `edges[*].faces`.
    pub fn new(mut faces: Vec<FaceRecord>, edges: Vec<EdgeRecord>) -> Self {
        let n = faces.len();
        let mut adjacency = vec![Vec::new(); n];
        for face in &mut faces {
            face.edges.clear();
        }
        for (ei, edge) in edges.iter().enumerate() {
            for &f in &edge.faces {
                if f < n && !faces[f].edges.contains(&ei) {
                    faces[f].edges.push(ei);
                }
            }
            if let &[a, b] = edge.faces.as_slice() {
                if a != b && a < n && b < n {
                    adjacency[a].push(b);
                    adjacency[b].push(a);
                }
            }
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }
        let face_index = faces.iter().enumerate().map(|(i, f)| (f.id, i)).collect();
        Self {
            faces,
            edges,
            adjacency,
            face_index,
        }
    }

    /// Read topology and per-face geometry from a kernel.
    ///
    /// Only face and edge enumeration failures are returned as errors;
    /// per-entity query failures leave the corresponding field empty.
    pub(crate) fn extract<K: CadKernel + ?Sized>(
        kernel: &K,
        budget: &BudgetSettings,
        deadline: &Deadline,
    ) -> Result<(Self, ExtractStats), brepscan_kernel::KernelError> {
        let mut stats = ExtractStats::default();

        let mut face_ids = kernel.faces()?;
        if let Some(max) = budget.max_faces {
            if face_ids.len() > max {
                tracing::warn!(total = face_ids.len(), max, "face budget exceeded");
                face_ids.truncate(max);
                stats.truncated = true;
            }
        }

        let mut faces = Vec::with_capacity(face_ids.len());
        for id in face_ids {
            if deadline.expired() {
                tracing::warn!(
                    read = faces.len(),
                    "time budget exhausted during face extraction"
                );
                stats.truncated = true;
                break;
            }
            let (record, failed) = read_face(kernel, id);
            if failed {
                stats.faces_with_errors += 1;
            }
            faces.push(record);
        }
        let index: HashMap<FaceId, usize> =
            faces.iter().enumerate().map(|(i, f)| (f.id, i)).collect();

        let mut edge_ids = kernel.edges()?;
        if let Some(max) = budget.max_edges {
            if edge_ids.len() > max {
                tracing::warn!(total = edge_ids.len(), max, "edge budget exceeded");
                edge_ids.truncate(max);
                stats.truncated = true;
            }
        }

        let mut edges = Vec::with_capacity(edge_ids.len());
        for id in edge_ids {
            if deadline.expired() {
                tracing::warn!(
                    read = edges.len(),
                    "time budget exhausted during edge extraction"
                );
                stats.truncated = true;
                break;
            }
            let incident = match kernel.edge_faces(id) {
                Ok(list) => list,
                Err(e) => {
                    tracing::warn!(edge = %id, error = %e, "edge incidence query failed");
                    stats.skipped_edges += 1;
                    continue;
                }
            };
            let mapped: Vec<usize> = incident
                .iter()
                .filter_map(|f| index.get(f).copied())
                .collect();
            if mapped.is_empty() || mapped.len() > 2 {
                stats.skipped_edges += 1;
                continue;
            }
            let curve = match kernel.curve_kind(id) {
                Ok(curve) => Some(curve),
                Err(e) => {
                    tracing::debug!(edge = %id, error = %e, "curve kind unavailable");
                    None
                }
            };
            let range = match kernel.curve_range(id) {
                Ok(range) => Some(range),
                Err(e) => {
                    tracing::debug!(edge = %id, error = %e, "curve range unavailable");
                    None
                }
            };
            edges.push(EdgeRecord {
                id,
                curve,
                faces: mapped,
                range,
            });
        }

        Ok((Self::new(faces, edges), stats))
    }

    /// Neighbor face indices (sorted, no self-loops).
    pub fn neighbors(&self, face: usize) -> &[usize] {
        self.adjacency.get(face).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Arena index of a kernel face handle.
    pub fn index_of(&self, id: FaceId) -> Option<usize> {
        self.face_index.get(&id).copied()
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Query one face. Returns the record and whether any query failed.
fn read_face<K: CadKernel + ?Sized>(kernel: &K, id: FaceId) -> (FaceRecord, bool) {
    let mut failed = false;
    let mut note = |what: &str, e: &dyn std::fmt::Display| {
        tracing::warn!(face = %id, error = %e, "{what} query failed");
        failed = true;
    };

    let kind = match kernel.surface_kind(id) {
        Ok(kind) => kind,
        Err(e) => {
            note("surface kind", &e);
            SurfaceKind::Freeform
        }
    };
    let mut record = FaceRecord::new(id, kind);

    match kind {
        SurfaceKind::Cylinder => match kernel.cylinder_params(id) {
            Ok(params) => {
                record.cylinder = params.filter(|c| c.radius.is_finite() && c.radius > 0.0)
            }
            Err(e) => note("cylinder parameters", &e),
        },
        SurfaceKind::Plane => match kernel.plane_params(id) {
            Ok(params) => record.plane = params,
            Err(e) => note("plane parameters", &e),
        },
        _ => {}
    }
    match kernel.face_area(id) {
        Ok(area) => record.area = area,
        Err(e) => note("area", &e),
    }
    match kernel.face_centroid(id) {
        Ok(c) => record.centroid = Some(c),
        Err(e) => note("centroid", &e),
    }
    match kernel.face_sample(id) {
        Ok(s) => record.sample = Some(s),
        Err(e) => note("sample", &e),
    }
    (record, failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: u32, faces: Vec<usize>) -> EdgeRecord {
        EdgeRecord {
            id: EdgeId(id),
            curve: Some(CurveKind::Line),
            faces,
            range: Some((0.0, 1.0)),
        }
    }

    #[test]
    fn test_adjacency_from_edges() {
        let faces = (0..3)
            .map(|i| FaceRecord::new(FaceId(10 + i), SurfaceKind::Plane))
            .collect();
        let edges = vec![
            edge(0, vec![0, 1]),
            edge(1, vec![1, 2]),
            edge(2, vec![1, 2]),
            edge(3, vec![2, 2]),
            edge(4, vec![0]),
        ];
        let g = ModelGraph::new(faces, edges);
        assert_eq!(g.neighbors(0), &[1]);
        assert_eq!(g.neighbors(1), &[0, 2]);
        // Duplicate edge collapses; seam adds no self-loop
        assert_eq!(g.neighbors(2), &[1]);
        assert_eq!(g.faces[2].edges, vec![1, 2, 3]);
        assert_eq!(g.faces[0].edges, vec![0, 4]);
        assert_eq!(g.index_of(FaceId(12)), Some(2));
        assert_eq!(g.index_of(FaceId(99)), None);
        assert!(g.edges[3].is_seam());
        assert!(g.edges[4].is_boundary());
        assert!(g.neighbors(17).is_empty());
    }

    #[test]
    fn test_degenerate_area() {
        let mut f = FaceRecord::new(FaceId(0), SurfaceKind::Cylinder);
        assert!(f.is_degenerate(1e-9));
        f.area = 3.0;
        assert!(!f.is_degenerate(1e-9));
        f.area = f64::NAN;
        assert!(f.is_degenerate(1e-9));
    }
}
