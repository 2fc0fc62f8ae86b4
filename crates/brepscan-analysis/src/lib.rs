#![warn(missing_docs)]

//! Face classification and manufacturing-feature recognition for B-rep
//! solids.
//!
//! The engine reads a solid through the [`CadKernel`] trait and produces an
//! [`AnalyzeResult`]: recognized features (holes, bores, bosses, grooves,
//! fillets, planar faces), a stable `outer` / `inner` / `through` /
//! `planar` label for every face, a labeled display mesh and a filtered
//! feature-edge wireframe.
//!
//! Stages run in order: bounding volume, dihedral edge classes, per-face
//! topology (parallel), cylinder grouping, label propagation, mesh
//! assembly, feature-edge sampling.
//!
//! # Example
//!
//! ```
//! use brepscan_analysis::{analyze, AnalysisConfig};
//! use brepscan_kernel_analytic::{AnalyticKernel, PartSpec, StockFace};
//!
//! let part = PartSpec::block([100.0, 100.0, 20.0])
//!     .through_hole(StockFace::Top, [50.0, 50.0], 10.0);
//! let kernel = AnalyticKernel::new(part).unwrap();
//! let result = analyze(&kernel, &AnalysisConfig::default()).unwrap();
//! assert_eq!(result.through_holes().len(), 1);
//! ```

pub mod bbox;
mod budget;
pub mod config;
pub mod cylindrical;
pub mod edges;
pub mod error;
pub mod features;
pub mod labels;
pub mod mesh;
pub mod model;
pub mod propagate;
pub mod report;
pub mod surface_features;
pub mod topology;

use std::collections::BTreeMap;

use brepscan_kernel::{CadKernel, FaceId};
use serde::{Deserialize, Serialize};

pub use bbox::{BoundingBox, BoundingVolume};
pub use config::{AnalysisConfig, ClassifierStrategy, MeshQuality};
pub use edges::{EdgeClass, FeatureEdge};
pub use error::{AnalysisError, AnalysisResult};
pub use features::{
    BoreFeature, BossFeature, ComplexFeature, FilletFeature, GrooveFeature, HoleFeature,
    ManufacturingFeature, Orientation, PlanarFeature,
};
pub use labels::{Confidence, FaceLabel, Verdict};
pub use mesh::{DisplayMesh, MeshError};
pub use report::{FeatureTree, PartSummary};

use budget::Deadline;
use cylindrical::CylinderInput;
use model::ModelGraph;
use topology::ClassifyContext;

/// Counters describing how an analysis went.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Kernel name.
    pub kernel: String,
    /// Face classifier used.
    pub strategy: String,
    /// Faces analyzed.
    pub faces: usize,
    /// Edges analyzed.
    pub edges: usize,
    /// Coaxial cylinder groups found.
    pub cylinder_groups: usize,
    /// Propagation rounds run.
    pub propagation_iterations: usize,
    /// Propagation reached a fixed point.
    pub propagation_converged: bool,
    /// Faces with at least one failed geometry query.
    pub faces_with_errors: usize,
    /// Degenerate faces left out of feature recognition.
    pub skipped_faces: usize,
    /// Edges dropped during extraction.
    pub skipped_edges: usize,
    /// Faces that fell back to `outer` because time ran out.
    pub unclassified_faces: usize,
    /// Faces missing from the display mesh.
    pub failed_mesh_faces: usize,
    /// Significant edges that could not be sampled.
    pub failed_edge_samples: usize,
    /// Edges kept for display.
    pub significant_edges: usize,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u64,
}

/// Everything an analysis produces. Lengths in mm, areas in mm², volumes
/// in mm³.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResult {
    /// Cylindrical features first, then per-face surface features.
    pub features: Vec<ManufacturingFeature>,
    /// Labeled display mesh.
    pub mesh: DisplayMesh,
    /// Significant edges as polylines.
    pub feature_edges: Vec<FeatureEdge>,
    /// Final label of every face.
    pub face_labels: BTreeMap<FaceId, FaceLabel>,
    /// Solid volume.
    pub volume_mm3: f64,
    /// Boundary area.
    pub surface_area_mm2: f64,
    /// Axis-aligned bounds.
    pub bounding_box: BoundingBox,
    /// Whole-part statistics.
    pub summary: PartSummary,
    /// Features grouped by orientation.
    pub feature_tree: FeatureTree,
    /// Run counters.
    pub diagnostics: Diagnostics,
    /// Some stage stopped early on a count or time budget.
    pub truncated: bool,
}

impl AnalyzeResult {
    /// Volume in cm³.
    pub fn volume_cm3(&self) -> f64 {
        self.volume_mm3 / 1000.0
    }

    /// Through holes, in feature order.
    pub fn through_holes(&self) -> Vec<&HoleFeature> {
        self.features
            .iter()
            .filter_map(|f| match f {
                ManufacturingFeature::ThroughHole(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    /// Blind holes, in feature order.
    pub fn blind_holes(&self) -> Vec<&HoleFeature> {
        self.features
            .iter()
            .filter_map(|f| match f {
                ManufacturingFeature::BlindHole(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    /// Label of one face.
    pub fn label_of(&self, face: FaceId) -> Option<FaceLabel> {
        self.face_labels.get(&face).copied()
    }
}

/// Runs the analysis pipeline with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    /// Validate the configuration and build an analyzer.
    pub fn new(config: AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one solid.
    ///
    /// Fails only when the kernel cannot enumerate the solid, reports no
    /// faces, or cannot give bounds and mass properties. A budget that runs
    /// out yields a partial result with `truncated` set. Everything else
    /// degrades to conservative fallbacks recorded in [`Diagnostics`].
    pub fn run(&self, kernel: &dyn CadKernel) -> AnalysisResult<AnalyzeResult> {
        let cfg = &self.config;
        let deadline = Deadline::new(cfg.budget.time_budget_ms);

        let (graph, stats) = ModelGraph::extract(kernel, &cfg.budget, &deadline)?;
        if graph.face_count() == 0 && !stats.truncated {
            return Err(AnalysisError::EmptySolid);
        }
        let bounds = BoundingVolume::from_kernel(kernel)?;
        let mass = kernel.mass_properties()?;
        tracing::info!(
            kernel = kernel.name(),
            faces = graph.face_count(),
            edges = graph.edge_count(),
            diagonal = bounds.diagonal,
            "analyzing solid"
        );
        if bounds.is_degenerate() {
            tracing::warn!("zero-size bounding box, skipping size ratios");
        }

        let edge_info = edges::classify_edges(kernel, &graph, &cfg.edges);

        let classifier = topology::classifier_for(cfg.topology.strategy);
        let ctx = ClassifyContext {
            kernel,
            graph: &graph,
            bounds: &bounds,
            settings: &cfg.topology,
        };
        let (verdicts, unclassified) =
            topology::classify_faces(&ctx, classifier.as_ref(), &deadline);
        tracing::debug!(
            strategy = classifier.name(),
            high = verdicts.iter().filter(|v| v.is_high()).count(),
            "classified faces"
        );

        let cylinders = cylindrical::recognize(&CylinderInput {
            graph: &graph,
            verdicts: &verdicts,
            edges: &edge_info,
            bounds: &bounds,
            settings: &cfg.features,
        });
        let (surface, skipped_surfaces) =
            surface_features::surface_features(&graph, &edge_info, &cfg.features);

        let propagation =
            propagate::propagate(&graph, &verdicts, &cylinders.locks, &cfg.propagation);
        tracing::debug!(
            iterations = propagation.iterations,
            converged = propagation.converged,
            "propagated labels"
        );

        let params = mesh::tessellation_params(&cfg.mesh, bounds.diagonal);
        let assembly = mesh::assemble(kernel, &graph, &propagation.labels, &params, &deadline);
        let wire = edges::extract_feature_edges(
            kernel,
            &graph,
            &edge_info,
            &cfg.edges,
            bounds.diagonal,
            &deadline,
        );

        let mut features = cylinders.features;
        features.extend(surface);
        let mut features_truncated = false;
        if let Some(max) = cfg.budget.max_features {
            if features.len() > max {
                tracing::warn!(total = features.len(), max, "feature budget exceeded");
                features.truncate(max);
                features_truncated = true;
            }
        }

        let summary = PartSummary::new(&graph, &bounds, &features);
        let feature_tree = FeatureTree::new(&summary, &features);
        let face_labels = graph
            .faces
            .iter()
            .zip(&propagation.labels)
            .map(|(f, &l)| (f.id, l))
            .collect();

        let truncated = stats.truncated
            || unclassified > 0
            || assembly.truncated
            || wire.truncated
            || features_truncated;
        let diagnostics = Diagnostics {
            kernel: kernel.name().to_string(),
            strategy: classifier.name().to_string(),
            faces: graph.face_count(),
            edges: graph.edge_count(),
            cylinder_groups: cylinders.groups,
            propagation_iterations: propagation.iterations,
            propagation_converged: propagation.converged,
            faces_with_errors: stats.faces_with_errors,
            skipped_faces: cylinders.skipped_faces + skipped_surfaces,
            skipped_edges: stats.skipped_edges,
            unclassified_faces: unclassified,
            failed_mesh_faces: assembly.failed_faces,
            failed_edge_samples: wire.failed,
            significant_edges: wire.significant,
            elapsed_ms: deadline.elapsed_ms(),
        };
        tracing::info!(
            features = features.len(),
            triangles = assembly.mesh.triangle_count,
            feature_edges = wire.edges.len(),
            truncated,
            elapsed_ms = diagnostics.elapsed_ms,
            "analysis complete"
        );

        Ok(AnalyzeResult {
            features,
            mesh: assembly.mesh,
            feature_edges: wire.edges,
            face_labels,
            volume_mm3: mass.volume,
            surface_area_mm2: mass.surface_area,
            bounding_box: bounds.to_output(),
            summary,
            feature_tree,
            diagnostics,
            truncated,
        })
    }
}

/// Analyze a solid with the given configuration.
pub fn analyze(kernel: &dyn CadKernel, config: &AnalysisConfig) -> AnalysisResult<AnalyzeResult> {
    Analyzer::new(config.clone())?.run(kernel)
}
