//! Label relaxation over the face-adjacency graph.
//!
//! Anchors are faces with a cylindrical-feature lock or a high-confidence
//! verdict; they never change. Every other face is re-examined only when a
//! neighbor changed in the previous round, and adopts the majority label of
//! its labeled neighbors. Ties go to the higher-priority label, so `inner`
//! beats `through`.

use std::collections::BTreeSet;

use crate::config::PropagationSettings;
use crate::labels::{FaceLabel, Verdict};
use crate::model::ModelGraph;

/// Final labels and convergence info.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagation {
    /// One label per face index.
    pub labels: Vec<FaceLabel>,
    /// Rounds run.
    pub iterations: usize,
    /// The worklist drained before the iteration bound.
    pub converged: bool,
}

/// Majority label among `labels`, ties broken by priority.
/// `None` when the slice is empty.
pub fn majority(labels: impl IntoIterator<Item = FaceLabel>) -> Option<FaceLabel> {
    let mut counts = [0usize; 4];
    for label in labels {
        counts[label.index()] += 1;
    }
    FaceLabel::BY_PRIORITY
        .into_iter()
        .filter(|l| counts[l.index()] > 0)
        .max_by_key(|l| (counts[l.index()], l.priority()))
}

/// Relax `seeds` to a stable labeling.
///
/// `seeds` may be shorter than the face count; faces without a seed start
/// unlabeled and end as `outer` if nothing reaches them.
pub fn propagate(
    graph: &ModelGraph,
    seeds: &[Verdict],
    locks: &[Option<FaceLabel>],
    settings: &PropagationSettings,
) -> Propagation {
    let n = graph.face_count();
    let mut labels: Vec<Option<FaceLabel>> =
        (0..n).map(|i| seeds.get(i).map(|v| v.label)).collect();
    let mut locked = vec![false; n];
    for i in 0..n {
        if let Some(Some(label)) = locks.get(i) {
            labels[i] = Some(*label);
            locked[i] = true;
        } else if seeds.get(i).is_some_and(Verdict::is_high) {
            locked[i] = true;
        }
    }

    let mut dirty: BTreeSet<usize> = (0..n).filter(|&i| !locked[i]).collect();
    let mut iterations = 0;
    while !dirty.is_empty() && iterations < settings.max_iterations {
        iterations += 1;
        let mut next = BTreeSet::new();
        for &face in &dirty {
            if locked[face] {
                continue;
            }
            let around: Vec<FaceLabel> = graph
                .neighbors(face)
                .iter()
                .filter_map(|&nb| labels[nb])
                .collect();
            let Some(winner) = majority(around.iter().copied()) else {
                continue;
            };
            if around.iter().all(|&l| l == winner) {
                locked[face] = true;
            }
            if labels[face] != Some(winner) {
                labels[face] = Some(winner);
                next.extend(graph.neighbors(face).iter().filter(|&&nb| !locked[nb]));
            }
        }
        dirty = next;
    }

    let converged = dirty.is_empty();
    if !converged {
        tracing::warn!(
            iterations,
            pending = dirty.len(),
            "label propagation hit the iteration bound"
        );
    }
    Propagation {
        labels: labels
            .into_iter()
            .map(|l| l.unwrap_or(FaceLabel::Outer))
            .collect(),
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeRecord, FaceRecord};
    use brepscan_kernel::{CurveKind, EdgeId, FaceId, SurfaceKind};

    fn graph(n: usize, pairs: &[(usize, usize)]) -> ModelGraph {
        let faces = (0..n)
            .map(|i| FaceRecord::new(FaceId(i as u32), SurfaceKind::Plane))
            .collect();
        let edges = pairs
            .iter()
            .enumerate()
            .map(|(i, &(a, b))| EdgeRecord {
                id: EdgeId(i as u32),
                curve: Some(CurveKind::Line),
                faces: vec![a, b],
                range: Some((0.0, 1.0)),
            })
            .collect();
        ModelGraph::new(faces, edges)
    }

    #[test]
    fn test_majority_ties_prefer_inner() {
        use FaceLabel::*;
        assert_eq!(majority([Inner, Through]), Some(Inner));
        assert_eq!(majority([Through, Inner]), Some(Inner));
        assert_eq!(majority([Outer, Planar]), Some(Outer));
        assert_eq!(majority([Outer, Outer, Inner]), Some(Outer));
        assert_eq!(majority([]), None);
    }

    #[test]
    fn test_inner_beats_through_on_tie() {
        // 1 sits between an inner anchor and a through anchor
        let g = graph(3, &[(0, 1), (1, 2)]);
        let seeds = [
            Verdict::high(FaceLabel::Inner),
            Verdict::low(FaceLabel::Outer),
            Verdict::high(FaceLabel::Through),
        ];
        let out = propagate(&g, &seeds, &[], &PropagationSettings::default());
        assert_eq!(
            out.labels,
            vec![FaceLabel::Inner, FaceLabel::Inner, FaceLabel::Through]
        );
        assert!(out.converged);
    }

    #[test]
    fn test_locks_override_seeds() {
        let g = graph(2, &[(0, 1)]);
        let seeds = [
            Verdict::high(FaceLabel::Outer),
            Verdict::low(FaceLabel::Outer),
        ];
        let locks = [Some(FaceLabel::Through), None];
        let out = propagate(&g, &seeds, &locks, &PropagationSettings::default());
        assert_eq!(out.labels, vec![FaceLabel::Through, FaceLabel::Through]);
    }

    #[test]
    fn test_anchors_never_change() {
        let g = graph(3, &[(0, 1), (0, 2)]);
        let seeds = [
            Verdict::high(FaceLabel::Planar),
            Verdict::high(FaceLabel::Inner),
            Verdict::high(FaceLabel::Inner),
        ];
        let out = propagate(&g, &seeds, &[], &PropagationSettings::default());
        assert_eq!(out.labels[0], FaceLabel::Planar);
        assert_eq!(out.iterations, 0);
        assert!(out.converged);
    }

    #[test]
    fn test_adversarial_cycle_halts() {
        // Alternating low-confidence ring with no anchors.
        let n = 64;
        let pairs: Vec<(usize, usize)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        let g = graph(n, &pairs);
        let seeds: Vec<Verdict> = (0..n)
            .map(|i| {
                Verdict::low(if i % 2 == 0 {
                    FaceLabel::Outer
                } else {
                    FaceLabel::Through
                })
            })
            .collect();
        for max_iterations in [1, 3, 10] {
            let out = propagate(&g, &seeds, &[], &PropagationSettings { max_iterations });
            assert!(out.iterations <= max_iterations);
            assert_eq!(out.labels.len(), n);
        }
    }

    #[test]
    fn test_missing_seeds_default_outer() {
        let g = graph(3, &[(0, 1)]);
        let out = propagate(
            &g,
            &[Verdict::high(FaceLabel::Inner)],
            &[],
            &PropagationSettings::default(),
        );
        // Face 1 picks up its neighbor's label; face 2 is isolated.
        assert_eq!(
            out.labels,
            vec![FaceLabel::Inner, FaceLabel::Inner, FaceLabel::Outer]
        );
    }

    #[test]
    fn test_deterministic() {
        let g = graph(5, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0), (1, 3)]);
        let seeds = [
            Verdict::low(FaceLabel::Inner),
            Verdict::low(FaceLabel::Outer),
            Verdict::high(FaceLabel::Through),
            Verdict::low(FaceLabel::Planar),
            Verdict::low(FaceLabel::Outer),
        ];
        let a = propagate(&g, &seeds, &[], &PropagationSettings::default());
        let b = propagate(&g, &seeds, &[], &PropagationSettings::default());
        assert_eq!(a, b);
    }
}
