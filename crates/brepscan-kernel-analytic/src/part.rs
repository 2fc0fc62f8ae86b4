//! Part description: rectangular stock plus axis-aligned cylindrical features.

use brepscan_kernel::{KernelError, KernelResult};
use brepscan_math::{Point3, Vec3};
use serde::{Deserialize, Serialize};

/// Minimum wall left between a footprint and anything else on a face, in mm.
const MIN_WALL: f64 = 1e-3;

/// One of the six faces of the stock box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockFace {
    /// +Z
    Top,
    /// -Z
    Bottom,
    /// +X
    Right,
    /// -X
    Left,
    /// +Y
    Front,
    /// -Y
    Back,
}

impl StockFace {
    /// All stock faces, in face-id order.
    pub const ALL: [StockFace; 6] = [
        StockFace::Top,
        StockFace::Bottom,
        StockFace::Right,
        StockFace::Left,
        StockFace::Front,
        StockFace::Back,
    ];

    /// Index of the face's normal axis (0 = X, 1 = Y, 2 = Z).
    pub fn axis(self) -> usize {
        match self {
            StockFace::Right | StockFace::Left => 0,
            StockFace::Front | StockFace::Back => 1,
            StockFace::Top | StockFace::Bottom => 2,
        }
    }

    /// `+1.0` if the outward normal points along the positive axis.
    pub fn sign(self) -> f64 {
        match self {
            StockFace::Top | StockFace::Right | StockFace::Front => 1.0,
            StockFace::Bottom | StockFace::Left | StockFace::Back => -1.0,
        }
    }

    /// The face on the other side of the stock.
    pub fn opposite(self) -> StockFace {
        match self {
            StockFace::Top => StockFace::Bottom,
            StockFace::Bottom => StockFace::Top,
            StockFace::Right => StockFace::Left,
            StockFace::Left => StockFace::Right,
            StockFace::Front => StockFace::Back,
            StockFace::Back => StockFace::Front,
        }
    }

    /// Position in [`StockFace::ALL`].
    pub fn index(self) -> usize {
        match self {
            StockFace::Top => 0,
            StockFace::Bottom => 1,
            StockFace::Right => 2,
            StockFace::Left => 3,
            StockFace::Front => 4,
            StockFace::Back => 5,
        }
    }

    /// Frame whose `k` axis is this face's normal axis.
    pub fn frame(self) -> AxisFrame {
        AxisFrame::new(self.axis())
    }
}

/// Right-handed axis permutation `(a, b, k)`, with `k` the feature axis and
/// `(a, b)` the in-plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisFrame {
    /// In-plane first axis.
    pub a: usize,
    /// In-plane second axis.
    pub b: usize,
    /// Normal axis.
    pub k: usize,
}

impl AxisFrame {
    /// Frame with normal axis `k`.
    pub fn new(k: usize) -> Self {
        Self {
            a: (k + 1) % 3,
            b: (k + 2) % 3,
            k,
        }
    }

    /// Assemble a world point from frame coordinates.
    pub fn point(&self, a: f64, b: f64, k: f64) -> Point3 {
        let mut p = Point3::origin();
        p[self.a] = a;
        p[self.b] = b;
        p[self.k] = k;
        p
    }

    /// Assemble a world vector from frame components.
    pub fn vector(&self, a: f64, b: f64, k: f64) -> Vec3 {
        let mut v = Vec3::zeros();
        v[self.a] = a;
        v[self.b] = b;
        v[self.k] = k;
        v
    }

    /// Split a world point into `(a, b, k)` coordinates.
    pub fn coords(&self, p: &Point3) -> (f64, f64, f64) {
        (p[self.a], p[self.b], p[self.k])
    }
}

/// Rectangular stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    /// Extent along X, Y and Z in mm.
    pub size: [f64; 3],
    /// Minimum corner.
    #[serde(default)]
    pub origin: [f64; 3],
}

/// A feature placed on one stock face.
///
/// `center` is measured from the stock's minimum corner along the face
/// frame's `a` and `b` axes: X/Y for top and bottom, Y/Z for right and left,
/// Z/X for front and back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureSpec {
    /// Straight drilled hole. Through when `depth` is absent.
    Hole {
        /// Entry face.
        face: StockFace,
        /// In-plane center.
        center: [f64; 2],
        /// Hole diameter.
        diameter: f64,
        /// Depth from the entry face.
        #[serde(default)]
        depth: Option<f64>,
    },
    /// Counterbored hole. Through when `depth` is absent.
    Counterbore {
        /// Entry face.
        face: StockFace,
        /// In-plane center.
        center: [f64; 2],
        /// Diameter of the inner hole.
        diameter: f64,
        /// Diameter of the counterbore.
        cb_diameter: f64,
        /// Depth of the counterbore.
        cb_depth: f64,
        /// Total depth from the entry face.
        #[serde(default)]
        depth: Option<f64>,
    },
    /// Cylindrical boss standing on the face.
    Boss {
        /// Face the boss stands on.
        face: StockFace,
        /// In-plane center.
        center: [f64; 2],
        /// Boss diameter.
        diameter: f64,
        /// Height above the face.
        height: f64,
    },
}

impl FeatureSpec {
    /// Stock face the feature starts from.
    pub fn face(&self) -> StockFace {
        match self {
            FeatureSpec::Hole { face, .. }
            | FeatureSpec::Counterbore { face, .. }
            | FeatureSpec::Boss { face, .. } => *face,
        }
    }

    /// In-plane center.
    pub fn center(&self) -> [f64; 2] {
        match self {
            FeatureSpec::Hole { center, .. }
            | FeatureSpec::Counterbore { center, .. }
            | FeatureSpec::Boss { center, .. } => *center,
        }
    }
}

/// Full part description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpec {
    /// Stock block.
    pub stock: Stock,
    /// Features in construction order.
    #[serde(default)]
    pub features: Vec<FeatureSpec>,
}

/// Axis-aligned cylinder section of a feature, in absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Section {
    pub frame: AxisFrame,
    pub center: [f64; 2],
    pub radius: f64,
    pub lo: f64,
    pub hi: f64,
}

/// A circular region cut out of a stock face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Footprint {
    pub center: [f64; 2],
    pub radius: f64,
}

impl PartSpec {
    /// Block of stock at the origin with no features.
    pub fn block(size: [f64; 3]) -> Self {
        Self {
            stock: Stock {
                size,
                origin: [0.0; 3],
            },
            features: Vec::new(),
        }
    }

    /// Parse a JSON part description.
    pub fn from_json(json: &str) -> KernelResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| KernelError::InvalidSolid(e.to_string()))
    }

    /// Add a through hole.
    pub fn through_hole(mut self, face: StockFace, center: [f64; 2], diameter: f64) -> Self {
        self.features.push(FeatureSpec::Hole {
            face,
            center,
            diameter,
            depth: None,
        });
        self
    }

    /// Add a blind hole.
    pub fn blind_hole(
        mut self,
        face: StockFace,
        center: [f64; 2],
        diameter: f64,
        depth: f64,
    ) -> Self {
        self.features.push(FeatureSpec::Hole {
            face,
            center,
            diameter,
            depth: Some(depth),
        });
        self
    }

    /// Add a through counterbored hole.
    pub fn counterbore(
        mut self,
        face: StockFace,
        center: [f64; 2],
        diameter: f64,
        cb_diameter: f64,
        cb_depth: f64,
    ) -> Self {
        self.features.push(FeatureSpec::Counterbore {
            face,
            center,
            diameter,
            cb_diameter,
            cb_depth,
            depth: None,
        });
        self
    }

    /// Add a boss.
    pub fn boss(mut self, face: StockFace, center: [f64; 2], diameter: f64, height: f64) -> Self {
        self.features.push(FeatureSpec::Boss {
            face,
            center,
            diameter,
            height,
        });
        self
    }

    /// Minimum corner of the stock.
    pub fn min_corner(&self) -> Point3 {
        let o = self.stock.origin;
        Point3::new(o[0], o[1], o[2])
    }

    /// Maximum corner of the stock.
    pub fn max_corner(&self) -> Point3 {
        let o = self.stock.origin;
        let s = self.stock.size;
        Point3::new(o[0] + s[0], o[1] + s[1], o[2] + s[2])
    }

    /// Coordinate of a stock face's plane along its normal axis.
    pub(crate) fn face_level(&self, face: StockFace) -> f64 {
        let k = face.axis();
        if face.sign() > 0.0 {
            self.stock.origin[k] + self.stock.size[k]
        } else {
            self.stock.origin[k]
        }
    }

    /// In-plane rectangle `[a_min, a_max, b_min, b_max]` of a stock face.
    pub(crate) fn face_rect(&self, face: StockFace) -> [f64; 4] {
        let fr = face.frame();
        let o = self.stock.origin;
        let s = self.stock.size;
        [o[fr.a], o[fr.a] + s[fr.a], o[fr.b], o[fr.b] + s[fr.b]]
    }

    /// Absolute in-plane center of a feature.
    pub(crate) fn absolute_center(&self, face: StockFace, center: [f64; 2]) -> [f64; 2] {
        let fr = face.frame();
        [
            self.stock.origin[fr.a] + center[0],
            self.stock.origin[fr.b] + center[1],
        ]
    }

    /// Material-removing sections of a feature (empty for bosses), without
    /// any extension past open ends.
    pub(crate) fn cavity_sections(&self, feature: &FeatureSpec) -> Vec<Section> {
        let face = feature.face();
        let frame = face.frame();
        let s = face.sign();
        let level = self.face_level(face);
        let center = self.absolute_center(face, feature.center());
        let thickness = self.stock.size[frame.k];
        let span = |from: f64, depth: f64| {
            let to = from - s * depth;
            (from.min(to), from.max(to))
        };
        match *feature {
            FeatureSpec::Hole {
                diameter, depth, ..
            } => {
                let (lo, hi) = span(level, depth.unwrap_or(thickness));
                vec![Section {
                    frame,
                    center,
                    radius: 0.5 * diameter,
                    lo,
                    hi,
                }]
            }
            FeatureSpec::Counterbore {
                diameter,
                cb_diameter,
                cb_depth,
                depth,
                ..
            } => {
                let (cb_lo, cb_hi) = span(level, cb_depth);
                let step = level - s * cb_depth;
                let (lo, hi) = span(step, depth.unwrap_or(thickness) - cb_depth);
                vec![
                    Section {
                        frame,
                        center,
                        radius: 0.5 * cb_diameter,
                        lo: cb_lo,
                        hi: cb_hi,
                    },
                    Section {
                        frame,
                        center,
                        radius: 0.5 * diameter,
                        lo,
                        hi,
                    },
                ]
            }
            FeatureSpec::Boss { .. } => Vec::new(),
        }
    }

    /// Circular cut-outs the feature leaves on stock faces.
    pub(crate) fn footprints(&self, feature: &FeatureSpec) -> Vec<(StockFace, Footprint)> {
        let face = feature.face();
        let center = self.absolute_center(face, feature.center());
        match *feature {
            FeatureSpec::Hole {
                diameter, depth, ..
            } => {
                let fp = Footprint {
                    center,
                    radius: 0.5 * diameter,
                };
                let mut out = vec![(face, fp)];
                if depth.is_none() {
                    out.push((face.opposite(), fp));
                }
                out
            }
            FeatureSpec::Counterbore {
                diameter,
                cb_diameter,
                depth,
                ..
            } => {
                let mut out = vec![(
                    face,
                    Footprint {
                        center,
                        radius: 0.5 * cb_diameter,
                    },
                )];
                if depth.is_none() {
                    out.push((
                        face.opposite(),
                        Footprint {
                            center,
                            radius: 0.5 * diameter,
                        },
                    ));
                }
                out
            }
            FeatureSpec::Boss { diameter, .. } => vec![(
                face,
                Footprint {
                    center,
                    radius: 0.5 * diameter,
                },
            )],
        }
    }

    /// Reject parts the reference kernel cannot represent exactly.
    pub fn validate(&self) -> KernelResult<()> {
        let invalid = |msg: String| Err(KernelError::InvalidSolid(msg));

        for (axis, (&size, &origin)) in self
            .stock
            .size
            .iter()
            .zip(self.stock.origin.iter())
            .enumerate()
        {
            if !(size.is_finite() && size > 0.0) || !origin.is_finite() {
                return invalid(format!("stock size along axis {axis} must be positive"));
            }
        }

        for (i, feature) in self.features.iter().enumerate() {
            self.validate_feature(i, feature)?;
        }

        // Footprints sharing a stock face must not touch.
        let mut per_face: Vec<Vec<(usize, Footprint)>> = vec![Vec::new(); 6];
        for (i, feature) in self.features.iter().enumerate() {
            for (face, fp) in self.footprints(feature) {
                let rect = self.face_rect(face);
                let [c0, c1] = fp.center;
                if c0 - fp.radius < rect[0] + MIN_WALL
                    || c0 + fp.radius > rect[1] - MIN_WALL
                    || c1 - fp.radius < rect[2] + MIN_WALL
                    || c1 + fp.radius > rect[3] - MIN_WALL
                {
                    return invalid(format!("feature {i} overruns the {face:?} face"));
                }
                per_face[face.index()].push((i, fp));
            }
        }
        for list in &per_face {
            for (x, (i, a)) in list.iter().enumerate() {
                for (j, b) in list.iter().skip(x + 1) {
                    let d = (a.center[0] - b.center[0]).hypot(a.center[1] - b.center[1]);
                    if d < a.radius + b.radius + MIN_WALL {
                        return invalid(format!("features {i} and {j} have overlapping footprints"));
                    }
                }
            }
        }

        // Cavities of different features must not meet inside the stock.
        let sections: Vec<(usize, Section)> = self
            .features
            .iter()
            .enumerate()
            .flat_map(|(i, f)| {
                let sections = self.cavity_sections(f);
                sections.into_iter().map(move |s| (i, s))
            })
            .collect();
        for (x, (i, a)) in sections.iter().enumerate() {
            for (j, b) in sections.iter().skip(x + 1) {
                if i != j && sections_collide(a, b) {
                    return invalid(format!("features {i} and {j} intersect inside the stock"));
                }
            }
        }
        Ok(())
    }

    fn validate_feature(&self, i: usize, feature: &FeatureSpec) -> KernelResult<()> {
        let invalid = |msg: &str| Err(KernelError::InvalidSolid(format!("feature {i}: {msg}")));
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let thickness = self.stock.size[feature.face().axis()];
        let c = feature.center();
        if !(c[0].is_finite() && c[1].is_finite()) {
            return invalid("center must be finite");
        }
        match *feature {
            FeatureSpec::Hole {
                diameter, depth, ..
            } => {
                if !positive(diameter) {
                    return invalid("diameter must be positive");
                }
                if let Some(d) = depth {
                    if !positive(d) || d >= thickness - MIN_WALL {
                        return invalid("blind depth must be inside the stock");
                    }
                }
            }
            FeatureSpec::Counterbore {
                diameter,
                cb_diameter,
                cb_depth,
                depth,
                ..
            } => {
                if !positive(diameter) || !(cb_diameter > diameter) {
                    return invalid("counterbore must be wider than its hole");
                }
                let total = depth.unwrap_or(thickness);
                if !positive(cb_depth) || cb_depth >= total - MIN_WALL {
                    return invalid("counterbore depth must be less than the hole depth");
                }
                if depth.is_some_and(|d| d >= thickness - MIN_WALL) {
                    return invalid("blind depth must be inside the stock");
                }
            }
            FeatureSpec::Boss {
                diameter, height, ..
            } => {
                if !positive(diameter) || !positive(height) {
                    return invalid("boss diameter and height must be positive");
                }
            }
        }
        Ok(())
    }
}

/// Conservative interference test between two cavity sections.
fn sections_collide(a: &Section, b: &Section) -> bool {
    if a.frame == b.frame {
        let axial = a.lo < b.hi + MIN_WALL && b.lo < a.hi + MIN_WALL;
        let d = (a.center[0] - b.center[0]).hypot(a.center[1] - b.center[1]);
        return axial && d < a.radius + b.radius + MIN_WALL;
    }
    let (amin, amax) = section_bounds(a);
    let (bmin, bmax) = section_bounds(b);
    let overlap = |i: usize| amin[i] < bmax[i] + MIN_WALL && bmin[i] < amax[i] + MIN_WALL;
    (0..3).all(overlap)
}

fn section_bounds(s: &Section) -> (Point3, Point3) {
    let min = s
        .frame
        .point(s.center[0] - s.radius, s.center[1] - s.radius, s.lo);
    let max = s
        .frame
        .point(s.center[0] + s.radius, s.center[1] + s.radius, s.hi);
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_right_handed() {
        for k in 0..3 {
            let f = AxisFrame::new(k);
            let ea = f.vector(1.0, 0.0, 0.0);
            let eb = f.vector(0.0, 1.0, 0.0);
            let ek = f.vector(0.0, 0.0, 1.0);
            assert!((ea.cross(&eb) - ek).norm() < 1e-12);
        }
    }

    #[test]
    fn test_opposites_round_trip() {
        for f in StockFace::ALL {
            assert_eq!(f.opposite().opposite(), f);
            assert_eq!(f.opposite().axis(), f.axis());
            assert_eq!(StockFace::ALL[f.index()], f);
        }
    }

    #[test]
    fn test_plate_with_hole_is_valid() {
        let part = PartSpec::block([100.0, 100.0, 20.0]).through_hole(
            StockFace::Top,
            [50.0, 50.0],
            10.0,
        );
        assert!(part.validate().is_ok());
        let fps = part.footprints(&part.features[0]);
        assert_eq!(fps.len(), 2);
        assert_eq!(fps[1].0, StockFace::Bottom);
    }

    #[test]
    fn test_rejects_overrun_and_overlap() {
        let overrun =
            PartSpec::block([20.0, 20.0, 10.0]).through_hole(StockFace::Top, [2.0, 10.0], 6.0);
        assert!(overrun.validate().is_err());

        let overlap = PartSpec::block([50.0, 50.0, 10.0])
            .through_hole(StockFace::Top, [20.0, 20.0], 6.0)
            .blind_hole(StockFace::Top, [24.0, 20.0], 6.0, 3.0);
        assert!(overlap.validate().is_err());

        let through_exit = PartSpec::block([50.0, 50.0, 10.0])
            .through_hole(StockFace::Top, [20.0, 20.0], 6.0)
            .boss(StockFace::Bottom, [20.0, 20.0], 12.0, 5.0);
        assert!(through_exit.validate().is_err());
    }

    #[test]
    fn test_rejects_crossing_cavities() {
        // Side hole drilled straight through the vertical one.
        let part = PartSpec::block([40.0, 40.0, 40.0])
            .through_hole(StockFace::Top, [20.0, 20.0], 6.0)
            .through_hole(StockFace::Right, [20.0, 20.0], 6.0);
        assert!(part.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_depths() {
        let too_deep =
            PartSpec::block([40.0, 40.0, 10.0]).blind_hole(StockFace::Top, [20.0, 20.0], 6.0, 10.0);
        assert!(too_deep.validate().is_err());

        let mut cb = PartSpec::block([40.0, 40.0, 10.0]);
        cb.features.push(FeatureSpec::Counterbore {
            face: StockFace::Top,
            center: [20.0, 20.0],
            diameter: 10.0,
            cb_diameter: 8.0,
            cb_depth: 2.0,
            depth: None,
        });
        assert!(cb.validate().is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "stock": { "size": [100, 100, 20] },
            "features": [
                { "type": "hole", "face": "top", "center": [50, 50], "diameter": 10 },
                { "type": "boss", "face": "bottom", "center": [20, 20], "diameter": 8, "height": 5 }
            ]
        }"#;
        let part = PartSpec::from_json(json).unwrap();
        assert_eq!(part.features.len(), 2);
        assert!(matches!(
            part.features[0],
            FeatureSpec::Hole { depth: None, .. }
        ));
        assert!(part.validate().is_ok());
    }
}
