//! Manufacturing feature taxonomy.

use brepscan_kernel::{FaceId, SurfaceKind};
use brepscan_math::{Point3, Vec3};
use serde::{Deserialize, Serialize};

/// Display orientation of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// +Z.
    Top,
    /// -Z.
    Bottom,
    /// +X.
    Right,
    /// -X.
    Left,
    /// +Y.
    Front,
    /// -Y.
    Back,
    /// Planar face normal to X.
    SideX,
    /// Planar face normal to Y.
    SideY,
}

impl Orientation {
    /// Orientation of an axis: the dominant component, ties broken Z > X > Y.
    pub fn of_axis(v: &Vec3) -> Self {
        let (ax, ay, az) = (v.x.abs(), v.y.abs(), v.z.abs());
        if az >= ax && az >= ay {
            if v.z >= 0.0 {
                Orientation::Top
            } else {
                Orientation::Bottom
            }
        } else if ax >= ay {
            if v.x >= 0.0 {
                Orientation::Right
            } else {
                Orientation::Left
            }
        } else if v.y >= 0.0 {
            Orientation::Front
        } else {
            Orientation::Back
        }
    }

    /// Orientation of a planar face from its outward normal.
    ///
    /// A component within 0.1 of the largest one counts as dominant.
    pub fn of_plane(n: &Vec3) -> Self {
        let (ax, az) = (n.x.abs(), n.z.abs());
        let max = ax.max(n.y.abs()).max(az);
        if (az - max).abs() < 0.1 {
            if n.z > 0.0 {
                Orientation::Top
            } else {
                Orientation::Bottom
            }
        } else if (ax - max).abs() < 0.1 {
            Orientation::SideX
        } else {
            Orientation::SideY
        }
    }

    /// Lower-case name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Top => "top",
            Orientation::Bottom => "bottom",
            Orientation::Right => "right",
            Orientation::Left => "left",
            Orientation::Front => "front",
            Orientation::Back => "back",
            Orientation::SideX => "side_x",
            Orientation::SideY => "side_y",
        }
    }
}

pub(crate) fn to_array(v: &Vec3) -> [f64; 3] {
    [v.x, v.y, v.z]
}

pub(crate) fn point_array(p: &Point3) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// A drilled hole, through or blind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleFeature {
    /// Diameter in mm.
    pub diameter_mm: f64,
    /// Depth along the axis in mm.
    pub depth_mm: f64,
    /// Unit axis direction.
    pub axis: [f64; 3],
    /// Center of the hole.
    pub position: [f64; 3],
    /// Wall area in mm².
    pub area_mm2: f64,
    /// Display orientation.
    pub orientation: Orientation,
    /// Contributing faces.
    pub faces: Vec<FaceId>,
}

/// A large internal cylindrical cavity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoreFeature {
    /// Diameter in mm.
    pub diameter_mm: f64,
    /// Depth along the axis in mm.
    pub depth_mm: f64,
    /// Both ends open.
    pub through: bool,
    /// Unit axis direction.
    pub axis: [f64; 3],
    /// Center of the bore.
    pub position: [f64; 3],
    /// Wall area in mm².
    pub area_mm2: f64,
    /// Display orientation.
    pub orientation: Orientation,
    /// Contributing faces.
    pub faces: Vec<FaceId>,
}

/// A protruding cylinder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossFeature {
    /// Diameter in mm.
    pub diameter_mm: f64,
    /// Length along the axis in mm.
    pub height_mm: f64,
    /// Unit axis direction.
    pub axis: [f64; 3],
    /// Center of the boss.
    pub position: [f64; 3],
    /// Wall area in mm².
    pub area_mm2: f64,
    /// Display orientation.
    pub orientation: Orientation,
    /// Contributing faces.
    pub faces: Vec<FaceId>,
}

/// Coaxial cylinders of differing radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrooveFeature {
    /// Smallest member diameter in mm.
    pub inner_diameter_mm: f64,
    /// Largest member diameter in mm.
    pub outer_diameter_mm: f64,
    /// Radial depth (max radius - min radius) in mm.
    pub depth_mm: f64,
    /// Cut into the part rather than standing off it.
    pub internal: bool,
    /// Unit axis direction.
    pub axis: [f64; 3],
    /// Center of the group.
    pub position: [f64; 3],
    /// Total wall area in mm².
    pub area_mm2: f64,
    /// Display orientation.
    pub orientation: Orientation,
    /// Contributing faces.
    pub faces: Vec<FaceId>,
}

/// A small tangent blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilletFeature {
    /// Blend radius in mm, when the surface exposes one.
    pub radius_mm: Option<f64>,
    /// Underlying surface type.
    pub surface: SurfaceKind,
    /// Face centroid.
    pub position: [f64; 3],
    /// Area in mm².
    pub area_mm2: f64,
    /// Contributing faces.
    pub faces: Vec<FaceId>,
}

/// A flat face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanarFeature {
    /// Outward unit normal.
    pub normal: [f64; 3],
    /// Face centroid.
    pub position: [f64; 3],
    /// Area in mm².
    pub area_mm2: f64,
    /// Display orientation.
    pub orientation: Orientation,
    /// Contributing faces.
    pub faces: Vec<FaceId>,
}

/// A cone, sphere, torus or free-form face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexFeature {
    /// Surface type.
    pub surface: SurfaceKind,
    /// Face centroid.
    pub position: [f64; 3],
    /// Area in mm².
    pub area_mm2: f64,
    /// Contributing faces.
    pub faces: Vec<FaceId>,
}

/// A recognized manufacturing feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManufacturingFeature {
    /// Hole open at both ends.
    ThroughHole(HoleFeature),
    /// Hole with a floor.
    BlindHole(HoleFeature),
    /// Large internal cylinder.
    Bore(BoreFeature),
    /// Protruding cylinder.
    Boss(BossFeature),
    /// Stepped coaxial cylinders.
    Groove(GrooveFeature),
    /// Tangent blend.
    Fillet(FilletFeature),
    /// Flat face.
    PlanarFace(PlanarFeature),
    /// Anything else.
    ComplexSurface(ComplexFeature),
}

impl ManufacturingFeature {
    /// Tag name, as serialized.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ManufacturingFeature::ThroughHole(_) => "through_hole",
            ManufacturingFeature::BlindHole(_) => "blind_hole",
            ManufacturingFeature::Bore(_) => "bore",
            ManufacturingFeature::Boss(_) => "boss",
            ManufacturingFeature::Groove(_) => "groove",
            ManufacturingFeature::Fillet(_) => "fillet",
            ManufacturingFeature::PlanarFace(_) => "planar_face",
            ManufacturingFeature::ComplexSurface(_) => "complex_surface",
        }
    }

    /// Faces that make up the feature.
    pub fn faces(&self) -> &[FaceId] {
        match self {
            ManufacturingFeature::ThroughHole(f) | ManufacturingFeature::BlindHole(f) => &f.faces,
            ManufacturingFeature::Bore(f) => &f.faces,
            ManufacturingFeature::Boss(f) => &f.faces,
            ManufacturingFeature::Groove(f) => &f.faces,
            ManufacturingFeature::Fillet(f) => &f.faces,
            ManufacturingFeature::PlanarFace(f) => &f.faces,
            ManufacturingFeature::ComplexSurface(f) => &f.faces,
        }
    }

    /// Total area in mm².
    pub fn area_mm2(&self) -> f64 {
        match self {
            ManufacturingFeature::ThroughHole(f) | ManufacturingFeature::BlindHole(f) => f.area_mm2,
            ManufacturingFeature::Bore(f) => f.area_mm2,
            ManufacturingFeature::Boss(f) => f.area_mm2,
            ManufacturingFeature::Groove(f) => f.area_mm2,
            ManufacturingFeature::Fillet(f) => f.area_mm2,
            ManufacturingFeature::PlanarFace(f) => f.area_mm2,
            ManufacturingFeature::ComplexSurface(f) => f.area_mm2,
        }
    }

    /// Display orientation, for features that have one.
    pub fn orientation(&self) -> Option<Orientation> {
        match self {
            ManufacturingFeature::ThroughHole(f) | ManufacturingFeature::BlindHole(f) => {
                Some(f.orientation)
            }
            ManufacturingFeature::Bore(f) => Some(f.orientation),
            ManufacturingFeature::Boss(f) => Some(f.orientation),
            ManufacturingFeature::Groove(f) => Some(f.orientation),
            ManufacturingFeature::PlanarFace(f) => Some(f.orientation),
            ManufacturingFeature::Fillet(_) | ManufacturingFeature::ComplexSurface(_) => None,
        }
    }

    /// True for features recognized from cylinder groups.
    pub fn is_cylindrical(&self) -> bool {
        matches!(
            self,
            ManufacturingFeature::ThroughHole(_)
                | ManufacturingFeature::BlindHole(_)
                | ManufacturingFeature::Bore(_)
                | ManufacturingFeature::Boss(_)
                | ManufacturingFeature::Groove(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_orientation_tie_break() {
        let of = |x, y, z| Orientation::of_axis(&Vec3::new(x, y, z));
        assert_eq!(of(0.0, 0.0, -1.0), Orientation::Bottom);
        assert_eq!(of(1.0, 0.0, 1.0), Orientation::Top);
        assert_eq!(of(-1.0, 1.0, 0.0), Orientation::Left);
        assert_eq!(of(0.1, -0.9, 0.2), Orientation::Back);
    }

    #[test]
    fn test_plane_orientation() {
        assert_eq!(Orientation::of_plane(&Vec3::z()), Orientation::Top);
        assert_eq!(Orientation::of_plane(&-Vec3::z()), Orientation::Bottom);
        assert_eq!(Orientation::of_plane(&-Vec3::x()), Orientation::SideX);
        assert_eq!(Orientation::of_plane(&Vec3::y()), Orientation::SideY);
    }

    #[test]
    fn test_tagged_serialization() {
        let f = ManufacturingFeature::ThroughHole(HoleFeature {
            diameter_mm: 10.0,
            depth_mm: 20.0,
            axis: [0.0, 0.0, 1.0],
            position: [50.0, 50.0, 10.0],
            area_mm2: 628.3,
            orientation: Orientation::Top,
            faces: vec![FaceId(6)],
        });
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["type"], "through_hole");
        assert_eq!(json["orientation"], "top");
        assert_eq!(json["faces"][0], 6);
        assert_eq!(f.kind_name(), "through_hole");
        assert!(f.is_cylindrical());
        let back: ManufacturingFeature = serde_json::from_value(json).unwrap();
        assert_eq!(back, f);
    }
}
