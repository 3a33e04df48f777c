//! Positions, cardinal rotations and mirroring in schematic coordinates.
//!
//! Schematic coordinates are millimetres with Y growing downward. Symbol
//! libraries use Y growing upward, so pin offsets are flipped when they are
//! mapped onto a sheet.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Snap a coordinate to 0.1 µm so that arithmetic noise never reaches a document.
pub fn snap(v: f64) -> f64 {
    let snapped = (v * 10_000.0).round() / 10_000.0;
    if snapped == 0.0 { 0.0 } else { snapped }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn snapped(self) -> Self {
        Self::new(snap(self.x), snap(self.y))
    }

    /// Exact equality after snapping.
    pub fn coincides(self, other: Point) -> bool {
        self.snapped() == other.snapped()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", snap(self.x), snap(self.y))
    }
}

/// One of the four cardinal rotations, counter-clockwise as seen on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn degrees(self) -> f64 {
        match self {
            Rotation::R0 => 0.0,
            Rotation::R90 => 90.0,
            Rotation::R180 => 180.0,
            Rotation::R270 => 270.0,
        }
    }

    fn quarter_turns(self) -> u8 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => Rotation::R0,
            1 => Rotation::R90,
            2 => Rotation::R180,
            _ => Rotation::R270,
        }
    }

    /// Compose two rotations.
    pub fn then(self, other: Rotation) -> Rotation {
        Self::from_quarter_turns(self.quarter_turns() + other.quarter_turns())
    }

    pub fn opposite(self) -> Rotation {
        self.then(Rotation::R180)
    }

    /// Rotate a vector given in screen coordinates (Y down).
    pub fn apply(self, p: Point) -> Point {
        match self {
            Rotation::R0 => p,
            Rotation::R90 => Point::new(p.y, -p.x),
            Rotation::R180 => Point::new(-p.x, -p.y),
            Rotation::R270 => Point::new(-p.y, p.x),
        }
    }

    /// Direction after reflecting across `axis`.
    pub fn mirrored(self, axis: MirrorAxis) -> Rotation {
        match (axis, self) {
            (MirrorAxis::Y, Rotation::R0) => Rotation::R180,
            (MirrorAxis::Y, Rotation::R180) => Rotation::R0,
            (MirrorAxis::X, Rotation::R90) => Rotation::R270,
            (MirrorAxis::X, Rotation::R270) => Rotation::R90,
            (_, other) => other,
        }
    }
}

impl TryFrom<f64> for Rotation {
    type Error = Error;

    fn try_from(degrees: f64) -> Result<Self> {
        if !degrees.is_finite() {
            return Err(Error::NonCardinalRotation(degrees));
        }
        let normalized = degrees.rem_euclid(360.0);
        match normalized {
            n if n == 0.0 => Ok(Rotation::R0),
            n if n == 90.0 => Ok(Rotation::R90),
            n if n == 180.0 => Ok(Rotation::R180),
            n if n == 270.0 => Ok(Rotation::R270),
            _ => Err(Error::NonCardinalRotation(degrees)),
        }
    }
}

impl From<Rotation> for f64 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}

/// Mirror axis of a placed symbol. `X` flips vertically, `Y` flips horizontally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorAxis {
    X,
    Y,
}

impl MirrorAxis {
    pub fn as_str(self) -> &'static str {
        match self {
            MirrorAxis::X => "x",
            MirrorAxis::Y => "y",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "x" => Some(MirrorAxis::X),
            "y" => Some(MirrorAxis::Y),
            _ => None,
        }
    }

    pub fn apply(self, p: Point) -> Point {
        match self {
            MirrorAxis::X => Point::new(p.x, -p.y),
            MirrorAxis::Y => Point::new(-p.x, p.y),
        }
    }
}

/// Map a symbol-local offset (Y up) to an absolute sheet position.
///
/// Rotation is applied first, then the mirror.
pub fn place_offset(
    origin: Point,
    local: Point,
    rotation: Rotation,
    mirror: Option<MirrorAxis>,
) -> Point {
    let screen = Point::new(local.x, -local.y);
    let rotated = rotation.apply(screen);
    let transformed = match mirror {
        Some(axis) => axis.apply(rotated),
        None => rotated,
    };
    origin.offset(transformed.x, transformed.y).snapped()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinal_rotations_parse() {
        assert_eq!(Rotation::try_from(0.0).unwrap(), Rotation::R0);
        assert_eq!(Rotation::try_from(90.0).unwrap(), Rotation::R90);
        assert_eq!(Rotation::try_from(-90.0).unwrap(), Rotation::R270);
        assert_eq!(Rotation::try_from(540.0).unwrap(), Rotation::R180);
    }

    #[test]
    fn non_cardinal_rotations_are_rejected() {
        for bad in [45.0, 89.999, 1.0, f64::NAN] {
            assert!(matches!(
                Rotation::try_from(bad),
                Err(Error::NonCardinalRotation(_))
            ));
        }
    }

    #[test]
    fn rotation_deserializes_through_the_cardinal_check() {
        #[derive(Deserialize)]
        struct Holder {
            rotation: Rotation,
        }
        let ok: Holder = serde_json::from_str(r#"{"rotation": 270}"#).unwrap();
        assert_eq!(ok.rotation, Rotation::R270);
        assert!(serde_json::from_str::<Holder>(r#"{"rotation": 30}"#).is_err());
    }

    #[test]
    fn offsets_follow_rotation() {
        let origin = Point::new(100.0, 100.0);
        // Pin 3.81 mm above the origin in library coordinates.
        let local = Point::new(0.0, 3.81);
        assert_eq!(
            place_offset(origin, local, Rotation::R0, None),
            Point::new(100.0, 96.19)
        );
        // Rotated a quarter turn counter-clockwise the pin points left.
        assert_eq!(
            place_offset(origin, local, Rotation::R90, None),
            Point::new(96.19, 100.0)
        );
        assert_eq!(
            place_offset(origin, local, Rotation::R180, None),
            Point::new(100.0, 103.81)
        );
        assert_eq!(
            place_offset(origin, local, Rotation::R270, None),
            Point::new(103.81, 100.0)
        );
    }

    #[test]
    fn mirror_is_applied_after_rotation() {
        let origin = Point::new(0.0, 0.0);
        let local = Point::new(2.54, 0.0);
        assert_eq!(
            place_offset(origin, local, Rotation::R0, Some(MirrorAxis::Y)),
            Point::new(-2.54, 0.0)
        );
        assert_eq!(
            place_offset(origin, local, Rotation::R90, Some(MirrorAxis::X)),
            Point::new(0.0, 2.54)
        );
    }

    #[test]
    fn rotations_compose() {
        assert_eq!(Rotation::R90.then(Rotation::R270), Rotation::R0);
        assert_eq!(Rotation::R270.opposite(), Rotation::R90);
        assert_eq!(Rotation::R0.mirrored(MirrorAxis::Y), Rotation::R180);
        assert_eq!(Rotation::R0.mirrored(MirrorAxis::X), Rotation::R0);
    }
}
