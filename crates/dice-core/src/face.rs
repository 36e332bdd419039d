//! Face decoding: which face of a settled die points up.
//!
//! A settled rotation is decomposed into heading (about y), attitude (about z)
//! and bank (about x), applied in that order. The decomposition is invariant
//! to spin about the vertical axis, so only attitude and bank decide the face:
//!
//! | attitude | bank   | face |
//! |----------|--------|------|
//! | 0        | 0      | 1    |
//! | +π/2     | any    | 2    |
//! | 0        | -π/2   | 3    |
//! | 0        | +π/2   | 4    |
//! | -π/2     | any    | 5    |
//! | 0        | ±π     | 6    |

use std::f32::consts::{FRAC_PI_2, PI};

use rapier3d::prelude::*;

/// Above this, the attitude is snapped to the ±π/2 pole.
const POLE_THRESHOLD: f32 = 0.499;

/// Euler decomposition of a rotation, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    /// Rotation about x, applied first.
    pub bank: f32,
    /// Rotation about y, applied last.
    pub heading: f32,
    /// Rotation about z.
    pub attitude: f32,
}

impl EulerAngles {
    /// Decomposes a unit quaternion.
    pub fn from_rotation(rotation: &Rotation<Real>) -> Self {
        let q = rotation.quaternion();
        let (x, y, z, w) = (q.i, q.j, q.k, q.w);

        let test = x * y + z * w;
        if test > POLE_THRESHOLD {
            return Self {
                bank: 0.0,
                heading: 2.0 * x.atan2(w),
                attitude: FRAC_PI_2,
            };
        }
        if test < -POLE_THRESHOLD {
            return Self {
                bank: 0.0,
                heading: -2.0 * x.atan2(w),
                attitude: -FRAC_PI_2,
            };
        }

        let sqx = x * x;
        let sqy = y * y;
        let sqz = z * z;
        Self {
            bank: (2.0 * x * w - 2.0 * y * z).atan2(1.0 - 2.0 * sqx - 2.0 * sqz),
            heading: (2.0 * y * w - 2.0 * x * z).atan2(1.0 - 2.0 * sqy - 2.0 * sqz),
            attitude: (2.0 * test).clamp(-1.0, 1.0).asin(),
        }
    }
}

/// Result of decoding a settled die.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceReading {
    /// The die rests on a face showing this value.
    Face(u8),
    /// The die is not axis-aligned within tolerance and must be thrown again.
    Ambiguous,
}

impl FaceReading {
    pub fn value(self) -> Option<u8> {
        match self {
            Self::Face(value) => Some(value),
            Self::Ambiguous => None,
        }
    }
}

/// Decodes the upward face from Euler angles.
pub fn decode_face(angles: &EulerAngles, tolerance: f32) -> FaceReading {
    let near = |value: f32, target: f32| (value - target).abs() < tolerance;

    if near(angles.attitude, 0.0) {
        if near(angles.bank, 0.0) {
            FaceReading::Face(1)
        } else if near(angles.bank, FRAC_PI_2) {
            FaceReading::Face(4)
        } else if near(angles.bank, -FRAC_PI_2) {
            FaceReading::Face(3)
        } else if near(angles.bank, PI) || near(angles.bank, -PI) {
            FaceReading::Face(6)
        } else {
            FaceReading::Ambiguous
        }
    } else if near(angles.attitude, FRAC_PI_2) {
        FaceReading::Face(2)
    } else if near(angles.attitude, -FRAC_PI_2) {
        FaceReading::Face(5)
    } else {
        FaceReading::Ambiguous
    }
}

/// Decodes the upward face of a body rotation.
pub fn decode_rotation(rotation: &Rotation<Real>, tolerance: f32) -> FaceReading {
    decode_face(&EulerAngles::from_rotation(rotation), tolerance)
}

/// A rotation that rests the die with `face` pointing up, or `None` for values outside 1..=6.
pub fn canonical_rotation(face: u8) -> Option<Rotation<Real>> {
    let about = |axis: UnitVector<Real>, angle: Real| Rotation::from_axis_angle(&axis, angle);
    let rotation = match face {
        1 => Rotation::identity(),
        2 => about(Vector::z_axis(), FRAC_PI_2),
        3 => about(Vector::x_axis(), -FRAC_PI_2),
        4 => about(Vector::x_axis(), FRAC_PI_2),
        5 => about(Vector::z_axis(), -FRAC_PI_2),
        6 => about(Vector::x_axis(), PI),
        _ => return None,
    };
    Some(rotation)
}

/// Unit vector, in the die's local frame, of the axis that points up when `face` shows.
///
/// The inverse of `canonical_rotation` applied to world up.
pub fn local_up_axis(face: u8) -> Option<Vector<Real>> {
    canonical_rotation(face).map(|rotation| rotation.inverse_transform_vector(&Vector::y()))
}
