//! Yaw-only orientations in the horizontal plane.
//!
//! Quaternions are stored (x, y, z, w) with y up, so a yaw of θ is
//! `[0, sin(θ/2), 0, cos(θ/2)]`. The manifest writes a rotation either as
//! that 4-element quaternion or as a 1-element yaw angle.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::prng::Pcg32;
use crate::types::Vec3;

/// Largest |x| or |z| tolerated before a quaternion counts as pitched or rolled.
const PLANAR_EPS: f64 = 1e-9;
/// Largest deviation from unit norm tolerated on input quaternions.
const UNIT_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rotation {
    Quaternion([f64; 4]),
    Yaw([f64; 1]),
}

impl Rotation {
    /// Yaw-only quaternion for a rotation of `yaw` radians about +y.
    pub fn from_yaw(yaw: f64) -> Self {
        let half = yaw / 2.0;
        Rotation::Quaternion([0.0, half.sin(), 0.0, half.cos()])
    }

    /// Rotation about the vertical axis, in radians.
    ///
    /// Fails for NaN components, non-unit quaternions, and quaternions
    /// with pitch or roll.
    pub fn yaw(&self) -> Result<f64> {
        match *self {
            Rotation::Yaw([yaw]) => {
                if yaw.is_finite() {
                    Ok(yaw)
                } else {
                    Err(EngineError::InvalidOrientation(format!(
                        "yaw must be finite, got {yaw}"
                    )))
                }
            }
            Rotation::Quaternion([x, y, z, w]) => {
                if [x, y, z, w].iter().any(|c| !c.is_finite()) {
                    return Err(EngineError::InvalidOrientation(
                        "quaternion has non-finite components".into(),
                    ));
                }
                if x.abs() > PLANAR_EPS || z.abs() > PLANAR_EPS {
                    return Err(EngineError::InvalidOrientation(format!(
                        "quaternion [{x}, {y}, {z}, {w}] is not yaw-only"
                    )));
                }
                let norm = (y * y + w * w).sqrt();
                if (norm - 1.0).abs() > UNIT_EPS {
                    return Err(EngineError::InvalidOrientation(format!(
                        "quaternion norm {norm} is not 1"
                    )));
                }
                Ok(2.0 * y.atan2(w))
            }
        }
    }

    pub fn components(&self) -> &[f64] {
        match self {
            Rotation::Quaternion(q) => q,
            Rotation::Yaw(y) => y,
        }
    }
}

/// Face from `from` toward `to` in the x-z plane: yaw = atan2(dz, dx).
pub fn aim_at(from: &Vec3, to: &Vec3) -> Rotation {
    let dx = to[0] - from[0];
    let dz = to[2] - from[2];
    Rotation::from_yaw(dz.atan2(dx))
}

/// Yaw drawn uniformly from [0, 2π).
pub fn random_orientation(rng: &mut Pcg32) -> Rotation {
    Rotation::from_yaw(rng.next_angle())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_yaw_only(r: &Rotation) {
        match r {
            Rotation::Quaternion([x, _, z, _]) => {
                assert_eq!(*x, 0.0);
                assert_eq!(*z, 0.0);
            }
            Rotation::Yaw(_) => panic!("solver should emit quaternions"),
        }
    }

    #[test]
    fn facing_positive_x_is_zero_yaw() {
        let r = aim_at(&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert_eq!(r, Rotation::Quaternion([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(r.yaw().unwrap(), 0.0);
    }

    #[test]
    fn facing_positive_z_is_quarter_turn() {
        let r = aim_at(&[1.0, 5.0, 1.0], &[1.0, -3.0, 4.0]);
        assert!((r.yaw().unwrap() - FRAC_PI_2).abs() < 1e-12);
        assert_yaw_only(&r);
    }

    #[test]
    fn height_difference_does_not_tilt() {
        let r = aim_at(&[0.0, 0.0, 0.0], &[-2.0, 10.0, 0.0]);
        assert_yaw_only(&r);
        assert!((r.yaw().unwrap().abs() - PI).abs() < 1e-12);
    }

    #[test]
    fn random_orientations_are_yaw_only_unit() {
        let mut rng = Pcg32::new(9, 1);
        for _ in 0..500 {
            let r = random_orientation(&mut rng);
            assert_yaw_only(&r);
            let q = r.components();
            let norm: f64 = q.iter().map(|c| c * c).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn yaw_round_trips_past_half_pi() {
        // Euler decomposition folds these; half-angle extraction does not.
        for yaw in [2.0, 3.0, -2.5] {
            let back = Rotation::from_yaw(yaw).yaw().unwrap();
            assert!((back - yaw).abs() < 1e-12, "{yaw} -> {back}");
        }
    }

    #[test]
    fn encodings_other_than_yaw_or_quaternion_rejected() {
        for bad in ["[]", "[0.0, 1.0]", "[0.0, 0.0, 0.0]"] {
            assert!(serde_json::from_str::<Rotation>(bad).is_err(), "{bad}");
        }
        let q: Rotation = serde_json::from_str("[0.0, 0.0, 0.0, 1.0]").unwrap();
        assert_eq!(q.yaw().unwrap(), 0.0);
    }

    #[test]
    fn pitched_quaternion_rejected() {
        let s = (0.5f64).sqrt();
        let err = Rotation::Quaternion([s, 0.0, 0.0, s]).yaw().unwrap_err();
        assert!(matches!(err, EngineError::InvalidOrientation(_)));
        assert!(Rotation::Quaternion([0.0, 0.3, 0.0, 0.3]).yaw().is_err());
        assert!(Rotation::Yaw([f64::NAN]).yaw().is_err());
    }

    #[test]
    fn serializes_as_plain_list() {
        let q = serde_json::to_string(&Rotation::Quaternion([0.0, 0.0, 0.0, 1.0])).unwrap();
        assert_eq!(q, "[0.0,0.0,0.0,1.0]");
        let y: Rotation = serde_json::from_str("[1.25]").unwrap();
        assert_eq!(y, Rotation::Yaw([1.25]));
    }
}
