//! Conversion between joint angles (radians) and raw actuator positions.
//!
//! The arm mixes two actuator classes. MX servos (base, shoulder, elbow, wrist pitch) have
//! 4096 positions over a full turn, centered at 2047.5. AX servos (wrist roll, gripper) have
//! 1024 positions over 300 degrees, centered at 511.5. The shoulder is mounted inverted.

use crate::kinematic_traits::{ELBOW, GRIPPER, SHOULDER, WRIST_PITCH, WRIST_ROLL, BASE};

const MX_RADIANS_PER_UNIT: f64 = 0.00153435538637;
const MX_UNITS_PER_RADIAN: f64 = 651.739492;
const MX_CENTER: f64 = 2047.5;

const AX_RADIANS_PER_UNIT: f64 = 0.00511826979472;
const AX_UNITS_PER_RADIAN: f64 = 195.378524405;
const AX_CENTER: f64 = 511.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorClass {
    /// 12 bit resolution, 360 degrees.
    Mx,
    /// 10 bit resolution, 300 degrees.
    Ax,
}

impl ActuatorClass {
    pub fn max_position(&self) -> u16 {
        match self {
            ActuatorClass::Mx => 4095,
            ActuatorClass::Ax => 1023,
        }
    }

    /// Position of the zero angle, rounded up.
    pub fn center_position(&self) -> u16 {
        (self.max_position() + 1) / 2
    }

    /// Clamp a raw position (that may be negative or too large) into the valid range.
    pub fn clamp(&self, position: i64) -> u16 {
        position.clamp(0, self.max_position() as i64) as u16
    }

    fn center(&self) -> f64 {
        match self {
            ActuatorClass::Mx => MX_CENTER,
            ActuatorClass::Ax => AX_CENTER,
        }
    }
}

/// Angle to position mapping of a single joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCodec {
    class: ActuatorClass,
    inverted: bool,
}

impl JointCodec {
    /// Codec for the joint with the given index, None for indices out of 0..=5.
    pub fn for_joint(joint: usize) -> Option<JointCodec> {
        match joint {
            BASE | ELBOW | WRIST_PITCH => Some(JointCodec { class: ActuatorClass::Mx, inverted: false }),
            SHOULDER => Some(JointCodec { class: ActuatorClass::Mx, inverted: true }),
            WRIST_ROLL | GRIPPER => Some(JointCodec { class: ActuatorClass::Ax, inverted: false }),
            _ => None,
        }
    }

    pub fn class(&self) -> ActuatorClass {
        self.class
    }

    fn sign(&self) -> f64 {
        if self.inverted { -1.0 } else { 1.0 }
    }

    /// Raw position to angle in radians.
    pub fn decode(&self, position: u16) -> f64 {
        let per_unit = match self.class {
            ActuatorClass::Mx => MX_RADIANS_PER_UNIT,
            ActuatorClass::Ax => AX_RADIANS_PER_UNIT,
        };
        self.sign() * per_unit * (position as f64 - self.class.center())
    }

    /// Angle in radians to the nearest raw position. The result is not clamped and may be
    /// outside the range of the actuator for angles it cannot reach.
    pub fn encode(&self, angle: f64) -> i64 {
        let per_radian = match self.class {
            ActuatorClass::Mx => MX_UNITS_PER_RADIAN,
            ActuatorClass::Ax => AX_UNITS_PER_RADIAN,
        };
        (self.sign() * per_radian * angle + self.class.center()).round() as i64
    }

    /// Angle to raw position, clamped into the actuator range.
    pub fn encode_clamped(&self, angle: f64) -> u16 {
        self.class.clamp(self.encode(angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_classes() {
        for joint in [BASE, SHOULDER, ELBOW, WRIST_PITCH] {
            assert_eq!(JointCodec::for_joint(joint).unwrap().class(), ActuatorClass::Mx);
        }
        for joint in [WRIST_ROLL, GRIPPER] {
            assert_eq!(JointCodec::for_joint(joint).unwrap().class(), ActuatorClass::Ax);
        }
        assert!(JointCodec::for_joint(6).is_none());
    }

    #[test]
    fn test_round_trip_all_positions() {
        // Decoding and encoding again must land on the same raw position
        for joint in 0..6 {
            let codec = JointCodec::for_joint(joint).unwrap();
            for position in 0..=codec.class().max_position() {
                let angle = codec.decode(position);
                assert_eq!(codec.encode(angle), position as i64, "joint {} position {}", joint, position);
            }
        }
    }

    #[test]
    fn test_center_and_direction() {
        let base = JointCodec::for_joint(BASE).unwrap();
        let shoulder = JointCodec::for_joint(SHOULDER).unwrap();
        assert!(base.decode(2048).abs() < 1e-3);
        assert_eq!(base.encode(0.0), 2048);
        // Quarter of a turn is 1024 units, in opposite directions
        assert_eq!(base.encode(PI / 2.0), 3071);
        assert_eq!(shoulder.encode(PI / 2.0), 1024);
        assert!((shoulder.decode(1024) - PI / 2.0).abs() < 2e-3);
    }

    #[test]
    fn test_ax_range() {
        let roll = JointCodec::for_joint(WRIST_ROLL).unwrap();
        assert!((roll.decode(0) + 150f64.to_radians()).abs() < 1e-3);
        assert!((roll.decode(1023) - 150f64.to_radians()).abs() < 1e-3);
        // Beyond the 300 degree range, encoding leaves the actuator range
        assert!(roll.encode(PI) > 1023);
        assert_eq!(roll.encode_clamped(PI), 1023);
        assert_eq!(roll.encode_clamped(-PI), 0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(ActuatorClass::Mx.clamp(-5), 0);
        assert_eq!(ActuatorClass::Mx.clamp(5000), 4095);
        assert_eq!(ActuatorClass::Ax.clamp(5000), 1023);
        assert_eq!(ActuatorClass::Ax.clamp(700), 700);
    }
}
