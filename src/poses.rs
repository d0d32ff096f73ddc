//! Named preset poses, given as raw actuator positions of all six joints.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetPose {
    /// Arm folded over itself, safe to relax.
    Rest,
    /// Home position of the original arm controller.
    Home,
    /// All articular values at zero, the arm forms an upside down L.
    Center,
}

impl fmt::Display for PresetPose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PresetPose::Rest => write!(f, "rest"),
            PresetPose::Home => write!(f, "home"),
            PresetPose::Center => write!(f, "center"),
        }
    }
}

/// Provides the raw positions of the preset poses, read at the moment of the move.
pub trait PoseTable {
    fn pose(&self, preset: PresetPose) -> Option<[u16; 6]>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "allow_filesystem", derive(serde::Deserialize))]
pub struct StaticPoses {
    pub rest: [u16; 6],
    pub home: [u16; 6],
    pub center: [u16; 6],
}

impl StaticPoses {
    pub fn widowx() -> Self {
        StaticPoses {
            rest: [2048, 2048, 1030, 1000, 512, 512],
            home: [2048, 2048, 2048, 1024, 512, 512],
            center: [2048, 2048, 2048, 2048, 512, 512],
        }
    }
}

impl Default for StaticPoses {
    fn default() -> Self {
        Self::widowx()
    }
}

impl PoseTable for StaticPoses {
    fn pose(&self, preset: PresetPose) -> Option<[u16; 6]> {
        Some(match preset {
            PresetPose::Rest => self.rest,
            PresetPose::Home => self.home,
            PresetPose::Center => self.center,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint_codec::JointCodec;

    #[test]
    fn test_center_is_zero() {
        let center = StaticPoses::widowx().pose(PresetPose::Center).unwrap();
        for (joint, &position) in center.iter().enumerate() {
            let angle = JointCodec::for_joint(joint).unwrap().decode(position);
            assert!(angle.abs() < 3e-3, "joint {} at {}", joint, angle);
        }
    }

    #[test]
    fn test_presets_within_range() {
        let poses = StaticPoses::widowx();
        for preset in [PresetPose::Rest, PresetPose::Home, PresetPose::Center] {
            let pose = poses.pose(preset).unwrap();
            for (joint, &position) in pose.iter().enumerate() {
                let max = JointCodec::for_joint(joint).unwrap().class().max_position();
                assert!(position <= max, "{} joint {}", preset, joint);
            }
        }
    }
}
