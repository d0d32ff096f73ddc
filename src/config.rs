//! Everything that describes one physical arm: geometry, limits, actuator ids, controller
//! timing and preset poses. Defaults are those of the WidowX.

use std::time::Duration;

use crate::constraints::Constraints;
use crate::parameters::widowx_kinematics::Parameters;
use crate::poses::StaticPoses;

/// Cartesian box (and gripper pitch range) the velocity driven teleoperation stays within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Workspace {
    /// Limit for both |x| and |y|.
    pub xy_limit: f64,
    pub z_min: f64,
    pub z_max: f64,
    /// Limit for |gamma|, radians.
    pub gamma_limit: f64,
}

impl Workspace {
    pub fn clamp_xy(&self, v: f64) -> f64 {
        v.clamp(-self.xy_limit, self.xy_limit)
    }

    pub fn clamp_z(&self, z: f64) -> f64 {
        z.clamp(self.z_min, self.z_max)
    }

    pub fn clamp_gamma(&self, gamma: f64) -> f64 {
        gamma.clamp(-self.gamma_limit, self.gamma_limit)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Workspace {
            xy_limit: 43.0,
            z_min: -26.0,
            z_max: 52.0,
            gamma_limit: 91f64.to_radians(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Duration of moves when none is given.
    pub default_duration: Duration,
    /// Interval between trajectory samples.
    pub sample_period: Duration,
    /// Shortest duration any interpolated move is given.
    pub min_duration: Duration,
    /// Pause after the final corrective writes of a move.
    pub settle_delay: Duration,
    /// Additional reads after the first one failed.
    pub read_retries: u32,
    /// Delay after the n-th failed retry is n times this.
    pub read_backoff: Duration,
    /// Pause after switching torque of each actuator.
    pub torque_delay: Duration,
    /// Pause between single unit steps of `move_joint_to_position`.
    pub joint_step_delay: Duration,
    /// Pause between moving to rest and relaxing in `init`.
    pub init_pause: Duration,
    /// Raw units per second, per unit of joint speed command.
    pub joint_speed_gain: f64,
    /// Length units per second, per unit of Cartesian speed command.
    pub point_speed_gain: f64,
    /// Radians per second, per unit of gripper pitch speed command.
    pub gamma_speed_gain: f64,
    pub workspace: Workspace,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            default_duration: Duration::from_millis(2000),
            sample_period: Duration::from_millis(10),
            min_duration: Duration::from_millis(20),
            settle_delay: Duration::from_millis(3),
            read_retries: 9,
            read_backoff: Duration::from_millis(10),
            torque_delay: Duration::from_millis(10),
            joint_step_delay: Duration::from_millis(3),
            init_pause: Duration::from_millis(100),
            joint_speed_gain: 512.0 / 255.0,
            point_speed_gain: 5.0 / 127.5,
            gamma_speed_gain: (90.0 / 255.0f64).to_radians(),
            workspace: Workspace::default(),
        }
    }
}

/// Complete description of an arm.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmConfig {
    pub geometry: Parameters,
    pub constraints: Constraints,
    /// Physical actuator id of each logical joint.
    pub ids: [u8; 6],
    pub controller: ControllerConfig,
    pub poses: StaticPoses,
}

impl ArmConfig {
    pub fn widowx() -> Self {
        ArmConfig {
            geometry: Parameters::widowx(),
            constraints: Constraints::widowx(),
            ids: [1, 2, 3, 4, 5, 6],
            controller: ControllerConfig::default(),
            poses: StaticPoses::widowx(),
        }
    }
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self::widowx()
    }
}
