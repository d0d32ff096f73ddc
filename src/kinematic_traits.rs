//! Core types shared by the solver, the controller and the callers.

extern crate nalgebra as na;

use std::fmt;
use na::{Isometry3, Matrix3, Point3};

/// Pose is used a pose of the gripper center point. It contains both Cartesian position and
/// rotation quaternion.
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion, Vector3};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(20.0, 0.0, 9.0);
/// // Gripper pointing to the floor
/// let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
/// let pose = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// Joint angles in radians, index 0 (base) to 5 (gripper).
pub type Joints = [f64; 6];

/// For providing current joints when nothing better is known.
pub const JOINTS_AT_ZERO: Joints = [0.0; 6];

/// Logical joint indices. The physical actuator id of each joint is configured separately.
pub const BASE: usize = 0;
pub const SHOULDER: usize = 1;
pub const ELBOW: usize = 2;
pub const WRIST_PITCH: usize = 3;
pub const WRIST_ROLL: usize = 4;
pub const GRIPPER: usize = 5;

/// How the orientation of the gripper is constrained when solving for a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrientationConstraint {
    /// No orientation requested, the wrist pitch joint keeps its current angle.
    HoldWrist,

    /// Pitch of the gripper relative to horizontal (gamma). PI/2 points the gripper to the floor.
    Pitch(f64),

    /// Like `Pitch`, but when both elbow branches are usable, the branch farther from
    /// `previous_elbow` is tried first. Used by continuous teleoperation.
    ContinuityBiasedPitch { gamma: f64, previous_elbow: f64 },

    /// Full gripper rotation, as seen from the frame of joint 1 (rotated with the base).
    Rotation(Matrix3<f64>),

    /// Full gripper rotation, as seen from the base of the robot.
    BaseRotation(Matrix3<f64>),
}

/// Desired gripper position, in the same length unit as the arm geometry, plus orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianPose {
    pub position: Point3<f64>,
    pub orientation: OrientationConstraint,
}

impl CartesianPose {
    pub fn new(x: f64, y: f64, z: f64, orientation: OrientationConstraint) -> Self {
        CartesianPose { position: Point3::new(x, y, z), orientation }
    }

    /// Position only, wrist pitch held.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self::new(x, y, z, OrientationConstraint::HoldWrist)
    }

    /// Position with the gripper pitch gamma.
    pub fn with_pitch(x: f64, y: f64, z: f64, gamma: f64) -> Self {
        Self::new(x, y, z, OrientationConstraint::Pitch(gamma))
    }
}

/// Reason why there is no solution for the inverse kinematics. Infeasibility is an expected
/// outcome: the arm must simply stay where it is. Variants are ordered by how far the search
/// got before failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Unreachable {
    /// The target is too far or too close, the elbow equation has no real root.
    NoRealRoot,
    /// No elbow root lies within the elbow limits.
    ElbowLimit,
    /// Elbow roots exist, but the shoulder angle they require is out of limits.
    ShoulderLimit,
    /// Elbow and shoulder are fine, but the derived wrist pitch is out of limits.
    WristLimit,
}

impl fmt::Display for Unreachable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Unreachable::NoRealRoot => write!(f, "No solution for IK: target out of reach"),
            Unreachable::ElbowLimit => write!(f, "No solution for IK: elbow out of limits"),
            Unreachable::ShoulderLimit => write!(f, "No solution for IK: shoulder out of limits"),
            Unreachable::WristLimit => write!(f, "No solution for IK: wrist pitch out of limits"),
        }
    }
}

impl std::error::Error for Unreachable {}

pub trait Kinematics {
    /// Find joint angles for the given pose. `current` provides the joints the solver does not
    /// control (wrist pitch when it is held, wrist roll, gripper); they are copied into the result.
    /// A target or current joints that are not finite have no solution.
    fn inverse(&self, pose: &CartesianPose, current: &Joints) -> Result<Joints, Unreachable>;

    /// Pose of the gripper center point for the given joints.
    fn forward(&self, qs: &Joints) -> Pose;

    /// Gripper center point and gripper pitch (gamma) for the given joints.
    fn forward_point(&self, qs: &Joints) -> (Point3<f64>, f64);
}
