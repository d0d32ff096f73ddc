//! Rust implementation of inverse and forward kinematics, smooth joint space motion and
//! the servo bus protocol for the Trossen Robotics WidowX, a 6 servo arm with base yaw,
//! shoulder, elbow, wrist pitch, wrist roll and gripper.
//!
//! # Features
//!
//! - Closed form inverse kinematics for the gripper position, with the wrist pitch held,
//!   with a desired gripper pitch (gamma), or with a full gripper rotation.
//! - Both elbow solutions are considered; only solutions that keep the shoulder, elbow and
//!   wrist pitch within their limits are returned. Infeasible targets are reported with
//!   the reason, never partially applied.
//! - Cubic joint space trajectories with zero velocity at both ends, sampled on a fixed
//!   cadence and dispatched as a single synchronized write frame per sample.
//! - Encoding and decoding of the synchronized write frame of the servo bus.
//! - The arm controller works over [transport::ServoBus] and [transport::Clock] traits, so
//!   it can be driven deterministically in tests or with the included simulated bus.
//! - Arm configuration (geometry, limits, actuator ids, timing, preset poses) can be read
//!   from YAML.
//!
//! # Parameters
//!
//! The arm is described by five lengths (_l0 .. l4_). The zero pose of the arm is the
//! upside down L: the upper arm goes up and the forearm and gripper point forward. The
//! shoulder-to-elbow link has a vertical part _l1_ and a horizontal part _l2_.
//!
//! ```
//! use rs_widowx_kinematics::kinematic_traits::{CartesianPose, Kinematics, JOINTS_AT_ZERO};
//! use rs_widowx_kinematics::kinematics_impl::WidowXKinematics;
//! use rs_widowx_kinematics::parameters::widowx_kinematics::Parameters;
//!
//! let robot = WidowXKinematics::new(Parameters::widowx());
//! // Gripper 20 cm in front of the robot, at the height of the shoulder, pointing down
//! let pose = CartesianPose::with_pitch(20.0, 0.0, 9.0, std::f64::consts::FRAC_PI_2);
//! let joints = robot.inverse(&pose, &JOINTS_AT_ZERO).expect("reachable");
//! let (point, _gamma) = robot.forward_point(&joints);
//! assert!((point.x - 20.0).abs() < 1e-6);
//! ```
//!
//! ## Examples
//!
//! - **basic.rs**: Inverse and forward kinematics in all orientation modes.
//! - **teleoperation.rs**: Velocity driven control of the simulated arm.

pub mod parameters;
pub mod parameters_robots;

#[cfg(feature = "allow_filesystem")]
pub mod parameters_from_file;
#[cfg(feature = "allow_filesystem")]
pub mod parameter_error;

#[path = "utils/utils.rs"]
pub mod utils;
pub mod kinematic_traits;
pub mod kinematics_impl;

pub mod constraints;

pub mod joint_codec;

pub mod config;

pub mod poses;

#[path = "path_plan/trajectory.rs"]
pub mod trajectory;

#[path = "bus/sync_write.rs"]
pub mod sync_write;

#[path = "bus/transport.rs"]
pub mod transport;

pub mod controller;
