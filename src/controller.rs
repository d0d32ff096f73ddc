//! Drives the physical arm: reads the present joint positions from the bus, solves the
//! inverse kinematics, interpolates and dispatches goal positions.
//!
//! Interpolated motions are stepped explicitly with [ArmController::advance], or run until
//! done with [ArmController::run_to_completion] (what all blocking `move_*` methods do).
//! While a motion is in flight, no other command touches the bus.

use std::fmt;
use std::time::Duration;

use nalgebra::Point3;
use tracing::{debug, info, warn};

use crate::config::{ArmConfig, ControllerConfig};
use crate::joint_codec::JointCodec;
use crate::kinematic_traits::{
    CartesianPose, Joints, Kinematics, OrientationConstraint, Unreachable, ELBOW, GRIPPER,
    WRIST_PITCH, WRIST_ROLL,
};
use crate::kinematics_impl::WidowXKinematics;
use crate::poses::{PoseTable, PresetPose, StaticPoses};
use crate::sync_write::SyncWrite;
use crate::trajectory::{Step, Targets, Trajectory};
use crate::transport::{Clock, ServoBus};

const ALL_JOINTS: [usize; 6] = [0, 1, 2, 3, 4, 5];

/// Joints moved by Cartesian moves. The gripper keeps its position.
const ARM_JOINTS: [usize; 5] = [0, 1, 2, 3, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    /// Torque on, no motion in flight.
    Idle,
    /// Interpolated motion in flight.
    Moving,
    /// Torque off on all actuators.
    Relaxed,
}

/// Known state of a single joint. Angles are in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointState {
    /// Physical actuator id.
    pub id: u8,
    /// Last position read from the actuator.
    pub position: u16,
    /// Angle matching `position`.
    pub angle: f64,
    /// Last goal position.
    pub desired_position: u16,
    /// Angle requested for the last goal. May differ slightly from the angle of
    /// `desired_position` because of rounding and clamping.
    pub desired_angle: f64,
}

#[derive(Debug)]
pub enum ControlError {
    /// No solution for the requested pose, nothing has been sent.
    Unreachable(Unreachable),
    /// Failure reported by the bus.
    Bus(anyhow::Error),
    InvalidJoint(usize),
    MissingPose(PresetPose),
    /// A motion is in flight.
    Busy,
    /// Zero sample period in the configuration.
    InvalidTiming,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlError::Unreachable(reason) => write!(f, "{}", reason),
            ControlError::Bus(err) => write!(f, "Bus error: {}", err),
            ControlError::InvalidJoint(joint) => write!(f, "No joint with index {}", joint),
            ControlError::MissingPose(preset) => write!(f, "Pose table has no {} pose", preset),
            ControlError::Busy => write!(f, "Motion in progress"),
            ControlError::InvalidTiming => write!(f, "Sample period must be positive"),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControlError::Unreachable(reason) => Some(reason),
            ControlError::Bus(err) => Some(&**err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for ControlError {
    fn from(err: anyhow::Error) -> Self {
        ControlError::Bus(err)
    }
}

impl From<Unreachable> for ControlError {
    fn from(reason: Unreachable) -> Self {
        ControlError::Unreachable(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogDirection {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripperCommand {
    Close,
    Open,
}

struct Motion {
    trajectory: Trajectory,
    started: Duration,
}

fn codec(joint: usize) -> Result<JointCodec, ControlError> {
    JointCodec::for_joint(joint).ok_or(ControlError::InvalidJoint(joint))
}

pub struct ArmController<B, C, K = WidowXKinematics, P = StaticPoses> {
    bus: B,
    clock: C,
    kinematics: K,
    poses: P,
    config: ControllerConfig,
    joints: [JointState; 6],
    state: ArmState,
    motion: Option<Motion>,
}

impl<B: ServoBus, C: Clock> ArmController<B, C> {
    /// Controller for the arm described by the configuration.
    pub fn new(bus: B, clock: C, config: &ArmConfig) -> Self {
        let kinematics = WidowXKinematics::new_with_constraints(config.geometry, config.constraints);
        Self::with_parts(bus, clock, kinematics, config.poses, config.ids, config.controller)
    }
}

impl<B: ServoBus, C: Clock, K: Kinematics, P: PoseTable> ArmController<B, C, K, P> {
    /// Controller with custom kinematics and pose table. Until the first read, all joints
    /// are assumed to be at the center of their actuator range.
    pub fn with_parts(bus: B, clock: C, kinematics: K, poses: P, ids: [u8; 6],
                      config: ControllerConfig) -> Self {
        let joints = std::array::from_fn(|joint| {
            let codec = JointCodec::for_joint(joint);
            let position = codec.map_or(0, |c| c.class().center_position());
            let angle = codec.map_or(0.0, |c| c.decode(position));
            JointState { id: ids[joint], position, angle, desired_position: position, desired_angle: angle }
        });
        ArmController { bus, clock, kinematics, poses, config, joints, state: ArmState::Idle, motion: None }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn kinematics(&self) -> &K {
        &self.kinematics
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> ArmState {
        self.state
    }

    pub fn joints(&self) -> &[JointState; 6] {
        &self.joints
    }

    pub fn joint(&self, joint: usize) -> Option<&JointState> {
        self.joints.get(joint)
    }

    /// Angles as last read from the actuators (no bus access).
    pub fn current_angles(&self) -> Joints {
        std::array::from_fn(|joint| self.joints[joint].angle)
    }

    pub fn desired_angles(&self) -> Joints {
        std::array::from_fn(|joint| self.joints[joint].desired_angle)
    }

    /// Assigns the physical actuator id of a joint. Invalid joint indices are ignored.
    pub fn set_id(&mut self, joint: usize, id: u8) {
        match self.joints.get_mut(joint) {
            Some(state) => state.id = id,
            None => debug!("Ignoring id {} for nonexistent joint {}", id, joint),
        }
    }

    pub fn id(&self, joint: usize) -> Option<u8> {
        self.joints.get(joint).map(|state| state.id)
    }

    fn ensure_idle(&self) -> Result<(), ControlError> {
        if self.motion.is_some() {
            return Err(ControlError::Busy);
        }
        Ok(())
    }

    /// Reads the position of the joint, retrying transient failures with a growing backoff.
    /// If all attempts fail, the last known position is kept.
    fn read_joint(&mut self, joint: usize) -> Result<u16, ControlError> {
        let codec = codec(joint)?;
        let id = self.joints[joint].id;

        let mut reading = self.bus.read_position(id)?;
        for attempt in 1..=self.config.read_retries {
            if reading.is_some() {
                break;
            }
            reading = self.bus.read_position(id)?;
            if reading.is_none() {
                self.clock.sleep(self.config.read_backoff * attempt);
            }
        }

        let state = &mut self.joints[joint];
        match reading {
            Some(position) => state.position = position,
            None => warn!(
                "Reading actuator {} failed {} times, keeping last known position {}",
                id, self.config.read_retries + 1, state.position
            ),
        }
        state.angle = codec.decode(state.position);
        Ok(state.position)
    }

    /// Reads the present position of the joint from the bus.
    pub fn read_position(&mut self, joint: usize) -> Result<u16, ControlError> {
        self.ensure_idle()?;
        self.read_joint(joint)
    }

    /// Reads the present angle of the joint from the bus.
    pub fn read_angle(&mut self, joint: usize) -> Result<f64, ControlError> {
        self.read_position(joint)?;
        Ok(self.joints[joint].angle)
    }

    /// Reads all joints from the bus.
    pub fn refresh(&mut self) -> Result<(), ControlError> {
        self.refresh_until(GRIPPER)
    }

    /// Reads joints 0 to `last` (inclusive) from the bus.
    pub fn refresh_until(&mut self, last: usize) -> Result<(), ControlError> {
        self.ensure_idle()?;
        for joint in 0..=last.min(GRIPPER) {
            self.read_joint(joint)?;
        }
        Ok(())
    }

    /// Present position of the gripper center point and the gripper pitch.
    pub fn point(&mut self) -> Result<(Point3<f64>, f64), ControlError> {
        self.refresh_until(WRIST_PITCH)?;
        Ok(self.kinematics.forward_point(&self.current_angles()))
    }

    /// Disables torque of all actuators. The arm falls if not supported.
    pub fn relax(&mut self) -> Result<(), ControlError> {
        self.set_torque(false)?;
        self.state = ArmState::Relaxed;
        info!("Torque disabled");
        Ok(())
    }

    /// Enables torque of all actuators, they hold their present position.
    pub fn torque(&mut self) -> Result<(), ControlError> {
        self.set_torque(true)?;
        self.state = ArmState::Idle;
        info!("Torque enabled");
        Ok(())
    }

    fn set_torque(&mut self, enabled: bool) -> Result<(), ControlError> {
        self.ensure_idle()?;
        for joint in ALL_JOINTS {
            self.bus.set_torque_enabled(self.joints[joint].id, enabled)?;
            self.clock.sleep(self.config.torque_delay);
        }
        Ok(())
    }

    fn torque_if_relaxed(&mut self) -> Result<(), ControlError> {
        if self.state == ArmState::Relaxed {
            self.torque()?;
        }
        Ok(())
    }

    fn set_desired_angle(&mut self, joint: usize, angle: f64) -> Result<(), ControlError> {
        let codec = codec(joint)?;
        let state = &mut self.joints[joint];
        state.desired_angle = angle;
        state.desired_position = codec.encode_clamped(angle);
        Ok(())
    }

    fn set_desired_position(&mut self, joint: usize, position: u16) -> Result<u16, ControlError> {
        let codec = codec(joint)?;
        let position = codec.class().clamp(position as i64);
        let state = &mut self.joints[joint];
        state.desired_position = position;
        state.desired_angle = codec.decode(position);
        Ok(position)
    }

    fn dispatch_sync(&mut self, targets: &Targets) -> Result<(), ControlError> {
        let mut frame = SyncWrite::new();
        for &(joint, position) in targets {
            frame.push(self.joints[joint].id, position).map_err(anyhow::Error::from)?;
        }
        self.bus.write_frame(&frame.encode())?;
        Ok(())
    }

    fn dispatch_each(&mut self, targets: &Targets) -> Result<(), ControlError> {
        for &(joint, position) in targets {
            self.bus.write_position(self.joints[joint].id, position)?;
        }
        Ok(())
    }

    fn floor_duration(&self, duration: Duration) -> Duration {
        if duration < self.config.min_duration {
            warn!("Motion duration {:?} raised to {:?}", duration, self.config.min_duration);
            return self.config.min_duration;
        }
        duration
    }

    /// Trajectory of each (joint, goal) from its present position. Nothing is changed, so a
    /// failure here leaves the controller as it was.
    fn plan(&self, goals: &[(usize, u16)], duration: Duration) -> Result<Trajectory, ControlError> {
        let moves: Vec<(usize, u16, u16)> = goals
            .iter()
            .map(|&(joint, goal)| (joint, self.joints[joint].position, goal))
            .collect();
        let trajectory = Trajectory::new(&moves, duration, self.config.sample_period)
            .ok_or(ControlError::InvalidTiming)?;
        debug!("Moving {:?} over {:?}", moves, duration);
        Ok(trajectory)
    }

    fn begin(&mut self, trajectory: Trajectory) {
        self.motion = Some(Motion { trajectory, started: self.clock.now() });
        self.state = ArmState::Moving;
    }

    /// Solves for the pose and starts the motion towards it. With `time`, the motion ends
    /// that long after this call (minus the time spent solving, but never shorter than the
    /// configured minimum duration); otherwise it takes the default duration.
    ///
    /// If there is no solution, nothing is sent and the desired state stays as it was.
    pub fn start_move(&mut self, pose: &CartesianPose, time: Option<Duration>) -> Result<(), ControlError> {
        self.ensure_idle()?;
        self.torque_if_relaxed()?;
        let requested = self.clock.now();
        self.refresh()?;

        let solution = self.kinematics.inverse(pose, &self.current_angles()).map_err(|reason| {
            debug!("No solution for {:?}: {}", pose, reason);
            ControlError::Unreachable(reason)
        })?;

        let duration = match time {
            Some(time) => time.saturating_sub(self.clock.now().saturating_sub(requested)),
            None => self.config.default_duration,
        };
        let duration = self.floor_duration(duration);

        let mut goals = Targets::with_capacity(ARM_JOINTS.len());
        for joint in ARM_JOINTS {
            goals.push((joint, codec(joint)?.encode_clamped(solution[joint])));
        }
        let trajectory = self.plan(&goals, duration)?;
        for joint in ARM_JOINTS {
            self.set_desired_angle(joint, solution[joint])?;
        }
        self.begin(trajectory);
        Ok(())
    }

    /// Sends what is due at `now` for the motion in flight. Returns true once the motion is
    /// complete (also if there is none). A bus error aborts the motion.
    pub fn advance(&mut self, now: Duration) -> Result<bool, ControlError> {
        let step = match &self.motion {
            Some(motion) => motion.trajectory.step(now.saturating_sub(motion.started)),
            None => return Ok(true),
        };
        let (result, done) = match &step {
            Step::Sample(targets) => (self.dispatch_sync(targets), false),
            Step::Final(targets) => (self.dispatch_each(targets), true),
        };
        if result.is_err() || done {
            self.motion = None;
            self.state = ArmState::Idle;
        }
        result?;
        if done {
            debug!("Motion complete");
        }
        Ok(done)
    }

    /// Advances the motion in flight on the sample cadence until it completes, then reads
    /// the reached positions back.
    pub fn run_to_completion(&mut self) -> Result<(), ControlError> {
        if self.motion.is_none() {
            return Ok(());
        }
        while !self.advance(self.clock.now())? {
            self.clock.sleep(self.config.sample_period);
        }
        self.clock.sleep(self.config.settle_delay);
        self.refresh()
    }

    /// Moves the gripper to the pose over the default duration.
    pub fn move_to(&mut self, pose: &CartesianPose) -> Result<(), ControlError> {
        self.start_move(pose, None)?;
        self.run_to_completion()
    }

    /// Moves the gripper to the pose, arriving `time` after the call.
    pub fn move_to_within(&mut self, pose: &CartesianPose, time: Duration) -> Result<(), ControlError> {
        self.start_move(pose, Some(time))?;
        self.run_to_completion()
    }

    /// Moves all six joints to the preset pose over the default duration.
    pub fn move_preset(&mut self, preset: PresetPose) -> Result<(), ControlError> {
        self.ensure_idle()?;
        let pose = self.poses.pose(preset).ok_or(ControlError::MissingPose(preset))?;
        self.torque_if_relaxed()?;
        self.refresh()?;
        let mut goals = Targets::with_capacity(ALL_JOINTS.len());
        for joint in ALL_JOINTS {
            goals.push((joint, codec(joint)?.class().clamp(pose[joint] as i64)));
        }
        debug!("Moving to {} pose", preset);
        let trajectory = self.plan(&goals, self.config.default_duration)?;
        for &(joint, position) in &goals {
            self.set_desired_position(joint, position)?;
        }
        self.begin(trajectory);
        self.run_to_completion()
    }

    pub fn move_rest(&mut self) -> Result<(), ControlError> {
        self.move_preset(PresetPose::Rest)
    }

    pub fn move_home(&mut self) -> Result<(), ControlError> {
        self.move_preset(PresetPose::Home)
    }

    /// All articular values to zero.
    pub fn move_center(&mut self) -> Result<(), ControlError> {
        self.move_preset(PresetPose::Center)
    }

    /// Moves to rest and optionally relaxes there.
    pub fn init(&mut self, relax: bool) -> Result<(), ControlError> {
        self.move_rest()?;
        self.clock.sleep(self.config.init_pause);
        if relax {
            self.relax()?;
        }
        Ok(())
    }

    /// Sends the gripper to the point with the gripper pitch gamma immediately, without
    /// interpolation. Of the two elbow solutions, the one farther from the present elbow
    /// angle is tried first. Only joints 0 to 3 are affected. Meant to be called
    /// repeatedly by a teleoperation loop that does the smoothing.
    pub fn set_arm_gamma(&mut self, x: f64, y: f64, z: f64, gamma: f64) -> Result<(), ControlError> {
        self.ensure_idle()?;
        self.torque_if_relaxed()?;
        self.read_joint(ELBOW)?;
        let previous_elbow = self.joints[ELBOW].angle;
        let pose = CartesianPose::new(
            x, y, z, OrientationConstraint::ContinuityBiasedPitch { gamma, previous_elbow });
        let solution = self.kinematics.inverse(&pose, &self.current_angles())?;

        for joint in 0..=WRIST_PITCH {
            self.set_desired_angle(joint, solution[joint])?;
        }
        let targets: Targets = (0..=WRIST_PITCH)
            .map(|joint| (joint, self.joints[joint].desired_position))
            .collect();
        self.dispatch_sync(&targets)
    }

    /// Integrates Cartesian and gripper pitch speed over `elapsed`, starting from the
    /// present position, clamped to the teleoperation workspace.
    pub fn move_point_with_speed(&mut self, vx: f64, vy: f64, vz: f64, vg: f64,
                                 elapsed: Duration) -> Result<(), ControlError> {
        let (point, gamma) = self.point()?;
        let dt = elapsed.as_secs_f64();
        let (kp, kg) = (self.config.point_speed_gain, self.config.gamma_speed_gain);
        let workspace = self.config.workspace;

        let x = workspace.clamp_xy(point.x + vx * kp * dt);
        let y = workspace.clamp_xy(point.y + vy * kp * dt);
        let z = workspace.clamp_z(point.z + vz * kp * dt);
        let gamma = workspace.clamp_gamma(gamma + vg * kg * dt);
        self.set_arm_gamma(x, y, z, gamma)
    }

    /// Integrates the joint speed over `elapsed`, clamped to the actuator range, and writes
    /// the result immediately.
    pub fn move_joint_with_speed(&mut self, joint: usize, speed: f64, elapsed: Duration) -> Result<u16, ControlError> {
        self.ensure_idle()?;
        let codec = codec(joint)?;
        let present = self.read_joint(joint)? as f64;
        let target = present + speed * self.config.joint_speed_gain * elapsed.as_secs_f64();
        self.write_joint(joint, codec.class().clamp(target.round() as i64))
    }

    fn write_joint(&mut self, joint: usize, position: u16) -> Result<u16, ControlError> {
        let position = self.set_desired_position(joint, position)?;
        self.bus.write_position(self.joints[joint].id, position)?;
        Ok(position)
    }

    /// Writes the raw position of the joint immediately, clamped to the actuator range.
    pub fn set_joint_position(&mut self, joint: usize, position: u16) -> Result<u16, ControlError> {
        self.ensure_idle()?;
        self.write_joint(joint, position)
    }

    /// Walks the joint to the raw position one unit at a time.
    pub fn move_joint_to_position(&mut self, joint: usize, position: u16) -> Result<(), ControlError> {
        self.ensure_idle()?;
        let target = self.set_desired_position(joint, position)?;
        let id = self.joints[joint].id;
        let mut present = self.read_joint(joint)?;
        while present != target {
            if present < target {
                present += 1;
            } else {
                present -= 1;
            }
            self.bus.write_position(id, present)?;
            self.clock.sleep(self.config.joint_step_delay);
        }
        Ok(())
    }

    /// Walks the joint to the angle one unit at a time.
    pub fn move_joint_to_angle(&mut self, joint: usize, angle: f64) -> Result<(), ControlError> {
        let position = codec(joint)?.encode_clamped(angle);
        self.move_joint_to_position(joint, position)?;
        self.joints[joint].desired_angle = angle;
        Ok(())
    }

    /// Tilts the wrist by 50 units, staying within 1020..=3080.
    pub fn jog_wrist_pitch(&mut self, direction: JogDirection) -> Result<u16, ControlError> {
        self.ensure_idle()?;
        let position = self.read_joint(WRIST_PITCH)?;
        let position = match direction {
            JogDirection::Increase if position < 3080 => position + 50,
            JogDirection::Decrease if position > 1020 => position - 50,
            _ => position,
        };
        self.write_joint(WRIST_PITCH, position)
    }

    /// Turns the wrist by 10 units, stopping at the ends of the range.
    pub fn jog_wrist_roll(&mut self, direction: JogDirection) -> Result<u16, ControlError> {
        self.ensure_idle()?;
        let position = self.read_joint(WRIST_ROLL)?;
        let position = match direction {
            JogDirection::Increase if position < 1013 => position + 10,
            JogDirection::Increase => 1023,
            JogDirection::Decrease if position > 10 => position - 10,
            JogDirection::Decrease => 0,
        };
        self.write_joint(WRIST_ROLL, position)
    }

    /// Closes the gripper by 10 units, or opens it by 10 units towards the open position.
    pub fn jog_gripper(&mut self, command: GripperCommand) -> Result<u16, ControlError> {
        self.ensure_idle()?;
        let position = self.read_joint(GRIPPER)?;
        let position = match command {
            GripperCommand::Close if position > 10 => position - 10,
            GripperCommand::Close => 0,
            GripperCommand::Open if position > 522 => position - 10,
            GripperCommand::Open if position < 502 => position + 10,
            GripperCommand::Open => 512,
        };
        self.write_joint(GRIPPER, position)
    }
}
