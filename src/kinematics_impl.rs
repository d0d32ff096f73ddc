//! Analytic inverse and forward kinematics of the WidowX arm.
//!
//! The base yaw is found directly from the target position. The remaining shoulder, elbow and
//! wrist pitch joints move in the vertical plane containing the axis of joint 1, where the
//! problem reduces to a planar chain. The elbow equation has up to two roots (elbow up and
//! elbow down); the roots are tried in order and the first one that keeps all limited joints
//! within their [Constraints] is accepted.

use crate::constraints::Constraints;
use crate::kinematic_traits::{
    CartesianPose, Joints, Kinematics, OrientationConstraint, Pose, Unreachable, ELBOW, GRIPPER,
    SHOULDER, WRIST_PITCH, WRIST_ROLL,
};
use crate::parameters::widowx_kinematics::Parameters;
use crate::utils::{is_valid, normalize_angle};
use nalgebra::{Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct WidowXKinematics {
    parameters: Parameters,
    constraints: Constraints,
}

/// How the wrist pitch angle is obtained while searching for the shoulder and elbow.
#[derive(Debug, Clone, Copy)]
enum Wrist {
    /// Wrist pitch kept at the given angle.
    Held(f64),
    /// Wrist pitch derived from the desired gripper pitch (gamma).
    FromPitch(f64),
}

impl WidowXKinematics {
    /// Creates a new `WidowXKinematics` instance with the given parameters and
    /// the mechanical limits of the WidowX.
    pub fn new(parameters: Parameters) -> Self {
        Self::new_with_constraints(parameters, Constraints::widowx())
    }

    pub fn new_with_constraints(parameters: Parameters, constraints: Constraints) -> Self {
        WidowXKinematics { parameters, constraints }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Solves shoulder, elbow and wrist pitch for the point (x, z) in the plane of joint 1,
    /// with z measured from the shoulder axis. If `previous_elbow` is given and both elbow
    /// roots are candidates, the root farther from it is tried first.
    fn solve_planar(
        &self,
        x: f64,
        z: f64,
        wrist: Wrist,
        previous_elbow: Option<f64>,
    ) -> Result<(f64, f64, f64), Unreachable> {
        let p = &self.parameters;
        let (ca, sa) = (p.cos_alpha(), p.sin_alpha());

        // The point the D + L3 (+ L4) chain must reach
        let (x, z) = match wrist {
            Wrist::Held(_) => (x, z),
            Wrist::FromPitch(gamma) => (x - p.l4() * gamma.cos(), z + p.l4() * gamma.sin()),
        };

        let mut roots = match wrist {
            Wrist::Held(q4) => {
                let (s4, c4) = q4.sin_cos();
                let a = p.l3() * ca + p.l4() * ca * c4 + p.l4() * sa * s4;
                let b = p.l3() * sa - p.l4() * ca * s4 + p.l4() * sa * c4;
                let c = (x * x + z * z
                    - p.d() * p.d()
                    - p.l3() * p.l3()
                    - p.l4() * p.l4()
                    - 2.0 * p.l3() * p.l4() * c4)
                    / (2.0 * p.d());
                let cond = a * a + b * b - c * c;
                if !(cond >= 0.0) {
                    return Err(Unreachable::NoRealRoot);
                }
                let root = cond.sqrt();
                [
                    normalize_angle(2.0 * f64::atan2(b - root, a + c)),
                    normalize_angle(2.0 * f64::atan2(b + root, a + c)),
                ]
            }
            Wrist::FromPitch(_) => {
                let c = (x * x + z * z - p.d() * p.d() - p.l3() * p.l3())
                    / (2.0 * p.d() * p.l3());
                if !(c.abs() <= 1.0) {
                    return Err(Unreachable::NoRealRoot);
                }
                let spread = c.acos();
                [
                    normalize_angle(p.alpha() + spread),
                    normalize_angle(p.alpha() - spread),
                ]
            }
        };

        if let Some(previous) = previous_elbow {
            // The farther root goes first. Ties keep the default order.
            if (roots[1] - previous).abs() > (roots[0] - previous).abs() {
                roots.swap(0, 1);
            }
        }

        let mut failure = Unreachable::ElbowLimit;
        for q3 in roots {
            if !self.constraints.compliant_joint(ELBOW, q3) {
                debug!("Elbow root {:.4} out of limits", q3);
                continue;
            }

            let (s3, c3) = q3.sin_cos();
            let (a, b) = match wrist {
                Wrist::Held(q4) => {
                    let (s34, c34) = (q3 + q4).sin_cos();
                    (
                        p.d() * ca + p.l3() * c3 + p.l4() * c34,
                        p.d() * sa + p.l3() * s3 + p.l4() * s34,
                    )
                }
                Wrist::FromPitch(_) => (p.d() * ca + p.l3() * c3, p.d() * sa + p.l3() * s3),
            };
            let q2 = f64::atan2(a * z - b * x, a * x + b * z);
            if !self.constraints.compliant_joint(SHOULDER, q2) {
                debug!("Elbow root {:.4} needs shoulder {:.4}, out of limits", q3, q2);
                failure = failure.max(Unreachable::ShoulderLimit);
                continue;
            }

            let q4 = match wrist {
                Wrist::Held(q4) => q4,
                Wrist::FromPitch(gamma) => normalize_angle(-gamma - q2 - q3),
            };
            if !self.constraints.compliant_joint(WRIST_PITCH, q4) {
                debug!("Elbow root {:.4} needs wrist pitch {:.4}, out of limits", q3, q4);
                failure = failure.max(Unreachable::WristLimit);
                continue;
            }

            return Ok((q2, q3, q4));
        }
        Err(failure)
    }

    /// Full orientation: gripper pitch and wrist roll both come from the rotation `rd`,
    /// given in the frame of joint 1.
    fn solve_rotation(
        &self,
        q1: f64,
        x: f64,
        z: f64,
        rd: &Matrix3<f64>,
        current: &Joints,
    ) -> Result<Joints, Unreachable> {
        let gamma = f64::atan2(-rd[(2, 0)], rd[(0, 0)]);
        let (q2, q3, q4) = self.solve_planar(x, z, Wrist::FromPitch(gamma), None)?;

        let ry_gamma = Rotation3::from_axis_angle(&Vector3::y_axis(), gamma);
        let rx5 = ry_gamma.matrix().transpose() * rd;
        let q5 = f64::atan2(rx5[(2, 1)], rx5[(1, 1)]);

        Ok([q1, q2, q3, q4, q5, current[GRIPPER]])
    }
}

impl Kinematics for WidowXKinematics {
    fn inverse(&self, pose: &CartesianPose, current: &Joints) -> Result<Joints, Unreachable> {
        let target = &pose.position;
        // Joints copied from `current` must be usable too
        if !(target.x.is_finite() && target.y.is_finite() && target.z.is_finite()) || !is_valid(current) {
            return Err(Unreachable::NoRealRoot);
        }

        let q1 = f64::atan2(target.y, target.x);

        // Target as seen from the frame of joint 1
        let x = f64::hypot(target.x, target.y);
        let z = target.z - self.parameters.l0();

        let (wrist, previous_elbow) = match pose.orientation {
            OrientationConstraint::HoldWrist => (Wrist::Held(current[WRIST_PITCH]), None),
            OrientationConstraint::Pitch(gamma) => (Wrist::FromPitch(gamma), None),
            OrientationConstraint::ContinuityBiasedPitch { gamma, previous_elbow } => {
                (Wrist::FromPitch(gamma), Some(previous_elbow))
            }
            OrientationConstraint::Rotation(rd) => {
                return self.solve_rotation(q1, x, z, &rd, current);
            }
            OrientationConstraint::BaseRotation(rd_base) => {
                let rz_q1 = Rotation3::from_axis_angle(&Vector3::z_axis(), q1);
                let rd = rz_q1.matrix().transpose() * rd_base;
                return self.solve_rotation(q1, x, z, &rd, current);
            }
        };

        let (q2, q3, q4) = self.solve_planar(x, z, wrist, previous_elbow)?;
        Ok([q1, q2, q3, q4, current[WRIST_ROLL], current[GRIPPER]])
    }

    fn forward(&self, qs: &Joints) -> Pose {
        let (point, gamma) = self.forward_point(qs);
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), qs[0])
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), gamma)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), qs[WRIST_ROLL]);
        Pose::from_parts(Translation3::new(point.x, point.y, point.z), rotation)
    }

    fn forward_point(&self, qs: &Joints) -> (Point3<f64>, f64) {
        let p = &self.parameters;
        let (q1, q2, q3, q4) = (qs[0], qs[SHOULDER], qs[ELBOW], qs[WRIST_PITCH]);

        let phi = p.d() * f64::cos(p.alpha() + q2)
            + p.l3() * f64::cos(q2 + q3)
            + p.l4() * f64::cos(q2 + q3 + q4);
        let z = p.l0()
            + p.d() * f64::sin(p.alpha() + q2)
            + p.l3() * f64::sin(q2 + q3)
            + p.l4() * f64::sin(q2 + q3 + q4);

        (Point3::new(q1.cos() * phi, q1.sin() * phi, z), -q2 - q3 - q4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn robot() -> WidowXKinematics {
        WidowXKinematics::new(Parameters::widowx())
    }

    #[test]
    fn test_zero_joints_forward() {
        // All joints at zero form an upside L
        let (point, gamma) = robot().forward_point(&[0.0; 6]);
        assert!((point.x - 33.0).abs() < 1e-9);
        assert!(point.y.abs() < 1e-9);
        assert!((point.z - 23.0).abs() < 1e-9);
        assert_eq!(gamma, 0.0);
    }

    #[test]
    fn test_zero_joints_inverse() {
        let solution = robot()
            .inverse(&CartesianPose::at(33.0, 0.0, 23.0), &[0.0; 6])
            .expect("Zero pose must be reachable");
        for q in solution {
            assert!(q.abs() < 1e-6, "Expected all zeros, got {:?}", solution);
        }
    }

    #[test]
    fn test_straight_ahead_pointing_down() {
        let robot = robot();
        let current = [0.0, 0.0, 0.0, 0.0, 0.3, 0.4];
        let pose = CartesianPose::with_pitch(20.0, 0.0, 9.0, FRAC_PI_2);
        let solution = robot.inverse(&pose, &current).expect("Must be reachable");

        assert!(solution[0].abs() < 1e-9);
        // The elbow-up root needs the wrist beyond its limit, the other root is used
        assert!((solution[ELBOW] - 0.1015).abs() < 1e-3, "elbow {}", solution[ELBOW]);
        assert_eq!(solution[WRIST_ROLL], 0.3);
        assert_eq!(solution[GRIPPER], 0.4);

        let (point, gamma) = robot.forward_point(&solution);
        assert!((point - Point3::new(20.0, 0.0, 9.0)).norm() < 1e-9);
        assert!((gamma - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_reach() {
        let robot = robot();
        let reach = robot.parameters().reach();
        let l0 = robot.parameters().l0();
        let far = [
            CartesianPose::at(reach + 0.5, 0.0, l0),
            CartesianPose::at(0.0, -(reach + 3.0), l0),
            CartesianPose::at(30.0, 30.0, l0 + 10.0),
            CartesianPose::with_pitch(reach + 0.5, 0.0, l0, 0.0),
            CartesianPose::with_pitch(0.0, 0.0, l0 + reach + 1.0, -FRAC_PI_2),
        ];
        for pose in far {
            assert_eq!(robot.inverse(&pose, &[0.0; 6]), Err(Unreachable::NoRealRoot));
        }
    }

    #[test]
    fn test_held_wrist_out_of_limits() {
        // Reachable point, but the held wrist angle itself is beyond its limit
        let current = [0.0, 0.0, 0.0, -2.5, 0.0, 0.0];
        let target = robot().forward_point(&current).0;
        let pose = CartesianPose::at(target.x, target.y, target.z);
        assert_eq!(robot().inverse(&pose, &current), Err(Unreachable::WristLimit));
    }

    #[test]
    fn test_pitch_tries_plus_root_first() {
        let robot = robot();
        let original = [0.0, -0.2, 0.5, -0.4, 0.0, 0.0];
        let (target, gamma) = robot.forward_point(&original);
        let pose = CartesianPose::with_pitch(target.x, target.y, target.z, gamma);

        let solution = robot.inverse(&pose, &original).expect("Must be reachable");
        let expected_elbow = robot.parameters().alpha() + (robot.parameters().alpha() - 0.5);
        assert!((solution[ELBOW] - expected_elbow).abs() < 1e-6);

        let (point, pitch) = robot.forward_point(&solution);
        assert!((point - target).norm() < 1e-9);
        assert!((pitch - gamma).abs() < 1e-9);
    }

    #[test]
    fn test_continuity_biased_takes_farther_root() {
        let robot = robot();
        let original = [0.0, -0.2, 0.5, -0.4, 0.0, 0.0];
        let (target, gamma) = robot.forward_point(&original);
        let other_root = 2.0 * robot.parameters().alpha() - 0.5;

        let biased = |previous_elbow: f64| {
            let pose = CartesianPose::new(
                target.x, target.y, target.z,
                OrientationConstraint::ContinuityBiasedPitch { gamma, previous_elbow },
            );
            robot.inverse(&pose, &original).expect("Must be reachable")
        };

        // Close to the original elbow, the other root is farther
        assert!((biased(0.5)[ELBOW] - other_root).abs() < 1e-6);
        // Close to the other root, the original elbow is farther
        assert!((biased(other_root)[ELBOW] - 0.5).abs() < 1e-6);
        assert!((biased(other_root)[SHOULDER] + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_from_base() {
        let robot = robot();
        let original = [0.3, -0.2, 0.5, -0.4, 0.7, 0.1];
        let pose = robot.forward(&original);
        let rd_base = *pose.rotation.to_rotation_matrix().matrix();
        let target = pose.translation.vector;

        let request = CartesianPose::new(
            target.x, target.y, target.z, OrientationConstraint::BaseRotation(rd_base));
        let current = [0.0, 0.0, 0.0, 0.0, 0.0, 0.1];
        let solution = robot.inverse(&request, &current).expect("Must be reachable");

        assert!((solution[0] - 0.3).abs() < 1e-9);
        assert!((solution[WRIST_ROLL] - 0.7).abs() < 1e-9);
        assert_eq!(solution[GRIPPER], 0.1);

        let reached = robot.forward(&solution);
        assert!((reached.translation.vector - target).norm() < 1e-9);
        assert!(reached.rotation.angle_to(&pose.rotation) < 1e-6);
    }

    #[test]
    fn test_rotation_in_joint1_frame() {
        let robot = robot();
        let gamma = 0.25;
        let roll = -1.1;
        let rd = Rotation3::from_axis_angle(&Vector3::y_axis(), gamma)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), roll);
        let request = CartesianPose::new(
            0.0, 25.0, 15.0, OrientationConstraint::Rotation(*rd.matrix()));
        let solution = robot.inverse(&request, &[0.0; 6]).expect("Must be reachable");

        assert!((solution[0] - PI / 2.0).abs() < 1e-9);
        assert!((solution[WRIST_ROLL] - roll).abs() < 1e-9);
        let (_, pitch) = robot.forward_point(&solution);
        assert!((pitch - gamma).abs() < 1e-9);
    }

    #[test]
    fn test_unreachable_rotation() {
        let robot = robot();
        let request = CartesianPose::new(
            80.0, 0.0, 9.0, OrientationConstraint::Rotation(Matrix3::identity()));
        assert_eq!(robot.inverse(&request, &[0.0; 6]), Err(Unreachable::NoRealRoot));
    }

    #[test]
    fn test_not_finite_target() {
        let pose = CartesianPose::at(f64::NAN, 0.0, 9.0);
        assert_eq!(robot().inverse(&pose, &[0.0; 6]), Err(Unreachable::NoRealRoot));
    }

    #[test]
    fn test_not_finite_current() {
        // Reachable target, but the wrist roll to carry over is garbage
        let pose = CartesianPose::with_pitch(20.0, 0.0, 9.0, FRAC_PI_2);
        let current = [0.0, 0.0, 0.0, 0.0, f64::NAN, 0.0];
        assert_eq!(robot().inverse(&pose, &current), Err(Unreachable::NoRealRoot));
        let current = [0.0, 0.0, 0.0, 0.0, 0.0, f64::INFINITY];
        assert_eq!(robot().inverse(&pose, &current), Err(Unreachable::NoRealRoot));
    }
}
