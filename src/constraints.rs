use std::f64::consts::PI;
use crate::kinematic_traits::{Joints, SHOULDER, ELBOW, WRIST_PITCH};

/// A hair above 90 degrees, the shoulder and the lower elbow stop.
const LIMIT_PI_2: f64 = 181.0 * PI / 360.0;

/// Static joint limits. Unlike free rotating joints, limits here never wrap around:
/// an angle is compliant if `from <= angle <= to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraints {
    /// Lower limit in radians. Equal to `to` for a joint without constraints.
    pub from: [f64; 6],

    /// Upper limit in radians. Equal to `from` for a joint without constraints.
    pub to: [f64; 6],
}

impl Constraints {
    pub fn new(from: [f64; 6], to: [f64; 6]) -> Self {
        Constraints { from, to }
    }

    /// Mechanical limits of the WidowX. Base, wrist roll and gripper are not limited.
    pub fn widowx() -> Self {
        let mut from = [0.0; 6];
        let mut to = [0.0; 6];
        from[SHOULDER] = -LIMIT_PI_2;
        to[SHOULDER] = LIMIT_PI_2;
        from[ELBOW] = -LIMIT_PI_2;
        to[ELBOW] = 5.0 * PI / 6.0;
        from[WRIST_PITCH] = -11.0 * PI / 18.0;
        to[WRIST_PITCH] = LIMIT_PI_2;
        Constraints { from, to }
    }

    /// True if the joint has no limits.
    pub fn is_free(&self, joint: usize) -> bool {
        self.from[joint] == self.to[joint]
    }

    /// Checks a single joint angle. Out of range joint indices are never compliant.
    pub fn compliant_joint(&self, joint: usize, angle: f64) -> bool {
        if joint >= 6 || !angle.is_finite() {
            return false;
        }
        if self.is_free(joint) {
            return true; // Joint without constraints, from == to
        }
        angle >= self.from[joint] && angle <= self.to[joint]
    }

    pub fn compliant(&self, angles: &Joints) -> bool {
        (0..6).all(|joint| self.compliant_joint(joint, angles[joint]))
    }
}

impl Default for Constraints {
    fn default() -> Self {
        Self::widowx()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_limits() {
        let angles = [0.1 * PI, 0.2 * PI, 0.3 * PI, 0.4 * PI, 0.5 * PI, 0.6 * PI];
        let from = [0.0, 0.15 * PI, 0.25 * PI, 0.35 * PI, 0.45 * PI, 0.55 * PI];
        let to = [0.2 * PI, 0.3 * PI, 0.4 * PI, 0.5 * PI, 0.6 * PI, 0.7 * PI];
        let limits = Constraints::new(from, to);
        assert!(limits.compliant(&angles));
    }

    #[test]
    fn test_limits_do_not_wrap_around() {
        // 1.9 PI is the same direction as -0.1 PI, but limits are linear
        let limits = Constraints::new([0.0, -0.2 * PI, 0.0, 0.0, 0.0, 0.0],
                                      [0.0, 0.2 * PI, 0.0, 0.0, 0.0, 0.0]);
        assert!(limits.compliant_joint(1, -0.1 * PI));
        assert!(!limits.compliant_joint(1, 1.9 * PI));
    }

    #[test]
    fn test_free_joints() {
        let limits = Constraints::widowx();
        for joint in [0, 4, 5] {
            assert!(limits.is_free(joint));
            assert!(limits.compliant_joint(joint, 3.0 * PI));
            assert!(limits.compliant_joint(joint, -3.0 * PI));
        }
    }

    #[test]
    fn test_widowx_limits() {
        let limits = Constraints::widowx();
        assert!(limits.compliant_joint(SHOULDER, PI / 2.0));
        assert!(!limits.compliant_joint(SHOULDER, 0.51 * PI));
        assert!(limits.compliant_joint(ELBOW, 0.8 * PI));
        assert!(!limits.compliant_joint(ELBOW, 0.85 * PI));
        assert!(limits.compliant_joint(WRIST_PITCH, -0.6 * PI));
        assert!(!limits.compliant_joint(WRIST_PITCH, -0.62 * PI));
    }

    #[test]
    fn test_invalid_angles() {
        let limits = Constraints::widowx();
        assert!(!limits.compliant_joint(ELBOW, f64::NAN));
        assert!(!limits.compliant_joint(6, 0.0));
    }
}
