//! Helper functions

use crate::kinematic_traits::Joints;
use nalgebra::{Isometry3, UnitQuaternion};

/// Wraps the angle into (-PI, PI].
pub fn normalize_angle(angle: f64) -> f64 {
    f64::atan2(angle.sin(), angle.cos())
}

/// Checks if all elements in the array are finite
pub fn is_valid(qs: &Joints) -> bool {
    qs.iter().all(|&q| q.is_finite())
}

/// Allows to specify joint values in degrees (converts to radians)
pub fn as_radians(degrees: [i32; 6]) -> Joints {
    std::array::from_fn(|i| (degrees[i] as f64).to_radians())
}

/// Joint values as a row, converting radians to degrees.
pub fn format_joints(joints: &Joints) -> String {
    let mut row_str = String::new();
    for joint_idx in 0..6 {
        let computed = joints[joint_idx];
        row_str.push_str(&format!("{:5.2} ", computed.to_degrees()));
    }
    format!("[{}]", row_str.trim_end())
}

/// Print joint values, converting radians to degrees.
pub fn dump_joints(joints: &Joints) {
    println!("{}", format_joints(joints));
}

pub fn dump_pose(isometry: &Isometry3<f64>) {
    let translation = isometry.translation.vector;
    let rotation: UnitQuaternion<f64> = isometry.rotation;
    let (roll, pitch, yaw) = rotation.euler_angles();

    println!(
        "x: {:.3}, y: {:.3}, z: {:.3},  roll: {:.2}°, pitch: {:.2}°, yaw: {:.2}°",
        translation.x, translation.y, translation.z,
        roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_is_valid_with_nan() {
        let qs = [0.0, f64::NAN, 1.0, -1.0, 0.5, -0.5];
        assert!(!is_valid(&qs));
        assert!(is_valid(&[0.0, 1.0, -1.0, 0.5, -0.5, PI]));
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((normalize_angle(-5.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((normalize_angle(0.3) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_format_joints() {
        let joints = as_radians([0, 90, -45, 10, 0, 180]);
        assert_eq!(format_joints(&joints), "[ 0.00 90.00 -45.00 10.00  0.00 180.00]");
    }
}
