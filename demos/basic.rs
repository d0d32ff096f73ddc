use rs_widowx_kinematics::kinematic_traits::{CartesianPose, Joints, Kinematics, OrientationConstraint};
use rs_widowx_kinematics::kinematics_impl::WidowXKinematics;
use rs_widowx_kinematics::parameters::widowx_kinematics::Parameters;
use rs_widowx_kinematics::utils::{as_radians, dump_joints, dump_pose};

fn main() {
    let robot = WidowXKinematics::new(Parameters::widowx());
    let joints: Joints = as_radians([20, -10, 30, -20, 45, 0]); // Joints are alias of [f64; 6]
    println!("\nInitial joints: ");
    dump_joints(&joints);

    let pose = robot.forward(&joints); // Pose is alias of nalgebra::Isometry3<f64>
    println!("\nGripper pose:");
    dump_pose(&pose);
    let (point, gamma) = robot.forward_point(&joints);
    println!("Gripper pitch (gamma) {:.2}°", gamma.to_degrees());

    println!("\nSame point, wrist pitch held where it is now:");
    match robot.inverse(&CartesianPose::at(point.x, point.y, point.z), &joints) {
        Ok(solution) => dump_joints(&solution),
        Err(reason) => println!("No solution: {}", reason),
    }

    println!("\nSame point, gripper pointing to the floor:");
    let down = CartesianPose::with_pitch(point.x, point.y, point.z, 90_f64.to_radians());
    match robot.inverse(&down, &joints) {
        Ok(solution) => dump_joints(&solution),
        Err(reason) => println!("No solution: {}", reason),
    }

    println!("\nBack from the full rotation of the gripper (wrist roll is also recovered):");
    let rotation = *pose.rotation.to_rotation_matrix().matrix();
    let request = CartesianPose::new(point.x, point.y, point.z, OrientationConstraint::BaseRotation(rotation));
    match robot.inverse(&request, &joints) {
        Ok(solution) => dump_joints(&solution),
        Err(reason) => println!("No solution: {}", reason),
    }

    println!("\nToo far away:");
    if let Err(reason) = robot.inverse(&CartesianPose::at(60.0, 0.0, 9.0), &joints) {
        println!("{}", reason);
    }
}
