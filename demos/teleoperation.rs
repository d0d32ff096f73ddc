use std::time::Duration;

use rs_widowx_kinematics::config::ArmConfig;
use rs_widowx_kinematics::controller::{ArmController, GripperCommand, JogDirection};
use rs_widowx_kinematics::transport::{SimulatedBus, SystemClock};
use rs_widowx_kinematics::utils::format_joints;

/// Velocity commands in the range of a gamepad stick (-127.5 .. 127.5)
const COMMANDS: [(f64, f64, f64, f64); 4] = [
    (-127.5, 0.0, 0.0, 0.0),  // Backwards
    (0.0, 60.0, 0.0, 0.0),    // Left
    (0.0, 0.0, -127.5, 0.0),  // Down
    (0.0, 0.0, 0.0, 255.0),   // Gripper pitch down
];

fn main() -> anyhow::Result<()> {
    let config = ArmConfig::widowx();
    let servos = [(1, 2048), (2, 2048), (3, 2048), (4, 2048), (5, 512), (6, 512)];
    let mut arm = ArmController::new(SimulatedBus::new(&servos), SystemClock::new(), &config);

    arm.move_center()?;
    let tick = Duration::from_millis(50);
    for (vx, vy, vz, vg) in COMMANDS {
        // One second of each command
        for _ in 0..20 {
            if let Err(e) = arm.move_point_with_speed(vx, vy, vz, vg, tick) {
                println!("Stopped: {}", e);
                break;
            }
            std::thread::sleep(tick);
        }
        let (point, gamma) = arm.point()?;
        println!("x: {:6.2} y: {:6.2} z: {:6.2} gamma: {:6.1}°  {}",
                 point.x, point.y, point.z, gamma.to_degrees(), format_joints(&arm.current_angles()));
    }

    for _ in 0..5 {
        arm.jog_wrist_roll(JogDirection::Increase)?;
        arm.jog_gripper(GripperCommand::Close)?;
    }
    println!("Wrist roll {}, gripper {}", arm.read_position(4)?, arm.read_position(5)?);

    arm.move_rest()?;
    arm.relax()?;
    Ok(())
}
