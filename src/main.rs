use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use rs_widowx_kinematics::config::ArmConfig;
use rs_widowx_kinematics::controller::ArmController;
use rs_widowx_kinematics::joint_codec::JointCodec;
use rs_widowx_kinematics::kinematic_traits::{CartesianPose, Kinematics, JOINTS_AT_ZERO, WRIST_PITCH};
use rs_widowx_kinematics::kinematics_impl::WidowXKinematics;
use rs_widowx_kinematics::sync_write::SyncWrite;
use rs_widowx_kinematics::transport::{SimulatedBus, SystemClock};
use rs_widowx_kinematics::utils::{dump_pose, format_joints, is_valid};

/// WidowX arm kinematics and motion tool
#[derive(Parser, Debug)]
#[command(name = "widowx")]
#[command(version)]
#[command(about = "Inverse kinematics, forward kinematics and bus frames for the WidowX arm")]
struct Args {
    /// Arm configuration YAML (geometry, limits, actuator ids, timing, poses).
    /// WidowX defaults are used if not given.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Joint angles and raw positions for a gripper position.
    Solve {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(allow_negative_numbers = true)]
        z: f64,
        /// Gripper pitch in degrees (90 points to the floor). Without it, the wrist
        /// pitch is held at --wrist.
        #[arg(long, allow_negative_numbers = true)]
        gamma: Option<f64>,
        /// Present wrist pitch in degrees, used when no gamma is given.
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        wrist: f64,
    },
    /// Gripper pose for six joint angles in degrees.
    Forward {
        #[arg(num_args = 6, allow_negative_numbers = true)]
        joints: Vec<f64>,
    },
    /// Sync write frame for id:position pairs, as hex.
    Frame {
        #[arg(required = true)]
        entries: Vec<String>,
    },
    /// Prints the arm geometry in use as YAML.
    Geometry,
    /// Runs a short sequence of moves on the simulated arm.
    Demo,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    if let Err(e) = run(&args) {
        error!("{e:#}");
        process::exit(1);
    }
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(args: &Args) -> Result<ArmConfig> {
    match &args.config {
        Some(path) => {
            info!("Loading arm configuration from {:?}", path);
            ArmConfig::from_yaml_file(path)
                .with_context(|| format!("Cannot read configuration {:?}", path))
        }
        None => Ok(ArmConfig::default()),
    }
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    match &args.command {
        Command::Solve { x, y, z, gamma, wrist } => solve(&config, *x, *y, *z, *gamma, *wrist),
        Command::Forward { joints } => forward(&config, joints),
        Command::Frame { entries } => frame(entries),
        Command::Geometry => {
            print!("{}", config.geometry.to_yaml());
            Ok(())
        }
        Command::Demo => demo(&config),
    }
}

fn solve(config: &ArmConfig, x: f64, y: f64, z: f64, gamma: Option<f64>, wrist: f64) -> Result<()> {
    let robot = WidowXKinematics::new_with_constraints(config.geometry, config.constraints);
    let pose = match gamma {
        Some(gamma) => CartesianPose::with_pitch(x, y, z, gamma.to_radians()),
        None => CartesianPose::at(x, y, z),
    };
    let mut current = JOINTS_AT_ZERO;
    current[WRIST_PITCH] = wrist.to_radians();

    let joints = robot.inverse(&pose, &current)?;
    println!("Joints: {}", format_joints(&joints));
    let positions: Vec<u16> = (0..6)
        .filter_map(|joint| JointCodec::for_joint(joint).map(|codec| codec.encode_clamped(joints[joint])))
        .collect();
    println!("Positions: {:?}", positions);
    Ok(())
}

fn forward(config: &ArmConfig, degrees: &[f64]) -> Result<()> {
    let robot = WidowXKinematics::new_with_constraints(config.geometry, config.constraints);
    let joints: [f64; 6] = std::array::from_fn(|i| degrees[i].to_radians());
    if !is_valid(&joints) {
        bail!("Joint angles must be finite, got {:?}", degrees);
    }
    let (point, gamma) = robot.forward_point(&joints);
    println!("Point: x: {:.3}, y: {:.3}, z: {:.3}, gamma: {:.2}°",
             point.x, point.y, point.z, gamma.to_degrees());
    dump_pose(&robot.forward(&joints));
    if !config.constraints.compliant(&joints) {
        println!("Warning: joints outside the limits");
    }
    Ok(())
}

fn frame(entries: &[String]) -> Result<()> {
    let mut frame = SyncWrite::new();
    for entry in entries {
        let Some((id, position)) = entry.split_once(':') else {
            bail!("Expected id:position, got {:?}", entry);
        };
        let id: u8 = id.trim().parse().with_context(|| format!("Bad id in {:?}", entry))?;
        let position: u16 = position.trim().parse().with_context(|| format!("Bad position in {:?}", entry))?;
        frame.push(id, position)?;
    }
    let hex: Vec<String> = frame.encode().iter().map(|b| format!("{:02X}", b)).collect();
    println!("{}", hex.join(" "));
    Ok(())
}

fn demo(config: &ArmConfig) -> Result<()> {
    let servos: Vec<(u8, u16)> = config.ids.iter().map(|&id| (id, 2048)).collect();
    let mut bus = SimulatedBus::new(&servos);
    // AX servos center at 512
    for &id in &config.ids[4..] {
        bus.set_position(id, 512);
    }
    let mut arm = ArmController::new(bus, SystemClock::new(), config);

    arm.init(false)?;
    info!("At rest: {}", format_joints(&arm.current_angles()));

    let targets = [
        CartesianPose::with_pitch(20.0, 0.0, 9.0, 90f64.to_radians()),
        CartesianPose::with_pitch(15.0, 15.0, 20.0, 0.0),
        CartesianPose::at(25.0, -10.0, 25.0),
    ];
    for pose in &targets {
        match arm.move_to_within(pose, std::time::Duration::from_millis(1000)) {
            Ok(()) => {
                let (point, gamma) = arm.point()?;
                info!("Reached x: {:.2}, y: {:.2}, z: {:.2}, gamma: {:.1}°: {}",
                      point.x, point.y, point.z, gamma.to_degrees(), format_joints(&arm.current_angles()));
            }
            Err(e) => info!("Skipping {:?}: {}", pose.position, e),
        }
    }

    arm.move_rest()?;
    arm.relax()?;
    Ok(())
}
