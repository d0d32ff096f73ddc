//! Supports reading the arm configuration from YAML file (optional)

use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use serde_saphyr::Options;

use crate::config::{ArmConfig, ControllerConfig};
use crate::constraints::Constraints;
use crate::parameter_error::ParameterError;
use crate::parameters::widowx_kinematics::Parameters;
use crate::poses::StaticPoses;

#[derive(Deserialize)]
struct Geometry {
    pub l0: f64,
    pub l1: f64,
    pub l2: f64,
    pub l3: f64,
    pub l4: f64,
}

#[derive(Deserialize)]
struct JointLimits {
    pub from: Vec<f64>,
    pub to: Vec<f64>,
}

/// Any field that is missing keeps its default.
#[derive(Deserialize, Default)]
#[serde(default)]
struct Controller {
    pub default_duration_ms: Option<u64>,
    pub sample_period_ms: Option<u64>,
    pub min_duration_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    pub read_retries: Option<u32>,
    pub read_backoff_ms: Option<u64>,
    pub torque_delay_ms: Option<u64>,
    pub joint_step_delay_ms: Option<u64>,
    pub init_pause_ms: Option<u64>,
    pub joint_speed_gain: Option<f64>,
    pub point_speed_gain: Option<f64>,
    pub gamma_speed_gain: Option<f64>,
    pub workspace_xy_limit: Option<f64>,
    pub workspace_z_min: Option<f64>,
    pub workspace_z_max: Option<f64>,
    pub workspace_gamma_limit: Option<f64>,
}

#[derive(Deserialize)]
struct Root {
    #[serde(rename = "widowx_geometry")]
    pub geometry: Geometry,
    #[serde(default)]
    pub joint_limits: Option<JointLimits>,
    #[serde(default)]
    pub actuator_ids: Option<Vec<u8>>,
    #[serde(default)]
    pub controller: Controller,
    #[serde(default)]
    pub poses: Option<StaticPoses>,
}

impl ArmConfig {
    /// Read the arm configuration from YAML file. YAML file like this is supported:
    /// ```yaml
    /// widowx_geometry:
    ///   l0: 9.0
    ///   l1: 14.0
    ///   l2: 5.0
    ///   l3: 14.0
    ///   l4: 14.0
    /// joint_limits:
    ///   from: [0, deg(-90.5), deg(-90.5), deg(-110), 0, 0]
    ///   to: [0, deg(90.5), deg(150), deg(90.5), 0, 0]
    /// actuator_ids: [1, 2, 3, 4, 5, 6]
    /// controller:
    ///   default_duration_ms: 2000
    ///   workspace_gamma_limit: deg(91)
    /// poses:
    ///   rest: [2048, 2048, 1030, 1000, 512, 512]
    ///   home: [2048, 2048, 2048, 1024, 512, 512]
    ///   center: [2048, 2048, 2048, 2048, 512, 512]
    /// ```
    /// Everything except the geometry is optional and defaults to the WidowX values.
    /// Limits where `from` equals `to` leave the joint unconstrained.
    ///
    /// YAML extension to parse the deg(angle) function is supported (serde_saphyr).
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Same as [ArmConfig::from_yaml_file], but from the YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let root: Root = serde_saphyr::from_str_with_options(
            contents,
            Options { angle_conversions: true, ..Default::default() }
        ).map_err(|e| ParameterError::ParseError(format!("{}", e)))?;

        let gp = &root.geometry;
        for (name, val) in [
            ("l0", gp.l0), ("l1", gp.l1), ("l2", gp.l2), ("l3", gp.l3), ("l4", gp.l4),
        ] {
            if !val.is_finite() || val < 0.0 {
                return Err(invalid(name, format!("must be finite and not negative (got {})", val)));
            }
        }
        let geometry = Parameters::new(gp.l0, gp.l1, gp.l2, gp.l3, gp.l4);

        let constraints = match root.joint_limits {
            Some(limits) => {
                let from = vec_to_six(limits.from)?;
                let to = vec_to_six(limits.to)?;
                for i in 0..6 {
                    if !from[i].is_finite() || !to[i].is_finite() || from[i] > to[i] {
                        return Err(invalid(
                            &format!("joint_limits[{}]", i),
                            format!("need finite from <= to (got {} .. {})", from[i], to[i]),
                        ));
                    }
                }
                Constraints::new(from, to)
            }
            None => Constraints::widowx(),
        };

        let ids = match root.actuator_ids {
            Some(ids) => {
                let ids = vec_to_six(ids)?;
                if ids.iter().any(|&id| id >= crate::sync_write::BROADCAST_ID) {
                    return Err(invalid("actuator_ids", format!("{:?} contains the broadcast id", ids)));
                }
                ids
            }
            None => ArmConfig::widowx().ids,
        };

        let controller = controller_config(&root.controller)?;
        let poses = root.poses.unwrap_or_default();

        Ok(ArmConfig { geometry, constraints, ids, controller, poses })
    }
}

fn controller_config(c: &Controller) -> Result<ControllerConfig, ParameterError> {
    let mut config = ControllerConfig::default();
    let ms = |value: Option<u64>, default: Duration| value.map(Duration::from_millis).unwrap_or(default);

    config.default_duration = ms(c.default_duration_ms, config.default_duration);
    config.sample_period = ms(c.sample_period_ms, config.sample_period);
    config.min_duration = ms(c.min_duration_ms, config.min_duration);
    config.settle_delay = ms(c.settle_delay_ms, config.settle_delay);
    config.read_retries = c.read_retries.unwrap_or(config.read_retries);
    config.read_backoff = ms(c.read_backoff_ms, config.read_backoff);
    config.torque_delay = ms(c.torque_delay_ms, config.torque_delay);
    config.joint_step_delay = ms(c.joint_step_delay_ms, config.joint_step_delay);
    config.init_pause = ms(c.init_pause_ms, config.init_pause);
    config.joint_speed_gain = c.joint_speed_gain.unwrap_or(config.joint_speed_gain);
    config.point_speed_gain = c.point_speed_gain.unwrap_or(config.point_speed_gain);
    config.gamma_speed_gain = c.gamma_speed_gain.unwrap_or(config.gamma_speed_gain);

    let workspace = &mut config.workspace;
    workspace.xy_limit = c.workspace_xy_limit.unwrap_or(workspace.xy_limit);
    workspace.z_min = c.workspace_z_min.unwrap_or(workspace.z_min);
    workspace.z_max = c.workspace_z_max.unwrap_or(workspace.z_max);
    workspace.gamma_limit = c.workspace_gamma_limit.unwrap_or(workspace.gamma_limit);

    if config.sample_period.is_zero() {
        return Err(invalid("sample_period_ms", "must be positive".to_string()));
    }
    if config.min_duration.is_zero() || config.default_duration.is_zero() {
        return Err(invalid("min_duration_ms", "durations must be positive".to_string()));
    }
    let w = &config.workspace;
    if !(w.xy_limit >= 0.0 && w.z_min <= w.z_max && w.gamma_limit >= 0.0) {
        return Err(invalid("workspace", format!("{:?} is empty", w)));
    }
    Ok(config)
}

fn invalid(field: &str, reason: String) -> ParameterError {
    ParameterError::InvalidValue { field: field.to_string(), reason }
}

/// Convert a vector to a 6-element array, error if the length is not 6.
fn vec_to_six<T: Copy + Default>(v: Vec<T>) -> Result<[T; 6], ParameterError> {
    if v.len() != 6 {
        return Err(ParameterError::InvalidLength { expected: 6, found: v.len() });
    }
    let mut out: [T; 6] = [T::default(); 6];
    out.copy_from_slice(&v);
    Ok(out)
}
