//! Configuration vault – reads/writes `~/.armsim/config.toml`.

use armsim_runtime::DriverConfig;
use armsim_types::{ArmError, ArmModel, DEFAULT_LINE_STEPS, JointLimits};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted arm and simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Shoulder-to-elbow length, metres.
    #[serde(default = "default_link1")]
    pub link1: f64,

    /// Elbow-to-effector length, metres.
    #[serde(default = "default_link2")]
    pub link2: f64,

    /// Shoulder range `[min, max]`, degrees.
    #[serde(default = "default_joint1_limits")]
    pub joint1_limits_deg: [f64; 2],

    /// Elbow range `[min, max]`, degrees.
    #[serde(default = "default_joint2_limits")]
    pub joint2_limits_deg: [f64; 2],

    /// Top joint speed, degrees per second.
    #[serde(default = "default_max_joint_speed")]
    pub max_joint_speed_deg: f64,

    /// Speed scale restored by a hard reset, `0..=1`.
    #[serde(default = "default_speed")]
    pub default_speed: f64,

    #[serde(default = "default_frame_rate")]
    pub frame_rate_hz: f64,

    /// Largest simulated step per frame, seconds.
    #[serde(default = "default_max_frame_dt")]
    pub max_frame_dt: f64,

    /// Steps used by `line_to` when the script does not give any.
    #[serde(default = "default_line_steps")]
    pub line_steps: u32,
}

fn default_link1() -> f64 {
    1.0
}
fn default_link2() -> f64 {
    0.75
}
fn default_joint1_limits() -> [f64; 2] {
    [-180.0, 180.0]
}
fn default_joint2_limits() -> [f64; 2] {
    [-150.0, 150.0]
}
fn default_max_joint_speed() -> f64 {
    2.0_f64.to_degrees()
}
fn default_speed() -> f64 {
    1.0
}
fn default_frame_rate() -> f64 {
    60.0
}
fn default_max_frame_dt() -> f64 {
    0.1
}
fn default_line_steps() -> u32 {
    DEFAULT_LINE_STEPS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            link1: default_link1(),
            link2: default_link2(),
            joint1_limits_deg: default_joint1_limits(),
            joint2_limits_deg: default_joint2_limits(),
            max_joint_speed_deg: default_max_joint_speed(),
            default_speed: default_speed(),
            frame_rate_hz: default_frame_rate(),
            max_frame_dt: default_max_frame_dt(),
            line_steps: default_line_steps(),
        }
    }
}

impl Config {
    /// Build the arm model these settings describe.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidArgument`] for non-positive links or speed, or an
    /// inverted joint range.
    pub fn arm_model(&self) -> Result<ArmModel, ArmError> {
        let [j1_min, j1_max] = self.joint1_limits_deg;
        let [j2_min, j2_max] = self.joint2_limits_deg;
        ArmModel::new(
            self.link1,
            self.link2,
            [
                JointLimits::from_degrees(j1_min, j1_max),
                JointLimits::from_degrees(j2_min, j2_max),
            ],
            self.max_joint_speed_deg.to_radians(),
        )
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            frame_rate_hz: self.frame_rate_hz,
            max_frame_dt: self.max_frame_dt,
            ..DriverConfig::default()
        }
    }
}

/// Return the path to `~/.armsim/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".armsim").join("config.toml")
}

/// Load the config from disk. Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ARMSIM_*` environment overrides. Values that do not parse are
/// ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `ARMSIM_LINK1` | `link1` |
/// | `ARMSIM_LINK2` | `link2` |
/// | `ARMSIM_MAX_JOINT_SPEED_DEG` | `max_joint_speed_deg` |
/// | `ARMSIM_FRAME_RATE_HZ` | `frame_rate_hz` |
pub fn apply_env_overrides(cfg: &mut Config) {
    let overrides: [(&str, &mut f64); 4] = [
        ("ARMSIM_LINK1", &mut cfg.link1),
        ("ARMSIM_LINK2", &mut cfg.link2),
        ("ARMSIM_MAX_JOINT_SPEED_DEG", &mut cfg.max_joint_speed_deg),
        ("ARMSIM_FRAME_RATE_HZ", &mut cfg.frame_rate_hz),
    ];
    for (var, field) in overrides {
        if let Ok(v) = std::env::var(var)
            && let Ok(parsed) = v.trim().parse::<f64>()
        {
            *field = parsed;
        }
    }
}

/// Save the config to disk, creating `~/.armsim/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
