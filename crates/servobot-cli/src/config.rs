//! Runtime configuration – reads `~/.servobot/config.toml`.
//!
//! The file is optional; every key has a default.  A handful of keys can be
//! overridden from the environment, and the chat token is only ever read
//! from the environment.

use serde::{Deserialize, Serialize};
use servobot_hal::step_from_range;
use servobot_runtime::MatchPolicy;
use servobot_types::ServoError;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

/// Environment variable holding the chat service token.
pub const TOKEN_ENV: &str = "SERVOBOT_TOKEN";

/// Where chat messages come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// WebSocket chat gateway.
    #[default]
    Rtm,
    /// stdin / stdout.
    Console,
}

impl FromStr for TransportKind {
    type Err = ServoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rtm" => Ok(TransportKind::Rtm),
            "console" => Ok(TransportKind::Console),
            other => Err(ServoError::Config(format!("unknown transport '{other}'"))),
        }
    }
}

/// What the servo angle is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// In-process simulated servo.
    #[default]
    Sim,
    /// Linux sysfs PWM channel.
    Sysfs,
}

/// Settings loaded from `~/.servobot/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportKind,

    /// WebSocket URL of the chat gateway.
    #[serde(default = "default_rtm_url")]
    pub rtm_url: String,

    /// Interpolation period in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_angular_range_deg")]
    pub angular_range_deg: f32,

    /// The range is divided into this many equal steps.
    #[serde(default = "default_increments")]
    pub increments: u32,

    #[serde(default)]
    pub match_policy: MatchPolicy,

    /// Fixed seed for reply selection; random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_seed: Option<u64>,

    #[serde(default)]
    pub sink: SinkKind,

    #[serde(default)]
    pub pwm_chip: u32,

    #[serde(default = "default_pwm_channel")]
    pub pwm_channel: u32,
}

fn default_rtm_url() -> String {
    "ws://localhost:8080/rtm".to_string()
}
fn default_tick_interval_ms() -> u64 {
    200
}
fn default_angular_range_deg() -> f32 {
    180.0
}
fn default_increments() -> u32 {
    10
}
fn default_pwm_channel() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            rtm_url: default_rtm_url(),
            tick_interval_ms: default_tick_interval_ms(),
            angular_range_deg: default_angular_range_deg(),
            increments: default_increments(),
            match_policy: MatchPolicy::default(),
            reply_seed: None,
            sink: SinkKind::default(),
            pwm_chip: 0,
            pwm_channel: default_pwm_channel(),
        }
    }
}

impl Config {
    /// Reject settings the servo model cannot work with.
    pub fn validate(&self) -> Result<(), ServoError> {
        if self.increments == 0 {
            return Err(ServoError::Config("increments must be at least 1".to_string()));
        }
        if !self.angular_range_deg.is_finite() || self.angular_range_deg <= 0.0 {
            return Err(ServoError::Config(format!(
                "angular_range_deg must be positive, got {}",
                self.angular_range_deg
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ServoError::Config(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Degrees moved by one nudge or one interpolation tick.
    pub fn step_deg(&self) -> f32 {
        step_from_range(self.angular_range_deg, self.increments)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Return the path to `~/.servobot/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".servobot").join("config.toml")
}

/// Load, override from the environment, and validate.
pub fn load() -> Result<Config, ServoError> {
    load_from(&config_path())
}

/// Like [`load`] but from an explicit path.  A missing file yields the
/// defaults.
pub(crate) fn load_from(path: &Path) -> Result<Config, ServoError> {
    let mut cfg = if path.exists() {
        let raw = fs::read_to_string(path).map_err(|e| {
            ServoError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            ServoError::Config(format!("failed to parse {}: {e}", path.display()))
        })?
    } else {
        Config::default()
    };
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Apply `SERVOBOT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SERVOBOT_TRANSPORT` | `transport` |
/// | `SERVOBOT_RTM_URL` | `rtm_url` |
/// | `SERVOBOT_TICK_MS` | `tick_interval_ms` |
/// | `SERVOBOT_MATCH_POLICY` | `match_policy` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SERVOBOT_TRANSPORT")
        && let Ok(kind) = v.parse::<TransportKind>()
    {
        cfg.transport = kind;
    }
    if let Some(v) = lookup("SERVOBOT_RTM_URL") {
        cfg.rtm_url = v;
    }
    if let Some(v) = lookup("SERVOBOT_TICK_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.tick_interval_ms = ms;
    }
    if let Some(v) = lookup("SERVOBOT_MATCH_POLICY")
        && let Ok(policy) = v.parse::<MatchPolicy>()
    {
        cfg.match_policy = policy;
    }
}

/// Read the chat token from [`TOKEN_ENV`].
///
/// # Errors
///
/// Returns [`ServoError::MissingCredential`] if the variable is unset or
/// blank.
pub fn load_token() -> Result<Zeroizing<String>, ServoError> {
    token_from(std::env::var(TOKEN_ENV).ok())
}

fn token_from(value: Option<String>) -> Result<Zeroizing<String>, ServoError> {
    let value = Zeroizing::new(value.unwrap_or_default());
    if value.trim().is_empty() {
        return Err(ServoError::MissingCredential(TOKEN_ENV.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        (dir, path)
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.transport, TransportKind::Rtm);
        assert_eq!(cfg.rtm_url, "ws://localhost:8080/rtm");
        assert_eq!(cfg.tick_interval(), Duration::from_millis(200));
        assert_eq!(cfg.step_deg(), 18.0);
        assert_eq!(cfg.match_policy, MatchPolicy::Containment);
        assert_eq!(cfg.sink, SinkKind::Sim);
        assert_eq!((cfg.pwm_chip, cfg.pwm_channel), (0, 1));
        assert!(cfg.reply_seed.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_path_points_to_servobot_dir() {
        let p = config_path_for_home("/home/testuser");
        assert_eq!(p, PathBuf::from("/home/testuser/.servobot/config.toml"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let cfg = load_from(&path).expect("defaults");
        assert_eq!(cfg.increments, 10);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let (_dir, path) = write_config(
            r#"
transport = "console"
increments = 20
match_policy = "whole_phrase"
reply_seed = 7
sink = "sysfs"
pwm_chip = 2
"#,
        );
        let cfg = load_from(&path).expect("load");
        assert_eq!(cfg.transport, TransportKind::Console);
        assert_eq!(cfg.step_deg(), 9.0);
        assert_eq!(cfg.match_policy, MatchPolicy::WholePhrase);
        assert_eq!(cfg.reply_seed, Some(7));
        assert_eq!(cfg.sink, SinkKind::Sysfs);
        assert_eq!((cfg.pwm_chip, cfg.pwm_channel), (2, 1));
        assert_eq!(cfg.tick_interval_ms, 200);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let (_dir, path) = write_config("transport = \"carrier pigeon\"");
        assert!(matches!(load_from(&path), Err(ServoError::Config(_))));
    }

    #[test]
    fn zero_increments_is_rejected() {
        let (_dir, path) = write_config("increments = 0");
        assert!(matches!(load_from(&path), Err(ServoError::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_range_and_tick() {
        let cfg = Config {
            angular_range_deg: -10.0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = Config {
            tick_interval_ms: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            env(&[
                ("SERVOBOT_TRANSPORT", "Console"),
                ("SERVOBOT_RTM_URL", "ws://chat.local:9000/rtm"),
                ("SERVOBOT_TICK_MS", "50"),
                ("SERVOBOT_MATCH_POLICY", "whole_phrase"),
            ]),
        );
        assert_eq!(cfg.transport, TransportKind::Console);
        assert_eq!(cfg.rtm_url, "ws://chat.local:9000/rtm");
        assert_eq!(cfg.tick_interval_ms, 50);
        assert_eq!(cfg.match_policy, MatchPolicy::WholePhrase);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            env(&[
                ("SERVOBOT_TRANSPORT", "irc"),
                ("SERVOBOT_TICK_MS", "fast"),
                ("SERVOBOT_MATCH_POLICY", "fuzzy"),
            ]),
        );
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn token_must_be_present_and_non_blank() {
        assert!(matches!(
            token_from(None),
            Err(ServoError::MissingCredential(ref name)) if name == TOKEN_ENV
        ));
        assert!(token_from(Some("   ".to_string())).is_err());
        assert_eq!(token_from(Some("xoxb-123".to_string())).unwrap().as_str(), "xoxb-123");
    }
}
