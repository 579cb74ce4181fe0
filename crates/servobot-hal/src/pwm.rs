//! PWM signal model for hobby servos.
//!
//! A standard servo reads the width of a pulse repeated every 20 ms (50 Hz):
//!
//! | pulse | angle |
//! |---|---|
//! | 1.0 ms | 0° |
//! | 1.5 ms | 90° |
//! | 2.0 ms | 180° |
//!
//! [`PwmTiming`] quantises the period into `resolution` counts and
//! [`PwmServo`] turns angles into duty counts for any [`PwmChannel`].  With
//! the default resolution of 200 counts the usable band is 10..=20 counts,
//! i.e. one count per 18°.
//!
//! [`SysfsPwmChannel`] drives a Linux `/sys/class/pwm` channel.

use std::fs;
use std::path::{Path, PathBuf};

use servobot_types::{MAX_ANGLE_DEG, ServoError, clamp_angle};
use tracing::{debug, info};

/// Default servo frame rate.
pub const DEFAULT_FREQUENCY_HZ: u32 = 50;
/// Default number of duty counts per period.
pub const DEFAULT_RESOLUTION: u32 = 200;

/// Frame rate and duty quantisation of a servo signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmTiming {
    pub frequency_hz: u32,
    pub resolution: u32,
}

impl Default for PwmTiming {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

impl PwmTiming {
    /// Length of one frame in nanoseconds.
    pub fn period_ns(&self) -> u64 {
        1_000_000_000 / u64::from(self.frequency_hz)
    }

    /// Duty counts for `angle_deg`, truncated toward zero.
    pub fn duty_counts(&self, angle_deg: f32) -> u32 {
        let pulse_ms = 1.0 + f64::from(clamp_angle(angle_deg)) / f64::from(MAX_ANGLE_DEG);
        let period_ms = 1000.0 / f64::from(self.frequency_hz);
        // Nudge exact multiples (0.3 ms, …) that land a hair below an integer.
        (pulse_ms / period_ms * f64::from(self.resolution) + 1e-9).floor() as u32
    }
}

/// A hardware PWM output that accepts a duty cycle as a fraction
/// `counts / resolution` of the period.
pub trait PwmChannel: Send {
    fn id(&self) -> &str;

    /// # Errors
    ///
    /// Returns [`ServoError::SinkFault`] if the duty cycle cannot be applied.
    fn set_duty(&mut self, counts: u32, resolution: u32) -> Result<(), ServoError>;
}

/// An [`AngleSink`][crate::sink::AngleSink] that drives a servo through a
/// [`PwmChannel`].
pub struct PwmServo<C: PwmChannel> {
    channel: C,
    timing: PwmTiming,
}

impl<C: PwmChannel> PwmServo<C> {
    pub fn new(channel: C, timing: PwmTiming) -> Self {
        Self { channel, timing }
    }
}

impl<C: PwmChannel> crate::sink::AngleSink for PwmServo<C> {
    fn id(&self) -> &str {
        self.channel.id()
    }

    fn write(&mut self, angle_deg: f32) -> Result<(), ServoError> {
        let counts = self.timing.duty_counts(angle_deg);
        debug!(channel = %self.channel.id(), angle_deg, counts, "pwm duty");
        self.channel.set_duty(counts, self.timing.resolution)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Linux sysfs backend
// ────────────────────────────────────────────────────────────────────────────

/// Default sysfs root for PWM chips.
pub const SYSFS_PWM_ROOT: &str = "/sys/class/pwm";

/// A PWM channel exposed by the Linux kernel under
/// `/sys/class/pwm/pwmchipN/pwmM`.
///
/// All values written to sysfs are in nanoseconds.
pub struct SysfsPwmChannel {
    id: String,
    dir: PathBuf,
    period_ns: u64,
}

impl SysfsPwmChannel {
    /// Open `pwmchip{chip}/pwm{channel}` below the default sysfs root.
    pub fn open(chip: u32, channel: u32, timing: PwmTiming) -> Result<Self, ServoError> {
        Self::open_at(Path::new(SYSFS_PWM_ROOT), chip, channel, timing)
    }

    /// Open a channel below an arbitrary root, exporting it first if the
    /// channel directory does not exist yet.  The period is programmed and
    /// the output enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ServoError::SinkFault`] if any sysfs attribute cannot be
    /// written.
    pub fn open_at(
        root: &Path,
        chip: u32,
        channel: u32,
        timing: PwmTiming,
    ) -> Result<Self, ServoError> {
        let id = format!("pwm{chip}/{channel}");
        let chip_dir = root.join(format!("pwmchip{chip}"));
        let dir = chip_dir.join(format!("pwm{channel}"));

        if !dir.exists() {
            write_attr(&id, &chip_dir.join("export"), &channel.to_string())?;
            info!(channel = %id, "exported pwm channel");
        }

        let period_ns = timing.period_ns();
        write_attr(&id, &dir.join("period"), &period_ns.to_string())?;
        write_attr(&id, &dir.join("enable"), "1")?;

        Ok(Self { id, dir, period_ns })
    }
}

impl PwmChannel for SysfsPwmChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_duty(&mut self, counts: u32, resolution: u32) -> Result<(), ServoError> {
        if resolution == 0 {
            return Err(ServoError::SinkFault {
                component: self.id.clone(),
                details: "duty resolution must be non-zero".to_string(),
            });
        }
        let duty_ns = self.period_ns * u64::from(counts) / u64::from(resolution);
        write_attr(&self.id, &self.dir.join("duty_cycle"), &duty_ns.to_string())
    }
}

fn write_attr(id: &str, path: &Path, value: &str) -> Result<(), ServoError> {
    fs::write(path, value).map_err(|e| ServoError::SinkFault {
        component: id.to_string(),
        details: format!("write {} to {}: {e}", value, path.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::AngleSink;
    use std::sync::{Arc, Mutex};

    struct RecordingChannel {
        duties: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl PwmChannel for RecordingChannel {
        fn id(&self) -> &str {
            "recording"
        }

        fn set_duty(&mut self, counts: u32, resolution: u32) -> Result<(), ServoError> {
            self.duties.lock().unwrap().push((counts, resolution));
            Ok(())
        }
    }

    #[test]
    fn default_timing_spans_ten_to_twenty_counts() {
        let t = PwmTiming::default();
        assert_eq!(t.duty_counts(0.0), 10);
        assert_eq!(t.duty_counts(90.0), 15);
        assert_eq!(t.duty_counts(180.0), 20);
        assert_eq!(t.period_ns(), 20_000_000);
    }

    #[test]
    fn out_of_range_angles_clamp_to_band_edges() {
        let t = PwmTiming::default();
        assert_eq!(t.duty_counts(-90.0), 10);
        assert_eq!(t.duty_counts(360.0), 20);
    }

    #[test]
    fn one_default_step_is_one_count() {
        let t = PwmTiming::default();
        assert_eq!(t.duty_counts(18.0), 11);
        assert_eq!(t.duty_counts(36.0), 12);
    }

    #[test]
    fn pwm_servo_writes_duty_to_channel() {
        let duties = Arc::new(Mutex::new(Vec::new()));
        let mut servo = PwmServo::new(
            RecordingChannel {
                duties: Arc::clone(&duties),
            },
            PwmTiming::default(),
        );
        assert_eq!(servo.id(), "recording");
        servo.write(90.0).unwrap();
        servo.write(180.0).unwrap();
        assert_eq!(*duties.lock().unwrap(), vec![(15, 200), (20, 200)]);
    }

    #[test]
    fn sysfs_channel_exports_and_programs_period() {
        let root = tempfile::tempdir().expect("tmp dir");
        let chip = root.path().join("pwmchip0");
        fs::create_dir_all(&chip).unwrap();
        // The kernel creates the channel directory on export; emulate that.
        fs::create_dir_all(chip.join("pwm1")).unwrap();

        let mut ch = SysfsPwmChannel::open_at(root.path(), 0, 1, PwmTiming::default()).unwrap();
        assert_eq!(ch.id(), "pwm0/1");
        assert_eq!(fs::read_to_string(chip.join("pwm1/period")).unwrap(), "20000000");
        assert_eq!(fs::read_to_string(chip.join("pwm1/enable")).unwrap(), "1");

        ch.set_duty(15, 200).unwrap();
        assert_eq!(fs::read_to_string(chip.join("pwm1/duty_cycle")).unwrap(), "1500000");
    }

    #[test]
    fn sysfs_channel_writes_export_when_channel_missing() {
        let root = tempfile::tempdir().expect("tmp dir");
        let chip = root.path().join("pwmchip0");
        fs::create_dir_all(&chip).unwrap();

        // No pwm1 directory and nothing to create it: export succeeds, the
        // period write then fails because the channel never appeared.
        let result = SysfsPwmChannel::open_at(root.path(), 0, 1, PwmTiming::default());
        assert_eq!(fs::read_to_string(chip.join("export")).unwrap(), "1");
        assert!(matches!(result, Err(ServoError::SinkFault { .. })));
    }

    #[test]
    fn sysfs_channel_missing_chip_is_a_sink_fault() {
        let root = tempfile::tempdir().expect("tmp dir");
        let result = SysfsPwmChannel::open_at(root.path(), 3, 0, PwmTiming::default());
        assert!(matches!(result, Err(ServoError::SinkFault { ref component, .. }) if component == "pwm3/0"));
    }
}
