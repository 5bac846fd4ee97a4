use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::{Duration, Epoch};

/// Configuration Error: raised once at engine construction,
/// never at runtime.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("\"{0}\" must be strictly positive")]
    NonPositiveBound(&'static str),

    #[error("\"{0}\" must lie within (0, 1)")]
    InvalidThreshold(&'static str),

    #[error("suspect confidence must be below spoofed confidence")]
    ThresholdOrder,

    #[error("debounce counts must be non zero")]
    ZeroDebounce,

    #[error("spoofed debounce must be at least the suspect debounce")]
    DebounceOrder,

    #[error("fusion weights must not all be zero")]
    ZeroWeights,

    #[error("minimal history must be at least 2 samples")]
    HistoryTooShort,

    #[error("window must span at least the minimal history at nominal rate")]
    WindowTooShort,

    #[error("unknown platform profile \"{0}\"")]
    UnknownProfile(String),
}

/// Platform motion profile. Selects preset kinematic bounds suited
/// to the deployment; all bounds remain individually overridable.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Profile {
    /// Receiver antenna held static at all times (fixed installation,
    /// timing receiver). Tightest bounds, fastest detection.
    #[cfg_attr(feature = "serde", serde(alias = "static"))]
    Static,
    /// Hand carried receiver, < 10 km/h.
    #[cfg_attr(feature = "serde", serde(alias = "pedestrian"))]
    #[default]
    Pedestrian,
    /// Ground vehicle, < 200 km/h.
    #[cfg_attr(feature = "serde", serde(alias = "vehicular"))]
    Vehicular,
    /// Airborne platform, < 1000 km/h.
    #[cfg_attr(feature = "serde", serde(alias = "airborne"))]
    Airborne,
}

impl Profile {
    /// Preset [KinematicBounds] for this [Profile].
    pub fn bounds(&self) -> KinematicBounds {
        match self {
            Self::Static => KinematicBounds {
                max_velocity_m_s: 0.5,
                max_acceleration_m_s2: 0.5,
                max_jerk_m_s3: 1.0,
                score_scale: default_score_scale(),
            },
            Self::Pedestrian => KinematicBounds {
                max_velocity_m_s: 3.0,
                max_acceleration_m_s2: 3.0,
                max_jerk_m_s3: 10.0,
                score_scale: default_score_scale(),
            },
            Self::Vehicular => KinematicBounds {
                max_velocity_m_s: 60.0,
                max_acceleration_m_s2: 15.0,
                max_jerk_m_s3: 30.0,
                score_scale: default_score_scale(),
            },
            Self::Airborne => KinematicBounds {
                max_velocity_m_s: 300.0,
                max_acceleration_m_s2: 60.0,
                max_jerk_m_s3: 100.0,
                score_scale: default_score_scale(),
            },
        }
    }
}

impl std::str::FromStr for Profile {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        match s.trim() {
            "static" => Ok(Self::Static),
            "pedestrian" => Ok(Self::Pedestrian),
            "vehicular" | "car" => Ok(Self::Vehicular),
            "airborne" => Ok(Self::Airborne),
            _ => Err(ConfigError::UnknownProfile(s.to_string())),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Static => write!(fmt, "static"),
            Self::Pedestrian => write!(fmt, "pedestrian"),
            Self::Vehicular => write!(fmt, "vehicular"),
            Self::Airborne => write!(fmt, "airborne"),
        }
    }
}

fn default_score_scale() -> f64 {
    0.25
}

fn default_window_duration() -> Duration {
    Duration::from_seconds(30.0)
}

fn default_min_history() -> usize {
    4
}

fn default_window_capacity() -> usize {
    128
}

fn default_integration_window() -> Duration {
    Duration::from_seconds(10.0)
}

fn default_staleness_bound() -> Duration {
    Duration::from_seconds(10.0)
}

fn default_accuracy_ceiling() -> f64 {
    20.0
}

/// UTC leap seconds announced since 2015.
fn default_leap_second_epochs() -> Vec<Epoch> {
    vec![
        Epoch::from_gregorian_utc_at_midnight(2015, 7, 1),
        Epoch::from_gregorian_utc_at_midnight(2017, 1, 1),
    ]
}

/// Physical motion bounds for the monitored platform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KinematicBounds {
    /// Maximum plausible velocity magnitude [m/s].
    pub max_velocity_m_s: f64,
    /// Maximum plausible acceleration magnitude [m/s²].
    pub max_acceleration_m_s2: f64,
    /// Maximum plausible jerk magnitude [m/s³].
    pub max_jerk_m_s3: f64,
    /// Saturation scale of the anomaly score (dimensionless,
    /// relative excess at which the score reaches 0.5... see
    /// [crate::prelude::AnomalyScore]).
    #[cfg_attr(feature = "serde", serde(default = "default_score_scale"))]
    pub score_scale: f64,
}

impl Default for KinematicBounds {
    fn default() -> Self {
        Profile::default().bounds()
    }
}

/// Oscillator physical bounds for the receiver clock solution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockBounds {
    /// Maximum plausible rate of change of the clock drift [s/s per
    /// second]. A TCXO holds a few 1E-9/s; an OCXO is tighter.
    pub max_drift_rate_s_s2: f64,
    /// Maximum plausible error between the reported clock bias and
    /// the bias predicted from the previous bias and drift [s].
    pub max_bias_residual_s: f64,
    /// Saturation scale of the anomaly score.
    #[cfg_attr(feature = "serde", serde(default = "default_score_scale"))]
    pub score_scale: f64,
    /// [Epoch]s at which a one second bias step is legitimate and
    /// must not raise an alarm.
    #[cfg_attr(feature = "serde", serde(default = "default_leap_second_epochs"))]
    pub leap_second_epochs: Vec<Epoch>,
}

impl Default for ClockBounds {
    fn default() -> Self {
        Self {
            max_drift_rate_s_s2: 5.0E-9,
            max_bias_residual_s: 1.0E-6,
            score_scale: default_score_scale(),
            leap_second_epochs: default_leap_second_epochs(),
        }
    }
}

/// Bounds on the divergence between reported velocity and the
/// velocity implied by successive positions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CrossFieldBounds {
    /// Maximum plausible time averaged divergence [m/s] between the
    /// two velocity estimates over the integration window.
    pub max_divergence_m_s: f64,
    /// Span over which the divergence is integrated.
    #[cfg_attr(feature = "serde", serde(default = "default_integration_window"))]
    pub integration_window: Duration,
    /// Saturation scale of the anomaly score.
    #[cfg_attr(feature = "serde", serde(default = "default_score_scale"))]
    pub score_scale: f64,
}

impl Default for CrossFieldBounds {
    fn default() -> Self {
        Self {
            max_divergence_m_s: 5.0,
            integration_window: default_integration_window(),
            score_scale: default_score_scale(),
        }
    }
}

/// Per detector weights applied by the fusion engine. Weights are
/// renormalized over the detectors that contributed, so only their
/// ratios matter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FusionWeights {
    pub kinematic: f64,
    pub clock: f64,
    pub cross_field: f64,
    /// A single detector scoring at or above this threshold forces
    /// the fused confidence to at least that score, overriding a
    /// fusion diluted by quiet detectors.
    #[cfg_attr(feature = "serde", serde(default = "default_override_threshold"))]
    pub individual_override_threshold: f64,
}

fn default_override_threshold() -> f64 {
    0.9
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            kinematic: 0.4,
            clock: 0.3,
            cross_field: 0.3,
            individual_override_threshold: default_override_threshold(),
        }
    }
}

/// Alarm escalation thresholds and hysteresis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlertThresholds {
    /// Fused confidence above which verdicts count towards SUSPECT.
    pub suspect_confidence: f64,
    /// Fused confidence above which verdicts count towards SPOOFED.
    pub spoofed_confidence: f64,
    /// Consecutive qualifying verdicts before entering SUSPECT
    /// (and before leaving it back to NORMAL).
    pub suspect_debounce: usize,
    /// Consecutive qualifying verdicts before entering SPOOFED.
    /// Counted from the start of the episode: must exceed
    /// `suspect_debounce`.
    pub spoofed_debounce: usize,
    /// Sustained low confidence [Duration] required to fully recover
    /// from a SPOOFED episode.
    pub recovery_cooldown: Duration,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            suspect_confidence: 0.3,
            spoofed_confidence: 0.7,
            suspect_debounce: 3,
            spoofed_debounce: 5,
            recovery_cooldown: Duration::from_seconds(30.0),
        }
    }
}

/// Engine configuration. All fields carry defaults; how the values
/// are loaded (file, CLI, hard coded) is up to the integrator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Platform motion [Profile].
    #[cfg_attr(feature = "serde", serde(default))]
    pub profile: Profile,
    /// Physical motion bounds. Defaults follow [Config::profile].
    #[cfg_attr(feature = "serde", serde(default))]
    pub kinematic: KinematicBounds,
    /// Oscillator bounds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub clock: ClockBounds,
    /// Velocity cross check bounds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cross_field: CrossFieldBounds,
    /// Fusion weighting.
    #[cfg_attr(feature = "serde", serde(default))]
    pub fusion: FusionWeights,
    /// Alarm escalation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub alert: AlertThresholds,
    /// Span of each detector history window.
    #[cfg_attr(feature = "serde", serde(default = "default_window_duration"))]
    pub window_duration: Duration,
    /// Hard cap on buffered samples per window.
    #[cfg_attr(feature = "serde", serde(default = "default_window_capacity"))]
    pub window_capacity: usize,
    /// Accepted fixes required after start or after a data gap before
    /// a detector contributes to fusion.
    #[cfg_attr(feature = "serde", serde(default = "default_min_history"))]
    pub min_history: usize,
    /// Quiet time after which the stream is declared stale: detection
    /// is paused and warm-up re-engages, rather than silently
    /// continuing across the gap.
    #[cfg_attr(feature = "serde", serde(default = "default_staleness_bound"))]
    pub staleness_bound: Duration,
    /// Fixes reporting an accuracy indicator beyond this ceiling are
    /// too poor to evaluate and are rejected.
    #[cfg_attr(feature = "serde", serde(default = "default_accuracy_ceiling"))]
    pub accuracy_ceiling: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self::preset(Profile::default())
    }
}

impl Config {
    /// Builds the [Config] preset for given platform [Profile],
    /// with default bounds everywhere else.
    pub fn preset(profile: Profile) -> Self {
        Self {
            profile,
            kinematic: profile.bounds(),
            clock: ClockBounds::default(),
            cross_field: CrossFieldBounds::default(),
            fusion: FusionWeights::default(),
            alert: AlertThresholds::default(),
            window_duration: default_window_duration(),
            window_capacity: default_window_capacity(),
            min_history: default_min_history(),
            staleness_bound: default_staleness_bound(),
            accuracy_ceiling: default_accuracy_ceiling(),
        }
    }

    /// Verifies this [Config] is sane. Called once at engine
    /// construction: a bad configuration is fatal at startup,
    /// never at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (value, name) in [
            (self.kinematic.max_velocity_m_s, "max_velocity_m_s"),
            (self.kinematic.max_acceleration_m_s2, "max_acceleration_m_s2"),
            (self.kinematic.max_jerk_m_s3, "max_jerk_m_s3"),
            (self.kinematic.score_scale, "kinematic.score_scale"),
            (self.clock.max_drift_rate_s_s2, "max_drift_rate_s_s2"),
            (self.clock.max_bias_residual_s, "max_bias_residual_s"),
            (self.clock.score_scale, "clock.score_scale"),
            (self.cross_field.max_divergence_m_s, "max_divergence_m_s"),
            (self.cross_field.score_scale, "cross_field.score_scale"),
            (self.accuracy_ceiling, "accuracy_ceiling"),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositiveBound(name));
            }
        }

        for (duration, name) in [
            (self.window_duration, "window_duration"),
            (self.cross_field.integration_window, "integration_window"),
            (self.staleness_bound, "staleness_bound"),
            (self.alert.recovery_cooldown, "recovery_cooldown"),
        ] {
            if duration <= Duration::ZERO {
                return Err(ConfigError::NonPositiveBound(name));
            }
        }

        for (value, name) in [
            (self.alert.suspect_confidence, "suspect_confidence"),
            (self.alert.spoofed_confidence, "spoofed_confidence"),
            (
                self.fusion.individual_override_threshold,
                "individual_override_threshold",
            ),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::InvalidThreshold(name));
            }
        }

        if self.alert.suspect_confidence >= self.alert.spoofed_confidence {
            return Err(ConfigError::ThresholdOrder);
        }

        if self.alert.suspect_debounce == 0 || self.alert.spoofed_debounce == 0 {
            return Err(ConfigError::ZeroDebounce);
        }

        if self.alert.spoofed_debounce < self.alert.suspect_debounce {
            return Err(ConfigError::DebounceOrder);
        }

        let weights = [
            self.fusion.kinematic,
            self.fusion.clock,
            self.fusion.cross_field,
        ];

        if weights.iter().any(|w| *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::ZeroWeights);
        }

        if self.min_history < 2 {
            return Err(ConfigError::HistoryTooShort);
        }

        if self.window_capacity < self.min_history {
            return Err(ConfigError::WindowTooShort);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Config, ConfigError, Profile};
    use crate::prelude::Duration;
    use std::str::FromStr;

    #[test]
    fn presets_are_valid() {
        for profile in [
            Profile::Static,
            Profile::Pedestrian,
            Profile::Vehicular,
            Profile::Airborne,
        ] {
            let cfg = Config::preset(profile);
            assert!(cfg.validate().is_ok(), "invalid preset for {}", profile);
        }
    }

    #[test]
    fn rejects_non_positive_bounds() {
        let mut cfg = Config::default();
        cfg.kinematic.max_velocity_m_s = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveBound("max_velocity_m_s"))
        ));

        let mut cfg = Config::default();
        cfg.staleness_bound = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut cfg = Config::default();
        cfg.alert.suspect_confidence = 0.8;
        cfg.alert.spoofed_confidence = 0.4;
        assert_eq!(cfg.validate(), Err(ConfigError::ThresholdOrder));
    }

    #[test]
    fn rejects_zero_debounce() {
        let mut cfg = Config::default();
        cfg.alert.suspect_debounce = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroDebounce));
    }

    #[test]
    fn rejects_zero_weights() {
        let mut cfg = Config::default();
        cfg.fusion.kinematic = 0.0;
        cfg.fusion.clock = 0.0;
        cfg.fusion.cross_field = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroWeights));
    }

    #[test]
    fn profile_from_str() {
        assert_eq!(Profile::from_str("static"), Ok(Profile::Static));
        assert_eq!(Profile::from_str("Vehicular"), Ok(Profile::Vehicular));
        assert_eq!(Profile::from_str("car"), Ok(Profile::Vehicular));
        assert!(Profile::from_str("submarine").is_err());
    }
}
