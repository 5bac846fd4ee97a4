use crate::prelude::{Epoch, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One Position / Velocity / Time solution reported by the receiver,
/// along with its clock state. A [Fix] is immutable once built: the
/// engine never edits what the receiver reported.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fix {
    /// Sampling [Epoch] of this solution.
    pub epoch: Epoch,

    /// Resolved position, as ECEF coordinates in meters.
    pub position_ecef_m: Vector3<f64>,

    /// Resolved velocity, as ECEF coordinates in m/s.
    pub velocity_m_s: Vector3<f64>,

    /// Receiver clock bias (offset to the reference timescale) in seconds.
    pub clock_bias_s: f64,

    /// Receiver clock drift in s/s.
    pub clock_drift_s_s: f64,

    /// Accuracy indicator attached to this solution (DOP-like, unitless).
    /// Larger means worse geometry / poorer quality.
    pub accuracy: f64,

    /// Validity flag, as reported by the receiver itself.
    pub valid: bool,
}

impl Fix {
    /// Builds a new [Fix] from the minimum set of fields, with unit accuracy
    /// and the validity flag raised. Use the `with_` methods to complete it.
    pub fn new(epoch: Epoch, position_ecef_m: Vector3<f64>, velocity_m_s: Vector3<f64>) -> Self {
        Self {
            epoch,
            position_ecef_m,
            velocity_m_s,
            clock_bias_s: 0.0,
            clock_drift_s_s: 0.0,
            accuracy: 1.0,
            valid: true,
        }
    }

    /// Copies and returns [Fix] with given clock state (bias seconds, drift s/s).
    pub fn with_clock_state(mut self, bias_s: f64, drift_s_s: f64) -> Self {
        self.clock_bias_s = bias_s;
        self.clock_drift_s_s = drift_s_s;
        self
    }

    /// Copies and returns [Fix] with given accuracy indicator.
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Copies and returns [Fix] flagged invalid by the receiver.
    pub fn with_invalid_flag(mut self) -> Self {
        self.valid = false;
        self
    }

    /// True if every floating point field is finite. Receivers in degraded
    /// tracking conditions may emit NaN components; those never reach the
    /// detectors.
    pub(crate) fn is_finite(&self) -> bool {
        self.position_ecef_m.iter().all(|v| v.is_finite())
            && self.velocity_m_s.iter().all(|v| v.is_finite())
            && self.clock_bias_s.is_finite()
            && self.clock_drift_s_s.is_finite()
            && self.accuracy.is_finite()
    }
}

#[cfg(test)]
mod test {
    use super::Fix;
    use crate::prelude::{Epoch, Vector3};

    #[test]
    fn builder() {
        let t0 = Epoch::from_gpst_seconds(0.0);
        let fix = Fix::new(t0, Vector3::new(1.0, 2.0, 3.0), Vector3::zeros())
            .with_clock_state(1e-3, 1e-9)
            .with_accuracy(2.5);

        assert_eq!(fix.epoch, t0);
        assert_eq!(fix.clock_bias_s, 1e-3);
        assert_eq!(fix.clock_drift_s_s, 1e-9);
        assert_eq!(fix.accuracy, 2.5);
        assert!(fix.valid);
        assert!(fix.is_finite());
    }

    #[test]
    fn finite_check() {
        let t0 = Epoch::from_gpst_seconds(0.0);
        let fix = Fix::new(t0, Vector3::new(f64::NAN, 0.0, 0.0), Vector3::zeros());
        assert!(!fix.is_finite());
    }
}
