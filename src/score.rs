use crate::prelude::Epoch;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Closed set of anomaly detectors. The detector population is fixed
/// and finite: one per receiver output family being cross checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DetectorId {
    /// Physical plausibility of the position/velocity sequence.
    Kinematic,
    /// Physical plausibility of the clock bias/drift evolution.
    Clock,
    /// Agreement between reported velocity and the velocity implied
    /// by successive positions.
    CrossField,
}

impl std::fmt::Display for DetectorId {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Kinematic => write!(fmt, "kinematic"),
            Self::Clock => write!(fmt, "clock"),
            Self::CrossField => write!(fmt, "cross-field"),
        }
    }
}

/// Why a detector scored the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rationale {
    /// All monitored quantities within configured bounds.
    Nominal,
    /// Not enough history since start or since the last data gap:
    /// the score is zero and must not contribute to fusion.
    InsufficientHistory,
    /// Implied velocity exceeded the platform bound.
    VelocityExceeded,
    /// Implied acceleration exceeded the platform bound.
    AccelerationExceeded,
    /// Implied jerk exceeded the platform bound.
    JerkExceeded,
    /// Clock drift changed faster than the oscillator allows.
    DriftRateExceeded,
    /// Clock bias diverged from its drift-predicted value.
    BiasPredictionError,
    /// Reported velocity diverged from position-implied velocity.
    VelocityDivergence,
    /// A bias step matching a configured leap second epoch was
    /// excluded from scoring.
    LeapSecondExcluded,
}

impl std::fmt::Display for Rationale {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Nominal => write!(fmt, "nominal"),
            Self::InsufficientHistory => write!(fmt, "insufficient history"),
            Self::VelocityExceeded => write!(fmt, "velocity bound exceeded"),
            Self::AccelerationExceeded => write!(fmt, "acceleration bound exceeded"),
            Self::JerkExceeded => write!(fmt, "jerk bound exceeded"),
            Self::DriftRateExceeded => write!(fmt, "drift rate bound exceeded"),
            Self::BiasPredictionError => write!(fmt, "bias prediction error"),
            Self::VelocityDivergence => write!(fmt, "velocity divergence"),
            Self::LeapSecondExcluded => write!(fmt, "leap second step excluded"),
        }
    }
}

/// One anomaly observation, produced once per accepted [crate::prelude::Fix]
/// per detector, never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnomalyScore {
    /// Emitting detector.
    pub detector: DetectorId,
    /// [Epoch] of the fix this score was computed from.
    pub epoch: Epoch,
    /// Score in [0, 1]. 0 is nominal, 1 is certain anomaly.
    pub value: f64,
    /// Scoring [Rationale].
    pub rationale: Rationale,
}

impl AnomalyScore {
    /// Builds a nominal (zero valued) [AnomalyScore].
    pub fn nominal(detector: DetectorId, epoch: Epoch) -> Self {
        Self {
            detector,
            epoch,
            value: 0.0,
            rationale: Rationale::Nominal,
        }
    }

    /// Builds the warm-up [AnomalyScore]: zero valued and excluded
    /// from fusion weighting.
    pub fn insufficient_history(detector: DetectorId, epoch: Epoch) -> Self {
        Self {
            detector,
            epoch,
            value: 0.0,
            rationale: Rationale::InsufficientHistory,
        }
    }

    /// True if this score must be excluded from the fused weighted sum.
    pub fn excluded_from_fusion(&self) -> bool {
        matches!(self.rationale, Rationale::InsufficientHistory)
    }
}

/// Maps the relative excess of a metric beyond its bound to a score in
/// [0, 1) through a saturating curve. `scale` controls how fast the
/// score approaches 1: a metric at twice its bound with scale 0.25
/// already scores 0.8, while a metric 5% over the bound stays low, so
/// one noisy sample cannot alone saturate the score.
pub(crate) fn saturating_score(metric: f64, bound: f64, scale: f64) -> f64 {
    if metric <= bound {
        return 0.0;
    }

    let excess = (metric - bound) / bound;
    excess / (excess + scale)
}

#[cfg(test)]
mod test {
    use super::{saturating_score, AnomalyScore, DetectorId};
    use crate::prelude::Epoch;

    #[test]
    fn saturation_curve() {
        assert_eq!(saturating_score(5.0, 10.0, 0.25), 0.0);
        assert_eq!(saturating_score(10.0, 10.0, 0.25), 0.0);

        // slight excess stays moderate
        let slight = saturating_score(11.0, 10.0, 0.25);
        assert!(slight > 0.0 && slight < 0.5, "slight={}", slight);

        // gross excess saturates
        let gross = saturating_score(80.0, 10.0, 0.25);
        assert!(gross > 0.95, "gross={}", gross);

        // monotonic
        assert!(saturating_score(12.0, 10.0, 0.25) > slight);
    }

    #[test]
    fn fusion_exclusion() {
        let t0 = Epoch::from_gpst_seconds(0.0);
        assert!(AnomalyScore::insufficient_history(DetectorId::Clock, t0).excluded_from_fusion());
        assert!(!AnomalyScore::nominal(DetectorId::Clock, t0).excluded_from_fusion());
    }
}
