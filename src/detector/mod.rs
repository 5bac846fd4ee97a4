//! Receiver output consistency detectors.
//!
//! Each detector owns its bounded history window exclusively, consumes
//! accepted [Fix]es one at a time and emits one [AnomalyScore] per fix.
//! The detector set is closed: spoofing of the receiver output surfaces
//! either in the motion sequence, in the clock solution, or in the
//! disagreement between independently derivable quantities.

mod clock;
mod cross_field;
mod kinematic;

pub use clock::ClockDetector;
pub use cross_field::CrossFieldDetector;
pub use kinematic::KinematicDetector;

use crate::prelude::{AnomalyScore, Config, DetectorId, Fix};

/// Closed set of detectors behind one update/score contract.
pub enum Detector {
    Kinematic(KinematicDetector),
    Clock(ClockDetector),
    CrossField(CrossFieldDetector),
}

impl Detector {
    /// [DetectorId] of this variant.
    pub fn id(&self) -> DetectorId {
        match self {
            Self::Kinematic(_) => DetectorId::Kinematic,
            Self::Clock(_) => DetectorId::Clock,
            Self::CrossField(_) => DetectorId::CrossField,
        }
    }

    /// Consumes one accepted [Fix], returns this detector's
    /// [AnomalyScore] for its epoch.
    pub fn update(&mut self, fix: &Fix) -> AnomalyScore {
        match self {
            Self::Kinematic(detector) => detector.update(fix),
            Self::Clock(detector) => detector.update(fix),
            Self::CrossField(detector) => detector.update(fix),
        }
    }

    /// Discards all history: warm-up re-engages. Called after data
    /// gaps, when samples across the gap can no longer be compared.
    pub fn reset(&mut self) {
        match self {
            Self::Kinematic(detector) => detector.reset(),
            Self::Clock(detector) => detector.reset(),
            Self::CrossField(detector) => detector.reset(),
        }
    }

    /// Builds the full detector set for given [Config].
    pub(crate) fn build_all(cfg: &Config) -> [Detector; 3] {
        [
            Detector::Kinematic(KinematicDetector::new(cfg)),
            Detector::Clock(ClockDetector::new(cfg)),
            Detector::CrossField(CrossFieldDetector::new(cfg)),
        ]
    }
}
