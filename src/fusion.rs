use log::debug;

use crate::prelude::{AnomalyScore, DetectorId, Epoch, FusionWeights};
use crate::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which receiver output family the fused anomaly implicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Classification {
    /// Nothing implicated.
    Nominal,
    /// Position sequence implicated (kinematic detector dominant).
    Position,
    /// Velocity reporting implicated (cross-field detector dominant).
    Velocity,
    /// Clock solution implicated.
    Clock,
    /// Two or more detectors agree.
    Combined,
    /// Every detector is still warming up: no basis for a verdict.
    NoData,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Nominal => write!(fmt, "nominal"),
            Self::Position => write!(fmt, "position"),
            Self::Velocity => write!(fmt, "velocity"),
            Self::Clock => write!(fmt, "clock"),
            Self::Combined => write!(fmt, "combined"),
            Self::NoData => write!(fmt, "no-data"),
        }
    }
}

/// Fused per-fix decision. One [Verdict] is produced per accepted fix
/// from the synchronized set of detector scores.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Verdict {
    /// [Epoch] of the fix this verdict was fused from.
    pub epoch: Epoch,
    /// Fused confidence in [0, 1] that the receiver is being spoofed.
    pub confidence: f64,
    /// Implicated output family.
    pub classification: Classification,
    /// The contributing detector scores.
    pub scores: [AnomalyScore; 3],
}

/// Combines the synchronized per-detector scores into one [Verdict].
/// Pure data transformation: holds configuration only, no state.
#[derive(Debug, Clone)]
pub struct Fusion {
    weights: FusionWeights,
    /// Score above which a detector counts as implicated when
    /// classifying the verdict.
    classification_threshold: f64,
}

impl Fusion {
    pub fn new(weights: FusionWeights, classification_threshold: f64) -> Self {
        Self {
            weights,
            classification_threshold,
        }
    }

    fn weight(&self, detector: DetectorId) -> f64 {
        match detector {
            DetectorId::Kinematic => self.weights.kinematic,
            DetectorId::Clock => self.weights.clock,
            DetectorId::CrossField => self.weights.cross_field,
        }
    }

    fn implicates(detector: DetectorId) -> Classification {
        match detector {
            DetectorId::Kinematic => Classification::Position,
            DetectorId::Clock => Classification::Clock,
            DetectorId::CrossField => Classification::Velocity,
        }
    }

    /// Fuses one synchronized score set into a [Verdict]. All three
    /// scores must stem from the same fix epoch.
    pub fn fuse(&self, scores: [AnomalyScore; 3]) -> Result<Verdict, Error> {
        let epoch = scores[0].epoch;
        if scores.iter().any(|score| score.epoch != epoch) {
            return Err(Error::MismatchedEpochs);
        }

        let contributing: Vec<_> = scores
            .iter()
            .filter(|score| !score.excluded_from_fusion())
            .collect();

        if contributing.is_empty() {
            // warm-up everywhere: report no-data rather than guessing
            return Ok(Verdict {
                epoch,
                confidence: 0.0,
                classification: Classification::NoData,
                scores,
            });
        }

        // weighted sum, renormalized over the contributing detectors
        let total_weight: f64 = contributing
            .iter()
            .map(|score| self.weight(score.detector))
            .sum();

        let mut confidence = if total_weight > 0.0 {
            contributing
                .iter()
                .map(|score| self.weight(score.detector) * score.value)
                .sum::<f64>()
                / total_weight
        } else {
            0.0
        };

        // escalation: one very confident detector overrides a fusion
        // diluted by its quiet peers
        for score in contributing.iter() {
            if score.value >= self.weights.individual_override_threshold {
                confidence = confidence.max(score.value);
            }
        }

        let implicated: Vec<_> = contributing
            .iter()
            .filter(|score| score.value >= self.classification_threshold)
            .collect();

        let classification = match implicated.as_slice() {
            [] => Classification::Nominal,
            [single] => Self::implicates(single.detector),
            _ => Classification::Combined,
        };

        if classification != Classification::Nominal {
            debug!(
                "{} - verdict {:.3} ({})",
                epoch, confidence, classification
            );
        }

        Ok(Verdict {
            epoch,
            confidence,
            classification,
            scores,
        })
    }
}
