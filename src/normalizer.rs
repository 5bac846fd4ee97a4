use log::{debug, warn};

use crate::prelude::{Duration, Epoch, Fix};

/// Why a candidate [Fix] was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Epoch is not strictly after the last accepted fix.
    /// Out of order fixes are rejected, never reordered.
    NonMonotonic { last: Epoch, got: Epoch },
    /// The receiver flagged the solution invalid itself.
    InvalidFix,
    /// A NaN or infinite field: the record is unusable.
    NonFinite,
    /// Accuracy indicator beyond the configured ceiling: solution
    /// quality is too poor to evaluate.
    AccuracyCeiling { got: f64, ceiling: f64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::NonMonotonic { last, got } => {
                write!(fmt, "non monotonic epoch (last {}, got {})", last, got)
            },
            Self::InvalidFix => write!(fmt, "receiver flagged fix invalid"),
            Self::NonFinite => write!(fmt, "non finite field"),
            Self::AccuracyCeiling { got, ceiling } => {
                write!(fmt, "accuracy {} beyond ceiling {}", got, ceiling)
            },
        }
    }
}

/// Screening outcome for one candidate [Fix].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screening {
    /// Fix is usable; detectors may consume it.
    Accepted,
    /// Fix is usable, but it arrives after a quiet period longer than
    /// the staleness bound. Detector history predating the gap is no
    /// longer trustworthy and must be discarded before this fix is
    /// consumed.
    Gap(Duration),
    /// Fix refused. No detector state may change.
    Rejected(RejectReason),
}

impl Screening {
    /// True when detectors may consume the screened fix.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted | Self::Gap(_))
    }
}

/// Validation gate in front of the detectors. Keeps the
/// last-accepted-epoch watermark and enforces strict time ordering
/// across the whole pipeline: no detector ever observes a fix that
/// did not pass this gate.
#[derive(Debug, Clone)]
pub struct Normalizer {
    staleness_bound: Duration,
    accuracy_ceiling: f64,
    /// Watermark: epoch of the last accepted fix.
    watermark: Option<Epoch>,
}

impl Normalizer {
    pub fn new(staleness_bound: Duration, accuracy_ceiling: f64) -> Self {
        Self {
            staleness_bound,
            accuracy_ceiling,
            watermark: None,
        }
    }

    /// Epoch of the last accepted fix, if any.
    pub fn watermark(&self) -> Option<Epoch> {
        self.watermark
    }

    /// Screens one candidate [Fix]. The watermark advances only on
    /// acceptance: rejection leaves the normalizer (and everything
    /// downstream) untouched.
    pub fn screen(&mut self, fix: &Fix) -> Screening {
        if !fix.valid {
            warn!("{} - rejected fix: receiver invalid flag", fix.epoch);
            return Screening::Rejected(RejectReason::InvalidFix);
        }

        if !fix.is_finite() {
            warn!("{} - rejected fix: non finite field", fix.epoch);
            return Screening::Rejected(RejectReason::NonFinite);
        }

        if fix.accuracy > self.accuracy_ceiling {
            warn!(
                "{} - rejected fix: accuracy {} beyond ceiling {}",
                fix.epoch, fix.accuracy, self.accuracy_ceiling
            );
            return Screening::Rejected(RejectReason::AccuracyCeiling {
                got: fix.accuracy,
                ceiling: self.accuracy_ceiling,
            });
        }

        if let Some(last) = self.watermark {
            if fix.epoch <= last {
                warn!(
                    "{} - rejected fix: out of order (watermark {})",
                    fix.epoch, last
                );
                return Screening::Rejected(RejectReason::NonMonotonic {
                    last,
                    got: fix.epoch,
                });
            }

            let dt = fix.epoch - last;
            self.watermark = Some(fix.epoch);

            if dt > self.staleness_bound {
                debug!("{} - data gap of {} detected", fix.epoch, dt);
                return Screening::Gap(dt);
            }

            return Screening::Accepted;
        }

        self.watermark = Some(fix.epoch);
        Screening::Accepted
    }

    /// Forgets the watermark. Only used when the whole engine is
    /// rebuilt; a data gap does not clear ordering history.
    pub fn reset(&mut self) {
        self.watermark = None;
    }
}
