use log::{info, warn};

use crate::prelude::{AlertThresholds, Classification, DetectionFilter, Epoch, Verdict};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Alarm state exposed to external sinks. Transitions are driven only
/// by consecutive [Verdict]s, never by a single sample: hysteresis
/// against noise induced flapping.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AlertState {
    /// No sustained anomaly.
    #[default]
    Normal,
    /// Confidence has held above the low threshold long enough to
    /// warrant attention.
    Suspect,
    /// Confidence has held above the high threshold long enough to
    /// declare the receiver spoofed. Sticky: only a full cooldown of
    /// low confidence verdicts leaves this state, via
    /// [AlertState::Recovering].
    Spoofed,
    /// Confidence has dropped after a SPOOFED episode but the cooldown
    /// has not elapsed yet.
    Recovering,
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Normal => write!(fmt, "NORMAL"),
            Self::Suspect => write!(fmt, "SUSPECT"),
            Self::Spoofed => write!(fmt, "SPOOFED"),
            Self::Recovering => write!(fmt, "RECOVERING"),
        }
    }
}

/// One state transition, with the [Verdict] that triggered it.
/// Transitions are the only observable side effect of the machine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlertEvent {
    /// [Epoch] of the triggering verdict.
    pub epoch: Epoch,
    /// State left behind.
    pub previous: AlertState,
    /// State entered.
    pub new: AlertState,
    /// Triggering [Verdict].
    pub verdict: Verdict,
}

/// Debounced, hysteretic alarm machine. The single point of shared
/// mutable state downstream of fusion: at most one verdict is applied
/// at a time (exclusive `&mut` access serializes transitions).
#[derive(Debug, Clone)]
pub struct AlertMachine {
    thresholds: AlertThresholds,
    state: AlertState,
    /// N-of-N filter over verdicts at or above the suspect confidence.
    suspect_filter: DetectionFilter,
    /// N-of-N filter over verdicts at or above the spoofed confidence,
    /// counting from the start of the episode.
    spoofed_filter: DetectionFilter,
    /// N-of-N filter over verdicts below the suspect confidence.
    quiet_filter: DetectionFilter,
    /// Epoch of the first quiet verdict of the ongoing recovery.
    recovery_started: Option<Epoch>,
}

impl AlertMachine {
    pub fn new(thresholds: AlertThresholds) -> Self {
        // consecutive-verdict debounce is the degenerate M-of-N
        // detection filter with M = N
        let suspect = thresholds.suspect_debounce;
        let spoofed = thresholds.spoofed_debounce;

        Self {
            thresholds,
            state: AlertState::default(),
            suspect_filter: DetectionFilter::new(suspect, suspect),
            spoofed_filter: DetectionFilter::new(spoofed, spoofed),
            quiet_filter: DetectionFilter::new(suspect, suspect),
            recovery_started: None,
        }
    }

    /// Current [AlertState].
    pub fn state(&self) -> AlertState {
        self.state
    }

    /// A data gap voids accumulated evidence: the debounce filters
    /// restart empty. The state itself is kept; a gap never silently
    /// clears an alarm.
    pub fn note_gap(&mut self) {
        self.suspect_filter.reset();
        self.spoofed_filter.reset();
        self.quiet_filter.reset();
        self.recovery_started = None;
    }

    /// Applies one [Verdict]; returns the emitted [AlertEvent] when a
    /// transition occurred. No-data verdicts carry no evidence either
    /// way: warm-up must neither escalate an alarm nor clear one.
    pub fn apply(&mut self, verdict: &Verdict) -> Option<AlertEvent> {
        let confidence = verdict.confidence;
        let no_data = verdict.classification == Classification::NoData;

        let suspicious = !no_data && confidence >= self.thresholds.suspect_confidence;
        let spoofing = !no_data && confidence >= self.thresholds.spoofed_confidence;

        let sustained_suspect = self.suspect_filter.push(suspicious);
        let sustained_spoofed = self.spoofed_filter.push(spoofing);
        let sustained_quiet = !no_data && self.quiet_filter.push(!suspicious);

        let next = match self.state {
            AlertState::Normal => sustained_suspect.then_some(AlertState::Suspect),
            AlertState::Suspect => {
                if sustained_spoofed {
                    Some(AlertState::Spoofed)
                } else if sustained_quiet {
                    // noise that never escalated clears directly
                    Some(AlertState::Normal)
                } else {
                    None
                }
            },
            AlertState::Spoofed => {
                if !no_data && !suspicious {
                    self.recovery_started = Some(verdict.epoch);
                    Some(AlertState::Recovering)
                } else {
                    None
                }
            },
            AlertState::Recovering => {
                if suspicious {
                    // relapse: back to SPOOFED, cooldown restarts
                    self.recovery_started = None;
                    Some(AlertState::Spoofed)
                } else if no_data {
                    // detection is paused: the cooldown does not run
                    None
                } else if self.cooldown_elapsed(verdict.epoch) {
                    self.recovery_started = None;
                    Some(AlertState::Normal)
                } else {
                    // a gap voided the previous cooldown start
                    if self.recovery_started.is_none() {
                        self.recovery_started = Some(verdict.epoch);
                    }
                    None
                }
            },
        };

        let next = next?;

        let previous = self.state;
        self.state = next;

        match next {
            AlertState::Spoofed => {
                warn!("{} - alert: {} -> {}", verdict.epoch, previous, next)
            },
            _ => info!("{} - alert: {} -> {}", verdict.epoch, previous, next),
        }

        Some(AlertEvent {
            epoch: verdict.epoch,
            previous,
            new: next,
            verdict: verdict.clone(),
        })
    }

    fn cooldown_elapsed(&self, now: Epoch) -> bool {
        match self.recovery_started {
            Some(started) => now - started >= self.thresholds.recovery_cooldown,
            None => false,
        }
    }
}
