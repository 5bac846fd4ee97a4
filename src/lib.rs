#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

// private modules
mod alert;
mod cfg;
mod detector;
mod engine;
mod error;
mod fix;
mod fusion;
mod normalizer;
mod score;
mod window;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::alert::{AlertEvent, AlertMachine, AlertState};
    pub use crate::cfg::{
        AlertThresholds, ClockBounds, Config, ConfigError, CrossFieldBounds, FusionWeights,
        KinematicBounds, Profile,
    };
    pub use crate::detector::{ClockDetector, CrossFieldDetector, Detector, KinematicDetector};
    pub use crate::engine::{Engine, EngineEvent, Outcome, Replay};
    pub use crate::error::Error;
    pub use crate::fix::Fix;
    pub use crate::fusion::{Classification, Fusion, Verdict};
    pub use crate::normalizer::{Normalizer, RejectReason, Screening};
    pub use crate::score::{AnomalyScore, DetectorId, Rationale};
    pub use crate::window::{DetectionFilter, RunningSum, Window};
    // re-export
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}

// pub export
pub use error::Error;
