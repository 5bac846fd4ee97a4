use thiserror::Error;

use crate::prelude::Epoch;

/// Runtime errors. These denote internal invariant breaches and are
/// propagated as [Result]s: no single bad fix may ever terminate the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A sample was pushed into a window out of time order. The
    /// normalizer is supposed to gate these out; reaching this point
    /// means the ordering contract was broken upstream.
    #[error("non monotonic sample: last epoch {last}, got {got}")]
    NonMonotonicSample { last: Epoch, got: Epoch },

    /// The fusion engine was handed scores computed from different
    /// epochs. Scores may only be fused within one fix epoch.
    #[error("cannot fuse scores from mismatched epochs")]
    MismatchedEpochs,
}
