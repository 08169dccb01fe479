use crate::Timestamp;
use thiserror::Error;

/// All errors generated by the pipeline and the signal detectors.
///
/// Data conditions (short history, flat bars, zero volume) are never errors;
/// indicators report them as `None` or a documented fallback value.
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("bar {index} has open time {current}, not after previous open time {previous}")]
    MalformedSequence {
        index: usize,
        previous: Timestamp,
        current: Timestamp,
    },

    #[error("series length mismatch: expected {expected}, got {actual}")]
    SeriesLengthMismatch { expected: usize, actual: usize },
}
