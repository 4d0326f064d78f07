use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StimulusError {
    #[error("{what} must be positive, got {value}")]
    NonPositive { what: &'static str, value: f64 },

    #[error("side_len ({side_len}) and n_blocks ({n_blocks}) must have the same parity")]
    ParityMismatch { side_len: usize, n_blocks: usize },

    #[error("{n_blocks} cross blocks do not fit on a board of side {side_len}")]
    TooManyBlocks { side_len: usize, n_blocks: usize },

    #[error("rim inner radius ({inner}) must be smaller than outer radius ({outer})")]
    RimRadii { inner: f64, outer: f64 },
}
