//! Error types for configuring and driving a simulation run.
//!
//! Collisions, lost ACKs and refused CTS are simulated outcomes and never
//! show up here. Only configuration and I/O problems do.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("host count must be at least 1, got {0}")]
    InvalidHostCount(usize),

    #[error("invalid frame size range [{min}, {max}]: need 1 <= min <= max")]
    InvalidFrameSizeRange { min: u32, max: u32 },

    #[error("frames per host must be at least 1")]
    InvalidFramesPerHost,

    #[error("probability `{name}` out of range, got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type SimResult<T> = Result<T, SimError>;
