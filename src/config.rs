//! Run and sweep configuration.
//!
//! A [`SweepConfig`] is what the driver loads from YAML; it expands into
//! one [`SimulationConfig`] per (protocol, host count, frame range)
//! combination. Configs are validated here, before any simulation is
//! built.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::destination::MediumProfile;
use crate::error::{SimError, SimResult};
use crate::protocol::{CaArbitration, Protocol};

/// Frames every host starts with.
pub const FRAMES_PER_HOST: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub host_count: usize,
    pub protocol: Protocol,
    pub min_frame_size: u32,
    pub max_frame_size: u32,
    #[serde(default = "default_frames_per_host")]
    pub frames_per_host: usize,
    #[serde(default)]
    pub medium: MediumProfile,
    #[serde(default)]
    pub ca_arbitration: CaArbitration,
    /// None = seed from entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_frames_per_host() -> usize {
    FRAMES_PER_HOST
}

impl SimulationConfig {
    pub fn new(host_count: usize, protocol: Protocol, min_frame_size: u32, max_frame_size: u32) -> Self {
        SimulationConfig {
            host_count,
            protocol,
            min_frame_size,
            max_frame_size,
            frames_per_host: FRAMES_PER_HOST,
            medium: MediumProfile::default(),
            ca_arbitration: CaArbitration::default(),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_frames_per_host(mut self, frames: usize) -> Self {
        self.frames_per_host = frames;
        self
    }

    pub fn with_medium(mut self, medium: MediumProfile) -> Self {
        self.medium = medium;
        self
    }

    pub fn with_ca_arbitration(mut self, arbitration: CaArbitration) -> Self {
        self.ca_arbitration = arbitration;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.host_count == 0 {
            return Err(SimError::InvalidHostCount(self.host_count));
        }
        validate_frame_range(self.min_frame_size, self.max_frame_size)?;
        if self.frames_per_host == 0 {
            return Err(SimError::InvalidFramesPerHost);
        }
        self.medium.validate()
    }
}

fn validate_frame_range(min: u32, max: u32) -> SimResult<()> {
    if min == 0 || min > max {
        return Err(SimError::InvalidFrameSizeRange { min, max });
    }
    Ok(())
}

/// A batch of runs crossing protocols, host counts and frame size ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub protocols: Vec<Protocol>,
    pub host_counts: Vec<usize>,
    pub frame_size_ranges: Vec<(u32, u32)>,
    pub frames_per_host: usize,
    /// Base seed; run `i` of the sweep uses `seed + i`.
    pub seed: Option<u64>,
    pub medium: MediumProfile,
    pub ca_arbitration: CaArbitration,
}

impl Default for SweepConfig {
    /// 16 hosts, every protocol, four frame size bands.
    fn default() -> Self {
        SweepConfig {
            protocols: Protocol::ALL.to_vec(),
            host_counts: vec![16],
            frame_size_ranges: vec![(5, 10), (10, 15), (15, 20), (20, 25)],
            frames_per_host: FRAMES_PER_HOST,
            seed: None,
            medium: MediumProfile::default(),
            ca_arbitration: CaArbitration::default(),
        }
    }
}

impl SweepConfig {
    /// Every protocol against a growing host population.
    pub fn by_host_count() -> Self {
        SweepConfig {
            host_counts: vec![5, 10, 15, 20, 25],
            frame_size_ranges: vec![(5, 10)],
            ..SweepConfig::default()
        }
    }

    pub fn load(path: &Path) -> SimResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| SimError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> SimResult<Self> {
        let sweep: SweepConfig = serde_yaml::from_str(text)?;
        sweep.validate()?;
        Ok(sweep)
    }

    pub fn validate(&self) -> SimResult<()> {
        if let Some(&count) = self.host_counts.iter().find(|&&c| c == 0) {
            return Err(SimError::InvalidHostCount(count));
        }
        for &(min, max) in &self.frame_size_ranges {
            validate_frame_range(min, max)?;
        }
        if self.frames_per_host == 0 {
            return Err(SimError::InvalidFramesPerHost);
        }
        self.medium.validate()
    }

    /// One config per run, protocol-major order.
    pub fn runs(&self) -> Vec<SimulationConfig> {
        let mut runs = Vec::new();
        for &protocol in &self.protocols {
            for &host_count in &self.host_counts {
                for &(min, max) in &self.frame_size_ranges {
                    let seed = self.seed.map(|s| s.wrapping_add(runs.len() as u64));
                    runs.push(SimulationConfig {
                        host_count,
                        protocol,
                        min_frame_size: min,
                        max_frame_size: max,
                        frames_per_host: self.frames_per_host,
                        medium: self.medium.clone(),
                        ca_arbitration: self.ca_arbitration,
                        seed,
                    });
                }
            }
        }
        runs
    }
}
