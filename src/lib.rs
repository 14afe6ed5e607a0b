//! Discrete time-slot simulation of Slotted ALOHA, CSMA/CD and CSMA/CA
//! hosts contending for one shared medium.
//!
//! Build a [`Simulation`] from a [`SimulationConfig`], call
//! [`Simulation::run_simulation`] and read the elapsed time slots back.

pub mod config;
pub mod destination;
pub mod error;
pub mod frame;
pub mod node;
pub mod protocol;
pub mod random;
pub mod scheduler;
pub mod stats;
pub mod theoretical;

pub use config::{SimulationConfig, SweepConfig, FRAMES_PER_HOST};
pub use destination::{DestinationNode, MediumProfile, Reception};
pub use error::{SimError, SimResult};
pub use frame::Frame;
pub use node::{CollisionOutcome, Host, HostState};
pub use protocol::{CaArbitration, ContentionStrategy, Protocol};
pub use random::{RandomOutcomeSource, RandomOutcomes};
pub use scheduler::Simulation;
pub use stats::SimStats;
