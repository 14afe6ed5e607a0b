use log::{debug, info, trace};

use crate::config::SimulationConfig;
use crate::destination::DestinationNode;
use crate::error::SimResult;
use crate::node::Host;
use crate::protocol::{strategy_for, ContentionStrategy, Protocol, SlotContext, SlotReport};
use crate::random::{RandomOutcomeSource, RandomOutcomes};
use crate::stats::SimStats;

/// One run of the slot engine: a fixed host population draining its
/// queues onto a single shared medium.
pub struct Simulation<R = RandomOutcomes> {
    hosts: Vec<Host>,
    destination: DestinationNode,
    strategy: Box<dyn ContentionStrategy>,
    rng: R,
    stats: SimStats,
}

impl Simulation<RandomOutcomes> {
    /// Seeded from `config.seed`, or from entropy when it is unset.
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        let rng = RandomOutcomes::from_optional_seed(config.seed);
        Simulation::with_source(config, rng)
    }
}

impl<R: RandomOutcomeSource> Simulation<R> {
    pub fn with_source(config: SimulationConfig, mut rng: R) -> SimResult<Self> {
        config.validate()?;

        let mut hosts: Vec<Host> = Vec::with_capacity(config.host_count);
        for i in 0..config.host_count {
            hosts.push(Host::with_frames(
                i,
                config.frames_per_host,
                config.min_frame_size,
                config.max_frame_size,
                &mut rng,
            ));
        }

        debug!(
            "{}: {} hosts x {} frames, frame size [{}, {}]",
            config.protocol,
            config.host_count,
            config.frames_per_host,
            config.min_frame_size,
            config.max_frame_size
        );

        Ok(Simulation {
            hosts: hosts,
            destination: DestinationNode::new(config.medium),
            strategy: strategy_for(config.protocol, config.ca_arbitration),
            rng: rng,
            stats: SimStats::default(),
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.strategy.protocol()
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn get_total_time_slots(&self) -> u64 {
        self.stats.total_time_slots
    }

    fn hosts_have_frames(&self) -> bool {
        self.hosts.iter().any(|h| h.has_frames_to_send())
    }

    /// Runs slots until every queue is empty and returns the total time
    /// slots elapsed. Terminates because every slot either leaves queues
    /// untouched or removes frames, and a head frame can only collide a
    /// bounded number of times before it is dropped.
    pub fn run_simulation(&mut self) -> u64 {
        info!("{} run started with {} hosts", self.protocol(), self.hosts.len());

        while self.hosts_have_frames() {
            self.run_slot();
        }
        self.stats.collect_hosts(&self.hosts);

        info!(
            "{} run finished: {} time slots, {} delivered, {} dropped",
            self.protocol(),
            self.stats.total_time_slots,
            self.stats.frames_delivered,
            self.stats.frames_dropped
        );
        self.stats.total_time_slots
    }

    fn run_slot(&mut self) -> SlotReport {
        let mut ctx = SlotContext {
            hosts: &mut self.hosts,
            destination: &mut self.destination,
            rng: &mut self.rng,
        };
        let report = self.strategy.resolve_slot(&mut ctx);

        self.destination.reset_medium_state();
        self.stats.record(&report);

        trace!(
            "slot {}: {} transmitters, +{} slots, total {}",
            self.stats.slots,
            report.transmitters,
            report.extra_slots,
            self.stats.total_time_slots
        );
        report
    }
}
