use crate::node::Host;
use crate::protocol::{Protocol, SlotReport};

/// Counters accumulated over one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimStats {
    pub total_time_slots: u64,
    /// Loop iterations, i.e. base slots without airtime.
    pub slots: u64,
    pub frames_delivered: usize,
    pub frames_dropped: usize,
    pub collisions: usize,
    pub failed_receptions: usize,
    pub lost_acks: usize,
    pub refused_cts: usize,
    /// Per host: (delivered, dropped).
    pub per_host: Vec<(usize, usize)>,
}

impl SimStats {
    pub fn record(&mut self, report: &SlotReport) {
        self.slots += 1;
        self.total_time_slots += 1 + report.extra_slots;
        self.frames_delivered += report.delivered;
        self.frames_dropped += report.dropped;
        self.collisions += report.collisions;
        self.failed_receptions += report.failed_receptions;
        self.lost_acks += report.lost_acks;
        self.refused_cts += report.refused_cts;
    }

    pub fn collect_hosts(&mut self, hosts: &[Host]) {
        self.per_host = hosts.iter().map(|h| h.get_stats()).collect();
    }

    /// Delivered frames per elapsed time slot.
    pub fn throughput(&self) -> f64 {
        if self.total_time_slots == 0 {
            return 0.0;
        }
        self.frames_delivered as f64 / self.total_time_slots as f64
    }

    pub fn delivery_ratio(&self) -> f64 {
        let total = self.frames_delivered + self.frames_dropped;
        if total == 0 {
            return 0.0;
        }
        self.frames_delivered as f64 / total as f64
    }

    pub fn print_summary(&self, protocol: Protocol) {
        println!("*******************Simulation results*******************");
        println!("protocol: {}", protocol);
        println!("total time slots: {}", self.total_time_slots);
        println!("slots: {}", self.slots);
        println!(
            "frames delivered: {}, dropped: {} (ratio {:.4})",
            self.frames_delivered,
            self.frames_dropped,
            self.delivery_ratio()
        );
        println!(
            "collisions: {}, failed receptions: {}, lost acks: {}, refused cts: {}",
            self.collisions, self.failed_receptions, self.lost_acks, self.refused_cts
        );
        for (id, (suc, dropped)) in self.per_host.iter().enumerate() {
            println!("host {} delivered: {} dropped: {}", id, suc, dropped);
        }
        println!("*******************Simulation results*******************");
    }
}
