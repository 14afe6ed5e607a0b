//! Per-protocol contention resolution.
//!
//! Each protocol is one [`ContentionStrategy`]; the slot engine picks the
//! strategy once when the run is built and calls it every slot. A strategy
//! mutates hosts and the destination through the [`SlotContext`] it is
//! lent and reports what happened in a [`SlotReport`]. Slot bookkeeping
//! (the base slot, medium reset) stays with the engine.

use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::destination::{DestinationNode, Reception};
use crate::frame::Frame;
use crate::node::{CollisionOutcome, Host};
use crate::random::RandomOutcomeSource;

#[derive(Debug, Hash, Eq, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    SlottedAloha,
    CsmaCd,
    CsmaCa,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::SlottedAloha, Protocol::CsmaCd, Protocol::CsmaCa];
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::SlottedAloha => write!(f, "Slotted ALOHA"),
            Protocol::CsmaCd => write!(f, "CSMA/CD"),
            Protocol::CsmaCa => write!(f, "CSMA/CA"),
        }
    }
}

/// How CSMA/CA hosts share a slot.
#[derive(Debug, Default, Eq, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaArbitration {
    /// Hosts are resolved one after another in id order and each frees the
    /// medium when its exchange ends, so every ready host gets its turn
    /// inside the same slot.
    #[default]
    SerialRelease,
    /// Hosts are resolved one after another in id order. Once a host's
    /// frame is on the medium, later hosts sense it busy and sit the slot
    /// out.
    Sequential,
    /// The contending set is fixed before anyone transmits, like ALOHA and
    /// CSMA/CD. Two or more contenders collide on their RTS.
    JointContention,
}

/// Everything a strategy may touch while resolving one slot.
pub struct SlotContext<'a> {
    pub hosts: &'a mut [Host],
    pub destination: &'a mut DestinationNode,
    pub rng: &'a mut dyn RandomOutcomeSource,
}

/// Outcome of one slot as seen by the engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlotReport {
    /// Slots spent on top of the base slot: airtime, ACKs, collision
    /// detection.
    pub extra_slots: u64,
    pub transmitters: usize,
    pub delivered: usize,
    pub dropped: usize,
    /// Slots in which two or more hosts contended.
    pub collisions: usize,
    pub failed_receptions: usize,
    pub lost_acks: usize,
    pub refused_cts: usize,
}

pub trait ContentionStrategy {
    fn protocol(&self) -> Protocol;

    fn resolve_slot(&mut self, ctx: &mut SlotContext<'_>) -> SlotReport;
}

/// Strategy for `protocol`. The arbitration policy only matters for
/// CSMA/CA.
pub fn strategy_for(protocol: Protocol, arbitration: CaArbitration) -> Box<dyn ContentionStrategy> {
    match protocol {
        Protocol::SlottedAloha => Box::new(SlottedAloha),
        Protocol::CsmaCd => Box::new(CsmaCd),
        Protocol::CsmaCa => Box::new(CsmaCa { arbitration }),
    }
}

pub struct SlottedAloha;

pub struct CsmaCd;

pub struct CsmaCa {
    pub arbitration: CaArbitration,
}

impl ContentionStrategy for SlottedAloha {
    fn protocol(&self) -> Protocol {
        Protocol::SlottedAloha
    }

    fn resolve_slot(&mut self, ctx: &mut SlotContext<'_>) -> SlotReport {
        let p = ctx.destination.profile().transmission_probability;
        let rng = &mut *ctx.rng;
        let contenders = collect_contenders(ctx.hosts, |host| host.is_ready() && rng.chance(p));

        let mut report = SlotReport {
            transmitters: contenders.len(),
            ..SlotReport::default()
        };

        match contenders.as_slice() {
            [] => {}
            [idx] => {
                let reception = transmit(ctx, *idx, &mut report, |dest, frame, rng| {
                    dest.receive_slotted_aloha(frame, rng)
                });
                if let Some(reception) = reception {
                    if reception.is_delivered() {
                        deliver(&mut ctx.hosts[*idx], &mut report);
                    } else {
                        report.failed_receptions += 1;
                        collide(&mut ctx.hosts[*idx], ctx.rng, &mut report);
                    }
                }
            }
            many => collide_all(ctx, many, &mut report),
        }
        report
    }
}

impl ContentionStrategy for CsmaCd {
    fn protocol(&self) -> Protocol {
        Protocol::CsmaCd
    }

    fn resolve_slot(&mut self, ctx: &mut SlotContext<'_>) -> SlotReport {
        //Carrier sense happens once per slot, before anyone transmits.
        let destination = &*ctx.destination;
        let contenders = collect_contenders(ctx.hosts, |host| {
            host.is_ready() && !destination.is_medium_busy()
        });

        let mut report = SlotReport {
            transmitters: contenders.len(),
            ..SlotReport::default()
        };

        match contenders.as_slice() {
            [] => {}
            [idx] => {
                let reception = transmit(ctx, *idx, &mut report, |dest, frame, rng| {
                    dest.receive_csma_cd(frame, rng)
                });
                if let Some(reception) = reception {
                    if reception.is_delivered() {
                        finish_with_ack(ctx, *idx, &mut report);
                    } else {
                        report.failed_receptions += 1;
                        collide(&mut ctx.hosts[*idx], ctx.rng, &mut report);
                    }
                }
            }
            many => collide_all(ctx, many, &mut report),
        }
        report
    }
}

impl ContentionStrategy for CsmaCa {
    fn protocol(&self) -> Protocol {
        Protocol::CsmaCa
    }

    fn resolve_slot(&mut self, ctx: &mut SlotContext<'_>) -> SlotReport {
        match self.arbitration {
            CaArbitration::SerialRelease => resolve_ca_serial(ctx, true),
            CaArbitration::Sequential => resolve_ca_serial(ctx, false),
            CaArbitration::JointContention => resolve_ca_joint(ctx),
        }
    }
}

/// Hosts take the medium in id order. With `release` each exchange frees
/// the medium for the next host; without it the first exchange holds the
/// medium until the slot ends.
fn resolve_ca_serial(ctx: &mut SlotContext<'_>, release: bool) -> SlotReport {
    let mut report = SlotReport::default();

    for idx in 0..ctx.hosts.len() {
        if !ctx.hosts[idx].is_ready() || ctx.destination.is_medium_busy() {
            continue;
        }
        ctx.hosts[idx].begin_transmission();
        report.transmitters += 1;
        exchange_with_cts(ctx, idx, &mut report);
        if release {
            ctx.destination.release_medium();
        }
    }
    report
}

fn resolve_ca_joint(ctx: &mut SlotContext<'_>) -> SlotReport {
    let destination = &*ctx.destination;
    let contenders = collect_contenders(ctx.hosts, |host| {
        host.is_ready() && !destination.is_medium_busy()
    });

    let mut report = SlotReport {
        transmitters: contenders.len(),
        ..SlotReport::default()
    };

    match contenders.as_slice() {
        [] => {}
        [idx] => exchange_with_cts(ctx, *idx, &mut report),
        many => collide_all(ctx, many, &mut report),
    }
    report
}

/// RTS/CTS, data, ACK for one CSMA/CA host already marked transmitting.
fn exchange_with_cts(ctx: &mut SlotContext<'_>, idx: usize, report: &mut SlotReport) {
    if !ctx.destination.send_cts() {
        report.refused_cts += 1;
        collide(&mut ctx.hosts[idx], ctx.rng, report);
        return;
    }

    let reception = transmit(ctx, idx, report, |dest, frame, rng| {
        dest.receive_csma_ca(frame, rng)
    });
    if let Some(reception) = reception {
        if reception.is_delivered() {
            finish_with_ack(ctx, idx, report);
        } else {
            report.failed_receptions += 1;
            collide(&mut ctx.hosts[idx], ctx.rng, report);
        }
    }
}

/// Indices of hosts passing `eligible`, in host order. Every host is
/// asked exactly once, and nobody is flagged as transmitting until the
/// whole set is known.
fn collect_contenders<F>(hosts: &mut [Host], mut eligible: F) -> Vec<usize>
where
    F: FnMut(&mut Host) -> bool,
{
    let mut contenders = Vec::new();
    for (idx, host) in hosts.iter_mut().enumerate() {
        if eligible(host) {
            contenders.push(idx);
        }
    }
    for &idx in &contenders {
        hosts[idx].begin_transmission();
    }
    contenders
}

/// Puts the head frame of `hosts[idx]` on the medium and charges its
/// airtime. `None` if the host had nothing queued.
fn transmit<F>(
    ctx: &mut SlotContext<'_>,
    idx: usize,
    report: &mut SlotReport,
    receive: F,
) -> Option<Reception>
where
    F: FnOnce(&mut DestinationNode, &Frame, &mut dyn RandomOutcomeSource) -> Reception,
{
    let frame = ctx.hosts[idx].current_frame()?;
    let reception = receive(&mut *ctx.destination, frame, &mut *ctx.rng);
    report.extra_slots += reception.airtime(frame);
    trace!(
        "host {} sent frame of {} slots: {:?}",
        ctx.hosts[idx].get_id(),
        frame.size(),
        reception
    );
    Some(reception)
}

/// ACK round after a good reception. A lost ACK counts as a collision.
fn finish_with_ack(ctx: &mut SlotContext<'_>, idx: usize, report: &mut SlotReport) {
    report.extra_slots += ctx.destination.profile().ack_slots;
    if ctx.destination.send_ack(ctx.rng) {
        deliver(&mut ctx.hosts[idx], report);
    } else {
        report.lost_acks += 1;
        collide(&mut ctx.hosts[idx], ctx.rng, report);
    }
}

fn collide_all(ctx: &mut SlotContext<'_>, contenders: &[usize], report: &mut SlotReport) {
    trace!("collision between {} hosts", contenders.len());
    for &idx in contenders {
        collide(&mut ctx.hosts[idx], ctx.rng, report);
    }
    report.collisions += 1;
    report.extra_slots += ctx.destination.profile().collision_detect_slots;
}

fn deliver(host: &mut Host, report: &mut SlotReport) {
    if let Some(frame) = host.frame_successfully_sent() {
        trace!("host {} delivered a frame of {} slots", frame.sender_id(), frame.size());
    }
    report.delivered += 1;
}

fn collide(host: &mut Host, rng: &mut dyn RandomOutcomeSource, report: &mut SlotReport) {
    if host.handle_collision(rng) == CollisionOutcome::Dropped {
        report.dropped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::MediumProfile;
    use crate::random::{FixedOutcomes, RandomOutcomes};

    fn hosts(n: usize, frames: usize, size: u32) -> Vec<Host> {
        (0..n)
            .map(|id| {
                let mut host = Host::new(id);
                for _ in 0..frames {
                    host.push_frame(Frame::new(id, size));
                }
                host
            })
            .collect()
    }

    #[test]
    fn test_aloha_two_ready_hosts_collide() {
        let mut hosts = hosts(2, 3, 5);
        let mut dest = DestinationNode::new(MediumProfile::default());
        let mut rng = FixedOutcomes::always();
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = SlottedAloha.resolve_slot(&mut ctx);

        assert_eq!(report.transmitters, 2);
        assert_eq!(report.collisions, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(report.extra_slots, 1);
        for host in &hosts {
            assert_eq!(host.queue_len(), 3);
            assert_eq!(host.collision_count(), 1);
            assert!(host.backoff_slots() >= 1);
            assert!(!host.is_transmitting());
        }
    }

    #[test]
    fn test_aloha_single_host_depends_on_reception_only() {
        let mut rng = FixedOutcomes::always();
        let mut hosts = hosts(3, 1, 6);
        // two of three hosts are backing off
        hosts[1].handle_collision(&mut rng);
        hosts[2].handle_collision(&mut rng);
        let mut dest = DestinationNode::new(MediumProfile::default());
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = SlottedAloha.resolve_slot(&mut ctx);

        assert_eq!(report.transmitters, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.extra_slots, 6);
        assert!(!hosts[0].has_frames_to_send());
    }

    #[test]
    fn test_aloha_single_host_failed_reception_backs_off() {
        let mut hosts = hosts(1, 1, 6);
        let profile = MediumProfile {
            aloha_success: 0.0,
            transmission_probability: 1.0,
            ..MediumProfile::default()
        };
        let mut dest = DestinationNode::new(profile);
        let mut rng = RandomOutcomes::from_seed(3);
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = SlottedAloha.resolve_slot(&mut ctx);

        assert_eq!(report.failed_receptions, 1);
        assert_eq!(report.collisions, 0);
        assert_eq!(report.extra_slots, 6);
        assert_eq!(hosts[0].queue_len(), 1);
        assert_eq!(hosts[0].collision_count(), 1);
    }

    #[test]
    fn test_aloha_nobody_ready() {
        let mut hosts = hosts(2, 1, 6);
        let mut dest = DestinationNode::new(MediumProfile::default());
        let mut rng = FixedOutcomes::never();
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = SlottedAloha.resolve_slot(&mut ctx);
        assert_eq!(report, SlotReport::default());
    }

    #[test]
    fn test_cd_success_pays_ack() {
        let mut hosts = hosts(1, 1, 10);
        let mut dest = DestinationNode::new(MediumProfile::lossless());
        let mut rng = RandomOutcomes::from_seed(9);
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = CsmaCd.resolve_slot(&mut ctx);

        assert_eq!(report.delivered, 1);
        assert_eq!(report.extra_slots, 11);
        assert!(!hosts[0].has_frames_to_send());
    }

    #[test]
    fn test_cd_lost_ack_is_collision() {
        let mut hosts = hosts(1, 1, 4);
        let profile = MediumProfile {
            ack_success: 0.0,
            ..MediumProfile::lossless()
        };
        let mut dest = DestinationNode::new(profile);
        let mut rng = RandomOutcomes::from_seed(9);
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = CsmaCd.resolve_slot(&mut ctx);

        assert_eq!(report.lost_acks, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(report.extra_slots, 5);
        assert_eq!(hosts[0].collision_count(), 1);
        assert_eq!(hosts[0].queue_len(), 1);
    }

    #[test]
    fn test_cd_early_abort_charges_partial_airtime() {
        let mut hosts = hosts(1, 1, 10);
        let mut dest = DestinationNode::new(MediumProfile::default());
        let mut rng = FixedOutcomes::always();
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = CsmaCd.resolve_slot(&mut ctx);

        assert_eq!(report.failed_receptions, 1);
        assert_eq!(report.extra_slots, 1);
        assert!(dest.is_collision_detected());
    }

    #[test]
    fn test_ca_sequential_first_host_takes_medium() {
        let mut hosts = hosts(3, 2, 4);
        let mut dest = DestinationNode::new(MediumProfile::lossless());
        let mut rng = RandomOutcomes::from_seed(1);
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = CsmaCa {
            arbitration: CaArbitration::Sequential,
        }
        .resolve_slot(&mut ctx);

        assert_eq!(report.transmitters, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.extra_slots, 5);
        assert_eq!(hosts[0].queue_len(), 1);
        assert_eq!(hosts[1].queue_len(), 2);
        assert_eq!(hosts[2].queue_len(), 2);
        assert_eq!(hosts[1].collision_count(), 0);
    }

    #[test]
    fn test_ca_sequential_every_host_gets_turn_after_reset() {
        let mut hosts = hosts(2, 1, 4);
        let mut dest = DestinationNode::new(MediumProfile::lossless());
        let mut rng = RandomOutcomes::from_seed(1);
        let mut strategy = CsmaCa {
            arbitration: CaArbitration::Sequential,
        };
        for _ in 0..2 {
            let mut ctx = SlotContext {
                hosts: &mut hosts,
                destination: &mut dest,
                rng: &mut rng,
            };
            strategy.resolve_slot(&mut ctx);
            dest.reset_medium_state();
        }
        assert!(hosts.iter().all(|h| !h.has_frames_to_send()));
    }

    #[test]
    fn test_ca_serial_release_serves_every_ready_host() {
        let mut hosts = hosts(3, 1, 4);
        let mut dest = DestinationNode::new(MediumProfile::lossless());
        let mut rng = RandomOutcomes::from_seed(1);
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = CsmaCa {
            arbitration: CaArbitration::SerialRelease,
        }
        .resolve_slot(&mut ctx);

        assert_eq!(report.transmitters, 3);
        assert_eq!(report.delivered, 3);
        assert_eq!(report.extra_slots, 3 * 5);
        assert!(hosts.iter().all(|h| !h.has_frames_to_send()));
        assert!(!dest.is_medium_busy());
    }

    #[test]
    fn test_ca_refused_cts_backs_off() {
        let mut hosts = hosts(1, 1, 4);
        let mut dest = DestinationNode::new(MediumProfile::lossless());
        let mut rng = RandomOutcomes::from_seed(4);
        // another exchange already holds the medium
        dest.receive_csma_ca(&Frame::new(9, 2), &mut rng);
        hosts[0].begin_transmission();
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };
        let mut report = SlotReport::default();

        exchange_with_cts(&mut ctx, 0, &mut report);

        assert_eq!(report.refused_cts, 1);
        assert_eq!(report.extra_slots, 0);
        assert_eq!(report.delivered, 0);
        assert_eq!(hosts[0].collision_count(), 1);
        assert_eq!(hosts[0].queue_len(), 1);
        assert!(!hosts[0].is_transmitting());
    }

    #[test]
    fn test_ca_failed_reception_backs_off_without_ack() {
        let mut hosts = hosts(1, 1, 4);
        let profile = MediumProfile {
            csma_ca_success: 0.0,
            ..MediumProfile::lossless()
        };
        let mut dest = DestinationNode::new(profile);
        let mut rng = RandomOutcomes::from_seed(4);
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = CsmaCa {
            arbitration: CaArbitration::default(),
        }
        .resolve_slot(&mut ctx);

        assert_eq!(report.failed_receptions, 1);
        assert_eq!(report.lost_acks, 0);
        // airtime only, no ACK slot
        assert_eq!(report.extra_slots, 4);
        assert_eq!(hosts[0].queue_len(), 1);
        assert_eq!(hosts[0].collision_count(), 1);
    }

    #[test]
    fn test_ca_joint_contention_collides() {
        let mut hosts = hosts(2, 1, 4);
        let mut dest = DestinationNode::new(MediumProfile::lossless());
        let mut rng = RandomOutcomes::from_seed(1);
        let mut ctx = SlotContext {
            hosts: &mut hosts,
            destination: &mut dest,
            rng: &mut rng,
        };

        let report = CsmaCa {
            arbitration: CaArbitration::JointContention,
        }
        .resolve_slot(&mut ctx);

        assert_eq!(report.transmitters, 2);
        assert_eq!(report.collisions, 1);
        assert_eq!(report.extra_slots, 1);
        assert!(hosts.iter().all(|h| h.collision_count() == 1));
    }

    #[test]
    fn test_strategy_for_matches_protocol() {
        for protocol in Protocol::ALL {
            let strategy = strategy_for(protocol, CaArbitration::default());
            assert_eq!(strategy.protocol(), protocol);
        }
    }

    #[test]
    fn test_protocol_serde_names() {
        let p: Protocol = serde_yaml::from_str("csma_cd").unwrap();
        assert_eq!(p, Protocol::CsmaCd);
        let a: CaArbitration = serde_yaml::from_str("joint_contention").unwrap();
        assert_eq!(a, CaArbitration::JointContention);
        let a: CaArbitration = serde_yaml::from_str("serial_release").unwrap();
        assert_eq!(a, CaArbitration::SerialRelease);
        assert_eq!(CaArbitration::default(), CaArbitration::SerialRelease);
        assert_eq!(Protocol::CsmaCa.to_string(), "CSMA/CA");
    }
}
