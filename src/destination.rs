//! The shared medium as seen by the single receiver.
//!
//! Success rates are fixed design constants carried in a [`MediumProfile`];
//! they are not derived from channel physics. Every reception method
//! returns a [`Reception`] describing what happened, and the busy/collision
//! flags only live until [`DestinationNode::reset_medium_state`] closes
//! the slot.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::frame::Frame;
use crate::protocol::Protocol;
use crate::random::RandomOutcomeSource;

/// Probability and timing constants of the medium model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediumProfile {
    pub aloha_success: f64,
    pub csma_cd_success: f64,
    /// Chance of detecting a collision during each slot-unit of a frame.
    pub csma_cd_unit_collision: f64,
    pub csma_ca_success: f64,
    pub ack_success: f64,
    /// Slotted ALOHA: chance a ready host actually transmits in a slot.
    pub transmission_probability: f64,
    pub ack_slots: u64,
    pub collision_detect_slots: u64,
}

impl Default for MediumProfile {
    fn default() -> Self {
        MediumProfile {
            aloha_success: 0.95,
            csma_cd_success: 0.99,
            csma_cd_unit_collision: 0.05,
            csma_ca_success: 0.98,
            ack_success: 0.99,
            transmission_probability: 0.3,
            ack_slots: 1,
            collision_detect_slots: 1,
        }
    }
}

impl MediumProfile {
    /// A medium on which nothing ever goes wrong. ALOHA hosts always
    /// transmit when ready.
    pub fn lossless() -> Self {
        MediumProfile {
            aloha_success: 1.0,
            csma_cd_success: 1.0,
            csma_cd_unit_collision: 0.0,
            csma_ca_success: 1.0,
            ack_success: 1.0,
            transmission_probability: 1.0,
            ..MediumProfile::default()
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        let checks = [
            ("aloha_success", self.aloha_success),
            ("csma_cd_success", self.csma_cd_success),
            ("csma_cd_unit_collision", self.csma_cd_unit_collision),
            ("csma_ca_success", self.csma_ca_success),
            ("ack_success", self.ack_success),
            ("transmission_probability", self.transmission_probability),
        ];
        for (name, value) in checks {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::InvalidProbability { name, value });
            }
        }
        //ALOHA hosts that never transmit would keep the run going forever.
        if self.transmission_probability <= 0.0 {
            return Err(SimError::InvalidProbability {
                name: "transmission_probability",
                value: self.transmission_probability,
            });
        }
        Ok(())
    }
}

/// Result of one reception attempt at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reception {
    Delivered,
    /// The frame went out but the success draw failed.
    Corrupted,
    /// Medium was already taken when the attempt started.
    MediumBusy,
    /// CSMA/CD noticed a collision mid-frame and aborted after
    /// `after_units` slot-units on the wire.
    CollisionDetected { after_units: u32 },
}

impl Reception {
    pub fn is_delivered(self) -> bool {
        self == Reception::Delivered
    }

    /// Slots the attempt occupied the medium for.
    pub fn airtime(self, frame: &Frame) -> u64 {
        match self {
            Reception::CollisionDetected { after_units } => after_units as u64,
            _ => frame.size() as u64,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DestinationNode {
    profile: MediumProfile,
    medium_busy: bool,
    collision_detected: bool,
}

impl DestinationNode {
    pub fn new(profile: MediumProfile) -> DestinationNode {
        DestinationNode {
            profile: profile,
            medium_busy: false,
            collision_detected: false,
        }
    }

    pub fn profile(&self) -> &MediumProfile {
        &self.profile
    }

    pub fn is_medium_busy(&self) -> bool {
        self.medium_busy
    }

    pub fn is_collision_detected(&self) -> bool {
        self.collision_detected
    }

    pub fn receive_frame(
        &mut self,
        frame: &Frame,
        protocol: Protocol,
        rng: &mut dyn RandomOutcomeSource,
    ) -> Reception {
        match protocol {
            Protocol::SlottedAloha => self.receive_slotted_aloha(frame, rng),
            Protocol::CsmaCd => self.receive_csma_cd(frame, rng),
            Protocol::CsmaCa => self.receive_csma_ca(frame, rng),
        }
    }

    pub fn receive_slotted_aloha(
        &mut self,
        _frame: &Frame,
        rng: &mut dyn RandomOutcomeSource,
    ) -> Reception {
        if self.medium_busy {
            self.collision_detected = true;
            return Reception::MediumBusy;
        }
        self.medium_busy = true;
        if rng.chance(self.profile.aloha_success) {
            Reception::Delivered
        } else {
            Reception::Corrupted
        }
    }

    pub fn receive_csma_cd(
        &mut self,
        frame: &Frame,
        rng: &mut dyn RandomOutcomeSource,
    ) -> Reception {
        if self.medium_busy {
            self.collision_detected = true;
            return Reception::MediumBusy;
        }
        self.medium_busy = true;

        //Carrier is monitored for the whole frame, one check per slot-unit.
        for unit in 1..=frame.size() {
            if rng.chance(self.profile.csma_cd_unit_collision) {
                self.collision_detected = true;
                return Reception::CollisionDetected { after_units: unit };
            }
        }

        if rng.chance(self.profile.csma_cd_success) {
            Reception::Delivered
        } else {
            Reception::Corrupted
        }
    }

    pub fn receive_csma_ca(
        &mut self,
        _frame: &Frame,
        rng: &mut dyn RandomOutcomeSource,
    ) -> Reception {
        if self.medium_busy {
            return Reception::MediumBusy;
        }
        self.medium_busy = true;
        if rng.chance(self.profile.csma_ca_success) {
            Reception::Delivered
        } else {
            Reception::Corrupted
        }
    }

    /// Clear-to-send gate for CSMA/CA. Does not occupy the medium.
    pub fn send_cts(&self) -> bool {
        !self.medium_busy
    }

    /// Acknowledgment may be lost regardless of the medium state.
    pub fn send_ack(&self, rng: &mut dyn RandomOutcomeSource) -> bool {
        rng.chance(self.profile.ack_success)
    }

    /// Frees the medium without closing the slot.
    pub fn release_medium(&mut self) {
        self.medium_busy = false;
    }

    pub fn reset_medium_state(&mut self) {
        self.medium_busy = false;
        self.collision_detected = false;
    }
}
