use std::collections::VecDeque;
use std::fmt;

use log::{trace, warn};

use crate::frame::Frame;
use crate::random::RandomOutcomeSource;

/// Collisions a single frame may suffer before it is discarded.
pub const MAX_ATTEMPTS: u32 = 16;
/// Backoff exponent ceiling: the window stops growing at 2^10 slots.
pub const MAX_BACKOFF_EXP: u32 = 10;

#[derive(Debug, Hash, Eq, Clone, Copy, PartialEq)]
pub enum HostState {
    Idle,
    Transmitting,
    Backoff,
    /// Queue empty, nothing left to send.
    Drained,
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostState::Idle => write!(f, "Idle"),
            HostState::Transmitting => write!(f, "Transmitting"),
            HostState::Backoff => write!(f, "Backoff"),
            HostState::Drained => write!(f, "Drained"),
        }
    }
}

/// What a collision did to the head frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// Frame kept; the host waits this many slots before retrying.
    Backoff(u32),
    /// Retry ceiling exceeded; the head frame is gone.
    Dropped,
}

#[derive(Debug, Clone)]
pub struct Host {
    id: usize,
    frames: VecDeque<Frame>,
    transmitting: bool,
    collision_count: u32,
    backoff: u32,
    num_success: usize,
    num_dropped: usize,
}

impl Host {
    pub fn new(id: usize) -> Host {
        Host {
            id: id,
            frames: VecDeque::new(),
            transmitting: false,
            collision_count: 0,
            backoff: 0,
            num_success: 0,
            num_dropped: 0,
        }
    }

    /// Host pre-loaded with `count` frames sized uniformly in
    /// `[min_size, max_size]`.
    pub fn with_frames(
        id: usize,
        count: usize,
        min_size: u32,
        max_size: u32,
        rng: &mut dyn RandomOutcomeSource,
    ) -> Host {
        let mut host = Host::new(id);
        host.generate_frames(count, min_size, max_size, rng);
        host
    }

    pub fn generate_frames(
        &mut self,
        count: usize,
        min_size: u32,
        max_size: u32,
        rng: &mut dyn RandomOutcomeSource,
    ) {
        self.frames.reserve(count);
        for _ in 0..count {
            self.frames
                .push_back(Frame::random(self.id, min_size, max_size, rng));
        }
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }

    pub fn get_id(&self) -> usize {
        self.id
    }

    pub fn has_frames_to_send(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.front()
    }

    pub fn queue_len(&self) -> usize {
        self.frames.len()
    }

    pub fn collision_count(&self) -> u32 {
        self.collision_count
    }

    pub fn backoff_slots(&self) -> u32 {
        self.backoff
    }

    pub fn is_transmitting(&self) -> bool {
        self.transmitting
    }

    /// (delivered, dropped)
    pub fn get_stats(&self) -> (usize, usize) {
        (self.num_success, self.num_dropped)
    }

    pub fn state(&self) -> HostState {
        if self.frames.is_empty() {
            HostState::Drained
        } else if self.transmitting {
            HostState::Transmitting
        } else if self.backoff > 0 {
            HostState::Backoff
        } else {
            HostState::Idle
        }
    }

    /// Whether the host may contend in this slot. A host still backing off
    /// burns one backoff slot and answers `false`. Call at most once per
    /// host per slot.
    pub fn can_transmit(&mut self) -> bool {
        if self.backoff > 0 {
            self.backoff -= 1;
            return false;
        }
        true
    }

    /// Shorthand for the readiness test every protocol applies first.
    pub fn is_ready(&mut self) -> bool {
        self.has_frames_to_send() && self.can_transmit()
    }

    pub fn begin_transmission(&mut self) {
        self.transmitting = true;
    }

    /// Dequeues the head frame, marked sent, and clears the retry state.
    pub fn frame_successfully_sent(&mut self) -> Option<Frame> {
        let delivered = self.frames.pop_front().map(|mut frame| {
            frame.mark_sent();
            frame
        });
        if delivered.is_some() {
            self.num_success += 1;
        }
        self.transmitting = false;
        self.collision_count = 0;
        self.backoff = 0;
        delivered
    }

    pub fn handle_collision(&mut self, rng: &mut dyn RandomOutcomeSource) -> CollisionOutcome {
        self.collision_count += 1;
        self.transmitting = false;

        if self.collision_count > MAX_ATTEMPTS {
            //Retry ceiling hit: frame is lost for good, no upper-layer retry.
            self.collision_count = 0;
            if self.frames.pop_front().is_some() {
                self.num_dropped += 1;
                warn!(
                    "host {} dropped a frame after {} attempts, {} left",
                    self.id,
                    MAX_ATTEMPTS + 1,
                    self.frames.len()
                );
            }
            return CollisionOutcome::Dropped;
        }

        let exp = self.collision_count.min(MAX_BACKOFF_EXP);
        self.backoff = rng.uniform_inclusive(1, 1 << exp);
        trace!(
            "host {} collision #{} -> backoff {}",
            self.id,
            self.collision_count,
            self.backoff
        );
        CollisionOutcome::Backoff(self.backoff)
    }
}
