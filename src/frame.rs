use crate::random::RandomOutcomeSource;

/// A queued unit of data. `size` is measured in time slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    size: u32,
    sender_id: usize,
    sent: bool,
}

impl Frame {
    pub fn new(sender_id: usize, size: u32) -> Frame {
        Frame {
            size: size,
            sender_id: sender_id,
            sent: false,
        }
    }

    /// Frame with a size drawn uniformly from `[min_size, max_size]`.
    pub fn random(
        sender_id: usize,
        min_size: u32,
        max_size: u32,
        rng: &mut dyn RandomOutcomeSource,
    ) -> Frame {
        Frame::new(sender_id, rng.uniform_inclusive(min_size, max_size))
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sender_id(&self) -> usize {
        self.sender_id
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub(crate) fn mark_sent(&mut self) {
        self.sent = true;
    }
}
