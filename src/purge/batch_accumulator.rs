use serenity::model::id::{ChannelId, MessageId};

use crate::adapters::MAX_BULK_DELETE;

/// Pending message IDs of one channel awaiting a bulk delete
///
/// IDs are returned in the order they were added. An ID is held at most once.
#[derive(Debug)]
pub struct BatchAccumulator {
    channel_id: ChannelId,
    threshold: usize,
    pending: Vec<MessageId>,
}

impl BatchAccumulator {
    /// Create an empty accumulator
    ///
    /// `threshold` is clamped to `1..=MAX_BULK_DELETE`.
    pub fn new(channel_id: ChannelId, threshold: usize) -> Self {
        let threshold = threshold.clamp(1, MAX_BULK_DELETE);
        Self {
            channel_id,
            threshold,
            pending: Vec::with_capacity(threshold),
        }
    }

    /// Queue a message ID
    ///
    /// Returns `false` if the ID is already pending.
    pub fn add(&mut self, message_id: MessageId) -> bool {
        if self.pending.contains(&message_id) {
            return false;
        }
        self.pending.push(message_id);
        true
    }

    /// True once the pending batch reaches the threshold
    pub fn should_flush(&self) -> bool {
        self.pending.len() >= self.threshold
    }

    /// Remove and return every pending ID
    pub fn drain(&mut self) -> Vec<MessageId> {
        std::mem::take(&mut self.pending)
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
