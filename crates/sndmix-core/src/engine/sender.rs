//! Producer half of a channel's command ring

use std::sync::Arc;

use super::channel::ChannelAtomics;
use super::command::SoundCommand;
use super::error::QueueFull;

/// Command sender for one channel
///
/// Wraps the lock-free producer for the channel's ring. There is exactly one
/// sender per channel and it is not `Clone`; move it to whichever thread
/// drives that channel. All operations are non-blocking.
pub struct ChannelSender {
    index: usize,
    capacity: usize,
    producer: rtrb::Producer<SoundCommand>,
    atomics: Arc<ChannelAtomics>,
}

impl ChannelSender {
    pub(crate) fn new(
        index: usize,
        capacity: usize,
        producer: rtrb::Producer<SoundCommand>,
        atomics: Arc<ChannelAtomics>,
    ) -> Self {
        Self {
            index,
            capacity,
            producer,
            atomics,
        }
    }

    /// Queue a command (non-blocking)
    ///
    /// Returns `Err(QueueFull(cmd))` with the command handed back when the
    /// ring already holds `capacity - 1` commands. Nothing is queued in that
    /// case.
    pub fn queue_command(&mut self, cmd: SoundCommand) -> Result<(), QueueFull> {
        self.producer.push(cmd).map_err(|e| match e {
            rtrb::PushError::Full(cmd) => {
                log::debug!(
                    "queue_command: channel {} queue full, rejecting {}",
                    self.index,
                    cmd.op().name()
                );
                QueueFull(cmd)
            }
        })
    }

    /// Commands that can still be queued
    pub fn free_slots(&self) -> usize {
        self.producer.slots()
    }

    pub fn is_full(&self) -> bool {
        self.producer.slots() == 0
    }

    /// Nominal ring capacity; at most `capacity - 1` commands are held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Channel index in the mixer
    pub fn index(&self) -> usize {
        self.index
    }

    /// Read and clear trigger flag `index` (one-shot)
    ///
    /// Returns whether the flag had been raised since the last poll. Indices
    /// out of range always read `false`.
    pub fn poll_flag(&self, index: usize) -> bool {
        self.atomics.poll_flag(index)
    }

    /// Observer state published by the audio thread
    pub fn atomics(&self) -> &Arc<ChannelAtomics> {
        &self.atomics
    }

    /// Whether the mixer owning the other half has been dropped
    pub fn is_abandoned(&self) -> bool {
        self.producer.is_abandoned()
    }
}
