//! SoundChannel - one voice plus its command queue
//!
//! The channel owns the consumer half of its command ring and the state of
//! the single active voice. Everything here runs on the audio thread: no
//! allocation, no locks, no logging.
//!
//! # Command promotion
//!
//! Before producing samples the channel scans the ring for `ClearQueue`
//! barriers, then promotes front commands whose delay has run out. A delay
//! starts counting only once its command reaches the front, so delays are
//! relative to the previous command's activation.
//!
//! # Resampling
//!
//! Rate conversion is a DDA over integers. Per output frame the phase
//! accumulator advances by `pitch * source_rate`; every time it crosses
//! `output_rate * 256` the channel steps one source frame. Between steps the
//! output is linearly interpolated from the current and next source frame by
//! `phase / threshold`. At phase 0 the current frame is copied untouched, which
//! makes unity rate at matching sample rates bit-exact.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use basedrop::Shared;

use super::command::{SoundCommand, SoundOp};
use super::sender::ChannelSender;
use crate::fixed::{PanMatrix, Pitch, DELAY_ERROR_ONE};
use crate::source::{SoundBuffer, StreamHandle};
use crate::types::{MixFrame, StereoFrame, NUM_FLAGS};

/// `pending_delay` value when no countdown is running
pub const NO_PENDING_DELAY: u32 = u32::MAX;

/// Lock-free channel state for observers
///
/// The audio thread publishes position and playback state with relaxed
/// stores at the end of every mix pass; they are for display, not
/// synchronisation. Trigger flags are raised with release ordering and
/// cleared by the observer with an atomic swap, so each raise is seen once.
pub struct ChannelAtomics {
    flags: [AtomicBool; NUM_FLAGS],
    /// Next source frame of the active voice
    pub position: AtomicU64,
    /// Whether a voice is active
    pub playing: AtomicBool,
    /// Frames left before the front command activates ([`NO_PENDING_DELAY`] if none)
    pub pending_delay: AtomicU32,
}

impl ChannelAtomics {
    pub fn new() -> Self {
        Self {
            flags: std::array::from_fn(|_| AtomicBool::new(false)),
            position: AtomicU64::new(0),
            playing: AtomicBool::new(false),
            pending_delay: AtomicU32::new(NO_PENDING_DELAY),
        }
    }

    /// Read and clear a trigger flag
    #[inline]
    pub fn poll_flag(&self, index: usize) -> bool {
        self.flags
            .get(index)
            .map(|flag| flag.swap(false, Ordering::AcqRel))
            .unwrap_or(false)
    }

    /// Read a trigger flag without clearing it
    #[inline]
    pub fn peek_flag(&self, index: usize) -> bool {
        self.flags
            .get(index)
            .map(|flag| flag.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// OR a command's flags into the channel (never clears)
    #[inline]
    fn raise(&self, flags: &[bool; NUM_FLAGS]) {
        for (flag, &set) in self.flags.iter().zip(flags) {
            if set {
                flag.store(true, Ordering::Release);
            }
        }
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn pending_delay(&self) -> Option<u32> {
        match self.pending_delay.load(Ordering::Relaxed) {
            NO_PENDING_DELAY => None,
            frames => Some(frames),
        }
    }
}

impl Default for ChannelAtomics {
    fn default() -> Self {
        Self::new()
    }
}

/// The source currently being read
enum Voice {
    Silent,
    Buffer(Shared<SoundBuffer>),
    Stream(StreamHandle),
}

/// One mixer channel
pub struct SoundChannel {
    index: usize,
    queue: rtrb::Consumer<SoundCommand>,
    atomics: Arc<ChannelAtomics>,
    output_rate: u32,

    // Active voice
    voice: Voice,
    /// Next source frame to pull
    position: u32,
    loop_left: u32,
    loop_right: u32,
    repeats_remaining: i32,
    source_rate: u32,
    rate: Pitch,
    pan: PanMatrix,
    /// DDA accumulator, always below `output_rate * 256` between frames
    phase: u64,
    current: StereoFrame,
    /// `None` once the source has no frame after `current`
    following: Option<StereoFrame>,

    // Scheduling
    /// Frames until the front command activates
    delay_countdown: Option<u32>,
    /// Sub-frame delay remainder carried between commands (Q0.15)
    delay_carry: u32,
}

impl SoundChannel {
    /// Create a channel and its sender
    ///
    /// `capacity` is the nominal ring size; the ring holds `capacity - 1`
    /// commands. Callers validate it (power of two, at least 2).
    pub(crate) fn create(index: usize, output_rate: u32, capacity: usize) -> (SoundChannel, ChannelSender) {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity.saturating_sub(1).max(1));
        let atomics = Arc::new(ChannelAtomics::new());
        let channel = SoundChannel {
            index,
            queue: consumer,
            atomics: Arc::clone(&atomics),
            output_rate,
            voice: Voice::Silent,
            position: 0,
            loop_left: 0,
            loop_right: 0,
            repeats_remaining: 0,
            source_rate: output_rate,
            rate: Pitch::UNITY,
            pan: PanMatrix::IDENTITY,
            phase: 0,
            current: StereoFrame::silence(),
            following: None,
            delay_countdown: None,
            delay_carry: 0,
        };
        (channel, ChannelSender::new(index, capacity, producer, atomics))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_playing(&self) -> bool {
        !matches!(self.voice, Voice::Silent)
    }

    /// Commands waiting in the ring
    pub fn pending_commands(&self) -> usize {
        self.queue.slots()
    }

    pub fn atomics(&self) -> &Arc<ChannelAtomics> {
        &self.atomics
    }

    /// Add this channel's output for `out.len()` frames into `out`
    ///
    /// Mixing is additive; the caller zeroes `out` once per block. Each pass
    /// of the loop below either mixes at least one frame or returns, so the
    /// number of passes is bounded by the block length.
    pub fn mix_out(&mut self, out: &mut [MixFrame]) {
        let mut offset = 0;
        loop {
            self.handle_next_command();

            let remaining = out.len() - offset;
            if remaining == 0 {
                break;
            }

            // Never mix past the point where the front command activates
            let run = match self.delay_countdown {
                Some(countdown) => remaining.min(countdown as usize),
                None => remaining,
            };
            if run == 0 {
                break;
            }

            let mixed = if self.is_playing() {
                self.render(&mut out[offset..offset + run])
            } else if self.delay_countdown.is_some() {
                run
            } else {
                break;
            };

            if let Some(countdown) = &mut self.delay_countdown {
                *countdown -= mixed as u32;
            }
            offset += mixed;
        }
        self.publish();
    }

    /// Consume `ClearQueue` barriers and promote every front command whose
    /// delay has elapsed
    pub(crate) fn handle_next_command(&mut self) {
        self.apply_clear_barrier();

        // Only commands visible now; later pushes wait for the next call
        let mut budget = self.queue.slots();
        while budget > 0 {
            let delay = match self.queue.peek() {
                Ok(front) => front.delay,
                Err(_) => return,
            };

            if self.delay_countdown.is_none() && !delay.is_zero() {
                let mut countdown = delay.whole_frames();
                self.delay_carry += delay.error() as u32;
                while self.delay_carry >= DELAY_ERROR_ONE {
                    countdown = countdown.saturating_add(1);
                    self.delay_carry -= DELAY_ERROR_ONE;
                }
                self.delay_countdown = Some(countdown);
            }

            if matches!(self.delay_countdown, Some(countdown) if countdown > 0) {
                return;
            }

            let Ok(cmd) = self.queue.pop() else {
                return;
            };
            self.delay_countdown = None;
            self.apply(cmd);
            budget -= 1;
        }
    }

    /// Drop everything up to and including the last queued `ClearQueue`
    fn apply_clear_barrier(&mut self) {
        let pending = self.queue.slots();
        if pending == 0 {
            return;
        }
        let Ok(chunk) = self.queue.read_chunk(pending) else {
            return;
        };

        let (first, second) = chunk.as_slices();
        let last_clear = first
            .iter()
            .chain(second)
            .enumerate()
            .filter(|(_, cmd)| cmd.op.is_clear_queue())
            .map(|(i, _)| i)
            .last();

        // An uncommitted chunk leaves the ring untouched
        if let Some(index) = last_clear {
            chunk.commit(index + 1);
            self.delay_countdown = None;
        }
    }

    /// Make `cmd` the active command
    fn apply(&mut self, cmd: SoundCommand) {
        let SoundCommand {
            op,
            pan,
            rate,
            repeats,
            loop_left,
            loop_right,
            flags,
            ..
        } = cmd;

        if let Some(pan) = pan {
            self.pan = pan;
        }
        if let Some(rate) = rate {
            self.rate = rate;
        }
        self.atomics.raise(&flags);

        match op {
            SoundOp::Nop | SoundOp::ClearQueue => {}
            SoundOp::Stop => self.silence(),
            SoundOp::PlayMono(buffer) | SoundOp::PlayStereo(buffer) => {
                let frames = buffer.frames();
                self.loop_right = if loop_right == 0 || loop_right > frames {
                    frames
                } else {
                    loop_right
                };
                self.loop_left = loop_left.min(self.loop_right);
                self.repeats_remaining = repeats;
                self.source_rate = buffer.sample_rate();
                self.voice = Voice::Buffer(buffer);
                self.restart();
            }
            SoundOp::PlayStream(stream) => {
                self.loop_left = 0;
                self.loop_right = 0;
                self.repeats_remaining = 0;
                self.source_rate = stream.frame_rate();
                self.voice = Voice::Stream(stream);
                self.restart();
            }
        }
    }

    /// Start the voice from frame 0 with a fresh phase
    fn restart(&mut self) {
        self.position = 0;
        self.phase = 0;
        match self.pull() {
            Some(frame) => {
                self.current = frame;
                self.following = self.pull();
            }
            None => self.silence(),
        }
    }

    /// Release the source; the drop is deferred to the collector thread
    fn silence(&mut self) {
        self.voice = Voice::Silent;
        self.phase = 0;
        self.current = StereoFrame::silence();
        self.following = None;
    }

    /// Next source frame, wrapping at the loop end while repeats remain
    fn pull(&mut self) -> Option<StereoFrame> {
        match &mut self.voice {
            Voice::Silent => None,
            Voice::Buffer(buffer) => {
                if self.position >= self.loop_right {
                    let span = self.loop_right.saturating_sub(self.loop_left);
                    if self.repeats_remaining == 0 || span == 0 {
                        return None;
                    }
                    if self.repeats_remaining > 0 {
                        self.repeats_remaining -= 1;
                    }
                    self.position -= span;
                }
                let frame = buffer.frame(self.position);
                self.position += 1;
                Some(frame)
            }
            Voice::Stream(stream) => {
                let mut scratch = [StereoFrame::silence()];
                if stream.mix(&mut scratch) == 0 {
                    return None;
                }
                self.position = self.position.saturating_add(1);
                Some(scratch[0])
            }
        }
    }

    /// Resample, pan and accumulate up to `out.len()` frames
    ///
    /// Returns the frames produced; fewer than requested means the voice
    /// ended inside this run.
    fn render(&mut self, out: &mut [MixFrame]) -> usize {
        let threshold = self.output_rate as u64 * Pitch::UNITY.raw() as u64;
        let step = self.rate.raw() as u64 * self.source_rate as u64;

        for (mixed, slot) in out.iter_mut().enumerate() {
            if !self.is_playing() {
                return mixed;
            }

            let frame = match self.following {
                Some(next) if self.phase != 0 => lerp(self.current, next, self.phase, threshold),
                _ => self.current,
            };
            let (left, right) = self.pan.apply(frame);
            slot.accumulate(left, right);

            self.phase += step;
            while self.phase >= threshold {
                self.phase -= threshold;
                match self.following.take() {
                    Some(next) => {
                        self.current = next;
                        self.following = self.pull();
                    }
                    None => {
                        self.silence();
                        break;
                    }
                }
            }
        }
        out.len()
    }

    fn publish(&self) {
        self.atomics
            .position
            .store(self.position as u64, Ordering::Relaxed);
        self.atomics.playing.store(self.is_playing(), Ordering::Relaxed);
        self.atomics.pending_delay.store(
            self.delay_countdown.unwrap_or(NO_PENDING_DELAY),
            Ordering::Relaxed,
        );
    }
}

/// Linear interpolation `a + (b - a) * phase / threshold`, truncated toward zero
#[inline]
fn lerp(a: StereoFrame, b: StereoFrame, phase: u64, threshold: u64) -> StereoFrame {
    let t = phase as i64;
    let d = threshold as i64;
    let mix = |x: i16, y: i16| (x as i64 + (y as i64 - x as i64) * t / d) as i16;
    StereoFrame::new(mix(a.left, b.left), mix(a.right, b.right))
}
