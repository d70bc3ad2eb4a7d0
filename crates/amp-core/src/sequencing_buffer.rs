//! The adaptive jitter (sequencing) buffer — spec §4.1, the hard core.
//!
//! Implements the **latest** algorithm variant per SPEC_FULL.md §9 Design
//! Notes: Ramjee Algorithm 1 delay/variance estimation with per-talkspurt
//! cursor adjustment toward an ideal delay and mid-talkspurt slow-down, not
//! the earlier fixed-`delay` variant found in the stale
//! `original_source/sw/include/amp/SequencingBufferStd.h` on disk. Naming
//! (`extendTime`, `roundToTick`) and the sorted-slot storage idiom are kept
//! from that file; the delay-adaptation math is not.

use crate::clock::round_to_tick;
use crate::message::{AudioFrame, Signal};
use crate::sorted_list::SortedFixedList;

/// Fixed audio tick period (spec-wide constant).
pub const TICK_MS: u32 = 20;

/// Maximum number of outstanding slots (spec §3 invariant).
pub const CAPACITY: usize = 64;

const ALPHA: f64 = 0.998002;
const BETA: f64 = 5.0;
const MID_TS_ADJUST_MAX_MS: u32 = 40;
const DEFAULT_TALKSPURT_TIMEOUT_MS: u32 = 60;

#[derive(Debug, Clone)]
enum SlotPayload {
    Voice(AudioFrame),
    Signal(Signal),
}

#[derive(Debug, Clone)]
struct Slot {
    remote_time_ms: u32,
    local_time_ms: u32,
    payload: SlotPayload,
}

/// Receives playback callbacks from [`SequencingBuffer::play_out`].
///
/// Grounded stylistically in the teacher's `cadence.rs` silence-filling /
/// gap-tracking sink pattern, generalized to the spec's three outcomes.
pub trait PlayoutSink {
    fn play_voice(&mut self, frame: &AudioFrame, local_time_ms: u32);
    fn play_signal(&mut self, signal: Signal, local_time_ms: u32);
    fn interpolate_voice(&mut self, local_time_ms: u32, duration_ms: u32);
}

/// Per-talkspurt margin bookkeeping (diagnostics only, no behavioral effect).
#[derive(Debug, Default, Clone, Copy)]
struct TalkspurtStats {
    frame_count: u32,
    worst_margin_ms: i64,
    total_margin_ms: i64,
}

/// Diagnostic counters exposed for the status snapshot (spec §4.10).
#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct SequencingStats {
    pub voice_consumed_count: u64,
    pub voice_playout_count: u64,
    pub late_voice_frame_count: u64,
    pub interpolated_voice_frame_count: u64,
    pub overflow_count: u64,
    pub talk_spurt_count: u64,
    pub max_buffer_depth: u32,
}

/// Per-call adaptive jitter buffer (spec §4.1).
pub struct SequencingBuffer {
    slots: SortedFixedList<Slot>,

    initial_margin_ms: u32,
    talkspurt_timeout_ms: u32,
    delay_locked: bool,

    // Ramjee Algorithm 1 estimator state.
    d_i: f64,
    v_i: f64,

    origin_cursor: i64,
    last_played_origin: u32,
    last_played_local: u32,
    in_talkspurt: bool,
    talkspurt_frame_count: u32,
    talkspurt_first_origin: u32,
    current_talkspurt: TalkspurtStats,

    stats: SequencingStats,
}

impl SequencingBuffer {
    #[must_use]
    pub fn new() -> Self {
        let mut buffer = Self {
            slots: SortedFixedList::new(CAPACITY),
            initial_margin_ms: 0,
            talkspurt_timeout_ms: DEFAULT_TALKSPURT_TIMEOUT_MS,
            delay_locked: false,
            d_i: 0.0,
            v_i: 0.0,
            origin_cursor: 0,
            last_played_origin: 0,
            last_played_local: 0,
            in_talkspurt: false,
            talkspurt_frame_count: 0,
            talkspurt_first_origin: 0,
            current_talkspurt: TalkspurtStats::default(),
            stats: SequencingStats::default(),
        };
        buffer.reset();
        buffer
    }

    /// Clears buffer contents and all statistics; ideal-delay estimators zeroed.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.d_i = 0.0;
        self.v_i = 0.0;
        self.origin_cursor = 0;
        self.last_played_origin = 0;
        self.last_played_local = 0;
        self.in_talkspurt = false;
        self.talkspurt_frame_count = 0;
        self.talkspurt_first_origin = 0;
        self.current_talkspurt = TalkspurtStats::default();
        self.stats = SequencingStats::default();
    }

    pub fn set_initial_margin(&mut self, ms: u32) {
        self.initial_margin_ms = ms;
        self.d_i = f64::from(ms);
        self.v_i = 0.0;
    }

    pub fn set_talkspurt_timeout(&mut self, ms: u32) {
        self.talkspurt_timeout_ms = ms;
    }

    pub fn lock_delay(&mut self) {
        self.delay_locked = true;
    }

    pub fn unlock_delay(&mut self) {
        self.delay_locked = false;
    }

    #[must_use]
    pub fn in_talkspurt(&self) -> bool {
        self.in_talkspurt
    }

    #[must_use]
    pub fn stats(&self) -> SequencingStats {
        self.stats
    }

    fn update_delay_estimator(&mut self, n_i: f64) {
        if self.delay_locked {
            return;
        }
        if self.stats.voice_consumed_count == 0 {
            self.d_i = n_i;
            self.v_i = 0.0;
        } else {
            let prev_d = self.d_i;
            self.d_i = ALPHA * prev_d + (1.0 - ALPHA) * n_i;
            self.v_i = ALPHA * self.v_i + (1.0 - ALPHA) * (prev_d - n_i).abs();
        }
    }

    fn ideal_delay(&self) -> f64 {
        self.d_i + BETA * self.v_i
    }

    /// Inserts a signal slot; returns `false` on overflow.
    pub fn consume_signal(&mut self, signal: Signal, remote_time_ms: u32, local_time_ms: u32) -> bool {
        self.slots.insert(
            remote_time_ms,
            Slot {
                remote_time_ms,
                local_time_ms,
                payload: SlotPayload::Signal(signal),
            },
        ) || {
            self.stats.overflow_count += 1;
            false
        }
    }

    /// Inserts a voice slot and updates the delay estimator; returns `false`
    /// on overflow (no insertion).
    pub fn consume_voice(&mut self, frame: AudioFrame, remote_time_ms: u32, local_time_ms: u32) -> bool {
        let n_i = f64::from(local_time_ms) - f64::from(remote_time_ms);
        let inserted = self.slots.insert(
            remote_time_ms,
            Slot {
                remote_time_ms,
                local_time_ms,
                payload: SlotPayload::Voice(frame),
            },
        );
        if !inserted {
            self.stats.overflow_count += 1;
            return false;
        }
        self.update_delay_estimator(n_i);
        self.stats.voice_consumed_count += 1;
        true
    }

    /// MUST be called exactly once per 20 ms tick with monotonically
    /// increasing `local_time_ms`.
    pub fn play_out(&mut self, local_time_ms: u32, sink: &mut dyn PlayoutSink) {
        self.stats.max_buffer_depth = self.stats.max_buffer_depth.max(self.slots.len() as u32);

        let mut voice_played = false;

        loop {
            let Some((remote_time, _)) = self.slots.peek_front() else {
                break;
            };

            let is_signal = matches!(
                self.slots.peek_front().unwrap().1.payload,
                SlotPayload::Signal(_)
            );
            if is_signal {
                let (_, slot) = self.slots.pop_front().unwrap();
                if let SlotPayload::Signal(signal) = slot.payload {
                    sink.play_signal(signal, local_time_ms);
                }
                continue;
            }

            if remote_time <= self.last_played_origin && self.stats.voice_playout_count > 0 {
                self.slots.pop_front();
                self.stats.late_voice_frame_count += 1;
                continue;
            }

            if !self.in_talkspurt {
                if self.stats.voice_playout_count == 0 {
                    self.origin_cursor =
                        round_to_tick(i64::from(remote_time) - i64::from(self.initial_margin_ms), TICK_MS);
                } else {
                    let ideal_origin_cursor = round_to_tick(
                        i64::from(local_time_ms) - self.ideal_delay() as i64,
                        TICK_MS,
                    );
                    if ideal_origin_cursor < self.origin_cursor {
                        self.origin_cursor =
                            ideal_origin_cursor.max(i64::from(self.last_played_origin));
                    } else if ideal_origin_cursor > self.origin_cursor {
                        self.origin_cursor = ideal_origin_cursor.min(i64::from(remote_time));
                    }
                }
                self.in_talkspurt = true;
                self.talkspurt_frame_count = 0;
                self.talkspurt_first_origin = remote_time;
                self.last_played_origin = 0;
                self.last_played_local = 0;
                self.current_talkspurt = TalkspurtStats::default();
            }

            if i64::from(remote_time) < self.origin_cursor {
                let lag = self.origin_cursor - i64::from(remote_time);
                if lag <= i64::from(MID_TS_ADJUST_MAX_MS) {
                    self.origin_cursor = i64::from(remote_time);
                    continue;
                }
                self.slots.pop_front();
                self.stats.late_voice_frame_count += 1;
                continue;
            }

            if i64::from(remote_time) == self.origin_cursor {
                let (_, slot) = self.slots.pop_front().unwrap();
                if let SlotPayload::Voice(frame) = slot.payload {
                    sink.play_voice(&frame, local_time_ms);
                }
                voice_played = true;
                self.last_played_local = local_time_ms;
                self.last_played_origin = remote_time;
                self.stats.voice_playout_count += 1;

                let margin = i64::from(local_time_ms) - i64::from(remote_time);
                self.current_talkspurt.frame_count += 1;
                self.current_talkspurt.total_margin_ms += margin;
                self.current_talkspurt.worst_margin_ms =
                    self.current_talkspurt.worst_margin_ms.max(margin);
                self.talkspurt_frame_count += 1;
                break;
            }

            // remote_time > origin_cursor: future frame, not due yet.
            break;
        }

        if self.in_talkspurt && self.talkspurt_frame_count > 0 {
            if !voice_played {
                sink.interpolate_voice(local_time_ms, TICK_MS);
                self.stats.interpolated_voice_frame_count += 1;
            }
            if local_time_ms > self.last_played_local + self.talkspurt_timeout_ms {
                self.in_talkspurt = false;
                self.stats.talk_spurt_count += 1;
            }
        }

        self.origin_cursor += i64::from(TICK_MS);
    }
}

impl Default for SequencingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SampleRate;

    struct RecordingSink {
        voices: Vec<u32>,
        interpolations: Vec<u32>,
        lates: Vec<u32>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                voices: Vec::new(),
                interpolations: Vec::new(),
                lates: Vec::new(),
            }
        }
    }

    impl PlayoutSink for RecordingSink {
        fn play_voice(&mut self, _frame: &AudioFrame, local_time_ms: u32) {
            self.voices.push(local_time_ms);
        }
        fn play_signal(&mut self, _signal: Signal, local_time_ms: u32) {
            self.lates.push(local_time_ms);
        }
        fn interpolate_voice(&mut self, local_time_ms: u32, _duration_ms: u32) {
            self.interpolations.push(local_time_ms);
        }
    }

    fn voice_frame() -> AudioFrame {
        AudioFrame::silence(SampleRate::R8000)
    }

    #[test]
    fn perfect_stream_plays_every_frame() {
        let mut buf = SequencingBuffer::new();
        buf.set_initial_margin(60);
        let mut sink = RecordingSink::new();

        for i in 0..10u32 {
            let remote = i * TICK_MS;
            let local = 100 + i * TICK_MS;
            buf.consume_voice(voice_frame(), remote, local);
        }

        for i in 0..10u32 {
            let local = 100 + i * TICK_MS;
            buf.play_out(local, &mut sink);
        }

        assert_eq!(sink.voices.len(), 10);
        assert_eq!(buf.stats().interpolated_voice_frame_count, 0);
        assert_eq!(buf.stats().late_voice_frame_count, 0);
    }

    #[test]
    fn loss_triggers_single_interpolation() {
        let mut buf = SequencingBuffer::new();
        buf.set_initial_margin(60);
        let mut sink = RecordingSink::new();

        // remoteTime=60 never arrives.
        for &remote in &[0u32, 20, 40, 80, 100] {
            let local = 100 + remote;
            buf.consume_voice(voice_frame(), remote, local);
        }

        for local in (100..=280).step_by(20) {
            buf.play_out(local, &mut sink);
        }

        assert_eq!(buf.stats().interpolated_voice_frame_count, 1);
    }

    #[test]
    fn overflow_counts_and_rejects_65th_frame() {
        let mut buf = SequencingBuffer::new();
        for i in 0..64u32 {
            assert!(buf.consume_voice(voice_frame(), i * TICK_MS, 1000));
        }
        assert!(!buf.consume_voice(voice_frame(), 64 * TICK_MS, 1000));
        assert_eq!(buf.stats().overflow_count, 1);
    }

    #[test]
    fn dead_late_frame_is_discarded_without_playback() {
        let mut buf = SequencingBuffer::new();
        buf.set_initial_margin(60);
        let mut sink = RecordingSink::new();

        // Establish a talkspurt well past time zero.
        buf.consume_voice(voice_frame(), 1000, 1060);
        buf.play_out(1060, &mut sink);

        // A badly late frame for remoteTime=0 shows up long after.
        buf.consume_voice(voice_frame(), 0, 5000);
        let before = buf.stats().late_voice_frame_count;
        buf.play_out(5000, &mut sink);
        assert!(buf.stats().late_voice_frame_count > before);
    }
}
