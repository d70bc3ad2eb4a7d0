//! Monotonic millisecond time source.
//!
//! The hot loop never calls `Instant::now()` directly so that tests can drive
//! `playOut` with literal tick values instead of racing the wall clock.

use std::time::Instant;

/// A monotonic millisecond clock.
pub trait Clock: Send + Sync {
    /// Milliseconds since some arbitrary but fixed epoch for this process.
    fn now_ms(&self) -> u32;
}

/// Real wall-clock implementation, anchored at construction time.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }
}

/// Test/playback clock that only advances when told to.
///
/// Grounded in the teacher's `#[tokio::test(start_paused = true)]` pattern of
/// driving time explicitly rather than sleeping in tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: std::sync::atomic::AtomicU32,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: std::sync::atomic::AtomicU32::new(start_ms),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u32) -> u32 {
        self.now.fetch_add(delta_ms, std::sync::atomic::Ordering::SeqCst) + delta_ms
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Rounds `value` to the *nearest* multiple of `tick`, ties rounding away
/// from zero - matching `original_source/sw/include/amp/SequencingBufferStd.h`'s
/// `roundToTick`, which computes `round((float)v / tick) * tick`.
#[must_use]
pub fn round_to_tick(value: i64, tick: u32) -> i64 {
    let tick_f = f64::from(tick);
    ((value as f64 / tick_f).round() as i64) * i64::from(tick)
}

/// Rounds `value` up to the nearest multiple of `tick`.
#[must_use]
pub fn round_up_to_tick(value: i64, tick: u32) -> i64 {
    let tick = i64::from(tick);
    let rem = value.rem_euclid(tick);
    if rem == 0 {
        value
    } else {
        value + (tick - rem)
    }
}

/// Promotes a 16-bit mini-frame timestamp to a full 32-bit one by choosing the
/// half-window of `local` nearest `remote16`.
///
/// Grounded in `original_source/sw/include/amp/SequencingBufferStd.h`'s
/// `extendTime` helper.
#[must_use]
pub fn extend_time(remote16: u16, local: u32) -> u32 {
    let base = local & !0xFFFF;
    let candidate = base | u32::from(remote16);

    let half = 0x8000i64;
    let diff = i64::from(candidate) - i64::from(local);
    if diff > half {
        candidate.wrapping_sub(0x1_0000)
    } else if diff < -half {
        candidate.wrapping_add(0x1_0000)
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_tick_rounds_to_nearest() {
        assert_eq!(round_to_tick(45, 20), 40);
        assert_eq!(round_to_tick(40, 20), 40);
        assert_eq!(round_to_tick(51, 20), 60);
        // Exact ties round away from zero, matching C's round().
        assert_eq!(round_to_tick(50, 20), 60);
        assert_eq!(round_to_tick(-50, 20), -60);
        assert_eq!(round_to_tick(-5, 20), 0);
    }

    #[test]
    fn round_up_to_tick_ceils() {
        assert_eq!(round_up_to_tick(41, 20), 60);
        assert_eq!(round_up_to_tick(40, 20), 40);
    }

    #[test]
    fn extend_time_recovers_nearby_values() {
        let local = 100_000u32;
        let remote_full = 100_040u32;
        let remote16 = (remote_full & 0xFFFF) as u16;
        assert_eq!(extend_time(remote16, local), remote_full);
    }

    #[test]
    fn extend_time_handles_wraparound_backward() {
        let local = 0x0001_0010u32;
        let remote_full = 0x0000_FFE0u32;
        let remote16 = (remote_full & 0xFFFF) as u16;
        assert_eq!(extend_time(remote16, local), remote_full);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(0);
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.advance(20), 20);
        assert_eq!(clock.now_ms(), 20);
    }
}
