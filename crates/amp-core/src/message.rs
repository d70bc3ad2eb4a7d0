//! The tagged-union wire/routing types shared by every component above L1.
//!
//! Grounded in spec §3; block sizes are taken from
//! `original_source/sw/include/amp/Resampler.h`'s `BLOCK_SIZE_{8K,16K,48K}`
//! constants.

use serde::{Deserialize, Serialize};

/// Reserved `destAddress` meaning "all broadcast subscribers".
pub const BROADCAST: u32 = u32::MAX;

/// Supported PCM sample rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRate {
    R8000,
    R16000,
    R48000,
}

impl SampleRate {
    /// Number of PCM16 samples in a 20 ms block at this rate.
    #[must_use]
    pub const fn block_size(self) -> usize {
        match self {
            SampleRate::R8000 => 160,
            SampleRate::R16000 => 320,
            SampleRate::R48000 => 960,
        }
    }

    #[must_use]
    pub const fn hz(self) -> u32 {
        match self {
            SampleRate::R8000 => 8000,
            SampleRate::R16000 => 16000,
            SampleRate::R48000 => 48000,
        }
    }
}

/// A 20 ms block of PCM16 audio at a declared sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub rate: SampleRate,
    pub samples: Vec<i16>,
}

impl AudioFrame {
    /// Builds a frame after checking `samples.len()` matches `rate`'s block size.
    #[must_use]
    pub fn new(rate: SampleRate, samples: Vec<i16>) -> Option<Self> {
        if samples.len() == rate.block_size() {
            Some(Self { rate, samples })
        } else {
            None
        }
    }

    /// Builds a silent (all-zero) frame at `rate`.
    #[must_use]
    pub fn silence(rate: SampleRate) -> Self {
        Self {
            rate,
            samples: vec![0i16; rate.block_size()],
        }
    }
}

/// Out-of-band signalling carried alongside or instead of audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    CallStart,
    CallEnd,
    CosOn,
    CosOff,
    PttOn,
    PttOff,
    Key,
    Unkey,
    Dtmf(char),
}

/// The codec tag carried on the wire; `Pcm16` is the only one the core
/// resamples directly, other tags pass through the Bridge untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodecTag {
    Pcm16(SampleRate),
    Opaque(u8),
}

/// Payload carried by a [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Audio(AudioFrame),
    Signal(Signal),
    Control(Vec<u8>),
}

/// The tagged value that flows through Router/Bridge/Line (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub source_call_id: u32,
    pub dest_address: u32,
    pub sequence: u32,
    pub remote_time_ms: u32,
    pub codec: CodecTag,
    pub payload: Payload,
}

impl Message {
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.dest_address == BROADCAST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_sizes_match_spec() {
        assert_eq!(SampleRate::R8000.block_size(), 160);
        assert_eq!(SampleRate::R16000.block_size(), 320);
        assert_eq!(SampleRate::R48000.block_size(), 960);
    }

    #[test]
    fn audio_frame_rejects_mismatched_length() {
        assert!(AudioFrame::new(SampleRate::R8000, vec![0i16; 159]).is_none());
        assert!(AudioFrame::new(SampleRate::R8000, vec![0i16; 160]).is_some());
    }

    #[test]
    fn broadcast_sentinel_detected() {
        let msg = Message {
            source_call_id: 1,
            dest_address: BROADCAST,
            sequence: 0,
            remote_time_ms: 0,
            codec: CodecTag::Pcm16(SampleRate::R8000),
            payload: Payload::Signal(Signal::CallStart),
        };
        assert!(msg.is_broadcast());
    }
}
