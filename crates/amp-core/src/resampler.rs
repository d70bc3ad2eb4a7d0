//! Stateful PCM16 sample-rate converter among {8000, 16000, 48000} Hz.
//!
//! Grounded in `original_source/sw/include/amp/Resampler.h` and
//! `Resampler.cpp`: zero-order-hold upsampling followed by a 31-tap Q15
//! symmetric FIR low-pass run at 48 kHz, or the same LPF followed by
//! decimation when downsampling. A resampler instance carries filter state
//! across 20 ms blocks and MUST NOT be shared between streams.

use crate::error::NodeError;
use crate::message::SampleRate;

const MAX_TAPS: usize = 31;

/// LPF used when up-sampling 8k → 48k (also reused for 16k → 48k; see
/// DESIGN.md "F16 resampler coefficients").
#[rustfmt::skip]
const F1_COEFFS: [i16; MAX_TAPS] = [
    103, 136, 148, 74, -113, -395, -694, -881, -801, -331, 573, 1836, 3265,
    4589, 5525, 5864, 5525, 4589, 3265, 1836, 573, -331, -801, -881, -694,
    -395, -113, 74, 148, 136, 103,
];

/// LPF used when down-sampling 48k → 8k (also reused for 48k → 16k).
#[rustfmt::skip]
const F2_COEFFS: [i16; MAX_TAPS] = F1_COEFFS;

/// Q15 fixed-point shift.
const Q15_SHIFT: u32 = 15;

/// A stateful FIR filter applied at 48 kHz, operating on a sliding history
/// buffer of the last `MAX_TAPS - 1` samples plus the current block.
struct FirState {
    coeffs: [i16; MAX_TAPS],
    history: Vec<i16>,
}

impl FirState {
    fn new(coeffs: [i16; MAX_TAPS]) -> Self {
        Self {
            coeffs,
            history: vec![0i16; MAX_TAPS - 1],
        }
    }

    fn reset(&mut self) {
        self.history.iter_mut().for_each(|s| *s = 0);
    }

    /// Filters `block` in place, maintaining history across calls.
    fn filter(&mut self, block: &[i16]) -> Vec<i16> {
        let mut extended = Vec::with_capacity(self.history.len() + block.len());
        extended.extend_from_slice(&self.history);
        extended.extend_from_slice(block);

        let mut out = Vec::with_capacity(block.len());
        for n in 0..block.len() {
            let window = &extended[n..n + MAX_TAPS];
            let mut acc = 0i64;
            for (c, s) in self.coeffs.iter().zip(window.iter()) {
                acc += i64::from(*c) * i64::from(*s);
            }
            let sample = (acc >> Q15_SHIFT).clamp(i64::from(i16::MIN), i64::from(i16::MAX));
            out.push(sample as i16);
        }

        let tail_start = extended.len() - (MAX_TAPS - 1);
        self.history.copy_from_slice(&extended[tail_start..]);
        out
    }
}

/// Converts fixed 20 ms PCM16 blocks between sample rates, preserving filter
/// state across calls. Construct one per audio stream direction.
pub struct Resampler {
    in_rate: SampleRate,
    out_rate: SampleRate,
    lpf: Option<FirState>,
}

impl Resampler {
    /// Builds a resampler for a specific, fixed rate pair.
    ///
    /// # Errors
    /// Returns [`NodeError::Unsupported`] if `in_rate`/`out_rate` is not one
    /// of the supported pairs; validated once at construction so the hot
    /// `resample` call itself never has to fail (SPEC_FULL §4.2).
    pub fn new(in_rate: SampleRate, out_rate: SampleRate) -> Result<Self, NodeError> {
        let lpf = match (in_rate, out_rate) {
            (a, b) if a as u8 == b as u8 => None,
            (SampleRate::R8000, SampleRate::R48000) => Some(FirState::new(F1_COEFFS)),
            (SampleRate::R48000, SampleRate::R8000) => Some(FirState::new(F2_COEFFS)),
            (SampleRate::R16000, SampleRate::R48000) => Some(FirState::new(F1_COEFFS)),
            (SampleRate::R48000, SampleRate::R16000) => Some(FirState::new(F2_COEFFS)),
            _ => {
                return Err(NodeError::Unsupported(format!(
                    "resampler pair {in_rate:?} -> {out_rate:?}"
                )))
            }
        };
        Ok(Self {
            in_rate,
            out_rate,
            lpf,
        })
    }

    pub fn reset(&mut self) {
        if let Some(lpf) = &mut self.lpf {
            lpf.reset();
        }
    }

    #[must_use]
    pub fn in_block_size(&self) -> usize {
        self.in_rate.block_size()
    }

    #[must_use]
    pub fn out_block_size(&self) -> usize {
        self.out_rate.block_size()
    }

    /// Resamples one fixed-size 20 ms block.
    ///
    /// # Panics
    /// Panics if `input.len()` does not match `in_rate`'s block size - this
    /// is a caller programming error, not a recoverable condition.
    #[must_use]
    pub fn resample(&mut self, input: &[i16]) -> Vec<i16> {
        assert_eq!(
            input.len(),
            self.in_block_size(),
            "resampler input block size mismatch"
        );

        if self.in_rate as u8 == self.out_rate as u8 {
            return input.to_vec();
        }

        if self.out_rate.hz() > self.in_rate.hz() {
            // Upsample: zero-order-hold replicate to 48k rate, then LPF.
            let factor = (self.out_rate.hz() / self.in_rate.hz()) as usize;
            let mut expanded = Vec::with_capacity(input.len() * factor);
            for &sample in input {
                for _ in 0..factor {
                    expanded.push(sample);
                }
            }
            self.lpf.as_mut().expect("lpf present for cross-rate pair").filter(&expanded)
        } else {
            // Downsample: LPF at the input rate's notional 48k grid, then decimate.
            let factor = (self.in_rate.hz() / self.out_rate.hz()) as usize;
            let filtered = self
                .lpf
                .as_mut()
                .expect("lpf present for cross-rate pair")
                .filter(input);
            filtered.into_iter().step_by(factor).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_resample_is_passthrough() {
        let mut r = Resampler::new(SampleRate::R8000, SampleRate::R8000).unwrap();
        let input: Vec<i16> = (0..160i16).collect();
        assert_eq!(r.resample(&input), input);
    }

    #[test]
    fn unsupported_pair_rejected_at_construction() {
        // 8k<->16k has no defined filter table; every pair through 48k does.
        assert!(matches!(
            Resampler::new(SampleRate::R8000, SampleRate::R16000),
            Err(NodeError::Unsupported(_))
        ));
        assert!(matches!(
            Resampler::new(SampleRate::R16000, SampleRate::R8000),
            Err(NodeError::Unsupported(_))
        ));
        assert!(Resampler::new(SampleRate::R8000, SampleRate::R48000).is_ok());
        assert!(Resampler::new(SampleRate::R48000, SampleRate::R16000).is_ok());
    }

    #[test]
    fn upsample_then_downsample_preserves_block_sizes() {
        let mut up = Resampler::new(SampleRate::R8000, SampleRate::R48000).unwrap();
        let mut down = Resampler::new(SampleRate::R48000, SampleRate::R8000).unwrap();
        let input = vec![1000i16; 160];
        let at_48k = up.resample(&input);
        assert_eq!(at_48k.len(), 960);
        let back_at_8k = down.resample(&at_48k);
        assert_eq!(back_at_8k.len(), 160);
    }

    #[test]
    fn filter_state_persists_across_blocks() {
        let mut r = Resampler::new(SampleRate::R8000, SampleRate::R48000).unwrap();
        let silence = vec![0i16; 160];
        let first = r.resample(&silence);
        // Second call to a freshly constructed resampler (no carried history)
        // must differ from the first call on a resampler that has already
        // seen a non-silent transient, proving history influences output.
        let mut tone = vec![0i16; 160];
        tone[0] = 20000;
        let mut r2 = Resampler::new(SampleRate::R8000, SampleRate::R48000).unwrap();
        let _ = r2.resample(&tone);
        let after_tone = r2.resample(&silence);
        assert_ne!(first, after_tone);
    }
}
