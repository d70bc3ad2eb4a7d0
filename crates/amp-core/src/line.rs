//! Line (abstract bidirectional audio endpoint) and Adaptor.
//!
//! Spec §4.7 and REDESIGN FLAGS / SPEC_FULL §9: re-expressed as a capability
//! set of tagged variants implementing a shared [`LineOps`] trait rather than
//! an inheritance hierarchy, so the Router holds plain values (or handles)
//! keyed by id instead of a base-class pointer.

use crate::error::NodeError;
use crate::message::{CodecTag, Message, SampleRate};
use crate::resampler::Resampler;

/// Shared capability set every concrete line variant implements.
pub trait LineOps {
    /// Stable routing identity used by the Router.
    fn id(&self) -> u32;

    fn open(&mut self) -> Result<(), NodeError>;
    fn close(&mut self);

    /// Enqueues `msg` for outbound delivery on this line. Non-blocking.
    fn send(&mut self, msg: Message);

    /// Called every EventLoop iteration; MUST return promptly.
    fn poll(&mut self, now_ms: u32);

    /// Called once per 20 ms audio tick.
    fn tick(&mut self, now_ms: u32);
}

/// Identifying metadata for a network (IAX2) peer line.
#[derive(Debug, Clone)]
pub struct LineIax2 {
    pub id: u32,
    pub remote_node: String,
    outbound: Vec<Message>,
    is_open: bool,
}

impl LineIax2 {
    #[must_use]
    pub fn new(id: u32, remote_node: String) -> Self {
        Self {
            id,
            remote_node,
            outbound: Vec::new(),
            is_open: false,
        }
    }

    /// Drains queued outbound messages (consumed by the IAX2 wire-protocol
    /// collaborator, which is out of scope for this crate - spec §1).
    pub fn drain_outbound(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbound)
    }
}

impl LineOps for LineIax2 {
    fn id(&self) -> u32 {
        self.id
    }

    fn open(&mut self) -> Result<(), NodeError> {
        self.is_open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.is_open = false;
    }

    fn send(&mut self, msg: Message) {
        if self.is_open {
            self.outbound.push(msg);
        }
    }

    fn poll(&mut self, _now_ms: u32) {}

    fn tick(&mut self, _now_ms: u32) {}
}

/// The locally-attached USB radio (ALSA audio + HID carrier-operated-squelch).
#[derive(Debug, Clone)]
pub struct LineUsb {
    pub id: u32,
    pub alsa_card: i32,
    pub cos_invert: bool,
    outbound: Vec<Message>,
    is_open: bool,
}

impl LineUsb {
    #[must_use]
    pub fn new(id: u32, alsa_card: i32, cos_invert: bool) -> Self {
        Self {
            id,
            alsa_card,
            cos_invert,
            outbound: Vec::new(),
            is_open: false,
        }
    }

    pub fn drain_outbound(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbound)
    }

    /// Applies the configured COS polarity (spec §6 `aslCosInvert`).
    #[must_use]
    pub fn resolve_cos(&self, raw_asserted: bool) -> bool {
        raw_asserted ^ self.cos_invert
    }
}

impl LineOps for LineUsb {
    fn id(&self) -> u32 {
        self.id
    }

    fn open(&mut self) -> Result<(), NodeError> {
        if self.alsa_card < 0 {
            return Err(NodeError::DeviceNotFound {
                device: "usb sound card".into(),
            });
        }
        self.is_open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.is_open = false;
    }

    fn send(&mut self, msg: Message) {
        if self.is_open {
            self.outbound.push(msg);
        }
    }

    fn poll(&mut self, _now_ms: u32) {}

    fn tick(&mut self, _now_ms: u32) {}
}

/// Serial COBS-framed audio line (spec §4.3/§6 wire frame).
#[derive(Debug, Clone)]
pub struct LineSdrc {
    pub id: u32,
    pub device_path: String,
    outbound: Vec<Message>,
    is_open: bool,
}

impl LineSdrc {
    #[must_use]
    pub fn new(id: u32, device_path: String) -> Self {
        Self {
            id,
            device_path,
            outbound: Vec::new(),
            is_open: false,
        }
    }

    pub fn drain_outbound(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbound)
    }
}

impl LineOps for LineSdrc {
    fn id(&self) -> u32 {
        self.id
    }

    fn open(&mut self) -> Result<(), NodeError> {
        self.is_open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.is_open = false;
    }

    fn send(&mut self, msg: Message) {
        if self.is_open {
            self.outbound.push(msg);
        }
    }

    fn poll(&mut self, _now_ms: u32) {}

    fn tick(&mut self, _now_ms: u32) {}
}

/// The capability-set enum the Router/Bridge hold by value, keyed by id.
pub enum Line {
    Iax2(LineIax2),
    Usb(LineUsb),
    Sdrc(LineSdrc),
}

impl LineOps for Line {
    fn id(&self) -> u32 {
        match self {
            Line::Iax2(l) => l.id(),
            Line::Usb(l) => l.id(),
            Line::Sdrc(l) => l.id(),
        }
    }

    fn open(&mut self) -> Result<(), NodeError> {
        match self {
            Line::Iax2(l) => l.open(),
            Line::Usb(l) => l.open(),
            Line::Sdrc(l) => l.open(),
        }
    }

    fn close(&mut self) {
        match self {
            Line::Iax2(l) => l.close(),
            Line::Usb(l) => l.close(),
            Line::Sdrc(l) => l.close(),
        }
    }

    fn send(&mut self, msg: Message) {
        match self {
            Line::Iax2(l) => l.send(msg),
            Line::Usb(l) => l.send(msg),
            Line::Sdrc(l) => l.send(msg),
        }
    }

    fn poll(&mut self, now_ms: u32) {
        match self {
            Line::Iax2(l) => l.poll(now_ms),
            Line::Usb(l) => l.poll(now_ms),
            Line::Sdrc(l) => l.poll(now_ms),
        }
    }

    fn tick(&mut self, now_ms: u32) {
        match self {
            Line::Iax2(l) => l.tick(now_ms),
            Line::Usb(l) => l.tick(now_ms),
            Line::Sdrc(l) => l.tick(now_ms),
        }
    }
}

/// Direction-specific payload conditioning between a Line's native codec/rate
/// and the Bridge's internal representation (spec §4.7).
pub struct Adaptor {
    rx: Resampler,
    tx: Resampler,
}

impl Adaptor {
    /// `line_rate` is the native rate of the Line; `bridge_rate` is the
    /// common rate the Bridge mixes at.
    pub fn new(line_rate: SampleRate, bridge_rate: SampleRate) -> Result<Self, NodeError> {
        Ok(Self {
            rx: Resampler::new(line_rate, bridge_rate)?,
            tx: Resampler::new(bridge_rate, line_rate)?,
        })
    }

    /// Converts a frame received from the Line into the Bridge's rate.
    #[must_use]
    pub fn condition_inbound(&mut self, samples: &[i16]) -> Vec<i16> {
        self.rx.resample(samples)
    }

    /// Converts a frame from the Bridge's rate into the Line's native rate.
    #[must_use]
    pub fn condition_outbound(&mut self, samples: &[i16]) -> Vec<i16> {
        self.tx.resample(samples)
    }

    pub fn reset(&mut self) {
        self.rx.reset();
        self.tx.reset();
    }
}

/// Codec tag helper shared by Line implementations building outbound Messages.
#[must_use]
pub fn pcm16_codec(rate: SampleRate) -> CodecTag {
    CodecTag::Pcm16(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb_line_rejects_negative_card() {
        let mut line = LineUsb::new(1, -1, false);
        assert!(line.open().is_err());
    }

    #[test]
    fn cos_invert_flips_polarity() {
        let line = LineUsb::new(1, 0, true);
        assert!(!line.resolve_cos(true));
        assert!(line.resolve_cos(false));
    }

    #[test]
    fn closed_line_drops_sent_messages() {
        use crate::message::{CodecTag, Payload, Signal};
        let mut line = LineIax2::new(5, "101".into());
        line.send(Message {
            source_call_id: 1,
            dest_address: 5,
            sequence: 0,
            remote_time_ms: 0,
            codec: CodecTag::Pcm16(SampleRate::R8000),
            payload: Payload::Signal(Signal::CallStart),
        });
        assert!(line.drain_outbound().is_empty());
    }
}
