//! amp-core - the real-time audio pipeline for an embedded/Linux IAX2/radio
//! bridge node.
//!
//! # Architecture
//!
//! - [`clock`]: monotonic tick-aligned time source
//! - [`log`]: logging facade used by the primary loop
//! - [`cobs`]: byte-stuffed framing for the serial audio port
//! - [`resampler`]: stateful PCM16 rate conversion
//! - [`sorted_list`]: bounded key-sorted storage used by the sequencing buffer
//! - [`message`]: the tagged Message/AudioFrame/Signal data model
//! - [`sequencing_buffer`]: the adaptive jitter buffer (the hard part)
//! - [`line`]: Line capability-set enum and Adaptor
//! - [`router`]: address-based + broadcast message delivery
//! - [`bridge`]: N-way conference composition
//! - [`event_loop`]: the tick-cooperative scheduler
//! - [`config`]: node configuration snapshot
//! - [`status`]: status snapshot published to the UI thread
//! - [`error`]: centralized error taxonomy

#![warn(clippy::all)]

pub mod bridge;
pub mod clock;
pub mod cobs;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod line;
pub mod log;
pub mod message;
pub mod resampler;
pub mod router;
pub mod sequencing_buffer;
pub mod sorted_list;
pub mod status;

pub use bridge::{Bridge, BridgeMode};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::NodeConfig;
pub use error::{ErrorCode, NodeError, NodeResult};
pub use event_loop::{EventLoop, Runnable};
pub use line::{Adaptor, Line, LineIax2, LineOps, LineSdrc, LineUsb};
pub use message::{AudioFrame, CodecTag, Message, Payload, SampleRate, Signal, BROADCAST};
pub use router::Router;
pub use sequencing_buffer::{PlayoutSink, SequencingBuffer, SequencingStats, TICK_MS};
pub use status::{CallStatus, LineStatus, StatusPublisher, StatusSnapshot};
