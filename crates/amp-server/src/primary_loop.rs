//! The primary single-threaded cooperative loop (spec §5): the only caller
//! that invokes `playOut`/`consume*`/`send` on the hot-path components.
//!
//! Grounded in `original_source/src/main.cpp`'s wiring of `Bridge`,
//! `LineUsb`, `LineIAX2`, `TwoLineRouter` (here: [`Router`]) and
//! `EventLoop::run` over a fixed task array.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use amp_core::{
    Bridge, BridgeMode, CallStatus, EventLoop, Line, LineIax2, LineOps, LineStatus, LineUsb,
    NodeConfig, Router, SampleRate, StatusPublisher, StatusSnapshot, SystemClock, TICK_MS,
};

use crate::device_discovery::strip_usb_prefix;

const LINE_ID_USB_RADIO: u32 = 1;
const LINE_ID_IAX2_PEER: u32 = 2;

/// Owns the Router/Bridge/Lines and implements [`amp_core::Runnable`] so the
/// EventLoop can drive it.
struct NodeRuntime {
    router: Router,
    bridge: Bridge,
    status: Arc<StatusPublisher>,
    start_ms: u32,
}

impl NodeRuntime {
    fn new(config: &NodeConfig, status: Arc<StatusPublisher>) -> Self {
        let mut router = Router::new();
        let mut bridge = Bridge::new(BridgeMode::Normal, SampleRate::R8000);

        if !config.node.is_empty() {
            bridge.set_local_node_number(config.node.clone());
        }

        let alsa_card = strip_usb_prefix(&config.asl_audio_device)
            .map(|_| 0)
            .unwrap_or(-1);
        let mut usb_line = LineUsb::new(LINE_ID_USB_RADIO, alsa_card, config.asl_cos_invert);
        if usb_line.open().is_err() {
            log::warn!("USB radio line failed to open; continuing without it");
        }
        router.register_line(Line::Usb(usb_line));
        if let Err(e) = bridge.connect(LINE_ID_USB_RADIO, SampleRate::R8000, 60) {
            log::error!("failed to connect USB radio line to bridge: {e}");
        }

        let mut iax2_line = LineIax2::new(LINE_ID_IAX2_PEER, config.node.clone());
        if iax2_line.open().is_err() {
            log::warn!("IAX2 line failed to open");
        }
        router.register_line(Line::Iax2(iax2_line));
        if let Err(e) = bridge.connect(LINE_ID_IAX2_PEER, SampleRate::R8000, 60) {
            log::error!("failed to connect IAX2 line to bridge: {e}");
        }

        Self {
            router,
            bridge,
            status,
            start_ms: 0,
        }
    }

    fn publish_status(&self, now_ms: u32) {
        let snapshot = StatusSnapshot {
            lines: vec![
                LineStatus {
                    line_id: LINE_ID_USB_RADIO,
                    kind: "usb",
                    is_open: true,
                },
                LineStatus {
                    line_id: LINE_ID_IAX2_PEER,
                    kind: "iax2",
                    is_open: true,
                },
            ],
            calls: vec![CallStatus {
                line_id: LINE_ID_USB_RADIO,
                sequencing: amp_core::SequencingStats::default(),
            }],
            router_dropped_count: self.router.dropped_count(),
            uptime_ms: now_ms.saturating_sub(self.start_ms),
        };
        self.status.publish(snapshot);
    }
}

impl amp_core::Runnable for NodeRuntime {
    fn poll(&mut self, now_ms: u32) {
        if let Some(Line::Usb(line)) = self.router.line_mut(LINE_ID_USB_RADIO) {
            line.poll(now_ms);
        }
        if let Some(Line::Iax2(line)) = self.router.line_mut(LINE_ID_IAX2_PEER) {
            line.poll(now_ms);
        }
    }

    fn tick(&mut self, now_ms: u32) {
        self.bridge.tick(now_ms, &mut self.router);
        self.publish_status(now_ms);
    }
}

/// Runs the primary loop until `stop` is set. Owns its own `SystemClock`.
pub fn run(
    config_cell: Arc<RwLock<NodeConfig>>,
    reload_rx: std::sync::mpsc::Receiver<NodeConfig>,
    status: Arc<StatusPublisher>,
    stop: Arc<AtomicBool>,
) {
    let config = config_cell.read().clone();
    let mut runtime = NodeRuntime::new(&config, status);

    let clock = SystemClock::new();
    let mut event_loop = EventLoop::new(TICK_MS);
    event_loop.register(&mut runtime);

    event_loop.run(&clock, || {
        // Drain config reloads deposited by the UI thread at tick
        // boundaries only - never mid-tick (spec §5).
        while let Ok(new_config) = reload_rx.try_recv() {
            *config_cell.write() = new_config;
        }
        stop.load(Ordering::SeqCst)
    });
}
