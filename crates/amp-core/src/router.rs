//! Multi-endpoint message router (spec §4.4).

use std::collections::HashMap;

use crate::line::{Line, LineOps};
use crate::message::{Message, BROADCAST};

/// Routes [`Message`]s to Lines by address, with broadcast fan-out.
///
/// Grounded in the teacher's `StreamRegistry` (DashMap-keyed registry
/// pattern) but kept single-threaded and lock-free: the Router is only ever
/// touched from the primary loop (spec §5).
pub struct Router {
    lines: HashMap<u32, Line>,
    broadcast_subscribers: Vec<u32>,
    dropped_count: u64,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: HashMap::new(),
            broadcast_subscribers: Vec::new(),
            dropped_count: 0,
        }
    }

    pub fn register_line(&mut self, line: Line) {
        self.lines.insert(line.id(), line);
    }

    pub fn unregister_line(&mut self, id: u32) -> Option<Line> {
        self.broadcast_subscribers.retain(|&sub| sub != id);
        self.lines.remove(&id)
    }

    pub fn subscribe_broadcast(&mut self, id: u32) {
        if !self.broadcast_subscribers.contains(&id) {
            self.broadcast_subscribers.push(id);
        }
    }

    #[must_use]
    pub fn line_mut(&mut self, id: u32) -> Option<&mut Line> {
        self.lines.get_mut(&id)
    }

    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Delivers `msg` synchronously within the current tick.
    ///
    /// If `dest_address` is [`BROADCAST`], the message is copied to every
    /// broadcast subscriber (never re-entrantly to its own sender). If no
    /// route matches a concrete address, the message is dropped and counted
    /// - never an error (spec §4.4 contract).
    pub fn send(&mut self, msg: Message) {
        if msg.dest_address == BROADCAST {
            let subscribers = self.broadcast_subscribers.clone();
            for sub_id in subscribers {
                if sub_id == msg.source_call_id {
                    continue;
                }
                if let Some(line) = self.lines.get_mut(&sub_id) {
                    line.send(msg.clone());
                }
            }
            return;
        }

        match self.lines.get_mut(&msg.dest_address) {
            Some(line) => line.send(msg),
            None => self.dropped_count += 1,
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineIax2;
    use crate::message::{CodecTag, Payload, SampleRate, Signal};

    fn signal_msg(dest: u32, source: u32) -> Message {
        Message {
            source_call_id: source,
            dest_address: dest,
            sequence: 0,
            remote_time_ms: 0,
            codec: CodecTag::Pcm16(SampleRate::R8000),
            payload: Payload::Signal(Signal::CallStart),
        }
    }

    #[test]
    fn unmatched_destination_is_dropped_and_counted() {
        let mut router = Router::new();
        router.send(signal_msg(99, 1));
        assert_eq!(router.dropped_count(), 1);
    }

    #[test]
    fn delivers_to_matching_line() {
        let mut router = Router::new();
        let mut line = LineIax2::new(5, "101".into());
        line.open().unwrap();
        router.register_line(Line::Iax2(line));
        router.send(signal_msg(5, 1));
        if let Some(Line::Iax2(line)) = router.line_mut(5) {
            assert_eq!(line.drain_outbound().len(), 1);
        } else {
            panic!("line missing");
        }
    }

    #[test]
    fn broadcast_skips_sender_and_reaches_subscribers() {
        let mut router = Router::new();
        let mut a = LineIax2::new(1, "a".into());
        a.open().unwrap();
        let mut b = LineIax2::new(2, "b".into());
        b.open().unwrap();
        router.register_line(Line::Iax2(a));
        router.register_line(Line::Iax2(b));
        router.subscribe_broadcast(1);
        router.subscribe_broadcast(2);

        router.send(signal_msg(BROADCAST, 1));

        if let Some(Line::Iax2(line)) = router.line_mut(1) {
            assert!(line.drain_outbound().is_empty());
        }
        if let Some(Line::Iax2(line)) = router.line_mut(2) {
            assert_eq!(line.drain_outbound().len(), 1);
        }
    }
}
