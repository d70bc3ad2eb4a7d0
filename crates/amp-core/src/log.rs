//! Structured line-oriented logging facade.
//!
//! The hot primary-loop components log through this thin wrapper around the
//! `log` crate (spec §2 L0 `Log`) rather than calling `log::info!` directly,
//! so a future single-producer trace ring (spec §5 "the trace log is a
//! single-producer ring populated only by the primary thread") can be
//! substituted without touching call sites. `amp-server` installs the actual
//! `env_logger` backend at startup.

/// Thin facade over the `log` crate's macros, scoped to the primary loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct Log;

impl Log {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn info(&self, msg: &str) {
        log::info!("{msg}");
    }

    pub fn warn(&self, msg: &str) {
        log::warn!("{msg}");
    }

    pub fn error(&self, msg: &str) {
        log::error!("{msg}");
    }

    pub fn debug(&self, msg: &str) {
        log::debug!("{msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facade_does_not_panic() {
        let log = Log::new();
        log.info("hello");
        log.warn("hello");
        log.error("hello");
        log.debug("hello");
    }
}
