//! ALSA sound-card and HID carrier-operated-squelch device resolution.
//!
//! Grounded in `original_source/src/config-handler.cpp`'s `querySoundMap`/
//! `queryHidMap` calls: a `"usb <query>"` config value is resolved to a
//! concrete ALSA card index / HID device path at startup, on the service
//! thread, never on the primary tick loop (spec §1 "ALSA/HID device
//! discovery" is an external collaborator; this module is the trait seam the
//! core consumes it through).

use amp_core::NodeError;

/// Resolves a `"usb <query>"` audio device string to an ALSA card index.
pub trait SoundMapResolver: Send + Sync {
    fn resolve(&self, query: &str) -> Result<i32, NodeError>;
}

/// Resolves a `"usb <query>"` audio device string to a HID device path for
/// the companion carrier-operated-squelch line.
pub trait HidMapResolver: Send + Sync {
    fn resolve(&self, query: &str) -> Result<String, NodeError>;
}

/// No devices present; used until a real udev/ALSA backend is wired in.
pub struct NullDeviceResolver;

impl SoundMapResolver for NullDeviceResolver {
    fn resolve(&self, query: &str) -> Result<i32, NodeError> {
        Err(NodeError::DeviceNotFound {
            device: format!("usb {query}"),
        })
    }
}

impl HidMapResolver for NullDeviceResolver {
    fn resolve(&self, query: &str) -> Result<String, NodeError> {
        Err(NodeError::DeviceNotFound {
            device: format!("usb {query}"),
        })
    }
}

/// Strips the `"usb "` prefix recognized by the config keys in spec §6.
#[must_use]
pub fn strip_usb_prefix(value: &str) -> Option<&str> {
    value.strip_prefix("usb ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_usb_prefix() {
        assert_eq!(strip_usb_prefix("usb card-a"), Some("card-a"));
        assert_eq!(strip_usb_prefix("card-a"), None);
    }

    #[test]
    fn null_resolver_reports_not_found() {
        let resolver = NullDeviceResolver;
        assert!(SoundMapResolver::resolve(&resolver, "card-a").is_err());
        assert!(HidMapResolver::resolve(&resolver, "card-a").is_err());
    }
}
