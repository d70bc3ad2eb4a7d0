//! Centralized error types for the node.
//!
//! Mirrors the shape of the teacher's `ThaumicError`: a `thiserror` enum, an
//! [`ErrorCode`] trait for stable machine-readable identifiers, and (feature-gated
//! by the caller, since `amp-core` itself has no HTTP dependency) enough
//! structure for `amp-server` to map variants onto HTTP status codes.

use serde::Serialize;
use thiserror::Error;

/// A stable, machine-readable identifier for an error variant.
///
/// Grounded in `packages/thaumic-core/src/error.rs`'s `ErrorCode` trait.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

/// The node's error taxonomy (spec §7).
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum NodeError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("device busy: {device}")]
    DeviceBusy { device: String },

    #[error("device not found: {device}")]
    DeviceNotFound { device: String },

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("buffer overflow on line {line_id}")]
    BufferOverflow { line_id: u32 },

    #[error("decode failure: {0}")]
    DecodeFailure(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl ErrorCode for NodeError {
    fn code(&self) -> &'static str {
        match self {
            NodeError::ConfigInvalid(_) => "config_invalid",
            NodeError::DeviceBusy { .. } => "device_busy",
            NodeError::DeviceNotFound { .. } => "device_not_found",
            NodeError::NetworkUnavailable(_) => "network_unavailable",
            NodeError::ProtocolError(_) => "protocol_error",
            NodeError::BufferOverflow { .. } => "buffer_overflow",
            NodeError::DecodeFailure(_) => "decode_failure",
            NodeError::Unsupported(_) => "unsupported",
        }
    }
}

/// Result alias used throughout the crate's fallible (non-hot-path) edges.
pub type NodeResult<T> = Result<T, NodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(NodeError::ConfigInvalid("x".into()).code(), "config_invalid");
        assert_eq!(
            NodeError::DeviceBusy { device: "hw:0".into() }.code(),
            "device_busy"
        );
        assert_eq!(
            NodeError::BufferOverflow { line_id: 3 }.code(),
            "buffer_overflow"
        );
    }

    #[test]
    fn serializes_as_tagged_json() {
        let err = NodeError::DeviceNotFound {
            device: "hw:1".into(),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["type"], "DeviceNotFound");
        assert_eq!(value["details"]["device"], "hw:1");
    }
}
