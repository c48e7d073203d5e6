// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for keydesk.
//!
//! This crate provides the transport trait, error type, and common types
//! shared by the broker engine and every channel adapter. It carries no
//! broker logic and no platform dependency.

pub mod channel;
pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use channel::ChannelAdapter;
pub use error::KeydeskError;
pub use types::{
    Button, ChannelCapabilities, Command, EventKind, EventPayload, HealthStatus, InboundEvent,
    MessageId, OutboundMessage, ParticipantId,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = KeydeskError::Config("test".into());
        let _channel = KeydeskError::Channel {
            message: "test".into(),
            source: Some(Box::new(std::io::Error::other("test"))),
        };
        let _internal = KeydeskError::Internal("test".into());
    }

    #[test]
    fn channel_shorthand_carries_no_source() {
        match KeydeskError::channel("closed") {
            KeydeskError::Channel { message, source } => {
                assert_eq!(message, "closed");
                assert!(source.is_none());
            }
            _ => panic!("expected channel variant"),
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        assert_eq!(healthy, HealthStatus::Healthy);
        assert_ne!(HealthStatus::Degraded("slow".into()), healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), healthy);
    }

    #[test]
    fn channel_adapter_trait_is_object_safe() {
        fn _assert(_: &dyn ChannelAdapter) {}
    }
}
