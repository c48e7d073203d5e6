// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for messaging platform integrations.

use async_trait::async_trait;

use crate::error::KeydeskError;
use crate::types::{ChannelCapabilities, HealthStatus, InboundEvent, MessageId, OutboundMessage};

/// Adapter for a bidirectional messaging channel.
///
/// Channel adapters connect the broker to an external messaging platform.
/// Delivery is at-most-once and best-effort: `send` may fail per recipient
/// and the broker never requires an acknowledgement.
#[async_trait]
pub trait ChannelAdapter: Send + Sync + 'static {
    /// Human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), KeydeskError>;

    /// Sends a message through the channel.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, KeydeskError>;

    /// Receives the next inbound event from the channel.
    async fn receive(&self) -> Result<InboundEvent, KeydeskError>;

    /// Performs a health check against the platform.
    async fn health_check(&self) -> Result<HealthStatus, KeydeskError>;

    /// Gracefully shuts down the adapter, releasing held resources.
    async fn shutdown(&self) -> Result<(), KeydeskError>;
}
