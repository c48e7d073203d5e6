// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound events,
//! captured outbound messages, and per-recipient delivery failures so tests
//! can exercise the broker's soft-failure paths.

use std::collections::{BTreeSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use keydesk_core::channel::ChannelAdapter;
use keydesk_core::types::{
    ChannelCapabilities, HealthStatus, InboundEvent, MessageId, OutboundMessage, ParticipantId,
};
use keydesk_core::KeydeskError;

/// A mock messaging channel for testing.
///
/// Three knobs:
/// - **inbound**: events injected via `inject_event()` are returned by `receive()`
/// - **sent**: messages passed to `send()` are captured for assertions
/// - **unreachable**: recipients marked unreachable make `send()` fail
#[derive(Default)]
pub struct MockChannel {
    inbound: Mutex<VecDeque<InboundEvent>>,
    sent: Mutex<Vec<OutboundMessage>>,
    unreachable: Mutex<BTreeSet<ParticipantId>>,
    notify: Notify,
}

impl MockChannel {
    /// Create a new mock channel with empty queues and everyone reachable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject an inbound event into the receive queue.
    pub async fn inject_event(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// All messages sent through `send()`, in order.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Messages sent to one recipient, in order.
    pub async fn sent_to(&self, recipient: ParticipantId) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.recipient == recipient)
            .cloned()
            .collect()
    }

    /// Count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all captured sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// Make deliveries to a recipient fail until `set_reachable`.
    pub async fn set_unreachable(&self, recipient: ParticipantId) {
        self.unreachable.lock().await.insert(recipient);
    }

    /// Restore deliveries to a recipient.
    pub async fn set_reachable(&self, recipient: ParticipantId) {
        self.unreachable.lock().await.remove(&recipient);
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_images: false,
            supports_buttons: true,
            max_message_length: None,
        }
    }

    async fn connect(&mut self) -> Result<(), KeydeskError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, KeydeskError> {
        if self.unreachable.lock().await.contains(&msg.recipient) {
            return Err(KeydeskError::channel(format!(
                "recipient {} unreachable",
                msg.recipient
            )));
        }
        let id = format!("mock-msg-{}", uuid::Uuid::new_v4());
        self.sent.lock().await.push(msg);
        Ok(MessageId(id))
    }

    async fn receive(&self) -> Result<InboundEvent, KeydeskError> {
        loop {
            // Try to pop from the queue
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            // Wait for notification that a new event was injected
            self.notify.notified().await;
        }
    }

    async fn health_check(&self) -> Result<HealthStatus, KeydeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KeydeskError> {
        Ok(())
    }
}
