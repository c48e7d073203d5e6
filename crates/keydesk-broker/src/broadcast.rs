// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort fan-out over a channel adapter.
//!
//! Broadcast is explicitly non-transactional: per-recipient failures are
//! logged and tallied, never retried, and never fail the whole operation.

use keydesk_core::{ChannelAdapter, OutboundMessage};
use tracing::warn;

/// Tally of one best-effort fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Sends every message concurrently; order-independent, at-most-once.
pub async fn broadcast(
    channel: &dyn ChannelAdapter,
    messages: Vec<OutboundMessage>,
) -> DeliveryReport {
    let sends = messages.into_iter().map(|msg| {
        let recipient = msg.recipient;
        async move {
            match channel.send(msg).await {
                Ok(_) => true,
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "broadcast delivery failed");
                    false
                }
            }
        }
    });

    let results = futures::future::join_all(sends).await;
    let delivered = results.iter().filter(|ok| **ok).count();
    let report = DeliveryReport {
        delivered,
        failed: results.len() - delivered,
    };

    if report.failed > 0 {
        metrics::counter!("keydesk_broadcast_failures").increment(report.failed as u64);
    }
    report
}
