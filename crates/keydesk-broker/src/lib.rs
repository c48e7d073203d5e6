// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session routing and request arbitration engine.
//!
//! The broker owns the registry, the session store, and a channel adapter
//! handle. It exposes the arbitration, routing, and lifecycle operations and
//! a transport-agnostic event dispatcher; everything transport-specific
//! stays in the channel adapter crates.
//!
//! Module map:
//! - [`registry`]: roles, product catalog, blocklist, buy toggle
//! - [`store`]: pending requests, the session bijection, stats, chat log
//! - [`arbitrator`]: request fan-out and first-acceptor-wins claiming
//! - [`router`]: in-session text forwarding
//! - [`lifecycle`]: normal and forced termination
//! - [`broadcast`]: best-effort fan-out with a delivery tally
//! - [`dispatch`]: inbound event to operation mapping, reply rendering

pub mod arbitrator;
pub mod broadcast;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod router;
pub mod store;

use std::sync::Arc;

use keydesk_config::KeydeskConfig;
use keydesk_core::{ChannelAdapter, KeydeskError, OutboundMessage};
use tracing::warn;

pub use broadcast::DeliveryReport;
pub use error::{ArbitrationError, LifecycleError};
pub use registry::{Product, Registry, Roles};
pub use router::RouteOutcome;
pub use store::{
    ChatLogRecord, EndReason, EndedSession, PendingRequest, RouteTarget, SellerStats, Session,
    SessionStore, StoreSnapshot,
};

/// Runtime policy knobs, resolved once from configuration.
#[derive(Debug, Clone, Default)]
pub struct BrokerPolicy {
    /// Whether an administrative force-stop counts toward seller stats.
    pub forced_stop_counts_stats: bool,
    /// Chat log records shown by the log view.
    pub log_tail: usize,
    /// Image shown with the start menu, if any.
    pub start_image: Option<String>,
}

impl BrokerPolicy {
    pub fn from_config(config: &KeydeskConfig) -> Self {
        Self {
            forced_stop_counts_stats: config.broker.forced_stop_counts_stats,
            log_tail: config.broker.log_tail,
            start_image: config.telegram.start_image.clone(),
        }
    }
}

/// The broker core: registry + session store + one channel handle.
pub struct Broker {
    registry: Arc<Registry>,
    store: SessionStore,
    channel: Arc<dyn ChannelAdapter>,
    policy: BrokerPolicy,
}

impl Broker {
    pub fn new(
        registry: Arc<Registry>,
        channel: Arc<dyn ChannelAdapter>,
        policy: BrokerPolicy,
    ) -> Self {
        Self {
            registry,
            store: SessionStore::new(),
            channel,
            policy,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn policy(&self) -> &BrokerPolicy {
        &self.policy
    }

    /// Audits the session store; an `Err` here is a fatal consistency fault.
    pub async fn verify_consistency(&self) -> Result<(), KeydeskError> {
        self.store.verify_consistency().await
    }

    /// Best-effort single delivery. Failures are logged and reported as
    /// `false`; they never roll back broker state.
    pub(crate) async fn notify(&self, msg: OutboundMessage) -> bool {
        let recipient = msg.recipient;
        match self.channel.send(msg).await {
            Ok(_) => true,
            Err(e) => {
                warn!(recipient = %recipient, error = %e, "notification failed");
                false
            }
        }
    }

    pub(crate) fn channel(&self) -> &dyn ChannelAdapter {
        self.channel.as_ref()
    }
}
