// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end broker testing.
//!
//! `BrokerHarness` assembles a broker over a `MockChannel` with a
//! configurable registry fixture, so tests drive the full
//! arbitrate-route-terminate pipeline and assert on captured traffic.

use std::sync::Arc;

use keydesk_broker::{Broker, BrokerPolicy, Registry};
use keydesk_config::model::{ProductConfig, RegistryConfig};
use keydesk_core::ParticipantId;

use crate::mock_channel::MockChannel;

/// Builder for broker test environments.
pub struct BrokerHarnessBuilder {
    admins: Vec<i64>,
    sellers: Vec<i64>,
    products: Vec<ProductConfig>,
    buy_enabled: bool,
    forced_stop_counts_stats: bool,
    log_tail: usize,
}

impl BrokerHarnessBuilder {
    fn new() -> Self {
        Self {
            admins: Vec::new(),
            sellers: Vec::new(),
            products: Vec::new(),
            buy_enabled: true,
            forced_stop_counts_stats: false,
            log_tail: 20,
        }
    }

    pub fn with_admin(mut self, id: i64) -> Self {
        self.admins.push(id);
        self
    }

    pub fn with_seller(mut self, id: i64) -> Self {
        self.sellers.push(id);
        self
    }

    /// Add a product with the given authorized sellers.
    pub fn with_product(mut self, name: &str, sellers: &[i64]) -> Self {
        self.products.push(ProductConfig {
            name: name.to_string(),
            description: format!("{name} key"),
            image: None,
            sellers: sellers.to_vec(),
        });
        self
    }

    pub fn with_buy_disabled(mut self) -> Self {
        self.buy_enabled = false;
        self
    }

    /// Count forced stops into seller statistics (policy flag).
    pub fn with_forced_stop_counted(mut self) -> Self {
        self.forced_stop_counts_stats = true;
        self
    }

    pub fn with_log_tail(mut self, n: usize) -> Self {
        self.log_tail = n;
        self
    }

    pub fn build(self) -> BrokerHarness {
        let registry = Arc::new(Registry::from_config(
            &RegistryConfig {
                admins: self.admins,
                sellers: self.sellers,
                products: self.products,
            },
            self.buy_enabled,
        ));
        let channel = Arc::new(MockChannel::new());
        let policy = BrokerPolicy {
            forced_stop_counts_stats: self.forced_stop_counts_stats,
            log_tail: self.log_tail,
            start_image: None,
        };
        let broker = Broker::new(registry.clone(), channel.clone(), policy);

        BrokerHarness {
            broker: Arc::new(broker),
            channel,
            registry,
        }
    }
}

/// A fully wired broker over a mock channel.
pub struct BrokerHarness {
    pub broker: Arc<Broker>,
    pub channel: Arc<MockChannel>,
    pub registry: Arc<Registry>,
}

impl BrokerHarness {
    pub fn builder() -> BrokerHarnessBuilder {
        BrokerHarnessBuilder::new()
    }

    pub fn id(&self, raw: i64) -> ParticipantId {
        ParticipantId(raw)
    }
}
