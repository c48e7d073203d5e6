// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for keydesk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level keydesk configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; a broker with an empty registry starts but accepts nothing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeydeskConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Telegram transport settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Static participant and product registry.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Broker policy knobs.
    #[serde(default)]
    pub broker: BrokerConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "keydesk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram transport configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables the Telegram transport.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Image shown with the start menu, if any (path or file id).
    #[serde(default)]
    pub start_image: Option<String>,
}

/// Static registry of privileged participants and products.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Participants with the admin capability (implies seller).
    #[serde(default)]
    pub admins: Vec<i64>,

    /// Participants with the seller capability.
    #[serde(default)]
    pub sellers: Vec<i64>,

    /// Product catalog.
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// One product in the catalog.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProductConfig {
    /// Unique product name. Used as the catalog key and in callback
    /// tokens, so it must not contain a colon.
    pub name: String,

    /// Customer-facing description.
    #[serde(default)]
    pub description: String,

    /// Product image (path or transport file id), if any.
    #[serde(default)]
    pub image: Option<String>,

    /// Sellers authorized to fulfill this product. May be empty, which
    /// makes the product listable but unavailable for new requests.
    #[serde(default)]
    pub sellers: Vec<i64>,
}

/// Broker policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// Whether new connection requests are accepted at startup. Admins can
    /// flip this at runtime.
    #[serde(default = "default_buy_enabled")]
    pub buy_enabled: bool,

    /// Whether an administrative force-stop counts toward the seller's
    /// completed-chat statistics. Normal seller-initiated ends always count.
    #[serde(default)]
    pub forced_stop_counts_stats: bool,

    /// Number of chat log records shown by the log view.
    #[serde(default = "default_log_tail")]
    pub log_tail: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            buy_enabled: default_buy_enabled(),
            forced_stop_counts_stats: false,
            log_tail: default_log_tail(),
        }
    }
}

fn default_buy_enabled() -> bool {
    true
}

fn default_log_tail() -> usize {
    20
}
