// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./keydesk.toml` > `~/.config/keydesk/keydesk.toml`
//! > `/etc/keydesk/keydesk.toml`, with environment variable overrides via the
//! `KEYDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KeydeskConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/keydesk/keydesk.toml` (system-wide)
/// 3. `~/.config/keydesk/keydesk.toml` (user XDG config)
/// 4. `./keydesk.toml` (local directory)
/// 5. `KEYDESK_*` environment variables
pub fn load_config() -> Result<KeydeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<KeydeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KeydeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KeydeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KeydeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KeydeskConfig::default()))
        .merge(Toml::file("/etc/keydesk/keydesk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("keydesk/keydesk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("keydesk.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `KEYDESK_TELEGRAM_BOT_TOKEN` must map to
/// `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("KEYDESK_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: KEYDESK_TELEGRAM_BOT_TOKEN -> "telegram_bot_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("registry_", "registry.", 1)
            .replacen("broker_", "broker.", 1);
        mapped.into()
    })
}
