// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared across the keydesk workspace.

use thiserror::Error;

/// The primary error type for transport, configuration, and internal faults.
///
/// Domain outcomes (precondition failures, race losses) are not represented
/// here; those live in `keydesk-broker` as `ArbitrationError` and
/// `LifecycleError` because they are expected user-facing results, not
/// faults.
#[derive(Debug, Error)]
pub enum KeydeskError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Channel adapter errors (connection failure, send failure, closed queue).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal-consistency faults. A session index desync lands here; it is
    /// unreachable by construction and fatal when observed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KeydeskError {
    /// Shorthand for a channel error without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }
}
