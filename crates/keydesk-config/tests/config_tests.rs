// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the keydesk configuration system.

use keydesk_config::diagnostic::{ConfigError, suggest_key};
use keydesk_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_keydesk_config() {
    let toml = r#"
[service]
name = "quantum-panel"
log_level = "debug"

[telegram]
bot_token = "123:ABC"
start_image = "start.jpg"

[registry]
admins = [6170236685]
sellers = [6170236685, 6562270244]

[[registry.products]]
name = "KOS-8BP"
description = "Official KOS 8 Ball Pool key."
image = "KOS.jpg"
sellers = [6562270244, 6170236685]

[broker]
buy_enabled = false
forced_stop_counts_stats = true
log_tail = 50
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "quantum-panel");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.start_image.as_deref(), Some("start.jpg"));
    assert_eq!(config.registry.admins, vec![6170236685]);
    assert_eq!(config.registry.sellers.len(), 2);
    assert_eq!(config.registry.products.len(), 1);
    assert_eq!(config.registry.products[0].name, "KOS-8BP");
    assert_eq!(config.registry.products[0].sellers.len(), 2);
    assert!(!config.broker.buy_enabled);
    assert!(config.broker.forced_stop_counts_stats);
    assert_eq!(config.broker.log_tail, 50);
}

/// Unknown field in [telegram] produces an UnknownField error.
#[test]
fn unknown_field_in_telegram_produces_error() {
    let toml = r#"
[telegram]
bot_tken = "abc"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("bot_tken"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "keydesk");
    assert_eq!(config.service.log_level, "info");
    assert!(config.telegram.bot_token.is_none());
    assert!(config.registry.admins.is_empty());
    assert!(config.registry.sellers.is_empty());
    assert!(config.registry.products.is_empty());
    assert!(config.broker.buy_enabled);
    assert!(!config.broker.forced_stop_counts_stats);
    assert_eq!(config.broker.log_tail, 20);
}

/// load_and_validate_str surfaces validation errors as diagnostics.
#[test]
fn validation_errors_surface_as_diagnostics() {
    let toml = r#"
[service]
log_level = "loud"

[[registry.products]]
name = "a:b"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Validation { .. })));
}

/// load_and_validate_str converts unknown-key figment errors with a suggestion.
#[test]
fn unknown_key_gets_fuzzy_suggestion() {
    let toml = r#"
[broker]
buy_enbled = true
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail to parse");
    let found = errors.iter().any(|e| match e {
        ConfigError::UnknownKey { key, suggestion, .. } => {
            key == "buy_enbled" && suggestion.as_deref() == Some("buy_enabled")
        }
        _ => false,
    });
    assert!(found, "expected an UnknownKey error with suggestion, got {errors:?}");
}

/// suggest_key threshold filters unrelated keys.
#[test]
fn suggest_key_respects_threshold() {
    let valid = &["buy_enabled", "forced_stop_counts_stats", "log_tail"];
    assert_eq!(suggest_key("log_tial", valid), Some("log_tail".to_string()));
    assert_eq!(suggest_key("qqqqq", valid), None);
}

/// A fully valid config passes the combined load-and-validate path.
#[test]
fn valid_config_passes_load_and_validate() {
    let toml = r#"
[registry]
admins = [1]
sellers = [1, 2]

[[registry.products]]
name = "KOS-8BP"
sellers = [2]
"#;

    let config = load_and_validate_str(toml).expect("config should validate");
    assert_eq!(config.registry.products[0].sellers, vec![2]);
}
