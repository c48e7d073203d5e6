// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as unique product names and well-formed log levels.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::KeydeskConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &KeydeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "service.name must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level `{}` is not one of {}",
                config.service.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "telegram.bot_token must not be empty when set".to_string(),
        });
    }

    let mut seen_names = HashSet::new();
    for (i, product) in config.registry.products.iter().enumerate() {
        if product.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("registry.products[{i}].name must not be empty"),
            });
            continue;
        }
        // Product names ride inside colon-separated callback tokens.
        if product.name.contains(':') {
            errors.push(ConfigError::Validation {
                message: format!(
                    "registry.products[{i}].name `{}` must not contain `:`",
                    product.name
                ),
            });
        }
        if !seen_names.insert(&product.name) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate product name `{}` in [[registry.products]]",
                    product.name
                ),
            });
        }
    }

    if config.broker.log_tail == 0 {
        errors.push(ConfigError::Validation {
            message: "broker.log_tail must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductConfig;

    #[test]
    fn default_config_validates() {
        let config = KeydeskConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut config = KeydeskConfig::default();
        config.service.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("log_level"))
        ));
    }

    #[test]
    fn duplicate_product_names_fail_validation() {
        let mut config = KeydeskConfig::default();
        config.registry.products = vec![
            ProductConfig {
                name: "KOS-8BP".to_string(),
                ..ProductConfig::default()
            },
            ProductConfig {
                name: "KOS-8BP".to_string(),
                ..ProductConfig::default()
            },
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("duplicate product name"))
        ));
    }

    #[test]
    fn colon_in_product_name_fails_validation() {
        let mut config = KeydeskConfig::default();
        config.registry.products = vec![ProductConfig {
            name: "bad:name".to_string(),
            ..ProductConfig::default()
        }];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("must not contain"))
        ));
    }

    #[test]
    fn empty_product_name_reported_once() {
        let mut config = KeydeskConfig::default();
        config.registry.products = vec![ProductConfig::default()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn zero_log_tail_fails_validation() {
        let mut config = KeydeskConfig::default();
        config.broker.log_tail = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = KeydeskConfig::default();
        config.registry.admins = vec![6170236685];
        config.registry.sellers = vec![6170236685, 6562270244];
        config.registry.products = vec![ProductConfig {
            name: "KOS-8BP".to_string(),
            description: "Official key.".to_string(),
            image: Some("KOS.jpg".to_string()),
            sellers: vec![6562270244],
        }];
        assert!(validate_config(&config).is_ok());
    }
}
