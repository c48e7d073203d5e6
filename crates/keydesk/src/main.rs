// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keydesk - a product-key broker over a chat-bot transport.
//!
//! This is the binary entry point for the keydesk service.

mod serve;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Keydesk - a product-key broker over a chat-bot transport.
#[derive(Parser, Debug)]
#[command(name = "keydesk", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the keydesk broker.
    Serve,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match keydesk_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            keydesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.service.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run(config).await {
                eprintln!("keydesk: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            let token = if config.telegram.bot_token.is_some() {
                "set"
            } else {
                "unset"
            };
            println!("service.name = {}", config.service.name);
            println!("service.log_level = {}", config.service.log_level);
            println!("telegram.bot_token = {token}");
            println!("registry.admins = {}", config.registry.admins.len());
            println!("registry.sellers = {}", config.registry.sellers.len());
            println!("registry.products = {}", config.registry.products.len());
            println!("broker.buy_enabled = {}", config.broker.buy_enabled);
            println!(
                "broker.forced_stop_counts_stats = {}",
                config.broker.forced_stop_counts_stats
            );
        }
        None => {
            println!("keydesk: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        use clap::Parser;

        let cli = super::Cli::try_parse_from(["keydesk", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(super::Commands::Serve)));
        let cli = super::Cli::try_parse_from(["keydesk"]).unwrap();
        assert!(cli.command.is_none());
    }
}
