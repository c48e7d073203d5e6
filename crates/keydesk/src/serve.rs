// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The serve loop: wires the registry, broker, and Telegram channel, then
//! pumps inbound events until shutdown.

use std::sync::Arc;

use keydesk_broker::{Broker, BrokerPolicy, Registry};
use keydesk_config::KeydeskConfig;
use keydesk_core::{ChannelAdapter, KeydeskError};
use keydesk_telegram::TelegramChannel;
use tracing::{error, info};

/// Builds the stack from configuration and runs the event loop until
/// ctrl-c or channel closure.
pub async fn run(config: KeydeskConfig) -> Result<(), KeydeskError> {
    let registry = Arc::new(Registry::from_config(
        &config.registry,
        config.broker.buy_enabled,
    ));
    let policy = BrokerPolicy::from_config(&config);

    let mut channel = TelegramChannel::new(&config.telegram)?;
    channel.connect().await?;
    let channel: Arc<dyn ChannelAdapter> = Arc::new(channel);

    let broker = Arc::new(Broker::new(registry, channel.clone(), policy));

    info!(
        service = %config.service.name,
        products = config.registry.products.len(),
        "keydesk serving"
    );

    loop {
        tokio::select! {
            event = channel.receive() => match event {
                Ok(event) => {
                    // Events dispatch concurrently; the session store's lock
                    // is what serializes the races that matter.
                    let broker = broker.clone();
                    tokio::spawn(async move {
                        broker.handle_event(event).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "inbound channel closed, stopping");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    channel.shutdown().await?;
    Ok(())
}
