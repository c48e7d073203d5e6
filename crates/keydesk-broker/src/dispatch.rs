// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event dispatch: maps commands and texts onto broker operations
//! and renders a human-readable outcome for every path, success or failure.

use chrono::Utc;
use keydesk_core::{Button, Command, EventPayload, InboundEvent, OutboundMessage, ParticipantId};
use tracing::debug;

use crate::Broker;
use crate::broadcast::broadcast;
use crate::store::ChatLogRecord;

const ADMIN_ONLY: &str = "This command requires admin access.";
const SELLER_ONLY: &str = "This command requires seller access.";

impl Broker {
    /// Entry point for one inbound event from the transport.
    ///
    /// Every participant that sends anything becomes part of the broadcast
    /// audience. Texts go to the router; commands and button callbacks are
    /// dispatched identically; photos are dropped (only text is forwarded
    /// inside sessions).
    pub async fn handle_event(&self, event: InboundEvent) {
        let sender = event.sender;
        debug!(sender = %sender, kind = %event.payload.kind(), "inbound event");
        self.store().note_participant(sender).await;

        match event.payload {
            EventPayload::Command(cmd) | EventPayload::Callback(cmd) => {
                self.handle_command(sender, cmd).await;
            }
            EventPayload::Text(text) => {
                self.route_text(sender, &text).await;
            }
            EventPayload::Photo { .. } => {
                debug!(sender = %sender, "photo dropped, only text is routed");
            }
        }
    }

    async fn handle_command(&self, sender: ParticipantId, cmd: Command) {
        match cmd {
            Command::Start => self.start_menu(sender).await,
            Command::Buy => self.product_menu(sender).await,
            Command::ShowProduct { product } => self.product_details(sender, &product).await,
            Command::RequestConnection { product } => {
                match self.request_connection(sender, &product).await {
                    Ok(_) => {
                        self.reply(
                            sender,
                            format!(
                                "Connection request sent for {product}.\n\
                                 Your request has been sent to authorized sellers; \
                                 please wait for someone to accept."
                            ),
                        )
                        .await;
                    }
                    Err(e) => self.reply(sender, e.to_string()).await,
                }
            }
            Command::Accept { buyer, product } => {
                if let Err(e) = self.accept_connection(sender, buyer, &product).await {
                    self.reply(sender, e.to_string()).await;
                }
            }
            Command::EndSession => {
                if let Err(e) = self.end_session(sender).await {
                    self.reply(sender, e.to_string()).await;
                }
            }
            Command::ForceStop { buyer } => match self.force_stop(sender, buyer).await {
                Ok(_) => {
                    self.reply(sender, format!("Session with buyer {buyer} force stopped."))
                        .await;
                }
                Err(e) => self.reply(sender, e.to_string()).await,
            },
            Command::ToggleAlerts => {
                if !self.registry().roles_of(sender).await.seller {
                    self.reply(sender, SELLER_ONLY).await;
                    return;
                }
                let enabled = self.store().toggle_alerts(sender).await;
                let state = if enabled { "enabled" } else { "disabled" };
                self.reply(sender, format!("Request alerts are now {state}."))
                    .await;
            }
            Command::AdminPanel => self.admin_panel(sender).await,
            Command::SellerPanel => self.seller_panel(sender).await,
            Command::Block { buyer } => {
                if !self.registry().roles_of(sender).await.admin {
                    self.reply(sender, ADMIN_ONLY).await;
                    return;
                }
                self.registry().block(buyer).await;
                self.reply(sender, format!("Buyer {buyer} is now blocked."))
                    .await;
            }
            Command::Unblock { buyer } => {
                if !self.registry().roles_of(sender).await.admin {
                    self.reply(sender, ADMIN_ONLY).await;
                    return;
                }
                self.registry().unblock(buyer).await;
                self.reply(sender, format!("Buyer {buyer} is now unblocked."))
                    .await;
            }
            Command::EnableBuy | Command::DisableBuy => {
                if !self.registry().roles_of(sender).await.admin {
                    self.reply(sender, ADMIN_ONLY).await;
                    return;
                }
                let enable = cmd == Command::EnableBuy;
                self.registry().set_buy_enabled(enable).await;
                let state = if enable { "enabled" } else { "disabled" };
                self.reply(sender, format!("Buying is now {state}.")).await;
            }
            Command::Broadcast { text } => self.admin_broadcast(sender, &text).await,
            Command::MyStats => self.seller_stats_view(sender).await,
            Command::MyProducts => self.seller_products_view(sender).await,
            Command::GlobalStats => self.global_stats_view(sender).await,
            Command::Sessions => self.sessions_view(sender).await,
            Command::Logs => self.logs_view(sender).await,
        }
    }

    /// Role-dependent entry menu.
    async fn start_menu(&self, sender: ParticipantId) {
        // A participant inside a conversation gets no menu; the session has
        // to end first.
        if self.store().route_target(sender).await.is_some() {
            self.reply(
                sender,
                "Active session detected. Finish the current conversation \
                 before using other commands.",
            )
            .await;
            return;
        }

        let roles = self.registry().roles_of(sender).await;
        if !roles.admin && self.registry().is_blocked(sender).await {
            self.reply(sender, "You have been blocked from using this service.")
                .await;
            return;
        }

        let mut msg = if roles.admin {
            OutboundMessage::text(
                sender,
                format!("Welcome back, admin {sender}.\nChoose your control panel:"),
            )
            .with_buttons(vec![
                [
                    Button::new("Admin panel", &Command::AdminPanel),
                    Button::new("Seller panel", &Command::SellerPanel),
                ]
                .into_iter()
                .flatten()
                .collect(),
            ])
        } else if roles.seller {
            OutboundMessage::text(
                sender,
                format!("Welcome, seller {sender}.\nAccess your seller panel:"),
            )
            .with_buttons(vec![
                Button::new("Seller panel", &Command::SellerPanel)
                    .into_iter()
                    .collect(),
            ])
        } else {
            OutboundMessage::text(
                sender,
                "Welcome. This service connects you with authorized sellers \
                 of official product keys.\nChoose an option to get started.",
            )
            .with_buttons(vec![Button::new("Buy keys", &Command::Buy).into_iter().collect()])
        };

        if let Some(image) = &self.policy().start_image {
            msg = msg.with_image(image.clone());
        }
        self.notify(msg).await;
    }

    /// Product selection menu. The same preconditions as request creation
    /// apply, so a buyer learns about a block or a disabled toggle before
    /// picking a product.
    async fn product_menu(&self, sender: ParticipantId) {
        let roles = self.registry().roles_of(sender).await;
        if !roles.admin && self.registry().is_blocked(sender).await {
            self.reply(sender, "You have been blocked from using this service.")
                .await;
            return;
        }
        if !self.registry().buy_enabled().await {
            self.reply(
                sender,
                "The buy feature is currently disabled. Please try again later.",
            )
            .await;
            return;
        }
        if self.store().session_for_buyer(sender).await.is_some() {
            self.reply(
                sender,
                "You are already connected to a seller. Send your message directly.",
            )
            .await;
            return;
        }
        if self.store().pending_for_buyer(sender).await.is_some() {
            self.reply(
                sender,
                "You already have a pending request. Please wait for a seller to accept.",
            )
            .await;
            return;
        }

        let products = self.registry().products().await;
        if products.is_empty() {
            self.reply(sender, "No products are available right now.").await;
            return;
        }

        let buttons = products
            .iter()
            .filter_map(|p| {
                Button::new(
                    p.name.clone(),
                    &Command::ShowProduct {
                        product: p.name.clone(),
                    },
                )
            })
            .map(|b| vec![b])
            .collect();
        self.notify(
            OutboundMessage::text(sender, "Product selection\nChoose a product from the list:")
                .with_buttons(buttons),
        )
        .await;
    }

    /// One product's details with its connect button.
    async fn product_details(&self, sender: ParticipantId, name: &str) {
        let Some(product) = self.registry().product(name).await else {
            self.reply(sender, "Invalid product.").await;
            return;
        };
        if product.sellers.is_empty() {
            self.reply(sender, "Sorry, this product is currently unavailable.")
                .await;
            return;
        }

        let description = if product.description.is_empty() {
            "No description available."
        } else {
            &product.description
        };
        let mut msg = OutboundMessage::text(
            sender,
            format!(
                "Product: {}\nDescription: {}\n\nConnect with a seller below.",
                product.name, description
            ),
        )
        .with_buttons(vec![
            Button::new(
                "Connect with seller",
                &Command::RequestConnection {
                    product: product.name.clone(),
                },
            )
            .into_iter()
            .collect(),
        ]);
        if let Some(image) = &product.image {
            msg = msg.with_image(image.clone());
        }
        self.notify(msg).await;
    }

    async fn admin_panel(&self, sender: ParticipantId) {
        if !self.registry().roles_of(sender).await.admin {
            self.reply(sender, ADMIN_ONLY).await;
            return;
        }
        let rows = vec![
            [
                Button::new("Monitor sessions", &Command::Sessions),
                Button::new("Global statistics", &Command::GlobalStats),
            ]
            .into_iter()
            .flatten()
            .collect(),
            [
                Button::new("Chat logs", &Command::Logs),
                Button::new("Disable buying", &Command::DisableBuy),
                Button::new("Enable buying", &Command::EnableBuy),
            ]
            .into_iter()
            .flatten()
            .collect(),
        ];
        self.notify(
            OutboundMessage::text(
                sender,
                "Admin panel\n\
                 Text commands: /block <id>, /unblock <id>, /broadcast <message>.",
            )
            .with_buttons(rows),
        )
        .await;
    }

    async fn seller_panel(&self, sender: ParticipantId) {
        if !self.registry().roles_of(sender).await.seller {
            self.reply(sender, SELLER_ONLY).await;
            return;
        }
        let rows = vec![
            [
                Button::new("My statistics", &Command::MyStats),
                Button::new("My products", &Command::MyProducts),
            ]
            .into_iter()
            .flatten()
            .collect(),
            [
                Button::new("Toggle alerts", &Command::ToggleAlerts),
                Button::new("End chat", &Command::EndSession),
            ]
            .into_iter()
            .flatten()
            .collect(),
        ];
        self.notify(OutboundMessage::text(sender, "Seller panel").with_buttons(rows))
            .await;
    }

    /// Best-effort broadcast to every known participant; the admin gets the
    /// delivery tally, partial failure is not an error.
    async fn admin_broadcast(&self, sender: ParticipantId, text: &str) {
        if !self.registry().roles_of(sender).await.admin {
            self.reply(sender, ADMIN_ONLY).await;
            return;
        }
        let audience = self.store().known_participants().await;
        let messages = audience
            .into_iter()
            .filter(|id| *id != sender)
            .map(|id| OutboundMessage::text(id, text.to_string()))
            .collect();
        let report = broadcast(self.channel(), messages).await;
        self.reply(
            sender,
            format!(
                "Broadcast finished: {} delivered, {} failed.",
                report.delivered, report.failed
            ),
        )
        .await;
    }

    async fn seller_stats_view(&self, sender: ParticipantId) {
        if !self.registry().roles_of(sender).await.seller {
            self.reply(sender, SELLER_ONLY).await;
            return;
        }
        let stats = self.store().stats_for(sender).await;
        let recent = if stats.last_10_buyers.is_empty() {
            "none".to_string()
        } else {
            stats
                .last_10_buyers
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        self.reply(
            sender,
            format!(
                "Your statistics\n\
                 Total served: {}\nChats completed: {}\n\
                 Today: {}\nThis month: {}\nRecent buyers: {recent}",
                stats.total_served, stats.chats_completed, stats.today, stats.month
            ),
        )
        .await;
    }

    async fn seller_products_view(&self, sender: ParticipantId) {
        if !self.registry().roles_of(sender).await.seller {
            self.reply(sender, SELLER_ONLY).await;
            return;
        }
        let products = self.registry().products_for_seller(sender).await;
        let body = if products.is_empty() {
            "You are not assigned to any products.".to_string()
        } else {
            format!("Your products:\n{}", products.join("\n"))
        };
        self.reply(sender, body).await;
    }

    async fn global_stats_view(&self, sender: ParticipantId) {
        if !self.registry().roles_of(sender).await.admin {
            self.reply(sender, ADMIN_ONLY).await;
            return;
        }
        let snapshot = self.store().snapshot().await;
        let blocked = self.registry().blocked_count().await;
        let buying = if self.registry().buy_enabled().await {
            "enabled"
        } else {
            "disabled"
        };
        self.reply(
            sender,
            format!(
                "Global statistics\n\
                 Known participants: {}\nBlocked buyers: {blocked}\n\
                 Active sessions: {}\nPending requests: {}\n\
                 Chats completed: {}\nBuying: {buying}",
                snapshot.known_participants,
                snapshot.active_sessions.len(),
                snapshot.pending_requests,
                snapshot.chats_completed,
            ),
        )
        .await;
    }

    /// Live session monitor with one force-stop button per session.
    async fn sessions_view(&self, sender: ParticipantId) {
        if !self.registry().roles_of(sender).await.admin {
            self.reply(sender, ADMIN_ONLY).await;
            return;
        }
        let snapshot = self.store().snapshot().await;
        if snapshot.active_sessions.is_empty() {
            self.reply(sender, "There are currently no active conversations.")
                .await;
            return;
        }

        let now = Utc::now();
        let mut lines = vec!["Active sessions:".to_string()];
        let mut rows = Vec::new();
        for session in &snapshot.active_sessions {
            let minutes = (now - session.started_at).num_minutes().max(0);
            lines.push(format!(
                "buyer {} / seller {} / {} / {minutes} min",
                session.buyer, session.seller, session.product
            ));
            if let Some(button) = Button::new(
                format!("Force stop buyer {}", session.buyer),
                &Command::ForceStop {
                    buyer: session.buyer,
                },
            ) {
                rows.push(vec![button]);
            }
        }
        self.notify(OutboundMessage::text(sender, lines.join("\n")).with_buttons(rows))
            .await;
    }

    async fn logs_view(&self, sender: ParticipantId) {
        if !self.registry().roles_of(sender).await.admin {
            self.reply(sender, ADMIN_ONLY).await;
            return;
        }
        let tail = self.store().log_tail(self.policy().log_tail).await;
        if tail.is_empty() {
            self.reply(sender, "No completed chats yet.").await;
            return;
        }
        let mut lines = vec![format!("Last {} completed chats:", tail.len())];
        lines.extend(tail.iter().map(format_log_record));
        self.reply(sender, lines.join("\n")).await;
    }

    async fn reply(&self, recipient: ParticipantId, text: impl Into<String>) {
        self.notify(OutboundMessage::text(recipient, text)).await;
    }
}

fn format_log_record(record: &ChatLogRecord) -> String {
    let minutes = (record.ended_at - record.started_at).num_minutes().max(0);
    format!(
        "{} buyer {} / seller {} / {} / {minutes} min",
        record.started_at.format("%Y-%m-%d %H:%M"),
        record.buyer,
        record.seller,
        record.product
    )
}
