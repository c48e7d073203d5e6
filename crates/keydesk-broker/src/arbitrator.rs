// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request arbitration: connection requests, seller fan-out, and the
//! first-acceptor-wins claim.

use keydesk_core::{Button, Command, OutboundMessage, ParticipantId};
use tracing::{debug, info};

use crate::Broker;
use crate::broadcast::{DeliveryReport, broadcast};
use crate::error::ArbitrationError;
use crate::store::Session;

impl Broker {
    /// Creates a pending request for the buyer and fans it out to every
    /// eligible seller with alerts enabled.
    ///
    /// Preconditions are checked in order and each failure returns a distinct
    /// error with no mutation: blocked buyer (admins bypass the blocklist),
    /// buy toggle off, unknown or seller-less product, buyer already in a
    /// session, buyer already pending.
    ///
    /// Fan-out is best-effort: per-seller delivery failure is logged, never
    /// rolled back. The request stands even when zero alerts get through,
    /// matching the buyer's observed "pending" state.
    pub async fn request_connection(
        &self,
        buyer: ParticipantId,
        product_name: &str,
    ) -> Result<DeliveryReport, ArbitrationError> {
        let roles = self.registry().roles_of(buyer).await;
        if !roles.admin && self.registry().is_blocked(buyer).await {
            return Err(ArbitrationError::Blocked);
        }
        if !self.registry().buy_enabled().await {
            return Err(ArbitrationError::Disabled);
        }
        let product = self
            .registry()
            .product(product_name)
            .await
            .ok_or(ArbitrationError::ProductUnavailable)?;
        if product.sellers.is_empty() {
            return Err(ArbitrationError::ProductUnavailable);
        }

        self.store().create_pending(buyer, product_name).await?;
        metrics::counter!("keydesk_requests_created").increment(1);

        let recipients = self
            .store()
            .filter_alert_enabled(product.sellers.iter().copied())
            .await;

        let accept = Command::Accept {
            buyer,
            product: product_name.to_string(),
        };
        let alerts: Vec<OutboundMessage> = recipients
            .iter()
            .map(|seller| {
                let mut msg = OutboundMessage::text(
                    *seller,
                    format!(
                        "New connection request\nProduct: {product_name}\nBuyer: {buyer}\n\n\
                         Press Accept to take this customer."
                    ),
                );
                if let Some(button) = Button::new("Accept request", &accept) {
                    msg = msg.with_buttons(vec![vec![button]]);
                }
                msg
            })
            .collect();

        let report = broadcast(self.channel(), alerts).await;
        info!(
            buyer = %buyer,
            product = product_name,
            delivered = report.delivered,
            failed = report.failed,
            "request fanned out"
        );
        Ok(report)
    }

    /// Claims the buyer's pending request for the acceptor.
    ///
    /// Authorization requires the admin capability; sellers receive the
    /// fan-out alert but cannot accept. Exactly one concurrent acceptor
    /// succeeds; the rest observe [`ArbitrationError::AlreadyClaimed`]. Both
    /// parties are notified best-effort after the state commit.
    pub async fn accept_connection(
        &self,
        acceptor: ParticipantId,
        buyer: ParticipantId,
        product: &str,
    ) -> Result<Session, ArbitrationError> {
        if !self.registry().roles_of(acceptor).await.can_accept() {
            debug!(acceptor = %acceptor, "accept denied: not authorized");
            return Err(ArbitrationError::NotAuthorized);
        }

        let session = self.store().claim_pending(acceptor, buyer, product).await?;
        metrics::counter!("keydesk_sessions_started").increment(1);

        self.notify(OutboundMessage::text(
            buyer,
            format!(
                "Connection successful. Seller {acceptor} accepted your request for {product}.\n\
                 Send your messages here; the seller will end the chat when done."
            ),
        ))
        .await;
        self.notify(OutboundMessage::text(
            acceptor,
            format!(
                "Connection started. Product: {product}, buyer: {buyer}.\n\
                 Send messages normally; use /stop to end the conversation."
            ),
        ))
        .await;

        Ok(session)
    }
}
