// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-session text forwarding between a buyer and their seller.

use keydesk_core::{OutboundMessage, ParticipantId};
use tracing::debug;

use crate::Broker;
use crate::store::RouteTarget;

/// What happened to a routed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Sender is a buyer in session; the text reached their seller.
    ForwardedToSeller(ParticipantId),
    /// Sender is a seller in session; the text reached their buyer.
    ForwardedToBuyer(ParticipantId),
    /// The counterpart was unreachable; the sender was told so.
    DeliveryFailed(ParticipantId),
    /// Sender is in no session; the text was dropped.
    NotInSession,
}

impl Broker {
    /// Forwards a text to the sender's session counterpart.
    ///
    /// Buyer texts are annotated with the buyer's identity and product so
    /// the seller can tell concurrent-looking customers apart; seller texts
    /// carry the seller identity. A sender outside any session is a no-op.
    /// Delivery failure is reported back to the sender as a soft failure and
    /// never retried.
    pub async fn route_text(&self, sender: ParticipantId, text: &str) -> RouteOutcome {
        match self.store().route_target(sender).await {
            Some(RouteTarget::ToSeller { seller, product }) => {
                let forwarded = OutboundMessage::text(
                    seller,
                    format!("Message from buyer {sender} ({product}):\n{text}"),
                );
                if self.notify(forwarded).await {
                    RouteOutcome::ForwardedToSeller(seller)
                } else {
                    self.report_delivery_failure(sender).await;
                    RouteOutcome::DeliveryFailed(seller)
                }
            }
            Some(RouteTarget::ToBuyer { buyer }) => {
                let forwarded =
                    OutboundMessage::text(buyer, format!("Message from seller {sender}:\n{text}"));
                if self.notify(forwarded).await {
                    RouteOutcome::ForwardedToBuyer(buyer)
                } else {
                    self.report_delivery_failure(sender).await;
                    RouteOutcome::DeliveryFailed(buyer)
                }
            }
            None => {
                debug!(sender = %sender, "text from participant with no session dropped");
                RouteOutcome::NotInSession
            }
        }
    }

    async fn report_delivery_failure(&self, sender: ParticipantId) {
        self.notify(OutboundMessage::text(
            sender,
            "Your message could not be delivered. The other side may have \
             blocked the bot; the conversation is still active.",
        ))
        .await;
    }
}
