// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session termination: seller-initiated stop and administrative force-stop.
//!
//! Both paths share the store's atomic removal: the two index entries go
//! together, exactly one chat log record is appended, and only then are the
//! parties notified. Notification failure never rolls the termination back.

use keydesk_core::{OutboundMessage, ParticipantId};

use crate::Broker;
use crate::error::LifecycleError;
use crate::store::{EndedSession, SessionEnd};

impl Broker {
    /// Ends the initiator's session from the seller side.
    ///
    /// Only the seller half of the pair can stop normally; a participant
    /// with no reverse-index entry gets `NoActiveSession`. The seller's
    /// statistics always count a normal end.
    pub async fn end_session(
        &self,
        seller: ParticipantId,
    ) -> Result<EndedSession, LifecycleError> {
        let ended = self
            .store()
            .end_session(SessionEnd::BySeller(seller), true)
            .await?;
        metrics::counter!("keydesk_sessions_ended", "reason" => "normal").increment(1);

        self.notify(OutboundMessage::text(
            ended.session.buyer,
            "The seller has ended the conversation. If you still need help, \
             start a new request from the product menu.",
        ))
        .await;
        self.notify(OutboundMessage::text(
            seller,
            format!(
                "Conversation stopped. Product: {}, buyer: {}.",
                ended.session.product, ended.session.buyer
            ),
        ))
        .await;

        Ok(ended)
    }

    /// Administratively tears down the named buyer's session.
    ///
    /// The initiator must hold the admin capability and need not be a party
    /// to the session. Whether the seller's statistics count a forced end is
    /// a policy decision (`forced_stop_counts_stats`, default off).
    pub async fn force_stop(
        &self,
        admin: ParticipantId,
        buyer: ParticipantId,
    ) -> Result<EndedSession, LifecycleError> {
        if !self.registry().roles_of(admin).await.admin {
            return Err(LifecycleError::NotAuthorized);
        }

        let ended = self
            .store()
            .end_session(
                SessionEnd::Forced { buyer },
                self.policy().forced_stop_counts_stats,
            )
            .await?;
        metrics::counter!("keydesk_sessions_ended", "reason" => "forced").increment(1);

        self.notify(OutboundMessage::text(
            ended.session.buyer,
            "Your session was ended by an administrator.",
        ))
        .await;
        self.notify(OutboundMessage::text(
            ended.session.seller,
            format!(
                "Your session with buyer {} was ended by an administrator.",
                ended.session.buyer
            ),
        ))
        .await;

        Ok(ended)
    }
}
