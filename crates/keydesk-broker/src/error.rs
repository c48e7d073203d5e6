// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain outcome types for arbitration and session lifecycle.
//!
//! These are expected user-facing results, not faults: every variant maps to
//! a human-readable reply and none of them is logged at error level.

use thiserror::Error;

/// Outcomes of `request_connection` and `accept_connection` that deny the
/// operation. No variant leaves any broker state modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArbitrationError {
    /// The buyer is on the blocklist.
    #[error("you have been blocked from using this service")]
    Blocked,

    /// The global buy toggle is off.
    #[error("the buy feature is currently disabled, please try again later")]
    Disabled,

    /// The product does not exist or has no authorized sellers.
    #[error("this product is currently unavailable")]
    ProductUnavailable,

    /// The buyer already has an active session.
    #[error("you are already connected to a seller")]
    AlreadyConnected,

    /// The buyer already has an outstanding request. There is no cancel or
    /// expiry; the request stands until an acceptor claims it.
    #[error("you already have a pending request, please wait for a seller to accept")]
    RequestPending,

    /// Another acceptor won the race for this request.
    #[error("another seller has already accepted this request")]
    AlreadyClaimed,

    /// The acceptor is still in a session of their own. Accepting would give
    /// the seller two concurrent buyers and break the session bijection.
    #[error("end your current conversation before accepting a new request")]
    AcceptorBusy,

    /// The sender does not hold the capability this operation requires.
    #[error("you are not allowed to accept requests")]
    NotAuthorized,
}

/// Outcomes of `end_session` and `force_stop` that deny the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The initiator has no session on the seller side of the index.
    #[error("you don't have an active conversation to stop")]
    NoActiveSession,

    /// The named buyer has no session to force-stop.
    #[error("session not found")]
    SessionNotFound,

    /// The sender does not hold the admin capability.
    #[error("you are not allowed to force-stop sessions")]
    NotAuthorized,
}
