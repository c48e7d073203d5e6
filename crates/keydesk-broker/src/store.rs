// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session store: pending requests, the active-session bijection,
//! alert toggles, seller statistics, and the chat log.
//!
//! All state lives behind one mutex and is only reachable through whole
//! operations; every multi-index mutation happens inside a single lock
//! acquisition, which is what settles the first-acceptor-wins race and keeps
//! the two session indices symmetric at every externally observable point.
//!
//! Invariants:
//! - a buyer has at most one pending request and at most one session, never
//!   both;
//! - buyer -> session and seller -> buyer form a partial bijection: every session
//!   has exactly one mirrored reverse entry and vice versa.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use keydesk_core::{KeydeskError, ParticipantId};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::{ArbitrationError, LifecycleError};

/// A buyer's outstanding, unclaimed connection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub buyer: ParticipantId,
    pub product: String,
    pub requested_at: DateTime<Utc>,
}

/// One active buyer/seller conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub buyer: ParticipantId,
    pub seller: ParticipantId,
    pub product: String,
    pub started_at: DateTime<Utc>,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Seller-initiated stop.
    Normal,
    /// Administrative force-stop by a third party.
    Forced,
}

/// Which side a termination names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Normal termination: the initiator must be the seller side.
    BySeller(ParticipantId),
    /// Forced termination: an admin names the buyer.
    Forced { buyer: ParticipantId },
}

/// A completed termination, returned to the caller for notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndedSession {
    pub session: Session,
    pub ended_at: DateTime<Utc>,
    pub reason: EndReason,
    /// Whether this end was counted into the seller's statistics.
    pub stats_counted: bool,
}

/// Immutable record of one completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLogRecord {
    pub buyer: ParticipantId,
    pub seller: ParticipantId,
    pub product: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Per-seller completion statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SellerStats {
    pub total_served: u64,
    pub chats_completed: u64,
    /// Served buyers, unique, newest first, capped at ten.
    pub last_10_buyers: Vec<ParticipantId>,
    /// Period counters. Reset policy is external; monotonic here.
    pub today: u64,
    pub month: u64,
}

const LAST_BUYERS_CAP: usize = 10;

impl SellerStats {
    fn record_completion(&mut self, buyer: ParticipantId) {
        self.total_served += 1;
        self.chats_completed += 1;
        self.today += 1;
        self.month += 1;

        if !self.last_10_buyers.contains(&buyer) {
            self.last_10_buyers.insert(0, buyer);
            self.last_10_buyers.truncate(LAST_BUYERS_CAP);
        }
    }
}

/// Where to deliver a routed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Sender is a buyer in session; deliver to their seller.
    ToSeller {
        seller: ParticipantId,
        product: String,
    },
    /// Sender is a seller in session; deliver to their buyer.
    ToBuyer { buyer: ParticipantId },
}

/// Read-only counters for the operator views.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub known_participants: usize,
    pub pending_requests: usize,
    pub active_sessions: Vec<Session>,
    pub chats_completed: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    pending: HashMap<ParticipantId, PendingRequest>,
    /// buyer -> session.
    sessions: HashMap<ParticipantId, Session>,
    /// seller -> buyer, the reverse index.
    reverse: HashMap<ParticipantId, ParticipantId>,
    /// Sellers who turned fan-out alerts off. Absent means enabled.
    alerts_off: BTreeSet<ParticipantId>,
    stats: HashMap<ParticipantId, SellerStats>,
    chat_log: Vec<ChatLogRecord>,
    known: BTreeSet<ParticipantId>,
}

impl StoreState {
    fn symmetric(&self) -> bool {
        self.sessions.len() == self.reverse.len()
            && self.sessions.iter().all(|(buyer, session)| {
                session.buyer == *buyer && self.reverse.get(&session.seller) == Some(buyer)
            })
    }

    fn clear_sessions(&mut self) {
        self.pending.clear();
        self.sessions.clear();
        self.reverse.clear();
    }
}

/// The broker's session store. One mutex, whole operations only.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: Mutex<StoreState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a participant has been seen. The known set is the
    /// broadcast audience.
    pub async fn note_participant(&self, id: ParticipantId) {
        self.state.lock().await.known.insert(id);
    }

    /// The broadcast audience.
    pub async fn known_participants(&self) -> Vec<ParticipantId> {
        self.state.lock().await.known.iter().copied().collect()
    }

    /// Creates a pending request for the buyer.
    ///
    /// Fails without mutation when the buyer already has a session
    /// (`AlreadyConnected`) or an outstanding request (`RequestPending`).
    pub async fn create_pending(
        &self,
        buyer: ParticipantId,
        product: &str,
    ) -> Result<PendingRequest, ArbitrationError> {
        let mut state = self.state.lock().await;

        if state.sessions.contains_key(&buyer) {
            return Err(ArbitrationError::AlreadyConnected);
        }
        if state.pending.contains_key(&buyer) {
            return Err(ArbitrationError::RequestPending);
        }

        let request = PendingRequest {
            buyer,
            product: product.to_string(),
            requested_at: Utc::now(),
        };
        state.pending.insert(buyer, request.clone());
        debug!(buyer = %buyer, product, "pending request created");
        Ok(request)
    }

    /// Claims the buyer's pending request for the acceptor, atomically
    /// replacing it with an active session in both indices.
    ///
    /// This is the first-acceptor-wins critical section: the pending lookup,
    /// the session creation, and the pending deletion all happen under one
    /// lock acquisition. Losers observe `AlreadyClaimed`; an acceptor who is
    /// still in a session of their own observes `AcceptorBusy` (a second
    /// concurrent buyer would break the session bijection).
    pub async fn claim_pending(
        &self,
        acceptor: ParticipantId,
        buyer: ParticipantId,
        product: &str,
    ) -> Result<Session, ArbitrationError> {
        let mut state = self.state.lock().await;

        match state.pending.get(&buyer) {
            // A token naming a different product refers to a request that no
            // longer exists.
            Some(request) if request.product == product => {}
            _ => return Err(ArbitrationError::AlreadyClaimed),
        }
        if state.sessions.contains_key(&buyer) {
            return Err(ArbitrationError::AlreadyClaimed);
        }
        if state.reverse.contains_key(&acceptor) {
            return Err(ArbitrationError::AcceptorBusy);
        }

        state.pending.remove(&buyer);
        let session = Session {
            buyer,
            seller: acceptor,
            product: product.to_string(),
            started_at: Utc::now(),
        };
        state.sessions.insert(buyer, session.clone());
        state.reverse.insert(acceptor, buyer);
        debug_assert!(state.symmetric());

        info!(buyer = %buyer, seller = %acceptor, product, "session started");
        Ok(session)
    }

    /// Ends a session, removing both index entries together, appending
    /// exactly one chat log record, and (when `count_stats`) updating the
    /// seller's statistics. A second end of the same session fails with the
    /// not-found outcome and mutates nothing.
    pub async fn end_session(
        &self,
        end: SessionEnd,
        count_stats: bool,
    ) -> Result<EndedSession, LifecycleError> {
        let mut state = self.state.lock().await;

        let (buyer, reason) = match end {
            SessionEnd::BySeller(seller) => {
                let buyer = *state
                    .reverse
                    .get(&seller)
                    .ok_or(LifecycleError::NoActiveSession)?;
                (buyer, EndReason::Normal)
            }
            SessionEnd::Forced { buyer } => {
                if !state.sessions.contains_key(&buyer) {
                    return Err(LifecycleError::SessionNotFound);
                }
                (buyer, EndReason::Forced)
            }
        };

        let Some(session) = state.sessions.remove(&buyer) else {
            return Err(desync_fault(&mut state, "buyer resolved but session missing"));
        };
        if state.reverse.remove(&session.seller) != Some(buyer) {
            return Err(desync_fault(&mut state, "reverse index disagreed with session"));
        }
        debug_assert!(state.symmetric());

        let ended_at = Utc::now();
        state.chat_log.push(ChatLogRecord {
            buyer: session.buyer,
            seller: session.seller,
            product: session.product.clone(),
            started_at: session.started_at,
            ended_at,
        });

        if count_stats {
            state
                .stats
                .entry(session.seller)
                .or_default()
                .record_completion(session.buyer);
        }

        info!(
            buyer = %session.buyer,
            seller = %session.seller,
            product = %session.product,
            ?reason,
            stats_counted = count_stats,
            "session ended"
        );

        Ok(EndedSession {
            session,
            ended_at,
            reason,
            stats_counted: count_stats,
        })
    }

    /// Flips the seller's fan-out alert toggle; returns the new state.
    pub async fn toggle_alerts(&self, seller: ParticipantId) -> bool {
        let mut state = self.state.lock().await;
        if state.alerts_off.remove(&seller) {
            true
        } else {
            state.alerts_off.insert(seller);
            false
        }
    }

    pub async fn alerts_enabled(&self, seller: ParticipantId) -> bool {
        !self.state.lock().await.alerts_off.contains(&seller)
    }

    /// Retains only the sellers whose alerts are enabled.
    pub async fn filter_alert_enabled(
        &self,
        sellers: impl IntoIterator<Item = ParticipantId>,
    ) -> Vec<ParticipantId> {
        let state = self.state.lock().await;
        sellers
            .into_iter()
            .filter(|id| !state.alerts_off.contains(id))
            .collect()
    }

    /// Resolves where a sender's text should be delivered, if anywhere.
    pub async fn route_target(&self, sender: ParticipantId) -> Option<RouteTarget> {
        let state = self.state.lock().await;
        if let Some(session) = state.sessions.get(&sender) {
            return Some(RouteTarget::ToSeller {
                seller: session.seller,
                product: session.product.clone(),
            });
        }
        state
            .reverse
            .get(&sender)
            .map(|buyer| RouteTarget::ToBuyer { buyer: *buyer })
    }

    pub async fn session_for_buyer(&self, buyer: ParticipantId) -> Option<Session> {
        self.state.lock().await.sessions.get(&buyer).cloned()
    }

    pub async fn session_for_seller(&self, seller: ParticipantId) -> Option<Session> {
        let state = self.state.lock().await;
        let buyer = state.reverse.get(&seller)?;
        state.sessions.get(buyer).cloned()
    }

    pub async fn pending_for_buyer(&self, buyer: ParticipantId) -> Option<PendingRequest> {
        self.state.lock().await.pending.get(&buyer).cloned()
    }

    /// The seller's statistics (zeroed if the seller never completed a chat).
    pub async fn stats_for(&self, seller: ParticipantId) -> SellerStats {
        self.state
            .lock()
            .await
            .stats
            .get(&seller)
            .cloned()
            .unwrap_or_default()
    }

    /// Counters and the active-session listing for operator views.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.lock().await;
        let mut active: Vec<Session> = state.sessions.values().cloned().collect();
        active.sort_by_key(|s| s.started_at);
        StoreSnapshot {
            known_participants: state.known.len(),
            pending_requests: state.pending.len(),
            active_sessions: active,
            chats_completed: state.chat_log.len(),
        }
    }

    /// The most recent `n` chat log records, newest last.
    pub async fn log_tail(&self, n: usize) -> Vec<ChatLogRecord> {
        let state = self.state.lock().await;
        let skip = state.chat_log.len().saturating_sub(n);
        state.chat_log[skip..].to_vec()
    }

    /// Audits the pending/session exclusivity and the index bijection.
    pub async fn verify_consistency(&self) -> Result<(), KeydeskError> {
        let state = self.state.lock().await;
        if !state.symmetric() {
            return Err(KeydeskError::Internal(
                "session indices are not a bijection".into(),
            ));
        }
        if let Some(buyer) = state.pending.keys().find(|b| state.sessions.contains_key(b)) {
            return Err(KeydeskError::Internal(format!(
                "buyer {buyer} is both pending and in session"
            )));
        }
        Ok(())
    }
}

/// Index desync is unreachable by construction. If it is observed anyway the
/// store is no longer trustworthy: log at error level, reset the session
/// tables, and report the session gone.
fn desync_fault(state: &mut StoreState, detail: &str) -> LifecycleError {
    error!(detail, "session index desync, resetting session store");
    metrics::counter!("keydesk_store_faults").increment(1);
    state.clear_sessions();
    LifecycleError::SessionNotFound
}
