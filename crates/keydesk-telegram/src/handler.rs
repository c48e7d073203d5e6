// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound conversion: Telegram updates to channel-agnostic events.
//!
//! Filters by chat type, parses slash commands, and round-trips inline
//! button callback tokens back into broker commands.

use keydesk_core::types::{Command, EventPayload, InboundEvent, ParticipantId};
use teloxide::types::{CallbackQuery, ChatKind, Message};
use tracing::debug;

/// Checks whether the message is from a private (DM) chat.
///
/// Group, supergroup, and channel messages return `false`.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Parses a slash command, with arguments where the command takes them.
///
/// Unknown commands return `None` and are dropped by the caller; they are
/// not forwarded into sessions.
pub fn parse_command(text: &str) -> Option<Command> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?;
    // Accept both `/stop` and `/stop@botname`.
    let head = head.split('@').next()?;

    match head {
        "/start" => Some(Command::Start),
        "/stop" => Some(Command::EndSession),
        "/admin" => Some(Command::AdminPanel),
        "/seller" => Some(Command::SellerPanel),
        "/block" => Some(Command::Block {
            buyer: parts.next()?.parse().ok().map(ParticipantId)?,
        }),
        "/unblock" => Some(Command::Unblock {
            buyer: parts.next()?.parse().ok().map(ParticipantId)?,
        }),
        "/broadcast" => {
            let rest = text.strip_prefix("/broadcast")?.trim();
            if rest.is_empty() {
                return None;
            }
            Some(Command::Broadcast {
                text: rest.to_string(),
            })
        }
        _ => None,
    }
}

/// Converts a Telegram message into an [`InboundEvent`].
///
/// Returns `None` for senderless messages (channel posts), unknown slash
/// commands, and unsupported content types.
pub fn message_to_event(msg: &Message) -> Option<InboundEvent> {
    let sender = ParticipantId(msg.from.as_ref()?.id.0 as i64);

    if let Some(text) = msg.text() {
        let payload = if text.starts_with('/') {
            match parse_command(text) {
                Some(cmd) => EventPayload::Command(cmd),
                None => {
                    debug!(sender = %sender, "ignoring unknown command");
                    return None;
                }
            }
        } else {
            EventPayload::Text(text.to_string())
        };
        return Some(InboundEvent::now(sender, payload));
    }

    if msg.photo().is_some() {
        return Some(InboundEvent::now(
            sender,
            EventPayload::Photo {
                caption: msg.caption().map(str::to_string),
            },
        ));
    }

    debug!(msg_id = msg.id.0, "ignoring unsupported message type");
    None
}

/// Converts an inline button press into an [`InboundEvent`].
///
/// Tokens that do not round-trip through [`Command::from_callback`] are
/// dropped (stale or foreign keyboards).
pub fn callback_to_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let sender = ParticipantId(query.from.id.0 as i64);
    let data = query.data.as_deref()?;
    match Command::from_callback(data) {
        Some(cmd) => Some(InboundEvent::now(sender, EventPayload::Callback(cmd))),
        None => {
            debug!(sender = %sender, data, "ignoring unrecognized callback token");
            None
        }
    }
}
