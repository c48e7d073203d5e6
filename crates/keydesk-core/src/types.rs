// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared between the broker core and channel adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque numeric identity of a chat participant (buyer, seller, or admin).
///
/// Roles are not part of the identity; they are resolved by registry lookup.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ParticipantId(pub i64);

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ParticipantId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(ParticipantId)
    }
}

impl From<i64> for ParticipantId {
    fn from(id: i64) -> Self {
        ParticipantId(id)
    }
}

/// Transport-assigned identifier for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by channel adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Classifies the payload of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum EventKind {
    Command,
    Text,
    Callback,
    Photo,
}

/// A command recognized by the broker, whether typed (`/start`, `/stop`) or
/// carried by an inline button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the entry menu for the sender's role.
    Start,
    /// Open the product selection menu.
    Buy,
    /// Show one product's details and its connect button.
    ShowProduct { product: String },
    /// Create a pending connection request and fan out to eligible sellers.
    RequestConnection { product: String },
    /// Claim a pending request. First acceptor wins.
    Accept { buyer: ParticipantId, product: String },
    /// End the sender's active session (seller side).
    EndSession,
    /// Administratively tear down the named buyer's session.
    ForceStop { buyer: ParticipantId },
    /// Flip the sender's fan-out alert toggle.
    ToggleAlerts,
    /// Open the admin panel.
    AdminPanel,
    /// Open the seller panel.
    SellerPanel,
    /// Forbid a buyer from creating new requests.
    Block { buyer: ParticipantId },
    /// Lift a block.
    Unblock { buyer: ParticipantId },
    /// Re-enable new request creation globally.
    EnableBuy,
    /// Disable new request creation globally.
    DisableBuy,
    /// Best-effort message to every known participant.
    Broadcast { text: String },
    /// The sender's own seller statistics.
    MyStats,
    /// Products the sender is authorized to fulfill.
    MyProducts,
    /// Global counters: participants, blocked, active, pending, completed.
    GlobalStats,
    /// Active session listing.
    Sessions,
    /// Recent chat log tail.
    Logs,
}

impl Command {
    /// Encodes this command as a callback token for an inline button, or
    /// `None` for commands that are never button-originated.
    ///
    /// Tokens are colon-separated and must round-trip through
    /// [`Command::from_callback`]; product names therefore must not contain
    /// a colon (enforced by config validation).
    pub fn to_callback(&self) -> Option<String> {
        match self {
            Command::Buy => Some("buy".into()),
            Command::ShowProduct { product } => Some(format!("product:{product}")),
            Command::RequestConnection { product } => Some(format!("connect:{product}")),
            Command::Accept { buyer, product } => Some(format!("accept:{buyer}:{product}")),
            Command::EndSession => Some("end_chat".into()),
            Command::ForceStop { buyer } => Some(format!("force_stop:{buyer}")),
            Command::ToggleAlerts => Some("toggle_alerts".into()),
            Command::AdminPanel => Some("admin_panel".into()),
            Command::SellerPanel => Some("seller_panel".into()),
            Command::EnableBuy => Some("enable_buy".into()),
            Command::DisableBuy => Some("disable_buy".into()),
            Command::MyStats => Some("my_stats".into()),
            Command::MyProducts => Some("my_products".into()),
            Command::GlobalStats => Some("global_stats".into()),
            Command::Sessions => Some("sessions".into()),
            Command::Logs => Some("logs".into()),
            _ => None,
        }
    }

    /// Decodes a callback token produced by [`Command::to_callback`].
    pub fn from_callback(data: &str) -> Option<Command> {
        match data {
            "buy" => return Some(Command::Buy),
            "end_chat" => return Some(Command::EndSession),
            "toggle_alerts" => return Some(Command::ToggleAlerts),
            "admin_panel" => return Some(Command::AdminPanel),
            "seller_panel" => return Some(Command::SellerPanel),
            "enable_buy" => return Some(Command::EnableBuy),
            "disable_buy" => return Some(Command::DisableBuy),
            "my_stats" => return Some(Command::MyStats),
            "my_products" => return Some(Command::MyProducts),
            "global_stats" => return Some(Command::GlobalStats),
            "sessions" => return Some(Command::Sessions),
            "logs" => return Some(Command::Logs),
            _ => {}
        }

        let (head, rest) = data.split_once(':')?;
        match head {
            "product" => Some(Command::ShowProduct {
                product: rest.to_string(),
            }),
            "connect" => Some(Command::RequestConnection {
                product: rest.to_string(),
            }),
            "accept" => {
                let (buyer, product) = rest.split_once(':')?;
                Some(Command::Accept {
                    buyer: buyer.parse().ok()?,
                    product: product.to_string(),
                })
            }
            "force_stop" => Some(Command::ForceStop {
                buyer: rest.parse().ok()?,
            }),
            _ => None,
        }
    }
}

/// Payload of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// A typed command (`/start`, `/stop`, ...).
    Command(Command),
    /// A command carried by an inline button press.
    Callback(Command),
    /// Free text, routed to the sender's session counterpart if any.
    Text(String),
    /// A photo; the broker only sees the caption, if present.
    Photo { caption: Option<String> },
}

impl EventPayload {
    /// The kind tag for this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Command(_) => EventKind::Command,
            EventPayload::Callback(_) => EventKind::Callback,
            EventPayload::Text(_) => EventKind::Text,
            EventPayload::Photo { .. } => EventKind::Photo,
        }
    }
}

/// An inbound event delivered by a channel adapter.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub sender: ParticipantId,
    pub payload: EventPayload,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    /// Builds an event stamped with the current time.
    pub fn now(sender: ParticipantId, payload: EventPayload) -> Self {
        Self {
            sender,
            payload,
            received_at: Utc::now(),
        }
    }
}

/// An inline button attached to an outbound message.
///
/// `data` is a callback token (see [`Command::to_callback`]); the adapter
/// round-trips it verbatim when the button is pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, command: &Command) -> Option<Self> {
        Some(Self {
            label: label.into(),
            data: command.to_callback()?,
        })
    }
}

/// An outbound message to be delivered best-effort by a channel adapter.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub recipient: ParticipantId,
    pub text: String,
    /// Image reference (a path or transport file id), sent alongside the
    /// text when the channel supports it.
    pub image: Option<String>,
    /// Button rows, rendered as an inline keyboard when supported.
    pub buttons: Vec<Vec<Button>>,
}

impl OutboundMessage {
    /// A plain text message with no image or buttons.
    pub fn text(recipient: ParticipantId, text: impl Into<String>) -> Self {
        Self {
            recipient,
            text: text.into(),
            image: None,
            buttons: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone)]
pub struct ChannelCapabilities {
    pub supports_images: bool,
    pub supports_buttons: bool,
    pub max_message_length: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn participant_id_roundtrips_through_display() {
        let id = ParticipantId(6170236685);
        let parsed = ParticipantId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn participant_id_serde_is_transparent_number() {
        let json = serde_json::to_string(&ParticipantId(42)).unwrap();
        assert_eq!(json, "42");
        let back: ParticipantId = serde_json::from_str("42").unwrap();
        assert_eq!(back, ParticipantId(42));
    }

    #[test]
    fn event_kind_display_roundtrip() {
        for kind in [
            EventKind::Command,
            EventKind::Text,
            EventKind::Callback,
            EventKind::Photo,
        ] {
            let parsed = EventKind::from_str(&kind.to_string()).unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn accept_callback_roundtrip() {
        let cmd = Command::Accept {
            buyer: ParticipantId(123456),
            product: "KOS-8BP".to_string(),
        };
        let token = cmd.to_callback().unwrap();
        assert_eq!(token, "accept:123456:KOS-8BP");
        assert_eq!(Command::from_callback(&token).unwrap(), cmd);
    }

    #[test]
    fn every_button_command_roundtrips() {
        let commands = vec![
            Command::Buy,
            Command::ShowProduct { product: "P".into() },
            Command::RequestConnection { product: "P".into() },
            Command::Accept { buyer: ParticipantId(7), product: "P".into() },
            Command::EndSession,
            Command::ForceStop { buyer: ParticipantId(9) },
            Command::ToggleAlerts,
            Command::AdminPanel,
            Command::SellerPanel,
            Command::EnableBuy,
            Command::DisableBuy,
            Command::MyStats,
            Command::MyProducts,
            Command::GlobalStats,
            Command::Sessions,
            Command::Logs,
        ];
        for cmd in commands {
            let token = cmd.to_callback().unwrap();
            assert_eq!(Command::from_callback(&token), Some(cmd));
        }
    }

    #[test]
    fn malformed_callbacks_are_rejected() {
        assert_eq!(Command::from_callback(""), None);
        assert_eq!(Command::from_callback("accept:notanumber:P"), None);
        assert_eq!(Command::from_callback("accept:12"), None);
        assert_eq!(Command::from_callback("unknown:12"), None);
    }

    #[test]
    fn text_commands_have_no_callback_token() {
        assert_eq!(Command::Start.to_callback(), None);
        assert_eq!(
            Command::Broadcast { text: "hi".into() }.to_callback(),
            None
        );
        assert_eq!(
            Command::Block { buyer: ParticipantId(1) }.to_callback(),
            None
        );
    }

    #[test]
    fn payload_kind_tags() {
        assert_eq!(
            EventPayload::Command(Command::Start).kind(),
            EventKind::Command
        );
        assert_eq!(EventPayload::Text("hi".into()).kind(), EventKind::Text);
        assert_eq!(
            EventPayload::Callback(Command::Buy).kind(),
            EventKind::Callback
        );
        assert_eq!(
            EventPayload::Photo { caption: None }.kind(),
            EventKind::Photo
        );
    }
}
