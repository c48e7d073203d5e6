// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the event dispatcher: command handling, role
//! gating, menus, and operator views.

use keydesk_core::{Command, EventPayload, InboundEvent, ParticipantId};
use keydesk_test_utils::BrokerHarness;

const ADMIN: i64 = 1;
const SELLER: i64 = 21;
const BUYER: i64 = 100;
const PRODUCT: &str = "KOS-8BP";

fn harness() -> BrokerHarness {
    BrokerHarness::builder()
        .with_admin(ADMIN)
        .with_seller(SELLER)
        .with_product(PRODUCT, &[ADMIN, SELLER])
        .build()
}

async fn send_command(harness: &BrokerHarness, sender: i64, cmd: Command) {
    harness
        .broker
        .handle_event(InboundEvent::now(
            ParticipantId(sender),
            EventPayload::Command(cmd),
        ))
        .await;
}

async fn send_callback(harness: &BrokerHarness, sender: i64, data: &str) {
    let cmd = Command::from_callback(data).expect("valid callback token");
    harness
        .broker
        .handle_event(InboundEvent::now(
            ParticipantId(sender),
            EventPayload::Callback(cmd),
        ))
        .await;
}

#[tokio::test]
async fn start_shows_buy_button_to_plain_buyer() {
    let h = harness();
    send_command(&h, BUYER, Command::Start).await;

    let sent = h.channel.sent_to(h.id(BUYER)).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].buttons.len(), 1);
    assert_eq!(sent[0].buttons[0][0].data, "buy");
}

#[tokio::test]
async fn start_shows_panels_to_admin() {
    let h = harness();
    send_command(&h, ADMIN, Command::Start).await;

    let sent = h.channel.sent_to(h.id(ADMIN)).await;
    assert_eq!(sent.len(), 1);
    let row: Vec<&str> = sent[0].buttons[0].iter().map(|b| b.data.as_str()).collect();
    assert_eq!(row, vec!["admin_panel", "seller_panel"]);
}

#[tokio::test]
async fn start_warns_participant_in_session() {
    let h = harness();
    let buyer = h.id(BUYER);
    h.broker.request_connection(buyer, PRODUCT).await.unwrap();
    h.broker
        .accept_connection(h.id(ADMIN), buyer, PRODUCT)
        .await
        .unwrap();
    h.channel.clear_sent().await;

    send_command(&h, BUYER, Command::Start).await;
    let sent = h.channel.sent_to(buyer).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("Active session detected"));
}

#[tokio::test]
async fn blocked_buyer_sees_denial_on_start_and_buy() {
    let h = harness();
    h.registry.block(h.id(BUYER)).await;

    send_command(&h, BUYER, Command::Start).await;
    send_command(&h, BUYER, Command::Buy).await;

    let sent = h.channel.sent_to(h.id(BUYER)).await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|m| m.text.contains("blocked")));
}

#[tokio::test]
async fn buy_lists_every_product_even_unavailable() {
    let h = BrokerHarness::builder()
        .with_admin(ADMIN)
        .with_product(PRODUCT, &[ADMIN])
        .with_product("ORPHAN", &[])
        .build();

    send_command(&h, BUYER, Command::Buy).await;
    let sent = h.channel.sent_to(h.id(BUYER)).await;
    assert_eq!(sent.len(), 1);
    // One row per product, empty seller set included.
    assert_eq!(sent[0].buttons.len(), 2);

    // But the seller-less product cannot be requested.
    h.channel.clear_sent().await;
    send_callback(&h, BUYER, "product:ORPHAN").await;
    let sent = h.channel.sent_to(h.id(BUYER)).await;
    assert!(sent[0].text.contains("unavailable"));
}

#[tokio::test]
async fn full_purchase_flow_via_callbacks() {
    let h = harness();

    // Buyer: menu -> product details -> connect.
    send_callback(&h, BUYER, "buy").await;
    send_callback(&h, BUYER, &format!("product:{PRODUCT}")).await;
    send_callback(&h, BUYER, &format!("connect:{PRODUCT}")).await;

    // The fan-out alert to the admin carries a round-trippable accept token.
    let alerts = h.channel.sent_to(h.id(ADMIN)).await;
    let accept_token = &alerts.last().unwrap().buttons[0][0].data;
    assert_eq!(accept_token, &format!("accept:{BUYER}:{PRODUCT}"));

    // Admin presses accept; a session exists and both sides are connected.
    send_callback(&h, ADMIN, accept_token).await;
    let session = h
        .broker
        .store()
        .session_for_buyer(h.id(BUYER))
        .await
        .unwrap();
    assert_eq!(session.seller, h.id(ADMIN));

    // Buyer text reaches the admin through plain event dispatch.
    h.channel.clear_sent().await;
    h.broker
        .handle_event(InboundEvent::now(
            h.id(BUYER),
            EventPayload::Text("payment sent".into()),
        ))
        .await;
    let forwarded = h.channel.sent_to(h.id(ADMIN)).await;
    assert_eq!(forwarded.len(), 1);
    assert!(forwarded[0].text.contains("payment sent"));

    // /stop from the admin tears the session down.
    send_command(&h, ADMIN, Command::EndSession).await;
    assert!(h.broker.store().session_for_buyer(h.id(BUYER)).await.is_none());
}

#[tokio::test]
async fn seller_cannot_accept_via_callback() {
    let h = harness();
    h.broker
        .request_connection(h.id(BUYER), PRODUCT)
        .await
        .unwrap();
    h.channel.clear_sent().await;

    send_callback(&h, SELLER, &format!("accept:{BUYER}:{PRODUCT}")).await;
    let sent = h.channel.sent_to(h.id(SELLER)).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("not allowed"));
    assert!(h.broker.store().pending_for_buyer(h.id(BUYER)).await.is_some());
}

#[tokio::test]
async fn admin_commands_are_role_gated() {
    let h = harness();
    for cmd in [
        Command::Block { buyer: ParticipantId(5) },
        Command::Unblock { buyer: ParticipantId(5) },
        Command::DisableBuy,
        Command::Broadcast { text: "hi".into() },
        Command::GlobalStats,
        Command::Sessions,
        Command::Logs,
        Command::AdminPanel,
    ] {
        send_command(&h, BUYER, cmd).await;
    }

    let sent = h.channel.sent_to(h.id(BUYER)).await;
    assert_eq!(sent.len(), 8);
    assert!(sent.iter().all(|m| m.text.contains("admin access")));
}

#[tokio::test]
async fn seller_commands_are_role_gated() {
    let h = harness();
    for cmd in [
        Command::ToggleAlerts,
        Command::MyStats,
        Command::MyProducts,
        Command::SellerPanel,
    ] {
        send_command(&h, BUYER, cmd).await;
    }

    let sent = h.channel.sent_to(h.id(BUYER)).await;
    assert_eq!(sent.len(), 4);
    assert!(sent.iter().all(|m| m.text.contains("seller access")));
}

#[tokio::test]
async fn block_and_unblock_flow() {
    let h = harness();
    send_command(&h, ADMIN, Command::Block { buyer: ParticipantId(BUYER) }).await;
    assert!(h.registry.is_blocked(h.id(BUYER)).await);

    assert_eq!(
        h.broker.request_connection(h.id(BUYER), PRODUCT).await,
        Err(keydesk_broker::ArbitrationError::Blocked)
    );

    send_command(&h, ADMIN, Command::Unblock { buyer: ParticipantId(BUYER) }).await;
    assert!(!h.registry.is_blocked(h.id(BUYER)).await);
    assert!(h.broker.request_connection(h.id(BUYER), PRODUCT).await.is_ok());
}

#[tokio::test]
async fn disable_enable_buy_flow() {
    let h = harness();
    send_command(&h, ADMIN, Command::DisableBuy).await;
    assert!(!h.registry.buy_enabled().await);
    assert_eq!(
        h.broker.request_connection(h.id(BUYER), PRODUCT).await,
        Err(keydesk_broker::ArbitrationError::Disabled)
    );

    send_command(&h, ADMIN, Command::EnableBuy).await;
    assert!(h.registry.buy_enabled().await);
}

#[tokio::test]
async fn broadcast_reports_tally_and_skips_sender() {
    let h = harness();
    // Three participants become known by sending anything.
    for id in [BUYER, 101, 102] {
        h.broker
            .handle_event(InboundEvent::now(
                ParticipantId(id),
                EventPayload::Text("hello".into()),
            ))
            .await;
    }
    h.channel.set_unreachable(h.id(102)).await;
    h.channel.clear_sent().await;

    send_command(&h, ADMIN, Command::Broadcast { text: "maintenance at noon".into() }).await;

    // Two delivered (buyer + 101), one failed (102), admin got the tally.
    assert_eq!(h.channel.sent_to(h.id(BUYER)).await.len(), 1);
    assert_eq!(h.channel.sent_to(h.id(101)).await.len(), 1);
    assert!(h.channel.sent_to(h.id(102)).await.is_empty());
    let tally = h.channel.sent_to(h.id(ADMIN)).await;
    assert_eq!(tally.len(), 1);
    assert!(tally[0].text.contains("2 delivered"));
    assert!(tally[0].text.contains("1 failed"));
}

#[tokio::test]
async fn toggle_alerts_replies_with_state() {
    let h = harness();
    send_command(&h, SELLER, Command::ToggleAlerts).await;
    send_command(&h, SELLER, Command::ToggleAlerts).await;

    let sent = h.channel.sent_to(h.id(SELLER)).await;
    assert!(sent[0].text.contains("disabled"));
    assert!(sent[1].text.contains("enabled"));
}

#[tokio::test]
async fn my_stats_and_products_views() {
    let h = harness();
    send_command(&h, SELLER, Command::MyStats).await;
    send_command(&h, SELLER, Command::MyProducts).await;

    let sent = h.channel.sent_to(h.id(SELLER)).await;
    assert!(sent[0].text.contains("Chats completed: 0"));
    assert!(sent[0].text.contains("Recent buyers: none"));
    assert!(sent[1].text.contains(PRODUCT));
}

#[tokio::test]
async fn global_stats_view_reflects_store() {
    let h = harness();
    h.broker.request_connection(h.id(BUYER), PRODUCT).await.unwrap();
    h.registry.block(h.id(500)).await;
    h.channel.clear_sent().await;

    send_command(&h, ADMIN, Command::GlobalStats).await;
    let sent = h.channel.sent_to(h.id(ADMIN)).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("Pending requests: 1"));
    assert!(sent[0].text.contains("Blocked buyers: 1"));
    assert!(sent[0].text.contains("Buying: enabled"));
}

#[tokio::test]
async fn sessions_view_offers_force_stop_buttons() {
    let h = harness();
    let buyer = h.id(BUYER);
    h.broker.request_connection(buyer, PRODUCT).await.unwrap();
    h.broker.accept_connection(h.id(ADMIN), buyer, PRODUCT).await.unwrap();
    h.channel.clear_sent().await;

    send_command(&h, ADMIN, Command::Sessions).await;
    let sent = h.channel.sent_to(h.id(ADMIN)).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains(&format!("buyer {BUYER}")));
    let token = &sent[0].buttons[0][0].data;
    assert_eq!(token, &format!("force_stop:{BUYER}"));

    // Pressing the button tears the session down.
    send_callback(&h, ADMIN, token).await;
    assert!(h.broker.store().session_for_buyer(buyer).await.is_none());
}

#[tokio::test]
async fn sessions_view_empty_message() {
    let h = harness();
    send_command(&h, ADMIN, Command::Sessions).await;
    let sent = h.channel.sent_to(h.id(ADMIN)).await;
    assert!(sent[0].text.contains("no active conversations"));
}

#[tokio::test]
async fn logs_view_shows_completed_chats() {
    let h = harness();
    let buyer = h.id(BUYER);
    h.broker.request_connection(buyer, PRODUCT).await.unwrap();
    h.broker.accept_connection(h.id(ADMIN), buyer, PRODUCT).await.unwrap();
    h.broker.end_session(h.id(ADMIN)).await.unwrap();
    h.channel.clear_sent().await;

    send_command(&h, ADMIN, Command::Logs).await;
    let sent = h.channel.sent_to(h.id(ADMIN)).await;
    assert!(sent[0].text.contains("Last 1 completed chats"));
    assert!(sent[0].text.contains(PRODUCT));
}

#[tokio::test]
async fn photos_are_dropped() {
    let h = harness();
    let buyer = h.id(BUYER);
    h.broker.request_connection(buyer, PRODUCT).await.unwrap();
    h.broker.accept_connection(h.id(ADMIN), buyer, PRODUCT).await.unwrap();
    h.channel.clear_sent().await;

    h.broker
        .handle_event(InboundEvent::now(
            buyer,
            EventPayload::Photo { caption: Some("receipt".into()) },
        ))
        .await;
    assert_eq!(h.channel.sent_count().await, 0);
}

#[tokio::test]
async fn every_sender_joins_broadcast_audience() {
    let h = harness();
    h.broker
        .handle_event(InboundEvent::now(h.id(777), EventPayload::Text("hi".into())))
        .await;
    let known = h.broker.store().known_participants().await;
    assert!(known.contains(&h.id(777)));
}
