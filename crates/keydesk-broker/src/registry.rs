// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Participant roles, product catalog, blocklist, and the global buy toggle.
//!
//! The registry is constructed once from configuration and injected into the
//! broker; nothing else holds mutable registry state. Role membership is
//! resolved into a [`Roles`] capability set per lookup instead of scattering
//! list scans across handlers.

use std::collections::{BTreeMap, BTreeSet};

use keydesk_config::model::RegistryConfig;
use keydesk_core::ParticipantId;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::ArbitrationError;

/// Capability set of one participant.
///
/// Roles are not mutually exclusive; the admin capability implies seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Roles {
    pub admin: bool,
    pub seller: bool,
}

impl Roles {
    /// Whether this participant may claim pending requests. Deliberately
    /// admin-only: plain sellers receive fan-out alerts but cannot accept.
    pub fn can_accept(&self) -> bool {
        self.admin
    }

    /// Plain buyer with no elevated capability.
    pub fn is_plain_buyer(&self) -> bool {
        !self.admin && !self.seller
    }
}

/// One product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    /// Sellers authorized to fulfill this product. Empty means listable but
    /// unavailable for new requests.
    pub sellers: BTreeSet<ParticipantId>,
}

#[derive(Debug, Default)]
struct RegistryState {
    admins: BTreeSet<ParticipantId>,
    sellers: BTreeSet<ParticipantId>,
    products: BTreeMap<String, Product>,
    blocked: BTreeSet<ParticipantId>,
    buy_enabled: bool,
}

/// Allow-lists and catalog behind one lock.
#[derive(Debug)]
pub struct Registry {
    state: RwLock<RegistryState>,
}

impl Registry {
    /// Builds the registry from configuration.
    pub fn from_config(config: &RegistryConfig, buy_enabled: bool) -> Self {
        let products = config
            .products
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    Product {
                        name: p.name.clone(),
                        description: p.description.clone(),
                        image: p.image.clone(),
                        sellers: p.sellers.iter().copied().map(ParticipantId).collect(),
                    },
                )
            })
            .collect();

        Self {
            state: RwLock::new(RegistryState {
                admins: config.admins.iter().copied().map(ParticipantId).collect(),
                sellers: config.sellers.iter().copied().map(ParticipantId).collect(),
                products,
                blocked: BTreeSet::new(),
                buy_enabled,
            }),
        }
    }

    /// Resolves the capability set of a participant.
    pub async fn roles_of(&self, id: ParticipantId) -> Roles {
        let state = self.state.read().await;
        let admin = state.admins.contains(&id);
        Roles {
            admin,
            seller: admin || state.sellers.contains(&id),
        }
    }

    pub async fn is_blocked(&self, id: ParticipantId) -> bool {
        self.state.read().await.blocked.contains(&id)
    }

    pub async fn buy_enabled(&self) -> bool {
        self.state.read().await.buy_enabled
    }

    pub async fn set_buy_enabled(&self, enabled: bool) {
        self.state.write().await.buy_enabled = enabled;
        info!(enabled, "buy toggle changed");
    }

    /// Adds a buyer to the blocklist. Idempotent.
    pub async fn block(&self, id: ParticipantId) {
        self.state.write().await.blocked.insert(id);
        info!(buyer = %id, "buyer blocked");
    }

    /// Removes a buyer from the blocklist. Idempotent.
    pub async fn unblock(&self, id: ParticipantId) {
        self.state.write().await.blocked.remove(&id);
        info!(buyer = %id, "buyer unblocked");
    }

    pub async fn blocked_count(&self) -> usize {
        self.state.read().await.blocked.len()
    }

    /// Looks up one product by name.
    pub async fn product(&self, name: &str) -> Option<Product> {
        self.state.read().await.products.get(name).cloned()
    }

    /// Full catalog, ordered by name.
    pub async fn products(&self) -> Vec<Product> {
        self.state.read().await.products.values().cloned().collect()
    }

    /// Products the given seller is authorized to fulfill.
    pub async fn products_for_seller(&self, id: ParticipantId) -> Vec<String> {
        self.state
            .read()
            .await
            .products
            .values()
            .filter(|p| p.sellers.contains(&id))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Adds a product to the catalog. Replaces an existing product with the
    /// same name.
    pub async fn add_product(&self, product: Product) {
        let mut state = self.state.write().await;
        info!(product = %product.name, sellers = product.sellers.len(), "product added");
        state.products.insert(product.name.clone(), product);
    }

    /// Removes a product from the catalog.
    pub async fn remove_product(&self, name: &str) -> Result<(), ArbitrationError> {
        let mut state = self.state.write().await;
        match state.products.remove(name) {
            Some(_) => {
                info!(product = %name, "product removed");
                Ok(())
            }
            None => Err(ArbitrationError::ProductUnavailable),
        }
    }

    /// Authorizes a seller on a product.
    pub async fn assign_seller(
        &self,
        name: &str,
        seller: ParticipantId,
    ) -> Result<(), ArbitrationError> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(name)
            .ok_or(ArbitrationError::ProductUnavailable)?;
        product.sellers.insert(seller);
        Ok(())
    }

    /// Withdraws a seller from a product. The product stays listed even when
    /// its seller set becomes empty.
    pub async fn withdraw_seller(
        &self,
        name: &str,
        seller: ParticipantId,
    ) -> Result<(), ArbitrationError> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(name)
            .ok_or(ArbitrationError::ProductUnavailable)?;
        product.sellers.remove(&seller);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keydesk_config::model::ProductConfig;

    fn registry() -> Registry {
        Registry::from_config(
            &RegistryConfig {
                admins: vec![1],
                sellers: vec![2, 3],
                products: vec![ProductConfig {
                    name: "KOS-8BP".into(),
                    description: "Official key.".into(),
                    image: Some("KOS.jpg".into()),
                    sellers: vec![2, 3],
                }],
            },
            true,
        )
    }

    #[tokio::test]
    async fn admin_implies_seller_capability() {
        let reg = registry();
        let roles = reg.roles_of(ParticipantId(1)).await;
        assert!(roles.admin);
        assert!(roles.seller);
        assert!(roles.can_accept());
    }

    #[tokio::test]
    async fn plain_seller_cannot_accept() {
        let reg = registry();
        let roles = reg.roles_of(ParticipantId(2)).await;
        assert!(!roles.admin);
        assert!(roles.seller);
        assert!(!roles.can_accept());
    }

    #[tokio::test]
    async fn unknown_participant_is_plain_buyer() {
        let reg = registry();
        assert!(reg.roles_of(ParticipantId(99)).await.is_plain_buyer());
    }

    #[tokio::test]
    async fn block_unblock_roundtrip() {
        let reg = registry();
        let buyer = ParticipantId(50);
        assert!(!reg.is_blocked(buyer).await);
        reg.block(buyer).await;
        reg.block(buyer).await; // idempotent
        assert!(reg.is_blocked(buyer).await);
        assert_eq!(reg.blocked_count().await, 1);
        reg.unblock(buyer).await;
        assert!(!reg.is_blocked(buyer).await);
    }

    #[tokio::test]
    async fn products_for_seller_filters_catalog() {
        let reg = registry();
        assert_eq!(reg.products_for_seller(ParticipantId(2)).await, vec!["KOS-8BP"]);
        assert!(reg.products_for_seller(ParticipantId(9)).await.is_empty());
    }

    #[tokio::test]
    async fn withdraw_last_seller_keeps_product_listed() {
        let reg = registry();
        reg.withdraw_seller("KOS-8BP", ParticipantId(2)).await.unwrap();
        reg.withdraw_seller("KOS-8BP", ParticipantId(3)).await.unwrap();
        let product = reg.product("KOS-8BP").await.unwrap();
        assert!(product.sellers.is_empty());
        assert_eq!(reg.products().await.len(), 1);
    }

    #[tokio::test]
    async fn add_product_replaces_existing_entry() {
        let reg = registry();
        reg.add_product(Product {
            name: "KOS-8BP".into(),
            description: "Updated description.".into(),
            image: None,
            sellers: [ParticipantId(3)].into_iter().collect(),
        })
        .await;

        let product = reg.product("KOS-8BP").await.unwrap();
        assert_eq!(product.description, "Updated description.");
        assert_eq!(product.sellers.len(), 1);
        assert_eq!(reg.products().await.len(), 1);

        reg.add_product(Product {
            name: "NEW".into(),
            description: String::new(),
            image: None,
            sellers: BTreeSet::new(),
        })
        .await;
        assert_eq!(reg.products().await.len(), 2);
    }

    #[tokio::test]
    async fn seller_ops_on_unknown_product_fail() {
        let reg = registry();
        assert_eq!(
            reg.assign_seller("NOPE", ParticipantId(2)).await,
            Err(ArbitrationError::ProductUnavailable)
        );
        assert_eq!(
            reg.remove_product("NOPE").await,
            Err(ArbitrationError::ProductUnavailable)
        );
    }

    #[tokio::test]
    async fn toggle_gates_reads() {
        let reg = registry();
        assert!(reg.buy_enabled().await);
        reg.set_buy_enabled(false).await;
        assert!(!reg.buy_enabled().await);
    }
}
