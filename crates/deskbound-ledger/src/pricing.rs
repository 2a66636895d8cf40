//! Shop items and escalating prices.
//!
//! Each item has an ordered cost list. The price of the next purchase is
//! `costs[min(purchases, len - 1)]`: prices climb with every confirmed
//! purchase and then stay at the last step. A purchase only counts once it
//! is confirmed (the placement was committed or the employee was hired),
//! so cancelled placements never raise the price.

use std::collections::BTreeMap;

use deskbound_types::{ShopItemKind, Tier};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::LedgerError;

/// Escalating price list for one shop item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSchedule {
    costs: Vec<u64>,
    purchases: u32,
}

impl PriceSchedule {
    /// Build a schedule. An empty cost list is a configuration error.
    pub fn new(item: &str, costs: Vec<u64>) -> Result<Self, LedgerError> {
        if costs.is_empty() {
            return Err(LedgerError::EmptyPriceList {
                item: item.to_owned(),
            });
        }
        Ok(Self { costs, purchases: 0 })
    }

    /// Price of the next purchase.
    pub fn current_price(&self) -> u64 {
        let step = usize::try_from(self.purchases).unwrap_or(usize::MAX);
        self.costs
            .get(step)
            .or_else(|| self.costs.last())
            .copied()
            .unwrap_or_default()
    }

    /// Count one confirmed purchase.
    pub const fn record_purchase(&mut self) {
        self.purchases = self.purchases.saturating_add(1);
    }

    /// Confirmed purchases so far.
    pub const fn purchases(&self) -> u32 {
        self.purchases
    }
}

/// What a shop item delivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShopOffer {
    /// A placeable object; buying it starts a placement session.
    Placeable {
        /// Prefab name.
        prefab: String,
    },
    /// An employee of a fixed tier, spawned on purchase.
    Employee {
        /// Tier of the hired employee.
        tier: Tier,
    },
}

impl ShopOffer {
    /// Coarse item kind.
    pub const fn kind(&self) -> ShopItemKind {
        match self {
            Self::Placeable { .. } => ShopItemKind::Placeable,
            Self::Employee { .. } => ShopItemKind::Employee,
        }
    }
}

/// One item on sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopItem {
    /// Item name, unique within the shop.
    pub name: String,
    /// What the item delivers.
    pub offer: ShopOffer,
    /// Price progression.
    pub schedule: PriceSchedule,
}

/// Every item on sale, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Shop {
    items: BTreeMap<String, ShopItem>,
}

impl Shop {
    /// An empty shop.
    pub const fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    /// Put an item on sale.
    pub fn add_item(&mut self, name: &str, offer: ShopOffer, costs: Vec<u64>) -> Result<(), LedgerError> {
        if self.items.contains_key(name) {
            return Err(LedgerError::DuplicateItem {
                item: name.to_owned(),
            });
        }
        let schedule = PriceSchedule::new(name, costs)?;
        self.items.insert(
            name.to_owned(),
            ShopItem {
                name: name.to_owned(),
                offer,
                schedule,
            },
        );
        Ok(())
    }

    /// Look up an item.
    pub fn item(&self, name: &str) -> Result<&ShopItem, LedgerError> {
        self.items.get(name).ok_or_else(|| LedgerError::UnknownItem {
            item: name.to_owned(),
        })
    }

    /// Price of the next purchase of `name`.
    pub fn price(&self, name: &str) -> Result<u64, LedgerError> {
        self.item(name).map(|item| item.schedule.current_price())
    }

    /// Count a confirmed purchase of `name`. Returns the new purchase count.
    pub fn confirm_purchase(&mut self, name: &str) -> Result<u32, LedgerError> {
        let item = self.items.get_mut(name).ok_or_else(|| LedgerError::UnknownItem {
            item: name.to_owned(),
        })?;
        item.schedule.record_purchase();
        let purchases = item.schedule.purchases();
        info!(
            item = name,
            purchases,
            next_price = item.schedule.current_price(),
            "purchase confirmed"
        );
        Ok(purchases)
    }

    /// All items, ordered by name.
    pub fn items(&self) -> impl Iterator<Item = &ShopItem> {
        self.items.values()
    }
}
