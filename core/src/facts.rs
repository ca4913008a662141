//! Raw transactional fact rows, as written into the fact store.
//!
//! The engine never reads these back one by one; it only sees the
//! rollups the aggregator builds from them.

use crate::types::EntityId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerFact {
    pub customer_id: EntityId,
    pub name:        String,
    pub email:       String,
    pub city:        String,
    pub birth_date:  Option<NaiveDate>,
    pub join_date:   NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreFact {
    pub store_id: EntityId,
    pub name:     String,
    pub city:     String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFact {
    pub product_id: EntityId,
    pub name:       String,
    pub category:   String,
    pub list_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        Self::Pending,
        Self::Shipped,
        Self::Delivered,
        Self::Completed,
        Self::Cancelled,
        Self::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending   => "pending",
            Self::Shipped   => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Returned  => "returned",
        }
    }

    /// Only delivered or completed orders count towards revenue.
    pub fn is_qualifying(&self) -> bool {
        matches!(self, Self::Delivered | Self::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFact {
    pub order_id:        EntityId,
    pub customer_id:     EntityId,
    pub store_id:        EntityId,
    pub order_date:      NaiveDate,
    pub status:          OrderStatus,
    /// Net amount charged, after discounts.
    pub total_amount:    f64,
    pub discount_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemFact {
    pub order_item_id: EntityId,
    pub order_id:      EntityId,
    pub product_id:    EntityId,
    pub quantity:      i64,
    pub unit_price:    f64,
    pub discount:      f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFact {
    pub review_id:   EntityId,
    pub customer_id: EntityId,
    pub product_id:  EntityId,
    pub rating:      u8,
    pub review_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyKind {
    Earned,
    Redeemed,
}

impl LoyaltyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earned   => "earned",
            Self::Redeemed => "redeemed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyaltyFact {
    pub entry_id:    EntityId,
    pub customer_id: EntityId,
    pub points:      i64,
    pub kind:        LoyaltyKind,
    pub created_on:  NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentFact {
    pub shipment_id:    EntityId,
    pub order_id:       EntityId,
    pub shipped_date:   Option<NaiveDate>,
    pub delivered_date: Option<NaiveDate>,
    pub status:         String,
}
