use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{BrokerRole, PriceSpecification};
use super::errors::{OrderStoreError, OrderStoreResult};

// ============================================================================
// Order Store Records - the rows handed to the storage engine
// ============================================================================

/// Which kind of record a uniqueness violation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Order,
    Lease,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Order => "order",
            ResourceKind::Lease => "lease",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked before any write; the store only trades in one currency
pub fn ensure_supported_currency(price: &PriceSpecification, supported: &str) -> OrderStoreResult<()> {
    if price.price_currency != supported {
        return Err(OrderStoreError::UnsupportedCurrency {
            expected: supported.to_string(),
            actual: price.price_currency.clone(),
        });
    }
    Ok(())
}

/// Temporary hold on a booking, keyed by the id the order will later take
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LeaseRecord {
    pub order_id: Uuid,
    pub broker_role: BrokerRole,
    pub broker_name: Option<String>,
    pub seller_id: i64,
    pub customer_email: Option<String>,
    pub lease_expires: DateTime<Utc>,
}

impl LeaseRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.lease_expires
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OrderRecord {
    pub order_id: Uuid,
    pub broker_role: BrokerRole,
    pub broker_name: Option<String>,
    pub seller_id: i64,
    pub customer_email: Option<String>,
    pub payment_identifier: Option<String>,
    pub total_order_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderItemStatus {
    Confirmed,
    CustomerCancelled,
    SellerCancelled,
}

impl OrderItemStatus {
    pub fn cancelled(customer_initiated: bool) -> Self {
        if customer_initiated {
            OrderItemStatus::CustomerCancelled
        } else {
            OrderItemStatus::SellerCancelled
        }
    }

    pub fn is_cancelled(&self) -> bool {
        !matches!(self, OrderItemStatus::Confirmed)
    }
}

/// Item within an order; written by the opportunity side of the booking system
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OrderItemRecord {
    pub id: i64,
    pub order_id: Uuid,
    pub status: OrderItemStatus,
}

// ============================================================================
// Unit Tests
// ============================================================================
