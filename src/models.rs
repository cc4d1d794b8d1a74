use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

// ============================================================================
// Booking Flow Models
// These are handed to the order store by the booking flow orchestrator
// ============================================================================

/// Discrete step of the booking protocol
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowStage {
    C1,
    C2,
    P,
    B,
}

impl std::str::FromStr for FlowStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "C1" => Ok(FlowStage::C1),
            "C2" => Ok(FlowStage::C2),
            "P" => Ok(FlowStage::P),
            "B" => Ok(FlowStage::B),
            _ => Err(format!("Unknown flow stage: {}", s)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrokerRole {
    #[default]
    NoBroker,
    AgentBroker,
    ResellerBroker,
}

/// Identity of an order, or of one item within it
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OrderIdComponents {
    pub uuid: Uuid,
    pub order_item_id: Option<i64>,
}

impl OrderIdComponents {
    pub fn order(uuid: Uuid) -> Self {
        Self { uuid, order_item_id: None }
    }

    pub fn order_item(uuid: Uuid, order_item_id: i64) -> Self {
        Self { uuid, order_item_id: Some(order_item_id) }
    }
}

/// Renders order identities as URLs, e.g. `https://example.com/api/orders/{uuid}`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OrderIdTemplate {
    pub base_url: String,
}

impl OrderIdTemplate {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    pub fn render_order_id(&self, id: &OrderIdComponents) -> String {
        format!("{}/orders/{}", self.base_url.trim_end_matches('/'), id.uuid)
    }

    /// Falls back to the order URL when the item part is missing
    pub fn render_order_item_id(&self, id: &OrderIdComponents) -> String {
        match id.order_item_id {
            Some(item_id) => format!("{}#/orderedItems/{}", self.render_order_id(id), item_id),
            None => self.render_order_id(id),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SellerIdComponents {
    pub seller_id_long: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Broker {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Customer {
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub identifier: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PriceSpecification {
    pub price: Decimal,
    pub price_currency: String,
}

impl PriceSpecification {
    pub fn new(price: Decimal, price_currency: impl Into<String>) -> Self {
        Self { price, price_currency: price_currency.into() }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OrderQuote {
    pub total_payment_due: PriceSpecification,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub total_payment_due: PriceSpecification,
}

/// Returned to the orchestrator; the rest is re-derived from the flow context
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lease {
    pub lease_expires: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FlowContext {
    pub stage: FlowStage,
    pub order_id: OrderIdComponents,
    pub broker_role: BrokerRole,
    pub broker: Option<Broker>,
    pub seller_id: SellerIdComponents,
    pub customer: Option<Customer>,
    pub payment: Option<Payment>,
}

impl FlowContext {
    pub fn broker_name(&self) -> Option<String> {
        self.broker.as_ref().map(|b| b.name.clone())
    }

    pub fn customer_email(&self) -> Option<String> {
        self.customer.as_ref().and_then(|c| c.email.clone())
    }

    pub fn payment_identifier(&self) -> Option<String> {
        self.payment.as_ref().and_then(|p| p.identifier.clone())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
