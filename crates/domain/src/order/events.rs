//! Order domain events.
//!
//! Payloads are serialized to opaque bytes at the producer call sites;
//! the store and the bus never inspect them. The `event_type` string
//! travels separately, as a store column and a bus header.

use chrono::{DateTime, Utc};
use common::ShippingStatus;
use serde::{Deserialize, Serialize};

pub const EVENT_TYPE_ORDER_PLACED: &str = "order_placed";
pub const EVENT_TYPE_ORDER_PAID: &str = "order_paid";
pub const EVENT_TYPE_ORDER_PAYMENT_INITIATED: &str = "order_payment_initiated";
pub const EVENT_TYPE_ORDER_PAYMENT_FAILED: &str = "order_payment_failed";
pub const EVENT_TYPE_ORDER_CANCELLED: &str = "order_cancelled";
pub const EVENT_TYPE_ORDER_SHIPPING_STATUS_UPDATED: &str = "order_shipping_status_updated";

pub const AGGREGATE_TYPE_ORDER: &str = "order";

/// A new order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
    pub vendor_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub total_price: f64,
    pub payment_method: String,
}

/// Payment initialization started for the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaymentInitiated {
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
}

/// The order was paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaid {
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Payment for the order failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaymentFailed {
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
}

/// The order was cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// The shipping status of the order changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderShippingStatusUpdated {
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: ShippingStatus,
}
