//! Payment and shipping status enums shared by the event payloads, the
//! projection engine, and the materialized read model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing a status from its string form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status: {0}")]
pub struct InvalidStatus(pub String);

/// Payment state of an order.
///
/// Monotonic along pending → initiated → {paid, failed}.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Initiated,
    Paid,
    Failed,
}

impl PaymentStatus {
    /// Returns the stable string form stored in the database and carried
    /// in event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "initiated" => Ok(PaymentStatus::Initiated),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Shipping state of an order.
///
/// The derived ordering is the progression ordinal used when validating
/// shipping updates: waiting_for_payment < waiting_for_shipment <
/// in_transit < delivered. `Cancelled` is a terminal sink reachable from
/// any non-delivered state and is never set through a shipping update.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus {
    #[default]
    Unspecified,
    WaitingForPayment,
    WaitingForShipment,
    InTransit,
    Delivered,
    Cancelled,
}

impl ShippingStatus {
    /// Returns the stable string form stored in the database and carried
    /// in event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingStatus::Unspecified => "unspecified",
            ShippingStatus::WaitingForPayment => "waiting_for_payment",
            ShippingStatus::WaitingForShipment => "waiting_for_shipment",
            ShippingStatus::InTransit => "in_transit",
            ShippingStatus::Delivered => "delivered",
            ShippingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShippingStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unspecified" => Ok(ShippingStatus::Unspecified),
            "waiting_for_payment" => Ok(ShippingStatus::WaitingForPayment),
            "waiting_for_shipment" => Ok(ShippingStatus::WaitingForShipment),
            "in_transit" => Ok(ShippingStatus::InTransit),
            "delivered" => Ok(ShippingStatus::Delivered),
            "cancelled" => Ok(ShippingStatus::Cancelled),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}
