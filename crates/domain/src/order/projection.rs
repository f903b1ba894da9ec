//! Projection engine: folds a serialized event log into the current state
//! of one order.

use chrono::{DateTime, Utc};
use common::{PaymentStatus, ShippingStatus};
use serde::de::DeserializeOwned;

use crate::error::ProjectionError;
use crate::order::events::{
    EVENT_TYPE_ORDER_CANCELLED, EVENT_TYPE_ORDER_PAID, EVENT_TYPE_ORDER_PAYMENT_FAILED,
    EVENT_TYPE_ORDER_PAYMENT_INITIATED, EVENT_TYPE_ORDER_PLACED,
    EVENT_TYPE_ORDER_SHIPPING_STATUS_UPDATED, OrderCancelled, OrderPaid, OrderPaymentFailed,
    OrderPaymentInitiated, OrderPlaced, OrderShippingStatusUpdated,
};

/// Derived current state of one order.
///
/// Never a source of truth: both statuses are deterministic functions of
/// the event sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderProjection {
    pub order_id: String,
    pub customer_id: String,
    pub vendor_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub total_price: f64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub shipping_status: ShippingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for OrderProjection {
    fn default() -> Self {
        Self {
            order_id: String::new(),
            customer_id: String::new(),
            vendor_id: String::new(),
            product_id: String::new(),
            quantity: 0,
            total_price: 0.0,
            payment_method: String::new(),
            payment_status: PaymentStatus::default(),
            shipping_status: ShippingStatus::default(),
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }
}

/// An `(event_type, payload)` pair as read back from the store.
#[derive(Debug, Clone)]
pub struct SerializedEvent {
    pub event_type: String,
    pub data: Vec<u8>,
}

impl From<&event_store::Event> for SerializedEvent {
    fn from(event: &event_store::Event) -> Self {
        Self {
            event_type: event.event_type.clone(),
            data: event.data.clone(),
        }
    }
}

/// Reduces an ordered event log into an order projection, starting from a
/// zero-valued projection. Decode failures and unknown event types abort
/// the fold.
pub fn reduce_to_projection(events: &[SerializedEvent]) -> Result<OrderProjection, ProjectionError> {
    let mut projection = OrderProjection::default();
    for event in events {
        apply_event(event, &mut projection)?;
    }
    Ok(projection)
}

/// Dispatches an event to its apply function by `event_type`.
fn apply_event(
    event: &SerializedEvent,
    projection: &mut OrderProjection,
) -> Result<(), ProjectionError> {
    match event.event_type.as_str() {
        EVENT_TYPE_ORDER_PLACED => apply_order_placed(&event.data, projection),
        EVENT_TYPE_ORDER_PAYMENT_INITIATED => apply_order_payment_initiated(&event.data, projection),
        EVENT_TYPE_ORDER_PAID => apply_order_paid(&event.data, projection),
        EVENT_TYPE_ORDER_PAYMENT_FAILED => apply_order_payment_failed(&event.data, projection),
        EVENT_TYPE_ORDER_CANCELLED => apply_order_cancelled(&event.data, projection),
        EVENT_TYPE_ORDER_SHIPPING_STATUS_UPDATED => {
            apply_order_shipping_status_updated(&event.data, projection)
        }
        other => Err(ProjectionError::UnknownEventType(other.to_string())),
    }
}

fn decode<T: DeserializeOwned>(
    event_type: &'static str,
    data: &[u8],
) -> Result<T, ProjectionError> {
    serde_json::from_slice(data).map_err(|source| ProjectionError::Decode { event_type, source })
}

fn apply_order_placed(
    data: &[u8],
    projection: &mut OrderProjection,
) -> Result<(), ProjectionError> {
    let event: OrderPlaced = decode(EVENT_TYPE_ORDER_PLACED, data)?;

    projection.order_id = event.order_id;
    projection.customer_id = event.customer_id;
    projection.vendor_id = event.vendor_id;
    projection.product_id = event.product_id;
    projection.quantity = event.quantity;
    projection.total_price = event.total_price;
    projection.payment_method = event.payment_method;
    projection.payment_status = PaymentStatus::Pending;
    projection.shipping_status = ShippingStatus::WaitingForPayment;
    projection.created_at = event.timestamp;
    projection.updated_at = event.timestamp;

    Ok(())
}

fn apply_order_payment_initiated(
    data: &[u8],
    projection: &mut OrderProjection,
) -> Result<(), ProjectionError> {
    let event: OrderPaymentInitiated = decode(EVENT_TYPE_ORDER_PAYMENT_INITIATED, data)?;

    projection.payment_status = PaymentStatus::Initiated;
    projection.updated_at = event.timestamp;

    Ok(())
}

fn apply_order_paid(data: &[u8], projection: &mut OrderProjection) -> Result<(), ProjectionError> {
    let event: OrderPaid = decode(EVENT_TYPE_ORDER_PAID, data)?;

    projection.payment_status = PaymentStatus::Paid;
    projection.shipping_status = ShippingStatus::WaitingForShipment;
    projection.updated_at = event.timestamp;

    Ok(())
}

fn apply_order_payment_failed(
    data: &[u8],
    projection: &mut OrderProjection,
) -> Result<(), ProjectionError> {
    let event: OrderPaymentFailed = decode(EVENT_TYPE_ORDER_PAYMENT_FAILED, data)?;

    projection.payment_status = PaymentStatus::Failed;
    projection.updated_at = event.timestamp;

    Ok(())
}

fn apply_order_cancelled(
    data: &[u8],
    projection: &mut OrderProjection,
) -> Result<(), ProjectionError> {
    let event: OrderCancelled = decode(EVENT_TYPE_ORDER_CANCELLED, data)?;

    projection.shipping_status = ShippingStatus::Cancelled;
    projection.updated_at = event.timestamp;

    Ok(())
}

fn apply_order_shipping_status_updated(
    data: &[u8],
    projection: &mut OrderProjection,
) -> Result<(), ProjectionError> {
    let event: OrderShippingStatusUpdated = decode(EVENT_TYPE_ORDER_SHIPPING_STATUS_UPDATED, data)?;

    if event.status != ShippingStatus::Unspecified {
        projection.shipping_status = event.status;
    }
    projection.updated_at = event.timestamp;

    Ok(())
}
