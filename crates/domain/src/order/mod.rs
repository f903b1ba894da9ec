//! The order aggregate: events, projection, controller, and consumers.

pub mod consumers;
pub mod controller;
pub mod events;
pub mod projection;

pub use events::{
    AGGREGATE_TYPE_ORDER, EVENT_TYPE_ORDER_CANCELLED, EVENT_TYPE_ORDER_PAID,
    EVENT_TYPE_ORDER_PAYMENT_FAILED, EVENT_TYPE_ORDER_PAYMENT_INITIATED,
    EVENT_TYPE_ORDER_PLACED, EVENT_TYPE_ORDER_SHIPPING_STATUS_UPDATED, OrderCancelled, OrderPaid,
    OrderPaymentFailed, OrderPaymentInitiated, OrderPlaced, OrderShippingStatusUpdated,
};
