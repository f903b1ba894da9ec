use chrono::Utc;
use common::ShippingStatus;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use domain::order::{
    EVENT_TYPE_ORDER_PAID, EVENT_TYPE_ORDER_PAYMENT_INITIATED, EVENT_TYPE_ORDER_PLACED,
    EVENT_TYPE_ORDER_SHIPPING_STATUS_UPDATED, OrderPaid, OrderPaymentInitiated, OrderPlaced,
    OrderShippingStatusUpdated,
};
use domain::{SerializedEvent, reduce_to_projection};

fn event<T: serde::Serialize>(event_type: &str, payload: &T) -> SerializedEvent {
    SerializedEvent {
        event_type: event_type.to_string(),
        data: serde_json::to_vec(payload).unwrap(),
    }
}

fn order_log() -> Vec<SerializedEvent> {
    let now = Utc::now();
    vec![
        event(
            EVENT_TYPE_ORDER_PLACED,
            &OrderPlaced {
                order_id: "order-1".to_string(),
                timestamp: now,
                vendor_id: "v".to_string(),
                customer_id: "c".to_string(),
                product_id: "p".to_string(),
                quantity: 2,
                total_price: 99.99,
                payment_method: "credit_card".to_string(),
            },
        ),
        event(
            EVENT_TYPE_ORDER_PAYMENT_INITIATED,
            &OrderPaymentInitiated {
                order_id: "order-1".to_string(),
                timestamp: now,
            },
        ),
        event(
            EVENT_TYPE_ORDER_PAID,
            &OrderPaid {
                order_id: "order-1".to_string(),
                timestamp: now,
            },
        ),
        event(
            EVENT_TYPE_ORDER_SHIPPING_STATUS_UPDATED,
            &OrderShippingStatusUpdated {
                order_id: "order-1".to_string(),
                timestamp: now,
                status: ShippingStatus::InTransit,
            },
        ),
    ]
}

fn bench_reduce(c: &mut Criterion) {
    let log = order_log();

    c.bench_function("reduce_full_lifecycle", |b| {
        b.iter(|| reduce_to_projection(black_box(&log)).unwrap())
    });
}

criterion_group!(benches, bench_reduce);
criterion_main!(benches);
