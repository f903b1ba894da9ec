//! Order controller: the single place where commands are validated
//! against the current projection and new events are emitted.
//!
//! Consumers depend on the [`OrderWorkflow`] capability set and the HTTP
//! layer on [`OrderCommands`], so neither needs the concrete controller
//! type.

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, PaymentStatus, ShippingStatus};
use event_store::{EventStore, Producer, SendArgs, SequenceNumber, Transactor};
use projections::{DbProjection, ListArgs, ProjectionRepo, UpsertArgs};
use serde::Serialize;

use crate::error::OrderError;
use crate::order::events::{
    AGGREGATE_TYPE_ORDER, EVENT_TYPE_ORDER_CANCELLED, EVENT_TYPE_ORDER_PAID,
    EVENT_TYPE_ORDER_PAYMENT_INITIATED, EVENT_TYPE_ORDER_PLACED,
    EVENT_TYPE_ORDER_SHIPPING_STATUS_UPDATED, OrderCancelled, OrderPaid, OrderPaymentInitiated,
    OrderPlaced, OrderShippingStatusUpdated,
};
use crate::order::projection::{OrderProjection, SerializedEvent, reduce_to_projection};

/// A request to place a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub vendor_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub total_price: f64,
    pub payment_method: String,
}

/// Command and query surface exposed to the transport layer.
#[async_trait]
pub trait OrderCommands: Send + Sync {
    /// Places a new order and returns its id.
    async fn place_order(&self, req: PlaceOrderRequest) -> Result<String, OrderError>;

    /// Cancels an order that is not yet delivered.
    async fn cancel_order(&self, order_id: &str, reason: &str) -> Result<(), OrderError>;

    /// Moves a paid order forward along the shipping progression.
    async fn update_shipping_status(
        &self,
        order_id: &str,
        status: ShippingStatus,
    ) -> Result<(), OrderError>;

    /// Folds and returns the live projection of one order.
    async fn get_order(&self, order_id: &str) -> Result<OrderProjection, OrderError>;

    /// Lists materialized projections, newest first.
    async fn list_orders(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<DbProjection>, OrderError>;
}

/// Workflow capability set invoked by the bus consumers.
#[async_trait]
pub trait OrderWorkflow: Send + Sync {
    /// Emits `order_payment_initiated` for a pending order. Returns the
    /// benign [`OrderError::PaymentStatusNotPending`] on replay.
    async fn initialize_pending_payment(&self, order_id: &str) -> Result<(), OrderError>;

    /// Emits `order_paid` for an initiated order. Returns the benign
    /// [`OrderError::PaymentStatusNotInitiated`] on replay.
    async fn process_payment(&self, order_id: &str) -> Result<(), OrderError>;

    /// Re-reads the projection and upserts the materialized row. No-op if
    /// the order has no events.
    async fn index_projection(&self, order_id: &str) -> Result<(), OrderError>;
}

/// The order controller over its infrastructure seams.
pub struct Controller<P, S, R, T> {
    producer: P,
    store: S,
    projections: R,
    transactor: T,
}

impl<P, S, R, T> Controller<P, S, R, T>
where
    P: Producer,
    S: EventStore,
    R: ProjectionRepo + Clone + 'static,
    T: Transactor,
{
    pub fn new(producer: P, store: S, projections: R, transactor: T) -> Self {
        Self {
            producer,
            store,
            projections,
            transactor,
        }
    }

    /// Returns the folded projection of an order together with the
    /// highest sequence number observed, or `None` if the order has no
    /// events.
    pub async fn get_projection(
        &self,
        order_id: &str,
    ) -> Result<Option<(OrderProjection, SequenceNumber)>, OrderError> {
        let events = self
            .store
            .list_by_aggregate_id(order_id, AGGREGATE_TYPE_ORDER)
            .await?;

        if events.is_empty() {
            return Ok(None);
        }

        let last_sequence = events
            .iter()
            .map(|e| e.sequence_number)
            .max()
            .unwrap_or(SequenceNumber::initial());

        let serialized: Vec<SerializedEvent> = events.iter().map(SerializedEvent::from).collect();
        let projection = reduce_to_projection(&serialized)?;

        Ok(Some((projection, last_sequence)))
    }

    /// Loads the projection, failing with `NotFound` when the order has
    /// no events.
    async fn require_projection(
        &self,
        order_id: &str,
    ) -> Result<(OrderProjection, SequenceNumber), OrderError> {
        self.get_projection(order_id)
            .await?
            .ok_or(OrderError::NotFound)
    }

    /// Encodes and sends one event through the transactional producer.
    async fn produce<E: Serialize>(
        &self,
        order_id: &str,
        event_type: &str,
        event: &E,
        sequence_number: SequenceNumber,
    ) -> Result<(), OrderError> {
        let value = serde_json::to_vec(event).map_err(OrderError::Encode)?;

        self.producer
            .send(SendArgs {
                aggregate_id: order_id.to_string(),
                aggregate_type: AGGREGATE_TYPE_ORDER.to_string(),
                event_type: event_type.to_string(),
                value,
                sequence_number,
            })
            .await?;

        Ok(())
    }
}

fn validate_place_order(req: &PlaceOrderRequest) -> Result<(), OrderError> {
    if req.vendor_id.is_empty() {
        return Err(OrderError::MissingField("vendor_id"));
    }
    if req.customer_id.is_empty() {
        return Err(OrderError::MissingField("customer_id"));
    }
    if req.product_id.is_empty() {
        return Err(OrderError::MissingField("product_id"));
    }
    if req.payment_method.is_empty() {
        return Err(OrderError::MissingField("payment_method"));
    }
    if req.quantity <= 0 {
        return Err(OrderError::InvalidQuantity);
    }
    if req.total_price < 0.0 {
        return Err(OrderError::InvalidTotalPrice);
    }
    Ok(())
}

fn validate_cancel_order(projection: &OrderProjection) -> Result<(), OrderError> {
    if projection.shipping_status == ShippingStatus::Cancelled {
        return Err(OrderError::AlreadyCancelled);
    }
    if projection.shipping_status == ShippingStatus::Delivered {
        return Err(OrderError::AlreadyDelivered);
    }
    Ok(())
}

fn validate_update_shipping_status(
    requested: ShippingStatus,
    projection: &OrderProjection,
) -> Result<(), OrderError> {
    if projection.payment_status != PaymentStatus::Paid {
        return Err(OrderError::NotPaid);
    }
    if requested == ShippingStatus::Cancelled {
        return Err(OrderError::CancelViaShippingUpdate);
    }
    if projection.shipping_status > requested {
        return Err(OrderError::LowerShippingStatus);
    }
    Ok(())
}

fn validate_initialize_payment(projection: &OrderProjection) -> Result<(), OrderError> {
    if projection.payment_method.is_empty() {
        return Err(OrderError::PaymentMethodRequired);
    }
    if projection.payment_status != PaymentStatus::Pending {
        return Err(OrderError::PaymentStatusNotPending);
    }
    Ok(())
}

fn validate_process_payment(projection: &OrderProjection) -> Result<(), OrderError> {
    if projection.payment_method.is_empty() {
        return Err(OrderError::PaymentMethodRequired);
    }
    if projection.payment_status != PaymentStatus::Initiated {
        return Err(OrderError::PaymentStatusNotInitiated);
    }
    Ok(())
}

#[async_trait]
impl<P, S, R, T> OrderCommands for Controller<P, S, R, T>
where
    P: Producer,
    S: EventStore,
    R: ProjectionRepo + Clone + 'static,
    T: Transactor,
{
    #[tracing::instrument(skip(self, req))]
    async fn place_order(&self, req: PlaceOrderRequest) -> Result<String, OrderError> {
        validate_place_order(&req)?;

        let order_id = OrderId::new().to_string();
        let event = OrderPlaced {
            order_id: order_id.clone(),
            timestamp: Utc::now(),
            vendor_id: req.vendor_id,
            customer_id: req.customer_id,
            product_id: req.product_id,
            quantity: req.quantity,
            total_price: req.total_price,
            payment_method: req.payment_method,
        };

        self.produce(
            &order_id,
            EVENT_TYPE_ORDER_PLACED,
            &event,
            SequenceNumber::initial(),
        )
        .await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(order_id = %order_id, "order placed");

        Ok(order_id)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str, reason: &str) -> Result<(), OrderError> {
        let (projection, last_sequence) = self.require_projection(order_id).await?;
        validate_cancel_order(&projection)?;

        let event = OrderCancelled {
            order_id: order_id.to_string(),
            timestamp: Utc::now(),
            reason: reason.to_string(),
        };

        self.produce(
            order_id,
            EVENT_TYPE_ORDER_CANCELLED,
            &event,
            last_sequence.next(),
        )
        .await?;

        tracing::info!(order_id, reason, "order cancelled");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn update_shipping_status(
        &self,
        order_id: &str,
        status: ShippingStatus,
    ) -> Result<(), OrderError> {
        let (projection, last_sequence) = self.require_projection(order_id).await?;
        validate_update_shipping_status(status, &projection)?;

        let event = OrderShippingStatusUpdated {
            order_id: order_id.to_string(),
            timestamp: Utc::now(),
            status,
        };

        self.produce(
            order_id,
            EVENT_TYPE_ORDER_SHIPPING_STATUS_UPDATED,
            &event,
            last_sequence.next(),
        )
        .await?;

        tracing::info!(order_id, status = %status, "shipping status updated");
        Ok(())
    }

    async fn get_order(&self, order_id: &str) -> Result<OrderProjection, OrderError> {
        let (projection, _) = self.require_projection(order_id).await?;
        Ok(projection)
    }

    async fn list_orders(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<DbProjection>, OrderError> {
        let defaults = ListArgs::default();
        let args = ListArgs {
            limit: limit.unwrap_or(defaults.limit),
            offset: offset.unwrap_or(defaults.offset),
        };
        Ok(self.projections.list(args).await?)
    }
}

#[async_trait]
impl<P, S, R, T> OrderWorkflow for Controller<P, S, R, T>
where
    P: Producer,
    S: EventStore,
    R: ProjectionRepo + Clone + 'static,
    T: Transactor,
{
    #[tracing::instrument(skip(self))]
    async fn initialize_pending_payment(&self, order_id: &str) -> Result<(), OrderError> {
        let (projection, last_sequence) = self.require_projection(order_id).await?;
        validate_initialize_payment(&projection)?;

        let event = OrderPaymentInitiated {
            order_id: order_id.to_string(),
            timestamp: Utc::now(),
        };

        self.produce(
            order_id,
            EVENT_TYPE_ORDER_PAYMENT_INITIATED,
            &event,
            last_sequence.next(),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn process_payment(&self, order_id: &str) -> Result<(), OrderError> {
        let (projection, last_sequence) = self.require_projection(order_id).await?;
        validate_process_payment(&projection)?;

        let event = OrderPaid {
            order_id: order_id.to_string(),
            timestamp: Utc::now(),
        };

        self.produce(order_id, EVENT_TYPE_ORDER_PAID, &event, last_sequence.next())
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn index_projection(&self, order_id: &str) -> Result<(), OrderError> {
        let Some((projection, _)) = self.get_projection(order_id).await? else {
            return Ok(());
        };

        let repo = self.projections.clone();
        let args = UpsertArgs {
            order_id: order_id.to_string(),
            payment_status: projection.payment_status,
            shipping_status: projection.shipping_status,
        };

        self.transactor
            .with_tx(move |tx| {
                Box::pin(async move { repo.upsert(tx, args).await.map_err(OrderError::from) })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use event_store::{
        InMemoryEventBus, InMemoryEventStore, NoopTransactor, TransactionalProducer,
    };
    use projections::InMemoryProjectionRepo;

    use super::*;
    use crate::error::ErrorKind;

    type TestController = Controller<
        TransactionalProducer<InMemoryEventStore, InMemoryEventBus, NoopTransactor>,
        InMemoryEventStore,
        InMemoryProjectionRepo,
        NoopTransactor,
    >;

    struct Harness {
        controller: TestController,
        store: InMemoryEventStore,
        bus: InMemoryEventBus,
        repo: InMemoryProjectionRepo,
    }

    fn harness() -> Harness {
        let store = InMemoryEventStore::new();
        let bus = InMemoryEventBus::new();
        let transactor = NoopTransactor::new();
        let repo = InMemoryProjectionRepo::new();
        let producer =
            TransactionalProducer::new(store.clone(), bus.clone(), transactor.clone());
        let controller = Controller::new(producer, store.clone(), repo.clone(), transactor);
        Harness {
            controller,
            store,
            bus,
            repo,
        }
    }

    fn place_request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            vendor_id: "v".to_string(),
            customer_id: "c".to_string(),
            product_id: "p".to_string(),
            quantity: 2,
            total_price: 99.99,
            payment_method: "credit_card".to_string(),
        }
    }

    fn projection_with(
        payment_status: PaymentStatus,
        shipping_status: ShippingStatus,
    ) -> OrderProjection {
        OrderProjection {
            order_id: "order-1".to_string(),
            payment_method: "credit_card".to_string(),
            payment_status,
            shipping_status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ..OrderProjection::default()
        }
    }

    #[tokio::test]
    async fn place_order_emits_order_placed_at_sequence_zero() {
        let h = harness();

        let order_id = h.controller.place_order(place_request()).await.unwrap();

        let events = h
            .store
            .list_by_aggregate_id(&order_id, AGGREGATE_TYPE_ORDER)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EVENT_TYPE_ORDER_PLACED);
        assert_eq!(events[0].sequence_number, SequenceNumber::initial());

        assert_eq!(h.bus.published().await.len(), 1);
    }

    #[tokio::test]
    async fn place_order_rejects_missing_fields() {
        let h = harness();

        let mut req = place_request();
        req.payment_method.clear();
        let err = h.controller.place_order(req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let mut req = place_request();
        req.quantity = 0;
        let err = h.controller.place_order(req).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidQuantity));
    }

    #[tokio::test]
    async fn get_projection_returns_none_for_unknown_order() {
        let h = harness();
        let result = h.controller.get_projection("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn get_projection_tracks_last_sequence_number() {
        let h = harness();

        let order_id = h.controller.place_order(place_request()).await.unwrap();
        h.controller
            .initialize_pending_payment(&order_id)
            .await
            .unwrap();

        let (projection, last_sequence) = h
            .controller
            .get_projection(&order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(projection.payment_status, PaymentStatus::Initiated);
        assert_eq!(last_sequence, SequenceNumber::new(1));
    }

    #[tokio::test]
    async fn cancel_order_requires_an_existing_order() {
        let h = harness();
        let err = h
            .controller
            .cancel_order("missing", "reason")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound));
    }

    #[tokio::test]
    async fn cancel_order_appends_cancelled_event() {
        let h = harness();

        let order_id = h.controller.place_order(place_request()).await.unwrap();
        h.controller
            .cancel_order(&order_id, "customer request")
            .await
            .unwrap();

        let events = h
            .store
            .list_by_aggregate_id(&order_id, AGGREGATE_TYPE_ORDER)
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, EVENT_TYPE_ORDER_CANCELLED);
        assert_eq!(events[1].sequence_number, SequenceNumber::new(1));

        let (projection, _) = h
            .controller
            .get_projection(&order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(projection.shipping_status, ShippingStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_twice_is_a_failed_precondition() {
        let h = harness();

        let order_id = h.controller.place_order(place_request()).await.unwrap();
        h.controller.cancel_order(&order_id, "first").await.unwrap();

        let err = h
            .controller
            .cancel_order(&order_id, "second")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::AlreadyCancelled));
        assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    }

    #[tokio::test]
    async fn update_shipping_requires_paid_order() {
        let h = harness();

        let order_id = h.controller.place_order(place_request()).await.unwrap();
        let err = h
            .controller
            .update_shipping_status(&order_id, ShippingStatus::InTransit)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotPaid));
    }

    #[tokio::test]
    async fn full_payment_workflow_then_shipping_progression() {
        let h = harness();

        let order_id = h.controller.place_order(place_request()).await.unwrap();
        h.controller
            .initialize_pending_payment(&order_id)
            .await
            .unwrap();
        h.controller.process_payment(&order_id).await.unwrap();

        h.controller
            .update_shipping_status(&order_id, ShippingStatus::InTransit)
            .await
            .unwrap();
        h.controller
            .update_shipping_status(&order_id, ShippingStatus::Delivered)
            .await
            .unwrap();

        let (projection, last_sequence) = h
            .controller
            .get_projection(&order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(projection.payment_status, PaymentStatus::Paid);
        assert_eq!(projection.shipping_status, ShippingStatus::Delivered);
        assert_eq!(last_sequence, SequenceNumber::new(4));
    }

    #[tokio::test]
    async fn initialize_payment_is_benign_on_replay() {
        let h = harness();

        let order_id = h.controller.place_order(place_request()).await.unwrap();
        h.controller
            .initialize_pending_payment(&order_id)
            .await
            .unwrap();

        let err = h
            .controller
            .initialize_pending_payment(&order_id)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::PaymentStatusNotPending));

        // Replay added no event.
        let events = h
            .store
            .list_by_aggregate_id(&order_id, AGGREGATE_TYPE_ORDER)
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn process_payment_is_benign_on_replay() {
        let h = harness();

        let order_id = h.controller.place_order(place_request()).await.unwrap();
        h.controller
            .initialize_pending_payment(&order_id)
            .await
            .unwrap();
        h.controller.process_payment(&order_id).await.unwrap();

        let err = h.controller.process_payment(&order_id).await.unwrap_err();
        assert!(matches!(err, OrderError::PaymentStatusNotInitiated));
    }

    #[tokio::test]
    async fn index_projection_upserts_materialized_row() {
        let h = harness();

        let order_id = h.controller.place_order(place_request()).await.unwrap();
        h.controller.index_projection(&order_id).await.unwrap();

        let row = h.repo.get(&order_id).await.unwrap();
        assert_eq!(row.payment_status, PaymentStatus::Pending);
        assert_eq!(row.shipping_status, ShippingStatus::WaitingForPayment);
    }

    #[tokio::test]
    async fn index_projection_is_a_noop_without_events() {
        let h = harness();
        h.controller.index_projection("missing").await.unwrap();
        assert_eq!(h.repo.count().await, 0);
    }

    #[tokio::test]
    async fn list_orders_applies_defaults() {
        let h = harness();

        let order_id = h.controller.place_order(place_request()).await.unwrap();
        h.controller.index_projection(&order_id).await.unwrap();

        let orders = h.controller.list_orders(None, None).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, order_id);
    }

    #[tokio::test]
    async fn get_order_maps_empty_log_to_not_found() {
        let h = harness();
        let err = h.controller.get_order("missing").await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound));
    }

    mod validation {
        use super::*;

        #[test]
        fn cancel_allows_waiting_for_shipment() {
            let projection =
                projection_with(PaymentStatus::Paid, ShippingStatus::WaitingForShipment);
            assert!(validate_cancel_order(&projection).is_ok());
        }

        #[test]
        fn cancel_rejects_cancelled_and_delivered() {
            let projection = projection_with(PaymentStatus::Paid, ShippingStatus::Cancelled);
            assert!(matches!(
                validate_cancel_order(&projection),
                Err(OrderError::AlreadyCancelled)
            ));

            let projection = projection_with(PaymentStatus::Paid, ShippingStatus::Delivered);
            assert!(matches!(
                validate_cancel_order(&projection),
                Err(OrderError::AlreadyDelivered)
            ));
        }

        #[test]
        fn shipping_update_rejects_unpaid() {
            let projection =
                projection_with(PaymentStatus::Pending, ShippingStatus::WaitingForPayment);
            assert!(matches!(
                validate_update_shipping_status(ShippingStatus::InTransit, &projection),
                Err(OrderError::NotPaid)
            ));
        }

        #[test]
        fn shipping_update_rejects_cancellation() {
            let projection =
                projection_with(PaymentStatus::Paid, ShippingStatus::WaitingForShipment);
            assert!(matches!(
                validate_update_shipping_status(ShippingStatus::Cancelled, &projection),
                Err(OrderError::CancelViaShippingUpdate)
            ));
        }

        #[test]
        fn shipping_update_rejects_lower_status() {
            let projection = projection_with(PaymentStatus::Paid, ShippingStatus::InTransit);
            assert!(matches!(
                validate_update_shipping_status(ShippingStatus::WaitingForShipment, &projection),
                Err(OrderError::LowerShippingStatus)
            ));
        }

        #[test]
        fn shipping_update_allows_equal_and_higher() {
            let projection = projection_with(PaymentStatus::Paid, ShippingStatus::InTransit);
            assert!(validate_update_shipping_status(ShippingStatus::InTransit, &projection).is_ok());
            assert!(
                validate_update_shipping_status(ShippingStatus::Delivered, &projection).is_ok()
            );
        }

        #[test]
        fn initialize_payment_requires_payment_method() {
            let mut projection =
                projection_with(PaymentStatus::Pending, ShippingStatus::WaitingForPayment);
            projection.payment_method.clear();
            assert!(matches!(
                validate_initialize_payment(&projection),
                Err(OrderError::PaymentMethodRequired)
            ));
        }

        #[test]
        fn process_payment_requires_initiated() {
            let projection =
                projection_with(PaymentStatus::Pending, ShippingStatus::WaitingForPayment);
            assert!(matches!(
                validate_process_payment(&projection),
                Err(OrderError::PaymentStatusNotInitiated)
            ));

            let projection =
                projection_with(PaymentStatus::Initiated, ShippingStatus::WaitingForPayment);
            assert!(validate_process_payment(&projection).is_ok());
        }
    }
}
