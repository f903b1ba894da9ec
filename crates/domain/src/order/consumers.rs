//! The three bus consumers.
//!
//! Each one filters by aggregate and event type, then invokes a single
//! [`OrderWorkflow`] capability. Benign sentinel errors are treated as
//! success so redelivered messages commit instead of retrying forever.

use std::sync::Arc;

use async_trait::async_trait;
use event_store::{ConsumeArgs, EventConsumer, HandlerError};

use crate::error::OrderError;
use crate::order::controller::OrderWorkflow;
use crate::order::events::{
    AGGREGATE_TYPE_ORDER, EVENT_TYPE_ORDER_PAYMENT_INITIATED, EVENT_TYPE_ORDER_PLACED, OrderPlaced,
    OrderPaymentInitiated,
};

pub const CONSUMER_PAYMENT_INITIALIZER: &str = "payment-initializer";
pub const CONSUMER_PAYMENT_PROCESSOR: &str = "payment-processor";
pub const CONSUMER_PROJECTION_INDEXER: &str = "projection-indexer";

/// Consumes `order_placed` events and initializes payment for the order.
pub struct PaymentInitializer<W> {
    workflow: Arc<W>,
}

impl<W> PaymentInitializer<W> {
    pub fn new(workflow: Arc<W>) -> Self {
        Self { workflow }
    }
}

#[async_trait]
impl<W: OrderWorkflow> EventConsumer for PaymentInitializer<W> {
    fn name(&self) -> &'static str {
        CONSUMER_PAYMENT_INITIALIZER
    }

    async fn consume(&self, args: ConsumeArgs) -> Result<(), HandlerError> {
        if args.aggregate_type != AGGREGATE_TYPE_ORDER
            || args.event_type != EVENT_TYPE_ORDER_PLACED
        {
            return Ok(());
        }

        let event: OrderPlaced = serde_json::from_slice(&args.data)?;

        tracing::info!(order_id = %event.order_id, consumer = self.name(), "initializing payment");

        match self.workflow.initialize_pending_payment(&event.order_id).await {
            Ok(()) => {
                tracing::info!(order_id = %event.order_id, consumer = self.name(), "payment initialized");
                Ok(())
            }
            // Redelivered message, the payment is already past pending.
            Err(OrderError::PaymentStatusNotPending) => {
                tracing::info!(order_id = %event.order_id, consumer = self.name(), "payment already initialized");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Consumes `order_payment_initiated` events and processes payment.
pub struct PaymentProcessor<W> {
    workflow: Arc<W>,
}

impl<W> PaymentProcessor<W> {
    pub fn new(workflow: Arc<W>) -> Self {
        Self { workflow }
    }
}

#[async_trait]
impl<W: OrderWorkflow> EventConsumer for PaymentProcessor<W> {
    fn name(&self) -> &'static str {
        CONSUMER_PAYMENT_PROCESSOR
    }

    async fn consume(&self, args: ConsumeArgs) -> Result<(), HandlerError> {
        if args.aggregate_type != AGGREGATE_TYPE_ORDER
            || args.event_type != EVENT_TYPE_ORDER_PAYMENT_INITIATED
        {
            return Ok(());
        }

        let event: OrderPaymentInitiated = serde_json::from_slice(&args.data)?;

        tracing::info!(order_id = %event.order_id, consumer = self.name(), "processing payment");

        match self.workflow.process_payment(&event.order_id).await {
            Ok(()) => {
                tracing::info!(order_id = %event.order_id, consumer = self.name(), "payment processed");
                Ok(())
            }
            // Redelivered message, the payment is already past initiated.
            Err(OrderError::PaymentStatusNotInitiated) => {
                tracing::info!(order_id = %event.order_id, consumer = self.name(), "payment already processed");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Consumes every order event and keeps the materialized projection in
/// sync.
pub struct ProjectionIndexer<W> {
    workflow: Arc<W>,
}

impl<W> ProjectionIndexer<W> {
    pub fn new(workflow: Arc<W>) -> Self {
        Self { workflow }
    }
}

#[async_trait]
impl<W: OrderWorkflow> EventConsumer for ProjectionIndexer<W> {
    fn name(&self) -> &'static str {
        CONSUMER_PROJECTION_INDEXER
    }

    async fn consume(&self, args: ConsumeArgs) -> Result<(), HandlerError> {
        if args.aggregate_type != AGGREGATE_TYPE_ORDER {
            return Ok(());
        }

        tracing::info!(order_id = %args.aggregate_id, consumer = self.name(), "indexing projection");

        self.workflow
            .index_projection(&args.aggregate_id)
            .await
            .map_err(HandlerError::from)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Initialize(String),
        Process(String),
        Index(String),
    }

    #[derive(Default)]
    struct RecordingWorkflow {
        calls: Mutex<Vec<Call>>,
        initialize_result: Option<OrderError>,
        process_result: Option<OrderError>,
    }

    impl RecordingWorkflow {
        async fn calls(&self) -> Vec<Call> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl OrderWorkflow for RecordingWorkflow {
        async fn initialize_pending_payment(&self, order_id: &str) -> Result<(), OrderError> {
            self.calls
                .lock()
                .await
                .push(Call::Initialize(order_id.to_string()));
            match &self.initialize_result {
                Some(OrderError::PaymentStatusNotPending) => {
                    Err(OrderError::PaymentStatusNotPending)
                }
                Some(_) => Err(OrderError::NotFound),
                None => Ok(()),
            }
        }

        async fn process_payment(&self, order_id: &str) -> Result<(), OrderError> {
            self.calls
                .lock()
                .await
                .push(Call::Process(order_id.to_string()));
            match &self.process_result {
                Some(OrderError::PaymentStatusNotInitiated) => {
                    Err(OrderError::PaymentStatusNotInitiated)
                }
                Some(_) => Err(OrderError::NotFound),
                None => Ok(()),
            }
        }

        async fn index_projection(&self, order_id: &str) -> Result<(), OrderError> {
            self.calls
                .lock()
                .await
                .push(Call::Index(order_id.to_string()));
            Ok(())
        }
    }

    fn placed_args() -> ConsumeArgs {
        let event = OrderPlaced {
            order_id: "order-1".to_string(),
            timestamp: Utc::now(),
            vendor_id: "v".to_string(),
            customer_id: "c".to_string(),
            product_id: "p".to_string(),
            quantity: 1,
            total_price: 10.0,
            payment_method: "credit_card".to_string(),
        };
        ConsumeArgs {
            aggregate_id: "order-1".to_string(),
            aggregate_type: AGGREGATE_TYPE_ORDER.to_string(),
            event_type: EVENT_TYPE_ORDER_PLACED.to_string(),
            data: serde_json::to_vec(&event).unwrap(),
        }
    }

    #[tokio::test]
    async fn initializer_handles_order_placed() {
        let workflow = Arc::new(RecordingWorkflow::default());
        let consumer = PaymentInitializer::new(workflow.clone());

        consumer.consume(placed_args()).await.unwrap();

        assert_eq!(
            workflow.calls().await,
            vec![Call::Initialize("order-1".to_string())]
        );
    }

    #[tokio::test]
    async fn initializer_ignores_other_event_types() {
        let workflow = Arc::new(RecordingWorkflow::default());
        let consumer = PaymentInitializer::new(workflow.clone());

        let mut args = placed_args();
        args.event_type = EVENT_TYPE_ORDER_PAYMENT_INITIATED.to_string();
        consumer.consume(args).await.unwrap();

        assert!(workflow.calls().await.is_empty());
    }

    #[tokio::test]
    async fn initializer_ignores_other_aggregate_types() {
        let workflow = Arc::new(RecordingWorkflow::default());
        let consumer = PaymentInitializer::new(workflow.clone());

        let mut args = placed_args();
        args.aggregate_type = "invoice".to_string();
        consumer.consume(args).await.unwrap();

        assert!(workflow.calls().await.is_empty());
    }

    #[tokio::test]
    async fn initializer_treats_not_pending_as_success() {
        let workflow = Arc::new(RecordingWorkflow {
            initialize_result: Some(OrderError::PaymentStatusNotPending),
            ..RecordingWorkflow::default()
        });
        let consumer = PaymentInitializer::new(workflow.clone());

        consumer.consume(placed_args()).await.unwrap();
        assert_eq!(workflow.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn initializer_propagates_real_errors() {
        let workflow = Arc::new(RecordingWorkflow {
            initialize_result: Some(OrderError::NotFound),
            ..RecordingWorkflow::default()
        });
        let consumer = PaymentInitializer::new(workflow);

        let err = consumer.consume(placed_args()).await.unwrap_err();
        assert!(err.to_string().contains("order not found"));
    }

    #[tokio::test]
    async fn initializer_rejects_undecodable_payload() {
        let workflow = Arc::new(RecordingWorkflow::default());
        let consumer = PaymentInitializer::new(workflow.clone());

        let mut args = placed_args();
        args.data = b"not json".to_vec();
        assert!(consumer.consume(args).await.is_err());
        assert!(workflow.calls().await.is_empty());
    }

    #[tokio::test]
    async fn processor_handles_payment_initiated() {
        let workflow = Arc::new(RecordingWorkflow::default());
        let consumer = PaymentProcessor::new(workflow.clone());

        let event = OrderPaymentInitiated {
            order_id: "order-1".to_string(),
            timestamp: Utc::now(),
        };
        let args = ConsumeArgs {
            aggregate_id: "order-1".to_string(),
            aggregate_type: AGGREGATE_TYPE_ORDER.to_string(),
            event_type: EVENT_TYPE_ORDER_PAYMENT_INITIATED.to_string(),
            data: serde_json::to_vec(&event).unwrap(),
        };
        consumer.consume(args).await.unwrap();

        assert_eq!(
            workflow.calls().await,
            vec![Call::Process("order-1".to_string())]
        );
    }

    #[tokio::test]
    async fn processor_treats_not_initiated_as_success() {
        let workflow = Arc::new(RecordingWorkflow {
            process_result: Some(OrderError::PaymentStatusNotInitiated),
            ..RecordingWorkflow::default()
        });
        let consumer = PaymentProcessor::new(workflow.clone());

        let event = OrderPaymentInitiated {
            order_id: "order-1".to_string(),
            timestamp: Utc::now(),
        };
        let args = ConsumeArgs {
            aggregate_id: "order-1".to_string(),
            aggregate_type: AGGREGATE_TYPE_ORDER.to_string(),
            event_type: EVENT_TYPE_ORDER_PAYMENT_INITIATED.to_string(),
            data: serde_json::to_vec(&event).unwrap(),
        };
        consumer.consume(args).await.unwrap();
    }

    #[tokio::test]
    async fn indexer_handles_every_order_event() {
        let workflow = Arc::new(RecordingWorkflow::default());
        let consumer = ProjectionIndexer::new(workflow.clone());

        for event_type in [
            EVENT_TYPE_ORDER_PLACED,
            EVENT_TYPE_ORDER_PAYMENT_INITIATED,
            "order_paid",
        ] {
            let mut args = placed_args();
            args.event_type = event_type.to_string();
            consumer.consume(args).await.unwrap();
        }

        assert_eq!(workflow.calls().await.len(), 3);
        assert!(workflow
            .calls()
            .await
            .iter()
            .all(|call| *call == Call::Index("order-1".to_string())));
    }

    #[tokio::test]
    async fn indexer_ignores_other_aggregates() {
        let workflow = Arc::new(RecordingWorkflow::default());
        let consumer = ProjectionIndexer::new(workflow.clone());

        let mut args = placed_args();
        args.aggregate_type = "invoice".to_string();
        consumer.consume(args).await.unwrap();

        assert!(workflow.calls().await.is_empty());
    }

    #[test]
    fn consumer_group_ids_are_stable() {
        assert_eq!(CONSUMER_PAYMENT_INITIALIZER, "payment-initializer");
        assert_eq!(CONSUMER_PAYMENT_PROCESSOR, "payment-processor");
        assert_eq!(CONSUMER_PROJECTION_INDEXER, "projection-indexer");
    }
}
