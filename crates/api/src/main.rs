//! Order service entry point.
//!
//! Wires Postgres, Kafka, the transactional producer, the controller, the
//! three consumers, and the HTTP server under one cancellation token. The
//! first task failure cancels all peers.

use std::sync::Arc;

use api::routes::orders::AppState;
use domain::order::consumers::{
    CONSUMER_PAYMENT_INITIALIZER, CONSUMER_PAYMENT_PROCESSOR, CONSUMER_PROJECTION_INDEXER,
    PaymentInitializer, PaymentProcessor, ProjectionIndexer,
};
use domain::{Controller, OrderCommands};
use event_store::{
    BusError, ConsumerOptions, EventConsumer, KafkaEventBus, KafkaReader, PgTransactor,
    PostgresEventStore, TransactionalProducer, run_consumer,
};
use projections::PgProjectionRepo;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type AppController = Controller<
    TransactionalProducer<PostgresEventStore, KafkaEventBus, PgTransactor>,
    PostgresEventStore,
    PgProjectionRepo,
    PgTransactor,
>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn spawn_consumer<C>(
    tasks: &mut JoinSet<Result<(), String>>,
    token: &CancellationToken,
    brokers: &str,
    topic: &str,
    consumer: C,
) where
    C: EventConsumer + 'static,
{
    let reader = KafkaReader::connect(brokers, consumer.name(), topic)
        .unwrap_or_else(|e| panic!("failed to connect consumer {}: {e}", consumer.name()));

    let token = token.clone();
    tasks.spawn(async move {
        match run_consumer(token, reader, &consumer, ConsumerOptions::default()).await {
            Ok(()) | Err(BusError::Cancelled) => Ok(()),
            Err(err) => Err(err.to_string()),
        }
    });
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Load configuration
    let config = api::Config::from_env();

    // 4. Connect Postgres and run migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url())
        .await
        .expect("failed to connect to postgres");

    let store = PostgresEventStore::new(pool.clone(), &config.events_table);
    store.run_migrations().await.expect("migrations failed");

    // 5. Connect Kafka and assemble the controller
    let brokers = config.kafka_brokers();
    let bus =
        KafkaEventBus::connect(&brokers, &config.events_topic).expect("failed to connect to kafka");

    let transactor = PgTransactor::new(pool.clone());
    let producer = TransactionalProducer::new(store.clone(), bus, transactor.clone());
    let controller: Arc<AppController> = Arc::new(Controller::new(
        producer,
        store,
        PgProjectionRepo::new(pool),
        transactor,
    ));

    tracing::info!("starting order service");

    // 6. Shared cancellation: signal handler cancels everything
    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            token.cancel();
        });
    }

    // 7. Consumer tasks, one Kafka group each
    let mut tasks: JoinSet<Result<(), String>> = JoinSet::new();
    spawn_consumer(
        &mut tasks,
        &token,
        &brokers,
        &config.events_topic,
        PaymentInitializer::new(controller.clone()),
    );
    spawn_consumer(
        &mut tasks,
        &token,
        &brokers,
        &config.events_topic,
        PaymentProcessor::new(controller.clone()),
    );
    spawn_consumer(
        &mut tasks,
        &token,
        &brokers,
        &config.events_topic,
        ProjectionIndexer::new(controller.clone()),
    );
    tracing::info!(
        consumers = ?[
            CONSUMER_PAYMENT_INITIALIZER,
            CONSUMER_PAYMENT_PROCESSOR,
            CONSUMER_PROJECTION_INDEXER,
        ],
        "consumers started"
    );

    // 8. HTTP server
    let state = Arc::new(AppState {
        orders: controller as Arc<dyn OrderCommands>,
    });
    let app = api::create_app(state, metrics_handle);

    let addr = config.http_addr();
    tracing::info!(%addr, "starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");

    {
        let token = token.clone();
        tasks.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .map_err(|e| e.to_string())
        });
    }

    // 9. Supervise: the first failure cancels all peers
    let mut failed = false;
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(error = %err, "task failed, shutting down");
                failed = true;
                token.cancel();
            }
            Err(join_err) => {
                tracing::error!(error = %join_err, "task panicked, shutting down");
                failed = true;
                token.cancel();
            }
        }
    }

    if failed {
        std::process::exit(1);
    }

    tracing::info!("all tasks shut down gracefully");
}
