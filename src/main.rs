use std::sync::Arc;

use axum::Router;
use secrecy::ExposeSecret;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pharma_relay::adapters::consumers::{AnalyticsConsumer, AuditConsumer};
use pharma_relay::adapters::events::InMemoryProcessedEventStore;
use pharma_relay::adapters::http::{notifications_router, with_http_layers, NotificationsAppState};
use pharma_relay::adapters::risk::HashRiskScorer;
use pharma_relay::adapters::websocket::{
    start_heartbeat, websocket_router, NotificationBridge, WebSocketState,
};
use pharma_relay::adapters::{
    IdempotentHandler, InMemoryBroker, QueueWorker, QueueWorkerConfig, RedisBroker,
};
use pharma_relay::application::{
    declare_topology, CommandDispatcher, ConnectionRegistry, EventPublisher, InteractionChecker,
    NotificationBroadcaster,
};
use pharma_relay::config::{AppConfig, BrokerBackend, LogFormat, ServerConfig};
use pharma_relay::domain::routing::{exchanges, queues, CanonicalTopology};
use pharma_relay::ports::{MessageBroker, QueueHandler};

#[tokio::main]
async fn main() {
    // --- Configuration ---
    let config = AppConfig::load().expect("Failed to load configuration");
    config.validate().expect("Invalid configuration");

    // --- Tracing ---
    init_tracing(&config.server);
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        broker = ?config.broker.backend,
        "Loaded configuration"
    );

    // --- Broker + topology ---
    let broker = connect_broker(&config).await;
    declare_topology(broker.as_ref(), &CanonicalTopology::standard())
        .await
        .expect("Failed to declare topology");

    // --- Notification core ---
    let registry = Arc::new(ConnectionRegistry::new());
    let broadcaster = Arc::new(NotificationBroadcaster::new(registry.clone()));
    let dispatcher = Arc::new(CommandDispatcher::new(
        registry.clone(),
        broadcaster.clone(),
    ));

    // --- Producers ---
    let publisher = Arc::new(
        EventPublisher::new(broker.clone()).with_mirror(exchanges::MEDICATIONS_FANOUT),
    );
    let checker = Arc::new(InteractionChecker::new(
        Arc::new(HashRiskScorer::new()),
        publisher.clone(),
    ));

    // --- Consumers ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_config = QueueWorkerConfig::default()
        .with_poll_interval(config.broker.poll_interval())
        .with_batch_size(config.broker.batch_size)
        .with_max_redeliveries(config.broker.max_redeliveries);

    let audit = Arc::new(AuditConsumer::new());
    let analytics = Arc::new(AnalyticsConsumer::new());
    let bridge = Arc::new(NotificationBridge::new(broadcaster.clone()));

    let consumers: Vec<(&str, Arc<dyn QueueHandler>)> = vec![
        (queues::MEDICATION_AUDIT, idempotent(audit.clone())),
        (queues::INTERACTION_AUDIT, idempotent(audit.clone())),
        (queues::AUDIT_MEDICATIONS, idempotent(audit)),
        (queues::ANALYTICS_MEDICATIONS, idempotent(analytics.clone())),
        (queues::ANALYTICS_RATINGS, idempotent(analytics)),
        (queues::NOTIFICATION_MEDICATIONS, idempotent(bridge)),
    ];
    let workers: Vec<JoinHandle<()>> = consumers
        .into_iter()
        .map(|(queue, handler)| {
            let worker =
                QueueWorker::with_config(broker.clone(), queue, handler, worker_config.clone());
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move { worker.run(shutdown).await })
        })
        .collect();
    tracing::info!(workers = workers.len(), "Queue workers started");

    // --- Heartbeat ---
    let heartbeat = start_heartbeat(
        registry.clone(),
        config.websocket.heartbeat_interval(),
        shutdown_rx.clone(),
    );

    // --- Router ---
    let ws_state = WebSocketState::new(registry.clone(), dispatcher)
        .with_welcome(config.websocket.welcome_message);
    let api_state = NotificationsAppState::new(broadcaster, publisher, checker);

    let app = Router::new()
        .merge(websocket_router(&config.websocket.path).with_state(ws_state))
        .nest("/api", notifications_router().with_state(api_state));
    let app = with_http_layers(app, &config.server);

    // --- Serve ---
    let addr = config
        .server
        .socket_addr()
        .expect("Invalid bind address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, ws_path = %config.websocket.path, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let closed = registry.close_all().await;
    tracing::info!(closed, "Closed WebSocket connections");

    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }
    let _ = heartbeat.await;

    tracing::info!("Graceful shutdown complete");
}

fn init_tracing(server: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| server.log_level.clone().into());

    let registry = tracing_subscriber::registry().with(filter);
    match server.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn connect_broker(config: &AppConfig) -> Arc<dyn MessageBroker> {
    match config.broker.backend {
        BrokerBackend::Memory => {
            tracing::warn!("Using in-memory broker; queued events are lost on restart");
            Arc::new(InMemoryBroker::new())
        }
        BrokerBackend::Redis => {
            let url = config
                .broker
                .redis_url
                .as_ref()
                .expect("validated: redis backend has a URL");
            let broker = RedisBroker::connect(url.expose_secret(), config.broker.key_prefix.clone())
                .await
                .expect("Failed to connect to Redis");
            tracing::info!(prefix = %config.broker.key_prefix, "Connected to Redis broker");
            Arc::new(broker)
        }
    }
}

/// Each worker gets its own processed-event record so that the same event
/// arriving on two queues is handled once per queue.
fn idempotent<H: QueueHandler + 'static>(handler: H) -> Arc<dyn QueueHandler> {
    Arc::new(IdempotentHandler::new(
        handler,
        Arc::new(InMemoryProcessedEventStore::new()),
    ))
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
