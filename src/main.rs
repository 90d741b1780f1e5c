use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::{signal, sync::mpsc};
use tracing::{error, info};

use dasai_mochi_api as api;
use api::provider::PaymentProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("database connection failed")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let repo = Arc::new(api::repositories::SeaOrmOrderRepository::new(Arc::new(
        db_pool,
    )));

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Payment provider
    let midtrans = api::provider::MidtransClient::new(cfg.midtrans_config())
        .context("failed to build Midtrans client")?;
    let provider_mode = midtrans.mode();
    let provider: Arc<dyn PaymentProvider> = Arc::new(midtrans);

    let services = api::handlers::AppServices::new(&cfg, provider, repo, event_sender);

    let reconciler = cfg
        .reconcile_interval()
        .map(|interval| services.reconciler.clone().spawn(interval));
    if reconciler.is_none() {
        info!("Stale order reconciler disabled");
    }

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;

    let app_state = api::AppState {
        config: Arc::new(cfg.clone()),
        services,
        provider_mode,
    };
    let app = api::build_router(app_state);

    info!(
        port = cfg.port,
        environment = %cfg.environment,
        midtrans_mode = provider_mode,
        "Dasai Mochi payment server starting"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = reconciler {
        handle.abort();
    }
    info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
