use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;

mod console_logic;
use console_logic::{commands, config, logger, terminal::TerminalRenderer};

use lib_dashboard::dashboard::query::QueryBuilder;
use lib_dashboard::ingestors::snapshot_poll::SnapshotFetcher;
use lib_dashboard::ingestors::socketio_frame::handshake_url;
use lib_dashboard::{
    ApiClient, ClientOptions, DashboardController, LiveSocketConfig, LiveSocketIngestor, Scheduler,
};

fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run());
    // The stdin reader sits in a blocking read that cannot be cancelled.
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

async fn run() -> Result<()> {
    let config = config::load_config();
    logger::setup_logging(&config.log_dir(), config.log_level())?;

    let settings = config.to_settings();
    settings.validate()?;
    log::info!("Dashboard API at {}", settings.base_url);

    let options = ClientOptions {
        timeout: settings.request_timeout(),
        max_retries: settings.http_retries,
        ..ClientOptions::default()
    };
    let token = Some(settings.api_token.clone()).filter(|t| !t.is_empty());
    let api = Arc::new(ApiClient::new(&settings.base_url, token, &options)?);

    let query = QueryBuilder::new(settings.api_token.clone());
    let fetcher = SnapshotFetcher::new(Arc::clone(&api), query.clone()).with_events_limit(settings.events_limit);
    let (controller, handle) = DashboardController::with_fetcher(
        fetcher,
        query,
        settings.initial_filters.clone(),
        TerminalRenderer::stdout(),
    );

    let cancel = CancellationToken::new();
    let controller_task = tokio::spawn(controller.run(cancel.clone()));

    let live = if config.live_enabled() {
        let ingestor = LiveSocketIngestor::new(
            LiveSocketConfig {
                url: handshake_url(settings.socket_base(), &settings.api_token)?,
                reconnect_delay: settings.reconnect_delay(),
                connect_timeout: settings.request_timeout(),
            },
            handle.clone(),
        );
        let token = cancel.clone();
        Some(async move { ingestor.run(token).await })
    } else {
        log::info!("Live channel disabled; relying on polling only.");
        None
    };

    let tasks = Scheduler::new(settings.refresh_interval(), settings.clock_interval()).start(
        handle.clone(),
        cancel.clone(),
        live,
    );
    tokio::spawn(commands::read_commands(
        handle,
        settings.initial_filters.clone(),
        cancel.clone(),
    ));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = cancel.cancelled() => {}
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    tasks.shutdown().await;
    let dashboard = controller_task.await?;
    log::info!(
        "Shutdown complete. Last successful poll: {}",
        dashboard
            .state()
            .last_success()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    Ok(())
}
