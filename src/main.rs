use std::sync::Arc;

use snap_send::{
    build_app,
    config::Config,
    domain::{store::SystemClock, sweeper::spawn_sweeper},
    logging, port, AppState,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let state = AppState::from_config(&config, Arc::new(SystemClock));
    state.store.ensure_directories().await?;

    if let Some(every) = config.sweep_interval {
        spawn_sweeper(state.store.clone(), every);
        info!(interval_secs = every.as_secs(), "periodic expiry sweep enabled");
    }

    let listener = match port::bind_listener(config.bind_ip()?, config.port, config.port_attempts)
        .await
    {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, "unable to start server");
            return Err(err.into());
        }
    };
    let bound_port = listener.local_addr()?.port();
    let lan_ip = port::local_ip();

    info!(
        bind_addr = %config.bind_addr,
        port = bound_port,
        expiry_secs = config.expiry.window().as_secs(),
        "server starting"
    );
    info!(url = %format!("http://{lan_ip}:{bound_port}/"), "desktop page");
    info!(
        url = %format!("http://{lan_ip}:{bound_port}/mobile.html"),
        "mobile page"
    );

    let app = build_app(state);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
