use std::process::ExitCode;

use pal_tutor::config::Config;
use pal_tutor::logging::init_tracing;
use pal_tutor::state::AppState;
use pal_tutor::tutor::{MasteryTracker, TrackerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level);

    let tracker_config = match TrackerConfig::from_env() {
        Ok(tracker_config) => tracker_config,
        Err(err) => {
            tracing::error!(error = %err, "invalid tracker configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        p_init = tracker_config.defaults.p_init,
        p_transit = tracker_config.defaults.p_transit,
        p_slip = tracker_config.defaults.p_slip,
        p_guess = tracker_config.defaults.p_guess,
        mastery_threshold = tracker_config.mastery_threshold,
        streak = tracker_config.streak_length,
        "tracker configured"
    );

    let tracker = match MasteryTracker::new(tracker_config) {
        Ok(tracker) => tracker,
        Err(err) => {
            tracing::error!(error = %err, "invalid tracker configuration");
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::from_config(&config, tracker) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "question source not initialized");
            return ExitCode::FAILURE;
        }
    };

    let app = pal_tutor::create_app(state);

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "bind listener failed");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "pal-tutor listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Graceful shutdown complete");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
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
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
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
}
