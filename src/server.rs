//! HTTP server initialization and runtime setup.
//!
//! Handles key loading, the user store, the request pipeline and the Axum
//! server lifecycle, including shutdown escalated from request handlers.

use crate::application::services::UserService;
use crate::auth::{Authenticator, KeyStore};
use crate::config::Config;
use crate::domain::entities::NewUser;
use crate::domain::repositories::UserRepository;
use crate::infrastructure::persistence::{InMemoryUserRepository, admin_roles};
use crate::metrics::Metrics;
use crate::routes::{app_router, build_app};
use crate::state::AppState;
use crate::web::shutdown::{self, ShutdownReceiver};

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::{Router, ServiceExt};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower_http::normalize_path::NormalizePath;

/// Builds the shared state from configuration.
///
/// Loads every key in `keys_folder`, checks the active signing key and seeds
/// the administrator when one is configured.
///
/// # Errors
///
/// Returns an error if the key folder cannot be read, the active kid has no
/// signing key, or the seed administrator cannot be created.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let keys = KeyStore::from_dir(&config.keys_folder).with_context(|| {
        format!("loading keys from {}", config.keys_folder.display())
    })?;

    let authenticator = Arc::new(
        Authenticator::new(config.active_kid.clone(), Arc::new(keys))
            .context("constructing authenticator")?,
    );
    tracing::info!(kid = %authenticator.active_kid(), "Authenticator ready");

    let token_ttl = chrono::Duration::from_std(config.token_ttl)
        .context("AUTH_TOKEN_TTL is out of range")?;
    let repository = Arc::new(InMemoryUserRepository::new(&config.issuer, token_ttl));

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let admin = repository
            .create(
                NewUser {
                    name: "Administrator".to_string(),
                    email: email.clone(),
                    roles: admin_roles(),
                    password: password.clone(),
                },
                Utc::now(),
            )
            .await
            .context("seeding administrator")?;
        tracing::info!(user_id = %admin.id, email = %admin.email, "Seeded administrator");
    }

    let users = Arc::new(UserService::new(
        repository as Arc<dyn UserRepository>,
        authenticator.clone(),
    ));

    Ok(AppState::new(users, authenticator, Arc::new(Metrics::new())))
}

/// Runs the HTTP server with the given configuration.
///
/// Builds the state and the router, binds `listen_addr` and hands over to
/// [`serve`].
///
/// # Errors
///
/// Returns an error if:
/// - State construction fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let state = build_state(&config).await?;

    let (signal, receiver) = shutdown::channel();
    let app = build_app(&state, signal, config.request_timeout);
    let cancel = app.cancellation_token();
    let router = app_router(app);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    serve(listener, router, receiver, config.shutdown_timeout, cancel).await
}

/// Serves `router` on `listener` until one of:
/// - a request reports a fatal error through `receiver`
/// - SIGINT (Ctrl+C)
/// - SIGTERM (unix)
///
/// then stops accepting connections and drains in-flight requests for at
/// most `shutdown_timeout`. Requests still running after that are cancelled
/// through `cancel` and the server task is aborted.
///
/// # Errors
///
/// Returns an error if the server fails or its task panics.
pub async fn serve(
    listener: TcpListener,
    router: NormalizePath<Router>,
    receiver: ShutdownReceiver,
    shutdown_timeout: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let (draining_tx, draining_rx) = oneshot::channel();

    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(router),
        )
        .with_graceful_shutdown(async move {
            wait_for_shutdown(receiver).await;
            let _ = draining_tx.send(());
        })
        .await
    });

    tokio::select! {
        res = &mut server => {
            res??;
            return Ok(());
        }
        _ = draining_rx => {}
    }

    tracing::info!(timeout = ?shutdown_timeout, "Draining in-flight requests");

    match tokio::time::timeout(shutdown_timeout, &mut server).await {
        Ok(res) => {
            res??;
            tracing::info!("Shutdown complete");
        }
        Err(_) => {
            tracing::warn!("Graceful shutdown timed out, cancelling in-flight requests");
            cancel.cancel();
            server.abort();
        }
    }

    Ok(())
}

/// Resolves when a handler escalates a fatal error or the process is asked
/// to stop.
async fn wait_for_shutdown(mut receiver: ShutdownReceiver) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        Some(reason) = receiver.recv() => {
            tracing::error!(reason = %reason, "Fatal error reported, shutting down");
        }
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
