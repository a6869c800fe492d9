//! Kanban Board Server
//!
//! Layered architecture:
//! - domain: entities and the storage-facing contract
//! - repository: SQLite data access, one transaction per operation
//! - mutator: the single write path (validate, authorize, mutate, broadcast)
//! - broadcast / ws: change fan-out to subscribed sockets
//! - commands: HTTP handlers

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod broadcast;
pub mod commands;
pub mod config;
pub mod domain;
pub mod mutator;
pub mod repository;
pub mod session;
pub mod storage;
pub mod ws;

use broadcast::ChangeBroadcaster;
use config::{ConfigError, ServerConfig};
use domain::DomainError;
use mutator::Mutator;
use repository::{init_db, DbConn, Repositories};
use storage::{BlobStore, LocalBlobStore};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Database(#[from] DomainError),
    #[error("logger: {0}")]
    Logger(#[from] rolling_logger::LoggerError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repos: Arc<Repositories>,
    pub mutator: Arc<Mutator>,
    pub broadcaster: Arc<ChangeBroadcaster>,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(conn: DbConn, blobs: Arc<dyn BlobStore>, config: &ServerConfig) -> Self {
        let repos = Arc::new(Repositories::new(conn));
        let broadcaster = Arc::new(ChangeBroadcaster::new(config.channel_capacity));
        let mutator = Arc::new(Mutator::new(
            repos.clone(),
            broadcaster.clone(),
            blobs.clone(),
            config.max_attachment_bytes,
        ));
        Self {
            repos,
            mutator,
            broadcaster,
            blobs,
        }
    }

    pub async fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let conn = init_db(&config.db_path).await?;
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(config.blob_dir.clone()));
        Ok(Self::new(conn, blobs, config))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/session", get(commands::current_user))
        .route(
            "/api/boards",
            get(commands::list_boards).post(commands::create_board),
        )
        .route(
            "/api/boards/{id}",
            get(commands::get_board).delete(commands::delete_board),
        )
        .route("/api/boards/{id}/name", post(commands::rename_board))
        .route("/api/boards/{id}/reindex", post(commands::reindex_board))
        .route("/api/moves", post(commands::apply_move))
        .route("/api/lists", post(commands::add_list))
        .route("/api/lists/name", post(commands::rename_list))
        .route("/api/lists/delete", post(commands::delete_list))
        .route("/api/cards", post(commands::add_card))
        .route("/api/cards/delete", post(commands::delete_card))
        .route("/api/cards/description", post(commands::update_description))
        .route("/api/cards/{id}", get(commands::get_card))
        .route("/api/attachments", post(commands::add_attachment))
        .route("/api/attachments/delete", post(commands::delete_attachment))
        .route(
            "/api/invitations",
            get(commands::list_invitations).post(commands::invite_user),
        )
        .route(
            "/api/invitations/{id}/accept",
            post(commands::accept_invitation),
        )
        .route(
            "/api/invitations/{id}/decline",
            post(commands::decline_invitation),
        )
        .route("/assets/{*key}", get(commands::get_asset))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Open storage, bind and serve until the process is stopped.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let state = AppState::from_config(&config).await?;
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
