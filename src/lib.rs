use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod port;

use config::Config;
use domain::messages::MessageBoard;
use domain::store::{Clock, Store};
use http::assets::AssetConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub messages: Arc<MessageBoard>,
    pub assets: Arc<AssetConfig>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        store: Store,
        messages: MessageBoard,
        assets: AssetConfig,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            store: Arc::new(store),
            messages: Arc::new(messages),
            assets: Arc::new(assets),
            max_body_bytes,
        }
    }

    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let store_config = config.store_config();
        let withheld = vec![
            store_config.inbound_dir.clone(),
            store_config.outbound_dir.clone(),
        ];
        Self::new(
            Store::new(store_config, clock),
            MessageBoard::new(config.message_capacity),
            AssetConfig {
                root: config.static_root.clone(),
                landing_page: config.landing_page.clone(),
                withheld,
            },
            config.max_body_bytes,
        )
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::handlers::landing))
        .route("/api/files", get(http::handlers::list_received))
        .route("/api/shared-files", get(http::handlers::list_shared))
        .route("/api/messages", get(http::handlers::list_messages))
        .route("/api/clear-messages", get(http::handlers::clear_messages))
        .route("/api/send-message", post(http::handlers::send_message))
        .route("/received_files/{*name}", get(http::handlers::fetch_received))
        .route("/shared_files/{*name}", get(http::handlers::fetch_shared))
        .route("/upload", post(http::handlers::upload))
        .route("/upload-to-mobile", post(http::handlers::upload_to_mobile))
        .route("/{*asset}", get(http::handlers::static_asset))
        .method_not_allowed_fallback(http::handlers::method_not_allowed)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
