mod handlers;

pub use handlers::{generate, health, readiness, root};

use crate::{
    config::{Config, ServerConfig},
    orchestrator::Orchestrator,
};
use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use reqwest::Url;
use std::io;
use std::sync::Arc;

pub const SERVICE_NAME: &str = "memeflow";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: Config) -> Self {
        Self {
            orchestrator,
            config: Arc::new(config),
        }
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::root))
        .route("/generate", web::post().to(handlers::generate))
        .route("/health", web::get().to(handlers::health))
        .route("/health/ready", web::get().to(handlers::readiness))
        .service(
            web::scope("/api/v1")
                .route("/generate-meme", web::post().to(handlers::generate))
                .route("/health", web::get().to(handlers::health))
                .route("/health/ready", web::get().to(handlers::readiness)),
        );
}

/// Only the configured origins are allowed. `*` opens it to any origin
/// without credentials.
pub fn cors(config: &ServerConfig) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .expose_headers([REQUEST_ID_HEADER])
        .max_age(3600);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return cors.allow_any_origin();
    }

    config
        .allowed_origins
        .iter()
        .filter(|origin| match Url::parse(origin) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Ignoring invalid CORS origin `{}`: {}", origin, e);
                false
            }
        })
        .fold(cors.supports_credentials(), |cors, origin| {
            cors.allowed_origin(origin)
        })
}

pub async fn run(config: Config) -> io::Result<()> {
    let orchestrator = Orchestrator::from_config(&config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let address = (config.server.host.clone(), config.server.port);
    let state = AppState::new(orchestrator, config);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors(&state.config.server))
            .wrap(middleware::Logger::new("%r %s %Dms"))
            .configure(routes)
    })
    .bind(address)?
    .run()
    .await
}
