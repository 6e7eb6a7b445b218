mod auction;
mod clock;
mod constants;
mod errors;
mod identity;
mod listings;
mod middlewares;
mod models;
mod notify;
mod purchases;
mod routes;
mod state;
mod store;

#[cfg(test)]
mod tests;

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use auction::scheduler::AuctionScheduler;
use state::AppState;

#[derive(OpenApi)]
#[openapi(tags(
    (name = "Auction", description = "Bidding, settlement and sweeps"),
    (name = "Listing", description = "Artwork listings and direct purchase"),
    (name = "Purchase", description = "Purchase lifecycle"),
))]
struct ApiDoc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
struct Resp {
    utc: u64,
}

async fn get_utc() -> Json<Resp> {
    let unixtime = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    Json(Resp {
        utc: unixtime.as_secs(),
    })
}

async fn root() -> Json<Value> {
    Json(json!({ "msg": "I am GET /" }))
}

async fn health_check() -> (StatusCode, String) {
    let health = true;
    match health {
        true => (StatusCode::OK, "Healthy!".to_string()),
        false => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Not healthy!".to_string(),
        ),
    }
}

pub fn create_service(state: Arc<AppState>) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().on_request(|req: &Request<Body>, _: &tracing::Span| {
            let path = req.uri().path();
            tracing::info!("Got request with path: {}", path);
        });

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/v1/auctions", routes::auctions::router())
        .nest("/v1/listings", routes::listings::router())
        .nest("/v1/purchases", routes::purchases::router())
        .split_for_parts();

    router
        .route("/v1/", get(root))
        .route("/v1/utc", get(get_utc))
        .route("/v1/health", get(health_check))
        .route(
            "/v1/openapi.json",
            get(move || {
                let api = api.clone();
                async move { Json(api) }
            }),
        )
        .layer(trace_layer)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    tracing::info!("API Handler Start!!!");

    let state = Arc::new(AppState::new().await);

    let scheduler = AuctionScheduler::new(
        state.settlement.clone(),
        state.expiry.clone(),
        state.config.sweep_startup_delay,
        state.config.sweep_period,
    );
    scheduler.start();

    let app = create_service(state.clone());
    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    tracing::info!("Listening on {}", state.config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    Ok(())
}
