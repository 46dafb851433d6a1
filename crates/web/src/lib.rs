pub use crate::common::RouteResult;

use axum::{routing::on, Router};
use common::{route_not_found, METHOD_FILTER_ALL};
use registry::{database::Database, manager::LocationManager};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod api;
pub mod common;
pub mod config;
pub mod hateoas;
pub mod middleware;

#[derive(Clone)]
pub struct WebState<D: Database> {
    pub locations: LocationManager<D>,
}

impl<D: Database> WebState<D> {
    pub fn new(database: D) -> Self {
        Self {
            locations: LocationManager::new(database),
        }
    }
}

/// The complete application router.
pub fn router<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
}

pub async fn start_web_server<D: Database>(
    state: WebState<D>,
    address: &str,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state).into_make_service()).await
}
