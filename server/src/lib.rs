use axum::{extract::{Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use wordex_core::{QueryHandler, QueryResult};

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub words: usize,
    pub locations: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub handler: QueryHandler,
}

pub fn build_app(handler: QueryHandler) -> Router {
    router(handler, None)
}

/// Like [`build_app`], but paths outside the API are served from `dir`.
/// Unknown paths get `dir/index.html` so client-side routes resolve.
pub fn build_app_with_static(handler: QueryHandler, dir: &Path) -> Router {
    router(handler, Some(dir))
}

fn router(handler: QueryHandler, static_dir: Option<&Path>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let mut app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/search", get(search_handler))
        .route("/api/stats", get(stats_handler));
    if let Some(dir) = static_dir {
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(spa);
    }

    app.with_state(AppState { handler })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Ranked results for `?query=`. Served from the batch cache when the query
/// was part of the build's query file, computed fresh (and not cached) otherwise.
/// A blank query yields `[]`; only a missing parameter is rejected.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<QueryResult>>, (StatusCode, String)> {
    let Some(query) = params.query else {
        return Err((StatusCode::BAD_REQUEST, "No query provided".into()));
    };
    let results = state.handler.results_for(&query);
    tracing::debug!(%query, hits = results.len(), "search");
    Ok(Json(results))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    // one guard so both counts describe the same index state
    let index = state.handler.index().read();
    Json(StatsResponse { words: index.num_words(), locations: index.num_locations() })
}
