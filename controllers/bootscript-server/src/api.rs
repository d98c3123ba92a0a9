//! HTTP surface
//!
//! - `GET /boot/v1/bootscript?mac=|name=|host=|nid=[&profile=]` returns the
//!   iPXE script as `text/plain`
//! - `GET /boot/v1/service/status` provider health
//! - `GET /boot/v1/service/stats` provider and cache statistics

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bootscript::BootScriptController;
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Boot script request parameters
///
/// When several identifiers are given the first of mac, name, host, nid wins.
#[derive(Debug, Default, Deserialize)]
pub struct BootScriptQuery {
    pub mac: Option<String>,
    pub name: Option<String>,
    pub host: Option<String>,
    pub nid: Option<String>,
    pub profile: Option<String>,
}

impl BootScriptQuery {
    fn identifier(&self) -> Option<&str> {
        [&self.mac, &self.name, &self.host, &self.nid]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

pub fn router(controller: Arc<BootScriptController>) -> Router {
    Router::new()
        .route("/boot/v1/bootscript", get(boot_script))
        .route("/boot/v1/service/status", get(service_status))
        .route("/boot/v1/service/stats", get(service_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(controller)
}

async fn boot_script(
    State(controller): State<Arc<BootScriptController>>,
    Query(query): Query<BootScriptQuery>,
) -> Response {
    let Some(identifier) = query.identifier() else {
        return (
            StatusCode::BAD_REQUEST,
            "one of mac, name, host or nid is required\n",
        )
            .into_response();
    };
    let profile = query.profile.as_deref().unwrap_or_default();
    debug!("Boot script request for {} (profile '{}')", identifier, profile);

    let script = controller
        .generate_boot_script_with_provider_fallback(identifier, profile)
        .await;
    ([(header::CONTENT_TYPE, "text/plain")], script).into_response()
}

async fn service_status(State(controller): State<Arc<BootScriptController>>) -> Response {
    let health = controller.health_check().await;
    let code = if health.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "provider_type": controller.provider_type(),
        "health": health,
    });
    (code, Json(body)).into_response()
}

async fn service_stats(State(controller): State<Arc<BootScriptController>>) -> Json<serde_json::Value> {
    Json(json!({
        "provider": controller.provider_stats(),
        "cache": controller.cache_stats(),
    }))
}
