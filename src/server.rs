//! HTTP surface: `/search`, `/health` and the service descriptor at `/`.

use std::any::Any;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;
use crate::gateway::BotGateway;
use crate::parser::{parse_bot_response, Record};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<BotGateway>,
    query_pattern: Arc<Regex>,
    service_name: String,
    include_raw_response: bool,
}

impl AppState {
    pub fn new(config: &Config, gateway: BotGateway) -> Result<Self> {
        let pattern = format!(r"^\+{}[0-9]{{10}}$", regex::escape(&config.search.country_code));
        let query_pattern = Regex::new(&pattern)
            .with_context(|| format!("Invalid query pattern: {}", pattern))?;

        Ok(Self {
            gateway: Arc::new(gateway),
            query_pattern: Arc::new(query_pattern),
            service_name: config.server.service_name.clone(),
            include_raw_response: config.server.include_raw_response,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Found {
        success: bool,
        count: usize,
        data: Vec<Record>,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
    NoResults {
        message: &'static str,
        data: Vec<Record>,
    },
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/search", post(search).options(preflight))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn run(config: &Config, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("{} listening on {}", config.server.service_name, addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}

async fn home(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/search": "POST - Search for phone number",
            "/health": "GET - Health check",
        },
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.service_name.clone(),
    })
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn search(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    let span = info_span!("search", request_id = %Uuid::new_v4());
    run_search(&state, &body).instrument(span).await.map(Json)
}

async fn run_search(state: &AppState, body: &[u8]) -> Result<SearchResponse, ApiError> {
    let query = read_query(body)?;
    if query.is_empty() {
        return Err(ApiError::MissingQuery);
    }
    if !state.query_pattern.is_match(&query) {
        info!("Rejected malformed query");
        return Err(ApiError::InvalidFormat);
    }

    info!("Relaying query {} to bot", query);
    let reply = match state.gateway.query(&query).await {
        Ok(Some(text)) => text,
        Ok(None) => {
            warn!("Bot gave no text reply");
            return Err(ApiError::NoBotResponse);
        }
        Err(e) => {
            error!("Bot gateway failed: {:#}", e);
            return Err(ApiError::NoBotResponse);
        }
    };

    let records = parse_bot_response(&reply);
    if records.is_empty() {
        info!("Reply contained no records");
        return Ok(SearchResponse::NoResults {
            message: "No results found",
            data: Vec::new(),
        });
    }

    info!("Parsed {} record(s)", records.len());
    Ok(SearchResponse::Found {
        success: true,
        count: records.len(),
        data: records,
        raw_response: state.include_raw_response.then_some(reply),
    })
}

/// Trimmed `query` from the body. An empty body or absent field reads as "".
fn read_query(body: &[u8]) -> Result<String, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(String::new());
    }
    let request: SearchRequest = serde_json::from_slice(body)
        .context("Unreadable search request body")
        .map_err(ApiError::Internal)?;
    Ok(request.query.unwrap_or_default().trim().to_string())
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::Internal(anyhow::anyhow!("handler panicked: {}", detail)).into_response()
}
