use crate::config::Config;
use crate::error::LineArtError;
use crate::lineart::{self, codec, ConversionParameters, EncodedLineArt};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{request::Parts, HeaderValue},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

/// Conversion request: a base64 image plus optional knobs
#[derive(Deserialize)]
pub struct ConvertRequest {
    /// Base64 image, optionally wrapped in a data URL
    pub image: String,
    #[serde(flatten)]
    pub parameters: ConversionParameters,
}

/// Conversion response
#[derive(Serialize)]
pub struct ConvertResponse {
    /// PNG data URL of the line art
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub processing_time_ms: u64,
}

/// Root response
#[derive(Serialize)]
pub struct ServiceResponse {
    pub status: String,
    pub service: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub supported_formats: Vec<String>,
    pub default_parameters: ConversionParameters,
    pub max_body_size_bytes: usize,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState {
        config: Arc::new(config),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router with all middleware attached
pub fn router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .route("/convert", post(handle_convert))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let patterns: Vec<String> = config
        .cors_origins
        .iter()
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();
    tracing::info!("CORS restricted to {:?}", patterns);

    layer.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _parts: &Parts| {
            origin.to_str().is_ok_and(|origin| {
                patterns
                    .iter()
                    .any(|pattern| origin_matches(pattern, origin))
            })
        },
    ))
}

/// Exact match, or a single `*` wildcard such as `https://*.vercel.app`
fn origin_matches(pattern: &str, origin: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            origin.len() > prefix.len() + suffix.len()
                && origin.starts_with(prefix)
                && origin.ends_with(suffix)
        }
        None => pattern == origin,
    }
}

/// Handle conversion requests
async fn handle_convert(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, LineArtError> {
    let start = Instant::now();

    let line_art = convert_payload(&state, payload).await.map_err(|e| {
        if e.is_client_error() {
            tracing::warn!("Rejected conversion request: {}", e);
        } else {
            tracing::error!("Conversion failed: {}", e);
        }
        e
    })?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    for step in &line_art.steps {
        tracing::debug!("{} took {}ms", step.name, step.time_ms);
    }
    tracing::info!(
        "Conversion completed in {}ms, output {}x{}",
        processing_time_ms,
        line_art.width,
        line_art.height
    );

    Ok(Json(ConvertResponse {
        image: encode_data_url(&line_art.png),
        width: line_art.width,
        height: line_art.height,
        processing_time_ms,
    }))
}

async fn convert_payload(
    state: &AppState,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<EncodedLineArt, LineArtError> {
    let Json(request) = payload.map_err(|e| LineArtError::InvalidRequest(e.body_text()))?;
    let bytes = decode_data_url(&request.image)?;
    let parameters = request.parameters;

    // CPU-bound; keep it off the async workers
    let timeout = state.config.conversion_timeout;
    let task = tokio::task::spawn_blocking(move || lineart::convert(&bytes, &parameters));
    tokio::time::timeout(timeout, task)
        .await
        .map_err(|_| LineArtError::Timeout {
            secs: timeout.as_secs(),
        })?
        .map_err(|e| LineArtError::Internal(format!("Conversion task failed: {}", e)))?
}

/// Strip an optional `data:...;base64,` header and decode the payload
fn decode_data_url(data: &str) -> Result<Vec<u8>, LineArtError> {
    let payload = data.split_once(',').map_or(data, |(_, rest)| rest);
    let cleaned: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| LineArtError::InvalidInput(format!("Invalid base64 image data: {}", e)))
}

fn encode_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png))
}

/// Handle root requests
async fn handle_root() -> impl IntoResponse {
    Json(ServiceResponse {
        status: "ok".to_string(),
        service: "line-art-converter".to_string(),
    })
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        supported_formats: codec::SUPPORTED_FORMATS
            .iter()
            .map(|f| f.to_string())
            .collect(),
        default_parameters: ConversionParameters::default(),
        max_body_size_bytes: state.config.max_body_size,
    })
}
