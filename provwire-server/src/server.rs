use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use provwire_core::{ErrorCode, RpcError};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::messages::{
    CallRequest, CallResponse, ConfigureRequest, ConfigureResponse, ConstructRequest,
    ConstructResponse, GetSchemaRequest, GetSchemaResponse, PluginInfo,
};
use crate::provider::Provider;
use crate::servicer::ProviderServer;

/// Largest request body the engine may send, 400 MiB.
pub const MAX_BODY_BYTES: usize = 1024 * 1024 * 400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 0,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// An [`RpcError`] on its way out as an HTTP response.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub RpcError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.code {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            ErrorCode::Canceled => StatusCode::REQUEST_TIMEOUT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::warn!("Request rejected: {}", self.0);
        }
        (status, Json(self.0)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the HTTP surface for a provider.
pub fn router<P: Provider>(server: Arc<ProviderServer<P>>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/rpc/construct", post(handle_construct::<P>))
        .route("/rpc/call", post(handle_call::<P>))
        .route("/rpc/configure", post(handle_configure::<P>))
        .route("/rpc/plugin-info", post(handle_plugin_info::<P>))
        .route("/rpc/schema", post(handle_schema::<P>))
        .route("/health", get(handle_health::<P>))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

// Empty bodies decode as the request's defaults.
fn decode<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.is_empty() {
        return Ok(T::default());
    }
    tracing::debug!("Body size: {} bytes", body.len());
    Ok(serde_json::from_slice(body).map_err(RpcError::from)?)
}

async fn handle_construct<P: Provider>(
    State(server): State<Arc<ProviderServer<P>>>,
    body: Bytes,
) -> ApiResult<ConstructResponse> {
    let req: ConstructRequest = decode(&body)?;
    Ok(Json(server.construct(req).await?))
}

async fn handle_call<P: Provider>(
    State(server): State<Arc<ProviderServer<P>>>,
    body: Bytes,
) -> ApiResult<CallResponse> {
    let req: CallRequest = decode(&body)?;
    Ok(Json(server.call(req).await?))
}

async fn handle_configure<P: Provider>(
    State(server): State<Arc<ProviderServer<P>>>,
    body: Bytes,
) -> ApiResult<ConfigureResponse> {
    let req: ConfigureRequest = decode(&body)?;
    Ok(Json(server.configure(req).await?))
}

async fn handle_plugin_info<P: Provider>(
    State(server): State<Arc<ProviderServer<P>>>,
) -> ApiResult<PluginInfo> {
    Ok(Json(server.plugin_info().await?))
}

async fn handle_schema<P: Provider>(
    State(server): State<Arc<ProviderServer<P>>>,
    body: Bytes,
) -> ApiResult<GetSchemaResponse> {
    let req: GetSchemaRequest = decode(&body)?;
    Ok(Json(server.get_schema(req).await?))
}

async fn handle_health<P: Provider>(
    State(server): State<Arc<ProviderServer<P>>>,
) -> impl IntoResponse {
    let health_response = serde_json::json!({
        "status": "healthy",
        "server": "provwire",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": {
            "version": server.provider().version(),
        },
        "endpoints": {
            "construct": "/rpc/construct",
            "call": "/rpc/call",
            "configure": "/rpc/configure",
            "pluginInfo": "/rpc/plugin-info",
            "schema": "/rpc/schema",
            "health": "/health"
        }
    });

    (StatusCode::OK, Json(health_response))
}
