//! 生成网关 HTTP 服务
//!
//! `POST /gemini` 接收 `{ action, data }`，返回 `{ success, data | error }`；
//! `GET /health` 用于存活检查。

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::error::{Error, Result};
use crate::services::gemini::{Gateway, GatewayRequest, GatewayResponse, TextGenerator};

type SharedGateway = Arc<Gateway<Arc<dyn TextGenerator>>>;

/// 构建路由
pub fn create_router(generator: Arc<dyn TextGenerator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/gemini", post(handle_gemini))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(Arc::new(Gateway::new(generator)))
}

/// 绑定地址并运行，直到收到 Ctrl-C
pub async fn serve(addr: SocketAddr, generator: Arc<dyn TextGenerator>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(generator))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
            log::info!("Gateway shutting down");
        })
        .await?;

    Ok(())
}

async fn handle_gemini(
    State(gateway): State<SharedGateway>,
    payload: std::result::Result<Json<GatewayRequest>, JsonRejection>,
) -> (StatusCode, Json<GatewayResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            log::warn!("Rejected gateway request: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(GatewayResponse::err(rejection.body_text())),
            );
        }
    };

    match gateway.execute(&request).await {
        Ok(text) => (StatusCode::OK, Json(GatewayResponse::ok(text))),
        Err(Error::InvalidInput(message)) => {
            log::warn!("Bad gateway request: {}", message);
            (StatusCode::BAD_REQUEST, Json(GatewayResponse::err(message)))
        }
        Err(e) => {
            log::error!("Error in gemini function: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(GatewayResponse::err(e.to_string())))
        }
    }
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
