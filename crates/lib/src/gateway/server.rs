//! Gateway HTTP server (single port).

use crate::config::{self, Config, Secrets};
use crate::llm::{GeminiClient, GenerateError, TextGenerator};
use crate::wechat::{
    verify_signature, InboundMessage, MessageError, MsgType, VerificationQuery,
    VerificationRequest, VerifyError,
};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the gateway. Read-only after startup.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub secrets: Arc<Secrets>,
    pub generator: Arc<dyn TextGenerator>,
}

impl GatewayState {
    pub fn new(config: Config, secrets: Secrets, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            config: Arc::new(config),
            secrets: Arc::new(secrets),
            generator,
        }
    }
}

/// Why a message POST produced no reply. Logged; never surfaced to WeChat.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("reading request body: {0}")]
    Body(#[from] BytesRejection),
    #[error("request body is not utf-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("{0}")]
    Parse(MessageError),
    #[error("{0}")]
    Generate(#[from] GenerateError),
    #[error("{0}")]
    Render(MessageError),
}

impl WebhookError {
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookError::Body(_) => "body",
            WebhookError::Encoding(_) => "encoding",
            WebhookError::Parse(_) => "xml",
            WebhookError::Generate(_) => "generate",
            WebhookError::Render(_) => "render",
        }
    }
}

/// Router with the health probe and the webhook routes. Split out from `run_gateway` for tests.
pub fn build_router(state: GatewayState) -> Router {
    let wechat_path = state.config.wechat.path.clone();
    Router::new()
        .route("/", get(health_http))
        .route(&wechat_path, get(wechat_verify).post(wechat_message))
        .with_state(state)
}

pub async fn run_gateway(mut config: Config) -> Result<()> {
    let secrets = config::resolve_secrets(&config)?;
    config.wechat.path = normalize_webhook_path(&config.wechat.path)?;
    let gemini = GeminiClient::new(&config.gemini, secrets.gemini_api_key.clone())
        .context("building gemini client")?;
    log::info!("using gemini model {}", gemini.model());
    if config.wechat.verify_messages {
        log::info!("message signature verification enabled");
    }

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let wechat_path = config.wechat.path.clone();
    let state = GatewayState::new(config, secrets, Arc::new(gemini));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {} (webhook at {})", bind_addr, wechat_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Trimmed webhook route. Must start with '/' and must not be the root (the health probe lives there).
fn normalize_webhook_path(raw: &str) -> Result<String> {
    let path = raw.trim();
    if !path.starts_with('/') || path == "/" {
        anyhow::bail!(
            "wechat.path must be a route below the root like \"/wechat\" (got {:?})",
            raw
        );
    }
    Ok(path.to_string())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// In-flight requests are allowed to finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "webhook": state.config.wechat.path,
    }))
}

/// GET {wechat.path}: server URL handshake. 400 on a missing parameter, 403 on a bad signature,
/// otherwise echo `echostr`.
async fn wechat_verify(
    State(state): State<GatewayState>,
    Query(query): Query<VerificationQuery>,
) -> Response {
    let req = match VerificationRequest::try_from(query) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("wechat handshake rejected: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    if let Err(e) = req.verify(&state.secrets.wechat_token) {
        log::warn!("wechat handshake rejected: {}", e);
        return StatusCode::FORBIDDEN.into_response();
    }
    log::info!("wechat handshake verified");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        req.echostr,
    )
        .into_response()
}

/// POST {wechat.path}: one inbound message, one passive reply. Always 200 once past the
/// optional signature check; an empty body means "no reply". The query string is only read
/// when that check is enabled.
async fn wechat_message(
    State(state): State<GatewayState>,
    query: Result<Query<VerificationQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if state.config.wechat.verify_messages {
        let query = match query {
            Ok(Query(q)) => q,
            Err(e) => {
                log::warn!("wechat message rejected: {}", e);
                return (StatusCode::BAD_REQUEST, e.body_text()).into_response();
            }
        };
        match check_message_signature(&state.secrets.wechat_token, &query) {
            Ok(()) => {}
            Err(e @ VerifyError::MissingParam(_)) => {
                log::warn!("wechat message rejected: {}", e);
                return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
            }
            Err(e) => {
                log::warn!("wechat message rejected: {}", e);
                return StatusCode::FORBIDDEN.into_response();
            }
        }
    }
    let result = match body {
        Ok(body) => handle_message(&state, &body).await,
        Err(e) => Err(WebhookError::from(e)),
    };
    match result {
        Ok(xml) => (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml")], xml).into_response(),
        Err(e) => {
            log::error!("wechat message dropped ({}): {}", e.kind(), e);
            StatusCode::OK.into_response()
        }
    }
}

fn check_message_signature(token: &str, query: &VerificationQuery) -> Result<(), VerifyError> {
    let signature = query
        .signature
        .as_deref()
        .ok_or(VerifyError::MissingParam("signature"))?;
    let timestamp = query
        .timestamp
        .as_deref()
        .ok_or(VerifyError::MissingParam("timestamp"))?;
    let nonce = query
        .nonce
        .as_deref()
        .ok_or(VerifyError::MissingParam("nonce"))?;
    verify_signature(token, timestamp, nonce, signature)
}

/// Decode, answer, encode. Non-text messages get the canned reply without calling the model.
async fn handle_message(state: &GatewayState, body: &[u8]) -> Result<String, WebhookError> {
    let xml = std::str::from_utf8(body)?;
    let msg = InboundMessage::parse(xml).map_err(WebhookError::Parse)?;
    log::info!(
        "wechat message from {} (type {}, {} chars)",
        msg.from_user,
        msg.msg_type.as_str(),
        msg.content.chars().count()
    );
    let content = match &msg.msg_type {
        MsgType::Text => match state.generator.generate(&msg.content).await? {
            Some(text) => text,
            None => {
                log::info!("model returned no text, sending fallback reply");
                state.config.replies.fallback.clone()
            }
        },
        MsgType::Other(_) => state.config.replies.unsupported.clone(),
    };
    let reply = msg.reply(content, chrono::Utc::now().timestamp());
    reply.to_xml().map_err(WebhookError::Render)
}
