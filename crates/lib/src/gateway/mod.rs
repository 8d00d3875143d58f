//! Gateway: HTTP server for the WeChat webhook.
//!
//! Single port. `GET /` is a health probe, `GET {wechat.path}` answers the signature handshake,
//! `POST {wechat.path}` answers messages. The message route always returns 200 so WeChat never
//! retries; failures are logged with a [`WebhookError`] kind instead.

mod server;

pub use server::{build_router, run_gateway, GatewayState, WebhookError};
