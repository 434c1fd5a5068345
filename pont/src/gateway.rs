//! # Gateway
//!
//! The HTTP surface of `pont`. It maps requests to the core:
//!
//! | Route | Core call |
//! |---|---|
//! | `GET /actuator/health` | none, liveness probe |
//! | `GET /actuator/services` | [`Gateway::introspect`] |
//! | `POST /v1/{service}/{method}` | [`Gateway::invoke`] |
//!
//! Any other path answers `404`. Core failures are written as the [`ProxyError`] JSON body with
//! the status code of its error code.
pub mod handlers;
pub mod routes;

#[cfg(test)]
mod integration_test;

use async_trait::async_trait;
use pont_core::{CallContext, Metadata, Proxy, ProxyError};
use std::{sync::Arc, time::Duration};

/// What the HTTP surface needs from the core.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    fn is_ready(&self) -> bool;

    async fn invoke(
        &self,
        ctx: &CallContext,
        service: &str,
        method: &str,
        input: &[u8],
        metadata: &Metadata,
    ) -> Result<Vec<u8>, ProxyError>;

    async fn introspect(&self) -> Result<Vec<u8>, ProxyError>;
}

#[async_trait]
impl Gateway for Proxy {
    fn is_ready(&self) -> bool {
        Proxy::is_ready(self)
    }

    async fn invoke(
        &self,
        ctx: &CallContext,
        service: &str,
        method: &str,
        input: &[u8],
        metadata: &Metadata,
    ) -> Result<Vec<u8>, ProxyError> {
        Proxy::invoke(self, ctx, service, method, input, metadata).await
    }

    async fn introspect(&self) -> Result<Vec<u8>, ProxyError> {
        Proxy::introspect(self).await
    }
}

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<dyn Gateway>,
    call_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>, call_timeout: Option<Duration>) -> Self {
        Self {
            gateway,
            call_timeout,
        }
    }

    /// A fresh context for one inbound call.
    fn call_context(&self) -> CallContext {
        match self.call_timeout {
            Some(timeout) => CallContext::with_timeout(timeout),
            None => CallContext::new(),
        }
    }
}
