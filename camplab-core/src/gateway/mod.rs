//! Assistant Gateway
//!
//! The single request/response boundary to the remote assistant. A call
//! sends the latest user message plus an opaque context bundle and receives
//! a structured reply.
//!
//! The gateway is stateless and never retries on its own; every transport
//! problem, timeout, non-2xx status or undecodable body surfaces as one
//! [`Error`](crate::Error). Retry, when wanted, is layered on top with
//! [`RetryingGateway`].

mod client;
mod retry;

pub use client::HttpGateway;
pub use retry::RetryingGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Analysis;

/// Request body sent to the assistant
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub message: String,
    /// Caller-assembled context; any serializable shape is accepted
    pub context: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

/// Successful assistant reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub response: String,
    #[serde(default)]
    pub analysis: Option<Analysis>,
    #[serde(default)]
    pub recommendations: Option<Vec<String>>,
    #[serde(default)]
    pub follow_up: Option<String>,
}

impl AssistantReply {
    /// Reply with text only
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            analysis: None,
            recommendations: None,
            follow_up: None,
        }
    }
}

/// Anything that can answer an [`AssistantRequest`]
#[async_trait]
pub trait AssistantGateway: Send + Sync {
    async fn ask(&self, request: &AssistantRequest) -> Result<AssistantReply>;
}

#[async_trait]
impl<G: AssistantGateway + ?Sized> AssistantGateway for std::sync::Arc<G> {
    async fn ask(&self, request: &AssistantRequest) -> Result<AssistantReply> {
        (**self).ask(request).await
    }
}
