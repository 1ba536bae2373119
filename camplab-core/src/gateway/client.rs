//! HTTP client for the hosted assistant function
//!
//! One POST per message with a JSON body and a static bearer credential.
//! Hosted functions answer either with the reply object itself or wrapped
//! as `{"data": {...}}`; both are accepted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use crate::config::GatewayConfig;
use crate::error::{Error, Result};

use super::{AssistantGateway, AssistantReply, AssistantRequest};

/// Response body, bare or wrapped in a `data` envelope
#[derive(Deserialize)]
#[serde(untagged)]
enum ReplyEnvelope {
    Wrapped { data: AssistantReply },
    Bare(AssistantReply),
}

impl ReplyEnvelope {
    fn into_reply(self) -> AssistantReply {
        match self {
            ReplyEnvelope::Wrapped { data } => data,
            ReplyEnvelope::Bare(reply) => reply,
        }
    }
}

/// HTTP implementation of [`AssistantGateway`]
pub struct HttpGateway {
    http_client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl HttpGateway {
    /// Create a new gateway from configuration
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        config.validate()?;

        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::Config("gateway.endpoint is required".to_string()))?;
        let api_key = config.resolved_api_key().ok_or_else(|| {
            Error::Config("gateway.api_key is required".to_string())
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = format!("Bearer {}", api_key);
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint,
            timeout_secs: config.timeout_secs,
        })
    }

    /// The URL messages are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::GatewayTimeout(self.timeout_secs)
        } else {
            Error::transport(format!("HTTP request failed: {}", e))
        }
    }
}

#[async_trait]
impl AssistantGateway for HttpGateway {
    async fn ask(&self, request: &AssistantRequest) -> Result<AssistantReply> {
        tracing::debug!(
            endpoint = %self.endpoint,
            chars = request.message.chars().count(),
            "Sending message to assistant"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Gateway {
                status: Some(status.as_u16()),
                message: error_text,
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let envelope: ReplyEnvelope = serde_json::from_slice(&body).map_err(|e| Error::Gateway {
            status: Some(status.as_u16()),
            message: format!("failed to parse reply: {}", e),
        })?;

        Ok(envelope.into_reply())
    }
}
