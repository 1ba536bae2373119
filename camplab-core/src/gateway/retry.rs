//! Caller-layered retry around any gateway

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::{AssistantGateway, AssistantReply, AssistantRequest};

const INITIAL_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Retries transient failures (no response, timeouts, 5xx) with exponential backoff.
///
/// Client errors and undecodable 2xx bodies fail immediately.
pub struct RetryingGateway<G> {
    inner: G,
    max_retries: usize,
    initial_delay: Duration,
}

impl<G: AssistantGateway> RetryingGateway<G> {
    pub fn new(inner: G, max_retries: usize) -> Self {
        Self {
            inner,
            max_retries,
            initial_delay: INITIAL_DELAY,
        }
    }

    /// Override the first backoff delay (doubles per attempt, capped at 30s)
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: AssistantGateway> AssistantGateway for RetryingGateway<G> {
    async fn ask(&self, request: &AssistantRequest) -> Result<AssistantReply> {
        let mut last_error = None;
        let mut delay = self.initial_delay;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    "Retrying assistant call (attempt {}/{}), waiting {:?}",
                    attempt + 1,
                    self.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, MAX_DELAY);
            }

            match self.inner.ask(request).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_transient() => {
                    tracing::warn!("Transient error calling assistant: {}", e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::transport("max retries exceeded")))
    }
}
