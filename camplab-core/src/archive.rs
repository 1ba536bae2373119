//! Hosted conversation archive
//!
//! Sessions themselves are never persisted locally. When an archive is
//! configured, each completed exchange is written to a table on the hosted
//! backend through its REST table API, and past exchanges can be listed back.
//!
//! ## Usage
//!
//! Enable the archive in `~/.config/camplab/config.toml`:
//!
//! ```toml
//! [archive]
//! enabled = true
//! base_url = "https://project.supabase.co"
//! api_key = "anon-key"
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::ArchiveConfig;
use crate::error::{Error, Result};

/// One archived exchange, as stored in the backend table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Assigned by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub session_id: String,
    /// What the user sent
    pub message: String,
    /// What the assistant answered
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// HTTP client for the conversation table
pub struct ConversationArchive {
    http_client: reqwest::Client,
    table_url: String,
}

impl ConversationArchive {
    /// Create a new archive client from configuration
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| Error::Config("archive.base_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("archive.api_key is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("Prefer", HeaderValue::from_static("return=minimal"));

        let mut key_header = HeaderValue::from_str(api_key)
            .map_err(|e| Error::Config(format!("invalid archive api_key: {}", e)))?;
        key_header.set_sensitive(true);
        headers.insert("apikey", key_header);

        let mut auth_header = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| Error::Config(format!("invalid archive api_key: {}", e)))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            table_url: format!(
                "{}/rest/v1/{}",
                base_url,
                urlencoding::encode(config.table.trim())
            ),
        })
    }

    /// Build an archive only when the config is enabled and complete
    pub fn from_config(config: &ArchiveConfig) -> Result<Option<Self>> {
        if !config.is_ready() {
            return Ok(None);
        }
        Self::new(config).map(Some)
    }

    /// Store one exchange
    pub async fn save_exchange(&self, record: &ConversationRecord) -> Result<()> {
        let response = self
            .http_client
            .post(&self.table_url)
            .json(&[record])
            .send()
            .await
            .map_err(|e| Error::Archive(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        Err(Error::Archive(format!(
            "API error ({}): {}",
            status, error_text
        )))
    }

    /// Most recent exchanges for a user, newest first
    pub async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<ConversationRecord>> {
        let url = format!(
            "{}?select=*&user_id=eq.{}&order=created_at.desc&limit={}",
            self.table_url,
            urlencoding::encode(user_id),
            limit
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Archive(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let records: Vec<ConversationRecord> = response
                .json()
                .await
                .map_err(|e| Error::Archive(format!("failed to parse response: {}", e)))?;
            Ok(records)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Archive(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }
}
