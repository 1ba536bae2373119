//! Core domain types for camplab
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Session** | One client-side conversation between a person and the remote assistant |
//! | **Message** | One entry in a session, authored by the person or the assistant |
//! | **Analysis** | Risk/confidence metadata the assistant attaches to a reply |
//! | **Solution Progress** | Derived phase, percentage and artifacts shown next to a reply |
//! | **Mode** | Whether the conversation is still greeting or already collaborating |
//!
//! Message content may contain lightweight markup (`**bold**`, bullet
//! prefixes). It is stored verbatim; interpreting it is a rendering concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================
// Messages
// ============================================

/// Creation-ordered message identifier.
///
/// Derived from the creation time in milliseconds, bumped when two messages
/// land in the same millisecond so ids stay strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Risk level reported by the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(format!("unknown risk level: {}", s)),
        }
    }
}

impl TryFrom<String> for RiskLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Assistant-provided analysis of a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub risk_level: RiskLevel,
    /// Percentage, always within 0..=100
    #[serde(deserialize_with = "deserialize_percentage")]
    pub confidence: u8,
    #[serde(rename = "responseType")]
    pub response_kind: String,
    #[serde(
        rename = "collaborationType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub collaboration_kind: Option<String>,
}

impl Analysis {
    pub fn new(risk_level: RiskLevel, confidence: i64, response_kind: impl Into<String>) -> Self {
        Self {
            risk_level,
            confidence: clamp_percentage(confidence),
            response_kind: response_kind.into(),
            collaboration_kind: None,
        }
    }

    pub fn with_collaboration(mut self, kind: impl Into<String>) -> Self {
        self.collaboration_kind = Some(kind.into());
        self
    }
}

/// Derived collaboration state attached to an assistant message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionProgress {
    pub phase: String,
    /// Percentage, always within 0..=100
    pub progress: u8,
    pub artifacts: BTreeSet<String>,
}

/// One entry in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_progress: Option<SolutionProgress>,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Confidence from the analysis, if any
    pub fn confidence(&self) -> Option<u8> {
        self.analysis.as_ref().map(|a| a.confidence)
    }
}

// ============================================
// Session
// ============================================

/// Conversation mode. Moves from `Greeting` to `Collaborating` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Greeting,
    Collaborating,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Greeting => "greeting",
            SessionMode::Collaborating => "collaborating",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Round-trip state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    /// A user message is out for a reply. `prior_messages` is the message
    /// count before that user message was appended.
    AwaitingReply { prior_messages: usize },
}

impl ExchangeState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ExchangeState::Idle)
    }
}

/// Clamp any integer into a 0..=100 percentage
pub fn clamp_percentage(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

fn deserialize_percentage<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw.is_nan() {
        return Ok(0);
    }
    Ok(clamp_percentage(raw.round() as i64))
}
