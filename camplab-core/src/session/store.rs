//! Session Store
//!
//! Owns the message list, mode and round-trip state of one conversation.
//! All transitions are synchronous; the async driver in
//! [`LabSession`](super::LabSession) calls the gateway between them.
//!
//! ```text
//! IDLE --append_user_message--> AWAITING_REPLY --append_assistant_message--> IDLE
//!                                              \--record_failure----------> IDLE
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::config::{Config, IdentityConfig};
use crate::error::Result;
use crate::gateway::{AssistantReply, AssistantRequest};
use crate::knowledge::KnowledgeBase;
use crate::persona::Persona;
use crate::progress;
use crate::types::{ExchangeState, Message, MessageId, Role, SessionMode, SolutionProgress};

use super::context::{build_context, ContextSettings};

/// Why a user message was not accepted. Both cases are silent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    /// Text was empty after trimming
    EmptyMessage,
    /// A reply is still outstanding
    InFlight,
}

impl fmt::Display for SendRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendRejected::EmptyMessage => write!(f, "message is empty"),
            SendRejected::InFlight => write!(f, "a reply is still pending"),
        }
    }
}

/// An accepted user message and the gateway request it produced
#[derive(Debug, Clone)]
pub struct PendingExchange {
    pub user_message: Message,
    pub request: AssistantRequest,
}

/// One client-side conversation
#[derive(Debug)]
pub struct Session {
    id: String,
    persona: Persona,
    knowledge: Arc<KnowledgeBase>,
    settings: ContextSettings,
    identity: IdentityConfig,
    messages: Vec<Message>,
    mode: SessionMode,
    state: ExchangeState,
    last_id: u64,
}

impl Session {
    /// Start a conversation seeded with the persona's welcome message
    pub fn new(persona: Persona, knowledge: Arc<KnowledgeBase>) -> Self {
        let mut session = Self {
            id: format!("{}-{}", persona.session_prefix(), uuid::Uuid::new_v4()),
            persona,
            knowledge,
            settings: ContextSettings::default(),
            identity: IdentityConfig::default(),
            messages: Vec::new(),
            mode: SessionMode::Greeting,
            state: ExchangeState::Idle,
            last_id: 0,
        };

        let mut welcome = session.new_message(Role::Assistant, persona.welcome_content());
        welcome.analysis = Some(persona.welcome_analysis());
        welcome.solution_progress = persona.welcome_progress();
        session.messages.push(welcome);
        session
    }

    /// Build a session from loaded configuration
    ///
    /// Loads `session.knowledge_path` when set, otherwise the built-in knowledge base.
    pub fn from_config(config: &Config) -> Result<Self> {
        let knowledge = match &config.session.knowledge_path {
            Some(path) => KnowledgeBase::load_from(path)?,
            None => KnowledgeBase::builtin()?,
        };

        Ok(Self::new(config.session.persona, Arc::new(knowledge))
            .with_identity(config.identity.clone())
            .with_context_settings(ContextSettings {
                window: config.session.context_window,
                max_knowledge_snippets: config.session.max_knowledge_snippets,
            }))
    }

    pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_context_settings(mut self, settings: ContextSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn identity(&self) -> &IdentityConfig {
        &self.identity
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    /// All messages, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn is_awaiting_reply(&self) -> bool {
        !self.state.is_idle()
    }

    /// Progress shown on the most recent message that carries any
    pub fn latest_progress(&self) -> Option<&SolutionProgress> {
        self.messages
            .iter()
            .rev()
            .find_map(|m| m.solution_progress.as_ref())
    }

    /// Accept a user message and prepare the gateway request for it.
    ///
    /// Rejected without any change when the trimmed text is empty or a reply
    /// is still outstanding.
    pub fn append_user_message(
        &mut self,
        text: &str,
    ) -> std::result::Result<PendingExchange, SendRejected> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendRejected::EmptyMessage);
        }
        if self.is_awaiting_reply() {
            return Err(SendRejected::InFlight);
        }

        let prior_messages = self.messages.len();
        let context = build_context(self, text, Utc::now());

        let user_message = self.new_message(Role::User, text);
        self.messages.push(user_message.clone());
        self.state = ExchangeState::AwaitingReply { prior_messages };

        tracing::debug!(
            session_id = %self.id,
            message_id = %user_message.id,
            "User message accepted"
        );

        Ok(PendingExchange {
            user_message,
            request: AssistantRequest {
                message: text.to_string(),
                context,
                user_id: self.identity.user_id.clone(),
                wallet_address: self.identity.wallet_address.clone(),
            },
        })
    }

    /// Append the assistant's reply and return to idle.
    pub fn append_assistant_message(&mut self, reply: AssistantReply) -> &Message {
        let prior_messages = self.take_prior_count();
        let tracks_progress = self.persona.tracks_progress();

        let mut message = self.new_message(Role::Assistant, &reply.response);
        message.analysis = reply.analysis.map(|analysis| {
            if tracks_progress {
                analysis.with_collaboration("active_collaboration")
            } else {
                analysis
            }
        });
        message.recommendations = reply.recommendations;
        message.follow_up = reply.follow_up;
        if tracks_progress {
            message.solution_progress = Some(progress::derive(&reply.response, prior_messages));
        }

        if self.mode == SessionMode::Greeting && progress::is_collaborative(&reply.response) {
            tracing::info!(session_id = %self.id, "Session switched to collaborating mode");
            self.mode = SessionMode::Collaborating;
        }

        self.push(message)
    }

    /// Append the persona's fixed apology (confidence 0) and return to idle.
    pub fn record_failure(&mut self) -> &Message {
        self.take_prior_count();

        let persona = self.persona;
        let mut message = self.new_message(Role::Assistant, persona.failure_content());
        message.analysis = Some(persona.failure_analysis());
        self.push(message)
    }

    fn take_prior_count(&mut self) -> usize {
        let prior = match self.state {
            ExchangeState::AwaitingReply { prior_messages } => prior_messages,
            ExchangeState::Idle => self.messages.len(),
        };
        self.state = ExchangeState::Idle;
        prior
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    fn new_message(&mut self, role: Role, content: &str) -> Message {
        let created_at = Utc::now();
        let millis = u64::try_from(created_at.timestamp_millis()).unwrap_or(0);
        self.last_id = millis.max(self.last_id + 1);

        Message {
            id: MessageId(self.last_id),
            role,
            content: content.to_string(),
            created_at,
            analysis: None,
            recommendations: None,
            follow_up: None,
            solution_progress: None,
        }
    }
}
