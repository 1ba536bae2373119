//! Context bundle sent along with each user message

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::persona::Persona;
use crate::types::SessionMode;

use super::store::Session;

/// How much history and knowledge travels with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSettings {
    /// Earlier messages included as `previousMessages`
    pub window: usize,
    /// Cap on `campKnowledge.relevantKnowledge`
    pub max_knowledge_snippets: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            window: 3,
            max_knowledge_snippets: 20,
        }
    }
}

/// Assemble the context for `text`, from the messages that precede it.
pub(crate) fn build_context(session: &Session, text: &str, now: DateTime<Utc>) -> Value {
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    match session.persona() {
        Persona::Advisor => json!({
            "sessionId": session.id(),
            "timestamp": timestamp,
        }),
        Persona::Partner => {
            let settings = session.settings();
            let messages = session.messages();
            let start = messages.len().saturating_sub(settings.window);
            let knowledge = session.knowledge();

            json!({
                "sessionId": session.id(),
                "timestamp": timestamp,
                "mode": "camp_collaborative_partnership",
                "solutionMode": session.mode() == SessionMode::Collaborating,
                "partnershipGoal": "camp_solution_development",
                "campKnowledge": knowledge.collaborative_context(text, settings.max_knowledge_snippets),
                "insuranceFund": knowledge.section("insurance").cloned().unwrap_or(Value::Null),
                "previousMessages": &messages[start..],
                "expertise": session.persona().expertise(),
                "specializations": session.persona().specializations(),
            })
        }
    }
}
