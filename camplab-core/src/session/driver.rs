//! Async driver for one conversation
//!
//! [`LabSession`] runs the full round-trip: accept the user message, call the
//! gateway, then append the reply or the fixed failure message. The session
//! lock is released while the gateway call is outstanding, so a concurrent
//! `send` sees the AWAITING_REPLY state and is rejected instead of queued.
//!
//! The lock is only ever held for synchronous store transitions, never across
//! an `.await`. A `send` future dropped mid-flight (timeout, `select!`, task
//! abort) completes the exchange through the failure branch on drop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::archive::{ConversationArchive, ConversationRecord};
use crate::gateway::AssistantGateway;
use crate::types::{Message, SessionMode};

use super::store::{PendingExchange, SendRejected, Session};

/// What happened to one `send`
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Nothing was appended
    Rejected(SendRejected),
    /// The assistant's reply was appended
    Replied(Message),
    /// The gateway failed; the fixed apology was appended
    Failed(Message),
}

impl SendOutcome {
    /// The appended assistant message, if any
    pub fn message(&self) -> Option<&Message> {
        match self {
            SendOutcome::Rejected(_) => None,
            SendOutcome::Replied(message) | SendOutcome::Failed(message) => Some(message),
        }
    }
}

/// Archive counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveStats {
    pub saved: usize,
    pub failed: usize,
}

/// A session wired to a gateway
pub struct LabSession<G> {
    session: Mutex<Session>,
    gateway: G,
    archive: Option<ConversationArchive>,
    archived: AtomicUsize,
    archive_failures: AtomicUsize,
}

impl<G: AssistantGateway> LabSession<G> {
    pub fn new(session: Session, gateway: G) -> Self {
        Self {
            session: Mutex::new(session),
            gateway,
            archive: None,
            archived: AtomicUsize::new(0),
            archive_failures: AtomicUsize::new(0),
        }
    }

    /// Archive every successful exchange (requires `identity.user_id`)
    pub fn with_archive(mut self, archive: Option<ConversationArchive>) -> Self {
        self.archive = archive;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Send one user message. Never fails: gateway errors become a
    /// conversation entry.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let (session_id, user_id, pending) = {
            let mut session = lock(&self.session);
            match session.append_user_message(text) {
                Ok(pending) => (
                    session.id().to_string(),
                    session.identity().user_id.clone(),
                    pending,
                ),
                Err(reason) => {
                    tracing::debug!(session_id = %session.id(), %reason, "Send rejected");
                    return SendOutcome::Rejected(reason);
                }
            }
        };

        let exchange = InFlightExchange::new(&self.session);
        let result = self.gateway.ask(&pending.request).await;

        let outcome = exchange.complete(|session| match result {
            Ok(reply) => SendOutcome::Replied(session.append_assistant_message(reply).clone()),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Assistant gateway call failed");
                SendOutcome::Failed(session.record_failure().clone())
            }
        });

        if let (SendOutcome::Replied(reply), Some(user_id)) = (&outcome, user_id) {
            self.archive_exchange(&session_id, user_id, &pending, reply)
                .await;
        }

        outcome
    }

    async fn archive_exchange(
        &self,
        session_id: &str,
        user_id: String,
        pending: &PendingExchange,
        reply: &Message,
    ) {
        let Some(archive) = &self.archive else {
            return;
        };

        let record = ConversationRecord {
            id: None,
            user_id,
            session_id: session_id.to_string(),
            message: pending.user_message.content.clone(),
            response: reply.content.clone(),
            context: Some(pending.request.context.clone()),
            created_at: Utc::now(),
        };

        match archive.save_exchange(&record).await {
            Ok(()) => {
                self.archived.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(session_id = %session_id, "Archived exchange");
            }
            Err(e) => {
                // Local conversation is unaffected
                self.archive_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(session_id = %session_id, error = %e, "Failed to archive exchange");
            }
        }
    }

    pub fn archive_stats(&self) -> ArchiveStats {
        ArchiveStats {
            saved: self.archived.load(Ordering::Relaxed),
            failed: self.archive_failures.load(Ordering::Relaxed),
        }
    }

    /// Copy of the messages so far
    pub async fn messages(&self) -> Vec<Message> {
        lock(&self.session).messages().to_vec()
    }

    pub async fn mode(&self) -> SessionMode {
        lock(&self.session).mode()
    }

    /// Run `f` against the current session state
    pub async fn inspect<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&lock(&self.session))
    }

    pub fn into_session(self) -> Session {
        self.session
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Store transitions never leave a session half-updated, so a poisoned lock is still usable
fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outstanding gateway call. Dropped before `complete`, it records the failure entry.
struct InFlightExchange<'a> {
    session: &'a Mutex<Session>,
    armed: bool,
}

impl<'a> InFlightExchange<'a> {
    fn new(session: &'a Mutex<Session>) -> Self {
        Self {
            session,
            armed: true,
        }
    }

    fn complete<R>(mut self, f: impl FnOnce(&mut Session) -> R) -> R {
        self.armed = false;
        f(&mut lock(self.session))
    }
}

impl Drop for InFlightExchange<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut session = lock(self.session);
        if session.is_awaiting_reply() {
            tracing::warn!(session_id = %session.id(), "Send cancelled while awaiting reply");
            session.record_failure();
        }
    }
}
