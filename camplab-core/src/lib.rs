//! # camplab-core
//!
//! Core library for camplab - a collaborative DeFi assistant client.
//!
//! This library provides:
//! - Domain types for messages, analysis and solution progress
//! - The session store and its single-flight round-trip state machine
//! - The assistant gateway (HTTP) and a caller-layered retry wrapper
//! - Progress derivation from assistant replies
//! - A searchable platform knowledge base used as request context
//! - An optional hosted conversation archive
//! - Configuration management and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use camplab_core::gateway::HttpGateway;
//! use camplab_core::{Config, LabSession, SendOutcome, Session};
//!
//! # async fn run() -> camplab_core::Result<()> {
//! let config = Config::load()?;
//! let gateway = HttpGateway::new(&config.gateway)?;
//! let lab = LabSession::new(Session::from_config(&config)?, gateway);
//!
//! if let SendOutcome::Replied(message) = lab.send("Let's optimize my yield strategy").await {
//!     println!("{}", message.content);
//! }
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use knowledge::KnowledgeBase;
pub use persona::Persona;
pub use session::{LabSession, SendOutcome, SendRejected, Session};
pub use types::*;

// Public modules
pub mod archive;
pub mod config;
pub mod error;
pub mod format;
pub mod gateway;
pub mod knowledge;
pub mod logging;
pub mod persona;
pub mod progress;
pub mod session;
pub mod types;
