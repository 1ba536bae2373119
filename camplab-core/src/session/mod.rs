//! Client-side conversation sessions
//!
//! [`Session`] is the synchronous store and state machine for one
//! conversation; [`LabSession`] drives it against an assistant gateway.
//! Sessions are plain values: any number can coexist, and none outlive
//! their owner.

mod context;
mod driver;
mod store;

pub use context::ContextSettings;
pub use driver::{ArchiveStats, LabSession, SendOutcome};
pub use store::{PendingExchange, SendRejected, Session};
