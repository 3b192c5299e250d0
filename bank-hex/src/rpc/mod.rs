//! Streaming RPC handlers.
//!
//! Handlers are transport agnostic: they read requests from any
//! `Stream<Item = Result<T, Status>>`, push responses into an `mpsc::Sender`
//! and observe a [`CallContext`] for client cancellation. A handler that
//! returns `Err(status)` has terminated the call with that status; the
//! transport is responsible for delivering it.

mod context;
mod rate_feed;
pub mod status;
mod summarizer;
mod transfer_pipeline;

pub use context::{CallContext, CancelHandle};
pub use rate_feed::{DEFAULT_TICK, fetch_exchange_rates};
pub use summarizer::summarize_transactions;
pub use transfer_pipeline::transfer_multiple;

/// How a call that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The handler ran to its natural end.
    Finished,
    /// The client went away; nothing further should be sent.
    Cancelled,
}

#[cfg(test)]
mod tests;
