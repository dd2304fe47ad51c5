//! Polling layer: keyed refresh loops with stale-value retention.
//!
//! Every subscription is backed by one loop that fetches immediately, then
//! refetches on a cadence. Failures keep the last good value and surface the
//! error alongside it; switching a keyed slot (detail chain, wallet) to a
//! new key supersedes the old loop and discards its in-flight response.

pub mod service;
pub mod slot;
pub mod state;

pub use service::{Chainboard, ChainboardBuilder, ChainDetailSubscription, ChainDetailView};
pub use state::{PollKey, PollState, PollSubscription};
