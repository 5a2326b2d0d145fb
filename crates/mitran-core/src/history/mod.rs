//! Session history: in-memory store with a sliding-window trimming policy.
//!
//! History lives for the lifetime of the process only. The store is not
//! shared between processes: running several server workers gives each its
//! own, disjoint view of every session.

pub mod store;

pub use store::{trim_window, HistoryStore, SessionSummary};
