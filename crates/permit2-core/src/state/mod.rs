//! Transactional state for engine calls.
//!
//! Every call reads and writes allowance records and nonce bitmaps through a
//! [`Journal`]. Nothing reaches storage, and no event is published, until the
//! call commits. A committed call can still be reverted while it holds the
//! engine lock, which is how a failed token transfer undoes its nonce or
//! allowance update.

pub mod journal;

pub use journal::{Committed, Journal};
