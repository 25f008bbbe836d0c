//! Minimal async client for the MPD wire protocol.
//!
//! Covers the command set the MDQueue daemon needs: status queries, queue
//! mutation, stored playlist listing, partition management and the `idle`
//! change-notification primitive. One [`MpdClient`] is one protocol session;
//! MPD scopes partition selection to the session, so every consumer that
//! works against a different partition opens its own client.

mod client;
mod errors;

pub use client::{MpdClient, PlaylistSummary};
pub use errors::{ACK_ERROR_EXIST, ACK_ERROR_NO_EXIST, MpdError};

pub type Result<T> = std::result::Result<T, MpdError>;
