//! Tidymail - mailbox glue around the categorization core.
//!
//! Gmail access, OAuth token upkeep, the per-mailbox processing loop and
//! the terminal niceties live here; the categorization engine itself is in
//! `tidymail_common`.

pub mod auth;
pub mod gmail;
pub mod hardware;
pub mod organizer;
pub mod progress;
