//! Outbound article dispatch.
//!
//! The dispatch job takes an outgoing article created on a channel-linked
//! ticket, resolves the channel (falling back to an account-identity match
//! when the original record is gone), delivers the article through the
//! channel's driver, and records the result on both the article and the
//! channel's health status.

pub mod dispatcher;
pub mod error;

pub use {
    dispatcher::{Dispatcher, deliver_fn, enqueue_on_create},
    error::{Error, Result},
};
