//! Shared error plumbing and utilities used across all ticketry crates.

pub mod error;
pub mod time;

pub use {
    error::{Error, FromMessage, Result, TicketryError},
    time::now_ms,
};
