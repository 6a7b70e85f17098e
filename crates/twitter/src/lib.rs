//! Twitter channel driver.
//!
//! Translates outgoing ticket articles into status updates on the configured
//! Twitter account and maps the API response back onto the article (sender
//! and recipient handles, tweet id, permalink metadata).

pub mod client;
pub mod config;
pub mod driver;

pub use {
    client::{HttpTwitterApi, StatusUpdate, TweetResponse, TwitterApi},
    config::{TwitterAuth, TwitterOptions, TwitterUser},
    driver::TwitterDriver,
};
