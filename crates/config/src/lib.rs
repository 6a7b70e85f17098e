//! Configuration loading and env substitution.
//!
//! Config file: `ticketry.toml`, searched in `./` then `~/.config/ticketry/`.
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{DatabaseConfig, LogConfig, SchedulerConfig, TicketryConfig, TwitterApiConfig},
};
