//! Configuration loading, validation and env substitution.
//!
//! Config files: `ticketlog.toml`, `ticketlog.yaml`, or `ticketlog.json`,
//! searched in `./` then the user config dir. `${ENV_VAR}` placeholders are
//! substituted before parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, load_config, parse_config},
    schema::{DiscordConfig, RankConfig, RelayConfig, TicketlogConfig, TicketsConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
