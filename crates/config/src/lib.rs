//! Configuration loading: file discovery, `${VAR}` substitution, `.env`
//! overrides and validation.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, load, load_config},
    schema::{CommandsConfig, CommunityConfig, DiscordConfig, DynstageConfig, SweepConfig},
};

/// Reasons a configuration is refused.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("glyph {0:?} is bound to more than one command")]
    DuplicateGlyph(String),
    #[error("{var} is not a number: {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}
