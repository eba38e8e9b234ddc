//! Chat platform seam.
//!
//! The bot core talks to the platform only through [`PlatformGateway`] and
//! consumes [`PlatformEvent`]s. The Discord adapter implements both sides;
//! tests substitute an in-memory gateway.

pub mod event;
pub mod gateway;
pub mod types;

pub use {
    event::{PlatformEvent, ReactionEvent},
    gateway::{PlatformGateway, PlatformResult},
    types::{
        Capability, ChannelId, ChannelInfo, ChannelKind, CommunityId, MessageId, MessageRef,
        OverwriteTarget, Permission, PermissionOverwrite, UserId,
    },
};

/// Failure of a single gateway call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The addressed object does not exist (anymore).
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
