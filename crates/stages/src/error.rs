use {
    dynstage_platform::{Capability, ChannelId, CommunityId, PlatformError, UserId},
    tracing::{error, warn},
};

/// Outcome of a stage operation that did not go through.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("user {owner} already owns a stage")]
    AlreadyOwned { owner: UserId },
    #[error("user {owner} does not own a stage")]
    NotOwned { owner: UserId },
    #[error("stage {stage} still has {occupants} occupant(s)")]
    Occupied { stage: ChannelId, occupants: usize },
    #[error("user {user} lacks the {capability} capability")]
    PermissionDenied { user: UserId, capability: Capability },
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    PlatformUnavailable(PlatformError),
}

pub type Result<T, E = StageError> = std::result::Result<T, E>;

impl From<PlatformError> for StageError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NotFound(what) => Self::NotFound(what),
            other => Self::PlatformUnavailable(other),
        }
    }
}

impl StageError {
    /// Expected outcomes are absorbed with a warning; only platform failures
    /// abandon the current operation.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::PlatformUnavailable(_))
    }
}

/// Log a failed operation at the level its kind calls for.
pub(crate) fn report(community: CommunityId, action: &str, err: &StageError) {
    if err.is_expected() {
        warn!(%community, action, error = %err, "refused");
    } else {
        error!(%community, action, error = %err, "platform call failed, operation abandoned");
    }
}
