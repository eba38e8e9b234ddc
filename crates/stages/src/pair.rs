use std::fmt;

use {
    chrono::{DateTime, TimeDelta, Utc},
    dynstage_platform::{
        ChannelId, ChannelInfo, CommunityId, OverwriteTarget, Permission, PermissionOverwrite,
        PlatformGateway, UserId,
    },
    tracing::{info, warn},
};

use crate::error::{Result, StageError};

/// Permissions a stage owner gets on their own stage.
const OWNER_PERMISSIONS: &[Permission] = &[
    Permission::RequestToSpeak,
    Permission::ManageChannels,
    Permission::MoveMembers,
    Permission::MuteMembers,
];

pub fn stage_name(owner_name: &str) -> String {
    format!("{owner_name}'s stage")
}

pub fn text_name(owner_name: &str) -> String {
    format!("{owner_name}'s text")
}

/// A user's stage channel and its companion text channel.
#[derive(Debug, Clone)]
pub struct DynamicResourcePair {
    pub owner: UserId,
    /// Display name at creation time; channel names derive from it.
    pub owner_name: String,
    pub stage: ChannelInfo,
    pub text: ChannelInfo,
    pub created_at: DateTime<Utc>,
}

impl DynamicResourcePair {
    /// Create both channels inside `container`.
    ///
    /// If the text channel cannot be created the stage is deleted again, so
    /// a failed creation leaves nothing behind unless that deletion fails
    /// too. Such an orphan is picked up by untracked reconciliation.
    pub async fn create(
        gateway: &dyn PlatformGateway,
        community: CommunityId,
        container: ChannelId,
        owner: UserId,
        owner_name: String,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        info!(%community, %owner, owner_name = %owner_name, "creating stage");
        let overwrites = [PermissionOverwrite::allow(
            OverwriteTarget::Member(owner),
            OWNER_PERMISSIONS,
        )];
        let stage = gateway
            .create_stage_channel(community, container, &stage_name(&owner_name), &overwrites)
            .await?;

        let text = match gateway
            .create_text_channel(community, container, &text_name(&owner_name), None, &[])
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(%community, %owner, error = %e, "text channel creation failed, removing stage");
                if let Err(cleanup) = gateway.delete_channel(stage.id).await {
                    warn!(
                        %community,
                        channel = %stage.id,
                        error = %cleanup,
                        "could not remove half-created stage, leaving it untracked"
                    );
                }
                return Err(e.into());
            },
        };

        Ok(Self {
            owner,
            owner_name,
            stage,
            text,
            created_at: now,
        })
    }

    pub fn channel_ids(&self) -> [ChannelId; 2] {
        [self.stage.id, self.text.id]
    }

    pub fn owns_channel(&self, channel: ChannelId) -> bool {
        self.channel_ids().contains(&channel)
    }

    /// The only names the pair's channels may carry.
    pub fn canonical_names(&self) -> [String; 2] {
        [stage_name(&self.owner_name), text_name(&self.owner_name)]
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age: TimeDelta) -> bool {
        now - self.created_at > max_age
    }

    /// Fails with [`StageError::Occupied`] while anyone is on the stage.
    pub async fn ensure_vacant(
        &self,
        gateway: &dyn PlatformGateway,
        community: CommunityId,
    ) -> Result<()> {
        let occupants = gateway.current_occupants(community, self.stage.id).await?;
        if occupants.is_empty() {
            Ok(())
        } else {
            Err(StageError::Occupied {
                stage: self.stage.id,
                occupants: occupants.len(),
            })
        }
    }

    /// Delete text then stage channel. Failures are logged and skipped;
    /// returns how many deletions failed.
    pub async fn delete_channels(
        &self,
        gateway: &dyn PlatformGateway,
        community: CommunityId,
    ) -> usize {
        let mut failed = 0;
        for (kind, channel) in [("text", &self.text), ("stage", &self.stage)] {
            info!(%community, owner = %self.owner, channel = %channel.id, kind, "deleting channel");
            match gateway.delete_channel(channel.id).await {
                Ok(()) => {},
                Err(e) if e.is_not_found() => {},
                Err(e) => {
                    warn!(%community, channel = %channel.id, kind, error = %e, "channel deletion failed");
                    failed += 1;
                },
            }
        }
        failed
    }
}

impl fmt::Display for DynamicResourcePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stage_name(&self.owner_name))?;
        match self.stage.topic.as_deref() {
            Some(topic) if !topic.is_empty() => write!(f, ": \"{topic}\""),
            _ => Ok(()),
        }
    }
}
