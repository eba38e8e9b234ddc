use async_trait::async_trait;

use crate::{
    PlatformError,
    types::{
        Capability, ChannelId, ChannelInfo, CommunityId, MessageRef, PermissionOverwrite, UserId,
    },
};

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Everything the bot does on the chat platform goes through this trait.
///
/// Implementations own transport, authentication and rate limiting. Each
/// call may suspend on a network round trip.
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// The bot's own user.
    fn bot_user(&self) -> UserId;

    /// Categories of a community.
    async fn list_containers(&self, community: CommunityId) -> PlatformResult<Vec<ChannelInfo>>;

    async fn create_container(
        &self,
        community: CommunityId,
        name: &str,
    ) -> PlatformResult<ChannelInfo>;

    /// Channels filed under `container`.
    async fn list_children(
        &self,
        community: CommunityId,
        container: ChannelId,
    ) -> PlatformResult<Vec<ChannelInfo>>;

    async fn create_stage_channel(
        &self,
        community: CommunityId,
        container: ChannelId,
        name: &str,
        overwrites: &[PermissionOverwrite],
    ) -> PlatformResult<ChannelInfo>;

    async fn create_text_channel(
        &self,
        community: CommunityId,
        container: ChannelId,
        name: &str,
        topic: Option<&str>,
        overwrites: &[PermissionOverwrite],
    ) -> PlatformResult<ChannelInfo>;

    async fn delete_channel(&self, channel: ChannelId) -> PlatformResult<()>;

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> PlatformResult<()>;

    async fn send_message(&self, channel: ChannelId, text: &str) -> PlatformResult<MessageRef>;

    async fn edit_message(&self, message: MessageRef, text: &str) -> PlatformResult<()>;

    async fn delete_message(&self, message: MessageRef) -> PlatformResult<()>;

    /// Recent messages in `channel` written by `author`.
    async fn list_message_history(
        &self,
        channel: ChannelId,
        author: UserId,
    ) -> PlatformResult<Vec<MessageRef>>;

    async fn add_reaction(&self, message: MessageRef, glyph: &str) -> PlatformResult<()>;

    async fn remove_reaction(
        &self,
        message: MessageRef,
        glyph: &str,
        user: UserId,
    ) -> PlatformResult<()>;

    /// Users currently connected to a stage channel.
    async fn current_occupants(
        &self,
        community: CommunityId,
        stage: ChannelId,
    ) -> PlatformResult<Vec<UserId>>;

    async fn has_capability(
        &self,
        community: CommunityId,
        user: UserId,
        capability: Capability,
    ) -> PlatformResult<bool>;

    /// Name a user is shown with inside a community.
    async fn display_name(&self, community: CommunityId, user: UserId) -> PlatformResult<String>;
}
