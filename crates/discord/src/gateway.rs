use std::sync::Arc;

use {
    async_trait::async_trait,
    dynstage_platform::{
        Capability, ChannelId, ChannelInfo, ChannelKind, CommunityId, MessageRef,
        PermissionOverwrite, PlatformError, PlatformGateway, PlatformResult, UserId,
    },
    serenity::all as discord,
    tracing::debug,
};

use crate::convert;

/// Number of messages scanned for earlier control messages.
const HISTORY_LIMIT: u8 = 100;

/// [`PlatformGateway`] over serenity's HTTP client and gateway cache.
///
/// Rate limiting is left to serenity's ratelimiter.
pub struct SerenityGateway {
    http: Arc<discord::Http>,
    cache: Arc<discord::Cache>,
    bot: discord::UserId,
}

impl SerenityGateway {
    pub fn new(http: Arc<discord::Http>, cache: Arc<discord::Cache>, bot: discord::UserId) -> Self {
        Self { http, cache, bot }
    }

    async fn channels(&self, community: CommunityId) -> PlatformResult<Vec<ChannelInfo>> {
        let channels = convert::guild_id(community)
            .channels(self.http.as_ref())
            .await
            .map_err(|e| convert::error(format!("list channels of {community}"), e))?;
        Ok(channels.values().map(convert::channel_info).collect())
    }

    async fn create_channel(
        &self,
        community: CommunityId,
        builder: discord::CreateChannel<'_>,
    ) -> PlatformResult<ChannelInfo> {
        let channel = convert::guild_id(community)
            .create_channel(self.http.as_ref(), builder)
            .await
            .map_err(|e| convert::error(format!("create channel in {community}"), e))?;
        debug!(%community, channel = %channel.id, name = %channel.name, "created channel");
        Ok(convert::channel_info(&channel))
    }

    async fn create_child(
        &self,
        community: CommunityId,
        container: ChannelId,
        kind: discord::ChannelType,
        name: &str,
        topic: Option<&str>,
        overwrites: &[PermissionOverwrite],
    ) -> PlatformResult<ChannelInfo> {
        let guild = convert::guild_id(community);
        let mut builder = discord::CreateChannel::new(name)
            .kind(kind)
            .category(convert::channel_id(container))
            .permissions(convert::overwrites(guild, self.bot, overwrites));
        if let Some(topic) = topic {
            builder = builder.topic(topic);
        }
        self.create_channel(community, builder).await
    }

    async fn member(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> PlatformResult<discord::Member> {
        convert::guild_id(community)
            .member((&self.cache, self.http.as_ref()), convert::user_id(user))
            .await
            .map_err(|e| convert::error(format!("member {user} of {community}"), e))
    }

    fn uncached(community: CommunityId) -> PlatformError {
        PlatformError::Unavailable(format!("community {community} is not cached yet"))
    }
}

#[async_trait]
impl PlatformGateway for SerenityGateway {
    fn bot_user(&self) -> UserId {
        UserId(self.bot.get())
    }

    async fn list_containers(&self, community: CommunityId) -> PlatformResult<Vec<ChannelInfo>> {
        let mut channels = self.channels(community).await?;
        channels.retain(|c| c.kind == ChannelKind::Category);
        Ok(channels)
    }

    async fn create_container(
        &self,
        community: CommunityId,
        name: &str,
    ) -> PlatformResult<ChannelInfo> {
        let builder = discord::CreateChannel::new(name).kind(discord::ChannelType::Category);
        self.create_channel(community, builder).await
    }

    async fn list_children(
        &self,
        community: CommunityId,
        container: ChannelId,
    ) -> PlatformResult<Vec<ChannelInfo>> {
        let channels = self.channels(community).await?;
        if !channels
            .iter()
            .any(|c| c.id == container && c.kind == ChannelKind::Category)
        {
            return Err(PlatformError::NotFound(format!("category {container}")));
        }
        Ok(channels
            .into_iter()
            .filter(|c| c.parent == Some(container))
            .collect())
    }

    async fn create_stage_channel(
        &self,
        community: CommunityId,
        container: ChannelId,
        name: &str,
        overwrites: &[PermissionOverwrite],
    ) -> PlatformResult<ChannelInfo> {
        self.create_child(
            community,
            container,
            discord::ChannelType::Stage,
            name,
            None,
            overwrites,
        )
        .await
    }

    async fn create_text_channel(
        &self,
        community: CommunityId,
        container: ChannelId,
        name: &str,
        topic: Option<&str>,
        overwrites: &[PermissionOverwrite],
    ) -> PlatformResult<ChannelInfo> {
        self.create_child(
            community,
            container,
            discord::ChannelType::Text,
            name,
            topic,
            overwrites,
        )
        .await
    }

    async fn delete_channel(&self, channel: ChannelId) -> PlatformResult<()> {
        convert::channel_id(channel)
            .delete(self.http.as_ref())
            .await
            .map_err(|e| convert::error(format!("delete channel {channel}"), e))?;
        Ok(())
    }

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> PlatformResult<()> {
        convert::channel_id(channel)
            .edit(self.http.as_ref(), discord::EditChannel::new().name(name))
            .await
            .map_err(|e| convert::error(format!("rename channel {channel}"), e))?;
        Ok(())
    }

    async fn send_message(&self, channel: ChannelId, text: &str) -> PlatformResult<MessageRef> {
        let message = convert::channel_id(channel)
            .say(self.http.as_ref(), text)
            .await
            .map_err(|e| convert::error(format!("send message to {channel}"), e))?;
        Ok(MessageRef {
            channel,
            id: message.id.get().into(),
        })
    }

    async fn edit_message(&self, message: MessageRef, text: &str) -> PlatformResult<()> {
        convert::channel_id(message.channel)
            .edit_message(
                self.http.as_ref(),
                convert::message_id(message.id),
                discord::EditMessage::new().content(text),
            )
            .await
            .map_err(|e| convert::error(format!("edit message {}", message.id), e))?;
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> PlatformResult<()> {
        convert::channel_id(message.channel)
            .delete_message(self.http.as_ref(), convert::message_id(message.id))
            .await
            .map_err(|e| convert::error(format!("delete message {}", message.id), e))
    }

    async fn list_message_history(
        &self,
        channel: ChannelId,
        author: UserId,
    ) -> PlatformResult<Vec<MessageRef>> {
        let messages = convert::channel_id(channel)
            .messages(self.http.as_ref(), discord::GetMessages::new().limit(HISTORY_LIMIT))
            .await
            .map_err(|e| convert::error(format!("history of {channel}"), e))?;
        Ok(messages
            .iter()
            .filter(|m| m.author.id.get() == author.get())
            .map(|m| MessageRef {
                channel,
                id: m.id.get().into(),
            })
            .collect())
    }

    async fn add_reaction(&self, message: MessageRef, glyph: &str) -> PlatformResult<()> {
        self.http
            .create_reaction(
                convert::channel_id(message.channel),
                convert::message_id(message.id),
                &convert::reaction_type(glyph),
            )
            .await
            .map_err(|e| convert::error(format!("react {glyph} on {}", message.id), e))
    }

    async fn remove_reaction(
        &self,
        message: MessageRef,
        glyph: &str,
        user: UserId,
    ) -> PlatformResult<()> {
        self.http
            .delete_reaction(
                convert::channel_id(message.channel),
                convert::message_id(message.id),
                convert::user_id(user),
                &convert::reaction_type(glyph),
            )
            .await
            .map_err(|e| convert::error(format!("remove {glyph} of {user} on {}", message.id), e))
    }

    async fn current_occupants(
        &self,
        community: CommunityId,
        stage: ChannelId,
    ) -> PlatformResult<Vec<UserId>> {
        let stage = convert::channel_id(stage);
        let guild = self
            .cache
            .guild(convert::guild_id(community))
            .ok_or_else(|| Self::uncached(community))?;
        Ok(guild
            .voice_states
            .values()
            .filter(|v| v.channel_id == Some(stage))
            .map(|v| UserId(v.user_id.get()))
            .collect())
    }

    async fn has_capability(
        &self,
        community: CommunityId,
        user: UserId,
        capability: Capability,
    ) -> PlatformResult<bool> {
        let member = self.member(community, user).await?;
        let guild = self
            .cache
            .guild(convert::guild_id(community))
            .ok_or_else(|| Self::uncached(community))?;
        let permissions = guild.member_permissions(&member);
        Ok(match capability {
            Capability::ManageChannels => permissions.manage_channels(),
        })
    }

    async fn display_name(&self, community: CommunityId, user: UserId) -> PlatformResult<String> {
        let member = self.member(community, user).await?;
        Ok(member.display_name().to_string())
    }
}
