use {
    async_trait::async_trait,
    dynstage_platform::{CommunityId, MessageRef, PlatformEvent, ReactionEvent, UserId},
    serenity::all as discord,
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use crate::convert;

/// Forwards the gateway events the bot cares about, in arrival order.
pub struct Handler {
    tx: mpsc::UnboundedSender<PlatformEvent>,
}

impl Handler {
    pub fn new(tx: mpsc::UnboundedSender<PlatformEvent>) -> Self {
        Self { tx }
    }

    fn forward(&self, event: PlatformEvent) {
        if self.tx.send(event).is_err() {
            warn!("event receiver dropped, discarding discord event");
        }
    }
}

fn community(guild: discord::GuildId) -> CommunityId {
    CommunityId(guild.get())
}

/// Reactions outside guilds or without a user cannot address a stage.
pub fn reaction_event(reaction: &discord::Reaction) -> Option<ReactionEvent> {
    Some(ReactionEvent {
        community: community(reaction.guild_id?),
        message: MessageRef {
            channel: reaction.channel_id.get().into(),
            id: reaction.message_id.get().into(),
        },
        glyph: convert::glyph(&reaction.emoji),
        user: UserId(reaction.user_id?.get()),
    })
}

#[async_trait]
impl discord::EventHandler for Handler {
    async fn ready(&self, _ctx: discord::Context, ready: discord::Ready) {
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord session ready"
        );
        self.forward(PlatformEvent::Ready {
            communities: ready.guilds.iter().map(|g| community(g.id)).collect(),
        });
    }

    async fn guild_create(
        &self,
        _ctx: discord::Context,
        guild: discord::Guild,
        is_new: Option<bool>,
    ) {
        // Guilds from the ready payload arrive here too; only joins are new.
        if is_new == Some(true) {
            info!(guild = %guild.id, name = %guild.name, "added to guild");
            self.forward(PlatformEvent::Joined {
                community: community(guild.id),
            });
        }
    }

    async fn channel_update(
        &self,
        _ctx: discord::Context,
        _old: Option<discord::GuildChannel>,
        new: discord::GuildChannel,
    ) {
        self.forward(PlatformEvent::ChannelUpdated {
            community: community(new.guild_id),
            channel: convert::channel_info(&new),
        });
    }

    async fn channel_delete(
        &self,
        _ctx: discord::Context,
        channel: discord::GuildChannel,
        _messages: Option<Vec<discord::Message>>,
    ) {
        self.forward(PlatformEvent::ChannelDeleted {
            community: community(channel.guild_id),
            channel: channel.id.get().into(),
        });
    }

    async fn message_delete(
        &self,
        _ctx: discord::Context,
        channel: discord::ChannelId,
        message: discord::MessageId,
        guild: Option<discord::GuildId>,
    ) {
        let Some(guild) = guild else {
            return;
        };
        self.forward(PlatformEvent::MessageDeleted {
            community: community(guild),
            message: MessageRef {
                channel: channel.get().into(),
                id: message.get().into(),
            },
        });
    }

    async fn reaction_add(&self, _ctx: discord::Context, reaction: discord::Reaction) {
        match reaction_event(&reaction) {
            Some(event) => self.forward(PlatformEvent::ReactionAdded(event)),
            None => debug!(message = %reaction.message_id, "ignoring reaction outside a guild"),
        }
    }
}
