use crate::types::{ChannelId, ChannelInfo, CommunityId, MessageRef, UserId};

/// Platform events the bot reacts to, delivered in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// Login finished; lists every community the bot is a member of.
    Ready { communities: Vec<CommunityId> },
    /// The bot was added to a community while running.
    Joined { community: CommunityId },
    /// A channel's name, topic or placement changed. Carries the new state.
    ChannelUpdated {
        community: CommunityId,
        channel: ChannelInfo,
    },
    ChannelDeleted {
        community: CommunityId,
        channel: ChannelId,
    },
    MessageDeleted {
        community: CommunityId,
        message: MessageRef,
    },
    ReactionAdded(ReactionEvent),
}

/// A user added a reaction to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub community: CommunityId,
    pub message: MessageRef,
    pub glyph: String,
    pub user: UserId,
}

impl PlatformEvent {
    /// Community the event is scoped to. `Ready` spans several.
    pub fn community(&self) -> Option<CommunityId> {
        match self {
            Self::Ready { .. } => None,
            Self::Joined { community }
            | Self::ChannelUpdated { community, .. }
            | Self::ChannelDeleted { community, .. }
            | Self::MessageDeleted { community, .. } => Some(*community),
            Self::ReactionAdded(reaction) => Some(reaction.community),
        }
    }
}
