//! Mapping between serenity's model and the platform types.

use {
    dynstage_platform::{
        self as platform, ChannelInfo, ChannelKind, OverwriteTarget, Permission, PlatformError,
    },
    serenity::all as discord,
};

pub fn guild_id(id: platform::CommunityId) -> discord::GuildId {
    discord::GuildId::new(id.get())
}

pub fn channel_id(id: platform::ChannelId) -> discord::ChannelId {
    discord::ChannelId::new(id.get())
}

pub fn message_id(id: platform::MessageId) -> discord::MessageId {
    discord::MessageId::new(id.get())
}

pub fn user_id(id: platform::UserId) -> discord::UserId {
    discord::UserId::new(id.get())
}

pub fn channel_kind(kind: discord::ChannelType) -> ChannelKind {
    match kind {
        discord::ChannelType::Category => ChannelKind::Category,
        discord::ChannelType::Text | discord::ChannelType::News => ChannelKind::Text,
        discord::ChannelType::Stage => ChannelKind::Stage,
        discord::ChannelType::Voice => ChannelKind::Voice,
        _ => ChannelKind::Other,
    }
}

pub fn channel_info(channel: &discord::GuildChannel) -> ChannelInfo {
    ChannelInfo {
        id: channel.id.get().into(),
        name: channel.name.clone(),
        kind: channel_kind(channel.kind),
        parent: channel.parent_id.map(|p| p.get().into()),
        topic: channel.topic.clone().filter(|t| !t.is_empty()),
    }
}

pub fn permissions(set: &[Permission]) -> discord::Permissions {
    set.iter().fold(discord::Permissions::empty(), |acc, p| {
        acc | match p {
            Permission::SendMessages => discord::Permissions::SEND_MESSAGES,
            Permission::RequestToSpeak => discord::Permissions::REQUEST_TO_SPEAK,
            Permission::ManageChannels => discord::Permissions::MANAGE_CHANNELS,
            Permission::MoveMembers => discord::Permissions::MOVE_MEMBERS,
            Permission::MuteMembers => discord::Permissions::MUTE_MEMBERS,
        }
    })
}

/// Translate overwrites. `@everyone` is the role sharing the guild's id.
pub fn overwrites(
    guild: discord::GuildId,
    bot: discord::UserId,
    overwrites: &[platform::PermissionOverwrite],
) -> Vec<discord::PermissionOverwrite> {
    overwrites
        .iter()
        .map(|o| discord::PermissionOverwrite {
            allow: permissions(&o.allow),
            deny: permissions(&o.deny),
            kind: match o.target {
                OverwriteTarget::Member(user) => {
                    discord::PermissionOverwriteType::Member(user_id(user))
                },
                OverwriteTarget::Bot => discord::PermissionOverwriteType::Member(bot),
                OverwriteTarget::Everyone => {
                    discord::PermissionOverwriteType::Role(discord::RoleId::new(guild.get()))
                },
            },
        })
        .collect()
}

/// Reaction emoji as the glyph string the command table is keyed by.
pub fn glyph(emoji: &discord::ReactionType) -> String {
    match emoji {
        discord::ReactionType::Unicode(glyph) => glyph.clone(),
        other => other.to_string(),
    }
}

/// Inverse of [`glyph`]. Anything that does not parse as a custom emoji is
/// taken as a unicode one.
pub fn reaction_type(glyph: &str) -> discord::ReactionType {
    discord::ReactionType::try_from(glyph)
        .unwrap_or_else(|_| discord::ReactionType::Unicode(glyph.to_string()))
}

/// 404 means the object is gone, 403 that the bot lacks access; everything
/// else is treated as the platform being unavailable.
pub fn error(context: impl std::fmt::Display, err: serenity::Error) -> PlatformError {
    let status = match &err {
        serenity::Error::Http(http) => http.status_code().map(|s| s.as_u16()),
        _ => None,
    };
    match status {
        Some(404) => PlatformError::NotFound(format!("{context}: {err}")),
        Some(403) => PlatformError::Forbidden(format!("{context}: {err}")),
        _ => PlatformError::Unavailable(format!("{context}: {err}")),
    }
}
