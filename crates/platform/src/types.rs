use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// A guild/server on the chat platform.
    CommunityId
);
id_type!(UserId);
id_type!(
    /// Any guild channel, categories included.
    ChannelId
);
id_type!(MessageId);

/// Kind of a guild channel, reduced to what the bot distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Category,
    Text,
    Stage,
    Voice,
    Other,
}

/// Snapshot of a guild channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    /// Category the channel is filed under.
    pub parent: Option<ChannelId>,
    pub topic: Option<String>,
}

/// A message addressed by channel and id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel: ChannelId,
    pub id: MessageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    SendMessages,
    RequestToSpeak,
    ManageChannels,
    MoveMembers,
    MuteMembers,
}

/// Who a permission overwrite applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteTarget {
    Member(UserId),
    /// The bot's own user.
    Bot,
    /// The community's default role.
    Everyone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionOverwrite {
    pub target: OverwriteTarget,
    pub allow: Vec<Permission>,
    pub deny: Vec<Permission>,
}

impl PermissionOverwrite {
    pub fn allow(target: OverwriteTarget, allow: &[Permission]) -> Self {
        Self {
            target,
            allow: allow.to_vec(),
            deny: Vec::new(),
        }
    }

    pub fn deny(target: OverwriteTarget, deny: &[Permission]) -> Self {
        Self {
            target,
            allow: Vec::new(),
            deny: deny.to_vec(),
        }
    }
}

/// Community-wide capabilities checked before privileged commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageChannels,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManageChannels => f.write_str("manage_channels"),
        }
    }
}
