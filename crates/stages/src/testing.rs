//! In-memory platform used by the unit tests.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use {
    async_trait::async_trait,
    dynstage_platform::{
        Capability, ChannelId, ChannelInfo, ChannelKind, CommunityId, MessageId, MessageRef,
        PermissionOverwrite, PlatformError, PlatformGateway, PlatformResult, UserId,
    },
};

struct StoredMessage {
    channel: ChannelId,
    author: UserId,
    text: String,
}

#[derive(Default)]
struct State {
    next_id: u64,
    channels: BTreeMap<ChannelId, ChannelInfo>,
    overwrites: HashMap<ChannelId, Vec<PermissionOverwrite>>,
    messages: BTreeMap<MessageId, StoredMessage>,
    reactions: Vec<(MessageRef, String, UserId)>,
    occupants: HashMap<ChannelId, Vec<UserId>>,
    capable: HashSet<UserId>,
    names: HashMap<UserId, String>,
    failing_deletes: HashSet<ChannelId>,
    fail_text_creation: bool,
    fail_all: Option<PlatformError>,
    failing_calls: Vec<(String, PlatformError)>,
    calls: Vec<String>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Record a call and return the injected failure, if any.
    fn call(&mut self, name: &str) -> PlatformResult<()> {
        self.calls.push(name.to_string());
        if let Some(err) = &self.fail_all {
            return Err(err.clone());
        }
        match self.failing_calls.iter().find(|(p, _)| name.starts_with(p.as_str())) {
            Some((_, err)) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn insert_channel(
        &mut self,
        kind: ChannelKind,
        name: &str,
        parent: Option<ChannelId>,
        topic: Option<&str>,
    ) -> ChannelInfo {
        let channel = ChannelInfo {
            id: ChannelId(self.next_id()),
            name: name.to_string(),
            kind,
            parent,
            topic: topic.map(Into::into),
        };
        self.channels.insert(channel.id, channel.clone());
        channel
    }

    fn existing_container(&self, container: ChannelId) -> PlatformResult<()> {
        match self.channels.get(&container) {
            Some(c) if c.kind == ChannelKind::Category => Ok(()),
            _ => Err(PlatformError::NotFound(format!("category {container}"))),
        }
    }
}

/// Records every call and lets tests shape the platform's answers.
pub(crate) struct FakeGateway {
    state: Mutex<State>,
}

impl FakeGateway {
    pub const BOT: UserId = UserId(1);
    pub const COMMUNITY: CommunityId = CommunityId(42);

    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_member(&self, user: UserId, name: &str) {
        self.state().names.insert(user, name.to_string());
    }

    pub fn grant(&self, user: UserId) {
        self.state().capable.insert(user);
    }

    pub fn add_channel(
        &self,
        kind: ChannelKind,
        name: &str,
        parent: Option<ChannelId>,
    ) -> ChannelInfo {
        self.state().insert_channel(kind, name, parent, None)
    }

    pub fn remove_channel(&self, channel: ChannelId) {
        self.state().channels.remove(&channel);
    }

    pub fn channel(&self, channel: ChannelId) -> Option<ChannelInfo> {
        self.state().channels.get(&channel).cloned()
    }

    pub fn channel_named(&self, name: &str) -> Option<ChannelInfo> {
        self.state()
            .channels
            .values()
            .find(|c| c.name == name)
            .cloned()
    }

    pub fn children(&self, container: ChannelId) -> Vec<ChannelInfo> {
        self.state()
            .channels
            .values()
            .filter(|c| c.parent == Some(container))
            .cloned()
            .collect()
    }

    pub fn overwrites(&self, channel: ChannelId) -> Vec<PermissionOverwrite> {
        self.state()
            .overwrites
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }

    /// Change a channel the way a user would in the client.
    pub fn edit_channel(&self, channel: ChannelId, name: &str, topic: Option<&str>) -> ChannelInfo {
        let mut state = self.state();
        let info = state.channels.get_mut(&channel).unwrap();
        info.name = name.to_string();
        info.topic = topic.map(Into::into);
        info.clone()
    }

    pub fn set_occupants(&self, stage: ChannelId, users: &[UserId]) {
        self.state().occupants.insert(stage, users.to_vec());
    }

    pub fn post_as(&self, channel: ChannelId, author: UserId, text: &str) -> MessageRef {
        let mut state = self.state();
        let id = MessageId(state.next_id());
        state.messages.insert(id, StoredMessage {
            channel,
            author,
            text: text.to_string(),
        });
        MessageRef { channel, id }
    }

    pub fn remove_message(&self, message: MessageRef) {
        self.state().messages.remove(&message.id);
    }

    pub fn message_text(&self, message: MessageRef) -> Option<String> {
        self.state()
            .messages
            .get(&message.id)
            .map(|m| m.text.clone())
    }

    pub fn messages_in(&self, channel: ChannelId) -> Vec<MessageRef> {
        self.state()
            .messages
            .iter()
            .filter(|(_, m)| m.channel == channel)
            .map(|(id, _)| MessageRef { channel, id: *id })
            .collect()
    }

    pub fn add_user_reaction(&self, message: MessageRef, glyph: &str, user: UserId) {
        self.state()
            .reactions
            .push((message, glyph.to_string(), user));
    }

    pub fn reactions_on(&self, message: MessageRef) -> Vec<(String, UserId)> {
        self.state()
            .reactions
            .iter()
            .filter(|(m, ..)| *m == message)
            .map(|(_, glyph, user)| (glyph.clone(), *user))
            .collect()
    }

    pub fn fail_deletion_of(&self, channel: ChannelId) {
        self.state().failing_deletes.insert(channel);
    }

    pub fn fail_text_channel_creation(&self) {
        self.state().fail_text_creation = true;
    }

    /// Every call from now on fails with `err`.
    pub fn fail_all(&self, err: PlatformError) {
        self.state().fail_all = Some(err);
    }

    /// Calls whose recorded name starts with `prefix` fail with `err`.
    pub fn fail_calls(&self, prefix: &str, err: PlatformError) {
        self.state().failing_calls.push((prefix.to_string(), err));
    }

    pub fn recover(&self) {
        let mut state = self.state();
        state.fail_all = None;
        state.failing_calls.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl PlatformGateway for FakeGateway {
    fn bot_user(&self) -> UserId {
        Self::BOT
    }

    async fn list_containers(&self, _community: CommunityId) -> PlatformResult<Vec<ChannelInfo>> {
        let mut state = self.state();
        state.call("list_containers")?;
        Ok(state
            .channels
            .values()
            .filter(|c| c.kind == ChannelKind::Category)
            .cloned()
            .collect())
    }

    async fn create_container(
        &self,
        _community: CommunityId,
        name: &str,
    ) -> PlatformResult<ChannelInfo> {
        let mut state = self.state();
        state.call("create_container")?;
        Ok(state.insert_channel(ChannelKind::Category, name, None, None))
    }

    async fn list_children(
        &self,
        _community: CommunityId,
        container: ChannelId,
    ) -> PlatformResult<Vec<ChannelInfo>> {
        let mut state = self.state();
        state.call("list_children")?;
        state.existing_container(container)?;
        Ok(state
            .channels
            .values()
            .filter(|c| c.parent == Some(container))
            .cloned()
            .collect())
    }

    async fn create_stage_channel(
        &self,
        _community: CommunityId,
        container: ChannelId,
        name: &str,
        overwrites: &[PermissionOverwrite],
    ) -> PlatformResult<ChannelInfo> {
        let mut state = self.state();
        state.call("create_stage_channel")?;
        state.existing_container(container)?;
        let channel = state.insert_channel(ChannelKind::Stage, name, Some(container), None);
        state.overwrites.insert(channel.id, overwrites.to_vec());
        Ok(channel)
    }

    async fn create_text_channel(
        &self,
        _community: CommunityId,
        container: ChannelId,
        name: &str,
        topic: Option<&str>,
        overwrites: &[PermissionOverwrite],
    ) -> PlatformResult<ChannelInfo> {
        let mut state = self.state();
        state.call("create_text_channel")?;
        state.existing_container(container)?;
        if state.fail_text_creation {
            return Err(PlatformError::Unavailable("text channel quota".into()));
        }
        let channel = state.insert_channel(ChannelKind::Text, name, Some(container), topic);
        state.overwrites.insert(channel.id, overwrites.to_vec());
        Ok(channel)
    }

    async fn delete_channel(&self, channel: ChannelId) -> PlatformResult<()> {
        let mut state = self.state();
        state.call(&format!("delete_channel {channel}"))?;
        if state.failing_deletes.contains(&channel) {
            return Err(PlatformError::Forbidden(format!("channel {channel}")));
        }
        state
            .channels
            .remove(&channel)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(format!("channel {channel}")))
    }

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> PlatformResult<()> {
        let mut state = self.state();
        state.call(&format!("rename_channel {channel} {name}"))?;
        let info = state
            .channels
            .get_mut(&channel)
            .ok_or_else(|| PlatformError::NotFound(format!("channel {channel}")))?;
        info.name = name.to_string();
        Ok(())
    }

    async fn send_message(&self, channel: ChannelId, text: &str) -> PlatformResult<MessageRef> {
        {
            let mut state = self.state();
            state.call("send_message")?;
            if !state.channels.contains_key(&channel) {
                return Err(PlatformError::NotFound(format!("channel {channel}")));
            }
        }
        Ok(self.post_as(channel, Self::BOT, text))
    }

    async fn edit_message(&self, message: MessageRef, text: &str) -> PlatformResult<()> {
        let mut state = self.state();
        state.call(&format!("edit_message {}", message.id))?;
        let stored = state
            .messages
            .get_mut(&message.id)
            .ok_or_else(|| PlatformError::NotFound(format!("message {}", message.id)))?;
        stored.text = text.to_string();
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> PlatformResult<()> {
        let mut state = self.state();
        state.call(&format!("delete_message {}", message.id))?;
        state
            .messages
            .remove(&message.id)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(format!("message {}", message.id)))
    }

    async fn list_message_history(
        &self,
        channel: ChannelId,
        author: UserId,
    ) -> PlatformResult<Vec<MessageRef>> {
        let mut state = self.state();
        state.call("list_message_history")?;
        if !state.channels.contains_key(&channel) {
            return Err(PlatformError::NotFound(format!("channel {channel}")));
        }
        Ok(state
            .messages
            .iter()
            .filter(|(_, m)| m.channel == channel && m.author == author)
            .map(|(id, _)| MessageRef { channel, id: *id })
            .collect())
    }

    async fn add_reaction(&self, message: MessageRef, glyph: &str) -> PlatformResult<()> {
        let mut state = self.state();
        state.call(&format!("add_reaction {glyph}"))?;
        state
            .reactions
            .push((message, glyph.to_string(), Self::BOT));
        Ok(())
    }

    async fn remove_reaction(
        &self,
        message: MessageRef,
        glyph: &str,
        user: UserId,
    ) -> PlatformResult<()> {
        let mut state = self.state();
        state.call(&format!("remove_reaction {glyph} {user}"))?;
        state
            .reactions
            .retain(|(m, g, u)| !(*m == message && g == glyph && *u == user));
        Ok(())
    }

    async fn current_occupants(
        &self,
        _community: CommunityId,
        stage: ChannelId,
    ) -> PlatformResult<Vec<UserId>> {
        let mut state = self.state();
        state.call("current_occupants")?;
        Ok(state.occupants.get(&stage).cloned().unwrap_or_default())
    }

    async fn has_capability(
        &self,
        _community: CommunityId,
        user: UserId,
        _capability: Capability,
    ) -> PlatformResult<bool> {
        let mut state = self.state();
        state.call("has_capability")?;
        Ok(state.capable.contains(&user))
    }

    async fn display_name(&self, _community: CommunityId, user: UserId) -> PlatformResult<String> {
        let mut state = self.state();
        state.call("display_name")?;
        Ok(state
            .names
            .get(&user)
            .cloned()
            .unwrap_or_else(|| format!("user{user}")))
    }
}
