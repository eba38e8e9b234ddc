//! Everything the bot tracks for one community, and the handlers that act
//! on it. A `CommunityState` is only ever driven by its own worker, so
//! handlers never interleave.

use std::sync::Arc;

use {
    chrono::Utc,
    dynstage_config::CommunityConfig,
    dynstage_platform::{
        ChannelId, ChannelInfo, ChannelKind, CommunityId, MessageRef, PlatformGateway,
        ReactionEvent, UserId,
    },
    tracing::{debug, info, warn},
};

use crate::{
    commands::{Command, CommandTable},
    control::ControlMessage,
    error::{Result, StageError, report},
    pair::{stage_name, text_name},
    reconciler::ContainerReconciler,
    registry::ResourceRegistry,
};

/// Work item for a community worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunityTask {
    /// Login finished: set up the category and post the control message.
    Ready,
    Reaction(ReactionEvent),
    ChannelUpdated(ChannelInfo),
    ChannelDeleted(ChannelId),
    MessageDeleted(MessageRef),
    Sweep,
}

impl CommunityTask {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Reaction(_) => "reaction",
            Self::ChannelUpdated(_) => "channel_updated",
            Self::ChannelDeleted(_) => "channel_deleted",
            Self::MessageDeleted(_) => "message_deleted",
            Self::Sweep => "sweep",
        }
    }
}

/// Options shared by every community.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommunityOptions {
    pub reconcile_on_startup: bool,
}

pub struct CommunityState {
    pub(crate) id: CommunityId,
    pub(crate) gateway: Arc<dyn PlatformGateway>,
    pub(crate) config: Arc<CommunityConfig>,
    pub(crate) table: Arc<CommandTable>,
    pub(crate) options: CommunityOptions,
    pub(crate) reconciler: ContainerReconciler,
    pub(crate) registry: ResourceRegistry,
    pub(crate) control: ControlMessage,
}

impl CommunityState {
    pub fn new(
        id: CommunityId,
        gateway: Arc<dyn PlatformGateway>,
        config: Arc<CommunityConfig>,
        table: Arc<CommandTable>,
        options: CommunityOptions,
    ) -> Self {
        Self {
            id,
            reconciler: ContainerReconciler::new(id, config.clone()),
            registry: ResourceRegistry::new(),
            control: ControlMessage::new(id, config.clone(), table.clone()),
            gateway,
            config,
            table,
            options,
        }
    }

    pub fn id(&self) -> CommunityId {
        self.id
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn control(&self) -> &ControlMessage {
        &self.control
    }

    /// Run one task to completion.
    pub async fn handle(&mut self, task: CommunityTask) -> Result<()> {
        let result = match task {
            CommunityTask::Ready => self.on_ready().await,
            CommunityTask::Reaction(reaction) => self.on_reaction(reaction).await,
            CommunityTask::ChannelUpdated(channel) => self.on_channel_updated(channel).await,
            CommunityTask::ChannelDeleted(channel) => self.on_channel_deleted(channel).await,
            CommunityTask::MessageDeleted(message) => self.on_message_deleted(message).await,
            CommunityTask::Sweep => self.sweep(Utc::now()).await,
        };
        if let Err(StageError::NotFound(_)) = &result {
            self.reconciler.invalidate();
        }
        result
    }

    /// Resolve the category and control channel, optionally clean up what a
    /// previous run left behind, and make sure the control message is live.
    pub async fn on_ready(&mut self) -> Result<()> {
        self.reconciler.resolve_container(&*self.gateway).await?;
        self.reconciler
            .resolve_control_channel(&*self.gateway)
            .await?;
        if self.options.reconcile_on_startup {
            match self.reconcile_untracked().await {
                Ok(deleted) => info!(community = %self.id, deleted, "startup reconciliation done"),
                Err(e) => {
                    report(self.id, "startup_reconciliation", &e);
                    if let StageError::NotFound(_) = &e {
                        self.reconciler.invalidate();
                    }
                },
            }
        }
        self.control
            .ensure_live(&*self.gateway, &mut self.reconciler, &self.registry)
            .await
    }

    /// Recompute the control message from the registry.
    pub async fn refresh(&mut self) -> Result<()> {
        self.control
            .refresh(&*self.gateway, &mut self.reconciler, &self.registry)
            .await
    }

    /// Dispatch a reaction on the control message to its command.
    ///
    /// Reactions with unknown glyphs are stripped without further action.
    /// Known ones run their command, are stripped so the user can react
    /// again, and the message is refreshed.
    pub async fn on_reaction(&mut self, reaction: ReactionEvent) -> Result<()> {
        let gateway = &*self.gateway;
        if !self.control.accepts(&reaction, gateway.bot_user()) {
            debug!(community = %self.id, message = %reaction.message.id, "ignoring reaction");
            return Ok(());
        }

        let Some(command) = self.table.lookup(&reaction.glyph) else {
            debug!(community = %self.id, glyph = %reaction.glyph, "stripping unknown reaction");
            return self.strip(&reaction).await;
        };

        debug!(community = %self.id, user = %reaction.user, command = command.name(), "running command");
        let outcome = self.run_command(command, reaction.user).await;
        if let Err(e) = &outcome {
            report(self.id, command.name(), e);
            if let StageError::NotFound(_) = e {
                self.reconciler.invalidate();
            }
        }
        if let Err(e) = self.strip(&reaction).await {
            report(self.id, "strip_reaction", &e);
        }
        match outcome {
            Err(e) if !e.is_expected() => Err(e),
            _ => self.refresh().await,
        }
    }

    async fn strip(&self, reaction: &ReactionEvent) -> Result<()> {
        self.gateway
            .remove_reaction(reaction.message, &reaction.glyph, reaction.user)
            .await?;
        Ok(())
    }

    /// Run `command` on behalf of `actor`.
    pub async fn run_command(&mut self, command: Command, actor: UserId) -> Result<()> {
        if let Some(capability) = command.required_capability()
            && !self
                .gateway
                .has_capability(self.id, actor, capability)
                .await?
        {
            return Err(StageError::PermissionDenied {
                user: actor,
                capability,
            });
        }

        match command {
            Command::CreateOwn => self.create_own(actor).await,
            Command::DeleteOwn => self.delete_own(actor).await,
            Command::PurgeAll => self.purge_all(actor).await,
        }
    }

    async fn create_own(&mut self, owner: UserId) -> Result<()> {
        let gateway = &*self.gateway;
        let container = self.reconciler.resolve_container(gateway).await?;
        self.registry
            .create(gateway, self.id, container, owner, Utc::now())
            .await?;
        Ok(())
    }

    async fn delete_own(&mut self, owner: UserId) -> Result<()> {
        self.registry
            .destroy(&*self.gateway, self.id, owner, false)
            .await
    }

    /// Delete every tracked stage and every untracked channel, leaving only
    /// the control channel.
    async fn purge_all(&mut self, actor: UserId) -> Result<()> {
        warn!(community = %self.id, user = %actor, "purging all stages");
        let gateway = &*self.gateway;
        self.registry.destroy_all(gateway, self.id, true).await;

        let untracked = self
            .reconciler
            .untracked_channels(gateway, &self.registry)
            .await?;
        for channel in untracked {
            info!(community = %self.id, channel = %channel.id, name = %channel.name, "deleting untracked channel");
            if let Err(e) = gateway.delete_channel(channel.id).await {
                warn!(community = %self.id, channel = %channel.id, error = %e, "untracked channel deletion failed");
            }
        }
        Ok(())
    }

    /// Delete untracked channels, sparing occupied stages and the text
    /// channel named after the same owner. A stage whose occupancy cannot be
    /// read counts as occupied.
    pub async fn reconcile_untracked(&mut self) -> Result<usize> {
        let gateway = &*self.gateway;
        let untracked = self
            .reconciler
            .untracked_channels(gateway, &self.registry)
            .await?;

        let mut spared = Vec::new();
        for channel in untracked.iter().filter(|c| c.kind == ChannelKind::Stage) {
            let occupied = match gateway.current_occupants(self.id, channel.id).await {
                Ok(occupants) => !occupants.is_empty(),
                Err(e) => {
                    warn!(community = %self.id, channel = %channel.id, error = %e, "occupancy unknown, keeping leftover stage");
                    true
                },
            };
            if occupied {
                spared.push(channel.id);
                if let Some(owner) = owner_from_stage_name(&channel.name) {
                    let text = text_name(owner);
                    spared.extend(untracked.iter().filter(|c| c.name == text).map(|c| c.id));
                }
            }
        }

        let mut deleted = 0;
        for channel in untracked.iter().filter(|c| !spared.contains(&c.id)) {
            info!(community = %self.id, channel = %channel.id, name = %channel.name, "deleting leftover channel");
            match gateway.delete_channel(channel.id).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(community = %self.id, channel = %channel.id, error = %e, "leftover channel deletion failed")
                },
            }
        }
        if !spared.is_empty() {
            info!(community = %self.id, spared = spared.len(), "kept occupied leftover stages");
        }
        Ok(deleted)
    }

    /// Keep tracked channels on their canonical names and pick up topic
    /// changes for the listing.
    pub async fn on_channel_updated(&mut self, channel: ChannelInfo) -> Result<()> {
        let Some(pair) = self
            .reconciler
            .find_by_channel(&mut self.registry, channel.id)
        else {
            return Ok(());
        };

        let canonical = pair.canonical_names();
        let is_stage = pair.stage.id == channel.id;
        let known = if is_stage {
            &mut pair.stage
        } else {
            &mut pair.text
        };

        if known.name != channel.name {
            if canonical.contains(&channel.name) {
                known.name = channel.name.clone();
            } else {
                warn!(
                    community = %self.id,
                    from = %known.name,
                    to = %channel.name,
                    "channel name was changed, undoing"
                );
                self.gateway.rename_channel(channel.id, &known.name).await?;
            }
        }

        if is_stage && known.topic != channel.topic {
            known.topic = channel.topic;
            return self.refresh().await;
        }
        Ok(())
    }

    /// React to channels disappearing underneath the bot.
    pub async fn on_channel_deleted(&mut self, channel: ChannelId) -> Result<()> {
        if self.reconciler.container_id() == Some(channel) {
            warn!(community = %self.id, "category was deleted");
            self.reconciler.invalidate();
            self.control.invalidate();
            return self.refresh().await;
        }

        if self.reconciler.control_channel_id() == Some(channel) {
            warn!(community = %self.id, "control channel was deleted");
            self.reconciler.invalidate_control_channel();
            self.control.invalidate();
            return self.refresh().await;
        }

        let Some(owner) = self.registry.find_by_channel(channel).map(|p| p.owner) else {
            return Ok(());
        };
        if let Some(pair) = self.registry.forget(owner) {
            warn!(community = %self.id, %owner, %channel, "half of a stage was deleted, removing the rest");
            let rest = pair.channel_ids().into_iter().filter(|c| *c != channel);
            for other in rest {
                match self.gateway.delete_channel(other).await {
                    Ok(()) => {},
                    Err(e) if e.is_not_found() => {},
                    Err(e) => warn!(community = %self.id, channel = %other, error = %e, "channel deletion failed"),
                }
            }
        }
        self.refresh().await
    }

    /// Repost the control message if it was the one deleted.
    pub async fn on_message_deleted(&mut self, message: MessageRef) -> Result<()> {
        if self.control.live_message() != Some(message) {
            return Ok(());
        }
        warn!(community = %self.id, message = %message.id, "control message was deleted, reposting");
        self.control.invalidate();
        self.refresh().await
    }
}

impl std::fmt::Debug for CommunityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommunityState")
            .field("id", &self.id)
            .field("tracked", &self.registry.len())
            .field("control", &self.control.state())
            .finish()
    }
}

/// Owner display name encoded in a stage channel name, if it follows the
/// naming scheme.
pub fn owner_from_stage_name(name: &str) -> Option<&str> {
    name.strip_suffix("'s stage")
        .filter(|owner| stage_name(owner) == name && !owner.is_empty())
}
