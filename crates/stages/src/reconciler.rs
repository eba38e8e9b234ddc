use std::sync::Arc;

use {
    dynstage_config::CommunityConfig,
    dynstage_platform::{
        ChannelId, ChannelInfo, ChannelKind, CommunityId, OverwriteTarget, Permission,
        PermissionOverwrite, PlatformGateway,
    },
    tracing::{debug, warn},
};

use crate::{
    error::{Result, StageError},
    pair::DynamicResourcePair,
    registry::ResourceRegistry,
};

/// A resolved platform object that may have gone stale.
///
/// Stale values are kept for reference but never handed out; the next access
/// resolves again.
#[derive(Debug)]
pub struct Cached<T> {
    value: Option<T>,
    stale: bool,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self {
            value: None,
            stale: false,
        }
    }
}

impl<T> Cached<T> {
    pub fn fresh(&self) -> Option<&T> {
        if self.stale {
            None
        } else {
            self.value.as_ref()
        }
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
        self.stale = false;
    }

    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Last resolved value, stale or not.
    pub fn last(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

/// Finds or creates the community's category and control channel and tells
/// tracked channels apart from untracked ones.
#[derive(Debug)]
pub struct ContainerReconciler {
    community: CommunityId,
    config: Arc<CommunityConfig>,
    container: Cached<ChannelInfo>,
    control_channel: Cached<ChannelInfo>,
}

impl ContainerReconciler {
    pub fn new(community: CommunityId, config: Arc<CommunityConfig>) -> Self {
        Self {
            community,
            config,
            container: Cached::default(),
            control_channel: Cached::default(),
        }
    }

    /// The category holding everything, created when missing.
    pub async fn resolve_container(&mut self, gateway: &dyn PlatformGateway) -> Result<ChannelId> {
        if let Some(container) = self.container.fresh() {
            return Ok(container.id);
        }

        let name = &self.config.category_name;
        let existing = gateway
            .list_containers(self.community)
            .await?
            .into_iter()
            .find(|c| c.kind == ChannelKind::Category && &c.name == name);
        let container = match existing {
            Some(container) => container,
            None => {
                warn!(community = %self.community, category = %name, "category not found, creating");
                gateway.create_container(self.community, name).await?
            },
        };
        debug!(community = %self.community, container = %container.id, "resolved category");
        let id = container.id;
        self.container.set(container);
        Ok(id)
    }

    /// Look the category up again instead of trusting the cache. Returns
    /// whether it changed, in which case the control channel is stale too.
    pub async fn revalidate_container(&mut self, gateway: &dyn PlatformGateway) -> Result<bool> {
        let previous = self.container_id();
        self.container.invalidate();
        let current = self.resolve_container(gateway).await?;
        let changed = previous.is_some_and(|p| p != current);
        if changed {
            self.control_channel.invalidate();
        }
        Ok(changed)
    }

    /// The read-only control channel inside the category, created when missing.
    pub async fn resolve_control_channel(
        &mut self,
        gateway: &dyn PlatformGateway,
    ) -> Result<ChannelId> {
        if let Some(channel) = self.control_channel.fresh() {
            return Ok(channel.id);
        }

        let container = self.resolve_container(gateway).await?;
        let children = self.children(gateway, container).await?;
        let name = &self.config.control_channel_name;
        let channel = match children
            .into_iter()
            .find(|c| c.kind == ChannelKind::Text && &c.name == name)
        {
            Some(channel) => channel,
            None => {
                warn!(community = %self.community, channel = %name, "control channel not found, creating");
                let overwrites = [
                    PermissionOverwrite::allow(OverwriteTarget::Bot, &[Permission::SendMessages]),
                    PermissionOverwrite::deny(OverwriteTarget::Everyone, &[
                        Permission::SendMessages,
                    ]),
                ];
                let created = gateway
                    .create_text_channel(
                        self.community,
                        container,
                        name,
                        self.config.control_channel_topic.as_deref(),
                        &overwrites,
                    )
                    .await;
                self.note(created)?
            },
        };
        let id = channel.id;
        self.control_channel.set(channel);
        Ok(id)
    }

    /// Last known control channel, even when it has to be re-resolved.
    pub fn control_channel_id(&self) -> Option<ChannelId> {
        self.control_channel.last().map(|c| c.id)
    }

    pub fn container_id(&self) -> Option<ChannelId> {
        self.container.last().map(|c| c.id)
    }

    /// Tracked pair owning `channel`, so a rename can be checked against
    /// the names the bot gave it and undone.
    pub fn find_by_channel<'r>(
        &self,
        registry: &'r mut ResourceRegistry,
        channel: ChannelId,
    ) -> Option<&'r mut DynamicResourcePair> {
        registry.find_by_channel_mut(channel)
    }

    /// Children of the category that belong neither to a tracked pair nor
    /// are the control channel.
    pub async fn untracked_channels(
        &mut self,
        gateway: &dyn PlatformGateway,
        registry: &ResourceRegistry,
    ) -> Result<Vec<ChannelInfo>> {
        let container = self.resolve_container(gateway).await?;
        let control = self.resolve_control_channel(gateway).await?;
        let tracked = registry.tracked_channels();
        Ok(self
            .children(gateway, container)
            .await?
            .into_iter()
            .filter(|c| c.id != control && !tracked.contains(&c.id))
            .collect())
    }

    /// Mark everything stale, e.g. after the category was deleted.
    pub fn invalidate(&mut self) {
        self.container.invalidate();
        self.control_channel.invalidate();
    }

    pub fn invalidate_control_channel(&mut self) {
        self.control_channel.invalidate();
    }

    async fn children(
        &mut self,
        gateway: &dyn PlatformGateway,
        container: ChannelId,
    ) -> Result<Vec<ChannelInfo>> {
        let children = gateway.list_children(self.community, container).await;
        self.note(children)
    }

    /// Convert a gateway result, invalidating the cache on `NotFound` since
    /// that means the category or a channel in it disappeared.
    fn note<T>(&mut self, result: dynstage_platform::PlatformResult<T>) -> Result<T> {
        result.map_err(|e| {
            if e.is_not_found() {
                warn!(community = %self.community, error = %e, "category vanished, will re-resolve");
                self.invalidate();
            }
            StageError::from(e)
        })
    }
}
