//! Routes platform events to the worker of the community they belong to.

use std::{collections::HashMap, sync::Arc};

use {
    dynstage_config::CommunityConfig,
    dynstage_platform::{CommunityId, PlatformEvent, PlatformGateway},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info},
};

use crate::{
    commands::CommandTable,
    community::{CommunityOptions, CommunityState, CommunityTask},
    sweeper::Sweeper,
    worker::CommunityHandle,
};

pub struct Dispatcher {
    gateway: Arc<dyn PlatformGateway>,
    config: Arc<CommunityConfig>,
    table: Arc<CommandTable>,
    options: CommunityOptions,
    communities: HashMap<CommunityId, CommunityHandle>,
}

impl Dispatcher {
    pub fn new(
        gateway: Arc<dyn PlatformGateway>,
        config: CommunityConfig,
        table: CommandTable,
        options: CommunityOptions,
    ) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
            table: Arc::new(table),
            options,
            communities: HashMap::new(),
        }
    }

    /// Communities with a running worker, in id order.
    pub fn known_communities(&self) -> Vec<CommunityId> {
        let mut ids: Vec<_> = self.communities.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Hand one event to the right worker. A community gets its worker the
    /// first time it is referenced, and is set up before anything else runs
    /// in it.
    pub fn dispatch(&mut self, event: PlatformEvent) {
        let (community, task) = match event {
            PlatformEvent::Ready { communities } => {
                info!(count = communities.len(), "ready");
                for community in communities {
                    self.start(community);
                }
                return;
            },
            PlatformEvent::Joined { community } => {
                if !self.communities.contains_key(&community) {
                    info!(%community, "joined community");
                    self.start(community);
                }
                return;
            },
            PlatformEvent::ReactionAdded(reaction) => {
                (reaction.community, CommunityTask::Reaction(reaction))
            },
            PlatformEvent::ChannelUpdated { community, channel } => {
                (community, CommunityTask::ChannelUpdated(channel))
            },
            PlatformEvent::ChannelDeleted { community, channel } => {
                (community, CommunityTask::ChannelDeleted(channel))
            },
            PlatformEvent::MessageDeleted { community, message } => {
                (community, CommunityTask::MessageDeleted(message))
            },
        };

        if !self.communities.contains_key(&community) {
            info!(%community, task = task.name(), "event for new community, setting it up");
            self.start(community);
        }
        self.send(community, task);
    }

    /// Queue an expiry sweep in every community.
    pub fn sweep_all(&mut self) {
        debug!(communities = self.communities.len(), "sweep tick");
        for community in self.known_communities() {
            self.send(community, CommunityTask::Sweep);
        }
    }

    /// Dispatch events and sweep ticks until `shutdown` fires or the event
    /// stream ends, then drain every worker.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<PlatformEvent>,
        mut sweeper: Sweeper,
        shutdown: CancellationToken,
    ) {
        info!(sweep_secs = sweeper.period().as_secs(), "dispatcher started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested");
                    break;
                },
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => {
                        info!("event stream closed");
                        break;
                    },
                },
                _ = sweeper.tick() => self.sweep_all(),
            }
        }
        self.shutdown().await;
    }

    /// Close every queue and wait for the workers to finish what they hold.
    pub async fn shutdown(&mut self) {
        for (community, handle) in self.communities.drain() {
            if handle.shutdown().await.is_none() {
                error!(%community, "community worker panicked");
            }
        }
        info!("all community workers stopped");
    }

    /// Make sure `community` has a worker and queue its setup.
    fn start(&mut self, community: CommunityId) {
        self.worker(community);
        self.send(community, CommunityTask::Ready);
    }

    fn worker(&mut self, community: CommunityId) {
        self.communities.entry(community).or_insert_with(|| {
            let state = CommunityState::new(
                community,
                self.gateway.clone(),
                self.config.clone(),
                self.table.clone(),
                self.options,
            );
            CommunityHandle::spawn(state)
        });
    }

    fn send(&mut self, community: CommunityId, task: CommunityTask) {
        let Some(handle) = self.communities.get(&community) else {
            return;
        };
        if !handle.enqueue(task) {
            error!(%community, "community worker is gone, dropping it");
            self.communities.remove(&community);
        }
    }
}
