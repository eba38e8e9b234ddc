//! One task per community, fed through an unbounded queue.
//!
//! Everything touching a community's registry, reconciler or control message
//! goes through its queue, so handlers run strictly one after another.

use {
    dynstage_platform::CommunityId,
    tokio::{sync::mpsc, task::JoinHandle},
    tracing::{debug, info},
};

use crate::{
    community::{CommunityState, CommunityTask},
    error::report,
};

/// Sending side of a community worker.
#[derive(Debug)]
pub struct CommunityHandle {
    community: CommunityId,
    tx: mpsc::UnboundedSender<CommunityTask>,
    join: JoinHandle<CommunityState>,
}

impl CommunityHandle {
    /// Start the worker owning `state`.
    pub fn spawn(state: CommunityState) -> Self {
        let community = state.id();
        let (tx, rx) = mpsc::unbounded_channel();
        let join = tokio::spawn(run(state, rx));
        Self {
            community,
            tx,
            join,
        }
    }

    pub fn community(&self) -> CommunityId {
        self.community
    }

    /// Queue a task. Returns `false` if the worker is gone.
    pub fn enqueue(&self, task: CommunityTask) -> bool {
        self.tx.send(task).is_ok()
    }

    /// Close the queue and wait until already queued tasks are done.
    /// Returns the final state, or `None` if the worker panicked.
    pub async fn shutdown(self) -> Option<CommunityState> {
        drop(self.tx);
        self.join.await.ok()
    }
}

async fn run(
    mut state: CommunityState,
    mut rx: mpsc::UnboundedReceiver<CommunityTask>,
) -> CommunityState {
    let community = state.id();
    info!(%community, "community worker started");
    while let Some(task) = rx.recv().await {
        let name = task.name();
        debug!(%community, task = name, "handling task");
        if let Err(e) = state.handle(task).await {
            report(community, name, &e);
        }
    }
    info!(%community, "community worker stopped");
    state
}
