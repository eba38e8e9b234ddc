//! The single control message per community.
//!
//! The message lists the tracked stages above the static instructions and
//! carries one reaction per command. It is either live (posted, reactions
//! attached) or absent; every path that finds it missing reposts it.

use std::sync::Arc;

use {
    dynstage_config::CommunityConfig,
    dynstage_platform::{CommunityId, MessageRef, PlatformGateway, ReactionEvent, UserId},
    tracing::{debug, info, warn},
};

use crate::{
    commands::CommandTable, error::Result, reconciler::ContainerReconciler,
    registry::ResourceRegistry,
};

/// Body of the control message for the current registry state.
pub fn render_text(registry: &ResourceRegistry, body: &str) -> String {
    if registry.is_empty() {
        return body.to_string();
    }

    let mut text = String::from("```\nStages\n");
    for pair in registry.pairs() {
        text.push_str(&format!(" - {pair}\n"));
    }
    text.push_str("```\n");
    text.push_str(body);
    text
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    NoMessage,
    Live(MessageRef),
}

#[derive(Debug)]
pub struct ControlMessage {
    community: CommunityId,
    config: Arc<CommunityConfig>,
    table: Arc<CommandTable>,
    state: ControlState,
    current_text: String,
}

impl ControlMessage {
    pub fn new(
        community: CommunityId,
        config: Arc<CommunityConfig>,
        table: Arc<CommandTable>,
    ) -> Self {
        Self {
            community,
            config,
            table,
            state: ControlState::NoMessage,
            current_text: String::new(),
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn live_message(&self) -> Option<MessageRef> {
        match self.state {
            ControlState::Live(message) => Some(message),
            ControlState::NoMessage => None,
        }
    }

    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    /// Whether a reaction is meant for this message: on the live message and
    /// not added by the bot itself.
    pub fn accepts(&self, reaction: &ReactionEvent, bot: UserId) -> bool {
        reaction.user != bot && self.live_message() == Some(reaction.message)
    }

    /// Forget the live message, e.g. after it or its channel was deleted.
    pub fn invalidate(&mut self) {
        self.state = ControlState::NoMessage;
    }

    /// Post the message unless it is live already.
    ///
    /// Earlier bot messages in the control channel are removed first so a
    /// crashed run does not leave duplicates behind.
    pub async fn ensure_live(
        &mut self,
        gateway: &dyn PlatformGateway,
        reconciler: &mut ContainerReconciler,
        registry: &ResourceRegistry,
    ) -> Result<()> {
        if let ControlState::Live(_) = self.state {
            return Ok(());
        }

        let channel = reconciler.resolve_control_channel(gateway).await?;
        let history = match gateway
            .list_message_history(channel, gateway.bot_user())
            .await
        {
            Ok(history) => history,
            Err(e) => {
                if e.is_not_found() {
                    reconciler.invalidate_control_channel();
                }
                return Err(e.into());
            },
        };
        for message in history {
            info!(community = %self.community, message = %message.id, "deleting prior control message");
            if let Err(e) = gateway.delete_message(message).await {
                warn!(community = %self.community, message = %message.id, error = %e, "could not delete prior control message");
            }
        }

        let text = render_text(registry, &self.config.control_message);
        info!(community = %self.community, %channel, "posting control message");
        let message = gateway.send_message(channel, &text).await?;
        // Only a message carrying every glyph counts as live. A partial one
        // is swept up as a prior message on the next attempt.
        for glyph in self.table.glyphs() {
            gateway.add_reaction(message, glyph).await?;
        }
        self.state = ControlState::Live(message);
        self.current_text = text;
        Ok(())
    }

    /// Bring the message body in line with the registry, reposting the
    /// message if it is missing.
    pub async fn refresh(
        &mut self,
        gateway: &dyn PlatformGateway,
        reconciler: &mut ContainerReconciler,
        registry: &ResourceRegistry,
    ) -> Result<()> {
        let ControlState::Live(message) = self.state else {
            return self.ensure_live(gateway, reconciler, registry).await;
        };

        let text = render_text(registry, &self.config.control_message);
        if text == self.current_text {
            debug!(community = %self.community, "control message unchanged");
            return Ok(());
        }

        match gateway.edit_message(message, &text).await {
            Ok(()) => {
                self.current_text = text;
                Ok(())
            },
            Err(e) if e.is_not_found() => {
                warn!(community = %self.community, message = %message.id, "control message vanished, reposting");
                self.invalidate();
                self.ensure_live(gateway, reconciler, registry).await
            },
            Err(e) => Err(e.into()),
        }
    }
}
