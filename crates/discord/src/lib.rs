//! Discord adapter: a [`PlatformGateway`] over serenity plus the event
//! stream feeding the stage dispatcher.

pub mod convert;
pub mod gateway;
pub mod handler;

use std::sync::Arc;

use {
    anyhow::{Context as _, Result},
    dynstage_platform::{PlatformEvent, PlatformGateway},
    secrecy::{ExposeSecret, Secret},
    serenity::all as discord,
    tokio::{sync::mpsc, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{error, info},
};

pub use {gateway::SerenityGateway, handler::Handler};

/// Gateway intents needed for channels, the control message, its reactions
/// and stage occupancy.
pub fn intents() -> discord::GatewayIntents {
    discord::GatewayIntents::GUILDS
        | discord::GatewayIntents::GUILD_MESSAGES
        | discord::GatewayIntents::GUILD_MESSAGE_REACTIONS
        | discord::GatewayIntents::GUILD_VOICE_STATES
}

/// A logged-in but not yet started Discord client.
pub struct DiscordConnection {
    client: discord::Client,
    gateway: Arc<SerenityGateway>,
}

impl DiscordConnection {
    /// Build the client and resolve the bot's own user over HTTP, so the
    /// gateway knows it before the first event arrives.
    pub async fn connect(
        token: &Secret<String>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PlatformEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = discord::Client::builder(token.expose_secret(), intents())
            .event_handler(Handler::new(tx))
            .await
            .context("failed to build discord client")?;
        let bot = client
            .http
            .get_current_user()
            .await
            .context("failed to fetch the bot user, is the token valid?")?;
        info!(bot = %bot.name, id = %bot.id, "discord bot user resolved");

        let gateway = Arc::new(SerenityGateway::new(
            client.http.clone(),
            client.cache.clone(),
            bot.id,
        ));
        Ok((Self { client, gateway }, rx))
    }

    pub fn gateway(&self) -> Arc<dyn PlatformGateway> {
        self.gateway.clone()
    }

    /// Run the shards until `shutdown` fires. A client that stops on its own
    /// cancels `shutdown` so the rest of the process follows.
    pub fn spawn(mut self, shutdown: CancellationToken) -> JoinHandle<()> {
        let shard_manager = self.client.shard_manager.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = self.client.start() => {
                    match result {
                        Ok(()) => info!("discord client stopped"),
                        Err(e) => error!(error = %e, "discord client failed"),
                    }
                    shutdown.cancel();
                },
                _ = shutdown.cancelled() => {
                    info!("closing discord shards");
                    shard_manager.shutdown_all().await;
                },
            }
        })
    }
}
