//! Bot layer - Discord-specific interface and command handlers
//!
//! This module wires the framework-agnostic `core`, `wos` and `service` layers
//! to Discord: slash commands, autocomplete, the message handler and the
//! framework setup that starts the background workers.

/// Permission checks shared by commands
pub mod access;
/// Discord command implementations
pub mod commands;
/// Size-limited reply formatting
pub mod format;
/// Discord interaction handlers (autocomplete, messages)
pub mod handlers;

use crate::{
    config::AppConfig,
    errors::{Error, Result},
    llm::{LlmManager, OpenRouterBackend},
    music::TrackRegistry,
    search::SearchClient,
    service::{
        ChannelSink, DiscordSink, monitor::AllianceMonitor, redemption::RedemptionQueue,
    },
    wos::{GiftApi, PlayerLookup, Redeemer, RemoteSolver, WosClient},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use songbird::SerenityInit;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Poise context used by every command.
pub type Context<'a> = poise::Context<'a, BotData, Error>;

/// Clients built from configuration before the gateway connects.
pub struct Services {
    /// Shared HTTP client (game API, OCR, LLM, search, voice)
    pub http: reqwest::Client,
    /// Game API
    pub api: Arc<dyn GiftApi>,
    /// Redemption attempts
    pub redeemer: Arc<Redeemer>,
    /// Cached player lookups
    pub players: Arc<PlayerLookup>,
    /// Language model pool
    pub llm: Arc<LlmManager>,
    /// Web search
    pub search: SearchClient,
}

impl Services {
    /// Builds every client from the configuration and the LLM keys.
    #[must_use]
    pub fn from_config(config: &AppConfig, llm_keys: Vec<String>) -> Self {
        let http = reqwest::Client::new();
        let api: Arc<dyn GiftApi> = Arc::new(WosClient::new(http.clone(), &config.wos));
        let solver = Arc::new(RemoteSolver::new(http.clone(), &config.captcha));
        let redeemer = Arc::new(Redeemer::new(
            Arc::clone(&api),
            solver,
            &config.redemption,
            &config.captcha,
        ));
        let players = Arc::new(PlayerLookup::new(Arc::clone(&api), &config.player));
        let backend = Arc::new(OpenRouterBackend::new(http.clone(), &config.llm));
        let llm = Arc::new(LlmManager::new(llm_keys, backend, &config.llm));
        let search = SearchClient::new(http.clone());

        Self {
            http,
            api,
            redeemer,
            players,
            llm,
            search,
        }
    }
}

/// Shared data available to all bot commands.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Handle to the redemption worker
    pub redemption: RedemptionQueue,
    /// Redemption attempts (for statistics)
    pub redeemer: Arc<Redeemer>,
    /// Cached player lookups
    pub players: Arc<PlayerLookup>,
    /// Language model pool
    pub llm: Arc<LlmManager>,
    /// Web search
    pub search: SearchClient,
    /// HTTP client handed to voice inputs
    pub http: reqwest::Client,
    /// Metadata of queued voice tracks
    pub tracks: Arc<TrackRegistry>,
}

impl BotData {
    /// Footer shown on embeds.
    #[must_use]
    pub fn footer(&self) -> serenity::CreateEmbedFooter {
        serenity::CreateEmbedFooter::new(&self.config.bot.footer_text)
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            let message = if error.is_user_facing() {
                format!("❌ {error}")
            } else {
                error!("Error in command `{}`: {error:?}", ctx.command().name);
                "❌ Something went wrong while running this command.".to_string()
            };
            let reply = poise::CreateReply::default().content(message).ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

fn framework_options() -> poise::FrameworkOptions<BotData, Error> {
    poise::FrameworkOptions {
        commands: commands::all(),
        on_error: |error| Box::pin(on_error(error)),
        pre_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().qualified_name;
                let user = &ctx.author().name;
                info!("Started '{cmd_name}' command from {user}.");
            })
        },
        post_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().qualified_name;
                let user = &ctx.author().name;
                info!("Finished '{cmd_name}' command from {user}.");
            })
        },
        event_handler: |ctx, event, framework, data| {
            Box::pin(handlers::message::handle_event(ctx, event, framework, data))
        },
        ..Default::default()
    }
}

/// Connects to Discord and runs until the gateway shuts down.
///
/// Commands are registered globally, and in the development guild when one
/// is configured. The redemption worker and the alliance monitor start once
/// the bot is ready.
#[instrument(skip_all)]
pub async fn run_bot(
    token: String,
    config: Arc<AppConfig>,
    database: DatabaseConnection,
    services: Services,
) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(framework_options())
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                if let Some(guild_id) = config.bot.dev_guild_id {
                    let guild_id = serenity::GuildId::new(guild_id);
                    poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        guild_id,
                    )
                    .await?;
                    info!("Registered commands in guild {guild_id}");
                }

                let sink: Arc<dyn ChannelSink> = Arc::new(DiscordSink::new(Arc::clone(&ctx.http)));
                let (redemption, _worker) = RedemptionQueue::start(
                    database.clone(),
                    Arc::clone(&services.redeemer),
                    Arc::clone(&sink),
                    Duration::from_millis(config.redemption.member_delay_ms),
                );
                AllianceMonitor::new(
                    database.clone(),
                    Arc::clone(&services.api),
                    sink,
                    &config.monitor,
                )
                .start();

                Ok(BotData {
                    database,
                    config,
                    redemption,
                    redeemer: services.redeemer,
                    players: services.players,
                    llm: services.llm,
                    search: services.search,
                    http: services.http,
                    tracks: Arc::new(TrackRegistry::default()),
                })
            })
        })
        .build();

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .register_songbird()
        .await
        .inspect_err(|e| error!("Error creating client: {e:?}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e:?}"))?;
    Ok(())
}
