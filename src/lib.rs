use poise::serenity_prelude as serenity;
use serenity::all::{ClientBuilder, GatewayIntents, Http, UserId};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod config;
pub mod events;
pub mod utils;

use commands::music::audio_node::lavalink::LavalinkNode;
use commands::music::utils::embedded_messages;
use commands::music::utils::event_handlers::run_node_events;
use commands::music::utils::limits::Limits;
use commands::music::utils::music_manager::MusicError;
use commands::music::utils::pool::{BotPool, PoolBot};
use commands::music::utils::saved_queue::SavedQueueStore;
use config::Config;
use utils::database::Database;
use utils::error_report::{ErrorReport, ErrorReporter, REPORT_INTERVAL};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub config: Config,
    pub pool: Arc<BotPool>,
    pub database: Database,
    pub limits: Arc<Limits>,
    pub saved_queues: SavedQueueStore,
    pub error_reports: Option<ErrorReporter>,
}

#[poise::command(slash_command, prefix_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

/// Renders command errors as a red embed and reports the unexpected ones.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            let music_error = error.downcast_ref::<MusicError>();
            let user_facing = music_error.is_some_and(MusicError::is_user_facing);
            let message = match music_error {
                Some(e) if !e.is_user_facing() => {
                    "Something went wrong while running this command. It has been reported.".to_string()
                }
                _ => error.to_string(),
            };

            if !user_facing {
                error!("Error in command `{}`: {}", ctx.command().qualified_name, error);
                if let Some(reporter) = &ctx.data().error_reports {
                    reporter.report(ErrorReport {
                        command: ctx.command().qualified_name.clone(),
                        guild: ctx
                            .guild_id()
                            .map(|id| format!("{} ({})", ctx.guild().map(|g| g.name.clone()).unwrap_or_default(), id)),
                        author: format!("{} ({})", ctx.author().name, ctx.author().id),
                        error: error.to_string(),
                    });
                }
            }

            let reply = poise::CreateReply::default()
                .embed(embedded_messages::error(message))
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                warn!("Failed to send error message: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

fn intents() -> GatewayIntents {
    GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MEMBERS
}

/// Starts every bot of the pool and runs until ctrl-c.
pub async fn run(config: Config) -> Result<(), Error> {
    let pool = Arc::new(BotPool::default());
    let limits = Arc::new(Limits::default());
    let database = Database::open(&config.database_path)?;
    let saved_queues = SavedQueueStore::new(&config.saved_queue_dir);
    let error_reports = match &config.error_report_webhook {
        Some(url) => Some(ErrorReporter::spawn(
            Arc::new(Http::new(&config.discord_token)),
            url,
            REPORT_INTERVAL,
        )?),
        None => None,
    };

    let tokens: Vec<String> = config.tokens().map(str::to_string).collect();
    let prefix = config.prefix.clone();
    let data = Data {
        config: config.clone(),
        pool: Arc::clone(&pool),
        database,
        limits: Arc::clone(&limits),
        saved_queues,
        error_reports,
    };

    let mut framework = Some(
        poise::Framework::builder()
            .options(poise::FrameworkOptions {
                commands: {
                    let mut commands = vec![register(), help()];
                    commands.extend(commands::music::commands());
                    commands
                },
                prefix_options: poise::PrefixFrameworkOptions {
                    prefix: Some(prefix),
                    ..Default::default()
                },
                on_error: |error| Box::pin(on_error(error)),
                ..Default::default()
            })
            .setup(|ctx, _ready, framework| {
                Box::pin(async move {
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    Ok(data)
                })
            })
            .build(),
    );

    let mut clients = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let songbird = Songbird::serenity();
        let mut builder = ClientBuilder::new(token, intents())
            .event_handler(events::Handler {
                pool: Arc::clone(&pool),
                limits: Arc::clone(&limits),
            })
            .register_songbird_with(Arc::clone(&songbird));
        // Only the primary bot runs the command framework.
        if let Some(framework) = framework.take() {
            builder = builder.framework(framework);
        }
        let client = builder.await?;

        let user = client.http.get_current_user().await?;
        let bot = register_bot(&config, &pool, &client, songbird, user.id, user.name.clone()).await?;
        info!("Registered {} ({}) in the pool", bot.name, bot.user_id);
        clients.push(client);
    }

    let shard_managers: Vec<_> = clients.iter().map(|c| Arc::clone(&c.shard_manager)).collect();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for ctrl-c: {}", e);
            return;
        }
        info!("Shutting down {} bot(s)", shard_managers.len());
        for manager in shard_managers {
            manager.shutdown_all().await;
        }
    });

    let results = futures::future::join_all(clients.iter_mut().map(|client| client.start())).await;
    for result in results {
        result?;
    }
    Ok(())
}

async fn register_bot(
    config: &Config,
    pool: &BotPool,
    client: &serenity::Client,
    songbird: Arc<Songbird>,
    user_id: UserId,
    name: String,
) -> Result<Arc<PoolBot>, Error> {
    let (node, events) =
        LavalinkNode::connect(&config.lavalink_url, &config.lavalink_password, user_id).await?;

    let bot = Arc::new(PoolBot {
        user_id,
        name,
        http: Arc::clone(&client.http),
        cache: Arc::clone(&client.cache),
        songbird,
        node: Arc::new(node),
        players: Default::default(),
        join_lock: Default::default(),
    });

    pool.register(Arc::clone(&bot)).await;
    tokio::spawn(run_node_events(Arc::clone(&bot), events));
    Ok(bot)
}
