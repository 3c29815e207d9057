use super::*;
use crate::commands::music::audio_node::track::Track;
use crate::commands::music::utils::{
    embedded_messages,
    favorites::{FavoriteChoice, favorite_options},
    limits::Bucket,
    music_manager::{refresh_controller_logged, resolve_play_context, tracks_from_load},
    play_args::{
        PlayRequest, PlaylistMode, SearchProvider, addposition_request, build_identifier,
        parse_legacy_args, parse_server_id, query_or_attachment,
    },
    pool::MusicContext,
    selection::{prompt_select, prompt_track},
};
use crate::commands::music::utils::checks::{check_voice_membership, parse_position};
use crate::utils::database::{GuildSettings, Model, UserSettings};
use poise::serenity_prelude::Attachment;
use tracing::{debug, info};

/// Play a song or playlist from a link or a search
#[poise::command(slash_command, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song name or link, leave empty to pick from your favorites"] query: Option<String>,
    #[description = "Queue position to insert at"]
    #[min = 1]
    position: Option<i64>,
    #[description = "Skip the current track and play this right away"] force_play: Option<bool>,
    #[description = "Order of the playlist tracks"] mode: Option<PlaylistMode>,
    #[description = "Pick the track from the search results"] manual_selection: Option<bool>,
    #[description = "Where to search"] source: Option<SearchProvider>,
    #[description = "Audio file to play"] file: Option<Attachment>,
    #[description = "Id of the server to play in"] server: Option<String>,
    #[description = "Choose which bot joins"] manual_bot_choice: Option<bool>,
) -> CommandResult {
    let request = PlayRequest {
        query: query.unwrap_or_default(),
        position: position.map(parse_position).transpose()?,
        force_play: force_play.unwrap_or(false),
        mode,
        manual_selection: manual_selection.unwrap_or(false),
        source: source.unwrap_or_default(),
        server: server.as_deref().map(parse_server_id).transpose()?,
        manual_bot_choice: manual_bot_choice.unwrap_or(false),
    };
    run_play(ctx, request, file).await
}

/// Play a song or playlist (flags: -pos N, -force, -shuffle, -reverse, -select, -source NAME, -server ID, -bot)
#[poise::command(prefix_command, rename = "p", aliases("play"), category = "Music")]
pub async fn play_legacy(ctx: Context<'_>, #[rest] args: Option<String>) -> CommandResult {
    let request = parse_legacy_args(args.as_deref().unwrap_or_default())?;
    run_play(ctx, request, prefix_attachment(ctx)).await
}

/// Queue a song at a given position
#[poise::command(prefix_command, aliases("adp", "addpos"), category = "Music")]
pub async fn addposition(
    ctx: Context<'_>,
    #[description = "Queue position to insert at"] position: i64,
    #[rest] args: String,
) -> CommandResult {
    let request = addposition_request(position, &args)?;
    run_play(ctx, request, prefix_attachment(ctx)).await
}

/// Search for a song and pick it from the results
#[poise::command(slash_command, category = "Music")]
pub async fn search(
    ctx: Context<'_>,
    #[description = "What to search for"] query: String,
    #[description = "Where to search"] source: Option<SearchProvider>,
    #[description = "Queue position to insert at"]
    #[min = 1]
    position: Option<i64>,
    #[description = "Id of the server to play in"] server: Option<String>,
) -> CommandResult {
    let request = PlayRequest {
        query,
        position: position.map(parse_position).transpose()?,
        manual_selection: true,
        source: source.unwrap_or_default(),
        server: server.as_deref().map(parse_server_id).transpose()?,
        ..Default::default()
    };
    run_play(ctx, request, None).await
}

/// Search for a song and pick it from the results (same flags as play)
#[poise::command(prefix_command, rename = "sc", aliases("search"), category = "Music")]
pub async fn search_legacy(ctx: Context<'_>, #[rest] args: String) -> CommandResult {
    let mut request = parse_legacy_args(&args)?;
    request.manual_selection = true;
    run_play(ctx, request, None).await
}

fn prefix_attachment(ctx: Context<'_>) -> Option<Attachment> {
    match ctx {
        poise::Context::Prefix(prefix) => prefix.msg.attachments.first().cloned(),
        poise::Context::Application(_) => None,
    }
}

/// What the request resolved to before anything is queued.
enum Resolved {
    Query(String),
    /// Tracks of the author's saved queue, deleted once they are queued.
    SavedQueue(Vec<Track>),
}

async fn run_play(ctx: Context<'_>, mut request: PlayRequest, file: Option<Attachment>) -> CommandResult {
    let guild_id = request
        .server
        .or(ctx.guild_id())
        .ok_or(MusicError::NotInGuild)?;
    let _permit = ctx
        .data()
        .limits
        .song_request
        .try_acquire(Bucket::Member(guild_id, ctx.author().id))?;

    request.query = query_or_attachment(
        &request.query,
        file.as_ref().map(|f| f.url.as_str()),
        file.as_ref().and_then(|f| f.content_type.as_deref()),
    );

    let music = resolve_play_context(ctx, request.server, request.manual_bot_choice).await?;
    let bot = music.bot();

    // Refuse early: the menu and the node load are wasted otherwise.
    let existing_voice = match music.player() {
        Some(handle) => Some(handle.lock().await.voice_channel),
        None => None,
    };
    let voice_channel = check_voice_membership(music.author_voice, existing_voice)?;

    let resolved = if request.query.trim().is_empty() {
        pick_favorite(ctx, &music).await?
    } else {
        Resolved::Query(request.query.clone())
    };

    ctx.defer().await?;

    let from_saved_queue = matches!(resolved, Resolved::SavedQueue(_));
    let (tracks, playlist) = match resolved {
        Resolved::SavedQueue(tracks) => (tracks, None),
        Resolved::Query(query) => {
            let identifier = build_identifier(&query, request.source);
            debug!("Loading '{}' on {}", identifier, bot.name);
            let result = bot
                .node
                .load_tracks(music.guild_id, &identifier)
                .await
                .map_err(MusicError::from)?;
            let mut loaded = tracks_from_load(result, ctx.author().id, request.mode, &query)?;
            if loaded.search {
                let index = if request.manual_selection {
                    prompt_track(ctx, &loaded.tracks).await?
                } else {
                    0
                };
                if index >= loaded.tracks.len() {
                    return Err(MusicError::Generic("That result is no longer available.".into()).into());
                }
                loaded.tracks = vec![loaded.tracks.swap_remove(index)];
            }
            (loaded.tracks, loaded.playlist)
        }
    };

    let max_entries = ctx.data().config.queue_max_entries;
    MusicManager::check_room(&music, tracks.len(), max_entries).await?;

    let created = music.player().is_none();
    let handle = MusicManager::ensure_player(&music, voice_channel, ctx.channel_id()).await?;
    if created {
        let settings: GuildSettings = ctx.data().database.get_data(music.guild_id.get(), Model::Guilds)?;
        handle.lock().await.apply_guild_settings(&settings, ctx.channel_id());
    }

    let outcome = {
        let mut player = handle.lock().await;
        MusicManager::enqueue_request(
            bot.node.as_ref(),
            &mut player,
            tracks.clone(),
            &request,
            max_entries,
        )
        .await?
    };
    if from_saved_queue {
        ctx.data()
            .saved_queues
            .discard(music.author_id)
            .await
            .map_err(MusicError::from)?;
    }
    info!(
        "{} queued {} track(s) in guild {} on {}",
        ctx.author().name,
        tracks.len(),
        music.guild_id,
        bot.name
    );

    remember_recent(ctx, &tracks)?;

    if !outcome.playing_now {
        refresh_controller_logged(bot, &handle).await;
    }

    let hint = ctx.data().config.random_hint();
    ctx.send(embedded_messages::added(
        &tracks,
        playlist.as_ref(),
        outcome.position,
        outcome.playing_now,
        hint,
    ))
    .await?;
    Ok(())
}

/// Offers the author's favorites, integrations, saved queue and recent tracks.
async fn pick_favorite(ctx: Context<'_>, music: &MusicContext) -> MusicResult<Resolved> {
    let data = ctx.data();
    let user: UserSettings = data.database.get_data(music.author_id.get(), Model::Users)?;
    let guild: GuildSettings = data.database.get_data(music.guild_id.get(), Model::Guilds)?;
    let has_saved_queue = data.saved_queues.exists(music.author_id).await;

    let mut entries = favorite_options(&user, &guild, has_saved_queue)?;
    let options = entries.iter().map(|(option, _)| option.clone()).collect();
    let choice = prompt_select(ctx, "⭐ Pick something to play", options).await?;

    let index: usize = choice
        .parse()
        .map_err(|_| MusicError::Generic("Unexpected selection.".into()))?;
    if index >= entries.len() {
        return Err(MusicError::Generic("Unexpected selection.".into()));
    }

    match entries.swap_remove(index).1 {
        FavoriteChoice::Url(url) => Ok(Resolved::Query(url)),
        FavoriteChoice::SavedQueue => {
            let saved = data
                .saved_queues
                .load(music.author_id)
                .await?
                .ok_or(MusicError::EmptyFavIntegration)?;
            info!("Restoring {} saved tracks for {}", saved.tracks.len(), music.author_id);
            Ok(Resolved::SavedQueue(
                saved
                    .tracks
                    .into_iter()
                    .map(|track| Track {
                        requester: music.author_id,
                        ..track
                    })
                    .collect(),
            ))
        }
    }
}

fn remember_recent(ctx: Context<'_>, tracks: &[Track]) -> MusicResult<()> {
    let Some(track) = tracks.first().filter(|track| track.url() != "#") else {
        return Ok(());
    };
    let database = &ctx.data().database;
    let mut user: UserSettings = database.get_data(ctx.author().id.get(), Model::Users)?;
    user.push_recent(track.title(), track.url());
    database.update_data(ctx.author().id.get(), Model::Users, &user)?;
    Ok(())
}
