use poise::serenity_prelude as serenity;
use serenity::all::{
    ChannelId, ChannelType, CreateMessage, EditMessage, GuildId, Permissions, UserId,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::checks::{check_channel_limit, check_queue_capacity, check_voice_permissions, require_dj};
use super::embedded_messages;
use super::play_args::{PlayRequest, PlaylistMode};
use super::player::Player;
use super::pool::{
    BotBinding, BotPool, MusicContext, PlayerHandle, PoolBot, bind, bot_in_channel, choose_bot,
    choose_player_bot, free_bots,
};
use super::saved_queue::SavedQueueError;
use super::selection;
use super::stage_status::{set_stage_topic, set_voice_status};
use crate::Context;
use crate::utils::database::DatabaseError;
use crate::commands::music::audio_node::track::{NodeTrack, PlaylistRef, Track};
use crate::commands::music::audio_node::{AudioNode, LoadResult, NodeError};

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("{0}")]
    Generic(String),

    #[error("This command can only be used in a server")]
    NotInGuild,

    #[error("You need to be in a voice channel to use this command")]
    NoVoice,

    #[error("You need to be in <#{0}> to use this command")]
    DiffVoiceChannel(ChannelId),

    #[error("I'm missing the {missing} permission in <#{channel}>")]
    MissingVoicePerms { channel: ChannelId, missing: String },

    #[error("There is no active player in this server")]
    NoPlayer,

    #[error("Nothing is playing right now")]
    NothingPlaying,

    #[error(
        "You have no favorites, integrations, saved queue or recent tracks to pick from. Use the command with a name or link instead"
    )]
    EmptyFavIntegration,

    #[error("No bot from the pool is available in this server right now")]
    PoolUnavailable,

    #[error("Only DJs can use this command")]
    NotDj,

    #[error("Slow down! Try again in {0} second(s)")]
    Cooldown(u64),

    #[error("Please wait for your previous request to finish")]
    MaxConcurrency,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    SavedQueue(#[from] SavedQueueError),

    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),
}

impl MusicError {
    /// Errors caused by the user's input or situation, as opposed to failures on our side.
    pub fn is_user_facing(&self) -> bool {
        match self {
            Self::JoinError(_)
            | Self::Node(_)
            | Self::Database(_)
            | Self::Discord(_) => false,
            Self::SavedQueue(e) => e.is_user_facing(),
            _ => true,
        }
    }
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Tracks resolved from a node load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTracks {
    pub tracks: Vec<Track>,
    pub playlist: Option<PlaylistRef>,
    /// The tracks are search results rather than an exact match.
    pub search: bool,
}

/// Where an enqueue landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// 1-based queue position of the first added track.
    pub position: usize,
    /// The first added track started playing right away.
    pub playing_now: bool,
}

/// Converts a node load result into queueable tracks.
pub fn tracks_from_load(
    result: LoadResult,
    requester: UserId,
    mode: Option<PlaylistMode>,
    source_url: &str,
) -> MusicResult<LoadedTracks> {
    let wrap = |tracks: Vec<NodeTrack>, playlist: Option<PlaylistRef>| -> Vec<Track> {
        tracks
            .into_iter()
            .map(|t| Track::new(t, requester, playlist.clone()))
            .collect()
    };

    match result {
        LoadResult::Track(track) => Ok(LoadedTracks {
            tracks: wrap(vec![track], None),
            playlist: None,
            search: false,
        }),
        LoadResult::Search(results) if results.is_empty() => {
            Err(MusicError::Generic("No results found for your search.".into()))
        }
        LoadResult::Search(results) => Ok(LoadedTracks {
            tracks: wrap(results, None),
            playlist: None,
            search: true,
        }),
        LoadResult::Playlist { name, tracks } => {
            if tracks.is_empty() {
                return Err(MusicError::Generic("That playlist has no tracks.".into()));
            }
            let playlist_ref = PlaylistRef {
                name,
                url: source_url.to_string(),
            };
            let mut tracks = wrap(tracks, Some(playlist_ref.clone()));
            if let Some(mode) = mode {
                mode.apply(&mut tracks);
            }
            Ok(LoadedTracks {
                tracks,
                playlist: Some(playlist_ref),
                search: false,
            })
        }
        LoadResult::Empty => Err(MusicError::Generic("No results found.".into())),
        LoadResult::Error(message) => Err(MusicError::Generic(format!(
            "Failed to load the track: {}",
            message
        ))),
    }
}

/// Manages voice connections, node playback and controller messages for pool bots
pub struct MusicManager;

impl MusicManager {
    /// Checks that the bot can join a voice channel: permissions and user limit.
    pub fn check_can_join(bot: &PoolBot, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        let permissions = bot
            .channel_permissions(guild_id, channel_id, bot.user_id)
            .unwrap_or_else(Permissions::empty);
        check_voice_permissions(channel_id, permissions)?;

        if let Some(info) = bot.voice_channel_info(guild_id, channel_id) {
            check_channel_limit(channel_id, info.user_limit, info.connected.len(), permissions)?;
        }
        Ok(())
    }

    /// Joins the voice channel on the gateway and hands the connection over to the node.
    /// The gateway connection is dropped again when the node refuses it.
    pub async fn join_voice(bot: &PoolBot, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        let (connection, _call) = bot
            .songbird
            .join_gateway(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))?;

        if let Err(e) = bot.node.connect(guild_id, connection).await {
            warn!("Audio node refused the voice connection in guild {}: {}", guild_id, e);
            Self::leave_voice(bot, guild_id).await;
            return Err(e.into());
        }

        info!("{} joined voice channel {} in guild {}", bot.name, channel_id, guild_id);
        Ok(())
    }

    /// Leave a voice channel
    pub async fn leave_voice(bot: &PoolBot, guild_id: GuildId) {
        if bot.songbird.get(guild_id).is_none() {
            debug!("{} has no call in guild {}", bot.name, guild_id);
            return;
        }
        if let Err(e) = bot.songbird.remove(guild_id).await {
            warn!("{} failed to leave voice in guild {}: {}", bot.name, guild_id, e);
        }
    }

    /// Returns the guild player of the context's bot, creating it (and joining
    /// `voice_channel`) when there is none yet.
    pub async fn ensure_player(
        music: &MusicContext,
        voice_channel: ChannelId,
        text_channel: ChannelId,
    ) -> MusicResult<PlayerHandle> {
        let bot = music.bot();
        // Held across join and insert so concurrent requests share one player.
        let _joining = bot.join_lock.lock().await;
        if let Some(player) = music.player() {
            return Ok(player);
        }

        Self::check_can_join(bot, music.guild_id, voice_channel)?;
        Self::join_voice(bot, music.guild_id, voice_channel).await?;

        let player = Arc::new(Mutex::new(Player::new(
            music.guild_id,
            bot.user_id,
            text_channel,
            voice_channel,
            music.author_id,
        )));
        bot.players.insert(music.guild_id, Arc::clone(&player));
        info!("Created player for guild {} on {}", music.guild_id, bot.name);
        Ok(player)
    }

    /// Refuses a request that would overflow the queue, before any voice channel is joined.
    pub async fn check_room(music: &MusicContext, adding: usize, max_entries: usize) -> MusicResult<()> {
        let queued = match music.player() {
            Some(handle) => handle.lock().await.queue.len(),
            None => 0,
        };
        check_queue_capacity(queued, adding, max_entries)
    }

    /// Plays the head of the queue and only then advances to it, so a refused
    /// play leaves the queue as it was.
    pub async fn start_next(node: &dyn AudioNode, player: &mut Player) -> MusicResult<Option<Track>> {
        let Some(next) = player.queue.front() else {
            player.advance();
            debug!("Queue finished in guild {}", player.guild_id);
            return Ok(None);
        };

        node.play(player.guild_id, &next.node_track()).await?;
        let track = player.advance().cloned();
        if let Some(track) = &track {
            debug!("Playing '{}' in guild {}", track.title(), player.guild_id);
        }
        Ok(track)
    }

    /// Skips the current track; stops the node when nothing is left.
    pub async fn skip(node: &dyn AudioNode, player: &mut Player) -> MusicResult<Option<Track>> {
        if player.queue.is_empty() {
            node.stop(player.guild_id).await?;
            player.advance();
            return Ok(None);
        }
        Self::start_next(node, player).await
    }

    pub async fn set_paused(node: &dyn AudioNode, player: &mut Player, paused: bool) -> MusicResult<()> {
        node.set_paused(player.guild_id, paused).await?;
        player.paused = paused;
        player.update = true;
        Ok(())
    }

    /// Flips the nightcore filter and returns the new state.
    pub async fn toggle_nightcore(node: &dyn AudioNode, player: &mut Player) -> MusicResult<bool> {
        let enabled = !player.nightcore;
        node.set_nightcore(player.guild_id, enabled).await?;
        player.nightcore = enabled;
        Ok(enabled)
    }

    /// Queues tracks for a request and starts playback when the player is idle or
    /// the request forces it.
    pub async fn enqueue_request(
        node: &dyn AudioNode,
        player: &mut Player,
        tracks: Vec<Track>,
        request: &PlayRequest,
        max_entries: usize,
    ) -> MusicResult<EnqueueOutcome> {
        check_queue_capacity(player.queue.len(), tracks.len(), max_entries)?;

        let count = tracks.len();
        let playing_now = request.force_play || player.is_idle();
        let position = if request.force_play {
            player.enqueue(tracks, Some(0))
        } else {
            player.enqueue(tracks, request.position)
        };

        if playing_now {
            if let Err(e) = Self::start_next(node, player).await {
                let start = position - 1;
                player.queue.drain(start..start + count);
                return Err(e);
            }
        }

        Ok(EnqueueOutcome {
            position,
            playing_now,
        })
    }

    /// Stops everything: node player, voice connection and controller message.
    pub async fn destroy_player(bot: &PoolBot, guild_id: GuildId) {
        let handle = bot.players.remove(&guild_id).map(|(_, player)| player);

        if let Err(e) = bot.node.destroy_player(guild_id).await {
            warn!("Failed to destroy node player for guild {}: {}", guild_id, e);
        }
        Self::leave_voice(bot, guild_id).await;

        let Some(handle) = handle else {
            return;
        };
        let (controller, voice_channel, had_status) = {
            let player = handle.lock().await;
            (player.controller, player.voice_channel, player.stage_title_event)
        };

        if let Some((channel_id, message_id)) = controller {
            if let Err(e) = bot.http.delete_message(channel_id, message_id, None).await {
                warn!(
                    "Failed to delete player message {} in channel {}: {}",
                    message_id, channel_id, e
                );
            }
        }

        if had_status && Self::is_voice_channel(bot, guild_id, voice_channel) {
            if let Err(e) = set_voice_status(&bot.http, voice_channel, "").await {
                warn!("Failed to clear voice status of {}: {}", voice_channel, e);
            }
        }

        info!("Destroyed player for guild {} on {}", guild_id, bot.name);
    }

    fn is_voice_channel(bot: &PoolBot, guild_id: GuildId, channel_id: ChannelId) -> bool {
        bot.voice_channel_info(guild_id, channel_id)
            .is_none_or(|info| info.kind != ChannelType::Stage)
    }

    /// Edits the controller message in place, or sends a new one when that fails.
    pub async fn refresh_controller(bot: &PoolBot, handle: &PlayerHandle) -> MusicResult<()> {
        let (reply, text_channel, existing) = {
            let mut player = handle.lock().await;
            player.update = false;
            (
                embedded_messages::controller(&player),
                player.text_channel,
                player.controller,
            )
        };

        if let Some((channel_id, message_id)) = existing {
            debug!("Found existing controller message, attempting to update.");
            let edit = EditMessage::new()
                .embeds(reply.embeds.clone())
                .components(reply.components.clone().unwrap_or_default());
            match channel_id.edit_message(&bot.http, message_id, edit).await {
                Ok(_) => return Ok(()),
                Err(e) => debug!("Failed to update controller message ({}), sending new one.", e),
            }
        }

        let message = text_channel
            .send_message(
                &bot.http,
                CreateMessage::new()
                    .embeds(reply.embeds)
                    .components(reply.components.unwrap_or_default()),
            )
            .await?;

        handle.lock().await.controller = Some((text_channel, message.id));
        Ok(())
    }

    /// Sends a fresh controller, removing the previous one.
    pub async fn resend_controller(bot: &PoolBot, handle: &PlayerHandle, channel: ChannelId) -> MusicResult<()> {
        let previous = {
            let mut player = handle.lock().await;
            player.text_channel = channel;
            player.controller.take()
        };
        if let Some((channel_id, message_id)) = previous {
            if let Err(e) = bot.http.delete_message(channel_id, message_id, None).await {
                debug!("Old controller {} was already gone: {}", message_id, e);
            }
        }
        Self::refresh_controller(bot, handle).await
    }

    /// Applies the voice status template for the current track, when enabled.
    pub async fn apply_voice_status(bot: &PoolBot, handle: &PlayerHandle) -> MusicResult<()> {
        let (guild_id, channel_id, status) = {
            let player = handle.lock().await;
            let Some(status) = player.voice_status() else {
                return Ok(());
            };
            (player.guild_id, player.voice_channel, status)
        };
        Self::write_voice_status(bot, guild_id, channel_id, &status).await
    }

    /// Turns the automatic status off and empties the channel status it left behind.
    pub async fn disable_voice_status(bot: &PoolBot, handle: &PlayerHandle) -> MusicResult<()> {
        let (guild_id, channel_id) = {
            let mut player = handle.lock().await;
            player.stage_title_event = false;
            player.update = true;
            (player.guild_id, player.voice_channel)
        };
        Self::write_voice_status(bot, guild_id, channel_id, "").await
    }

    async fn write_voice_status(
        bot: &PoolBot,
        guild_id: GuildId,
        channel_id: ChannelId,
        status: &str,
    ) -> MusicResult<()> {
        if Self::is_voice_channel(bot, guild_id, channel_id) {
            set_voice_status(&bot.http, channel_id, status).await?;
        } else if !status.is_empty() {
            set_stage_topic(&bot.http, channel_id, status).await?;
        }
        Ok(())
    }

    /// DJ check against the player's voice channel as seen by the hosting bot.
    pub fn check_dj(
        bot: &PoolBot,
        player: &Player,
        member: UserId,
        member_permissions: Permissions,
    ) -> MusicResult<()> {
        let sole_listener = bot
            .voice_channel_info(player.guild_id, player.voice_channel)
            .is_some_and(|info| info.listeners == [member]);
        require_dj(
            player,
            member,
            member_permissions.contains(Permissions::MANAGE_CHANNELS),
            sole_listener,
        )
    }
}

/// Permissions of the command author, from the interaction when available.
pub async fn author_permissions(ctx: Context<'_>, music: &MusicContext) -> Permissions {
    if let Some(permissions) = ctx.author_member().await.and_then(|m| m.permissions) {
        return permissions;
    }
    music
        .bot()
        .member_permissions(music.guild_id, music.author_id)
        .unwrap_or_else(Permissions::empty)
}

/// Picks the bot that should serve a song request: one already in the author's
/// channel, else (optionally by hand) a free one.
pub async fn resolve_play_context(
    ctx: Context<'_>,
    server: Option<GuildId>,
    manual_choice: bool,
) -> MusicResult<MusicContext> {
    let guild_id = server.or(ctx.guild_id()).ok_or(MusicError::NotInGuild)?;
    let author_id = ctx.author().id;
    let bots = ctx.data().pool.bots().await;
    let author_voice = bots
        .iter()
        .find_map(|bot| bot.voice_channel_of(guild_id, author_id));
    let candidates = BotPool::candidates(&bots, guild_id);

    let index = match bot_in_channel(&candidates, author_voice) {
        Some(index) => Some(index),
        None if manual_choice => {
            let free = free_bots(&candidates);
            match free.as_slice() {
                [] => None,
                [only] => Some(*only),
                _ => selection::prompt_bot(ctx, &bots, &free).await?,
            }
        }
        None => choose_bot(&candidates, author_voice),
    };

    let binding = index
        .and_then(|index| bind(&bots, index))
        .ok_or(MusicError::PoolUnavailable)?;
    log_binding(&binding, guild_id);

    Ok(MusicContext {
        binding,
        guild_id,
        author_id,
        author_voice,
    })
}

/// Finds the bot hosting the player a command acts on.
pub async fn resolve_player_context(ctx: Context<'_>) -> MusicResult<MusicContext> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    let author_id = ctx.author().id;
    let bots = ctx.data().pool.bots().await;
    let author_voice = bots
        .iter()
        .find_map(|bot| bot.voice_channel_of(guild_id, author_id));
    let candidates = BotPool::candidates(&bots, guild_id);

    let binding = choose_player_bot(&candidates, author_voice)
        .and_then(|index| bind(&bots, index))
        .ok_or(MusicError::NoPlayer)?;

    Ok(MusicContext {
        binding,
        guild_id,
        author_id,
        author_voice,
    })
}

fn log_binding(binding: &BotBinding, guild_id: GuildId) {
    match binding {
        BotBinding::Primary(bot) => debug!("{} serves guild {}", bot.name, guild_id),
        BotBinding::Delegated { primary, delegated } => debug!(
            "{} delegates guild {} to {}",
            primary.name, guild_id, delegated.name
        ),
    }
}

/// Logs and swallows errors of background controller refreshes.
pub async fn refresh_controller_logged(bot: &PoolBot, handle: &PlayerHandle) {
    if let Err(e) = MusicManager::refresh_controller(bot, handle).await {
        error!("Error updating controller for {}: {}", bot.name, e);
    }
}
