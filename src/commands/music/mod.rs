pub mod add_dj;
pub mod command_log;
pub mod connect;
pub mod controller;
pub mod nightcore;
pub mod now_playing;
pub mod play;
pub mod save_queue;
pub mod set_voice_status;
pub mod stop;

pub mod audio_node;
pub mod utils;

use crate::{CommandResult, Context, Data, Error};
use utils::music_manager::{
    MusicError, MusicManager, MusicResult, author_permissions, resolve_player_context,
};
use utils::pool::{MusicContext, PlayerHandle};

/// Every music command. Prefix-only variants come before the slash commands they
/// share a name with, so prefix lookups find them first.
pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        play::play_legacy(),
        play::addposition(),
        play::search_legacy(),
        play::play(),
        play::search(),
        connect::connect(),
        nightcore::nightcore(),
        now_playing::now_playing(),
        controller::controller(),
        add_dj::add_dj(),
        add_dj::remove_dj(),
        command_log::command_log(),
        stop::stop(),
        save_queue::save_queue(),
        set_voice_status::set_voice_status(),
    ]
}

/// Resolves the player a command acts on, checking the author is a DJ of it.
async fn dj_player(ctx: Context<'_>) -> MusicResult<(MusicContext, PlayerHandle)> {
    let music = resolve_player_context(ctx).await?;
    let handle = music.player().ok_or(MusicError::NoPlayer)?;
    let permissions = author_permissions(ctx, &music).await;
    {
        let player = handle.lock().await;
        MusicManager::check_dj(music.bot(), &player, music.author_id, permissions)?;
    }
    Ok((music, handle))
}

/// Resolves the player a command acts on.
async fn current_player(ctx: Context<'_>) -> MusicResult<(MusicContext, PlayerHandle)> {
    let music = resolve_player_context(ctx).await?;
    let handle = music.player().ok_or(MusicError::NoPlayer)?;
    Ok((music, handle))
}
