use serenity::all::{ComponentInteraction, GuildId, UserId, VoiceState};
use serenity::async_trait;
use serenity::model::application::Interaction;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

use crate::commands::music::utils::component_handlers;
use crate::commands::music::utils::limits::Limits;
use crate::commands::music::utils::music_manager::MusicManager;
use crate::commands::music::utils::pool::BotPool;

/// Event handler installed on every bot client of the pool.
pub struct Handler {
    pub pool: Arc<BotPool>,
    pub limits: Arc<Limits>,
}

#[async_trait]
impl serenity::prelude::EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected to {} guilds", ready.user.name, ready.guilds.len());
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            if component.data.custom_id.starts_with("music_") {
                self.music_component_interaction(&ctx, &component).await;
            }
        }
    }

    /// Tears the player down when its bot is removed from voice.
    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let bot_id = ctx.cache.current_user().id;
        if new.user_id != bot_id || new.channel_id.is_some() {
            return;
        }
        let Some(guild_id) = new.guild_id else {
            return;
        };
        self.cleanup_disconnected(bot_id, guild_id).await;
    }
}

impl Handler {
    /// Handle component interactions for components with identities starting with "music_"
    async fn music_component_interaction(&self, ctx: &Context, component: &ComponentInteraction) {
        component_handlers::handle_interaction(ctx, component, &self.pool, &self.limits).await;
    }

    async fn cleanup_disconnected(&self, bot_id: UserId, guild_id: GuildId) {
        let Some(bot) = self.pool.get(bot_id).await else {
            return;
        };
        let Some(handle) = bot.player(guild_id) else {
            return;
        };
        if handle.lock().await.keep_connected {
            debug!("{} left voice in guild {} but keeps its player", bot.name, guild_id);
            return;
        }
        info!("{} was disconnected from voice in guild {}", bot.name, guild_id);
        MusicManager::destroy_player(&bot, guild_id).await;
    }
}
