use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{
    ComponentInteractionCollector, ComponentInteractionDataKind, CreateActionRow, CreateEmbed,
    CreateInteractionResponse, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::embedded_messages::COLOR_OK;
use super::format_duration;
use super::music_manager::{MusicError, MusicResult};
use super::pool::PoolBot;
use crate::Context;
use crate::commands::music::audio_node::track::Track;

/// Discord caps select menus at 25 options.
pub const MAX_OPTIONS: usize = 25;
const SELECT_TIMEOUT: Duration = Duration::from_secs(45);
const LABEL_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    pub description: Option<String>,
}

impl SelectOption {
    pub fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: truncate(label, LABEL_LIMIT),
            value: value.into(),
            description: None,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(truncate(description, LABEL_LIMIT));
        self
    }
}

/// Cuts a string to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// One option per search result, the value being the result index.
pub fn search_options(tracks: &[Track]) -> Vec<SelectOption> {
    tracks
        .iter()
        .take(MAX_OPTIONS)
        .enumerate()
        .map(|(index, track)| {
            let length = track
                .duration()
                .map(format_duration)
                .unwrap_or_else(|| "Live".to_string());
            SelectOption::new(track.title(), index.to_string())
                .description(&format!("{} • {}", track.author(), length))
        })
        .collect()
}

/// Sends an ephemeral select menu and waits for the author's choice.
pub async fn prompt_select(
    ctx: Context<'_>,
    title: &str,
    options: Vec<SelectOption>,
) -> MusicResult<String> {
    let custom_id = format!("select_{}", ctx.id());
    let menu_options = options
        .into_iter()
        .take(MAX_OPTIONS)
        .map(|option| {
            let mut menu_option = CreateSelectMenuOption::new(option.label, option.value);
            if let Some(description) = option.description {
                menu_option = menu_option.description(description);
            }
            menu_option
        })
        .collect();

    let menu = CreateSelectMenu::new(
        custom_id.clone(),
        CreateSelectMenuKind::String {
            options: menu_options,
        },
    )
    .placeholder("Choose an option");

    let handle = ctx
        .send(
            CreateReply::default()
                .embed(CreateEmbed::new().title(title).color(COLOR_OK))
                .components(vec![CreateActionRow::SelectMenu(menu)])
                .ephemeral(true),
        )
        .await?;

    let interaction = ComponentInteractionCollector::new(ctx.serenity_context())
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(SELECT_TIMEOUT)
        .filter(move |interaction| interaction.data.custom_id == custom_id)
        .await;

    if let Err(e) = handle.delete(ctx).await {
        debug!("Could not delete selection prompt: {}", e);
    }

    let Some(interaction) = interaction else {
        return Err(MusicError::Generic("No option was selected in time.".into()));
    };

    if let Err(e) = interaction
        .create_response(ctx.http(), CreateInteractionResponse::Acknowledge)
        .await
    {
        warn!("Failed to acknowledge selection: {}", e);
    }

    match &interaction.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => values
            .first()
            .cloned()
            .ok_or_else(|| MusicError::Generic("Nothing was selected.".into())),
        _ => Err(MusicError::Generic("Unexpected selection.".into())),
    }
}

/// Lets the author pick one of the free pool bots.
pub async fn prompt_bot(
    ctx: Context<'_>,
    bots: &[Arc<PoolBot>],
    free: &[usize],
) -> MusicResult<Option<usize>> {
    let options = free
        .iter()
        .filter_map(|index| {
            bots.get(*index)
                .map(|bot| SelectOption::new(&bot.name, index.to_string()))
        })
        .collect();

    let choice = prompt_select(ctx, "🤖 Choose the bot that should play", options).await?;
    Ok(choice.parse().ok())
}

/// Lets the author pick one search result.
pub async fn prompt_track(ctx: Context<'_>, tracks: &[Track]) -> MusicResult<usize> {
    let choice = prompt_select(ctx, "🔎 Choose a track", search_options(tracks)).await?;
    choice
        .parse()
        .map_err(|_| MusicError::Generic("Unexpected selection.".into()))
}
