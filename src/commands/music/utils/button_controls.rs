use serenity::all::{ButtonStyle, CreateActionRow, CreateButton, ReactionType};

pub const PLAY_PAUSE: &str = "music_play_pause";
pub const SKIP: &str = "music_skip";
pub const STOP: &str = "music_stop";
pub const QUEUE: &str = "music_queue";

/// Creates the controller buttons for the current player state
pub fn create_controller_buttons(paused: bool, has_queue: bool) -> Vec<CreateActionRow> {
    let play_pause = CreateButton::new(PLAY_PAUSE)
        .emoji(ReactionType::Unicode(
            if paused { "▶️" } else { "⏸️" }.to_string(),
        ))
        .style(ButtonStyle::Primary)
        .label(if paused { "Resume" } else { "Pause" });

    let skip = CreateButton::new(SKIP)
        .emoji(ReactionType::Unicode("⏭️".to_string()))
        .style(ButtonStyle::Secondary)
        .label("Skip");

    let stop = CreateButton::new(STOP)
        .emoji(ReactionType::Unicode("⏹️".to_string()))
        .style(ButtonStyle::Danger)
        .label("Stop");

    let queue = CreateButton::new(QUEUE)
        .emoji(ReactionType::Unicode("📋".to_string()))
        .style(ButtonStyle::Secondary)
        .label("Queue")
        .disabled(!has_queue);

    vec![CreateActionRow::Buttons(vec![play_pause, skip, stop, queue])]
}

/// The idle controller only offers to stop the player
pub fn create_idle_buttons() -> Vec<CreateActionRow> {
    let stop = CreateButton::new(STOP)
        .emoji(ReactionType::Unicode("⏹️".to_string()))
        .style(ButtonStyle::Danger)
        .label("Stop");

    vec![CreateActionRow::Buttons(vec![stop])]
}
