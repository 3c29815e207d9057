//! Voice channel status / stage topic templates and the Discord calls that apply them.

use poise::serenity_prelude as serenity;
use serde_json::json;
use serenity::all::{ChannelId, EditStageInstance, Http};
use tracing::debug;

use super::format_duration;
use crate::commands::music::audio_node::track::Track;

/// Placeholders accepted in a status template, with their help text.
pub const PLACEHOLDERS: [(&str, &str); 10] = [
    ("{track.title}", "Title of the current track"),
    ("{track.author}", "Artist / uploader of the current track"),
    ("{track.duration}", "Length of the current track"),
    ("{track.source}", "Source the track was loaded from"),
    ("{track.url}", "Link to the current track"),
    ("{track.emoji}", "Emoji of the track source"),
    ("{requester.id}", "Id of the member who requested the track"),
    ("{requester.mention}", "Mention of the member who requested the track"),
    ("{playlist.name}", "Name of the playlist the track came from"),
    ("{playlist.url}", "Link to the playlist the track came from"),
];

/// Voice channel statuses are capped by Discord at this many characters.
const STATUS_MAX_CHARS: usize = 500;
/// Stage topics are capped at this many characters.
const TOPIC_MAX_CHARS: usize = 120;

/// What `set_voice_status` changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum VoiceStatusMode {
    #[name = "This player"]
    Player,
    #[name = "Server default"]
    Server,
    #[name = "Off"]
    Off,
}

impl VoiceStatusMode {
    /// The guild's stored default template once this mode ran with `template`.
    pub fn stored_template(self, stored: Option<String>, template: Option<&str>) -> Option<String> {
        match self {
            Self::Player => stored,
            Self::Server => template.map(str::to_string).or(stored),
            Self::Off => None,
        }
    }
}

pub fn has_placeholder(template: &str) -> bool {
    PLACEHOLDERS
        .iter()
        .any(|(placeholder, _)| template.contains(placeholder))
}

pub fn render_template(template: &str, track: &Track) -> String {
    let duration = track
        .duration()
        .map(format_duration)
        .unwrap_or_else(|| "🔴 Live".to_string());
    let (playlist_name, playlist_url) = track
        .playlist
        .as_ref()
        .map(|p| (p.name.as_str(), p.url.as_str()))
        .unwrap_or_default();

    template
        .replace("{track.title}", track.title())
        .replace("{track.author}", track.author())
        .replace("{track.duration}", &duration)
        .replace("{track.source}", &track.info.source_name)
        .replace("{track.url}", track.url())
        .replace("{track.emoji}", track.source_emoji())
        .replace("{requester.id}", &track.requester.to_string())
        .replace("{requester.mention}", &format!("<@{}>", track.requester))
        .replace("{playlist.name}", playlist_name)
        .replace("{playlist.url}", playlist_url)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Sets a voice channel status with the bot's own client. An empty status clears it.
pub async fn set_voice_status(http: &Http, channel_id: ChannelId, status: &str) -> serenity::Result<()> {
    debug!("Setting voice status of {} to {:?}", channel_id, status);
    let body = json!({ "status": truncate_chars(status, STATUS_MAX_CHARS) });
    http.edit_voice_status(channel_id, &body, None).await
}

pub async fn set_stage_topic(http: &Http, channel_id: ChannelId, topic: &str) -> serenity::Result<()> {
    debug!("Setting stage topic of {} to {:?}", channel_id, topic);
    channel_id
        .edit_stage_instance(
            http,
            EditStageInstance::new().topic(truncate_chars(topic, TOPIC_MAX_CHARS)),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::music::audio_node::track::{NodeTrack, PlaylistRef, TrackInfo};
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use poise::serenity_prelude::{HttpBuilder, UserId};
    use test_case::test_case;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn track() -> Track {
        Track::new(
            NodeTrack {
                encoded: "enc".into(),
                info: TrackInfo {
                    title: "Blue".into(),
                    author: "Eiffel 65".into(),
                    length: 221_000,
                    uri: Some("https://soundcloud.com/eiffel65/blue".into()),
                    source_name: "soundcloud".into(),
                    ..Default::default()
                },
            },
            UserId::new(42),
            Some(PlaylistRef {
                name: "Eurodance".into(),
                url: "https://soundcloud.com/sets/eurodance".into(),
            }),
        )
    }

    #[test_case("{track.title} - {track.author}", "Blue - Eiffel 65" ; "title and author")]
    #[test_case("{track.emoji} {track.duration}", "☁️ 3:41" ; "emoji and duration")]
    #[test_case("by {requester.mention} ({requester.id})", "by <@42> (42)" ; "requester")]
    #[test_case("{playlist.name}: {playlist.url}", "Eurodance: https://soundcloud.com/sets/eurodance" ; "playlist")]
    #[test_case("{track.source} {track.url}", "soundcloud https://soundcloud.com/eiffel65/blue" ; "source and url")]
    fn test_render_template(template: &str, expected: &str) {
        assert_eq!(render_template(template, &track()), expected);
    }

    #[test]
    fn test_render_without_playlist_leaves_blank() {
        let mut track = track();
        track.playlist = None;
        assert_eq!(render_template("[{playlist.name}]", &track), "[]");
    }

    #[test_case(VoiceStatusMode::Player, Some("{track.title}"), Some("old") ; "player keeps the default")]
    #[test_case(VoiceStatusMode::Server, Some("{track.title}"), Some("{track.title}") ; "server stores the template")]
    #[test_case(VoiceStatusMode::Server, None, Some("old") ; "server without template keeps the default")]
    #[test_case(VoiceStatusMode::Off, Some("{track.title}"), None ; "off clears the default")]
    fn test_stored_template(mode: VoiceStatusMode, template: Option<&str>, expected: Option<&str>) {
        assert_eq!(
            mode.stored_template(Some("old".to_string()), template).as_deref(),
            expected
        );
    }

    #[test]
    fn test_has_placeholder() {
        assert!(has_placeholder("Now: {track.title}"));
        assert!(!has_placeholder("Now: {track.name}"));
        assert!(!has_placeholder("plain text"));
    }

    fn http_for(server: &MockServer) -> Http {
        HttpBuilder::new("secret")
            .proxy(server.uri())
            .ratelimiter_disabled(true)
            .build()
    }

    #[tokio::test]
    async fn test_set_voice_status_request() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v10/channels/555/voice-status"))
            .and(header("Authorization", "Bot secret"))
            .and(body_json(json!({ "status": "Blue - Eiffel 65" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        set_voice_status(&http_for(&server), ChannelId::new(555), "Blue - Eiffel 65")
            .await
            .unwrap();

        server.verify().await;
    }

    #[tokio::test]
    async fn test_set_stage_topic_truncates_and_reports_errors() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/v10/stage-instances/777"))
            .and(body_json(json!({ "topic": "x".repeat(TOPIC_MAX_CHARS) })))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": 50013,
                "message": "Missing Permissions"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = set_stage_topic(&http_for(&server), ChannelId::new(777), &"x".repeat(300)).await;

        assert_matches!(result, Err(serenity::Error::Http(_)));
        server.verify().await;
    }
}
