//! Options of a song request, the legacy prefix flags that carry them, and the
//! translation of a query into a node identifier.

use rand::seq::SliceRandom;
use regex::Regex;
use serenity::all::GuildId;
use std::sync::LazyLock;

use super::checks::parse_position;
use super::music_manager::{MusicError, MusicResult};

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("valid url regex"));
static SOUNDCLOUD_PROFILE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://soundcloud\.com/[a-zA-Z0-9_-]+/?$").expect("valid soundcloud regex")
});
static SEARCH_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}search:").expect("valid search prefix regex"));

/// Audio attachment types accepted as a query.
pub const AUDIO_FORMATS: [&str; 4] = ["audio/mpeg", "audio/ogg", "audio/mp4", "audio/aac"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum PlaylistMode {
    #[name = "Shuffle playlist"]
    Shuffle,
    #[name = "Reverse playlist"]
    Reversed,
}

impl PlaylistMode {
    pub fn apply<T>(self, tracks: &mut [T]) {
        match self {
            Self::Shuffle => tracks.shuffle(&mut rand::rng()),
            Self::Reversed => tracks.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum SearchProvider {
    #[name = "YouTube"]
    Youtube,
    #[name = "SoundCloud"]
    Soundcloud,
    #[name = "Spotify"]
    Spotify,
    #[name = "Tidal"]
    Tidal,
    #[name = "Bandcamp"]
    Bandcamp,
    #[name = "Apple Music"]
    AppleMusic,
    #[name = "Deezer"]
    Deezer,
    #[name = "JioSaavn"]
    JioSaavn,
}

impl Default for SearchProvider {
    fn default() -> Self {
        Self::Youtube
    }
}

impl SearchProvider {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Youtube => "ytsearch",
            Self::Soundcloud => "scsearch",
            Self::Spotify => "spsearch",
            Self::Tidal => "tdsearch",
            Self::Bandcamp => "bcsearch",
            Self::AppleMusic => "amsearch",
            Self::Deezer => "dzsearch",
            Self::JioSaavn => "jssearch",
        }
    }

    /// Parses the `-source` flag value.
    pub fn from_flag(value: &str) -> Option<Self> {
        Some(match value.to_lowercase().as_str() {
            "youtube" | "yt" => Self::Youtube,
            "soundcloud" | "sc" => Self::Soundcloud,
            "spotify" | "sp" => Self::Spotify,
            "tidal" => Self::Tidal,
            "bandcamp" => Self::Bandcamp,
            "applemusic" => Self::AppleMusic,
            "deezer" => Self::Deezer,
            "jiosaavn" => Self::JioSaavn,
            _ => return None,
        })
    }
}

/// A song request as the play pipeline sees it, whichever surface it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayRequest {
    pub query: String,
    /// 0-based queue index to insert at.
    pub position: Option<usize>,
    pub force_play: bool,
    pub mode: Option<PlaylistMode>,
    pub manual_selection: bool,
    pub source: SearchProvider,
    pub server: Option<GuildId>,
    pub manual_bot_choice: bool,
}

fn flag_value<'a>(flag: &str, words: &mut impl Iterator<Item = &'a str>) -> MusicResult<&'a str> {
    words
        .next()
        .ok_or_else(|| MusicError::Generic(format!("The `{}` flag needs a value.", flag)))
}

/// Parses prefix command arguments. Flags may appear anywhere; the remaining words
/// form the query.
pub fn parse_legacy_args(args: &str) -> MusicResult<PlayRequest> {
    let mut request = PlayRequest::default();
    let mut query = Vec::new();
    let mut words = args.split_whitespace();

    while let Some(word) = words.next() {
        match word {
            "-pos" | "--position" => {
                let value = flag_value(word, &mut words)?;
                let position = value.parse::<i64>().map_err(|_| {
                    MusicError::Generic(format!("`{}` is not a valid position.", value))
                })?;
                request.position = Some(parse_position(position)?);
            }
            "-force" => request.force_play = true,
            "-shuffle" => request.mode = Some(PlaylistMode::Shuffle),
            "-reverse" => request.mode = Some(PlaylistMode::Reversed),
            "-select" => request.manual_selection = true,
            "-bot" => request.manual_bot_choice = true,
            "-server" => request.server = Some(parse_server_id(flag_value(word, &mut words)?)?),
            "-source" => {
                let value = flag_value(word, &mut words)?;
                request.source = SearchProvider::from_flag(value)
                    .ok_or_else(|| MusicError::Generic(format!("Unknown source `{}`.", value)))?;
            }
            _ => query.push(word),
        }
    }

    request.query = query.join(" ");
    Ok(request)
}

/// Prefix `addposition <position> <args>`: the position comes first and must be 1 or higher.
/// A second position given as a flag is refused instead of silently ignored.
pub fn addposition_request(position: i64, args: &str) -> MusicResult<PlayRequest> {
    let index = parse_position(position)?;
    if args
        .split_whitespace()
        .any(|word| matches!(word, "-pos" | "--position"))
    {
        return Err(MusicError::Generic(
            "The position is already the first argument, drop the `-pos` flag.".into(),
        ));
    }
    let mut request = parse_legacy_args(args)?;
    request.position = Some(index);
    Ok(request)
}

pub fn parse_server_id(value: &str) -> MusicResult<GuildId> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(GuildId::new)
        .ok_or_else(|| MusicError::Generic(format!("`{}` is not a server id.", value)))
}

pub fn is_audio(content_type: &str) -> bool {
    AUDIO_FORMATS
        .iter()
        .any(|format| content_type.starts_with(format))
}

/// An empty query falls back to the attached file, when that file is audio.
pub fn query_or_attachment(
    query: &str,
    attachment_url: Option<&str>,
    content_type: Option<&str>,
) -> String {
    if !query.trim().is_empty() {
        return query.to_string();
    }
    match (attachment_url, content_type) {
        (Some(url), Some(kind)) if is_audio(kind) => url.to_string(),
        _ => query.to_string(),
    }
}

pub fn is_url(query: &str) -> bool {
    URL_REGEX.is_match(query)
}

/// Turns a query into what the node's loadtracks endpoint expects: URLs pass through
/// (SoundCloud profiles point at their popular tracks), anything else becomes a search.
pub fn build_identifier(query: &str, provider: SearchProvider) -> String {
    let query = query.trim();
    let query = query
        .strip_prefix('<')
        .and_then(|q| q.strip_suffix('>'))
        .unwrap_or(query);

    if is_url(query) {
        if SOUNDCLOUD_PROFILE_REGEX.is_match(query) {
            return format!("{}/popular-tracks", query.trim_end_matches('/'));
        }
        return query.to_string();
    }

    if SEARCH_PREFIX_REGEX.is_match(query) {
        return query.to_string();
    }

    format!("{}:{}", provider.prefix(), query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("never gonna give you up", SearchProvider::Youtube, "ytsearch:never gonna give you up" ; "plain search")]
    #[test_case("lofi", SearchProvider::Soundcloud, "scsearch:lofi" ; "provider prefix")]
    #[test_case("<https://youtu.be/dQw4w9WgXcQ>", SearchProvider::Youtube, "https://youtu.be/dQw4w9WgXcQ" ; "angle brackets stripped")]
    #[test_case("https://soundcloud.com/artist", SearchProvider::Youtube, "https://soundcloud.com/artist/popular-tracks" ; "soundcloud profile")]
    #[test_case("https://soundcloud.com/artist/song", SearchProvider::Youtube, "https://soundcloud.com/artist/song" ; "soundcloud track untouched")]
    #[test_case("dzsearch:daft punk", SearchProvider::Youtube, "dzsearch:daft punk" ; "explicit prefix kept")]
    fn test_build_identifier(query: &str, provider: SearchProvider, expected: &str) {
        assert_eq!(build_identifier(query, provider), expected);
    }

    #[test]
    fn test_parse_flags_anywhere() {
        let request = parse_legacy_args("-shuffle lofi -pos 3 hip hop -force -source soundcloud").unwrap();
        assert_eq!(
            request,
            PlayRequest {
                query: "lofi hip hop".into(),
                position: Some(2),
                force_play: true,
                mode: Some(PlaylistMode::Shuffle),
                source: SearchProvider::Soundcloud,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_parse_server_and_bot_flags() {
        let request = parse_legacy_args("--position 1 -server 1234 -bot -select -reverse song").unwrap();
        assert_eq!(request.position, Some(0));
        assert_eq!(request.server, Some(GuildId::new(1234)));
        assert!(request.manual_bot_choice);
        assert!(request.manual_selection);
        assert_eq!(request.mode, Some(PlaylistMode::Reversed));
        assert_eq!(request.query, "song");
    }

    #[test_case("-pos 0 song" ; "zero position")]
    #[test_case("-pos -2 song" ; "negative position")]
    #[test_case("-pos abc song" ; "non numeric position")]
    #[test_case("song -pos" ; "missing value")]
    #[test_case("-source napster song" ; "unknown source")]
    #[test_case("-server 0 song" ; "zero server id")]
    fn test_parse_rejects(args: &str) {
        assert_matches!(parse_legacy_args(args), Err(MusicError::Generic(_)));
    }

    #[test_case(0 ; "zero")]
    #[test_case(-5 ; "negative")]
    fn test_addposition_rejects_positions_below_one(position: i64) {
        assert_matches!(addposition_request(position, "song"), Err(MusicError::Generic(_)));
    }

    #[test]
    fn test_addposition_keeps_other_flags() {
        let request = addposition_request(4, "-force song -shuffle").unwrap();
        assert_eq!(request.position, Some(3));
        assert!(request.force_play);
        assert_eq!(request.mode, Some(PlaylistMode::Shuffle));
        assert_eq!(request.query, "song");
    }

    #[test_case("song -pos 0" ; "invalid flag position")]
    #[test_case("-force song -pos 9" ; "valid flag position")]
    #[test_case("--position 2 song" ; "long flag")]
    fn test_addposition_refuses_position_flag(args: &str) {
        assert_matches!(
            addposition_request(3, args),
            Err(MusicError::Generic(message)) if message.contains("-pos")
        );
    }

    const FILE_URL: &str = "https://cdn.discordapp.com/attachments/1/2/song.mp3";

    #[test_case("", Some("audio/mpeg"), FILE_URL ; "audio attachment")]
    #[test_case("  ", Some("audio/ogg; codecs=opus"), FILE_URL ; "blank query with parameters")]
    #[test_case("", Some("image/png"), "" ; "not audio")]
    #[test_case("", None, "" ; "unknown type")]
    #[test_case("lofi", Some("audio/mpeg"), "lofi" ; "query wins")]
    fn test_query_or_attachment(query: &str, content_type: Option<&str>, expected: &str) {
        assert_eq!(query_or_attachment(query, Some(FILE_URL), content_type), expected);
    }

    #[test]
    fn test_no_attachment_keeps_query() {
        assert_eq!(query_or_attachment("", None, None), "");
    }

    #[test]
    fn test_playlist_modes() {
        let mut tracks = vec![1, 2, 3, 4, 5];
        PlaylistMode::Reversed.apply(&mut tracks);
        assert_eq!(tracks, vec![5, 4, 3, 2, 1]);

        PlaylistMode::Shuffle.apply(&mut tracks);
        let mut sorted = tracks.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
    }
}
