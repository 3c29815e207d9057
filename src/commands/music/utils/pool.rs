//! The pool of bot identities able to host a player. The first bot is the primary
//! one (it runs the command framework); the others only join voice and play.

use dashmap::DashMap;
use serenity::all::{Cache, ChannelId, ChannelType, GuildId, Http, Permissions, UserId};
use songbird::Songbird;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::player::Player;
use crate::commands::music::audio_node::AudioNode;

pub type PlayerHandle = Arc<Mutex<Player>>;

/// Snapshot of a voice channel taken from a bot's cache.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceChannelInfo {
    pub id: ChannelId,
    pub kind: ChannelType,
    pub user_limit: Option<u32>,
    /// Users connected, bots included.
    pub connected: Vec<UserId>,
    /// Connected users that are not bots.
    pub listeners: Vec<UserId>,
}

/// One bot identity and everything it owns.
pub struct PoolBot {
    pub user_id: UserId,
    pub name: String,
    pub http: Arc<Http>,
    pub cache: Arc<Cache>,
    pub songbird: Arc<Songbird>,
    pub node: Arc<dyn AudioNode>,
    pub players: DashMap<GuildId, PlayerHandle>,
    /// Serialises player creation so one guild never gets two players.
    pub join_lock: Mutex<()>,
}

impl PoolBot {
    pub fn player(&self, guild_id: GuildId) -> Option<PlayerHandle> {
        self.players.get(&guild_id).map(|p| Arc::clone(p.value()))
    }

    pub fn in_guild(&self, guild_id: GuildId) -> bool {
        self.cache.guild(guild_id).is_some()
    }

    /// The voice channel a user is connected to, as seen by this bot.
    pub fn voice_channel_of(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        let guild = self.cache.guild(guild_id)?;
        guild.voice_states.get(&user_id)?.channel_id
    }

    pub fn own_voice_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.voice_channel_of(guild_id, self.user_id)
    }

    pub fn voice_channel_info(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<VoiceChannelInfo> {
        let guild = self.cache.guild(guild_id)?;
        let channel = guild.channels.get(&channel_id)?;

        let connected: Vec<UserId> = guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(channel_id))
            .map(|state| state.user_id)
            .collect();
        let listeners = connected
            .iter()
            .copied()
            .filter(|user_id| {
                guild
                    .members
                    .get(user_id)
                    .is_some_and(|member| !member.user.bot)
            })
            .collect();

        Some(VoiceChannelInfo {
            id: channel_id,
            kind: channel.kind,
            user_limit: channel.user_limit,
            connected,
            listeners,
        })
    }

    /// Guild-wide permissions of a member.
    pub fn member_permissions(&self, guild_id: GuildId, user_id: UserId) -> Option<Permissions> {
        let guild = self.cache.guild(guild_id)?;
        let member = guild.members.get(&user_id)?;
        #[allow(deprecated)]
        let permissions = guild.member_permissions(member);
        Some(permissions)
    }

    /// Permissions of a member in one channel, overwrites included.
    pub fn channel_permissions(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> Option<Permissions> {
        let guild = self.cache.guild(guild_id)?;
        let channel = guild.channels.get(&channel_id)?;
        let member = guild.members.get(&user_id)?;
        Some(guild.user_permissions_in(channel, member))
    }
}

/// Which bot serves a command: the one that received it, or another pool member
/// acting on its behalf.
#[derive(Clone)]
pub enum BotBinding {
    Primary(Arc<PoolBot>),
    Delegated {
        primary: Arc<PoolBot>,
        delegated: Arc<PoolBot>,
    },
}

impl BotBinding {
    /// The bot hosting the player.
    pub fn bot(&self) -> &Arc<PoolBot> {
        match self {
            Self::Primary(bot) => bot,
            Self::Delegated { delegated, .. } => delegated,
        }
    }
}

/// Everything a music command resolved before acting.
#[derive(Clone)]
pub struct MusicContext {
    pub binding: BotBinding,
    pub guild_id: GuildId,
    pub author_id: UserId,
    pub author_voice: Option<ChannelId>,
}

impl MusicContext {
    pub fn bot(&self) -> &Arc<PoolBot> {
        self.binding.bot()
    }

    pub fn player(&self) -> Option<PlayerHandle> {
        self.bot().player(self.guild_id)
    }
}

/// What bot selection needs to know about one pool member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub in_guild: bool,
    pub voice_channel: Option<ChannelId>,
    pub has_player: bool,
}

impl Candidate {
    pub fn is_free(&self) -> bool {
        self.in_guild && !self.has_player && self.voice_channel.is_none()
    }
}

/// The bot already connected to the author's channel, if any.
pub fn bot_in_channel(candidates: &[Candidate], author_voice: Option<ChannelId>) -> Option<usize> {
    let channel = author_voice?;
    candidates
        .iter()
        .position(|c| c.in_guild && c.voice_channel == Some(channel))
}

/// A bot already sitting in the author's channel wins, otherwise the first free one.
pub fn choose_bot(candidates: &[Candidate], author_voice: Option<ChannelId>) -> Option<usize> {
    bot_in_channel(candidates, author_voice).or_else(|| candidates.iter().position(Candidate::is_free))
}

/// Indices of the bots a member may pick from manually.
pub fn free_bots(candidates: &[Candidate]) -> Vec<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_free())
        .map(|(index, _)| index)
        .collect()
}

/// The bot whose player a non-play command acts on: the one in the author's
/// channel when there is one, else any bot with a player in the guild.
pub fn choose_player_bot(candidates: &[Candidate], author_voice: Option<ChannelId>) -> Option<usize> {
    candidates
        .iter()
        .position(|c| c.has_player && author_voice.is_some() && c.voice_channel == author_voice)
        .or_else(|| candidates.iter().position(|c| c.has_player))
}

/// Every bot identity, primary first.
#[derive(Default)]
pub struct BotPool {
    bots: RwLock<Vec<Arc<PoolBot>>>,
}

impl BotPool {
    pub async fn register(&self, bot: Arc<PoolBot>) {
        self.bots.write().await.push(bot);
    }

    pub async fn bots(&self) -> Vec<Arc<PoolBot>> {
        self.bots.read().await.clone()
    }

    pub async fn get(&self, user_id: UserId) -> Option<Arc<PoolBot>> {
        self.bots
            .read()
            .await
            .iter()
            .find(|bot| bot.user_id == user_id)
            .cloned()
    }

    pub fn candidates(bots: &[Arc<PoolBot>], guild_id: GuildId) -> Vec<Candidate> {
        bots.iter()
            .map(|bot| Candidate {
                in_guild: bot.in_guild(guild_id),
                voice_channel: bot.own_voice_channel(guild_id),
                has_player: bot.players.contains_key(&guild_id),
            })
            .collect()
    }
}

/// Wraps a chosen bot index into a binding relative to the primary bot.
pub fn bind(bots: &[Arc<PoolBot>], index: usize) -> Option<BotBinding> {
    let primary = bots.first()?;
    let chosen = bots.get(index)?;
    Some(if index == 0 {
        BotBinding::Primary(Arc::clone(primary))
    } else {
        BotBinding::Delegated {
            primary: Arc::clone(primary),
            delegated: Arc::clone(chosen),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const AUTHOR_VC: ChannelId = ChannelId::new(100);
    const OTHER_VC: ChannelId = ChannelId::new(200);

    fn free() -> Candidate {
        Candidate {
            in_guild: true,
            voice_channel: None,
            has_player: false,
        }
    }

    fn busy(channel: ChannelId) -> Candidate {
        Candidate {
            in_guild: true,
            voice_channel: Some(channel),
            has_player: true,
        }
    }

    fn absent() -> Candidate {
        Candidate {
            in_guild: false,
            ..free()
        }
    }

    #[test]
    fn test_bot_in_author_channel_wins() {
        let candidates = [free(), busy(OTHER_VC), busy(AUTHOR_VC)];
        assert_eq!(choose_bot(&candidates, Some(AUTHOR_VC)), Some(2));
        assert_eq!(bot_in_channel(&candidates, Some(AUTHOR_VC)), Some(2));
        assert_eq!(bot_in_channel(&candidates, None), None);
    }

    #[test]
    fn test_first_free_member_bot() {
        let candidates = [busy(OTHER_VC), absent(), free(), free()];
        assert_eq!(choose_bot(&candidates, Some(AUTHOR_VC)), Some(2));
        assert_eq!(free_bots(&candidates), vec![2, 3]);
    }

    #[test]
    fn test_no_bot_available() {
        let candidates = [busy(OTHER_VC), absent()];
        assert_eq!(choose_bot(&candidates, Some(AUTHOR_VC)), None);
        assert!(free_bots(&candidates).is_empty());
    }

    #[test]
    fn test_player_bot_prefers_author_channel() {
        let candidates = [busy(OTHER_VC), free(), busy(AUTHOR_VC)];
        assert_eq!(choose_player_bot(&candidates, Some(AUTHOR_VC)), Some(2));
        assert_eq!(choose_player_bot(&candidates, None), Some(0));
        assert_eq!(choose_player_bot(&[free(), absent()], Some(AUTHOR_VC)), None);
    }
}
