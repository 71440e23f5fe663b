//! Guilds: persistent social structures with ranked membership.
//!
//! The [`GuildManager`] owns every live guild plus the member index and
//! the normalized name/tag indices, so the one-guild-per-character rule
//! and global name/tag uniqueness are enforced in a single place. All
//! checks and the matching mutation happen inside one `&mut self` call;
//! under the world task's single-writer discipline that makes
//! check-and-reserve atomic.

use std::{collections::HashMap, fmt, ops::RangeInclusive};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::{Display, From, Into};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use strum_macros::EnumString;
use thiserror::Error;
use tracing::warn;

use crate::characters::CharacterId;

#[derive(
    Debug,
    Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Type,
    Clone,
    Copy,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[sqlx(transparent)]
pub struct GuildId(pub u32);

/// Authority ladder within a guild. The ordering is significant: every
/// administrative action is gated on a minimum rank, and a member may
/// only act on members of strictly lower rank.
#[repr(u8)]
#[derive(
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Clone,
    Copy,
    IntoPrimitive,
    TryFromPrimitive,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum GuildRank {
    Recruit = 0,
    Member = 1,
    Officer = 2,
    Leader = 3,
}

impl GuildRank {
    pub const HIGHEST: GuildRank = GuildRank::Leader;

    /// One step up the ladder, or `None` at the top.
    pub fn promoted(self) -> Option<GuildRank> {
        GuildRank::try_from(u8::from(self) + 1).ok()
    }

    /// One step down the ladder, or `None` at the bottom.
    pub fn demoted(self) -> Option<GuildRank> {
        u8::from(self)
            .checked_sub(1)
            .and_then(|r| GuildRank::try_from(r).ok())
    }
}

impl fmt::Display for GuildRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GuildRank::Recruit => "Recruit",
            GuildRank::Member => "Member",
            GuildRank::Officer => "Officer",
            GuildRank::Leader => "Leader",
        })
    }
}

/// Guild policy: minimum ranks per administrative action and the rules a
/// name or tag must satisfy. One instance is built at server start and
/// shared by reference with everything that needs it.
#[derive(Debug, Clone)]
pub struct GuildSettings {
    pub min_rank_invite: GuildRank,
    pub min_rank_kick: GuildRank,
    pub min_rank_promote: GuildRank,
    pub min_rank_demote: GuildRank,
    pub min_rank_rename: GuildRank,
    pub min_rank_view_log: GuildRank,
    pub name_length: RangeInclusive<usize>,
    pub tag_length: RangeInclusive<usize>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            min_rank_invite: GuildRank::Member,
            min_rank_kick: GuildRank::Officer,
            min_rank_promote: GuildRank::Officer,
            min_rank_demote: GuildRank::Officer,
            min_rank_rename: GuildRank::Leader,
            min_rank_view_log: GuildRank::Member,
            name_length: 3..=30,
            tag_length: 2..=4,
        }
    }
}

impl GuildSettings {
    /// Printable ASCII, length within bounds, no leading or trailing
    /// space.
    pub fn is_valid_name(&self, name: &str) -> bool {
        self.name_length.contains(&name.len())
            && name.chars().all(|c| c.is_ascii_graphic() || c == ' ')
            && !name.starts_with(' ')
            && !name.ends_with(' ')
    }

    /// Printable ASCII without spaces, length within bounds.
    pub fn is_valid_tag(&self, tag: &str) -> bool {
        self.tag_length.contains(&tag.len()) && tag.chars().all(|c| c.is_ascii_graphic())
    }
}

/// What an administrative action did, for the guild event log.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize)]
pub enum GuildLogAction {
    Created = 0,
    MemberInvited = 1,
    MemberKicked = 2,
    MemberPromoted = 3,
    MemberDemoted = 4,
    MemberLeft = 5,
    Renamed = 6,
    Retagged = 7,
}

/// One record per administrative action, in the order the actions took
/// effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildLogEntry {
    pub time: DateTime<Utc>,
    pub actor: CharacterId,
    pub action: GuildLogAction,
    pub target: Option<CharacterId>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Guild {
    id: GuildId,
    name: String,
    tag: String,
    created: DateTime<Utc>,
    members: HashMap<CharacterId, GuildRank>,
    log: Vec<GuildLogEntry>,
}

impl Guild {
    pub fn id(&self) -> GuildId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn rank_of(&self, member: CharacterId) -> Option<GuildRank> {
        self.members.get(&member).copied()
    }

    pub fn members(&self) -> impl Iterator<Item = (CharacterId, GuildRank)> + '_ {
        self.members.iter().map(|(id, rank)| (*id, *rank))
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn log(&self) -> &[GuildLogEntry] {
        &self.log
    }
}

/// Receives guild lifecycle notifications. Every appended log entry is
/// mirrored through `guild_event`; `guild_disbanded` is always the last
/// notification fired for a guild.
pub trait GuildObserver {
    fn guild_created(&mut self, guild: &Guild) {
        let _ = guild;
    }

    fn guild_event(&mut self, guild: &Guild, entry: &GuildLogEntry) {
        let _ = (guild, entry);
    }

    fn guild_disbanded(&mut self, guild: &Guild) {
        let _ = guild;
    }
}

pub struct GuildManager {
    settings: GuildSettings,
    guilds: HashMap<GuildId, Guild>,
    members: HashMap<CharacterId, GuildId>,
    names: HashMap<String, GuildId>,
    tags: HashMap<String, GuildId>,
    next_id: u32,
    observers: Vec<Box<dyn GuildObserver + Send + Sync>>,
}

impl GuildManager {
    pub fn new(settings: GuildSettings) -> Self {
        Self {
            settings,
            guilds: HashMap::new(),
            members: HashMap::new(),
            names: HashMap::new(),
            tags: HashMap::new(),
            next_id: 0,
            observers: Vec::new(),
        }
    }

    pub fn observe(&mut self, observer: Box<dyn GuildObserver + Send + Sync>) {
        self.observers.push(observer);
    }

    pub fn settings(&self) -> &GuildSettings {
        &self.settings
    }

    /// All live guilds, in no particular order.
    pub fn guilds(&self) -> impl Iterator<Item = &Guild> {
        self.guilds.values()
    }

    pub fn guild(&self, id: GuildId) -> Option<&Guild> {
        self.guilds.get(&id)
    }

    pub fn guild_of(&self, member: CharacterId) -> Option<&Guild> {
        self.members.get(&member).and_then(|id| self.guilds.get(id))
    }

    pub fn rank_of(&self, member: CharacterId) -> Option<GuildRank> {
        self.guild_of(member).and_then(|g| g.rank_of(member))
    }

    pub fn is_name_available(&self, name: &str) -> bool {
        !self.names.contains_key(&normalize(name))
    }

    pub fn is_tag_available(&self, tag: &str) -> bool {
        !self.tags.contains_key(&normalize(tag))
    }

    /// Creates a guild with `founder` as its Leader. Fails if the founder
    /// is already in a guild, or the name or tag is invalid or taken. No
    /// state changes unless every check passes.
    pub fn try_create_guild(
        &mut self,
        founder: CharacterId,
        name: &str,
        tag: &str,
    ) -> Option<GuildId> {
        if self.members.contains_key(&founder) {
            return None;
        }
        if !self.settings.is_valid_name(name) || !self.settings.is_valid_tag(tag) {
            return None;
        }
        if !self.is_name_available(name) || !self.is_tag_available(tag) {
            return None;
        }

        let id = GuildId(self.next_id);
        self.next_id += 1;

        let mut members = HashMap::new();
        members.insert(founder, GuildRank::Leader);
        self.members.insert(founder, id);
        self.names.insert(normalize(name), id);
        self.tags.insert(normalize(tag), id);
        self.guilds.insert(
            id,
            Guild {
                id,
                name: name.to_owned(),
                tag: tag.to_owned(),
                created: Utc::now(),
                members,
                log: Vec::new(),
            },
        );

        let Self {
            guilds, observers, ..
        } = self;
        if let Some(guild) = guilds.get_mut(&id) {
            for observer in observers.iter_mut() {
                observer.guild_created(guild);
            }
            Self::log_event(
                guild,
                observers,
                founder,
                GuildLogAction::Created,
                None,
                Some(name.to_owned()),
            );
        }

        Some(id)
    }

    /// Adds `target` to the actor's guild at Recruit rank. An invite is a
    /// synchronous add; it fails if the actor's rank is below the invite
    /// minimum or the target is already in any guild.
    pub fn try_invite_member(&mut self, actor: CharacterId, target: CharacterId) -> bool {
        let id = match self.authorize(actor, self.settings.min_rank_invite) {
            Some(id) => id,
            None => return false,
        };
        if self.members.contains_key(&target) {
            return false;
        }

        self.members.insert(target, id);
        let Self {
            guilds, observers, ..
        } = self;
        if let Some(guild) = guilds.get_mut(&id) {
            guild.members.insert(target, GuildRank::Recruit);
            Self::log_event(
                guild,
                observers,
                actor,
                GuildLogAction::MemberInvited,
                Some(target),
                None,
            );
        }

        true
    }

    /// Removes `target` from the actor's guild. Requires the kick
    /// minimum rank and a strictly lower-ranked target.
    pub fn try_kick_member(&mut self, actor: CharacterId, target: CharacterId) -> bool {
        let (id, _) = match self.gate(actor, target, self.settings.min_rank_kick) {
            Some(gate) => gate,
            None => return false,
        };

        self.members.remove(&target);
        let Self {
            guilds, observers, ..
        } = self;
        if let Some(guild) = guilds.get_mut(&id) {
            guild.members.remove(&target);
            Self::log_event(
                guild,
                observers,
                actor,
                GuildLogAction::MemberKicked,
                Some(target),
                None,
            );
        }

        true
    }

    /// Raises `target` one rank. Fails at the top of the ladder.
    pub fn try_promote_member(&mut self, actor: CharacterId, target: CharacterId) -> bool {
        let (id, target_rank) = match self.gate(actor, target, self.settings.min_rank_promote) {
            Some(gate) => gate,
            None => return false,
        };
        let promoted = match target_rank.promoted() {
            Some(rank) => rank,
            None => return false,
        };

        let Self {
            guilds, observers, ..
        } = self;
        if let Some(guild) = guilds.get_mut(&id) {
            guild.members.insert(target, promoted);
            Self::log_event(
                guild,
                observers,
                actor,
                GuildLogAction::MemberPromoted,
                Some(target),
                Some(promoted.to_string()),
            );
        }

        true
    }

    /// Lowers `target` one rank. Fails at the bottom of the ladder.
    pub fn try_demote_member(&mut self, actor: CharacterId, target: CharacterId) -> bool {
        let (id, target_rank) = match self.gate(actor, target, self.settings.min_rank_demote) {
            Some(gate) => gate,
            None => return false,
        };
        let demoted = match target_rank.demoted() {
            Some(rank) => rank,
            None => return false,
        };

        let Self {
            guilds, observers, ..
        } = self;
        if let Some(guild) = guilds.get_mut(&id) {
            guild.members.insert(target, demoted);
            Self::log_event(
                guild,
                observers,
                actor,
                GuildLogAction::MemberDemoted,
                Some(target),
                Some(demoted.to_string()),
            );
        }

        true
    }

    /// Renames the actor's guild. Validity and availability are checked
    /// at the moment of the change, after the permission gate.
    pub fn try_change_name(&mut self, actor: CharacterId, new_name: &str) -> bool {
        let id = match self.authorize(actor, self.settings.min_rank_rename) {
            Some(id) => id,
            None => return false,
        };
        if !self.settings.is_valid_name(new_name) || !self.is_name_available(new_name) {
            return false;
        }

        let Self {
            guilds,
            names,
            observers,
            ..
        } = self;
        match guilds.get_mut(&id) {
            Some(guild) => {
                names.remove(&normalize(&guild.name));
                names.insert(normalize(new_name), id);
                guild.name = new_name.to_owned();
                Self::log_event(
                    guild,
                    observers,
                    actor,
                    GuildLogAction::Renamed,
                    None,
                    Some(new_name.to_owned()),
                );
                true
            }
            None => false,
        }
    }

    /// Changes the actor's guild tag, under the same gate as renames.
    pub fn try_change_tag(&mut self, actor: CharacterId, new_tag: &str) -> bool {
        let id = match self.authorize(actor, self.settings.min_rank_rename) {
            Some(id) => id,
            None => return false,
        };
        if !self.settings.is_valid_tag(new_tag) || !self.is_tag_available(new_tag) {
            return false;
        }

        let Self {
            guilds,
            tags,
            observers,
            ..
        } = self;
        match guilds.get_mut(&id) {
            Some(guild) => {
                tags.remove(&normalize(&guild.tag));
                tags.insert(normalize(new_tag), id);
                guild.tag = new_tag.to_owned();
                Self::log_event(
                    guild,
                    observers,
                    actor,
                    GuildLogAction::Retagged,
                    None,
                    Some(new_tag.to_owned()),
                );
                true
            }
            None => false,
        }
    }

    /// Removes `member` from their guild of their own volition. A guild
    /// left with no members disbands, freeing its name and tag.
    pub fn leave(&mut self, member: CharacterId) -> bool {
        let id = match self.members.remove(&member) {
            Some(id) => id,
            None => return false,
        };

        let Self {
            guilds, observers, ..
        } = self;
        let guild = match guilds.get_mut(&id) {
            Some(guild) => guild,
            None => {
                warn!(%id, "member {member} pointed at a guild that does not exist");
                return false;
            }
        };

        if guild.members.remove(&member).is_none() {
            warn!(%id, "member {member} was indexed but not on the roster");
        }
        Self::log_event(guild, observers, member, GuildLogAction::MemberLeft, None, None);

        if guild.members.is_empty() {
            self.disband(id);
        }

        true
    }

    /// The most recent `count` log entries, gated on the view-log rank.
    pub fn view_log(&self, actor: CharacterId, count: usize) -> Option<&[GuildLogEntry]> {
        let id = self.authorize(actor, self.settings.min_rank_view_log)?;
        let guild = self.guilds.get(&id)?;
        let start = guild.log.len().saturating_sub(count);
        Some(&guild.log[start..])
    }

    /// Id of the actor's guild, provided their rank meets `minimum`.
    fn authorize(&self, actor: CharacterId, minimum: GuildRank) -> Option<GuildId> {
        let id = *self.members.get(&actor)?;
        let rank = self.guilds.get(&id)?.rank_of(actor)?;
        (rank >= minimum).then_some(id)
    }

    /// Gate for actions on another member: the actor must hold `minimum`
    /// rank, the target must share the guild, and the actor must outrank
    /// the target.
    fn gate(
        &self,
        actor: CharacterId,
        target: CharacterId,
        minimum: GuildRank,
    ) -> Option<(GuildId, GuildRank)> {
        let id = self.authorize(actor, minimum)?;
        let guild = self.guilds.get(&id)?;
        let actor_rank = guild.rank_of(actor)?;
        let target_rank = guild.rank_of(target)?;
        (actor_rank > target_rank).then_some((id, target_rank))
    }

    fn disband(&mut self, id: GuildId) {
        let guild = match self.guilds.remove(&id) {
            Some(guild) => guild,
            None => {
                warn!(%id, "tried to disband a guild that is not registered");
                return;
            }
        };

        self.names.remove(&normalize(&guild.name));
        self.tags.remove(&normalize(&guild.tag));
        for (member, _) in guild.members() {
            self.members.remove(&member);
        }
        for observer in self.observers.iter_mut() {
            observer.guild_disbanded(&guild);
        }
    }

    fn log_event(
        guild: &mut Guild,
        observers: &mut [Box<dyn GuildObserver + Send + Sync>],
        actor: CharacterId,
        action: GuildLogAction,
        target: Option<CharacterId>,
        detail: Option<String>,
    ) {
        guild.log.push(GuildLogEntry {
            time: Utc::now(),
            actor,
            action,
            target,
            detail,
        });
        if let Some(entry) = guild.log.last() {
            for observer in observers.iter_mut() {
                observer.guild_event(guild, entry);
            }
        }
    }
}

impl fmt::Debug for GuildManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuildManager")
            .field("guilds", &self.guilds)
            .field("members", &self.members)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Names and tags are unique case-insensitively.
fn normalize(text: &str) -> String {
    text.to_ascii_lowercase()
}

/// Flat guild row used by the persistence layer.
#[derive(Debug, Clone)]
pub struct GuildRecord {
    pub id: GuildId,
    pub name: String,
    pub tag: String,
    pub created: DateTime<Utc>,
}

/// Errors that may occur when persisting guild state.
#[derive(Error, Debug)]
pub enum GuildServiceError {
    #[error("no such guild {0:?}")]
    NoSuchGuild(GuildId),
    #[error("persistence error {0:?}")]
    PersistError(String),
}

/// Persistence boundary for guild state. The world service calls this off
/// the hot path after the in-memory mutation has taken effect.
#[async_trait]
pub trait GuildService {
    async fn guilds(&self) -> Result<Vec<GuildRecord>, GuildServiceError>;
    async fn create(&self, guild: &GuildRecord) -> Result<(), GuildServiceError>;
    async fn delete(&self, id: GuildId) -> Result<(), GuildServiceError>;
    async fn rename(&self, id: GuildId, name: &str, tag: &str) -> Result<(), GuildServiceError>;

    /// Point a character's affiliation at a guild and rank, or clear it.
    async fn set_member(
        &self,
        member: CharacterId,
        guild: Option<(GuildId, GuildRank)>,
    ) -> Result<(), GuildServiceError>;

    async fn append_log(
        &self,
        id: GuildId,
        entry: &GuildLogEntry,
    ) -> Result<(), GuildServiceError>;
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::{GuildLogAction, GuildManager, GuildRank, GuildSettings};
    use crate::characters::CharacterId;

    const XENIA: CharacterId = CharacterId(10);
    const YORICK: CharacterId = CharacterId(11);
    const ZOE: CharacterId = CharacterId(12);

    fn manager() -> GuildManager {
        GuildManager::new(GuildSettings::default())
    }

    /// Invite `member` and promote them until they hold `rank`.
    fn add_at_rank(
        manager: &mut GuildManager,
        leader: CharacterId,
        member: CharacterId,
        rank: GuildRank,
    ) {
        assert!(manager.try_invite_member(leader, member));
        while manager.rank_of(member) < Some(rank) {
            assert!(manager.try_promote_member(leader, member));
        }
    }

    #[test]
    fn founder_becomes_leader() {
        let mut manager = manager();
        let id = manager
            .try_create_guild(XENIA, "Silver Hand", "SH")
            .expect("valid guild");

        assert_eq!(manager.rank_of(XENIA), Some(GuildRank::Leader));
        assert_eq!(manager.guild(id).map(|g| g.member_count()), Some(1));
    }

    #[test]
    fn duplicate_names_and_tags_are_rejected() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());

        // case differences do not make a name available
        assert!(manager.try_create_guild(YORICK, "silver hand", "XX").is_none());
        assert!(manager.try_create_guild(YORICK, "Other Hand", "sh").is_none());
        assert!(manager.try_create_guild(YORICK, "Other Hand", "OH").is_some());
    }

    #[test]
    fn a_character_joins_at_most_one_guild() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        assert!(manager.try_create_guild(YORICK, "Iron Pact", "IP").is_some());

        assert!(manager.try_invite_member(XENIA, ZOE));
        assert!(!manager.try_invite_member(YORICK, ZOE));
        assert!(manager.try_create_guild(ZOE, "Third Wheel", "TW").is_none());
    }

    #[test_case("ab" ; "too short")]
    #[test_case("this name is far too long to be a guild" ; "too long")]
    #[test_case(" padded" ; "leading space")]
    #[test_case("padded " ; "trailing space")]
    #[test_case("bad\tname" ; "control character")]
    fn invalid_names_are_rejected(name: &str) {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, name, "SH").is_none());
        assert!(manager.guilds().count() == 0);
    }

    #[test_case("a" ; "too short")]
    #[test_case("LONGER" ; "too long")]
    #[test_case("a b" ; "contains space")]
    fn invalid_tags_are_rejected(tag: &str) {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", tag).is_none());
    }

    #[test_case(GuildRank::Recruit, false ; "recruits cannot kick")]
    #[test_case(GuildRank::Member, false ; "members cannot kick")]
    #[test_case(GuildRank::Officer, true ; "officers can kick")]
    fn kicking_requires_the_minimum_rank(actor_rank: GuildRank, expected: bool) {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        add_at_rank(&mut manager, XENIA, YORICK, actor_rank);
        assert!(manager.try_invite_member(XENIA, ZOE));

        assert_eq!(manager.try_kick_member(YORICK, ZOE), expected);
        assert_eq!(manager.rank_of(ZOE).is_none(), expected);
    }

    #[test]
    fn acting_on_a_peer_or_superior_fails() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        add_at_rank(&mut manager, XENIA, YORICK, GuildRank::Officer);
        add_at_rank(&mut manager, XENIA, ZOE, GuildRank::Officer);

        // peer
        assert!(!manager.try_kick_member(YORICK, ZOE));
        assert!(!manager.try_demote_member(YORICK, ZOE));
        // superior
        assert!(!manager.try_kick_member(YORICK, XENIA));
        assert!(!manager.try_promote_member(YORICK, XENIA));

        assert_eq!(manager.rank_of(ZOE), Some(GuildRank::Officer));
        assert_eq!(manager.rank_of(XENIA), Some(GuildRank::Leader));
    }

    #[test]
    fn promote_and_demote_move_exactly_one_step() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        assert!(manager.try_invite_member(XENIA, YORICK));

        assert!(manager.try_promote_member(XENIA, YORICK));
        assert_eq!(manager.rank_of(YORICK), Some(GuildRank::Member));
        assert!(manager.try_demote_member(XENIA, YORICK));
        assert_eq!(manager.rank_of(YORICK), Some(GuildRank::Recruit));
    }

    #[test]
    fn demote_stops_at_the_floor() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        assert!(manager.try_invite_member(XENIA, YORICK));

        assert!(!manager.try_demote_member(XENIA, YORICK));
        assert_eq!(manager.rank_of(YORICK), Some(GuildRank::Recruit));
    }

    #[test]
    fn promote_stops_below_the_ceiling() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        add_at_rank(&mut manager, XENIA, YORICK, GuildRank::Officer);

        // Officer -> Leader would match the actor's own rank; the gate
        // rejects acting on the result of the previous promotion first
        assert!(manager.try_promote_member(XENIA, YORICK));
        assert_eq!(manager.rank_of(YORICK), Some(GuildRank::Leader));
        // a Leader target is no longer strictly below the actor
        assert!(!manager.try_promote_member(XENIA, YORICK));
    }

    #[test]
    fn renames_recheck_availability_at_the_moment_of_change() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        assert!(manager.try_create_guild(YORICK, "Iron Pact", "IP").is_some());

        assert!(!manager.try_change_name(YORICK, "Silver Hand"));
        assert!(manager.try_change_name(YORICK, "Iron Oath"));

        // the old name is released, the new one reserved
        assert!(manager.is_name_available("Iron Pact"));
        assert!(!manager.is_name_available("iron oath"));
    }

    #[test]
    fn retag_follows_the_rename_gate() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        add_at_rank(&mut manager, XENIA, YORICK, GuildRank::Officer);

        assert!(!manager.try_change_tag(YORICK, "IO"));
        assert!(manager.try_change_tag(XENIA, "IO"));
        assert!(manager.is_tag_available("SH"));
    }

    #[test]
    fn every_administrative_action_appends_one_log_entry() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        assert!(manager.try_invite_member(XENIA, YORICK));
        assert!(manager.try_promote_member(XENIA, YORICK));
        assert!(manager.try_demote_member(XENIA, YORICK));
        assert!(manager.try_change_name(XENIA, "Gilded Hand"));
        assert!(manager.try_kick_member(XENIA, YORICK));

        let actions: Vec<_> = manager
            .guild_of(XENIA)
            .expect("still in the guild")
            .log()
            .iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                GuildLogAction::Created,
                GuildLogAction::MemberInvited,
                GuildLogAction::MemberPromoted,
                GuildLogAction::MemberDemoted,
                GuildLogAction::Renamed,
                GuildLogAction::MemberKicked,
            ]
        );
    }

    #[test]
    fn viewing_the_log_is_rank_gated() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        assert!(manager.try_invite_member(XENIA, YORICK));

        assert!(manager.view_log(YORICK, 10).is_none());
        assert!(manager.try_promote_member(XENIA, YORICK));

        let entries = manager.view_log(YORICK, 2).expect("member may view");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn a_manager_with_observers_moves_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GuildManager>();
    }

    #[test]
    fn an_empty_guild_disbands_and_frees_its_name() {
        let mut manager = manager();
        assert!(manager.try_create_guild(XENIA, "Silver Hand", "SH").is_some());
        assert!(manager.try_invite_member(XENIA, YORICK));

        assert!(manager.leave(YORICK));
        assert!(!manager.is_name_available("Silver Hand"));

        assert!(manager.leave(XENIA));
        assert!(manager.guilds().count() == 0);
        assert!(manager.is_name_available("Silver Hand"));
        assert!(manager.is_tag_available("SH"));

        assert!(manager.try_create_guild(YORICK, "Silver Hand", "SH").is_some());
    }
}
