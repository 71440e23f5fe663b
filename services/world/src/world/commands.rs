//! Typed player commands and their replies.
//!
//! The chat front end parses player text, resolves names to character
//! ids, and hands a [`Command`] to the world task. Every handler checks
//! the same preconditions the chat layer reports on, then delegates to
//! the game core; the core's return value decides the [`GameMessage`]
//! sent back.

use riftvale_game::{
    characters::{CharacterId, CharacterService},
    guilds::{Guild, GuildLogEntry, GuildRank, GuildRecord, GuildService},
    inventory::InventorySlot,
    items::{ItemStack, ItemTemplateId},
};
use tracing::{trace, warn};

use crate::worldserver::WorldServer;

/// A player command, already parsed and name-resolved by the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateGroup,
    GroupInvite { target: CharacterId },
    LeaveGroup,

    CreateGuild { name: String, tag: String },
    GuildInvite { target: CharacterId },
    GuildKick { target: CharacterId },
    GuildPromote { target: CharacterId },
    GuildDemote { target: CharacterId },
    RenameGuild { name: String },
    RetagGuild { tag: String },
    GuildMembers,
    GuildLog,
    LeaveGuild,

    PickUpItem { template: ItemTemplateId, amount: u8 },
    DropItem { slot: InventorySlot },
    SwapInventorySlots { a: InventorySlot, b: InventorySlot },
}

/// Replies surfaced to a player; the messaging layer turns these into
/// localized chat lines.
#[derive(Debug, Clone, PartialEq)]
pub enum GameMessage {
    GroupCreated,
    GroupCreateFailedAlreadyInGroup,
    GroupInviteSuccess(CharacterId),
    GroupInviteFailedAlreadyInGroup(CharacterId),
    GroupLeft,
    InvalidCommandMustBeInGroup,

    GuildCreationSuccessful { name: String, tag: String },
    GuildCreationFailedAlreadyInGuild,
    GuildCreationFailedNameInvalid(String),
    GuildCreationFailedNameNotAvailable(String),
    GuildCreationFailedTagInvalid(String),
    GuildCreationFailedTagNotAvailable(String),
    GuildCreationFailedUnknownReason { name: String, tag: String },

    InvalidCommandMustBeInGuild,
    GuildInsufficientPermissions { required: GuildRank },
    GuildInviteSuccess(CharacterId),
    GuildInviteFailedCannotInviteSelf,
    GuildInviteFailedAlreadyInGuild(CharacterId),
    GuildInviteFailedUnknownReason(CharacterId),
    GuildKick(CharacterId),
    GuildKickFailedNotInGuild(CharacterId),
    GuildKickFailedTooHighRank(CharacterId),
    GuildKickFailedUnknownReason(CharacterId),
    GuildPromote(CharacterId),
    GuildPromoteFailed(CharacterId),
    GuildDemote(CharacterId),
    GuildDemoteFailed(CharacterId),
    GuildRenamed(String),
    GuildRenameFailed(String),
    GuildRetagged(String),
    GuildRetagFailed(String),
    GuildMembers(Vec<(CharacterId, GuildRank)>),
    GuildLogEntries(Vec<GuildLogEntry>),
    GuildLeft,

    PickedUpItem { template: ItemTemplateId, amount: u8 },
    InventoryFull { template: ItemTemplateId, remaining: u8 },
    DroppedItem { slot: InventorySlot },
    DropItemFailedSlotEmpty { slot: InventorySlot },
    SwappedSlots { a: InventorySlot, b: InventorySlot },
    SwapSlotsFailed { a: InventorySlot, b: InventorySlot },
}

impl<C: CharacterService, G: GuildService> WorldServer<C, G> {
    pub(crate) async fn handle_command(&mut self, actor: CharacterId, command: Command) {
        trace!(%actor, ?command, "handling command");

        match command {
            Command::CreateGroup => match self.groups.try_create_group(actor) {
                Some(_) => self.reply(actor, GameMessage::GroupCreated).await,
                None => {
                    self.reply(actor, GameMessage::GroupCreateFailedAlreadyInGroup)
                        .await
                }
            },
            Command::GroupInvite { target } => self.group_invite(actor, target).await,
            Command::LeaveGroup => {
                if self.groups.remove_member(actor) {
                    self.reply(actor, GameMessage::GroupLeft).await;
                } else {
                    self.reply(actor, GameMessage::InvalidCommandMustBeInGroup)
                        .await;
                }
            }

            Command::CreateGuild { name, tag } => self.create_guild(actor, name, tag).await,
            Command::GuildInvite { target } => self.guild_invite(actor, target).await,
            Command::GuildKick { target } => self.guild_kick(actor, target).await,
            Command::GuildPromote { target } => self.guild_promote(actor, target).await,
            Command::GuildDemote { target } => self.guild_demote(actor, target).await,
            Command::RenameGuild { name } => self.rename_guild(actor, name).await,
            Command::RetagGuild { tag } => self.retag_guild(actor, tag).await,
            Command::GuildMembers => self.guild_members(actor).await,
            Command::GuildLog => self.guild_log(actor).await,
            Command::LeaveGuild => self.leave_guild(actor).await,

            Command::PickUpItem { template, amount } => {
                self.pick_up_item(actor, template, amount).await
            }
            Command::DropItem { slot } => self.drop_item(actor, slot).await,
            Command::SwapInventorySlots { a, b } => self.swap_inventory_slots(actor, a, b).await,
        }
    }

    /// Whether the actor holds at least `required` rank in their guild.
    fn check_guild_permissions(&self, actor: CharacterId, required: GuildRank) -> bool {
        self.guilds
            .rank_of(actor)
            .map_or(false, |rank| rank >= required)
    }

    async fn group_invite(&mut self, actor: CharacterId, target: CharacterId) {
        let group = match self.groups.group_of(actor) {
            Some(group) => group.id(),
            None => {
                self.reply(actor, GameMessage::InvalidCommandMustBeInGroup)
                    .await;
                return;
            }
        };

        if self.groups.try_invite(group, target) {
            self.reply(actor, GameMessage::GroupInviteSuccess(target))
                .await;
        } else {
            self.reply(actor, GameMessage::GroupInviteFailedAlreadyInGroup(target))
                .await;
        }
    }

    async fn create_guild(&mut self, actor: CharacterId, name: String, tag: String) {
        if self.guilds.guild_of(actor).is_some() {
            self.reply(actor, GameMessage::GuildCreationFailedAlreadyInGuild)
                .await;
            return;
        }
        if !self.guilds.settings().is_valid_name(&name) {
            self.reply(actor, GameMessage::GuildCreationFailedNameInvalid(name))
                .await;
            return;
        }
        if !self.guilds.is_name_available(&name) {
            self.reply(
                actor,
                GameMessage::GuildCreationFailedNameNotAvailable(name),
            )
            .await;
            return;
        }
        if !self.guilds.settings().is_valid_tag(&tag) {
            self.reply(actor, GameMessage::GuildCreationFailedTagInvalid(tag))
                .await;
            return;
        }
        if !self.guilds.is_tag_available(&tag) {
            self.reply(actor, GameMessage::GuildCreationFailedTagNotAvailable(tag))
                .await;
            return;
        }

        match self.guilds.try_create_guild(actor, &name, &tag) {
            Some(id) => {
                if let Some(guild) = self.guilds.guild(id) {
                    let record = GuildRecord {
                        id,
                        name: guild.name().to_owned(),
                        tag: guild.tag().to_owned(),
                        created: guild.created(),
                    };
                    if let Err(e) = self.guild_store.create(&record).await {
                        warn!(%id, "could not persist guild: {e}");
                    }
                }
                self.persist_member(actor).await;
                self.persist_last_log(id).await;
                self.reply(actor, GameMessage::GuildCreationSuccessful { name, tag })
                    .await;
            }
            None => {
                self.reply(
                    actor,
                    GameMessage::GuildCreationFailedUnknownReason { name, tag },
                )
                .await
            }
        }
    }

    async fn guild_invite(&mut self, actor: CharacterId, target: CharacterId) {
        let id = match self.guilds.guild_of(actor).map(Guild::id) {
            Some(id) => id,
            None => {
                self.reply(actor, GameMessage::InvalidCommandMustBeInGuild)
                    .await;
                return;
            }
        };
        let required = self.guilds.settings().min_rank_invite;
        if !self.check_guild_permissions(actor, required) {
            self.reply(actor, GameMessage::GuildInsufficientPermissions { required })
                .await;
            return;
        }
        if target == actor {
            self.reply(actor, GameMessage::GuildInviteFailedCannotInviteSelf)
                .await;
            return;
        }
        if self.guilds.guild_of(target).is_some() {
            self.reply(actor, GameMessage::GuildInviteFailedAlreadyInGuild(target))
                .await;
            return;
        }

        if self.guilds.try_invite_member(actor, target) {
            self.persist_member(target).await;
            self.persist_last_log(id).await;
            self.reply(actor, GameMessage::GuildInviteSuccess(target))
                .await;
        } else {
            self.reply(actor, GameMessage::GuildInviteFailedUnknownReason(target))
                .await;
        }
    }

    async fn guild_kick(&mut self, actor: CharacterId, target: CharacterId) {
        let id = match self.guilds.guild_of(actor).map(Guild::id) {
            Some(id) => id,
            None => {
                self.reply(actor, GameMessage::InvalidCommandMustBeInGuild)
                    .await;
                return;
            }
        };
        let required = self.guilds.settings().min_rank_kick;
        if !self.check_guild_permissions(actor, required) {
            self.reply(actor, GameMessage::GuildInsufficientPermissions { required })
                .await;
            return;
        }
        if self.guilds.guild_of(target).map(Guild::id) != Some(id) {
            self.reply(actor, GameMessage::GuildKickFailedNotInGuild(target))
                .await;
            return;
        }
        if self.guilds.rank_of(target) > self.guilds.rank_of(actor) {
            self.reply(actor, GameMessage::GuildKickFailedTooHighRank(target))
                .await;
            return;
        }

        if self.guilds.try_kick_member(actor, target) {
            self.persist_member(target).await;
            self.persist_last_log(id).await;
            self.reply(actor, GameMessage::GuildKick(target)).await;
        } else {
            self.reply(actor, GameMessage::GuildKickFailedUnknownReason(target))
                .await;
        }
    }

    async fn guild_promote(&mut self, actor: CharacterId, target: CharacterId) {
        let id = match self.guilds.guild_of(actor).map(Guild::id) {
            Some(id) => id,
            None => {
                self.reply(actor, GameMessage::InvalidCommandMustBeInGuild)
                    .await;
                return;
            }
        };
        let required = self.guilds.settings().min_rank_promote;
        if !self.check_guild_permissions(actor, required) {
            self.reply(actor, GameMessage::GuildInsufficientPermissions { required })
                .await;
            return;
        }

        if self.guilds.try_promote_member(actor, target) {
            self.persist_member(target).await;
            self.persist_last_log(id).await;
            self.reply(actor, GameMessage::GuildPromote(target)).await;
        } else {
            self.reply(actor, GameMessage::GuildPromoteFailed(target))
                .await;
        }
    }

    async fn guild_demote(&mut self, actor: CharacterId, target: CharacterId) {
        let id = match self.guilds.guild_of(actor).map(Guild::id) {
            Some(id) => id,
            None => {
                self.reply(actor, GameMessage::InvalidCommandMustBeInGuild)
                    .await;
                return;
            }
        };
        let required = self.guilds.settings().min_rank_demote;
        if !self.check_guild_permissions(actor, required) {
            self.reply(actor, GameMessage::GuildInsufficientPermissions { required })
                .await;
            return;
        }

        if self.guilds.try_demote_member(actor, target) {
            self.persist_member(target).await;
            self.persist_last_log(id).await;
            self.reply(actor, GameMessage::GuildDemote(target)).await;
        } else {
            self.reply(actor, GameMessage::GuildDemoteFailed(target))
                .await;
        }
    }

    async fn rename_guild(&mut self, actor: CharacterId, name: String) {
        let id = match self.guilds.guild_of(actor).map(Guild::id) {
            Some(id) => id,
            None => {
                self.reply(actor, GameMessage::InvalidCommandMustBeInGuild)
                    .await;
                return;
            }
        };
        let required = self.guilds.settings().min_rank_rename;
        if !self.check_guild_permissions(actor, required) {
            self.reply(actor, GameMessage::GuildInsufficientPermissions { required })
                .await;
            return;
        }

        if self.guilds.try_change_name(actor, &name) {
            self.persist_rename(id).await;
            self.persist_last_log(id).await;
            self.reply(actor, GameMessage::GuildRenamed(name)).await;
        } else {
            self.reply(actor, GameMessage::GuildRenameFailed(name)).await;
        }
    }

    async fn retag_guild(&mut self, actor: CharacterId, tag: String) {
        let id = match self.guilds.guild_of(actor).map(Guild::id) {
            Some(id) => id,
            None => {
                self.reply(actor, GameMessage::InvalidCommandMustBeInGuild)
                    .await;
                return;
            }
        };
        let required = self.guilds.settings().min_rank_rename;
        if !self.check_guild_permissions(actor, required) {
            self.reply(actor, GameMessage::GuildInsufficientPermissions { required })
                .await;
            return;
        }

        if self.guilds.try_change_tag(actor, &tag) {
            self.persist_rename(id).await;
            self.persist_last_log(id).await;
            self.reply(actor, GameMessage::GuildRetagged(tag)).await;
        } else {
            self.reply(actor, GameMessage::GuildRetagFailed(tag)).await;
        }
    }

    async fn guild_members(&mut self, actor: CharacterId) {
        let roster = match self.guilds.guild_of(actor) {
            Some(guild) => {
                let mut roster: Vec<_> = guild.members().collect();
                // highest rank first, ties broken by character id
                roster.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
                roster
            }
            None => {
                self.reply(actor, GameMessage::InvalidCommandMustBeInGuild)
                    .await;
                return;
            }
        };
        self.reply(actor, GameMessage::GuildMembers(roster)).await;
    }

    async fn guild_log(&mut self, actor: CharacterId) {
        if self.guilds.guild_of(actor).is_none() {
            self.reply(actor, GameMessage::InvalidCommandMustBeInGuild)
                .await;
            return;
        }

        let required = self.guilds.settings().min_rank_view_log;
        let entries = self.guilds.view_log(actor, 10).map(<[GuildLogEntry]>::to_vec);
        match entries {
            Some(entries) => self.reply(actor, GameMessage::GuildLogEntries(entries)).await,
            None => {
                self.reply(actor, GameMessage::GuildInsufficientPermissions { required })
                    .await
            }
        }
    }

    async fn leave_guild(&mut self, actor: CharacterId) {
        let id = match self.guilds.guild_of(actor).map(Guild::id) {
            Some(id) => id,
            None => {
                self.reply(actor, GameMessage::InvalidCommandMustBeInGuild)
                    .await;
                return;
            }
        };
        let was_last_member = self
            .guilds
            .guild(id)
            .map_or(false, |g| g.member_count() == 1);

        if self.guilds.leave(actor) {
            self.persist_member(actor).await;
            if was_last_member {
                if let Err(e) = self.guild_store.delete(id).await {
                    warn!(%id, "could not delete disbanded guild: {e}");
                }
            } else {
                self.persist_last_log(id).await;
            }
            self.reply(actor, GameMessage::GuildLeft).await;
        }
    }

    async fn pick_up_item(&mut self, actor: CharacterId, template: ItemTemplateId, amount: u8) {
        self.ensure_inventory(actor).await;

        let stack = ItemStack::new(self.item_ids.next(), template, amount);
        let remainder = self.inventory(actor).add(stack);
        self.persist_inventory(actor).await;

        match remainder {
            None => {
                self.reply(actor, GameMessage::PickedUpItem { template, amount })
                    .await
            }
            Some(remainder) => {
                self.reply(
                    actor,
                    GameMessage::InventoryFull {
                        template,
                        remaining: remainder.amount(),
                    },
                )
                .await
            }
        }
    }

    async fn drop_item(&mut self, actor: CharacterId, slot: InventorySlot) {
        self.ensure_inventory(actor).await;

        let inventory = self.inventory(actor);
        if inventory.get(slot).is_some() {
            inventory.remove_at(slot, true);
            self.persist_inventory(actor).await;
            self.reply(actor, GameMessage::DroppedItem { slot }).await;
        } else {
            self.reply(actor, GameMessage::DropItemFailedSlotEmpty { slot })
                .await;
        }
    }

    async fn swap_inventory_slots(
        &mut self,
        actor: CharacterId,
        a: InventorySlot,
        b: InventorySlot,
    ) {
        self.ensure_inventory(actor).await;

        if self.inventory(actor).swap_slots(a, b) {
            self.persist_inventory(actor).await;
            self.reply(actor, GameMessage::SwappedSlots { a, b }).await;
        } else {
            self.reply(actor, GameMessage::SwapSlotsFailed { a, b }).await;
        }
    }

    /// Pushes the guild's current name and tag to the store after a
    /// rename or retag.
    async fn persist_rename(&self, id: riftvale_game::guilds::GuildId) {
        if let Some(guild) = self.guilds.guild(id) {
            if let Err(e) = self
                .guild_store
                .rename(id, guild.name(), guild.tag())
                .await
            {
                warn!(%id, "could not persist guild rename: {e}");
            }
        }
    }
}
