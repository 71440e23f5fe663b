use std::collections::HashMap;

use anyhow::Result;
use riftvale_game::{
    characters::{CharacterId, CharacterService, ItemRecord},
    groups::GroupManager,
    guilds::{GuildId, GuildManager, GuildService, GuildSettings},
    inventory::{Inventory, InventorySlot},
    items::{ItemIds, ItemStack},
};
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    time::{interval, Duration},
};
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    conf::WorldServerConfig,
    world::commands::{Command, GameMessage},
};

/// Handle given to the network front end for feeding player commands
/// into the simulation.
pub type CommandSender = Sender<(CharacterId, Command)>;

/// Owns all mutable world state. A single task runs [`WorldServer::run`]
/// and is the only writer, which is what lets the game core stay free of
/// locks.
pub struct WorldServer<C: CharacterService, G: GuildService> {
    pub(crate) characters: C,
    pub(crate) guild_store: G,

    pub(crate) groups: GroupManager,
    pub(crate) guilds: GuildManager,
    pub(crate) inventories: HashMap<CharacterId, Inventory>,
    pub(crate) item_ids: ItemIds,
    pub(crate) inventory_slots: u32,

    receiver: Receiver<(CharacterId, Command)>,
    replies: Sender<(CharacterId, GameMessage)>,

    update_interval: Duration,
}

impl<C: CharacterService, G: GuildService> WorldServer<C, G> {
    pub fn new(
        config: &WorldServerConfig,
        characters: C,
        guild_store: G,
    ) -> (
        Self,
        CommandSender,
        Receiver<(CharacterId, GameMessage)>,
    ) {
        let (sender, receiver) = mpsc::channel(1024);
        let (replies, reply_receiver) = mpsc::channel(1024);

        (
            Self {
                characters,
                guild_store,
                groups: GroupManager::new(),
                guilds: GuildManager::new(GuildSettings::default()),
                inventories: HashMap::new(),
                item_ids: ItemIds::new(),
                inventory_slots: config.inventory_slots,
                receiver,
                replies,
                update_interval: Duration::from_millis(config.update_interval),
            },
            sender,
            reply_receiver,
        )
    }

    /// Runs the simulation loop until every command sender is dropped.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<()> {
        let mut ticker = interval(self.update_interval);
        let mut updates = 0u64;

        loop {
            tokio::select! {
                command = self.receiver.recv() => match command {
                    Some((actor, command)) => self.handle_command(actor, command).await,
                    None => break,
                },
                _ = ticker.tick() => {
                    updates += 1;
                    if updates % 600 == 0 {
                        trace!(updates, "world tick");
                    }
                }
            }
        }

        info!("command stream closed, stopping world");
        Ok(())
    }

    pub(crate) async fn reply(&self, to: CharacterId, message: GameMessage) {
        if self.replies.send((to, message)).await.is_err() {
            debug!("reply channel closed");
        }
    }

    /// The actor's inventory. [`WorldServer::ensure_inventory`] must have
    /// run for this actor first.
    pub(crate) fn inventory(&mut self, actor: CharacterId) -> &mut Inventory {
        let slots = self.inventory_slots;
        let ids = self.item_ids.clone();
        self.inventories
            .entry(actor)
            .or_insert_with(|| Inventory::new(slots, ids))
    }

    /// Loads the actor's persisted inventory on first touch.
    pub(crate) async fn ensure_inventory(&mut self, actor: CharacterId) {
        if self.inventories.contains_key(&actor) {
            return;
        }

        let mut inventory = Inventory::new(self.inventory_slots, self.item_ids.clone());
        match self.characters.inventory(actor).await {
            Ok(records) => {
                for record in records {
                    let stack =
                        ItemStack::new(self.item_ids.next(), record.template, record.amount);
                    let slot = InventorySlot(record.slot);
                    // out-of-range or duplicate persisted slots fall back
                    // to repacking so no stored item is lost
                    if let Some(stack) = inventory.place_at(slot, stack) {
                        warn!(%actor, %slot, "persisted slot is unusable, repacking the stack");
                        if inventory.add(stack).is_some() {
                            warn!(%actor, "persisted inventory does not fit, dropping the overflow");
                        }
                    }
                }
            }
            Err(e) => warn!(%actor, "could not load inventory: {e}"),
        }
        self.inventories.insert(actor, inventory);
    }

    pub(crate) async fn persist_inventory(&self, actor: CharacterId) {
        let records: Vec<ItemRecord> = match self.inventories.get(&actor) {
            Some(inventory) => inventory
                .iter()
                .map(|(slot, item)| ItemRecord {
                    slot: slot.into(),
                    template: item.template(),
                    amount: item.amount(),
                })
                .collect(),
            None => return,
        };

        if let Err(e) = self.characters.save_inventory(actor, &records).await {
            warn!(%actor, "could not persist inventory: {e}");
        }
    }

    /// Writes the actor's current guild affiliation, or its absence.
    pub(crate) async fn persist_member(&self, member: CharacterId) {
        let affiliation = self
            .guilds
            .guild_of(member)
            .and_then(|g| g.rank_of(member).map(|rank| (g.id(), rank)));
        if let Err(e) = self.guild_store.set_member(member, affiliation).await {
            warn!(%member, "could not persist guild membership: {e}");
        }
    }

    /// Mirrors the newest in-memory guild log entry to the database.
    pub(crate) async fn persist_last_log(&self, id: GuildId) {
        let entry = self
            .guilds
            .guild(id)
            .and_then(|g| g.log().last().cloned());
        if let Some(entry) = entry {
            if let Err(e) = self.guild_store.append_log(id, &entry).await {
                warn!(%id, "could not persist guild log entry: {e}");
            }
        }
    }
}
