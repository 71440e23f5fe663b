//! End-to-end flows across the simulation core.

use riftvale_game::{
    characters::CharacterId,
    guilds::{GuildManager, GuildRank, GuildSettings},
    inventory::{Inventory, InventorySlot},
    items::{ItemIds, ItemStack, ItemTemplateId},
};

#[test]
fn a_full_day_of_inventory_traffic() {
    let ids = ItemIds::new();
    let mut inventory = Inventory::with_max_stack(3, 10, ids.clone());

    // 15 potions: a full stack in slot 0, the rest in slot 1
    let potions = ItemStack::new(ids.next(), ItemTemplateId(1), 15);
    assert!(inventory.add(potions).is_none());
    assert_eq!(
        inventory.get(InventorySlot(0)).map(ItemStack::amount),
        Some(10)
    );
    assert_eq!(
        inventory.get(InventorySlot(1)).map(ItemStack::amount),
        Some(5)
    );
    assert_eq!(inventory.free_slots(), 1);

    // a sword cannot stack with potions and takes the last slot
    let sword = ItemStack::new(ids.next(), ItemTemplateId(2), 1);
    assert!(inventory.add(sword).is_none());
    assert_eq!(
        inventory.get(InventorySlot(2)).map(ItemStack::template),
        Some(ItemTemplateId(2))
    );
    assert_eq!(inventory.free_slots(), 0);

    // a shield fits nowhere and comes back untouched
    let shield = ItemStack::new(ids.next(), ItemTemplateId(3), 1);
    let shield_id = shield.id();
    let remainder = inventory.add(shield).expect("no room left");
    assert_eq!(remainder.id(), shield_id);
    assert_eq!(remainder.amount(), 1);
}

#[test]
fn a_guild_rises_and_enforces_its_ladder() {
    const XANDER: CharacterId = CharacterId(1);
    const YULIA: CharacterId = CharacterId(2);

    let mut manager = GuildManager::new(GuildSettings::default());

    let id = manager
        .try_create_guild(XANDER, "Foo", "FOO")
        .expect("name and tag are free");
    assert_eq!(manager.rank_of(XANDER), Some(GuildRank::Leader));

    // Yulia joins as a Recruit and is promoted to Member
    assert!(manager.try_invite_member(XANDER, YULIA));
    assert_eq!(manager.rank_of(YULIA), Some(GuildRank::Recruit));
    assert!(manager.try_promote_member(XANDER, YULIA));
    assert_eq!(manager.rank_of(YULIA), Some(GuildRank::Member));

    // a Member may not kick the Leader
    assert!(!manager.try_kick_member(YULIA, XANDER));
    assert_eq!(manager.rank_of(XANDER), Some(GuildRank::Leader));

    // the Leader kicks Yulia, who drops off the roster
    assert!(manager.try_kick_member(XANDER, YULIA));
    assert!(manager.rank_of(YULIA).is_none());
    assert_eq!(manager.guild(id).map(|g| g.member_count()), Some(1));
}
