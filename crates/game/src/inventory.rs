//! Slotted, fixed-capacity item storage.
//!
//! An [`Inventory`] owns every stack resident in it; adding transfers
//! ownership in, removal transfers it back out. All mutation happens on
//! the world task, so the container holds no locks of its own.

use std::fmt;

use derive_more::{Display, From, Into};
use thiserror::Error;
use tracing::{error, warn};

use crate::items::{ItemId, ItemIds, ItemStack, MAX_STACK_SIZE};

/// Index of one storage position in an [`Inventory`].
///
/// Only values below the container's total slot count are legal; illegal
/// values are rejected by every operation, never clamped.
#[derive(Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, From, Into)]
pub struct InventorySlot(pub u32);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryError {
    #[error("item {0} is not in the inventory")]
    ItemNotFound(ItemId),
}

/// Receives a notification every time the occupancy of a slot changes.
///
/// On a fill or empty transition exactly one of `new`/`old` is `Some`;
/// both are `Some` only when a swap replaces one item with another.
/// Amount changes on a stack that stays in place do not notify.
pub trait InventoryObserver {
    fn slot_changed(
        &mut self,
        slot: InventorySlot,
        new: Option<&ItemStack>,
        old: Option<&ItemStack>,
    );
}

pub struct Inventory {
    slots: Box<[Option<ItemStack>]>,
    max_stack: u8,
    ids: ItemIds,
    observers: Vec<Box<dyn InventoryObserver + Send + Sync>>,
}

impl Inventory {
    pub fn new(total_slots: u32, ids: ItemIds) -> Self {
        Self::with_max_stack(total_slots, MAX_STACK_SIZE, ids)
    }

    /// Containers normally stack up to [`MAX_STACK_SIZE`]; a smaller cap
    /// may be supplied for special containers.
    pub fn with_max_stack(total_slots: u32, max_stack: u8, ids: ItemIds) -> Self {
        Self {
            slots: vec![None; total_slots as usize].into_boxed_slice(),
            max_stack,
            ids,
            observers: Vec::new(),
        }
    }

    pub fn observe(&mut self, observer: Box<dyn InventoryObserver + Send + Sync>) {
        self.observers.push(observer);
    }

    pub fn total_slots(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn free_slots(&self) -> u32 {
        self.slots.iter().filter(|s| s.is_none()).count() as u32
    }

    pub fn occupied_slots(&self) -> u32 {
        self.slots.iter().filter(|s| s.is_some()).count() as u32
    }

    pub fn get(&self, slot: InventorySlot) -> Option<&ItemStack> {
        let idx = match self.index(slot) {
            Some(idx) => idx,
            None => {
                error!(%slot, "tried to get invalid inventory slot");
                return None;
            }
        };
        self.slots[idx].as_ref()
    }

    /// Occupied slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (InventorySlot, &ItemStack)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|item| (InventorySlot(i as u32), item)))
    }

    /// Deposits as much of `item` as possible, stacking onto existing
    /// stacks in ascending slot order before filling empty slots with
    /// capped deep copies. Returns the depleted original if any units
    /// could not be placed; a fully consumed original is disposed.
    pub fn add(&mut self, item: ItemStack) -> Option<ItemStack> {
        self.internal_add(item, None)
    }

    /// Like [`Inventory::add`], additionally reporting the slots that
    /// were touched, in the order they were first touched.
    pub fn add_tracked(&mut self, item: ItemStack) -> (Option<ItemStack>, Vec<InventorySlot>) {
        let mut changed = Vec::new();
        let remainder = self.internal_add(item, Some(&mut changed));
        (remainder, changed)
    }

    /// Puts `item` into one specific slot, for restoring a persisted
    /// layout. No stacking or repacking happens; the item is handed
    /// back if the slot is out of range or already occupied.
    pub fn place_at(&mut self, slot: InventorySlot, item: ItemStack) -> Option<ItemStack> {
        let idx = match self.index(slot) {
            Some(idx) => idx,
            None => {
                error!(%slot, "tried to place an item into an invalid slot");
                return Some(item);
            }
        };
        if self.slots[idx].is_some() {
            warn!(%slot, "tried to place an item into an occupied slot");
            return Some(item);
        }

        self.set_slot(slot, Some(item));
        None
    }

    /// Whether a single new stack fits. This only checks the free slot
    /// count; room left on existing stacks is ignored, so a full
    /// container reports `false` even when the item would stack in.
    pub fn can_add(&self, item: &ItemStack) -> bool {
        item.amount() > 0 && self.free_slots() >= 1
    }

    /// Whether `count` new stacks fit, by free slot count only.
    pub fn can_add_all(&self, count: u32) -> bool {
        self.free_slots() >= count
    }

    /// Whether every stack in `other` fits, by free slot count only.
    pub fn can_add_inventory(&self, other: &Inventory) -> bool {
        self.free_slots() >= other.occupied_slots()
    }

    /// Detaches the item in `slot`. With `dispose` the item is destroyed
    /// and `None` returned; otherwise ownership passes to the caller.
    /// Clearing an empty slot is a logged no-op.
    pub fn remove_at(&mut self, slot: InventorySlot, dispose: bool) -> Option<ItemStack> {
        let idx = match self.index(slot) {
            Some(idx) => idx,
            None => {
                error!(%slot, "tried to clear invalid inventory slot");
                return None;
            }
        };
        if self.slots[idx].is_none() {
            warn!(%slot, "slot already contains no item");
            return None;
        }

        let item = self.set_slot(slot, None);
        if dispose {
            None
        } else {
            item
        }
    }

    /// Empties every slot. With `dispose` the items are destroyed;
    /// otherwise they are returned in ascending slot order.
    pub fn remove_all(&mut self, dispose: bool) -> Vec<ItemStack> {
        let mut removed = Vec::new();
        for i in 0..self.slots.len() {
            if self.slots[i].is_some() {
                if let Some(item) = self.remove_at(InventorySlot(i as u32), dispose) {
                    removed.push(item);
                }
            }
        }
        removed
    }

    /// Exchanges the contents of two slots. Fails on an illegal index or
    /// when `a == b`. Swapping two empty slots succeeds without firing
    /// notifications.
    pub fn swap_slots(&mut self, a: InventorySlot, b: InventorySlot) -> bool {
        let (ia, ib) = match (self.index(a), self.index(b)) {
            (Some(ia), Some(ib)) => (ia, ib),
            _ => return false,
        };
        if a == b {
            return false;
        }

        if self.slots[ia].is_some() || self.slots[ib].is_some() {
            self.slots.swap(ia, ib);
            // each slot reports its new occupant against its old one
            Self::notify(
                &mut self.observers,
                a,
                self.slots[ia].as_ref(),
                self.slots[ib].as_ref(),
            );
            Self::notify(
                &mut self.observers,
                b,
                self.slots[ib].as_ref(),
                self.slots[ia].as_ref(),
            );
        }

        true
    }

    /// The slot currently holding the item with id `id`.
    pub fn slot_of(&self, id: ItemId) -> Result<InventorySlot, InventoryError> {
        self.try_slot_of(id).ok_or(InventoryError::ItemNotFound(id))
    }

    /// Like [`Inventory::slot_of`], with absence as a normal outcome.
    pub fn try_slot_of(&self, id: ItemId) -> Option<InventorySlot> {
        self.slots
            .iter()
            .position(|s| s.as_ref().map(ItemStack::id) == Some(id))
            .map(|i| InventorySlot(i as u32))
    }

    /// Reacts to an item being destroyed while resident here. The entry
    /// is detached without disposing again; there is nothing left to
    /// dispose.
    pub fn handle_item_disposed(&mut self, id: ItemId) {
        match self.try_slot_of(id) {
            Some(slot) => {
                self.remove_at(slot, false);
            }
            None => warn!(%id, "item was disposed but was not found in the inventory"),
        }
    }

    fn index(&self, slot: InventorySlot) -> Option<usize> {
        let idx = slot.0 as usize;
        (idx < self.slots.len()).then_some(idx)
    }

    fn internal_add(
        &mut self,
        mut item: ItemStack,
        mut changed: Option<&mut Vec<InventorySlot>>,
    ) -> Option<ItemStack> {
        if item.amount() == 0 {
            warn!(item = %item.id(), "added an empty stack");
            return None;
        }

        // Stack onto existing stacks until the item runs out or no
        // stackable slot remains.
        while let Some(slot) = self.find_stackable_slot(&item) {
            let idx = slot.0 as usize;
            let existing = match self.slots[idx].as_mut() {
                Some(existing) => existing,
                None => {
                    error!(%slot, "stackable slot holds no item; slot scan is broken");
                    break;
                }
            };

            let taken = (self.max_stack - existing.amount()).min(item.amount());
            existing.set_amount(existing.amount() + taken);
            item.set_amount(item.amount() - taken);

            if let Some(changed) = changed.as_deref_mut() {
                if !changed.contains(&slot) {
                    changed.push(slot);
                }
            }

            if item.amount() == 0 {
                return None;
            }
        }

        // Place the rest into empty slots as capped deep copies.
        while let Some(slot) = self.find_empty_slot() {
            let taken = self.max_stack.min(item.amount());
            let copy = item.copy_with_amount(self.ids.next(), taken);
            item.set_amount(item.amount() - taken);
            self.set_slot(slot, Some(copy));

            if let Some(changed) = changed.as_deref_mut() {
                if !changed.contains(&slot) {
                    changed.push(slot);
                }
            }

            if item.amount() == 0 {
                // fully consumed via copies, dispose the original
                return None;
            }
        }

        Some(item)
    }

    /// The first slot `item` can stack onto. The slot is guaranteed to
    /// take at least one unit, not necessarily all of them.
    fn find_stackable_slot(&self, item: &ItemStack) -> Option<InventorySlot> {
        self.slots
            .iter()
            .position(|s| match s {
                Some(existing) => existing.amount() < self.max_stack && existing.can_stack(item),
                None => false,
            })
            .map(|i| InventorySlot(i as u32))
    }

    fn find_empty_slot(&self) -> Option<InventorySlot> {
        self.slots
            .iter()
            .position(Option::is_none)
            .map(|i| InventorySlot(i as u32))
    }

    /// Replaces the contents of `slot`, firing the change notification
    /// and returning the previous occupant. Writing an item over an
    /// occupied slot is a programming error; the stale occupant is
    /// disposed so the slot table stays consistent.
    fn set_slot(&mut self, slot: InventorySlot, value: Option<ItemStack>) -> Option<ItemStack> {
        let idx = match self.index(slot) {
            Some(idx) => idx,
            None => {
                error!(%slot, "tried to set invalid inventory slot");
                return value;
            }
        };

        if self.slots[idx].is_some() && value.is_some() {
            error!(%slot, "set an item on a slot that already contained an item");
            if let Some(stale) = self.slots[idx].take() {
                Self::notify(&mut self.observers, slot, None, Some(&stale));
            }
        }

        let old = std::mem::replace(&mut self.slots[idx], value);
        if self.slots[idx].is_some() || old.is_some() {
            Self::notify(
                &mut self.observers,
                slot,
                self.slots[idx].as_ref(),
                old.as_ref(),
            );
        }
        old
    }

    fn notify(
        observers: &mut [Box<dyn InventoryObserver + Send + Sync>],
        slot: InventorySlot,
        new: Option<&ItemStack>,
        old: Option<&ItemStack>,
    ) {
        for observer in observers.iter_mut() {
            observer.slot_changed(slot, new, old);
        }
    }
}

impl fmt::Debug for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inventory")
            .field("slots", &self.slots)
            .field("max_stack", &self.max_stack)
            .field("observers", &self.observers.len())
            .finish()
    }
}
