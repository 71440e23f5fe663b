use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use sqlx::Type;

/// The largest number of units a single stack may hold.
pub const MAX_STACK_SIZE: u8 = 99;

#[derive(
    Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Clone, Copy, From, Into, Serialize,
    Deserialize,
)]
#[sqlx(transparent)]
pub struct ItemId(pub u64);

#[derive(
    Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Clone, Copy, From, Into, Serialize,
    Deserialize,
)]
#[sqlx(transparent)]
pub struct ItemTemplateId(pub u32);

/// Hands out world-unique item ids. Cloned handles share one counter, so
/// the server constructs a single `ItemIds` at startup and passes copies
/// to every container that needs to mint items.
#[derive(Debug, Clone)]
pub struct ItemIds(Arc<AtomicU64>);

impl ItemIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Resume numbering above the highest persisted id.
    pub fn starting_at(next: u64) -> Self {
        Self(Arc::new(AtomicU64::new(next)))
    }

    pub fn next(&self) -> ItemId {
        ItemId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ItemIds {
    fn default() -> Self {
        Self::new()
    }
}

/// A quantity of identical items occupying one inventory slot.
///
/// A stack is owned by exactly one place at a time: a container slot, or
/// the caller it was returned to. Dropping a stack is disposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    id: ItemId,
    template: ItemTemplateId,
    amount: u8,
}

impl ItemStack {
    pub fn new(id: ItemId, template: ItemTemplateId, amount: u8) -> Self {
        Self {
            id,
            template,
            amount,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn template(&self) -> ItemTemplateId {
        self.template
    }

    pub fn amount(&self) -> u8 {
        self.amount
    }

    /// Whether `other` holds the same kind of item and may share a slot.
    pub fn can_stack(&self, other: &ItemStack) -> bool {
        self.template == other.template
    }

    pub(crate) fn set_amount(&mut self, amount: u8) {
        self.amount = amount;
    }

    /// Deep copy with its own identity, holding `amount` units.
    pub(crate) fn copy_with_amount(&self, id: ItemId, amount: u8) -> ItemStack {
        ItemStack {
            id,
            template: self.template,
            amount,
        }
    }
}
