use async_trait::async_trait;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::items::ItemTemplateId;

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
pub struct CharacterId(pub u32);

#[derive(Debug, Clone)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub level: u8,

    pub map: u16,
    pub position_x: f32,
    pub position_y: f32,
}

/// One persisted inventory entry. The slot is stored explicitly so that
/// item placement survives a relog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRecord {
    pub slot: u32,
    pub template: ItemTemplateId,
    pub amount: u8,
}

/// Errors that may occur when running character operations.
#[derive(Error, Debug)]
pub enum CharacterServiceError {
    #[error("no such character {0:?}")]
    NoSuchCharacter(CharacterId),
    #[error("no character named {0:?}")]
    NoSuchName(String),
    #[error("persistence error {0:?}")]
    PersistError(String),
}

#[async_trait]
pub trait CharacterService {
    async fn get(&self, id: CharacterId) -> Result<Character, CharacterServiceError>;
    async fn get_by_name(&self, name: &str) -> Result<Character, CharacterServiceError>;
    async fn inventory(&self, id: CharacterId) -> Result<Vec<ItemRecord>, CharacterServiceError>;
    async fn save_inventory(
        &self,
        id: CharacterId,
        items: &[ItemRecord],
    ) -> Result<(), CharacterServiceError>;
}
