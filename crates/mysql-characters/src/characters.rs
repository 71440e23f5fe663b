use async_trait::async_trait;
use riftvale_game::characters::{
    Character, CharacterId, CharacterService, CharacterServiceError, ItemRecord,
};
use sqlx::{mysql::MySqlRow, MySqlPool, Row};
use tracing::debug;

pub struct MySQLCharacterService {
    pool: MySqlPool,
}

impl MySQLCharacterService {
    pub fn new(pool: MySqlPool) -> Self {
        debug!("Starting character service");
        Self { pool }
    }
}

fn character(row: &MySqlRow) -> Result<Character, sqlx::Error> {
    Ok(Character {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        level: row.try_get("level")?,
        map: row.try_get("map")?,
        position_x: row.try_get("position_x")?,
        position_y: row.try_get("position_y")?,
    })
}

fn persist_error(e: sqlx::Error) -> CharacterServiceError {
    CharacterServiceError::PersistError(e.to_string())
}

#[async_trait]
impl CharacterService for MySQLCharacterService {
    async fn get(&self, id: CharacterId) -> Result<Character, CharacterServiceError> {
        let row = sqlx::query(
            "SELECT id, name, level, map, position_x, position_y FROM characters WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persist_error)?
        .ok_or(CharacterServiceError::NoSuchCharacter(id))?;
        character(&row).map_err(persist_error)
    }

    async fn get_by_name(&self, name: &str) -> Result<Character, CharacterServiceError> {
        let row = sqlx::query(
            "SELECT id, name, level, map, position_x, position_y FROM characters WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(persist_error)?
        .ok_or_else(|| CharacterServiceError::NoSuchName(name.to_owned()))?;
        character(&row).map_err(persist_error)
    }

    async fn inventory(&self, id: CharacterId) -> Result<Vec<ItemRecord>, CharacterServiceError> {
        let rows = sqlx::query(
            "SELECT slot, template, amount FROM character_inventory WHERE character_id = ? ORDER BY slot",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(persist_error)?;

        rows.iter()
            .map(|row| {
                Ok(ItemRecord {
                    slot: row.try_get("slot")?,
                    template: row.try_get("template")?,
                    amount: row.try_get("amount")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(persist_error)
    }

    async fn save_inventory(
        &self,
        id: CharacterId,
        items: &[ItemRecord],
    ) -> Result<(), CharacterServiceError> {
        let mut tx = self.pool.begin().await.map_err(persist_error)?;

        sqlx::query("DELETE FROM character_inventory WHERE character_id = ?")
            .bind(id)
            .execute(&mut tx)
            .await
            .map_err(persist_error)?;

        for item in items {
            sqlx::query(
                "INSERT INTO character_inventory (character_id, slot, template, amount) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(item.slot)
            .bind(item.template)
            .bind(item.amount)
            .execute(&mut tx)
            .await
            .map_err(persist_error)?;
        }

        tx.commit().await.map_err(persist_error)
    }
}
