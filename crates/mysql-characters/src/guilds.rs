use async_trait::async_trait;
use riftvale_game::{
    characters::CharacterId,
    guilds::{GuildId, GuildLogEntry, GuildRank, GuildRecord, GuildService, GuildServiceError},
};
use sqlx::{MySqlPool, Row};
use tracing::debug;

pub struct MySQLGuildService {
    pool: MySqlPool,
}

impl MySQLGuildService {
    pub fn new(pool: MySqlPool) -> Self {
        debug!("Starting guild service");
        Self { pool }
    }
}

fn persist_error(e: sqlx::Error) -> GuildServiceError {
    GuildServiceError::PersistError(e.to_string())
}

#[async_trait]
impl GuildService for MySQLGuildService {
    async fn guilds(&self) -> Result<Vec<GuildRecord>, GuildServiceError> {
        let rows = sqlx::query("SELECT id, name, tag, created FROM guild")
            .fetch_all(&self.pool)
            .await
            .map_err(persist_error)?;

        rows.iter()
            .map(|row| {
                Ok(GuildRecord {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    tag: row.try_get("tag")?,
                    created: row.try_get("created")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(persist_error)
    }

    async fn create(&self, guild: &GuildRecord) -> Result<(), GuildServiceError> {
        sqlx::query("INSERT INTO guild (id, name, tag, created) VALUES (?, ?, ?, ?)")
            .bind(guild.id)
            .bind(&guild.name)
            .bind(&guild.tag)
            .bind(guild.created)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(persist_error)
    }

    async fn delete(&self, id: GuildId) -> Result<(), GuildServiceError> {
        let mut tx = self.pool.begin().await.map_err(persist_error)?;

        sqlx::query("DELETE FROM guild_member WHERE guild_id = ?")
            .bind(id)
            .execute(&mut tx)
            .await
            .map_err(persist_error)?;
        sqlx::query("DELETE FROM guild WHERE id = ?")
            .bind(id)
            .execute(&mut tx)
            .await
            .map_err(persist_error)?;

        tx.commit().await.map_err(persist_error)
    }

    async fn rename(&self, id: GuildId, name: &str, tag: &str) -> Result<(), GuildServiceError> {
        let result = sqlx::query("UPDATE guild SET name = ?, tag = ? WHERE id = ?")
            .bind(name)
            .bind(tag)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(persist_error)?;

        if result.rows_affected() == 0 {
            return Err(GuildServiceError::NoSuchGuild(id));
        }
        Ok(())
    }

    async fn set_member(
        &self,
        member: CharacterId,
        guild: Option<(GuildId, GuildRank)>,
    ) -> Result<(), GuildServiceError> {
        match guild {
            Some((id, rank)) => sqlx::query(
                "INSERT INTO guild_member (character_id, guild_id, `rank`) VALUES (?, ?, ?) \
                 ON DUPLICATE KEY UPDATE guild_id = VALUES(guild_id), `rank` = VALUES(`rank`)",
            )
            .bind(member)
            .bind(id)
            .bind(u8::from(rank))
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(persist_error),
            None => sqlx::query("DELETE FROM guild_member WHERE character_id = ?")
                .bind(member)
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(persist_error),
        }
    }

    async fn append_log(
        &self,
        id: GuildId,
        entry: &GuildLogEntry,
    ) -> Result<(), GuildServiceError> {
        sqlx::query(
            "INSERT INTO guild_log (guild_id, time, actor, action, target, detail) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(entry.time)
        .bind(entry.actor)
        .bind(u8::from(entry.action))
        .bind(entry.target)
        .bind(entry.detail.as_deref())
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(persist_error)
    }
}
