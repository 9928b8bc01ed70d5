//! SQLite storage backend.
//!
//! Entities are stored as JSON documents in one table, keyed by id and owner
//! so listings stay indexed. Achievements get their own table with a unique
//! `(user_id, dedup_key)` index, which turns the dedup check into an
//! insert-if-not-exists. Progress history is a plain append-only table.

use std::path::Path;

use async_trait::async_trait;
use neurocoach_core::{
    Achievement, CoachingSession, DedupKey, Goal, GoalId, GoalStatus, ProgressEntry, SessionId,
    Subgoal, SubgoalId, UserId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::trait_::{Result, Storage, StorageError};

const GOAL: &str = "goal";
const SUBGOAL: &str = "subgoal";
const SESSION: &str = "session";

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if missing) a database file.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = sqlx::SqlitePool::connect_with(options).await?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create an in-memory SQLite storage for testing.
    pub async fn in_memory() -> Result<Self> {
        // One connection, otherwise every pooled connection sees its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                entity_type TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                status TEXT,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS achievements (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                dedup_key TEXT NOT NULL,
                data TEXT NOT NULL,
                earned_at TEXT NOT NULL,
                UNIQUE (user_id, dedup_key)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS progress_history (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                goal_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                progress INTEGER NOT NULL,
                recorded_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_user ON progress_history(user_id, goal_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entities_owner ON entities(entity_type, owner_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert(
        &self,
        id: String,
        entity_type: &str,
        owner_id: String,
        position: i64,
        status: Option<&str>,
        data: String,
        created_at: String,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO entities
                (id, entity_type, owner_id, position, status, data, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(entity_type)
        .bind(owner_id)
        .bind(position)
        .bind(status)
        .bind(data)
        .bind(created_at)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_one<T: serde::de::DeserializeOwned>(
        &self,
        id: String,
        entity_type: &str,
    ) -> Result<Option<T>> {
        let row = sqlx::query("SELECT data FROM entities WHERE id = ? AND entity_type = ?")
            .bind(id)
            .bind(entity_type)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| decode(&row)).transpose()
    }

    async fn load_owned<T: serde::de::DeserializeOwned>(
        &self,
        owner_id: String,
        entity_type: &str,
        order: &str,
    ) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT data FROM entities WHERE entity_type = ? AND owner_id = ? ORDER BY {order}"
        );
        let rows = sqlx::query(&sql)
            .bind(entity_type)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode).collect()
    }
}

fn decode<T: serde::de::DeserializeOwned>(row: &SqliteRow) -> Result<T> {
    let data: String = row.try_get("data")?;
    Ok(serde_json::from_str(&data)?)
}

fn decode_entry(row: &SqliteRow) -> Result<ProgressEntry> {
    let goal_id: String = row.try_get("goal_id")?;
    let user_id: String = row.try_get("user_id")?;
    let progress: i64 = row.try_get("progress")?;
    Ok(ProgressEntry {
        goal_id: goal_id
            .parse()
            .map_err(|e| StorageError::Other(format!("bad goal id {goal_id}: {e}")))?,
        user_id: UserId::new(user_id),
        progress: u8::try_from(progress)
            .map_err(|_| StorageError::Other(format!("bad progress value {progress}")))?,
        recorded_at: row.try_get("recorded_at")?,
    })
}

#[async_trait]
impl Storage for SqliteStorage {
    // === Goal operations ===

    async fn save_goal(&mut self, goal: &Goal) -> Result<()> {
        self.upsert(
            goal.id.to_string(),
            GOAL,
            goal.user_id.to_string(),
            0,
            Some(goal.status.as_str()),
            serde_json::to_string(goal)?,
            goal.created_at.to_rfc3339(),
        )
        .await
    }

    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        self.load_one(id.to_string(), GOAL).await
    }

    async fn list_goals(&self, user_id: &UserId) -> Result<Vec<Goal>> {
        self.load_owned(user_id.to_string(), GOAL, "created_at DESC")
            .await
    }

    async fn delete_goal(&mut self, id: GoalId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM entities WHERE entity_type = ? AND owner_id = ?")
            .bind(SUBGOAL)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM entities WHERE entity_type = ? AND id = ?")
            .bind(GOAL)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM progress_history WHERE goal_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn count_goals(&self, user_id: &UserId) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM entities WHERE entity_type = ? AND owner_id = ?",
        )
        .bind(GOAL)
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as usize)
    }

    async fn count_completed_goals(&self, user_id: &UserId) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM entities WHERE entity_type = ? AND owner_id = ? AND status = ?",
        )
        .bind(GOAL)
        .bind(user_id.to_string())
        .bind(GoalStatus::Completed.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as usize)
    }

    // === Subgoal operations ===

    async fn save_subgoal(&mut self, subgoal: &Subgoal) -> Result<()> {
        self.upsert(
            subgoal.id.to_string(),
            SUBGOAL,
            subgoal.goal_id.to_string(),
            subgoal.order_index as i64,
            Some(subgoal.status.as_str()),
            serde_json::to_string(subgoal)?,
            subgoal.created_at.to_rfc3339(),
        )
        .await
    }

    async fn load_subgoal(&self, id: SubgoalId) -> Result<Option<Subgoal>> {
        self.load_one(id.to_string(), SUBGOAL).await
    }

    async fn load_subgoals(&self, goal_id: GoalId) -> Result<Vec<Subgoal>> {
        self.load_owned(goal_id.to_string(), SUBGOAL, "position ASC, created_at ASC")
            .await
    }

    async fn delete_subgoal(&mut self, id: SubgoalId) -> Result<()> {
        sqlx::query("DELETE FROM entities WHERE entity_type = ? AND id = ?")
            .bind(SUBGOAL)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn replace_subgoals(
        &mut self,
        goal_id: GoalId,
        subgoals: Vec<Subgoal>,
    ) -> Result<Vec<Subgoal>> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM entities WHERE entity_type = ? AND owner_id = ?")
            .bind(SUBGOAL)
            .bind(goal_id.to_string())
            .execute(&mut *tx)
            .await?;
        for subgoal in &subgoals {
            sqlx::query(
                "INSERT INTO entities
                    (id, entity_type, owner_id, position, status, data, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(subgoal.id.to_string())
            .bind(SUBGOAL)
            .bind(goal_id.to_string())
            .bind(subgoal.order_index as i64)
            .bind(subgoal.status.as_str())
            .bind(serde_json::to_string(subgoal)?)
            .bind(subgoal.created_at.to_rfc3339())
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        self.load_subgoals(goal_id).await
    }

    // === Achievement operations ===

    async fn find_achievement(
        &self,
        user_id: &UserId,
        key: &DedupKey,
    ) -> Result<Option<Achievement>> {
        let row = sqlx::query("SELECT data FROM achievements WHERE user_id = ? AND dedup_key = ?")
            .bind(user_id.to_string())
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| decode(&row)).transpose()
    }

    async fn create_achievement(&mut self, achievement: &Achievement) -> Result<Achievement> {
        sqlx::query(
            "INSERT OR IGNORE INTO achievements (id, user_id, dedup_key, data, earned_at)
            VALUES (?, ?, ?, ?, ?)",
        )
        .bind(achievement.id.to_string())
        .bind(achievement.user_id.to_string())
        .bind(achievement.dedup_key.to_string())
        .bind(serde_json::to_string(achievement)?)
        .bind(achievement.earned_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.find_achievement(&achievement.user_id, &achievement.dedup_key)
            .await?
            .ok_or_else(|| {
                StorageError::Other(format!(
                    "achievement {} vanished after insert",
                    achievement.dedup_key
                ))
            })
    }

    async fn list_achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>> {
        let rows = sqlx::query("SELECT data FROM achievements WHERE user_id = ? ORDER BY earned_at DESC")
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode).collect()
    }

    // === Progress history ===

    async fn record_progress(&mut self, entry: &ProgressEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO progress_history (goal_id, user_id, progress, recorded_at)
            VALUES (?, ?, ?, ?)",
        )
        .bind(entry.goal_id.to_string())
        .bind(entry.user_id.to_string())
        .bind(i64::from(entry.progress))
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn progress_history(
        &self,
        user_id: &UserId,
        goal_id: Option<GoalId>,
    ) -> Result<Vec<ProgressEntry>> {
        let rows = sqlx::query(
            "SELECT goal_id, user_id, progress, recorded_at FROM progress_history
            WHERE user_id = ? AND (? IS NULL OR goal_id = ?)
            ORDER BY recorded_at ASC, seq ASC",
        )
        .bind(user_id.to_string())
        .bind(goal_id.map(|id| id.to_string()))
        .bind(goal_id.map(|id| id.to_string()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_entry).collect()
    }

    // === Session operations ===

    async fn save_session(&mut self, session: &CoachingSession) -> Result<()> {
        let status = match session.status {
            neurocoach_core::SessionStatus::Active => "active",
            neurocoach_core::SessionStatus::Completed => "completed",
        };
        self.upsert(
            session.id.to_string(),
            SESSION,
            session.user_id.to_string(),
            0,
            Some(status),
            serde_json::to_string(session)?,
            session.created_at.to_rfc3339(),
        )
        .await
    }

    async fn load_session(&self, id: SessionId) -> Result<Option<CoachingSession>> {
        self.load_one(id.to_string(), SESSION).await
    }

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<CoachingSession>> {
        self.load_owned(user_id.to_string(), SESSION, "created_at DESC")
            .await
    }
}
