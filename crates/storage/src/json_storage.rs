//! JSON file storage implementation.
//!
//! Stores data as JSON files under a data directory and keeps small per-object
//! meta markers (version + updated_at). Subgoals of one goal share a single
//! file so replacing them is one write; progress history is kept the same way.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use neurocoach_core::{
    sort_history, sort_subgoals, Achievement, CoachingSession, DedupKey, Goal, GoalId,
    ProgressEntry, SessionId, Subgoal, SubgoalId, UserId,
};
use tokio::fs;
use tracing::warn;

use super::{Result, Storage};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage, creating the data subdirectories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        for kind in ["goals", "subgoals", "achievements", "history", "sessions"] {
            fs::create_dir_all(root.join(kind)).await?;
            fs::create_dir_all(root.join("meta").join(kind)).await?;
        }

        Ok(Self { root })
    }

    /// Root of the data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn goal_path(&self, id: GoalId) -> PathBuf {
        self.root.join("goals").join(format!("{}.json", id))
    }
    fn subgoals_path(&self, goal_id: GoalId) -> PathBuf {
        self.root.join("subgoals").join(format!("{}.json", goal_id))
    }
    fn history_path(&self, goal_id: GoalId) -> PathBuf {
        self.root.join("history").join(format!("{}.json", goal_id))
    }
    fn achievement_path(&self, achievement: &Achievement) -> PathBuf {
        self.root
            .join("achievements")
            .join(format!("{}.json", achievement.id))
    }
    fn session_path(&self, id: SessionId) -> PathBuf {
        self.root.join("sessions").join(format!("{}.json", id))
    }

    fn meta_path(&self, kind: &str, id: &str) -> PathBuf {
        self.root
            .join("meta")
            .join(kind)
            .join(format!("{}.meta.json", id))
    }

    /// Read and increment per-object version, return new version.
    async fn bump_version(&self, kind: &str, id: &str) -> Result<u64> {
        let path = self.meta_path(kind, id);
        let mut version = 0u64;
        if let Ok(s) = fs::read_to_string(&path).await {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&s) {
                if let Some(v) = json.get("version").and_then(|v| v.as_u64()) {
                    version = v;
                }
            }
        }
        version += 1;
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        write_json(&path, &meta).await?;
        Ok(version)
    }

    async fn remove_meta(&self, kind: &str, id: &str) -> Result<()> {
        remove_if_exists(&self.meta_path(kind, id)).await
    }

    /// Every stored subgoal list, one per goal.
    async fn all_subgoal_lists(&self) -> Result<Vec<Vec<Subgoal>>> {
        list_dir(&self.root.join("subgoals")).await
    }

    async fn write_subgoals(&self, goal_id: GoalId, subgoals: &mut Vec<Subgoal>) -> Result<()> {
        sort_subgoals(subgoals);
        let path = self.subgoals_path(goal_id);
        if subgoals.is_empty() {
            remove_if_exists(&path).await?;
        } else {
            write_json(&path, subgoals).await?;
        }
        self.bump_version("subgoals", &goal_id.to_string()).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn save_goal(&mut self, goal: &Goal) -> Result<()> {
        write_json(&self.goal_path(goal.id), goal).await?;
        self.bump_version("goals", &goal.id.to_string()).await?;
        Ok(())
    }

    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        read_json(&self.goal_path(id)).await
    }

    async fn list_goals(&self, user_id: &UserId) -> Result<Vec<Goal>> {
        let all: Vec<Goal> = list_dir(&self.root.join("goals")).await?;
        let mut goals: Vec<Goal> = all
            .into_iter()
            .filter(|g| &g.user_id == user_id)
            .collect();
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    async fn delete_goal(&mut self, id: GoalId) -> Result<()> {
        let id_str = id.to_string();
        remove_if_exists(&self.subgoals_path(id)).await?;
        self.remove_meta("subgoals", &id_str).await?;
        remove_if_exists(&self.history_path(id)).await?;
        self.remove_meta("history", &id_str).await?;
        remove_if_exists(&self.goal_path(id)).await?;
        self.remove_meta("goals", &id_str).await?;
        Ok(())
    }

    async fn save_subgoal(&mut self, subgoal: &Subgoal) -> Result<()> {
        let mut subgoals = self.load_subgoals(subgoal.goal_id).await?;
        match subgoals.iter_mut().find(|s| s.id == subgoal.id) {
            Some(existing) => *existing = subgoal.clone(),
            None => subgoals.push(subgoal.clone()),
        }
        self.write_subgoals(subgoal.goal_id, &mut subgoals).await
    }

    async fn load_subgoal(&self, id: SubgoalId) -> Result<Option<Subgoal>> {
        Ok(self
            .all_subgoal_lists()
            .await?
            .into_iter()
            .flatten()
            .find(|s| s.id == id))
    }

    async fn load_subgoals(&self, goal_id: GoalId) -> Result<Vec<Subgoal>> {
        let mut subgoals: Vec<Subgoal> = read_json(&self.subgoals_path(goal_id))
            .await?
            .unwrap_or_default();
        sort_subgoals(&mut subgoals);
        Ok(subgoals)
    }

    async fn delete_subgoal(&mut self, id: SubgoalId) -> Result<()> {
        let Some(subgoal) = self.load_subgoal(id).await? else {
            return Ok(());
        };
        let mut subgoals = self.load_subgoals(subgoal.goal_id).await?;
        subgoals.retain(|s| s.id != id);
        self.write_subgoals(subgoal.goal_id, &mut subgoals).await
    }

    async fn replace_subgoals(
        &mut self,
        goal_id: GoalId,
        mut subgoals: Vec<Subgoal>,
    ) -> Result<Vec<Subgoal>> {
        self.write_subgoals(goal_id, &mut subgoals).await?;
        Ok(subgoals)
    }

    async fn find_achievement(
        &self,
        user_id: &UserId,
        key: &DedupKey,
    ) -> Result<Option<Achievement>> {
        let all: Vec<Achievement> = list_dir(&self.root.join("achievements")).await?;
        Ok(all
            .into_iter()
            .find(|a| &a.user_id == user_id && &a.dedup_key == key))
    }

    async fn create_achievement(&mut self, achievement: &Achievement) -> Result<Achievement> {
        if let Some(existing) = self
            .find_achievement(&achievement.user_id, &achievement.dedup_key)
            .await?
        {
            return Ok(existing);
        }
        write_json(&self.achievement_path(achievement), achievement).await?;
        self.bump_version("achievements", &achievement.id.to_string())
            .await?;
        Ok(achievement.clone())
    }

    async fn list_achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>> {
        let all: Vec<Achievement> = list_dir(&self.root.join("achievements")).await?;
        let mut achievements: Vec<Achievement> = all
            .into_iter()
            .filter(|a| &a.user_id == user_id)
            .collect();
        achievements.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));
        Ok(achievements)
    }

    async fn record_progress(&mut self, entry: &ProgressEntry) -> Result<()> {
        let path = self.history_path(entry.goal_id);
        let mut entries: Vec<ProgressEntry> = read_json(&path).await?.unwrap_or_default();
        entries.push(entry.clone());
        write_json(&path, &entries).await?;
        self.bump_version("history", &entry.goal_id.to_string())
            .await?;
        Ok(())
    }

    async fn progress_history(
        &self,
        user_id: &UserId,
        goal_id: Option<GoalId>,
    ) -> Result<Vec<ProgressEntry>> {
        let lists: Vec<Vec<ProgressEntry>> = match goal_id {
            Some(id) => read_json::<Vec<ProgressEntry>>(&self.history_path(id))
                .await?
                .into_iter()
                .collect(),
            None => list_dir(&self.root.join("history")).await?,
        };
        let mut entries: Vec<ProgressEntry> = lists
            .into_iter()
            .flatten()
            .filter(|e| &e.user_id == user_id)
            .collect();
        sort_history(&mut entries);
        Ok(entries)
    }

    async fn save_session(&mut self, session: &CoachingSession) -> Result<()> {
        write_json(&self.session_path(session.id), session).await?;
        self.bump_version("sessions", &session.id.to_string()).await?;
        Ok(())
    }

    async fn load_session(&self, id: SessionId) -> Result<Option<CoachingSession>> {
        read_json(&self.session_path(id)).await
    }

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<CoachingSession>> {
        let all: Vec<CoachingSession> = list_dir(&self.root.join("sessions")).await?;
        let mut sessions: Vec<CoachingSession> = all
            .into_iter()
            .filter(|s| &s.user_id == user_id)
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

/// Write through a temp file and rename, so readers never see half a file.
async fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&path).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!("Skipping unreadable file {}: {}", path.display(), e),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocoach_core::{AchievementKind, GoalDraft, SessionType, SubgoalDraft, SubgoalStatus};

    async fn storage() -> (tempfile::TempDir, JsonStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_goal_round_trip_and_listing() {
        let (_dir, mut storage) = storage().await;
        let user = UserId::new("u1");
        let goal = Goal::new(user.clone(), GoalDraft::new("Learn Rust"));
        let other = Goal::new(UserId::new("u2"), GoalDraft::new("Not mine"));
        storage.save_goal(&goal).await.unwrap();
        storage.save_goal(&other).await.unwrap();

        let loaded = storage.load_goal(goal.id).await.unwrap().unwrap();
        assert_eq!(loaded, goal);

        let listed = storage.list_goals(&user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, goal.id);
    }

    #[tokio::test]
    async fn test_subgoals_keep_order_and_support_updates() {
        let (_dir, mut storage) = storage().await;
        let goal = Goal::new(UserId::new("u1"), GoalDraft::new("Write a book"));
        storage.save_goal(&goal).await.unwrap();

        let second = Subgoal::from_draft(goal.id, SubgoalDraft::new("Draft", None), 1);
        let first = Subgoal::from_draft(goal.id, SubgoalDraft::new("Outline", None), 0);
        storage.save_subgoal(&second).await.unwrap();
        storage.save_subgoal(&first).await.unwrap();

        let mut updated = first.clone();
        updated.status = SubgoalStatus::Completed;
        storage.save_subgoal(&updated).await.unwrap();

        let subgoals = storage.load_subgoals(goal.id).await.unwrap();
        let titles: Vec<_> = subgoals.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Outline", "Draft"]);
        assert_eq!(subgoals[0].status, SubgoalStatus::Completed);

        storage.delete_subgoal(first.id).await.unwrap();
        assert_eq!(storage.load_subgoals(goal.id).await.unwrap().len(), 1);
        assert_eq!(
            storage.load_subgoal(second.id).await.unwrap().unwrap().title,
            "Draft"
        );
    }

    #[tokio::test]
    async fn test_replace_and_cascade_delete() {
        let (_dir, mut storage) = storage().await;
        let goal = Goal::new(UserId::new("u1"), GoalDraft::new("Move abroad"));
        storage.save_goal(&goal).await.unwrap();
        storage
            .save_subgoal(&Subgoal::from_draft(goal.id, SubgoalDraft::new("Old", None), 0))
            .await
            .unwrap();

        let fresh = vec![
            Subgoal::from_draft(goal.id, SubgoalDraft::new("Visa", None), 0),
            Subgoal::from_draft(goal.id, SubgoalDraft::new("Housing", None), 1),
        ];
        let stored = storage.replace_subgoals(goal.id, fresh).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(storage.load_subgoals(goal.id).await.unwrap(), stored);

        storage.delete_goal(goal.id).await.unwrap();
        assert!(storage.load_goal(goal.id).await.unwrap().is_none());
        assert!(storage.load_subgoals(goal.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_achievement_dedup_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserId::new("u1");
        let key = DedupKey::Title("First goal".into());
        let first = {
            let mut storage = JsonStorage::new(dir.path()).await.unwrap();
            let a = Achievement::new(user.clone(), AchievementKind::FirstGoal, key.clone(), "First goal", "", "🎯", 10);
            storage.create_achievement(&a).await.unwrap()
        };

        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let again = Achievement::new(user.clone(), AchievementKind::FirstGoal, key.clone(), "First goal", "", "🎯", 10);
        let stored = storage.create_achievement(&again).await.unwrap();

        assert_eq!(stored.id, first.id);
        assert_eq!(storage.list_achievements(&user).await.unwrap().len(), 1);
        assert!(storage.find_achievement(&user, &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_progress_history_persists_per_goal() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserId::new("u1");
        let goal = Goal::new(user.clone(), GoalDraft::new("Run 10k"));
        let other = Goal::new(user.clone(), GoalDraft::new("Swim"));
        {
            let mut storage = JsonStorage::new(dir.path()).await.unwrap();
            for progress in [20, 40] {
                storage
                    .record_progress(&ProgressEntry::new(goal.id, user.clone(), progress))
                    .await
                    .unwrap();
            }
            storage
                .record_progress(&ProgressEntry::new(other.id, user.clone(), 5))
                .await
                .unwrap();
        }

        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let values: Vec<u8> = storage
            .progress_history(&user, Some(goal.id))
            .await
            .unwrap()
            .iter()
            .map(|e| e.progress)
            .collect();
        assert_eq!(values, [20, 40]);
        assert_eq!(storage.progress_history(&user, None).await.unwrap().len(), 3);
        assert!(storage
            .progress_history(&UserId::new("u2"), None)
            .await
            .unwrap()
            .is_empty());

        storage.delete_goal(goal.id).await.unwrap();
        assert!(storage
            .progress_history(&user, Some(goal.id))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_sessions() {
        let (_dir, mut storage) = storage().await;
        let user = UserId::new("u1");
        let mut session = CoachingSession::new(user.clone(), SessionType::ProgressReview, "Weekly");
        session.push(neurocoach_core::Role::User, "Hi");
        storage.save_session(&session).await.unwrap();

        assert_eq!(storage.load_session(session.id).await.unwrap().unwrap(), session);
        assert_eq!(storage.list_sessions(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_meta_version_is_bumped() {
        let (_dir, mut storage) = storage().await;
        let goal = Goal::new(UserId::new("u1"), GoalDraft::new("Versioned"));
        storage.save_goal(&goal).await.unwrap();
        storage.save_goal(&goal).await.unwrap();
        let version = storage
            .bump_version("goals", &goal.id.to_string())
            .await
            .unwrap();
        assert_eq!(version, 3);
    }
}
