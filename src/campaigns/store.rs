//! SQLite-backed campaign table.
//!
//! Table:
//! - `campaign`: id, user_id, name, description, status, data, meta,
//!   created_at, updated_at, revision
//!
//! Timestamps are wall-clock seconds. `revision` is a table-wide counter
//! bumped on every insert and update; it orders mutations that land within
//! the same second.
//!
//! Every operation comes in two forms. The method on [`CampaignStore`] borrows
//! a pooled connection for the length of the call. The `*_with` associated
//! function runs on a caller-supplied [`Connection`]; pass a
//! `rusqlite::Transaction` to group several operations atomically.

use super::model::{Campaign, CampaignForm, CampaignStatus, CampaignUpdateForm};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the campaign database.
const DEFAULT_DB_PATH: &str = "~/.campaign-kit/campaigns.db";

/// Default number of pooled SQLite connections.
const DEFAULT_POOL_SIZE: u32 = 4;

/// Default SQLite busy timeout (milliseconds).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Next value of the table-wide mutation counter.
const NEXT_REVISION: &str = "(SELECT COALESCE(MAX(revision), 0) + 1 FROM campaign)";

const SELECT_COLUMNS: &str =
    "id, user_id, name, description, status, data, meta, created_at, updated_at";

pub type Pool = r2d2::Pool<SqliteConnectionManager>;

type JsonObject = serde_json::Map<String, serde_json::Value>;

pub type StoreResult<T> = Result<T, StoreError>;

// ── Errors ──────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("campaign not found: {0}")]
    NotFound(String),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("failed to encode campaign JSON field: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// ── Configuration ───────────────────────────────────────────────

/// Connection settings for the campaign database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. A leading `~` is expanded.
    pub db_path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).into_owned())
    }
}

// ── Store ───────────────────────────────────────────────────────

/// Pool-backed accessor for the `campaign` table.
#[derive(Clone)]
pub struct CampaignStore {
    pool: Pool,
}

impl CampaignStore {
    /// Open (or create) the campaign database described by `config`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let db_path = config.resolved_db_path();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = SqliteConnectionManager::file(&db_path).with_init(move |conn| {
            // WAL mode for concurrent reads + crash safety
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )?;
            conn.busy_timeout(busy_timeout)
        });

        let pool = r2d2::Pool::builder()
            .max_size(config.pool_size.max(1))
            .build(manager)?;

        tracing::debug!(path = %db_path.display(), "Campaign store opened");
        Self::from_pool(pool)
    }

    /// Wrap an existing pool, creating the schema if needed.
    pub fn from_pool(pool: Pool) -> StoreResult<Self> {
        let conn = pool.get()?;
        Self::init_schema(&conn)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    fn conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Create the `campaign` table and its indexes (safe to call repeatedly).
    pub fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS campaign (
                id          TEXT PRIMARY KEY NOT NULL,
                user_id     TEXT NOT NULL,
                name        TEXT NOT NULL,
                description TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'draft',
                data        TEXT,
                meta        TEXT,
                created_at  INTEGER NOT NULL,
                updated_at  INTEGER NOT NULL,
                revision    INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_campaign_user_id ON campaign(user_id);
            CREATE INDEX IF NOT EXISTS idx_campaign_updated_at ON campaign(updated_at, revision);",
        )?;
        Ok(())
    }

    // ── Create ──────────────────────────────────────────────────

    /// Insert a new campaign owned by `user_id`.
    pub fn insert_new_campaign(&self, user_id: &str, form: CampaignForm) -> StoreResult<Campaign> {
        let conn = self.conn()?;
        Self::insert_with(&conn, user_id, form)
    }

    pub fn insert_with(conn: &Connection, user_id: &str, form: CampaignForm) -> StoreResult<Campaign> {
        let now = epoch_secs();
        let campaign = Campaign {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: form.name,
            description: form.description,
            status: form.status.unwrap_or_default(),
            data: form.data,
            meta: form.meta,
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            &format!(
                "INSERT INTO campaign
                    (id, user_id, name, description, status, data, meta, created_at, updated_at, revision)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, {NEXT_REVISION})"
            ),
            params![
                campaign.id,
                campaign.user_id,
                campaign.name,
                campaign.description,
                campaign.status,
                encode_json(campaign.data.as_ref())?,
                encode_json(campaign.meta.as_ref())?,
                campaign.created_at,
                campaign.updated_at,
            ],
        )?;

        tracing::info!(campaign_id = %campaign.id, user_id = user_id, "Campaign created");
        Ok(campaign)
    }

    // ── Read ────────────────────────────────────────────────────

    /// All campaigns, most recently updated first.
    pub fn get_campaigns(&self) -> StoreResult<Vec<Campaign>> {
        let conn = self.conn()?;
        Self::list_with(&conn)
    }

    pub fn list_with(conn: &Connection) -> StoreResult<Vec<Campaign>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM campaign
             ORDER BY updated_at DESC, revision DESC, id"
        ))?;
        let campaigns = stmt
            .query_map([], row_to_campaign)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(campaigns)
    }

    /// Campaigns owned by `user_id`, most recently updated first.
    pub fn get_campaigns_by_user_id(&self, user_id: &str) -> StoreResult<Vec<Campaign>> {
        let conn = self.conn()?;
        Self::list_by_user_with(&conn, user_id)
    }

    pub fn list_by_user_with(conn: &Connection, user_id: &str) -> StoreResult<Vec<Campaign>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM campaign
             WHERE user_id = ?1
             ORDER BY updated_at DESC, revision DESC, id"
        ))?;
        let campaigns = stmt
            .query_map(params![user_id], row_to_campaign)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(campaigns)
    }

    /// Look up one campaign. Missing rows are [`StoreError::NotFound`].
    pub fn get_campaign_by_id(&self, id: &str) -> StoreResult<Campaign> {
        let conn = self.conn()?;
        Self::get_with(&conn, id)
    }

    pub fn get_with(conn: &Connection, id: &str) -> StoreResult<Campaign> {
        conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM campaign WHERE id = ?1"),
            params![id],
            row_to_campaign,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Presence-only lookup: storage faults are logged and read as `None`.
    pub fn find_campaign_by_id(&self, id: &str) -> Option<Campaign> {
        match self.get_campaign_by_id(id) {
            Ok(campaign) => Some(campaign),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(campaign_id = id, error = %e, "Campaign lookup failed");
                None
            }
        }
    }

    /// Number of stored campaigns.
    pub fn count_campaigns(&self) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM campaign", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ── Update ──────────────────────────────────────────────────

    /// Apply a partial update and return the row as stored afterwards.
    ///
    /// `updated_at` is stamped with the current time even when the form is
    /// empty, and the row moves to the front of the listings.
    pub fn update_campaign_by_id(&self, id: &str, form: CampaignUpdateForm) -> StoreResult<Campaign> {
        let result = self
            .conn()
            .and_then(|conn| Self::update_with(&conn, id, form));
        if let Err(e) = &result {
            if !e.is_not_found() {
                tracing::error!(campaign_id = id, error = %e, "Campaign update failed");
            }
        }
        result
    }

    pub fn update_with(conn: &Connection, id: &str, form: CampaignUpdateForm) -> StoreResult<Campaign> {
        if form.is_empty() {
            tracing::debug!(campaign_id = id, "Empty update; refreshing timestamp only");
        }

        let updated = conn.execute(
            &format!(
                "UPDATE campaign SET
                    name        = COALESCE(?2, name),
                    description = COALESCE(?3, description),
                    status      = COALESCE(?4, status),
                    data        = COALESCE(?5, data),
                    meta        = COALESCE(?6, meta),
                    updated_at  = ?7,
                    revision    = {NEXT_REVISION}
                 WHERE id = ?1"
            ),
            params![
                id,
                form.name,
                form.description,
                form.status,
                encode_json(form.data.as_ref())?,
                encode_json(form.meta.as_ref())?,
                epoch_secs(),
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        tracing::debug!(campaign_id = id, "Campaign updated");
        Self::get_with(conn, id)
    }

    /// Convenience for status-only transitions.
    pub fn set_status(&self, id: &str, status: CampaignStatus) -> StoreResult<Campaign> {
        self.update_campaign_by_id(
            id,
            CampaignUpdateForm {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    // ── Delete ──────────────────────────────────────────────────

    /// Remove a campaign. `Ok(false)` when no row had that id.
    pub fn delete_campaign_by_id(&self, id: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        Self::delete_with(&conn, id)
    }

    pub fn delete_with(conn: &Connection, id: &str) -> StoreResult<bool> {
        let deleted = conn.execute("DELETE FROM campaign WHERE id = ?1", params![id])?;
        if deleted > 0 {
            tracing::info!(campaign_id = id, "Campaign deleted");
        }
        Ok(deleted > 0)
    }
}

// ── Row helpers ─────────────────────────────────────────────────

fn row_to_campaign(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        data: decode_json(row, 5)?,
        meta: decode_json(row, 6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn encode_json(value: Option<&JsonObject>) -> Result<Option<String>, serde_json::Error> {
    value.map(serde_json::to_string).transpose()
}

fn decode_json(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<JsonObject>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        serde_json::from_str(&text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn object(value: serde_json::Value) -> JsonObject {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected a JSON object, got {other}"),
        }
    }

    fn test_store() -> (TempDir, CampaignStore) {
        let tmp = TempDir::new().unwrap();
        let config = StoreConfig {
            db_path: tmp.path().join("campaigns.db").display().to_string(),
            pool_size: 2,
            busy_timeout_ms: 1_000,
        };
        let store = CampaignStore::open(&config).unwrap();
        (tmp, store)
    }

    #[test]
    fn create_with_required_fields_defaults_to_draft() {
        let (_tmp, store) = test_store();

        let campaign = store
            .insert_new_campaign("user_a", CampaignForm::new("Spring", "Launch push"))
            .unwrap();

        assert!(!campaign.id.is_empty());
        assert_eq!(campaign.user_id, "user_a");
        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert!(campaign.created_at > 0);
        assert_eq!(campaign.created_at, campaign.updated_at);
        assert!(campaign.data.is_none());
    }

    #[test]
    fn create_keeps_explicit_status_and_blobs() {
        let (_tmp, store) = test_store();

        let form = CampaignForm {
            status: Some(CampaignStatus::Active),
            data: Some(object(json!({"budget": 100, "tags": ["a", "b"]}))),
            meta: Some(object(json!({"source": "import"}))),
            ..CampaignForm::new("Summer", "Sale")
        };
        let created = store.insert_new_campaign("user_a", form).unwrap();
        let stored = store.get_campaign_by_id(&created.id).unwrap();

        assert_eq!(stored, created);
        assert_eq!(stored.status, CampaignStatus::Active);
        assert_eq!(stored.data.unwrap()["budget"], 100);
    }

    #[test]
    fn create_generates_unique_ids() {
        let (_tmp, store) = test_store();

        let a = store.insert_new_campaign("u", CampaignForm::new("a", "")).unwrap();
        let b = store.insert_new_campaign("u", CampaignForm::new("b", "")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.count_campaigns().unwrap(), 2);
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_tmp, store) = test_store();

        let err = store.get_campaign_by_id("missing").unwrap_err();
        assert!(err.is_not_found());
        assert!(store.find_campaign_by_id("missing").is_none());
    }

    #[test]
    fn partial_update_changes_only_supplied_fields() {
        let (_tmp, store) = test_store();

        let form = CampaignForm {
            data: Some(object(json!({"k": 1}))),
            ..CampaignForm::new("Original", "Keep me")
        };
        let created = store.insert_new_campaign("user_a", form).unwrap();

        let updated = store
            .update_campaign_by_id(
                &created.id,
                CampaignUpdateForm {
                    name: Some("Renamed".into()),
                    status: Some(CampaignStatus::Paused),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.status, CampaignStatus::Paused);
        assert_eq!(updated.description, "Keep me");
        assert_eq!(updated.data, Some(object(json!({"k": 1}))));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[test]
    fn updates_stamp_current_time() {
        let (_tmp, store) = test_store();

        let created = store.insert_new_campaign("u", CampaignForm::new("n", "d")).unwrap();
        let mut last = created.clone();
        for _ in 0..10 {
            last = store
                .update_campaign_by_id(&created.id, CampaignUpdateForm::default())
                .unwrap();
        }

        assert!(last.updated_at >= created.updated_at);
        assert!(last.updated_at <= epoch_secs());
        assert_eq!(last.created_at, created.created_at);
    }

    #[test]
    fn update_missing_is_not_found() {
        let (_tmp, store) = test_store();

        let err = store
            .update_campaign_by_id("missing", CampaignUpdateForm::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn set_status_transitions() {
        let (_tmp, store) = test_store();

        let created = store.insert_new_campaign("u", CampaignForm::new("n", "d")).unwrap();
        let done = store.set_status(&created.id, CampaignStatus::Completed).unwrap();
        assert_eq!(done.status, CampaignStatus::Completed);
    }

    #[test]
    fn list_by_owner_filters_other_owners() {
        let (_tmp, store) = test_store();

        store.insert_new_campaign("alice", CampaignForm::new("a1", "")).unwrap();
        store.insert_new_campaign("bob", CampaignForm::new("b1", "")).unwrap();
        store.insert_new_campaign("alice", CampaignForm::new("a2", "")).unwrap();

        let alice = store.get_campaigns_by_user_id("alice").unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|c| c.user_id == "alice"));

        assert!(store.get_campaigns_by_user_id("carol").unwrap().is_empty());
        assert_eq!(store.get_campaigns().unwrap().len(), 3);
    }

    #[test]
    fn listing_orders_by_most_recently_updated() {
        let (_tmp, store) = test_store();

        let first = store.insert_new_campaign("u", CampaignForm::new("first", "")).unwrap();
        let second = store.insert_new_campaign("u", CampaignForm::new("second", "")).unwrap();
        store
            .update_campaign_by_id(&first.id, CampaignUpdateForm::default())
            .unwrap();

        let all = store.get_campaigns().unwrap();
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);

        let owned = store.get_campaigns_by_user_id("u").unwrap();
        assert_eq!(owned[0].id, first.id);
    }

    #[test]
    fn burst_of_updates_does_not_outrank_later_insert() {
        let (_tmp, store) = test_store();

        let busy = store.insert_new_campaign("u", CampaignForm::new("busy", "")).unwrap();
        for _ in 0..10 {
            store
                .update_campaign_by_id(&busy.id, CampaignUpdateForm::default())
                .unwrap();
        }
        std::thread::sleep(Duration::from_millis(1_100));
        let later = store.insert_new_campaign("u", CampaignForm::new("later", "")).unwrap();

        let busy = store.get_campaign_by_id(&busy.id).unwrap();
        assert!(busy.updated_at < later.updated_at);

        let all = store.get_campaigns().unwrap();
        assert_eq!(all[0].id, later.id);
        assert_eq!(all[1].id, busy.id);
    }

    #[test]
    fn delete_existing_and_missing() {
        let (_tmp, store) = test_store();

        let created = store.insert_new_campaign("u", CampaignForm::new("n", "d")).unwrap();
        assert!(store.delete_campaign_by_id(&created.id).unwrap());
        assert!(!store.delete_campaign_by_id(&created.id).unwrap());
        assert!(!store.delete_campaign_by_id("never-existed").unwrap());
        assert!(store.get_campaign_by_id(&created.id).unwrap_err().is_not_found());
    }

    #[test]
    fn operations_compose_inside_external_transaction() {
        let (_tmp, store) = test_store();

        let mut conn = store.pool().get().unwrap();
        let tx = conn.transaction().unwrap();
        let created = CampaignStore::insert_with(&tx, "u", CampaignForm::new("tx", "")).unwrap();
        CampaignStore::update_with(
            &tx,
            &created.id,
            CampaignUpdateForm {
                description: Some("inside".into()),
                ..Default::default()
            },
        )
        .unwrap();
        tx.rollback().unwrap();
        drop(conn);

        assert!(store.get_campaign_by_id(&created.id).unwrap_err().is_not_found());
    }

    #[test]
    fn unknown_status_text_surfaces_as_storage_error() {
        let (_tmp, store) = test_store();

        let created = store.insert_new_campaign("u", CampaignForm::new("n", "d")).unwrap();
        let conn = store.pool().get().unwrap();
        conn.execute(
            "UPDATE campaign SET status = 'archived' WHERE id = ?1",
            params![created.id],
        )
        .unwrap();
        drop(conn);

        let err = store.get_campaign_by_id(&created.id).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(store.find_campaign_by_id(&created.id).is_none());
    }

    #[test]
    fn non_object_blob_text_surfaces_as_storage_error() {
        let (_tmp, store) = test_store();

        let created = store.insert_new_campaign("u", CampaignForm::new("n", "d")).unwrap();
        let conn = store.pool().get().unwrap();
        conn.execute(
            "UPDATE campaign SET data = '[1, 2]' WHERE id = ?1",
            params![created.id],
        )
        .unwrap();
        drop(conn);

        let err = store.get_campaign_by_id(&created.id).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    #[test]
    fn reopen_preserves_rows() {
        let tmp = TempDir::new().unwrap();
        let config = StoreConfig {
            db_path: tmp.path().join("nested").join("c.db").display().to_string(),
            ..StoreConfig::default()
        };

        let id = {
            let store = CampaignStore::open(&config).unwrap();
            store.insert_new_campaign("u", CampaignForm::new("n", "d")).unwrap().id
        };

        let store = CampaignStore::open(&config).unwrap();
        assert_eq!(store.get_campaign_by_id(&id).unwrap().name, "n");
    }

    #[test]
    fn resolved_db_path_leaves_absolute_paths_alone() {
        let config = StoreConfig {
            db_path: "/var/lib/campaign-kit/c.db".into(),
            ..StoreConfig::default()
        };
        assert_eq!(config.resolved_db_path(), PathBuf::from("/var/lib/campaign-kit/c.db"));
        assert!(StoreConfig::default().resolved_db_path().ends_with("campaigns.db"));
    }
}
