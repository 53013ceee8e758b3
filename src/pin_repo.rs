// SQLite persistence for the pin registry.
// One row per pin; `save` replaces the whole table in a single transaction.

use crate::models::{PinSnapshot, PinnedItem, ResolvedPinnedItem};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::{instrument, warn};

pub struct PinRepo {
    pool: SqlitePool,
}

impl PinRepo {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL.
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pinned_items (
                instance_id TEXT NOT NULL,
                system_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                entity_name TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (instance_id, system_id, kind, entity_name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Load every instance's pins. Rows with an unknown kind are skipped.
    #[instrument(skip(self), fields(repo = "pins", operation = "load"))]
    pub async fn load(&self) -> anyhow::Result<PinSnapshot> {
        let rows = sqlx::query(
            "SELECT instance_id, system_id, kind, entity_name FROM pinned_items
             ORDER BY instance_id, system_id, kind, entity_name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut snapshot = PinSnapshot::new();
        for row in rows {
            let instance_id: String = row.try_get("instance_id")?;
            let system_id: String = row.try_get("system_id")?;
            let kind: String = row.try_get("kind")?;
            let entity_name: String = row.try_get("entity_name")?;
            let entity = (!entity_name.is_empty()).then_some(entity_name.as_str());
            let Some(item) = PinnedItem::from_parts(&kind, entity) else {
                warn!(kind = %kind, system_id = %system_id, "skipping unknown pin kind");
                continue;
            };
            snapshot
                .entry(instance_id)
                .or_default()
                .push(ResolvedPinnedItem::new(item, system_id));
        }
        Ok(snapshot)
    }

    /// Replace stored pins with `snapshot`.
    #[instrument(skip_all, fields(repo = "pins", operation = "save", instances = snapshot.len()))]
    pub async fn save(&self, snapshot: &PinSnapshot) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM pinned_items")
            .execute(&mut *tx)
            .await?;
        for (instance_id, pins) in snapshot {
            for pin in pins {
                sqlx::query(
                    "INSERT OR IGNORE INTO pinned_items (instance_id, system_id, kind, entity_name) VALUES ($1, $2, $3, $4)",
                )
                .bind(instance_id)
                .bind(&pin.system_id)
                .bind(pin.item.tag())
                .bind(pin.item.entity_name().unwrap_or(""))
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }
}
