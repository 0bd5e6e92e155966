use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::models::{ComponentLine, ComponentSlot, Platform, Quotation, QuotationDraft};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Per-slot columns, in the order they are bound
const SLOT_FIELDS: [&str; 4] = ["details", "unit", "price", "upgrade_note"];

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database at `db_url` and runs migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, the pool cannot
    /// connect, or a migration fails.
    pub async fn new(db_url: &str, max_connections: u32) -> Result<Self> {
        if let Some(parent) = sqlite_file_path(db_url).and_then(Path::parent)
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }

        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database file");
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await
            .with_context(|| format!("Failed to connect to {db_url}"))?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database, used by tests.
    ///
    /// A single connection is kept open for the lifetime of the pool, since
    /// each new in-memory connection would start from an empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migrations fail.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        info!("Running database migrations");
        MIGRATOR.run(&pool).await?;

        info!("Database initialized successfully");
        Ok(Self { pool })
    }

    /// # Errors
    ///
    /// Returns an error if the database does not answer.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn create_quotation(&self, draft: &QuotationDraft) -> Result<Quotation> {
        let columns = quotation_columns();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO quotations ({}) VALUES ({placeholders})",
            columns.join(", ")
        );

        let created_at = draft.created_at.unwrap_or_else(Utc::now);
        let mut query = sqlx::query(&sql)
            .bind(&draft.customer_name)
            .bind(draft.platform.as_str())
            .bind(draft.final_price);
        for slot in ComponentSlot::ALL {
            let line = draft.component(slot);
            query = query
                .bind(&line.details)
                .bind(line.unit)
                .bind(line.price)
                .bind(&line.upgrade_note);
        }
        let result = query.bind(created_at).execute(&self.pool).await?;

        let id = result.last_insert_rowid();
        info!("Created quotation {} for {}", id, draft.customer_name);

        self.get_quotation(id)
            .await?
            .context("Inserted quotation could not be read back")
    }

    /// # Errors
    ///
    /// Returns an error on database failure or a corrupt row.
    pub async fn get_quotation(&self, id: i64) -> Result<Option<Quotation>> {
        let row = sqlx::query("SELECT * FROM quotations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(quotation_from_row).transpose()
    }

    /// Most recently created quotation.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure or a corrupt row.
    pub async fn latest_quotation(&self) -> Result<Option<Quotation>> {
        let row = sqlx::query("SELECT * FROM quotations ORDER BY created_at DESC, id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(quotation_from_row).transpose()
    }

    /// # Errors
    ///
    /// Returns an error on database failure or a corrupt row.
    pub async fn list_quotations(&self) -> Result<Vec<Quotation>> {
        let rows = sqlx::query("SELECT * FROM quotations ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(quotation_from_row).collect()
    }

    /// Replaces every field of quotation `id`.
    ///
    /// `created_at` is only changed when the draft carries one. Returns
    /// `None` when no such quotation exists.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn update_quotation(&self, id: i64, draft: &QuotationDraft) -> Result<Option<Quotation>> {
        let assignments: Vec<String> = quotation_columns()
            .iter()
            .map(|column| {
                if column == "created_at" {
                    "created_at = COALESCE(?, created_at)".to_string()
                } else {
                    format!("{column} = ?")
                }
            })
            .collect();
        let sql = format!("UPDATE quotations SET {} WHERE id = ?", assignments.join(", "));

        let mut query = sqlx::query(&sql)
            .bind(&draft.customer_name)
            .bind(draft.platform.as_str())
            .bind(draft.final_price);
        for slot in ComponentSlot::ALL {
            let line = draft.component(slot);
            query = query
                .bind(&line.details)
                .bind(line.unit)
                .bind(line.price)
                .bind(&line.upgrade_note);
        }
        let result = query
            .bind(draft.created_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            debug!("Quotation {} not found for update", id);
            return Ok(None);
        }

        info!("Updated quotation {}", id);
        self.get_quotation(id).await
    }

    /// Deletes quotation `id` and its favorite mark. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn delete_quotation(&self, id: i64) -> Result<bool> {
        sqlx::query("DELETE FROM favorites WHERE quotation_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query("DELETE FROM quotations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted quotation {}", id);
        }
        Ok(deleted)
    }

    /// Ids of favorite quotations, oldest mark first.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn list_favorites(&self) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT quotation_id FROM favorites ORDER BY created_at, quotation_id")
            .fetch_all(&self.pool)
            .await?;

        let ids = rows
            .into_iter()
            .map(|row| row.get::<i64, _>("quotation_id"))
            .collect();

        Ok(ids)
    }

    /// Marks quotation `id` as a favorite. Marking twice is a no-op.
    ///
    /// Returns `false` when the quotation does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn add_favorite(&self, id: i64) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM quotations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if !exists {
            return Ok(false);
        }

        sqlx::query("INSERT OR IGNORE INTO favorites (quotation_id, created_at) VALUES (?, ?)")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(true)
    }

    /// Returns whether a favorite mark was removed.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn remove_favorite(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE quotation_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Writable columns in bind order: header fields, the slot columns, then `created_at`.
fn quotation_columns() -> Vec<String> {
    let mut columns = vec![
        "customer_name".to_string(),
        "platform".to_string(),
        "final_price".to_string(),
    ];
    for slot in ComponentSlot::ALL {
        columns.extend(SLOT_FIELDS.iter().map(|field| slot.column(field)));
    }
    columns.push("created_at".to_string());
    columns
}

fn quotation_from_row(row: &SqliteRow) -> Result<Quotation> {
    let platform: String = row.try_get("platform")?;
    let platform: Platform = platform.parse()?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    let mut components = BTreeMap::new();
    for slot in ComponentSlot::ALL {
        let line = ComponentLine {
            details: row.try_get(slot.column("details").as_str())?,
            unit: row.try_get(slot.column("unit").as_str())?,
            price: row.try_get(slot.column("price").as_str())?,
            upgrade_note: row.try_get(slot.column("upgrade_note").as_str())?,
        };
        components.insert(slot, line);
    }

    Ok(Quotation {
        id: row.try_get("id")?,
        customer_name: row.try_get("customer_name")?,
        platform,
        final_price: row.try_get("final_price")?,
        components,
        created_at,
    })
}

/// Filesystem path of a `sqlite:` URL, if it names a file.
fn sqlite_file_path(db_url: &str) -> Option<&Path> {
    let rest = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}
