//! Durable pin storage over a single SQLite table.
//!
//! The store is constructed once at startup from the connection pool and
//! handed to whatever needs it (HTTP handlers, CLI commands); there is no
//! ambient global connection. Every operation is a prepared statement that
//! commits before returning.

use anyhow::{bail, Result};
use regex::Regex;
use sqlx::{Row, SqlitePool};
use std::sync::LazyLock;

use crate::models::Pin;

/// Extension UI labels that leak into scraped descriptions. Removed on
/// word boundaries before storage, so "Saved leather bag" keeps its verb.
const BOILERPLATE_LABELS: &[&str] = &["Visit site", "Shop now", "More ideas", "Save"];

static BOILERPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let labels = BOILERPLATE_LABELS
        .iter()
        .map(|label| regex::escape(label))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{labels})\b")).unwrap()
});

#[derive(Clone)]
pub struct PinStore {
    pool: SqlitePool,
    dedupe_images: bool,
}

impl PinStore {
    pub fn new(pool: SqlitePool, dedupe_images: bool) -> Self {
        Self {
            pool,
            dedupe_images,
        }
    }

    /// Persist a pin. The description is normalized first; the image is
    /// required. Under the de-duplication policy a repeated image is a
    /// silent no-op returning the existing row, so the extension's
    /// fire-and-forget saves are safe to retry. Uniqueness is enforced by
    /// the unique index, not by a check here, so concurrent saves of the
    /// same image still produce exactly one row.
    pub async fn save(&self, image: &str, text: Option<&str>) -> Result<Pin> {
        if image.trim().is_empty() {
            bail!("image is required");
        }

        let text = normalize_text(text.unwrap_or_default());
        let saved_at = chrono::Utc::now().timestamp_millis();

        if self.dedupe_images {
            let result = sqlx::query(
                "INSERT INTO pins (image, text, saved_at) VALUES (?, ?, ?) \
                 ON CONFLICT(image) DO NOTHING",
            )
            .bind(image)
            .bind(&text)
            .bind(saved_at)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                // Another save of this image got there first.
                return match self.find_by_image(image).await? {
                    Some(existing) => Ok(existing),
                    None => bail!("pin for this image was deleted mid-save"),
                };
            }

            return Ok(Pin {
                id: result.last_insert_rowid(),
                image: image.to_string(),
                text,
                saved_at,
            });
        }

        let result = sqlx::query("INSERT INTO pins (image, text, saved_at) VALUES (?, ?, ?)")
            .bind(image)
            .bind(&text)
            .bind(saved_at)
            .execute(&self.pool)
            .await?;

        Ok(Pin {
            id: result.last_insert_rowid(),
            image: image.to_string(),
            text,
            saved_at,
        })
    }

    /// All pins, newest first. Full-table scan; fine at the hundreds to
    /// low-thousands of rows this service holds.
    pub async fn list_all(&self) -> Result<Vec<Pin>> {
        let rows = sqlx::query(
            "SELECT id, image, text, saved_at FROM pins ORDER BY saved_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_pin).collect())
    }

    /// Remove one pin. Returns whether a row existed; a missing id is not
    /// an error.
    pub async fn delete_by_id(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pins WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every pin, returning how many were deleted.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pins").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_by_image(&self, image: &str) -> Result<Option<Pin>> {
        let row = sqlx::query("SELECT id, image, text, saved_at FROM pins WHERE image = ? LIMIT 1")
            .bind(image)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_pin))
    }
}

fn row_to_pin(row: &sqlx::sqlite::SqliteRow) -> Pin {
    Pin {
        id: row.get("id"),
        image: row.get("image"),
        text: row.get("text"),
        saved_at: row.get("saved_at"),
    }
}

/// Clean a scraped description: drop known UI boilerplate, collapse
/// whitespace runs, trim.
pub fn normalize_text(text: &str) -> String {
    let cleaned = BOILERPLATE_RE.replace_all(text, " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
