use anyhow::Result;
use sqlx::SqlitePool;

/// Create the pins table and its indexes. Idempotent — safe to run on
/// every startup.
///
/// The image de-duplication policy is enforced by the engine, not by the
/// service: with the policy on, `image` carries a unique index and saves
/// rely on `ON CONFLICT` semantics; with it off, the index is a plain
/// lookup index. Turning the policy on over a table that already holds
/// duplicate images fails here, before the server starts.
pub async fn run_migrations(pool: &SqlitePool, dedupe_images: bool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image TEXT NOT NULL,
            text TEXT NOT NULL DEFAULT '',
            saved_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Listing is always newest-first.
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pins_saved_at ON pins(saved_at DESC)")
        .execute(pool)
        .await?;

    if dedupe_images {
        sqlx::query("DROP INDEX IF EXISTS idx_pins_image")
            .execute(pool)
            .await?;
        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS uq_pins_image ON pins(image)")
            .execute(pool)
            .await?;
    } else {
        sqlx::query("DROP INDEX IF EXISTS uq_pins_image")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pins_image ON pins(image)")
            .execute(pool)
            .await?;
    }

    Ok(())
}
