use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::fs;
use std::str::FromStr;
use std::time::Instant;
use tempfile::TempDir;

const INSERT: &str =
    "INSERT INTO pins (image, text, saved_at) VALUES ('x', '', 1) ON CONFLICT(image) DO NOTHING";

#[tokio::test]
async fn dbg_connect_times() {
    let t0 = Instant::now();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("data").join("covet.sqlite");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .unwrap()
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(move |_conn, meta| {
            let t = t0.elapsed();
            Box::pin(async move {
                eprintln!("J new connection established at {t:?} (age {:?})", meta.age);
                Ok(())
            })
        })
        .connect_with(options.clone())
        .await
        .unwrap();

    eprintln!("J pool ready at {:?}", t0.elapsed());

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS pins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image TEXT NOT NULL,
            text TEXT NOT NULL DEFAULT '',
            saved_at INTEGER NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    eprintln!("J create table done at {:?}, size={}", t0.elapsed(), pool.size());

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS uq_pins_image ON pins(image)")
        .execute(&pool)
        .await
        .unwrap();
    eprintln!("J create index done at {:?}, size={}", t0.elapsed(), pool.size());

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let r = sqlx::query(INSERT).execute(&pool).await.map(|x| x.rows_affected());
    eprintln!("J insert at {:?}: {r:?}, size={}", t0.elapsed(), pool.size());
}
