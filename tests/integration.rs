use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use covet::config::{load_config, Config};
use covet::db;
use covet::migrate;
use covet::store::PinStore;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/covet.sqlite"

[server]
bind = "127.0.0.1:3001"

[store]
dedupe_images = true

[curation]
timeout_secs = 5
"#,
        root.display()
    );

    let config_path = config_dir.join("covet.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

async fn open_store(config: &Config) -> PinStore {
    let pool = db::connect(&config.db).await.unwrap();
    migrate::run_migrations(&pool, config.store.dedupe_images)
        .await
        .unwrap();
    PinStore::new(pool, config.store.dedupe_images)
}

#[tokio::test]
async fn test_store_end_to_end_on_disk() {
    let (_tmp, config_path) = setup_test_env();
    let config = load_config(&config_path).unwrap();
    let store = open_store(&config).await;

    // Save three pins, one with boilerplate in the description.
    store
        .save("https://img.example/coat.jpg", Some("Charcoal wool coat"))
        .await
        .unwrap();
    store
        .save(
            "https://img.example/jacket.jpg",
            Some("  Save   Visit site   Cool jacket  "),
        )
        .await
        .unwrap();
    let scarf = store
        .save("https://img.example/scarf.jpg", None)
        .await
        .unwrap();

    let pins = store.list_all().await.unwrap();
    assert_eq!(pins.len(), 3);
    assert!(pins
        .iter()
        .any(|p| p.text == "Cool jacket" && p.image == "https://img.example/jacket.jpg"));

    // Dedupe: re-saving an image does not add a row.
    store
        .save("https://img.example/coat.jpg", Some("resent by extension"))
        .await
        .unwrap();
    assert_eq!(store.count().await.unwrap(), 3);

    // Delete one, then everything.
    assert!(store.delete_by_id(scarf.id).await.unwrap());
    assert!(!store.delete_by_id(scarf.id).await.unwrap());
    assert_eq!(store.delete_all().await.unwrap(), 2);
    assert_eq!(store.list_all().await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_concurrent_saves_of_same_image_keep_one_row() {
    let (_tmp, config_path) = setup_test_env();
    let config = load_config(&config_path).unwrap();
    let store = open_store(&config).await;

    // The extension fires saves without waiting for responses, so the same
    // image can arrive on many in-flight requests at once. Uniqueness is
    // enforced by the database, not by an application-level check, so every
    // racer must land on the same single row.
    let mut handles = Vec::new();
    for i in 0..32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .save("https://img.example/same.jpg", Some(&format!("copy {i}")))
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let pin = handle.await.unwrap().unwrap();
        ids.push(pin.id);
    }

    assert!(ids.iter().all(|&id| id == ids[0]));
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let (_tmp, config_path) = setup_test_env();
    let config = load_config(&config_path).unwrap();

    {
        let store = open_store(&config).await;
        store
            .save("https://img.example/boots.jpg", Some("Leather boots"))
            .await
            .unwrap();
    }

    let store = open_store(&config).await;
    let pins = store.list_all().await.unwrap();
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].text, "Leather boots");
}

#[tokio::test]
async fn test_curation_over_stored_pins() {
    use anyhow::Result;
    use async_trait::async_trait;
    use covet::completion::{ChatMessage, CompletionClient};
    use covet::curator::Curator;
    use covet::models::PinCandidate;

    // Downstream-style client implementation: the trait is the seam the
    // server uses, so curation must work with any impl injected here.
    struct CannedStylist;

    #[async_trait]
    impl CompletionClient for CannedStylist {
        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok("Item 1: because the coat sets the tone. \
                Item 4: because the boots ground it."
                .to_string())
        }
    }

    let (_tmp, config_path) = setup_test_env();
    let config = load_config(&config_path).unwrap();
    let store = open_store(&config).await;

    for (i, text) in ["wool coat", "linen shirt", "silk scarf", "leather boots"]
        .iter()
        .enumerate()
    {
        store
            .save(&format!("https://img.example/{i}.jpg"), Some(text))
            .await
            .unwrap();
    }

    let mut candidates: Vec<PinCandidate> = store
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(PinCandidate::from)
        .collect();
    // list_all is newest-first; curation prompts enumerate in the order
    // given, so present oldest-first to match the save order.
    candidates.reverse();

    let curator = Curator::with_seed(Box::new(CannedStylist), 1);
    let items = curator.curate(&candidates).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].text, "wool coat");
    assert_eq!(items[0].reason, "the coat sets the tone");
    assert_eq!(items[1].text, "leather boots");
    assert_eq!(items[1].reason, "the boots ground it");
}

// ============ CLI smoke tests ============

fn covet_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("covet");
    path
}

fn run_covet(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = covet_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run covet binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_covet(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_covet(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_covet(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_pins_list_empty() {
    let (_tmp, config_path) = setup_test_env();

    run_covet(&config_path, &["init"]);
    let (stdout, stderr, success) = run_covet(&config_path, &["pins", "list"]);
    assert!(success, "list failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("No pins."));
}

#[test]
fn test_pins_clear_reports_count() {
    let (_tmp, config_path) = setup_test_env();

    run_covet(&config_path, &["init"]);
    let (stdout, _, success) = run_covet(&config_path, &["pins", "clear"]);
    assert!(success);
    assert!(stdout.contains("Removed 0 pins."));
}
