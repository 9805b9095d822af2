//! Integration Tests for the Cache
//!
//! Exercises the full pipeline (serialize, encrypt, persist, read back)
//! through the public API, across the embeddable backends. Memcached and
//! Redis get ignored smoke tests since they need live servers.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;

use vault_cache::codec::{Codec, CodecRegistry, JsonCodec};
use vault_cache::{
    Cache, CacheConfig, CacheEntry, CacheError, CacheStore, FilesystemStore, MemcachedStore,
    RedisStore, RelationalStore,
};

// == Helper Functions ==

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Session {
    user_id: u64,
    token: String,
    roles: Vec<String>,
}

fn sample_session() -> Session {
    Session {
        user_id: 42,
        token: "tok_5542a1".to_string(),
        roles: vec!["admin".to_string(), "ops".to_string()],
    }
}

/// Initializes a test tracing subscriber. Safe to call from every test;
/// only the first call installs the subscriber.
fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vault_cache=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn test_config(dir: &TempDir) -> CacheConfig {
    init_tracing();
    CacheConfig {
        master_key: "integration test master key".to_string(),
        key_dir: dir.path().join("keys"),
        ..CacheConfig::default()
    }
}

fn fs_cache(dir: &TempDir) -> Cache {
    let store = FilesystemStore::new(dir.path().join("entries"), "json").unwrap();
    Cache::new(Arc::new(store), test_config(dir)).unwrap()
}

fn sqlite_cache(dir: &TempDir) -> Cache {
    sqlite_cache_with(dir, test_config(dir))
}

fn sqlite_cache_with(dir: &TempDir, config: CacheConfig) -> Cache {
    let store = RelationalStore::open(dir.path().join("cache.db")).unwrap();
    Cache::new(Arc::new(store), config).unwrap()
}

// == Round-Trip Tests ==

#[tokio::test]
async fn test_filesystem_round_trip() {
    let dir = TempDir::new().unwrap();
    let cache = fs_cache(&dir);

    let session = sample_session();
    cache.set("session:42", &session, None).await.unwrap();

    let loaded: Option<Session> = cache.get("session:42").await.unwrap();
    assert_eq!(loaded, Some(session));
}

#[tokio::test]
async fn test_sqlite_round_trip() {
    let dir = TempDir::new().unwrap();
    let cache = sqlite_cache(&dir);

    let session = sample_session();
    cache.set("session:42", &session, None).await.unwrap();

    let loaded: Option<Session> = cache.get("session:42").await.unwrap();
    assert_eq!(loaded, Some(session));
}

#[tokio::test]
async fn test_yaml_format_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path().join("entries"), "yaml").unwrap();
    let config = CacheConfig {
        format: "yaml".to_string(),
        ..test_config(&dir)
    };
    let cache = Cache::new(Arc::new(store), config).unwrap();

    let value = json!({"nested": {"list": [1, 2, 3], "flag": true}});
    cache.set("doc", &value, None).await.unwrap();

    let loaded: Option<serde_json::Value> = cache.get("doc").await.unwrap();
    assert_eq!(loaded, Some(value));
    assert_eq!(cache.format(), "yaml");
}

#[tokio::test]
async fn test_entries_are_encrypted_at_rest() {
    let dir = TempDir::new().unwrap();
    let cache = fs_cache(&dir);

    cache
        .set("secret", "the plaintext payload", None)
        .await
        .unwrap();

    // Nothing recognizable may appear in the stored file
    let entries_dir = dir.path().join("entries");
    let file = std::fs::read_dir(&entries_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .next()
        .unwrap();
    let raw = std::fs::read(&file).unwrap();

    let haystack = String::from_utf8_lossy(&raw);
    assert!(!haystack.contains("plaintext payload"));
    assert!(!haystack.contains("created_at"));
}

// == Expiry Tests ==

#[tokio::test]
async fn test_sqlite_ttl_expiry() {
    let dir = TempDir::new().unwrap();
    let cache = sqlite_cache(&dir);

    cache.set("short", "lived", Some(1)).await.unwrap();
    assert_eq!(
        cache.get::<String>("short").await.unwrap().as_deref(),
        Some("lived")
    );

    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(cache.get::<String>("short").await.unwrap(), None);
    assert_eq!(cache.stats().expirations, 1);
}

// == Eviction Tests ==

#[tokio::test]
async fn test_sqlite_fifo_eviction_bound() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig {
        max_entries: 3,
        ..test_config(&dir)
    };
    let cache = sqlite_cache_with(&dir, config);

    cache.set("a", &1, None).await.unwrap();
    cache.set("b", &2, None).await.unwrap();
    cache.set("c", &3, None).await.unwrap();
    cache.set("d", &4, None).await.unwrap();

    assert_eq!(cache.get::<i64>("a").await.unwrap(), None);
    assert_eq!(cache.get::<i64>("b").await.unwrap(), Some(2));
    assert_eq!(cache.get::<i64>("c").await.unwrap(), Some(3));
    assert_eq!(cache.get::<i64>("d").await.unwrap(), Some(4));
    assert_eq!(cache.stats().total_entries, 3);
}

// == Self-Healing Tests ==

#[tokio::test]
async fn test_sqlite_tampered_entry_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = sqlite_cache(&dir);

    cache.set("key", "authentic", None).await.unwrap();

    // Overwrite the stored blob with garbage through a second store handle
    let raw_store = RelationalStore::open(dir.path().join("cache.db")).unwrap();
    raw_store
        .write("key", b"not a valid ciphertext", 600)
        .await
        .unwrap();

    assert_eq!(cache.get::<String>("key").await.unwrap(), None);
    // Self-healing: the corrupt row is gone
    assert_eq!(raw_store.read("key").await.unwrap(), None);
}

// == Key Vault Tests ==

#[tokio::test]
async fn test_sqlite_wrong_master_key_reads_nothing() {
    let dir = TempDir::new().unwrap();

    let original = sqlite_cache(&dir);
    original.set("key", "protected", None).await.unwrap();
    drop(original);

    let config = CacheConfig {
        master_key: "some other master key".to_string(),
        ..test_config(&dir)
    };
    let impostor = sqlite_cache_with(&dir, config);

    // Never plaintext, never garbage: just a miss
    assert_eq!(impostor.get::<String>("key").await.unwrap(), None);
}

#[tokio::test]
async fn test_backends_share_one_wrapped_key_blob() {
    let dir = TempDir::new().unwrap();

    // Two caches over different backends, same key_dir and namespace
    let over_files = fs_cache(&dir);
    let over_sqlite = sqlite_cache(&dir);

    over_files.set("key", "via files", None).await.unwrap();
    over_sqlite.set("key", "via sqlite", None).await.unwrap();

    assert_eq!(
        over_files.get::<String>("key").await.unwrap().as_deref(),
        Some("via files")
    );
    assert_eq!(
        over_sqlite.get::<String>("key").await.unwrap().as_deref(),
        Some("via sqlite")
    );

    // Exactly one wrapped-key blob exists
    let blobs = std::fs::read_dir(dir.path().join("keys")).unwrap().count();
    assert_eq!(blobs, 1);
}

// == Clear Scoping Tests ==

#[tokio::test]
async fn test_filesystem_clear_leaves_foreign_files() {
    let dir = TempDir::new().unwrap();
    let cache = fs_cache(&dir);

    cache.set("a", &1, None).await.unwrap();
    cache.set("b", &2, None).await.unwrap();

    let entries_dir = dir.path().join("entries");
    std::fs::write(entries_dir.join("notes.txt"), b"not cache data").unwrap();

    cache.clear().await.unwrap();

    assert_eq!(cache.get::<i64>("a").await.unwrap(), None);
    assert!(entries_dir.join("notes.txt").exists());
    assert_eq!(cache.stats().total_entries, 0);
}

#[tokio::test]
async fn test_sqlite_clear_leaves_foreign_tables() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("cache.db");
    let cache = sqlite_cache(&dir);

    cache.set("a", &1, None).await.unwrap();

    {
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE app_data (id INTEGER PRIMARY KEY, body TEXT);
             INSERT INTO app_data (body) VALUES ('not cache data');",
        )
        .unwrap();
    }

    cache.clear().await.unwrap();

    assert_eq!(cache.get::<i64>("a").await.unwrap(), None);
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let survivors: i64 = conn
        .query_row("SELECT COUNT(*) FROM app_data", [], |row| row.get(0))
        .unwrap();
    assert_eq!(survivors, 1);
}

// == Format Registry Tests ==

#[tokio::test]
async fn test_unknown_format_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let cache = fs_cache(&dir);

    assert!(matches!(
        cache.set_format("msgpack"),
        Err(CacheError::Config(_))
    ));
}

#[tokio::test]
async fn test_custom_codec_via_registry() {
    // A codec that frames json bytes with a magic prefix
    struct FramedJson;

    impl Codec for FramedJson {
        fn name(&self) -> &'static str {
            "framed"
        }
        fn extension(&self) -> &'static str {
            "framed"
        }
        fn encode(&self, entry: &CacheEntry) -> vault_cache::Result<Vec<u8>> {
            let mut bytes = b"FRM1".to_vec();
            bytes.extend(JsonCodec.encode(entry)?);
            Ok(bytes)
        }
        fn decode(&self, bytes: &[u8]) -> vault_cache::Result<CacheEntry> {
            let body = bytes.strip_prefix(b"FRM1".as_slice()).ok_or_else(|| {
                CacheError::Serialization("missing FRM1 frame prefix".to_string())
            })?;
            JsonCodec.decode(body)
        }
    }

    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path().join("entries"), "json").unwrap();
    let config = CacheConfig {
        format: "framed".to_string(),
        ..test_config(&dir)
    };

    let mut registry = CodecRegistry::builtin();
    registry.register(Arc::new(FramedJson));
    let cache = Cache::with_registry(Arc::new(store), config, registry).unwrap();

    cache.set("key", "through the custom codec", None).await.unwrap();
    assert_eq!(
        cache.get::<String>("key").await.unwrap().as_deref(),
        Some("through the custom codec")
    );
    assert_eq!(cache.format(), "framed");
}

// == Concurrency Tests ==

#[tokio::test]
async fn test_concurrent_sets_respect_capacity() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig {
        max_entries: 5,
        ..test_config(&dir)
    };
    let store = FilesystemStore::new(dir.path().join("entries"), "json").unwrap();
    let cache = Arc::new(Cache::new(Arc::new(store), config).unwrap());

    let mut handles = Vec::new();
    for i in 0..20 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            cache.set(&format!("key{}", i), &i, None).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = cache.stats();
    assert_eq!(stats.total_entries, 5);
    assert_eq!(stats.evictions, 15);
}

#[tokio::test]
async fn test_concurrent_reads_and_writes_stay_consistent() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(fs_cache(&dir));

    for i in 0..10 {
        cache.set(&format!("key{}", i), &(i * 100), None).await.unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..10 {
        let reader = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            for _ in 0..20 {
                let loaded: Option<i64> = reader.get(&format!("key{}", i)).await.unwrap();
                // Values are either whole or absent, never partial
                if let Some(v) = loaded {
                    assert_eq!(v % 100, 0);
                }
            }
        }));
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            cache
                .set(&format!("key{}", i), &(i * 100), None)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

// == Stats Tests ==

#[tokio::test]
async fn test_stats_snapshot_across_operations() {
    let dir = TempDir::new().unwrap();
    let cache = sqlite_cache(&dir);

    cache.set("a", &1, None).await.unwrap();
    cache.set("b", &2, None).await.unwrap();
    let _: Option<i64> = cache.get("a").await.unwrap();
    let _: Option<i64> = cache.get("absent").await.unwrap();
    cache.delete("b").await.unwrap();

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.total_entries, 1);
    assert_eq!(stats.hit_rate(), 0.5);
}

// == Network Backend Smoke Tests ==

#[tokio::test]
#[ignore = "requires a running memcached instance on 127.0.0.1:11211"]
async fn test_memcached_cache_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = MemcachedStore::connect("memcache://127.0.0.1:11211", "vault_cache_it")
        .await
        .unwrap();
    let cache = Cache::new(Arc::new(store), test_config(&dir)).unwrap();

    let session = sample_session();
    cache.set("session:42", &session, None).await.unwrap();
    let loaded: Option<Session> = cache.get("session:42").await.unwrap();
    assert_eq!(loaded, Some(session));

    cache.clear().await.unwrap();
    assert_eq!(cache.get::<Session>("session:42").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires a running redis instance on 127.0.0.1:6379"]
async fn test_redis_cache_round_trip_and_expiry() {
    let dir = TempDir::new().unwrap();
    let store = RedisStore::connect("redis://127.0.0.1:6379", "vault_cache_it")
        .await
        .unwrap();
    let cache = Cache::new(Arc::new(store), test_config(&dir)).unwrap();

    let session = sample_session();
    cache.set("session:42", &session, Some(1)).await.unwrap();
    let loaded: Option<Session> = cache.get("session:42").await.unwrap();
    assert_eq!(loaded, Some(session));

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(cache.get::<Session>("session:42").await.unwrap(), None);

    cache.clear().await.unwrap();
}
