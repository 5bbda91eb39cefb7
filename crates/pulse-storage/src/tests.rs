use crate::database::{DatabaseRepository, PoolOptions};
use crate::memory::MemoryRepository;
use crate::snapshot::SnapshotFile;
use crate::{MetricMap, Repository, Result, StorageError};
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use proptest::prelude::*;
use pulse_common::{Metric, MetricValue, Signer};
use sea_orm::{ConnectOptions, Database, TransactionTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn memory() -> MemoryRepository {
    MemoryRepository::new(Signer::disabled())
}

async fn database(dir: &TempDir, signer: Signer) -> DatabaseRepository {
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("metrics.db").display());
    let pool = PoolOptions {
        max_connections: 4,
        acquire_timeout: Duration::from_secs(10),
    };
    DatabaseRepository::connect(&dsn, pool, signer).await.unwrap()
}

fn map(metrics: impl IntoIterator<Item = Metric>) -> MetricMap {
    metrics.into_iter().map(|m| (m.id.clone(), m)).collect()
}

// ---- memory backend ----

#[tokio::test]
async fn memory_counter_accumulates() {
    let repo = memory();
    repo.put(Metric::counter("PollCount", 5)).await.unwrap();
    let stored = repo.put(Metric::counter("PollCount", 7)).await.unwrap();
    assert_eq!(stored.value, MetricValue::Counter(12));
    assert_eq!(repo.get("PollCount").await.unwrap().value, MetricValue::Counter(12));
}

#[tokio::test]
async fn memory_gauge_overwrites() {
    let repo = memory();
    repo.put(Metric::gauge("Alloc", 1.5)).await.unwrap();
    repo.put(Metric::gauge("Alloc", 0.25)).await.unwrap();
    assert_eq!(repo.get("Alloc").await.unwrap().value, MetricValue::Gauge(0.25));
}

#[tokio::test]
async fn memory_missing_id_is_not_found() {
    let repo = memory();
    assert!(matches!(
        repo.get("nope").await,
        Err(StorageError::NotFound(id)) if id == "nope"
    ));
}

#[tokio::test]
async fn memory_kind_change_replaces_entry() {
    let repo = memory();
    repo.put(Metric::gauge("X", 2.0)).await.unwrap();
    repo.put(Metric::counter("X", 3)).await.unwrap();
    assert_eq!(repo.get("X").await.unwrap().value, MetricValue::Counter(3));
}

#[tokio::test]
async fn memory_rehashes_merged_counter() {
    let signer = Signer::new("secret");
    let repo = MemoryRepository::new(signer.clone());
    repo.put(Metric::counter("PollCount", 2)).await.unwrap();
    let stored = repo.put(Metric::counter("PollCount", 3)).await.unwrap();
    assert_eq!(stored.hash, signer.sign("PollCount", &MetricValue::Counter(5)));
    assert_eq!(signer.verify(&stored), Ok(()));
}

#[tokio::test]
async fn memory_batch_applies_in_order() {
    let repo = memory();
    repo.put_batch(vec![
        Metric::counter("PollCount", 1),
        Metric::gauge("Alloc", 1.0),
        Metric::counter("PollCount", 2),
        Metric::gauge("Alloc", 3.0),
    ])
    .await
    .unwrap();
    assert_eq!(repo.get("PollCount").await.unwrap().value, MetricValue::Counter(3));
    assert_eq!(repo.get("Alloc").await.unwrap().value, MetricValue::Gauge(3.0));
}

#[tokio::test]
async fn memory_update_all_replaces_everything() {
    let repo = memory();
    repo.put(Metric::gauge("Old", 1.0)).await.unwrap();
    repo.update_all(map([Metric::counter("New", 9)])).await.unwrap();

    let all = repo.all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all["New"].value, MetricValue::Counter(9));
}

#[tokio::test]
async fn memory_ping_reports_unavailable() {
    assert!(matches!(
        memory().ping().await,
        Err(StorageError::Unavailable(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_concurrent_counters_lose_nothing() {
    let repo = Arc::new(memory());
    let mut tasks = Vec::new();
    for _ in 0..200 {
        let repo = repo.clone();
        tasks.push(tokio::spawn(async move {
            repo.put(Metric::counter("Hits", 1)).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(repo.get("Hits").await.unwrap().value, MetricValue::Counter(200));
}

// ---- database backend ----

#[tokio::test]
async fn database_counter_accumulates_and_gauge_overwrites() {
    let dir = TempDir::new().unwrap();
    let repo = database(&dir, Signer::disabled()).await;

    repo.put(Metric::counter("PollCount", 5)).await.unwrap();
    repo.put(Metric::counter("PollCount", 7)).await.unwrap();
    repo.put(Metric::gauge("Alloc", 1.5)).await.unwrap();
    repo.put(Metric::gauge("Alloc", 0.1)).await.unwrap();

    assert_eq!(repo.get("PollCount").await.unwrap().value, MetricValue::Counter(12));
    assert_eq!(repo.get("Alloc").await.unwrap().value, MetricValue::Gauge(0.1));
    assert!(matches!(repo.get("missing").await, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn database_stores_hash_of_merged_value() {
    let dir = TempDir::new().unwrap();
    let signer = Signer::new("secret");
    let repo = database(&dir, signer.clone()).await;

    repo.put(Metric::counter("PollCount", 1)).await.unwrap();
    repo.put(Metric::counter("PollCount", 1)).await.unwrap();

    let stored = repo.get("PollCount").await.unwrap();
    assert_eq!(stored.hash, signer.sign("PollCount", &MetricValue::Counter(2)));
}

#[tokio::test]
async fn database_batch_and_update_all() {
    let dir = TempDir::new().unwrap();
    let repo = database(&dir, Signer::disabled()).await;

    repo.put_batch(vec![
        Metric::counter("C", 1),
        Metric::counter("C", 2),
        Metric::gauge("G", 4.5),
    ])
    .await
    .unwrap();
    let all = repo.all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["C"].value, MetricValue::Counter(3));

    repo.update_all(map([Metric::gauge("Only", 1.0)])).await.unwrap();
    let all = repo.all().await.unwrap();
    assert_eq!(all.keys().collect::<Vec<_>>(), vec!["Only"]);

    repo.update_all(MetricMap::new()).await.unwrap();
    assert!(repo.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn database_ping_succeeds() {
    let dir = TempDir::new().unwrap();
    let repo = database(&dir, Signer::disabled()).await;
    repo.ping().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn database_concurrent_counters_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(database(&dir, Signer::disabled()).await);

    let mut tasks = Vec::new();
    for i in 0..40 {
        let repo = repo.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                repo.put(Metric::counter("Hits", 1)).await.unwrap();
            } else {
                repo.put_batch(vec![Metric::counter("Other", 1), Metric::counter("Hits", 1)])
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(repo.get("Hits").await.unwrap().value, MetricValue::Counter(40));
    assert_eq!(repo.get("Other").await.unwrap().value, MetricValue::Counter(20));
}

#[tokio::test]
async fn database_survives_reconnect() {
    let dir = TempDir::new().unwrap();
    {
        let repo = database(&dir, Signer::disabled()).await;
        repo.put(Metric::counter("PollCount", 4)).await.unwrap();
    }
    let repo = database(&dir, Signer::disabled()).await;
    assert_eq!(repo.get("PollCount").await.unwrap().value, MetricValue::Counter(4));
}

#[tokio::test]
async fn database_exhausted_pool_fails_instead_of_blocking() {
    let dir = TempDir::new().unwrap();
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("metrics.db").display());
    let mut options = ConnectOptions::new(dsn);
    options
        .max_connections(1)
        .acquire_timeout(Duration::from_millis(300))
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let repo = DatabaseRepository::new(db.clone(), Signer::disabled());

    let held = db.begin().await.unwrap();
    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(5), repo.put(Metric::counter("C", 1)))
        .await
        .expect("put should give up once the acquire timeout passes");
    assert!(matches!(result, Err(StorageError::Database(_))));
    assert!(started.elapsed() < Duration::from_secs(5));

    held.rollback().await.unwrap();
    assert_eq!(
        repo.put(Metric::counter("C", 1)).await.unwrap().value,
        MetricValue::Counter(1)
    );
}

// ---- snapshot file ----

/// Memory repository whose first `all()` stalls after taking its copy.
struct SlowFirstRead {
    inner: MemoryRepository,
    stalled: AtomicBool,
}

impl SlowFirstRead {
    fn new() -> Self {
        Self {
            inner: memory(),
            stalled: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Repository for SlowFirstRead {
    async fn get(&self, id: &str) -> Result<Metric> {
        self.inner.get(id).await
    }

    async fn put(&self, metric: Metric) -> Result<Metric> {
        self.inner.put(metric).await
    }

    async fn put_batch(&self, metrics: Vec<Metric>) -> Result<()> {
        self.inner.put_batch(metrics).await
    }

    async fn all(&self) -> Result<MetricMap> {
        let metrics = self.inner.all().await?;
        if !self.stalled.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(metrics)
    }

    async fn update_all(&self, metrics: MetricMap) -> Result<()> {
        self.inner.update_all(metrics).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn snapshot_persists_land_in_table_order() {
    let dir = TempDir::new().unwrap();
    let file = Arc::new(SnapshotFile::new(dir.path().join("db.json")));
    let repo = Arc::new(SlowFirstRead::new());
    repo.put(Metric::gauge("A", 1.0)).await.unwrap();

    let first = {
        let file = file.clone();
        let repo = repo.clone();
        tokio::spawn(async move { file.persist_from(repo.as_ref()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    repo.put(Metric::gauge("B", 2.0)).await.unwrap();
    file.persist_from(repo.as_ref()).await.unwrap();
    first.await.unwrap().unwrap();

    let on_disk = file.read().await.unwrap();
    assert_eq!(on_disk, repo.all().await.unwrap());
    assert_eq!(on_disk.len(), 2);
}

#[tokio::test]
async fn snapshot_entries_are_keyed_by_their_own_id() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(
        &path,
        r#"{"a": {"id": "b", "type": "counter", "delta": 3}, "z": {"id": "z", "type": "gauge", "value": 1.0}}"#,
    )
    .unwrap();

    let metrics = SnapshotFile::new(path).read().await.unwrap();
    assert_eq!(metrics.len(), 2);
    assert!(!metrics.contains_key("a"));
    assert_eq!(metrics["b"].value, MetricValue::Counter(3));
    assert_eq!(metrics["z"].id, "z");
}

#[tokio::test]
async fn restore_resigns_with_current_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(
        &path,
        r#"{"Hits": {"id": "Hits", "type": "counter", "delta": 5, "hash": "deadbeef"}}"#,
    )
    .unwrap();

    let signer = Signer::new("secret");
    let repo = MemoryRepository::new(signer.clone());
    SnapshotFile::new(path).restore_into(&repo).await.unwrap();

    let restored = repo.get("Hits").await.unwrap();
    assert_eq!(restored.hash, signer.sign("Hits", &MetricValue::Counter(5)));
    assert!(signer.verify(&restored).is_ok());
}

#[tokio::test]
async fn snapshot_missing_or_empty_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let file = SnapshotFile::new(dir.path().join("absent.json"));
    assert!(file.read().await.unwrap().is_empty());

    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, "").unwrap();
    assert!(SnapshotFile::new(empty).read().await.unwrap().is_empty());
}

#[tokio::test]
async fn snapshot_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(
        SnapshotFile::new(path).read().await,
        Err(StorageError::Json(_))
    ));
}

#[tokio::test]
async fn snapshot_restores_into_fresh_repository() {
    let dir = TempDir::new().unwrap();
    let file = SnapshotFile::new(dir.path().join("nested").join("db.json"));

    let source = memory();
    source.put(Metric::counter("PollCount", 10)).await.unwrap();
    source.put(Metric::gauge("Alloc", 0.1)).await.unwrap();
    assert_eq!(file.persist_from(&source).await.unwrap(), 2);

    let target = memory();
    target.put(Metric::gauge("Stale", 1.0)).await.unwrap();
    assert_eq!(file.restore_into(&target).await.unwrap(), 2);

    assert_eq!(target.all().await.unwrap(), source.all().await.unwrap());
    assert!(!dir.path().join("nested").join("db.json.tmp").exists());
}

#[tokio::test]
async fn snapshot_output_is_keyed_by_id_and_sorted() {
    let dir = TempDir::new().unwrap();
    let file = SnapshotFile::new(dir.path().join("db.json"));
    file.write(&map([Metric::gauge("b", 1.0), Metric::counter("a", 2)]))
        .await
        .unwrap();

    let text = std::fs::read_to_string(file.path()).unwrap();
    assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["a"]["type"], "counter");
    assert_eq!(json["a"]["delta"], 2);
    assert_eq!(json["b"]["value"], 1.0);
}

// ---- properties ----

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn finite_gauge() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1.0e12f64..1.0e12,
        any::<f64>().prop_filter("finite", |v| v.is_finite()),
    ]
}

fn metric() -> impl Strategy<Value = Metric> {
    let id = "[A-Za-z][A-Za-z0-9_]{0,12}";
    prop_oneof![
        (id, finite_gauge()).prop_map(|(id, v)| Metric::gauge(id, v)),
        (id, any::<i64>()).prop_map(|(id, d)| Metric::counter(id, d)),
    ]
}

proptest! {
    #[test]
    fn counter_total_is_sum_of_deltas(deltas in prop::collection::vec(-1_000_000i64..1_000_000, 1..40)) {
        let repo = memory();
        let total = block_on(async {
            for d in &deltas {
                repo.put(Metric::counter("C", *d)).await.unwrap();
            }
            repo.get("C").await.unwrap()
        });
        prop_assert_eq!(total.value, MetricValue::Counter(deltas.iter().sum()));
    }

    #[test]
    fn snapshot_round_trip_preserves_table(metrics in prop::collection::vec(metric(), 0..20)) {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("db.json"));
        let table = map(metrics);
        let restored = block_on(async {
            file.write(&table).await.unwrap();
            file.read().await.unwrap()
        });
        prop_assert_eq!(restored, table);
    }
}
