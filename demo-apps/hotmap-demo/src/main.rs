use anyhow::{ensure, Context, Result};
use futures::future::join_all;
use hotmap_core::{Hotmap, HotmapConfig, DEFAULT_TTL};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotmap_demo=info,hotmap_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration from environment variables
    let default_ttl = match std::env::var("HOTMAP_DEFAULT_TTL_MS") {
        Ok(raw) => Duration::from_millis(
            raw.parse::<u64>()
                .with_context(|| format!("invalid HOTMAP_DEFAULT_TTL_MS: {raw}"))?,
        ),
        Err(_) => DEFAULT_TTL,
    };

    let hotmap = Hotmap::with_config(HotmapConfig::default().with_default_ttl(default_ttl));

    tracing::info!("Hotmap demo");
    tracing::info!("   Default TTL: {:?}", hotmap.duration());

    test_basic_operations(&hotmap)?;
    test_parallel_set_get(&hotmap).await?;
    test_consume_once(&hotmap).await?;
    test_data_isolation(&hotmap).await?;
    test_expiration(&hotmap).await?;
    test_close(hotmap).await?;

    tracing::info!("All checks passed");

    Ok(())
}

/// SET/GET/DELETE and the overwrite scenario
fn test_basic_operations(hotmap: &Hotmap) -> Result<()> {
    tracing::info!("Check: Basic Operations");

    hotmap.set("hello", "world");
    ensure!(hotmap.get("hello").as_deref() == Some("world"), "value should be found");

    hotmap.set("hello", "world");
    hotmap.set("hello", "multiverse");
    ensure!(
        hotmap.get("hello").as_deref() == Some("multiverse"),
        "value should be overwritten"
    );
    ensure!(hotmap.get("hello").is_none(), "value should be consumed");

    hotmap.set("doomed", "value");
    hotmap.delete("doomed");
    hotmap.delete("doomed");
    ensure!(hotmap.get("doomed").is_none(), "key should be gone after delete");

    tracing::info!("   ✓ Basic operations work correctly");
    Ok(())
}

/// Parallel SET and GET from many tasks, verifying no data mixing
async fn test_parallel_set_get(hotmap: &Hotmap) -> Result<()> {
    let num_operations = 500;
    tracing::info!("Check: Parallel SET/GET ({} concurrent operations)", num_operations);

    let test_data: Vec<(String, String)> = (0..num_operations)
        .map(|i| (format!("parallel-{}", i), format!("value-{}", i)))
        .collect();

    let start = Instant::now();
    let set_tasks: Vec<_> = test_data
        .iter()
        .cloned()
        .map(|(key, value)| {
            let hotmap = hotmap.clone();
            tokio::spawn(async move { hotmap.set(key, value) })
        })
        .collect();

    for result in join_all(set_tasks).await {
        result?;
    }
    let set_elapsed = start.elapsed();
    ensure!(hotmap.len() == num_operations, "all keys should be stored");

    let get_start = Instant::now();
    let errors = Arc::new(AtomicUsize::new(0));
    let get_tasks: Vec<_> = test_data
        .iter()
        .cloned()
        .map(|(key, expected_value)| {
            let hotmap = hotmap.clone();
            let errors = Arc::clone(&errors);
            tokio::spawn(async move {
                let value = hotmap.get(&key);
                if value.as_deref() != Some(expected_value.as_str()) {
                    tracing::error!(
                        "Value mismatch for key {}: expected '{}', got '{:?}'",
                        key,
                        expected_value,
                        value
                    );
                    errors.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for result in join_all(get_tasks).await {
        result?;
    }
    let get_elapsed = get_start.elapsed();

    tracing::info!("   SET {} keys in {:?}", num_operations, set_elapsed);
    tracing::info!("   GET {} keys in {:?}", num_operations, get_elapsed);

    let error_count = errors.load(Ordering::SeqCst);
    ensure!(error_count == 0, "{} values did not match", error_count);
    ensure!(hotmap.is_empty(), "every read value should be consumed");

    tracing::info!("   ✓ All {} values verified correctly", num_operations);
    Ok(())
}

/// Many readers racing for the same keys: each value is handed out once
async fn test_consume_once(hotmap: &Hotmap) -> Result<()> {
    let num_keys = 200;
    let num_readers = 16;
    tracing::info!("Check: Consume Once ({} readers, {} keys)", num_readers, num_keys);

    for i in 0..num_keys {
        hotmap.set(format!("contested-{}", i), format!("value-{}", i));
    }

    let hits = Arc::new(AtomicUsize::new(0));
    let readers: Vec<_> = (0..num_readers)
        .map(|_| {
            let hotmap = hotmap.clone();
            let hits = Arc::clone(&hits);
            tokio::task::spawn_blocking(move || {
                for i in 0..num_keys {
                    if hotmap.get(&format!("contested-{}", i)).is_some() {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for result in join_all(readers).await {
        result?;
    }

    let hits = hits.load(Ordering::SeqCst);
    ensure!(hits == num_keys, "expected {} reads, got {}", num_keys, hits);

    tracing::info!("   ✓ {} values consumed exactly once", hits);
    Ok(())
}

/// Concurrent writers on disjoint keys don't interfere
async fn test_data_isolation(hotmap: &Hotmap) -> Result<()> {
    tracing::info!("Check: Data Isolation (concurrent writes to different keys)");

    let num_clients = 50;
    let ops_per_client = 20;
    let semaphore = Arc::new(Semaphore::new(16)); // Limit concurrent writers

    let results = Arc::new(tokio::sync::Mutex::new(HashMap::new()));

    let client_futures: Vec<_> = (0..num_clients)
        .map(|client_id| {
            let hotmap = hotmap.clone();
            let results = Arc::clone(&results);
            let semaphore = Arc::clone(&semaphore);

            async move {
                let _permit = semaphore.acquire().await?;

                for op in 0..ops_per_client {
                    let key = format!("isolation-client{}-op{}", client_id, op);
                    let value = format!("client{}-value{}", client_id, op);

                    results.lock().await.insert(key.clone(), value.clone());
                    hotmap.set(key, value);
                    tokio::task::yield_now().await;
                }

                Ok::<_, anyhow::Error>(())
            }
        })
        .collect();

    join_all(client_futures)
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let expected = results.lock().await;
    let mut errors = 0;

    for (key, expected_value) in expected.iter() {
        let value = hotmap.get(key);
        if value.as_deref() != Some(expected_value.as_str()) {
            tracing::error!(
                "Isolation failure: key={}, expected={}, got={:?}",
                key,
                expected_value,
                value
            );
            errors += 1;
        }
    }

    ensure!(errors == 0, "{} isolation failures", errors);
    tracing::info!("   ✓ {} keys verified, no cross-contamination", expected.len());
    Ok(())
}

/// Entries vanish once their TTL elapses, and overwrites restart the clock
async fn test_expiration(hotmap: &Hotmap) -> Result<()> {
    tracing::info!("Check: TTL Expiration");

    let previous_ttl = hotmap.duration();
    hotmap.set_duration(Duration::from_millis(300));

    hotmap.set("expire-test", "temporary");
    hotmap.set("overwrite-test", "first");

    tokio::time::sleep(Duration::from_millis(200)).await;
    hotmap.set("overwrite-test", "second");

    tracing::info!("   Waiting for expiration...");
    tokio::time::sleep(Duration::from_millis(200)).await;

    ensure!(hotmap.get("expire-test").is_none(), "key should be expired after TTL");
    ensure!(
        hotmap.get("overwrite-test").as_deref() == Some("second"),
        "overwritten key should keep its fresh TTL"
    );

    hotmap.set_duration(Duration::ZERO);
    hotmap.set("zero-ttl", "gone");
    tokio::time::sleep(Duration::from_millis(50)).await;
    ensure!(hotmap.get("zero-ttl").is_none(), "zero TTL should expire immediately");

    hotmap.set_duration(previous_ttl);

    tracing::info!("   ✓ TTL expiration works correctly");
    Ok(())
}

/// Close drains everything and later writes are ignored
async fn test_close(hotmap: Hotmap) -> Result<()> {
    tracing::info!("Check: Close");

    for i in 0..100 {
        hotmap.set_with_ttl(format!("close-{}", i), "value", Duration::from_millis(100));
    }

    hotmap.close();
    ensure!(hotmap.is_empty(), "close should flush every entry");

    hotmap.set("after-close", "value");
    tokio::time::sleep(Duration::from_millis(200)).await;

    ensure!(hotmap.is_empty(), "no entry should appear after close");
    ensure!(hotmap.get("close-0").is_none(), "flushed entries should be gone");

    tracing::info!("   ✓ Close drains everything");
    Ok(())
}
