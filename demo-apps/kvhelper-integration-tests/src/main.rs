//! kvhelper Integration Tests
//!
//! Runs the kvhelper client against a live Redis server. Connection settings
//! come from the `KVHELPER_*` environment variables.

use anyhow::Result;
use futures::future::join_all;
use kvhelper_client::{ClientOptions, KvClient, Ttl, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kvhelper_integration_tests=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Every run writes under its own prefix so reruns never collide
    let options = ClientOptions::from_env()?;
    let run_prefix = format!("{}it-{}:", options.prefix, uuid::Uuid::new_v4());
    let options = options.with_prefix(run_prefix.clone());

    tracing::info!("kvhelper Integration Tests");
    tracing::info!("   Server: {}", options.url());
    tracing::info!("   Prefix: {}", run_prefix);
    println!();

    let client = KvClient::with_options(options).await?;
    client.ping().await?;

    let outcome = run_all(&client).await;

    let removed = client.delete_matching("*").await?;
    tracing::info!("Cleaned up {} keys", removed);

    outcome?;
    println!();
    tracing::info!("All tests passed!");

    Ok(())
}

async fn run_all(client: &KvClient) -> Result<()> {
    test_basic_operations(client).await?;
    test_coercion(client).await?;
    test_keys_and_exists(client).await?;
    test_hashes(client).await?;
    test_sets(client).await?;
    test_parallel_set_get(client).await?;
    test_expiration(client).await?;
    test_json(client).await?;
    Ok(())
}

/// SET/GET/DELETE
async fn test_basic_operations(client: &KvClient) -> Result<()> {
    tracing::info!("Test: Basic Operations");

    let key = format!("basic-{}", uuid::Uuid::new_v4());
    client.set(&key, "hello world", Some(60)).await?;

    let result = client.get(&key).await?;
    assert_eq!(result, Value::from("hello world"), "Value should match");
    tracing::info!("   GET {} -> {}", key, result);

    assert!(client.delete(&key).await?, "Key should be deleted");
    assert!(!client.delete(&key).await?, "Second delete finds nothing");

    let result = client.get(&key).await?;
    assert_eq!(result, Value::Null, "Deleted key should read as null");

    tracing::info!("   ok");
    Ok(())
}

/// Stored text comes back typed
async fn test_coercion(client: &KvClient) -> Result<()> {
    tracing::info!("Test: Coercion");

    let cases = [
        ("int", Value::Int(192), Value::Int(192)),
        ("float", Value::Float(10.11), Value::Float(10.11)),
        ("integral-float", Value::Float(10.0), Value::Int(10)),
        ("text", Value::from("abc"), Value::from("abc")),
        ("zero", Value::Int(0), Value::Null),
        ("null", Value::Null, Value::Null),
        ("undefined", Value::Undefined, Value::Undefined),
    ];

    for (key, stored, expected) in cases {
        client.set(key, stored.clone(), Some(60)).await?;
        let result = client.get(key).await?;
        assert_eq!(result, expected, "{} stored as {:?}", key, stored);
        tracing::info!("   {:?} -> {:?}", stored, result);
    }

    tracing::info!("   ok");
    Ok(())
}

/// KEYS (SCAN) and EXISTS
async fn test_keys_and_exists(client: &KvClient) -> Result<()> {
    tracing::info!("Test: Keys and Exists");

    let group = format!("keys-{}", uuid::Uuid::new_v4());
    let keys: Vec<String> = ["c", "a", "b"]
        .iter()
        .map(|suffix| format!("{}:{}", group, suffix))
        .collect();

    for key in &keys {
        client.set(key, "value", Some(60)).await?;
    }

    assert!(client.exists(&keys[0]).await?, "Key should exist");
    assert!(!client.exists("nonexistent-key").await?, "Missing key should not exist");

    let pattern = format!("{}:*", group);
    let found = client.keys(&pattern).await?;
    let mut expected = keys.clone();
    expected.sort();
    assert_eq!(found, expected, "Keys come back sorted without the prefix");
    tracing::info!("   KEYS {} -> {} keys", pattern, found.len());

    assert_eq!(client.delete_matching(&pattern).await?, 3);
    assert!(client.keys(&pattern).await?.is_empty());

    tracing::info!("   ok");
    Ok(())
}

async fn test_hashes(client: &KvClient) -> Result<()> {
    tracing::info!("Test: Hashes");

    let key = format!("hash-{}", uuid::Uuid::new_v4());
    let new_fields = client
        .hset_many(
            &key,
            [
                ("name", Value::from("alice")),
                ("age", Value::Int(30)),
                ("score", Value::Float(9.5)),
            ],
        )
        .await?;
    assert_eq!(new_fields, 3);
    assert!(!client.hset(&key, "name", "alicia").await?, "Field already existed");

    assert_eq!(client.hget(&key, "age").await?, Value::Int(30));
    assert_eq!(client.hget(&key, "missing").await?, Value::Null);

    let all = client.hgetall(&key).await?;
    assert_eq!(all.len(), 3);
    assert_eq!(all["name"], Value::from("alicia"));
    assert_eq!(all["score"], Value::Float(9.5));

    assert_eq!(client.hdel(&key, ["score", "missing"]).await?, 1);
    assert!(client.sadd(&key, ["member"]).await.is_err_and(|e| e.is_wrong_type()));

    tracing::info!("   ok");
    Ok(())
}

async fn test_sets(client: &KvClient) -> Result<()> {
    tracing::info!("Test: Sets");

    let key = format!("set-{}", uuid::Uuid::new_v4());
    assert_eq!(client.sadd(&key, ["rust", "redis", "rust"]).await?, 2);
    assert!(client.sismember(&key, "redis").await?);
    assert!(!client.sismember(&key, "go").await?);
    assert_eq!(client.smembers(&key).await?, vec!["redis", "rust"]);
    assert_eq!(client.srem(&key, ["rust"]).await?, 1);
    assert_eq!(client.smembers(&key).await?, vec!["redis"]);

    tracing::info!("   ok");
    Ok(())
}

/// Concurrent SET and GET from clones of one client; no values get mixed up
async fn test_parallel_set_get(client: &KvClient) -> Result<()> {
    let num_operations = 500;
    tracing::info!("Test: Parallel SET/GET ({} concurrent operations)", num_operations);

    let start = Instant::now();
    let test_data: Vec<(String, String)> = (0..num_operations)
        .map(|i| {
            let key = format!("parallel-{}-{}", i, uuid::Uuid::new_v4());
            let value = format!("value-{}-{}", i, uuid::Uuid::new_v4());
            (key, value)
        })
        .collect();

    let set_futures: Vec<_> = test_data
        .iter()
        .map(|(key, value)| {
            let client = client.clone();
            let key = key.clone();
            let value = value.clone();
            async move {
                client.set(&key, value, Some(300)).await?;
                Ok::<_, anyhow::Error>(())
            }
        })
        .collect();

    join_all(set_futures)
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let set_elapsed = start.elapsed();
    let get_start = Instant::now();
    let errors = Arc::new(AtomicUsize::new(0));

    let get_futures: Vec<_> = test_data
        .iter()
        .map(|(key, expected)| {
            let client = client.clone();
            let key = key.clone();
            let expected = Value::from(expected.as_str());
            let errors = Arc::clone(&errors);
            async move {
                let result = client.get(&key).await?;
                if result != expected {
                    tracing::error!(
                        "Value mismatch for key {}: expected {:?}, got {:?}",
                        key,
                        expected,
                        result
                    );
                    errors.fetch_add(1, Ordering::SeqCst);
                }
                Ok::<_, anyhow::Error>(())
            }
        })
        .collect();

    join_all(get_futures)
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let get_elapsed = get_start.elapsed();
    tracing::info!(
        "   Throughput: {:.0} ops/sec (SET), {:.0} ops/sec (GET)",
        num_operations as f64 / set_elapsed.as_secs_f64(),
        num_operations as f64 / get_elapsed.as_secs_f64()
    );

    assert_eq!(errors.load(Ordering::SeqCst), 0, "No errors should occur");
    tracing::info!("   ok, {} values verified", num_operations);
    Ok(())
}

/// TTL, EXPIRE and PERSIST
async fn test_expiration(client: &KvClient) -> Result<()> {
    tracing::info!("Test: Expiration");

    let key = format!("expire-{}", uuid::Uuid::new_v4());
    client.set(&key, "temporary", Some(1)).await?;
    assert!(matches!(client.ttl(&key).await?, Ttl::Expires(0..=1)));

    tracing::info!("   Waiting 2 seconds for expiration...");
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(client.get(&key).await?, Value::Null, "Key should be expired");
    assert_eq!(client.ttl(&key).await?, Ttl::Missing);

    client.set(&key, "again", None).await?;
    assert_eq!(client.ttl(&key).await?, Ttl::Persistent);
    assert!(client.expire(&key, 120).await?);
    assert!(matches!(client.ttl(&key).await?, Ttl::Expires(119..=120)));
    assert!(client.persist(&key).await?);
    assert_eq!(client.ttl(&key).await?, Ttl::Persistent);

    tracing::info!("   ok");
    Ok(())
}

async fn test_json(client: &KvClient) -> Result<()> {
    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct Session {
        user: String,
        roles: Vec<String>,
    }

    tracing::info!("Test: JSON");

    let key = format!("json-{}", uuid::Uuid::new_v4());
    let session = Session {
        user: "alice".to_string(),
        roles: vec!["admin".to_string()],
    };

    client.set_json(&key, &session, Some(60)).await?;
    assert_eq!(client.get_json::<Session>(&key).await?, Some(session));
    assert_eq!(client.get_json::<Session>("json-missing").await?, None);

    tracing::info!("   ok");
    Ok(())
}
