//! Tests for the client against the in-memory backend.

use super::*;

fn client() -> KvClient<MemoryBackend> {
    KvClient::in_memory(&ClientOptions::default().with_prefix("test:"))
}

#[tokio::test]
async fn test_set_and_get_coerces_values() {
    let client = client();

    client.set("int", 123, None).await.unwrap();
    client.set("float", 10.11, None).await.unwrap();
    client.set("text", "abc", None).await.unwrap();
    client.set("numeric-text", "192", None).await.unwrap();

    assert_eq!(client.get("int").await.unwrap(), Value::Int(123));
    assert_eq!(client.get("float").await.unwrap(), Value::Float(10.11));
    assert_eq!(client.get("text").await.unwrap(), Value::from("abc"));
    assert_eq!(client.get("numeric-text").await.unwrap(), Value::Int(192));
}

#[tokio::test]
async fn test_get_missing_key_is_null() {
    let client = client();

    assert_eq!(client.get("missing").await.unwrap(), Value::Null);
    assert_eq!(client.get_raw("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_null_and_undefined_round_trip() {
    let client = client();

    client.set("null", Value::Null, None).await.unwrap();
    client.set("undefined", Value::Undefined, None).await.unwrap();

    assert_eq!(client.get_raw("null").await.unwrap().as_deref(), Some("null"));
    assert_eq!(client.get("null").await.unwrap(), Value::Null);
    assert_eq!(client.get("undefined").await.unwrap(), Value::Undefined);
}

#[tokio::test]
async fn test_stored_zero_reads_back_as_null() {
    let client = client();
    client.set("zero", 0, None).await.unwrap();

    assert_eq!(client.get_raw("zero").await.unwrap().as_deref(), Some("0"));
    assert_eq!(client.get("zero").await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_prefix_is_applied_and_stripped() {
    let client = client();
    client.set("user:1", "alice", None).await.unwrap();

    let store = client.backend().store();
    assert_eq!(store.get("test:user:1").unwrap(), Some("alice".to_string()));
    assert_eq!(store.get("user:1").unwrap(), None);

    assert_eq!(client.keys("user:*").await.unwrap(), vec!["user:1"]);
}

#[tokio::test]
async fn test_clients_with_other_prefixes_are_isolated() {
    let first = client();
    let second = KvClient::with_backend(first.backend().clone(), "other:");

    first.set("shared-name", "first", None).await.unwrap();
    second.set("shared-name", "second", None).await.unwrap();

    assert_eq!(first.get("shared-name").await.unwrap(), Value::from("first"));
    assert_eq!(second.get("shared-name").await.unwrap(), Value::from("second"));
    assert_eq!(first.keys("*").await.unwrap(), vec!["shared-name"]);
}

#[tokio::test]
async fn test_prefix_with_pattern_characters_stays_in_its_namespace() {
    let first = KvClient::in_memory(&ClientOptions::default().with_prefix("app[1]:"));
    let second = KvClient::with_backend(first.backend().clone(), "app1:");

    first.set("mine", "a", None).await.unwrap();
    second.set("theirs", "b", None).await.unwrap();

    assert_eq!(first.keys("*").await.unwrap(), vec!["mine"]);
    assert_eq!(second.keys("*").await.unwrap(), vec!["theirs"]);

    assert_eq!(first.delete_matching("*").await.unwrap(), 1);
    assert_eq!(first.get("mine").await.unwrap(), Value::Null);
    assert_eq!(second.get("theirs").await.unwrap(), Value::from("b"));
}

#[tokio::test]
async fn test_keys_accept_negated_classes() {
    let client = client();
    for key in ["ax", "bx", "cx"] {
        client.set(key, 1, None).await.unwrap();
    }

    assert_eq!(client.keys("[^a]x").await.unwrap(), vec!["bx", "cx"]);
    assert_eq!(client.keys("**x").await.unwrap(), vec!["ax", "bx", "cx"]);
}

#[tokio::test]
async fn test_clones_share_backend() {
    let client = client();
    let clone = client.clone();

    client.set("k", "v", None).await.unwrap();
    assert_eq!(clone.get("k").await.unwrap(), Value::from("v"));
    assert_eq!(clone.prefix(), "test:");
}

#[tokio::test]
async fn test_delete_and_exists() {
    let client = client();
    client.set("a", 1, None).await.unwrap();
    client.set("b", 2, None).await.unwrap();
    client.set("c", 3, None).await.unwrap();

    assert!(client.exists("a").await.unwrap());
    assert!(client.delete("a").await.unwrap());
    assert!(!client.delete("a").await.unwrap());
    assert!(!client.exists("a").await.unwrap());

    assert_eq!(client.delete_many(["b", "c", "nope"]).await.unwrap(), 2);
    assert_eq!(client.delete_many(Vec::<String>::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_ttl_expire_and_persist() {
    let client = client();

    client.set("session", "data", Some(60)).await.unwrap();
    assert!(matches!(client.ttl("session").await.unwrap(), Ttl::Expires(59..=60)));

    client.set("forever", "data", Some(0)).await.unwrap();
    assert_eq!(client.ttl("forever").await.unwrap(), Ttl::Persistent);
    assert_eq!(client.ttl("missing").await.unwrap(), Ttl::Missing);

    assert!(client.expire("forever", 30).await.unwrap());
    assert!(matches!(client.ttl("forever").await.unwrap(), Ttl::Expires(29..=30)));
    assert!(!client.expire("missing", 30).await.unwrap());

    assert!(client.persist("session").await.unwrap());
    assert_eq!(client.ttl("session").await.unwrap(), Ttl::Persistent);
}

#[tokio::test]
async fn test_keys_sorted_by_pattern() {
    let client = client();
    for key in ["job:3", "job:1", "job:2", "lock:1"] {
        client.set(key, "x", None).await.unwrap();
    }

    assert_eq!(
        client.keys("job:*").await.unwrap(),
        vec!["job:1", "job:2", "job:3"]
    );
    assert_eq!(client.keys("*").await.unwrap().len(), 4);
    assert!(client.keys("none:*").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_pattern_is_reported() {
    let client = client();
    let err = client.keys("[oops").await.unwrap_err();

    assert!(matches!(err, Error::InvalidPattern(_)));
}

#[tokio::test]
async fn test_delete_matching() {
    let client = client();
    for i in 0..1200 {
        client.set(&format!("tmp:{}", i), i, None).await.unwrap();
    }
    client.set("keep", "me", None).await.unwrap();

    assert_eq!(client.delete_matching("tmp:*").await.unwrap(), 1200);
    assert_eq!(client.keys("*").await.unwrap(), vec!["keep"]);
    assert_eq!(client.delete_matching("tmp:*").await.unwrap(), 0);
}

#[tokio::test]
async fn test_hash_fields_are_coerced() {
    let client = client();

    assert!(client.hset("user:1", "name", "alice").await.unwrap());
    assert!(!client.hset("user:1", "name", "alicia").await.unwrap());
    assert_eq!(
        client
            .hset_many(
                "user:1",
                [
                    ("age", Value::Int(30)),
                    ("score", Value::Float(9.5)),
                    ("nickname", Value::Null),
                ],
            )
            .await
            .unwrap(),
        3
    );

    assert_eq!(client.hget("user:1", "age").await.unwrap(), Value::Int(30));
    assert_eq!(client.hget("user:1", "missing").await.unwrap(), Value::Null);

    let all = client.hgetall("user:1").await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all["name"], Value::from("alicia"));
    assert_eq!(all["age"], Value::Int(30));
    assert_eq!(all["score"], Value::Float(9.5));
    assert_eq!(all["nickname"], Value::Null);

    assert_eq!(client.hdel("user:1", ["nickname", "nope"]).await.unwrap(), 1);
    assert_eq!(client.hgetall("user:1").await.unwrap().len(), 3);
    assert!(client.hgetall("missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hset_from_config_map() {
    let client = client();
    let config = ConfigMap::from([
        ("host".to_string(), Value::from("localhost")),
        ("port".to_string(), Value::Int(6379)),
    ]);

    assert_eq!(client.hset_many("config", config.clone()).await.unwrap(), 2);
    assert_eq!(client.hgetall("config").await.unwrap(), config);
}

#[tokio::test]
async fn test_set_members() {
    let client = client();

    assert_eq!(client.sadd("tags", ["rust", "redis", "rust"]).await.unwrap(), 2);
    assert_eq!(client.sadd("tags", ["async"]).await.unwrap(), 1);
    assert_eq!(
        client.smembers("tags").await.unwrap(),
        vec!["async", "redis", "rust"]
    );
    assert!(client.sismember("tags", "rust").await.unwrap());
    assert!(!client.sismember("tags", "go").await.unwrap());

    assert_eq!(client.srem("tags", ["rust", "go"]).await.unwrap(), 1);
    assert_eq!(client.smembers("tags").await.unwrap(), vec!["async", "redis"]);
    assert!(client.smembers("missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_type_is_reported() {
    let client = client();
    client.set("plain", "value", None).await.unwrap();
    client.sadd("members", ["a"]).await.unwrap();

    let err = client.hget("plain", "field").await.unwrap_err();
    assert!(err.is_wrong_type());

    let err = client.get("members").await.unwrap_err();
    assert!(err.is_wrong_type());
}

#[tokio::test]
async fn test_ping() {
    client().ping().await.unwrap();
}

#[test]
fn test_truncate_key_for_log() {
    assert_eq!(truncate_key_for_log("short"), "short");

    let long = "k".repeat(40);
    assert_eq!(truncate_key_for_log(&long), format!("{}...", "k".repeat(32)));

    // Multi-byte characters are not split
    let wide = "é".repeat(40);
    assert_eq!(truncate_key_for_log(&wide), format!("{}...", "é".repeat(32)));
}

#[cfg(feature = "json")]
#[tokio::test]
async fn test_json_round_trip() {
    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct User {
        name: String,
        age: u32,
    }

    let client = client();
    let user = User {
        name: "Alice".to_string(),
        age: 30,
    };

    client.set_json("user", &user, Some(60)).await.unwrap();
    assert_eq!(client.get_json::<User>("user").await.unwrap(), Some(user));
    assert_eq!(client.get_json::<User>("missing").await.unwrap(), None);

    client.set("broken", "{not json", None).await.unwrap();
    assert!(matches!(
        client.get_json::<User>("broken").await,
        Err(Error::Deserialization(_))
    ));
}
