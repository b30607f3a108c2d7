use std::time::Duration;

use docbucket::{
    memory::{BucketAccess, InMemoryServer},
    prelude::*,
};
use serde::{Deserialize, Serialize};

fn minecraft() -> Book {
    Book::new("978-1-4919-1889-0", "Minecraft Modding with Forge", "29.99")
}

async fn connect_to(host: &str) -> DynCluster {
    connect(&format!("memory://{host}"), ClusterOptions::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_put_then_get_returns_the_document() {
    let cluster = connect_to("bucket-round-trip").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();

    bucket.put("u:book1", &minecraft()).await.unwrap();

    let book: Book = bucket.get("u:book1").await.unwrap();
    assert_eq!(book, minecraft());
    assert!(bucket.exists("u:book1").await.unwrap());
}

#[tokio::test]
async fn test_put_replaces_without_merging() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Partial {
        isbn: String,
    }

    let cluster = connect_to("bucket-upsert").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();

    bucket.put("u:book1", &minecraft()).await.unwrap();
    bucket
        .put("u:book1", &Partial { isbn: "0-596-00048-0".into() })
        .await
        .unwrap();

    let row = bucket.get_content("u:book1").await.unwrap();
    assert_eq!(row.as_document(), &docbucket::bson::doc! { "isbn": "0-596-00048-0" });

    let err = bucket.get::<Book>("u:book1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
}

#[tokio::test]
async fn test_missing_key_is_not_found() {
    let cluster = connect_to("bucket-missing").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();

    let err = bucket.get::<Book>("u:nope").await.unwrap_err();
    assert_eq!(err, DocumentStoreError::DocumentNotFound("u:nope".into(), "default".into()));
    assert!(!bucket.exists("u:nope").await.unwrap());
}

#[tokio::test]
async fn test_non_object_documents_are_rejected() {
    let cluster = connect_to("bucket-invalid").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();

    let err = bucket.put("u:list", &vec!["a".to_string(), "b".to_string()]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
}

#[tokio::test]
async fn test_expired_documents_disappear() {
    let cluster = connect_to("bucket-expiry").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();

    bucket
        .put_with_options("u:temp", &minecraft(), PutOptions::new().expiry(Duration::from_millis(50)))
        .await
        .unwrap();
    assert!(bucket.exists("u:temp").await.unwrap());

    tokio::time::sleep(Duration::from_millis(120)).await;

    let err = bucket.get::<Book>("u:temp").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_typed_bucket() {
    let cluster = connect_to("bucket-typed").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();
    let books = bucket.typed::<Book>();

    books.put("u:book1", &minecraft()).await.unwrap();
    books
        .put("u:book2", &Book::new("978-0-596-00048-5", "Programming Perl", "44.95"))
        .await
        .unwrap();

    assert_eq!(books.name(), "default");
    assert_eq!(books.get("u:book1").await.unwrap(), minecraft());

    let cheap = books.find(Some(Filter::lt("cost", "30"))).await.unwrap();
    assert_eq!(cheap, vec![minecraft()]);
    assert_eq!(books.find(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_open_bucket_checks_credentials() {
    let server = InMemoryServer::shared("bucket-auth").await;
    server
        .create_bucket("catalog", BucketAccess::restricted().user("reader", "s3cret"))
        .await;

    let cluster = connect_to("bucket-auth").await;

    let err = cluster
        .open_bucket("catalog", Credentials::password("reader", "wrong"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);

    let err = cluster.open_bucket("catalog", Credentials::Anonymous).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);

    let bucket = cluster
        .open_bucket("catalog", Credentials::password("reader", "s3cret"))
        .await
        .unwrap();
    assert_eq!(bucket.name(), "catalog");
}

#[tokio::test]
async fn test_unknown_bucket_is_not_found() {
    let cluster = connect_to("bucket-unknown").await;

    let err = cluster.open_bucket("beer-sample", Credentials::Anonymous).await.unwrap_err();
    assert_eq!(err, DocumentStoreError::BucketNotFound("beer-sample".into()));
}

#[tokio::test]
async fn test_connect_errors() {
    let err = connect("localhost:8091", ClusterOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);

    let err = connect("memory://host:port", ClusterOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);

    let err = connect("couchbase://localhost", ClusterOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("unsupported scheme"));
}

#[tokio::test]
async fn test_unreachable_service() {
    let server = InMemoryServer::shared("bucket-offline").await;
    let cluster = connect_to("bucket-offline").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();

    server.set_online(false);

    // A write that cannot reach the service is a failed write
    let err = bucket.put("u:book1", &minecraft()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(err.to_string().contains("unreachable"));

    let err = bucket.get::<Book>("u:book1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);

    let err = connect("memory://bucket-offline", ClusterOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);

    server.set_online(true);
    bucket.put("u:book1", &minecraft()).await.unwrap();
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = InMemoryServer::shared("bucket-slow").await;
    let cluster = connect(
        "memory://bucket-slow",
        ClusterOptions::default().with_kv_timeout(Duration::from_millis(20)),
    )
    .await
    .unwrap();
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();

    server.set_latency(Duration::from_millis(200)).await;

    let err = bucket.get::<Book>("u:book1").await.unwrap_err();
    assert_eq!(err, DocumentStoreError::Timeout("get".into(), Duration::from_millis(20)));

    // A per-operation timeout overrides the cluster default
    let err = bucket
        .put_with_options("u:book1", &minecraft(), PutOptions::new().timeout(Duration::from_millis(5)))
        .await
        .unwrap_err();
    assert_eq!(err, DocumentStoreError::Timeout("put".into(), Duration::from_millis(5)));
}

#[tokio::test]
async fn test_close_releases_the_connection() {
    let cluster = connect_to("bucket-close").await;
    {
        let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();
        bucket.put("u:book1", &minecraft()).await.unwrap();
    }
    cluster.close().await.unwrap();

    // The server outlives the connection
    let cluster = connect_to("bucket-close").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();
    assert_eq!(bucket.get::<Book>("u:book1").await.unwrap(), minecraft());
}

#[tokio::test]
async fn test_unbounded_timeouts() {
    let cluster = connect(
        "memory://bucket-unbounded",
        ClusterOptions::default()
            .with_kv_timeout(Duration::MAX)
            .with_query_timeout(Duration::MAX),
    )
    .await
    .unwrap();
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();

    bucket
        .put_with_options("u:book1", &minecraft(), PutOptions::new().timeout(Duration::MAX))
        .await
        .unwrap();
    assert_eq!(bucket.get::<Book>("u:book1").await.unwrap(), minecraft());

    let rows = bucket
        .query_with_options("SELECT * FROM default", QueryOptions::new().timeout(Duration::MAX))
        .await
        .unwrap()
        .rows()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_get_with_options_overrides_the_timeout() {
    let server = InMemoryServer::shared("bucket-get-options").await;
    let cluster = connect_to("bucket-get-options").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();
    bucket.put("u:book1", &minecraft()).await.unwrap();

    server.set_latency(Duration::from_millis(100)).await;

    let err = bucket
        .get_with_options::<Book>("u:book1", GetOptions::new().timeout(Duration::from_millis(5)))
        .await
        .unwrap_err();
    assert_eq!(err, DocumentStoreError::Timeout("get".into(), Duration::from_millis(5)));

    let book: Book = bucket
        .get_with_options("u:book1", GetOptions::new().timeout(Duration::from_secs(2)))
        .await
        .unwrap();
    assert_eq!(book, minecraft());
}

#[tokio::test]
async fn test_with_type_switches_the_document_type() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Isbn {
        isbn: String,
    }

    let cluster = connect_to("bucket-with-type").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();
    let books = bucket.typed::<Book>();
    books.put("u:book1", &minecraft()).await.unwrap();

    let isbns = books.with_type::<Isbn>();
    assert_eq!(isbns.name(), "default");
    assert_eq!(
        isbns.get("u:book1").await.unwrap(),
        Isbn { isbn: "978-1-4919-1889-0".into() }
    );
}
