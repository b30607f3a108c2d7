use std::time::Duration;

use docbucket::{
    bson::{Bson, doc},
    memory::InMemoryServer,
    prelude::*,
};
use futures::TryStreamExt;
use serde::Deserialize;

async fn seeded(host: &str) -> DynCluster {
    let cluster = connect(&format!("memory://{host}"), ClusterOptions::default())
        .await
        .unwrap();

    {
        let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();
        for (key, book) in [
            ("u:book1", Book::new("978-1-4919-1889-0", "Minecraft Modding with Forge", "29.99")),
            ("u:book2", Book::new("978-0-596-00048-5", "Programming Perl", "44.95")),
            ("u:book3", Book::new("978-1-59327-828-1", "The Rust Programming Language", "39.95")),
        ] {
            bucket.put(key, &book).await.unwrap();
        }
    }

    cluster
}

#[tokio::test]
async fn test_select_star_wraps_rows_in_the_bucket_name() {
    let cluster = seeded("query-select-star").await;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await.unwrap();

    let rows = bucket.query("SELECT * FROM default").await.unwrap().rows().await.unwrap();

    assert_eq!(rows.len(), 3);
    assert!(rows.iter().any(|row| row.as_document()
        == &doc! {
            "default": {
                "isbn": "978-1-4919-1889-0",
                "name": "Minecraft Modding with Forge",
                "cost": "29.99",
            }
        }));
    assert_eq!(
        rows[0].to_json().unwrap()["default"]["name"],
        serde_json::json!("Minecraft Modding with Forge")
    );
}

#[tokio::test]
async fn test_empty_result_is_not_an_error() {
    let cluster = seeded("query-empty").await;

    let mut result = cluster
        .query("SELECT * FROM default WHERE cost > '99'")
        .await
        .unwrap();

    assert!(result.next().await.is_none());

    let meta = result.meta_data().unwrap();
    assert_eq!(meta.status, QueryStatus::Success);
    assert_eq!(meta.result_count, 0);
}

#[tokio::test]
async fn test_malformed_statements_fail_up_front() {
    let cluster = seeded("query-malformed").await;

    for statement in [
        "SELEKT * FROM default",
        "SELECT * FROM default WHERE",
        "SELECT * FROM default LIMIT -1",
        "SELECT * FROM default WHERE name = $1",
    ] {
        let err = cluster.query(statement).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query, "{statement}");
    }

    let err = cluster.query("SELECT * FROM `beer-sample`").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
}

#[tokio::test]
async fn test_filter_order_and_paging() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Title {
        id: String,
        title: String,
    }

    let cluster = seeded("query-filter").await;

    let titles: Vec<Title> = cluster
        .query(
            "SELECT META(b).id AS id, b.name AS title FROM default b \
             WHERE b.name LIKE '%Programming%' ORDER BY b.cost DESC LIMIT 1 OFFSET 1",
        )
        .await
        .unwrap()
        .rows_as()
        .await
        .unwrap();

    assert_eq!(
        titles,
        vec![Title { id: "u:book3".into(), title: "The Rust Programming Language".into() }]
    );
}

#[tokio::test]
async fn test_parameters() {
    let cluster = seeded("query-params").await;

    let books: Vec<Book> = cluster
        .query_with_options(
            "SELECT b.* FROM default b WHERE b.cost < $max AND b.isbn <> $1",
            QueryOptions::new()
                .positional_parameter("978-0-596-00048-5")
                .named_parameter("max", "40"),
        )
        .await
        .unwrap()
        .rows_as()
        .await
        .unwrap();

    let names: Vec<_> = books.iter().map(|book| book.name.as_str()).collect();
    assert_eq!(names, ["Minecraft Modding with Forge", "The Rust Programming Language"]);
}

#[tokio::test]
async fn test_rows_are_not_restartable() {
    let cluster = seeded("query-once").await;

    let mut result = cluster
        .query_with_options(
            "SELECT name FROM default",
            QueryOptions::new().client_context_id("listing"),
        )
        .await
        .unwrap();

    let mut seen = 0;
    while let Some(row) = result.next().await {
        assert!(matches!(row.unwrap().get("name"), Some(Bson::String(_))));
        seen += 1;
    }
    assert_eq!(seen, 3);
    assert!(result.next().await.is_none());

    let meta = result.meta_data().unwrap();
    assert_eq!(meta.client_context_id, "listing");
    assert_eq!(meta.result_count, 3);
    assert_eq!(meta.statement, "SELECT name FROM default");
}

#[tokio::test]
async fn test_mid_stream_failure_is_reported() {
    let server = InMemoryServer::shared("query-abort").await;
    let cluster = seeded("query-abort").await;

    server.fail_next_query_after(2).await;

    let mut result = cluster.query("SELECT * FROM default").await.unwrap();
    assert!(result.next().await.unwrap().is_ok());
    assert!(result.next().await.unwrap().is_ok());

    let err = result.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
    assert!(result.next().await.is_none());
    assert_eq!(result.meta_data().unwrap().status, QueryStatus::Errors);

    // Only the next query was affected
    let rows = cluster.query("SELECT * FROM default").await.unwrap().rows().await.unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_collecting_stops_at_the_first_error() {
    let server = InMemoryServer::shared("query-abort-stream").await;
    let cluster = seeded("query-abort-stream").await;

    server.fail_next_query_after(1).await;

    let err = cluster
        .query("SELECT * FROM default")
        .await
        .unwrap()
        .into_stream()
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
}

#[tokio::test]
async fn test_slow_query_times_out() {
    let server = InMemoryServer::shared("query-slow").await;
    let cluster = seeded("query-slow").await;

    server.set_latency(Duration::from_millis(200)).await;

    let err = cluster
        .query_with_options(
            "SELECT * FROM default",
            QueryOptions::new().timeout(Duration::from_millis(20)),
        )
        .await
        .unwrap_err();
    assert_eq!(err, DocumentStoreError::Timeout("query".into(), Duration::from_millis(20)));
}

#[tokio::test]
async fn test_built_statements() {
    let cluster = seeded("query-builder").await;

    let statement = Statement::builder("default")
        .projection(Projection::Document)
        .filter(Filter::any_of("isbn", vec!["978-1-4919-1889-0", "978-0-596-00048-5"]))
        .sort("name", SortDirection::Asc)
        .build();
    assert_eq!(
        statement.to_string(),
        "SELECT default.* FROM default WHERE isbn IN [\"978-1-4919-1889-0\", \"978-0-596-00048-5\"] ORDER BY name ASC"
    );

    let books: Vec<Book> = cluster
        .execute(statement, QueryOptions::default())
        .await
        .unwrap()
        .rows_as()
        .await
        .unwrap();

    let names: Vec<_> = books.into_iter().map(|book| book.name).collect();
    assert_eq!(names, ["Minecraft Modding with Forge", "Programming Perl"]);
}
