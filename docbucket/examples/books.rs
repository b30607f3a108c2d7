//! Stores a book, reads it back and lists the bucket.
//!
//! ```sh
//! RUST_LOG=docbucket_core=debug cargo run --example books
//! RUST_LOG=info cargo run --example books --features mongodb -- mongodb://localhost:27017
//! ```

use docbucket::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> DocumentStoreResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "memory://localhost".to_string());

    let cluster = connect(&endpoint, ClusterOptions::default()).await?;
    let bucket = cluster.open_bucket("default", Credentials::Anonymous).await?;

    bucket
        .put(
            "u:book1",
            &Book::new("978-1-4919-1889-0", "Minecraft Modding with Forge", "29.99"),
        )
        .await?;

    let book: Book = bucket.get("u:book1").await?;
    println!("Book: {book:?}");

    let mut rows = bucket.query("SELECT * FROM default").await?;
    while let Some(row) = rows.next().await {
        println!("Row: {}", row?.to_json()?);
    }

    if let Some(meta) = rows.meta_data() {
        println!("{} rows in {:?}", meta.result_count, meta.elapsed);
    }

    drop(bucket);
    cluster.close().await
}
