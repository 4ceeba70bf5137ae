//! Basic GET and POST usage against a public JSON API.
//!
//! Run with: `cargo run --example storefront_basics`

use decanter::{Client, Error, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("decanter=debug,storefront_basics=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .timeout(Duration::from_secs(10))
        .retry_policy(RetryPolicy::default().with_delay(Duration::from_millis(300)))
        .build()?;

    let post = client.get::<Post>("/posts/1").await?;
    println!("fetched post {}: {}", post.id, post.title);
    println!("took {:?} over {} attempts", post.latency, post.attempts);

    let new_post = NewPost {
        title: "Tasting notes".to_string(),
        body: "Dark fruit, soft tannins.".to_string(),
    };
    let created = client.post::<_, Post>("/posts", &new_post).await?;
    println!("created post {}", created.id);

    match client.get::<Post>("/posts/99999999").await {
        Ok(_) => println!("unexpected success"),
        Err(e) => {
            println!("as expected: {e}");
            println!("what a shopper would see: {}", e.user_message());
        }
    }

    Ok(())
}
