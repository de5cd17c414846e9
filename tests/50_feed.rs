mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{data, token, TestServer};

#[tokio::test]
async fn concurrent_requests_reach_upstream_once() -> Result<()> {
    let server = TestServer::spawn().await?;
    let reader = token("reader", "app1", "org1");

    let requests = (0..8).map(|_| server.get("/content/twitter/users/nasa/tweets?count=5", &reader).send());
    for res in futures::future::join_all(requests).await {
        let payload = data(res?, StatusCode::OK).await?;
        assert_eq!(payload["call"], json!(1));
        assert_eq!(payload["query"], json!("count=5"));
    }
    assert_eq!(server.feed.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn force_refreshes_the_cached_page() -> Result<()> {
    let server = TestServer::spawn().await?;
    let reader = token("reader", "app1", "org1");

    let first = data(server.get("/content/twitter/users/nasa/tweets?count=5", &reader).send().await?, StatusCode::OK).await?;
    let forced = data(server.get("/content/twitter/users/nasa/tweets?count=5&force=true", &reader).send().await?, StatusCode::OK).await?;
    assert_eq!(first["call"], json!(1));
    assert_eq!(forced["call"], json!(2));
    assert_eq!(forced["query"], json!("count=5"));

    let cached = data(server.get("/content/twitter/users/nasa/tweets?count=5", &reader).send().await?, StatusCode::OK).await?;
    assert_eq!(cached["call"], json!(2));
    Ok(())
}
