mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{admin_token, error_code, token, TestServer};

#[tokio::test]
async fn public_routes_need_no_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    let root: serde_json::Value = server.anonymous().get(server.url("/")).send().await?.json().await?;
    assert_eq!(root["success"], json!(true));
    assert_eq!(root["data"]["name"], json!("Content API"));

    let health = server.anonymous().get(server.url("/health")).send().await?;
    assert_eq!(health.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn content_routes_require_a_valid_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.anonymous().get(server.url("/content/content_items")).send().await?;
    assert_eq!(error_code(res, StatusCode::UNAUTHORIZED).await?, "UNAUTHORIZED");

    let res = server.get("/content/content_items", "garbage").send().await?;
    assert_eq!(error_code(res, StatusCode::UNAUTHORIZED).await?, "UNAUTHORIZED");

    let res = server.get("/content/content_items", &token("u1", "app1", "org1")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn admin_routes_require_admin_permission() -> Result<()> {
    let server = TestServer::spawn().await?;
    let body = json!({"category": "faq", "data": "hello"});

    let res = server.post("/content/admin/content_items", &token("u1", "app1", "org1")).json(&body).send().await?;
    assert_eq!(error_code(res, StatusCode::FORBIDDEN).await?, "FORBIDDEN");

    let res = server.post("/content/admin/content_items", &admin_token("u1", "app1", "org1")).json(&body).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    Ok(())
}
