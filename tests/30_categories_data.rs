mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{admin_token, data, error_code, token, TestServer};

#[tokio::test]
async fn category_lifecycle() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = admin_token("editor", "app1", "org1");

    let res = server.post("/content/admin/categories", &admin).json(&json!({"name": "faq", "permissions": ["read"]})).send().await?;
    let created = data(res, StatusCode::CREATED).await?;
    assert_eq!(created["permissions"], json!(["read"]));

    let res = server.post("/content/admin/categories", &admin).json(&json!({"name": "faq"})).send().await?;
    assert_eq!(error_code(res, StatusCode::BAD_REQUEST).await?, "PRECONDITION_FAILED");

    let res = server.put("/content/admin/categories/faq", &admin).json(&json!({"permissions": ["read", "write"]})).send().await?;
    let updated = data(res, StatusCode::OK).await?;
    assert_eq!(updated["permissions"], json!(["read", "write"]));

    let listed = data(server.get("/content/admin/categories", &admin).send().await?, StatusCode::OK).await?;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let res = server.delete("/content/admin/categories/faq", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = server.get("/content/admin/categories/faq", &admin).send().await?;
    assert_eq!(error_code(res, StatusCode::NOT_FOUND).await?, "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn data_items_by_key_and_category() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = admin_token("editor", "app1", "org1");
    let reader = token("reader", "app1", "org1");

    for (key, category) in [("hours", "campus"), ("map", "campus"), ("phone", "contact")] {
        let res = server
            .post("/content/admin/data", &admin)
            .json(&json!({"key": key, "category": category, "data": {"k": key}}))
            .send()
            .await?;
        data(res, StatusCode::CREATED).await?;
    }

    let campus = data(server.get("/content/data?category=campus", &reader).send().await?, StatusCode::OK).await?;
    assert_eq!(campus.as_array().unwrap().len(), 2);

    let res = server
        .put("/content/admin/data/hours", &admin)
        .json(&json!({"key": "hours", "category": "campus", "data": {"open": 9}}))
        .send()
        .await?;
    data(res, StatusCode::OK).await?;

    let hours = data(server.get("/content/data/hours", &reader).send().await?, StatusCode::OK).await?;
    assert_eq!(hours["data"], json!({"open": 9}));

    let res = server.get("/content/data/hours", &token("reader", "app1", "org2")).send().await?;
    assert_eq!(error_code(res, StatusCode::NOT_FOUND).await?, "NOT_FOUND");

    let res = server.delete("/content/admin/data/hours", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn all_apps_update_must_target_one_category() -> Result<()> {
    let server = TestServer::spawn().await?;
    for app in ["app1", "app2"] {
        let res = server
            .post("/content/admin/categories", &admin_token("editor", app, "org1"))
            .json(&json!({"name": "faq", "permissions": ["read"]}))
            .send()
            .await?;
        data(res, StatusCode::CREATED).await?;
    }

    let admin = admin_token("editor", "app1", "org1");
    let res = server
        .put("/content/admin/categories/faq?all_apps=true", &admin)
        .json(&json!({"permissions": ["write"]}))
        .send()
        .await?;
    assert_eq!(error_code(res, StatusCode::BAD_REQUEST).await?, "PRECONDITION_FAILED");

    for app in ["app1", "app2"] {
        let res = server.get("/content/admin/categories/faq", &admin_token("editor", app, "org1")).send().await?;
        assert_eq!(data(res, StatusCode::OK).await?["permissions"], json!(["read"]));
    }
    Ok(())
}
