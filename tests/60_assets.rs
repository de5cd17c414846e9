mod common;

use anyhow::Result;
use reqwest::StatusCode;

use common::{admin_token, data, error_code, token, TestServer};

#[tokio::test]
async fn profile_photo_lifecycle() -> Result<()> {
    let server = TestServer::spawn().await?;
    let user = token("u1", "app1", "org1");

    let png = b"\x89PNG\r\n\x1a\nrest-of-image".to_vec();
    let res = server.post("/content/profile_photo", &user).body(png.clone()).send().await?;
    let urls = data(res, StatusCode::CREATED).await?;
    for size in ["default", "medium", "small"] {
        let url = urls[size].as_str().unwrap();
        assert!(url.ends_with(&format!("/profile-photos/u1/{}.webp", size)), "{}", url);
    }

    let res = server.get("/content/profile_photo/u1?size=medium", &user).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(res.bytes().await?.to_vec(), png);

    let res = server.delete("/content/profile_photo", &user).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = server.get("/content/profile_photo/u1", &user).send().await?;
    assert_eq!(error_code(res, StatusCode::NOT_FOUND).await?, "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn admin_files_round_trip() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = admin_token("editor", "app1", "org1");

    let res = server.post("/content/admin/files?path=handbooks&name=guide.pdf", &admin).body(b"%PDF".to_vec()).send().await?;
    let url = data(res, StatusCode::CREATED).await?;
    assert!(url.as_str().unwrap().ends_with("/handbooks/guide.pdf"));

    let res = server.get("/content/files?path=handbooks/guide.pdf", &token("r", "app1", "org1")).send().await?;
    assert_eq!(res.bytes().await?.as_ref(), b"%PDF");

    let res = server.get("/content/files?path=../secrets", &admin).send().await?;
    assert_eq!(error_code(res, StatusCode::BAD_REQUEST).await?, "BAD_REQUEST");

    let res = server.delete("/content/admin/files?path=handbooks/guide.pdf", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    Ok(())
}
