use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::ProfilePhotoSize;

#[derive(Debug, Deserialize)]
pub struct SizeQuery {
    pub size: Option<ProfilePhotoSize>,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub path: String,
    pub name: Option<String>,
}

/// POST /content/profile_photo - raw image body, stored for the caller
pub async fn upload_profile_photo(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    body: Bytes,
) -> ApiResult<BTreeMap<ProfilePhotoSize, String>> {
    let urls = state.assets.upload_profile_photo(&ctx.user_id, &body).await?;
    Ok(ApiResponse::created(urls))
}

/// GET /content/profile_photo/:user_id?size=
pub async fn get_profile_photo(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<SizeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let size = query.size.unwrap_or(ProfilePhotoSize::Default);
    let bytes = state.assets.get_profile_photo(&user_id, size).await?;
    let content_type = state.assets.photo_content_type(&bytes);
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

/// DELETE /content/profile_photo - removes the caller's photo
pub async fn delete_profile_photo(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<()> {
    state.assets.delete_profile_photo(&ctx.user_id).await?;
    Ok(ApiResponse::no_content())
}

/// GET /content/files?path=
pub async fn download_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.assets.download_file(&query.path).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

/// POST /content/admin/files?path=&name= - raw body
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    body: Bytes,
) -> ApiResult<String> {
    let url = state.assets.upload_file(body.to_vec(), &query.path, query.name.as_deref()).await?;
    Ok(ApiResponse::created(url))
}

/// DELETE /content/admin/files?path=
pub async fn delete_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> ApiResult<()> {
    state.assets.delete_file(&query.path).await?;
    Ok(ApiResponse::no_content())
}
