use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{split_list, AllAppsQuery};
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::models::{ContentItem, ContentItemInput};
use crate::store::content::ContentItemQuery;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub all_apps: bool,
    pub ids: Option<String>,
    pub categories: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    #[serde(default)]
    pub all_apps: bool,
    pub category: Option<String>,
}

/// GET /content/content_items
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<ContentItem>> {
    let scope = ctx.scope(query.all_apps);
    let options = ContentItemQuery {
        ids: split_list(query.ids.as_deref()),
        categories: split_list(query.categories.as_deref()),
        offset: query.offset,
        limit: query.limit,
        order: query.order,
    };
    let items = state.content.list_items(&scope, &ctx.org_id, &options).await?;
    Ok(ApiResponse::success(items))
}

/// GET /content/content_items/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Query(query): Query<AllAppsQuery>,
) -> ApiResult<ContentItem> {
    let scope = ctx.scope(query.all_apps);
    Ok(ApiResponse::success(state.content.get_item(&scope, &ctx.org_id, &id).await?))
}

/// GET /content/content_item/categories
pub async fn categories(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<AllAppsQuery>,
) -> ApiResult<Vec<String>> {
    let scope = ctx.scope(query.all_apps);
    Ok(ApiResponse::success(state.content.list_categories(&scope, &ctx.org_id).await?))
}

/// POST /content/admin/content_items
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<AllAppsQuery>,
    Json(input): Json<ContentItemInput>,
) -> ApiResult<ContentItem> {
    let scope = ctx.scope(query.all_apps);
    let item = state.content.create_item(&scope, &ctx.org_id, input.category, input.data).await?;
    Ok(ApiResponse::created(item))
}

/// PUT /content/admin/content_items/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Query(query): Query<AllAppsQuery>,
    Json(input): Json<ContentItemInput>,
) -> ApiResult<ContentItem> {
    let scope = ctx.scope(query.all_apps);
    Ok(ApiResponse::success(state.content.update_item(&scope, &ctx.org_id, &id, input).await?))
}

/// PUT /content/admin/content_items/:id/data?category= - body is the new `data`
pub async fn update_data(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Query(query): Query<CategoryQuery>,
    Json(data): Json<Value>,
) -> ApiResult<ContentItem> {
    let scope = ctx.scope(query.all_apps);
    let category = query
        .category
        .ok_or_else(|| crate::error::ApiError::bad_request("category query parameter is required"))?;
    let item = state.content.update_item_data(&scope, &ctx.org_id, &id, &category, data).await?;
    Ok(ApiResponse::success(item))
}

/// DELETE /content/admin/content_items/:id[?category=]
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<()> {
    let scope = ctx.scope(query.all_apps);
    match query.category {
        Some(category) => state.content.delete_item_in_category(&scope, &ctx.org_id, &id, &category).await?,
        None => state.content.delete_item(&scope, &ctx.org_id, &id).await?,
    }
    Ok(ApiResponse::no_content())
}
