use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::AllAppsQuery;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::models::{DataContentItem, DataContentItemInput};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub all_apps: bool,
    pub category: Option<String>,
}

/// GET /content/data?category=
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<DataContentItem>> {
    let scope = ctx.scope(query.all_apps);
    let items = state.content.list_data_items(&scope, &ctx.org_id, query.category.as_deref()).await?;
    Ok(ApiResponse::success(items))
}

/// GET /content/data/:key
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(key): Path<String>,
    Query(query): Query<AllAppsQuery>,
) -> ApiResult<DataContentItem> {
    let scope = ctx.scope(query.all_apps);
    Ok(ApiResponse::success(state.content.get_data_item(&scope, &ctx.org_id, &key).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<AllAppsQuery>,
    Json(input): Json<DataContentItemInput>,
) -> ApiResult<DataContentItem> {
    let scope = ctx.scope(query.all_apps);
    Ok(ApiResponse::created(state.content.create_data_item(&scope, &ctx.org_id, input).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(key): Path<String>,
    Query(query): Query<AllAppsQuery>,
    Json(input): Json<DataContentItemInput>,
) -> ApiResult<DataContentItem> {
    let scope = ctx.scope(query.all_apps);
    Ok(ApiResponse::success(state.content.update_data_item(&scope, &ctx.org_id, &key, input).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(key): Path<String>,
    Query(query): Query<AllAppsQuery>,
) -> ApiResult<()> {
    let scope = ctx.scope(query.all_apps);
    state.content.delete_data_item(&scope, &ctx.org_id, &key).await?;
    Ok(ApiResponse::no_content())
}
