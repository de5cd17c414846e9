use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::AllAppsQuery;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::models::{Category, CategoryInput};

#[derive(Debug, Deserialize)]
pub struct PermissionsBody {
    #[serde(default)]
    pub permissions: Vec<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<AllAppsQuery>,
) -> ApiResult<Vec<Category>> {
    let scope = ctx.scope(query.all_apps);
    Ok(ApiResponse::success(state.content.list_category_records(&scope, &ctx.org_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<AllAppsQuery>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<Category> {
    let scope = ctx.scope(query.all_apps);
    let category = state.content.create_category(&scope, &ctx.org_id, input.name, input.permissions).await?;
    Ok(ApiResponse::created(category))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(name): Path<String>,
    Query(query): Query<AllAppsQuery>,
) -> ApiResult<Category> {
    let scope = ctx.scope(query.all_apps);
    Ok(ApiResponse::success(state.content.get_category(&scope, &ctx.org_id, &name).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(name): Path<String>,
    Query(query): Query<AllAppsQuery>,
    Json(body): Json<PermissionsBody>,
) -> ApiResult<Category> {
    let scope = ctx.scope(query.all_apps);
    let category = state.content.update_category(&scope, &ctx.org_id, &name, body.permissions).await?;
    Ok(ApiResponse::success(category))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(name): Path<String>,
    Query(query): Query<AllAppsQuery>,
) -> ApiResult<()> {
    let scope = ctx.scope(query.all_apps);
    state.content.delete_category(&scope, &ctx.org_id, &name).await?;
    Ok(ApiResponse::no_content())
}
