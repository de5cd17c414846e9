// Student guides and health locations share one set of handlers; the
// collection is bound when the routes are built.
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;

use super::split_list;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::models::Document;
use crate::store::content::LegacyCollection;

#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    pub ids: Option<String>,
}

/// GET / and GET /:id
pub fn client_routes(collection: LegacyCollection) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |state: State<AppState>, ctx: Extension<TenantContext>, query: Query<IdsQuery>| {
                list(collection, state, ctx, query)
            }),
        )
        .route(
            "/:id",
            get(move |state: State<AppState>, ctx: Extension<TenantContext>, id: Path<String>| {
                show(collection, state, ctx, id)
            }),
        )
}

/// POST /, PUT /:id and DELETE /:id
pub fn admin_routes(collection: LegacyCollection) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            axum::routing::post(move |state: State<AppState>, ctx: Extension<TenantContext>, body: Json<serde_json::Value>| {
                create(collection, state, ctx, body)
            }),
        )
        .route(
            "/:id",
            axum::routing::put(
                move |state: State<AppState>, ctx: Extension<TenantContext>, id: Path<String>, body: Json<serde_json::Value>| {
                    replace(collection, state, ctx, id, body)
                },
            )
            .delete(move |state: State<AppState>, ctx: Extension<TenantContext>, id: Path<String>| {
                delete(collection, state, ctx, id)
            }),
        )
}

fn into_document(body: serde_json::Value) -> Result<Document, ApiError> {
    match body {
        serde_json::Value::Object(doc) => Ok(doc),
        _ => Err(ApiError::bad_request("Body must be a JSON object")),
    }
}

async fn list(
    collection: LegacyCollection,
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<IdsQuery>,
) -> ApiResult<Vec<Document>> {
    let ids = split_list(query.ids.as_deref());
    let docs = state.legacy.list(collection, &ctx.app_id, &ctx.org_id, ids.as_deref()).await?;
    Ok(ApiResponse::success(docs))
}

async fn show(
    collection: LegacyCollection,
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Document> {
    Ok(ApiResponse::success(state.legacy.get(collection, &ctx.app_id, &ctx.org_id, &id).await?))
}

async fn create(
    collection: LegacyCollection,
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Document> {
    let doc = into_document(body)?;
    Ok(ApiResponse::created(state.legacy.create(collection, &ctx.app_id, &ctx.org_id, doc).await?))
}

async fn replace(
    collection: LegacyCollection,
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Document> {
    let doc = into_document(body)?;
    Ok(ApiResponse::success(state.legacy.replace(collection, &ctx.app_id, &ctx.org_id, &id, doc).await?))
}

async fn delete(
    collection: LegacyCollection,
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.legacy.delete(collection, &ctx.app_id, &ctx.org_id, &id).await?;
    Ok(ApiResponse::no_content())
}
