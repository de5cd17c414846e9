use axum::extract::{Path, RawQuery, State};
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /content/twitter/users/:user_id/tweets - proxied through the feed cache;
/// `force=true` refreshes the cached page
pub async fn user_tweets(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Value> {
    let feed = state.feed.get(&user_id, query.as_deref().unwrap_or("")).await?;
    Ok(ApiResponse::success(feed))
}
