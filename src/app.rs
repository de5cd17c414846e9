use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn,
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers;
use crate::middleware::{jwt_auth_middleware, require_admin_middleware};
use crate::services::{AssetService, ContentService, FeedCache, FeedSource, ImageResizer, LegacyService};
use crate::storage::ObjectStore;
use crate::store::content::LegacyCollection;
use crate::store::{ContentStore, DocumentStore};

/// Shared services handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub content: ContentService,
    pub legacy: LegacyService,
    pub feed: Arc<FeedCache>,
    pub assets: AssetService,
}

impl AppState {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        feed_source: Arc<dyn FeedSource>,
        objects: Arc<dyn ObjectStore>,
        resizer: Arc<dyn ImageResizer>,
        config: &AppConfig,
    ) -> Self {
        let store = Arc::new(ContentStore::new(documents));
        Self {
            content: ContentService::new(store.clone()),
            legacy: LegacyService::new(store.clone()),
            feed: Arc::new(FeedCache::from_config(feed_source, &config.feed)),
            assets: AssetService::new(objects, resizer),
            store,
        }
    }
}

pub fn router(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .nest("/content", client_routes().merge(Router::new().nest("/admin", admin_routes())))
        // Global middleware
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn client_routes() -> Router<AppState> {
    use handlers::{assets, content_items, data_items, feed, legacy};

    Router::new()
        .route("/content_items", get(content_items::list))
        .route("/content_items/:id", get(content_items::get))
        .route("/content_item/categories", get(content_items::categories))
        .route("/data", get(data_items::list))
        .route("/data/:key", get(data_items::get))
        .nest("/student_guides", legacy::client_routes(LegacyCollection::StudentGuides))
        .nest("/health_locations", legacy::client_routes(LegacyCollection::HealthLocations))
        .route("/twitter/users/:user_id/tweets", get(feed::user_tweets))
        .route(
            "/profile_photo",
            axum::routing::post(assets::upload_profile_photo).delete(assets::delete_profile_photo),
        )
        .route("/profile_photo/:user_id", get(assets::get_profile_photo))
        .route("/files", get(assets::download_file))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn admin_routes() -> Router<AppState> {
    use handlers::{assets, categories, content_items, data_items, legacy};

    Router::new()
        .route("/content_items", axum::routing::post(content_items::create))
        .route("/content_items/:id", put(content_items::update).delete(content_items::delete))
        .route("/content_items/:id/data", put(content_items::update_data))
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/:name",
            get(categories::get).put(categories::update).delete(categories::delete),
        )
        .route("/data", axum::routing::post(data_items::create))
        .route("/data/:key", put(data_items::update).delete(data_items::delete))
        .nest("/student_guides", legacy::admin_routes(LegacyCollection::StudentGuides))
        .nest("/health_locations", legacy::admin_routes(LegacyCollection::HealthLocations))
        .route("/files", axum::routing::post(assets::upload_file).delete(assets::delete_file))
        // Layers run bottom-up: authenticate, then check the admin permission
        .route_layer(from_fn(require_admin_middleware))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt, Claims};
    use crate::services::PassthroughResizer;
    use crate::store::MemoryDocumentStore;
    use crate::testing::{temp_object_store, FakeFeed};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> (Router, std::path::PathBuf) {
        let config = crate::config::config();
        let (objects, root) = temp_object_store();
        let state = AppState::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(FakeFeed::new(json!([]))),
            objects,
            Arc::new(PassthroughResizer),
            config,
        );
        (router(state, config), root)
    }

    fn bearer(permissions: Vec<String>) -> String {
        let claims = Claims::new("u1".into(), "app1".into(), "org1".into(), permissions);
        format!("Bearer {}", generate_jwt(&claims).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _root) = test_router();
        let response = app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["database"], "ok");
    }

    #[tokio::test]
    async fn client_routes_need_a_token() {
        let (app, _root) = test_router();
        let response = app.oneshot(Request::get("/content/data").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn admin_routes_need_the_admin_permission() {
        let (app, _root) = test_router();
        let request = |auth: String| {
            Request::post("/content/admin/categories")
                .header("authorization", auth)
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"faq"}"#))
                .unwrap()
        };

        let response = app.clone().oneshot(request(bearer(vec![]))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin = crate::config::config().security.admin_permission.clone();
        let response = app.oneshot(request(bearer(vec![admin]))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["data"]["name"], "faq");
    }

    #[test]
    fn wildcard_origins_fall_back_to_permissive_cors() {
        // Neither list should panic while building the layer
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["https://app.example.com".to_string(), "bad\norigin".to_string()]);
    }
}
