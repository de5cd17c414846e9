use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{validate_jwt, Claims};
use crate::config;
use crate::error::ApiError;
use crate::types::AppScope;

/// Caller identity and tenant extracted from the bearer token
#[derive(Clone, Debug)]
pub struct TenantContext {
    pub user_id: String,
    pub app_id: String,
    pub org_id: String,
    pub permissions: Vec<String>,
}

impl From<Claims> for TenantContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            app_id: claims.app_id,
            org_id: claims.org_id,
            permissions: claims.permissions,
        }
    }
}

impl TenantContext {
    /// Scope for one operation of this caller
    pub fn scope(&self, include_all_apps_in_org: bool) -> AppScope {
        AppScope::resolve(include_all_apps_in_org, &self.app_id)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// JWT authentication middleware that validates tokens and injects the tenant context
pub async fn jwt_auth_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    let token = match extract_jwt_from_headers(&headers) {
        Ok(token) => token,
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    let claims = match validate_jwt(&token) {
        Ok(claims) => claims,
        Err(err) => return ApiError::unauthorized(err.to_string()).into_response(),
    };
    if claims.app_id.is_empty() || claims.org_id.is_empty() {
        return ApiError::unauthorized("Token does not carry a tenant").into_response();
    }

    request.extensions_mut().insert(TenantContext::from(claims));
    next.run(request).await
}

/// Admin routes: runs after `jwt_auth_middleware`
pub async fn require_admin_middleware(request: Request, next: Next) -> Response {
    let permission = &config::config().security.admin_permission;
    match request.extensions().get::<TenantContext>() {
        Some(ctx) if ctx.has_permission(permission) => next.run(request).await,
        Some(ctx) => {
            tracing::warn!("User {} lacks {} for {}", ctx.user_id, permission, request.uri().path());
            ApiError::forbidden(format!("Requires {} permission", permission)).into_response()
        }
        None => ApiError::unauthorized("Missing authentication context").into_response(),
    }
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_tokens_only() {
        assert_eq!(extract_jwt_from_headers(&headers("Bearer abc")).unwrap(), "abc");
        assert!(extract_jwt_from_headers(&headers("Basic abc")).is_err());
        assert!(extract_jwt_from_headers(&headers("Bearer  ")).is_err());
        assert!(extract_jwt_from_headers(&HeaderMap::new()).is_err());
    }

    #[test]
    fn context_resolves_scope_from_token_app() {
        let ctx = TenantContext {
            user_id: "u1".into(),
            app_id: "app1".into(),
            org_id: "org1".into(),
            permissions: vec![],
        };
        assert_eq!(ctx.scope(false), AppScope::Scoped("app1".into()));
        assert_eq!(ctx.scope(true), AppScope::AllApps);
    }
}
