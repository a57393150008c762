use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use moka::sync::Cache; // ✅ High-performance TTL Cache
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::api::auth::Claims;
use crate::config::Config;
use crate::utils::api_response::ApiResponse;

/// ✅ **Per-user owned-product cache using `moka`**
///
/// Moderation and reporting are scoped to the requester's own products; the
/// owned-id set is served from a TTL cache.
pub type OwnershipCache = Arc<Cache<i32, Arc<HashSet<i32>>>>;

pub fn create_ownership_cache() -> OwnershipCache {
    Arc::new(
        Cache::builder()
            .time_to_live(Duration::from_secs(600)) // ✅ TTL = 10 minutes
            .build(),
    )
}

/// Product ids owned by `user_id`, read through the cache.
pub async fn owned_product_ids(
    pool: &PgPool,
    cache: &OwnershipCache,
    user_id: i32,
) -> Result<Arc<HashSet<i32>>, sqlx::Error> {
    if let Some(cached) = cache.get(&user_id) {
        return Ok(cached);
    }

    let ids: Vec<i32> = sqlx::query_scalar("SELECT id FROM products WHERE owner_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    let set = Arc::new(ids.into_iter().collect::<HashSet<i32>>());
    cache.insert(user_id, set.clone());
    Ok(set)
}

/// Drop a user's cached ownership set after their product list changes.
pub fn invalidate_ownership(cache: &OwnershipCache, user_id: i32) {
    cache.invalidate(&user_id);
}

/// ✅ **JWT Middleware** (Handles Token Authentication)
pub async fn jwt_middleware(mut req: Request<Body>, next: Next) -> Result<Response, Response> {
    // Step 1: Extract Authorization header
    let auth_header = req.headers().get("Authorization").ok_or_else(|| {
        tracing::warn!("Missing Authorization header");
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing Authorization header", None)
            .into_response()
    })?;

    // Step 2: Convert header to string
    let token_str = auth_header.to_str().map_err(|_| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid Authorization header format",
            None,
        )
        .into_response()
    })?;

    // Step 3: Strip "Bearer " prefix
    let token = token_str.strip_prefix("Bearer ").ok_or_else(|| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid token format (missing 'Bearer ' prefix)",
            None,
        )
        .into_response()
    })?;

    // Step 4: Decode the JWT token
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(Config::get().jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!("JWT decoding failed: {:?}", e);
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid token",
            Some(json!({ "error": e.to_string() })),
        )
        .into_response()
    })?;

    // Step 5: Insert claims into request extensions
    req.extensions_mut().insert(token_data.claims);

    // Step 6: Proceed to the next middleware
    Ok(next.run(req).await)
}

/// Actions gated by the authorization table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzAction {
    EditReview,
    DeleteReview,
    EditProduct,
    DeleteProduct,
    /// approve / reject / flag, admin reports, admin dashboard
    ModerateReview,
    /// cross-product leaderboards and exports
    GlobalAnalytics,
}

/// Ownership facts gathered by the handler before the gate is evaluated.
#[derive(Debug, Clone)]
pub struct AuthzContext {
    pub requester_id: i32,
    pub is_staff: bool,
    /// Author of the entity, or owner of the review's product for
    /// moderation actions. `None` for global actions.
    pub entity_owner_id: Option<i32>,
}

impl AuthzContext {
    pub fn from_claims(claims: &Claims, entity_owner_id: Option<i32>) -> Result<Self, ApiResponse<()>> {
        Ok(Self {
            requester_id: claims.user_id()?,
            is_staff: claims.is_staff(),
            entity_owner_id,
        })
    }
}

/// Explicit (action, relationship) → allow/deny table. Deny always surfaces
/// as 403, never a silent no-op.
pub fn authorize(action: AuthzAction, ctx: &AuthzContext) -> Result<(), ApiResponse<()>> {
    let allowed = match action {
        AuthzAction::EditReview | AuthzAction::DeleteReview => {
            ctx.entity_owner_id == Some(ctx.requester_id)
        }
        AuthzAction::EditProduct | AuthzAction::DeleteProduct => {
            ctx.entity_owner_id == Some(ctx.requester_id)
        }
        // Product owners only. Staff get no bypass here: moderation authority
        // follows product ownership.
        AuthzAction::ModerateReview => ctx.entity_owner_id == Some(ctx.requester_id),
        AuthzAction::GlobalAnalytics => ctx.is_staff,
    };

    if allowed {
        Ok(())
    } else {
        let message = match action {
            AuthzAction::EditReview | AuthzAction::DeleteReview => {
                "Only the review author may modify this review"
            }
            AuthzAction::EditProduct | AuthzAction::DeleteProduct => {
                "Only the product owner may modify this product"
            }
            AuthzAction::ModerateReview => {
                "Only the owner of this review's product may moderate it"
            }
            AuthzAction::GlobalAnalytics => "Staff access required",
        };
        Err(ApiResponse::forbidden(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(requester_id: i32, is_staff: bool, entity_owner_id: Option<i32>) -> AuthzContext {
        AuthzContext {
            requester_id,
            is_staff,
            entity_owner_id,
        }
    }

    #[test]
    fn author_may_edit_own_review() {
        assert!(authorize(AuthzAction::EditReview, &ctx(7, false, Some(7))).is_ok());
    }

    #[test]
    fn non_author_may_not_edit_review() {
        let err = authorize(AuthzAction::EditReview, &ctx(8, false, Some(7))).unwrap_err();
        assert_eq!(err.status_code, 403);
    }

    #[test]
    fn product_owner_may_moderate() {
        assert!(authorize(AuthzAction::ModerateReview, &ctx(3, false, Some(3))).is_ok());
    }

    #[test]
    fn staff_get_no_moderation_bypass() {
        let err = authorize(AuthzAction::ModerateReview, &ctx(9, true, Some(3))).unwrap_err();
        assert_eq!(err.status_code, 403);
    }

    #[test]
    fn global_analytics_is_staff_only() {
        assert!(authorize(AuthzAction::GlobalAnalytics, &ctx(1, true, None)).is_ok());
        let err = authorize(AuthzAction::GlobalAnalytics, &ctx(1, false, None)).unwrap_err();
        assert_eq!(err.status_code, 403);
    }
}
