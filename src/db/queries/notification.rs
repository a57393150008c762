// src/db/queries/notification.rs
use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
};
use serde_json::json;
use sqlx::{PgPool, QueryBuilder};

use crate::api::auth::Claims;
use crate::db::models::notification::{MarkAllReadResponse, Notification, NotificationFilter};
use crate::utils::api_response::ApiResponse;

/// Lists the current user's notifications, unread first.
#[utoipa::path(
    get,
    path = "/notifications",
    params(NotificationFilter),
    responses(
        (status = 200, description = "Notifications retrieved successfully", body = Vec<Notification>),
        (status = 500, description = "Failed to retrieve notifications")
    ),
    tag = "Notifications",
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn get_notifications(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<NotificationFilter>,
) -> Result<ApiResponse<Vec<Notification>>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let mut query_builder = QueryBuilder::new(
        "SELECT id, recipient_id, message, is_read, created_at \
         FROM notifications WHERE recipient_id = ",
    );
    query_builder.push_bind(user_id);

    if filter.unread_only.unwrap_or(false) {
        query_builder.push(" AND is_read = FALSE");
    }

    query_builder.push(" ORDER BY is_read ASC, created_at DESC");

    if let Some(limit) = filter.limit {
        query_builder.push(" LIMIT ").push_bind(limit as i64);
    }
    if let Some(offset) = filter.offset {
        query_builder.push(" OFFSET ").push_bind(offset as i64);
    }

    let notifications: Vec<Notification> = query_builder
        .build_query_as::<Notification>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve notifications",
                Some(json!({ "error": e.to_string() })),
            )
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Notifications retrieved successfully",
        notifications,
    ))
}

/// Marks every unread notification of the current user as read.
#[utoipa::path(
    post,
    path = "/notifications/mark-all-read",
    responses(
        (status = 200, description = "Notifications marked as read", body = MarkAllReadResponse),
        (status = 500, description = "Failed to update notifications")
    ),
    tag = "Notifications",
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn mark_all_read(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<MarkAllReadResponse>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .execute(&pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to update notifications",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Notifications marked as read",
        MarkAllReadResponse {
            updated: result.rows_affected(),
        },
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(get_notifications, mark_all_read),
    components(
        schemas(Notification, MarkAllReadResponse)
    ),
    tags(
        (name = "Notifications", description = "User Notification Endpoints")
    )
)]
pub struct NotificationDoc;
