// src/api/notification.rs
use crate::db::queries::notification::{get_notifications, mark_all_read};
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

pub fn notification_routes() -> Router<PgPool> {
    Router::new()
        .route("/notifications", get(get_notifications))
        .route("/notifications/mark-all-read", post(mark_all_read))
}
