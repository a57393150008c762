use crate::db::queries::moderation::{admin_dashboard, admin_reports, moderate_review};
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

pub fn moderation_routes() -> Router<PgPool> {
    Router::new()
        .route("/admin/reports", get(admin_reports))
        .route("/admin/reviews/{review_id}/{action}", post(moderate_review))
        .route("/admin/dashboard", get(admin_dashboard))
}
