use crate::db::queries::review::{
    create_review, delete_review, get_reviews_for_product, update_review,
};
use axum::{
    routing::{get, patch},
    Router,
};
use sqlx::PgPool;

pub fn review_routes() -> Router<PgPool> {
    Router::new()
        .route(
            "/products/{product_id}/reviews",
            get(get_reviews_for_product).post(create_review),
        )
        .route(
            "/products/{product_id}/reviews/{review_id}",
            patch(update_review).delete(delete_review),
        )
}
