use crate::db::queries::interaction::top_review;
use crate::db::queries::product::{
    create_product, delete_product, get_product, get_products, product_ratings, update_product,
};
use crate::db::queries::review::approve_review;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

pub fn product_routes() -> Router<PgPool> {
    Router::new()
        .route("/products", get(get_products).post(create_product))
        .route(
            "/products/{product_id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/products/{product_id}/ratings", get(product_ratings))
        .route("/products/{product_id}/top-review", get(top_review))
        .route(
            "/products/{product_id}/reviews/{review_id}/approve",
            post(approve_review),
        )
}
