use crate::db::queries::analytics::{
    export_csv, export_xlsx, keyword_search, product_common_words, rating_trend,
    top_rated_products, top_reviewers,
};
use axum::{routing::get, Router};
use sqlx::PgPool;

pub fn analytics_routes() -> Router<PgPool> {
    Router::new()
        .route(
            "/analytics/products/{product_id}/rating-trend",
            get(rating_trend),
        )
        .route(
            "/analytics/products/{product_id}/common-words",
            get(product_common_words),
        )
        .route("/analytics/products/{product_id}/search", get(keyword_search))
        .route("/analytics/top-reviewers", get(top_reviewers))
        .route("/analytics/top-rated", get(top_rated_products))
        .route("/analytics/export/csv", get(export_csv))
        .route("/analytics/export/xlsx", get(export_xlsx))
}
