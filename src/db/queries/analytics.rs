use axum::{
    extract::{Extension, Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::collections::{hash_map::Entry, HashMap};

use crate::api::auth::Claims;
use crate::db::models::analytics::{
    KeywordParams, LimitParams, ProductSnapshot, RatingTrend, TopRatedProduct, TopReviewer,
    TrendParams, WordCount,
};
use crate::db::models::review::Review;
use crate::db::queries::product::product_owner;
use crate::middleware::auth::{authorize, AuthzAction, AuthzContext};
use crate::utils::api_response::ApiResponse;
use crate::utils::export::{products_csv, products_workbook, ProductAnalyticsRow};

const DEFAULT_TREND_DAYS: i64 = 30;
const DEFAULT_WORD_LIMIT: usize = 10;
const DEFAULT_REVIEWER_LIMIT: i64 = 5;
const EXPORT_WORD_LIMIT: usize = 5;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//
// PURE AGGREGATION HELPERS
//

pub fn trend_from_ratings(ratings: &[i32], days: i64) -> RatingTrend {
    let total_reviews = ratings.len() as i64;
    let average_rating = if ratings.is_empty() {
        0.0
    } else {
        round2(ratings.iter().map(|r| *r as f64).sum::<f64>() / total_reviews as f64)
    };
    RatingTrend {
        average_rating,
        total_reviews,
        trend_days: days,
    }
}

/// Lowercase alphanumeric words of length >= 4, most frequent first. Equal
/// counts keep first-encountered order (the ranking sort is stable).
pub fn common_words<'a, I>(bodies: I, limit: usize) -> Vec<WordCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();

    for body in bodies {
        let lowered = body.to_lowercase();
        for word in lowered.split(|c: char| !c.is_alphanumeric()) {
            if word.chars().count() < 4 {
                continue;
            }
            match counts.entry(word.to_string()) {
                Entry::Occupied(mut entry) => *entry.get_mut() += 1,
                Entry::Vacant(entry) => {
                    entry.insert(1);
                    order.push(word.to_string());
                }
            }
        }
    }

    let mut ranked: Vec<WordCount> = order
        .into_iter()
        .map(|word| {
            let count = counts[&word];
            WordCount { word, count }
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

/// Escape LIKE wildcards so a keyword is matched literally.
pub fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

//
// ANALYTICS ENDPOINTS
//

/// Average rating and review count over the trailing window, visible
/// reviews only.
#[utoipa::path(
    get,
    path = "/analytics/products/{product_id}/rating-trend",
    tag = "Analytics",
    params(
        ("product_id" = i32, Path, description = "ID of the product"),
        TrendParams
    ),
    responses(
        (status = 200, description = "Trend retrieved", body = RatingTrend),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn rating_trend(
    State(db_pool): State<PgPool>,
    AxumPath(product_id): AxumPath<i32>,
    Query(params): Query<TrendParams>,
) -> Result<ApiResponse<RatingTrend>, ApiResponse<()>> {
    let days = params.days.unwrap_or(DEFAULT_TREND_DAYS).max(1);
    product_owner(&db_pool, product_id).await?;

    let cutoff = (Utc::now() - Duration::days(days)).naive_utc();
    let ratings: Vec<i32> = sqlx::query_scalar(
        "SELECT rating FROM reviews \
         WHERE product_id = $1 AND is_visible = TRUE AND created_at >= $2",
    )
    .bind(product_id)
    .bind(cutoff)
    .fetch_all(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to compute rating trend",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Trend retrieved successfully",
        trend_from_ratings(&ratings, days),
    ))
}

/// Most frequent words (length >= 4) across a product's visible reviews.
#[utoipa::path(
    get,
    path = "/analytics/products/{product_id}/common-words",
    tag = "Analytics",
    params(
        ("product_id" = i32, Path, description = "ID of the product"),
        LimitParams
    ),
    responses(
        (status = 200, description = "Word frequencies retrieved", body = Vec<WordCount>),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn product_common_words(
    State(db_pool): State<PgPool>,
    AxumPath(product_id): AxumPath<i32>,
    Query(params): Query<LimitParams>,
) -> Result<ApiResponse<Vec<WordCount>>, ApiResponse<()>> {
    let limit = params.limit.unwrap_or(DEFAULT_WORD_LIMIT as i64).max(0) as usize;
    product_owner(&db_pool, product_id).await?;

    let bodies: Vec<String> = sqlx::query_scalar(
        "SELECT body FROM reviews WHERE product_id = $1 AND is_visible = TRUE ORDER BY id",
    )
    .bind(product_id)
    .fetch_all(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load review text",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Word frequencies retrieved successfully",
        common_words(bodies.iter().map(String::as_str), limit),
    ))
}

/// Authors ranked by review count across all products. Staff only.
#[utoipa::path(
    get,
    path = "/analytics/top-reviewers",
    tag = "Analytics",
    params(LimitParams),
    responses(
        (status = 200, description = "Top reviewers retrieved", body = Vec<TopReviewer>),
        (status = 403, description = "Staff access required"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn top_reviewers(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<LimitParams>,
) -> Result<ApiResponse<Vec<TopReviewer>>, ApiResponse<()>> {
    let ctx = AuthzContext::from_claims(&claims, None)?;
    authorize(AuthzAction::GlobalAnalytics, &ctx)?;

    let limit = params.limit.unwrap_or(DEFAULT_REVIEWER_LIMIT).max(1);
    let reviewers: Vec<TopReviewer> = sqlx::query_as(
        "SELECT u.username, COUNT(r.id) AS review_count \
         FROM reviews r JOIN users u ON u.id = r.author_id \
         GROUP BY u.username \
         ORDER BY review_count DESC, u.username ASC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to rank reviewers",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Top reviewers retrieved successfully",
        reviewers,
    ))
}

/// Case-insensitive substring search over a product's visible reviews.
/// An empty keyword matches nothing.
#[utoipa::path(
    get,
    path = "/analytics/products/{product_id}/search",
    tag = "Analytics",
    params(
        ("product_id" = i32, Path, description = "ID of the product"),
        KeywordParams
    ),
    responses(
        (status = 200, description = "Matching reviews retrieved", body = Vec<Review>),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn keyword_search(
    State(db_pool): State<PgPool>,
    AxumPath(product_id): AxumPath<i32>,
    Query(params): Query<KeywordParams>,
) -> Result<ApiResponse<Vec<Review>>, ApiResponse<()>> {
    product_owner(&db_pool, product_id).await?;

    let keyword = params.keyword.unwrap_or_default();
    if keyword.is_empty() {
        return Ok(ApiResponse::success(
            StatusCode::OK,
            "Matching reviews retrieved successfully",
            vec![],
        ));
    }

    let pattern = format!("%{}%", escape_like(&keyword));
    let reviews: Vec<Review> = sqlx::query_as(
        "SELECT id, product_id, author_id, rating, body, is_visible, created_at \
         FROM reviews \
         WHERE product_id = $1 AND is_visible = TRUE AND body ILIKE $2 \
         ORDER BY created_at DESC",
    )
    .bind(product_id)
    .bind(pattern)
    .fetch_all(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to search reviews",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Matching reviews retrieved successfully",
        reviews,
    ))
}

/// Products ranked by average visible rating within the window. Staff only.
#[utoipa::path(
    get,
    path = "/analytics/top-rated",
    tag = "Analytics",
    params(TrendParams),
    responses(
        (status = 200, description = "Top rated products retrieved", body = Vec<TopRatedProduct>),
        (status = 403, description = "Staff access required"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn top_rated_products(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<TrendParams>,
) -> Result<ApiResponse<Vec<TopRatedProduct>>, ApiResponse<()>> {
    let ctx = AuthzContext::from_claims(&claims, None)?;
    authorize(AuthzAction::GlobalAnalytics, &ctx)?;

    let days = params.days.unwrap_or(DEFAULT_TREND_DAYS).max(1);
    let cutoff = (Utc::now() - Duration::days(days)).naive_utc();

    let products: Vec<TopRatedProduct> = sqlx::query_as(
        "SELECT p.id, p.name, \
                ROUND(AVG(r.rating), 2)::FLOAT8 AS average_rating, \
                COUNT(r.id) AS review_count \
         FROM products p \
         JOIN reviews r ON r.product_id = p.id \
              AND r.is_visible = TRUE AND r.created_at >= $1 \
         GROUP BY p.id, p.name \
         ORDER BY average_rating DESC, p.id ASC",
    )
    .bind(cutoff)
    .fetch_all(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to rank products",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Top rated products retrieved successfully",
        products,
    ))
}

//
// EXPORT ENDPOINTS
//

async fn product_snapshots(pool: &PgPool) -> Result<Vec<ProductSnapshot>, ApiResponse<()>> {
    sqlx::query_as(
        "SELECT p.id, p.name, \
                COALESCE(ROUND(AVG(r.rating) FILTER (WHERE r.is_visible), 2), 0)::FLOAT8 AS average_rating, \
                COUNT(r.id) FILTER (WHERE r.is_visible) AS review_count \
         FROM products p \
         LEFT JOIN reviews r ON r.product_id = p.id \
         GROUP BY p.id, p.name \
         ORDER BY p.id",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to build product snapshot",
            Some(json!({ "message": e.to_string() })),
        )
    })
}

/// Per-product analytics rows for the richer spreadsheet sheet.
async fn analytics_rows(
    pool: &PgPool,
    snapshots: &[ProductSnapshot],
) -> Result<Vec<ProductAnalyticsRow>, ApiResponse<()>> {
    let reviews: Vec<(i32, i32, String, bool)> = sqlx::query_as(
        "SELECT product_id, rating, body, is_visible FROM reviews ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load reviews for export",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    let mut by_product: HashMap<i32, Vec<&(i32, i32, String, bool)>> = HashMap::new();
    for review in &reviews {
        by_product.entry(review.0).or_default().push(review);
    }

    Ok(snapshots
        .iter()
        .map(|snapshot| {
            let rows = by_product.remove(&snapshot.id).unwrap_or_default();
            let words = common_words(
                rows.iter()
                    .filter(|(_, _, _, is_visible)| *is_visible)
                    .map(|(_, _, body, _)| body.as_str()),
                EXPORT_WORD_LIMIT,
            );
            ProductAnalyticsRow {
                id: snapshot.id,
                name: snapshot.name.clone(),
                common_words: words
                    .iter()
                    .map(|w| format!("{} ({})", w.word, w.count))
                    .collect::<Vec<_>>()
                    .join(", "),
                low_rated_count: rows.iter().filter(|(_, rating, _, _)| *rating <= 2).count()
                    as i64,
                pending_count: rows
                    .iter()
                    .filter(|(_, _, _, is_visible)| !*is_visible)
                    .count() as i64,
            }
        })
        .collect())
}

/// CSV snapshot: one row per product. Staff only.
#[utoipa::path(
    get,
    path = "/analytics/export/csv",
    tag = "Analytics",
    responses(
        (status = 200, description = "CSV export produced"),
        (status = 403, description = "Staff access required"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn export_csv(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiResponse<()>> {
    let ctx = AuthzContext::from_claims(&claims, None)?;
    authorize(AuthzAction::GlobalAnalytics, &ctx)?;

    let snapshots = product_snapshots(&db_pool).await?;
    let bytes = products_csv(&snapshots).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to render CSV export",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"products.csv\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

/// XLSX snapshot: product sheet plus a per-product analytics sheet.
/// Staff only.
#[utoipa::path(
    get,
    path = "/analytics/export/xlsx",
    tag = "Analytics",
    responses(
        (status = 200, description = "XLSX export produced"),
        (status = 403, description = "Staff access required"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn export_xlsx(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiResponse<()>> {
    let ctx = AuthzContext::from_claims(&claims, None)?;
    authorize(AuthzAction::GlobalAnalytics, &ctx)?;

    let snapshots = product_snapshots(&db_pool).await?;
    let details = analytics_rows(&db_pool, &snapshots).await?;
    let bytes = products_workbook(&snapshots, &details).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to render XLSX export",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"products.xlsx\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        rating_trend,
        product_common_words,
        top_reviewers,
        keyword_search,
        top_rated_products,
        export_csv,
        export_xlsx
    ),
    components(
        schemas(RatingTrend, WordCount, TopReviewer, TopRatedProduct)
    ),
    tags(
        (name = "Analytics", description = "Review Analytics Endpoints")
    )
)]
pub struct AnalyticsDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_averages_and_rounds() {
        let trend = trend_from_ratings(&[5, 4], 30);
        assert_eq!(trend.average_rating, 4.5);
        assert_eq!(trend.total_reviews, 2);
        assert_eq!(trend.trend_days, 30);

        let uneven = trend_from_ratings(&[5, 4, 4], 30);
        assert_eq!(uneven.average_rating, 4.33);
    }

    #[test]
    fn trend_is_zero_without_reviews() {
        let trend = trend_from_ratings(&[], 7);
        assert_eq!(trend.average_rating, 0.0);
        assert_eq!(trend.total_reviews, 0);
    }

    #[test]
    fn common_words_drops_short_words_and_lowercases() {
        let ranked = common_words(["Great value, GREAT build", "the fan is loud"], 10);
        assert_eq!(ranked[0].word, "great");
        assert_eq!(ranked[0].count, 2);
        assert!(ranked.iter().all(|w| w.word.chars().count() >= 4));
        assert!(!ranked.iter().any(|w| w.word == "fan"));
    }

    #[test]
    fn common_words_ties_keep_first_encountered_order() {
        let ranked = common_words(["alpha bravo", "bravo alpha"], 2);
        assert_eq!(ranked[0].word, "alpha");
        assert_eq!(ranked[1].word, "bravo");
        assert_eq!(ranked[0].count, 2);
        assert_eq!(ranked[1].count, 2);
    }

    #[test]
    fn common_words_honors_limit() {
        let ranked = common_words(["alpha alpha bravo charlie"], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].word, "alpha");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn round2_truncates_to_two_places() {
        assert_eq!(round2(4.333333), 4.33);
        assert_eq!(round2(4.336), 4.34);
    }
}
