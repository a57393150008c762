use axum::{
    extract::{Extension, Path as AxumPath, Query, State},
    http::StatusCode,
};
use serde_json::json;
use sqlx::{PgPool, QueryBuilder};
use tracing::info;

use crate::api::auth::Claims;
use crate::config::Config;
use crate::db::models::report::{
    report_status, AdminReport, AdminReportsResponse, DashboardAlerts, DashboardOverview,
    DashboardResponse, ModerationAction, RatingDistribution, ReportCategory, ReportFilterParams,
    ReportSummary,
};
use crate::db::models::review::Review;
use crate::middleware::auth::{
    authorize, owned_product_ids, AuthzAction, AuthzContext, OwnershipCache,
};
use crate::utils::api_response::ApiResponse;
use crate::utils::notification::{messages, notify_user_tx};

/// Fetch a review together with its product's owner, or 404.
pub async fn fetch_review_with_owner(
    pool: &PgPool,
    review_id: i32,
) -> Result<(Review, i32), ApiResponse<()>> {
    let row: Option<(i32, i32, i32, i32, String, bool, chrono::NaiveDateTime, i32)> =
        sqlx::query_as(
            "SELECT r.id, r.product_id, r.author_id, r.rating, r.body, r.is_visible, \
             r.created_at, p.owner_id \
             FROM reviews r JOIN products p ON p.id = r.product_id \
             WHERE r.id = $1",
        )
        .bind(review_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to look up review",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    let Some((id, product_id, author_id, rating, body, is_visible, created_at, owner_id)) = row
    else {
        return Err(ApiResponse::not_found("Review not found"));
    };

    Ok((
        Review {
            id,
            product_id,
            author_id,
            rating,
            body,
            is_visible,
            created_at,
        },
        owner_id,
    ))
}

/// Applies one moderation action atomically: the visibility change, the audit
/// report, and the author notification commit together or not at all.
///
/// Approve and reject are idempotent on state: when the target visibility
/// already holds, no row is written and no notification is emitted. Reject
/// and flag always append an audit report, one per decision.
pub async fn apply_moderation(
    pool: &PgPool,
    review: &Review,
    action: ModerationAction,
) -> Result<(), ApiResponse<()>> {
    let internal = |e: sqlx::Error| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Moderation action failed",
            Some(json!({ "message": e.to_string() })),
        )
    };

    let mut tx = pool.begin().await.map_err(internal)?;

    let product_name: String = sqlx::query_scalar("SELECT name FROM products WHERE id = $1")
        .bind(review.product_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(internal)?;

    match action {
        ModerationAction::Approve => {
            if !review.is_visible {
                sqlx::query("UPDATE reviews SET is_visible = TRUE WHERE id = $1")
                    .bind(review.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(internal)?;

                notify_user_tx(&mut tx, review.author_id, &messages::review_approved(&product_name))
                    .await
                    .map_err(|e| {
                        ApiResponse::<()>::error(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Failed to notify review author",
                            Some(json!({ "message": e.to_string() })),
                        )
                    })?;
            }
        }
        ModerationAction::Reject => {
            if review.is_visible {
                sqlx::query("UPDATE reviews SET is_visible = FALSE WHERE id = $1")
                    .bind(review.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(internal)?;

                notify_user_tx(&mut tx, review.author_id, &messages::review_rejected(&product_name))
                    .await
                    .map_err(|e| {
                        ApiResponse::<()>::error(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Failed to notify review author",
                            Some(json!({ "message": e.to_string() })),
                        )
                    })?;
            }

            sqlx::query("INSERT INTO admin_reports (review_id, status) VALUES ($1, $2)")
                .bind(review.id)
                .bind(report_status::REJECTED)
                .execute(&mut *tx)
                .await
                .map_err(internal)?;
        }
        ModerationAction::Flag => {
            sqlx::query("INSERT INTO admin_reports (review_id, status) VALUES ($1, $2)")
                .bind(review.id)
                .bind(report_status::PENDING)
                .execute(&mut *tx)
                .await
                .map_err(internal)?;
        }
    }

    tx.commit().await.map_err(internal)?;

    info!(
        review_id = review.id,
        action = action.as_str(),
        "moderation action applied"
    );
    Ok(())
}

//
// PURE AGGREGATION PASSES
//
// The report summary and filters are single explicit passes over the
// requester-scoped rows, kept free of I/O so they can be tested directly.
//

pub fn summarize_reviews(reviews: &[Review], banned_words: &[String]) -> ReportSummary {
    let total_reviews = reviews.len() as i64;
    let unapproved_reviews = reviews.iter().filter(|r| !r.is_visible).count() as i64;
    ReportSummary {
        total_reviews,
        unapproved_reviews,
        low_rated_reviews: reviews.iter().filter(|r| r.is_low_rated()).count() as i64,
        offensive_reviews: reviews
            .iter()
            .filter(|r| r.contains_bad_words(banned_words))
            .count() as i64,
        approved_reviews: total_reviews - unapproved_reviews,
    }
}

pub fn filter_reviews(
    reviews: Vec<Review>,
    params: &ReportFilterParams,
    banned_words: &[String],
) -> Vec<Review> {
    reviews
        .into_iter()
        .filter(|r| params.product_id.is_none_or(|p| r.product_id == p))
        .filter(|r| params.rating.is_none_or(|x| r.rating == x))
        .filter(|r| params.created_after.is_none_or(|t| r.created_at >= t))
        .filter(|r| params.created_before.is_none_or(|t| r.created_at <= t))
        .filter(|r| match params.category {
            None => true,
            Some(ReportCategory::Unapproved) => !r.is_visible,
            Some(ReportCategory::LowRated) => r.is_low_rated(),
            Some(ReportCategory::Offensive) => r.contains_bad_words(banned_words),
        })
        .collect()
}

pub fn build_dashboard(
    total_products: i64,
    reviews: &[Review],
    banned_words: &[String],
) -> DashboardResponse {
    let summary = summarize_reviews(reviews, banned_words);

    let mut rating_distribution = RatingDistribution::default();
    for review in reviews {
        rating_distribution.add(review.rating);
    }

    DashboardResponse {
        overview: DashboardOverview {
            total_products,
            total_reviews: summary.total_reviews,
            approved_reviews: summary.approved_reviews,
            pending_reviews: summary.unapproved_reviews,
        },
        rating_distribution,
        alerts: DashboardAlerts {
            unapproved_count: summary.unapproved_reviews,
            low_rated_count: summary.low_rated_reviews,
            offensive_count: summary.offensive_reviews,
        },
    }
}

/// Latest audit reports for the requester's products.
async fn scoped_reports(
    pool: &PgPool,
    product_ids: &[i32],
) -> Result<Vec<AdminReport>, ApiResponse<()>> {
    let mut query_builder = QueryBuilder::new(
        "SELECT ar.id, ar.review_id, ar.status, ar.created_at \
         FROM admin_reports ar \
         JOIN reviews r ON r.id = ar.review_id \
         WHERE r.product_id = ANY(",
    );
    query_builder.push_bind(product_ids.to_vec());
    query_builder.push(") ORDER BY ar.created_at DESC, ar.id DESC LIMIT 50");

    query_builder
        .build_query_as::<AdminReport>()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve audit reports",
                Some(json!({ "message": e.to_string() })),
            )
        })
}

/// All reviews belonging to the requester's products.
async fn scoped_reviews(
    pool: &PgPool,
    product_ids: &[i32],
) -> Result<Vec<Review>, ApiResponse<()>> {
    if product_ids.is_empty() {
        return Ok(vec![]);
    }

    let mut query_builder = QueryBuilder::new(
        "SELECT id, product_id, author_id, rating, body, is_visible, created_at \
         FROM reviews WHERE product_id = ANY(",
    );
    query_builder.push_bind(product_ids.to_vec());
    query_builder.push(") ORDER BY created_at DESC, id DESC");

    query_builder
        .build_query_as::<Review>()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve reviews",
                Some(json!({ "message": e.to_string() })),
            )
        })
}

//
// MODERATION ENDPOINTS
//

/// Applies approve/reject/flag to a review. Product owner only.
#[utoipa::path(
    post,
    path = "/admin/reviews/{review_id}/{action}",
    tag = "Moderation",
    params(
        ("review_id" = i32, Path, description = "ID of the review being moderated"),
        ("action" = String, Path, description = "approve, reject or flag"),
    ),
    responses(
        (status = 200, description = "Moderation action applied"),
        (status = 403, description = "Not the product owner"),
        (status = 404, description = "Review or action not found"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn moderate_review(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath((review_id, action)): AxumPath<(i32, String)>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let Some(action) = ModerationAction::parse(&action) else {
        return Err(ApiResponse::not_found("Unknown moderation action"));
    };

    let (review, owner_id) = fetch_review_with_owner(&db_pool, review_id).await?;
    let ctx = AuthzContext::from_claims(&claims, Some(owner_id))?;
    authorize(AuthzAction::ModerateReview, &ctx)?;

    apply_moderation(&db_pool, &review, action).await?;

    let message = match action {
        ModerationAction::Approve => "Review approved",
        ModerationAction::Reject => "Review rejected",
        ModerationAction::Flag => "Review flagged for follow-up",
    };
    Ok(ApiResponse::success(StatusCode::OK, message, ()))
}

/// Review report for the requester's products: summary counts plus a
/// filtered review list.
#[utoipa::path(
    get,
    path = "/admin/reports",
    tag = "Moderation",
    params(ReportFilterParams),
    responses(
        (status = 200, description = "Report retrieved", body = AdminReportsResponse),
        (status = 403, description = "Requester owns no products"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn admin_reports(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Extension(ownership_cache): Extension<OwnershipCache>,
    Query(params): Query<ReportFilterParams>,
) -> Result<ApiResponse<AdminReportsResponse>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let owned = owned_product_ids(&db_pool, &ownership_cache, user_id)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load product ownership",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    if owned.is_empty() {
        return Err(ApiResponse::forbidden("Product owners only"));
    }

    let mut product_ids: Vec<i32> = owned.iter().copied().collect();
    product_ids.sort_unstable();

    let reviews = scoped_reviews(&db_pool, &product_ids).await?;
    let recent_reports = scoped_reports(&db_pool, &product_ids).await?;
    let banned_words = &Config::get().banned_words;

    let summary = summarize_reviews(&reviews, banned_words);
    let filtered_reviews = filter_reviews(reviews, &params, banned_words);

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Report retrieved successfully",
        AdminReportsResponse {
            summary,
            filtered_reviews,
            recent_reports,
        },
    ))
}

/// Moderation dashboard for the requester's products: overview totals,
/// rating distribution and alert counts.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "Moderation",
    responses(
        (status = 200, description = "Dashboard retrieved", body = DashboardResponse),
        (status = 403, description = "Requester owns no products"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn admin_dashboard(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Extension(ownership_cache): Extension<OwnershipCache>,
) -> Result<ApiResponse<DashboardResponse>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let owned = owned_product_ids(&db_pool, &ownership_cache, user_id)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load product ownership",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    if owned.is_empty() {
        return Err(ApiResponse::forbidden("Product owners only"));
    }

    let mut product_ids: Vec<i32> = owned.iter().copied().collect();
    product_ids.sort_unstable();

    let reviews = scoped_reviews(&db_pool, &product_ids).await?;
    let banned_words = &Config::get().banned_words;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Dashboard retrieved successfully",
        build_dashboard(product_ids.len() as i64, &reviews, banned_words),
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(moderate_review, admin_reports, admin_dashboard),
    components(
        schemas(AdminReportsResponse, DashboardResponse)
    ),
    tags(
        (name = "Moderation", description = "Owner-scoped review moderation")
    )
)]
pub struct ModerationDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn review(id: i32, product_id: i32, rating: i32, body: &str, is_visible: bool) -> Review {
        Review {
            id,
            product_id,
            author_id: 100 + id,
            rating,
            body: body.to_string(),
            is_visible,
            created_at: NaiveDateTime::default(),
        }
    }

    fn banned() -> Vec<String> {
        vec!["badword1".to_string(), "badword2".to_string()]
    }

    // One approved 5-star, one pending 4-star, one visible 1-star, one
    // visible offensive 2-star.
    fn fixture() -> Vec<Review> {
        vec![
            review(1, 1, 5, "Great product! Highly recommended.", true),
            review(2, 1, 4, "Good product but needs improvement.", false),
            review(3, 2, 1, "Very bad product. Do not buy.", true),
            review(4, 2, 2, "This product is badword1 and badword2.", true),
        ]
    }

    #[test]
    fn summary_counts_every_bucket() {
        let summary = summarize_reviews(&fixture(), &banned());
        assert_eq!(summary.total_reviews, 4);
        assert_eq!(summary.unapproved_reviews, 1);
        assert_eq!(summary.low_rated_reviews, 2);
        assert_eq!(summary.offensive_reviews, 1);
        assert_eq!(summary.approved_reviews, 3);
    }

    #[test]
    fn category_filters_match_summary() {
        let unapproved = filter_reviews(
            fixture(),
            &ReportFilterParams {
                category: Some(ReportCategory::Unapproved),
                ..Default::default()
            },
            &banned(),
        );
        assert_eq!(unapproved.len(), 1);
        assert_eq!(unapproved[0].id, 2);

        let low_rated = filter_reviews(
            fixture(),
            &ReportFilterParams {
                category: Some(ReportCategory::LowRated),
                ..Default::default()
            },
            &banned(),
        );
        assert_eq!(low_rated.len(), 2);

        let offensive = filter_reviews(
            fixture(),
            &ReportFilterParams {
                category: Some(ReportCategory::Offensive),
                ..Default::default()
            },
            &banned(),
        );
        assert_eq!(offensive.len(), 1);
        assert_eq!(offensive[0].id, 4);
    }

    #[test]
    fn product_and_rating_filters_compose() {
        let filtered = filter_reviews(
            fixture(),
            &ReportFilterParams {
                product_id: Some(2),
                rating: Some(1),
                ..Default::default()
            },
            &banned(),
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 3);
    }

    #[test]
    fn dashboard_mirrors_summary_and_distribution() {
        let dashboard = build_dashboard(2, &fixture(), &banned());
        assert_eq!(dashboard.overview.total_products, 2);
        assert_eq!(dashboard.overview.total_reviews, 4);
        assert_eq!(dashboard.overview.approved_reviews, 3);
        assert_eq!(dashboard.overview.pending_reviews, 1);
        assert_eq!(dashboard.rating_distribution.one_stars, 1);
        assert_eq!(dashboard.rating_distribution.two_stars, 1);
        assert_eq!(dashboard.rating_distribution.four_stars, 1);
        assert_eq!(dashboard.rating_distribution.five_stars, 1);
        assert_eq!(dashboard.alerts.low_rated_count, 2);
        assert_eq!(dashboard.alerts.offensive_count, 1);
    }
}
