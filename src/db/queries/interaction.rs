use axum::{
    extract::{Extension, Path as AxumPath, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use sqlx::PgPool;

use crate::api::auth::Claims;
use crate::db::models::interaction::{
    InteractionStats, NewInteraction, ReviewInteraction, TopReview, UpdateInteraction,
};
use crate::utils::api_response::ApiResponse;
use crate::utils::notification::notify_user_tx;

async fn review_author(pool: &PgPool, review_id: i32) -> Result<i32, ApiResponse<()>> {
    let author: Option<i32> = sqlx::query_scalar("SELECT author_id FROM reviews WHERE id = $1")
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

    author.ok_or_else(|| ApiResponse::not_found("Review not found"))
}

/// Records a like/helpful vote on a review.
///
/// Fails with 400 on self-interaction and on a second interaction for the
/// same (review, user) pair; the pair is also enforced by a unique
/// constraint, so concurrent duplicates surface the same 400.
#[utoipa::path(
    post,
    path = "/review-interactions",
    tag = "Interactions",
    request_body = NewInteraction,
    responses(
        (status = 201, description = "Interaction recorded", body = ReviewInteraction),
        (status = 400, description = "Self-interaction or duplicate interaction"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn create_interaction(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewInteraction>,
) -> Result<ApiResponse<ReviewInteraction>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let author_id = review_author(&db_pool, payload.review_id).await?;
    if author_id == user_id {
        return Err(ApiResponse::validation(
            "You cannot interact with your own review",
        ));
    }

    let internal = |e: sqlx::Error| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to record interaction",
            Some(json!({ "message": e.to_string() })),
        )
    };

    let mut tx = db_pool.begin().await.map_err(internal)?;

    let inserted: Result<ReviewInteraction, sqlx::Error> = sqlx::query_as(
        "INSERT INTO review_interactions (review_id, user_id, liked, is_helpful) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, review_id, user_id, liked, is_helpful, created_at",
    )
    .bind(payload.review_id)
    .bind(user_id)
    .bind(payload.liked)
    .bind(payload.is_helpful)
    .fetch_one(&mut *tx)
    .await;

    let interaction = match inserted {
        Ok(interaction) => interaction,
        Err(e) => {
            if let Some(db_err) = e.as_database_error() {
                if db_err.code().map(|code| code == "23505").unwrap_or(false) {
                    return Err(ApiResponse::validation(
                        "You have already interacted with this review",
                    ));
                }
            }
            return Err(internal(e));
        }
    };

    notify_user_tx(
        &mut tx,
        author_id,
        &format!("Your review received a new interaction from {}", claims.username),
    )
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to notify review author",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    tx.commit().await.map_err(internal)?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Interaction recorded successfully",
        interaction,
    ))
}

/// Lists the current user's interactions.
#[utoipa::path(
    get,
    path = "/review-interactions",
    tag = "Interactions",
    responses(
        (status = 200, description = "Interactions retrieved", body = Vec<ReviewInteraction>),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn get_interactions(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<Vec<ReviewInteraction>>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let interactions: Vec<ReviewInteraction> = sqlx::query_as(
        "SELECT id, review_id, user_id, liked, is_helpful, created_at \
         FROM review_interactions WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to retrieve interactions",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Interactions retrieved successfully",
        interactions,
    ))
}

/// Updates an existing interaction. Creator only.
#[utoipa::path(
    patch,
    path = "/review-interactions/{id}",
    tag = "Interactions",
    params(
        ("id" = i32, Path, description = "ID of the interaction"),
    ),
    request_body = UpdateInteraction,
    responses(
        (status = 200, description = "Interaction updated", body = ReviewInteraction),
        (status = 400, description = "No fields provided for update"),
        (status = 403, description = "Not the interaction creator"),
        (status = 404, description = "Interaction not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn update_interaction(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(interaction_id): AxumPath<i32>,
    Json(payload): Json<UpdateInteraction>,
) -> Result<ApiResponse<ReviewInteraction>, ApiResponse<()>> {
    if payload.is_empty() {
        return Err(ApiResponse::validation("No fields provided for update"));
    }

    let user_id = claims.user_id()?;

    let owner: Option<i32> =
        sqlx::query_scalar("SELECT user_id FROM review_interactions WHERE id = $1")
            .bind(interaction_id)
            .fetch_optional(&db_pool)
            .await
            .map_err(|e| {
                ApiResponse::<()>::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to look up interaction",
                    Some(json!({ "message": e.to_string() })),
                )
            })?;

    let owner = owner.ok_or_else(|| ApiResponse::not_found("Interaction not found"))?;
    if owner != user_id {
        return Err(ApiResponse::forbidden(
            "Only the interaction creator may modify it",
        ));
    }

    let interaction: ReviewInteraction = sqlx::query_as(
        "UPDATE review_interactions \
         SET liked = COALESCE($1, liked), is_helpful = COALESCE($2, is_helpful) \
         WHERE id = $3 \
         RETURNING id, review_id, user_id, liked, is_helpful, created_at",
    )
    .bind(payload.liked)
    .bind(payload.is_helpful)
    .bind(interaction_id)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to update interaction",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Interaction updated successfully",
        interaction,
    ))
}

/// Deletes an interaction. Creator only.
#[utoipa::path(
    delete,
    path = "/review-interactions/{id}",
    tag = "Interactions",
    params(
        ("id" = i32, Path, description = "ID of the interaction"),
    ),
    responses(
        (status = 204, description = "Interaction deleted"),
        (status = 403, description = "Not the interaction creator"),
        (status = 404, description = "Interaction not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn delete_interaction(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(interaction_id): AxumPath<i32>,
) -> Result<StatusCode, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let owner: Option<i32> =
        sqlx::query_scalar("SELECT user_id FROM review_interactions WHERE id = $1")
            .bind(interaction_id)
            .fetch_optional(&db_pool)
            .await
            .map_err(|e| {
                ApiResponse::<()>::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to look up interaction",
                    Some(json!({ "message": e.to_string() })),
                )
            })?;

    let owner = owner.ok_or_else(|| ApiResponse::not_found("Interaction not found"))?;
    if owner != user_id {
        return Err(ApiResponse::forbidden(
            "Only the interaction creator may delete it",
        ));
    }

    sqlx::query("DELETE FROM review_interactions WHERE id = $1")
        .bind(interaction_id)
        .execute(&db_pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete interaction",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Like/helpful counts for one review.
#[utoipa::path(
    get,
    path = "/review-interactions/review/{review_id}/stats",
    tag = "Interactions",
    params(
        ("review_id" = i32, Path, description = "ID of the review"),
    ),
    responses(
        (status = 200, description = "Stats retrieved", body = InteractionStats),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn interaction_stats(
    State(db_pool): State<PgPool>,
    AxumPath(review_id): AxumPath<i32>,
) -> Result<ApiResponse<InteractionStats>, ApiResponse<()>> {
    review_author(&db_pool, review_id).await?;

    let (likes_count, helpful_count): (i64, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM((liked)::int), 0)::BIGINT, \
                COALESCE(SUM((is_helpful)::int), 0)::BIGINT \
         FROM review_interactions WHERE review_id = $1",
    )
    .bind(review_id)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to aggregate interactions",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Stats retrieved successfully",
        InteractionStats {
            likes_count,
            helpful_count,
            total_interactions: likes_count + helpful_count,
        },
    ))
}

/// The product's review with the highest engagement.
///
/// Engagement is likes + helpful votes; ties go to the oldest review
/// (smallest id). 404 when the product has no reviews.
#[utoipa::path(
    get,
    path = "/products/{product_id}/top-review",
    tag = "Interactions",
    params(
        ("product_id" = i32, Path, description = "ID of the product"),
    ),
    responses(
        (status = 200, description = "Top review retrieved", body = TopReview),
        (status = 404, description = "Product has no reviews"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn top_review(
    State(db_pool): State<PgPool>,
    AxumPath(product_id): AxumPath<i32>,
) -> Result<ApiResponse<TopReview>, ApiResponse<()>> {
    let top: Option<TopReview> = sqlx::query_as(
        "SELECT r.id, r.product_id, r.author_id, r.rating, r.body, \
                COALESCE(SUM((i.liked)::int), 0)::BIGINT AS likes_count, \
                COALESCE(SUM((i.is_helpful)::int), 0)::BIGINT AS helpful_count, \
                COALESCE(SUM((i.liked)::int + (i.is_helpful)::int), 0)::BIGINT AS total_interactions \
         FROM reviews r \
         LEFT JOIN review_interactions i ON i.review_id = r.id \
         WHERE r.product_id = $1 \
         GROUP BY r.id \
         ORDER BY total_interactions DESC, r.id ASC \
         LIMIT 1",
    )
    .bind(product_id)
    .fetch_optional(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to rank reviews",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    let top = top.ok_or_else(|| ApiResponse::not_found("Product has no reviews"))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Top review retrieved successfully",
        top,
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_interaction,
        get_interactions,
        update_interaction,
        delete_interaction,
        interaction_stats,
        top_review
    ),
    components(
        schemas(ReviewInteraction, NewInteraction, UpdateInteraction, InteractionStats, TopReview)
    ),
    tags(
        (name = "Interactions", description = "Review Interaction Endpoints")
    )
)]
pub struct InteractionDoc;
