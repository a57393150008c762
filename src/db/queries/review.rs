use axum::{
    extract::{Extension, Path as AxumPath, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use sqlx::{PgPool, QueryBuilder};

use crate::api::auth::Claims;
use crate::db::models::review::{NewReview, Review, ReviewListParams, ReviewOrder, UpdateReview};
use crate::db::queries::moderation::{apply_moderation, fetch_review_with_owner};
use crate::db::models::report::ModerationAction;
use crate::db::queries::product::product_owner;
use crate::middleware::auth::{authorize, AuthzAction, AuthzContext};
use crate::utils::api_response::ApiResponse;

fn validate_rating(rating: i32) -> Result<(), ApiResponse<()>> {
    if !(1..=5).contains(&rating) {
        return Err(ApiResponse::validation("Rating must be between 1 and 5."));
    }
    Ok(())
}

//
// REVIEW CRUD FUNCTIONS
//

/// Lists the visible reviews of a product.
///
/// Supports an exact `rating` filter and ordering by creation time (default,
/// newest first) or total engagement.
#[utoipa::path(
    get,
    path = "/products/{product_id}/reviews",
    tag = "Reviews",
    params(
        ("product_id" = i32, Path, description = "Product whose reviews are listed"),
        ReviewListParams
    ),
    responses(
        (status = 200, description = "Successfully retrieved reviews for product", body = Vec<Review>),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn get_reviews_for_product(
    State(db_pool): State<PgPool>,
    AxumPath(product_id): AxumPath<i32>,
    Query(params): Query<ReviewListParams>,
) -> Result<ApiResponse<Vec<Review>>, ApiResponse<()>> {
    product_owner(&db_pool, product_id).await?;

    let mut query_builder = QueryBuilder::new(
        "SELECT id, product_id, author_id, rating, body, is_visible, created_at \
         FROM reviews WHERE is_visible = TRUE AND product_id = ",
    );
    query_builder.push_bind(product_id);

    if let Some(rating) = params.rating {
        query_builder.push(" AND rating = ").push_bind(rating);
    }

    match params.order.unwrap_or_default() {
        ReviewOrder::Created => {
            query_builder.push(" ORDER BY created_at DESC, id DESC");
        }
        ReviewOrder::Engagement => {
            query_builder.push(
                " ORDER BY (SELECT COALESCE(SUM((i.liked)::int + (i.is_helpful)::int), 0) \
                 FROM review_interactions i WHERE i.review_id = reviews.id) DESC, id ASC",
            );
        }
    }

    let reviews: Vec<Review> = query_builder
        .build_query_as::<Review>()
        .fetch_all(&db_pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve reviews",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Reviews retrieved successfully",
        reviews,
    ))
}

/// Creates a review against a product. The author is the current principal
/// and the review starts invisible until a moderation approval.
#[utoipa::path(
    post,
    path = "/products/{product_id}/reviews",
    tag = "Reviews",
    params(
        ("product_id" = i32, Path, description = "Product being reviewed"),
    ),
    request_body = NewReview,
    responses(
        (status = 201, description = "Successfully created review", body = i32),
        (status = 400, description = "Rating outside 1-5"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn create_review(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(product_id): AxumPath<i32>,
    Json(payload): Json<NewReview>,
) -> Result<ApiResponse<i32>, ApiResponse<()>> {
    let user_id = claims.user_id()?;
    validate_rating(payload.rating)?;
    product_owner(&db_pool, product_id).await?;

    let id: i32 = sqlx::query_scalar(
        "INSERT INTO reviews (product_id, author_id, rating, body, is_visible) \
         VALUES ($1, $2, $3, $4, FALSE) RETURNING id",
    )
    .bind(product_id)
    .bind(user_id)
    .bind(payload.rating)
    .bind(&payload.body)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create review",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Review created successfully",
        id,
    ))
}

/// Updates a review's rating or body. Author only; visibility is untouched.
#[utoipa::path(
    patch,
    path = "/products/{product_id}/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("product_id" = i32, Path, description = "Product the review belongs to"),
        ("review_id" = i32, Path, description = "ID of the review to be updated"),
    ),
    request_body = UpdateReview,
    responses(
        (status = 200, description = "Review updated successfully"),
        (status = 400, description = "No fields provided for update"),
        (status = 403, description = "Not the review author"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn update_review(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath((product_id, review_id)): AxumPath<(i32, i32)>,
    Json(payload): Json<UpdateReview>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    if payload.is_empty() {
        return Err(ApiResponse::validation("No fields provided for update"));
    }
    if let Some(rating) = payload.rating {
        validate_rating(rating)?;
    }

    let (review, _owner_id) = fetch_review_with_owner(&db_pool, review_id).await?;
    if review.product_id != product_id {
        return Err(ApiResponse::not_found("Review not found"));
    }

    let ctx = AuthzContext::from_claims(&claims, Some(review.author_id))?;
    authorize(AuthzAction::EditReview, &ctx)?;

    let mut query_builder = QueryBuilder::new("UPDATE reviews SET ");
    let mut first = true;
    if let Some(rating) = payload.rating {
        query_builder.push("rating = ").push_bind(rating);
        first = false;
    }
    if let Some(body) = &payload.body {
        if !first {
            query_builder.push(", ");
        }
        query_builder.push("body = ").push_bind(body);
    }
    query_builder.push(" WHERE id = ").push_bind(review_id);

    query_builder
        .build()
        .execute(&db_pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update review",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Review updated successfully",
        (),
    ))
}

/// Deletes a review. Author only. Interactions and reports cascade.
#[utoipa::path(
    delete,
    path = "/products/{product_id}/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("product_id" = i32, Path, description = "Product the review belongs to"),
        ("review_id" = i32, Path, description = "ID of the review to be deleted"),
    ),
    responses(
        (status = 204, description = "Review successfully deleted"),
        (status = 403, description = "Not the review author"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn delete_review(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath((product_id, review_id)): AxumPath<(i32, i32)>,
) -> Result<StatusCode, ApiResponse<()>> {
    let (review, _owner_id) = fetch_review_with_owner(&db_pool, review_id).await?;
    if review.product_id != product_id {
        return Err(ApiResponse::not_found("Review not found"));
    }

    let ctx = AuthzContext::from_claims(&claims, Some(review.author_id))?;
    authorize(AuthzAction::DeleteReview, &ctx)?;

    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(review_id)
        .execute(&db_pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete review",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Approves a review, making it publicly visible. Product owner only.
#[utoipa::path(
    post,
    path = "/products/{product_id}/reviews/{review_id}/approve",
    tag = "Reviews",
    params(
        ("product_id" = i32, Path, description = "Product the review belongs to"),
        ("review_id" = i32, Path, description = "ID of the review to approve"),
    ),
    responses(
        (status = 200, description = "Review approved"),
        (status = 403, description = "Not the product owner"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn approve_review(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath((product_id, review_id)): AxumPath<(i32, i32)>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let (review, owner_id) = fetch_review_with_owner(&db_pool, review_id).await?;
    if review.product_id != product_id {
        return Err(ApiResponse::not_found("Review not found"));
    }

    let ctx = AuthzContext::from_claims(&claims, Some(owner_id))?;
    authorize(AuthzAction::ModerateReview, &ctx)?;

    apply_moderation(&db_pool, &review, ModerationAction::Approve).await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Review approved",
        (),
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        get_reviews_for_product,
        create_review,
        update_review,
        delete_review,
        approve_review
    ),
    components(
        schemas(Review, NewReview, UpdateReview)
    ),
    tags(
        (name = "Reviews", description = "Review Management Endpoints")
    )
)]
pub struct ReviewDoc;
