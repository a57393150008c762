use axum::{
    extract::{Extension, Path as AxumPath, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use sqlx::{PgPool, QueryBuilder};

use crate::api::auth::Claims;
use crate::db::models::product::{
    NewProduct, Product, ProductFilterParams, ProductIdResponse, ProductRatingSummary,
    UpdateProduct,
};
use crate::db::queries::analytics::round2;
use crate::middleware::auth::{authorize, invalidate_ownership, AuthzAction, AuthzContext, OwnershipCache};
use crate::utils::api_response::ApiResponse;

/// Fetch a product's owner, or 404.
pub async fn product_owner(pool: &PgPool, product_id: i32) -> Result<i32, ApiResponse<()>> {
    let owner: Option<i32> = sqlx::query_scalar("SELECT owner_id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to look up product",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    owner.ok_or_else(|| ApiResponse::not_found("Product not found"))
}

/// Creates a new product owned by the current user.
#[utoipa::path(
    post,
    path = "/products",
    tag = "Products",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Successfully created product", body = ProductIdResponse),
        (status = 400, description = "Missing product fields"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn create_product(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Extension(ownership_cache): Extension<OwnershipCache>,
    Json(payload): Json<NewProduct>,
) -> Result<ApiResponse<ProductIdResponse>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    if payload.name.trim().is_empty() {
        return Err(ApiResponse::validation("Product name is required"));
    }

    let id: i32 = sqlx::query_scalar(
        "INSERT INTO products (name, description, price, owner_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.price)
    .bind(user_id)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create product",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    invalidate_ownership(&ownership_cache, user_id);

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Product created successfully",
        ProductIdResponse { id },
    ))
}

/// Retrieves a paginated, filterable product listing.
#[utoipa::path(
    get,
    path = "/products",
    params(ProductFilterParams),
    responses(
        (status = 200, description = "Successfully retrieved a paginated list of products", body = Vec<Product>),
        (status = 500, description = "Failed to retrieve products")
    ),
    tag = "Products",
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn get_products(
    State(db_pool): State<PgPool>,
    Query(params): Query<ProductFilterParams>,
) -> Result<ApiResponse<Value>, ApiResponse<()>> {
    let mut query_builder = QueryBuilder::new(
        "SELECT id, name, description, price, owner_id, created_at FROM products",
    );
    let mut count_query_builder = QueryBuilder::new("SELECT COUNT(id) FROM products");

    let mut has_conditions = false; // Track if WHERE conditions exist

    if let Some(owner_id) = params.owner_id {
        query_builder.push(" WHERE owner_id = ").push_bind(owner_id);
        count_query_builder.push(" WHERE owner_id = ").push_bind(owner_id);
        has_conditions = true;
    }

    if let Some(name) = &params.name {
        let pattern = format!("%{}%", name);
        if has_conditions {
            query_builder.push(" AND ");
            count_query_builder.push(" AND ");
        } else {
            query_builder.push(" WHERE ");
            count_query_builder.push(" WHERE ");
        }
        query_builder.push("name ILIKE ").push_bind(pattern.clone());
        count_query_builder.push("name ILIKE ").push_bind(pattern);
    }

    query_builder.push(" ORDER BY id");

    // Apply pagination if requested
    if params.page.is_some() || params.limit.is_some() || params.offset.is_some() {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(10).min(100);
        let offset = params.offset.unwrap_or((page - 1) * limit);

        query_builder
            .push(" LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);
    }

    let total_count: i64 = count_query_builder
        .build_query_scalar::<i64>()
        .fetch_one(&db_pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve product count",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    let products: Vec<Product> = query_builder
        .build_query_as::<Product>()
        .fetch_all(&db_pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve products",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Products retrieved successfully",
        json!({
            "total_products": total_count,
            "products": products
        }),
    ))
}

/// Retrieves a single product.
#[utoipa::path(
    get,
    path = "/products/{product_id}",
    tag = "Products",
    params(
        ("product_id" = i32, Path, description = "ID of the product"),
    ),
    responses(
        (status = 200, description = "Product retrieved successfully", body = Product),
        (status = 404, description = "Product not found"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn get_product(
    State(db_pool): State<PgPool>,
    AxumPath(product_id): AxumPath<i32>,
) -> Result<ApiResponse<Product>, ApiResponse<()>> {
    let product: Option<Product> = sqlx::query_as(
        "SELECT id, name, description, price, owner_id, created_at FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to retrieve product",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    let product = product.ok_or_else(|| ApiResponse::not_found("Product not found"))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Product retrieved successfully",
        product,
    ))
}

/// Updates a product. Owner only.
#[utoipa::path(
    patch,
    path = "/products/{product_id}",
    tag = "Products",
    params(
        ("product_id" = i32, Path, description = "ID of the product to be updated"),
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated successfully"),
        (status = 400, description = "No fields provided for update"),
        (status = 403, description = "Not the product owner"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn update_product(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(product_id): AxumPath<i32>,
    Json(payload): Json<UpdateProduct>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    if payload.is_empty() {
        return Err(ApiResponse::validation("No fields provided for update"));
    }

    let owner_id = product_owner(&db_pool, product_id).await?;
    let ctx = AuthzContext::from_claims(&claims, Some(owner_id))?;
    authorize(AuthzAction::EditProduct, &ctx)?;

    let mut query_builder = QueryBuilder::new("UPDATE products SET ");
    let mut first = true;

    macro_rules! push_update {
        ($field:ident) => {
            if let Some(value) = &payload.$field {
                if !first {
                    query_builder.push(", ");
                }
                query_builder
                    .push(concat!(stringify!($field), " = "))
                    .push_bind(value);
                first = false;
            }
        };
    }

    push_update!(name);
    push_update!(description);
    push_update!(price);

    query_builder.push(" WHERE id = ").push_bind(product_id);

    query_builder
        .build()
        .execute(&db_pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update product",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Product updated successfully",
        (),
    ))
}

/// Deletes a product. Owner only. Reviews cascade.
#[utoipa::path(
    delete,
    path = "/products/{product_id}",
    tag = "Products",
    params(
        ("product_id" = i32, Path, description = "ID of the product to be deleted"),
    ),
    responses(
        (status = 204, description = "Product successfully deleted"),
        (status = 403, description = "Not the product owner"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn delete_product(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Extension(ownership_cache): Extension<OwnershipCache>,
    AxumPath(product_id): AxumPath<i32>,
) -> Result<StatusCode, ApiResponse<()>> {
    let owner_id = product_owner(&db_pool, product_id).await?;
    let ctx = AuthzContext::from_claims(&claims, Some(owner_id))?;
    authorize(AuthzAction::DeleteProduct, &ctx)?;

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(&db_pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete product",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

    invalidate_ownership(&ownership_cache, owner_id);

    Ok(StatusCode::NO_CONTENT)
}

/// Average rating and approved-review count for one product.
///
/// Only visible reviews count; average is rounded to 2 decimal places and is
/// 0 when the product has no visible reviews.
#[utoipa::path(
    get,
    path = "/products/{product_id}/ratings",
    tag = "Products",
    params(
        ("product_id" = i32, Path, description = "ID of the product"),
    ),
    responses(
        (status = 200, description = "Rating summary retrieved", body = ProductRatingSummary),
        (status = 404, description = "Product not found"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn product_ratings(
    State(db_pool): State<PgPool>,
    AxumPath(product_id): AxumPath<i32>,
) -> Result<ApiResponse<ProductRatingSummary>, ApiResponse<()>> {
    // 404 before aggregating over nothing
    product_owner(&db_pool, product_id).await?;

    let ratings: Vec<i32> = sqlx::query_scalar(
        "SELECT rating FROM reviews WHERE product_id = $1 AND is_visible = TRUE",
    )
    .bind(product_id)
    .fetch_all(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to aggregate ratings",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    let approved_reviews = ratings.len() as i64;
    let average_rating = if ratings.is_empty() {
        0.0
    } else {
        round2(ratings.iter().map(|r| *r as f64).sum::<f64>() / approved_reviews as f64)
    };

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Rating summary retrieved successfully",
        ProductRatingSummary {
            average_rating,
            approved_reviews,
        },
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_product,
        get_products,
        get_product,
        update_product,
        delete_product,
        product_ratings
    ),
    components(
        schemas(Product, NewProduct, UpdateProduct, ProductRatingSummary, ProductIdResponse)
    ),
    tags(
        (name = "Products", description = "Product Management Endpoints")
    )
)]
pub struct ProductDoc;
