use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct RatingTrend {
    pub average_rating: f64,
    pub total_reviews: i64,
    pub trend_days: i64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct TopReviewer {
    pub username: String,
    pub review_count: i64,
}

#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct TopRatedProduct {
    pub id: i32,
    pub name: String,
    pub average_rating: f64,
    pub review_count: i64,
}

/// One export row: the product with its visible-review aggregates.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct ProductSnapshot {
    pub id: i32,
    pub name: String,
    pub average_rating: f64,
    pub review_count: i64,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct TrendParams {
    /// Trailing window in days, default 30
    pub days: Option<i64>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

#[derive(Deserialize, Debug, IntoParams)]
pub struct KeywordParams {
    pub keyword: Option<String>,
}
