use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// One like/helpful vote on a review. At most one row per (review, user).
#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct ReviewInteraction {
    pub id: i32,
    pub review_id: i32,
    pub user_id: i32,
    pub liked: bool,
    pub is_helpful: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct NewInteraction {
    pub review_id: i32,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub is_helpful: bool,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateInteraction {
    pub liked: Option<bool>,
    pub is_helpful: Option<bool>,
}

impl UpdateInteraction {
    pub fn is_empty(&self) -> bool {
        self.liked.is_none() && self.is_helpful.is_none()
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct InteractionStats {
    pub likes_count: i64,
    pub helpful_count: i64,
    pub total_interactions: i64,
}

/// Review enriched with its engagement counts, as returned by the
/// top-review endpoint.
#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct TopReview {
    pub id: i32,
    pub product_id: i32,
    pub author_id: i32,
    pub rating: i32,
    pub body: String,
    pub likes_count: i64,
    pub helpful_count: i64,
    pub total_interactions: i64,
}
