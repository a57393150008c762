use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, FromRow, Debug, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: Option<f64>,
    pub owner_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

impl UpdateProduct {
    /// Checks if all fields are `None`, indicating no updates were provided.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price.is_none()
    }
}

#[derive(Serialize, Deserialize, Debug, IntoParams)]
pub struct ProductFilterParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub owner_id: Option<i32>,
    pub name: Option<String>,
}

/// Average visible rating and approved-review count for one product.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ProductRatingSummary {
    pub average_rating: f64,
    pub approved_reviews: i64,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ProductIdResponse {
    pub id: i32,
}
