use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct Review {
    pub id: i32,
    pub product_id: i32,
    pub author_id: i32,
    pub rating: i32, // 1-5 stars
    pub body: String,
    pub is_visible: bool,
    pub created_at: NaiveDateTime,
}

impl Review {
    /// Lower-cased substring match against the configured banned list. Not
    /// tokenized: "preoffensive" matches "offensive".
    pub fn contains_bad_words(&self, banned_words: &[String]) -> bool {
        let text = self.body.to_lowercase();
        banned_words.iter().any(|word| text.contains(word.as_str()))
    }

    pub fn is_low_rated(&self) -> bool {
        self.rating <= 2
    }
}

/// ✅ **New Review Request (Frontend Sends This)**
#[derive(Deserialize, Debug, ToSchema)]
pub struct NewReview {
    pub rating: i32,
    pub body: String,
}

/// ✅ **Update Review Request (author only)**
#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateReview {
    pub rating: Option<i32>,
    pub body: Option<String>,
}

impl UpdateReview {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.body.is_none()
    }
}

#[derive(Deserialize, Debug, Default, PartialEq, Clone, Copy, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewOrder {
    #[default]
    Created,
    Engagement,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct ReviewListParams {
    /// Exact star-rating filter
    pub rating: Option<i32>,
    /// `created` (default) or `engagement`
    pub order: Option<ReviewOrder>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn review_with_body(body: &str) -> Review {
        Review {
            id: 1,
            product_id: 1,
            author_id: 1,
            rating: 3,
            body: body.to_string(),
            is_visible: true,
            created_at: NaiveDateTime::default(),
        }
    }

    fn banned() -> Vec<String> {
        vec!["badword1".to_string(), "offensive".to_string()]
    }

    #[test]
    fn detects_banned_substring_case_insensitively() {
        let review = review_with_body("This product is OFFENSIVE junk");
        assert!(review.contains_bad_words(&banned()));
    }

    #[test]
    fn substring_match_is_not_tokenized() {
        let review = review_with_body("utterly preoffensive packaging");
        assert!(review.contains_bad_words(&banned()));
    }

    #[test]
    fn clean_text_passes() {
        let review = review_with_body("Great product, highly recommended.");
        assert!(!review.contains_bad_words(&banned()));
    }

    #[test]
    fn low_rated_covers_one_and_two_stars() {
        let mut review = review_with_body("meh");
        review.rating = 2;
        assert!(review.is_low_rated());
        review.rating = 3;
        assert!(!review.is_low_rated());
    }
}
