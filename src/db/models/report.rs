use crate::db::models::review::Review;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

pub mod report_status {
    pub const PENDING: &str = "pending";
    pub const REJECTED: &str = "rejected";
}

/// Append-only audit row created by reject/flag moderation actions.
#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct AdminReport {
    pub id: i32,
    pub review_id: i32,
    pub status: String, // "pending" or "rejected"
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
    Flag,
}

impl ModerationAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            "flag" => Some(Self::Flag),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Flag => "flag",
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    Unapproved,
    LowRated,
    Offensive,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct ReportFilterParams {
    pub product_id: Option<i32>,
    pub rating: Option<i32>,
    pub created_after: Option<NaiveDateTime>,
    pub created_before: Option<NaiveDateTime>,
    pub category: Option<ReportCategory>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ReportSummary {
    pub total_reviews: i64,
    pub unapproved_reviews: i64,
    pub low_rated_reviews: i64,
    pub offensive_reviews: i64,
    pub approved_reviews: i64,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct AdminReportsResponse {
    pub summary: ReportSummary,
    pub filtered_reviews: Vec<Review>,
    /// Latest audit rows from reject/flag decisions on the scoped products.
    pub recent_reports: Vec<AdminReport>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct DashboardOverview {
    pub total_products: i64,
    pub total_reviews: i64,
    pub approved_reviews: i64,
    pub pending_reviews: i64,
}

#[derive(Serialize, Deserialize, Debug, Default, ToSchema)]
pub struct RatingDistribution {
    #[serde(rename = "1_stars")]
    pub one_stars: i64,
    #[serde(rename = "2_stars")]
    pub two_stars: i64,
    #[serde(rename = "3_stars")]
    pub three_stars: i64,
    #[serde(rename = "4_stars")]
    pub four_stars: i64,
    #[serde(rename = "5_stars")]
    pub five_stars: i64,
}

impl RatingDistribution {
    pub fn add(&mut self, rating: i32) {
        match rating {
            1 => self.one_stars += 1,
            2 => self.two_stars += 1,
            3 => self.three_stars += 1,
            4 => self.four_stars += 1,
            5 => self.five_stars += 1,
            _ => {}
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct DashboardAlerts {
    pub unapproved_count: i64,
    pub low_rated_count: i64,
    pub offensive_count: i64,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct DashboardResponse {
    pub overview: DashboardOverview,
    pub rating_distribution: RatingDistribution,
    pub alerts: DashboardAlerts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_action_round_trips() {
        for name in ["approve", "reject", "flag"] {
            assert_eq!(ModerationAction::parse(name).unwrap().as_str(), name);
        }
        assert!(ModerationAction::parse("promote").is_none());
    }

    #[test]
    fn rating_distribution_ignores_out_of_range() {
        let mut dist = RatingDistribution::default();
        dist.add(1);
        dist.add(5);
        dist.add(9);
        assert_eq!(dist.one_stars, 1);
        assert_eq!(dist.five_stars, 1);
        assert_eq!(dist.two_stars + dist.three_stars + dist.four_stars, 0);
    }
}
