use crate::db::queries::interaction::{
    create_interaction, delete_interaction, get_interactions, interaction_stats,
    update_interaction,
};
use axum::{
    routing::{get, patch},
    Router,
};
use sqlx::PgPool;

pub fn interaction_routes() -> Router<PgPool> {
    Router::new()
        .route(
            "/review-interactions",
            get(get_interactions).post(create_interaction),
        )
        .route(
            "/review-interactions/{id}",
            patch(update_interaction).delete(delete_interaction),
        )
        .route(
            "/review-interactions/review/{review_id}/stats",
            get(interaction_stats),
        )
}
