use sqlx::{Postgres, Transaction};

/// Result type for notification operations
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in notification operations
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid recipient provided: {0}")]
    InvalidRecipient(String),
}

/// Insert a notification inside the caller's transaction. Used by moderation
/// actions so that the visibility change and the notification commit or roll
/// back together.
pub async fn notify_user_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipient_id: i32,
    message: &str,
) -> NotificationResult<i32> {
    if message.is_empty() {
        return Err(NotificationError::InvalidRecipient(
            "Notification message must not be empty".to_string(),
        ));
    }

    let id: i32 = sqlx::query_scalar(
        "INSERT INTO notifications (recipient_id, message) VALUES ($1, $2) RETURNING id",
    )
    .bind(recipient_id)
    .bind(message)
    .fetch_one(&mut **tx)
    .await?;

    Ok(id)
}

/// Message templates for moderation outcomes, kept in one place so wording
/// stays consistent between the moderation service and its tests.
pub mod messages {
    pub fn review_approved(product_name: &str) -> String {
        format!("Your review of '{}' has been approved", product_name)
    }

    pub fn review_rejected(product_name: &str) -> String {
        format!("Your review of '{}' has been rejected", product_name)
    }
}

#[cfg(test)]
mod tests {
    use super::messages;

    #[test]
    fn approval_message_names_the_product() {
        let msg = messages::review_approved("Walnut Desk");
        assert!(msg.contains("Walnut Desk"));
        assert!(msg.contains("approved"));
    }

    #[test]
    fn rejection_message_names_the_product() {
        let msg = messages::review_rejected("Walnut Desk");
        assert!(msg.contains("rejected"));
    }
}
