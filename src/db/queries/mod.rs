pub mod analytics;
pub mod interaction;
pub mod moderation;
pub mod notification;
pub mod product;
pub mod review;
