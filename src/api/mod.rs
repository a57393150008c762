pub mod analytics;
pub mod auth;
pub mod health;
pub mod interaction;
pub mod moderation;
pub mod notification;
pub mod product;
pub mod review;
