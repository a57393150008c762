pub mod api_response;
pub mod export;
pub mod notification;
