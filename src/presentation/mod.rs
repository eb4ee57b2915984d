// Presentation layer - HTTP handlers, views and payloads
pub mod app_state;
pub mod handlers;
pub mod payload;
pub mod view;
