// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod forecast_api;
pub mod http_response;
pub mod locale;
pub mod mock_source;
pub mod svg_canvas;
