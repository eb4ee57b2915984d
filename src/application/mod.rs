// Application layer - Use cases and orchestration
pub mod chart_renderer;
pub mod clock;
pub mod dashboard_controller;
pub mod dashboard_session;
pub mod data_source;
pub mod sample_data;
