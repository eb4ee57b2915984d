// Domain layer - Forecast data, statistics and dashboard state
pub mod dashboard;
pub mod forecast;
pub mod stats;
