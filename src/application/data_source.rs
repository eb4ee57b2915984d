// Data source trait - acquisition boundary for forecast, weather and holidays
use crate::domain::forecast::{DemandPoint, HolidayEntry, WeatherSnapshot};
use async_trait::async_trait;

/// Anything able to supply the three dashboard slices.
///
/// Each acquisition may fail on its own; callers must tolerate partial failure.
#[async_trait]
pub trait DashboardDataSource: Send + Sync {
    /// 24-hour demand forecast in chronological order
    async fn get_forecast(&self) -> anyhow::Result<Vec<DemandPoint>>;

    async fn get_weather(&self) -> anyhow::Result<WeatherSnapshot>;

    async fn get_holidays(&self) -> anyhow::Result<Vec<HolidayEntry>>;
}
