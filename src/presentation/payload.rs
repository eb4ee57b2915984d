// JSON payloads for the dashboard API
use crate::application::dashboard_controller::DashboardSnapshot;
use crate::domain::dashboard::DashboardPhase;
use crate::domain::forecast::{DemandPoint, WeatherSnapshot};
use crate::infrastructure::locale::{format_date, format_date_time, format_time_of_day};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatsPayload {
    pub current: String,
    pub peak: String,
    pub average: String,
    pub status: &'static str,
    pub status_color: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ForecastPointPayload {
    pub time: String,
    #[serde(flatten)]
    pub point: DemandPoint,
}

#[derive(Debug, Serialize)]
pub struct HolidayPayload {
    pub date: String,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardPayload {
    pub phase: DashboardPhase,
    pub loading: bool,
    pub last_updated: Option<String>,
    pub stats: StatsPayload,
    pub forecast: Vec<ForecastPointPayload>,
    pub weather: Option<WeatherSnapshot>,
    pub holidays: Vec<HolidayPayload>,
}

impl DashboardPayload {
    pub fn from_snapshot(snapshot: &DashboardSnapshot) -> Self {
        let state = &snapshot.state;
        let stats = state.stats();

        Self {
            phase: state.phase,
            loading: state.loading,
            last_updated: state.last_updated.map(format_date_time),
            stats: StatsPayload {
                current: stats.display_current(),
                peak: stats.display_peak(),
                average: stats.display_average(),
                status: stats.status.label(),
                status_color: stats.status.color(),
            },
            forecast: state
                .forecast
                .iter()
                .map(|p| ForecastPointPayload {
                    time: format_time_of_day(p.timestamp),
                    point: p.clone(),
                })
                .collect(),
            weather: state.weather.clone(),
            holidays: state
                .holidays
                .iter()
                .map(|h| HolidayPayload {
                    date: format_date(h.date),
                    name: h.name.clone(),
                    category: h.category.clone(),
                })
                .collect(),
        }
    }
}
