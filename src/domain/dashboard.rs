// Dashboard session state and its transitions
use super::forecast::{DemandPoint, HolidayEntry, WeatherSnapshot};
use super::stats::{derive_stats, DashboardStats};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DashboardPhase {
    Initializing,
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshTrigger {
    Initial,
    Timer,
    Manual,
}

/// Result of one acquisition round. `None` marks a slice whose acquisition failed.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionOutcome {
    pub forecast: Option<Vec<DemandPoint>>,
    pub weather: Option<WeatherSnapshot>,
    pub holidays: Option<Vec<HolidayEntry>>,
}

impl AcquisitionOutcome {
    pub fn failed_slices(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if self.forecast.is_none() {
            failed.push("forecast");
        }
        if self.weather.is_none() {
            failed.push("weather");
        }
        if self.holidays.is_none() {
            failed.push("holidays");
        }
        failed
    }
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub phase: DashboardPhase,
    pub forecast: Vec<DemandPoint>,
    pub weather: Option<WeatherSnapshot>,
    pub holidays: Vec<HolidayEntry>,
    pub loading: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub refresh_count: u64,
    pub last_trigger: Option<RefreshTrigger>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            phase: DashboardPhase::Initializing,
            forecast: Vec::new(),
            weather: None,
            holidays: Vec::new(),
            loading: true,
            last_updated: None,
            refresh_count: 0,
            last_trigger: None,
        }
    }

    /// Enter `Loading` and record what started the cycle. On a state that is
    /// already loading only the trigger changes.
    pub fn begin_refresh(mut self, trigger: RefreshTrigger) -> Self {
        self.phase = DashboardPhase::Loading;
        self.loading = true;
        self.last_trigger = Some(trigger);
        self
    }

    /// Apply an acquisition round and enter `Ready`.
    ///
    /// Failed slices keep their previous value. The last-updated timestamp never
    /// moves backwards.
    pub fn complete_refresh(mut self, outcome: AcquisitionOutcome, completed_at: DateTime<Utc>) -> Self {
        if let Some(forecast) = outcome.forecast {
            self.forecast = forecast;
        }
        if let Some(weather) = outcome.weather {
            self.weather = Some(weather);
        }
        if let Some(holidays) = outcome.holidays {
            self.holidays = holidays;
        }

        self.last_updated = Some(match self.last_updated {
            Some(previous) if previous > completed_at => previous,
            _ => completed_at,
        });
        self.phase = DashboardPhase::Ready;
        self.loading = false;
        self.refresh_count += 1;
        self
    }

    pub fn stats(&self) -> DashboardStats {
        derive_stats(&self.forecast)
    }
}
