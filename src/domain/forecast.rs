// Forecast domain models: demand series, weather and holidays
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandPoint {
    pub timestamp: DateTime<Utc>,
    pub demand_mw: f64,
}

impl DemandPoint {
    pub fn new(timestamp: DateTime<Utc>, demand_mw: f64) -> Self {
        Self {
            timestamp,
            demand_mw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub cloud_cover_pct: f64,
    pub wind_speed_kmh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolidayEntry {
    pub date: NaiveDate,
    pub name: String,
    pub category: String,
}

impl HolidayEntry {
    pub fn new(date: NaiveDate, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
            category: category.into(),
        }
    }
}

/// Round to one decimal place, half away from zero.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_tenth() {
        assert_eq!(round_tenth(113.333), 113.3);
        assert_eq!(round_tenth(99.96), 100.0);
        assert_eq!(round_tenth(180.06), 180.1);
    }
}
