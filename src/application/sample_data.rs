// Sample data generator - synthetic demand, weather and holiday data
use crate::domain::forecast::{round_tenth, DemandPoint, HolidayEntry, WeatherSnapshot};
use crate::infrastructure::locale::to_local;
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use rand::Rng;

pub const FORECAST_POINTS: usize = 96;
pub const FORECAST_STEP_MINUTES: i64 = 15;

const SWING_AMPLITUDE_MW: f64 = 20.0;
const SWING_FREQUENCY: f64 = 0.1;
const NOISE_CEILING_MW: f64 = 10.0;

/// Baseline load for a local hour of day.
pub fn baseline_for_hour(hour: u32) -> f64 {
    match hour {
        6..=9 => 180.0,
        18..=21 => 200.0,
        22..=23 | 0..=5 => 80.0,
        _ => 100.0,
    }
}

/// Demand before rounding for sample `index` on a given baseline.
pub fn shaped_demand(baseline: f64, index: usize, noise: f64) -> f64 {
    baseline + (index as f64 * SWING_FREQUENCY).sin() * SWING_AMPLITUDE_MW + noise
}

#[derive(Debug)]
pub struct SampleDataGenerator<R: Rng> {
    rng: R,
}

impl<R: Rng> SampleDataGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// 24 hours of 15-minute samples starting at `reference`.
    pub fn forecast(&mut self, reference: DateTime<Utc>) -> Vec<DemandPoint> {
        (0..FORECAST_POINTS)
            .map(|i| {
                let timestamp = reference + Duration::minutes(FORECAST_STEP_MINUTES * i as i64);
                let baseline = baseline_for_hour(to_local(timestamp).hour());
                let noise = self.rng.gen_range(0.0..NOISE_CEILING_MW);
                DemandPoint::new(timestamp, round_tenth(shaped_demand(baseline, i, noise)))
            })
            .collect()
    }

    pub fn weather(&self) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_c: 32.5,
            humidity_pct: 68.0,
            cloud_cover_pct: 45.0,
            wind_speed_kmh: 12.3,
        }
    }

    pub fn holidays(&self) -> Vec<HolidayEntry> {
        [
            ((2025, 7, 15), "Local Industrial Holiday", "Industrial"),
            ((2025, 7, 20), "Regional Festival", "Festival"),
            ((2025, 7, 25), "Municipal Day", "Local"),
        ]
        .into_iter()
        .filter_map(|((y, m, d), name, category)| {
            NaiveDate::from_ymd_opt(y, m, d).map(|date| HolidayEntry::new(date, name, category))
        })
        .collect()
    }
}
