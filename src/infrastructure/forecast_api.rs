// Forecast backend data source over HTTP
use crate::application::clock::Clock;
use crate::application::data_source::DashboardDataSource;
use crate::domain::forecast::{round_tenth, DemandPoint, HolidayEntry, WeatherSnapshot};
use crate::infrastructure::config::ForecastApiSettings;
use crate::infrastructure::locale::{from_local_naive, to_local};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
// One cycle asks for weather and holidays at the same moment; both read the same rows.
const ROWS_REUSE_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ForecastApiError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("{endpoint} returned no rows")]
    Empty { endpoint: &'static str },
    #[error("invalid timestamp {0:?}")]
    Timestamp(String),
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    forecast: Vec<ForecastRow>,
}

#[derive(Debug, Deserialize)]
struct ForecastRow {
    datetime: String,
    #[serde(rename = "F1")]
    demand: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherHolidaysResponse {
    weather_holidays: Vec<WeatherHolidayRow>,
}

#[derive(Debug, Deserialize)]
struct WeatherHolidayRow {
    datetime: String,
    temperature: f64,
    humidity: f64,
    wind_speed: f64,
    cloud_cover: f64,
    #[serde(default)]
    is_holiday: u8,
}

/// `/weather_holidays` rows kept for the refresh cycle that fetched them.
struct CachedRows {
    fetched_at: DateTime<Utc>,
    rows: Arc<Vec<WeatherHolidayRow>>,
}

impl CachedRows {
    fn fresh_at(&self, now: DateTime<Utc>) -> Option<Arc<Vec<WeatherHolidayRow>>> {
        let age = (now - self.fetched_at).num_seconds();
        (0..ROWS_REUSE_SECS).contains(&age).then(|| self.rows.clone())
    }
}

pub struct ForecastApiSource {
    client: reqwest::Client,
    settings: ForecastApiSettings,
    clock: Arc<dyn Clock>,
    weather_cache: Mutex<Option<CachedRows>>,
}

impl ForecastApiSource {
    pub fn new(settings: ForecastApiSettings, clock: Arc<dyn Clock>) -> Result<Self, ForecastApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ForecastApiError::Client)?;
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            settings: ForecastApiSettings {
                base_url,
                ..settings
            },
            clock,
            weather_cache: Mutex::new(None),
        })
    }

    /// Local wall-clock reference the backend expects (`YYYY-MM-DDTHH:MM:SS`).
    fn base_datetime(&self) -> String {
        to_local(self.clock.now())
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string()
    }

    fn forecast_url(&self) -> String {
        let s = &self.settings;
        format!(
            "{}/forecast_24h?F2={}&F3={}&temperature={}&humidity={}&wind_speed={}&cloud_cover={}&is_holiday={}&base_datetime={}",
            s.base_url,
            s.f2,
            s.f3,
            s.temperature,
            s.humidity,
            s.wind_speed,
            s.cloud_cover,
            s.is_holiday,
            urlencoding::encode(&self.base_datetime())
        )
    }

    fn weather_holidays_url(&self) -> String {
        format!(
            "{}/weather_holidays?base_datetime={}",
            self.settings.base_url,
            urlencoding::encode(&self.base_datetime())
        )
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
    ) -> Result<T, ForecastApiError> {
        tracing::debug!("Requesting {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| ForecastApiError::Transport { endpoint, source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ForecastApiError::Status {
                endpoint,
                status,
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| ForecastApiError::Transport { endpoint, source })
    }

    /// Weather and holidays come from the same endpoint. The lock is held
    /// across the request so a concurrent caller waits and reuses the rows.
    async fn weather_rows(&self) -> Result<Arc<Vec<WeatherHolidayRow>>, ForecastApiError> {
        let mut cached = self.weather_cache.lock().await;
        let now = self.clock.now();
        if let Some(rows) = cached.as_ref().and_then(|c| c.fresh_at(now)) {
            tracing::debug!("Reusing weather_holidays rows");
            return Ok(rows);
        }

        let response: WeatherHolidaysResponse = self
            .fetch("weather_holidays", &self.weather_holidays_url())
            .await?;
        let rows = Arc::new(response.weather_holidays);
        *cached = Some(CachedRows {
            fetched_at: now,
            rows: rows.clone(),
        });
        Ok(rows)
    }
}

/// Accepts RFC 3339 or a naive local timestamp as produced by the backend.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ForecastApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    value
        .parse::<NaiveDateTime>()
        .ok()
        .and_then(from_local_naive)
        .ok_or_else(|| ForecastApiError::Timestamp(value.to_string()))
}

fn forecast_points(rows: Vec<ForecastRow>) -> Result<Vec<DemandPoint>, ForecastApiError> {
    if rows.is_empty() {
        return Err(ForecastApiError::Empty {
            endpoint: "forecast_24h",
        });
    }
    let mut points = rows
        .into_iter()
        .map(|row| -> Result<DemandPoint, ForecastApiError> {
            Ok(DemandPoint::new(parse_timestamp(&row.datetime)?, round_tenth(row.demand)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

fn weather_snapshot(rows: &[WeatherHolidayRow]) -> Result<WeatherSnapshot, ForecastApiError> {
    let first = rows.first().ok_or(ForecastApiError::Empty {
        endpoint: "weather_holidays",
    })?;
    Ok(WeatherSnapshot {
        temperature_c: first.temperature,
        humidity_pct: first.humidity,
        cloud_cover_pct: first.cloud_cover,
        wind_speed_kmh: first.wind_speed,
    })
}

fn holiday_entries(rows: &[WeatherHolidayRow]) -> Result<Vec<HolidayEntry>, ForecastApiError> {
    let mut dates = BTreeSet::new();
    for row in rows.iter().filter(|r| r.is_holiday == 1) {
        dates.insert(to_local(parse_timestamp(&row.datetime)?).date_naive());
    }
    Ok(dates
        .into_iter()
        .map(|date| HolidayEntry::new(date, "Local Holiday", "Local"))
        .collect())
}

#[async_trait]
impl DashboardDataSource for ForecastApiSource {
    async fn get_forecast(&self) -> Result<Vec<DemandPoint>> {
        let response: ForecastResponse = self.fetch("forecast_24h", &self.forecast_url()).await?;
        Ok(forecast_points(response.forecast)?)
    }

    async fn get_weather(&self) -> Result<WeatherSnapshot> {
        let rows = self.weather_rows().await?;
        Ok(weather_snapshot(&rows)?)
    }

    async fn get_holidays(&self) -> Result<Vec<HolidayEntry>> {
        let rows = self.weather_rows().await?;
        Ok(holiday_entries(&rows)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn settings() -> ForecastApiSettings {
        ForecastApiSettings {
            base_url: "http://localhost:8000/".to_string(),
            f2: 120.0,
            f3: 95.5,
            temperature: 32.5,
            humidity: 68.0,
            wind_speed: 12.3,
            cloud_cover: 45.0,
            is_holiday: 0,
        }
    }

    fn source() -> ForecastApiSource {
        let now = Utc.with_ymd_and_hms(2025, 7, 15, 4, 30, 0).unwrap();
        ForecastApiSource::new(settings(), Arc::new(FixedClock(now))).unwrap()
    }

    fn rows() -> Vec<WeatherHolidayRow> {
        let payload = r#"{"weather_holidays":[
            {"datetime":"2025-10-01T23:50:00","temperature":30.1,"humidity":70,"wind_speed":8.5,"cloud_cover":20,"is_holiday":0},
            {"datetime":"2025-10-02T00:00:00","temperature":29.8,"humidity":71,"wind_speed":8.0,"cloud_cover":25,"is_holiday":1},
            {"datetime":"2025-10-02T00:10:00","temperature":29.5,"humidity":72,"wind_speed":7.9,"cloud_cover":25,"is_holiday":1}
        ]}"#;
        let response: WeatherHolidaysResponse = serde_json::from_str(payload).unwrap();
        response.weather_holidays
    }

    #[test]
    fn test_forecast_url() {
        assert_eq!(
            source().forecast_url(),
            "http://localhost:8000/forecast_24h?F2=120&F3=95.5&temperature=32.5&humidity=68&wind_speed=12.3&cloud_cover=45&is_holiday=0&base_datetime=2025-07-15T10%3A00%3A00"
        );
    }

    #[test]
    fn test_weather_holidays_url() {
        assert_eq!(
            source().weather_holidays_url(),
            "http://localhost:8000/weather_holidays?base_datetime=2025-07-15T10%3A00%3A00"
        );
    }

    #[test]
    fn test_parse_forecast_payload() {
        let payload = r#"{"forecast":[
            {"datetime":"2025-07-15T10:10:00","F1":151.27},
            {"datetime":"2025-07-15T10:00:00.123456","F1":149.94}
        ]}"#;
        let response: ForecastResponse = serde_json::from_str(payload).unwrap();
        let points = forecast_points(response.forecast).unwrap();

        assert_eq!(points.len(), 2);
        assert!(points[0].timestamp < points[1].timestamp);
        assert_eq!(points[0].demand_mw, 149.9);
        assert_eq!(
            points[1].timestamp,
            Utc.with_ymd_and_hms(2025, 7, 15, 4, 40, 0).unwrap()
        );
    }

    #[test]
    fn test_empty_forecast_is_error() {
        assert!(matches!(
            forecast_points(Vec::new()),
            Err(ForecastApiError::Empty { .. })
        ));
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let rows = vec![ForecastRow {
            datetime: "yesterday".to_string(),
            demand: 1.0,
        }];
        assert!(matches!(
            forecast_points(rows),
            Err(ForecastApiError::Timestamp(_))
        ));
    }

    #[test]
    fn test_weather_and_holiday_rows() {
        let rows = rows();

        let weather = weather_snapshot(&rows).unwrap();
        assert_eq!(weather.temperature_c, 30.1);
        assert_eq!(weather.cloud_cover_pct, 20.0);

        let holidays = holiday_entries(&rows).unwrap();
        assert_eq!(holidays.len(), 1);
        assert_eq!(holidays[0].date, NaiveDate::from_ymd_opt(2025, 10, 2).unwrap());
        assert_eq!(holidays[0].category, "Local");
    }

    #[test]
    fn test_empty_weather_is_error() {
        assert!(weather_snapshot(&[]).is_err());
    }

    #[tokio::test]
    async fn test_weather_and_holidays_share_one_fetch() {
        // Nothing listens on the discard port, so any real request would fail
        let mut settings = settings();
        settings.base_url = "http://127.0.0.1:9".to_string();
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 18, 30, 0).unwrap();
        let source = ForecastApiSource::new(settings, Arc::new(FixedClock(now))).unwrap();
        *source.weather_cache.lock().await = Some(CachedRows {
            fetched_at: now,
            rows: Arc::new(rows()),
        });

        let weather = source.get_weather().await.unwrap();
        let holidays = source.get_holidays().await.unwrap();
        assert_eq!(weather.temperature_c, 30.1);
        assert_eq!(holidays.len(), 1);
    }

    #[test]
    fn test_cached_rows_expire() {
        let fetched_at = Utc.with_ymd_and_hms(2025, 10, 1, 18, 30, 0).unwrap();
        let cached = CachedRows {
            fetched_at,
            rows: Arc::new(rows()),
        };
        assert!(cached.fresh_at(fetched_at).is_some());
        assert!(cached.fresh_at(fetched_at + chrono::Duration::seconds(59)).is_some());
        assert!(cached.fresh_at(fetched_at + chrono::Duration::seconds(60)).is_none());
        assert!(cached.fresh_at(fetched_at - chrono::Duration::seconds(1)).is_none());
    }
}
