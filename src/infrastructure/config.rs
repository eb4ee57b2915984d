use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub data_source: DataSourceSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    #[default]
    Mock,
    Api,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DataSourceSettings {
    #[serde(default)]
    pub kind: DataSourceKind,
    /// Seed for the mock generator; entropy when absent
    pub seed: Option<u64>,
    pub api: Option<ForecastApiSettings>,
}

/// Forecast backend location and the model inputs it expects.
#[derive(Debug, Deserialize, Clone)]
pub struct ForecastApiSettings {
    pub base_url: String,
    pub f2: f64,
    pub f3: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub cloud_cover: f64,
    #[serde(default)]
    pub is_holiday: u8,
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn parse_dashboard_config(toml: &str) -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    Ok(settings.try_deserialize()?)
}
