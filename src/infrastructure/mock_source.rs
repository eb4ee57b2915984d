// Mock data source backed by the sample data generator
use crate::application::clock::Clock;
use crate::application::data_source::DashboardDataSource;
use crate::application::sample_data::SampleDataGenerator;
use crate::domain::forecast::{DemandPoint, HolidayEntry, WeatherSnapshot};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

pub struct MockDataSource {
    generator: Mutex<SampleDataGenerator<StdRng>>,
    clock: Arc<dyn Clock>,
}

impl MockDataSource {
    pub fn new(rng: StdRng, clock: Arc<dyn Clock>) -> Self {
        Self {
            generator: Mutex::new(SampleDataGenerator::new(rng)),
            clock,
        }
    }

    pub fn seeded(seed: u64, clock: Arc<dyn Clock>) -> Self {
        Self::new(StdRng::seed_from_u64(seed), clock)
    }

    pub fn from_entropy(clock: Arc<dyn Clock>) -> Self {
        Self::new(StdRng::from_entropy(), clock)
    }
}

#[async_trait]
impl DashboardDataSource for MockDataSource {
    async fn get_forecast(&self) -> Result<Vec<DemandPoint>> {
        let reference = self.clock.now();
        let mut generator = self
            .generator
            .lock()
            .map_err(|_| anyhow!("sample generator lock poisoned"))?;
        Ok(generator.forecast(reference))
    }

    async fn get_weather(&self) -> Result<WeatherSnapshot> {
        let generator = self
            .generator
            .lock()
            .map_err(|_| anyhow!("sample generator lock poisoned"))?;
        Ok(generator.weather())
    }

    async fn get_holidays(&self) -> Result<Vec<HolidayEntry>> {
        let generator = self
            .generator
            .lock()
            .map_err(|_| anyhow!("sample generator lock poisoned"))?;
        Ok(generator.holidays())
    }
}
