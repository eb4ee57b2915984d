// Dashboard controller - Refresh cycle over the data source, state and chart
use crate::application::chart_renderer::{ChartInstance, ChartRenderer};
use crate::application::clock::Clock;
use crate::application::data_source::DashboardDataSource;
use crate::domain::dashboard::{AcquisitionOutcome, DashboardState, RefreshTrigger};
use crate::infrastructure::svg_canvas::SvgCanvas;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on a single acquisition. A source that has not answered by then
/// counts as failed for this cycle.
pub const ACQUISITION_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable view of the dashboard published after every transition.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub state: DashboardState,
    pub chart: Option<ChartInstance>,
    pub chart_svg: Option<String>,
}

impl DashboardSnapshot {
    pub fn from_state(state: DashboardState) -> Self {
        Self {
            state,
            chart: None,
            chart_svg: None,
        }
    }
}

pub struct DashboardController {
    source: Arc<dyn DashboardDataSource>,
    renderer: ChartRenderer,
    surface: Option<SvgCanvas>,
    clock: Arc<dyn Clock>,
}

async fn settle<T>(
    slice: &str,
    acquisition: impl Future<Output = anyhow::Result<T>>,
) -> Option<T> {
    match tokio::time::timeout(ACQUISITION_TIMEOUT, acquisition).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!("Error loading {} data: {:#}", slice, e);
            None
        }
        Err(_) => {
            tracing::warn!(
                "Loading {} data timed out after {:?}",
                slice,
                ACQUISITION_TIMEOUT
            );
            None
        }
    }
}

impl DashboardController {
    pub fn new(
        source: Arc<dyn DashboardDataSource>,
        renderer: ChartRenderer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            renderer,
            surface: None,
            clock,
        }
    }

    pub fn attach_surface(&mut self, surface: SvgCanvas) {
        self.surface = Some(surface);
    }

    /// Run all three acquisitions concurrently, each bounded by
    /// [`ACQUISITION_TIMEOUT`]. Failures are logged and reported as `None`.
    pub async fn acquire(&self) -> AcquisitionOutcome {
        let (forecast, weather, holidays) = futures::join!(
            settle("forecast", self.source.get_forecast()),
            settle("weather", self.source.get_weather()),
            settle("holiday", self.source.get_holidays())
        );

        AcquisitionOutcome {
            forecast,
            weather,
            holidays,
        }
    }

    /// One full refresh: Loading → acquire → Ready, then redraw the chart.
    ///
    /// `on_loading` receives the snapshot taken after entering `Loading`, before
    /// any acquisition starts. The chart is only redrawn when a new forecast
    /// arrived.
    pub async fn refresh_cycle<F>(
        &mut self,
        state: DashboardState,
        trigger: RefreshTrigger,
        on_loading: F,
    ) -> DashboardState
    where
        F: FnOnce(DashboardSnapshot),
    {
        let loading = state.begin_refresh(trigger);
        on_loading(self.snapshot(&loading));

        let outcome = self.acquire().await;
        let forecast_arrived = outcome.forecast.is_some();
        let failed = outcome.failed_slices();
        let state = loading.complete_refresh(outcome, self.clock.now());

        if forecast_arrived {
            self.renderer.render(self.surface.as_mut(), &state.forecast);
        }

        if failed.is_empty() {
            tracing::info!(
                "Refresh #{} ({:?}) complete with {} forecast points",
                state.refresh_count,
                trigger,
                state.forecast.len()
            );
        } else {
            tracing::info!(
                "Refresh #{} ({:?}) complete, failed slices: {}",
                state.refresh_count,
                trigger,
                failed.join(", ")
            );
        }
        state
    }

    pub fn snapshot(&self, state: &DashboardState) -> DashboardSnapshot {
        let chart = self.renderer.active().cloned();
        let chart_svg = match (&chart, &self.surface) {
            (Some(_), Some(surface)) => surface.svg().map(str::to_string),
            _ => None,
        };
        DashboardSnapshot {
            state: state.clone(),
            chart,
            chart_svg,
        }
    }

    /// Release the chart and detach the surface.
    pub fn teardown(&mut self) {
        self.renderer.destroy(self.surface.as_mut());
        self.surface = None;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::dashboard::DashboardPhase;
    use crate::domain::forecast::{DemandPoint, HolidayEntry, WeatherSnapshot};
    use crate::infrastructure::mock_source::MockDataSource;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Mutex;

    /// Clock advancing one minute per reading.
    pub(crate) struct SteppingClock(Mutex<DateTime<Utc>>);

    impl SteppingClock {
        pub(crate) fn new() -> Self {
            Self(Mutex::new(Utc.with_ymd_and_hms(2025, 7, 15, 4, 0, 0).unwrap()))
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut now = self.0.lock().unwrap();
            let current = *now;
            *now = current + Duration::minutes(1);
            current
        }
    }

    /// Mock source whose holiday acquisition always fails.
    pub(crate) struct NoHolidaySource(pub(crate) MockDataSource);

    #[async_trait]
    impl DashboardDataSource for NoHolidaySource {
        async fn get_forecast(&self) -> Result<Vec<DemandPoint>> {
            self.0.get_forecast().await
        }

        async fn get_weather(&self) -> Result<WeatherSnapshot> {
            self.0.get_weather().await
        }

        async fn get_holidays(&self) -> Result<Vec<HolidayEntry>> {
            bail!("holiday service unavailable")
        }
    }

    fn controller(source: Arc<dyn DashboardDataSource>) -> DashboardController {
        let mut controller =
            DashboardController::new(source, ChartRenderer::default(), Arc::new(SteppingClock::new()));
        controller.attach_surface(SvgCanvas::new("forecastChart", 900, 360));
        controller
    }

    fn mock() -> MockDataSource {
        MockDataSource::seeded(5, Arc::new(SteppingClock::new()))
    }

    #[tokio::test]
    async fn test_initial_cycle_reaches_ready() {
        let mut controller = controller(Arc::new(mock()));
        let state = controller
            .refresh_cycle(DashboardState::new(), RefreshTrigger::Initial, |_| {})
            .await;

        assert_eq!(state.phase, DashboardPhase::Ready);
        assert!(!state.loading);
        assert_eq!(state.forecast.len(), 96);
        assert!(state.weather.is_some());
        assert_eq!(state.holidays.len(), 3);
        assert_eq!(state.last_trigger, Some(RefreshTrigger::Initial));

        let snapshot = controller.snapshot(&state);
        assert_eq!(snapshot.chart.as_ref().map(|c| c.len()), Some(96));
        assert!(snapshot.chart_svg.unwrap().contains("Power Demand (MW)"));
    }

    #[tokio::test]
    async fn test_partial_failure_still_ready() {
        let mut controller = controller(Arc::new(NoHolidaySource(mock())));
        let state = controller
            .refresh_cycle(DashboardState::new(), RefreshTrigger::Initial, |_| {})
            .await;

        assert_eq!(state.phase, DashboardPhase::Ready);
        assert!(!state.loading);
        assert!(state.holidays.is_empty());
        assert_eq!(state.forecast.len(), 96);
        assert_eq!(state.weather.as_ref().map(|w| w.temperature_c), Some(32.5));
    }

    #[tokio::test]
    async fn test_manual_refresh_advances_timestamp() {
        let mut controller = controller(Arc::new(mock()));
        let state = controller
            .refresh_cycle(DashboardState::new(), RefreshTrigger::Initial, |_| {})
            .await;
        let first = state.last_updated.unwrap();

        let state = controller
            .refresh_cycle(state, RefreshTrigger::Manual, |_| {})
            .await;
        assert!(state.last_updated.unwrap() >= first);
        assert_eq!(state.refresh_count, 2);
        assert_eq!(state.last_trigger, Some(RefreshTrigger::Manual));
    }

    #[tokio::test]
    async fn test_repeated_cycles_keep_one_chart() {
        let mut controller = controller(Arc::new(mock()));
        let mut state = DashboardState::new();
        for _ in 0..3 {
            state = controller
                .refresh_cycle(state, RefreshTrigger::Timer, |_| {})
                .await;
        }
        let surface = controller.surface.as_ref().unwrap();
        assert_eq!(surface.owner(), Some(3));
        assert_eq!(controller.renderer.active().map(|c| c.id), Some(3));
    }

    #[tokio::test]
    async fn test_missing_surface_skips_render() {
        let mut controller =
            DashboardController::new(Arc::new(mock()), ChartRenderer::default(), Arc::new(SteppingClock::new()));
        let state = controller
            .refresh_cycle(DashboardState::new(), RefreshTrigger::Initial, |_| {})
            .await;
        assert_eq!(state.phase, DashboardPhase::Ready);
        let snapshot = controller.snapshot(&state);
        assert!(snapshot.chart.is_none());
        assert!(snapshot.chart_svg.is_none());
    }

    #[tokio::test]
    async fn test_teardown_clears_chart() {
        let mut controller = controller(Arc::new(mock()));
        let state = controller
            .refresh_cycle(DashboardState::new(), RefreshTrigger::Initial, |_| {})
            .await;
        controller.teardown();
        assert!(controller.snapshot(&state).chart.is_none());
    }

    /// Mock source whose holiday acquisition never answers.
    pub(crate) struct StalledHolidaySource(pub(crate) MockDataSource);

    #[async_trait]
    impl DashboardDataSource for StalledHolidaySource {
        async fn get_forecast(&self) -> Result<Vec<DemandPoint>> {
            self.0.get_forecast().await
        }

        async fn get_weather(&self) -> Result<WeatherSnapshot> {
            self.0.get_weather().await
        }

        async fn get_holidays(&self) -> Result<Vec<HolidayEntry>> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_source_times_out() {
        let mut controller = controller(Arc::new(StalledHolidaySource(mock())));
        let started = tokio::time::Instant::now();
        let state = controller
            .refresh_cycle(DashboardState::new(), RefreshTrigger::Initial, |_| {})
            .await;

        assert!(started.elapsed() >= ACQUISITION_TIMEOUT);
        assert_eq!(state.phase, DashboardPhase::Ready);
        assert!(!state.loading);
        assert!(state.holidays.is_empty());
        assert_eq!(state.forecast.len(), 96);
        assert!(state.weather.is_some());
    }

    #[tokio::test]
    async fn test_loading_snapshot_precedes_acquisition() {
        let mut controller = controller(Arc::new(mock()));
        let mut seen = None;
        let state = controller
            .refresh_cycle(DashboardState::new(), RefreshTrigger::Manual, |loading| {
                seen = Some(loading)
            })
            .await;

        let loading = seen.unwrap();
        assert_eq!(loading.state.phase, DashboardPhase::Loading);
        assert!(loading.state.loading);
        assert_eq!(loading.state.refresh_count, 0);
        assert_eq!(loading.state.last_trigger, Some(RefreshTrigger::Manual));
        assert!(loading.chart.is_none());

        assert_eq!(state.phase, DashboardPhase::Ready);
        assert_eq!(state.refresh_count, 1);
        assert_eq!(state.last_trigger, Some(RefreshTrigger::Manual));
    }
}
