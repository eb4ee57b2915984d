// Dashboard session - Long-lived refresh loop driven by a timer and manual requests
use crate::application::dashboard_controller::{DashboardController, DashboardSnapshot};
use crate::domain::dashboard::{DashboardState, RefreshTrigger};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const AUTO_REFRESH_PERIOD: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("dashboard session has ended")]
    Closed,
}

enum SessionCommand {
    Refresh {
        done: oneshot::Sender<Option<DateTime<Utc>>>,
    },
}

/// Cloneable access to a running session for request handlers.
#[derive(Clone)]
pub struct DashboardHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<Arc<DashboardSnapshot>>,
}

impl DashboardHandle {
    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Request a manual refresh and wait for the cycle to finish.
    pub async fn refresh(&self) -> Result<Option<DateTime<Utc>>, SessionError> {
        let (done, finished) = oneshot::channel();
        self.commands
            .send(SessionCommand::Refresh { done })
            .await
            .map_err(|_| SessionError::Closed)?;
        finished.await.map_err(|_| SessionError::Closed)
    }

    /// Wait until at least `count` refresh cycles have completed.
    pub async fn wait_for_refreshes(&self, count: u64) -> Result<Arc<DashboardSnapshot>, SessionError> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|s| s.state.refresh_count >= count)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }
}

/// Owns the refresh task. Dropping the session cancels the timer.
pub struct DashboardSession {
    handle: DashboardHandle,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl DashboardSession {
    pub fn start(controller: DashboardController) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (snapshot_tx, snapshot_rx) =
            watch::channel(Arc::new(DashboardSnapshot::from_state(DashboardState::new())));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_session(
            controller,
            AUTO_REFRESH_PERIOD,
            command_rx,
            snapshot_tx,
            cancel.clone(),
        ));

        Self {
            handle: DashboardHandle {
                commands: command_tx,
                snapshots: snapshot_rx,
            },
            cancel,
            task: Some(task),
        }
    }

    pub fn handle(&self) -> DashboardHandle {
        self.handle.clone()
    }

    /// Stop the timer and wait for the refresh task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Dashboard session task failed: {}", e);
            }
        }
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_cycle(
    controller: &mut DashboardController,
    state: DashboardState,
    trigger: RefreshTrigger,
    snapshots: &watch::Sender<Arc<DashboardSnapshot>>,
) -> DashboardState {
    let state = controller
        .refresh_cycle(state, trigger, |loading| {
            snapshots.send_replace(Arc::new(loading));
        })
        .await;
    snapshots.send_replace(Arc::new(controller.snapshot(&state)));
    state
}

async fn run_session(
    mut controller: DashboardController,
    period: Duration,
    mut commands: mpsc::Receiver<SessionCommand>,
    snapshots: watch::Sender<Arc<DashboardSnapshot>>,
    cancel: CancellationToken,
) {
    let mut state = run_cycle(
        &mut controller,
        DashboardState::new(),
        RefreshTrigger::Initial,
        &snapshots,
    )
    .await;

    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tracing::debug!("Auto-refresh timer fired");
                state = run_cycle(&mut controller, state, RefreshTrigger::Timer, &snapshots).await;
            }
            command = commands.recv() => match command {
                Some(SessionCommand::Refresh { done }) => {
                    state = run_cycle(&mut controller, state, RefreshTrigger::Manual, &snapshots).await;
                    let _ = done.send(state.last_updated);
                }
                None => break,
            },
        }
    }

    controller.teardown();
    tracing::info!("Dashboard session stopped after {} refreshes", state.refresh_count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::chart_renderer::ChartRenderer;
    use crate::application::clock::{Clock, SystemClock};
    use crate::application::dashboard_controller::tests::{
        NoHolidaySource, StalledHolidaySource, SteppingClock,
    };
    use crate::application::data_source::DashboardDataSource;
    use crate::domain::dashboard::DashboardPhase;
    use crate::domain::forecast::{DemandPoint, HolidayEntry, WeatherSnapshot};
    use crate::infrastructure::mock_source::MockDataSource;
    use crate::infrastructure::svg_canvas::SvgCanvas;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        inner: MockDataSource,
        forecasts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DashboardDataSource for CountingSource {
        async fn get_forecast(&self) -> anyhow::Result<Vec<DemandPoint>> {
            self.forecasts.fetch_add(1, Ordering::SeqCst);
            self.inner.get_forecast().await
        }

        async fn get_weather(&self) -> anyhow::Result<WeatherSnapshot> {
            self.inner.get_weather().await
        }

        async fn get_holidays(&self) -> anyhow::Result<Vec<HolidayEntry>> {
            self.inner.get_holidays().await
        }
    }

    fn counting_controller() -> (DashboardController, Arc<AtomicUsize>) {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let forecasts = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            inner: MockDataSource::seeded(9, clock.clone()),
            forecasts: forecasts.clone(),
        };
        let mut controller = DashboardController::new(Arc::new(source), ChartRenderer::default(), clock);
        controller.attach_surface(SvgCanvas::new("forecastChart", 900, 360));
        (controller, forecasts)
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_load_then_timer_refresh() {
        let (controller, forecasts) = counting_controller();
        let session = DashboardSession::start(controller);
        let handle = session.handle();

        let snapshot = handle.wait_for_refreshes(1).await.unwrap();
        assert_eq!(snapshot.state.phase, DashboardPhase::Ready);
        assert_eq!(snapshot.state.last_trigger, Some(RefreshTrigger::Initial));
        assert!(snapshot.chart_svg.is_some());
        assert_eq!(forecasts.load(Ordering::SeqCst), 1);

        tokio::time::sleep(AUTO_REFRESH_PERIOD - Duration::from_secs(1)).await;
        assert_eq!(handle.snapshot().state.refresh_count, 1);

        let snapshot = handle.wait_for_refreshes(2).await.unwrap();
        assert_eq!(snapshot.state.last_trigger, Some(RefreshTrigger::Timer));
        assert_eq!(forecasts.load(Ordering::SeqCst), 2);

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh() {
        let clock = Arc::new(SteppingClock::new());
        let source = MockDataSource::seeded(2, clock.clone());
        let controller = DashboardController::new(Arc::new(source), ChartRenderer::default(), clock);
        let session = DashboardSession::start(controller);
        let handle = session.handle();

        let first = handle.wait_for_refreshes(1).await.unwrap();
        let previous = first.state.last_updated.unwrap();

        let updated = handle.refresh().await.unwrap().unwrap();
        assert!(updated >= previous);

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.state.refresh_count, 2);
        assert_eq!(snapshot.state.last_trigger, Some(RefreshTrigger::Manual));
        assert_eq!(snapshot.state.last_updated, Some(updated));

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_timer() {
        let (controller, forecasts) = counting_controller();
        let session = DashboardSession::start(controller);
        let handle = session.handle();
        handle.wait_for_refreshes(1).await.unwrap();

        session.shutdown().await;
        tokio::time::sleep(AUTO_REFRESH_PERIOD * 3).await;

        assert_eq!(forecasts.load(Ordering::SeqCst), 1);
        assert!(matches!(handle.refresh().await, Err(SessionError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (controller, forecasts) = counting_controller();
        let session = DashboardSession::start(controller);
        let handle = session.handle();
        handle.wait_for_refreshes(1).await.unwrap();

        drop(session);
        tokio::time::sleep(AUTO_REFRESH_PERIOD * 2).await;
        assert_eq!(forecasts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_session() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let source = NoHolidaySource(MockDataSource::seeded(4, clock.clone()));
        let controller = DashboardController::new(Arc::new(source), ChartRenderer::default(), clock);
        let session = DashboardSession::start(controller);

        let snapshot = session.handle().wait_for_refreshes(1).await.unwrap();
        assert_eq!(snapshot.state.phase, DashboardPhase::Ready);
        assert!(snapshot.state.holidays.is_empty());
        assert!(snapshot.state.weather.is_some());

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_source_does_not_block_session() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let source = StalledHolidaySource(MockDataSource::seeded(6, clock.clone()));
        let controller = DashboardController::new(Arc::new(source), ChartRenderer::default(), clock);
        let session = DashboardSession::start(controller);
        let handle = session.handle();

        let snapshot = handle.wait_for_refreshes(1).await.unwrap();
        assert_eq!(snapshot.state.phase, DashboardPhase::Ready);
        assert!(!snapshot.state.loading);
        assert_eq!(snapshot.state.forecast.len(), 96);

        // Manual refresh still gets through and completes
        let updated = handle.refresh().await.unwrap();
        assert!(updated.is_some());
        assert_eq!(handle.snapshot().state.refresh_count, 2);
        assert!(!handle.snapshot().state.loading);

        session.shutdown().await;
    }
}
