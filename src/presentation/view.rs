// Server-rendered dashboard page
use crate::application::chart_renderer::HoverTarget;
use crate::application::dashboard_controller::DashboardSnapshot;
use crate::domain::forecast::WeatherSnapshot;
use crate::infrastructure::locale::{format_date, format_date_time};
use askama::Template;

const TITLE: &str = "⚡ APU Power Demand Forecasting";
const SUBTITLE: &str = "Real-time electricity demand prediction for Dhanbad, Jharkhand";
const LOADING_RELOAD_SECS: u32 = 2;

#[derive(Template)]
#[template(path = "loading.html")]
struct LoadingTemplate {
    reload_secs: u32,
}

/// Rendered chart plus one hover column per sample.
struct ChartView<'a> {
    id: &'a str,
    svg: &'a str,
    width: f64,
    height: f64,
    plot_top: f64,
    plot_height: f64,
    targets: Vec<HoverTarget>,
}

struct HolidayRow<'a> {
    date: String,
    name: &'a str,
    category: &'a str,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    title: &'static str,
    subtitle: &'static str,
    current: String,
    peak: String,
    average: String,
    status_label: &'static str,
    status_color: Option<&'static str>,
    chart: Option<ChartView<'a>>,
    weather: Option<&'a WeatherSnapshot>,
    holidays: Vec<HolidayRow<'a>>,
    last_updated: Option<String>,
}

impl<'a> DashboardTemplate<'a> {
    fn from_snapshot(snapshot: &'a DashboardSnapshot) -> Self {
        let state = &snapshot.state;
        let stats = state.stats();
        let chart = snapshot
            .chart
            .as_ref()
            .zip(snapshot.chart_svg.as_deref())
            .map(|(chart, svg)| ChartView {
                id: &chart.surface_id,
                svg,
                width: chart.surface_width,
                height: chart.surface_height,
                plot_top: chart.plot.top,
                plot_height: chart.plot.height,
                targets: chart.hover_targets(),
            });

        Self {
            title: TITLE,
            subtitle: SUBTITLE,
            current: stats.display_current(),
            peak: stats.display_peak(),
            average: stats.display_average(),
            status_label: stats.status.label(),
            status_color: stats.status.color(),
            chart,
            weather: state.weather.as_ref(),
            holidays: state
                .holidays
                .iter()
                .map(|h| HolidayRow {
                    date: format_date(h.date),
                    name: &h.name,
                    category: &h.category,
                })
                .collect(),
            last_updated: state.last_updated.map(format_date_time),
        }
    }
}

/// The dashboard, or the self-reloading loading view while a cycle runs.
pub fn render_dashboard_page(snapshot: &DashboardSnapshot) -> askama::Result<String> {
    if snapshot.state.loading {
        return LoadingTemplate {
            reload_secs: LOADING_RELOAD_SECS,
        }
        .render();
    }
    DashboardTemplate::from_snapshot(snapshot).render()
}
