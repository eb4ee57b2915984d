// Chart renderer - single-series demand line chart drawn onto an SVG canvas
use crate::domain::forecast::DemandPoint;
use crate::infrastructure::locale::format_time_of_day;
use crate::infrastructure::svg_canvas::SvgCanvas;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use serde::Serialize;
use std::ops::Range;
use thiserror::Error;

const MARGIN: u32 = 10;
const X_LABEL_AREA: u32 = 48;
const Y_LABEL_AREA: u32 = 64;
const MAX_Y_TICKS: usize = 8;
// Bezier samples per gap between two data points
const SEGMENT_STEPS: usize = 8;

const GRID_COLOR: RGBColor = RGBColor(229, 231, 235);
const AXIS_TEXT: RGBColor = RGBColor(102, 102, 102);

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to draw chart: {0}")]
    Draw(String),
}

// Forwards to plotters' key-point axis; only adds the `ValueFormatter` impl that
// `configure_mesh` requires and `WithKeyPoints<RangedCoordf64>` lacks.
struct KeyPointAxis(plotters::coord::combinators::WithKeyPoints<RangedCoordf64>);

impl Ranged for KeyPointAxis {
    type FormatOption = plotters::coord::ranged1d::NoDefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.0.map(value, limit)
    }

    fn key_points<Hint: plotters::coord::ranged1d::KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        self.0.key_points(hint)
    }

    fn range(&self) -> Range<f64> {
        self.0.range()
    }

    fn axis_pixel_range(&self, limit: (i32, i32)) -> Range<i32> {
        self.0.axis_pixel_range(limit)
    }
}

impl plotters::coord::ranged1d::ValueFormatter<f64> for KeyPointAxis {
    fn format(value: &f64) -> String {
        RangedCoordf64::format(value)
    }
}

fn draw_error<E: std::fmt::Display>(err: E) -> ChartError {
    ChartError::Draw(err.to_string())
}

#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub series_label: String,
    pub x_title: String,
    pub y_title: String,
    pub border_color: RGBColor,
    pub fill_opacity: f64,
    pub border_width: u32,
    pub tension: f64,
    pub max_x_ticks: usize,
    pub hover_radius: f64,
    pub hover_fill: String,
    pub hover_border: String,
    pub hover_border_width: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            series_label: "Power Demand (MW)".to_string(),
            x_title: "Time".to_string(),
            y_title: "Demand (MW)".to_string(),
            border_color: RGBColor(102, 126, 234),
            fill_opacity: 0.1,
            border_width: 2,
            tension: 0.4,
            max_x_ticks: 12,
            hover_radius: 6.0,
            hover_fill: "#667eea".to_string(),
            hover_border: "#ffffff".to_string(),
            hover_border_width: 2.0,
        }
    }
}

impl ChartStyle {
    fn fill_color(&self) -> RGBAColor {
        self.border_color.mix(self.fill_opacity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    /// Area estimated from the chart margins, before plotters has laid it out.
    fn estimate(surface: &SvgCanvas) -> Self {
        let left = (MARGIN + Y_LABEL_AREA) as f64;
        let top = MARGIN as f64;
        Self {
            left,
            top,
            width: (surface.width() as f64 - left - MARGIN as f64).max(1.0),
            height: (surface.height() as f64 - top - (MARGIN + X_LABEL_AREA) as f64).max(1.0),
        }
    }

    /// Area plotters actually drew into. Both ranges are half-open pixel spans.
    fn from_pixels(x: Range<i32>, y: Range<i32>) -> Self {
        Self {
            left: x.start as f64,
            top: y.start as f64,
            width: ((x.end - 1 - x.start) as f64).max(1.0),
            height: ((y.end - 1 - y.start) as f64).max(1.0),
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YAxis {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl YAxis {
    pub fn ticks(&self) -> Vec<f64> {
        let count = ((self.max - self.min) / self.step).round() as usize;
        (0..=count).map(|k| self.min + k as f64 * self.step).collect()
    }

    fn label_decimals(&self) -> usize {
        if self.step >= 1.0 {
            0
        } else {
            (-self.step.log10()).ceil() as usize
        }
    }
}

/// "Nice" number close to `range` (1, 2, 5 or 10 times a power of ten).
fn nice_number(range: f64, round: bool) -> f64 {
    let exponent = range.log10().floor();
    let magnitude = 10f64.powf(exponent);
    let fraction = range / magnitude;
    let nice = if round {
        match fraction {
            f if f < 1.5 => 1.0,
            f if f < 3.0 => 2.0,
            f if f < 7.0 => 5.0,
            _ => 10.0,
        }
    } else {
        match fraction {
            f if f <= 1.0 => 1.0,
            f if f <= 2.0 => 2.0,
            f if f <= 5.0 => 5.0,
            _ => 10.0,
        }
    };
    nice * magnitude
}

/// Auto-scaled y axis enclosing `[lo, hi]`. Zero is not forced into range.
pub fn nice_axis(lo: f64, hi: f64, max_ticks: usize) -> YAxis {
    let (lo, hi) = if (hi - lo).abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo, hi)
    };
    let range = nice_number(hi - lo, false);
    let step = nice_number(range / (max_ticks.max(2) - 1) as f64, true);
    YAxis {
        min: (lo / step).floor() * step,
        max: (hi / step).ceil() * step,
        step,
    }
}

/// Evenly subsampled label indices, never more than `max_ticks`.
pub fn tick_indices(count: usize, max_ticks: usize) -> Vec<usize> {
    if count == 0 || max_ticks == 0 {
        return Vec::new();
    }
    let stride = count.div_ceil(max_ticks).max(1);
    (0..count).step_by(stride).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverMarker {
    pub index: usize,
    pub label: String,
    pub demand_mw: f64,
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
    pub fill: String,
    pub border: String,
    pub border_width: f64,
}


/// Invisible hit column for one sample, with the marker it reveals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverTarget {
    pub x: f64,
    pub width: f64,
    pub title: String,
    pub marker: HoverMarker,
}

/// A laid-out chart bound to one surface.
#[derive(Debug, Clone)]
pub struct ChartInstance {
    pub id: u64,
    pub surface_id: String,
    pub surface_width: f64,
    pub surface_height: f64,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub x_ticks: Vec<usize>,
    pub y_axis: YAxis,
    pub plot: PlotArea,
    style: ChartStyle,
}

impl ChartInstance {
    fn layout(id: u64, surface: &SvgCanvas, points: &[DemandPoint], style: &ChartStyle) -> Self {
        let values: Vec<f64> = points.iter().map(|p| p.demand_mw).collect();
        let labels = points.iter().map(|p| format_time_of_day(p.timestamp)).collect();
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            id,
            surface_id: surface.id().to_string(),
            surface_width: surface.width() as f64,
            surface_height: surface.height() as f64,
            labels,
            x_ticks: tick_indices(values.len(), style.max_x_ticks),
            values,
            y_axis: nice_axis(lo, hi, MAX_Y_TICKS),
            plot: PlotArea::estimate(surface),
            style: style.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    fn x_range(&self) -> Range<f64> {
        if self.values.len() < 2 {
            -0.5..0.5
        } else {
            0.0..(self.values.len() - 1) as f64
        }
    }

    pub fn x_for(&self, index: usize) -> f64 {
        if self.values.len() < 2 {
            return self.plot.left + self.plot.width / 2.0;
        }
        self.plot.left + self.plot.width * index as f64 / (self.values.len() - 1) as f64
    }

    pub fn y_for(&self, value: f64) -> f64 {
        let span = self.y_axis.max - self.y_axis.min;
        self.plot.bottom() - (value - self.y_axis.min) / span * self.plot.height
    }

    /// Pixel position back to (sample index, demand).
    fn to_data(&self, (x, y): (f64, f64)) -> (f64, f64) {
        let index = if self.values.len() < 2 {
            0.0
        } else {
            (x - self.plot.left) / self.plot.width * (self.values.len() - 1) as f64
        };
        let span = self.y_axis.max - self.y_axis.min;
        let value = self.y_axis.min + (self.plot.bottom() - y) / self.plot.height * span;
        (index, value)
    }

    fn label_at(&self, x: f64) -> String {
        let index = x.round();
        if index < 0.0 {
            return String::new();
        }
        self.labels.get(index as usize).cloned().unwrap_or_default()
    }

    /// Nearest sample by position along the x axis; the y coordinate is ignored.
    pub fn nearest_index(&self, x: f64) -> Option<usize> {
        let count = self.values.len();
        if count == 0 || !(0.0..=self.surface_width).contains(&x) {
            return None;
        }
        if count == 1 {
            return Some(0);
        }
        let spacing = self.plot.width / (count - 1) as f64;
        let index = ((x - self.plot.left) / spacing).round();
        Some(index.clamp(0.0, (count - 1) as f64) as usize)
    }

    pub fn hover(&self, x: f64) -> Option<HoverMarker> {
        self.nearest_index(x).map(|index| self.marker(index))
    }

    fn marker(&self, index: usize) -> HoverMarker {
        let value = self.values[index];
        HoverMarker {
            index,
            label: self.labels[index].clone(),
            demand_mw: value,
            cx: self.x_for(index),
            cy: self.y_for(value),
            radius: self.style.hover_radius,
            fill: self.style.hover_fill.clone(),
            border: self.style.hover_border.clone(),
            border_width: self.style.hover_border_width,
        }
    }

    /// One column per sample, split halfway between neighbours, so every x
    /// inside the plot resolves to the same sample as [`Self::nearest_index`].
    pub fn hover_targets(&self) -> Vec<HoverTarget> {
        let count = self.values.len();
        (0..count)
            .map(|index| {
                let cx = self.x_for(index);
                let left = if index == 0 {
                    self.plot.left
                } else {
                    (self.x_for(index - 1) + cx) / 2.0
                };
                let right = if index + 1 == count {
                    self.plot.right()
                } else {
                    (cx + self.x_for(index + 1)) / 2.0
                };
                let marker = self.marker(index);
                HoverTarget {
                    x: left,
                    width: (right - left).max(1.0),
                    title: format!("{} · {:.1} MW", marker.label, marker.demand_mw),
                    marker,
                }
            })
            .collect()
    }

    fn pixel_points(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (self.x_for(i), self.y_for(*v)))
            .collect()
    }

    /// Tension-smoothed curve through every sample, in data coordinates.
    ///
    /// The spline is built in pixel space so the tension weights follow what
    /// is on screen, then sampled and mapped back for plotters.
    fn smoothed_points(&self) -> Vec<(f64, f64)> {
        let points = self.pixel_points();
        let Some(&first) = points.first() else {
            return Vec::new();
        };

        let controls: Vec<((f64, f64), (f64, f64))> = (0..points.len())
            .map(|i| {
                let prev = points[i.saturating_sub(1)];
                let next = points[(i + 1).min(points.len() - 1)];
                spline_controls(prev, points[i], next, self.style.tension)
            })
            .collect();

        let mut curve = Vec::with_capacity((points.len() - 1) * SEGMENT_STEPS + 1);
        curve.push(self.to_data(first));
        for i in 1..points.len() {
            let (_, out_cp) = controls[i - 1];
            let (in_cp, _) = controls[i];
            for step in 1..=SEGMENT_STEPS {
                let t = step as f64 / SEGMENT_STEPS as f64;
                let (x, y) = cubic_bezier(points[i - 1], out_cp, in_cp, points[i], t);
                let x = x.clamp(self.plot.left, self.plot.right());
                let y = y.clamp(self.plot.top, self.plot.bottom());
                curve.push(self.to_data((x, y)));
            }
        }
        curve
    }

    fn draw(&mut self, surface: &mut SvgCanvas) -> Result<(), ChartError> {
        surface.draw(self.id, |root| {
            root.fill(&WHITE).map_err(draw_error)?;

            let key_points: Vec<f64> = self.x_ticks.iter().map(|&i| i as f64).collect();
            let mut chart = ChartBuilder::on(&root)
                .margin(MARGIN)
                .x_label_area_size(X_LABEL_AREA)
                .y_label_area_size(Y_LABEL_AREA)
                .build_cartesian_2d(
                    KeyPointAxis(self.x_range().with_key_points(key_points)),
                    self.y_axis.min..self.y_axis.max,
                )
                .map_err(draw_error)?;

            let (x_pixels, y_pixels) = chart.plotting_area().get_pixel_range();
            self.plot = PlotArea::from_pixels(x_pixels, y_pixels);

            let decimals = self.y_axis.label_decimals();
            chart
                .configure_mesh()
                .x_labels(self.style.max_x_ticks)
                .y_labels(self.y_axis.ticks().len())
                .x_desc(self.style.x_title.as_str())
                .y_desc(self.style.y_title.as_str())
                .bold_line_style(GRID_COLOR)
                .light_line_style(TRANSPARENT)
                .axis_desc_style(("sans-serif", 12))
                .label_style(("sans-serif", 11, &AXIS_TEXT))
                .x_label_formatter(&|x| self.label_at(*x))
                .y_label_formatter(&|y| format!("{:.*}", decimals, y))
                .draw()
                .map_err(draw_error)?;

            let curve = self.smoothed_points();
            let line = self.style.border_color;
            chart
                .draw_series(AreaSeries::new(
                    curve.iter().copied(),
                    self.y_axis.min,
                    self.style.fill_color(),
                ))
                .map_err(draw_error)?;
            chart
                .draw_series(LineSeries::new(
                    curve.iter().copied(),
                    line.stroke_width(self.style.border_width),
                ))
                .map_err(draw_error)?
                .label(self.style.series_label.as_str())
                .legend(move |(x, y)| Circle::new((x + 8, y), 5, line.filled()));

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperMiddle)
                .label_font(("sans-serif", 12))
                .background_style(WHITE.mix(0.8))
                .border_style(GRID_COLOR)
                .draw()
                .map_err(draw_error)?;

            root.present().map_err(draw_error)
        })
    }
}

/// Incoming and outgoing control points for `current`, scaled by neighbour distance.
fn spline_controls(
    prev: (f64, f64),
    current: (f64, f64),
    next: (f64, f64),
    tension: f64,
) -> ((f64, f64), (f64, f64)) {
    let d01 = ((current.0 - prev.0).powi(2) + (current.1 - prev.1).powi(2)).sqrt();
    let d12 = ((next.0 - current.0).powi(2) + (next.1 - current.1).powi(2)).sqrt();
    let total = d01 + d12;
    let (s01, s12) = if total > 0.0 {
        (d01 / total, d12 / total)
    } else {
        (0.0, 0.0)
    };
    let fa = tension * s01;
    let fb = tension * s12;
    let dx = next.0 - prev.0;
    let dy = next.1 - prev.1;
    (
        (current.0 - fa * dx, current.1 - fa * dy),
        (current.0 + fb * dx, current.1 + fb * dy),
    )
}

fn cubic_bezier(
    p0: (f64, f64),
    c1: (f64, f64),
    c2: (f64, f64),
    p3: (f64, f64),
    t: f64,
) -> (f64, f64) {
    let u = 1.0 - t;
    let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    (
        a * p0.0 + b * c1.0 + c * c2.0 + d * p3.0,
        a * p0.1 + b * c1.1 + c * c2.1 + d * p3.1,
    )
}

/// Owns the single live chart for a surface.
#[derive(Debug, Default)]
pub struct ChartRenderer {
    style: ChartStyle,
    active: Option<ChartInstance>,
    next_id: u64,
}

impl ChartRenderer {
    pub fn active(&self) -> Option<&ChartInstance> {
        self.active.as_ref()
    }

    /// Replace whatever is on `surface` with a chart of `points`.
    ///
    /// Without a surface this is a no-op. An empty series, or a draw that
    /// fails, leaves the surface blank.
    pub fn render(
        &mut self,
        surface: Option<&mut SvgCanvas>,
        points: &[DemandPoint],
    ) -> Option<&ChartInstance> {
        let Some(surface) = surface else {
            tracing::debug!("No chart surface attached, skipping render");
            return None;
        };

        self.destroy(Some(&mut *surface));
        if points.is_empty() {
            return None;
        }

        self.next_id += 1;
        let mut chart = ChartInstance::layout(self.next_id, surface, points, &self.style);
        if let Err(err) = chart.draw(surface) {
            tracing::warn!("Chart {} on {} not drawn: {}", chart.id, chart.surface_id, err);
            return None;
        }
        tracing::debug!(
            "Rendered chart {} on {} with {} points",
            chart.id,
            chart.surface_id,
            chart.len()
        );
        self.active = Some(chart);
        self.active.as_ref()
    }

    /// Release the live chart and wipe the surface.
    pub fn destroy(&mut self, surface: Option<&mut SvgCanvas>) {
        if let Some(surface) = surface {
            surface.clear();
        }
        if let Some(chart) = self.active.take() {
            tracing::debug!("Destroyed chart {}", chart.id);
        }
    }
}
