// Summary statistics derived from a demand series
use super::forecast::{round_tenth, DemandPoint};
use serde::Serialize;

const HIGH_LOAD_MW: f64 = 180.0;
const MEDIUM_LOAD_MW: f64 = 140.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    High,
    Medium,
    Normal,
    Loading,
}

impl LoadStatus {
    pub fn classify(current_mw: f64) -> Self {
        if current_mw > HIGH_LOAD_MW {
            LoadStatus::High
        } else if current_mw > MEDIUM_LOAD_MW {
            LoadStatus::Medium
        } else {
            LoadStatus::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadStatus::High => "High",
            LoadStatus::Medium => "Medium",
            LoadStatus::Normal => "Normal",
            LoadStatus::Loading => "Loading...",
        }
    }

    pub fn color(&self) -> Option<&'static str> {
        match self {
            LoadStatus::High => Some("#e74c3c"),
            LoadStatus::Medium => Some("#f39c12"),
            LoadStatus::Normal => Some("#27ae60"),
            LoadStatus::Loading => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub current: f64,
    pub peak: f64,
    pub average: f64,
    pub status: LoadStatus,
}

impl DashboardStats {
    pub fn loading() -> Self {
        Self {
            current: 0.0,
            peak: 0.0,
            average: 0.0,
            status: LoadStatus::Loading,
        }
    }

    /// One fractional digit, or a bare "0" while there is nothing to show.
    fn display(&self, value: f64) -> String {
        match self.status {
            LoadStatus::Loading => "0".to_string(),
            _ => format!("{:.1}", value),
        }
    }

    pub fn display_current(&self) -> String {
        self.display(self.current)
    }

    pub fn display_peak(&self) -> String {
        self.display(self.peak)
    }

    pub fn display_average(&self) -> String {
        self.display(self.average)
    }
}

/// Derive current/peak/average load and the status band.
///
/// "Current" is the first sample of the series, not an interpolation to the
/// wall clock. An empty series yields the loading placeholder.
pub fn derive_stats(points: &[DemandPoint]) -> DashboardStats {
    let Some(first) = points.first() else {
        return DashboardStats::loading();
    };

    let current = first.demand_mw;
    let peak = points
        .iter()
        .map(|p| p.demand_mw)
        .fold(f64::NEG_INFINITY, f64::max);
    let average = points.iter().map(|p| p.demand_mw).sum::<f64>() / points.len() as f64;

    DashboardStats {
        current: round_tenth(current),
        peak: round_tenth(peak),
        average: round_tenth(average),
        status: LoadStatus::classify(current),
    }
}
