//! Presentation seam for chart payloads.

use crate::error::{ForecastError, Result};
use crate::pipeline::report::{ChartSet, ForecastReport};

/// Turns chart data into a presentable artifact (image, HTML, JSON, ...).
///
/// The pipeline only produces numbers; rendering is left to implementors.
pub trait ChartRenderer {
    type Output;

    fn render(&self, charts: &ChartSet) -> Result<Self::Output>;
}

/// Renders charts as a JSON document for a front end to draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonChartRenderer {
    pub pretty: bool,
}

impl JsonChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ChartRenderer for JsonChartRenderer {
    type Output = String;

    fn render(&self, charts: &ChartSet) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(charts)
        } else {
            serde_json::to_string(charts)
        };
        rendered.map_err(|e| ForecastError::InvalidParameter(format!("chart rendering: {}", e)))
    }
}

impl ForecastReport {
    /// Render this report's charts.
    pub fn render_charts<R: ChartRenderer>(&self, renderer: &R) -> Result<R::Output> {
        renderer.render(&self.charts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Forecast, TimeSeries};
    use chrono::NaiveDate;

    #[test]
    fn json_renderer_emits_all_panels() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let history = TimeSeries::daily(start, vec![1.0, 2.0, 3.0]).unwrap();
        let forecast = Forecast::new(
            history.future_timestamps(1).unwrap(),
            vec![4.0],
            vec![3.5],
            vec![4.5],
            0.95,
        )
        .unwrap();
        let charts = ChartSet::build(&history, &history, &forecast, &[]);

        let json = JsonChartRenderer::new().render(&charts).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        for panel in ["history", "forecast", "moving_averages", "trend_forecast"] {
            assert!(value.get(panel).is_some(), "missing panel {}", panel);
        }
        assert_eq!(value["forecast"]["band"]["upper"][0], 4.5);
        assert_eq!(value["forecast"]["series"][1]["dates"][0], "2024-01-04");
        assert!(value["history"].get("band").is_none());
    }
}
