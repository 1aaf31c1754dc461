//! Chart-ready descriptors for the summary screen.
//!
//! The shapes serialize to what Chart.js expects (`labels` + `datasets`, and
//! an options object), so a front end can pass them through untouched.

use serde::{Deserialize, Serialize};

use crate::schema::{CountrySummary, NormalizedSaleRecord};
use crate::state::WorkflowState;

const BAR_PALETTE: [&str; 3] = ["#94a3b8", "#a7b3c2ff", "#e2e8f0"];

/// Colours that a stylesheet would otherwise provide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartTheme {
    pub text_color: String,
    pub text_color_secondary: String,
    pub surface_border: String,
    pub line_color: String,
}

impl Default for ChartTheme {
    fn default() -> Self {
        Self {
            text_color: "#334155".to_string(),
            text_color_secondary: "#64748b".to_string(),
            surface_border: "#e2e8f0".to_string(),
            line_color: "#6b7280".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub background_color: Vec<String>,
    pub border_color: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSetting {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSetting {
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_border: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_at_zero: Option<bool>,
    pub ticks: ColorSetting,
    pub grid: GridSetting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scales {
    pub x: Axis,
    pub y: Axis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub labels: ColorSetting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugins {
    pub legend: Legend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintain_aspect_ratio: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    pub plugins: Plugins,
    pub scales: Scales,
}

/// A data/options pair for one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescriptor {
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryCharts {
    pub bar: ChartDescriptor,
    pub line: ChartDescriptor,
}

/// Totals per country, in the order the summary service returned them.
pub fn bar_chart(summary: &[CountrySummary], theme: &ChartTheme) -> ChartDescriptor {
    let palette: Vec<String> = BAR_PALETTE.iter().map(|c| c.to_string()).collect();

    ChartDescriptor {
        data: ChartData {
            labels: summary.iter().map(|row| row.country.clone()).collect(),
            datasets: vec![Dataset {
                label: "Sales by country".to_string(),
                data: summary.iter().map(|row| row.total_normalized_amount).collect(),
                background_color: palette.clone(),
                border_color: palette,
                border_width: Some(1),
                border_radius: Some(10),
                fill: None,
                tension: None,
            }],
        },
        options: ChartOptions {
            maintain_aspect_ratio: None,
            aspect_ratio: None,
            plugins: legend(theme),
            scales: Scales {
                x: axis(theme, None, None),
                y: axis(theme, Some(true), None),
            },
        },
    }
}

/// Normalized amount per record, labelled with the record date. Records are
/// plotted in the given order; see [`sorted_by_date`] for a chronological view.
pub fn line_chart(records: &[NormalizedSaleRecord], theme: &ChartTheme) -> ChartDescriptor {
    ChartDescriptor {
        data: ChartData {
            labels: records.iter().map(|r| r.sale.date.clone()).collect(),
            datasets: vec![Dataset {
                label: "Sales per day (USD)".to_string(),
                data: records.iter().map(|r| r.normalized_amount).collect(),
                background_color: Vec::new(),
                border_color: vec![theme.line_color.clone()],
                border_width: None,
                border_radius: None,
                fill: Some(false),
                tension: Some(0.4),
            }],
        },
        options: ChartOptions {
            maintain_aspect_ratio: Some(false),
            aspect_ratio: Some(0.6),
            plugins: legend(theme),
            scales: Scales {
                x: axis(theme, None, Some(false)),
                y: axis(theme, None, Some(false)),
            },
        },
    }
}

pub fn prepare_charts(
    summary: &[CountrySummary],
    records: &[NormalizedSaleRecord],
    theme: &ChartTheme,
) -> SummaryCharts {
    SummaryCharts {
        bar: bar_chart(summary, theme),
        line: line_chart(records, theme),
    }
}

/// Stable chronological copy of `records`. Dates that cannot be parsed sort last,
/// keeping their relative order.
pub fn sorted_by_date(records: &[NormalizedSaleRecord]) -> Vec<NormalizedSaleRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| match r.sale.parsed_date() {
        Some(date) => (0, Some(date)),
        None => (1, None),
    });
    sorted
}

impl WorkflowState {
    pub fn charts(&self, theme: &ChartTheme) -> SummaryCharts {
        prepare_charts(&self.summary, self.normalized_records(), theme)
    }
}

fn legend(theme: &ChartTheme) -> Plugins {
    Plugins {
        legend: Legend {
            labels: ColorSetting {
                color: theme.text_color.clone(),
            },
        },
    }
}

fn axis(theme: &ChartTheme, begin_at_zero: Option<bool>, draw_border: Option<bool>) -> Axis {
    Axis {
        begin_at_zero,
        ticks: ColorSetting {
            color: theme.text_color_secondary.clone(),
        },
        grid: GridSetting {
            color: theme.surface_border.clone(),
            draw_border,
        },
    }
}
