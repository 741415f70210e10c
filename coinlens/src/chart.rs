//! Chart configuration builders
//!
//! Output serializes to the charting library's `{labels, datasets}` JSON, so
//! the browser shell can hand it over untouched.

use serde::{Deserialize, Serialize};

use crate::format::{compact_number, date_label};
use crate::types::{CoinViewModel, SentimentAnalysis, SeriesPoint, Timeframe};

const BLUE: &str = "#3a80e9";
const GREEN: &str = "#61c96f";
const BLUE_FILL: &str = "rgba(58,128,233,0.1)";

/// Which series of a coin a chart plots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    #[default]
    Prices,
    TotalVolumes,
}

impl PriceType {
    pub fn series(self, coin: &CoinViewModel, timeframe: Timeframe) -> &[SeriesPoint] {
        match self {
            PriceType::Prices => coin.chart_data.get(timeframe),
            PriceType::TotalVolumes => coin.volume_data.get(timeframe),
        }
    }

    /// Y-axis tick text; volumes are compacted, prices shown raw
    pub fn axis_tick(self, value: f64) -> String {
        match self {
            PriceType::Prices => format!("${value}"),
            PriceType::TotalVolumes => format!("${}", compact_number(value)),
        }
    }
}

/// Fill colour: one for the whole dataset or one per bar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Paint {
    Single(String),
    PerPoint(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_radius: Option<u32>,
    #[serde(rename = "yAxisID", skip_serializing_if = "Option::is_none")]
    pub y_axis_id: Option<String>,
}

impl Dataset {
    /// Thin line with no point markers
    fn line(label: Option<String>, points: &[SeriesPoint], color: &str) -> Self {
        Self {
            label,
            data: points.iter().map(SeriesPoint::value).collect(),
            border_color: Some(color.to_string()),
            border_width: Some(2),
            fill: Some(false),
            tension: Some(0.25),
            point_radius: Some(0),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

fn date_labels(points: &[SeriesPoint]) -> Vec<String> {
    points.iter().map(|p| date_label(p.timestamp_ms())).collect()
}

/// Filled single-coin line on the left axis
pub fn price_chart(coin: &CoinViewModel, timeframe: Timeframe, price_type: PriceType) -> ChartData {
    let points = price_type.series(coin, timeframe);
    let mut dataset = Dataset::line(coin.symbol.clone(), points, BLUE);
    dataset.background_color = Some(Paint::Single(BLUE_FILL.to_string()));
    dataset.fill = Some(true);
    dataset.y_axis_id = Some("crypto1".to_string());

    ChartData {
        labels: date_labels(points),
        datasets: vec![dataset],
    }
}

/// Two lines on separate axes; labels come from the first coin.
///
/// A missing coin renders as an empty series rather than failing.
pub fn comparison_chart(
    first: Option<&CoinViewModel>,
    second: Option<&CoinViewModel>,
    timeframe: Timeframe,
    price_type: PriceType,
) -> ChartData {
    let series = |coin: Option<&CoinViewModel>| -> Vec<SeriesPoint> {
        coin.map(|c| price_type.series(c, timeframe).to_vec()).unwrap_or_default()
    };
    let label = |coin: Option<&CoinViewModel>| coin.and_then(|c| c.name.clone()).or(Some(String::new()));

    let first_points = series(first);
    let second_points = series(second);

    let mut one = Dataset::line(label(first), &first_points, BLUE);
    one.y_axis_id = Some("crypto1".to_string());
    let mut two = Dataset::line(label(second), &second_points, GREEN);
    two.y_axis_id = Some("crypto2".to_string());

    ChartData {
        labels: date_labels(&first_points),
        datasets: vec![one, two],
    }
}

/// Seven-day sparkline for an analysis card
pub fn sparkline(points: &[SeriesPoint]) -> ChartData {
    let mut dataset = Dataset::line(None, points, BLUE);
    dataset.border_width = None;
    dataset.fill = Some(true);
    ChartData {
        labels: date_labels(points),
        datasets: vec![dataset],
    }
}

/// Thirty-day price history on the coin analysis page
pub fn history_chart(symbol: &str, coin: &CoinViewModel) -> ChartData {
    let points = coin.chart_data.get(Timeframe::Month);
    let mut dataset = Dataset::line(
        Some(format!("{} Price (USD)", symbol.to_uppercase())),
        points,
        "rgba(58, 128, 233, 0.8)",
    );
    dataset.border_width = None;
    dataset.background_color = Some(Paint::Single(BLUE_FILL.to_string()));
    dataset.fill = Some(true);
    dataset.tension = Some(0.3);
    ChartData {
        labels: date_labels(points),
        datasets: vec![dataset],
    }
}

/// Article counts per sentiment bucket, most bearish first.
/// Missing buckets count as zero.
#[allow(clippy::cast_precision_loss)]
pub fn sentiment_breakdown(sentiment: &SentimentAnalysis) -> ChartData {
    let buckets = [
        ("Extremely Bearish", sentiment.extremely_bearish, "#f94141"),
        ("Bearish", sentiment.bearish, "#87CEEB"),
        ("Neutral", sentiment.neutral, "#888"),
        ("Bullish", sentiment.bullish, GREEN),
        ("Extremely Bullish", sentiment.extremely_bullish, BLUE),
    ];

    ChartData {
        labels: buckets.iter().map(|(label, _, _)| (*label).to_string()).collect(),
        datasets: vec![Dataset {
            label: Some("Articles".to_string()),
            data: buckets.iter().map(|(_, count, _)| count.unwrap_or(0) as f64).collect(),
            background_color: Some(Paint::PerPoint(
                buckets.iter().map(|(_, _, color)| (*color).to_string()).collect(),
            )),
            border_radius: Some(5),
            ..Dataset::default()
        }],
    }
}

/// Mentions per hot topic, alphabetical by topic
#[allow(clippy::cast_precision_loss)]
pub fn topic_chart(sentiment: &SentimentAnalysis) -> ChartData {
    ChartData {
        labels: sentiment.topic_counts.keys().cloned().collect(),
        datasets: vec![Dataset {
            label: Some("Mentions".to_string()),
            data: sentiment.topic_counts.values().map(|&n| n as f64).collect(),
            background_color: Some(Paint::Single("rgba(58, 128, 233, 0.5)".to_string())),
            border_color: Some(BLUE.to_string()),
            border_width: Some(1),
            border_radius: Some(5),
            ..Dataset::default()
        }],
    }
}
