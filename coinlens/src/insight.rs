//! AI analysis presentation helpers
//!
//! Shapes the free-form sentiment/technical reports into what the analysis
//! views show:
//! - Overview cards (summary, connected words, sparkline, link)
//! - Headline stats and indicator text for the single-coin page
//! - Prediction and sentiment tone

use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

use crate::types::{AnalysisResult, CoinViewModel, SeriesPoint, TechnicalAnalysis, Timeframe};

/// Summary length before it is cut and "..." appended
pub const SUMMARY_LIMIT: usize = 150;

pub const SUMMARY_FALLBACK: &str = "AI summary is not available at the moment.";

/// Topics shown per card
pub const CONNECTED_WORDS: usize = 5;

/// Model call for the next move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Prediction {
    Bullish,
    Bearish,
}

impl Prediction {
    /// 1 is bullish; anything else, including a missing prediction, is bearish
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Prediction::Bullish,
            _ => Prediction::Bearish,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Prediction::Bullish => "Bullish",
            Prediction::Bearish => "Bearish",
        }
    }
}

/// Colour family for a sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

impl Tone {
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label.map(str::to_lowercase) else {
            return Tone::Neutral;
        };
        if label.contains("bullish") {
            Tone::Positive
        } else if label.contains("bearish") {
            Tone::Negative
        } else {
            Tone::Neutral
        }
    }
}

/// One card on the analysis overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisCard {
    pub ticker: String,
    pub name: String,
    pub logo: Option<String>,
    pub summary: String,
    /// Whether `summary` was cut and a "Read more" link applies
    pub truncated: bool,
    pub connected_words: Vec<String>,
    pub sparkline: Vec<SeriesPoint>,
    pub link: String,
}

impl AnalysisCard {
    pub fn from_coin(coin: &CoinViewModel) -> Self {
        let ticker = coin.ticker_or("");
        let full = coin
            .sentiment_analysis
            .as_ref()
            .and_then(|s| s.recent_trends.as_ref())
            .and_then(|t| t.description.as_deref())
            .filter(|d| !d.is_empty())
            .unwrap_or(SUMMARY_FALLBACK);
        let (summary, truncated) = truncate_summary(full);

        Self {
            name: coin.name.clone().unwrap_or_else(|| ticker.clone()),
            logo: coin.logo.clone(),
            summary,
            truncated,
            connected_words: coin
                .sentiment_analysis
                .as_ref()
                .map(|s| top_topics(&s.topic_counts, CONNECTED_WORDS))
                .unwrap_or_default(),
            sparkline: coin.chart_data.get(Timeframe::Week).to_vec(),
            link: format!("/analysis/{}", ticker.to_lowercase()),
            ticker,
        }
    }
}

/// Cut to `SUMMARY_LIMIT` characters plus "..."
pub fn truncate_summary(text: &str) -> (String, bool) {
    if text.chars().count() > SUMMARY_LIMIT {
        let cut: String = text.chars().take(SUMMARY_LIMIT).collect();
        (format!("{cut}..."), true)
    } else {
        (text.to_string(), false)
    }
}

/// Most-mentioned topics first; ties keep alphabetical order
pub fn top_topics<'a, I>(counts: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, &'a u64)>,
{
    let mut topics: Vec<(&String, u64)> = counts.into_iter().map(|(t, &n)| (t, n)).collect();
    topics.sort_by(|a, b| b.1.cmp(&a.1));
    topics.into_iter().take(limit).map(|(t, _)| t.clone()).collect()
}

/// Publisher name from an article link: `https://www.coindesk.com/x` -> "Coindesk"
pub fn source_name(url: Option<&str>) -> String {
    let host = url
        .and_then(|u| Url::parse(u).ok())
        .and_then(|u| u.host_str().map(str::to_string));
    let Some(host) = host else {
        return "Unknown Source".to_string();
    };

    let host = host.strip_prefix("www.").unwrap_or(&host);
    let name = host.split('.').next().unwrap_or(host);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Unknown Source".to_string(),
    }
}

/// Render a free-form indicator value as one line of text
pub fn format_indicator(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::Array(items)) => items.iter().map(json_text).collect::<Vec<_>>().join(", "),
        Some(Value::Object(map)) if map.contains_key("position") || map.contains_key("histogram") => {
            let mut parts = Vec::new();
            if let Some(position) = map.get("position").filter(|p| truthy(p)) {
                parts.push(scalar_text(position));
            }
            if let Some(histogram) = map.get("histogram").filter(|h| !h.is_null()) {
                parts.push(format!("histogram: {}", scalar_text(histogram)));
            }
            parts.join(" | ")
        }
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(", "),
                    other => json_text(other),
                };
                format!("{k}: {text}")
            })
            .collect::<Vec<_>>()
            .join(" | "),
        Some(scalar) => scalar_text(scalar),
    }
}

/// Strings unquoted, everything else as JSON
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => value.to_string(),
        other => scalar_text(other),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        _ => true,
    }
}

/// Indicator rows of the technical report, in display order
pub const INDICATORS: [(&str, &str); 5] = [
    ("MACD", "MACD"),
    ("Bollinger Bands®", "Bollinger Bands"),
    ("Support/Resistance", "Support/Resistance"),
    ("Moving Averages", "Moving Averages (SMA & EMA)"),
    ("ATR", "ATR"),
];

/// Headline numbers and text of the single-coin analysis page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub recommendation: Option<String>,
    pub prediction: Prediction,
    pub confidence: Option<String>,
    pub sentiment: Option<String>,
    pub sentiment_tone: Tone,
    pub sentiment_score: Option<String>,
    pub rsi: Option<String>,
    pub indicators: Vec<(String, String)>,
    pub market_bias: Option<String>,
    pub next_steps: Option<String>,
    pub bullish_signals: Vec<String>,
    pub bearish_signals: Vec<String>,
}

impl AnalysisSummary {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let sentiment = result.sentiment_analysis.clone().unwrap_or_default();
        let technical = result.technical_analysis.clone().unwrap_or_default();
        let section_text = |section: &str, key: &str| {
            technical
                .section(section)
                .and_then(|s| s.get(key))
                .filter(|v| !v.is_null())
                .map(scalar_text)
        };

        Self {
            recommendation: section_text("Quick_Stats", "Overall Recommendation"),
            prediction: Prediction::from_code(result.prediction),
            confidence: sentiment.confidence_score.map(|c| format!("{c:.2}")),
            sentiment_tone: Tone::from_label(sentiment.label.as_deref()),
            sentiment: sentiment.label.clone(),
            sentiment_score: sentiment.score.map(|s| format!("{s:.2}")),
            rsi: rsi_text(&technical),
            indicators: INDICATORS
                .iter()
                .map(|(title, key)| {
                    let value = technical.section("Indicator_Synthesis").and_then(|s| s.get(*key));
                    ((*title).to_string(), format_indicator(value))
                })
                .collect(),
            market_bias: section_text("Actionable_Takeaway", "market_bias"),
            next_steps: section_text("Actionable_Takeaway", "Next Steps"),
            bullish_signals: technical.bullish_signals.clone(),
            bearish_signals: technical.bearish_signals.clone(),
        }
    }
}

/// "62.4 (Neutral)" from the RSI section
fn rsi_text(technical: &TechnicalAnalysis) -> Option<String> {
    let rsi = technical.section("RSI")?;
    let value = rsi.get("current_RSI_value").map_or_else(|| "N/A".to_string(), scalar_text);
    let interpretation = rsi.get("interpretation").map_or_else(|| "N/A".to_string(), scalar_text);
    Some(format!("{value} ({interpretation})"))
}
