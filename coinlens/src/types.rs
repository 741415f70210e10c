//! Common types for the client core
//!
//! Wire shapes of the market-analysis API plus the merged per-coin view-model.
//! The server is loose about numbers (decimals arrive as strings, ids as
//! either ints or symbols), so most fields deserialize leniently.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};

/// Time-series window, serialized as its day count ("7", "30", ...)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "7")]
    Week,
    #[default]
    #[serde(rename = "30")]
    Month,
    #[serde(rename = "60")]
    TwoMonths,
    #[serde(rename = "90")]
    Quarter,
    #[serde(rename = "120")]
    FourMonths,
    #[serde(rename = "365")]
    Year,
}

impl Timeframe {
    /// Every timeframe the API produces, shortest first
    pub const ALL: [Timeframe; 6] = [
        Timeframe::Week,
        Timeframe::Month,
        Timeframe::TwoMonths,
        Timeframe::Quarter,
        Timeframe::FourMonths,
        Timeframe::Year,
    ];

    pub fn days(self) -> u32 {
        match self {
            Timeframe::Week => 7,
            Timeframe::Month => 30,
            Timeframe::TwoMonths => 60,
            Timeframe::Quarter => 90,
            Timeframe::FourMonths => 120,
            Timeframe::Year => 365,
        }
    }

    /// Map key used by the API
    pub fn key(self) -> &'static str {
        match self {
            Timeframe::Week => "7",
            Timeframe::Month => "30",
            Timeframe::TwoMonths => "60",
            Timeframe::Quarter => "90",
            Timeframe::FourMonths => "120",
            Timeframe::Year => "365",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tf| tf.key() == key)
    }

    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|tf| tf.days() == days)
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// One `[timestamp_ms, value]` sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint(pub f64, pub f64);

impl SeriesPoint {
    #[allow(clippy::cast_possible_truncation)]
    pub fn timestamp_ms(&self) -> i64 {
        self.0 as i64
    }

    pub fn value(&self) -> f64 {
        self.1
    }
}

/// Raw per-timeframe series as the server sends them
pub type RawSeries = HashMap<String, Vec<SeriesPoint>>;

/// Per-timeframe series with every timeframe present
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeframeSeries(BTreeMap<Timeframe, Vec<SeriesPoint>>);

impl Default for TimeframeSeries {
    fn default() -> Self {
        Self::normalized(None)
    }
}

impl TimeframeSeries {
    /// Fill every timeframe key, defaulting missing ones to an empty series.
    /// Keys outside the known set are dropped.
    pub fn normalized(raw: Option<RawSeries>) -> Self {
        let mut raw = raw.unwrap_or_default();
        let series = Timeframe::ALL
            .into_iter()
            .map(|tf| (tf, raw.remove(tf.key()).unwrap_or_default()))
            .collect();
        if !raw.is_empty() {
            tracing::debug!(keys = ?raw.keys().collect::<Vec<_>>(), "dropping unknown timeframe keys");
        }
        Self(series)
    }

    /// Samples for a timeframe, empty when the server had none
    pub fn get(&self, timeframe: Timeframe) -> &[SeriesPoint] {
        self.0.get(&timeframe).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, timeframe: Timeframe) -> bool {
        self.0.contains_key(&timeframe)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timeframe, &[SeriesPoint])> {
        self.0.iter().map(|(tf, points)| (*tf, points.as_slice()))
    }
}

/// Coin identifier; the detail endpoints use a numeric id, the overview the symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoinId {
    Number(i64),
    Text(String),
}

/// Accept numbers, numeric strings, or null
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Number(n)) => Some(n),
        Some(Loose::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Row of `GET analytics/market_overview/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSummary {
    #[serde(default)]
    pub id: Option<CoinId>,
    #[serde(default)]
    pub name: Option<String>,
    pub symbol: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Body of `GET analytics/coin_details/{symbol}/` and the values of `compare_coins`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoinDetail {
    #[serde(default)]
    pub id: Option<CoinId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_change_percent_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub high_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub low_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub chart_data: Option<RawSeries>,
    #[serde(default)]
    pub volume_data: Option<RawSeries>,
}

/// Query of `GET analytics/compare_coins/`; all parts optional
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

/// `{ "data": { "BTC": {...}, ... } }`
#[derive(Debug, Deserialize)]
pub struct ComparisonEnvelope {
    #[serde(default)]
    pub data: BTreeMap<String, CoinDetail>,
}

/// Headline trend narrative inside a sentiment report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentTrends {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub market_outlook: Option<String>,
}

/// News article cited by a sentiment report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub pub_date: Option<String>,
}

/// AI sentiment report; free-form beyond the fields pages read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub extremely_bearish: Option<u64>,
    #[serde(default)]
    pub bearish: Option<u64>,
    #[serde(default)]
    pub neutral: Option<u64>,
    #[serde(default)]
    pub bullish: Option<u64>,
    #[serde(default)]
    pub extremely_bullish: Option<u64>,
    #[serde(default)]
    pub topic_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub recent_trends: Option<RecentTrends>,
    #[serde(default)]
    pub top_articles: Vec<Article>,
    #[serde(default)]
    pub sentiment_drivers: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// AI technical report; `analysis` is a nested free-form document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    #[serde(default)]
    pub analysis: Option<serde_json::Value>,
    #[serde(default)]
    pub bullish_signals: Vec<String>,
    #[serde(default)]
    pub bearish_signals: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TechnicalAnalysis {
    /// Section of the nested `analysis` document, e.g. `"RSI"` or `"Quick_Stats"`
    pub fn section(&self, name: &str) -> Option<&serde_json::Value> {
        self.analysis.as_ref()?.get(name)
    }
}

/// Payload of a successful `GET analysis/get-analysis-result/{symbol}/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub sentiment_analysis: Option<SentimentAnalysis>,
    #[serde(default)]
    pub technical_analysis: Option<TechnicalAnalysis>,
    #[serde(default)]
    pub strategy_analysis: Option<serde_json::Value>,
    #[serde(default)]
    pub prediction: Option<i64>,
}

/// `{status: "success", data} | {status: "no-data", message}`
#[derive(Debug, Deserialize)]
pub struct AnalysisEnvelope {
    pub status: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Merged per-coin record handed to presentation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoinViewModel {
    pub id: Option<CoinId>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub logo: Option<String>,
    pub description: Option<String>,
    pub current_price: Option<f64>,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub price_change_percent_24h: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub last_updated: Option<String>,
    pub chart_data: TimeframeSeries,
    pub volume_data: TimeframeSeries,
    pub sentiment_analysis: Option<SentimentAnalysis>,
    pub technical_analysis: Option<TechnicalAnalysis>,
}

impl From<CoinDetail> for CoinViewModel {
    fn from(detail: CoinDetail) -> Self {
        Self {
            id: detail.id,
            symbol: detail.symbol,
            name: detail.name,
            logo: detail.logo,
            description: detail.description,
            current_price: detail.current_price,
            volume: detail.volume,
            market_cap: detail.market_cap,
            price_change_percent_24h: detail.price_change_percent_24h,
            high_24h: detail.high_24h,
            low_24h: detail.low_24h,
            last_updated: detail.last_updated,
            chart_data: TimeframeSeries::normalized(detail.chart_data),
            volume_data: TimeframeSeries::normalized(detail.volume_data),
            sentiment_analysis: None,
            technical_analysis: None,
        }
    }
}

impl CoinViewModel {
    /// Attach the AI reports; a missing result leaves both sections empty
    pub fn with_analysis(mut self, analysis: Option<AnalysisResult>) -> Self {
        if let Some(result) = analysis {
            self.sentiment_analysis = result.sentiment_analysis;
            self.technical_analysis = result.technical_analysis;
        }
        self
    }

    /// Symbol upper-cased, falling back to the one the caller asked for
    pub fn ticker_or(&self, requested: &str) -> String {
        self.symbol.as_deref().unwrap_or(requested).to_uppercase()
    }
}

/// Account as echoed by login/register/profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_verified: Option<bool>,
}

/// Login/register response body; the user echo is optional
#[derive(Debug, Default, Deserialize)]
pub struct UserEnvelope {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Coin balance held by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub coin: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub balance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usd_value: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Fiat deposit/withdrawal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiatTransaction {
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fee: Option<f64>,
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub coin: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// On-chain transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockchainTransaction {
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub network_fee: Option<f64>,
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub coin: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Coin-to-coin swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub from_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub to_amount: Option<f64>,
    #[serde(default)]
    pub from_coin: Option<String>,
    #[serde(default)]
    pub to_coin: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fee: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `GET user/profile/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileBundle {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub wallets: Vec<Wallet>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_portfolio_value_usd: Option<f64>,
    #[serde(default)]
    pub transactions: Vec<FiatTransaction>,
    #[serde(default)]
    pub blockchain_transactions: Vec<BlockchainTransaction>,
    #[serde(default)]
    pub exchanges: Vec<ExchangeRecord>,
}
