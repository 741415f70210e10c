//! View-model aggregation - orchestrates the per-view fetches
//!
//! Coordinates the API client and a view's cancellation scope:
//! - Analysis list: fan-out over symbols, detail + analysis joined per symbol
//! - Coin detail: one fetch, normalised into a `CoinViewModel`
//! - Comparison: one bulk fetch, the two selections looked up locally
//! - Coin analysis: detail + analysis, re-polled on an interval
//!
//! A failure inside a batch drops that unit and is logged; it never fails the
//! whole view.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::future::join_all;
use futures::stream::{self, Stream};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::RemoteApi;
use crate::config::Config;
use crate::error::Result;
use crate::scope::ViewScope;
use crate::types::{AnalysisResult, CoinViewModel, ComparisonQuery, Timeframe};

/// Refresh interval of the coin analysis view when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of one analysis-list build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Merged view-models, in input order
    pub coins: Vec<CoinViewModel>,
    /// Symbols skipped because a fetch failed
    pub dropped: Vec<String>,
    /// The owning view went away before the batch finished
    pub cancelled: bool,
}

/// Detail plus the raw AI report for the single-coin analysis view
#[derive(Debug, Clone, Serialize)]
pub struct CoinAnalysis {
    pub coin: CoinViewModel,
    pub analysis: Option<AnalysisResult>,
}

/// Builds view-models for one mounted view.
///
/// Dropping the builder cancels its scope, aborting any fetch still in flight.
pub struct ViewModelBuilder {
    api: Rc<dyn RemoteApi>,
    scope: ViewScope,
    poll_interval: Duration,
}

impl ViewModelBuilder {
    pub fn new(api: Rc<dyn RemoteApi>, view: &'static str) -> Self {
        Self {
            api,
            scope: ViewScope::new(view),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Builder whose analysis polling follows `config.analysis_poll_interval`
    pub fn with_config(api: Rc<dyn RemoteApi>, config: &Config, view: &'static str) -> Self {
        Self {
            poll_interval: config.analysis_poll_interval,
            ..Self::new(api, view)
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Abort outstanding fetches; later builds resolve empty
    pub fn cancel(&self) {
        self.scope.cancel();
    }

    /// Merged view-models for `symbols`, failures skipped in place
    pub async fn build_analysis_list<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<CoinViewModel> {
        self.build_analysis_report(symbols).await.coins
    }

    /// Same as `build_analysis_list`, also reporting what was dropped
    pub async fn build_analysis_report<S: AsRef<str>>(&self, symbols: &[S]) -> BatchReport {
        let fetches = symbols.iter().map(|symbol| {
            let symbol = symbol.as_ref();
            async move { (symbol, self.fetch_merged(symbol).await) }
        });

        // join_all yields in input order regardless of completion order
        let outcomes = join_all(fetches).await;

        let mut report = BatchReport::default();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(coin) => report.coins.push(coin),
                Err(e) if e.is_cancelled() => {
                    report.cancelled = true;
                }
                Err(e) => {
                    warn!(symbol, error = %e, "dropping symbol from analysis list");
                    report.dropped.push(symbol.to_string());
                }
            }
        }

        if report.cancelled {
            debug!(view = "analysis", "analysis list cancelled");
            report.coins.clear();
        } else {
            info!(
                requested = symbols.len(),
                built = report.coins.len(),
                dropped = report.dropped.len(),
                "analysis list built"
            );
        }
        report
    }

    /// Detail and analysis for one symbol, joined; either failing fails both
    async fn fetch_merged(&self, symbol: &str) -> Result<CoinViewModel> {
        let (detail, analysis) = futures::join!(
            self.scope.run(self.api.coin_details(symbol)),
            self.scope.run(self.api.analysis_result(symbol)),
        );

        let mut coin = CoinViewModel::from(detail?).with_analysis(analysis?);
        if coin.symbol.is_none() {
            coin.symbol = Some(symbol.to_uppercase());
        }
        Ok(coin)
    }

    /// Analysis list over every coin in the market overview
    pub async fn build_analysis_overview(&self) -> Vec<CoinViewModel> {
        let overview = match self.scope.run(self.api.market_overview()).await {
            Ok(overview) => overview,
            Err(e) if e.is_cancelled() => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "market overview unavailable");
                return Vec::new();
            }
        };

        let symbols: Vec<String> = overview.into_iter().map(|c| c.symbol).collect();
        self.build_analysis_list(&symbols).await
    }

    /// Single coin detail with every timeframe key filled
    pub async fn build_coin_detail(&self, symbol: &str) -> Option<CoinViewModel> {
        match self.scope.run(self.api.coin_details(symbol)).await {
            Ok(detail) => Some(CoinViewModel::from(detail)),
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                warn!(symbol, error = %e, "coin detail unavailable");
                None
            }
        }
    }

    /// Every coin's merged data from one bulk call, keyed by symbol
    pub async fn build_comparison(&self) -> BTreeMap<String, CoinViewModel> {
        match self
            .scope
            .run(self.api.compare_coins(&ComparisonQuery::default()))
            .await
        {
            Ok(data) => {
                debug!(coins = data.len(), "comparison data loaded");
                data.into_iter()
                    .map(|(symbol, detail)| (symbol, CoinViewModel::from(detail)))
                    .collect()
            }
            Err(e) if e.is_cancelled() => BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, "comparison data unavailable");
                BTreeMap::new()
            }
        }
    }

    /// Detail and analysis for the single-coin analysis view.
    ///
    /// A failing analysis degrades to `None`; a failing detail fails the call.
    pub async fn build_coin_analysis(&self, symbol: &str) -> Result<CoinAnalysis> {
        let (analysis, detail) = futures::join!(
            self.scope.run(self.api.analysis_result(symbol)),
            self.scope.run(self.api.coin_details(symbol)),
        );

        let analysis = match analysis {
            Ok(analysis) => analysis,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!(symbol, error = %e, "analysis unavailable, showing detail only");
                None
            }
        };

        Ok(CoinAnalysis {
            coin: CoinViewModel::from(detail?),
            analysis,
        })
    }

    /// `poll_coin_analysis` at the configured interval
    pub fn watch_coin_analysis<'a, S, F>(
        &'a self,
        symbol: &'a str,
        sleep: S,
    ) -> impl Stream<Item = Result<CoinAnalysis>> + 'a
    where
        S: Fn(Duration) -> F + 'a,
        F: Future<Output = ()> + 'a,
    {
        self.poll_coin_analysis(symbol, self.poll_interval, sleep)
    }

    /// Re-run `build_coin_analysis` every `interval` until the scope is cancelled.
    ///
    /// The first item is fetched immediately. `sleep` supplies the timer so the
    /// same code runs on a browser event loop and under test.
    pub fn poll_coin_analysis<'a, S, F>(
        &'a self,
        symbol: &'a str,
        interval: Duration,
        sleep: S,
    ) -> impl Stream<Item = Result<CoinAnalysis>> + 'a
    where
        S: Fn(Duration) -> F + 'a,
        F: Future<Output = ()> + 'a,
    {
        stream::unfold((true, sleep), move |(first, sleep)| async move {
            if !first {
                let waited = self
                    .scope
                    .run(async {
                        sleep(interval).await;
                        Ok(())
                    })
                    .await;
                waited.ok()?;
            }
            if self.scope.is_cancelled() {
                return None;
            }
            match self.build_coin_analysis(symbol).await {
                Err(e) if e.is_cancelled() => None,
                outcome => Some((outcome, (false, sleep))),
            }
        })
    }
}

/// The two coins picked on the comparison view.
///
/// `crypto1 != crypto2` always holds: a pick equal to the other side, or not
/// in the available set, is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonSelection {
    crypto1: String,
    crypto2: String,
    pub timeframe: Timeframe,
    #[serde(skip)]
    available: BTreeSet<String>,
}

impl Default for ComparisonSelection {
    fn default() -> Self {
        Self {
            crypto1: "BTC".to_string(),
            crypto2: "ETH".to_string(),
            timeframe: Timeframe::Month,
            available: BTreeSet::new(),
        }
    }
}

impl ComparisonSelection {
    pub fn crypto1(&self) -> &str {
        &self.crypto1
    }

    pub fn crypto2(&self) -> &str {
        &self.crypto2
    }

    /// Restrict future picks to the symbols the comparison call returned
    pub fn set_available<I, S>(&mut self, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available = symbols.into_iter().map(Into::into).collect();
    }

    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.available.iter().map(String::as_str)
    }

    fn allowed(&self, symbol: &str) -> bool {
        self.available.is_empty() || self.available.contains(symbol)
    }

    /// Returns whether the pick was applied
    pub fn select_first(&mut self, symbol: &str) -> bool {
        if symbol == self.crypto2 || !self.allowed(symbol) {
            debug!(symbol, "ignoring first-coin selection");
            return false;
        }
        self.crypto1 = symbol.to_string();
        true
    }

    /// Returns whether the pick was applied
    pub fn select_second(&mut self, symbol: &str) -> bool {
        if symbol == self.crypto1 || !self.allowed(symbol) {
            debug!(symbol, "ignoring second-coin selection");
            return false;
        }
        self.crypto2 = symbol.to_string();
        true
    }

    /// Look both selections up in the comparison data
    pub fn resolve<'a>(
        &self,
        data: &'a BTreeMap<String, CoinViewModel>,
    ) -> (Option<&'a CoinViewModel>, Option<&'a CoinViewModel>) {
        (data.get(&self.crypto1), data.get(&self.crypto2))
    }
}
