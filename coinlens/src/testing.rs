//! In-memory `RemoteApi` for unit tests

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;

use crate::auth::{Credentials, RegistrationRequest};
use crate::client::RemoteApi;
use crate::error::{LensError, Result};
use crate::types::{
    AnalysisResult, CoinDetail, CoinSummary, ComparisonQuery, ProfileBundle, SentimentAnalysis,
    User,
};

/// Scripted API that records every call it receives
#[derive(Default)]
pub(crate) struct FakeApi {
    pub session_valid: Cell<bool>,
    pub session_network_error: Cell<bool>,
    pub login_error: RefCell<Option<String>>,
    pub register_error: RefCell<Option<String>>,
    pub logout_fails: Cell<bool>,
    pub overview: RefCell<Option<Vec<CoinSummary>>>,
    pub profile: RefCell<Option<ProfileBundle>>,
    pub details: RefCell<HashMap<String, CoinDetail>>,
    pub analyses: RefCell<HashMap<String, AnalysisResult>>,
    pub failing_analyses: RefCell<HashSet<String>>,
    /// Extra scheduler turns before a symbol's detail resolves
    pub detail_delays: RefCell<HashMap<String, usize>>,
    pub calls: RefCell<Vec<String>>,
    /// Symbols in the order their detail fetch resolved
    pub completed_details: RefCell<Vec<String>>,
}

impl FakeApi {
    /// Detail record for `symbol` with one week of chart data
    pub fn with_coins(symbols: &[&str]) -> Self {
        let api = Self::default();
        for (i, symbol) in symbols.iter().enumerate() {
            api.add_coin(symbol, 100.0 * (i + 1) as f64);
        }
        api
    }

    pub fn add_coin(&self, symbol: &str, price: f64) {
        let mut chart = HashMap::new();
        chart.insert("7".to_string(), vec![crate::types::SeriesPoint(1_700_000_000_000.0, price)]);
        let detail = CoinDetail {
            symbol: Some(symbol.to_string()),
            name: Some(format!("{symbol} coin")),
            current_price: Some(price),
            chart_data: Some(chart),
            ..CoinDetail::default()
        };
        self.details.borrow_mut().insert(symbol.to_uppercase(), detail);
        self.analyses.borrow_mut().insert(
            symbol.to_uppercase(),
            AnalysisResult {
                ticker: Some(symbol.to_string()),
                sentiment_analysis: Some(SentimentAnalysis {
                    label: Some("Bullish".into()),
                    ..SentimentAnalysis::default()
                }),
                prediction: Some(1),
                ..AnalysisResult::default()
            },
        );
    }

    pub fn fail_analysis(&self, symbol: &str) {
        self.failing_analyses.borrow_mut().insert(symbol.to_uppercase());
    }

    pub fn delay_detail(&self, symbol: &str, turns: usize) {
        self.detail_delays.borrow_mut().insert(symbol.to_uppercase(), turns);
    }

    /// Number of recorded calls whose name starts with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }
}

/// Give other futures a turn `n` times
pub(crate) async fn yield_turns(n: usize) {
    for _ in 0..n {
        tokio::task::yield_now().await;
    }
}

#[async_trait(?Send)]
impl RemoteApi for FakeApi {
    async fn login(&self, credentials: &Credentials) -> Result<Option<User>> {
        self.record("login");
        if let Some(message) = self.login_error.borrow().clone() {
            return Err(LensError::Auth(message));
        }
        self.session_valid.set(true);
        Ok(Some(User {
            username: Some(credentials.username.clone()),
            ..User::default()
        }))
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<Option<User>> {
        self.record("register");
        if let Some(message) = self.register_error.borrow().clone() {
            return Err(LensError::Validation(message));
        }
        Ok(Some(User {
            username: Some(request.username.clone()),
            email: Some(request.email.clone()),
            ..User::default()
        }))
    }

    async fn logout(&self) -> Result<()> {
        self.record("logout");
        self.session_valid.set(false);
        if self.logout_fails.get() {
            return Err(LensError::Network("connection reset".into()));
        }
        Ok(())
    }

    async fn check_session(&self) -> Result<()> {
        self.record("check_session");
        if self.session_network_error.get() {
            return Err(LensError::Network("offline".into()));
        }
        if self.session_valid.get() {
            Ok(())
        } else {
            Err(LensError::Auth("Not authenticated".into()))
        }
    }

    async fn profile(&self) -> Result<ProfileBundle> {
        self.record("profile");
        self.profile
            .borrow()
            .clone()
            .ok_or_else(|| LensError::Api { status: 500, message: "profile unavailable".into() })
    }

    async fn market_overview(&self) -> Result<Vec<CoinSummary>> {
        self.record("market_overview");
        self.overview
            .borrow()
            .clone()
            .ok_or_else(|| LensError::Network("offline".into()))
    }

    async fn coin_details(&self, symbol: &str) -> Result<CoinDetail> {
        let symbol = symbol.to_uppercase();
        self.record(format!("coin_details:{symbol}"));
        let delay = self.detail_delays.borrow().get(&symbol).copied().unwrap_or(0);
        yield_turns(delay).await;
        self.completed_details.borrow_mut().push(symbol.clone());
        self.details
            .borrow()
            .get(&symbol)
            .cloned()
            .ok_or_else(|| LensError::Api { status: 404, message: format!("{symbol} not found") })
    }

    async fn compare_coins(&self, _query: &ComparisonQuery) -> Result<BTreeMap<String, CoinDetail>> {
        self.record("compare_coins");
        Ok(self
            .details
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn analysis_result(&self, symbol: &str) -> Result<Option<AnalysisResult>> {
        let symbol = symbol.to_uppercase();
        self.record(format!("analysis_result:{symbol}"));
        if self.failing_analyses.borrow().contains(&symbol) {
            return Err(LensError::Api { status: 500, message: "analysis failed".into() });
        }
        Ok(self.analyses.borrow().get(&symbol).cloned())
    }
}
