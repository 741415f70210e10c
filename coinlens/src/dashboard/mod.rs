//! Dashboard module - market overview list
//!
//! Holds the state of the dashboard page. Split into search and pagination
//! submodules.
//!
//! # Architecture
//! - `search.rs`: case-insensitive name/symbol filter
//! - `pagination.rs`: 1-based page slicing
//!
//! # Features
//! - Market overview loaded once per mount
//! - Search shows every match, unpaginated
//! - Fixed page size from configuration

mod pagination;
mod search;

pub use pagination::{page_count, paginate};
pub use search::filter_coins;

use serde::Serialize;
use tracing::{info, warn};

use crate::client::RemoteApi;
use crate::config::Config;
use crate::scope::ViewScope;
use crate::types::CoinSummary;

/// What the dashboard currently shows
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    coins: Vec<CoinSummary>,
    search: String,
    page: usize,
    page_size: usize,
    pub loading: bool,
}

impl DashboardState {
    pub fn new(page_size: usize) -> Self {
        Self {
            coins: Vec::new(),
            search: String::new(),
            page: 1,
            page_size: page_size.max(1),
            loading: true,
        }
    }

    /// Empty dashboard paged by `config.page_size`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.page_size)
    }

    /// Fetch the market overview; a failure leaves the list empty
    pub async fn load(&mut self, api: &dyn RemoteApi, scope: &ViewScope) {
        self.loading = true;
        match scope.run(api.market_overview()).await {
            Ok(coins) => {
                info!(coins = coins.len(), "market overview loaded");
                self.coins = coins;
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                warn!(error = %e, "market overview unavailable");
                self.coins.clear();
            }
        }
        self.loading = false;
    }

    pub fn coins(&self) -> &[CoinSummary] {
        &self.coins
    }

    pub fn set_coins(&mut self, coins: Vec<CoinSummary>) {
        self.coins = coins;
        self.loading = false;
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Jump to a 1-based page, clamped to the pages that exist
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.page_count().max(1));
    }

    pub fn page_count(&self) -> usize {
        page_count(self.coins.len(), self.page_size)
    }

    /// Pagination controls are hidden while a search is active
    pub fn shows_pagination(&self) -> bool {
        self.search.is_empty()
    }

    /// Rows to render: every match while searching, else the current page
    pub fn visible(&self) -> Vec<&CoinSummary> {
        if self.search.is_empty() {
            paginate(&self.coins, self.page, self.page_size).iter().collect()
        } else {
            filter_coins(&self.coins, &self.search)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;

    fn coins(n: usize) -> Vec<CoinSummary> {
        (0..n)
            .map(|i| {
                serde_json::from_value(serde_json::json!({
                    "symbol": format!("C{i}"),
                    "name": format!("Coin {i}"),
                }))
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_pages_then_search() {
        let mut state = DashboardState::new(10);
        state.set_coins(coins(25));
        assert_eq!(state.page_count(), 3);
        assert_eq!(state.visible().len(), 10);

        state.set_page(3);
        assert_eq!(state.visible().len(), 5);
        assert_eq!(state.visible()[0].symbol, "C20");

        state.set_search("coin 2");
        assert!(!state.shows_pagination());
        // "Coin 2" and "Coin 20".."Coin 24", regardless of the page
        assert_eq!(state.visible().len(), 6);
    }

    #[test]
    fn test_page_size_from_config() {
        let config = Config::from_lookup(|key| (key == "COINLENS_PAGE_SIZE").then(|| "4".to_string()));
        let mut state = DashboardState::from_config(&config);
        state.set_coins(coins(10));
        assert_eq!(state.page_count(), 3);
        assert_eq!(state.visible().len(), 4);

        let defaults = DashboardState::from_config(&Config::default());
        assert_eq!(defaults.page_size, 10);
    }

    #[test]
    fn test_set_page_clamps() {
        let mut state = DashboardState::new(10);
        state.set_coins(coins(5));
        state.set_page(9);
        assert_eq!(state.page(), 1);
        state.set_page(0);
        assert_eq!(state.page(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_empty_list() {
        let api = FakeApi::default();
        let scope = ViewScope::new("dashboard");
        let mut state = DashboardState::new(10);

        state.load(&api, &scope).await;
        assert!(!state.loading);
        assert!(state.coins().is_empty());

        *api.overview.borrow_mut() = Some(coins(3));
        state.load(&api, &scope).await;
        assert_eq!(state.visible().len(), 3);
    }
}
