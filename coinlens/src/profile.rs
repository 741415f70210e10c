//! Profile view helpers
//!
//! Wallet lookup, fee math and the merged activity history shown on the
//! profile page.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::client::RemoteApi;
use crate::error::Result;
use crate::format::{INVALID_DATE, date_label};
use crate::types::{ProfileBundle, Wallet};

/// Rows shown in the recent-activity table
pub const RECENT_ACTIVITY_LIMIT: usize = 15;

/// Platform fee applied when no other rate is given
pub const DEFAULT_FEE_RATE: f64 = 0.03;

/// Fetch the profile bundle for the logged-in user
pub async fn fetch_profile(api: &dyn RemoteApi) -> Result<ProfileBundle> {
    api.profile().await.inspect_err(|e| {
        warn!(error = %e, "profile fetch failed");
    })
}

/// Where an activity row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    Fiat,
    Blockchain,
    Exchange,
}

/// One row of the merged activity history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub source: ActivitySource,
    pub tx_id: Option<String>,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub amount: Option<f64>,
    pub fee: Option<f64>,
    pub currency: Option<String>,
    /// Exchange rows only
    pub to_amount: Option<f64>,
    /// Exchange rows only
    pub to_currency: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// `dd/mm/yyyy`, or "Invalid Date" when the server sent no usable timestamp
    pub display_date: String,
}

impl Activity {
    /// Deposits add to the balance, everything else subtracts
    pub fn is_credit(&self) -> bool {
        self.kind.as_deref().is_some_and(|k| k.contains("DEPOSIT"))
    }

    pub fn is_completed(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("completed"))
    }
}

/// RFC 3339, or an offset-less timestamp read as UTC
fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn display_date(created_at: Option<DateTime<Utc>>) -> String {
    created_at.map_or_else(|| INVALID_DATE.to_string(), |dt| date_label(dt.timestamp_millis()))
}

/// Fiat, on-chain and exchange records merged newest first.
/// Rows without a parseable timestamp sort last.
pub fn activity_history(bundle: &ProfileBundle) -> Vec<Activity> {
    let fiat = bundle.transactions.iter().map(|tx| Activity {
        source: ActivitySource::Fiat,
        tx_id: tx.reference_id.clone(),
        status: tx.status.clone(),
        kind: tx.transaction_type.clone(),
        amount: tx.amount,
        fee: tx.fee,
        currency: tx.coin.clone(),
        to_amount: None,
        to_currency: None,
        created_at: parse_timestamp(tx.created_at.as_deref()),
        display_date: String::new(),
    });

    let chain = bundle.blockchain_transactions.iter().map(|tx| Activity {
        source: ActivitySource::Blockchain,
        tx_id: Some(
            tx.tx_hash
                .as_deref()
                .filter(|h| !h.is_empty())
                .map_or_else(|| "pending".to_string(), |h| h.chars().take(10).collect()),
        ),
        status: tx.status.clone(),
        kind: tx.transaction_type.clone(),
        amount: tx.amount,
        fee: tx.network_fee,
        currency: tx.coin.clone(),
        to_amount: None,
        to_currency: None,
        created_at: parse_timestamp(tx.created_at.as_deref()),
        display_date: String::new(),
    });

    let exchanges = bundle.exchanges.iter().map(|ex| Activity {
        source: ActivitySource::Exchange,
        tx_id: Some(format!("EX-{}", ex.id)),
        status: Some("Completed".to_string()),
        kind: Some("EXCHANGE".to_string()),
        amount: ex.from_amount,
        fee: ex.fee,
        currency: ex.from_coin.clone(),
        to_amount: ex.to_amount,
        to_currency: ex.to_coin.clone(),
        created_at: parse_timestamp(ex.created_at.as_deref()),
        display_date: String::new(),
    });

    let mut all: Vec<Activity> = fiat
        .chain(chain)
        .chain(exchanges)
        .map(|activity| Activity {
            display_date: display_date(activity.created_at),
            ..activity
        })
        .collect();
    // Option orders None first, so reversing puts undated rows last
    all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    all
}

/// The newest rows of `activity_history`
pub fn recent_activity(bundle: &ProfileBundle) -> Vec<Activity> {
    let mut history = activity_history(bundle);
    history.truncate(RECENT_ACTIVITY_LIMIT);
    history
}

/// Balance of one coin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletBalance<'a> {
    pub balance: f64,
    pub is_available: bool,
    pub wallet: Option<&'a Wallet>,
}

/// Look up the wallet for `symbol`; a missing wallet has balance 0
pub fn wallet_for<'a>(wallets: &'a [Wallet], symbol: &str) -> WalletBalance<'a> {
    let wallet = wallets.iter().find(|w| w.coin == symbol);
    WalletBalance {
        balance: wallet.and_then(|w| w.balance).unwrap_or(0.0),
        is_available: wallet.is_some(),
        wallet,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub fee: f64,
    pub net_amount: f64,
    pub total: f64,
}

/// Fee on `amount` at `rate` (`DEFAULT_FEE_RATE` when `None`)
pub fn calculate_fee(amount: f64, rate: Option<f64>) -> FeeBreakdown {
    let fee = amount * rate.unwrap_or(DEFAULT_FEE_RATE);
    FeeBreakdown {
        fee,
        net_amount: amount - fee,
        total: amount,
    }
}
