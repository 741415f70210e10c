use crate::types::CoinSummary;

/// Coins whose name or symbol contains `query`, ignoring case
pub fn filter_coins<'a>(coins: &'a [CoinSummary], query: &str) -> Vec<&'a CoinSummary> {
    let needle = query.to_lowercase();
    coins
        .iter()
        .filter(|coin| {
            coin.name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
                || coin.symbol.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(symbol: &str, name: Option<&str>) -> CoinSummary {
        serde_json::from_value(serde_json::json!({"symbol": symbol, "name": name})).unwrap()
    }

    #[test]
    fn test_matches_name_or_symbol() {
        let coins = vec![coin("BTC", Some("Bitcoin")), coin("ETH", Some("Ethereum")), coin("XRP", None)];
        assert_eq!(filter_coins(&coins, "bit").len(), 1);
        assert_eq!(filter_coins(&coins, "eth")[0].symbol, "ETH");
        assert_eq!(filter_coins(&coins, "xr").len(), 1);
        assert_eq!(filter_coins(&coins, "").len(), 3);
        assert!(filter_coins(&coins, "doge").is_empty());
    }
}
