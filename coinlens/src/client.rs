//! Market-analysis API client
//!
//! Implements the REST API for:
//! - Session (login, register, logout, authenticated check)
//! - Profile bundle
//! - Market data (overview, coin details, comparison)
//! - AI analysis results
//!
//! Every request forwards cookies; the session is never held client-side.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::auth::{Credentials, RegistrationRequest, flatten_field_errors};
use crate::config::Config;
use crate::error::{LensError, Result};
use crate::types::{
    AnalysisEnvelope, AnalysisResult, CoinDetail, CoinSummary, ComparisonEnvelope,
    ComparisonQuery, ProfileBundle, User, UserEnvelope,
};

/// Operations the views need from the remote API.
///
/// Futures are not `Send`: the browser runs everything on one event loop.
#[async_trait(?Send)]
pub trait RemoteApi {
    /// Post credentials; the server sets the session cookie
    async fn login(&self, credentials: &Credentials) -> Result<Option<User>>;

    /// Create an account; does not establish a session
    async fn register(&self, request: &RegistrationRequest) -> Result<Option<User>>;

    /// Clear the session cookie
    async fn logout(&self) -> Result<()>;

    /// Resolves when the session cookie is valid, rejects otherwise
    async fn check_session(&self) -> Result<()>;

    async fn profile(&self) -> Result<ProfileBundle>;

    async fn market_overview(&self) -> Result<Vec<CoinSummary>>;

    async fn coin_details(&self, symbol: &str) -> Result<CoinDetail>;

    /// All coins' detail records keyed by symbol, in one call
    async fn compare_coins(&self, query: &ComparisonQuery) -> Result<BTreeMap<String, CoinDetail>>;

    /// `None` when the analysis workflow has not produced data yet
    async fn analysis_result(&self, symbol: &str) -> Result<Option<AnalysisResult>>;
}

/// reqwest-backed API client
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    with_credentials: bool,
}

impl ApiClient {
    /// Create the process-wide client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| LensError::Config(format!("Invalid API URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(LensError::Config("API URL cannot be a base".into()));
        }

        let builder = reqwest::Client::builder();
        // Browsers keep cookies themselves; native builds need a jar
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.cookie_store(config.with_credentials);
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url,
            with_credentials: config.with_credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base/seg/seg/` with each segment percent-encoded and a trailing slash
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| LensError::Config("API URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(%method, %url, %request_id, "api request");

        let builder = self
            .http
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("X-Request-ID", request_id);

        #[cfg(target_arch = "wasm32")]
        let builder = if self.with_credentials {
            builder.fetch_credentials_include()
        } else {
            builder
        };
        builder
    }

    /// Perform GET request
    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        let response = self.request(Method::GET, url).send().await?;
        Self::handle_response(response).await
    }

    /// Perform POST request with a JSON body
    async fn post<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> Result<Response> {
        let url = self.endpoint(segments)?;
        Ok(self.request(Method::POST, url).json(body).send().await?)
    }

    /// Handle API response, checking for errors
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            warn!(status = status.as_u16(), "api request failed");
            return Err(LensError::Api {
                status: status.as_u16(),
                message: error_message(&error_text).unwrap_or(error_text),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(LensError::from)
    }

    /// Status-only check; the body is ignored
    fn expect_success(response: &Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(LensError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            })
        }
    }
}

#[async_trait(?Send)]
impl RemoteApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<Option<User>> {
        let response = self.post(&["user", "login"], credentials).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| "Login failed".to_string());
            return Err(LensError::Auth(message));
        }

        let envelope: UserEnvelope = serde_json::from_str(&body).unwrap_or_default();
        Ok(envelope.user)
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<Option<User>> {
        let response = self.post(&["user", "register"], request).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_client_error() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| flatten_field_errors(&v))
                .unwrap_or_else(|| "Registration failed".to_string());
            return Err(LensError::Validation(message));
        }
        if !status.is_success() {
            return Err(LensError::Api {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| "Registration failed".to_string()),
            });
        }

        let envelope: UserEnvelope = serde_json::from_str(&body)?;
        match envelope.user {
            Some(user) => Ok(Some(user)),
            None => Err(LensError::Validation(
                envelope.message.unwrap_or_else(|| "Registration failed".to_string()),
            )),
        }
    }

    async fn logout(&self) -> Result<()> {
        let response = self.post(&["user", "logout"], &serde_json::json!({})).await?;
        Self::expect_success(&response)
    }

    async fn check_session(&self) -> Result<()> {
        let url = self.endpoint(&["user", "authenticated_user"])?;
        let response = self.request(Method::GET, url).send().await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(LensError::Auth("Not authenticated".into()))
            }
            _ => Self::expect_success(&response),
        }
    }

    async fn profile(&self) -> Result<ProfileBundle> {
        self.get(&["user", "profile"]).await
    }

    async fn market_overview(&self) -> Result<Vec<CoinSummary>> {
        self.get(&["analytics", "market_overview"]).await
    }

    async fn coin_details(&self, symbol: &str) -> Result<CoinDetail> {
        let symbol = symbol.to_uppercase();
        self.get(&["analytics", "coin_details", &symbol]).await
    }

    async fn compare_coins(&self, query: &ComparisonQuery) -> Result<BTreeMap<String, CoinDetail>> {
        let mut url = self.endpoint(&["analytics", "compare_coins"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(c1) = &query.crypto1 {
                pairs.append_pair("crypto1", c1);
            }
            if let Some(c2) = &query.crypto2 {
                pairs.append_pair("crypto2", c2);
            }
            if let Some(days) = query.days {
                pairs.append_pair("days", &days.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let response = self.request(Method::GET, url).send().await?;
        let envelope: ComparisonEnvelope = Self::handle_response(response).await?;
        Ok(envelope.data)
    }

    async fn analysis_result(&self, symbol: &str) -> Result<Option<AnalysisResult>> {
        let url = self.endpoint(&["analysis", "get-analysis-result", symbol])?;
        let response = self.request(Method::GET, url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_analysis(status, &body)
    }
}

/// Interpret an analysis-result response.
///
/// `success` carries the report (a list means newest first), `no-data` and
/// 204 mean the workflow has nothing yet; anything else is an error.
pub fn parse_analysis(status: u16, body: &str) -> Result<Option<AnalysisResult>> {
    if status == 204 {
        return Ok(None);
    }
    if !(200..300).contains(&status) {
        return Err(LensError::Api {
            status,
            message: error_message(body).unwrap_or_else(|| body.to_string()),
        });
    }

    let envelope: AnalysisEnvelope = serde_json::from_str(body)?;
    match envelope.status.as_str() {
        "success" => {
            let data = match envelope.data {
                Some(serde_json::Value::Array(items)) => items.into_iter().next(),
                other => other,
            };
            match data {
                Some(serde_json::Value::Null) | None => Ok(None),
                Some(value) => Ok(Some(serde_json::from_value(value)?)),
            }
        }
        "no-data" => Ok(None),
        other => Err(LensError::Api {
            status,
            message: envelope
                .message
                .unwrap_or_else(|| format!("Unexpected analysis status: {other}")),
        }),
    }
}

/// Pull a human message out of a JSON error body (`error`, `message` or `detail`)
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(&Config::default()).expect("default config builds a client")
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client();
        assert_eq!(
            client.endpoint(&["user", "authenticated_user"]).unwrap().as_str(),
            "http://localhost:8000/api/user/authenticated_user/"
        );
        assert_eq!(
            client.endpoint(&["analytics", "coin_details", "BTC"]).unwrap().as_str(),
            "http://localhost:8000/api/analytics/coin_details/BTC/"
        );
        // Path segments are encoded, not interpreted
        assert_eq!(
            client.endpoint(&["analysis", "get-analysis-result", "a/b"]).unwrap().as_str(),
            "http://localhost:8000/api/analysis/get-analysis-result/a%2Fb/"
        );
    }

    #[test]
    fn test_parse_analysis_success() {
        let body = r#"{"status": "success", "data": {"prediction": 1, "sentiment_analysis": {"label": "Bullish"}}}"#;
        let result = parse_analysis(200, body).unwrap().unwrap();
        assert_eq!(result.prediction, Some(1));
        assert_eq!(result.sentiment_analysis.unwrap().label.as_deref(), Some("Bullish"));
    }

    #[test]
    fn test_parse_analysis_list_takes_first() {
        let body = r#"{"status": "success", "data": [{"prediction": 0}, {"prediction": 1}]}"#;
        let result = parse_analysis(200, body).unwrap().unwrap();
        assert_eq!(result.prediction, Some(0));
    }

    #[test]
    fn test_parse_analysis_no_data() {
        assert!(parse_analysis(204, "").unwrap().is_none());
        let body = r#"{"status": "no-data", "message": "No analysis data found for btc."}"#;
        assert!(parse_analysis(200, body).unwrap().is_none());
    }

    #[test]
    fn test_parse_analysis_errors() {
        let err = parse_analysis(500, r#"{"status": "error", "message": "boom"}"#).unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("boom"));

        let err = parse_analysis(200, r#"{"status": "error"}"#).unwrap_err();
        assert!(matches!(err, LensError::Api { status: 200, .. }));

        assert!(matches!(parse_analysis(200, "<html>"), Err(LensError::Json(_))));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error": "Invalid credentials"}"#).as_deref(), Some("Invalid credentials"));
        assert_eq!(error_message(r#"{"detail": "Not found."}"#).as_deref(), Some("Not found."));
        assert_eq!(error_message("plain text"), None);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config = Config::default();
        config.api_base_url = "not a url".into();
        assert!(matches!(ApiClient::new(&config), Err(LensError::Config(_))));
    }
}
