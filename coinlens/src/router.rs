//! Client-side routing
//!
//! Maps browser paths to views and runs the session gate in front of the
//! protected ones. Navigation is returned as a value; the shell performs it.

use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use crate::session::{GateDecision, Redirect, SessionContext};

/// Landing page for `/` and unknown paths
pub const HOME_PATH: &str = "/home";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Route {
    Home,
    Dashboard,
    Coin { id: String },
    Compare,
    Login,
    Register,
    Analysis,
    CoinAnalysis { symbol: String },
    Profile,
}

impl Route {
    /// Match a path, ignoring query, fragment and trailing slash.
    /// `None` means "send to home".
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            ["home"] => Route::Home,
            ["dashboard"] => Route::Dashboard,
            ["coin", id] => Route::Coin { id: (*id).to_string() },
            ["compare"] => Route::Compare,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["analysis"] => Route::Analysis,
            ["analysis", symbol] => Route::CoinAnalysis { symbol: (*symbol).to_string() },
            ["profile"] => Route::Profile,
            _ => return None,
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => HOME_PATH.to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Coin { id } => format!("/coin/{id}"),
            Route::Compare => "/compare".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Analysis => "/analysis".to_string(),
            Route::CoinAnalysis { symbol } => format!("/analysis/{symbol}"),
            Route::Profile => "/profile".to_string(),
        }
    }

    /// Views that require a valid session
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::Analysis | Route::CoinAnalysis { .. } | Route::Profile
        )
    }
}

/// What the shell should do for a navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Navigation {
    Render { route: Route },
    Redirect(Redirect),
}

/// Resolves paths, gating protected views through the session
pub struct Navigator {
    session: Rc<SessionContext>,
}

impl Navigator {
    pub fn new(session: Rc<SessionContext>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Rc<SessionContext> {
        &self.session
    }

    pub async fn navigate(&self, path: &str) -> Navigation {
        let Some(route) = Route::parse(path) else {
            debug!(path, "unknown path, redirecting home");
            return Navigation::Redirect(Redirect::to(HOME_PATH));
        };

        if !route.is_protected() {
            return Navigation::Render { route };
        }

        match self.session.guard(path).await {
            GateDecision::Granted => Navigation::Render { route },
            GateDecision::Redirect(redirect) => Navigation::Redirect(redirect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::config::Config;
    use crate::testing::FakeApi;

    fn navigator(api: &Rc<FakeApi>) -> Navigator {
        Navigator::new(Rc::new(SessionContext::new(api.clone(), Rc::new(Config::default()))))
    }

    #[test]
    fn test_parse_routes() {
        assert_eq!(Route::parse("/home"), Some(Route::Home));
        assert_eq!(Route::parse("/dashboard/"), Some(Route::Dashboard));
        assert_eq!(Route::parse("/coin/bitcoin"), Some(Route::Coin { id: "bitcoin".into() }));
        assert_eq!(
            Route::parse("/analysis/btc?tab=news"),
            Some(Route::CoinAnalysis { symbol: "btc".into() })
        );
        assert_eq!(Route::parse("/"), None);
        assert_eq!(Route::parse("/nowhere"), None);
        assert_eq!(Route::parse("/coin"), None);
    }

    #[test]
    fn test_path_round_trip() {
        let route = Route::CoinAnalysis { symbol: "eth".into() };
        assert_eq!(Route::parse(&route.path()), Some(route));
        assert!(Route::Profile.is_protected());
        assert!(!Route::Compare.is_protected());
    }

    #[tokio::test]
    async fn test_public_route_skips_gate() {
        let api = Rc::new(FakeApi::default());
        let nav = navigator(&api);

        assert_eq!(nav.navigate("/compare").await, Navigation::Render { route: Route::Compare });
        assert_eq!(api.count("check_session"), 0);
        assert_eq!(nav.navigate("/").await, Navigation::Redirect(Redirect::to("/home")));
    }

    #[tokio::test]
    async fn test_protected_route_round_trip_through_login() {
        let api = Rc::new(FakeApi::default());
        let nav = navigator(&api);

        let first = nav.navigate("/analysis/btc").await;
        assert_eq!(
            first,
            Navigation::Redirect(Redirect {
                to: "/login".into(),
                from: Some("/analysis/btc".into()),
            })
        );

        let landing = nav
            .session()
            .login(&Credentials::new("ada", "analytical"))
            .await
            .unwrap();
        assert_eq!(landing.to, "/analysis/btc");

        let second = nav.navigate(&landing.to).await;
        assert_eq!(
            second,
            Navigation::Render { route: Route::CoinAnalysis { symbol: "btc".into() } }
        );
        // Every protected navigation asks the server again
        assert_eq!(api.count("check_session"), 2);
    }
}
