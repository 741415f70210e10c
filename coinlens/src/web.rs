//! Browser entry point
//!
//! `WebApp` is what the JavaScript shell talks to. Every async method returns
//! a `Promise` resolving to plain JSON; errors reject with a user-facing
//! message.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use futures::StreamExt;
use js_sys::{Function, JSON, Object, Promise, Reflect};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise, spawn_local};

use crate::aggregate::ViewModelBuilder;
use crate::auth::{Credentials, RegistrationForm};
use crate::client::{ApiClient, RemoteApi};
use crate::config::Config;
use crate::dashboard::DashboardState;
use crate::error::{LensError, Result};
use crate::router::Navigator;
use crate::session::SessionContext;

fn js_error(err: &LensError) -> JsValue {
    js_sys::Error::new(&err.user_message()).into()
}

fn to_js<T: Serialize>(value: &T) -> std::result::Result<JsValue, JsValue> {
    let text = serde_json::to_string(value).map_err(|e| js_error(&LensError::Json(e)))?;
    JSON::parse(&text)
}

fn from_js<T: serde::de::DeserializeOwned>(value: &JsValue) -> Result<T> {
    let text: String = JSON::stringify(value)
        .map_err(|_| LensError::Validation("Value is not JSON".into()))?
        .into();
    Ok(serde_json::from_str(&text)?)
}

/// Resolves after `duration` through the global `setTimeout`
async fn sleep(duration: Duration) {
    let timer = Promise::new(&mut |resolve, _reject| {
        let global = js_sys::global();
        let set_timeout = Reflect::get(&global, &JsValue::from_str("setTimeout"))
            .and_then(|f| f.dyn_into::<Function>());
        if let Ok(set_timeout) = set_timeout {
            let millis = JsValue::from_f64(duration.as_millis() as f64);
            let _ = set_timeout.call2(&global, &resolve, &millis);
        }
    });
    let _ = JsFuture::from(timer).await;
}

fn dashboard_view(state: &DashboardState) -> serde_json::Value {
    serde_json::json!({
        "coins": state.visible(),
        "search": state.search(),
        "page": state.page(),
        "page_count": state.page_count(),
        "shows_pagination": state.shows_pagination(),
        "loading": state.loading,
    })
}

/// Flatten a JS config object (`{COINLENS_API_URL: "...", ...}`) into strings
fn config_entries(config: &JsValue) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    let Some(object) = config.dyn_ref::<Object>() else {
        return entries;
    };
    for key in Object::keys(object).iter() {
        let Some(name) = key.as_string() else { continue };
        let Ok(value) = Reflect::get(object, &key) else { continue };
        let text = value
            .as_string()
            .or_else(|| value.as_f64().map(|n| n.to_string()))
            .or_else(|| value.as_bool().map(|b| b.to_string()));
        if let Some(text) = text {
            entries.insert(name, text);
        }
    }
    entries
}

#[wasm_bindgen]
pub struct WebApp {
    api: Rc<dyn RemoteApi>,
    config: Rc<Config>,
    dashboard: Rc<RefCell<DashboardState>>,
    session: Rc<SessionContext>,
    navigator: Rc<Navigator>,
    view: RefCell<Option<Rc<ViewModelBuilder>>>,
}

#[wasm_bindgen]
impl WebApp {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> std::result::Result<WebApp, JsValue> {
        console_error_panic_hook::set_once();

        let entries = config_entries(&config);
        let config = Config::from_lookup(|key| entries.get(key).cloned());
        config.validate().map_err(|e| JsValue::from_str(&e.to_string()))?;
        crate::logging::init(&config);

        let api: Rc<dyn RemoteApi> =
            Rc::new(ApiClient::new(&config).map_err(|e| JsValue::from_str(&e.to_string()))?);
        tracing::info!(
            environment = %config.environment,
            api = %config.api_base_url,
            "web app started"
        );
        let config = Rc::new(config);
        let session = Rc::new(SessionContext::new(api.clone(), config.clone()));
        let navigator = Rc::new(Navigator::new(session.clone()));
        let dashboard = Rc::new(RefCell::new(DashboardState::from_config(&config)));

        Ok(Self {
            api,
            config,
            dashboard,
            session,
            navigator,
            view: RefCell::new(None),
        })
    }

    /// Start a new view; fetches still running for the previous one are aborted
    pub fn mount_view(&self, label: String) {
        let label: &'static str = match label.as_str() {
            "analysis" => "analysis",
            "coin" => "coin",
            "compare" => "compare",
            "coin_analysis" => "coin_analysis",
            "dashboard" => "dashboard",
            _ => "view",
        };
        let builder = Rc::new(ViewModelBuilder::with_config(self.api.clone(), &self.config, label));
        if let Some(previous) = self.view.replace(Some(builder)) {
            previous.cancel();
        }
    }

    /// Abort whatever the current view still has in flight
    pub fn unmount_view(&self) {
        if let Some(view) = self.view.take() {
            view.cancel();
        }
    }

    fn builder(&self) -> Rc<ViewModelBuilder> {
        self.view
            .borrow_mut()
            .get_or_insert_with(|| {
                Rc::new(ViewModelBuilder::with_config(self.api.clone(), &self.config, "view"))
            })
            .clone()
    }

    pub fn session(&self) -> std::result::Result<JsValue, JsValue> {
        to_js(&self.session.snapshot())
    }

    pub fn clear_error(&self) {
        self.session.clear_error();
    }

    pub fn navigate(&self, path: String) -> Promise {
        let navigator = self.navigator.clone();
        future_to_promise(async move { to_js(&navigator.navigate(&path).await) })
    }

    pub fn login(&self, username: String, password: String) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            let redirect = session
                .login(&Credentials::new(username, password))
                .await
                .map_err(|e| js_error(&e))?;
            to_js(&redirect)
        })
    }

    pub fn logout(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move { to_js(&session.logout().await) })
    }

    pub fn register(&self, form: JsValue) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            let form: RegistrationForm = from_js(&form).map_err(|e| js_error(&e))?;
            let redirect = session.register(&form).await.map_err(|e| js_error(&e))?;
            to_js(&redirect)
        })
    }

    pub fn analysis_list(&self, symbols: Vec<String>) -> Promise {
        let builder = self.builder();
        future_to_promise(async move { to_js(&builder.build_analysis_list(&symbols).await) })
    }

    pub fn analysis_overview(&self) -> Promise {
        let builder = self.builder();
        future_to_promise(async move { to_js(&builder.build_analysis_overview().await) })
    }

    pub fn coin_detail(&self, symbol: String) -> Promise {
        let builder = self.builder();
        future_to_promise(async move { to_js(&builder.build_coin_detail(&symbol).await) })
    }

    pub fn comparison(&self) -> Promise {
        let builder = self.builder();
        future_to_promise(async move { to_js(&builder.build_comparison().await) })
    }

    pub fn coin_analysis(&self, symbol: String) -> Promise {
        let builder = self.builder();
        future_to_promise(async move {
            let view = builder.build_coin_analysis(&symbol).await.map_err(|e| js_error(&e))?;
            to_js(&view)
        })
    }

    /// Push a fresh coin analysis to `on_update(err, view)` every configured
    /// interval until the view unmounts
    pub fn watch_coin_analysis(&self, symbol: String, on_update: Function) {
        let builder = self.builder();
        spawn_local(async move {
            let updates = builder.watch_coin_analysis(&symbol, sleep);
            futures::pin_mut!(updates);
            while let Some(update) = updates.next().await {
                let delivered = match update {
                    Ok(view) => to_js(&view)
                        .and_then(|view| on_update.call2(&JsValue::NULL, &JsValue::NULL, &view)),
                    Err(e) => on_update.call2(&JsValue::NULL, &js_error(&e), &JsValue::UNDEFINED),
                };
                if delivered.is_err() {
                    tracing::warn!(symbol = %symbol, "analysis update callback failed");
                }
            }
        });
    }

    /// Load the market overview into the dashboard
    pub fn load_dashboard(&self) -> Promise {
        let api = self.api.clone();
        let builder = self.builder();
        let dashboard = self.dashboard.clone();
        future_to_promise(async move {
            let mut state = dashboard.borrow().clone();
            state.load(api.as_ref(), builder.scope()).await;
            let view = dashboard_view(&state);
            *dashboard.borrow_mut() = state;
            to_js(&view)
        })
    }

    pub fn dashboard_search(&self, query: String) -> std::result::Result<JsValue, JsValue> {
        let mut state = self.dashboard.borrow_mut();
        state.set_search(query);
        to_js(&dashboard_view(&state))
    }

    pub fn dashboard_page(&self, page: usize) -> std::result::Result<JsValue, JsValue> {
        let mut state = self.dashboard.borrow_mut();
        state.set_page(page);
        to_js(&dashboard_view(&state))
    }

    pub fn profile(&self) -> Promise {
        let api = self.api.clone();
        future_to_promise(async move {
            let bundle = crate::profile::fetch_profile(api.as_ref())
                .await
                .map_err(|e| js_error(&e))?;
            to_js(&serde_json::json!({
                "profile": bundle,
                "recent_activity": crate::profile::recent_activity(&bundle),
            }))
        })
    }

    pub fn compact_number(value: f64) -> String {
        crate::format::compact_number(value)
    }
}
