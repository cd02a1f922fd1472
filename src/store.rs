//! Capture store.
//!
//! Holds loaded scenarios for the three protocol families and answers simple
//! lookups. It deliberately has no RDO matching logic; that lives in
//! [`RdoMock`](crate::matching::RdoMock).

use std::sync::Arc;

use tracing::trace;

use crate::scenarios::{HttpExchange, HttpScenario, RdoScenario, WsCaptureExchange, WsScenario};

/// In-memory repository of captured scenarios.
///
/// All collections are append-only; scenarios are shared behind `Arc`, so the
/// accessors hand out cheap shallow copies.
#[derive(Debug, Default)]
pub struct CaptureStore {
    ws: Vec<Arc<WsScenario>>,
    rdo: Vec<Arc<RdoScenario>>,
    http: Vec<Arc<HttpScenario>>,
}

impl CaptureStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a WebSocket scenario.
    pub fn add_ws_scenario(&mut self, scenario: impl Into<Arc<WsScenario>>) {
        self.ws.push(scenario.into());
    }

    /// Appends an RDO scenario.
    pub fn add_rdo_scenario(&mut self, scenario: impl Into<Arc<RdoScenario>>) {
        self.rdo.push(scenario.into());
    }

    /// Appends an HTTP scenario.
    pub fn add_http_scenario(&mut self, scenario: impl Into<Arc<HttpScenario>>) {
        self.http.push(scenario.into());
    }

    /// Returns all WebSocket scenarios.
    #[must_use]
    pub fn ws_scenarios(&self) -> Vec<Arc<WsScenario>> {
        self.ws.clone()
    }

    /// Returns all RDO scenarios.
    #[must_use]
    pub fn rdo_scenarios(&self) -> Vec<Arc<RdoScenario>> {
        self.rdo.clone()
    }

    /// Returns all HTTP scenarios.
    #[must_use]
    pub fn http_scenarios(&self) -> Vec<Arc<HttpScenario>> {
        self.http.clone()
    }

    /// Returns every WebSocket exchange whose request `type` equals
    /// `request_type`, in scenario-then-exchange order.
    #[must_use]
    pub fn exchanges_by_type(&self, request_type: &str) -> Vec<&WsCaptureExchange> {
        self.ws
            .iter()
            .flat_map(|scenario| scenario.exchanges.iter())
            .filter(|exchange| exchange.request_type() == Some(request_type))
            .collect()
    }

    /// Finds the HTTP exchange answering `method` on `url_path`.
    ///
    /// The method compares case-insensitively. The path is lower-cased and
    /// its query string dropped, then matched by equality or by ending with
    /// the stored pattern, so patterns may omit leading host segments.
    #[must_use]
    pub fn http_exchange_for_url(&self, method: &str, url_path: &str) -> Option<&HttpExchange> {
        let path = normalize_path(url_path);
        let found = self
            .http
            .iter()
            .flat_map(|scenario| scenario.exchanges.iter())
            .find(|exchange| {
                if !exchange.method.eq_ignore_ascii_case(method) {
                    return false;
                }
                let pattern = exchange.url_pattern.to_ascii_lowercase();
                path == pattern || path.ends_with(&pattern)
            });
        trace!(method, path = %path, found = found.is_some(), "http lookup");
        found
    }

    /// Total number of WebSocket exchanges across all scenarios.
    #[must_use]
    pub fn ws_exchange_count(&self) -> usize {
        self.ws.iter().map(|s| s.exchanges.len()).sum()
    }

    /// Drops every scenario of every protocol.
    pub fn clear(&mut self) {
        self.ws.clear();
        self.rdo.clear();
        self.http.clear();
    }
}

fn normalize_path(url_path: &str) -> String {
    let without_query = url_path.split_once('?').map_or(url_path, |(path, _)| path);
    without_query.to_ascii_lowercase()
}
