//! Mock server.
//!
//! [`MockServer`] ties one simulated client connection together: the RDO
//! matching engine, the capture store for WebSocket and HTTP lookups, the
//! session phase and the phase triggers. Every handler returns a [`Reply`]
//! that serializes to one NDJSON frame, externally tagged by protocol:
//!
//! ```json
//! {"rdo": {"exchange": "logon", "strategy": "key_field", "response": "A0", ...}}
//! {"error": {"code": "no_match", "protocol": "rdo", "message": "..."}}
//! ```

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ScenarioBundle;
use crate::matching::{MatchStrategy, RdoMock};
use crate::observability::metrics;
use crate::protocol::RdoPacket;
use crate::scenarios::{ScenarioVariables, merge_variables, substitute_json, substitute_variables};
use crate::session::{self, MockSession, PhaseTransition, PhaseTrigger, SessionPhase, TriggerResult};
use crate::store::CaptureStore;

// ============================================================================
// Reply frames
// ============================================================================

/// One reply frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    /// A matched RDO command.
    Rdo(RdoReply),
    /// A matched WebSocket request.
    Ws(WsReply),
    /// An HTTP response, captured or 404.
    Http(HttpReply),
    /// Acknowledgement of a control request.
    Control(ControlReply),
    /// A request that could not be answered.
    Error(ErrorReply),
}

impl Reply {
    /// Builds an error frame.
    #[must_use]
    pub fn error(code: ErrorCode, protocol: &'static str, message: impl Into<String>) -> Self {
        Self::Error(ErrorReply {
            code,
            protocol,
            message: message.into(),
        })
    }

    /// Returns `true` for error frames.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Reply to a matched RDO command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RdoReply {
    /// Id of the selected exchange.
    pub exchange: String,
    /// Tier that selected it.
    pub strategy: MatchStrategy,
    /// Response with variables substituted.
    pub response: String,
    /// Pushes with variables substituted.
    pub pushes: Vec<String>,
    /// Session phase after the command.
    pub phase: SessionPhase,
    /// Phase transition the command caused, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<PhaseTransition>,
}

/// Reply to a WebSocket request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WsReply {
    /// Id of the selected exchange.
    pub exchange: String,
    /// Captured responses with variables substituted.
    pub responses: Vec<serde_json::Value>,
}

/// Reply to an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpReply {
    /// Id of the captured exchange; absent on a 404.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    /// Status code.
    pub status: u16,
    /// Content type, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Response body.
    pub body: String,
}

/// Acknowledgement of a control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlReply {
    /// The control command that ran.
    pub command: String,
    /// Session phase afterwards.
    pub phase: SessionPhase,
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No captured exchange answers the request.
    NoMatch,
    /// The raw RDO command could not be tokenized.
    ParseError,
    /// The request frame was not understood.
    InvalidRequest,
    /// The request line exceeded the size limit.
    MessageTooLarge,
}

/// Error frame body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReply {
    /// Error code.
    pub code: ErrorCode,
    /// Protocol family of the failed request.
    pub protocol: &'static str,
    /// Human-readable detail.
    pub message: String,
}

// ============================================================================
// MockServer
// ============================================================================

/// State of one simulated client connection.
#[derive(Debug)]
pub struct MockServer {
    engine: RdoMock,
    store: CaptureStore,
    session: MockSession,
    triggers: Vec<PhaseTrigger>,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    /// Creates a server with no scenarios and the built-in variables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            engine: RdoMock::new(),
            store: CaptureStore::new(),
            session: MockSession::new(),
            triggers: Vec::new(),
        }
    }

    /// Creates a server preloaded with `bundle`.
    #[must_use]
    pub fn from_bundle(bundle: ScenarioBundle) -> Self {
        let mut server = Self::new();
        server.load_bundle(bundle);
        server
    }

    /// Registers every scenario of `bundle` and appends its triggers.
    ///
    /// Fixture variables are merged into the engine defaults, later
    /// bundles winning.
    pub fn load_bundle(&mut self, bundle: ScenarioBundle) {
        let ScenarioBundle {
            rdo,
            ws,
            http,
            variables,
            triggers,
        } = bundle;

        for scenario in rdo {
            self.engine.add_scenario(&scenario);
            self.engine.defaults_mut().extend_from(&scenario.variables);
            self.store.add_rdo_scenario(scenario);
        }
        for scenario in ws {
            self.store.add_ws_scenario(scenario);
        }
        for scenario in http {
            self.store.add_http_scenario(scenario);
        }
        self.engine.defaults_mut().extend_from(&variables);
        self.triggers.extend(triggers);

        info!(
            rdo = self.engine.exchanges().len(),
            ws = self.store.ws_exchange_count(),
            triggers = self.triggers.len(),
            "scenarios loaded"
        );
    }

    /// Sets connection-wide variables that override fixture defaults.
    pub fn set_variables(&mut self, vars: &ScenarioVariables) {
        self.engine.defaults_mut().extend_from(vars);
    }

    /// The matching engine.
    #[must_use]
    pub const fn engine(&self) -> &RdoMock {
        &self.engine
    }

    /// The capture store.
    #[must_use]
    pub const fn store(&self) -> &CaptureStore {
        &self.store
    }

    /// The current session.
    #[must_use]
    pub const fn session(&self) -> &MockSession {
        &self.session
    }

    /// Answers a raw RDO command.
    pub fn handle_rdo(&mut self, raw: &str, overrides: Option<&ScenarioVariables>) -> Reply {
        let started = Instant::now();
        metrics::record_request("rdo");

        let reply = match RdoPacket::parse(raw) {
            Err(e) => {
                debug!(command = raw, error = %e, "rejecting unparseable command");
                metrics::record_error("protocol");
                Reply::error(ErrorCode::ParseError, "rdo", format!("{e}: {raw:?}"))
            }
            Ok(packet) => match self.engine.match_packet(&packet, overrides) {
                None => Reply::error(
                    ErrorCode::NoMatch,
                    "rdo",
                    format!("no captured exchange for '{packet}'"),
                ),
                Some(matched) => {
                    let transition = self.apply_triggers(&packet);
                    Reply::Rdo(RdoReply {
                        exchange: matched.exchange.id,
                        strategy: matched.strategy,
                        response: matched.response,
                        pushes: matched.pushes,
                        phase: self.session.phase(),
                        transition,
                    })
                }
            },
        };

        metrics::record_request_duration("rdo", started.elapsed());
        reply
    }

    /// Answers a WebSocket request of `request_type` with the first captured
    /// exchange of that type.
    pub fn handle_ws(&mut self, request_type: &str, overrides: Option<&ScenarioVariables>) -> Reply {
        metrics::record_request("ws");

        let Some(exchange) = self.store.exchanges_by_type(request_type).into_iter().next() else {
            metrics::record_miss("ws");
            return Reply::error(
                ErrorCode::NoMatch,
                "ws",
                format!("no captured exchange for type '{request_type}'"),
            );
        };

        let vars = merge_variables(self.engine.defaults(), overrides);
        Reply::Ws(WsReply {
            exchange: exchange.id.clone(),
            responses: exchange
                .responses
                .iter()
                .map(|r| substitute_json(r, &vars))
                .collect(),
        })
    }

    /// Answers an HTTP request, falling back to a 404 response.
    pub fn handle_http(&mut self, method: &str, url: &str) -> Reply {
        metrics::record_request("http");

        let Some(exchange) = self.store.http_exchange_for_url(method, url) else {
            debug!(method, url, "no captured http exchange");
            metrics::record_miss("http");
            return Reply::Http(HttpReply {
                exchange: None,
                status: 404,
                content_type: Some("text/plain".to_string()),
                body: "Not Found".to_string(),
            });
        };

        Reply::Http(HttpReply {
            exchange: Some(exchange.id.clone()),
            status: exchange.status,
            content_type: exchange.content_type.clone(),
            body: substitute_variables(&exchange.body, self.engine.defaults()),
        })
    }

    /// Clears consumption and starts a fresh session, keeping scenarios.
    pub fn reset(&mut self) -> Reply {
        self.engine.reset();
        self.session = MockSession::new();
        info!("session reset");
        Reply::Control(ControlReply {
            command: "reset".to_string(),
            phase: self.session.phase(),
        })
    }

    fn apply_triggers(&mut self, packet: &RdoPacket) -> Option<PhaseTransition> {
        match session::evaluate(&self.triggers, &mut self.session, packet) {
            TriggerResult::Fired(transition) => {
                info!(from = %transition.from, to = %transition.to, "session phase advanced");
                metrics::record_phase_transition(transition.from, transition.to);
                Some(transition)
            }
            TriggerResult::NotMet => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::{
        HttpExchange, HttpScenario, RdoExchange, RdoMatchKey, RdoScenario, WsCaptureExchange,
        WsScenario,
    };
    use serde_json::json;

    fn bundle() -> ScenarioBundle {
        let mut variables = ScenarioVariables::new();
        variables.insert("username", "alice");

        ScenarioBundle {
            rdo: vec![
                RdoScenario::new("login")
                    .with_exchange(RdoExchange::new(
                        "logon",
                        RdoMatchKey::member("Logon"),
                        "A0 res=\"%{{username}}\"",
                    ))
                    .with_exchange(
                        RdoExchange::new("world", RdoMatchKey::member("WorldLogon"), "A1")
                            .with_push("C sel 1 call RefreshWorld \"%{{worldName}}\""),
                    ),
            ],
            ws: vec![WsScenario {
                name: "ws".to_string(),
                description: None,
                exchanges: vec![WsCaptureExchange {
                    id: "hello".to_string(),
                    request: json!({"type": "hello"}),
                    responses: vec![json!({"type": "welcome", "user": "{{username}}"})],
                }],
            }],
            http: vec![HttpScenario {
                name: "web".to_string(),
                exchanges: vec![HttpExchange {
                    id: "news".to_string(),
                    method: "GET".to_string(),
                    url_pattern: "/news.asp".to_string(),
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    body: "<p>{{worldName}}</p>".to_string(),
                }],
            }],
            variables,
            triggers: vec![
                PhaseTrigger::new("Logon", SessionPhase::DirectoryConnected).capturing(0),
                PhaseTrigger::new("WorldLogon", SessionPhase::WorldConnected).capturing(0),
            ],
        }
    }

    #[test]
    fn test_rdo_reply_substitutes_and_advances() {
        let mut server = MockServer::from_bundle(bundle());
        let Reply::Rdo(reply) = server.handle_rdo(r#"C 1 call Logon "%alice""#, None) else {
            panic!("expected rdo reply");
        };
        assert_eq!(reply.exchange, "logon");
        assert_eq!(reply.response, "A0 res=\"%alice\"");
        assert_eq!(reply.phase, SessionPhase::DirectoryConnected);
        assert_eq!(
            reply.transition.map(|t| t.to),
            Some(SessionPhase::DirectoryConnected)
        );
        assert_eq!(server.session().username(), Some("alice"));
    }

    #[test]
    fn test_overrides_apply_to_pushes() {
        let mut server = MockServer::from_bundle(bundle());
        let mut overrides = ScenarioVariables::new();
        overrides.insert("worldName", "Zyrane");

        let Reply::Rdo(reply) = server.handle_rdo("C 2 call WorldLogon", Some(&overrides)) else {
            panic!("expected rdo reply");
        };
        assert_eq!(reply.pushes, ["C sel 1 call RefreshWorld \"%Zyrane\""]);
        // out of order: phase stays put
        assert!(reply.transition.is_none());
        assert_eq!(reply.phase, SessionPhase::Disconnected);
    }

    #[test]
    fn test_rdo_no_match_frame() {
        let mut server = MockServer::from_bundle(bundle());
        let reply = server.handle_rdo("C 1 call Unknown", None);
        let frame = serde_json::to_value(&reply).unwrap();
        assert_eq!(frame["error"]["code"], "no_match");
        assert_eq!(frame["error"]["protocol"], "rdo");
    }

    #[test]
    fn test_rdo_parse_error_frame() {
        let mut server = MockServer::from_bundle(bundle());
        let frame = serde_json::to_value(server.handle_rdo("C 1 call \"open", None)).unwrap();
        assert_eq!(frame["error"]["code"], "parse_error");
    }

    #[test]
    fn test_ws_reply() {
        let mut server = MockServer::from_bundle(bundle());
        let frame = serde_json::to_value(server.handle_ws("hello", None)).unwrap();
        assert_eq!(frame["ws"]["exchange"], "hello");
        assert_eq!(frame["ws"]["responses"][0]["user"], "alice");

        assert!(server.handle_ws("goodbye", None).is_error());
    }

    #[test]
    fn test_http_reply_and_404() {
        let mut server = MockServer::from_bundle(bundle());
        let Reply::Http(hit) = server.handle_http("get", "/game/NEWS.asp?lang=en") else {
            panic!("expected http reply");
        };
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, "<p>Shamba</p>");

        let Reply::Http(miss) = server.handle_http("GET", "/missing") else {
            panic!("expected http reply");
        };
        assert_eq!(miss.status, 404);
        assert!(miss.exchange.is_none());
    }

    #[test]
    fn test_reset_restarts_session_and_consumption() {
        let mut server = MockServer::from_bundle(bundle());
        server.handle_rdo("C 1 call Logon \"bob\"", None);
        assert_eq!(server.engine().consumption_count("logon"), 1);

        let frame = serde_json::to_value(server.reset()).unwrap();
        assert_eq!(frame["control"]["phase"], "disconnected");
        assert_eq!(server.engine().consumption_count("logon"), 0);
        assert!(server.session().username().is_none());
    }

    #[test]
    fn test_set_variables_override_fixture() {
        let mut server = MockServer::from_bundle(bundle());
        let mut vars = ScenarioVariables::new();
        vars.insert("username", "carol");
        server.set_variables(&vars);

        let Reply::Rdo(reply) = server.handle_rdo("C 1 call Logon", None) else {
            panic!("expected rdo reply");
        };
        assert_eq!(reply.response, "A0 res=\"%carol\"");
    }
}
