//! Captured scenario types.
//!
//! A scenario is one captured session: an ordered list of exchanges for a
//! single protocol family. RDO scenarios feed the matching engine; WS and
//! HTTP scenarios are only held by the [`CaptureStore`](crate::store::CaptureStore)
//! for simple lookups.
//!
//! Every type deserializes from fixture files. Field aliases accept the
//! camelCase spelling used by captures recorded in the browser.

pub mod variables;

use serde::{Deserialize, Serialize};

use crate::protocol::WILDCARD;

pub use variables::{ScenarioVariables, merge_variables, substitute_json, substitute_variables};

// ============================================================================
// RDO
// ============================================================================

/// Pattern an RDO exchange is matched against.
///
/// Every field is optional; an omitted field matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RdoMatchKey {
    /// Command verb.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,

    /// Target object id, literal or `*`.
    #[serde(
        default,
        alias = "targetId",
        alias = "target",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_id: Option<String>,

    /// Action token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Member (method or property) name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,

    /// Leading arguments to pin, `*` entries match anything.
    #[serde(
        default,
        alias = "argsPattern",
        alias = "args",
        skip_serializing_if = "Option::is_none"
    )]
    pub args_pattern: Option<Vec<String>>,
}

impl RdoMatchKey {
    /// Key matching on member name only.
    #[must_use]
    pub fn member(member: impl Into<String>) -> Self {
        Self {
            member: Some(member.into()),
            ..Self::default()
        }
    }

    /// Key with all five fields concretely specified.
    #[must_use]
    pub fn exact(
        verb: impl Into<String>,
        target_id: impl Into<String>,
        action: impl Into<String>,
        member: impl Into<String>,
        args: &[&str],
    ) -> Self {
        Self {
            verb: Some(verb.into()),
            target_id: Some(target_id.into()),
            action: Some(action.into()),
            member: Some(member.into()),
            args_pattern: Some(args.iter().map(|a| (*a).to_string()).collect()),
        }
    }

    /// Returns `true` when every field is present and the target is a
    /// literal id rather than a wildcard.
    #[must_use]
    pub fn is_fully_specified(&self) -> bool {
        self.verb.is_some()
            && self.action.is_some()
            && self.member.is_some()
            && self.args_pattern.is_some()
            && self.target_id.as_deref().is_some_and(|t| t != WILDCARD)
    }

    /// Returns `true` when no field constrains the match at all.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.verb.is_none()
            && self.action.is_none()
            && self.member.is_none()
            && self.args_pattern.is_none()
            && self.target_id.as_deref().is_none_or(|t| t == WILDCARD)
    }
}

/// One recorded RDO request → response (+ pushes) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RdoExchange {
    /// Unique exchange id.
    pub id: String,

    /// Pattern for direct matching; absent for exchanges only reachable as
    /// pushes.
    #[serde(
        default,
        alias = "matchKeys",
        alias = "match",
        skip_serializing_if = "Option::is_none"
    )]
    pub match_keys: Option<RdoMatchKey>,

    /// Response template.
    #[serde(default)]
    pub response: String,

    /// Server-initiated push templates sent along with the response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pushes: Vec<String>,

    /// Never a direct match target.
    #[serde(default, alias = "pushOnly")]
    pub push_only: bool,
}

impl RdoExchange {
    /// Creates a directly matchable exchange with no pushes.
    #[must_use]
    pub fn new(id: impl Into<String>, match_keys: RdoMatchKey, response: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            match_keys: Some(match_keys),
            response: response.into(),
            pushes: Vec::new(),
            push_only: false,
        }
    }

    /// Adds a push template.
    #[must_use]
    pub fn with_push(mut self, push: impl Into<String>) -> Self {
        self.pushes.push(push.into());
        self
    }

    /// Marks the exchange as push-only.
    #[must_use]
    pub const fn push_only(mut self) -> Self {
        self.push_only = true;
        self
    }

    /// Returns the match keys when this exchange may be matched directly.
    #[must_use]
    pub fn matchable_keys(&self) -> Option<&RdoMatchKey> {
        if self.push_only {
            None
        } else {
            self.match_keys.as_ref()
        }
    }
}

/// Named, ordered collection of RDO exchanges from one captured session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdoScenario {
    /// Scenario name.
    pub name: String,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Scenario-level variable defaults.
    #[serde(default, skip_serializing_if = "ScenarioVariables::is_empty")]
    pub variables: ScenarioVariables,

    /// Exchanges in capture order.
    #[serde(default)]
    pub exchanges: Vec<RdoExchange>,
}

impl RdoScenario {
    /// Creates an empty scenario.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends an exchange.
    #[must_use]
    pub fn with_exchange(mut self, exchange: RdoExchange) -> Self {
        self.exchanges.push(exchange);
        self
    }
}

// ============================================================================
// WebSocket
// ============================================================================

/// One recorded WebSocket JSON request and the messages sent back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WsCaptureExchange {
    /// Unique exchange id.
    pub id: String,

    /// Captured request message; its `type` field keys lookups.
    pub request: serde_json::Value,

    /// Messages sent back, in order.
    #[serde(default)]
    pub responses: Vec<serde_json::Value>,
}

impl WsCaptureExchange {
    /// Returns the request's `type` field.
    #[must_use]
    pub fn request_type(&self) -> Option<&str> {
        self.request.get("type").and_then(serde_json::Value::as_str)
    }
}

/// Named collection of WebSocket exchanges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WsScenario {
    /// Scenario name.
    pub name: String,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Exchanges in capture order.
    #[serde(default)]
    pub exchanges: Vec<WsCaptureExchange>,
}

// ============================================================================
// HTTP
// ============================================================================

fn default_method() -> String {
    "GET".to_string()
}

const fn default_status() -> u16 {
    200
}

/// One recorded HTTP request/response pair.
///
/// HTTP captures are page-oriented: one response per URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpExchange {
    /// Unique exchange id.
    pub id: String,

    /// Request method.
    #[serde(default = "default_method")]
    pub method: String,

    /// Path, or trailing portion of a path, this exchange answers.
    #[serde(alias = "url", alias = "urlPattern")]
    pub url_pattern: String,

    /// Response status code.
    #[serde(default = "default_status")]
    pub status: u16,

    /// Response content type.
    #[serde(
        default,
        alias = "contentType",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<String>,

    /// Response body.
    #[serde(default)]
    pub body: String,
}

/// Named collection of HTTP exchanges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpScenario {
    /// Scenario name.
    pub name: String,

    /// Exchanges in capture order.
    #[serde(default)]
    pub exchanges: Vec<HttpExchange>,
}
