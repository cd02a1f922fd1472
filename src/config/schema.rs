//! Fixture file schema.
//!
//! A fixture file describes one captured session across the three protocol
//! families, plus the variables and phase triggers that go with it:
//!
//! ```yaml
//! name: login-flow
//! variables:
//!   username: alice
//! phase_triggers:
//!   - member: Logon
//!     phase: directory_connected
//!     capture_arg: 0
//! rdo:
//!   - id: logon
//!     match: { verb: C, action: call, member: Logon }
//!     response: 'A0 res="%{{username}}"'
//! ws:
//!   - id: hello
//!     request: { type: hello }
//!     responses: [{ type: welcome, user: "{{username}}" }]
//! http:
//!   - id: news
//!     url: /news.asp
//!     body: "<html/>"
//! ```

use serde::{Deserialize, Serialize};

use crate::scenarios::{
    HttpExchange, HttpScenario, RdoExchange, RdoScenario, ScenarioVariables, WsCaptureExchange,
    WsScenario,
};
use crate::session::PhaseTrigger;

/// Top-level fixture file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureFile {
    /// Scenario name shared by every protocol section.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Variable defaults for this fixture.
    #[serde(default, skip_serializing_if = "ScenarioVariables::is_empty")]
    pub variables: ScenarioVariables,

    /// Phase triggers, validated before conversion.
    #[serde(default, alias = "phaseTriggers", skip_serializing_if = "Vec::is_empty")]
    pub phase_triggers: Vec<TriggerDef>,

    /// RDO exchanges in capture order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rdo: Vec<RdoExchange>,

    /// WebSocket exchanges in capture order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ws: Vec<WsCaptureExchange>,

    /// HTTP exchanges in capture order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http: Vec<HttpExchange>,
}

/// Phase trigger as written in a fixture.
///
/// `phase` stays a string here so an unknown name is reported by the
/// validator with its location instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerDef {
    /// Member name that fires the trigger.
    pub member: String,

    /// Name of the phase entered.
    pub phase: String,

    /// Argument to capture into the session.
    #[serde(default, alias = "captureArg", skip_serializing_if = "Option::is_none")]
    pub capture_arg: Option<usize>,
}

impl TriggerDef {
    /// Converts into a [`PhaseTrigger`], or `None` for an unknown phase.
    #[must_use]
    pub fn to_trigger(&self) -> Option<PhaseTrigger> {
        let phase = self.phase.parse().ok()?;
        Some(PhaseTrigger {
            member: self.member.clone(),
            phase,
            capture_arg: self.capture_arg,
        })
    }
}

/// Everything loaded from one or more fixture files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioBundle {
    /// RDO scenarios, one per fixture with an `rdo` section.
    pub rdo: Vec<RdoScenario>,
    /// WebSocket scenarios.
    pub ws: Vec<WsScenario>,
    /// HTTP scenarios.
    pub http: Vec<HttpScenario>,
    /// Variables from every fixture, later files winning.
    pub variables: ScenarioVariables,
    /// Phase triggers in declaration order.
    pub triggers: Vec<PhaseTrigger>,
}

impl ScenarioBundle {
    /// Splits a validated fixture into per-protocol scenarios.
    ///
    /// Triggers with an unknown phase are dropped; the validator rejects
    /// them before this is reached.
    #[must_use]
    pub fn from_fixture(fixture: FixtureFile) -> Self {
        let FixtureFile {
            name,
            description,
            variables,
            phase_triggers,
            rdo,
            ws,
            http,
        } = fixture;

        let mut bundle = Self {
            triggers: phase_triggers.iter().filter_map(TriggerDef::to_trigger).collect(),
            ..Self::default()
        };

        if !rdo.is_empty() {
            bundle.rdo.push(RdoScenario {
                name: name.clone(),
                description: description.clone(),
                variables: variables.clone(),
                exchanges: rdo,
            });
        }
        if !ws.is_empty() {
            bundle.ws.push(WsScenario {
                name: name.clone(),
                description,
                exchanges: ws,
            });
        }
        if !http.is_empty() {
            bundle.http.push(HttpScenario {
                name,
                exchanges: http,
            });
        }
        bundle.variables = variables;
        bundle
    }

    /// Appends `other`, whose variables override ours per key.
    pub fn merge(&mut self, other: Self) {
        self.rdo.extend(other.rdo);
        self.ws.extend(other.ws);
        self.http.extend(other.http);
        self.variables.extend_from(&other.variables);
        self.triggers.extend(other.triggers);
    }

    /// Total exchange count across protocols.
    #[must_use]
    pub fn exchange_count(&self) -> usize {
        self.rdo.iter().map(|s| s.exchanges.len()).sum::<usize>()
            + self.ws.iter().map(|s| s.exchanges.len()).sum::<usize>()
            + self.http.iter().map(|s| s.exchanges.len()).sum::<usize>()
    }
}
