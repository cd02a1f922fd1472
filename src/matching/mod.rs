//! RDO matching engine.
//!
//! [`RdoMock`] owns the registered exchange pool and the consumption
//! bookkeeping of one simulated session. For every inbound command it runs
//! the tiers in [`strategy::STRATEGIES`] and builds the response bundle of
//! the winning exchange.
//!
//! # Concurrency
//!
//! The engine is synchronous and holds no locks. Matching and recording
//! consumption are two steps, so a shared instance must be driven from a
//! single task (the stdio server does this) or behind an external mutex.

pub mod strategy;

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::observability::metrics;
use crate::protocol::RdoPacket;
use crate::scenarios::{
    RdoExchange, RdoScenario, ScenarioVariables, merge_variables, substitute_variables,
};

pub use strategy::{MatchStrategy, STRATEGIES, StrategyFn, args_match};

/// The result of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdoMatch {
    /// The exchange that was selected.
    pub exchange: RdoExchange,
    /// Response template with variables substituted.
    pub response: String,
    /// Push templates with variables substituted.
    pub pushes: Vec<String>,
    /// Tier that selected the exchange.
    pub strategy: MatchStrategy,
}

/// Record-replay matcher for RDO commands.
///
/// State is instance-scoped: every simulated session constructs its own
/// matcher.
#[derive(Debug, Default)]
pub struct RdoMock {
    exchanges: Vec<RdoExchange>,
    consumed: HashSet<String>,
    consumption_count: HashMap<String, u64>,
    defaults: ScenarioVariables,
}

impl RdoMock {
    /// Creates an empty matcher with the built-in default variables.
    #[must_use]
    pub fn new() -> Self {
        Self::with_defaults(ScenarioVariables::builtin())
    }

    /// Creates an empty matcher with the given default variables.
    #[must_use]
    pub fn with_defaults(defaults: ScenarioVariables) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    /// Registers every exchange of `scenario`, in order.
    pub fn add_scenario(&mut self, scenario: &RdoScenario) {
        debug!(
            scenario = %scenario.name,
            exchanges = scenario.exchanges.len(),
            "rdo scenario registered"
        );
        self.exchanges.extend(scenario.exchanges.iter().cloned());
    }

    /// Registers a single exchange after those already loaded.
    pub fn add_exchange(&mut self, exchange: RdoExchange) {
        self.exchanges.push(exchange);
    }

    /// Returns the registered exchanges in registration order.
    #[must_use]
    pub fn exchanges(&self) -> &[RdoExchange] {
        &self.exchanges
    }

    /// Returns the default variables.
    #[must_use]
    pub const fn defaults(&self) -> &ScenarioVariables {
        &self.defaults
    }

    /// Returns the default variables for modification.
    pub const fn defaults_mut(&mut self) -> &mut ScenarioVariables {
        &mut self.defaults
    }

    /// Parses `raw` and matches it.
    ///
    /// A command the parser rejects is logged and reported as no match.
    pub fn match_command(
        &mut self,
        raw: &str,
        overrides: Option<&ScenarioVariables>,
    ) -> Option<RdoMatch> {
        match RdoPacket::parse(raw) {
            Ok(packet) => self.match_packet(&packet, overrides),
            Err(e) => {
                warn!(command = raw, error = %e, "unparseable rdo command");
                metrics::record_miss("rdo");
                None
            }
        }
    }

    /// Matches an already-parsed packet.
    ///
    /// On success the exchange is marked consumed, its counter incremented,
    /// and its templates substituted against the defaults merged with
    /// `overrides`. Returns `None` when no tier selects an exchange.
    pub fn match_packet(
        &mut self,
        packet: &RdoPacket,
        overrides: Option<&ScenarioVariables>,
    ) -> Option<RdoMatch> {
        let Some((strategy, index)) = STRATEGIES.iter().find_map(|(strategy, tier)| {
            tier(&self.exchanges, &self.consumed, packet).map(|index| (*strategy, index))
        }) else {
            debug!(command = %packet, "no rdo exchange matched");
            metrics::record_miss("rdo");
            return None;
        };

        let exchange = self.exchanges[index].clone();
        self.record_consumption(&exchange.id);

        let vars = merge_variables(&self.defaults, overrides);
        let response = substitute_variables(&exchange.response, &vars);
        let pushes = exchange
            .pushes
            .iter()
            .map(|push| substitute_variables(push, &vars))
            .collect();

        trace!(
            command = %packet,
            exchange = %exchange.id,
            strategy = %strategy,
            "rdo exchange matched"
        );
        metrics::record_match(strategy);

        Some(RdoMatch {
            exchange,
            response,
            pushes,
            strategy,
        })
    }

    /// Returns a copy of the consumed exchange ids.
    #[must_use]
    pub fn consumed_ids(&self) -> HashSet<String> {
        self.consumed.clone()
    }

    /// Returns how many times the exchange `id` has been returned.
    #[must_use]
    pub fn consumption_count(&self, id: &str) -> u64 {
        self.consumption_count.get(id).copied().unwrap_or(0)
    }

    /// Clears consumption bookkeeping, keeping the loaded exchanges.
    pub fn reset(&mut self) {
        self.consumed.clear();
        self.consumption_count.clear();
    }

    /// Drops every exchange and clears bookkeeping.
    pub fn clear_scenarios(&mut self) {
        self.exchanges.clear();
        self.reset();
    }

    fn record_consumption(&mut self, id: &str) {
        let count = self.consumption_count.entry(id.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        self.consumed.insert(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::RdoMatchKey;

    fn set_price_mock() -> RdoMock {
        let mut mock = RdoMock::new();
        mock.add_exchange(RdoExchange::new(
            "A",
            RdoMatchKey::exact("call", "obj", "do", "RDOSetPrice", &["0", "\"100\""]),
            "A res=\"%{{companyName}}\"",
        ));
        mock.add_exchange(RdoExchange::new(
            "B",
            RdoMatchKey::member("RDOSetPrice"),
            "B res=\"#0\"",
        ));
        mock
    }

    fn idof_wildcards() -> RdoMock {
        let mut mock = RdoMock::new();
        for n in 1..=3 {
            let key = RdoMatchKey {
                member: Some("idof".to_string()),
                target_id: Some("*".to_string()),
                ..RdoMatchKey::default()
            };
            mock.add_exchange(RdoExchange::new(format!("idof-{n}"), key, format!("objid={n}")));
        }
        mock
    }

    #[test]
    fn exact_wins_over_less_specific() {
        let mut mock = set_price_mock();
        let hit = mock
            .match_command(r#"call obj do RDOSetPrice 0 "100""#, None)
            .unwrap();
        assert_eq!(hit.exchange.id, "A");
        assert_eq!(hit.strategy, MatchStrategy::Exact);
    }

    #[test]
    fn other_target_falls_through_to_member() {
        let mut mock = set_price_mock();
        let hit = mock
            .match_command(r#"call obj2 do RDOSetPrice 1 "200""#, None)
            .unwrap();
        assert_eq!(hit.exchange.id, "B");
        assert_eq!(hit.strategy, MatchStrategy::KeyField);
    }

    #[test]
    fn exact_is_idempotent() {
        let mut mock = set_price_mock();
        for _ in 0..3 {
            let hit = mock
                .match_command(r#"call obj do RDOSetPrice 0 "100""#, None)
                .unwrap();
            assert_eq!(hit.exchange.id, "A");
        }
        assert_eq!(mock.consumption_count("A"), 3);
    }

    #[test]
    fn variables_are_substituted_with_overrides() {
        let mut mock = set_price_mock();
        let overrides: ScenarioVariables = [("companyName", "Acme")].into_iter().collect();
        let hit = mock
            .match_command(r#"call obj do RDOSetPrice 0 "100""#, Some(&overrides))
            .unwrap();
        assert_eq!(hit.response, "A res=\"%Acme\"");

        let hit = mock
            .match_command(r#"call obj do RDOSetPrice 0 "100""#, None)
            .unwrap();
        assert_eq!(hit.response, "A res=\"%Mock Industries\"");
    }

    #[test]
    fn pushes_are_substituted() {
        let mut mock = RdoMock::new();
        mock.add_exchange(
            RdoExchange::new("logon", RdoMatchKey::member("RDOLogonUser"), "A0")
                .with_push("C sel 1 call InitClient \"%{{username}}\"")
                .with_push("C sel 1 call Refresh {{unknownVar}}"),
        );
        let hit = mock.match_command("call 1 sel RDOLogonUser", None).unwrap();
        assert_eq!(
            hit.pushes,
            vec![
                "C sel 1 call InitClient \"%testuser\"".to_string(),
                "C sel 1 call Refresh {{unknownVar}}".to_string(),
            ]
        );
    }

    #[test]
    fn idof_wildcards_cycle_then_wrap() {
        let mut mock = idof_wildcards();
        let ids: Vec<String> = ["A", "B", "C", "D"]
            .iter()
            .map(|target| {
                mock.match_command(&format!("idof {target}"), None)
                    .unwrap()
                    .exchange
                    .id
            })
            .collect();
        assert_eq!(ids, vec!["idof-1", "idof-2", "idof-3", "idof-1"]);
        assert_eq!(mock.consumption_count("idof-1"), 2);
        assert_eq!(mock.consumed_ids().len(), 3);
    }

    #[test]
    fn reset_restores_first_candidate() {
        let mut mock = idof_wildcards();
        mock.match_command("idof A", None).unwrap();
        mock.match_command("idof B", None).unwrap();
        mock.reset();
        assert!(mock.consumed_ids().is_empty());
        assert_eq!(mock.consumption_count("idof-1"), 0);
        let hit = mock.match_command("idof C", None).unwrap();
        assert_eq!(hit.exchange.id, "idof-1");
        assert_eq!(mock.exchanges().len(), 3);
    }

    #[test]
    fn nth_occurrence_reached_after_method_exhausted() {
        let mut mock = RdoMock::new();
        for n in 1..=2 {
            let key = RdoMatchKey {
                verb: Some("get".to_string()),
                member: Some("Budget".to_string()),
                ..RdoMatchKey::default()
            };
            mock.add_exchange(RdoExchange::new(format!("budget-{n}"), key, n.to_string()));
        }

        let first = mock.match_command("call 7 sel Budget", None).unwrap();
        assert_eq!(
            (first.exchange.id.as_str(), first.strategy),
            ("budget-1", MatchStrategy::Method)
        );
        let second = mock.match_command("call 7 sel Budget", None).unwrap();
        assert_eq!(second.exchange.id, "budget-2");
        let third = mock.match_command("call 7 sel Budget", None).unwrap();
        assert_eq!(
            (third.exchange.id.as_str(), third.strategy),
            ("budget-1", MatchStrategy::NthOccurrence)
        );
    }

    #[test]
    fn wrap_leaves_other_consumed_flags() {
        let mut mock = idof_wildcards();
        for target in ["A", "B", "C", "D"] {
            mock.match_command(&format!("idof {target}"), None).unwrap();
        }
        let consumed = mock.consumed_ids();
        assert!(consumed.contains("idof-2"));
        assert!(consumed.contains("idof-3"));
        assert_eq!(mock.consumption_count("idof-2"), 1);
    }

    #[test]
    fn no_match_returns_none_without_bookkeeping() {
        let mut mock = set_price_mock();
        assert!(mock.match_command("call obj do RDOGetName", None).is_none());
        assert!(mock.consumed_ids().is_empty());
    }

    #[test]
    fn unparseable_command_is_no_match() {
        let mut mock = set_price_mock();
        assert!(mock.match_command("", None).is_none());
        assert!(mock.match_command("call obj do \"open", None).is_none());
    }

    #[test]
    fn push_only_never_matched() {
        let mut mock = RdoMock::new();
        mock.add_exchange(
            RdoExchange::new("push", RdoMatchKey::member("Refresh"), "P").push_only(),
        );
        assert!(mock.match_command("call 1 sel Refresh", None).is_none());
    }

    #[test]
    fn clear_scenarios_drops_exchanges() {
        let mut mock = set_price_mock();
        mock.match_command(r#"call obj do RDOSetPrice 0 "100""#, None);
        mock.clear_scenarios();
        assert!(mock.exchanges().is_empty());
        assert!(mock.consumed_ids().is_empty());
        assert!(
            mock.match_command(r#"call obj do RDOSetPrice 0 "100""#, None)
                .is_none()
        );
    }

    #[test]
    fn consumed_ids_is_a_copy() {
        let mut mock = set_price_mock();
        mock.match_command(r#"call obj do RDOSetPrice 0 "100""#, None);
        let mut snapshot = mock.consumed_ids();
        snapshot.clear();
        assert_eq!(mock.consumed_ids().len(), 1);
    }

    #[test]
    fn add_scenario_preserves_order() {
        let scenario = RdoScenario::new("login")
            .with_exchange(RdoExchange::new("s1", RdoMatchKey::member("Logon"), "1"))
            .with_exchange(RdoExchange::new("s2", RdoMatchKey::member("Logon"), "2"));
        let mut mock = RdoMock::new();
        mock.add_scenario(&scenario);
        mock.add_exchange(RdoExchange::new("s3", RdoMatchKey::member("Logon"), "3"));
        let ids: Vec<&str> = mock.exchanges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
    }
}
