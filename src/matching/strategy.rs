//! Matching strategies.
//!
//! Each tier is a plain function over the exchange pool, the consumed-id set
//! and the incoming packet, returning the index of the selected exchange.
//! [`STRATEGIES`] lists them from most to least specific; the engine stops
//! at the first tier that selects something.
//!
//! Push-only exchanges and exchanges without match keys are invisible to
//! every tier.

use std::collections::HashSet;

use serde::Serialize;

use crate::protocol::{IDOF_VERB, RdoPacket, WILDCARD, strip_quotes};
use crate::scenarios::{RdoExchange, RdoMatchKey};

/// Signature shared by every tier.
pub type StrategyFn = fn(&[RdoExchange], &HashSet<String>, &RdoPacket) -> Option<usize>;

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// All five key fields specified and equal.
    Exact,
    /// Member (plus verb/action when given) with optional args pattern.
    KeyField,
    /// Member name only.
    Method,
    /// Cyclic replay among same-member exchanges, or `idof` fallback.
    NthOccurrence,
}

impl MatchStrategy {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::KeyField => "key_field",
            Self::Method => "method",
            Self::NthOccurrence => "nth_occurrence",
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Tiers in evaluation order.
pub const STRATEGIES: [(MatchStrategy, StrategyFn); 4] = [
    (MatchStrategy::Exact, exact_match),
    (MatchStrategy::KeyField, key_field_match),
    (MatchStrategy::Method, method_match),
    (MatchStrategy::NthOccurrence, nth_occurrence_match),
];

/// Checks packet args against an args pattern.
///
/// The pattern may be a prefix of `actual`; trailing arguments are not
/// checked. `*` matches any token. Other tokens compare with one pair of
/// surrounding double quotes stripped from both sides.
#[must_use]
pub fn args_match(pattern: &[String], actual: Option<&[String]>) -> bool {
    if pattern.is_empty() {
        return true;
    }
    let Some(actual) = actual else {
        return false;
    };
    if pattern.len() > actual.len() {
        return false;
    }
    pattern
        .iter()
        .zip(actual)
        .all(|(p, a)| p == WILDCARD || strip_quotes(p) == strip_quotes(a))
}

/// Tier 1: every key field present, literal target, all equal.
///
/// Consumption is ignored, so a fully pinned command replays the same
/// exchange every time.
#[must_use]
pub fn exact_match(
    exchanges: &[RdoExchange],
    _consumed: &HashSet<String>,
    packet: &RdoPacket,
) -> Option<usize> {
    eligible(exchanges).find_map(|(index, keys)| {
        let hit = keys.is_fully_specified()
            && keys.verb.as_deref() == Some(packet.verb.as_str())
            && keys.target_id == packet.target_id
            && keys.action == packet.action
            && keys.member == packet.member
            && keys
                .args_pattern
                .as_deref()
                .is_some_and(|p| args_match(p, Some(packet.args.as_slice())));
        hit.then_some(index)
    })
}

/// Tier 2: target ignored, member required.
///
/// Exchanges with an args pattern that matches are tried first; exchanges
/// without an args pattern only when none of those qualify. Within the
/// winning pass the first unconsumed exchange is taken, and the first one
/// replayed once all are consumed.
#[must_use]
pub fn key_field_match(
    exchanges: &[RdoExchange],
    consumed: &HashSet<String>,
    packet: &RdoPacket,
) -> Option<usize> {
    packet.member.as_ref()?;

    let key_fields_agree = |keys: &RdoMatchKey| {
        keys.member.is_some()
            && keys.member == packet.member
            && keys.verb.as_deref().is_none_or(|v| v == packet.verb)
            && keys
                .action
                .as_deref()
                .is_none_or(|a| packet.action.as_deref() == Some(a))
    };

    let with_args: Vec<usize> = eligible(exchanges)
        .filter(|(_, keys)| key_fields_agree(keys))
        .filter(|(_, keys)| {
            keys.args_pattern
                .as_deref()
                .is_some_and(|p| args_match(p, Some(packet.args.as_slice())))
        })
        .map(|(index, _)| index)
        .collect();
    if !with_args.is_empty() {
        return first_unconsumed_or_first(exchanges, consumed, &with_args);
    }

    let without_args: Vec<usize> = eligible(exchanges)
        .filter(|(_, keys)| key_fields_agree(keys) && keys.args_pattern.is_none())
        .map(|(index, _)| index)
        .collect();
    first_unconsumed_or_first(exchanges, consumed, &without_args)
}

/// Tier 3: member equality alone, first exchange not yet consumed.
#[must_use]
pub fn method_match(
    exchanges: &[RdoExchange],
    consumed: &HashSet<String>,
    packet: &RdoPacket,
) -> Option<usize> {
    let member = packet.member.as_deref()?;
    eligible(exchanges)
        .filter(|(_, keys)| keys.member.as_deref() == Some(member))
        .map(|(index, _)| index)
        .find(|&index| !consumed.contains(&exchanges[index].id))
}

/// Tier 4: cyclic replay.
///
/// Among exchanges sharing the packet's member, the first unconsumed one is
/// returned, wrapping to the first candidate once all are consumed. With no
/// member candidates, an `idof` command for a concrete id falls back to the
/// first `idof` exchange whose target is that id or a wildcard.
#[must_use]
pub fn nth_occurrence_match(
    exchanges: &[RdoExchange],
    consumed: &HashSet<String>,
    packet: &RdoPacket,
) -> Option<usize> {
    if let Some(member) = packet.member.as_deref() {
        let candidates: Vec<usize> = eligible(exchanges)
            .filter(|(_, keys)| keys.member.as_deref() == Some(member))
            .map(|(index, _)| index)
            .collect();
        if !candidates.is_empty() {
            return first_unconsumed_or_first(exchanges, consumed, &candidates);
        }
    }

    if packet.verb != IDOF_VERB {
        return None;
    }
    let target = packet
        .target_id
        .as_deref()
        .map(strip_quotes)
        .filter(|t| *t != WILDCARD)?;

    eligible(exchanges)
        .find(|(_, keys)| {
            keys.verb.as_deref() == Some(IDOF_VERB)
                && keys
                    .target_id
                    .as_deref()
                    .map(strip_quotes)
                    .is_none_or(|t| t == WILDCARD || t == target)
        })
        .map(|(index, _)| index)
}

fn eligible(exchanges: &[RdoExchange]) -> impl Iterator<Item = (usize, &RdoMatchKey)> {
    exchanges
        .iter()
        .enumerate()
        .filter_map(|(index, exchange)| exchange.matchable_keys().map(|keys| (index, keys)))
}

fn first_unconsumed_or_first(
    exchanges: &[RdoExchange],
    consumed: &HashSet<String>,
    candidates: &[usize],
) -> Option<usize> {
    candidates
        .iter()
        .copied()
        .find(|&index| !consumed.contains(&exchanges[index].id))
        .or_else(|| candidates.first().copied())
}
