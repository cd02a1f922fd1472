//! Scenario variable substitution.
//!
//! Captured fixtures carry `{{name}}` placeholders where session-specific
//! values (user, world, company, ids) appeared on the wire. Substitution is
//! single-pass and purely textual. A placeholder with no value is left in
//! the output verbatim so an unexpected fixture variable stays visible.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Regex for matching `{{name}}` placeholders (inner whitespace tolerated).
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("valid regex")
});

/// Values substituted into response and push templates when no fixture or
/// caller supplies them.
static BUILTIN_DEFAULTS: LazyLock<ScenarioVariables> = LazyLock::new(|| {
    [
        ("username", "testuser"),
        ("password", "testpass"),
        ("worldName", "Shamba"),
        ("companyName", "Mock Industries"),
        ("directoryHost", "127.0.0.1"),
        ("worldHost", "127.0.0.1"),
        ("worldPort", "8000"),
    ]
    .into_iter()
    .collect()
});

/// Ordered name → value mapping used for placeholder substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioVariables(IndexMap<String, String>);

impl ScenarioVariables {
    /// Creates an empty variable set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the built-in default variables.
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN_DEFAULTS.clone()
    }

    /// Returns the value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Binds `name` to `value`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Copies every binding of `other` into `self`; `other` wins on conflict.
    pub fn extend_from(&mut self, other: &Self) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    /// Iterates bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no variable is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ScenarioVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Shallow merge: every key of `overrides` wins over the same key in
/// `defaults`. Values are never merged deeply.
#[must_use]
pub fn merge_variables(
    defaults: &ScenarioVariables,
    overrides: Option<&ScenarioVariables>,
) -> ScenarioVariables {
    let mut merged = defaults.clone();
    if let Some(overrides) = overrides {
        merged.extend_from(overrides);
    }
    merged
}

/// Replaces every `{{name}}` placeholder with its value in `vars`.
///
/// Unresolved placeholders are kept exactly as written, including their
/// inner whitespace. Substituted values are not re-scanned.
#[must_use]
pub fn substitute_variables(template: &str, vars: &ScenarioVariables) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures| {
            vars.get(&caps[1])
                .map_or_else(|| caps[0].to_string(), str::to_string)
        })
        .into_owned()
}

/// Applies [`substitute_variables`] to every string leaf of a JSON value.
#[must_use]
pub fn substitute_json(value: &serde_json::Value, vars: &ScenarioVariables) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(substitute_variables(s, vars)),
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.iter().map(|v| substitute_json(v, vars)).collect(),
        ),
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_json(v, vars)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> ScenarioVariables {
        [("username", "alice"), ("worldName", "Zyrane")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_basic_substitution() {
        let out = substitute_variables("A0 {{username}}", &vars());
        assert_eq!(out, "A0 alice");
    }

    #[test]
    fn test_multiple_and_adjacent() {
        let out = substitute_variables("{{username}}{{worldName}}@{{worldName}}", &vars());
        assert_eq!(out, "aliceZyrane@Zyrane");
    }

    #[test]
    fn test_inner_whitespace_tolerated() {
        let out = substitute_variables("user={{ username }}", &vars());
        assert_eq!(out, "user=alice");
    }

    #[test]
    fn test_unknown_placeholder_left_verbatim() {
        let out = substitute_variables("id={{companyId}} user={{username}}", &vars());
        assert_eq!(out, "id={{companyId}} user=alice");
    }

    #[test]
    fn test_unknown_placeholder_whitespace_preserved() {
        let out = substitute_variables("x={{  missing }}", &vars());
        assert_eq!(out, "x={{  missing }}");
    }

    #[test]
    fn test_no_recursive_substitution() {
        let v: ScenarioVariables = [("a", "{{b}}"), ("b", "never")].into_iter().collect();
        assert_eq!(substitute_variables("{{a}}", &v), "{{b}}");
    }

    #[test]
    fn test_single_braces_untouched() {
        let out = substitute_variables("{username} ${username}", &vars());
        assert_eq!(out, "{username} ${username}");
    }

    #[test]
    fn test_merge_overrides_win() {
        let overrides: ScenarioVariables = [("username", "bob"), ("companyName", "Acme")]
            .into_iter()
            .collect();
        let merged = merge_variables(&vars(), Some(&overrides));
        assert_eq!(merged.get("username"), Some("bob"));
        assert_eq!(merged.get("worldName"), Some("Zyrane"));
        assert_eq!(merged.get("companyName"), Some("Acme"));
    }

    #[test]
    fn test_merge_without_overrides_is_copy() {
        assert_eq!(merge_variables(&vars(), None), vars());
    }

    #[test]
    fn test_merge_does_not_touch_defaults() {
        let defaults = vars();
        let overrides: ScenarioVariables = [("username", "bob")].into_iter().collect();
        let _ = merge_variables(&defaults, Some(&overrides));
        assert_eq!(defaults.get("username"), Some("alice"));
    }

    #[test]
    fn test_substitute_json_leaves() {
        let value = json!({
            "type": "login",
            "user": "{{username}}",
            "worlds": ["{{worldName}}", 3, null],
            "nested": {"ok": true, "who": "{{username}}@{{missing}}"}
        });
        let out = substitute_json(&value, &vars());
        assert_eq!(out["user"], "alice");
        assert_eq!(out["worlds"][0], "Zyrane");
        assert_eq!(out["worlds"][1], 3);
        assert_eq!(out["nested"]["who"], "alice@{{missing}}");
        assert_eq!(out["nested"]["ok"], true);
    }

    #[test]
    fn test_builtin_defaults_present() {
        let builtin = ScenarioVariables::builtin();
        assert_eq!(builtin.get("username"), Some("testuser"));
        assert!(builtin.get("worldName").is_some());
    }

    #[test]
    fn test_deserialize_transparent_map() {
        let v: ScenarioVariables =
            serde_yaml::from_str("username: carol\nworldName: Aries\n").unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.iter().next(), Some(("username", "carol")));
    }
}
