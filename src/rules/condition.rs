use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Rule definition as written in the rules file
///
/// JSON structure:
/// ```json
/// {
///   "description": "Spam from known accounts",
///   "enabled": true,
///   "conditions": {
///     "operator": "AND",
///     "filters": [
///       {"type": "user", "operator": "IN", "values": [111, 222]},
///       {"type": "content", "operator": "CONTAINS", "values": ["buy now"]}
///     ]
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub description: Option<String>,
    /// Rules are disabled unless explicitly enabled
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: GroupSpec,
}

/// Root condition block of a rule
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupSpec {
    /// Combinator tag, `AND` when omitted
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

/// A single entry of a filter list
///
/// Either a leaf condition (`type` is an attribute class) or a nested group
/// (`type` is `"group"`, children under `conditions`). Tags are kept as raw
/// strings so that an unknown tag drops only this entry at compile time
/// instead of failing the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterSpec {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub operator: Option<String>,
    /// Scalar, list, or absent
    #[serde(default)]
    pub values: Option<Value>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    /// Children of a nested group
    #[serde(default, alias = "filters")]
    pub conditions: Vec<FilterSpec>,
}

impl FilterSpec {
    pub fn is_group(&self) -> bool {
        self.kind.trim().eq_ignore_ascii_case("group")
    }
}

/// Parse a rules file: a JSON object mapping rule name to definition
pub fn parse_rules(json: &str) -> serde_json::Result<BTreeMap<String, RuleSpec>> {
    serde_json::from_str(json)
}
