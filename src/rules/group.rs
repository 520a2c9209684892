use serenity::model::id::RoleId;
use tracing::{error, warn};

use super::condition::FilterSpec;
use super::error::RuleError;
use super::filterable_message::FilterableMessage;
use super::predicate::Predicate;

/// Boolean combinator of a predicate group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
    /// Unrecognized tag; a group with this combinator never matches
    Unrecognized(String),
}

impl Combinator {
    /// Parse a combinator tag, `AND` when omitted
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return Self::And;
        };

        match tag.trim().to_ascii_uppercase().as_str() {
            "AND" => Self::And,
            "OR" => Self::Or,
            _ => Self::Unrecognized(tag.to_string()),
        }
    }
}

/// Child of a predicate group
#[derive(Debug, Clone)]
pub enum ConditionNode {
    Predicate(Predicate),
    Group(PredicateGroup),
}

impl ConditionNode {
    fn matches<M: FilterableMessage>(&self, message: &M, roles: Option<&[RoleId]>) -> bool {
        match self {
            ConditionNode::Predicate(predicate) => predicate.matches(message, roles),
            ConditionNode::Group(group) => group.matches(message, roles),
        }
    }

    fn uses_roles(&self) -> bool {
        match self {
            ConditionNode::Predicate(predicate) => predicate.uses_roles(),
            ConditionNode::Group(group) => group.uses_roles(),
        }
    }
}

/// AND/OR combination of predicates and nested groups
///
/// Children own their subtrees, so the compiled rule is a plain tree without
/// shared nodes.
#[derive(Debug, Clone)]
pub struct PredicateGroup {
    combinator: Combinator,
    children: Vec<ConditionNode>,
}

impl PredicateGroup {
    pub fn new(combinator: Combinator, children: Vec<ConditionNode>) -> Self {
        Self {
            combinator,
            children,
        }
    }

    /// Compile a filter list into a group
    ///
    /// Leaves with unknown tags are dropped (logged). Nesting beyond
    /// `max_depth` levels rejects the whole tree.
    ///
    /// # Arguments
    ///
    /// * `operator` - Combinator tag of this group
    /// * `filters` - Child filter definitions
    /// * `depth` - Nesting level of this group (root is 1)
    /// * `max_depth` - Deepest allowed nesting level
    pub fn compile(
        operator: Option<&str>,
        filters: &[FilterSpec],
        depth: usize,
        max_depth: usize,
    ) -> Result<Self, RuleError> {
        if depth > max_depth {
            return Err(RuleError::TooDeep { max_depth });
        }

        let combinator = Combinator::from_tag(operator);
        if let Combinator::Unrecognized(tag) = &combinator {
            warn!(operator = %tag, "Unrecognized group operator, group will never match");
        }

        let mut children = Vec::with_capacity(filters.len());
        for filter in filters {
            if filter.is_group() {
                let group = Self::compile(
                    filter.operator.as_deref(),
                    &filter.conditions,
                    depth + 1,
                    max_depth,
                )?;
                children.push(ConditionNode::Group(group));
                continue;
            }

            match Predicate::compile(filter) {
                Ok(predicate) => children.push(ConditionNode::Predicate(predicate)),
                Err(err) => {
                    error!(error = %err, filter_type = %filter.kind, "Dropping filter");
                }
            }
        }

        Ok(Self::new(combinator, children))
    }

    /// Check whether the message satisfies this group
    ///
    /// AND stops at the first failing child and is true when there are no
    /// children. OR stops at the first matching child and is false when there
    /// are no children.
    pub fn matches<M: FilterableMessage>(&self, message: &M, roles: Option<&[RoleId]>) -> bool {
        match self.combinator {
            Combinator::And => self.children.iter().all(|c| c.matches(message, roles)),
            Combinator::Or => self.children.iter().any(|c| c.matches(message, roles)),
            Combinator::Unrecognized(_) => false,
        }
    }

    /// Whether any predicate in this tree needs the author's roles
    pub fn uses_roles(&self) -> bool {
        self.children.iter().any(ConditionNode::uses_roles)
    }

    pub fn combinator(&self) -> &Combinator {
        &self.combinator
    }

    pub fn children(&self) -> &[ConditionNode] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::tests::MockMessage;
    use rstest::rstest;
    use serde_json::json;

    fn compile(operator: &str, filters: serde_json::Value) -> PredicateGroup {
        let filters: Vec<FilterSpec> = serde_json::from_value(filters).unwrap();
        PredicateGroup::compile(Some(operator), &filters, 1, 16).unwrap()
    }

    #[rstest]
    #[case(None, Combinator::And)]
    #[case(Some("and"), Combinator::And)]
    #[case(Some(" OR "), Combinator::Or)]
    #[case(Some("XOR"), Combinator::Unrecognized("XOR".to_string()))]
    fn test_combinator_from_tag(#[case] tag: Option<&str>, #[case] expected: Combinator) {
        assert_eq!(Combinator::from_tag(tag), expected);
    }

    #[rstest]
    #[case("AND", true)]
    #[case("OR", false)]
    #[case("NAND", false)]
    fn test_empty_group(#[case] operator: &str, #[case] expected: bool) {
        let group = compile(operator, json!([]));
        assert_eq!(group.matches(&MockMessage::new(1), None), expected);
    }

    #[rstest]
    #[case("AND", true)]
    #[case("OR", false)]
    fn test_group_of_dropped_leaves_is_empty(#[case] operator: &str, #[case] expected: bool) {
        let group = compile(
            operator,
            json!([
                {"type": "reaction", "operator": "IN", "values": [1]},
                {"type": "user", "operator": "EXISTS"}
            ]),
        );

        assert!(group.children().is_empty());
        assert_eq!(group.matches(&MockMessage::new(1), None), expected);
    }

    #[rstest]
    #[case(42, "buy now cheap", true)]
    #[case(7, "buy now", false)]
    #[case(42, "hello", false)]
    fn test_and_group(#[case] author: u64, #[case] content: &str, #[case] expected: bool) {
        let group = compile(
            "AND",
            json!([
                {"type": "user", "operator": "IN", "values": [42]},
                {"type": "content", "operator": "CONTAINS", "values": ["buy now"]}
            ]),
        );
        let message = MockMessage::new(1).author(author).content(content);

        assert_eq!(group.matches(&message, None), expected);
    }

    #[rstest]
    #[case(42, "hello", true)]
    #[case(7, "buy now", true)]
    #[case(7, "hello", false)]
    fn test_or_group(#[case] author: u64, #[case] content: &str, #[case] expected: bool) {
        let group = compile(
            "OR",
            json!([
                {"type": "user", "operator": "IN", "values": [42]},
                {"type": "content", "operator": "CONTAINS", "values": ["buy now"]}
            ]),
        );
        let message = MockMessage::new(1).author(author).content(content);

        assert_eq!(group.matches(&message, None), expected);
    }

    #[rstest]
    #[case(1, "anything", true)]
    #[case(2, "free nitro", true)]
    #[case(2, "hello", false)]
    fn test_nested_group(#[case] channel: u64, #[case] content: &str, #[case] expected: bool) {
        let group = compile(
            "OR",
            json!([
                {"type": "channel", "operator": "EQUALS", "values": 1},
                {
                    "type": "group",
                    "operator": "AND",
                    "conditions": [
                        {"type": "channel", "operator": "EQUALS", "values": 2},
                        {"type": "content", "operator": "REGEX", "values": ["nitro"]}
                    ]
                }
            ]),
        );
        let message = MockMessage::new(1).channel(channel).content(content);

        assert_eq!(group.matches(&message, None), expected);
    }

    #[test]
    fn test_nesting_beyond_max_depth_is_rejected() {
        let filters: Vec<FilterSpec> = serde_json::from_value(json!([
            {"type": "group", "conditions": [
                {"type": "group", "conditions": [
                    {"type": "user", "operator": "IN", "values": [1]}
                ]}
            ]}
        ]))
        .unwrap();

        assert!(PredicateGroup::compile(None, &filters, 1, 3).is_ok());
        assert_eq!(
            PredicateGroup::compile(None, &filters, 1, 2).unwrap_err(),
            RuleError::TooDeep { max_depth: 2 }
        );
    }

    #[test]
    fn test_uses_roles_looks_into_nested_groups() {
        let group = compile(
            "AND",
            json!([
                {"type": "user", "operator": "IN", "values": [1]},
                {"type": "group", "operator": "OR", "conditions": [
                    {"type": "role", "operator": "IN", "values": [5]}
                ]}
            ]),
        );

        assert!(group.uses_roles());
        assert!(!compile("AND", json!([])).uses_roles());
    }
}
