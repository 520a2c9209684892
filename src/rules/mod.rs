mod condition;
mod error;
mod filterable_message;
mod group;
mod predicate;
mod rule_set;


// Re-export public API
pub use condition::{FilterSpec, GroupSpec, RuleSpec, parse_rules};
pub use error::{PredicateError, RuleError};
pub use filterable_message::FilterableMessage;
pub use group::{Combinator, ConditionNode, PredicateGroup};
pub use predicate::{
    AttributeClass, ContentOperator, IdAttribute, IdOperator, Operand, Operator, Predicate,
    TimeOperator, parse_timestamp,
};
pub use rule_set::{Registration, RuleSet};
