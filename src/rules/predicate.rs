use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::Value;
use serenity::model::id::RoleId;
use std::str::FromStr;
use tracing::warn;

use super::condition::FilterSpec;
use super::error::{PredicateError, RuleError};
use super::filterable_message::FilterableMessage;

/// Message attribute a predicate inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeClass {
    Guild,
    Channel,
    User,
    Role,
    MessageId,
    Timestamp,
    Content,
}

impl FromStr for AttributeClass {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "guild" => Ok(Self::Guild),
            "channel" => Ok(Self::Channel),
            "user" => Ok(Self::User),
            "role" => Ok(Self::Role),
            "message_id" => Ok(Self::MessageId),
            "timestamp" => Ok(Self::Timestamp),
            "content" => Ok(Self::Content),
            _ => Err(RuleError::UnknownAttribute(s.to_string())),
        }
    }
}

/// Comparison operator tag as written in a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    In,
    NotIn,
    Equals,
    NotEquals,
    Between,
    After,
    Before,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
}

impl FromStr for Operator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "IN" => Ok(Self::In),
            "NOT_IN" => Ok(Self::NotIn),
            "EQUALS" => Ok(Self::Equals),
            "NOT_EQUALS" => Ok(Self::NotEquals),
            "BETWEEN" => Ok(Self::Between),
            "AFTER" => Ok(Self::After),
            "BEFORE" => Ok(Self::Before),
            "CONTAINS" => Ok(Self::Contains),
            "NOT_CONTAINS" => Ok(Self::NotContains),
            "STARTS_WITH" => Ok(Self::StartsWith),
            "ENDS_WITH" => Ok(Self::EndsWith),
            "REGEX" => Ok(Self::Regex),
            _ => Err(RuleError::UnknownOperator(s.to_string())),
        }
    }
}

/// Snowflake attributes compared by identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdAttribute {
    Guild,
    Channel,
    User,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdOperator {
    In,
    NotIn,
    Equals,
    NotEquals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOperator {
    Between,
    After,
    Before,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOperator {
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
}

/// Normalized operand value
///
/// Numeric-looking strings are coerced to integers so that `"123"` and `123`
/// compare equal against a snowflake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Id(u64),
    Text(String),
}

impl Operand {
    fn is_id(&self, id: u64) -> bool {
        matches!(self, Operand::Id(v) if *v == id)
    }
}

type Bound = Option<Result<NaiveDateTime, PredicateError>>;

/// A single typed condition over one message attribute
#[derive(Debug, Clone)]
pub enum Predicate {
    Id {
        attribute: IdAttribute,
        operator: IdOperator,
        values: Vec<Operand>,
    },
    Role {
        operator: IdOperator,
        values: Vec<Operand>,
    },
    Timestamp {
        operator: TimeOperator,
        start: Bound,
        end: Bound,
    },
    Content {
        operator: ContentOperator,
        /// Lowercased needles (substring operators) or raw patterns (regex)
        values: Vec<String>,
        patterns: Vec<Result<Regex, PredicateError>>,
    },
    /// Known attribute class paired with an operator it does not support.
    /// Never matches.
    Unsupported {
        attribute: AttributeClass,
        operator: Operator,
    },
}

impl Predicate {
    /// Compile a leaf filter definition
    ///
    /// Unknown attribute or operator tags are returned as errors so the caller
    /// can drop this leaf. Operand problems (bad regex, bad timestamp) are kept
    /// inside the predicate and surface at evaluation time.
    pub fn compile(spec: &FilterSpec) -> Result<Self, RuleError> {
        let attribute: AttributeClass = spec.kind.parse()?;
        let operator: Operator = spec.operator.as_deref().unwrap_or_default().parse()?;

        let predicate = match (attribute, id_operator(operator)) {
            (AttributeClass::Guild, Some(op)) => Self::id(IdAttribute::Guild, op, spec),
            (AttributeClass::Channel, Some(op)) => Self::id(IdAttribute::Channel, op, spec),
            (AttributeClass::User, Some(op)) => Self::id(IdAttribute::User, op, spec),
            (AttributeClass::MessageId, Some(op)) => Self::id(IdAttribute::Message, op, spec),
            (AttributeClass::Role, Some(op)) => Predicate::Role {
                operator: op,
                values: normalize_operands(spec.values.as_ref()),
            },
            (AttributeClass::Timestamp, _) => match time_operator(operator) {
                Some(op) => Predicate::Timestamp {
                    operator: op,
                    start: spec.start.as_deref().map(parse_timestamp),
                    end: spec.end.as_deref().map(parse_timestamp),
                },
                None => Self::unsupported(attribute, operator),
            },
            (AttributeClass::Content, _) => match content_operator(operator) {
                Some(op) => Self::content(op, spec),
                None => Self::unsupported(attribute, operator),
            },
            (_, None) => Self::unsupported(attribute, operator),
        };

        Ok(predicate)
    }

    fn id(attribute: IdAttribute, operator: IdOperator, spec: &FilterSpec) -> Self {
        Predicate::Id {
            attribute,
            operator,
            values: normalize_operands(spec.values.as_ref()),
        }
    }

    fn content(operator: ContentOperator, spec: &FilterSpec) -> Self {
        let raw = content_operands(spec.values.as_ref());

        if operator == ContentOperator::Regex {
            let patterns = raw
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|source| PredicateError::InvalidRegex {
                        pattern: pattern.clone(),
                        source,
                    })
                })
                .collect();
            Predicate::Content {
                operator,
                values: raw,
                patterns,
            }
        } else {
            Predicate::Content {
                operator,
                values: raw.into_iter().map(|v| v.to_lowercase()).collect(),
                patterns: Vec::new(),
            }
        }
    }

    fn unsupported(attribute: AttributeClass, operator: Operator) -> Self {
        warn!(
            ?attribute,
            ?operator,
            "Operator is not supported for this filter type, filter will never match"
        );
        Predicate::Unsupported {
            attribute,
            operator,
        }
    }

    /// Whether evaluating this predicate needs the author's roles
    pub fn uses_roles(&self) -> bool {
        matches!(self, Predicate::Role { .. })
    }

    /// Check whether the message satisfies this predicate
    ///
    /// Never fails: evaluation errors are logged and treated as a non-match.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to test
    /// * `roles` - Resolved role IDs of the author, if known. Falls back to
    ///   the member data embedded in the message.
    pub fn matches<M: FilterableMessage>(&self, message: &M, roles: Option<&[RoleId]>) -> bool {
        match self.evaluate(message, roles) {
            Ok(matched) => matched,
            Err(err) => {
                warn!(
                    message_id = %message.message_id(),
                    error = %err,
                    "Error in filter matching, treating as non-match"
                );
                false
            }
        }
    }

    /// Evaluate this predicate, surfacing evaluation errors
    pub fn evaluate<M: FilterableMessage>(
        &self,
        message: &M,
        roles: Option<&[RoleId]>,
    ) -> Result<bool, PredicateError> {
        match self {
            Predicate::Id {
                attribute,
                operator,
                values,
            } => {
                let id = match attribute {
                    IdAttribute::Guild => match message.guild_id() {
                        Some(guild_id) => guild_id.get(),
                        None => return Ok(false),
                    },
                    IdAttribute::Channel => message.channel_id().get(),
                    IdAttribute::User => message.author_id().get(),
                    IdAttribute::Message => message.message_id().get(),
                };
                Ok(match_id(*operator, values, id))
            }
            Predicate::Role { operator, values } => {
                let Some(roles) = roles.or_else(|| message.member_role_ids()) else {
                    return Ok(false);
                };
                Ok(match_roles(*operator, values, roles))
            }
            Predicate::Timestamp {
                operator,
                start,
                end,
            } => {
                let created_at = message
                    .created_at()
                    .ok_or(PredicateError::MissingTimestamp)?;
                match_timestamp(*operator, start, end, created_at)
            }
            Predicate::Content {
                operator,
                values,
                patterns,
            } => {
                let content = message.content().to_lowercase();
                match_content(*operator, values, patterns, &content)
            }
            Predicate::Unsupported { .. } => Ok(false),
        }
    }
}

fn id_operator(operator: Operator) -> Option<IdOperator> {
    match operator {
        Operator::In => Some(IdOperator::In),
        Operator::NotIn => Some(IdOperator::NotIn),
        Operator::Equals => Some(IdOperator::Equals),
        Operator::NotEquals => Some(IdOperator::NotEquals),
        _ => None,
    }
}

fn time_operator(operator: Operator) -> Option<TimeOperator> {
    match operator {
        Operator::Between => Some(TimeOperator::Between),
        Operator::After => Some(TimeOperator::After),
        Operator::Before => Some(TimeOperator::Before),
        _ => None,
    }
}

fn content_operator(operator: Operator) -> Option<ContentOperator> {
    match operator {
        Operator::Contains => Some(ContentOperator::Contains),
        Operator::NotContains => Some(ContentOperator::NotContains),
        Operator::StartsWith => Some(ContentOperator::StartsWith),
        Operator::EndsWith => Some(ContentOperator::EndsWith),
        Operator::Regex => Some(ContentOperator::Regex),
        _ => None,
    }
}

fn match_id(operator: IdOperator, values: &[Operand], id: u64) -> bool {
    match operator {
        IdOperator::In => values.iter().any(|v| v.is_id(id)),
        IdOperator::NotIn => !values.iter().any(|v| v.is_id(id)),
        // EQUALS / NOT_EQUALS compare against the first operand only
        IdOperator::Equals => values.first().is_some_and(|v| v.is_id(id)),
        IdOperator::NotEquals => values.first().is_some_and(|v| !v.is_id(id)),
    }
}

fn match_roles(operator: IdOperator, values: &[Operand], roles: &[RoleId]) -> bool {
    let has_role = |operand: &Operand| roles.iter().any(|role| operand.is_id(role.get()));

    match operator {
        IdOperator::In => values.iter().any(has_role),
        IdOperator::NotIn => !values.iter().any(has_role),
        IdOperator::Equals => values.first().is_some_and(has_role),
        IdOperator::NotEquals => values.first().is_some_and(|v| !has_role(v)),
    }
}

fn match_timestamp(
    operator: TimeOperator,
    start: &Bound,
    end: &Bound,
    created_at: NaiveDateTime,
) -> Result<bool, PredicateError> {
    let bound = |bound: &Bound, name: &'static str| -> Result<NaiveDateTime, PredicateError> {
        match bound {
            Some(Ok(at)) => Ok(*at),
            Some(Err(err)) => Err(err.clone()),
            None => Err(PredicateError::MissingOperand(name)),
        }
    };

    // Both ends are inclusive
    match operator {
        TimeOperator::Between => {
            let start = bound(start, "start")?;
            let end = bound(end, "end")?;
            Ok(start <= created_at && created_at <= end)
        }
        TimeOperator::After => Ok(created_at >= bound(start, "start")?),
        TimeOperator::Before => Ok(created_at <= bound(end, "end")?),
    }
}

fn match_content(
    operator: ContentOperator,
    values: &[String],
    patterns: &[Result<Regex, PredicateError>],
    content: &str,
) -> Result<bool, PredicateError> {
    match operator {
        ContentOperator::Contains => Ok(values.iter().any(|v| content.contains(v.as_str()))),
        ContentOperator::NotContains => Ok(!values.iter().any(|v| content.contains(v.as_str()))),
        ContentOperator::StartsWith => Ok(values.iter().any(|v| content.starts_with(v.as_str()))),
        ContentOperator::EndsWith => Ok(values.iter().any(|v| content.ends_with(v.as_str()))),
        ContentOperator::Regex => {
            // Patterns are tried in order; an invalid one fails the predicate
            // only if no earlier pattern matched.
            for pattern in patterns {
                match pattern {
                    Ok(regex) if regex.is_match(content) => return Ok(true),
                    Ok(_) => continue,
                    Err(err) => return Err(err.clone()),
                }
            }
            Ok(false)
        }
    }
}

/// Flatten a scalar-or-list operand into normalized operands
fn normalize_operands(values: Option<&Value>) -> Vec<Operand> {
    match values {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(normalize_value).collect(),
        Some(value) => normalize_value(value).into_iter().collect(),
    }
}

fn normalize_value(value: &Value) -> Option<Operand> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(match n.as_u64() {
            Some(id) => Operand::Id(id),
            None => Operand::Text(n.to_string()),
        }),
        Value::String(s) => {
            let digits = !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
            match s.parse::<u64>() {
                Ok(id) if digits => Some(Operand::Id(id)),
                _ => Some(Operand::Text(s.clone())),
            }
        }
        other => Some(Operand::Text(other.to_string())),
    }
}

/// Content operands as strings (a single value is treated as a one-element list)
fn content_operands(values: Option<&Value>) -> Vec<String> {
    let to_text = |value: &Value| match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    };

    match values {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(to_text).collect(),
        Some(value) => to_text(value).into_iter().collect(),
    }
}

/// Parse an ISO-8601 timestamp into naive UTC
///
/// A trailing `Z` is stripped. Offsets are converted to UTC; date-only
/// values mean midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, PredicateError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    let value = raw.trim().trim_end_matches('Z');

    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.naive_utc());
    }

    for format in FORMATS {
        if let Ok(at) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(at);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|source| PredicateError::InvalidTimestamp {
            value: raw.to_string(),
            source,
        })
}
