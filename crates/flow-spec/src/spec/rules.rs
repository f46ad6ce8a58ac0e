use std::borrow::Cow;
use std::collections::BTreeSet;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which branch of the decision formula a rule set takes when its condition
/// groups are met. The labels name the branch, not a literal imperative; see
/// `evaluator::decide` for the exact combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Show,
    Hide,
}

/// One dependency check: `(dependencyFieldName, operatorCode, comparisonValue)`
/// with an optional fourth `end` operand for the between operators.
///
/// Serialized as a 3- or 4-element JSON array to match the conditional-tag
/// attribute format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub operator: String,
    pub value: String,
    pub end: Option<String>,
}

impl Condition {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
            end: None,
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.end.is_some() { 4 } else { 3 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.field)?;
        seq.serialize_element(&self.operator)?;
        seq.serialize_element(&self.value)?;
        if let Some(end) = &self.end {
            seq.serialize_element(end)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = Vec::<String>::deserialize(deserializer)?;
        if parts.len() < 3 {
            return Err(serde::de::Error::invalid_length(
                parts.len(),
                &"a [field, operator, value] triple",
            ));
        }
        let mut parts = parts.into_iter();
        Ok(Condition {
            field: parts.next().unwrap_or_default(),
            operator: parts.next().unwrap_or_default(),
            value: parts.next().unwrap_or_default(),
            end: parts.next(),
        })
    }
}

impl JsonSchema for Condition {
    fn schema_name() -> Cow<'static, str> {
        "Condition".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "array",
            "items": { "type": "string" },
            "minItems": 3,
            "maxItems": 4,
        })
    }
}

/// A field's or option's visibility logic: a default direction plus
/// OR-of-AND condition groups.
///
/// Serialized as the `[direction, groups]` pair carried by the conditional-tag
/// attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleSet {
    pub default_direction: Direction,
    pub groups: Vec<Vec<Condition>>,
}

impl RuleSet {
    pub fn new(default_direction: Direction, groups: Vec<Vec<Condition>>) -> Self {
        Self {
            default_direction,
            groups,
        }
    }

    /// A rule set with zero groups has no rule effect.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Drops conditions whose dependency does not resolve to a known field,
    /// then drops groups left empty. Idempotent.
    pub fn normalize(&self, known_fields: &BTreeSet<String>) -> RuleSet {
        let groups = self
            .groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .filter(|condition| known_fields.contains(&condition.field))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect();
        RuleSet {
            default_direction: self.default_direction,
            groups,
        }
    }

    /// Names of all dependency fields referenced by this rule set.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flatten()
            .map(|condition| condition.field.as_str())
    }

    /// Adapter for the alternate `[direction, matchMode, flat-condition-list]`
    /// serialization: `all` folds the flat list into a single conjunctive
    /// group, `any` spreads it into one group per condition.
    pub fn from_flat(direction: Direction, mode: MatchMode, conditions: Vec<Condition>) -> Self {
        let groups = match mode {
            MatchMode::All => {
                if conditions.is_empty() {
                    Vec::new()
                } else {
                    vec![conditions]
                }
            }
            MatchMode::Any => conditions.into_iter().map(|condition| vec![condition]).collect(),
        };
        RuleSet {
            default_direction: direction,
            groups,
        }
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.default_direction)?;
        seq.serialize_element(&self.groups)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (default_direction, groups) =
            <(Direction, Vec<Vec<Condition>>)>::deserialize(deserializer)?;
        Ok(RuleSet {
            default_direction,
            groups,
        })
    }
}

impl JsonSchema for RuleSet {
    fn schema_name() -> Cow<'static, str> {
        "RuleSet".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "array",
            "minItems": 2,
            "maxItems": 2,
        })
    }
}

/// Match mode used by the flat legacy rule serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Any,
    All,
}

/// Parses the conditional-tag attribute wire format: a one-element array
/// `[[direction, groups]]`.
///
/// A parse failure or missing attribute means "no rule", never an error.
pub fn parse_conditional_tags(raw: &str) -> RuleSet {
    serde_json::from_str::<Vec<RuleSet>>(raw)
        .ok()
        .and_then(|mut tags| {
            if tags.is_empty() {
                None
            } else {
                Some(tags.remove(0))
            }
        })
        .unwrap_or_default()
}
