use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bse::screener::error::{Result, ScreenerError};

/// Deepest nesting (in container levels) accepted for a single entity record.
pub const MAX_DEPTH: usize = 64;

/// Number of digits in a BSE scrip code.
pub const BSE_CODE_DIGITS: usize = 6;

/// Stable identifier of one entity. For BSE data this is the six digit scrip
/// code, kept as a string so leading zeros survive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an identifier without validating its format.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates an identifier from a BSE scrip code, rejecting anything that is
    /// not exactly six ASCII digits.
    pub fn bse(code: &str) -> Result<Self> {
        let code = code.trim();
        if is_bse_code(code) {
            Ok(Self(code.to_string()))
        } else {
            Err(ScreenerError::InvalidCode(code.to_string()))
        }
    }

    /// The identifier as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Returns `true` when `code` has the fixed-width numeric BSE form.
pub fn is_bse_code(code: &str) -> bool {
    code.len() == BSE_CODE_DIGITS && code.bytes().all(|byte| byte.is_ascii_digit())
}

/// Top-level sections of a cached company record, one per data source call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Quote,
    PerformanceAnalysis,
    FinancialRatios,
    PeerComparison,
    CorporateActions,
    Holdings,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Quote,
        Section::PerformanceAnalysis,
        Section::FinancialRatios,
        Section::PeerComparison,
        Section::CorporateActions,
        Section::Holdings,
    ];

    /// Key the section is stored under in the record cache.
    pub fn key(self) -> &'static str {
        match self {
            Section::Quote => "quote",
            Section::PerformanceAnalysis => "performance_analysis",
            Section::FinancialRatios => "financial_ratios",
            Section::PeerComparison => "peer_comparison",
            Section::CorporateActions => "corporate_actions",
            Section::Holdings => "shareholding_info_and_analysis",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A leaf value inside a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Explicit JSON `null`.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Numeric literal, kept in its JSON form so integers stay exact.
    Number(serde_json::Number),
    /// String literal.
    String(String),
}

impl Scalar {
    /// Converts the scalar back into its JSON form.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(value) => Value::Bool(*value),
            Scalar::Number(value) => Value::Number(value.clone()),
            Scalar::String(value) => Value::String(value.clone()),
        }
    }

    /// Interprets the scalar as a decimal. Strings may carry thousands
    /// separators (`"1,234.5"`); anything unparsable yields `None`.
    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Scalar::Number(value) => value.as_f64(),
            Scalar::String(value) => value.trim().replace(',', "").parse::<f64>().ok(),
            Scalar::Null | Scalar::Bool(_) => None,
        }
    }

    /// The text of a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Number(value) => write!(f, "{value}"),
            Scalar::String(value) => f.write_str(value),
        }
    }
}

/// Insertion-ordered mapping of keys to records.
///
/// Key order matters: columns are laid out in the order keys were first seen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: IndexMap<String, Record>,
}

impl Mapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the mapping holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.entries.get(key)
    }

    /// Mutable access to the value stored under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Record> {
        self.entries.get_mut(key)
    }

    /// `true` when `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts a value. Replacing an existing key keeps its original position
    /// and returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Record) -> Option<Record> {
        self.entries.insert(key.into(), value)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Record)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, Record)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Nested per-entity value: a scalar, an ordered sequence, or a mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Leaf value.
    Scalar(Scalar),
    /// Ordered list; element positions become header labels.
    Sequence(Vec<Record>),
    /// Keyed children in insertion order.
    Mapping(Mapping),
}

impl Record {
    /// A mapping without keys.
    pub fn empty_mapping() -> Self {
        Record::Mapping(Mapping::new())
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, Record::Scalar(_))
    }

    /// `true` for a mapping or sequence without children.
    pub fn is_empty_container(&self) -> bool {
        match self {
            Record::Scalar(_) => false,
            Record::Sequence(items) => items.is_empty(),
            Record::Mapping(mapping) => mapping.is_empty(),
        }
    }

    /// Child of a mapping by key; `None` for anything else.
    pub fn get(&self, key: &str) -> Option<&Record> {
        match self {
            Record::Mapping(mapping) => mapping.get(key),
            _ => None,
        }
    }

    /// Element of a sequence by position; `None` for anything else.
    pub fn at(&self, index: usize) -> Option<&Record> {
        match self {
            Record::Sequence(items) => items.get(index),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Record::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Converts a JSON value into a record for `entity`, rejecting values that
    /// nest deeper than [`MAX_DEPTH`].
    pub fn from_json(entity: &str, value: &Value) -> Result<Self> {
        if json_depth(value) > MAX_DEPTH {
            return Err(ScreenerError::DepthExceeded {
                entity: entity.to_string(),
                limit: MAX_DEPTH,
            });
        }
        Ok(convert_json(value))
    }
}

impl From<Scalar> for Record {
    fn from(scalar: Scalar) -> Self {
        Record::Scalar(scalar)
    }
}

// Only called once the depth has been checked.
fn convert_json(value: &Value) -> Record {
    match value {
        Value::Null => Record::Scalar(Scalar::Null),
        Value::Bool(value) => Record::Scalar(Scalar::Bool(*value)),
        Value::Number(value) => Record::Scalar(Scalar::Number(value.clone())),
        Value::String(value) => Record::Scalar(Scalar::String(value.clone())),
        Value::Array(items) => Record::Sequence(items.iter().map(convert_json).collect()),
        Value::Object(object) => Record::Mapping(
            object
                .iter()
                .map(|(key, item)| (key.clone(), convert_json(item)))
                .collect(),
        ),
    }
}

fn json_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(value, 0usize)];
    while let Some((current, level)) = pending.pop() {
        match current {
            Value::Array(items) => {
                deepest = deepest.max(level + 1);
                pending.extend(items.iter().map(|item| (item, level + 1)));
            }
            Value::Object(object) => {
                deepest = deepest.max(level + 1);
                pending.extend(object.values().map(|item| (item, level + 1)));
            }
            _ => deepest = deepest.max(level),
        }
        if deepest > MAX_DEPTH {
            break;
        }
    }
    deepest
}

/// One step of a header path: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Root-to-leaf sequence of keys and indices identifying one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeaderPath(Vec<PathSegment>);

impl HeaderPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path extended by one segment.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(segment);
        Self(segments)
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for HeaderPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for HeaderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bse_codes_must_be_six_digits() {
        assert_eq!(EntityId::bse(" 500325 ").expect("valid code").as_str(), "500325");
        assert!(EntityId::bse("50032").is_err());
        assert!(EntityId::bse("50032A").is_err());
    }

    #[test]
    fn json_conversion_keeps_key_order() {
        let value = json!({"zeta": 1, "alpha": {"b": 2, "a": [true, null]}});
        let record = Record::from_json("500325", &value).expect("record converted");
        let Record::Mapping(mapping) = &record else {
            panic!("expected mapping");
        };
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        let nested = record.get("alpha").and_then(|alpha| alpha.get("a"));
        assert_eq!(nested.and_then(|items| items.at(1)), Some(&Record::Scalar(Scalar::Null)));
    }

    #[test]
    fn replacing_a_key_keeps_its_position() {
        let mut mapping: Mapping = ["quote", "peers", "ratios"]
            .into_iter()
            .map(|key| (key.to_string(), Record::empty_mapping()))
            .collect();

        let previous = mapping.insert("peers", Record::Scalar(Scalar::Bool(true)));
        assert_eq!(previous, Some(Record::empty_mapping()));
        mapping.insert("holdings", Record::empty_mapping());

        assert_eq!(
            mapping.keys().collect::<Vec<_>>(),
            vec!["quote", "peers", "ratios", "holdings"]
        );
        assert_eq!(mapping.get("peers"), Some(&Record::Scalar(Scalar::Bool(true))));
    }

    #[test]
    fn wide_mappings_look_up_every_key() {
        let mapping: Mapping = (0..10_000)
            .map(|index| (format!("field{index}"), Record::Scalar(Scalar::Number(index.into()))))
            .collect();

        assert_eq!(mapping.len(), 10_000);
        assert!(mapping.contains_key("field9999"));
        assert_eq!(mapping.keys().nth(4_321), Some("field4321"));
        assert_eq!(
            mapping.get("field4321").and_then(Record::as_scalar),
            Some(&Scalar::Number(4_321.into()))
        );
    }

    #[test]
    fn overly_deep_records_are_rejected() {
        let mut value = json!(1);
        for _ in 0..=MAX_DEPTH {
            value = json!([value]);
        }
        let error = Record::from_json("500325", &value).expect_err("depth rejected");
        assert!(matches!(error, ScreenerError::DepthExceeded { limit, .. } if limit == MAX_DEPTH));
    }

    #[test]
    fn decimals_accept_thousands_separators() {
        assert_eq!(Scalar::String("1,234.50".into()).as_decimal(), Some(1234.5));
        assert_eq!(Scalar::String("n/a".into()).as_decimal(), None);
        assert_eq!(Scalar::Number(7.into()).as_decimal(), Some(7.0));
    }

    #[test]
    fn header_paths_render_dotted() {
        let path: HeaderPath = vec![PathSegment::from("peers"), PathSegment::from(0usize)]
            .into_iter()
            .collect();
        assert_eq!(path.child("PE".into()).to_string(), "peers.0.PE");
    }
}
