// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Mapping of loosely typed response trees onto fixed field sets.
//!
//! A field set is a slice of [`FieldSpec`] values. Each spec names a path into
//! the response, the scalar type expected there, and what to do when the node
//! is absent. Extraction is atomic: either every required field validates and
//! an [`ExtractedFacts`] is returned, or the first offending path is reported
//! through [`ExtractionError`] and nothing is returned.
//!
//! Paths use dots for object keys and either `[n]` or a bare number for array
//! indices, so `current_condition[0].temp_C` and `weather.0.uvIndex` are both
//! accepted.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{error::ExtractionError, fetch::RawResponse};

/// Scalar type expected at a field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum FieldKind
{
    /// JSON string.
    Text,
    /// JSON integer.
    Integer,
    /// Integer encoded as a JSON string (`"12"`).
    QuotedInteger,
    /// JSON string holding a point in time. The format is checked later by
    /// the metrics layer, which tolerates malformed values.
    Timestamp,
}

impl FieldKind
{
    fn describe(self,) -> &'static str
    {
        match self {
            Self::Text => "string",
            Self::Integer => "integer",
            Self::QuotedInteger => "integer string",
            Self::Timestamp => "timestamp string",
        }
    }
}

/// Extracted scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
#[serde(untagged)]
pub enum Scalar
{
    /// Free text.
    Text(String,),
    /// Whole number.
    Integer(i64,),
    /// Point in time, kept as the literal the source sent.
    Timestamp(String,),
}

impl From<&str,> for Scalar
{
    fn from(value: &str,) -> Self
    {
        Self::Text(value.to_owned(),)
    }
}

impl From<String,> for Scalar
{
    fn from(value: String,) -> Self
    {
        Self::Text(value,)
    }
}

impl From<i64,> for Scalar
{
    fn from(value: i64,) -> Self
    {
        Self::Integer(value,)
    }
}

#[derive(Debug, Clone, PartialEq, Eq,)]
enum Presence
{
    Required,
    Optional,
    Fallback(Scalar,),
}

/// Description of one field to extract.
///
/// # Examples
///
/// ```
/// use tempo_digest::{FieldSpec, extract};
///
/// let fields = [
///     FieldSpec::text("name", "full_name",),
///     FieldSpec::text("description", "description",).or("No description",).truncate(200,),
///     FieldSpec::integer("stars", "stargazers_count",),
/// ];
/// let raw = serde_json::json!({"full_name": "a/x", "description": null, "stargazers_count": 7});
/// let facts = extract(&raw, &fields,)?;
/// assert_eq!(facts.text("description")?, "No description");
/// assert_eq!(facts.integer("stars")?, 7);
/// # Ok::<(), tempo_digest::ExtractionError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct FieldSpec
{
    name:       &'static str,
    path:       String,
    kind:       FieldKind,
    presence:   Presence,
    first_line: bool,
    max_chars:  Option<usize,>,
}

impl FieldSpec
{
    /// Creates a required field of the given kind.
    pub fn new(name: &'static str, path: impl Into<String,>, kind: FieldKind,) -> Self
    {
        Self {
            name,
            path: path.into(),
            kind,
            presence: Presence::Required,
            first_line: false,
            max_chars: None,
        }
    }

    /// Required JSON string.
    pub fn text(name: &'static str, path: impl Into<String,>,) -> Self
    {
        Self::new(name, path, FieldKind::Text,)
    }

    /// Required JSON integer.
    pub fn integer(name: &'static str, path: impl Into<String,>,) -> Self
    {
        Self::new(name, path, FieldKind::Integer,)
    }

    /// Required integer encoded as a string.
    pub fn quoted_integer(name: &'static str, path: impl Into<String,>,) -> Self
    {
        Self::new(name, path, FieldKind::QuotedInteger,)
    }

    /// Required timestamp string.
    pub fn timestamp(name: &'static str, path: impl Into<String,>,) -> Self
    {
        Self::new(name, path, FieldKind::Timestamp,)
    }

    /// Absent or `null` nodes are skipped instead of failing.
    pub fn optional(mut self,) -> Self
    {
        self.presence = Presence::Optional;
        self
    }

    /// Absent or `null` nodes take `fallback` instead of failing.
    pub fn or(mut self, fallback: impl Into<Scalar,>,) -> Self
    {
        self.presence = Presence::Fallback(fallback.into(),);
        self
    }

    /// Keeps only the first line of text values.
    pub fn first_line(mut self,) -> Self
    {
        self.first_line = true;
        self
    }

    /// Caps text values at `max_chars` characters.
    pub fn truncate(mut self, max_chars: usize,) -> Self
    {
        self.max_chars = Some(max_chars,);
        self
    }

    /// Logical name under which the value is stored.
    pub fn name(&self,) -> &'static str
    {
        self.name
    }

    /// Path into the response tree.
    pub fn path(&self,) -> &str
    {
        &self.path
    }

    fn shape_text(&self, value: &str,) -> String
    {
        let value = if self.first_line { value.lines().next().unwrap_or_default() } else { value };
        match self.max_chars {
            Some(limit,) => truncate_chars(value, limit,).to_owned(),
            None => value.to_owned(),
        }
    }

    fn convert(&self, node: &Value,) -> Result<Scalar, ExtractionError,>
    {
        let mismatch = || ExtractionError::TypeMismatch {
            path:     self.path.clone(),
            expected: self.kind.describe(),
            found:    node_type(node,),
        };

        match (self.kind, node,) {
            (FieldKind::Text, Value::String(text,),) => Ok(Scalar::Text(self.shape_text(text,),),),
            (FieldKind::Timestamp, Value::String(text,),) => {
                Ok(Scalar::Timestamp(self.shape_text(text,),),)
            }
            (FieldKind::Integer, Value::Number(number,),) => {
                number.as_i64().map(Scalar::Integer,).ok_or_else(mismatch,)
            }
            (FieldKind::QuotedInteger, Value::String(text,),) => {
                text.trim().parse::<i64,>().map(Scalar::Integer,).map_err(|_| mismatch(),)
            }
            _ => Err(mismatch(),),
        }
    }
}

/// Validated values of one field set, keyed by logical field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize,)]
pub struct ExtractedFacts
{
    values: BTreeMap<&'static str, Scalar,>,
}

impl ExtractedFacts
{
    /// Raw scalar lookup.
    pub fn get(&self, name: &str,) -> Option<&Scalar,>
    {
        self.values.get(name,)
    }

    /// Returns a text field.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::UnknownField`] when the field was not
    /// extracted and [`ExtractionError::TypeMismatch`] when it is not text.
    pub fn text(&self, name: &str,) -> Result<&str, ExtractionError,>
    {
        match self.lookup(name,)? {
            Scalar::Text(value,) => Ok(value,),
            other => Err(scalar_mismatch(name, "string", other,),),
        }
    }

    /// Returns a text field that may have been skipped as optional.
    pub fn optional_text(&self, name: &str,) -> Option<&str,>
    {
        match self.values.get(name,) {
            Some(Scalar::Text(value,),) => Some(value,),
            _ => None,
        }
    }

    /// Returns an integer field.
    ///
    /// # Errors
    ///
    /// Same contract as [`ExtractedFacts::text`].
    pub fn integer(&self, name: &str,) -> Result<i64, ExtractionError,>
    {
        match self.lookup(name,)? {
            Scalar::Integer(value,) => Ok(*value,),
            other => Err(scalar_mismatch(name, "integer", other,),),
        }
    }

    /// Returns a timestamp field.
    ///
    /// # Errors
    ///
    /// Same contract as [`ExtractedFacts::text`].
    pub fn timestamp(&self, name: &str,) -> Result<&str, ExtractionError,>
    {
        match self.lookup(name,)? {
            Scalar::Timestamp(value,) => Ok(value,),
            other => Err(scalar_mismatch(name, "timestamp string", other,),),
        }
    }

    /// Number of stored fields.
    pub fn len(&self,) -> usize
    {
        self.values.len()
    }

    /// Returns `true` when no field was stored.
    pub fn is_empty(&self,) -> bool
    {
        self.values.is_empty()
    }

    fn lookup(&self, name: &str,) -> Result<&Scalar, ExtractionError,>
    {
        self.values.get(name,).ok_or_else(|| ExtractionError::UnknownField {
            name: name.to_owned(),
        },)
    }
}

fn scalar_mismatch(name: &str, expected: &'static str, found: &Scalar,) -> ExtractionError
{
    let found = match found {
        Scalar::Text(_,) => "string",
        Scalar::Integer(_,) => "integer",
        Scalar::Timestamp(_,) => "timestamp string",
    };

    ExtractionError::TypeMismatch {
        path: name.to_owned(), expected, found,
    }
}

/// Extracts `fields` from `raw`.
///
/// # Errors
///
/// Returns the first [`ExtractionError`] encountered, in field order.
pub fn extract(raw: &RawResponse, fields: &[FieldSpec],) -> Result<ExtractedFacts, ExtractionError,>
{
    let mut facts = ExtractedFacts::default();

    for field in fields {
        let segments = parse_path(&field.path,)?;
        let node = resolve(raw, &segments,).filter(|node| !node.is_null(),);

        let value = match (node, &field.presence,) {
            (Some(node,), _,) => field.convert(node,)?,
            (None, Presence::Fallback(fallback,),) => fallback.clone(),
            (None, Presence::Optional,) => continue,
            (None, Presence::Required,) => {
                return Err(ExtractionError::Missing {
                    path: field.path.clone(),
                },);
            }
        };

        facts.values.insert(field.name, value,);
    }

    Ok(facts,)
}

/// Extracts `fields` from each of the first `limit` elements of an array
/// response, in source order.
///
/// # Errors
///
/// Returns [`ExtractionError::NotAnArray`] when `raw` is not an array and the
/// first element failure otherwise. A single malformed element fails the whole
/// list.
pub fn extract_list(
    raw: &RawResponse,
    fields: &[FieldSpec],
    limit: usize,
) -> Result<Vec<ExtractedFacts,>, ExtractionError,>
{
    let items = raw.as_array().ok_or_else(|| ExtractionError::NotAnArray {
        path: "$".to_owned(),
    },)?;

    items
        .iter()
        .take(limit,)
        .enumerate()
        .map(|(index, item,)| extract(item, fields,).map_err(|error| prefix_path(index, error,),),)
        .collect()
}

fn prefix_path(index: usize, error: ExtractionError,) -> ExtractionError
{
    match error {
        ExtractionError::Missing {
            path,
        } => ExtractionError::Missing {
            path: format!("[{index}].{path}"),
        },
        ExtractionError::TypeMismatch {
            path,
            expected,
            found,
        } => ExtractionError::TypeMismatch {
            path: format!("[{index}].{path}"), expected, found,
        },
        other => other,
    }
}

/// Returns the first `max_chars` characters of `value`.
pub fn truncate_chars(value: &str, max_chars: usize,) -> &str
{
    match value.char_indices().nth(max_chars,) {
        Some((byte_index, _,),) => &value[..byte_index],
        None => value,
    }
}

#[derive(Debug, Clone, PartialEq, Eq,)]
enum Segment
{
    Key(String,),
    Index(usize,),
}

fn parse_path(path: &str,) -> Result<Vec<Segment,>, ExtractionError,>
{
    let invalid = || ExtractionError::InvalidPath {
        path: path.to_owned(),
    };

    let mut segments = Vec::new();
    for part in path.split('.',) {
        if part.is_empty() {
            return Err(invalid(),);
        }

        let (key, mut rest,) = match part.find('[',) {
            Some(position,) => part.split_at(position,),
            None => (part, "",),
        };

        if !key.is_empty() {
            match key.parse::<usize,>() {
                Ok(index,) => segments.push(Segment::Index(index,),),
                Err(_,) => segments.push(Segment::Key(key.to_owned(),),),
            }
        }

        while !rest.is_empty() {
            let close = rest.find(']',).ok_or_else(invalid,)?;
            let index = rest[1..close].parse::<usize,>().map_err(|_| invalid(),)?;
            segments.push(Segment::Index(index,),);
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[',) {
                return Err(invalid(),);
            }
        }
    }

    Ok(segments,)
}

fn resolve<'a,>(root: &'a Value, segments: &[Segment],) -> Option<&'a Value,>
{
    segments.iter().try_fold(root, |node, segment| match (segment, node,) {
        (Segment::Key(key,), Value::Object(map,),) => map.get(key,),
        (Segment::Index(index,), Value::Array(items,),) => items.get(*index,),
        (Segment::Index(index,), Value::Object(map,),) => map.get(&index.to_string(),),
        _ => None,
    },)
}

fn node_type(node: &Value,) -> &'static str
{
    match node {
        Value::Null => "null",
        Value::Bool(_,) => "bool",
        Value::Number(number,) if number.is_i64() || number.is_u64() => "integer",
        Value::Number(_,) => "number",
        Value::String(_,) => "string",
        Value::Array(_,) => "array",
        Value::Object(_,) => "object",
    }
}
