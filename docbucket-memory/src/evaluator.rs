//! Filter evaluation and ordering for in-memory statement execution.

use std::{collections::HashMap, cmp::Ordering};
use bson::{Bson, datetime::DateTime};
use regex::Regex;

use docbucket_core::{
    document::Content,
    query::{QueryVisitor, Expr, FieldOp, META_ID_FIELD, like_to_regex, resolve_path},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Binary, object ids and other values with no query semantics
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position of the value's type in the collation order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Bool(_) => 2,
            Comparable::Number(_) => 3,
            Comparable::DateTime(_) => 4,
            Comparable::String(_) => 5,
            Comparable::Array(_) => 6,
            Comparable::Map(_) => 7,
            Comparable::Opaque => 8,
        }
    }

    /// Total order used by `ORDER BY`: values of different types order by
    /// type, values of the same type by value.
    fn collate(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b)
                .map(|(x, y)| x.collate(y))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Map(a), Comparable::Map(b)) => {
                let mut left: Vec<_> = a.iter().collect();
                let mut right: Vec<_> = b.iter().collect();
                left.sort_by(|x, y| x.0.cmp(y.0));
                right.sort_by(|x, y| x.0.cmp(y.0));

                left.len().cmp(&right.len()).then_with(|| {
                    left.iter()
                        .zip(&right)
                        .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.collate(vb)))
                        .find(|o| o.is_ne())
                        .unwrap_or(Ordering::Equal)
                })
            }
            // NaN sorts after every other number
            (Comparable::Number(a), Comparable::Number(b)) => a.total_cmp(b),
            _ => self
                .rank()
                .cmp(&other.rank())
                .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal)),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Orders two optional field values; a missing value sorts before everything.
pub(crate) fn collate(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => Comparable::from(a).collate(&Comparable::from(b)),
    }
}

/// Compiled `LIKE` patterns, shared by every document of one statement.
#[derive(Debug, Default)]
pub(crate) struct LikePatterns {
    compiled: HashMap<String, Regex>,
}

impl LikePatterns {
    fn matcher(&mut self, pattern: &str) -> DocumentStoreResult<&Regex> {
        if !self.compiled.contains_key(pattern) {
            let regex = Regex::new(&format!("(?s){}", like_to_regex(pattern))).map_err(|e| {
                DocumentStoreError::Query(format!("invalid LIKE pattern {pattern:?}: {e}"))
            })?;
            self.compiled.insert(pattern.to_string(), regex);
        }

        self.compiled
            .get(pattern)
            .ok_or_else(|| DocumentStoreError::Query(format!("invalid LIKE pattern {pattern:?}")))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.compiled.len()
    }
}

fn contains<'a>(values: &[Comparable<'a>], needle: &Comparable<'a>) -> bool {
    values.iter().any(|item| item == needle)
}

/// Evaluates a filter against one stored document.
pub(crate) struct DocumentEvaluator<'a> {
    key: &'a str,
    content: &'a Content,
    patterns: &'a mut LikePatterns,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(key: &'a str, content: &'a Content, patterns: &'a mut LikePatterns) -> Self {
        Self { key, content, patterns }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    fn lookup(&self, field: &str) -> Option<Bson> {
        if field == META_ID_FIELD {
            return Some(Bson::String(self.key.to_string()));
        }

        resolve_path(self.content, field).cloned()
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.lookup(field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        // Comparisons against a missing field never match
        let Some(field_value) = self.lookup(field) else {
            return Ok(false);
        };
        let left = Comparable::from(&field_value);
        let right = Comparable::from(value);

        match op {
            FieldOp::Eq => Ok(left == right),
            FieldOp::Ne => Ok(left != right),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                Ok(match left.partial_cmp(&right) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering.is_gt(),
                        FieldOp::Gte => ordering.is_ge(),
                        FieldOp::Lt => ordering.is_lt(),
                        _ => ordering.is_le(),
                    },
                    None => false,
                })
            },
            FieldOp::Like => match (&field_value, value) {
                (Bson::String(text), Bson::String(pattern)) => Ok(self.patterns.matcher(pattern)?.is_match(text)),
                (_, Bson::String(_)) => Ok(false),
                _ => Err(DocumentStoreError::Query(format!("LIKE on {field} expects a string pattern"))),
            },
            FieldOp::AnyOf => match (left, right) {
                (Comparable::Array(array), Comparable::Array(values)) => {
                    Ok(values.iter().any(|val| contains(&array, val)))
                },
                (Comparable::Array(array), single_value) => Ok(contains(&array, &single_value)),
                (single_value, Comparable::Array(values)) => Ok(contains(&values, &single_value)),
                _ => Ok(false),
            },
            FieldOp::NoneOf => match (left, right) {
                (Comparable::Array(array), Comparable::Array(values)) => {
                    Ok(!values.iter().any(|val| contains(&array, val)))
                },
                (Comparable::Array(array), single_value) => Ok(!contains(&array, &single_value)),
                (single_value, Comparable::Array(values)) => Ok(!contains(&values, &single_value)),
                _ => Ok(true),
            },
        }
    }
}
