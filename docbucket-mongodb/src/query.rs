//! Translation of parsed statements into MongoDB find filters.

use bson::{Document, Bson, doc};

use docbucket_core::{
    query::{QueryVisitor, Expr, FieldOp, META_ID_FIELD, like_to_regex},
    error::DocumentStoreError,
};

use crate::sanitizer::KeySanitizer;

/// Field holding the document key.
pub(crate) const ID_FIELD: &str = "_id";


pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Maps a statement field path onto the stored field path.
    pub(crate) fn field_path(field: &str) -> String {
        if field == META_ID_FIELD {
            ID_FIELD.to_string()
        } else {
            KeySanitizer::sanitize_path(field)
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // Every stored document has a key, so this matches nothing
        if exprs.is_empty() {
            return Ok(doc! { ID_FIELD: { "$exists": false } });
        }

        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        let inner = self.visit_expr(expr)?;

        Ok(doc! { "$nor": [inner] })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        let path = Self::field_path(field);

        Ok(doc! {
            path: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let path = Self::field_path(field);

        Ok(doc! {
            path: match (op, value) {
                // `$eq: null` would also match missing fields
                (FieldOp::Eq, Bson::Null) => doc! { "$type": "null" },
                (FieldOp::Eq, _) => doc! { "$eq": value },
                (FieldOp::Ne, Bson::Null) => doc! { "$ne": value },
                (FieldOp::Ne, _) => doc! { "$exists": true, "$ne": value },
                (FieldOp::Gt, _) => doc! { "$gt": value },
                (FieldOp::Gte, _) => doc! { "$gte": value },
                (FieldOp::Lt, _) => doc! { "$lt": value },
                (FieldOp::Lte, _) => doc! { "$lte": value },
                (FieldOp::Like, Bson::String(pattern)) => doc! {
                    "$regex": like_to_regex(pattern),
                    "$options": "s",
                },
                (FieldOp::Like, _) => {
                    return Err(DocumentStoreError::Query(format!("LIKE on {field} expects a string pattern")));
                }
                (FieldOp::AnyOf, Bson::Array(values)) => doc! { "$in": values },
                (FieldOp::AnyOf, _) => doc! { "$in": [value] },
                (FieldOp::NoneOf, Bson::Array(values)) => doc! { "$exists": true, "$nin": values },
                (FieldOp::NoneOf, _) => doc! { "$exists": true, "$nin": [value] },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbucket_core::query::Filter;

    fn translate(expr: Expr) -> Document {
        MongoQueryTranslator.visit_expr(&expr).unwrap()
    }

    #[test]
    fn test_comparisons_require_presence() {
        assert_eq!(translate(Filter::eq("cost", "29.99")), doc! { "cost": { "$eq": "29.99" } });
        assert_eq!(
            translate(Filter::ne("cost", "29.99")),
            doc! { "cost": { "$exists": true, "$ne": "29.99" } }
        );
        assert_eq!(translate(Filter::is_null("edition")), doc! { "edition": { "$type": "null" } });
        assert_eq!(translate(Filter::is_not_null("edition")), doc! { "edition": { "$ne": Bson::Null } });
    }

    #[test]
    fn test_meta_id_and_paths() {
        assert_eq!(translate(Filter::eq(META_ID_FIELD, "u:book1")), doc! { "_id": { "$eq": "u:book1" } });
        assert_eq!(
            translate(Filter::missing("price.$usd")),
            doc! { "price.__dollar__usd": { "$exists": false } }
        );
    }

    #[test]
    fn test_like_becomes_anchored_regex() {
        assert_eq!(
            translate(Filter::like("name", "Minecraft%")),
            doc! { "name": { "$regex": "^Minecraft.*$", "$options": "s" } }
        );
        assert!(MongoQueryTranslator.visit_expr(&Filter::eq("x", 1).and(Expr::field("name".into(), FieldOp::Like, Bson::Int32(1)))).is_err());
    }

    #[test]
    fn test_logic() {
        assert_eq!(
            translate(Filter::gt("pages", 100).not()),
            doc! { "$nor": [ { "pages": { "$gt": 100 } } ] }
        );
        assert_eq!(translate(Filter::and([])), doc! {});
        assert_eq!(translate(Filter::or([])), doc! { "_id": { "$exists": false } });
        assert_eq!(
            translate(Filter::any_of("tags", "java")),
            doc! { "tags": { "$in": ["java"] } }
        );
    }
}
